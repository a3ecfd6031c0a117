use mock_server::Credentials;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt().with_target(false).init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let user = std::env::var("SOAP_USER").unwrap_or_else(|_| "alice".to_string());
    let password = std::env::var("SOAP_PASSWORD").unwrap_or_else(|_| "secret".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, %user, "listening");
    mock_server::run(listener, Credentials::new(user, password)).await
}
