use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use tokio::net::TcpListener;
use tracing::debug;

/// Credentials the endpoint accepts.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    fn basic_header(&self) -> String {
        let token = BASE64_STANDARD.encode(format!("{}:{}", self.user, self.password));
        format!("Basic {token}")
    }
}

pub type Shared = Arc<Credentials>;

/// SOAP routes behind HTTP Basic authentication.
///
/// - `POST /soap` echoes the SOAP action and request size in an envelope.
/// - `POST /soap/dirty` answers with escaped control characters in the body.
/// - `POST /soap/fault` answers `500` with a SOAP fault envelope.
pub fn app(credentials: Credentials) -> Router {
    Router::new()
        .route("/soap", post(echo))
        .route("/soap/dirty", post(dirty))
        .route("/soap/fault", post(fault))
        .with_state(Arc::new(credentials))
}

pub async fn run(listener: TcpListener, credentials: Credentials) -> Result<(), std::io::Error> {
    axum::serve(listener, app(credentials)).await
}

pub fn envelope(inner: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
<soap:Envelope xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\">\
<soap:Body>{inner}</soap:Body></soap:Envelope>"
    )
}

fn xml(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "text/xml; charset=utf-8")], body).into_response()
}

/// Check credentials and SOAP headers, returning the unquoted SOAP action.
fn admit(creds: &Credentials, headers: &HeaderMap) -> Result<String, Response> {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == creds.basic_header());
    if !authorized {
        debug!("rejecting request without valid credentials");
        return Err((
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Basic realm=\"soap\"")],
        )
            .into_response());
    }

    let is_xml = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/xml"));
    let action = headers
        .get("soapaction")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_matches('"').to_string());
    match action {
        Some(action) if is_xml => Ok(action),
        _ => Err(xml(
            StatusCode::BAD_REQUEST,
            envelope("<soap:Fault><faultcode>soap:Client</faultcode></soap:Fault>"),
        )),
    }
}

async fn echo(State(creds): State<Shared>, headers: HeaderMap, body: String) -> Response {
    match admit(&creds, &headers) {
        Ok(action) => xml(
            StatusCode::OK,
            envelope(&format!(
                "<EchoResponse action=\"{action}\" length=\"{}\"/>",
                body.len()
            )),
        ),
        Err(rejection) => rejection,
    }
}

async fn dirty(State(creds): State<Shared>, headers: HeaderMap, _body: String) -> Response {
    match admit(&creds, &headers) {
        Ok(_) => xml(
            StatusCode::OK,
            envelope("<Text>a&#x1B;b&#x09;c&#x0C;d</Text>"),
        ),
        Err(rejection) => rejection,
    }
}

async fn fault(State(creds): State<Shared>, headers: HeaderMap, _body: String) -> Response {
    match admit(&creds, &headers) {
        Ok(_) => xml(
            StatusCode::INTERNAL_SERVER_ERROR,
            envelope(
                "<soap:Fault><faultcode>soap:Server</faultcode>\
<faultstring>boom</faultstring></soap:Fault>",
            ),
        ),
        Err(rejection) => rejection,
    }
}
