//! Removal of XML character references that no XML parser will accept.
//!
//! Some SOAP services escape raw control characters as numeric references
//! (`&#x1B;`), which XML 1.0 forbids even in escaped form. The envelope
//! parser then rejects the entire response. Stripping replaces each such
//! reference with a single space.
//!
//! The accepted reference shape is deliberately narrow: a lowercase `&#x`,
//! an optional `0` or `1`, one uppercase hex digit, and `;`. Lowercase hex
//! digits, decimal references and longer forms such as `&#x001B;` are left
//! alone. Tab, line feed and carriage return (`9`, `A`, `D`, optionally with a
//! leading `0`) are allowed.

const PREFIX: &str = "&#x";

/// Whether the hex digits of a matched `&#x..;` reference name a control
/// character XML does not allow.
pub fn is_disallowed_reference(hex: &str) -> bool {
    !matches!(hex, "9" | "A" | "D" | "09" | "0A" | "0D")
}

fn is_upper_hex(b: u8) -> bool {
    b.is_ascii_digit() || (b'A'..=b'F').contains(&b)
}

/// Length of the hex digits of a short reference starting at `&#x`, if the
/// bytes following the prefix form one.
fn reference_digits(rest: &[u8]) -> Option<usize> {
    match rest {
        [b'0' | b'1', d, b';', ..] if is_upper_hex(*d) => Some(2),
        [d, b';', ..] if is_upper_hex(*d) => Some(1),
        _ => None,
    }
}

/// Replace every disallowed control-character reference in `body` with a
/// space. Returns the cleaned body and the number of replacements.
pub fn strip_bad_chars(body: &str) -> (String, usize) {
    let mut out = String::with_capacity(body.len());
    let mut count = 0;
    let mut rest = body;

    while let Some(at) = rest.find(PREFIX) {
        out.push_str(&rest[..at]);
        let after = &rest[at + PREFIX.len()..];
        match reference_digits(after.as_bytes()) {
            Some(n) if is_disallowed_reference(&after[..n]) => {
                out.push(' ');
                count += 1;
                rest = &after[n + 1..];
            }
            Some(n) => {
                out.push_str(&rest[at..at + PREFIX.len() + n + 1]);
                rest = &after[n + 1..];
            }
            None => {
                out.push_str(PREFIX);
                rest = after;
            }
        }
    }
    out.push_str(rest);

    (out, count)
}
