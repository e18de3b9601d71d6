//! HTTP Basic authentication for `Basic-Auth` directives.
use base64::{Engine as _, engine::general_purpose};
use http::HeaderValue;
use subtle::ConstantTimeEq;

const BASIC: &str = "basic ";

/// Realm announced in `WWW-Authenticate` unless configured otherwise.
pub const DEFAULT_REALM: &str = "Please enter your username and password for this site";

/// Body sent with every 401 produced by a header rule.
pub const UNAUTHORIZED_BODY: &str = "Unauthorized.\n";

/// A username/password pair accepted by a header rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Check an `Authorization` header against the accepted credentials.
///
/// Every configured pair is compared, username and password alike, with
/// constant-time equality; the loop never exits early so the time taken does
/// not reveal which pair (if any) came close.
pub fn authorize(credentials: &[Credential], authorization: Option<&HeaderValue>) -> bool {
    let Some((username, password)) = authorization.and_then(decode_basic) else {
        return false;
    };

    let mut valid = false;
    for credential in credentials {
        let username_match = credential.username.as_bytes().ct_eq(username.as_bytes());
        let password_match = credential.password.as_bytes().ct_eq(password.as_bytes());
        valid |= bool::from(username_match & password_match);
    }
    valid
}

/// `WWW-Authenticate` value for the given realm.
pub fn challenge(realm: &str) -> String {
    format!("Basic realm=\"{realm}\"")
}

fn decode_basic(header: &HeaderValue) -> Option<(String, String)> {
    let value = header.to_str().ok()?;
    if value.len() < BASIC.len() || !value[..BASIC.len()].eq_ignore_ascii_case(BASIC) {
        tracing::debug!("Authorization header is not Basic");
        return None;
    }

    let decoded = general_purpose::STANDARD
        .decode(value[BASIC.len()..].trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}
