pub mod confirmations;
pub use self::confirmations::confirm;

pub mod health;
pub use self::health::health;

use axum::http::{HeaderMap, header::AUTHORIZATION};
use secrecy::SecretString;

/// Bearer token from the `Authorization` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<SecretString> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(SecretString::from(token.to_string()))
}
