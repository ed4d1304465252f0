//! Parameter extraction from a confirmation URL.
//!
//! A link can carry its credentials in the query string, in the fragment, or
//! split across both. Both sources use `application/x-www-form-urlencoded`
//! rules; for each recognized key the query value wins when it is non-empty,
//! otherwise the fragment value is used.

use secrecy::SecretString;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use url::{Url, form_urlencoded};

pub const ACCESS_TOKEN: &str = "access_token";
pub const REFRESH_TOKEN: &str = "refresh_token";
pub const LINK_TYPE: &str = "type";
pub const TOKEN_HASH: &str = "token_hash";

pub const RECOGNIZED_KEYS: [&str; 4] = [ACCESS_TOKEN, REFRESH_TOKEN, LINK_TYPE, TOKEN_HASH];

// Only used to resolve relative inputs such as `/auth/confirm?x=1`.
const RELATIVE_BASE: &str = "http://confirmer.invalid/";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParameterError {
    #[error("invalid confirmation URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Immutable view of the recognized parameters of one confirmation URL.
#[derive(Clone, Debug, Default)]
pub struct IncomingParameters {
    access_token: Option<SecretString>,
    refresh_token: Option<SecretString>,
    link_type: Option<String>,
    token_hash: Option<SecretString>,
    present: BTreeSet<&'static str>,
}

impl IncomingParameters {
    /// Parse an absolute URL or a relative `path?query#fragment` reference.
    /// # Errors
    /// Returns an error if the input is not a valid URL reference.
    pub fn from_url(input: &str) -> Result<Self, ParameterError> {
        let url = match Url::parse(input.trim()) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse(RELATIVE_BASE)?.join(input.trim())?
            }
            Err(err) => return Err(err.into()),
        };

        Ok(Self::from_parts(
            url.query().unwrap_or_default(),
            url.fragment().unwrap_or_default(),
        ))
    }

    /// Build from raw query and fragment strings; a leading `?` or `#` is ignored.
    #[must_use]
    pub fn from_parts(query: &str, fragment: &str) -> Self {
        let query = first_values(query.trim_start_matches('?'));
        let fragment = first_values(fragment.trim_start_matches('#'));

        let present = RECOGNIZED_KEYS
            .into_iter()
            .filter(|key| query.contains_key(*key) || fragment.contains_key(*key))
            .collect();
        let effective = |key: &str| -> Option<String> {
            query
                .get(key)
                .filter(|value| !value.is_empty())
                .or_else(|| fragment.get(key).filter(|value| !value.is_empty()))
                .cloned()
        };

        Self {
            access_token: effective(ACCESS_TOKEN).map(SecretString::from),
            refresh_token: effective(REFRESH_TOKEN).map(SecretString::from),
            link_type: effective(LINK_TYPE),
            token_hash: effective(TOKEN_HASH).map(SecretString::from),
            present,
        }
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&SecretString> {
        self.access_token.as_ref()
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<&SecretString> {
        self.refresh_token.as_ref()
    }

    /// The link's own `type` hint (`signup`, `email`, ...); informational only.
    #[must_use]
    pub fn link_type(&self) -> Option<&str> {
        self.link_type.as_deref()
    }

    #[must_use]
    pub fn token_hash(&self) -> Option<&SecretString> {
        self.token_hash.as_ref()
    }

    /// Recognized keys that appeared in either source, even with an empty value.
    #[must_use]
    pub fn present_keys(&self) -> Vec<&'static str> {
        self.present.iter().copied().collect()
    }

    /// `true` when no recognized key appeared at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.present.is_empty()
    }
}

// URLSearchParams semantics: the first occurrence of a key wins.
fn first_values(raw: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        values
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }
    values
}
