//! Failure taxonomy and the rules that map provider errors onto it.
//!
//! Provider wording is an unstable contract, so the substring rules live in a
//! single pure function, [`classify_message`]. When a provider sends a
//! machine-readable code, [`classify_code`] is consulted first.

use crate::provider::ProviderError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const REFRESH_TOKEN_REJECTED: &str =
    "This confirmation link has expired or is invalid. Please sign up again.";
pub const LINK_EXPIRED: &str =
    "This confirmation link has expired. Please sign up again to receive a new link.";
pub const LINK_INVALID: &str =
    "This confirmation link is invalid. Please click the link in your email again.";
pub const SESSION_CHECK_FAILED: &str = "Unable to verify your current session. Please try again.";
pub const PROVIDER_TIMEOUT: &str =
    "The sign-in service did not respond in time. Please try again in a moment.";
pub const EMAIL_NOT_CONFIRMED: &str = "Your email has not been confirmed yet. Please check your inbox for the confirmation link.";
pub const LINK_REQUIRED: &str =
    "This page can only be reached through the confirmation link sent to your email.";
pub const LINK_MISSING_PARAMETERS: &str =
    "Invalid confirmation link: required parameters are missing.";
pub const CONFIRMATION_INCOMPLETE: &str = "Email confirmation could not be completed.";
pub const UNEXPECTED: &str = "Something went wrong while confirming your email. Please try again or contact support.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ExpiredOrInvalidToken,
    MalformedLink,
    NoAccessContext,
    ProviderUnavailable,
    IncompleteConfirmation,
    /// The provider rejected the link for a reason no rule recognizes.
    ConfirmationRejected,
    Unexpected,
}

/// What the user can do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    SignUpAgain,
    ReopenEmailLink,
    CheckInbox,
    LogIn,
    Retry,
    ContactSupport,
}

/// Terminal, user-facing failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
    pub recovery: &'static [Recovery],
}

impl Failure {
    fn new(kind: ErrorKind, message: impl Into<String>, recovery: &'static [Recovery]) -> Self {
        Self {
            kind,
            message: message.into(),
            recovery,
        }
    }

    #[must_use]
    pub fn refresh_token_rejected() -> Self {
        Self::new(
            ErrorKind::ExpiredOrInvalidToken,
            REFRESH_TOKEN_REJECTED,
            &[Recovery::SignUpAgain],
        )
    }

    #[must_use]
    pub fn link_expired() -> Self {
        Self::new(
            ErrorKind::ExpiredOrInvalidToken,
            LINK_EXPIRED,
            &[Recovery::SignUpAgain],
        )
    }

    #[must_use]
    pub fn link_invalid() -> Self {
        Self::new(
            ErrorKind::ExpiredOrInvalidToken,
            LINK_INVALID,
            &[Recovery::ReopenEmailLink, Recovery::SignUpAgain],
        )
    }

    #[must_use]
    pub fn rejected(original: &str) -> Self {
        Self::new(
            ErrorKind::ConfirmationRejected,
            format!("Email confirmation failed: {original}. Please try signing up again."),
            &[Recovery::SignUpAgain],
        )
    }

    #[must_use]
    pub fn session_check_failed() -> Self {
        Self::new(
            ErrorKind::ProviderUnavailable,
            SESSION_CHECK_FAILED,
            &[Recovery::Retry, Recovery::LogIn],
        )
    }

    #[must_use]
    pub fn provider_timeout() -> Self {
        Self::new(
            ErrorKind::ProviderUnavailable,
            PROVIDER_TIMEOUT,
            &[Recovery::Retry],
        )
    }

    #[must_use]
    pub fn email_not_confirmed() -> Self {
        Self::new(
            ErrorKind::IncompleteConfirmation,
            EMAIL_NOT_CONFIRMED,
            &[Recovery::CheckInbox],
        )
    }

    #[must_use]
    pub fn confirmation_incomplete() -> Self {
        Self::new(
            ErrorKind::IncompleteConfirmation,
            CONFIRMATION_INCOMPLETE,
            &[Recovery::SignUpAgain, Recovery::LogIn],
        )
    }

    #[must_use]
    pub fn link_required() -> Self {
        Self::new(
            ErrorKind::NoAccessContext,
            LINK_REQUIRED,
            &[Recovery::LogIn, Recovery::SignUpAgain],
        )
    }

    #[must_use]
    pub fn link_missing_parameters() -> Self {
        Self::new(
            ErrorKind::MalformedLink,
            LINK_MISSING_PARAMETERS,
            &[Recovery::ReopenEmailLink, Recovery::SignUpAgain],
        )
    }

    #[must_use]
    pub fn unexpected() -> Self {
        Self::new(
            ErrorKind::Unexpected,
            UNEXPECTED,
            &[Recovery::Retry, Recovery::ContactSupport],
        )
    }
}

#[derive(Clone, Copy)]
enum Rule {
    RefreshTokenRejected,
    Expired,
    Invalid,
}

impl Rule {
    fn failure(self) -> Failure {
        match self {
            Self::RefreshTokenRejected => Failure::refresh_token_rejected(),
            Self::Expired => Failure::link_expired(),
            Self::Invalid => Failure::link_invalid(),
        }
    }
}

// Case-sensitive; evaluated top to bottom, first match wins.
const MESSAGE_RULES: [(&[&str], Rule); 3] = [
    (
        &["Invalid Refresh Token", "Refresh Token Not Found"],
        Rule::RefreshTokenRejected,
    ),
    (&["expired"], Rule::Expired),
    (&["invalid"], Rule::Invalid),
];

const CODE_RULES: [(&str, Rule); 5] = [
    ("refresh_token_not_found", Rule::RefreshTokenRejected),
    ("refresh_token_already_used", Rule::RefreshTokenRejected),
    ("otp_expired", Rule::Expired),
    ("bad_jwt", Rule::Invalid),
    ("validation_failed", Rule::Invalid),
];

/// Map a provider error message onto a failure.
#[must_use]
pub fn classify_message(message: &str) -> Failure {
    MESSAGE_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| message.contains(needle)))
        .map_or_else(|| Failure::rejected(message), |(_, rule)| rule.failure())
}

/// Map a structured provider error code onto a failure; `None` for unknown codes.
#[must_use]
pub fn classify_code(code: &str) -> Option<Failure> {
    CODE_RULES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, rule)| rule.failure())
}

/// Classify a failed token exchange (session install or OTP verification).
#[must_use]
pub fn classify_provider_error(err: &ProviderError) -> Failure {
    match err {
        ProviderError::Timeout(_) => Failure::provider_timeout(),
        ProviderError::Decode(_) => Failure::unexpected(),
        ProviderError::Api { code, message, .. } => code
            .as_deref()
            .and_then(classify_code)
            .unwrap_or_else(|| classify_message(message)),
        ProviderError::Transport(message) => classify_message(message),
    }
}
