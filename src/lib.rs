//! # Confirmer (Email Confirmation Resolver)
//!
//! `confirmer` turns the parameters of an email confirmation link into a
//! verified session against an external identity provider.
//!
//! ## Confirmation Flow
//!
//! A confirmation link reaches the application in one of three shapes:
//!
//! - **Token pair:** `access_token` + `refresh_token`, usually in the URL fragment.
//!   The session is installed directly; a `token_hash` carried alongside is used
//!   as a fallback when the pair is stale.
//! - **Token hash:** a single-use `token_hash` verified as an email OTP.
//! - **Nothing:** the user opened the page directly or already confirmed in
//!   another tab, so only an ambient session can prove confirmation.
//!
//! Query-string values win over fragment values. Every failure is classified
//! into a user-facing message with recovery actions; nothing is retried
//! automatically.
//!
//! ## Surfaces
//!
//! - [`confirm`] holds the state machine and is usable as a plain library with
//!   any [`provider::IdentityProvider`].
//! - [`api`] exposes the resolver over HTTP (`POST /v1/confirmations`).
//! - [`cli`] wires both into the `confirmer` binary.

pub mod api;
pub mod cli;
pub mod confirm;
pub mod provider;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
