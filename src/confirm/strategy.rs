//! Strategy selection for a confirmation attempt.
//!
//! Strategies are tried in [`PRIORITY`] order and the first one whose
//! predicate holds produces the [`Plan`]. The ambient-session check always
//! applies, so selection is total.

use super::params::IncomingParameters;
use secrecy::SecretString;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// `access_token` + `refresh_token` are installed as a session.
    SessionInstall,
    /// `token_hash` is verified as an email OTP.
    OtpVerification,
    /// No usable tokens: look for a session that is already active.
    AmbientSession,
}

pub const PRIORITY: [Strategy; 3] = [
    Strategy::SessionInstall,
    Strategy::OtpVerification,
    Strategy::AmbientSession,
];

/// Provider work selected for one activation.
#[derive(Clone, Debug)]
pub enum Plan {
    InstallSession {
        access_token: SecretString,
        refresh_token: SecretString,
        /// Tried with OTP verification when the token pair is rejected.
        fallback_token_hash: Option<SecretString>,
    },
    VerifyOtp {
        token_hash: SecretString,
    },
    CheckAmbientSession {
        /// Whether any recognized key appeared, even without a usable value.
        link_parameters_present: bool,
    },
}

impl Plan {
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        match self {
            Self::InstallSession { .. } => Strategy::SessionInstall,
            Self::VerifyOtp { .. } => Strategy::OtpVerification,
            Self::CheckAmbientSession { .. } => Strategy::AmbientSession,
        }
    }
}

impl Strategy {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SessionInstall => "session_install",
            Self::OtpVerification => "otp_verification",
            Self::AmbientSession => "ambient_session",
        }
    }

    #[must_use]
    pub fn applies(self, params: &IncomingParameters) -> bool {
        match self {
            Self::SessionInstall => {
                params.access_token().is_some() && params.refresh_token().is_some()
            }
            Self::OtpVerification => params.token_hash().is_some(),
            Self::AmbientSession => true,
        }
    }

    /// The plan this strategy produces for `params`, or `None` if it does not apply.
    #[must_use]
    pub fn plan(self, params: &IncomingParameters) -> Option<Plan> {
        if !self.applies(params) {
            return None;
        }

        match self {
            Self::SessionInstall => Some(Plan::InstallSession {
                access_token: params.access_token()?.clone(),
                refresh_token: params.refresh_token()?.clone(),
                fallback_token_hash: params.token_hash().cloned(),
            }),
            Self::OtpVerification => Some(Plan::VerifyOtp {
                token_hash: params.token_hash()?.clone(),
            }),
            Self::AmbientSession => Some(ambient_plan(params)),
        }
    }
}

/// Pick the plan for `params`: first applicable strategy in [`PRIORITY`] order.
#[must_use]
pub fn select(params: &IncomingParameters) -> Plan {
    PRIORITY
        .into_iter()
        .find_map(|strategy| strategy.plan(params))
        .unwrap_or_else(|| ambient_plan(params))
}

fn ambient_plan(params: &IncomingParameters) -> Plan {
    Plan::CheckAmbientSession {
        link_parameters_present: !params.is_empty(),
    }
}
