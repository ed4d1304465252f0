//! Email confirmation state machine.
//!
//! [`IncomingParameters`] are parsed once from the link, [`strategy::select`]
//! picks exactly one plan, the [`Resolver`] runs it against an
//! [`IdentityProvider`](crate::provider::IdentityProvider) and a
//! [`ConfirmationPage`] turns the outcome into UI state plus a delayed
//! redirect.

pub mod classify;
pub mod navigation;
pub mod outcome;
pub mod page;
pub mod params;
pub mod resolver;
pub mod strategy;

pub use classify::{ErrorKind, Failure, Recovery};
pub use navigation::{LogNavigator, NavigationPlan, NavigationTimer, Navigator};
pub use outcome::{ConfirmedVia, ReconciliationOutcome, ResolverState, TransitionError};
pub use page::ConfirmationPage;
pub use params::{IncomingParameters, ParameterError};
pub use resolver::{Resolution, Resolver, ResolverConfig};
pub use strategy::{Plan, Strategy};
