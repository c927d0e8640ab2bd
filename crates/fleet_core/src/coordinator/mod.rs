//! Coordinators apply batches of external commands to the world between ticks.
//!
//! - [`matching`]: quote proposals, negotiate prices and match vehicles to customers.
//! - [`dispatch`]: send vehicles off duty or to a new location.
//!
//! Commands that name an unknown vehicle or customer are skipped and reported in
//! the outcome; invariant violations abort the call with a [`SimError`].

pub mod dispatch;
pub mod matching;

pub use dispatch::{dispatch_vehicles, DispatchAction, DispatchCommand, DispatchOutcome};
pub use matching::{match_vehicles, quote_proposals, MatchCommand, MatchOutcome, MatchProposal};

use crate::error::{SimError, SimResult};

pub(crate) fn require<T>(resource: Option<T>, name: &'static str) -> SimResult<T> {
    resource.ok_or(SimError::MissingResource(name))
}
