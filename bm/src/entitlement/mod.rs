//! Entitlement module for BiteMatch
//!
//! Computes and mutates the freemium/trial/premium state that decides
//! whether a recommendation request may start. Pure functions over a
//! persisted record plus an injected clock - no network, never errors.

mod clock;
mod engine;
mod state;

pub use clock::{Clock, SystemClock};
pub use engine::EntitlementEngine;
pub use state::{Access, Feature, Limit, Tier, TrialSavings, TrialStatus, UsageState, VibeAddOutcome};

#[cfg(test)]
pub use clock::fixed::FixedClock;
