//! Session module for BiteMatch
//!
//! Owns the active request lifecycle: one cancellable stream at a time,
//! follow-up chaining, history persistence, and the entitlement checks
//! that gate whether a request may start.

mod cancel;
mod controller;
mod stream;

pub use cancel::{CancelSource, CancelToken};
pub use controller::{
    FollowUpContext, FollowUpOutcome, RecommendationInput, Restored, SessionController, SessionState, SessionUpdate,
    SubmitOutcome,
};
