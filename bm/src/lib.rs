//! BiteMatch - AI food portioning and pairing advisor
//!
//! The user describes (or photographs) what is on their plate, asks a
//! question, and a recommendation streams back from the AI provider. A
//! freemium layer gates how much of that a device may use: a 14-day
//! unlimited trial, then daily request and follow-up ceilings until the
//! user subscribes.
//!
//! # Core pieces
//!
//! - [`entitlement`] - the freemium state machine: trial, ceilings, gates
//! - [`session`] - request lifecycle, cancellation, follow-up chaining
//! - [`provider`] - streaming AI client behind a provider trait
//! - [`parser`] - savings-segment extraction from completed responses
//! - [`history`] - bounded log of completed recommendations
//! - [`config`] - configuration types and loading
//! - [`repl`] - the interactive surface

pub mod cli;
pub mod config;
pub mod entitlement;
pub mod export;
pub mod history;
pub mod image;
pub mod keys;
pub mod parser;
pub mod prefs;
pub mod prompt;
pub mod provider;
pub mod repl;
pub mod session;
pub mod subscription;

// Re-export commonly used types
pub use config::{Config, LimitsConfig, ProviderConfig};
pub use entitlement::{Clock, EntitlementEngine, Limit, SystemClock, Tier, TrialStatus};
pub use history::{FoodItem, HistoryEntry, HistoryLog};
pub use parser::{ParsedResponse, parse_response};
pub use prompt::FollowUpKind;
pub use provider::{GeminiClient, GenerateRequest, ProviderClient, ProviderError, StreamChunk};
pub use session::{
    CancelSource, CancelToken, FollowUpOutcome, RecommendationInput, SessionController, SessionState, SessionUpdate,
    SubmitOutcome,
};
pub use subscription::{PaymentProvider, PlanPeriod, SimulatedPaymentProvider, SubscriptionService};
