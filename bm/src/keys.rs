//! Persisted key namespace
//!
//! One key per record; every value is JSON. Corrupt values are treated
//! as absent by the readers, never as fatal.

/// Entitlement record ([`crate::entitlement::UsageState`])
pub const USAGE: &str = "bitematch-usage";

/// Recommendation history (bounded array, newest-first)
pub const HISTORY: &str = "bitematch-history";

/// Subscription status record
pub const SUBSCRIPTION: &str = "bitematch-subscription";

/// Privacy preferences
pub const PRIVACY: &str = "bitematch-privacy";

/// One-shot "seen the welcome screen" flag
pub const WELCOME_SEEN: &str = "bitematch-welcome-seen";
