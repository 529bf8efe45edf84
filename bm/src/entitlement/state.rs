//! Entitlement state record and supporting types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A consumption ceiling: a count, or unlimited
///
/// Unlimited serializes as `null`, matching the record's historical wire
/// format where an unbounded ceiling has no numeric representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Limit(pub Option<u32>);

impl Limit {
    pub const UNLIMITED: Limit = Limit(None);

    pub fn limited(n: u32) -> Self {
        Limit(Some(n))
    }

    pub fn is_unlimited(&self) -> bool {
        self.0.is_none()
    }

    /// True if one more unit may be consumed given `used` so far
    pub fn allows(&self, used: u32) -> bool {
        match self.0 {
            None => true,
            Some(cap) => used < cap,
        }
    }

    /// Units left given `used` so far; `None` means unlimited
    pub fn remaining(&self, used: u32) -> Option<u32> {
        self.0.map(|cap| cap.saturating_sub(used))
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            None => write!(f, "unlimited"),
            Some(cap) => write!(f, "{cap}"),
        }
    }
}

/// Paid tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Premium,
    Pro,
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "premium" => Ok(Tier::Premium),
            "pro" => Ok(Tier::Pro),
            other => Err(format!("unknown tier '{other}' (expected: premium, pro)")),
        }
    }
}

/// What level of access the user currently has
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub trial: bool,
    pub premium: bool,
    pub pro: bool,
}

/// Gated features
///
/// Tiers do not form a strict ladder for every feature, so each feature
/// names its policy explicitly instead of comparing tier ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    CostSavings,
    RecipeExport,
    CustomVibes,
    MealPlanning,
}

impl Feature {
    /// Per-feature policy table
    pub fn allowed(&self, access: Access) -> bool {
        match self {
            Feature::CostSavings => access.trial || access.premium || access.pro,
            Feature::RecipeExport => access.trial || access.premium || access.pro,
            Feature::CustomVibes => access.trial || access.premium || access.pro,
            // Meal planning is a pro feature; premium alone does not unlock it.
            Feature::MealPlanning => access.trial || access.pro,
        }
    }
}

/// What the trial banner should say
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrialStatus {
    /// Premium or pro - no distinct "pro" status is surfaced
    Premium,
    /// Active trial with days remaining
    Trial { days_left: u32, ends_at: DateTime<Utc> },
    /// Trial over, not subscribed
    Free,
}

/// Estimated savings accrued over the persisted history
///
/// An approximation from fixed per-meal constants, not metered truth.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSavings {
    pub total_saved: f64,
    pub waste_prevented_oz: f64,
    pub total_recommendations: usize,
}

/// Outcome of attempting to add a custom vibe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VibeAddOutcome {
    Added,
    /// Gate closed - redirect to the upgrade flow, not an error
    UpgradeRequired,
    Blank,
    TooLong,
    AtCapacity,
    Duplicate,
}

/// The persisted entitlement record - sole source of truth for gating
///
/// `is_in_trial` is rederived from `trial_ends_at` on every refresh and
/// never trusted as stored truth alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageState {
    pub used_today: u32,
    pub daily_limit: Limit,
    pub is_premium: bool,
    pub is_pro_tier: bool,
    pub is_in_trial: bool,
    pub trial_ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub days_left_in_trial: u32,
    pub reset_time: DateTime<Utc>,
    pub history_limit: Limit,
    pub follow_up_limit: Limit,
    #[serde(default)]
    pub custom_vibes: Vec<String>,
    #[serde(default)]
    pub has_seen_trial_end_modal: bool,
}
