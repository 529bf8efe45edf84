//! The freemium entitlement engine
//!
//! Owns the persisted usage record and answers every gating question the
//! session controller asks. The engine never returns errors: a corrupt
//! record falls back to a fresh initialization, and ceiling violations
//! are boolean gate results that redirect to the upgrade flow.

use std::sync::Arc;

use bitestore::{Store, load_json, save_json};
use tracing::{debug, info};

use super::clock::Clock;
use super::state::{Access, Feature, Limit, Tier, TrialSavings, TrialStatus, UsageState, VibeAddOutcome};
use crate::config::LimitsConfig;
use crate::keys;

/// Estimated savings per recommended portion, in currency units
const AVG_SAVINGS_PER_MEAL: f64 = 0.75;

/// Estimated waste prevented per recommended portion, in ounces
const AVG_WASTE_PREVENTED_OZ: f64 = 0.8;

/// Custom vibe constraints
const MAX_CUSTOM_VIBES: usize = 5;
const MAX_VIBE_LEN: usize = 20;

pub struct EntitlementEngine {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    limits: LimitsConfig,
    state: UsageState,
}

impl EntitlementEngine {
    /// Load the persisted record, or initialize a fresh trial if there is
    /// none (or it is corrupt). Call [`refresh`](Self::refresh) afterwards
    /// to rederive the time-dependent fields.
    pub fn load(store: Arc<dyn Store>, clock: Arc<dyn Clock>, limits: LimitsConfig) -> Self {
        debug!("load: called");
        match load_json::<UsageState>(store.as_ref(), keys::USAGE) {
            Some(state) => {
                debug!("load: adopted persisted record");
                Self {
                    store,
                    clock,
                    limits,
                    state,
                }
            }
            None => {
                info!("load: no usable record, starting a fresh trial");
                let state = fresh_state(clock.as_ref(), &limits);
                let engine = Self {
                    store,
                    clock,
                    limits,
                    state,
                };
                engine.persist();
                engine
            }
        }
    }

    /// Start a fresh trial record and persist it
    ///
    /// `trial_ends_at` is fixed here and never recomputed afterwards.
    pub fn initialize(&mut self) {
        debug!("initialize: called");
        self.state = fresh_state(self.clock.as_ref(), &self.limits);
        self.persist();
    }

    /// Rederive the time-dependent fields from the clock
    ///
    /// Zeroes `used_today` when the wall clock has crossed the reset
    /// boundary, recomputes trial membership and the ceilings, and
    /// returns whether the one-time "trial ended" notice should be shown.
    /// Idempotent at a fixed instant.
    pub fn refresh(&mut self) -> bool {
        let now = self.clock.now();
        debug!(%now, "refresh: called");

        if now >= self.state.reset_time {
            debug!("refresh: crossed reset boundary, zeroing daily usage");
            self.state.used_today = 0;
            self.state.reset_time = self.clock.next_midnight();
        }

        let mut show_trial_end_notice = false;
        match self.state.trial_ends_at {
            Some(ends_at) => {
                let active = now < ends_at;
                self.state.days_left_in_trial = if active {
                    let secs = (ends_at - now).num_seconds();
                    ((secs + 86_399) / 86_400) as u32
                } else {
                    0
                };

                if !active
                    && !self.state.has_seen_trial_end_modal
                    && !self.state.is_premium
                    && !self.state.is_pro_tier
                {
                    debug!("refresh: trial over, notice not yet seen");
                    show_trial_end_notice = true;
                }

                self.state.is_in_trial = active;
            }
            None => {
                self.state.is_in_trial = false;
                self.state.days_left_in_trial = 0;
            }
        }

        let ceiling = |unlimited: bool, cap: u32| {
            if unlimited { Limit::UNLIMITED } else { Limit::limited(cap) }
        };
        let unlimited = self.unlimited_access();
        self.state.daily_limit = ceiling(unlimited, self.limits.post_trial_daily_limit);
        self.state.history_limit = ceiling(unlimited, self.limits.free_history_limit);
        self.state.follow_up_limit = ceiling(unlimited, self.limits.free_follow_up_limit);

        self.persist();
        show_trial_end_notice
    }

    /// True while trial, premium, or pro collapses every ceiling to unlimited
    fn unlimited_access(&self) -> bool {
        self.state.is_in_trial || self.state.is_premium || self.state.is_pro_tier
    }

    fn access(&self) -> Access {
        Access {
            trial: self.state.is_in_trial,
            premium: self.state.is_premium,
            pro: self.state.is_pro_tier,
        }
    }

    /// May a primary recommendation request start right now?
    pub fn can_start_request(&self) -> bool {
        self.unlimited_access() || self.state.daily_limit.allows(self.state.used_today)
    }

    /// Record one consumed request
    ///
    /// A no-op returning true under unlimited access. Otherwise rechecks
    /// the ceiling itself (the caller should already have consulted
    /// [`can_start_request`](Self::can_start_request)) and returns false
    /// at the cap without counting.
    pub fn record_usage(&mut self) -> bool {
        debug!(used = self.state.used_today, "record_usage: called");
        if self.unlimited_access() {
            return true;
        }
        if !self.state.daily_limit.allows(self.state.used_today) {
            debug!("record_usage: at ceiling");
            return false;
        }
        self.state.used_today += 1;
        self.persist();
        true
    }

    /// May another follow-up start, given how many this session has used?
    pub fn can_follow_up(&self, follow_ups_this_session: u32) -> bool {
        self.unlimited_access() || self.state.follow_up_limit.allows(follow_ups_this_session)
    }

    /// Upgrade to a paid tier; the trial is forfeited on upgrade
    pub fn upgrade(&mut self, tier: Tier) {
        info!(?tier, "upgrade: called");
        self.state.is_premium = true;
        self.state.is_pro_tier = tier == Tier::Pro;
        self.state.is_in_trial = false;
        self.state.daily_limit = Limit::UNLIMITED;
        self.state.history_limit = Limit::UNLIMITED;
        self.state.follow_up_limit = Limit::UNLIMITED;
        self.persist();
    }

    pub fn can_use_cost_savings(&self) -> bool {
        Feature::CostSavings.allowed(self.access())
    }

    pub fn can_export_recipes(&self) -> bool {
        Feature::RecipeExport.allowed(self.access())
    }

    pub fn can_use_meal_planning(&self) -> bool {
        Feature::MealPlanning.allowed(self.access())
    }

    pub fn can_use_custom_vibes(&self) -> bool {
        Feature::CustomVibes.allowed(self.access())
    }

    /// The history ceiling as it applies right now
    pub fn history_limit(&self) -> Limit {
        if self.unlimited_access() {
            Limit::UNLIMITED
        } else {
            self.state.history_limit
        }
    }

    /// Requests left today; `None` means unlimited
    pub fn remaining_requests(&self) -> Option<u32> {
        if self.unlimited_access() {
            None
        } else {
            self.state.daily_limit.remaining(self.state.used_today)
        }
    }

    /// What the trial banner should say
    pub fn trial_status(&self) -> TrialStatus {
        if self.state.is_premium || self.state.is_pro_tier {
            return TrialStatus::Premium;
        }
        match (self.state.is_in_trial, self.state.trial_ends_at) {
            (true, Some(ends_at)) => TrialStatus::Trial {
                days_left: self.state.days_left_in_trial,
                ends_at,
            },
            _ => TrialStatus::Free,
        }
    }

    /// Estimate savings accrued over the persisted history
    ///
    /// An approximation: history count times fixed per-meal constants. A
    /// corrupt history value falls back to a default estimate of 5.
    pub fn estimate_trial_savings(&self) -> TrialSavings {
        let total_recommendations = match self.store.get(keys::HISTORY) {
            None => 0,
            Some(raw) => match serde_json::from_str::<serde_json::Value>(&raw) {
                Ok(value) => value.as_array().map(|a| a.len()).unwrap_or(0),
                Err(_) => 5,
            },
        };

        TrialSavings {
            total_saved: total_recommendations as f64 * AVG_SAVINGS_PER_MEAL,
            waste_prevented_oz: total_recommendations as f64 * AVG_WASTE_PREVENTED_OZ,
            total_recommendations,
        }
    }

    /// Mark the one-time trial-end notice as seen
    pub fn mark_trial_notice_seen(&mut self) {
        debug!("mark_trial_notice_seen: called");
        self.state.has_seen_trial_end_modal = true;
        self.persist();
    }

    /// Add a user-defined vibe label
    pub fn add_custom_vibe(&mut self, label: &str) -> VibeAddOutcome {
        let label = label.trim();
        debug!(%label, "add_custom_vibe: called");

        if !self.can_use_custom_vibes() {
            return VibeAddOutcome::UpgradeRequired;
        }
        if label.is_empty() {
            return VibeAddOutcome::Blank;
        }
        if label.chars().count() > MAX_VIBE_LEN {
            return VibeAddOutcome::TooLong;
        }
        if self.state.custom_vibes.len() >= MAX_CUSTOM_VIBES {
            return VibeAddOutcome::AtCapacity;
        }
        if self
            .state
            .custom_vibes
            .iter()
            .any(|v| v.eq_ignore_ascii_case(label))
        {
            return VibeAddOutcome::Duplicate;
        }

        self.state.custom_vibes.push(label.to_string());
        self.persist();
        VibeAddOutcome::Added
    }

    /// Remove a user-defined vibe label, if present
    pub fn remove_custom_vibe(&mut self, label: &str) {
        debug!(%label, "remove_custom_vibe: called");
        let before = self.state.custom_vibes.len();
        self.state.custom_vibes.retain(|v| !v.eq_ignore_ascii_case(label));
        if self.state.custom_vibes.len() != before {
            self.persist();
        }
    }

    /// Read access to the current record (banners, status output)
    pub fn state(&self) -> &UsageState {
        &self.state
    }

    fn persist(&self) {
        save_json(self.store.as_ref(), keys::USAGE, &self.state);
    }
}

/// A brand-new trial record anchored at the clock's current instant
fn fresh_state(clock: &dyn Clock, limits: &LimitsConfig) -> UsageState {
    let now = clock.now();
    UsageState {
        used_today: 0,
        daily_limit: Limit::UNLIMITED,
        is_premium: false,
        is_pro_tier: false,
        is_in_trial: true,
        trial_ends_at: Some(now + chrono::Duration::days(i64::from(limits.trial_days))),
        days_left_in_trial: limits.trial_days,
        reset_time: clock.next_midnight(),
        history_limit: Limit::UNLIMITED,
        follow_up_limit: Limit::UNLIMITED,
        custom_vibes: Vec::new(),
        has_seen_trial_end_modal: false,
    }
}
