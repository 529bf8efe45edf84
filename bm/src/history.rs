//! Recommendation history
//!
//! A bounded, newest-first log of completed recommendations. Entries are
//! created on successful completion, mutated only by restore (which bumps
//! the use count), and destroyed only by bulk clear.

use std::sync::Arc;

use bitestore::{Store, load_json, save_json};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entitlement::Limit;
use crate::keys;

/// Hard cap on stored entries; the oldest is evicted on overflow
pub const HISTORY_CAP: usize = 10;

/// One named item on the plate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodItem {
    pub id: i64,
    pub name: String,
}

impl FoodItem {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

/// A completed recommendation as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Creation timestamp in milliseconds, made strictly monotonic
    pub id: i64,
    /// Data-URI of the photo, owned exclusively by this entry
    pub image_preview: Option<String>,
    /// Only non-blank names are retained on save
    pub food_items: Vec<FoodItem>,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibe: Option<String>,
    /// Main recommendation text only; the savings segment is excluded
    pub result: String,
    /// Times this entry was restored into the active session
    #[serde(default = "default_use_count")]
    pub use_count: u32,
}

fn default_use_count() -> u32 {
    1
}

/// The persisted history log
pub struct HistoryLog {
    store: Arc<dyn Store>,
    /// Newest first
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    /// Load the persisted log; corrupt or missing data yields an empty log
    pub fn load(store: Arc<dyn Store>) -> Self {
        debug!("load: called");
        let mut entries: Vec<HistoryEntry> = load_json(store.as_ref(), keys::HISTORY).unwrap_or_default();

        // Old records may predate use counting
        for entry in &mut entries {
            if entry.use_count == 0 {
                entry.use_count = 1;
            }
        }

        Self { store, entries }
    }

    /// Allocate an id for an entry created at `now_ms`
    ///
    /// Millisecond timestamps collide when two entries land in the same
    /// millisecond; bumping past the newest existing id keeps ids strictly
    /// monotonic so "oldest" is always "lowest id".
    fn next_id(&self, now_ms: i64) -> i64 {
        match self.entries.iter().map(|e| e.id).max() {
            Some(max) if now_ms <= max => max + 1,
            _ => now_ms,
        }
    }

    /// Record a completed recommendation, evicting the oldest on overflow
    ///
    /// Blank food names are dropped; `result` is the parsed main text.
    pub fn record(
        &mut self,
        now_ms: i64,
        image_preview: Option<String>,
        food_items: Vec<FoodItem>,
        prompt: String,
        vibe: Option<String>,
        result: String,
    ) -> i64 {
        let id = self.next_id(now_ms);
        debug!(%id, "record: called");

        let food_items: Vec<FoodItem> = food_items.into_iter().filter(|i| !i.name.trim().is_empty()).collect();

        self.entries.insert(
            0,
            HistoryEntry {
                id,
                image_preview,
                food_items,
                prompt,
                vibe,
                result,
                use_count: 1,
            },
        );

        if self.entries.len() > HISTORY_CAP
            && let Some(evicted) = self.entries.pop()
        {
            debug!(evicted_id = evicted.id, "record: evicted oldest entry");
        }

        self.persist();
        id
    }

    /// Bump an entry's use count and return a copy of it
    pub fn restore(&mut self, id: i64) -> Option<HistoryEntry> {
        debug!(%id, "restore: called");
        let entry = self.entries.iter_mut().find(|e| e.id == id)?;
        entry.use_count += 1;
        let copy = entry.clone();
        self.persist();
        Some(copy)
    }

    /// Wipe all entries
    pub fn clear(&mut self) {
        debug!("clear: called");
        self.entries.clear();
        self.store.remove(keys::HISTORY);
    }

    /// All stored entries, newest first
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries as displayed: the newest up to the tier ceiling, most-used first
    pub fn visible(&self, limit: Limit) -> Vec<&HistoryEntry> {
        let take = match limit.0 {
            None => self.entries.len(),
            Some(cap) => (cap as usize).min(self.entries.len()),
        };
        let mut shown: Vec<&HistoryEntry> = self.entries[..take].iter().collect();
        shown.sort_by(|a, b| b.use_count.cmp(&a.use_count));
        shown
    }

    fn persist(&self) {
        save_json(self.store.as_ref(), keys::HISTORY, &self.entries);
    }
}
