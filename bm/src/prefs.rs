//! User preferences and one-shot flags

use bitestore::{Store, load_json, save_json};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::keys;

/// Privacy preferences, both opt-outs defaulting to sharing nothing extra
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivacyPrefs {
    /// Allow anonymous usage analytics
    pub allow_analytics: bool,
    /// Allow recommendation personalization from history
    pub allow_personalization: bool,
}

/// Load the stored privacy preferences; corrupt or missing means defaults
pub fn privacy_prefs(store: &dyn Store) -> PrivacyPrefs {
    load_json(store, keys::PRIVACY).unwrap_or_default()
}

/// Persist the privacy preferences
pub fn set_privacy_prefs(store: &dyn Store, prefs: PrivacyPrefs) {
    debug!(?prefs, "set_privacy_prefs: called");
    save_json(store, keys::PRIVACY, &prefs);
}

/// Has the user been through the welcome screen?
pub fn welcome_seen(store: &dyn Store) -> bool {
    load_json(store, keys::WELCOME_SEEN).unwrap_or(false)
}

/// Mark the welcome screen as seen
pub fn mark_welcome_seen(store: &dyn Store) {
    debug!("mark_welcome_seen: called");
    save_json(store, keys::WELCOME_SEEN, &true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitestore::MemoryStore;

    #[test]
    fn test_privacy_prefs_default_to_opted_out() {
        let store = MemoryStore::new();
        let prefs = privacy_prefs(&store);
        assert!(!prefs.allow_analytics);
        assert!(!prefs.allow_personalization);
    }

    #[test]
    fn test_privacy_prefs_roundtrip() {
        let store = MemoryStore::new();
        set_privacy_prefs(
            &store,
            PrivacyPrefs {
                allow_analytics: true,
                allow_personalization: false,
            },
        );

        let prefs = privacy_prefs(&store);
        assert!(prefs.allow_analytics);
        assert!(!prefs.allow_personalization);
    }

    #[test]
    fn test_corrupt_prefs_fall_back_to_default() {
        let store = MemoryStore::new();
        store.set(keys::PRIVACY, "not json at all");
        assert_eq!(privacy_prefs(&store), PrivacyPrefs::default());
    }

    #[test]
    fn test_welcome_flag() {
        let store = MemoryStore::new();
        assert!(!welcome_seen(&store));

        mark_welcome_seen(&store);
        assert!(welcome_seen(&store));
    }
}
