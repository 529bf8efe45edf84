//! The session controller - top-level orchestrator
//!
//! Owns one recommendation session: the active stream (at most one), the
//! accumulated display text, follow-up chaining, and the commit work on
//! completion (usage counting, savings parsing, history persistence).
//! All user-facing error text is decided here; lower layers hand up raw
//! descriptions.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::cancel::CancelSource;
use super::stream::{SessionEvent, spawn_stream};
use crate::entitlement::{Clock, EntitlementEngine};
use crate::history::{FoodItem, HistoryLog};
use crate::image::{self, ImageFile};
use crate::parser::parse_response;
use crate::prompt::{self, FollowUpKind};
use crate::provider::{GenerateRequest, ProviderClient};

/// Everything the user has staged for a primary request
#[derive(Debug, Clone, Default)]
pub struct RecommendationInput {
    pub food_items: Vec<FoodItem>,
    pub prompt: String,
    pub vibe: Option<String>,
    pub image: Option<ImageFile>,
}

impl RecommendationInput {
    /// The non-blank item names, trimmed, in order
    pub fn named_items(&self) -> Vec<String> {
        self.food_items
            .iter()
            .map(|i| i.name.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect()
    }

    /// Submit-eligible: a non-blank question, a named item, or a photo
    pub fn is_submit_eligible(&self) -> bool {
        !self.prompt.trim().is_empty() || !self.named_items().is_empty() || self.image.is_some()
    }
}

/// Context armed after a primary completes, consumed by a follow-up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUpContext {
    pub food_items: Vec<String>,
    pub prompt: String,
    pub result: String,
    pub vibe: Option<String>,
}

/// Where the session currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Submitting,
    Streaming,
    Completed,
    FollowUpStreaming,
    Error,
}

/// Result of asking to start a primary request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Started,
    /// Entitlement ceiling reached - redirect to the upgrade flow
    UpgradeRequired,
    /// Nothing to ask about yet - no request is issued
    InputIncomplete,
}

/// Result of asking to start a follow-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUpOutcome {
    Started,
    /// Follow-up ceiling reached - redirect to the upgrade flow
    UpgradeRequired,
    /// No armed context, or a request is already in flight
    NotReady,
}

/// An applied update the caller should reflect in the display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// Text fragment appended to the display buffer
    Chunk(String),
    /// Primary finished; savings segment split out if present
    PrimaryCompleted { savings: Option<String> },
    /// Follow-up finished
    FollowUpCompleted,
    /// The stream failed; the message is already user-facing
    Failed(String),
}

/// A history entry turned back into staged input
#[derive(Debug, Clone)]
pub struct Restored {
    pub input: RecommendationInput,
    /// Set when the stored photo could not be revived; the image is
    /// rolled back and the session continues without one
    pub image_warning: Option<String>,
}

pub struct SessionController {
    provider: Arc<dyn ProviderClient>,
    engine: EntitlementEngine,
    history: HistoryLog,
    clock: Arc<dyn Clock>,
    max_output_tokens: u32,

    cancel: CancelSource,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,

    state: SessionState,
    display: String,
    savings: Option<String>,
    follow_up_context: Option<FollowUpContext>,
    follow_up_count: u32,
    last_error: Option<String>,

    /// Input of the in-flight primary, needed to commit on completion
    pending_primary: Option<RecommendationInput>,
    /// Context of the in-flight follow-up, re-armed on success
    pending_follow_up: Option<FollowUpContext>,
}

impl SessionController {
    pub fn new(
        provider: Arc<dyn ProviderClient>,
        engine: EntitlementEngine,
        history: HistoryLog,
        clock: Arc<dyn Clock>,
        max_output_tokens: u32,
    ) -> Self {
        debug!("new: called");
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            provider,
            engine,
            history,
            clock,
            max_output_tokens,
            cancel: CancelSource::new(),
            events_tx,
            events_rx,
            state: SessionState::Idle,
            display: String::new(),
            savings: None,
            follow_up_context: None,
            follow_up_count: 0,
            last_error: None,
            pending_primary: None,
            pending_follow_up: None,
        }
    }

    /// Start a primary recommendation request
    ///
    /// Validates the input, consults the entitlement engine, cancels any
    /// stream still in flight, and spawns the new one. The caller then
    /// pumps [`next_update`](Self::next_update) until a terminal update.
    pub fn submit(&mut self, input: RecommendationInput) -> SubmitOutcome {
        debug!(state = ?self.state, "submit: called");

        if !input.is_submit_eligible() {
            debug!("submit: input incomplete, no request issued");
            return SubmitOutcome::InputIncomplete;
        }

        if !self.engine.can_start_request() {
            info!("submit: daily ceiling reached, redirecting to upgrade");
            return SubmitOutcome::UpgradeRequired;
        }

        // Cancel any previous stream - defensive even when idle.
        let token = self.cancel.issue();
        self.state = SessionState::Submitting;
        self.display.clear();
        self.savings = None;
        self.follow_up_context = None;
        self.pending_follow_up = None;
        self.last_error = None;

        let named = input.named_items();
        let prompt_text = prompt::compose_primary(&named, input.prompt.trim(), input.vibe.as_deref());
        let mut request = GenerateRequest::text(prompt::SYSTEM_INSTRUCTION, prompt_text, self.max_output_tokens);
        if let Some(img) = &input.image {
            request = request.with_image(img.mime_type.clone(), image::to_base64(img));
        }

        self.pending_primary = Some(input);
        spawn_stream(self.provider.clone(), request, token, self.events_tx.clone());
        self.state = SessionState::Streaming;
        SubmitOutcome::Started
    }

    /// Start a follow-up chained to the completed primary
    ///
    /// Consumes the armed context; a successful follow-up re-arms it so
    /// further follow-ups stay available up to the entitlement ceiling.
    /// The separator label is appended to the display synchronously,
    /// before any chunk arrives - the caller should print it right away.
    pub fn follow_up(&mut self, kind: FollowUpKind) -> FollowUpOutcome {
        debug!(?kind, state = ?self.state, "follow_up: called");

        if self.state != SessionState::Completed || self.follow_up_context.is_none() {
            debug!("follow_up: not ready");
            return FollowUpOutcome::NotReady;
        }

        if !self.engine.can_follow_up(self.follow_up_count) {
            info!("follow_up: ceiling reached, redirecting to upgrade");
            return FollowUpOutcome::UpgradeRequired;
        }

        let Some(context) = self.follow_up_context.take() else {
            return FollowUpOutcome::NotReady;
        };

        // Counted immediately, before the outcome of the call is known.
        self.follow_up_count += 1;
        let token = self.cancel.issue();

        self.display.push_str(kind.separator());
        self.savings = None;
        self.last_error = None;

        let prompt_text = prompt::compose_follow_up(
            &context.food_items,
            &context.prompt,
            &context.result,
            context.vibe.as_deref(),
            kind,
        );
        let request = GenerateRequest::text(prompt::SYSTEM_INSTRUCTION, prompt_text, self.max_output_tokens);

        self.pending_follow_up = Some(context);
        spawn_stream(self.provider.clone(), request, token, self.events_tx.clone());
        self.state = SessionState::FollowUpStreaming;
        FollowUpOutcome::Started
    }

    /// Apply the next event from the active stream
    ///
    /// Returns `None` immediately when no stream is active. Events from
    /// superseded streams are discarded here - their generation no longer
    /// matches - so no cancelled chunk is ever applied, even if it was
    /// already queued when cancellation was requested.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        loop {
            match self.state {
                SessionState::Submitting | SessionState::Streaming | SessionState::FollowUpStreaming => {}
                _ => return None,
            }

            let event = self.events_rx.recv().await?;

            if event.generation() != self.cancel.current_generation() {
                debug!(generation = event.generation(), "next_update: stale event discarded");
                continue;
            }

            match event {
                SessionEvent::Chunk { text, .. } => {
                    self.display.push_str(&text);
                    return Some(SessionUpdate::Chunk(text));
                }
                SessionEvent::Done { .. } => return Some(self.apply_done()),
                SessionEvent::Error { message, .. } => return Some(self.apply_error(&message)),
            }
        }
    }

    fn apply_done(&mut self) -> SessionUpdate {
        debug!(state = ?self.state, "apply_done: called");
        match self.state {
            SessionState::FollowUpStreaming => {
                // Follow-up text stays in the shared buffer verbatim; no
                // re-parse, no new history entry.
                self.state = SessionState::Completed;
                self.follow_up_context = self.pending_follow_up.take();
                SessionUpdate::FollowUpCompleted
            }
            _ => {
                if !self.engine.record_usage() {
                    warn!("apply_done: usage ceiling hit at completion time");
                }

                let parsed = parse_response(&self.display);
                self.display = parsed.main.clone();
                self.savings = parsed.savings.clone();

                if let Some(input) = self.pending_primary.take() {
                    let image_preview = input.image.as_ref().map(image::to_data_url);
                    self.history.record(
                        self.clock.now().timestamp_millis(),
                        image_preview,
                        input.food_items.clone(),
                        input.prompt.clone(),
                        input.vibe.clone(),
                        parsed.main.clone(),
                    );

                    self.follow_up_context = Some(FollowUpContext {
                        food_items: input.named_items(),
                        prompt: input.prompt.trim().to_string(),
                        result: parsed.main,
                        vibe: input.vibe,
                    });
                }

                self.follow_up_count = 0;
                self.state = SessionState::Completed;
                SessionUpdate::PrimaryCompleted {
                    savings: self.savings.clone(),
                }
            }
        }
    }

    fn apply_error(&mut self, message: &str) -> SessionUpdate {
        debug!(state = ?self.state, %message, "apply_error: called");
        let friendly = match self.state {
            SessionState::FollowUpStreaming => {
                format!("Sorry, I had trouble getting more insights: {message}. Please try again!")
            }
            _ => format!("Sorry, I had trouble analyzing your food: {message}. Please try again!"),
        };

        // No usage recorded, no history entry, context stays unarmed.
        self.pending_primary = None;
        self.pending_follow_up = None;
        self.state = SessionState::Error;
        self.last_error = Some(friendly.clone());
        SessionUpdate::Failed(friendly)
    }

    /// Restore a history entry into staged input
    ///
    /// Abandons any in-flight stream, bumps the entry's use count, and
    /// clears the current result. A stored photo that cannot be revived
    /// is rolled back to "no image" with a recoverable warning.
    pub fn restore(&mut self, id: i64) -> Option<Restored> {
        debug!(%id, "restore: called");
        self.cancel.cancel();

        let entry = self.history.restore(id)?;

        self.display.clear();
        self.savings = None;
        self.follow_up_context = None;
        self.pending_primary = None;
        self.pending_follow_up = None;
        self.last_error = None;
        self.state = SessionState::Idle;

        let (image, image_warning) = match &entry.image_preview {
            Some(url) => match image::from_data_url(url, format!("restored-{id}.jpg")) {
                Ok(img) => (Some(img), None),
                Err(e) => {
                    warn!(%id, error = %e, "restore: stored image could not be revived");
                    (
                        None,
                        Some("Could not restore the image, please select it again.".to_string()),
                    )
                }
            },
            None => (None, None),
        };

        Some(Restored {
            input: RecommendationInput {
                food_items: entry.food_items,
                prompt: entry.prompt,
                vibe: entry.vibe,
                image,
            },
            image_warning,
        })
    }

    /// Wipe all history and reset the session to idle
    pub fn clear_history(&mut self) {
        info!("clear_history: called");
        self.cancel.cancel();
        self.history.clear();
        self.display.clear();
        self.savings = None;
        self.follow_up_context = None;
        self.follow_up_count = 0;
        self.pending_primary = None;
        self.pending_follow_up = None;
        self.last_error = None;
        self.state = SessionState::Idle;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self.state,
            SessionState::Submitting | SessionState::Streaming | SessionState::FollowUpStreaming
        )
    }

    /// The accumulated display text (primary plus any follow-ups)
    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn savings(&self) -> Option<&str> {
        self.savings.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// True when a follow-up could be offered right now
    pub fn follow_up_available(&self) -> bool {
        self.state == SessionState::Completed && self.follow_up_context.is_some()
    }

    pub fn follow_up_count(&self) -> u32 {
        self.follow_up_count
    }

    pub fn engine(&self) -> &EntitlementEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut EntitlementEngine {
        &mut self.engine
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;
    use crate::entitlement::FixedClock;
    use crate::provider::StreamChunk;
    use crate::provider::client::mock::MockProviderClient;
    use bitestore::MemoryStore;
    use chrono::{Duration, TimeZone, Utc};

    fn noon() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    struct Fixture {
        controller: SessionController,
        provider: Arc<MockProviderClient>,
    }

    fn fixture(scripts: Vec<Vec<StreamChunk>>, trial_expired: bool) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::at(noon()));
        let mut engine = EntitlementEngine::load(store.clone(), clock.clone(), LimitsConfig::default());
        if trial_expired {
            clock.advance(Duration::days(15));
            engine.refresh();
        }
        let history = HistoryLog::load(store);
        let provider = Arc::new(MockProviderClient::new(scripts));

        Fixture {
            controller: SessionController::new(provider.clone(), engine, history, clock, 2048),
            provider,
        }
    }

    fn text_script(pieces: &[&str]) -> Vec<StreamChunk> {
        let mut chunks: Vec<StreamChunk> = pieces.iter().map(|p| StreamChunk::TextDelta(p.to_string())).collect();
        chunks.push(StreamChunk::Done);
        chunks
    }

    fn fries_input() -> RecommendationInput {
        RecommendationInput {
            food_items: vec![FoodItem::new(1, "French Fries"), FoodItem::new(2, "Ketchup")],
            prompt: "How much ketchup should I use?".to_string(),
            vibe: Some("Classic Comfort".to_string()),
            image: None,
        }
    }

    async fn pump_to_terminal(controller: &mut SessionController) -> SessionUpdate {
        loop {
            match controller.next_update().await {
                Some(SessionUpdate::Chunk(_)) => continue,
                Some(terminal) => return terminal,
                None => panic!("no active stream to pump"),
            }
        }
    }

    #[tokio::test]
    async fn test_primary_flow_commits_everything() {
        let mut fx = fixture(
            vec![text_script(&[
                "Use two tablespoons. ",
                "[SAVINGS_START]Saves $0.50 per meal.[SAVINGS_END]",
            ])],
            false,
        );

        assert_eq!(fx.controller.submit(fries_input()), SubmitOutcome::Started);
        assert_eq!(fx.controller.state(), SessionState::Streaming);

        let terminal = pump_to_terminal(&mut fx.controller).await;
        assert_eq!(
            terminal,
            SessionUpdate::PrimaryCompleted {
                savings: Some("Saves $0.50 per meal.".to_string())
            }
        );

        assert_eq!(fx.controller.state(), SessionState::Completed);
        assert_eq!(fx.controller.display(), "Use two tablespoons.");
        assert_eq!(fx.controller.savings(), Some("Saves $0.50 per meal."));
        assert!(fx.controller.follow_up_available());
        assert_eq!(fx.controller.follow_up_count(), 0);

        let history = fx.controller.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history.entries()[0].result, "Use two tablespoons.");
        assert_eq!(history.entries()[0].food_items.len(), 2);
    }

    #[tokio::test]
    async fn test_primary_records_usage_after_trial() {
        let mut fx = fixture(vec![text_script(&["ok"])], true);

        assert_eq!(fx.controller.engine().state().used_today, 0);
        fx.controller.submit(fries_input());
        pump_to_terminal(&mut fx.controller).await;

        assert_eq!(fx.controller.engine().state().used_today, 1);
    }

    #[tokio::test]
    async fn test_submit_blocked_at_ceiling_issues_no_request() {
        let mut fx = fixture(vec![text_script(&["never"])], true);

        for _ in 0..3 {
            fx.controller.engine_mut().record_usage();
        }

        assert_eq!(fx.controller.submit(fries_input()), SubmitOutcome::UpgradeRequired);
        assert_eq!(fx.controller.state(), SessionState::Idle);
        assert_eq!(fx.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_submit_incomplete_input() {
        let mut fx = fixture(vec![], false);

        let empty = RecommendationInput::default();
        assert_eq!(fx.controller.submit(empty), SubmitOutcome::InputIncomplete);
        assert_eq!(fx.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_photo_only_input_is_eligible() {
        let input = RecommendationInput {
            image: Some(ImageFile {
                name: "plate.jpg".to_string(),
                mime_type: "image/jpeg".to_string(),
                bytes: vec![1, 2, 3],
            }),
            ..Default::default()
        };
        assert!(input.is_submit_eligible());
    }

    #[tokio::test]
    async fn test_new_submit_supersedes_in_flight_stream() {
        let mut fx = fixture(
            vec![text_script(&["AAA-one ", "AAA-two"]), text_script(&["BBB-only"])],
            false,
        );

        fx.controller.submit(fries_input());
        // Apply one chunk of the first stream, leaving the rest queued
        let first = fx.controller.next_update().await;
        assert_eq!(first, Some(SessionUpdate::Chunk("AAA-one ".to_string())));

        // Superseding submit: the queued first-stream events are stale now
        fx.controller.submit(fries_input());
        let terminal = pump_to_terminal(&mut fx.controller).await;

        assert!(matches!(terminal, SessionUpdate::PrimaryCompleted { .. }));
        assert_eq!(fx.controller.display(), "BBB-only");
        assert!(!fx.controller.display().contains("AAA"));
        // Only the superseding request produced a history entry
        assert_eq!(fx.controller.history().len(), 1);
    }

    #[tokio::test]
    async fn test_error_flow_commits_nothing() {
        let mut fx = fixture(
            vec![vec![
                StreamChunk::TextDelta("partial".to_string()),
                StreamChunk::Error("connection reset".to_string()),
            ]],
            true,
        );

        fx.controller.submit(fries_input());
        let terminal = pump_to_terminal(&mut fx.controller).await;

        match terminal {
            SessionUpdate::Failed(message) => {
                assert!(message.contains("connection reset"));
                assert!(message.contains("trouble analyzing your food"));
            }
            other => panic!("expected failure, got {other:?}"),
        }

        assert_eq!(fx.controller.state(), SessionState::Error);
        assert_eq!(fx.controller.engine().state().used_today, 0);
        assert!(fx.controller.history().is_empty());
        assert!(!fx.controller.follow_up_available());
    }

    #[tokio::test]
    async fn test_follow_up_appends_to_same_buffer() {
        let mut fx = fixture(
            vec![text_script(&["Primary answer."]), text_script(&["Another idea."])],
            false,
        );

        fx.controller.submit(fries_input());
        pump_to_terminal(&mut fx.controller).await;

        assert_eq!(fx.controller.follow_up(FollowUpKind::AnotherIdea), FollowUpOutcome::Started);
        assert_eq!(fx.controller.follow_up_count(), 1);
        assert_eq!(fx.controller.state(), SessionState::FollowUpStreaming);
        // Separator appended synchronously, before any chunk arrives
        assert!(fx.controller.display().contains("Here's another idea:"));

        let terminal = pump_to_terminal(&mut fx.controller).await;
        assert_eq!(terminal, SessionUpdate::FollowUpCompleted);

        assert!(fx.controller.display().starts_with("Primary answer."));
        assert!(fx.controller.display().ends_with("Another idea."));
        // No second history entry for the follow-up
        assert_eq!(fx.controller.history().len(), 1);
    }

    #[tokio::test]
    async fn test_follow_up_rearms_on_success() {
        let mut fx = fixture(
            vec![
                text_script(&["Primary."]),
                text_script(&["First follow-up."]),
                text_script(&["Second follow-up."]),
            ],
            false,
        );

        fx.controller.submit(fries_input());
        pump_to_terminal(&mut fx.controller).await;

        fx.controller.follow_up(FollowUpKind::AnotherIdea);
        // Context is consumed while the follow-up is in flight
        assert!(!fx.controller.follow_up_available());
        pump_to_terminal(&mut fx.controller).await;

        // Trial access: the re-armed context allows chaining
        assert!(fx.controller.follow_up_available());
        assert_eq!(fx.controller.follow_up(FollowUpKind::Why), FollowUpOutcome::Started);
        pump_to_terminal(&mut fx.controller).await;
        assert_eq!(fx.controller.follow_up_count(), 2);
    }

    #[tokio::test]
    async fn test_follow_up_ceiling_on_free_tier() {
        let mut fx = fixture(
            vec![text_script(&["Primary."]), text_script(&["Follow-up."])],
            true,
        );

        fx.controller.submit(fries_input());
        pump_to_terminal(&mut fx.controller).await;

        assert_eq!(fx.controller.follow_up(FollowUpKind::Why), FollowUpOutcome::Started);
        pump_to_terminal(&mut fx.controller).await;

        // Free tier allows one follow-up per primary
        assert_eq!(
            fx.controller.follow_up(FollowUpKind::AnotherIdea),
            FollowUpOutcome::UpgradeRequired
        );
    }

    #[tokio::test]
    async fn test_follow_up_not_ready_without_context() {
        let mut fx = fixture(vec![], false);
        assert_eq!(fx.controller.follow_up(FollowUpKind::Why), FollowUpOutcome::NotReady);
    }

    #[tokio::test]
    async fn test_follow_up_error_leaves_context_unarmed() {
        let mut fx = fixture(
            vec![
                text_script(&["Primary."]),
                vec![StreamChunk::Error("boom".to_string())],
            ],
            false,
        );

        fx.controller.submit(fries_input());
        pump_to_terminal(&mut fx.controller).await;

        fx.controller.follow_up(FollowUpKind::Why);
        let terminal = pump_to_terminal(&mut fx.controller).await;

        match terminal {
            SessionUpdate::Failed(message) => assert!(message.contains("more insights")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(fx.controller.state(), SessionState::Error);
        assert!(!fx.controller.follow_up_available());
    }

    #[tokio::test]
    async fn test_restore_repopulates_input() {
        let mut fx = fixture(vec![text_script(&["Answer."])], false);

        fx.controller.submit(fries_input());
        pump_to_terminal(&mut fx.controller).await;
        let id = fx.controller.history().entries()[0].id;

        let restored = fx.controller.restore(id).unwrap();

        assert_eq!(restored.input.prompt, "How much ketchup should I use?");
        assert_eq!(restored.input.vibe.as_deref(), Some("Classic Comfort"));
        assert_eq!(restored.input.food_items.len(), 2);
        assert!(restored.image_warning.is_none());

        assert_eq!(fx.controller.state(), SessionState::Idle);
        assert_eq!(fx.controller.display(), "");
        assert!(!fx.controller.follow_up_available());
        assert_eq!(fx.controller.history().entries()[0].use_count, 2);
    }

    #[tokio::test]
    async fn test_restore_unknown_id() {
        let mut fx = fixture(vec![], false);
        assert!(fx.controller.restore(42).is_none());
    }

    #[tokio::test]
    async fn test_restore_with_photo_revives_image() {
        let mut fx = fixture(vec![text_script(&["Answer."])], false);

        let photo = ImageFile {
            name: "plate.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            bytes: vec![9, 9, 9],
        };
        let mut input = fries_input();
        input.image = Some(photo.clone());
        fx.controller.submit(input);
        pump_to_terminal(&mut fx.controller).await;

        let id = fx.controller.history().entries()[0].id;
        let restored = fx.controller.restore(id).unwrap();

        let revived = restored.input.image.unwrap();
        assert_eq!(revived.mime_type, photo.mime_type);
        assert_eq!(revived.bytes, photo.bytes);
        assert!(restored.image_warning.is_none());
    }

    #[tokio::test]
    async fn test_restore_with_bad_image_rolls_back() {
        let mut fx = fixture(vec![], false);

        // An entry whose stored preview is not a decodable data URL
        let id = fx.controller.history.record(
            1000,
            Some("data:image/jpeg;base64,@@@".to_string()),
            vec![FoodItem::new(1, "Fries")],
            "How much?".to_string(),
            None,
            "Answer.".to_string(),
        );

        let restored = fx.controller.restore(id).unwrap();
        assert!(restored.input.image.is_none());
        assert!(restored.image_warning.is_some());
    }

    #[tokio::test]
    async fn test_clear_history_resets_session() {
        let mut fx = fixture(
            vec![text_script(&["Primary."]), text_script(&["Follow-up."])],
            false,
        );

        fx.controller.submit(fries_input());
        pump_to_terminal(&mut fx.controller).await;
        fx.controller.follow_up(FollowUpKind::Why);
        pump_to_terminal(&mut fx.controller).await;
        assert_eq!(fx.controller.follow_up_count(), 1);

        fx.controller.clear_history();

        assert_eq!(fx.controller.state(), SessionState::Idle);
        assert_eq!(fx.controller.display(), "");
        assert_eq!(fx.controller.follow_up_count(), 0);
        assert!(fx.controller.history().is_empty());
        assert!(!fx.controller.follow_up_available());
    }

    #[tokio::test]
    async fn test_trial_allows_many_requests_in_one_day() {
        let mut scripts = Vec::new();
        for _ in 0..50 {
            scripts.push(text_script(&["ok"]));
        }
        let mut fx = fixture(scripts, false);

        for _ in 0..50 {
            assert_eq!(fx.controller.submit(fries_input()), SubmitOutcome::Started);
            pump_to_terminal(&mut fx.controller).await;
        }
        assert_eq!(fx.controller.history().len(), crate::history::HISTORY_CAP);
    }

    #[tokio::test]
    async fn test_next_update_idle_returns_none() {
        let mut fx = fixture(vec![], false);
        assert_eq!(fx.controller.next_update().await, None);
    }
}
