//! REPL session management

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use bitestore::Store;

use crate::entitlement::{TrialStatus, VibeAddOutcome};
use crate::export::{RecipeExport, render_markdown};
use crate::history::FoodItem;
use crate::image::{CompressOptions, ImageCodec, ImageFile, PassthroughCodec};
use crate::prefs;
use crate::prompt::{FollowUpKind, PRESET_QUESTIONS, PRESET_VIBES};
use crate::session::{FollowUpOutcome, RecommendationInput, SessionController, SessionUpdate, SubmitOutcome};
use crate::subscription::{PlanPeriod, SubscriptionService, products};

/// Interactive REPL session
pub struct ReplSession {
    controller: SessionController,
    subscriptions: SubscriptionService,
    store: Arc<dyn Store>,
    codec: PassthroughCodec,
    draft: RecommendationInput,
    next_item_id: i64,
}

enum SlashResult {
    Continue,
    Quit,
}

impl ReplSession {
    /// Create a new REPL session
    pub fn new(controller: SessionController, subscriptions: SubscriptionService, store: Arc<dyn Store>) -> Self {
        Self {
            controller,
            subscriptions,
            store,
            codec: PassthroughCodec,
            draft: RecommendationInput::default(),
            next_item_id: 1,
        }
    }

    /// Run the REPL main loop
    pub async fn run(&mut self) -> Result<()> {
        if !prefs::welcome_seen(self.store.as_ref()) {
            self.print_first_run_welcome();
            prefs::mark_welcome_seen(self.store.as_ref());
        }

        if self.controller.engine_mut().refresh() {
            self.print_trial_end_notice();
            self.controller.engine_mut().mark_trial_notice_seen();
        }

        self.print_welcome();

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let readline = rl.readline(&format!("{} ", ">".bright_green()));

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }

                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_slash_command(input).await {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        }
                    } else {
                        // Plain input is the question; submit right away
                        self.draft.prompt = input.to_string();
                        self.submit_current().await;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Bon appétit!");
        Ok(())
    }

    async fn submit_current(&mut self) {
        match self.controller.submit(self.draft.clone()) {
            SubmitOutcome::Started => self.stream_to_terminal().await,
            SubmitOutcome::UpgradeRequired => self.print_upgrade_prompt(),
            SubmitOutcome::InputIncomplete => {
                println!(
                    "{}",
                    "Add a question, a food item (/food <name>), or a photo (/image <path>) first.".yellow()
                );
            }
        }
    }

    async fn start_follow_up(&mut self, kind: FollowUpKind) {
        match self.controller.follow_up(kind) {
            FollowUpOutcome::Started => {
                print!("{}", kind.separator());
                self.stream_to_terminal().await;
            }
            FollowUpOutcome::UpgradeRequired => self.print_upgrade_prompt(),
            FollowUpOutcome::NotReady => {
                println!("{}", "Nothing to follow up on yet - ask a question first.".yellow());
            }
        }
    }

    /// Print chunks as they arrive until the stream reaches a terminal
    async fn stream_to_terminal(&mut self) {
        loop {
            match self.controller.next_update().await {
                Some(SessionUpdate::Chunk(text)) => {
                    print!("{text}");
                    let _ = io::stdout().flush();
                }
                Some(SessionUpdate::PrimaryCompleted { savings }) => {
                    println!();
                    if let Some(savings) = savings
                        && self.controller.engine().can_use_cost_savings()
                    {
                        println!();
                        println!("{} {}", "💰".green(), savings.green());
                    }
                    if self.controller.follow_up_available() {
                        println!(
                            "{}",
                            "Try /another for a different idea or /why for the reasoning.".dimmed()
                        );
                    }
                    return;
                }
                Some(SessionUpdate::FollowUpCompleted) => {
                    println!();
                    return;
                }
                Some(SessionUpdate::Failed(message)) => {
                    println!();
                    println!("{}", message.red());
                    return;
                }
                None => return,
            }
        }
    }

    /// Handle slash commands
    async fn handle_slash_command(&mut self, input: &str) -> SlashResult {
        debug!(%input, "handle_slash_command: called");
        let mut parts = input.splitn(2, char::is_whitespace);
        let cmd = parts.next().unwrap_or("");
        let arg = parts.next().map(str::trim).unwrap_or("");

        match cmd {
            "/help" | "/h" => self.print_help(),
            "/quit" | "/q" | "/exit" => return SlashResult::Quit,
            "/food" => self.cmd_food(arg),
            "/rmfood" => self.cmd_rmfood(arg),
            "/vibe" => self.cmd_vibe(arg),
            "/vibes" => self.print_vibes(),
            "/addvibe" => self.cmd_addvibe(arg),
            "/rmvibe" => {
                self.controller.engine_mut().remove_custom_vibe(arg);
                println!("Removed.");
            }
            "/image" => self.cmd_image(arg),
            "/noimage" => {
                self.draft.image = None;
                println!("Photo removed.");
            }
            "/another" => self.start_follow_up(FollowUpKind::AnotherIdea).await,
            "/why" => self.start_follow_up(FollowUpKind::Why).await,
            "/history" => self.print_history(),
            "/restore" => self.cmd_restore(arg),
            "/clear" => {
                self.controller.clear_history();
                println!("{}", "History cleared.".dimmed());
            }
            "/export" => self.cmd_export(),
            "/status" => self.print_status(),
            "/plans" => self.print_plans(),
            "/upgrade" => self.cmd_upgrade(arg).await,
            "/stats" => self.print_stats(),
            _ => {
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                println!("Type {} for available commands", "/help".yellow());
            }
        }
        SlashResult::Continue
    }

    fn cmd_food(&mut self, arg: &str) {
        if arg.is_empty() {
            if self.draft.food_items.is_empty() {
                println!("Nothing on the plate yet. Add with {} ", "/food <name>".yellow());
            } else {
                for (i, item) in self.draft.food_items.iter().enumerate() {
                    println!("  {}. {}", i + 1, item.name);
                }
            }
            return;
        }

        let id = self.next_item_id;
        self.next_item_id += 1;
        self.draft.food_items.push(FoodItem::new(id, arg));
        println!("Added {}.", arg.bold());
    }

    fn cmd_rmfood(&mut self, arg: &str) {
        match arg.parse::<usize>() {
            Ok(n) if n >= 1 && n <= self.draft.food_items.len() => {
                let removed = self.draft.food_items.remove(n - 1);
                println!("Removed {}.", removed.name);
            }
            _ => println!("Usage: /rmfood <number> (see /food for the list)"),
        }
    }

    fn cmd_vibe(&mut self, arg: &str) {
        if arg.is_empty() {
            self.draft.vibe = None;
            println!("Vibe cleared.");
        } else {
            self.draft.vibe = Some(arg.to_string());
            println!("Going for a {} vibe.", arg.bold());
        }
    }

    fn cmd_addvibe(&mut self, arg: &str) {
        match self.controller.engine_mut().add_custom_vibe(arg) {
            VibeAddOutcome::Added => println!("Added custom vibe {}.", arg.bold()),
            VibeAddOutcome::UpgradeRequired => self.print_upgrade_prompt(),
            VibeAddOutcome::Blank => println!("Usage: /addvibe <name>"),
            VibeAddOutcome::TooLong => println!("Keep vibe names to 20 characters or fewer."),
            VibeAddOutcome::AtCapacity => println!("You already have 5 custom vibes - remove one first (/rmvibe)."),
            VibeAddOutcome::Duplicate => println!("You already have that vibe."),
        }
    }

    fn cmd_image(&mut self, arg: &str) {
        if arg.is_empty() {
            println!("Usage: /image <path>");
            return;
        }

        match load_image(Path::new(arg)) {
            Ok(image) => match self.codec.compress(&image, &CompressOptions::default()) {
                Ok(compressed) => {
                    println!("Photo attached ({} bytes).", compressed.bytes.len());
                    self.draft.image = Some(compressed);
                }
                Err(e) => {
                    // Roll back - treated as if no image were chosen
                    debug!(error = %e, "cmd_image: compression failed");
                    self.draft.image = None;
                    println!(
                        "{}",
                        "There was an issue processing your photo. Please try another one.".red()
                    );
                }
            },
            Err(e) => {
                self.draft.image = None;
                println!("{} {}", "Could not read that photo:".red(), e);
            }
        }
    }

    fn cmd_restore(&mut self, arg: &str) {
        let Ok(id) = arg.parse::<i64>() else {
            println!("Usage: /restore <id> (see /history for ids)");
            return;
        };

        match self.controller.restore(id) {
            Some(restored) => {
                if let Some(warning) = &restored.image_warning {
                    println!("{}", warning.yellow());
                }
                self.next_item_id = restored.input.food_items.iter().map(|i| i.id).max().unwrap_or(0) + 1;
                self.draft = restored.input;
                println!("Restored. Question: {}", self.draft.prompt.bold());
                println!("{}", "Press enter on a question to ask it again.".dimmed());
            }
            None => println!("No saved recommendation with id {id}."),
        }
    }

    fn cmd_export(&mut self) {
        if !self.controller.engine().can_export_recipes() {
            self.print_upgrade_prompt();
            return;
        }
        if self.controller.display().is_empty() {
            println!("Nothing to export yet.");
            return;
        }

        let items = self.draft.named_items();
        let export = RecipeExport {
            food_items: &items,
            prompt: &self.draft.prompt,
            vibe: self.draft.vibe.as_deref(),
            result: self.controller.display(),
            savings: self.controller.savings(),
            exported_at: chrono::Utc::now(),
        };
        println!("{}", render_markdown(&export));
    }

    async fn cmd_upgrade(&mut self, arg: &str) {
        let mut words = arg.split_whitespace();
        let tier: crate::entitlement::Tier = match words.next().unwrap_or("premium").parse() {
            Ok(tier) => tier,
            Err(e) => {
                println!("{e}");
                return;
            }
        };
        let period: PlanPeriod = match words.next().unwrap_or("monthly").parse() {
            Ok(period) => period,
            Err(e) => {
                println!("{e}");
                return;
            }
        };

        println!("Contacting the store...");
        if self.subscriptions.select_plan(period).await {
            self.controller.engine_mut().upgrade(tier);
            println!("{}", "Welcome to BiteMatch Premium! 🎉".bright_green().bold());
        } else {
            println!(
                "{}",
                "The purchase didn't go through. No charge was made - please try again.".red()
            );
        }
    }

    fn print_first_run_welcome(&self) {
        println!();
        println!("{}", "Welcome to BiteMatch!".bright_cyan().bold());
        println!("Describe what's on your plate, ask a question, and get portioning");
        println!("and pairing advice. Your 14-day unlimited trial starts now.");
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "BiteMatch".bright_cyan().bold());
        match self.controller.engine().trial_status() {
            TrialStatus::Trial { days_left, .. } => {
                println!("Trial: {} day(s) of unlimited recommendations left", days_left);
            }
            TrialStatus::Premium => println!("Premium: unlimited recommendations"),
            TrialStatus::Free => {
                if let Some(n) = self.controller.engine().remaining_requests() {
                    println!("Free plan: {} request(s) left today", n);
                }
            }
        }
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
    }

    fn print_trial_end_notice(&self) {
        let savings = self.controller.engine().estimate_trial_savings();
        println!();
        println!("{}", "Your free trial has ended.".bold());
        if savings.total_recommendations > 0 {
            println!(
                "During your trial BiteMatch gave you {} recommendations, saving an estimated ${:.2} and {:.1} oz of food waste.",
                savings.total_recommendations, savings.total_saved, savings.waste_prevented_oz
            );
        }
        println!("Upgrade with {} to keep unlimited access.", "/upgrade".yellow());
    }

    fn print_upgrade_prompt(&self) {
        println!("{}", "That needs BiteMatch Premium.".yellow().bold());
        self.print_plans();
    }

    fn print_plans(&self) {
        println!();
        for product in products() {
            println!(
                "  {} - {} ({})",
                product.title.bold(),
                product.localized_price,
                product.description
            );
        }
        println!("  Upgrade with {} or {}", "/upgrade premium".yellow(), "/upgrade pro".yellow());
        println!();
    }

    fn print_vibes(&self) {
        println!("Preset vibes:");
        for vibe in PRESET_VIBES {
            println!("  - {vibe}");
        }
        let custom = &self.controller.engine().state().custom_vibes;
        if !custom.is_empty() {
            println!("Your vibes:");
            for vibe in custom {
                println!("  - {vibe}");
            }
        }
        println!("Set one with {}", "/vibe <name>".yellow());
    }

    fn print_history(&self) {
        let limit = self.controller.engine().history_limit();
        let entries = self.controller.history().visible(limit);
        if entries.is_empty() {
            println!("No saved recommendations yet.");
            return;
        }

        for entry in entries {
            let items: Vec<&str> = entry.food_items.iter().map(|i| i.name.as_str()).collect();
            println!(
                "  [{}] {} - {} {}",
                entry.id,
                items.join(", ").bold(),
                entry.prompt,
                format!("(used {}x)", entry.use_count).dimmed()
            );
        }
        println!("Restore one with {}", "/restore <id>".yellow());
    }

    fn print_status(&self) {
        let engine = self.controller.engine();
        match engine.trial_status() {
            TrialStatus::Premium => println!("Plan: {}", "Premium".bright_green()),
            TrialStatus::Trial { days_left, ends_at } => {
                println!("Plan: trial, {} day(s) left (ends {})", days_left, ends_at.format("%Y-%m-%d"));
            }
            TrialStatus::Free => println!("Plan: free"),
        }
        match engine.remaining_requests() {
            None => println!("Requests today: unlimited"),
            Some(n) => println!("Requests left today: {} (used {})", n, engine.state().used_today),
        }
        let sub = self.subscriptions.status();
        if sub.is_active
            && let Some(expiration) = sub.expiration_date
        {
            println!("Subscription renews/expires: {}", expiration.format("%Y-%m-%d"));
        }
    }

    fn print_stats(&self) {
        let savings = self.controller.engine().estimate_trial_savings();
        println!("Recommendations saved: {}", savings.total_recommendations);
        println!("Estimated money saved: ${:.2}", savings.total_saved);
        println!("Estimated waste prevented: {:.1} oz", savings.waste_prevented_oz);
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Ask anything about your plate - plain text submits.".bold());
        println!("Quick questions: {}", PRESET_QUESTIONS.join(" · ").dimmed());
        println!();
        println!("  {}  add a food item (no arg: list)", "/food <name>".yellow());
        println!("  {}  remove item by number", "/rmfood <n>".yellow());
        println!("  {}  set the vibe (no arg: clear)", "/vibe <name>".yellow());
        println!("  {}  list vibes; {} / {} manage custom ones", "/vibes".yellow(), "/addvibe".yellow(), "/rmvibe".yellow());
        println!("  {}  attach a photo; {} removes it", "/image <path>".yellow(), "/noimage".yellow());
        println!("  {}  another idea · {} the reasoning", "/another".yellow(), "/why".yellow());
        println!("  {}  saved recommendations; {} brings one back", "/history".yellow(), "/restore <id>".yellow());
        println!("  {}  export the current recommendation", "/export".yellow());
        println!("  {} {} {} {}", "/status".yellow(), "/plans".yellow(), "/upgrade".yellow(), "/stats".yellow());
        println!("  {}  wipe history · {} leave", "/clear".yellow(), "/quit".yellow());
        println!();
    }
}

/// Read an image file from disk, guessing the mime type from the extension
fn load_image(path: &Path) -> Result<ImageFile> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo".to_string());
    let mime_type = match path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    };

    Ok(ImageFile {
        name,
        mime_type: mime_type.to_string(),
        bytes,
    })
}
