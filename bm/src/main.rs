//! BiteMatch - AI food portioning and pairing advisor
//!
//! CLI entry point.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::info;

use bitematch::cli::{Cli, Command, get_log_path};
use bitematch::config::Config;
use bitematch::entitlement::{EntitlementEngine, SystemClock, Tier, TrialStatus};
use bitematch::history::{FoodItem, HistoryLog};
use bitematch::repl::ReplSession;
use bitematch::session::{RecommendationInput, SessionController, SessionUpdate, SubmitOutcome};
use bitematch::subscription::{PlanPeriod, SimulatedPaymentProvider, SubscriptionService, products};
use bitematch::{image, prefs, provider};
use bitestore::{FileStore, Store};

fn setup_logging(verbose: bool) -> Result<()> {
    let log_path = get_log_path();
    if let Some(dir) = log_path.parent() {
        fs::create_dir_all(dir).context("Failed to create log directory")?;
    }

    // Write to the log file, not stdout - the terminal belongs to the user
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

fn open_store(config: &Config) -> Arc<dyn Store> {
    Arc::new(FileStore::open(PathBuf::from(&config.storage.data_dir)))
}

fn load_engine(config: &Config, store: Arc<dyn Store>) -> EntitlementEngine {
    EntitlementEngine::load(store, Arc::new(SystemClock), config.limits.clone())
}

fn build_subscriptions(store: Arc<dyn Store>) -> SubscriptionService {
    SubscriptionService::new(store, Arc::new(SystemClock), Arc::new(SimulatedPaymentProvider))
}

/// Build the full session stack (requires a configured provider key)
fn build_session(config: &Config) -> Result<(SessionController, SubscriptionService, Arc<dyn Store>)> {
    config.validate()?;

    let store = open_store(config);
    let provider = provider::create_client(&config.provider)?;
    let mut engine = load_engine(config, store.clone());
    engine.refresh();
    let history = HistoryLog::load(store.clone());

    let controller = SessionController::new(
        provider,
        engine,
        history,
        Arc::new(SystemClock),
        config.provider.max_output_tokens,
    );
    let subscriptions = build_subscriptions(store.clone());

    Ok((controller, subscriptions, store))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!(
        "BiteMatch loaded config: provider={}, model={}",
        config.provider.provider, config.provider.model
    );

    match cli.command {
        None | Some(Command::Repl) => cmd_repl(&config).await,
        Some(Command::Ask {
            prompt,
            food,
            vibe,
            image,
        }) => cmd_ask(&config, prompt, food, vibe, image).await,
        Some(Command::Status) => cmd_status(&config),
        Some(Command::History) => cmd_history(&config),
        Some(Command::Clear) => cmd_clear(&config),
        Some(Command::Upgrade { tier, plan }) => cmd_upgrade(&config, &tier, &plan).await,
        Some(Command::Plans) => cmd_plans(),
        Some(Command::Stats) => cmd_stats(&config),
    }
}

/// Run the interactive session
async fn cmd_repl(config: &Config) -> Result<()> {
    let (controller, subscriptions, store) = build_session(config)?;
    let mut repl = ReplSession::new(controller, subscriptions, store);
    repl.run().await
}

/// One-shot question from the command line
async fn cmd_ask(
    config: &Config,
    prompt: String,
    food: Vec<String>,
    vibe: Option<String>,
    image_path: Option<PathBuf>,
) -> Result<()> {
    let (mut controller, _, _) = build_session(config)?;

    let image = match image_path {
        Some(path) => {
            let bytes = fs::read(&path).context(format!("Failed to read image {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "photo".to_string());
            Some(image::ImageFile {
                name,
                mime_type: "image/jpeg".to_string(),
                bytes,
            })
        }
        None => None,
    };

    let input = RecommendationInput {
        food_items: food
            .into_iter()
            .enumerate()
            .map(|(i, name)| FoodItem::new(i as i64 + 1, name))
            .collect(),
        prompt,
        vibe,
        image,
    };

    match controller.submit(input) {
        SubmitOutcome::Started => {}
        SubmitOutcome::UpgradeRequired => {
            println!("{}", "You've used today's free recommendations.".yellow());
            cmd_plans()?;
            return Ok(());
        }
        SubmitOutcome::InputIncomplete => {
            return Err(eyre::eyre!("Give a question, at least one --food item, or an --image"));
        }
    }

    use std::io::Write;
    loop {
        match controller.next_update().await {
            Some(SessionUpdate::Chunk(text)) => {
                print!("{text}");
                let _ = std::io::stdout().flush();
            }
            Some(SessionUpdate::PrimaryCompleted { savings }) => {
                println!();
                if let Some(savings) = savings
                    && controller.engine().can_use_cost_savings()
                {
                    println!();
                    println!("{} {}", "💰".green(), savings.green());
                }
                return Ok(());
            }
            Some(SessionUpdate::Failed(message)) => {
                println!();
                return Err(eyre::eyre!(message));
            }
            Some(SessionUpdate::FollowUpCompleted) | None => return Ok(()),
        }
    }
}

/// Show plan, remaining requests, and subscription status
fn cmd_status(config: &Config) -> Result<()> {
    let store = open_store(config);
    let mut engine = load_engine(config, store.clone());
    engine.refresh();

    match engine.trial_status() {
        TrialStatus::Premium => println!("Plan: {}", "Premium".bright_green()),
        TrialStatus::Trial { days_left, ends_at } => {
            println!("Plan: trial - {} day(s) left (ends {})", days_left, ends_at.format("%Y-%m-%d"));
        }
        TrialStatus::Free => println!("Plan: free"),
    }

    match engine.remaining_requests() {
        None => println!("Requests today: unlimited"),
        Some(n) => println!("Requests left today: {} (used {})", n, engine.state().used_today),
    }

    let welcome = if prefs::welcome_seen(store.as_ref()) { "yes" } else { "no" };
    println!("Onboarded: {welcome}");
    Ok(())
}

/// List saved recommendations
fn cmd_history(config: &Config) -> Result<()> {
    let store = open_store(config);
    let mut engine = load_engine(config, store.clone());
    engine.refresh();
    let history = HistoryLog::load(store);

    let entries = history.visible(engine.history_limit());
    if entries.is_empty() {
        println!("No saved recommendations yet.");
        return Ok(());
    }

    for entry in entries {
        let items: Vec<&str> = entry.food_items.iter().map(|i| i.name.as_str()).collect();
        println!(
            "[{}] {} - {} (used {}x)",
            entry.id,
            items.join(", "),
            entry.prompt,
            entry.use_count
        );
    }
    Ok(())
}

/// Clear all saved recommendations
fn cmd_clear(config: &Config) -> Result<()> {
    let store = open_store(config);
    let mut history = HistoryLog::load(store);
    history.clear();
    println!("History cleared.");
    Ok(())
}

/// Purchase a plan and upgrade the entitlement record
async fn cmd_upgrade(config: &Config, tier: &str, plan: &str) -> Result<()> {
    let tier: Tier = tier.parse().map_err(|e: String| eyre::eyre!(e))?;
    let period: PlanPeriod = plan.parse().map_err(|e: String| eyre::eyre!(e))?;

    let store = open_store(config);
    let subscriptions = build_subscriptions(store.clone());

    println!("Contacting the store...");
    if subscriptions.select_plan(period).await {
        let mut engine = load_engine(config, store);
        engine.upgrade(tier);
        println!("{}", "Welcome to BiteMatch Premium! 🎉".bright_green().bold());
        Ok(())
    } else {
        Err(eyre::eyre!(
            "The purchase didn't go through. No charge was made - please try again."
        ))
    }
}

/// Print the plan catalog
fn cmd_plans() -> Result<()> {
    for product in products() {
        println!(
            "{} - {}\n    {}",
            product.title.bold(),
            product.localized_price,
            product.description
        );
    }
    Ok(())
}

/// Print estimated savings from the recommendation history
fn cmd_stats(config: &Config) -> Result<()> {
    let store = open_store(config);
    let engine = load_engine(config, store);
    let savings = engine.estimate_trial_savings();

    println!("Recommendations saved: {}", savings.total_recommendations);
    println!("Estimated money saved: ${:.2}", savings.total_saved);
    println!("Estimated waste prevented: {:.1} oz", savings.waste_prevented_oz);
    Ok(())
}
