//! FXSIGNAL: forex signal scanner.
//!
//! Entry point. Loads configuration, initialises structured logging, wires
//! the feed, news and advisory collaborators into the cycle controller, and
//! runs it until Ctrl+C.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

use fxsignal::config::AppConfig;
use fxsignal::data::news::NewsClient;
use fxsignal::data::simulated::SimulatedFeed;
use fxsignal::display::TerminalDisplay;
use fxsignal::engine::controller::CycleController;
use fxsignal::engine::events::{EventSink, LogSink};
use fxsignal::llm::anthropic::AnthropicAdvisor;

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let json_logging = std::env::var("FXSIGNAL_LOG_JSON").is_ok();
    init_logging(json_logging);

    let mut cfg = AppConfig::load_or_default(CONFIG_PATH)?;
    cfg.apply_env_overrides()?;
    if let Err(e) = cfg.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(e).context("Configuration rejected at startup");
    }

    info!(
        agent_name = %cfg.agent.name,
        pairs = cfg.pairs.len(),
        threshold = cfg.agent.threshold,
        cycle_secs = cfg.agent.cycle_secs,
        "FXSIGNAL starting up"
    );

    // -- Collaborators ---------------------------------------------------

    let feed = match cfg.agent.feed_seed {
        Some(seed) => {
            info!(seed, "Simulated feed seeded");
            SimulatedFeed::with_seed(seed)
        }
        None => SimulatedFeed::new(),
    };

    let news_key = AppConfig::resolve_env(&cfg.news.api_key_env).ok();
    let news = NewsClient::new(cfg.news.clone(), news_key, cfg.keywords())?;
    if !news.has_api_key() {
        warn!(
            env = %cfg.news.api_key_env,
            "No news API key configured, using built-in headlines"
        );
    }

    let llm_key = AppConfig::resolve_env(&cfg.llm.api_key_env).ok();
    let advisor = Arc::new(AnthropicAdvisor::new(&cfg.llm, llm_key)?);
    if advisor.is_mock() {
        warn!(
            env = %cfg.llm.api_key_env,
            "No LLM API key configured, advisory runs in mock mode"
        );
    } else {
        info!(model = %cfg.llm.model, "Using Anthropic advisory model");
    }

    // JSON logs and the coloured terminal view don't mix on stdout.
    let sink: Box<dyn EventSink> = if json_logging {
        Box::new(LogSink)
    } else {
        Box::new(TerminalDisplay::new())
    };

    let mut controller = CycleController::new(
        &cfg,
        Box::new(feed),
        Box::new(news),
        Box::new(Arc::clone(&advisor)),
        sink,
    )?;

    // -- Main loop -------------------------------------------------------

    let state = controller
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!(
        cycles = state.cycles,
        signals = state.signals,
        wins = state.wins,
        max_score = state.max_score,
        llm_calls = advisor.total_calls(),
        llm_fallbacks = advisor.fallbacks(),
        llm_cost = format!("${:.4}", advisor.cumulative_cost()),
        "FXSIGNAL shut down cleanly."
    );

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging(json_logging: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    // Quiet by default so the terminal view stays readable. In JSON mode
    // the log stream replaces the terminal view, so signals must show.
    let default_filter = if json_logging { "fxsignal=info" } else { "fxsignal=warn" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
