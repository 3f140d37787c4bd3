use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use link_tracker_bot::application::messaging::{MessageDispatcher, RunOutcome, RuleSet};
use link_tracker_bot::application::services::{standard_rules, HandlerDeps};
use link_tracker_bot::domain::entities::Message;
use link_tracker_bot::domain::traits::Bot;
use link_tracker_bot::infrastructure::adapters::{ConsoleAdapter, TelegramAdapter};
use link_tracker_bot::infrastructure::config::{Config, TelegramConfig};
use link_tracker_bot::infrastructure::storage::MemoryLinkStore;

/// Capacity of the channel between a transport and the dispatcher
const EVENT_BUFFER: usize = 256;

#[derive(Parser)]
#[command(name = "link-tracker-bot")]
#[command(about = "A chat bot that tracks links", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Bot token (overrides config)
    #[arg(short, long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => run_bot(&cli.config, cli.token),
        Commands::Version => {
            println!("link-tracker-bot v{}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Commands::InitConfig => init_config(&cli.config),
    }
}

fn load_config(config_path: &str, token_override: Option<String>) -> Result<Config, String> {
    let config = if std::path::Path::new(config_path).exists() {
        Config::load(config_path).map_err(|e| e.to_string())?
    } else {
        tracing::warn!("Config {} not found, using defaults", config_path);
        Config::default()
    };

    let mut config = config.with_env().map_err(|e| e.to_string())?;
    if let Some(token) = token_override {
        config.set_token(token);
    }
    Ok(config)
}

fn run_bot(config_path: &str, token_override: Option<String>) -> ExitCode {
    let config = match load_config(config_path, token_override) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("Starting {}", config.bot.name);

    let deps = HandlerDeps {
        store: Arc::new(MemoryLinkStore::new(config.storage.max_links_per_chat)),
        bot_name: config.bot.name.clone(),
        plain_text_reply: config.replies.plain_text.clone(),
    };
    let rules = match standard_rules(&deps) {
        Ok(rules) => rules,
        Err(e) => {
            tracing::error!("Command registry is inconsistent: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let exit = rt.block_on(async {
        let shutdown = CancellationToken::new();
        tokio::spawn(wait_for_shutdown(shutdown.clone()));

        if let Some(token) = config.telegram_token() {
            let telegram_config = config.adapters.telegram.clone().unwrap_or_default();
            run_telegram_bot(token, &telegram_config, rules, &config, shutdown).await
        } else {
            run_console_bot(rules, &config, shutdown).await
        }
    });

    // A pending stdin read would otherwise hold the runtime open
    rt.shutdown_timeout(Duration::from_secs(1));
    exit
}

async fn run_telegram_bot(
    token: &str,
    telegram_config: &TelegramConfig,
    rules: RuleSet,
    config: &Config,
    shutdown: CancellationToken,
) -> ExitCode {
    let mut bot = TelegramAdapter::new(token, telegram_config);

    if let Err(e) = bot.fetch_bot_info().await {
        tracing::error!("Failed to fetch bot info: {}", e);
        return ExitCode::FAILURE;
    }
    if let Err(e) = bot.register_commands().await {
        tracing::warn!("Failed to register commands: {}", e);
    }

    let bot = Arc::new(bot);
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let pump = tokio::spawn({
        let bot = Arc::clone(&bot);
        let shutdown = shutdown.clone();
        async move { bot.pump(tx, shutdown).await }
    });

    let exit = serve(bot, rx, rules, config, shutdown.clone()).await;
    shutdown.cancel();
    if let Err(e) = pump.await {
        tracing::error!("Telegram poller task failed: {}", e);
    }
    exit
}

async fn run_console_bot(
    rules: RuleSet,
    config: &Config,
    shutdown: CancellationToken,
) -> ExitCode {
    let bot = Arc::new(ConsoleAdapter::new());
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    tokio::spawn({
        let bot = Arc::clone(&bot);
        let shutdown = shutdown.clone();
        async move { bot.pump(tx, shutdown).await }
    });

    let exit = serve(bot, rx, rules, config, shutdown.clone()).await;
    shutdown.cancel();
    exit
}

async fn serve(
    bot: Arc<dyn Bot>,
    events: mpsc::Receiver<Message>,
    rules: RuleSet,
    config: &Config,
    shutdown: CancellationToken,
) -> ExitCode {
    if let Err(e) = bot.start().await {
        tracing::error!("Failed to start bot: {}", e);
        return ExitCode::FAILURE;
    }
    let username = bot.bot_info().username;
    tracing::info!("Bot started: @{}", username);

    let rules = Arc::new(rules.for_bot(username));
    let dispatcher = MessageDispatcher::new(rules, bot).with_options(config.dispatcher.options());
    let summary = dispatcher.run(events, shutdown).await;

    match summary.outcome {
        RunOutcome::Shutdown => {
            tracing::info!("Stopped on shutdown request after {} messages", summary.dispatched)
        }
        RunOutcome::StreamEnded => {
            tracing::info!("Event stream closed after {} messages", summary.dispatched)
        }
    }
    ExitCode::SUCCESS
}

/// Cancel `shutdown` on Ctrl+C or SIGTERM
async fn wait_for_shutdown(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => tracing::info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down"),
                    _ = shutdown.cancelled() => return,
                }
                shutdown.cancel();
                return;
            }
            Err(e) => tracing::warn!("Failed to register SIGTERM handler: {}", e),
        }
    }

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!("Failed to listen for Ctrl+C: {}", e);
                return;
            }
            tracing::info!("Received Ctrl+C, shutting down");
            shutdown.cancel();
        }
        _ = shutdown.cancelled() => {}
    }
}

fn init_config(path: &str) -> ExitCode {
    if std::path::Path::new(path).exists() {
        tracing::error!("{} already exists", path);
        return ExitCode::FAILURE;
    }

    let yaml = match Config::default().to_yaml() {
        Ok(yaml) => yaml,
        Err(e) => {
            tracing::error!("Failed to render default config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match std::fs::write(path, yaml) {
        Ok(()) => {
            println!("Wrote default config to {}", path);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Failed to write {}: {}", path, e);
            ExitCode::FAILURE
        }
    }
}
