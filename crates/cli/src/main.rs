mod config_commands;
mod review_commands;

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    folio_common::Mode,
    folio_config::FolioConfig,
    folio_review::{BehanceImporter, InMemoryModeStore, OpenAiEvaluator, ReviewService},
    folio_telegram::{BotContext, TelegramConfig, TelegramOutbound},
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "folio", about = "Folio: portfolio review bot", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to use instead of searching for folio.{toml,yaml,json}.
    #[arg(long, global = true, env = "FOLIO_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Telegram bot (default when no subcommand is provided).
    Run,
    /// Review local image files as one portfolio and print the reply.
    Review {
        /// Image files, in the order they should be shown to the reviewer.
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Review mode (basic, stylized, critical).
        #[arg(short, long)]
        mode: Option<Mode>,
    },
    /// Print the resolved configuration with secrets redacted.
    Config,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<FolioConfig> {
    let mut config = match &cli.config {
        Some(path) => folio_config::load_config(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => folio_config::discover_and_load(),
    };
    folio_config::apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let config = load_config(&cli)?;

    match cli.command {
        None | Some(Commands::Run) => run_bot(config).await,
        Some(Commands::Review { files, mode }) => {
            review_commands::handle_review(&config, files, mode).await
        },
        Some(Commands::Config) => config_commands::print_config(&config),
    }
}

async fn run_bot(config: FolioConfig) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "folio starting");

    let telegram = TelegramConfig::resolve(config.channels.telegram.as_ref(), |name| {
        std::env::var(name).ok()
    })?;
    if config.evaluator.api_key.is_none() {
        warn!(
            env = folio_config::API_KEY_ENV,
            "no evaluator API key configured, reviews will fail"
        );
    }

    let (bot, bot_username) = folio_telegram::connect(&telegram).await?;
    let outbound = Arc::new(TelegramOutbound::new(bot.clone()));
    let review = Arc::new(ReviewService::new(
        &config.review,
        Arc::new(OpenAiEvaluator::from_config(&config.evaluator)?),
        Arc::<TelegramOutbound>::clone(&outbound),
        Arc::new(InMemoryModeStore::default()),
    ));
    info!(
        debounce_ms = config.review.debounce_ms,
        download_dir = %review.download_dir().display(),
        "review service ready"
    );

    let ctx = Arc::new(BotContext {
        bot,
        bot_username,
        config: telegram,
        outbound,
        review: Arc::clone(&review),
        behance: BehanceImporter::new()?,
    });

    let cancel = CancellationToken::new();
    let polling = folio_telegram::start_polling(ctx, cancel.clone());

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("shutdown requested");
        },
        () = cancel.cancelled() => {},
    }
    cancel.cancel();
    polling.await?;

    let discarded = review.shutdown().await;
    info!(discarded, "folio stopped");
    Ok(())
}
