//! Refund Desk CLI - quote and issue refunds from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Local estimate from an order snapshot
//! rd-cli quote --order order.json --item 13421:2 --shipping 10.00
//!
//! # Ask the refund gateway for its quote
//! rd-cli calculate --order order.json --item 13421:2 --note "Damaged in transit"
//!
//! # Calculate, then commit
//! rd-cli refund --order order.json --item 13421:2 --confirm
//!
//! # Prior refunds for an order
//! rd-cli history --order-id 5551234
//! ```
//!
//! # Environment Variables
//!
//! - `REFUND_GATEWAY_URL` - required for `calculate`, `refund`, and `history`
//! - `RUST_LOG` - log filter (default: `refund_desk=info,rd_cli=info`)
//! - `LOG_FORMAT` - `json` for structured logs
//! - `SENTRY_DSN` - Sentry error tracking DSN

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use refund_desk::{RefundDeskConfig, ShopSettings};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{CliError, SelectionArgs};

#[derive(Parser)]
#[command(name = "rd-cli")]
#[command(author, version, about = "Refund Desk CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate a refund locally, without contacting the gateway
    Quote(SelectionArgs),
    /// Ask the refund gateway for its authoritative quote
    Calculate(SelectionArgs),
    /// Calculate and commit a refund
    Refund {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Actually move money
        #[arg(long)]
        confirm: bool,
    },
    /// Show refunds already issued for an order
    History {
        /// Order ID (numeric or `gid://shopify/Order/...`)
        #[arg(long)]
        order_id: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &RefundDeskConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "refund_desk=info,rd_cli=info".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    // Gateway settings are only required by the commands that use them
    let config = RefundDeskConfig::from_env();

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli, config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(
    cli: Cli,
    config: Result<RefundDeskConfig, refund_desk::ConfigError>,
) -> Result<(), CliError> {
    match cli.command {
        Commands::Quote(selection) => {
            let shop = match &config {
                Ok(config) => config.shop.clone(),
                Err(_) => ShopSettings::from_env()?,
            };
            commands::quote::run(&shop, &selection)?;
        }
        Commands::Calculate(selection) => {
            commands::refund::calculate(&config?, &selection).await?;
        }
        Commands::Refund { selection, confirm } => {
            commands::refund::commit(&config?, &selection, confirm).await?;
        }
        Commands::History { order_id } => {
            commands::history::run(&config?, &order_id).await?;
        }
    }
    Ok(())
}
