//! Storefront CLI - drive the Medusa storefront client by hand.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! sf products list --limit 10
//! sf products show cold-brew
//!
//! # Build a cart
//! sf cart add variant_01H... --quantity 2
//! sf cart update item_01H... 0
//!
//! # Sign in (merges the anonymous basket into the cart)
//! sf auth login -e jane@example.com -p '...'
//! sf subscriptions pause sub_01H...
//! ```
//!
//! Identity state (token, cart id, basket) persists in `STOREFRONT_STATE_DIR`
//! between runs. Results are printed to stdout as JSON; diagnostics go to
//! stderr through `tracing`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use medusa_storefront_client::StorefrontConfig;

mod commands;
mod error;
mod output;

use commands::{
    AccountAction, AuthAction, BasketAction, CartAction, CollectionAction, ProductAction,
    SavedAction, SubscriptionAction,
};
use error::CliError;

#[derive(Parser)]
#[command(name = "sf")]
#[command(author, version, about = "Medusa storefront CLI")]
struct Cli {
    /// Override the state directory (defaults to `STOREFRONT_STATE_DIR`)
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse products
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Browse collections
    Collections {
        #[command(subcommand)]
        action: CollectionAction,
    },
    /// Manage the server cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the basket (local before sign-in, server cart after)
    Basket {
        #[command(subcommand)]
        action: BasketAction,
    },
    /// Sign in, register, sign out
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Order history
    Orders {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// Product subscriptions
    Subscriptions {
        #[command(subcommand)]
        action: SubscriptionAction,
    },
    /// Saved addresses
    Addresses {
        #[command(subcommand)]
        action: SavedAction,
    },
    /// Saved payment methods
    PaymentMethods {
        #[command(subcommand)]
        action: SavedAction,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "medusa_storefront_client=info,sf=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = StorefrontConfig::from_env();

    // Sentry must be initialized before the tracing subscriber
    let sentry_guard = config.as_ref().ok().and_then(init_sentry);
    init_tracing();

    let result = match config {
        Ok(mut config) => {
            if let Some(dir) = cli.state_dir {
                config.state_dir = dir;
            }
            run(cli.command, &config).await
        }
        Err(e) => Err(CliError::from(e)),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &StorefrontConfig) -> Result<(), CliError> {
    let storefront = commands::open(config)?;

    match command {
        Commands::Products { action } => commands::catalog::products(&storefront, action).await,
        Commands::Collections { action } => {
            commands::catalog::collections(&storefront, action).await
        }
        Commands::Cart { action } => commands::cart::run(&storefront, action).await,
        Commands::Basket { action } => commands::cart::basket(&storefront, action).await,
        Commands::Auth { action } => commands::auth::run(&storefront, action).await,
        Commands::Orders { action } => commands::account::orders(&storefront, action).await,
        Commands::Subscriptions { action } => {
            commands::account::subscriptions(&storefront, action).await
        }
        Commands::Addresses { action } => commands::account::addresses(&storefront, action).await,
        Commands::PaymentMethods { action } => {
            commands::account::payment_methods(&storefront, action).await
        }
    }
}
