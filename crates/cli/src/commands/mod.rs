//! Subcommand definitions and handlers.

pub mod account;
pub mod auth;
pub mod cart;
pub mod catalog;

use std::sync::Arc;

use clap::{Subcommand, ValueEnum};

use medusa_storefront_client::medusa::FrequencyInterval;
use medusa_storefront_client::storage::FileStore;
use medusa_storefront_client::{Storefront, StorefrontConfig};

use crate::error::CliError;

/// Open the persisted state directory and build the storefront on it.
///
/// # Errors
///
/// Returns an error if the state directory is unusable or the HTTP client
/// fails to build.
pub fn open(config: &StorefrontConfig) -> Result<Storefront, CliError> {
    let store = FileStore::open(&config.state_dir)?;
    tracing::debug!(path = %store.path().display(), "Opened state store");
    Ok(Storefront::new(config, Arc::new(store))?)
}

#[derive(Subcommand)]
pub enum ProductAction {
    /// List products
    List {
        /// Restrict to a collection
        #[arg(long)]
        collection: Option<String>,
        #[arg(long, default_value = "20")]
        limit: u32,
        #[arg(long, default_value = "0")]
        offset: u32,
    },
    /// Show one product by handle (or id with --id)
    Show {
        handle: String,
        /// Treat the argument as a product id
        #[arg(long)]
        id: bool,
    },
    /// Free-text product search
    Search {
        query: String,
        #[arg(long, default_value = "20")]
        limit: u32,
    },
}

#[derive(Subcommand)]
pub enum CollectionAction {
    /// List collections
    List,
    /// Show one collection by handle
    Show { handle: String },
}

/// Delivery interval accepted on the command line.
#[derive(Clone, Copy, ValueEnum)]
pub enum Interval {
    Day,
    Week,
    Month,
}

impl From<Interval> for FrequencyInterval {
    fn from(interval: Interval) -> Self {
        match interval {
            Interval::Day => Self::Day,
            Interval::Week => Self::Week,
            Interval::Month => Self::Month,
        }
    }
}

#[derive(Subcommand)]
pub enum CartAction {
    /// Show the current cart
    Show,
    /// Add a variant to the cart
    Add {
        variant_id: String,
        #[arg(short, long, default_value = "1")]
        quantity: u32,
    },
    /// Add a variant as a recurring subscription
    Subscribe {
        variant_id: String,
        #[arg(short, long, default_value = "1")]
        quantity: u32,
        #[arg(long, value_enum, default_value = "month")]
        interval: Interval,
        /// Deliver every N intervals
        #[arg(long, default_value = "1")]
        every: u32,
    },
    /// Set a line's quantity (zero or less removes it)
    Update {
        line_id: String,
        #[arg(allow_hyphen_values = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove { line_id: String },
    /// Apply (or with --remove, drop) a discount code
    Discount {
        code: String,
        #[arg(long)]
        remove: bool,
    },
    /// Set the checkout email
    Email { email: String },
    /// Forget the current cart
    Clear,
}

#[derive(Subcommand)]
pub enum BasketAction {
    /// Show the basket (local lines, or the cart once signed in)
    Show,
    /// Add to the basket
    Add {
        variant_id: String,
        #[arg(short, long, default_value = "1")]
        quantity: u32,
    },
    /// Set a local line's quantity (zero removes it)
    Set { variant_id: String, quantity: u32 },
    /// Push local lines into the server cart
    Merge,
}

#[derive(Subcommand)]
pub enum AuthAction {
    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show the signed-in customer
    Whoami,
    /// Send a password reset email
    ForgotPassword { email: String },
}

#[derive(Subcommand)]
pub enum AccountAction {
    /// List records
    List {
        #[arg(long, default_value = "20")]
        limit: u32,
        #[arg(long, default_value = "0")]
        offset: u32,
    },
    /// Show one record
    Show { id: String },
}

/// Saved addresses and payment methods come back as one unpaged list.
#[derive(Subcommand)]
pub enum SavedAction {
    /// List saved records
    List,
    /// Show one saved record
    Show { id: String },
}

#[derive(Subcommand)]
pub enum SubscriptionAction {
    /// List subscriptions
    List,
    /// Show one subscription
    Show { id: String },
    /// Pause deliveries
    Pause { id: String },
    /// Resume deliveries
    Resume { id: String },
    /// Cancel a subscription
    Cancel {
        id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Skip the next delivery
    Skip { id: String },
    /// Change the delivery frequency
    Frequency {
        id: String,
        #[arg(long, value_enum)]
        interval: Interval,
        #[arg(long, default_value = "1")]
        every: u32,
    },
}
