//! ShopEase CLI - Drive a storefront from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Who am I?
//! shopease session
//!
//! # Would /checkout render for this session?
//! shopease -u alice gate /checkout
//!
//! # Add two units of product 3, then bump line 12
//! shopease -u alice cart add 3 -q 2
//! shopease -u alice cart inc 12
//!
//! # Place an order
//! shopease -u alice checkout --address "1 Main St"
//! ```
//!
//! # Commands
//!
//! - `session` - Show the resolved session
//! - `gate` - Classify a storefront path for the session
//! - `product` / `products` - Catalog reads
//! - `cart` - Show and change the cart
//! - `checkout` / `orders` - Place orders and list them
//!
//! Configuration comes from the environment (see `StorefrontConfig`);
//! `SHOPEASE_USERNAME` and `SHOPEASE_PASSWORD` log in before the command.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use shopease_core::{CartItemId, LoginCredentials, ProductId};
use shopease_storefront::{AppError, Notice, Storefront, StorefrontConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "shopease")]
#[command(author, version, about = "ShopEase storefront client")]
struct Cli {
    /// Log in as this user before running the command
    #[arg(short, long, global = true, env = "SHOPEASE_USERNAME")]
    username: Option<String>,

    /// Password for --username
    #[arg(long, global = true, env = "SHOPEASE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Emit logs as JSON lines (for log collectors)
    #[arg(long, global = true, env = "SHOPEASE_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the resolved session
    Session,
    /// Classify a storefront path (render, wait or redirect)
    Gate {
        /// Path such as /checkout or /products/3/edit
        path: String,
    },
    /// Show one product
    Product { id: ProductId },
    /// List products
    Products {
        #[arg(long)]
        category: Option<String>,
        /// Match against name and description
        #[arg(long)]
        search: Option<String>,
        /// Only products with stock left
        #[arg(long)]
        in_stock: bool,
    },
    /// Show and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for the cart
    Checkout {
        /// Shipping address
        #[arg(short, long)]
        address: String,
    },
    /// List your orders
    Orders,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        product: ProductId,
        /// Units to add
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        quantity: u32,
    },
    /// One more unit of a line
    Inc { item: CartItemId },
    /// One unit fewer (removes the line at 1)
    Dec { item: CartItemId },
    /// Set a line's quantity
    Set { item: CartItemId, quantity: u32 },
    /// Remove a line
    Remove { item: CartItemId },
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

/// Map tracing levels to Sentry: errors and warnings become events, the
/// rest breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            let err = AppError::from(e);
            output::notice(&Notice::from(&err));
            std::process::exit(2);
        }
    };

    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopease_storefront=info,shopease_cli=info".into());

    // Logs go to stderr so command output stays pipeable
    let json_layer = cli.log_json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer =
        (!cli.log_json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        e.capture();
        output::notice(&Notice::from(&e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), AppError> {
    let storefront = Storefront::new(config)?;

    if let Some(username) = cli.username {
        let credentials = LoginCredentials::new(username, cli.password.unwrap_or_default());
        let user = storefront.login(&credentials).await?;
        tracing::debug!(user_id = %user.id, "Logged in for command");
    }

    match cli.command {
        Commands::Session => commands::session::show(&storefront).await,
        Commands::Gate { path } => commands::session::gate(&storefront, &path).await,
        Commands::Product { id } => commands::shop::product(&storefront, id).await?,
        Commands::Products {
            category,
            search,
            in_stock,
        } => commands::shop::products(&storefront, category, search, in_stock).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&storefront).await?,
            CartAction::Add { product, quantity } => {
                commands::cart::add(&storefront, product, quantity).await?;
            }
            CartAction::Inc { item } => commands::cart::increment(&storefront, item).await?,
            CartAction::Dec { item } => commands::cart::decrement(&storefront, item).await?,
            CartAction::Set { item, quantity } => {
                commands::cart::set(&storefront, item, quantity).await?;
            }
            CartAction::Remove { item } => commands::cart::remove(&storefront, item).await?,
        },
        Commands::Checkout { address } => commands::shop::checkout(&storefront, &address).await?,
        Commands::Orders => commands::shop::orders(&storefront).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_zero_quantity_is_rejected_by_parser() {
        assert!(Cli::try_parse_from(["shopease", "cart", "add", "3", "-q", "0"]).is_err());
        assert!(Cli::try_parse_from(["shopease", "cart", "add", "3", "-q", "2"]).is_ok());
    }
}
