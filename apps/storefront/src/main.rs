//! # Hat Shop Storefront CLI
//!
//! Operator entry point for the storefront: price a cart, replay a payment
//! confirmation, inspect customers and orders.
//!
//! ```text
//! hatshop quote --cart cart.json [--email jo@example.com]
//! hatshop confirm --event checkout-completed.json
//! hatshop customer --email jo@example.com
//! hatshop order --session cs_live_123
//! hatshop set-status --id <order id> --status shipped
//! hatshop stats [--top 5]
//! hatshop db-status
//! ```
//!
//! All output is JSON on stdout; logs go to stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::error;

use hatshop_core::cart::CartAction;
use hatshop_core::OrderStatus;
use hatshop_storefront::commands::checkout::{self, CheckoutPreview};
use hatshop_storefront::commands::customer::{self, RECENT_ORDERS_LIMIT};
use hatshop_storefront::commands::stats::{self, BEST_SELLERS_LIMIT};
use hatshop_storefront::commands::{cart, order, webhook};
use hatshop_storefront::error::ApiError;
use hatshop_storefront::state::StoreConfig;
use hatshop_storefront::{init_tracing, Storefront};

#[derive(Debug, Parser)]
#[command(name = "hatshop", about = "Hat Shop storefront CLI", long_about = None)]
struct Cli {
    /// Path to storefront.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Price a cart built from a JSON array of cart actions
    Quote(QuoteArgs),
    /// Record a payment confirmation event from a JSON file
    Confirm(ConfirmArgs),
    /// Show tier, progress and recent orders for an email
    Customer(CustomerArgs),
    /// Show the order created for a checkout session
    Order(OrderArgs),
    /// Move an order to a new status
    SetStatus(SetStatusArgs),
    /// Show hats produced, order and customer counts, best sellers and revenue
    Stats(StatsArgs),
    /// Report migration state and database health
    DbStatus,
}

#[derive(Debug, Args)]
struct QuoteArgs {
    /// JSON file holding an array of cart actions
    #[arg(long)]
    cart: PathBuf,

    /// Price for this customer and build the checkout session request
    #[arg(long)]
    email: Option<String>,
}

#[derive(Debug, Args)]
struct ConfirmArgs {
    /// JSON file holding the gateway's confirmation event
    #[arg(long)]
    event: PathBuf,
}

#[derive(Debug, Args)]
struct CustomerArgs {
    #[arg(long)]
    email: String,

    /// Number of recent orders to include
    #[arg(long, default_value_t = RECENT_ORDERS_LIMIT)]
    limit: i64,
}

#[derive(Debug, Args)]
struct OrderArgs {
    /// Payment session id
    #[arg(long)]
    session: String,
}

#[derive(Debug, Args)]
struct SetStatusArgs {
    /// Order id
    #[arg(long)]
    id: String,

    /// pending, paid, processing, shipped, delivered or cancelled
    #[arg(long, value_parser = parse_status)]
    status: OrderStatus,
}

#[derive(Debug, Args)]
struct StatsArgs {
    /// Number of best-selling styles to list
    #[arg(long, default_value_t = BEST_SELLERS_LIMIT)]
    top: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteOutput {
    #[serde(flatten)]
    cart: cart::CartResponse,
    checkout: Option<CheckoutPreview>,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(code = ?err.code, "{}", err.message);
            match serde_json::to_string_pretty(&err) {
                Ok(json) => eprintln!("{json}"),
                Err(_) => eprintln!("{err}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), ApiError> {
    let config = StoreConfig::load(cli.config.as_deref())?;
    let app = Storefront::start(config).await?;

    let result = match cli.command {
        Commands::Quote(args) => quote(&app, args).await,
        Commands::Confirm(args) => {
            let event = read_json(&args.event)?;
            let ack = webhook::handle_payment_confirmed(&app.db, &app.config, &app.engine, event).await?;
            print_json(&ack)
        }
        Commands::Customer(args) => {
            let summary = customer::rewards_summary(&app.db, &app.engine, &args.email, args.limit).await?;
            print_json(&summary)
        }
        Commands::Order(args) => {
            let found = order::get_order_by_session(&app.db, &args.session).await?;
            print_json(&found)
        }
        Commands::SetStatus(args) => {
            let updated = order::update_order_status(&app.db, &args.id, args.status).await?;
            print_json(&updated)
        }
        Commands::Stats(args) => {
            let report = stats::store_stats(&app.db, args.top).await?;
            print_json(&report)
        }
        Commands::DbStatus => {
            let (total, applied) = app.db.inner().migration_status().await?;
            let healthy = app.db.inner().health_check().await;
            print_json(&serde_json::json!({
                "migrationsTotal": total,
                "migrationsApplied": applied,
                "healthy": healthy,
            }))
        }
    };

    app.db.inner().close().await;
    result
}

async fn quote(app: &Storefront, args: QuoteArgs) -> Result<(), ApiError> {
    let actions: Vec<CartAction> = read_json(&args.cart)?;
    for action in actions {
        app.cart.dispatch(action)?;
    }

    let preview = match args.email.as_deref() {
        Some(email) => {
            customer::lookup_customer(&app.loyalty, email).await?;
            Some(checkout::preview_checkout(&app.cart, &app.loyalty, &app.engine, email)?)
        }
        None => None,
    };

    print_json(&QuoteOutput {
        cart: cart::get_cart(&app.cart, &app.loyalty, &app.engine),
        checkout: preview,
    })
}

fn parse_status(raw: &str) -> Result<OrderStatus, String> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_lowercase()))
        .map_err(|_| format!("unknown order status '{}'", raw))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ApiError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ApiError::validation(format!("Cannot read {}: {}", path.display(), e)))?;
    serde_json::from_str(&text)
        .map_err(|e| ApiError::validation(format!("Invalid JSON in {}: {}", path.display(), e)))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ApiError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::internal(format!("Failed to serialize output: {}", e)))?;
    println!("{json}");
    Ok(())
}
