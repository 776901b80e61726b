//! Ignite Shop CLI - catalog checks and checkout smoke tests.
//!
//! # Usage
//!
//! ```bash
//! # Show which product pages are generated at startup
//! ignite-cli paths
//!
//! # Resolve one product the way the storefront would
//! ignite-cli resolve prod_NdSKKrvk4LDcXT
//!
//! # Drive the buy flow against a running storefront
//! ignite-cli buy price_1 --base-url http://127.0.0.1:3000 --timeout-secs 10
//! ```
//!
//! # Commands
//!
//! - `paths` - List pre-rendered product ids
//! - `resolve` - Resolve a product through Stripe and print its view
//! - `buy` - Create a checkout session and print where the buyer goes

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ignite-cli")]
#[command(author, version, about = "Ignite Shop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the product ids generated at startup
    Paths,
    /// Resolve a product through Stripe and print its view
    Resolve {
        /// Stripe product id, e.g. `prod_NdSKKrvk4LDcXT`
        product_id: String,
    },
    /// Start a checkout through a running storefront
    Buy {
        /// Stripe price id, e.g. `price_1`
        price_id: String,

        /// Storefront base URL
        #[arg(long, env = "IGNITE_BASE_URL", default_value = "http://127.0.0.1:3000")]
        base_url: String,

        /// Give up on the checkout request after this many seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // .env may supply IGNITE_BASE_URL and the Stripe settings
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Paths => commands::catalog::paths()?,
        Commands::Resolve { product_id } => commands::catalog::resolve(&product_id).await?,
        Commands::Buy {
            price_id,
            base_url,
            timeout_secs,
        } => commands::buy::buy(&price_id, &base_url, timeout_secs).await?,
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_buy_base_url_defaults_from_dotenv_file() {
        let path = std::env::temp_dir().join(format!("ignite-cli-{}.env", std::process::id()));
        std::fs::write(&path, "IGNITE_BASE_URL=http://shop.internal:8080\n").unwrap();
        dotenvy::from_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let cli = Cli::try_parse_from(["ignite-cli", "buy", "price_1"]).unwrap();

        let Commands::Buy {
            price_id,
            base_url,
            timeout_secs,
        } = cli.command
        else {
            panic!("expected the buy command");
        };
        assert_eq!(price_id, "price_1");
        assert_eq!(base_url, "http://shop.internal:8080");
        assert_eq!(timeout_secs, 30);
    }
}
