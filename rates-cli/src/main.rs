//! Rates CLI
//!
//! Command-line interface for the currency rates API.

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use rates_client::RatesClient;
use rates_types::CurrencyCode;

#[derive(Parser)]
#[command(name = "rates")]
#[command(author, version, about = "Currency rates API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the rates API
    #[arg(long, env = "RATES_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rate table operations
    Currency {
        #[command(subcommand)]
        action: CurrencyCommands,
    },
    /// Convert an amount between two currencies
    Convert {
        amount: Decimal,
        #[arg(long)]
        from: CurrencyCode,
        #[arg(long)]
        to: CurrencyCode,
    },
    /// Queue a refresh from the upstream feed
    Refresh,
    /// Automatic refresh control
    AutoUpdate {
        #[command(subcommand)]
        action: AutoUpdateCommands,
    },
    /// Check API health
    Health,
}

#[derive(Subcommand)]
enum CurrencyCommands {
    /// List every stored rate
    List,
    /// Get the rate of one currency
    Get { code: CurrencyCode },
    /// Create or overwrite the rate of one currency
    Set {
        code: CurrencyCode,
        /// Units of base currency per one unit of this currency
        #[arg(long)]
        rate: Decimal,
    },
    /// Delete the rate of one currency
    Delete { code: CurrencyCode },
    /// Evict cached rates (all of them when no code is given)
    Evict { code: Option<CurrencyCode> },
}

#[derive(Subcommand)]
enum AutoUpdateCommands {
    Status,
    Enable,
    Disable,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let client = RatesClient::new(&cli.api_url);

    match cli.command {
        Commands::Health => {
            if client.health().await? {
                println!("✓ API is healthy");
            } else {
                println!("✗ API is not healthy");
            }
        }

        Commands::Currency { action } => match action {
            CurrencyCommands::List => {
                let rates = client.list_currencies().await?;
                println!("{}", serde_json::to_string_pretty(&rates)?);
            }
            CurrencyCommands::Get { code } => {
                let rate = client.get_currency(code).await?;
                println!("{}", serde_json::to_string_pretty(&rate)?);
            }
            CurrencyCommands::Set { code, rate } => {
                let record = client.set_rate(code, rate).await?;
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
            CurrencyCommands::Delete { code } => {
                client.delete_currency(code).await?;
                println!("✓ {} deleted", code);
            }
            CurrencyCommands::Evict { code } => {
                let evicted = client.evict(code).await?;
                println!("{}", serde_json::to_string_pretty(&evicted)?);
            }
        },

        Commands::Convert { amount, from, to } => {
            let result = client.convert(amount, from, to).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Refresh => {
            let accepted = client.refresh().await?;
            println!("{}", accepted.message);
        }

        Commands::AutoUpdate { action } => {
            let status = match action {
                AutoUpdateCommands::Status => client.auto_update_status().await?,
                AutoUpdateCommands::Enable => client.enable_auto_update().await?,
                AutoUpdateCommands::Disable => client.disable_auto_update().await?,
            };
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_lowercase_codes_and_decimal_amounts() {
        let cli = Cli::try_parse_from([
            "rates", "convert", "12.50", "--from", "usd", "--to", "eur",
        ])
        .unwrap();

        match cli.command {
            Commands::Convert { amount, from, to } => {
                assert_eq!(amount, Decimal::new(1250, 2));
                assert_eq!(from, CurrencyCode::USD);
                assert_eq!(to, CurrencyCode::EUR);
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_rejects_unsupported_code() {
        assert!(Cli::try_parse_from(["rates", "currency", "get", "GBP"]).is_err());
    }
}
