use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::{fs, process};

use payoff::api;
use payoff::core::{PayoffSummary, Strategy, compare_strategies, run_simulation};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliStrategy {
    Snowball,
    Avalanche,
    Hybrid,
}

impl From<CliStrategy> for Strategy {
    fn from(value: CliStrategy) -> Self {
        match value {
            CliStrategy::Snowball => Strategy::Snowball,
            CliStrategy::Avalanche => Strategy::Avalanche,
            CliStrategy::Hybrid => Strategy::Hybrid,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "payoff",
    about = "Debt payoff simulator with snowball and avalanche strategies and a JSON HTTP API"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API over HTTP.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Run a payoff simulation for a portfolio file and print JSON.
    Simulate {
        /// Path to a JSON array of debt instruments.
        #[arg(long)]
        portfolio: PathBuf,
        /// Strategy to run; omit to compare all strategies.
        #[arg(long, value_enum)]
        strategy: Option<CliStrategy>,
        /// Extra amount paid toward the target instrument each month.
        #[arg(long, default_value_t = 0.0)]
        extra_payment: f64,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ComparisonOutput<'a> {
    cheapest_strategy: &'a str,
    fastest_strategy: &'a str,
    summaries: &'a [PayoffSummary],
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve { port } => {
            if let Err(e) = api::run_http_server(port).await {
                eprintln!("Server error: {e}");
                process::exit(1);
            }
        }
        Command::Simulate {
            portfolio,
            strategy,
            extra_payment,
        } => {
            if let Err(e) = run_simulate_command(&portfolio, strategy, extra_payment) {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    }
}

fn run_simulate_command(
    path: &Path,
    strategy: Option<CliStrategy>,
    extra_payment: f64,
) -> Result<(), String> {
    let json = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let instruments = api::parse_portfolio(&json)?;

    let output = match strategy {
        Some(cli_strategy) => {
            let summary = run_simulation(cli_strategy.into(), &instruments, extra_payment)
                .map_err(|e| e.to_string())?;
            serde_json::to_string_pretty(&summary)
        }
        None => {
            let comparison =
                compare_strategies(&instruments, extra_payment).map_err(|e| e.to_string())?;
            serde_json::to_string_pretty(&ComparisonOutput {
                cheapest_strategy: &comparison.summaries[comparison.cheapest_index].strategy_name,
                fastest_strategy: &comparison.summaries[comparison.fastest_index].strategy_name,
                summaries: &comparison.summaries,
            })
        }
    }
    .map_err(|e| format!("Failed to serialize result: {e}"))?;

    println!("{output}");
    Ok(())
}
