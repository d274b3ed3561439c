//! FX Sniper - Currency Arbitrage Cycle Detection
//!
//! Run with: cargo run -- --rates rates.json
//!
//! Without `--rates` the built-in USD/EUR/GBP demo quotes are used.

use clap::Parser;
use color_eyre::eyre::Result;
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fx_sniper::cartographer::feed::{demo_rates, load_rates, select_currencies};
use fx_sniper::{run_with_timeout, Algorithm, AlgorithmSettings, ArbitrageEngine, ArbitrageResult};

#[derive(Parser, Debug)]
#[command(name = "fx-sniper", version, about = "Find profitable currency conversion cycles")]
struct Args {
    /// JSON array of {from, to, rate} quotes
    #[arg(short, long)]
    rates: Option<PathBuf>,

    /// TOML settings file (defaults to ARB_* environment variables)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// bellman-ford or floyd-warshall
    #[arg(short, long)]
    algorithm: Option<String>,

    /// Minimum profit as a fraction (0.001 = 0.1%)
    #[arg(long)]
    min_profit: Option<f64>,

    /// Longest cycle to report, in hops
    #[arg(long)]
    max_path: Option<usize>,

    /// Bellman-Ford relaxation passes
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Only consider these currencies (comma separated)
    #[arg(long, value_delimiter = ',')]
    currencies: Vec<String>,

    /// Give up after this many milliseconds
    #[arg(long, default_value_t = 5_000)]
    timeout_ms: u64,

    /// Print the raw result as JSON
    #[arg(long)]
    json: bool,
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" 🎯 FX SNIPER - Currency Arbitrage Cycle Detection").cyan().bold()
    );
    println!(
        "{}",
        style("    Bellman-Ford | Floyd-Warshall | -ln(rate) weights").cyan()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

fn load_settings(args: &Args) -> Result<AlgorithmSettings> {
    let mut settings = match &args.config {
        Some(path) => AlgorithmSettings::from_file(path)?,
        None => AlgorithmSettings::from_env()?,
    };

    if let Some(algorithm) = &args.algorithm {
        settings.algorithm = algorithm.parse::<Algorithm>()?;
    }
    if let Some(min_profit) = args.min_profit {
        settings.min_profit_threshold = min_profit;
    }
    if let Some(max_path) = args.max_path {
        settings.max_path_length = max_path;
    }
    if let Some(max_iterations) = args.max_iterations {
        settings.max_iterations = max_iterations;
    }
    if !args.currencies.is_empty() {
        settings.selected_currencies = args.currencies.clone();
    }

    Ok(settings.normalized())
}

fn print_result(result: &ArbitrageResult) {
    println!();
    println!("{}", style("═══ RESULTS ═══").magenta().bold());
    println!();
    println!(
        "Algorithm: {} | Rates: {} valid, {} rejected | Time: {:.2}ms",
        result.algorithm_used, result.valid_rates, result.invalid_rates, result.execution_time_ms
    );
    println!();

    if result.cycles.is_empty() {
        println!("{}", style("No arbitrage opportunities found").yellow());
        return;
    }

    for (i, cycle) in result.cycles.iter().enumerate() {
        let marker = if i == 0 {
            style("★").green().bold()
        } else {
            style("•").dim()
        };
        println!(
            "  {} {:>2}. {:+.4}% | {} hops | {}",
            marker,
            i + 1,
            cycle.profit_percentage,
            cycle.hop_count(),
            style(cycle.route()).cyan()
        );
        for hop in &cycle.rates {
            println!("         {} → {} @ {:.6}", hop.from, hop.to, hop.rate);
        }
        if cycle.total_volume > 0.0 {
            println!("         bottleneck volume: {:.2}", cycle.total_volume);
        }
    }

    println!();
    println!(
        "{} {} opportunities",
        style("✓").green(),
        result.total_opportunities
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fx_sniper=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let settings = load_settings(&args)?;

    if let Err(e) = settings.validate() {
        error!("Settings validation failed: {}", e);
        return Err(e);
    }

    if !args.json {
        print_banner();
        settings.print_summary();
    }

    let rates = match &args.rates {
        Some(path) => load_rates(path)?,
        None => {
            info!("No --rates given, using demo quotes");
            demo_rates()
        }
    };
    let rates = select_currencies(&rates, &settings.selected_currencies);

    let engine = Arc::new(ArbitrageEngine::new(settings));
    let result = run_with_timeout(engine, rates, Duration::from_millis(args.timeout_ms)).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    Ok(())
}
