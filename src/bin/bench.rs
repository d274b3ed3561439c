//! Benchmark - run both detectors over random rate sets
//!
//! Run with: cargo run --release --bin bench -- --currencies 40 --rounds 50

use clap::Parser;
use color_eyre::eyre::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use fx_sniper::{Algorithm, AlgorithmSettings, ArbitrageEngine, ExchangeRate};

#[derive(Parser, Debug)]
#[command(name = "bench", about = "Compare Bellman-Ford and Floyd-Warshall on random quotes")]
struct Args {
    /// Currencies per rate set
    #[arg(long, default_value_t = 30)]
    currencies: usize,

    /// Number of random rate sets
    #[arg(long, default_value_t = 20)]
    rounds: usize,

    /// Relative quote noise (0.002 = ±0.2%)
    #[arg(long, default_value_t = 0.002)]
    noise: f64,

    /// Bid/ask spread applied to every quote
    #[arg(long, default_value_t = 0.001)]
    spread: f64,

    #[arg(long, default_value_t = 7)]
    seed: u64,
}

/// Every pair quoted both ways around random mid prices, with noise
fn random_rates(rng: &mut StdRng, currencies: usize, noise: f64, spread: f64) -> Vec<ExchangeRate> {
    let codes: Vec<String> = (0..currencies).map(|i| format!("C{:03}", i)).collect();
    let mids: Vec<f64> = (0..currencies).map(|_| rng.gen_range(0.01..100.0)).collect();

    let mut rates = Vec::with_capacity(currencies * currencies);
    for (i, from) in codes.iter().enumerate() {
        for (j, to) in codes.iter().enumerate() {
            if i == j {
                continue;
            }
            let jitter = 1.0 + noise * rng.gen_range(-1.0..1.0);
            let rate = mids[i] / mids[j] * (1.0 - spread) * jitter;
            rates.push(ExchangeRate::new(from.as_str(), to.as_str(), rate));
        }
    }
    rates
}

#[derive(Default)]
struct Tally {
    total_ms: f64,
    cycles: usize,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);

    let settings_for = |algorithm| AlgorithmSettings {
        max_iterations: args.currencies,
        min_profit_threshold: 0.0,
        max_path_length: 6,
        algorithm,
        ..Default::default()
    };
    let bellman_ford = ArbitrageEngine::new(settings_for(Algorithm::BellmanFord));
    let floyd_warshall = ArbitrageEngine::new(settings_for(Algorithm::FloydWarshall));

    println!(
        "{}",
        style(format!(
            "═══ BENCH: {} rounds × {} currencies ═══",
            args.rounds, args.currencies
        ))
        .blue()
        .bold()
    );

    let progress = ProgressBar::new(args.rounds as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")?.progress_chars("=> "),
    );

    let mut bf = Tally::default();
    let mut fw = Tally::default();
    let mut disagreements = 0;

    for _ in 0..args.rounds {
        let rates = random_rates(&mut rng, args.currencies, args.noise, args.spread);

        let bf_result = bellman_ford.detect(&rates)?;
        let fw_result = floyd_warshall.detect(&rates)?;

        bf.total_ms += bf_result.execution_time_ms;
        bf.cycles += bf_result.total_opportunities;
        fw.total_ms += fw_result.execution_time_ms;
        fw.cycles += fw_result.total_opportunities;

        if !bf_result.canonical_keys().is_subset(&fw_result.canonical_keys()) {
            disagreements += 1;
        }

        progress.set_message(format!("{} / {} cycles", bf.cycles, fw.cycles));
        progress.inc(1);
    }
    progress.finish_with_message("done");

    let rounds = args.rounds.max(1) as f64;
    println!();
    println!(
        "  Bellman-Ford:   {:>8.2}ms avg | {:>5} cycles",
        bf.total_ms / rounds,
        bf.cycles
    );
    println!(
        "  Floyd-Warshall: {:>8.2}ms avg | {:>5} cycles",
        fw.total_ms / rounds,
        fw.cycles
    );

    if disagreements == 0 {
        println!("  {} Bellman-Ford never reported a cycle Floyd-Warshall missed", style("✓").green());
    } else {
        println!(
            "  {} {} rounds where Bellman-Ford found cycles Floyd-Warshall did not",
            style("○").yellow(),
            disagreements
        );
    }

    Ok(())
}
