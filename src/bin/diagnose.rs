//! Diagnostic tool - Check detection settings
//!
//! Run with: cargo run --bin diagnose

use std::env;

use fx_sniper::AlgorithmSettings;

fn main() {
    println!("🔍 FX SNIPER DIAGNOSTIC CHECK\n");

    // Load .env
    dotenvy::dotenv().ok();

    println!("═══════════════════════════════════════════════════");
    println!("                  ENVIRONMENT                       ");
    println!("═══════════════════════════════════════════════════\n");

    let checks = [
        ("ARB_ALGORITHM", "floyd-warshall", "Which detector runs"),
        ("ARB_MAX_ITERATIONS", "100", "Bellman-Ford relaxation passes"),
        ("ARB_MIN_PROFIT_THRESHOLD", "0.001", "Minimum profit (fraction)"),
        ("ARB_MAX_PATH_LENGTH", "5", "Maximum hops in cycle"),
        ("ARB_SELECTED_CURRENCIES", "(all)", "Currencies kept at ingestion"),
        ("ARB_START_CURRENCIES", "(auto)", "Bellman-Ford start set"),
    ];

    for (key, default, desc) in checks {
        let value = env::var(key).unwrap_or_else(|_| default.to_string());
        let marker = if env::var(key).is_err() { "(default)" } else { "(from env)" };
        println!("  {}: {} {}", key, value, marker);
        println!("    └─ {}\n", desc);
    }

    println!("═══════════════════════════════════════════════════");
    println!("                EFFECTIVE SETTINGS                  ");
    println!("═══════════════════════════════════════════════════\n");

    let settings = match AlgorithmSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            println!("  ❌ Failed to load settings: {}", e);
            return;
        }
    };

    settings.print_summary();
    println!();

    match settings.validate() {
        Ok(()) => println!("  ✅ Settings are valid"),
        Err(e) => println!("  ❌ {}", e),
    }

    let nodes_hint = settings.max_iterations + 1;
    println!(
        "\n  Bellman-Ford results are complete for graphs of up to {} currencies",
        nodes_hint
    );
}
