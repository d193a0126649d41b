//! Minimal demo binary: read one transaction as JSON from stdin, classify
//! it, print the classification as JSON. Wires logging and config loading
//! together at the smallest scope the engine's boundary allows — no
//! batching, no persistence, no argument parser.

use std::io::Read;

use coinjoin_heuristics::{classify, Config, RawTxView};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("coinjoin_heuristics=info".parse().unwrap()),
        )
        .init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let mut input = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut input) {
        tracing::error!("failed to read stdin: {e}");
        std::process::exit(1);
    }

    let tx: RawTxView = match serde_json::from_str(&input) {
        Ok(tx) => tx,
        Err(e) => {
            tracing::error!("failed to parse transaction JSON: {e}");
            std::process::exit(1);
        }
    };

    let classification = classify(&tx, &config);
    match serde_json::to_string_pretty(&classification) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!("failed to serialize classification: {e}");
            std::process::exit(1);
        }
    }
}
