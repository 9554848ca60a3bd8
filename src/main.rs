mod assessment;
mod engine;
mod error;
mod history;
mod markup;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use assessment::ShellConfig;

fn main() -> Result<()> {
    // Initialize logging. Control verbosity with RUST_LOG env var:
    //   RUST_LOG=info   cargo run            # transitions + exports
    //   RUST_LOG=debug  cargo run            # + scoring and announcements
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!(
            "Usage: dora-triage [export-path] [tree.json]\n       dora-triage --dump-tree\n\
             \n\
             export-path  file written by the copy command (default dora-assessment-log.txt)\n\
             tree.json    decision graph to use instead of the built-in DORA graph\n\
             \n\
             Logging: set RUST_LOG=debug for verbose output"
        );
        return Ok(());
    }

    if args.iter().any(|a| a == "--dump-tree") {
        let graph = assessment::tree::dora_assessment()?;
        println!("{}", graph.to_json()?);
        return Ok(());
    }

    let defaults = ShellConfig::default();
    let config = ShellConfig {
        export_path: args.first().map(PathBuf::from).unwrap_or(defaults.export_path),
        tree_path: args.get(1).map(PathBuf::from),
    };

    println!("Export file : {}", config.export_path.display());
    if let Some(path) = &config.tree_path {
        println!("Graph       : {}", path.display());
    }

    let stdin = io::stdin();
    assessment::run(&config, &mut stdin.lock(), &mut io::stdout()).context("assessment failed")
}
