// src/bin/cascade.rs

use anyhow::Result;
use cascade::cli::{Cli, dispatcher};
use clap::Parser;
use colored::*;

/// Sets up logging, parses arguments, dispatches to the command's handler and
/// reports any error in one place.
fn main() {
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse()) {
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    match cli.command {
        Some(command) => dispatcher::dispatch(&command, cli.args),
        None => {
            println!(
                "Usage: cascade <{}> [ARGS..]",
                dispatcher::command_names().join("|")
            );
            Ok(())
        }
    }
}
