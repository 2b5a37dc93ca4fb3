// src/cli/handlers/chain.rs

use crate::cli::args::ChainArgs;
use crate::cli::handlers::commons::status_mark;
use crate::core::host::CompilationHost;
use anyhow::Result;
use clap::Parser;
use colored::*;
use std::path::{Path, PathBuf};

/// The handler for `cascade chain`: lists every directive file location that applies
/// to a template, root first, and whether a file is present there.
pub fn handle(args: Vec<String>) -> Result<()> {
    let chain_args = ChainArgs::try_parse_from(&args)?;
    let (_, host) = chain_args.host.build()?;
    let rows = levels(&host, &chain_args.path)?;

    println!("\n{}", chain_args.path.display().to_string().bold());
    for (depth, (path, present)) in rows.iter().enumerate() {
        let line = format!("{}{}", "  ".repeat(depth), path.display());
        if *present {
            println!("{} {}", status_mark(true), line);
        } else {
            println!("{} {}", status_mark(false), line.dimmed());
        }
    }

    // Parse the present files so malformed ones surface here too.
    let chain = host.resolver().resolve_chain(&chain_args.path)?;
    println!(
        "\n{} directive file(s) apply.",
        chain.len().to_string().cyan()
    );
    Ok(())
}

/// Every candidate directive path with whether it exists.
pub fn levels(host: &CompilationHost, template: &Path) -> Result<Vec<(PathBuf, bool)>> {
    let candidates = host.resolver().directive_paths(template)?;
    Ok(candidates
        .into_iter()
        .map(|candidate| {
            let present = host.storage().exists(&candidate);
            (candidate, present)
        })
        .collect())
}
