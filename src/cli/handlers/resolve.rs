// src/cli/handlers/resolve.rs

use crate::cli::args::ResolveArgs;
use crate::models::EffectiveConfiguration;
use anyhow::{Context, Result};
use clap::Parser;
use colored::*;

/// The handler for `cascade resolve`: prints a template's effective configuration.
pub fn handle(args: Vec<String>) -> Result<()> {
    let resolve_args = ResolveArgs::try_parse_from(&args)?;
    let config = run(&resolve_args)?;

    if resolve_args.json {
        let json = serde_json::to_string_pretty(&config)
            .context("Could not serialize the effective configuration")?;
        println!("{}", json);
    } else {
        print_config(&resolve_args, &config);
    }
    Ok(())
}

/// Builds a host from `args` and resolves the template's configuration.
pub fn run(args: &ResolveArgs) -> Result<EffectiveConfiguration> {
    let (_, host) = args.host.build()?;
    Ok(host.resolve(&args.path)?)
}

fn print_config(args: &ResolveArgs, config: &EffectiveConfiguration) {
    println!("\n{}", args.path.display().to_string().bold());
    println!("  {:<12} {}", "base class".cyan(), config.base_class);
    println!("  {:<12} {}", "template".cyan(), config.base_type_template);
    println!("  {:<12} {}", "model".cyan(), config.model_type);
    println!("  {}", "namespaces".cyan());
    for namespace in &config.namespaces {
        println!("    {}", namespace);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::HostArgs;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_reads_config_root() {
        let views = tempdir().unwrap();
        fs::create_dir_all(views.path().join("A")).unwrap();
        fs::write(views.path().join("cascade.toml"), "default_model = \"object\"\n").unwrap();
        fs::write(views.path().join("A/_imports.tmpl"), "@using A.Helpers\n").unwrap();
        fs::write(views.path().join("A/page.tmpl"), "x").unwrap();

        let args = ResolveArgs {
            path: PathBuf::from("A/page.tmpl"),
            host: HostArgs {
                root: Some(views.path().to_path_buf()),
                config: None,
            },
            json: true,
        };
        let config = run(&args).unwrap();
        assert_eq!(config.model_type, "object");
        assert_eq!(config.base_class, "TemplatePage<object>");
        assert_eq!(config.namespaces.last().map(String::as_str), Some("A.Helpers"));
    }
}
