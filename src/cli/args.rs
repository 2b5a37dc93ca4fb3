// src/cli/args.rs
use crate::config::HostOptions;
use crate::core::host::CompilationHost;
use anyhow::{Context, Result};
use clap::{Args, Parser};
use std::env;
use std::path::PathBuf;

/// Options shared by every command that needs a compilation host.
#[derive(Args, Debug, Default, Clone)]
pub struct HostArgs {
    /// The template root. Defaults to the current directory.
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// A `cascade.toml` to load instead of the one in the root.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl HostArgs {
    /// Resolves options: `--config` first, then `cascade.toml` in the root.
    /// An explicit `--root` always wins over the configured one.
    pub fn load_options(&self) -> Result<HostOptions> {
        let mut options = match &self.config {
            Some(path) => HostOptions::load(path)
                .with_context(|| format!("Could not load '{}'", path.display()))?,
            None => {
                let root = match &self.root {
                    Some(root) => root.clone(),
                    None => env::current_dir()?,
                };
                HostOptions::discover(&root)?
            }
        };
        if let Some(root) = &self.root {
            options.root = root.clone();
        }
        Ok(options)
    }

    pub fn build(&self) -> Result<(HostOptions, CompilationHost)> {
        let options = self.load_options()?;
        let host = options.build_host()?;
        Ok((options, host))
    }
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct CompileArgs {
    /// Templates to compile, relative to the root. Defaults to every template under it.
    pub paths: Vec<PathBuf>,

    #[command(flatten)]
    pub host: HostArgs,

    /// Write one `<ClassName>.gen` file per template into this directory.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Print directive cache counters when done.
    #[arg(long)]
    pub stats: bool,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct ResolveArgs {
    /// The template whose effective configuration to print.
    pub path: PathBuf,

    #[command(flatten)]
    pub host: HostArgs,

    /// Print as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct ChainArgs {
    /// The template whose directive chain to print.
    pub path: PathBuf,

    #[command(flatten)]
    pub host: HostArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_compile_args_parse() {
        let args = CompileArgs::try_parse_from([
            "A/page.tmpl",
            "B/other.tmpl",
            "--root",
            "/views",
            "--out",
            "gen",
            "--stats",
        ])
        .unwrap();
        assert_eq!(args.paths.len(), 2);
        assert_eq!(args.host.root, Some(PathBuf::from("/views")));
        assert_eq!(args.out, Some(PathBuf::from("gen")));
        assert!(args.stats);
    }

    #[test]
    fn test_resolve_args_require_a_path() {
        assert!(ResolveArgs::try_parse_from(["--json"]).is_err());
        let args = ResolveArgs::try_parse_from(["page.tmpl", "--json"]).unwrap();
        assert!(args.json);
    }

    #[test]
    fn test_explicit_root_overrides_config_root() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("cascade.toml");
        fs::write(&config, "root = \"views\"\ndefault_model = \"object\"\n").unwrap();

        let args = HostArgs {
            root: Some(PathBuf::from("/elsewhere")),
            config: Some(config),
        };
        let options = args.load_options().unwrap();
        assert_eq!(options.root, PathBuf::from("/elsewhere"));
        assert_eq!(options.default_model, "object");
    }
}
