// src/cli/handlers/compile.rs

use crate::cli::args::CompileArgs;
use crate::cli::handlers::commons::{print_diagnostic, status_mark};
use crate::constants::GENERATED_EXTENSION;
use crate::system::storage::PhysicalStorage;
use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::*;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs;
use std::path::PathBuf;

/// Outcome of one `compile` run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CompileSummary {
    pub compiled: usize,
    pub failed: usize,
    pub written: Vec<PathBuf>,
}

/// The handler for `cascade compile`.
pub fn handle(args: Vec<String>) -> Result<()> {
    let compile_args = CompileArgs::try_parse_from(&args)?;
    let summary = run(&compile_args)?;

    let total = summary.compiled + summary.failed;
    if summary.failed > 0 {
        return Err(anyhow!(
            "{} of {} template(s) failed to compile.",
            summary.failed,
            total
        ));
    }
    eprintln!(
        "\n{} Compiled {} template(s).",
        status_mark(true),
        total.to_string().cyan()
    );
    Ok(())
}

/// Compiles the requested (or discovered) templates and writes or prints the output.
pub fn run(args: &CompileArgs) -> Result<CompileSummary> {
    let (options, host) = args.host.build()?;

    let templates = if args.paths.is_empty() {
        PhysicalStorage::new(host.root())?
            .discover(&options.template_extension, &options.directive_filename)
            .with_context(|| format!("Could not scan '{}'", host.root().display()))?
    } else {
        args.paths.clone()
    };
    log::debug!("Compiling {} template(s).", templates.len());

    if let Some(out) = &args.out {
        fs::create_dir_all(out)
            .with_context(|| format!("Could not create '{}'", out.display()))?;
    }

    let mut summary = CompileSummary::default();
    // Class name -> the template that first produced it.
    let mut emitted: HashMap<String, PathBuf> = HashMap::new();
    for (path, result) in host.compile_batch(&templates) {
        let generated = match result {
            Ok(generated) => generated,
            Err(e) => {
                eprintln!("{} {}: {}", status_mark(false), path.display(), e);
                summary.failed += 1;
                continue;
            }
        };

        for diagnostic in &generated.diagnostics {
            print_diagnostic(&path, diagnostic);
        }
        if generated.has_errors() {
            eprintln!("{} {}", status_mark(false), path.display());
            summary.failed += 1;
            continue;
        }

        match emitted.entry(generated.class_name.clone()) {
            Entry::Occupied(first) => {
                eprintln!(
                    "{} {}: class name '{}' is already generated from '{}'",
                    status_mark(false),
                    path.display(),
                    generated.class_name,
                    first.get().display()
                );
                summary.failed += 1;
                continue;
            }
            Entry::Vacant(slot) => {
                slot.insert(path.clone());
            }
        }

        match &args.out {
            Some(out) => {
                let target = out.join(format!("{}.{}", generated.class_name, GENERATED_EXTENSION));
                fs::write(&target, &generated.source)
                    .with_context(|| format!("Could not write '{}'", target.display()))?;
                eprintln!(
                    "{} {} -> {}",
                    status_mark(true),
                    path.display(),
                    target.display().to_string().dimmed()
                );
                summary.written.push(target);
            }
            None => {
                println!("// {}", path.display());
                println!("{}", generated.source);
            }
        }
        summary.compiled += 1;
    }

    if args.stats {
        let stats = host.resolver().cache().stats();
        eprintln!(
            "\n{} hits: {}, misses: {}, revalidations: {}",
            "Directive cache".bold(),
            stats.hits,
            stats.misses,
            stats.revalidations
        );
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::HostArgs;
    use tempfile::tempdir;

    fn write_tree(root: &std::path::Path) {
        fs::create_dir_all(root.join("A")).unwrap();
        fs::write(root.join("_imports.tmpl"), "@using Shared.Utils\n").unwrap();
        fs::write(root.join("A/_imports.tmpl"), "@inherits CustomBase<TModel>\n").unwrap();
        fs::write(root.join("A/page.tmpl"), "Hello @Model.Name").unwrap();
        fs::write(root.join("index.tmpl"), "Home").unwrap();
    }

    #[test]
    fn test_compile_discovers_and_writes_outputs() {
        let views = tempdir().unwrap();
        let out = tempdir().unwrap();
        write_tree(views.path());

        let args = CompileArgs {
            paths: Vec::new(),
            host: HostArgs {
                root: Some(views.path().to_path_buf()),
                config: None,
            },
            out: Some(out.path().to_path_buf()),
            stats: true,
        };
        let summary = run(&args).unwrap();

        assert_eq!(summary.compiled, 2);
        assert_eq!(summary.failed, 0);
        let page = fs::read_to_string(out.path().join("A_page_tmpl.gen")).unwrap();
        assert!(page.contains("public class A_page_tmpl : CustomBase<dynamic>"));
        assert!(page.contains("using Shared.Utils;"));
        assert!(out.path().join("index_tmpl.gen").is_file());
    }

    #[test]
    fn test_compile_rejects_class_name_collision() {
        let views = tempdir().unwrap();
        let out = tempdir().unwrap();
        fs::create_dir_all(views.path().join("A")).unwrap();
        fs::write(views.path().join("A/page.tmpl"), "nested").unwrap();
        fs::write(views.path().join("A_page.tmpl"), "flat").unwrap();

        let args = CompileArgs {
            paths: Vec::new(),
            host: HostArgs {
                root: Some(views.path().to_path_buf()),
                config: None,
            },
            out: Some(out.path().to_path_buf()),
            stats: false,
        };
        let summary = run(&args).unwrap();

        assert_eq!(summary.compiled, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.written, vec![out.path().join("A_page_tmpl.gen")]);
        let kept = fs::read_to_string(out.path().join("A_page_tmpl.gen")).unwrap();
        assert!(kept.contains("WriteLiteral(\"nested\");"));
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_compile_counts_failures() {
        let views = tempdir().unwrap();
        write_tree(views.path());
        fs::write(views.path().join("A/_imports.tmpl"), "@model\n").unwrap();

        let args = CompileArgs {
            paths: vec![PathBuf::from("A/page.tmpl"), PathBuf::from("index.tmpl")],
            host: HostArgs {
                root: Some(views.path().to_path_buf()),
                config: None,
            },
            out: None,
            stats: false,
        };
        let summary = run(&args).unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.compiled, 1);
    }
}
