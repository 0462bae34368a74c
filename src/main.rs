//! ONNX Optimizer CLI
//!
//! Applies constant folding to an ONNX model and writes the optimized model.

use anyhow::Context;
use clap::Parser;
use onnx_optimizer::{available_passes, FoldOrder, Optimizer, OptimizerConfig};
use std::path::PathBuf;
use std::process;

/// Fold constant subgraphs of an ONNX model into initializers
#[derive(Parser, Debug)]
#[command(name = "onnx-optimize")]
#[command(version)]
#[command(about = "Constant-folding optimizer for ONNX models", long_about = None)]
struct Args {
    /// Path to input ONNX model file (can be set in config file)
    #[arg(short = 'i', long)]
    infile: Option<PathBuf>,

    /// Path to write the optimized model to (can be set in config file)
    #[arg(short = 'o', long)]
    outfile: Option<PathBuf>,

    /// Path to config file (TOML format)
    ///
    /// If not specified, searches for config in:
    /// 1. ./onnx-optimizer.toml
    /// 2. ./.onnx-optimizer.toml
    /// 3. ~/.config/onnx-optimizer/config.toml
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Optimization pass to apply (repeatable, applied in order)
    ///
    /// Defaults to CONSTANT_FOLDING.
    #[arg(short = 'p', long = "pass")]
    passes: Vec<String>,

    /// Node visit order for constant folding: "topological" or "sequential"
    #[arg(long = "fold-order")]
    fold_order: Option<FoldOrder>,

    /// Do not list folded constants among the graph inputs
    #[arg(long = "no-expose-folded-inputs")]
    no_expose_folded_inputs: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print the registered passes and exit
    #[arg(long = "list-passes")]
    list_passes: bool,
}

fn main() {
    let args = Args::parse();

    // Initialize tracing
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    if args.list_passes {
        for name in available_passes() {
            println!("{}", name);
        }
        return Ok(());
    }

    // Load config file (if specified or found in standard locations)
    let config = if let Some(config_path) = &args.config {
        OptimizerConfig::load(config_path)
            .with_context(|| format!("Failed to load config file {}", config_path.display()))?
    } else {
        match OptimizerConfig::find_and_load() {
            Ok(Some(cfg)) => {
                if args.verbose {
                    println!("Loaded config from standard location");
                }
                cfg
            }
            Ok(None) => OptimizerConfig::default(),
            Err(e) => {
                eprintln!("Warning: Ignoring config file: {}", e);
                OptimizerConfig::default()
            }
        }
    };

    // Merge config with CLI args (CLI takes precedence)
    let merged = config.merge_with_cli(
        args.infile,
        args.outfile,
        if args.passes.is_empty() { None } else { Some(args.passes) },
        args.fold_order,
        if args.no_expose_folded_inputs { Some(false) } else { None },
        if args.verbose { Some(true) } else { None },
    );

    let input_path = merged
        .input
        .context("--infile must be specified (or set in config file)")?;
    let output_path = merged
        .output
        .context("--outfile must be specified (or set in config file)")?;

    let optimizer = Optimizer::new()
        .with_passes(merged.passes)
        .with_fold_order(merged.fold_order)
        .with_expose_folded_as_inputs(merged.expose_folded_as_inputs)
        .with_verbose(merged.verbose);

    let report = optimizer
        .optimize_file(&input_path, &output_path)
        .with_context(|| format!("Failed to optimize {}", input_path.display()))?;

    println!("\n✅ Optimization Complete!");
    println!("{}", report);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_required_paths() {
        let args = Args::parse_from(["onnx-optimize", "--infile", "in.onnx", "--outfile", "out.onnx"]);
        assert_eq!(args.infile, Some(PathBuf::from("in.onnx")));
        assert_eq!(args.outfile, Some(PathBuf::from("out.onnx")));
        assert!(args.passes.is_empty());
        assert_eq!(args.fold_order, None);
        assert!(!args.verbose);
    }

    #[test]
    fn test_parse_short_flags_and_passes() {
        let args = Args::parse_from([
            "onnx-optimize",
            "-i",
            "in.onnx",
            "-o",
            "out.onnx",
            "-p",
            "CONSTANT_FOLDING",
            "-p",
            "CONSTANT_FOLDING",
            "--fold-order",
            "sequential",
            "-v",
        ]);
        assert_eq!(args.passes, vec!["CONSTANT_FOLDING", "CONSTANT_FOLDING"]);
        assert_eq!(args.fold_order, Some(FoldOrder::Sequential));
        assert!(args.verbose);
    }

    #[test]
    fn test_parse_rejects_bad_fold_order() {
        let result = Args::try_parse_from(["onnx-optimize", "-i", "a", "-o", "b", "--fold-order", "random"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_run_without_outfile_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("empty.toml");
        std::fs::write(&config, "").unwrap();

        let args = Args::parse_from([
            "onnx-optimize",
            "-i",
            "in.onnx",
            "-c",
            config.to_str().unwrap(),
        ]);
        let err = run(args).unwrap_err();
        assert!(err.to_string().contains("--outfile"));
    }
}
