//! Backend Flags CLI
//!
//! Inspect the built-in flags as resolved from the current environment.
//!
//! # Usage
//!
//! ```bash
//! # Print every non-ignored flag as a v1 settings file
//! cargo run --bin backend-flags -- dump
//!
//! # Hash after applying a settings file and an override
//! cargo run --bin backend-flags -- --config team.yaml --set triton.cudagraphs=true hash
//!
//! # Show one flag with its default and source
//! cargo run --bin backend-flags -- get compile_threads
//! ```

use backend_flags::config::{Registry, SettingValue};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "backend-flags")]
#[command(about = "Inspect compiler backend flags", long_about = None)]
struct Cli {
    /// Settings file (YAML v1) applied before the command
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// PATH=VALUE override; VALUE is read as JSON, falling back to a string
    #[arg(short, long = "set", value_name = "PATH=VALUE", global = true)]
    overrides: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print non-ignored flags as YAML
    Dump,

    /// Print the configuration hash
    Hash,

    /// Print one flag
    Get {
        /// Dotted flag path
        path: String,
    },

    /// Print flags that differ from their defaults
    Diff,

    /// List flag paths
    Paths {
        /// Only paths below this namespace
        #[arg(short, long)]
        prefix: Option<String>,

        /// Include declared types
        #[arg(long)]
        types: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let registry = backend_flags::global()?;

    if let Some(path) = &cli.config {
        let report = registry.load_yaml(path)?;
        for unknown in &report.unknown {
            eprintln!("warning: {} is not a known flag, skipped", unknown);
        }
        for ignored in &report.ignored {
            eprintln!("note: {} is excluded from saved configs, left unchanged", ignored);
        }
    }
    for raw in &cli.overrides {
        let (path, value) = parse_override(raw)?;
        registry.set(path, value)?;
    }

    match cli.command {
        Commands::Dump => print!("{}", registry.to_yaml()?),
        Commands::Hash => println!("{}", registry.hash()?),
        Commands::Get { path } => print_setting(registry, &path)?,
        Commands::Diff => print_diff(registry),
        Commands::Paths { prefix, types } => print_paths(registry, prefix.as_deref(), types)?,
    }

    Ok(())
}

fn parse_override(raw: &str) -> Result<(&str, SettingValue), Box<dyn std::error::Error>> {
    let (path, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("override '{}' is not PATH=VALUE", raw))?;
    let value = match serde_json::from_str::<serde_json::Value>(value) {
        Ok(json) => SettingValue::from_json(json),
        Err(_) => SettingValue::Str(value.to_string()),
    };
    Ok((path, value))
}

fn print_setting(registry: &Registry, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let setting = registry.setting(path)?;
    println!("{} = {}", setting.path(), setting.value());
    println!("  type:    {}", setting.setting_type());
    println!("  default: {}", setting.default_value());
    if let Some(var) = setting.env_var() {
        println!("  env:     ${}", var);
    }
    if let Some(source) = registry.provenance(path) {
        println!("  source:  {}", source);
    }
    if setting.is_ignored() {
        println!("  ignored: excluded from snapshots and hashes");
    }
    if let Some(doc) = setting.doc() {
        println!("  {}", doc);
    }
    Ok(())
}

fn print_diff(registry: &Registry) {
    let diffs = registry.non_default();
    if diffs.is_empty() {
        println!("All flags at defaults");
        return;
    }
    for diff in diffs {
        println!("{}: {} -> {}", diff.path, diff.default, diff.current);
    }
}

fn print_paths(
    registry: &Registry,
    prefix: Option<&str>,
    types: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let paths = match prefix {
        Some(prefix) => registry.namespace(prefix)?.paths(),
        None => registry.paths(),
    };
    for path in paths {
        if types {
            println!("{}: {}", path, registry.setting_type(&path)?);
        } else {
            println!("{}", path);
        }
    }
    Ok(())
}
