//! Models command - inspect detector models.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use idcheck_adapters::models::{list_models, models_dir, verify_models, ModelStatus, MODELS};

use crate::config::AppConfig;

/// Arguments for the models command
#[derive(Args)]
pub struct ModelsArgs {
    /// Custom models directory (overrides default and config)
    #[arg(long, value_name = "DIR")]
    pub models_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Models subcommands
#[derive(Subcommand)]
pub enum ModelsCommand {
    /// List installed models
    List,
    /// Print model directory path
    Path,
    /// Check installed models against their checksum files
    Verify,
}

/// Run the models command.
///
/// Returns whether every installed model passed verification; `list` and
/// `path` always succeed.
pub fn run(args: &ModelsArgs, config: &AppConfig) -> Result<bool> {
    let dir = args
        .models_dir
        .clone()
        .or_else(|| config.models.dir.clone())
        .unwrap_or_else(models_dir);

    match args.command {
        ModelsCommand::List => {
            print_list(&dir);
            Ok(true)
        }
        ModelsCommand::Path => {
            println!("{}", dir.display());
            Ok(true)
        }
        ModelsCommand::Verify => verify(&dir),
    }
}

fn print_list(dir: &std::path::Path) {
    let models = list_models(dir);

    println!("Models directory: {}", dir.display());
    println!();

    for (name, installed) in &models {
        let status = if *installed { "✓" } else { "✗" };
        let info = MODELS.iter().find(|m| m.name == *name);
        let filename = info.map_or("unknown", |m| m.filename);
        println!("  {status} {name} ({filename})");
    }

    println!();
    let installed_count = models.iter().filter(|(_, installed)| *installed).count();
    println!("{}/{} models installed", installed_count, models.len());
}

fn verify(dir: &std::path::Path) -> Result<bool> {
    let statuses = verify_models(dir)?;
    let mut ok = true;

    for (name, status) in &statuses {
        match status {
            ModelStatus::Missing => println!("  - {name}: not installed"),
            ModelStatus::Unverified { sha256 } => {
                println!("  ? {name}: {sha256} (no checksum file)");
            }
            ModelStatus::Verified { sha256 } => println!("  ✓ {name}: {sha256}"),
            ModelStatus::Mismatch { expected, actual } => {
                ok = false;
                println!("  ✗ {name}: expected {expected}, found {actual}");
            }
        }
    }

    if !ok {
        eprintln!("error: one or more models failed checksum verification");
    }
    Ok(ok)
}
