//! Models command - inspect installed models.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use eyenemia_adapters::{models_dir, ModelRegistry};

use crate::config::AppConfig;

/// Arguments for the models command
#[derive(Args)]
pub struct ModelsArgs {
    /// Custom models directory (overrides default and config)
    #[arg(long, value_name = "DIR", global = true)]
    pub models_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Models subcommands
#[derive(Subcommand)]
pub enum ModelsCommand {
    /// List known models and whether they are installed
    List,
    /// Print model directory path
    Path,
    /// Print SHA-256 digests of installed models
    Hash,
}

/// Run the models command.
pub fn run(args: &ModelsArgs, config: &AppConfig) -> Result<()> {
    let dir = args
        .models_dir
        .clone()
        .or_else(|| config.models.dir.clone())
        .unwrap_or_else(models_dir);
    let registry = ModelRegistry::new(dir);

    match args.command {
        ModelsCommand::List => {
            list_models(&registry);
            Ok(())
        }
        ModelsCommand::Path => {
            println!("{}", registry.dir().display());
            Ok(())
        }
        ModelsCommand::Hash => hash_models(&registry),
    }
}

fn list_models(registry: &ModelRegistry) {
    let models = registry.list();

    println!("Models directory: {}", registry.dir().display());
    println!();

    for status in &models {
        let mark = if status.installed { "✓" } else { "✗" };
        println!(
            "  {mark} {} ({}, {})",
            status.info.name, status.info.filename, status.info.role
        );
    }

    println!();
    let installed_count = models.iter().filter(|s| s.installed).count();
    println!("{}/{} models installed", installed_count, models.len());
}

fn hash_models(registry: &ModelRegistry) -> Result<()> {
    let installed: Vec<_> = registry.list().into_iter().filter(|s| s.installed).collect();
    if installed.is_empty() {
        anyhow::bail!("No models installed in {}", registry.dir().display());
    }
    for status in installed {
        let digest = registry.sha256(status.info.name)?;
        println!("{digest}  {}", status.info.filename);
    }
    Ok(())
}
