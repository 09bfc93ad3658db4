//! CLI mode
//!
//! One-shot subcommands that share the server's storage and cache wiring.

use anyhow::{Context, Result};
use colored::Colorize;

use crate::cli::Commands;
use crate::config::StaticConfig;
use crate::errors::TinylinkError;
use crate::runtime::lifetime;

/// Run a single subcommand and return
pub async fn run_cli(command: Commands, config: &StaticConfig) -> Result<()> {
    match command {
        Commands::GenerateConfig { path } => generate_config(path),
        Commands::Shorten { url } => {
            let startup = lifetime::startup::prepare_startup(config).await?;
            let result = startup.coordinator.shorten(&url).await;
            // 进程退出前必须等待后台写入完成
            startup.coordinator.flush_writes().await;

            let shortened = result.map_err(report)?;
            let verb = if shortened.created { "Shortened" } else { "Already shortened" };
            println!(
                "{} {}: {} -> {} (expires: {})",
                "✓".bold().green(),
                verb,
                shortened.code.cyan(),
                shortened.long_url.blue().underline(),
                shortened
                    .expire_on
                    .format("%Y-%m-%d %H:%M:%S UTC")
                    .to_string()
                    .yellow()
            );
            Ok(())
        }
        Commands::Resolve { code } => {
            let startup = lifetime::startup::prepare_startup(config).await?;
            let long_url = startup.coordinator.resolve(&code).await.map_err(report)?;
            println!(
                "{} {} -> {}",
                "✓".bold().green(),
                code.cyan(),
                long_url.blue().underline()
            );
            Ok(())
        }
        Commands::Sweep => {
            let startup = lifetime::startup::prepare_startup(config).await?;
            let removed = startup.sweeper.sweep_once().await.map_err(report)?;
            println!(
                "{} Removed {} expired mappings",
                "✓".bold().green(),
                removed.to_string().magenta()
            );
            Ok(())
        }
    }
}

fn report(err: TinylinkError) -> anyhow::Error {
    eprintln!("{}", err.format_colored());
    anyhow::Error::new(err)
}

/// Generate example configuration file
fn generate_config(output_path: Option<String>) -> Result<()> {
    let Some(path) = output_path else {
        print!("{}", StaticConfig::generate_sample_config());
        return Ok(());
    };

    println!(
        "{} {}",
        "Generating configuration file...".yellow(),
        path.blue()
    );

    StaticConfig::default()
        .save_to_file(&path)
        .map_err(|e| anyhow::anyhow!("{}", e))
        .with_context(|| format!("Unable to write configuration file {}", path))?;

    println!(
        "  {} {}",
        "Configuration file generated successfully".green(),
        path.blue()
    );
    Ok(())
}
