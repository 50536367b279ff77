//! `jbake` command-line entry point.

use anyhow::{Context, Result};
use clap::Parser;
use jbake::{
    cli::{Cli, Commands},
    config::SiteConfig,
    log,
    oven::Oven,
};
use std::path::Path;

fn main() -> Result<()> {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));
    let config: &'static SiteConfig = Box::leak(Box::new(load_config(cli)?));

    match &cli.command {
        Commands::Bake { reset } => bake(config, *reset),
        Commands::Prune => {
            let removed = Oven::new(config, false).prune()?;
            log!("prune"; "{} document(s) removed", removed.len());
            Ok(())
        }
        Commands::Engines => {
            for entry in Oven::new(config, false).engines() {
                println!("{:<16} {:<12} {}", entry.kind, entry.key, entry.implementation);
            }
            Ok(())
        }
    }
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &'static Cli) -> Result<SiteConfig> {
    let root = cli.root.as_deref().unwrap_or(Path::new("./"));
    let config_path = root.join(&cli.config);

    let mut config = if config_path.exists() {
        SiteConfig::from_path(&config_path)
            .with_context(|| format!("failed to load `{}`", config_path.display()))?
    } else {
        SiteConfig::default()
    };
    config.update_with_cli(cli);

    config.validate()?;

    Ok(config)
}

fn bake(config: &'static SiteConfig, reset: bool) -> Result<()> {
    let report = Oven::new(config, reset).bake()?;
    log!(
        "bake";
        "done: {} document(s), {} artifact(s), {} asset(s) into {}",
        report.rendered,
        report.artifacts,
        report.assets,
        config.build.output.display()
    );
    Ok(())
}
