use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;
use anyhow::Result;
use georoi_core::Settings;
use std::path::Path;

mod doctor;
mod intersect;
mod roi;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);

    match cli.command {
        Commands::Doctor(args) => doctor::execute(args, &cli.env_file, &output).await,
        Commands::Roi(args) => {
            let settings = load_settings(&cli.env_file)?;
            roi::execute(args, &settings, &output).await
        }
        Commands::Intersect(args) => {
            let settings = load_settings(&cli.env_file)?;
            intersect::execute(args, &settings, &output).await
        }
    }
}

fn load_settings(env_file: &Path) -> Result<Settings> {
    let settings = Settings::layered(env_file)?.resolve()?;
    settings.prepare_dirs()?;
    Ok(settings)
}
