mod cli;
mod config;
mod platform;

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use telemetry_logging::{telemetry_error, telemetry_info};

use cli::Cli;
use config::DashboardConfig;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    telemetry_logging::initialize(cli.log_to.into(), level, &cli.log_file);

    let mut config = DashboardConfig::load(cli.config.as_deref())
        .context("failed to load dashboard config")?;
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Err(err) = config.validate() {
        telemetry_error!("invalid configuration: {err}");
        return Err(err).context("invalid dashboard configuration");
    }
    telemetry_info!("backend at {}", config.base_url);

    platform::run_app(config, cli.launch(), &cli.session)
}
