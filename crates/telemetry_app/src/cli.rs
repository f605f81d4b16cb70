use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use telemetry_core::{FilterField, PageKind};
use telemetry_logging::{LogDestination, DEFAULT_LOG_FILE};

use crate::platform::Launch;

#[derive(Debug, Parser)]
#[command(name = "telemetry_dashboard", version, about = "Live asset telemetry dashboard")]
pub struct Cli {
    /// RON config file; built-in defaults when omitted.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Backend base url, overrides the config file.
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Key of the browsing session sharing the asset selection.
    #[arg(
        long,
        value_name = "KEY",
        env = "TELEMETRY_DASHBOARD_SESSION",
        default_value = "default"
    )]
    pub session: String,

    #[arg(long, value_enum, default_value_t = LogTarget::File)]
    pub log_to: LogTarget,

    #[arg(long, value_name = "FILE", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Log at debug level.
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub page: Option<PageCommand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum PageCommand {
    /// Asset search page.
    Search {
        #[arg(long)]
        query: Option<String>,
        #[arg(long = "type", value_name = "TYPE")]
        asset_type: Option<String>,
        #[arg(long)]
        manufacturer: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        region: Option<String>,
    },
    /// Session dashboard.
    Dashboard {
        /// Show sessions for this asset only.
        #[arg(long)]
        asset: Option<String>,
    },
}

impl Cli {
    /// Search page with no initial controls when no page is given.
    pub fn launch(&self) -> Launch {
        match &self.page {
            None => Launch {
                page: Some(PageKind::Search),
                ..Launch::default()
            },
            Some(PageCommand::Search {
                query,
                asset_type,
                manufacturer,
                status,
                region,
            }) => {
                let filters = [
                    (FilterField::Type, asset_type),
                    (FilterField::Manufacturer, manufacturer),
                    (FilterField::Status, status),
                    (FilterField::Region, region),
                ]
                .into_iter()
                .filter_map(|(field, value)| value.clone().map(|value| (field, value)))
                .collect();
                Launch {
                    page: Some(PageKind::Search),
                    query: query.clone(),
                    filters,
                    asset: None,
                }
            }
            Some(PageCommand::Dashboard { asset }) => Launch {
                page: Some(PageKind::Dashboard),
                asset: asset.clone(),
                ..Launch::default()
            },
        }
    }
}
