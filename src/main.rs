use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

use supply_calendar::app::ports::FeatureServicePort;
use supply_calendar::areas::{AreaDirectory, MunicipalityCache};
use supply_calendar::calendar::{CalendarEngine, CalendarRequest};
use supply_calendar::config::Config;
use supply_calendar::infra::ReqwestFeatureService;
use supply_calendar::server::{self, AppState};
use supply_calendar::{logging, metrics};

#[derive(Parser)]
#[command(name = "supply_calendar")]
#[command(about = "Water supply interruption calendar")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Port to listen on (overrides config and PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Build one month calendar and print it as JSON
    Calendar {
        #[arg(long)]
        area: String,
        #[arg(long)]
        month: String,
        #[arg(long)]
        year: String,
        /// Include per-layer query attempts
        #[arg(long)]
        debug: bool,
    },
    /// Print the municipality list as JSON
    Municipios {
        /// Substring filter
        #[arg(long)]
        q: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _guard = logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;

    let service: Arc<dyn FeatureServicePort> = Arc::new(
        ReqwestFeatureService::new(&config.service.base_url, config.layer_timeout())
            .context("building HTTP client")?,
    );
    let cache = Arc::new(MunicipalityCache::new(config.municipios_ttl()));

    match cli.command {
        Commands::Serve { port } => {
            metrics::init_metrics();
            let port = port.unwrap_or(config.server.port);
            info!(upstream = %config.service.base_url, "starting server");
            server::start_server(AppState::new(service, cache), port).await?;
        }
        Commands::Calendar { area, month, year, debug } => {
            let request = CalendarRequest::parse(
                Some(area.as_str()),
                Some(month.as_str()),
                Some(year.as_str()),
                debug.then_some("1"),
            )?;
            let result = CalendarEngine::new(service).run(&request).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Municipios { q } => {
            let directory = AreaDirectory::new(service, cache);
            let list = directory.municipalities(q.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
    }
    Ok(())
}
