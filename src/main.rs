use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

mod agent;
mod cleanup;
mod error;
mod pdf;
mod report;
mod server;
mod session;
mod settings;
mod sharing;
mod storage;

use crate::agent::{AgentBackend, HttpAgentBackend};
use crate::pdf::{PdfRenderer, WkHtmlToPdf};
use crate::session::SessionExport;
use crate::settings::SiteConfig;
use crate::storage::SqliteArtifactRepository;

#[derive(Debug, Parser)]
#[command(name = "agent_widget")]
#[command(about = "Conversation reports and sharing for the ERP agent widget", long_about = None)]
struct Cli {
    /// Path to site_config.json
    #[arg(long, global = true)]
    site_config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Start {
        #[arg(long, default_value = "127.0.0.1:7171")]
        listen: String,
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },
    /// Render a transcript JSON file to HTML (or PDF with --pdf).
    Render {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        pdf: bool,
    },
    /// Delete shared report links older than the TTL.
    Cleanup {
        #[arg(long)]
        max_age_hours: Option<u64>,
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },
}

fn renderer_for(site: &SiteConfig) -> WkHtmlToPdf {
    match &site.wkhtmltopdf_path {
        Some(binary) => WkHtmlToPdf { binary: binary.clone() },
        None => WkHtmlToPdf::default(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let site = SiteConfig::load(cli.site_config.as_deref())?;
    match cli.command {
        Commands::Start { listen, database_url } => {
            let addr: SocketAddr = listen.parse()?;
            let repo = SqliteArtifactRepository::initialize(database_url).await?;
            let metrics = match metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder() {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!(error = %e, "metrics exporter not installed");
                    None
                }
            };
            let agent: Option<Arc<dyn AgentBackend>> = match &site.agent_sdk_url {
                Some(url) => Some(Arc::new(HttpAgentBackend::new(url.clone()))),
                None => {
                    warn!("agent_sdk_url not set; agent endpoint disabled");
                    None
                }
            };
            let renderer: Arc<dyn PdfRenderer> = Arc::new(renderer_for(&site));
            let state = server::AppState {
                repo: Arc::new(repo),
                renderer,
                agent,
                site: Arc::new(site),
                metrics,
            };
            server::serve(addr, state).await?;
        }
        Commands::Render { input, output, pdf: as_pdf } => {
            let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&input)?)?;
            // a bare message array is accepted as well as a full export payload
            let export = if raw.is_array() {
                SessionExport { messages: serde_json::from_value(raw)?, ..Default::default() }
            } else {
                SessionExport::from_value(raw)?
            };
            if as_pdf {
                let bytes = pdf::generate_session_pdf(&renderer_for(&site), &site.branding(), &export)?;
                std::fs::write(&output, bytes)?;
            } else {
                let html = report::render(&export.messages, &site.branding());
                std::fs::write(&output, html)?;
            }
            info!(output = %output.display(), "report written");
        }
        Commands::Cleanup { max_age_hours, database_url } => {
            let repo = SqliteArtifactRepository::initialize(database_url).await?;
            let ttl = max_age_hours.map_or_else(|| site.link_ttl(), settings::ttl_from_hours);
            let removed = cleanup::cleanup_expired_links(&repo, ttl).await;
            info!(removed, "cleanup finished");
        }
    }
    Ok(())
}
