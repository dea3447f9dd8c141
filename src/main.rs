// Main entry point - Dependency injection and command dispatch
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use pitwall_telemetry::application::acquisition_service::AcquisitionService;
use pitwall_telemetry::application::alert_service::AlertLog;
use pitwall_telemetry::application::export_service::{ExportService, DEFAULT_EXPORT_FILENAME};
use pitwall_telemetry::application::session_service::{SessionService, TokenCell};
use pitwall_telemetry::application::telemetry_client::{ExportFormat, TelemetryClient};
use pitwall_telemetry::domain::session::Identity;
use pitwall_telemetry::domain::telemetry::TimeRange;
use pitwall_telemetry::infrastructure::config::{load_pitwall_config, load_sensor_registry};
use pitwall_telemetry::infrastructure::http_client::HttpTelemetryClient;
use pitwall_telemetry::infrastructure::token_store::TokenStore;
use pitwall_telemetry::presentation::console::{render, Viewport};
use pitwall_telemetry::presentation::dashboard::DashboardPage;

#[derive(Debug, Parser)]
#[command(name = "pitwall-telemetry", version, about = "Pit wall client for live car telemetry")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Authenticate against the backend and persist the issued token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Clear the persisted session.
    Logout,
    /// Show the identity decoded from the current session.
    Whoami,
    /// Run the live dashboard until Ctrl-C.
    Dashboard,
    /// Signal the car to come to the pit.
    PitCall,
    /// Download a telemetry export for a time range.
    Export {
        /// RFC 3339 start of the range; defaults to one hour ago.
        #[arg(long)]
        start: Option<String>,
        /// RFC 3339 end of the range; defaults to now.
        #[arg(long)]
        end: Option<String>,
        #[arg(long, default_value = "csv")]
        format: String,
        #[arg(long, default_value = DEFAULT_EXPORT_FILENAME)]
        output: PathBuf,
        /// Print the direct-download URL instead of fetching.
        #[arg(long)]
        url_only: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = load_pitwall_config()?;

    let token = TokenCell::default();
    let client: Arc<dyn TelemetryClient> = Arc::new(HttpTelemetryClient::new(
        config.backend.base_url.clone(),
        Duration::from_secs(config.backend.request_timeout_secs),
        token.clone(),
    )?);
    let store = TokenStore::new(config.session.token_path.clone());
    let session = SessionService::new(token, store, client.clone());
    session.rehydrate().await?;

    match cli.cmd {
        Command::Login { email, password } => {
            let identity = session
                .login_with_password(&email, &password)
                .await
                .context("login failed")?;
            println!("logged in as {} ({:?})", identity.email, identity.role);
        }
        Command::Logout => {
            session.logout().await?;
            println!("logged out");
        }
        Command::Whoami => match session.identity() {
            Some(identity) => {
                println!("{} ({:?})", identity.email, identity.role)
            }
            None => println!("not logged in"),
        },
        Command::Dashboard => {
            let identity = require_identity(&session)?;
            run_dashboard(&config, client, session.clone(), identity).await?;
        }
        Command::PitCall => {
            let identity = require_identity(&session)?;
            if !identity.role.can_control() {
                bail!("pit call is not available for the current role");
            }
            let response = client.send_command("pit-call").await?;
            println!("{}", response.message);
        }
        Command::Export {
            start,
            end,
            format,
            output,
            url_only,
        } => {
            let identity = require_identity(&session)?;
            if !identity.role.can_control() {
                bail!("export is not available for the current role");
            }

            let now = Utc::now();
            let end = match end {
                Some(raw) => parse_timestamp(&raw)?,
                None => now,
            };
            let start = match start {
                Some(raw) => parse_timestamp(&raw)?,
                None => end - chrono::Duration::hours(1),
            };
            let range = TimeRange::new(start, end)?;

            let format = match format.as_str() {
                "csv" => ExportFormat::Csv,
                "pdf-source-data" => ExportFormat::PdfSourceData,
                other => bail!("unknown export format {other:?} (use csv or pdf-source-data)"),
            };

            let export = ExportService::new(client);
            if url_only {
                println!("{}", export.download_url(range, format)?);
            } else {
                let written = export.export_to_file(range, format, &output).await?;
                println!("wrote {} bytes to {}", written, output.display());
            }
        }
    }

    Ok(())
}

fn require_identity(session: &SessionService) -> anyhow::Result<Identity> {
    session
        .identity()
        .context("not logged in (run `pitwall-telemetry login` first)")
}

fn parse_timestamp(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid RFC 3339 timestamp {raw:?}"))?;
    Ok(parsed.with_timezone(&Utc))
}

async fn run_dashboard(
    config: &pitwall_telemetry::infrastructure::config::PitwallConfig,
    client: Arc<dyn TelemetryClient>,
    session: SessionService,
    identity: Identity,
) -> anyhow::Result<()> {
    let registry = load_sensor_registry(std::path::Path::new("config/sensors.toml"))?;

    let alerts = AlertLog::new(chrono::Duration::minutes(config.alerts.retention_minutes));
    let sweeper = alerts.spawn_sweeper(Duration::from_secs(config.alerts.sweep_interval_secs));

    let poll_interval = Duration::from_secs(config.acquisition.poll_interval_secs);
    let acquisition = AcquisitionService::new(client, session.clone(), alerts, poll_interval);
    acquisition.start();

    let page = DashboardPage::new(registry, acquisition.clone(), identity, Utc::now());
    page.refresh_history().await;

    let viewport = Viewport::detect();
    let mut ticker = tokio::time::interval(poll_interval);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                if !session.is_authenticated() {
                    eprintln!("session expired, please log in again");
                    break;
                }
                print!("{}", render(&page.frame(Utc::now()), viewport));
                println!("---");
            }
        }
    }

    acquisition.stop();
    sweeper.stop();
    Ok(())
}
