use clap::{Parser, Subcommand, ValueEnum};
use eventsync::config::env_loader::{env_lookup, load_config, loki_url, validation_errors};
use eventsync::config::model::Config;
use eventsync::drive::api::DriveAPI;
use eventsync::error::SyncError;
use eventsync::http::client::build_client;
use eventsync::http::retry::RetryPolicy;
use eventsync::platform::EventPlatform;
use eventsync::sheets::api::GoogleSheetsAPI;
use eventsync::sync::existing::{list_all_events, DEFAULT_PAGE_SIZE};
use eventsync::sync::orchestrator::{SyncOptions, SyncOrchestrator};
use eventsync::tracing::setup_tracing;
use eventsync::wix::api::WixAPI;
use eventsync::wix::model::PageCursor;
use reqwest_middleware::ClientWithMiddleware;
use std::process::ExitCode;
use tracing::{error, info, Level};

/// A run that couldn't start or couldn't read its inputs
const FATAL: u8 = 2;

#[derive(Parser)]
#[command(name = "eventsync")]
#[command(about = "Sync events from a Google Sheet into Wix Events")]
struct Cli {
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check the configuration without calling any API
    Validate,
    /// Check that Wix answers with the configured credentials
    Test,
    /// List the events currently on Wix
    List,
    /// Create or update Wix events from the spreadsheet
    Sync {
        /// Don't create tickets for new ticketing events
        #[arg(long)]
        no_tickets: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    // No network before the configuration is known to be good, and none at all for `validate`
    let loki_endpoint = match cli.command {
        Commands::Validate => None,
        _ => loki_url(env_lookup),
    };
    let loki = setup_tracing(cli.log_level.into(), loki_endpoint.as_deref()).await;

    let code = match cli.command {
        Commands::Validate => cmd_validate(),
        Commands::Test => cmd_test().await,
        Commands::List => cmd_list().await,
        Commands::Sync { no_tickets, json } => cmd_sync(!no_tickets, json).await,
    };

    if let Some((controller, handle)) = loki {
        controller.shutdown().await;
        let _ = handle.await;
    }

    code
}

fn cmd_validate() -> ExitCode {
    let errors = validation_errors(env_lookup);

    if errors.is_empty() {
        info!("Configuration is valid");
        return ExitCode::SUCCESS;
    }

    for err in &errors {
        error!("{}", err);
    }
    ExitCode::from(FATAL)
}

fn setup() -> Result<(Config, ClientWithMiddleware), ExitCode> {
    let config = load_config().map_err(|err| {
        error!("Invalid configuration: {}", err);
        ExitCode::from(FATAL)
    })?;

    let policy = RetryPolicy::default().with_max_attempts(config.retry_max_attempts);
    let client = build_client(policy).map_err(|err| {
        error!("Failed to build HTTP client: {}", err);
        ExitCode::from(FATAL)
    })?;

    Ok((config, client))
}

fn wix_api(config: &Config, client: ClientWithMiddleware) -> Result<WixAPI, ExitCode> {
    WixAPI::new(&config.wix, client).map_err(|err| {
        error!("Invalid configuration: {}", err);
        ExitCode::from(FATAL)
    })
}

async fn cmd_test() -> ExitCode {
    let (config, client) = match setup() {
        Ok(setup) => setup,
        Err(code) => return code,
    };
    let wix = match wix_api(&config, client) {
        Ok(wix) => wix,
        Err(code) => return code,
    };

    match wix.query_events(1, &PageCursor::Offset(0)).await {
        Ok(_) => {
            info!("Connected to Wix site {}", config.wix.site_id);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("Wix connection failed: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_list() -> ExitCode {
    let (config, client) = match setup() {
        Ok(setup) => setup,
        Err(code) => return code,
    };
    let wix = match wix_api(&config, client) {
        Ok(wix) => wix,
        Err(code) => return code,
    };

    match list_all_events(&wix, DEFAULT_PAGE_SIZE, config.sync.existing_events_cap).await {
        Ok(events) => {
            for event in &events {
                let start = event
                    .start
                    .map(|start| {
                        start
                            .with_timezone(&config.sync.timezone)
                            .format("%Y-%m-%d %H:%M")
                            .to_string()
                    })
                    .unwrap_or_else(|| "no date".to_string());

                info!("{} | {} | {}", event.id, start, event.title);
            }
            info!("{} events", events.len());
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{}", err);
            ExitCode::from(FATAL)
        }
    }
}

async fn cmd_sync(create_tickets: bool, json: bool) -> ExitCode {
    let (config, client) = match setup() {
        Ok(setup) => setup,
        Err(code) => return code,
    };
    let wix = match wix_api(&config, client.clone()) {
        Ok(wix) => wix,
        Err(code) => return code,
    };
    let sheet = GoogleSheetsAPI::new(&config.google, client.clone());
    let drive = DriveAPI::new(&config.google.access_token, client);

    let orchestrator = SyncOrchestrator::new(
        &sheet,
        &wix,
        &drive,
        &config.sync,
        SyncOptions { create_tickets },
    );

    let summary = match orchestrator.run().await {
        Ok(summary) => summary,
        Err(err) => {
            match &err {
                SyncError::Sheet(_) => error!("Sync aborted, spreadsheet unreadable: {}", err),
                SyncError::StateFetch(_) => error!("Sync aborted before any write: {}", err),
            }
            return ExitCode::from(FATAL);
        }
    };

    if json {
        match serde_json::to_string_pretty(&summary) {
            Ok(output) => println!("{}", output),
            Err(err) => error!("Failed to serialize summary: {}", err),
        }
    } else {
        summary.log();
    }

    if summary.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
