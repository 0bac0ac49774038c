//! rustnbdt - Neuroscience bibliographic dataset loader and updater
//!
//! ## Usage
//!
//! ### CLI Mode
//! ```bash
//! rustnbdt load arxiv --start-year 2019 --end-year 2023 -o arxiv.csv
//! rustnbdt update plos_one --end-date 31-07-2023 --update true -o plos.csv
//! ```
//!
//! ### HTTP Server Mode
//! ```bash
//! rustnbdt serve --port 3000
//! ```

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use clap::{Parser, Subcommand};
use rustnbdt::{dataset, update_dataset, Config, DatasetName, LoadOutcome, NbdtError, UpdateRequest};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// Rows shown when a loaded dataset is printed instead of saved
const PREVIEW_ROWS: usize = 5;

// ============================================================================
// CLI Definition
// ============================================================================

/// Neuroscience bibliographic datasets - download, filter and update
#[derive(Parser)]
#[command(name = "rustnbdt")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a published dataset, optionally filtered by year
    Load {
        /// Dataset name (arxiv, bioarxiv, plos_one, medline_small, medline_large)
        name: String,

        /// First publication year to keep (2018-2023)
        #[arg(long)]
        start_year: Option<i32>,

        /// Last publication year to keep (2018-2023)
        #[arg(long)]
        end_year: Option<i32>,

        /// Output CSV path (prints a preview when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Collect newly published papers and optionally merge them into the snapshot
    Update {
        /// Source name (bioarxiv, plos_one, arxiv)
        name: String,

        /// End of the collection window, day-first (e.g. 31-07-2023)
        #[arg(long)]
        end_date: String,

        /// Start of the collection window, day-first
        #[arg(long)]
        start_date: Option<String>,

        /// Merge into the published snapshot: true or false
        #[arg(long, default_value = "false")]
        update: String,

        /// Output CSV path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List available datasets and their snapshot URLs
    Datasets,

    /// Run the HTTP service
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if cli.json_logs {
        fmt().json().with_env_filter(filter).with_target(true).init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .init();
    }

    let config = Config::from_env().context("Invalid NBDT_* environment configuration")?;

    match cli.command {
        Commands::Load {
            name,
            start_year,
            end_year,
            output,
        } => run_load(&config, &name, start_year, end_year, output).await,
        Commands::Update {
            name,
            end_date,
            start_date,
            update,
            output,
        } => run_update(&config, &name, &end_date, start_date.as_deref(), &update, output).await,
        Commands::Datasets => {
            list_datasets(&config);
            Ok(())
        }
        Commands::Serve { port, host } => run_server(config, host, port).await,
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn run_load(
    config: &Config,
    name: &str,
    start_year: Option<i32>,
    end_year: Option<i32>,
    output: Option<PathBuf>,
) -> Result<()> {
    let outcome = match dataset::load_dataset(config, name, start_year, end_year, output.as_deref()).await {
        Err(NbdtError::UnknownDataset(name)) => {
            println!("Dataset \"{}\" is not available.", name);
            return Ok(());
        }
        other => other.context("Failed to load dataset")?,
    };

    match outcome {
        LoadOutcome::Saved { path, rows } => {
            println!("Dataset downloaded successfully and saved to \"{}\" ({} rows).", path.display(), rows);
        }
        LoadOutcome::Loaded(table) => {
            println!("Dataset downloaded successfully ({} rows).", table.len());
            println!("{}", table.headers().join(" | "));
            for row in table.rows().iter().take(PREVIEW_ROWS) {
                let cells: Vec<String> = row.iter().map(|c| truncate(c, 40)).collect();
                println!("{}", cells.join(" | "));
            }
        }
        LoadOutcome::Unsupported => {
            println!("The selected filters are not available.");
        }
    }
    Ok(())
}

async fn run_update(
    config: &Config,
    name: &str,
    end_date: &str,
    start_date: Option<&str>,
    flag: &str,
    output: PathBuf,
) -> Result<()> {
    let request = UpdateRequest::parse(name, end_date, output, start_date, flag)?;

    println!(
        "Collecting {} papers from {} to {}...",
        request.source, request.start, request.end
    );
    let summary = update_dataset(config, &request)
        .await
        .with_context(|| format!("Failed to update {}", request.source))?;

    println!("New papers collected: {}", summary.collected);
    if summary.merged {
        println!("Source dataset updated!");
    }
    println!("The data is stored as: {} ({} rows)", summary.destination.display(), summary.written);
    Ok(())
}

fn list_datasets(config: &Config) {
    for name in DatasetName::ALL {
        println!("{:<14} {}", name, name.url(config));
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

struct AppState {
    config: Config,
}

async fn run_server(config: Config, host: String, port: u16) -> Result<()> {
    info!(host = %host, port = port, "Starting HTTP server");

    let app = router(Arc::new(AppState { config }));

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/datasets", get(datasets_handler))
        .route("/load", post(load_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize)]
struct DatasetInfo {
    name: DatasetName,
    url: String,
}

async fn datasets_handler(State(state): State<Arc<AppState>>) -> Json<Vec<DatasetInfo>> {
    Json(
        DatasetName::ALL
            .into_iter()
            .map(|name| DatasetInfo {
                name,
                url: name.url(&state.config),
            })
            .collect(),
    )
}

/// Load request body
#[derive(Debug, Deserialize)]
struct LoadRequest {
    name: String,
    start_year: Option<i32>,
    end_year: Option<i32>,
}

/// Load response
#[derive(Debug, Serialize)]
struct LoadResponse {
    status: String,
    count: usize,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl LoadResponse {
    fn empty(status: String) -> Self {
        Self {
            status,
            count: 0,
            columns: vec![],
            rows: vec![],
        }
    }
}

async fn load_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoadRequest>,
) -> (StatusCode, Json<LoadResponse>) {
    info!(name = %req.name, start_year = ?req.start_year, end_year = ?req.end_year, "Load request");

    match dataset::load_dataset(&state.config, &req.name, req.start_year, req.end_year, None).await {
        Ok(LoadOutcome::Loaded(table)) => (
            StatusCode::OK,
            Json(LoadResponse {
                status: "success".to_string(),
                count: table.len(),
                columns: table.headers().to_vec(),
                rows: table.rows().to_vec(),
            }),
        ),
        Ok(LoadOutcome::Unsupported) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(LoadResponse::empty("error: the selected filters are not available".to_string())),
        ),
        Ok(LoadOutcome::Saved { .. }) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(LoadResponse::empty("error: unexpected write".to_string())),
        ),
        Err(e @ NbdtError::UnknownDataset(_)) => (
            StatusCode::NOT_FOUND,
            Json(LoadResponse::empty(format!("error: {}", e))),
        ),
        Err(e) => {
            error!(error = %e, "Load failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(LoadResponse::empty(format!("error: {}", e))),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 4), "abcd...");
    }

    #[test]
    fn test_cli_parses_update() {
        let cli = Cli::try_parse_from([
            "rustnbdt", "update", "plos_one", "--end-date", "31-07-2023", "--update", "true", "-o", "out.csv",
        ])
        .unwrap();
        match cli.command {
            Commands::Update { name, update, .. } => {
                assert_eq!(name, "plos_one");
                assert_eq!(update, "true");
            }
            _ => panic!("expected update command"),
        }
    }

    async fn spawn_service() -> String {
        // Upstream is unroutable: only requests that never leave the service succeed.
        let state = Arc::new(AppState {
            config: Config::with_base_url("http://127.0.0.1:9"),
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_service_endpoints_without_upstream() {
        let base = spawn_service().await;
        let client = reqwest::Client::new();

        let health = client.get(format!("{}/health", base)).send().await.unwrap();
        assert_eq!(health.text().await.unwrap(), "OK");

        let datasets: Vec<serde_json::Value> = client
            .get(format!("{}/datasets", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(datasets.len(), DatasetName::ALL.len());
        assert_eq!(datasets[2]["name"], "plos_one");

        let unknown = client
            .post(format!("{}/load", base))
            .json(&serde_json::json!({"name": "scopus"}))
            .send()
            .await
            .unwrap();
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

        let unsupported = client
            .post(format!("{}/load", base))
            .json(&serde_json::json!({"name": "arxiv", "start_year": 2015, "end_year": 2020}))
            .send()
            .await
            .unwrap();
        assert_eq!(unsupported.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
