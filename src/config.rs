//! Runtime configuration: remote endpoints, timeouts and scratch space.
//!
//! Defaults point at the public hosts. Every field can be overridden through an
//! `NBDT_*` environment variable, which is also how the tests redirect traffic
//! to a local server.

use crate::error::{NbdtError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Base URL hosting the published dataset snapshots
pub const DEFAULT_SNAPSHOT_BASE: &str = "https://huggingface.co/datasets/PenguinMan/ARXIV/resolve/main";

/// bioRxiv details API base URL
pub const DEFAULT_BIORXIV_API: &str = "https://api.biorxiv.org";

/// PLOS search API base URL
pub const DEFAULT_PLOS_API: &str = "https://api.plos.org";

/// arXiv Atom export endpoint
pub const DEFAULT_ARXIV_API: &str = "https://export.arxiv.org/api/query";

/// Delay between arXiv result pages (the export API asks for 3 s)
const DEFAULT_ARXIV_PAGE_DELAY_MS: u64 = 3000;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub snapshot_base: String,
    pub biorxiv_api: String,
    pub plos_api: String,
    pub arxiv_api: String,
    /// Directory for intermediate files written during an update
    pub scratch_dir: PathBuf,
    /// Connect timeout and longest allowed stall while reading a response
    pub http_timeout: Duration,
    pub arxiv_page_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_base: DEFAULT_SNAPSHOT_BASE.to_string(),
            biorxiv_api: DEFAULT_BIORXIV_API.to_string(),
            plos_api: DEFAULT_PLOS_API.to_string(),
            arxiv_api: DEFAULT_ARXIV_API.to_string(),
            scratch_dir: PathBuf::from("."),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            arxiv_page_delay: Duration::from_millis(DEFAULT_ARXIV_PAGE_DELAY_MS),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(base) = std::env::var("NBDT_SNAPSHOT_BASE") {
            config.snapshot_base = base;
        }
        if let Ok(api) = std::env::var("NBDT_BIORXIV_API") {
            config.biorxiv_api = api;
        }
        if let Ok(api) = std::env::var("NBDT_PLOS_API") {
            config.plos_api = api;
        }
        if let Ok(api) = std::env::var("NBDT_ARXIV_API") {
            config.arxiv_api = api;
        }
        if let Ok(dir) = std::env::var("NBDT_SCRATCH_DIR") {
            config.scratch_dir = PathBuf::from(dir);
        }
        if let Ok(secs) = std::env::var("NBDT_HTTP_TIMEOUT_SECS") {
            config.http_timeout = Duration::from_secs(parse_env_number("NBDT_HTTP_TIMEOUT_SECS", &secs)?);
        }
        if let Ok(ms) = std::env::var("NBDT_ARXIV_PAGE_DELAY_MS") {
            config.arxiv_page_delay = Duration::from_millis(parse_env_number("NBDT_ARXIV_PAGE_DELAY_MS", &ms)?);
        }

        Ok(config)
    }

    /// Point every remote endpoint at a single base URL (mirrors and tests).
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            snapshot_base: format!("{}/snapshots", base),
            biorxiv_api: base.to_string(),
            plos_api: base.to_string(),
            arxiv_api: format!("{}/api/query", base),
            ..Self::default()
        }
    }

    /// Full URL of a file under the snapshot base
    pub fn snapshot_url(&self, file: &str) -> String {
        format!("{}/{}", self.snapshot_base.trim_end_matches('/'), file)
    }
}

fn parse_env_number(name: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| NbdtError::Config(format!("{} must be a whole number, got '{}'", name, value)))
}
