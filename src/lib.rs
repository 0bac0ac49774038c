//! # rustnbdt
//!
//! Neuroscience bibliographic datasets: download, year filtering and
//! incremental updates for arXiv, bioRxiv, PLOS ONE and MEDLINE.
//!
//! ## Modules
//!
//! - [`dataset`] - Snapshot loader (`load_dataset`)
//! - [`filter`] - Publication-year filtering per dataset layout
//! - [`update`] - Incremental collection and snapshot merge (`update_dataset`)
//! - [`biorxiv`], [`plos`], [`arxiv`] - Remote API collectors
//! - [`table`] - In-memory CSV table
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rustnbdt::{dataset, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let outcome = dataset::load_dataset(&config, "arxiv", Some(2019), Some(2023), None).await?;
//!     if let Some(table) = outcome.into_table() {
//!         println!("Loaded {} papers", table.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod arxiv;
pub mod biorxiv;
pub mod config;
pub mod dataset;
pub mod dates;
pub mod error;
pub mod filter;
pub mod http;
pub mod plos;
pub mod table;
pub mod update;

pub use config::Config;
pub use dataset::{load_dataset, DatasetName, LoadOutcome};
pub use error::{NbdtError, Result};
pub use table::Table;
pub use update::{update_dataset, UpdateRequest, UpdateSource, UpdateSummary};
