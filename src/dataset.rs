//! Dataset loader.
//!
//! Resolves one of the published dataset names to its CSV snapshot, downloads
//! and parses it, optionally narrows it to a publication-year range, and either
//! hands the table back or writes it to disk.

use crate::config::Config;
use crate::error::{NbdtError, Result};
use crate::filter::{self, YearRange};
use crate::http;
use crate::table::Table;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Datasets available for download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetName {
    Arxiv,
    Bioarxiv,
    PlosOne,
    MedlineSmall,
    MedlineLarge,
}

impl DatasetName {
    pub const ALL: [DatasetName; 5] = [
        DatasetName::Arxiv,
        DatasetName::Bioarxiv,
        DatasetName::PlosOne,
        DatasetName::MedlineSmall,
        DatasetName::MedlineLarge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetName::Arxiv => "arxiv",
            DatasetName::Bioarxiv => "bioarxiv",
            DatasetName::PlosOne => "plos_one",
            DatasetName::MedlineSmall => "medline_small",
            DatasetName::MedlineLarge => "medline_large",
        }
    }

    /// Snapshot file name under the configured snapshot base
    pub fn file_name(&self) -> &'static str {
        match self {
            DatasetName::Arxiv => "arxiv2.csv",
            DatasetName::Bioarxiv => "bioarxiv%20(1).csv",
            DatasetName::PlosOne => "plos_one_new.csv",
            DatasetName::MedlineSmall => "MEDLINE_Journal_Recommend2.csv",
            DatasetName::MedlineLarge => "MEDLINE_COMPLETE.csv",
        }
    }

    pub fn url(&self, config: &Config) -> String {
        config.snapshot_url(self.file_name())
    }
}

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for DatasetName {
    type Err = NbdtError;

    fn from_str(s: &str) -> Result<Self> {
        DatasetName::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| NbdtError::UnknownDataset(s.to_string()))
    }
}

/// What a [`load_dataset`] call produced
#[derive(Debug)]
pub enum LoadOutcome {
    /// No destination was given; the table is returned
    Loaded(Table),
    /// The table was written to `path`
    Saved { path: PathBuf, rows: usize },
    /// The requested year range is outside the supported years
    Unsupported,
}

impl LoadOutcome {
    pub fn into_table(self) -> Option<Table> {
        match self {
            LoadOutcome::Loaded(table) => Some(table),
            _ => None,
        }
    }
}

/// Download a dataset snapshot and parse it
pub async fn fetch_dataset(client: &reqwest::Client, config: &Config, dataset: DatasetName) -> Result<Table> {
    let url = dataset.url(config);
    info!(dataset = %dataset, url = %url, "Downloading dataset");
    let body = http::get_text(client, &url).await?;
    Table::from_csv_str(&body)
}

/// Load a dataset by name.
///
/// The year filter applies only when both `start_year` and `end_year` are
/// given. A range outside the supported years yields
/// [`LoadOutcome::Unsupported`] without downloading anything.
pub async fn load_dataset(
    config: &Config,
    name: &str,
    start_year: Option<i32>,
    end_year: Option<i32>,
    destination: Option<&Path>,
) -> Result<LoadOutcome> {
    let dataset: DatasetName = name.parse()?;

    let range = match (start_year, end_year) {
        (Some(start), Some(end)) => match YearRange::new(start, end) {
            Some(range) => Some(range),
            None => {
                warn!(start, end, "The selected filters are not available");
                return Ok(LoadOutcome::Unsupported);
            }
        },
        _ => None,
    };

    let client = http::build_client(config)?;
    let mut table = fetch_dataset(&client, config, dataset).await?;

    if let Some(range) = range {
        table = filter::filter_dataset(dataset, range, table)?;
        info!(
            dataset = %dataset,
            start = range.start(),
            end = range.end(),
            rows = table.len(),
            "Dataset filtered by publication year"
        );
    }

    match destination {
        Some(path) => {
            table.write_path(path)?;
            info!(path = %path.display(), rows = table.len(), "Dataset saved");
            Ok(LoadOutcome::Saved {
                path: path.to_path_buf(),
                rows: table.len(),
            })
        }
        None => {
            info!(dataset = %dataset, rows = table.len(), "Dataset downloaded");
            Ok(LoadOutcome::Loaded(table))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dataset_names() {
        for dataset in DatasetName::ALL {
            assert_eq!(dataset.as_str().parse::<DatasetName>().unwrap(), dataset);
        }
        assert!(matches!(
            "pubmed".parse::<DatasetName>(),
            Err(NbdtError::UnknownDataset(name)) if name == "pubmed"
        ));
    }

    #[test]
    fn test_dataset_urls() {
        let config = Config::default();
        assert_eq!(
            DatasetName::Bioarxiv.url(&config),
            "https://huggingface.co/datasets/PenguinMan/ARXIV/resolve/main/bioarxiv%20(1).csv"
        );
        assert!(DatasetName::MedlineLarge.url(&config).ends_with("/MEDLINE_COMPLETE.csv"));
    }

    #[tokio::test]
    async fn test_unknown_dataset_is_reported_before_network() {
        // Unroutable base: any request would fail with a network error instead.
        let config = Config::with_base_url("http://127.0.0.1:9");
        let err = load_dataset(&config, "scopus", None, None, None).await.unwrap_err();
        assert!(matches!(err, NbdtError::UnknownDataset(_)));
    }

    #[tokio::test]
    async fn test_unsupported_range_returns_nothing() {
        let config = Config::with_base_url("http://127.0.0.1:9");
        for (start, end) in [(2017, 2020), (2019, 2024), (2010, 2011), (2030, 2031)] {
            let outcome = load_dataset(&config, "arxiv", Some(start), Some(end), None).await.unwrap();
            assert!(matches!(outcome, LoadOutcome::Unsupported));
        }
    }
}
