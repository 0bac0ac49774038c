//! Incremental dataset updates.
//!
//! Collects papers published since a source's last snapshot and either writes
//! the fresh batch on its own or merges it into the snapshot. Merging stacks
//! `[snapshot, fresh]` and keeps the last row per abstract, so a re-collected
//! paper replaces its snapshot row.

use crate::config::Config;
use crate::dates;
use crate::error::{NbdtError, Result};
use crate::http;
use crate::table::Table;
use crate::{arxiv, biorxiv, plos};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Sources that support incremental updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateSource {
    Bioarxiv,
    PlosOne,
    Arxiv,
}

impl UpdateSource {
    pub const ALL: [UpdateSource; 3] = [UpdateSource::Bioarxiv, UpdateSource::PlosOne, UpdateSource::Arxiv];

    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateSource::Bioarxiv => "bioarxiv",
            UpdateSource::PlosOne => "plos_one",
            UpdateSource::Arxiv => "arxiv",
        }
    }

    /// Start of the collection window when none is given
    pub fn default_start(&self) -> NaiveDate {
        let (y, m, d) = match self {
            UpdateSource::Bioarxiv => (2023, 1, 1),
            UpdateSource::PlosOne | UpdateSource::Arxiv => (2023, 5, 31),
        };
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
    }

    pub fn snapshot_file(&self) -> &'static str {
        match self {
            UpdateSource::Bioarxiv => biorxiv::SNAPSHOT_FILE,
            UpdateSource::PlosOne => plos::SNAPSHOT_FILE,
            UpdateSource::Arxiv => arxiv::SNAPSHOT_FILE,
        }
    }

    /// Whether merged output drops rows with a missing field.
    ///
    /// The bioRxiv merge keeps them.
    pub fn merge_drops_missing(&self) -> bool {
        !matches!(self, UpdateSource::Bioarxiv)
    }

    fn normalize_snapshot(&self, snapshot: &Table) -> Result<Table> {
        match self {
            UpdateSource::Bioarxiv => biorxiv::normalize_snapshot(snapshot),
            UpdateSource::PlosOne => plos::normalize_snapshot(snapshot),
            UpdateSource::Arxiv => arxiv::normalize_snapshot(snapshot),
        }
    }
}

impl fmt::Display for UpdateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for UpdateSource {
    type Err = NbdtError;

    fn from_str(s: &str) -> Result<Self> {
        UpdateSource::ALL
            .into_iter()
            .find(|src| src.as_str() == s)
            .ok_or_else(|| NbdtError::UnknownDataset(s.to_string()))
    }
}

/// Parse the merge flag. Only `true` and `false` (any case) are accepted.
pub fn parse_update_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(NbdtError::Validation(format!(
            "update should be either true or false (by default it is false), got '{}'",
            value
        ))),
    }
}

/// A validated update call
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub source: UpdateSource,
    /// Inclusive window start
    pub start: NaiveDate,
    /// Inclusive window end (last day of the requested month)
    pub end: NaiveDate,
    /// Merge the batch into the published snapshot
    pub merge: bool,
    pub destination: PathBuf,
}

impl UpdateRequest {
    /// Validate raw arguments without touching the network.
    ///
    /// Checked in order: update flag, dates (day-first), source name. Given
    /// dates are moved to the last day of their month; the default start is
    /// used as is.
    pub fn parse(
        name: &str,
        end_date: &str,
        destination: impl Into<PathBuf>,
        start_date: Option<&str>,
        update: &str,
    ) -> Result<Self> {
        let merge = parse_update_flag(update)?;
        let end = dates::month_end_boundary(end_date)?;
        let start = start_date.map(dates::month_end_boundary).transpose()?;
        let source: UpdateSource = name.parse()?;

        Ok(Self {
            source,
            start: start.unwrap_or_else(|| source.default_start()),
            end,
            merge,
            destination: destination.into(),
        })
    }
}

/// What an update produced
#[derive(Debug, Clone, Serialize)]
pub struct UpdateSummary {
    pub source: UpdateSource,
    /// Rows in the freshly collected batch
    pub collected: usize,
    /// Rows written to the destination
    pub written: usize,
    pub destination: PathBuf,
    pub merged: bool,
}

/// Stack the snapshot and the fresh batch and keep the last row per abstract.
pub fn merge_batches(source: UpdateSource, snapshot: &Table, fresh: Table) -> Result<Table> {
    let base = source.normalize_snapshot(snapshot)?;
    let merged = base.concat(fresh).drop_duplicates_keep_last("abstract")?;
    if source.merge_drops_missing() {
        Ok(merged.drop_missing())
    } else {
        Ok(merged)
    }
}

async fn collect(client: &reqwest::Client, config: &Config, request: &UpdateRequest) -> Result<Table> {
    match request.source {
        UpdateSource::Bioarxiv => biorxiv::collect(client, config, request.start, request.end).await,
        UpdateSource::PlosOne => {
            let scratch = plos::intermediate_path(config);
            plos::collect(client, config, request.start, request.end, &scratch).await
        }
        UpdateSource::Arxiv => arxiv::collect(client, config, request.start, request.end).await,
    }
}

async fn fetch_snapshot(client: &reqwest::Client, config: &Config, source: UpdateSource) -> Result<Table> {
    let url = config.snapshot_url(source.snapshot_file());
    info!(source = %source, url = %url, "Updating source dataset");
    let body = http::get_text(client, &url).await?;
    Table::from_csv_str(&body)
}

fn write_output(table: &Table, destination: &Path) -> Result<()> {
    table.write_path(destination)?;
    info!(path = %destination.display(), rows = table.len(), "Updated papers stored");
    Ok(())
}

/// Collect new papers for `request.source` and write them (merged or not).
pub async fn update_dataset(config: &Config, request: &UpdateRequest) -> Result<UpdateSummary> {
    info!(
        source = %request.source,
        start = %request.start,
        end = %request.end,
        merge = request.merge,
        "Starting dataset update"
    );

    let client = http::build_client(config)?;
    let fresh = collect(&client, config, request).await?;
    let collected = fresh.len();

    let output = if request.merge {
        let snapshot = fetch_snapshot(&client, config, request.source).await?;
        let merged = merge_batches(request.source, &snapshot, fresh)?;
        info!(source = %request.source, rows = merged.len(), "Source dataset updated");
        merged
    } else {
        fresh
    };

    write_output(&output, &request.destination)?;

    Ok(UpdateSummary {
        source: request.source,
        collected,
        written: output.len(),
        destination: request.destination.clone(),
        merged: request.merge,
    })
}
