//! bioRxiv details API collector.
//!
//! Pages through `/details/biorxiv/{start}/{end}/{cursor}/json` 100 records
//! at a time until an empty page comes back, keeping neuroscience preprints.

use crate::config::Config;
use crate::error::Result;
use crate::http;
use crate::table::Table;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

/// Records returned per page by the details endpoint
const PAGE_SIZE: usize = 100;

/// Subject category collected
pub const CATEGORY: &str = "neuroscience";

/// Published snapshot used as the merge base
pub const SNAPSHOT_FILE: &str = "bioarxiv_final.csv";

/// Column mapping from bioRxiv field names to the common schema
pub const COLUMNS: &[(&str, &str)] = &[
    ("doi", "ID"),
    ("title", "title"),
    ("abstract", "abstract"),
    ("authors", "authors"),
    ("author_corresponding", "author_corresponding"),
    ("date", "date"),
    ("jatsxml", "URL"),
];

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    #[serde(default)]
    messages: Vec<DetailsMessage>,
    #[serde(default)]
    collection: Vec<Preprint>,
}

#[derive(Debug, Deserialize)]
struct DetailsMessage {
    #[serde(default)]
    total: Option<serde_json::Value>,
}

/// One preprint entry from the details endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Preprint {
    pub doi: String,
    pub title: String,
    pub authors: String,
    pub author_corresponding: String,
    pub date: String,
    pub category: String,
    pub jatsxml: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
}

fn page_url(config: &Config, start: NaiveDate, end: NaiveDate, cursor: usize) -> String {
    format!(
        "{}/details/biorxiv/{}/{}/{}/json?category={}",
        config.biorxiv_api.trim_end_matches('/'),
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d"),
        cursor,
        CATEGORY
    )
}

/// The API reports `total` as either a number or a numeric string
fn parse_total(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn estimate_duration(total: u64) -> &'static str {
    match total {
        0..=99 => "under a minute",
        100..=10_000 => "~6 mins",
        10_001..=50_000 => "10 mins to 30 mins",
        _ => "30 mins to 1 hr",
    }
}

/// Fetch every preprint posted between `start` and `end`.
pub async fn fetch_preprints(
    client: &reqwest::Client,
    config: &Config,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Preprint>> {
    let first: DetailsResponse = http::get_json(client, &page_url(config, start, end, 0)).await?;
    let total = first
        .messages
        .first()
        .and_then(|m| m.total.as_ref())
        .and_then(parse_total)
        .unwrap_or(0);
    info!(total, estimate = estimate_duration(total), "Collecting bioRxiv papers");

    let mut preprints = first.collection;
    if preprints.is_empty() {
        return Ok(preprints);
    }

    let mut cursor = PAGE_SIZE;

    loop {
        debug!(cursor, "Fetching bioRxiv page");
        let page: DetailsResponse = http::get_json(client, &page_url(config, start, end, cursor)).await?;
        if page.collection.is_empty() {
            break;
        }
        preprints.extend(page.collection);
        cursor += PAGE_SIZE;
    }

    info!(collected = preprints.len(), "bioRxiv pagination complete");
    Ok(preprints)
}

/// Build the normalized batch: neuroscience only, common schema, one row
/// per abstract (last wins).
pub fn normalize(preprints: Vec<Preprint>) -> Result<Table> {
    let mut table = Table::new(COLUMNS.iter().map(|(_, to)| *to));
    for p in preprints.into_iter().filter(|p| p.category == CATEGORY) {
        table.push_row(vec![
            p.doi,
            p.title,
            p.abstract_text,
            p.authors,
            p.author_corresponding,
            p.date,
            p.jatsxml,
        ]);
    }
    table.drop_duplicates_keep_last("abstract")
}

/// Map a raw snapshot table onto the common schema
pub fn normalize_snapshot(snapshot: &Table) -> Result<Table> {
    snapshot.select_rename(COLUMNS)
}

/// Collect and normalize the bioRxiv batch for `[start, end]`
pub async fn collect(client: &reqwest::Client, config: &Config, start: NaiveDate, end: NaiveDate) -> Result<Table> {
    let preprints = fetch_preprints(client, config, start, end).await?;
    let table = normalize(preprints)?;
    info!(collected = table.len(), "Total number of bioRxiv papers collected");
    Ok(table)
}
