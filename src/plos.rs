//! PLOS search API collector.
//!
//! Queries the Solr-backed `/search` endpoint for neuroscience articles in a
//! publication-date window and walks the result set 100 rows at a time.

use crate::config::Config;
use crate::error::{NbdtError, Result};
use crate::http;
use crate::table::Table;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// Search term
const QUERY: &str = "neuroscience";

/// Rows requested per page
const ROWS: usize = 100;

/// Fields requested by the initial count query
const COUNT_FIELDS: &str = "title,author,abstract,journal,subject_facet,publication_date";

/// Fields requested when collecting articles
const PAGE_FIELDS: &str = "title,author,abstract,journal,subject_facet,accepted_date,id";

/// Intermediate file holding the raw collected rows
pub const INTERMEDIATE_FILE: &str = "neuroscience_articles.csv";

/// Published snapshot used as the merge base
pub const SNAPSHOT_FILE: &str = "plos_one_final2.csv";

/// Header of the collected batch
pub const HEADERS: &[&str] = &["ID", "title", "author", "abstract", "journal", "subject", "date"];

/// Snapshot columns and their names in the collected batch
pub const SNAPSHOT_COLUMNS: &[(&str, &str)] = &[
    ("ID", "ID"),
    ("Title", "title"),
    ("Author", "author"),
    ("Abstract", "abstract"),
    ("Journal", "journal"),
    ("Subject", "subject"),
    ("Accepted_Date", "date"),
];

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: SearchBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchBody {
    num_found: usize,
    #[serde(default)]
    docs: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// Solr filter restricting results to the date window and the neuroscience facet
fn date_filter(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "publication_date:[{}T00:00:00Z TO {}T23:59:59Z], subject_facet:\"/Neuroscience/\"",
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    )
}

fn search_url(config: &Config, fields: &str, filter: &str, start: usize) -> Result<Url> {
    let mut url = Url::parse(&format!("{}/search", config.plos_api.trim_end_matches('/')))
        .map_err(|e| NbdtError::Config(format!("Invalid PLOS API URL: {}", e)))?;

    url.query_pairs_mut()
        .append_pair("q", QUERY)
        .append_pair("fl", fields)
        .append_pair("fq", filter)
        .append_pair("start", &start.to_string())
        .append_pair("rows", &ROWS.to_string());

    Ok(url)
}

/// Render a Solr field: strings as-is, multi-valued fields comma-joined
fn render_field(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| render_field(Some(item)))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn doc_to_row(doc: &serde_json::Map<String, serde_json::Value>) -> Vec<String> {
    ["id", "title", "author", "abstract", "journal", "subject_facet", "accepted_date"]
        .iter()
        .map(|key| render_field(doc.get(*key)))
        .collect()
}

/// Fetch the raw article rows published within `[start, end]`.
pub async fn fetch_articles(
    client: &reqwest::Client,
    config: &Config,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Table> {
    let filter = date_filter(start, end);

    let count_url = search_url(config, COUNT_FIELDS, &filter, 0)?;
    let first: SearchResponse = http::get_json(client, count_url.as_str()).await?;
    let num_found = first.response.num_found;
    match num_found {
        0..=100 => info!(num_found, "Collecting PLOS ONE papers"),
        101..=10_000 => info!(num_found, estimate = "~2mins", "Collecting PLOS ONE papers"),
        _ => info!(num_found, estimate = "~5mins", "Collecting PLOS ONE papers"),
    }

    let mut table = Table::new(HEADERS.iter().copied());
    for offset in (0..num_found).step_by(ROWS) {
        debug!(offset, "Fetching PLOS page");
        let url = search_url(config, PAGE_FIELDS, &filter, offset)?;
        let page: SearchResponse = http::get_json(client, url.as_str()).await?;
        for doc in &page.response.docs {
            table.push_row(doc_to_row(doc));
        }
    }

    Ok(table)
}

/// Deduplicate by abstract (last wins) and drop incomplete rows
pub fn clean(table: Table) -> Result<Table> {
    Ok(table.drop_duplicates_keep_last("abstract")?.drop_missing())
}

/// Map a raw snapshot table onto the batch columns
pub fn normalize_snapshot(snapshot: &Table) -> Result<Table> {
    snapshot.select_rename(SNAPSHOT_COLUMNS)
}

pub fn intermediate_path(config: &Config) -> PathBuf {
    config.scratch_dir.join(INTERMEDIATE_FILE)
}

/// Collect the PLOS ONE batch for `[start, end]`.
///
/// Raw rows go through an intermediate CSV at `scratch` before cleaning.
pub async fn collect(
    client: &reqwest::Client,
    config: &Config,
    start: NaiveDate,
    end: NaiveDate,
    scratch: &Path,
) -> Result<Table> {
    let raw = fetch_articles(client, config, start, end).await?;
    raw.write_path(scratch)?;
    debug!(path = %scratch.display(), rows = raw.len(), "Wrote intermediate PLOS rows");

    let table = clean(Table::read_path(scratch)?)?;
    info!(collected = table.len(), "New PLOS ONE papers collected");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_url_encodes_filter() {
        let config = Config::default();
        let start = NaiveDate::from_ymd_opt(2023, 5, 31).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 7, 31).unwrap();
        let url = search_url(&config, PAGE_FIELDS, &date_filter(start, end), 200).unwrap();

        assert!(url.as_str().starts_with("https://api.plos.org/search?q=neuroscience"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&(
            "fq".to_string(),
            "publication_date:[2023-05-31T00:00:00Z TO 2023-07-31T23:59:59Z], subject_facet:\"/Neuroscience/\"".to_string()
        )));
        assert!(pairs.contains(&("start".to_string(), "200".to_string())));
        assert!(pairs.contains(&("rows".to_string(), "100".to_string())));
    }

    #[test]
    fn test_render_field() {
        assert_eq!(render_field(Some(&json!("PLOS ONE"))), "PLOS ONE");
        assert_eq!(render_field(Some(&json!(["A. Smith", "B. Jones"]))), "A. Smith, B. Jones");
        assert_eq!(render_field(Some(&json!(["\n  An abstract.  "]))), "An abstract.");
        assert_eq!(render_field(Some(&json!([]))), "");
        assert_eq!(render_field(None), "");
    }

    #[test]
    fn test_doc_to_row_column_order() {
        let doc = json!({
            "id": "10.1371/journal.pone.0000001",
            "title": "Synapses",
            "author": ["A", "B"],
            "abstract": ["Text"],
            "journal": "PLOS ONE",
            "subject_facet": ["/Biology/Neuroscience"],
            "accepted_date": "2023-06-01T00:00:00Z"
        });
        let row = doc_to_row(doc.as_object().unwrap());
        assert_eq!(row, vec![
            "10.1371/journal.pone.0000001", "Synapses", "A, B", "Text", "PLOS ONE",
            "/Biology/Neuroscience", "2023-06-01T00:00:00Z",
        ]);
    }

    #[test]
    fn test_clean_drops_duplicates_then_missing() {
        let table = Table::from_csv_str(
            "ID,title,author,abstract,journal,subject,date\n\
             1,t,a,dup,PLOS ONE,s,d\n\
             2,t,a,dup,PLOS ONE,s,d\n\
             3,t,,solo,PLOS ONE,s,d\n\
             4,t,a,,PLOS ONE,s,d\n",
        )
        .unwrap();
        let cleaned = clean(table).unwrap();
        let ids: Vec<&str> = cleaned.column("ID").unwrap().collect();
        assert_eq!(ids, vec!["2"]);
    }

    #[test]
    fn test_normalize_snapshot_renames() {
        let snapshot = Table::from_csv_str(
            "ID,Title,Author,Abstract,Journal,Subject,Accepted_Date,Extra\n1,T,A,Ab,J,S,D,x\n",
        )
        .unwrap();
        let normalized = normalize_snapshot(&snapshot).unwrap();
        assert_eq!(normalized.headers(), HEADERS);
        assert_eq!(normalized.rows()[0], vec!["1", "T", "A", "Ab", "J", "S", "D"]);
    }
}
