//! arXiv export API collector.
//!
//! Runs one bounded search (newest submissions first) against the Atom
//! export endpoint and keeps entries last updated inside the requested window.

use crate::config::Config;
use crate::error::{NbdtError, Result};
use crate::http;
use crate::table::Table;
use chrono::{DateTime, FixedOffset, NaiveDate};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, info};
use url::Url;

/// Search term
const QUERY: &str = "brain";

/// Upper bound on results walked per search
pub const MAX_RESULTS: usize = 20_000;

/// Entries requested per export call
const PAGE_SIZE: usize = 100;

/// Published snapshot used as the merge base
pub const SNAPSHOT_FILE: &str = "arxiv2.csv";

/// Columns of the collected batch and of the merge snapshot
pub const COLUMNS: &[&str] = &[
    "id", "submitter", "authors", "title", "categories", "abstract", "versions", "update_date",
];

/// One Atom `<entry>` from the export feed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArxivEntry {
    pub entry_id: String,
    pub title: String,
    pub summary: String,
    pub authors: Vec<String>,
    pub updated: String,
    pub primary_category: String,
    pub comment: Option<String>,
}

impl ArxivEntry {
    pub fn updated_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(self.updated.trim()).ok()
    }

    /// Row in [`COLUMNS`] order
    fn to_row(&self) -> Vec<String> {
        let update_date = self
            .updated_at()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%:z").to_string())
            .unwrap_or_default();
        // versions mirrors the snapshot column: length of the author comment
        let versions = self.comment.as_deref().map(|c| c.chars().count()).unwrap_or(0);

        vec![
            self.entry_id.clone(),
            self.authors.first().cloned().unwrap_or_default(),
            self.authors.join(", "),
            self.title.clone(),
            self.primary_category.clone(),
            self.summary.clone(),
            versions.to_string(),
            update_date,
        ]
    }
}

fn search_url(config: &Config, start: usize, max_results: usize) -> Result<Url> {
    let mut url = Url::parse(&config.arxiv_api)
        .map_err(|e| NbdtError::Config(format!("Invalid arXiv API URL: {}", e)))?;

    url.query_pairs_mut()
        .append_pair("search_query", &format!("all:{}", QUERY))
        .append_pair("start", &start.to_string())
        .append_pair("max_results", &max_results.to_string())
        .append_pair("sortBy", "submittedDate")
        .append_pair("sortOrder", "descending");

    Ok(url)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == name.as_bytes())
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

/// Parse an Atom feed from the export API into entries.
pub fn parse_feed(xml: &str) -> Result<Vec<ArxivEntry>> {
    let mut reader = Reader::from_str(xml);
    let mut entries = Vec::new();
    let mut current: Option<ArxivEntry> = None;
    let mut current_tag = String::new();
    let mut in_author = false;
    let mut author_name = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if tag == "entry" {
                    current = Some(ArxivEntry::default());
                } else if let Some(entry) = current.as_mut() {
                    if tag == "author" {
                        in_author = true;
                        author_name.clear();
                    } else if tag == "arxiv:primary_category" {
                        entry.primary_category = attribute(&e, "term").unwrap_or_default();
                    }
                    current_tag = tag;
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(entry) = current.as_mut() {
                    if e.name().as_ref() == b"arxiv:primary_category" {
                        entry.primary_category = attribute(&e, "term").unwrap_or_default();
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(entry) = current.as_mut() {
                    let text = e
                        .unescape()
                        .map_err(|err| NbdtError::Parse(format!("Bad text in arXiv feed: {}", err)))?;
                    match current_tag.as_str() {
                        "id" => entry.entry_id.push_str(&text),
                        "title" => entry.title.push_str(&text),
                        "summary" => entry.summary.push_str(&text),
                        "updated" => entry.updated.push_str(&text),
                        "name" if in_author => author_name.push_str(&text),
                        "arxiv:comment" => entry.comment.get_or_insert_with(String::new).push_str(&text),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if tag == "entry" {
                    if let Some(mut entry) = current.take() {
                        entry.entry_id = entry.entry_id.trim().to_string();
                        entry.title = collapse_whitespace(&entry.title);
                        entry.summary = entry.summary.trim().replace('\n', " ");
                        entries.push(entry);
                    }
                } else if tag == "author" && in_author {
                    in_author = false;
                    let name = author_name.trim();
                    if let (Some(entry), false) = (current.as_mut(), name.is_empty()) {
                        entry.authors.push(name.to_string());
                    }
                }
                if tag == current_tag {
                    current_tag.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(NbdtError::Parse(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}

/// Walk the search results, newest first, up to [`MAX_RESULTS`] entries.
pub async fn search(client: &reqwest::Client, config: &Config, max_results: usize) -> Result<Vec<ArxivEntry>> {
    info!(query = QUERY, max_results, estimate = "10 mins", "Collecting arXiv papers");

    let mut entries = Vec::new();
    let mut start = 0;
    while start < max_results {
        if start > 0 && !config.arxiv_page_delay.is_zero() {
            tokio::time::sleep(config.arxiv_page_delay).await;
        }

        let page_size = PAGE_SIZE.min(max_results - start);
        let url = search_url(config, start, page_size)?;
        debug!(start, page_size, "Fetching arXiv page");
        let body = http::get_text(client, url.as_str()).await?;
        let page = parse_feed(&body)?;
        if page.is_empty() {
            break;
        }
        start += page.len();
        entries.extend(page);
    }

    info!(fetched = entries.len(), "arXiv search complete");
    Ok(entries)
}

/// Entries updated on a calendar day within `[start, end]`, as a table
pub fn entries_in_window(entries: &[ArxivEntry], start: NaiveDate, end: NaiveDate) -> Table {
    let mut table = Table::new(COLUMNS.iter().copied());
    for entry in entries {
        let in_window = entry
            .updated_at()
            .map(|dt| dt.date_naive())
            .is_some_and(|day| day >= start && day <= end);
        if in_window {
            table.push_row(entry.to_row());
        }
    }
    table
}

/// Deduplicate by abstract (last wins) and drop incomplete rows
pub fn clean(table: Table) -> Result<Table> {
    Ok(table.drop_duplicates_keep_last("abstract")?.drop_missing())
}

/// Keep the snapshot columns shared with the collected batch
pub fn normalize_snapshot(snapshot: &Table) -> Result<Table> {
    snapshot.select(COLUMNS)
}

/// Collect the arXiv batch for `[start, end]`
pub async fn collect(client: &reqwest::Client, config: &Config, start: NaiveDate, end: NaiveDate) -> Result<Table> {
    let entries = search(client, config, MAX_RESULTS).await?;
    let table = clean(entries_in_window(&entries, start, end))?;
    info!(collected = table.len(), "New arXiv papers collected");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query: search_query=all:brain</title>
  <id>http://arxiv.org/api/feedid</id>
  <updated>2023-07-01T00:00:00-04:00</updated>
  <entry>
    <id>http://arxiv.org/abs/2306.00001v2</id>
    <updated>2023-06-20T10:15:00Z</updated>
    <published>2023-06-01T09:00:00Z</published>
    <title>Mapping the
      Brain &amp; Beyond</title>
    <summary>  We map
the brain.
</summary>
    <author><name>Ada Lovelace</name></author>
    <author><name>Alan Turing</name></author>
    <arxiv:comment>12 pages</arxiv:comment>
    <link href="http://arxiv.org/abs/2306.00001v2" rel="alternate" type="text/html"/>
    <arxiv:primary_category term="q-bio.NC" scheme="http://arxiv.org/schemas/atom"/>
    <category term="q-bio.NC" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2304.00002v1</id>
    <updated>2023-04-02T08:00:00Z</updated>
    <published>2023-04-02T08:00:00Z</published>
    <title>Older work</title>
    <summary>Something else.</summary>
    <author><name>Grace Hopper</name></author>
    <arxiv:primary_category term="cs.NE" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_feed() {
        let entries = parse_feed(SAMPLE_FEED).unwrap();
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.entry_id, "http://arxiv.org/abs/2306.00001v2");
        assert_eq!(first.title, "Mapping the Brain & Beyond");
        assert_eq!(first.summary, "We map the brain.");
        assert_eq!(first.authors, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(first.primary_category, "q-bio.NC");
        assert_eq!(first.comment.as_deref(), Some("12 pages"));

        assert_eq!(entries[1].comment, None);
        assert_eq!(entries[1].primary_category, "cs.NE");
    }

    #[test]
    fn test_entry_row() {
        let entries = parse_feed(SAMPLE_FEED).unwrap();
        let row = entries[0].to_row();
        assert_eq!(row[1], "Ada Lovelace");
        assert_eq!(row[2], "Ada Lovelace, Alan Turing");
        assert_eq!(row[6], "8");
        assert_eq!(row[7], "2023-06-20 10:15:00+00:00");
    }

    #[test]
    fn test_entries_in_window() {
        let entries = parse_feed(SAMPLE_FEED).unwrap();
        let table = entries_in_window(&entries, ymd(2023, 5, 31), ymd(2023, 6, 30));
        assert_eq!(table.headers(), COLUMNS);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0][0], "http://arxiv.org/abs/2306.00001v2");

        let everything = entries_in_window(&entries, ymd(2023, 1, 1), ymd(2023, 6, 20));
        assert_eq!(everything.len(), 2);
    }

    #[test]
    fn test_search_url() {
        let url = search_url(&Config::default(), 300, 100).unwrap();
        assert_eq!(
            url.as_str(),
            "https://export.arxiv.org/api/query?search_query=all%3Abrain&start=300&max_results=100&sortBy=submittedDate&sortOrder=descending"
        );
    }

    #[test]
    fn test_malformed_feed_is_parse_error() {
        assert!(matches!(parse_feed("<feed><entry></feed>"), Err(NbdtError::Parse(_))));
    }
}
