//! Publication-year filtering.
//!
//! Each dataset stores its publication date in a different column and layout;
//! [`filter_dataset`] knows which, extracts the year, and keeps rows inside an
//! inclusive [`YearRange`]. Rows whose date does not parse are dropped.

use crate::dataset::DatasetName;
use crate::dates::{self, PLOS_TIMESTAMP_FORMAT};
use crate::error::Result;
use crate::table::Table;
use chrono::Datelike;
use std::ops::RangeInclusive;

/// Years covered by the published datasets
pub const SUPPORTED_YEARS: RangeInclusive<i32> = 2018..=2023;

/// Inclusive publication-year range, both ends inside [`SUPPORTED_YEARS`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    start: i32,
    end: i32,
}

impl YearRange {
    /// Returns `None` unless both years are supported.
    pub fn new(start: i32, end: i32) -> Option<Self> {
        if SUPPORTED_YEARS.contains(&start) && SUPPORTED_YEARS.contains(&end) {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }
}

/// Date column holding each dataset's publication date
pub fn date_column(dataset: DatasetName) -> &'static str {
    match dataset {
        DatasetName::Arxiv => "update_date",
        DatasetName::Bioarxiv => "date",
        DatasetName::PlosOne => "Publication Date",
        DatasetName::MedlineSmall | DatasetName::MedlineLarge => "P_Date",
    }
}

/// Keep rows of `table` published within `range`.
///
/// MEDLINE tables gain `Year` and `Month` columns split out of `P_Date`.
pub fn filter_dataset(dataset: DatasetName, range: YearRange, table: Table) -> Result<Table> {
    let idx = table.require_column(date_column(dataset))?;

    match dataset {
        DatasetName::Arxiv | DatasetName::Bioarxiv => Ok(table.filter_rows(|row| {
            dates::parse_generic_date(&row[idx]).is_some_and(|d| range.contains(d.year()))
        })),
        DatasetName::PlosOne => Ok(table.filter_rows(|row| {
            dates::parse_with_format(&row[idx], PLOS_TIMESTAMP_FORMAT).is_some_and(|d| range.contains(d.year()))
        })),
        DatasetName::MedlineSmall | DatasetName::MedlineLarge => filter_medline(range, table, idx),
    }
}

/// `P_Date` looks like `2019 Mar 12` or `2020 Spring`
fn filter_medline(range: YearRange, mut table: Table, idx: usize) -> Result<Table> {
    let (years, months): (Vec<Option<f64>>, Vec<Option<u32>>) = table
        .rows()
        .iter()
        .map(|row| split_medline_date(&row[idx]))
        .unzip();

    table.set_column("Year", years.iter().map(|y| y.map(format_year).unwrap_or_default()).collect())?;
    table.set_column("Month", months.iter().map(|m| m.map(|m| m.to_string()).unwrap_or_default()).collect())?;

    let lo = f64::from(range.start());
    let hi = f64::from(range.end());
    let mut years = years.into_iter();
    Ok(table.filter_rows(|_| {
        years
            .next()
            .flatten()
            .is_some_and(|year| year >= lo && year <= hi)
    }))
}

/// Split `P_Date` on spaces into a numeric year and a month number
fn split_medline_date(value: &str) -> (Option<f64>, Option<u32>) {
    let mut tokens = value.split(' ');
    let year = tokens
        .next()
        .and_then(|t| t.trim().parse::<f64>().ok())
        .filter(|y| y.is_finite());
    let month = tokens.next().and_then(dates::parse_month_name);
    (year, month)
}

fn format_year(year: f64) -> String {
    if year.fract() == 0.0 {
        format!("{}", year as i64)
    } else {
        year.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: i32, end: i32) -> YearRange {
        YearRange::new(start, end).unwrap()
    }

    #[test]
    fn test_year_range_bounds() {
        assert!(YearRange::new(2018, 2023).is_some());
        assert!(YearRange::new(2017, 2023).is_none());
        assert!(YearRange::new(2018, 2024).is_none());
        for start in 1990..2040 {
            for end in [2000, 2017, 2024, 2050] {
                assert!(YearRange::new(start, end).is_none());
            }
        }
    }

    #[test]
    fn test_arxiv_rows_inside_range() {
        let table = Table::from_csv_str(
            "id,abstract,update_date\n\
             a,x,2018-12-31\n\
             b,y,2019-01-01\n\
             c,z,2021-06-15\n\
             d,w,2023-12-31\n\
             e,v,2024-01-01\n\
             f,u,garbage\n",
        )
        .unwrap();

        let filtered = filter_dataset(DatasetName::Arxiv, range(2019, 2023), table).unwrap();
        let ids: Vec<&str> = filtered.column("id").unwrap().collect();
        assert_eq!(ids, vec!["b", "c", "d"]);
        for date in filtered.column("update_date").unwrap() {
            let year = dates::parse_generic_date(date).unwrap().year();
            assert!((2019..=2023).contains(&year));
        }
    }

    #[test]
    fn test_bioarxiv_uses_date_column() {
        let table = Table::from_csv_str("doi,date\n1,2020-02-02\n2,2022-02-02\n").unwrap();
        let filtered = filter_dataset(DatasetName::Bioarxiv, range(2020, 2020), table).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.rows()[0][0], "1");
    }

    #[test]
    fn test_plos_requires_fixed_timestamp_layout() {
        let table = Table::from_csv_str(
            "ID,Publication Date\n\
             1,2019-04-01T00:00:00Z\n\
             2,2019-04-01\n\
             3,2023-01-09T12:30:00Z\n",
        )
        .unwrap();
        let filtered = filter_dataset(DatasetName::PlosOne, range(2018, 2023), table).unwrap();
        let ids: Vec<&str> = filtered.column("ID").unwrap().collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_medline_excludes_non_numeric_years() {
        let table = Table::from_csv_str(
            "PMID,P_Date\n\
             1,2019 Mar\n\
             2,Spring 2020\n\
             3,2021\n\
             4,2017 Jan\n\
             5,\n\
             6,2020 March\n",
        )
        .unwrap();

        let filtered = filter_dataset(DatasetName::MedlineSmall, range(2018, 2023), table).unwrap();
        assert_eq!(filtered.headers(), &["PMID", "P_Date", "Year", "Month"]);
        assert_eq!(filtered.rows(), &[
            vec!["1".to_string(), "2019 Mar".into(), "2019".into(), "3".into()],
            vec!["3".to_string(), "2021".into(), "2021".into(), "".into()],
            vec!["6".to_string(), "2020 March".into(), "2020".into(), "".into()],
        ]);
    }

    #[test]
    fn test_missing_date_column_is_an_error() {
        let table = Table::from_csv_str("id,date\n1,2019-01-01\n").unwrap();
        assert!(filter_dataset(DatasetName::Arxiv, range(2019, 2020), table).is_err());
    }
}
