//! CSV persistence for the episode table, plus the JSON analysis report.
//!
//! One row per episode. Optional fields are written as empty cells, keywords
//! as a JSON array (so an empty list and a missing keyword page stay
//! distinguishable), and each presence flag as a `has_<key>` column in roster
//! order.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use thiserror::Error;

use crate::analysis::AnalysisReport;
use crate::models::{CharacterPresence, EpisodeRecord};
use crate::tabulate::{verify_table, TabulateError};

/// Prefix of presence flag columns.
const PRESENCE_PREFIX: &str = "has_";

const BASE_COLUMNS: &[&str] = &[
    "global_index",
    "season",
    "episode_in_season",
    "title",
    "air_date",
    "rating",
    "synopsis",
    "keywords",
    "director_credit_text",
    "director",
    "link",
    "character_score",
    "departed_from_source",
    "outside_director",
];

/// Errors reading or writing the table.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Table is missing column {0:?}")]
    MissingColumn(String),

    #[error("Row {row}, column {column}: invalid value {value:?}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Table violates an invariant: {0}")]
    Invariant(#[from] TabulateError),
}

/// Write the table to `path`, creating parent directories as needed.
pub fn save_table(path: &Path, records: &[EpisodeRecord]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_table(file, records)
}

/// Write the table as CSV to any writer.
pub fn write_table<W: std::io::Write>(
    writer: W,
    records: &[EpisodeRecord],
) -> Result<(), StorageError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let presence_keys: Vec<String> = records
        .first()
        .map(|r| r.presence.keys().map(str::to_string).collect())
        .unwrap_or_default();

    let mut header: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
    header.extend(presence_keys.iter().map(|k| format!("{}{}", PRESENCE_PREFIX, k)));
    wtr.write_record(&header)?;

    for record in records {
        let keywords = match &record.keywords {
            Some(list) => serde_json::to_string(list)?,
            None => String::new(),
        };

        let mut row: Vec<String> = vec![
            record.global_index.to_string(),
            record.season.to_string(),
            record.episode_in_season.to_string(),
            record.title.clone(),
            record
                .air_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            record.rating.map(|r| r.to_string()).unwrap_or_default(),
            record.synopsis.clone(),
            keywords,
            record.director_credit_text.clone().unwrap_or_default(),
            record.director.clone().unwrap_or_default(),
            record.link.clone(),
            record.character_score.to_string(),
            record.departed_from_source.to_string(),
            record
                .outside_director
                .map(|b| b.to_string())
                .unwrap_or_default(),
        ];
        for key in &presence_keys {
            row.push(record.presence.get(key).unwrap_or(false).to_string());
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write the analysis report as pretty-printed JSON.
pub fn save_report(path: &Path, report: &AnalysisReport) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Load and verify a table written by `save_table`.
pub fn load_table(path: &Path) -> Result<Vec<EpisodeRecord>, StorageError> {
    let file = std::fs::File::open(path)?;
    read_table(file)
}

/// Read a table from any reader and check its invariants.
pub fn read_table<R: std::io::Read>(reader: R) -> Result<Vec<EpisodeRecord>, StorageError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();

    let columns: HashMap<&str, usize> = headers.iter().enumerate().map(|(i, h)| (h, i)).collect();
    for column in BASE_COLUMNS {
        if !columns.contains_key(column) {
            return Err(StorageError::MissingColumn(column.to_string()));
        }
    }
    let presence_columns: Vec<(String, usize)> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| {
            h.strip_prefix(PRESENCE_PREFIX)
                .map(|key| (key.to_string(), i))
        })
        .collect();

    let mut records = Vec::new();
    for (n, result) in rdr.records().enumerate() {
        let row = result?;
        let cells = RowCells {
            row: &row,
            columns: &columns,
            number: n + 1,
        };

        let keywords_cell = cells.text("keywords");
        let keywords = if keywords_cell.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<Vec<String>>(keywords_cell)
                    .map_err(|_| cells.invalid("keywords"))?,
            )
        };

        let mut presence = CharacterPresence::new();
        for (key, index) in &presence_columns {
            let value = row.get(*index).unwrap_or("");
            let flag = value.parse::<bool>().map_err(|_| StorageError::InvalidValue {
                row: n + 1,
                column: format!("{}{}", PRESENCE_PREFIX, key),
                value: value.to_string(),
            })?;
            presence.insert(key.clone(), flag);
        }

        records.push(EpisodeRecord {
            season: cells.parse("season")?,
            episode_in_season: cells.parse("episode_in_season")?,
            global_index: cells.parse("global_index")?,
            title: cells.text("title").to_string(),
            synopsis: cells.text("synopsis").to_string(),
            keywords,
            rating: cells.optional("rating")?,
            air_date: cells.optional_date("air_date")?,
            director_credit_text: cells.optional_text("director_credit_text"),
            link: cells.text("link").to_string(),
            director: cells.optional_text("director"),
            presence,
            character_score: cells.parse("character_score")?,
            departed_from_source: cells.parse("departed_from_source")?,
            outside_director: cells.optional("outside_director")?,
        });
    }

    verify_table(&records)?;
    Ok(records)
}

/// Typed access to one CSV row by column name.
struct RowCells<'a> {
    row: &'a csv::StringRecord,
    columns: &'a HashMap<&'a str, usize>,
    number: usize,
}

impl RowCells<'_> {
    fn text(&self, column: &str) -> &str {
        self.columns
            .get(column)
            .and_then(|i| self.row.get(*i))
            .unwrap_or("")
    }

    fn invalid(&self, column: &str) -> StorageError {
        StorageError::InvalidValue {
            row: self.number,
            column: column.to_string(),
            value: self.text(column).to_string(),
        }
    }

    fn parse<T: std::str::FromStr>(&self, column: &str) -> Result<T, StorageError> {
        self.text(column).parse().map_err(|_| self.invalid(column))
    }

    fn optional<T: std::str::FromStr>(&self, column: &str) -> Result<Option<T>, StorageError> {
        let value = self.text(column);
        if value.is_empty() {
            Ok(None)
        } else {
            value.parse().map(Some).map_err(|_| self.invalid(column))
        }
    }

    fn optional_text(&self, column: &str) -> Option<String> {
        let value = self.text(column);
        (!value.is_empty()).then(|| value.to_string())
    }

    fn optional_date(&self, column: &str) -> Result<Option<NaiveDate>, StorageError> {
        let value = self.text(column);
        if value.is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| self.invalid(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: u32, keywords: Option<Vec<&str>>) -> EpisodeRecord {
        let presence: CharacterPresence = vec![
            ("jon".to_string(), true),
            ("sam".to_string(), index % 2 == 0),
        ]
        .into_iter()
        .collect();
        let character_score = presence.count_present();

        EpisodeRecord {
            season: 1,
            episode_in_season: index,
            global_index: index,
            title: format!("Episode, \"{}\"", index),
            synopsis: "Jon rides north.\nSam follows.".to_string(),
            keywords: keywords.map(|k| k.into_iter().map(str::to_string).collect()),
            rating: if index == 2 { None } else { Some(8.5) },
            air_date: NaiveDate::from_ymd_opt(2011, 4, 17),
            director_credit_text: Some("\n Tim Van Patten \n".to_string()),
            link: format!("https://www.imdb.com/title/tt{}/", index),
            director: Some("Tim Van Patten".to_string()),
            presence,
            character_score,
            departed_from_source: index > 1,
            outside_director: if index == 2 { None } else { Some(true) },
        }
    }

    #[test]
    fn table_survives_write_and_read() {
        let records = vec![
            record(1, Some(vec!["direwolf", "the wall"])),
            record(2, None),
            record(3, Some(vec![])),
        ];

        let mut buf = Vec::new();
        write_table(&mut buf, &records).unwrap();
        let loaded = read_table(buf.as_slice()).unwrap();

        assert_eq!(loaded, records);
    }

    #[test]
    fn header_lists_presence_columns_in_roster_order() {
        let mut buf = Vec::new();
        write_table(&mut buf, &[record(1, None)]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let header = text.lines().next().unwrap();

        assert!(header.ends_with("outside_director,has_jon,has_sam"));
    }

    #[test]
    fn missing_column_is_reported() {
        let csv = "global_index,season\n1,1\n";
        assert!(matches!(
            read_table(csv.as_bytes()),
            Err(StorageError::MissingColumn(_))
        ));
    }

    #[test]
    fn tampered_index_fails_verification() {
        let records = vec![record(1, None), record(2, None)];
        let mut buf = Vec::new();
        write_table(&mut buf, &records).unwrap();
        let text = String::from_utf8(buf).unwrap().replacen("\n2,1,2,", "\n5,1,2,", 1);

        assert!(matches!(
            read_table(text.as_bytes()),
            Err(StorageError::Invariant(TabulateError::IndexGap { .. }))
        ));
    }

    #[test]
    fn save_and_load_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("episodes.csv");
        let records = vec![record(1, Some(vec!["dragon"]))];

        save_table(&path, &records).unwrap();
        assert_eq!(load_table(&path).unwrap(), records);
    }
}
