//! Raw anime CSV -> processed CSV with a single `combined_info` column.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::core::errors::RecommenderError;

/// Columns every raw dataset must carry.
pub const REQUIRED_COLUMNS: [&str; 3] = ["Name", "Genre", "Synopsis"];

/// Header of the only column written to the processed file.
pub const COMBINED_COLUMN: &str = "combined_info";

/// Builds the text embedded for one anime.
pub fn combine_info(name: &str, synopsis: &str, genre: &str) -> String {
    format!("Title: {} Overview: {} Genres: {}", name, synopsis, genre)
}

pub struct AnimeDataLoader {
    original_csv: PathBuf,
    processed_csv: PathBuf,
}

struct ColumnIndex {
    name: usize,
    genre: usize,
    synopsis: usize,
}

impl AnimeDataLoader {
    pub fn new(original_csv: impl Into<PathBuf>, processed_csv: impl Into<PathBuf>) -> Self {
        Self {
            original_csv: original_csv.into(),
            processed_csv: processed_csv.into(),
        }
    }

    /// Reads the raw file, validates it and writes the processed file.
    ///
    /// Returns the path of the processed file. Any previous processed file is
    /// overwritten.
    pub fn load_and_process(&self) -> Result<PathBuf, RecommenderError> {
        let combined = self.read_combined_rows()?;

        if let Some(parent) = self.processed_csv.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = WriterBuilder::new().from_path(&self.processed_csv)?;
        writer.write_record([COMBINED_COLUMN])?;
        for value in &combined {
            writer.write_record([value.as_str()])?;
        }
        writer.flush()?;

        tracing::info!(
            "Processed {} rows from {} into {}",
            combined.len(),
            self.original_csv.display(),
            self.processed_csv.display()
        );

        Ok(self.processed_csv.clone())
    }

    fn read_combined_rows(&self) -> Result<Vec<String>, RecommenderError> {
        if !self.original_csv.exists() {
            return Err(RecommenderError::NotFound(format!(
                "The file {} was not found.",
                self.original_csv.display()
            )));
        }

        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.original_csv)?;

        let headers = reader
            .headers()
            .map_err(|_| self.empty_error())?
            .clone();
        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(self.empty_error());
        }

        let columns = resolve_columns(&headers)?;
        let width = headers.len();

        let mut combined = Vec::new();
        let mut skipped = 0usize;
        for (line, result) in reader.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(err) => {
                    tracing::warn!("Skipping unreadable row {}: {}", line + 1, err);
                    skipped += 1;
                    continue;
                }
            };

            if record.len() > width {
                tracing::warn!(
                    "Skipping malformed row {}: expected {} fields, saw {}",
                    line + 1,
                    width,
                    record.len()
                );
                skipped += 1;
                continue;
            }

            let field = |idx: usize| record.get(idx).unwrap_or("");
            combined.push(combine_info(
                field(columns.name),
                field(columns.synopsis),
                field(columns.genre),
            ));
        }

        if skipped > 0 {
            tracing::warn!(
                "Skipped {} malformed row(s) in {}",
                skipped,
                self.original_csv.display()
            );
        }

        if combined.is_empty() {
            return Err(self.empty_error());
        }

        Ok(combined)
    }

    fn empty_error(&self) -> RecommenderError {
        RecommenderError::EmptyInput(format!(
            "The file {} is empty.",
            self.original_csv.display()
        ))
    }
}

fn resolve_columns(headers: &StringRecord) -> Result<ColumnIndex, RecommenderError> {
    let position = |name: &str| headers.iter().position(|h| h == name);

    let missing: BTreeSet<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| position(column).is_none())
        .collect();
    if !missing.is_empty() {
        let missing_list = missing.into_iter().collect::<Vec<_>>().join(", ");
        return Err(RecommenderError::Validation(format!(
            "CSV file is missing required column(s): {}",
            missing_list
        )));
    }

    match (position("Name"), position("Genre"), position("Synopsis")) {
        (Some(name), Some(genre), Some(synopsis)) => Ok(ColumnIndex {
            name,
            genre,
            synopsis,
        }),
        _ => Err(RecommenderError::internal("required column lookup failed")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_raw(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("anime_raw.csv");
        fs::write(&path, contents).unwrap();
        path
    }

    fn read_processed(path: &Path) -> Vec<String> {
        let mut reader = ReaderBuilder::new().from_path(path).unwrap();
        assert_eq!(reader.headers().unwrap().iter().collect::<Vec<_>>(), vec![COMBINED_COLUMN]);
        reader
            .records()
            .map(|r| r.unwrap().get(0).unwrap().to_string())
            .collect()
    }

    #[test]
    fn processes_one_row_per_input_row() {
        let dir = TempDir::new().unwrap();
        let raw = write_raw(
            &dir,
            "Name,Genre,Synopsis\nA,Action,X\nB,Drama,Y\nC,Comedy,\"Z, with comma\"\n",
        );
        let processed = dir.path().join("out").join("anime_processed.csv");

        let loader = AnimeDataLoader::new(&raw, &processed);
        let written = loader.load_and_process().unwrap();
        assert_eq!(written, processed);

        let rows = read_processed(&processed);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], "Title: A Overview: X Genres: Action");
        assert_eq!(rows[2], "Title: C Overview: Z, with comma Genres: Comedy");
    }

    #[test]
    fn extra_columns_are_ignored_and_order_is_kept() {
        let dir = TempDir::new().unwrap();
        let raw = write_raw(
            &dir,
            "anime_id,Synopsis,Score,Genre,Name\n1,S1,9.1,G1,N1\n2,S2,8.0,G2,N2\n",
        );
        let processed = dir.path().join("anime_processed.csv");

        AnimeDataLoader::new(&raw, &processed)
            .load_and_process()
            .unwrap();

        let rows = read_processed(&processed);
        assert_eq!(
            rows,
            vec![
                "Title: N1 Overview: S1 Genres: G1".to_string(),
                "Title: N2 Overview: S2 Genres: G2".to_string(),
            ]
        );
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let dir = TempDir::new().unwrap();
        let raw = write_raw(
            &dir,
            "Name,Genre,Synopsis\nA,Action,X\nB,Drama,Y,unexpected,extra\nC,Comedy,Z\n",
        );
        let processed = dir.path().join("anime_processed.csv");

        AnimeDataLoader::new(&raw, &processed)
            .load_and_process()
            .unwrap();

        let rows = read_processed(&processed);
        assert_eq!(rows.len(), 2);
        assert!(rows[1].starts_with("Title: C"));
    }

    #[test]
    fn rows_with_empty_fields_are_kept() {
        let dir = TempDir::new().unwrap();
        let raw = write_raw(&dir, "Name,Genre,Synopsis\nA,Action,X\n,,\nC,Comedy\n");
        let processed = dir.path().join("anime_processed.csv");

        AnimeDataLoader::new(&raw, &processed)
            .load_and_process()
            .unwrap();

        let rows = read_processed(&processed);
        assert_eq!(
            rows,
            vec![
                "Title: A Overview: X Genres: Action".to_string(),
                "Title:  Overview:  Genres: ".to_string(),
                "Title: C Overview:  Genres: Comedy".to_string(),
            ]
        );
    }

    #[test]
    fn missing_columns_are_named_in_the_error() {
        let dir = TempDir::new().unwrap();
        let raw = write_raw(&dir, "Name,Score\nA,1\n");
        let processed = dir.path().join("anime_processed.csv");

        let err = AnimeDataLoader::new(&raw, &processed)
            .load_and_process()
            .unwrap_err();
        match err {
            RecommenderError::Validation(msg) => {
                assert_eq!(msg, "CSV file is missing required column(s): Genre, Synopsis")
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!processed.exists());
    }

    #[test]
    fn missing_source_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = AnimeDataLoader::new(
            dir.path().join("nope.csv"),
            dir.path().join("anime_processed.csv"),
        )
        .load_and_process()
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn empty_sources_are_empty_input() {
        let dir = TempDir::new().unwrap();
        let processed = dir.path().join("anime_processed.csv");

        let raw = write_raw(&dir, "");
        let err = AnimeDataLoader::new(&raw, &processed)
            .load_and_process()
            .unwrap_err();
        assert!(matches!(err, RecommenderError::EmptyInput(_)));

        let raw = write_raw(&dir, "Name,Genre,Synopsis\n");
        let err = AnimeDataLoader::new(&raw, &processed)
            .load_and_process()
            .unwrap_err();
        assert!(matches!(err, RecommenderError::EmptyInput(_)));
    }

    #[test]
    fn output_is_overwritten() {
        let dir = TempDir::new().unwrap();
        let processed = dir.path().join("anime_processed.csv");
        fs::write(&processed, "stale,content\n1,2\n3,4\n5,6\n").unwrap();

        let raw = write_raw(&dir, "Name,Genre,Synopsis\nA,Action,X\n");
        AnimeDataLoader::new(&raw, &processed)
            .load_and_process()
            .unwrap();

        assert_eq!(read_processed(&processed).len(), 1);
    }
}
