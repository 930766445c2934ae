//! Parser for the Book-Crossing CSV files.
//!
//! This module handles tokenizing the three CSV exports:
//! - Books.csv: ISBN, Book-Title, Book-Author, Year-Of-Publication, Publisher, Image-URL-S/M/L
//! - Ratings.csv: User-ID, ISBN, Book-Rating
//! - Users.csv: User-ID, Location, Age
//!
//! Columns are located through the header line, so extra or reordered
//! columns are fine. Rows that can't be tokenized or that lack a usable key
//! are skipped and counted rather than failing the whole load.

use crate::error::{DataLoadError, Result};
use crate::types::UserId;
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

/// A book row before cleaning. Empty fields are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBook {
    pub isbn: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub year: Option<String>,
    pub publisher: Option<String>,
    pub image_url_small: Option<String>,
    pub image_url_medium: Option<String>,
    pub image_url_large: Option<String>,
}

/// A rating row before cleaning. `rating` is `None` when it isn't numeric.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRating {
    pub user_id: UserId,
    pub isbn: String,
    pub rating: Option<f32>,
}

/// A user row before cleaning
#[derive(Debug, Clone, PartialEq)]
pub struct RawUser {
    pub id: UserId,
    pub location: Option<String>,
    pub age: Option<String>,
}

/// Rows kept and skipped while parsing one file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub parsed: usize,
    pub skipped: usize,
}

/// Decode one Latin-1 field
///
/// The Book-Crossing dump is Latin-1, not UTF-8. Every byte maps directly to
/// the Unicode code point of the same value.
fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// A tokenized CSV file: header plus numbered data rows
struct CsvTable {
    file: String,
    header: Vec<String>,
    rows: Vec<(usize, Vec<String>)>,
    skipped: usize,
}

impl CsvTable {
    fn read(path: &Path) -> Result<Self> {
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let handle = File::open(path).map_err(|_| DataLoadError::FileNotFound {
            path: path.display().to_string(),
        })?;

        // Flexible so short and long rows reach us instead of aborting the read
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(handle);

        let header: Vec<String> = reader
            .byte_headers()?
            .iter()
            .map(|h| latin1(h).trim().to_string())
            .collect();
        if header.iter().all(|h| h.is_empty()) {
            return Err(DataLoadError::EmptyFile { file });
        }

        let mut rows = Vec::new();
        let mut skipped = 0;
        let mut record = csv::ByteRecord::new();
        loop {
            match reader.read_byte_record(&mut record) {
                Ok(false) => break,
                Ok(true) => {
                    let line = record.position().map_or(0, |p| p.line() as usize);
                    if record.len() == 1 && record[0].iter().all(u8::is_ascii_whitespace) {
                        continue; // Skip empty lines
                    }
                    if record.len() < header.len() {
                        debug!("Skipping short record at line {} in {}", line, file);
                        skipped += 1;
                        continue;
                    }
                    rows.push((line, record.iter().map(latin1).collect()));
                }
                Err(err) if err.is_io_error() => return Err(err.into()),
                Err(err) => {
                    debug!("Skipping malformed record in {}: {}", file, err);
                    skipped += 1;
                }
            }
        }

        Ok(Self {
            file,
            header,
            rows,
            skipped,
        })
    }

    fn column(&self, name: &str) -> Result<usize> {
        self.optional_column(name)
            .ok_or_else(|| DataLoadError::MissingColumn {
                file: self.file.clone(),
                column: name.to_string(),
            })
    }

    fn optional_column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    fn log_report(&self, report: ParseReport) {
        if report.skipped > 0 {
            warn!(
                "Skipped {} of {} rows in {}",
                report.skipped,
                report.parsed + report.skipped,
                self.file
            );
        }
    }
}

/// Read an optional column, mapping blank values to `None`
fn field(fields: &[String], column: Option<usize>) -> Option<String> {
    let value = fields.get(column?)?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Parse the Books.csv file
///
/// Only `ISBN` is required; every other missing column is filled during
/// cleaning.
pub fn parse_books(path: &Path) -> Result<(Vec<RawBook>, ParseReport)> {
    let table = CsvTable::read(path)?;
    let isbn_col = table.column("ISBN")?;
    let title_col = table.optional_column("Book-Title");
    let author_col = table.optional_column("Book-Author");
    let year_col = table.optional_column("Year-Of-Publication");
    let publisher_col = table.optional_column("Publisher");
    let small_col = table.optional_column("Image-URL-S");
    let medium_col = table.optional_column("Image-URL-M");
    let large_col = table.optional_column("Image-URL-L");

    let mut report = ParseReport {
        skipped: table.skipped,
        ..Default::default()
    };
    let mut books = Vec::with_capacity(table.rows.len());

    for (_, fields) in &table.rows {
        let Some(isbn) = field(fields, Some(isbn_col)) else {
            report.skipped += 1;
            continue;
        };
        books.push(RawBook {
            isbn,
            title: field(fields, title_col),
            author: field(fields, author_col),
            year: field(fields, year_col),
            publisher: field(fields, publisher_col),
            image_url_small: field(fields, small_col),
            image_url_medium: field(fields, medium_col),
            image_url_large: field(fields, large_col),
        });
    }

    report.parsed = books.len();
    table.log_report(report);
    Ok((books, report))
}

/// Parse the Ratings.csv file
///
/// A non-numeric `Book-Rating` is kept as `None` so that cleaning decides
/// what to do with it; an unparsable `User-ID` or a blank ISBN skips the row.
pub fn parse_ratings(path: &Path) -> Result<(Vec<RawRating>, ParseReport)> {
    let table = CsvTable::read(path)?;
    let user_col = table.column("User-ID")?;
    let isbn_col = table.column("ISBN")?;
    let rating_col = table.column("Book-Rating")?;

    let mut report = ParseReport {
        skipped: table.skipped,
        ..Default::default()
    };
    let mut ratings = Vec::with_capacity(table.rows.len());

    for (line, fields) in &table.rows {
        let user_id = field(fields, Some(user_col)).and_then(|v| v.parse::<UserId>().ok());
        let isbn = field(fields, Some(isbn_col));
        match (user_id, isbn) {
            (Some(user_id), Some(isbn)) => ratings.push(RawRating {
                user_id,
                isbn,
                rating: field(fields, Some(rating_col)).and_then(|v| v.parse::<f32>().ok()),
            }),
            _ => {
                debug!("Skipping rating without user or ISBN at line {}", line);
                report.skipped += 1;
            }
        }
    }

    report.parsed = ratings.len();
    table.log_report(report);
    Ok((ratings, report))
}

/// Parse the Users.csv file
pub fn parse_users(path: &Path) -> Result<(Vec<RawUser>, ParseReport)> {
    let table = CsvTable::read(path)?;
    let id_col = table.column("User-ID")?;
    let location_col = table.optional_column("Location");
    let age_col = table.optional_column("Age");

    let mut report = ParseReport {
        skipped: table.skipped,
        ..Default::default()
    };
    let mut users = Vec::with_capacity(table.rows.len());

    for (_, fields) in &table.rows {
        let Some(id) = field(fields, Some(id_col)).and_then(|v| v.parse::<UserId>().ok()) else {
            report.skipped += 1;
            continue;
        };
        users.push(RawUser {
            id,
            location: field(fields, location_col),
            age: field(fields, age_col),
        });
    }

    report.parsed = users.len();
    table.log_report(report);
    Ok((users, report))
}
