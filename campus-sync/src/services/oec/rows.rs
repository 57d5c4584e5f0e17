//! Course-evaluation row shape.
//!
//! Both diff inputs (the queried export and the department-confirmed sheet)
//! are normalized into [`CourseRow`] values with a fixed column order, so
//! comparison happens on named fields rather than CSV positions.

use std::collections::HashMap;

use crate::error::{Result, SyncError};

/// Columns of a course-evaluation export, in artifact order.
pub const COLUMNS: [&str; 12] = [
    "course_id",
    "course_name",
    "dept_name",
    "catalog_id",
    "instruction_format",
    "section_num",
    "ldap_uid",
    "first_name",
    "last_name",
    "email_address",
    "instructor_func",
    "enrollment_count",
];

/// Natural key of a row: course plus instructor. `enrollment_count` and the
/// other columns are compared but never part of the key.
pub const KEY_COLUMNS: [&str; 2] = ["course_id", "ldap_uid"];

/// A row's natural key. Kept as a tuple rather than a joined string:
/// `course_id` values contain `-` themselves, so any flat encoding could
/// collide across the two parts.
pub type RowKey = (String, String);

/// One course-evaluation row, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseRow {
    values: HashMap<String, String>,
}

impl CourseRow {
    /// Build a row from `(column, value)` pairs. Unknown columns are kept
    /// but only the canonical [`COLUMNS`] participate in diffs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Build a row from a CSV record using the file's header row.
    pub fn from_record(headers: &csv::StringRecord, record: &csv::StringRecord) -> Self {
        Self::from_pairs(
            headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.trim().to_string(), v.to_string())),
        )
    }

    pub fn get(&self, column: &str) -> &str {
        self.values.get(column).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        self.values.insert(column.to_string(), value.into());
    }

    /// The row's natural key. `position` is the 1-based position of the row
    /// in its source and is reported when a key column is missing or empty.
    pub fn key(&self, position: usize) -> Result<RowKey> {
        Ok((
            self.key_part(KEY_COLUMNS[0], position)?,
            self.key_part(KEY_COLUMNS[1], position)?,
        ))
    }

    fn key_part(&self, column: &str, position: usize) -> Result<String> {
        let value = self.get(column);
        if value.is_empty() {
            return Err(SyncError::MalformedRow {
                position,
                missing: column.to_string(),
            });
        }
        Ok(value.to_string())
    }

    /// Values in canonical column order.
    pub fn values_in_order(&self) -> Vec<&str> {
        COLUMNS.iter().map(|c| self.get(c)).collect()
    }

    /// Names of non-key columns whose values differ from `other`.
    pub fn changed_columns(&self, other: &CourseRow) -> Vec<&'static str> {
        COLUMNS
            .iter()
            .filter(|c| !KEY_COLUMNS.contains(c))
            .filter(|c| self.get(c) != other.get(c))
            .copied()
            .collect()
    }
}

/// Read all rows from a headered CSV file.
pub fn read_rows(path: &std::path::Path) -> Result<Vec<CourseRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(CourseRow::from_record(&headers, &record));
    }
    Ok(rows)
}
