//! Course-evaluation diff engine.
//!
//! Compares an expected dataset (the queried export) against an actual one
//! (the department-confirmed sheet), keyed by each row's natural key, and
//! writes one combined CSV artifact: rows missing from the actual side,
//! rows only present there, and rows whose non-key columns changed.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use super::rows::{CourseRow, RowKey, COLUMNS};
use crate::error::Result;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Status marker written in the artifact's first column.
const STATUS_MISSING: &str = "-";
const STATUS_EXTRA: &str = "+";
const STATUS_CHANGED: &str = "~";

/// Outcome of one diff export.
#[derive(Debug, Clone)]
pub struct DiffOutcome {
    pub base_file_name: String,
    pub artifact_path: PathBuf,
    pub was_difference_found: bool,
}

/// Diff engine for one labeled dataset pair.
pub struct CoursesDiff {
    base_file_name: String,
    output_dir: PathBuf,
}

impl CoursesDiff {
    /// `label` is typically a department name; whitespace is normalized to
    /// underscores so repeated runs for the same label land on the same
    /// artifact name.
    pub fn new(label: &str, output_dir: &Path) -> Self {
        let normalized = WHITESPACE_RE.replace_all(label.trim(), "_");
        Self {
            base_file_name: format!("diff_{}_courses", normalized),
            output_dir: output_dir.to_path_buf(),
        }
    }

    pub fn base_file_name(&self) -> &str {
        &self.base_file_name
    }

    /// Compare the two datasets and write the artifact.
    ///
    /// The comparison is validated in full before the artifact file is
    /// created, so a malformed row never leaves a partial artifact behind.
    /// Prior artifacts with the same name are overwritten by the caller's
    /// choice of output directory, never appended to.
    pub fn export(&self, expected: &[CourseRow], actual: &[CourseRow]) -> Result<DiffOutcome> {
        let expected_by_key = keyed(expected)?;
        let actual_by_key = keyed(actual)?;

        let keys: BTreeSet<&RowKey> = expected_by_key.keys().chain(actual_by_key.keys()).collect();

        let mut lines: Vec<Vec<String>> = Vec::new();
        for key in keys {
            match (expected_by_key.get(key), actual_by_key.get(key)) {
                (Some(expected_row), None) => {
                    lines.push(artifact_line(STATUS_MISSING, expected_row, &[]));
                }
                (None, Some(actual_row)) => {
                    lines.push(artifact_line(STATUS_EXTRA, actual_row, &[]));
                }
                (Some(expected_row), Some(actual_row)) => {
                    let changed = expected_row.changed_columns(actual_row);
                    if !changed.is_empty() {
                        lines.push(artifact_line(STATUS_CHANGED, actual_row, &changed));
                    }
                }
                (None, None) => unreachable!("key came from one of the two maps"),
            }
        }

        std::fs::create_dir_all(&self.output_dir)?;
        let artifact_path = self.output_dir.join(format!("{}.csv", self.base_file_name));
        let mut writer = csv::Writer::from_path(&artifact_path)?;

        let mut header: Vec<&str> = vec!["status"];
        header.extend(COLUMNS);
        header.push("changed_columns");
        writer.write_record(&header)?;
        for line in &lines {
            writer.write_record(line)?;
        }
        writer.flush()?;

        let was_difference_found = !lines.is_empty();
        log::info!(
            "Diff {}: {} difference line(s), artifact {}",
            self.base_file_name,
            lines.len(),
            artifact_path.display()
        );

        Ok(DiffOutcome {
            base_file_name: self.base_file_name.clone(),
            artifact_path,
            was_difference_found,
        })
    }
}

fn artifact_line(status: &str, row: &CourseRow, changed: &[&str]) -> Vec<String> {
    let mut line = Vec::with_capacity(COLUMNS.len() + 2);
    line.push(status.to_string());
    line.extend(row.values_in_order().iter().map(|v| v.to_string()));
    line.push(changed.join(";"));
    line
}

/// Index rows by natural key. Key validation happens here, before any
/// artifact I/O. Later duplicates of a key replace earlier ones.
fn keyed(rows: &[CourseRow]) -> Result<BTreeMap<RowKey, &CourseRow>> {
    let mut by_key = BTreeMap::new();
    for (index, row) in rows.iter().enumerate() {
        let key = row.key(index + 1)?;
        if by_key.insert(key.clone(), row).is_some() {
            log::debug!("Duplicate row key {:?}, keeping the later row", key);
        }
    }
    Ok(by_key)
}
