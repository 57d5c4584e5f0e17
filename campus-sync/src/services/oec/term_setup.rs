//! Term workspace provisioning in the remote drive store.
//!
//! Ensures the folder layout for a new evaluation term exists, seeds the
//! supplemental source files (reusing the previous term's copies where they
//! exist), and uploads the run log. Folder creation is idempotent: an
//! existing folder is reused, a created one is re-read by title before its
//! id is trusted. The store is externally shared, so a file title that
//! already exists in a target folder aborts the task rather than being
//! overwritten.
//!
//! All errors are caught at the task boundary ([`TermSetupTask::run`]),
//! logged with their full message, and terminate the run cleanly.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;

use super::rows::COLUMNS;
use crate::api::drive::RemoteStore;
use crate::api::models::RemoteItem;
use crate::api::term::is_term_code;
use crate::error::{Result, SyncError};

/// Supplemental source files seeded into each term workspace.
pub const SUPPLEMENTAL_SOURCES: [&str; 5] = [
    "course_instructors.csv",
    "course_supervisors.csv",
    "courses.csv",
    "instructors.csv",
    "supervisors.csv",
];

const TERM_SUBFOLDERS: [&str; 4] = ["departments", "exports", "imports", "supplemental_sources"];

/// Header row for a seeded source file.
fn header_columns(csv_name: &str) -> &'static [&'static str] {
    match csv_name {
        "courses.csv" => &COLUMNS,
        "instructors.csv" => &["ldap_uid", "first_name", "last_name", "email_address", "blue_role"],
        "supervisors.csv" => &[
            "ldap_uid",
            "first_name",
            "last_name",
            "email_address",
            "supervisor_group",
            "dept_name",
        ],
        "course_instructors.csv" => &["course_id", "ldap_uid"],
        "course_supervisors.csv" => &["course_id", "ldap_uid", "dept_name"],
        _ => &[],
    }
}

/// One-shot setup task for a term's remote workspace.
pub struct TermSetupTask<D> {
    drive: D,
    term_code: String,
    root_folder_id: String,
    output_dir: PathBuf,
    log_lines: Mutex<Vec<String>>,
}

impl<D: RemoteStore> TermSetupTask<D> {
    pub fn new(drive: D, term_code: &str, root_folder_id: &str, output_dir: &Path) -> Self {
        Self {
            drive,
            term_code: term_code.to_string(),
            root_folder_id: root_folder_id.to_string(),
            output_dir: output_dir.to_path_buf(),
            log_lines: Mutex::new(Vec::new()),
        }
    }

    /// Run the task. Errors do not propagate past this boundary: the task
    /// either completes or terminates with the cause logged.
    pub async fn run(&self) {
        match self.run_task().await {
            Ok(()) => log::info!("Term setup for {} complete", self.term_code),
            Err(err) => log::error!("TermSetupTask aborted with error: {}", err),
        }
    }

    async fn run_task(&self) -> Result<()> {
        self.note(format!("Setting up remote workspace for term {}", self.term_code));

        let term_folder = self
            .ensure_folder(&self.term_code, &self.root_folder_id)
            .await?;
        let mut supplemental = None;
        for name in TERM_SUBFOLDERS {
            let folder = self.ensure_folder(name, &term_folder.id).await?;
            if name == "supplemental_sources" {
                supplemental = Some(folder);
            }
        }
        let Some(supplemental) = supplemental else {
            return Err(SyncError::ProvisioningInconsistency(
                "supplemental_sources folder missing after provisioning".to_string(),
            ));
        };

        let previous_term = self.find_previous_term_folder().await?;
        match &previous_term {
            Some(folder) => self.note(format!("Found previous term folder {}", folder.title)),
            None => self.note("No previous term data found in remote store".to_string()),
        }

        for csv_name in SUPPLEMENTAL_SOURCES {
            let copied = match &previous_term {
                Some(prev) => {
                    self.copy_from_previous_term(prev, csv_name, &supplemental)
                        .await?
                }
                None => false,
            };
            if !copied {
                self.upload_header_only_csv(csv_name, &supplemental.id).await?;
            }
        }

        self.upload_run_log(&term_folder.id).await?;
        Ok(())
    }

    /// Idempotent ensure-exists for one folder level. Reuses an existing
    /// folder; otherwise creates it and re-reads the listing for its
    /// durable id, retrying once before escalating.
    async fn ensure_folder(&self, title: &str, parent_id: &str) -> Result<RemoteItem> {
        let found = self.drive.find_folders_by_title(title, parent_id).await?;
        if let Some(item) = found.into_iter().next() {
            log::debug!("Folder '{}' already present under {}", title, parent_id);
            return Ok(item);
        }

        self.drive.create_folder(title, parent_id).await?;
        self.note(format!("Created folder '{}'", title));

        for attempt in 0..2 {
            let listed = self.drive.find_folders_by_title(title, parent_id).await?;
            if let Some(item) = listed.into_iter().next() {
                return Ok(item);
            }
            if attempt == 0 {
                log::debug!("Folder '{}' not yet listed after creation, retrying", title);
            }
        }
        Err(SyncError::ProvisioningInconsistency(format!(
            "folder '{}' not listed under parent {} after creation",
            title, parent_id
        )))
    }

    /// Most recent term folder preceding the current one, by term code
    /// ordering of the folder titles under the configured root.
    async fn find_previous_term_folder(&self) -> Result<Option<RemoteItem>> {
        let folders = self.drive.find_folders(&self.root_folder_id).await?;
        Ok(folders
            .into_iter()
            .filter(|f| is_term_code(&f.title) && f.title.as_str() < self.term_code.as_str())
            .max_by(|a, b| a.title.cmp(&b.title)))
    }

    /// Try to copy `csv_name` from the previous term into `target`.
    /// Returns false when the previous term has no copy, leaving the caller
    /// to regenerate the file.
    async fn copy_from_previous_term(
        &self,
        previous_term: &RemoteItem,
        csv_name: &str,
        target: &RemoteItem,
    ) -> Result<bool> {
        let source = if csv_name == "course_supervisors.csv" {
            // Produced by export runs, so the freshest copy lives in the
            // previous term's latest dated export folder.
            self.latest_export_item(previous_term, csv_name).await?
        } else {
            self.previous_supplemental_item(previous_term, csv_name).await?
        };
        let Some(item) = source else {
            return Ok(false);
        };

        let existing = self.drive.find_items_by_title(csv_name, &target.id).await?;
        if !existing.is_empty() {
            self.note(format!("'{}' already present in current term, skipping copy", csv_name));
            return Ok(true);
        }

        self.drive.copy_item_to_folder(&item, &target.id).await?;
        self.note(format!(
            "Copied '{}' from previous term {}",
            csv_name, previous_term.title
        ));
        Ok(true)
    }

    async fn previous_supplemental_item(
        &self,
        previous_term: &RemoteItem,
        csv_name: &str,
    ) -> Result<Option<RemoteItem>> {
        let folders = self
            .drive
            .find_folders_by_title("supplemental_sources", &previous_term.id)
            .await?;
        let Some(folder) = folders.into_iter().next() else {
            return Ok(None);
        };
        let items = self.drive.find_items_by_title(csv_name, &folder.id).await?;
        Ok(items.into_iter().next())
    }

    async fn latest_export_item(
        &self,
        previous_term: &RemoteItem,
        csv_name: &str,
    ) -> Result<Option<RemoteItem>> {
        let folders = self
            .drive
            .find_folders_by_title("exports", &previous_term.id)
            .await?;
        let Some(exports) = folders.into_iter().next() else {
            return Ok(None);
        };
        let dated = self.drive.find_folders(&exports.id).await?;
        let Some(latest) = dated.into_iter().max_by(|a, b| a.title.cmp(&b.title)) else {
            return Ok(None);
        };
        let items = self.drive.find_items_by_title(csv_name, &latest.id).await?;
        Ok(items.into_iter().next())
    }

    /// Stage a header-only CSV locally and upload it.
    async fn upload_header_only_csv(&self, csv_name: &str, parent_id: &str) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;
        let local_path = self.output_dir.join(csv_name);
        let mut writer = csv::Writer::from_path(&local_path)?;
        writer.write_record(header_columns(csv_name))?;
        writer.flush()?;

        self.upload_guarded(csv_name, parent_id, "text/csv", &local_path)
            .await
    }

    /// Upload with the duplicate-artifact guard: a same-titled item in the
    /// target folder aborts the task instead of being overwritten.
    async fn upload_guarded(
        &self,
        title: &str,
        parent_id: &str,
        mime_type: &str,
        local_path: &Path,
    ) -> Result<()> {
        let existing = self.drive.find_items_by_title(title, parent_id).await?;
        if !existing.is_empty() {
            return Err(SyncError::DuplicateArtifact(format!(
                "'{}' already exists in remote folder {}; could not upload {}",
                title,
                parent_id,
                local_path.display()
            )));
        }
        self.drive
            .upload_file(title, "", parent_id, mime_type, local_path)
            .await?;
        self.note(format!("Uploaded '{}'", title));
        Ok(())
    }

    /// Write the buffered task log locally and upload it into
    /// `reports/<today>` under the term folder.
    async fn upload_run_log(&self, term_folder_id: &str) -> Result<()> {
        let reports = self.ensure_folder("reports", term_folder_id).await?;
        let now = Local::now();
        let today = now.format("%Y-%m-%d").to_string();
        let day_folder = self.ensure_folder(&today, &reports.id).await?;

        let log_name = format!("{}_term_setup_task.log", now.format("%H%M%S"));
        std::fs::create_dir_all(&self.output_dir)?;
        let local_path = self.output_dir.join(&log_name);
        let lines = self
            .log_lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .join("\n");
        std::fs::write(&local_path, lines + "\n")?;

        self.upload_guarded(&log_name, &day_folder.id, "text/plain", &local_path)
            .await
    }

    fn note(&self, message: String) {
        log::info!("{}", message);
        self.log_lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message);
    }
}
