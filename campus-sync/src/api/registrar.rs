//! Registrar (student records) client.
//!
//! Enrollment rows are validated into [`RegistrarEnrollment`] here; rows
//! with unrecognized status codes are dropped with a debug log so that
//! business logic only ever sees Enrolled or Waitlisted.

use async_trait::async_trait;
use reqwest::StatusCode;

use super::models::{RegistrarEnrollment, RegistrarRowWire, StudentPhoto};
use crate::config::EndpointConfig;
use crate::error::Result;

/// Official enrollment state and student photos, per registrar section.
#[async_trait]
pub trait RegistrarApi: Send + Sync {
    /// Enrollment rows for one officially-recognized section, identified by
    /// its course-control-number and term parts.
    async fn enrolled_students(
        &self,
        ccn: &str,
        year: &str,
        term_letter: char,
    ) -> Result<Vec<RegistrarEnrollment>>;

    /// Photo bytes for one student, if the registrar has one on file.
    async fn photo(&self, login_id: &str) -> Result<Option<StudentPhoto>>;
}

/// HTTP implementation of [`RegistrarApi`] against the campus data service.
pub struct RegistrarClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl RegistrarClient {
    pub fn new(config: &EndpointConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }
}

#[async_trait]
impl RegistrarApi for RegistrarClient {
    async fn enrolled_students(
        &self,
        ccn: &str,
        year: &str,
        term_letter: char,
    ) -> Result<Vec<RegistrarEnrollment>> {
        let url = format!(
            "{}/enrollments?ccn={}&term_yr={}&term_cd={}",
            self.base_url,
            urlencoding::encode(ccn),
            urlencoding::encode(year),
            term_letter
        );
        log::debug!("GET {}", url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;
        let wire_rows: Vec<RegistrarRowWire> = response.json().await?;

        let mut rows = Vec::with_capacity(wire_rows.len());
        for wire in wire_rows {
            match RegistrarEnrollment::from_wire(wire) {
                Some(row) => rows.push(row),
                None => log::debug!("Dropping registrar row with unrecognized status for ccn {}", ccn),
            }
        }
        Ok(rows)
    }

    async fn photo(&self, login_id: &str) -> Result<Option<StudentPhoto>> {
        let url = format!("{}/photo/{}", self.base_url, urlencoding::encode(login_id));
        log::debug!("GET {}", url);
        let response = self.http.get(&url).bearer_auth(&self.token).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status()?;
        let data = response.bytes().await?.to_vec();
        if data.is_empty() {
            return Ok(None);
        }
        let size = data.len() as u64;
        Ok(Some(StudentPhoto { data, size }))
    }
}
