//! LMS (Canvas-style) REST client.

use async_trait::async_trait;
use reqwest::StatusCode;

use super::models::{CanvasSection, CanvasStudent, CanvasTeacher};
use crate::config::EndpointConfig;
use crate::error::{Result, SyncError};

/// Read-only view of course membership as the LMS reports it.
#[async_trait]
pub trait LmsApi: Send + Sync {
    /// All sections of a course, linked or not.
    async fn sections_list(&self, course_id: u64) -> Result<Vec<CanvasSection>>;

    /// All students of a course with their per-section enrollments.
    async fn students_list(&self, course_id: u64) -> Result<Vec<CanvasStudent>>;

    /// All teachers of a course.
    async fn teachers_list(&self, course_id: u64) -> Result<Vec<CanvasTeacher>>;
}

/// HTTP implementation of [`LmsApi`] against the campus LMS.
pub struct CanvasClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl CanvasClient {
    pub fn new(config: &EndpointConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("GET {}", url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SyncError::NotFound(url));
        }
        let response = response.error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl LmsApi for CanvasClient {
    async fn sections_list(&self, course_id: u64) -> Result<Vec<CanvasSection>> {
        self.get_json(&format!("/api/v1/courses/{}/sections", course_id))
            .await
    }

    async fn students_list(&self, course_id: u64) -> Result<Vec<CanvasStudent>> {
        self.get_json(&format!(
            "/api/v1/courses/{}/users?enrollment_type[]=student&include[]=enrollments",
            course_id
        ))
        .await
    }

    async fn teachers_list(&self, course_id: u64) -> Result<Vec<CanvasTeacher>> {
        self.get_json(&format!(
            "/api/v1/courses/{}/users?enrollment_type[]=teacher",
            course_id
        ))
        .await
    }
}
