use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{config::Config, database::DbPool, jobs::JobRunner};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Completed and failed jobs never change status again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub sheet_url: Option<String>,
    pub column_name: Option<String>,
    pub status: JobStatus,
    pub total_urls: i64,
    pub processed_urls: i64,
    pub progress: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(spec: &JobSpec, total_urls: i64) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: spec.owner_id.clone(),
            name: spec.name.clone(),
            sheet_url: spec.sheet_url.clone(),
            column_name: spec.column_name.clone(),
            status: JobStatus::Pending,
            total_urls,
            processed_urls: 0,
            progress: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Creation request for an extraction job. Either `sheet_url` (plus the column
/// holding the websites) or an explicit `urls` list must be provided.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub owner_id: String,
    pub name: String,
    pub sheet_url: Option<String>,
    pub column_name: Option<String>,
    #[serde(default)]
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteResult {
    pub id: Option<i64>,
    pub job_id: String,
    pub website: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct CliApp {
    pub config: Config,
    pub db_pool: DbPool,
    pub runner: Arc<JobRunner>,
}
