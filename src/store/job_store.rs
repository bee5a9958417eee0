// src/store/job_store.rs
use chrono::{DateTime, Utc};
use rusqlite::params;
use tracing::debug;

use crate::database::DbPool;
use crate::models::{Job, JobStatus, Result};

const JOB_COLUMNS: &str = "id, owner_id, name, sheet_url, column_name, status, \
                           total_urls, processed_urls, progress, created_at, updated_at";

/// Persistence API for job records. Status transitions are guarded in SQL so
/// that terminal jobs stay immutable no matter how late a writer shows up.
#[derive(Clone)]
pub struct JobStore {
    db_pool: DbPool,
}

impl JobStore {
    pub fn new(db_pool: DbPool) -> Self {
        Self { db_pool }
    }

    pub async fn create_job(&self, job: &Job) -> Result<()> {
        debug!("💾 create_job() - Inserting job: {} ({})", job.name, job.id);

        let conn = self.db_pool.get().await?;
        match conn.execute(
            r#"
            INSERT INTO jobs (
                id, owner_id, name, sheet_url, column_name, status,
                total_urls, processed_urls, progress, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                job.id,
                job.owner_id,
                job.name,
                job.sheet_url.as_deref().unwrap_or(""),
                job.column_name.as_deref().unwrap_or(""),
                job.status.as_str(),
                job.total_urls,
                job.processed_urls,
                job.progress,
                job.created_at.to_rfc3339(),
                job.updated_at.to_rfc3339(),
            ],
        ) {
            Ok(_) => Ok(()),
            Err(e) => Err(Box::new(e)),
        }
    }

    pub async fn get_job(&self, job_id: &str) -> Result<Option<Job>> {
        let conn = self.db_pool.get().await?;

        let mut stmt = conn.prepare(&format!("SELECT {} FROM jobs WHERE id = ?", JOB_COLUMNS))?;
        let mut job_iter = stmt.query_map([job_id], job_from_row)?;

        if let Some(job) = job_iter.next() {
            return Ok(Some(job?));
        }
        Ok(None)
    }

    pub async fn list_jobs_for_owner(&self, owner_id: &str) -> Result<Vec<Job>> {
        let conn = self.db_pool.get().await?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM jobs WHERE owner_id = ? ORDER BY created_at DESC",
            JOB_COLUMNS
        ))?;
        let job_iter = stmt.query_map([owner_id], job_from_row)?;

        let mut jobs = Vec::new();
        for job in job_iter {
            jobs.push(job?);
        }
        Ok(jobs)
    }

    pub async fn list_recent_jobs(&self, limit: i64) -> Result<Vec<Job>> {
        let conn = self.db_pool.get().await?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM jobs ORDER BY created_at DESC LIMIT ?",
            JOB_COLUMNS
        ))?;
        let job_iter = stmt.query_map([limit], job_from_row)?;

        let mut jobs = Vec::new();
        for job in job_iter {
            jobs.push(job?);
        }
        Ok(jobs)
    }

    /// Moves a job to a new status. Returns false when the row is missing or
    /// already terminal, in which case nothing was written.
    pub async fn update_status(&self, job_id: &str, status: JobStatus) -> Result<bool> {
        debug!("🔄 update_status() - Job {} -> {}", job_id, status);

        let conn = self.db_pool.get().await?;
        let updated = conn.execute(
            "UPDATE jobs SET status = ?1, updated_at = ?2
             WHERE id = ?3 AND status NOT IN ('completed', 'failed')",
            params![status.as_str(), Utc::now().to_rfc3339(), job_id],
        )?;

        Ok(updated > 0)
    }

    /// Bumps the processed counter by one and recomputes progress in a single
    /// statement, so concurrent per-URL tasks can never lose an increment or
    /// push the counter past the total. Returns the updated
    /// (processed_urls, progress) pair, or None when the job is not in a
    /// processing state anymore.
    pub async fn increment_processed(&self, job_id: &str) -> Result<Option<(i64, i64)>> {
        let conn = self.db_pool.get().await?;

        let updated = conn.execute(
            r#"
            UPDATE jobs
            SET processed_urls = processed_urls + 1,
                progress = MIN(100, (processed_urls + 1) * 100 / total_urls),
                updated_at = ?2
            WHERE id = ?1
              AND status = 'processing'
              AND processed_urls < total_urls
            "#,
            params![job_id, Utc::now().to_rfc3339()],
        )?;

        if updated == 0 {
            return Ok(None);
        }

        let counters = conn.query_row(
            "SELECT processed_urls, progress FROM jobs WHERE id = ?1",
            [job_id],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?;

        Ok(Some(counters))
    }

    pub async fn mark_completed(&self, job_id: &str) -> Result<bool> {
        debug!("✅ mark_completed() - Job {}", job_id);

        let conn = self.db_pool.get().await?;
        let updated = conn.execute(
            "UPDATE jobs SET status = 'completed', progress = 100, updated_at = ?1
             WHERE id = ?2 AND status NOT IN ('completed', 'failed')",
            params![Utc::now().to_rfc3339(), job_id],
        )?;

        Ok(updated > 0)
    }

    pub async fn mark_failed(&self, job_id: &str) -> Result<bool> {
        debug!("❌ mark_failed() - Job {}", job_id);

        let conn = self.db_pool.get().await?;
        let updated = conn.execute(
            "UPDATE jobs SET status = 'failed', updated_at = ?1
             WHERE id = ?2 AND status NOT IN ('completed', 'failed')",
            params![Utc::now().to_rfc3339(), job_id],
        )?;

        Ok(updated > 0)
    }

    /// Deletes a job and all of its results.
    pub async fn delete_job(&self, job_id: &str) -> Result<bool> {
        let conn = self.db_pool.get().await?;

        let removed_results = conn.execute("DELETE FROM results WHERE job_id = ?1", [job_id])?;
        let removed = conn.execute("DELETE FROM jobs WHERE id = ?1", [job_id])?;

        debug!(
            "🗑️ delete_job() - Job {}: removed {} result rows",
            job_id, removed_results
        );
        Ok(removed > 0)
    }
}

fn job_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Job> {
    let get_optional_string = |idx: usize| -> Option<String> {
        match row.get::<_, Option<String>>(idx) {
            Ok(Some(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    };

    let status_str: String = row.get(5)?;
    let status = JobStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(5, status_str.clone(), rusqlite::types::Type::Text)
    })?;

    let created_at_str: String = row.get(9)?;
    let updated_at_str: String = row.get(10)?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|_| {
            rusqlite::Error::InvalidColumnType(
                9,
                created_at_str.clone(),
                rusqlite::types::Type::Text,
            )
        })?
        .with_timezone(&Utc);
    let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
        .map_err(|_| {
            rusqlite::Error::InvalidColumnType(
                10,
                updated_at_str.clone(),
                rusqlite::types::Type::Text,
            )
        })?
        .with_timezone(&Utc);

    Ok(Job {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        sheet_url: get_optional_string(3),
        column_name: get_optional_string(4),
        status,
        total_urls: row.get(6)?,
        processed_urls: row.get(7)?,
        progress: row.get(8)?,
        created_at,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_db_pool;
    use crate::models::JobSpec;

    fn spec(name: &str) -> JobSpec {
        JobSpec {
            owner_id: "owner-1".to_string(),
            name: name.to_string(),
            sheet_url: None,
            column_name: None,
            urls: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_job_roundtrip() {
        let store = JobStore::new(test_db_pool().await);
        let job = Job::new(&spec("roundtrip"), 4);

        store.create_job(&job).await.unwrap();
        let loaded = store.get_job(&job.id).await.unwrap().unwrap();

        assert_eq!(loaded.id, job.id);
        assert_eq!(loaded.owner_id, "owner-1");
        assert_eq!(loaded.status, JobStatus::Pending);
        assert_eq!(loaded.total_urls, 4);
        assert_eq!(loaded.processed_urls, 0);
        assert_eq!(loaded.progress, 0);
        assert_eq!(loaded.sheet_url, None);
    }

    #[tokio::test]
    async fn test_get_missing_job_returns_none() {
        let store = JobStore::new(test_db_pool().await);
        assert!(store.get_job("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_increment_requires_processing_status() {
        let store = JobStore::new(test_db_pool().await);
        let job = Job::new(&spec("pending"), 2);
        store.create_job(&job).await.unwrap();

        // Still pending: the counter must not move.
        assert!(store.increment_processed(&job.id).await.unwrap().is_none());

        store
            .update_status(&job.id, JobStatus::Processing)
            .await
            .unwrap();
        let (processed, progress) = store.increment_processed(&job.id).await.unwrap().unwrap();
        assert_eq!((processed, progress), (1, 50));
    }

    #[tokio::test]
    async fn test_increment_never_exceeds_total() {
        let store = JobStore::new(test_db_pool().await);
        let job = Job::new(&spec("ceiling"), 3);
        store.create_job(&job).await.unwrap();
        store
            .update_status(&job.id, JobStatus::Processing)
            .await
            .unwrap();

        for _ in 0..3 {
            assert!(store.increment_processed(&job.id).await.unwrap().is_some());
        }
        // A stray extra increment is refused at the ceiling.
        assert!(store.increment_processed(&job.id).await.unwrap().is_none());

        let loaded = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.processed_urls, 3);
        assert_eq!(loaded.progress, 100);
    }

    #[tokio::test]
    async fn test_progress_is_floored_percentage() {
        let store = JobStore::new(test_db_pool().await);
        let job = Job::new(&spec("floor"), 3);
        store.create_job(&job).await.unwrap();
        store
            .update_status(&job.id, JobStatus::Processing)
            .await
            .unwrap();

        let (_, progress) = store.increment_processed(&job.id).await.unwrap().unwrap();
        assert_eq!(progress, 33);
        let (_, progress) = store.increment_processed(&job.id).await.unwrap().unwrap();
        assert_eq!(progress, 66);
        let (_, progress) = store.increment_processed(&job.id).await.unwrap().unwrap();
        assert_eq!(progress, 100);
    }

    #[tokio::test]
    async fn test_terminal_status_is_immutable() {
        let store = JobStore::new(test_db_pool().await);
        let job = Job::new(&spec("terminal"), 1);
        store.create_job(&job).await.unwrap();
        store
            .update_status(&job.id, JobStatus::Processing)
            .await
            .unwrap();
        assert!(store.mark_completed(&job.id).await.unwrap());

        // No transition may leave a terminal state.
        assert!(!store
            .update_status(&job.id, JobStatus::Processing)
            .await
            .unwrap());
        assert!(!store.mark_failed(&job.id).await.unwrap());
        assert!(store.increment_processed(&job.id).await.unwrap().is_none());

        let loaded = store.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Completed);
        assert_eq!(loaded.progress, 100);
    }

    #[tokio::test]
    async fn test_list_jobs_for_owner_filters_and_sorts() {
        let store = JobStore::new(test_db_pool().await);

        let mine_old = Job::new(&spec("first"), 1);
        let mut mine_new = Job::new(&spec("second"), 1);
        mine_new.created_at = mine_new.created_at + chrono::Duration::seconds(5);
        let mut theirs = Job::new(&spec("other"), 1);
        theirs.owner_id = "owner-2".to_string();

        store.create_job(&mine_old).await.unwrap();
        store.create_job(&mine_new).await.unwrap();
        store.create_job(&theirs).await.unwrap();

        let jobs = store.list_jobs_for_owner("owner-1").await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].name, "second");
        assert_eq!(jobs[1].name, "first");
    }

    #[tokio::test]
    async fn test_delete_job_cascades_results() {
        let pool = test_db_pool().await;
        let store = JobStore::new(pool.clone());
        let results = crate::store::ResultStore::new(pool);

        let job = Job::new(&spec("delete"), 2);
        store.create_job(&job).await.unwrap();
        store
            .update_status(&job.id, JobStatus::Processing)
            .await
            .unwrap();
        results
            .upsert_result(&job.id, "https://a.example", Some("x@a.example"))
            .await
            .unwrap();
        results
            .upsert_result(&job.id, "https://b.example", None)
            .await
            .unwrap();
        assert_eq!(results.count_results(&job.id).await.unwrap(), 2);

        assert!(store.delete_job(&job.id).await.unwrap());
        assert!(store.get_job(&job.id).await.unwrap().is_none());
        assert_eq!(results.count_results(&job.id).await.unwrap(), 0);
    }
}
