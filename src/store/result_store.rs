// src/store/result_store.rs
use chrono::{DateTime, Utc};
use rusqlite::params;
use tracing::debug;

use crate::database::DbPool;
use crate::models::{Result, SiteResult};

const RESULT_COLUMNS: &str = "id, job_id, website, email, created_at, updated_at";

/// Persistence API for per-website results. The (job_id, website) pair is
/// unique, so re-processing a URL overwrites its earlier row instead of
/// accumulating duplicates.
#[derive(Clone)]
pub struct ResultStore {
    db_pool: DbPool,
}

impl ResultStore {
    pub fn new(db_pool: DbPool) -> Self {
        Self { db_pool }
    }

    /// Returns false when the owning job is missing or already settled,
    /// in which case nothing was written.
    pub async fn upsert_result(
        &self,
        job_id: &str,
        website: &str,
        email: Option<&str>,
    ) -> Result<bool> {
        debug!(
            "💾 upsert_result() - Job {}: {} -> {}",
            job_id,
            website,
            email.unwrap_or("(none)")
        );

        let conn = self.db_pool.get().await?;
        let now = Utc::now().to_rfc3339();

        match conn.execute(
            r#"
            INSERT INTO results (job_id, website, email, created_at, updated_at)
            SELECT ?1, ?2, ?3, ?4, ?4
            WHERE EXISTS (SELECT 1 FROM jobs WHERE id = ?1 AND status = 'processing')
            ON CONFLICT (job_id, website) DO UPDATE SET
                email = excluded.email,
                updated_at = excluded.updated_at
            "#,
            params![job_id, website, email, now],
        ) {
            Ok(written) => Ok(written > 0),
            Err(e) => Err(Box::new(e)),
        }
    }

    pub async fn list_results(&self, job_id: &str) -> Result<Vec<SiteResult>> {
        let conn = self.db_pool.get().await?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM results WHERE job_id = ? ORDER BY id",
            RESULT_COLUMNS
        ))?;
        let result_iter = stmt.query_map([job_id], result_from_row)?;

        let mut results = Vec::new();
        for result in result_iter {
            results.push(result?);
        }
        Ok(results)
    }

    pub async fn list_results_page(
        &self,
        job_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SiteResult>> {
        let conn = self.db_pool.get().await?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM results WHERE job_id = ? ORDER BY id LIMIT ? OFFSET ?",
            RESULT_COLUMNS
        ))?;
        let result_iter = stmt.query_map(params![job_id, limit, offset], result_from_row)?;

        let mut results = Vec::new();
        for result in result_iter {
            results.push(result?);
        }
        Ok(results)
    }

    pub async fn count_results(&self, job_id: &str) -> Result<i64> {
        let conn = self.db_pool.get().await?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM results WHERE job_id = ?1",
            [job_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub async fn count_results_with_email(&self, job_id: &str) -> Result<i64> {
        let conn = self.db_pool.get().await?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM results WHERE job_id = ?1 AND email IS NOT NULL AND email != ''",
            [job_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn result_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SiteResult> {
    let email = match row.get::<_, Option<String>>(3) {
        Ok(Some(s)) if !s.is_empty() => Some(s),
        _ => None,
    };

    let created_at_str: String = row.get(4)?;
    let updated_at_str: String = row.get(5)?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|_| {
            rusqlite::Error::InvalidColumnType(
                4,
                created_at_str.clone(),
                rusqlite::types::Type::Text,
            )
        })?
        .with_timezone(&Utc);
    let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
        .map_err(|_| {
            rusqlite::Error::InvalidColumnType(
                5,
                updated_at_str.clone(),
                rusqlite::types::Type::Text,
            )
        })?
        .with_timezone(&Utc);

    Ok(SiteResult {
        id: row.get(0)?,
        job_id: row.get(1)?,
        website: row.get(2)?,
        email,
        created_at,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_db_pool;
    use crate::models::{Job, JobSpec, JobStatus};
    use crate::store::JobStore;

    fn spec(name: &str) -> JobSpec {
        JobSpec {
            owner_id: "owner-1".to_string(),
            name: name.to_string(),
            sheet_url: None,
            column_name: None,
            urls: Vec::new(),
        }
    }

    async fn processing_job(jobs: &JobStore, name: &str, total_urls: i64) -> String {
        let job = Job::new(&spec(name), total_urls);
        jobs.create_job(&job).await.unwrap();
        jobs.update_status(&job.id, JobStatus::Processing)
            .await
            .unwrap();
        job.id
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_row_per_website() {
        let pool = test_db_pool().await;
        let jobs = JobStore::new(pool.clone());
        let store = ResultStore::new(pool);
        let job_id = processing_job(&jobs, "dedup", 1).await;

        assert!(store
            .upsert_result(&job_id, "https://acme.com", None)
            .await
            .unwrap());
        assert!(store
            .upsert_result(&job_id, "https://acme.com", Some("info@acme.com"))
            .await
            .unwrap());

        let results = store.list_results(&job_id).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].website, "https://acme.com");
        assert_eq!(results[0].email.as_deref(), Some("info@acme.com"));
    }

    #[tokio::test]
    async fn test_upsert_overwrites_with_null() {
        let pool = test_db_pool().await;
        let jobs = JobStore::new(pool.clone());
        let store = ResultStore::new(pool);
        let job_id = processing_job(&jobs, "overwrite", 1).await;

        store
            .upsert_result(&job_id, "https://acme.com", Some("info@acme.com"))
            .await
            .unwrap();
        store
            .upsert_result(&job_id, "https://acme.com", None)
            .await
            .unwrap();

        let results = store.list_results(&job_id).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].email, None);
    }

    #[tokio::test]
    async fn test_same_website_under_two_jobs() {
        let pool = test_db_pool().await;
        let jobs = JobStore::new(pool.clone());
        let store = ResultStore::new(pool);
        let first = processing_job(&jobs, "first", 1).await;
        let second = processing_job(&jobs, "second", 1).await;

        store
            .upsert_result(&first, "https://acme.com", Some("info@acme.com"))
            .await
            .unwrap();
        store
            .upsert_result(&second, "https://acme.com", None)
            .await
            .unwrap();

        assert_eq!(store.count_results(&first).await.unwrap(), 1);
        assert_eq!(store.count_results(&second).await.unwrap(), 1);
        assert_eq!(store.count_results_with_email(&first).await.unwrap(), 1);
        assert_eq!(store.count_results_with_email(&second).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_pagination_preserves_insertion_order() {
        let pool = test_db_pool().await;
        let jobs = JobStore::new(pool.clone());
        let store = ResultStore::new(pool);
        let job_id = processing_job(&jobs, "pages", 5).await;

        for i in 0..5 {
            store
                .upsert_result(&job_id, &format!("https://site{}.example", i), None)
                .await
                .unwrap();
        }

        let page = store.list_results_page(&job_id, 2, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].website, "https://site2.example");
        assert_eq!(page[1].website, "https://site3.example");
    }

    #[tokio::test]
    async fn test_upsert_refused_once_job_is_terminal() {
        let pool = test_db_pool().await;
        let jobs = JobStore::new(pool.clone());
        let store = ResultStore::new(pool);
        let job_id = processing_job(&jobs, "settled", 2).await;

        assert!(store
            .upsert_result(&job_id, "https://acme.com", Some("info@acme.com"))
            .await
            .unwrap());

        jobs.mark_failed(&job_id).await.unwrap();

        assert!(!store
            .upsert_result(&job_id, "https://late.example", Some("late@late.example"))
            .await
            .unwrap());
        assert!(!store
            .upsert_result(&job_id, "https://acme.com", None)
            .await
            .unwrap());

        let results = store.list_results(&job_id).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].website, "https://acme.com");
        assert_eq!(results[0].email.as_deref(), Some("info@acme.com"));
    }

    #[tokio::test]
    async fn test_upsert_cannot_resurrect_deleted_job() {
        let pool = test_db_pool().await;
        let jobs = JobStore::new(pool.clone());
        let store = ResultStore::new(pool);
        let job_id = processing_job(&jobs, "gone", 1).await;

        store
            .upsert_result(&job_id, "https://acme.com", Some("info@acme.com"))
            .await
            .unwrap();
        assert!(jobs.delete_job(&job_id).await.unwrap());

        assert!(!store
            .upsert_result(&job_id, "https://acme.com", Some("info@acme.com"))
            .await
            .unwrap());
        assert_eq!(store.count_results(&job_id).await.unwrap(), 0);
    }
}
