// src/jobs/runner.rs
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::ScrapingConfig;
use crate::database::DbPool;
use crate::models::{Job, JobSpec, JobStatus, Result};
use crate::scraper::{normalize_website_url, EmailResolver};
use crate::sheets::SheetSource;
use crate::store::{JobRegistry, JobStore, ResultStore};

enum RunOutcome {
    Completed,
    Cancelled,
}

/// Drives submitted jobs through their lifecycle: resolves the URL list,
/// works it in small concurrent batches, persists every outcome the moment
/// it lands, and settles the job into a terminal status.
pub struct JobRunner {
    jobs: JobStore,
    results: ResultStore,
    registry: Arc<JobRegistry>,
    resolver: Arc<dyn EmailResolver>,
    sheets: SheetSource,
    batch_size: usize,
    batch_delay_ms: u64,
}

impl JobRunner {
    pub fn new(
        config: &ScrapingConfig,
        db_pool: DbPool,
        resolver: Arc<dyn EmailResolver>,
        sheets: SheetSource,
    ) -> Self {
        let jobs = JobStore::new(db_pool.clone());
        Self {
            registry: Arc::new(JobRegistry::new(jobs.clone())),
            jobs,
            results: ResultStore::new(db_pool),
            resolver,
            sheets,
            batch_size: config.batch_size.max(1),
            batch_delay_ms: config.batch_delay_ms,
        }
    }

    pub fn registry(&self) -> Arc<JobRegistry> {
        Arc::clone(&self.registry)
    }

    /// Creates the job record and detaches the run. Returns the pending job
    /// immediately; callers poll for progress.
    pub async fn submit(self: &Arc<Self>, spec: JobSpec) -> Result<Job> {
        let raw_urls = match &spec.sheet_url {
            Some(sheet_url) => {
                let column = spec.column_name.as_deref().unwrap_or("website");
                self.sheets.fetch_website_urls(sheet_url, column).await?
            }
            None => spec.urls.clone(),
        };

        let urls = prepare_url_list(&raw_urls)?;
        let job = Job::new(&spec, urls.len() as i64);
        self.jobs.create_job(&job).await?;
        let cancel = self.registry.track(&job).await;

        info!(
            "🚀 Job {} submitted: {} URLs in batches of {}",
            job.id,
            urls.len(),
            self.batch_size
        );

        let runner = Arc::clone(self);
        let spawned = job.clone();
        tokio::spawn(async move {
            runner.run_job(spawned, urls, cancel).await;
        });

        Ok(job)
    }

    async fn run_job(self: Arc<Self>, job: Job, urls: Vec<String>, cancel: watch::Receiver<bool>) {
        let job_id = job.id.clone();

        match self.process_batches(&job_id, &urls, cancel).await {
            Ok(RunOutcome::Completed) => {
                if let Err(e) = self.jobs.mark_completed(&job_id).await {
                    error!("💥 Failed to complete job {}: {}", job_id, e);
                } else {
                    info!("✅ Job {} completed ({} URLs)", job_id, urls.len());
                }
            }
            Ok(RunOutcome::Cancelled) => {
                if let Err(e) = self.jobs.mark_failed(&job_id).await {
                    error!("💥 Failed to settle cancelled job {}: {}", job_id, e);
                }
                warn!("🛑 Job {} stopped by cancellation, partial results kept", job_id);
            }
            Err(e) => {
                error!("💥 Job {} aborted: {}", job_id, e);
                if let Err(e) = self.jobs.mark_failed(&job_id).await {
                    error!("💥 Failed to mark job {} failed: {}", job_id, e);
                }
            }
        }

        self.registry.release(&job_id).await;
    }

    async fn process_batches(
        self: &Arc<Self>,
        job_id: &str,
        urls: &[String],
        cancel: watch::Receiver<bool>,
    ) -> Result<RunOutcome> {
        if !self.jobs.update_status(job_id, JobStatus::Processing).await? {
            return Err(format!("job {} is not in a startable state", job_id).into());
        }
        self.registry.sync_job(job_id).await?;

        for (batch_index, batch) in urls.chunks(self.batch_size).enumerate() {
            if *cancel.borrow() {
                return Ok(RunOutcome::Cancelled);
            }

            if batch_index > 0 && self.batch_delay_ms > 0 {
                let jitter = fastrand::u64(0..self.batch_delay_ms / 4 + 1);
                tokio::time::sleep(Duration::from_millis(self.batch_delay_ms + jitter)).await;
            }

            debug!(
                "📦 Job {}: batch {} ({} URLs)",
                job_id,
                batch_index + 1,
                batch.len()
            );

            let mut handles = Vec::with_capacity(batch.len());
            for url in batch {
                let runner = Arc::clone(self);
                let task_job = job_id.to_string();
                let task_url = url.clone();
                let task_cancel = cancel.clone();
                handles.push(tokio::spawn(async move {
                    runner.process_url(&task_job, &task_url, task_cancel).await
                }));
            }

            // The whole batch settles before the next one starts.
            for handle in handles {
                match handle.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => return Err(e),
                    Err(e) => return Err(Box::new(e)),
                }
            }
        }

        if *cancel.borrow() {
            return Ok(RunOutcome::Cancelled);
        }
        Ok(RunOutcome::Completed)
    }

    /// Resolves one website and persists the outcome. A site that yields
    /// nothing still writes a row with no email; only storage faults bubble
    /// up and abort the job.
    async fn process_url(
        &self,
        job_id: &str,
        url: &str,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<()> {
        if *cancel.borrow() {
            return Ok(());
        }

        let email = tokio::select! {
            _ = cancel.changed() => {
                debug!("🛑 Abandoning in-flight resolution of {} for job {}", url, job_id);
                return Ok(());
            }
            email = self.resolver.resolve_email(url) => email,
        };

        match &email {
            Some(email) => info!("📧 {} -> {}", url, email),
            None => info!("📭 {} -> no address found", url),
        }

        let written = self
            .results
            .upsert_result(job_id, url, email.as_deref())
            .await?;
        if !written {
            debug!("⏭️ Job {} already settled, dropping result for {}", job_id, url);
            return Ok(());
        }

        if let Some((processed, progress)) = self.jobs.increment_processed(job_id).await? {
            debug!("📊 Job {}: {} processed ({}%)", job_id, processed, progress);
            self.registry.sync_job(job_id).await?;
        }

        Ok(())
    }
}

/// Validates and normalizes a raw URL list. Order is preserved, duplicates
/// collapse to their first occurrence, and an empty outcome keeps the job
/// from being created at all.
pub fn prepare_url_list(raw: &[String]) -> Result<Vec<String>> {
    let mut urls = Vec::new();
    let mut seen = HashSet::new();

    for entry in raw {
        match normalize_website_url(entry) {
            Some(url) => {
                if seen.insert(url.clone()) {
                    urls.push(url);
                }
            }
            None => {
                if !entry.trim().is_empty() {
                    warn!("⏭️ Dropping malformed website entry: {}", entry);
                }
            }
        }
    }

    if urls.is_empty() {
        return Err("no usable website URLs in the request".into());
    }
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_db_pool;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct MockResolver {
        emails: HashMap<String, String>,
        delay_ms: u64,
    }

    impl MockResolver {
        fn new(emails: HashMap<String, String>) -> Self {
            Self { emails, delay_ms: 0 }
        }

        fn slow(emails: HashMap<String, String>, delay_ms: u64) -> Self {
            Self { emails, delay_ms }
        }
    }

    #[async_trait]
    impl EmailResolver for MockResolver {
        async fn resolve_email(&self, url: &str) -> Option<String> {
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            self.emails.get(url).cloned()
        }
    }

    fn test_config(batch_size: usize, batch_delay_ms: u64) -> ScrapingConfig {
        ScrapingConfig {
            request_timeout_seconds: 1,
            user_agent: "test-agent".to_string(),
            batch_size,
            batch_delay_ms,
            max_scan_bytes: 4096,
        }
    }

    async fn build_runner(
        pool: DbPool,
        resolver: MockResolver,
        batch_size: usize,
        batch_delay_ms: u64,
    ) -> Arc<JobRunner> {
        let config = test_config(batch_size, batch_delay_ms);
        let sheets = SheetSource::new(1, "test-agent").unwrap();
        Arc::new(JobRunner::new(
            &config,
            pool,
            Arc::new(resolver),
            sheets,
        ))
    }

    fn url_spec(name: &str, urls: Vec<String>) -> JobSpec {
        JobSpec {
            owner_id: "tester".to_string(),
            name: name.to_string(),
            sheet_url: None,
            column_name: None,
            urls,
        }
    }

    async fn wait_terminal(store: &JobStore, job_id: &str) -> Job {
        for _ in 0..250 {
            if let Some(job) = store.get_job(job_id).await.unwrap() {
                if job.status.is_terminal() {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("job never reached a terminal status");
    }

    #[tokio::test]
    async fn test_full_run_counts_misses_as_processed() {
        let pool = test_db_pool().await;
        let urls: Vec<String> = (0..10).map(|i| format!("https://site{}.com", i)).collect();

        // 7 sites resolve, 3 do not.
        let mut emails = HashMap::new();
        for (i, url) in urls.iter().enumerate().take(7) {
            emails.insert(url.clone(), format!("info@site{}.com", i));
        }

        let runner = build_runner(pool.clone(), MockResolver::new(emails), 4, 0).await;
        let job = runner.submit(url_spec("bulk", urls.clone())).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.total_urls, 10);

        let store = JobStore::new(pool.clone());
        let done = wait_terminal(&store, &job.id).await;
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.processed_urls, 10);
        assert_eq!(done.progress, 100);

        let results = ResultStore::new(pool);
        assert_eq!(results.count_results(&job.id).await.unwrap(), 10);
        assert_eq!(results.count_results_with_email(&job.id).await.unwrap(), 7);

        let rows = results.list_results(&job.id).await.unwrap();
        let miss = rows.iter().find(|r| r.website == "https://site9.com").unwrap();
        assert_eq!(miss.email, None);
    }

    #[tokio::test]
    async fn test_resolution_failures_never_fail_the_job() {
        let pool = test_db_pool().await;
        let urls = vec![
            "https://dead-a.com".to_string(),
            "https://dead-b.com".to_string(),
        ];

        let runner = build_runner(pool.clone(), MockResolver::new(HashMap::new()), 3, 0).await;
        let job = runner.submit(url_spec("misses", urls)).await.unwrap();

        let store = JobStore::new(pool.clone());
        let done = wait_terminal(&store, &job.id).await;
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.progress, 100);

        let rows = ResultStore::new(pool).list_results(&job.id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.email.is_none()));
    }

    #[tokio::test]
    async fn test_cancellation_stops_remaining_batches() {
        let pool = test_db_pool().await;
        let urls: Vec<String> = (0..6).map(|i| format!("https://slow{}.com", i)).collect();
        let mut emails = HashMap::new();
        for url in &urls {
            emails.insert(url.clone(), "info@slow.com".to_string());
        }

        let runner = build_runner(pool.clone(), MockResolver::slow(emails, 80), 1, 40).await;
        let job = runner.submit(url_spec("cancelme", urls)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(runner.registry().cancel(&job.id).await);

        let store = JobStore::new(pool.clone());
        let done = wait_terminal(&store, &job.id).await;
        assert_eq!(done.status, JobStatus::Failed);
        assert!(done.processed_urls < 6);

        // Whatever landed before the stop is kept.
        let kept = ResultStore::new(pool).count_results(&job.id).await.unwrap();
        assert_eq!(kept, done.processed_urls);
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_url_lists() {
        let pool = test_db_pool().await;
        let runner = build_runner(pool.clone(), MockResolver::new(HashMap::new()), 3, 0).await;

        let result = runner.submit(url_spec("empty", vec![])).await;
        assert!(result.is_err());

        let result = runner
            .submit(url_spec("junk", vec!["   ".to_string(), "not a url".to_string()]))
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_prepare_url_list_normalizes_and_dedupes() {
        let raw = vec![
            "acme.com".to_string(),
            "https://acme.com".to_string(),
            "beta.org".to_string(),
            "".to_string(),
        ];
        let urls = prepare_url_list(&raw).unwrap();
        assert_eq!(urls, vec!["https://acme.com", "https://beta.org"]);
    }
}
