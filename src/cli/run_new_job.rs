use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use std::time::Duration;

use crate::models::{CliApp, JobSpec, JobStatus, Result};
use crate::store::ResultStore;

const CLI_OWNER: &str = "cli";

impl CliApp {
    pub async fn run_new_job(&self) -> Result<()> {
        println!("\n🕷️  New Extraction Job");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let name: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Job name")
            .default("contact discovery".to_string())
            .interact_text()?;

        let source_options = vec!["📋 Google Sheet column", "📝 Paste website URLs"];
        let source = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Where do the websites come from?")
            .items(&source_options)
            .interact()?;

        let spec = match source {
            0 => {
                let sheet_url: String = Input::with_theme(&ColorfulTheme::default())
                    .with_prompt("Google Sheets URL")
                    .interact_text()?;
                let column: String = Input::with_theme(&ColorfulTheme::default())
                    .with_prompt("Column holding the websites")
                    .default("website".to_string())
                    .interact_text()?;

                JobSpec {
                    owner_id: CLI_OWNER.to_string(),
                    name,
                    sheet_url: Some(sheet_url),
                    column_name: Some(column),
                    urls: Vec::new(),
                }
            }
            _ => {
                let mut urls = Vec::new();
                println!("💡 Enter one website per line; an empty line finishes the list");
                loop {
                    let url: String = Input::with_theme(&ColorfulTheme::default())
                        .with_prompt(format!("Website {} (empty to finish)", urls.len() + 1))
                        .allow_empty(true)
                        .interact_text()?;
                    if url.trim().is_empty() {
                        break;
                    }
                    urls.push(url);
                }

                JobSpec {
                    owner_id: CLI_OWNER.to_string(),
                    name,
                    sheet_url: None,
                    column_name: None,
                    urls,
                }
            }
        };

        if !Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Submit this job?")
            .default(true)
            .interact()?
        {
            println!("❌ Job discarded");
            return Ok(());
        }

        let job = self.runner.submit(spec).await?;
        println!("\n🚀 Job submitted: {} ({})", job.name, job.id);
        println!("📊 {} URLs queued", job.total_urls);

        if Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Watch progress here?")
            .default(true)
            .interact()?
        {
            self.watch_job(&job.id).await?;
        } else {
            println!("💡 Check back later via 'Show jobs and their results'");
        }

        Ok(())
    }

    /// Polls the registry until the job settles, printing progress lines.
    pub async fn watch_job(&self, job_id: &str) -> Result<()> {
        let registry = self.runner.registry();
        let interval = self.config.logging.poll_interval_ms.max(250);

        loop {
            let job = match registry.get(job_id).await? {
                Some(job) => job,
                None => {
                    println!("❌ Job {} no longer exists", job_id);
                    return Ok(());
                }
            };

            println!(
                "  [{:>3}%] {} - {}/{} URLs processed",
                job.progress, job.status, job.processed_urls, job.total_urls
            );

            if job.status.is_terminal() {
                if job.status == JobStatus::Completed {
                    println!("\n🎉 Job finished");
                } else {
                    println!("\n❌ Job failed (partial results are kept)");
                }

                let results = ResultStore::new(self.db_pool.clone());
                let total = results.count_results(job_id).await?;
                let with_email = results.count_results_with_email(job_id).await?;
                println!("📧 {} of {} websites yielded an address", with_email, total);
                return Ok(());
            }

            tokio::time::sleep(Duration::from_millis(interval)).await;
        }
    }
}
