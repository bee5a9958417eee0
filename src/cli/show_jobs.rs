use dialoguer::{theme::ColorfulTheme, Confirm, Select};

use crate::models::{CliApp, Result};
use crate::store::{JobStore, ResultStore};

impl CliApp {
    pub async fn show_jobs(&self) -> Result<()> {
        println!("\n📋 Recent Jobs");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let store = JobStore::new(self.db_pool.clone());
        let jobs = store.list_recent_jobs(20).await?;
        if jobs.is_empty() {
            println!("❌ No jobs yet");
            println!("💡 Start one via 'New extraction job'");
            return Ok(());
        }

        let mut items: Vec<String> = jobs
            .iter()
            .map(|job| {
                format!(
                    "[{:>3}%] {} - {} ({} URLs, {})",
                    job.progress,
                    job.status,
                    job.name,
                    job.total_urls,
                    job.created_at.format("%Y-%m-%d %H:%M")
                )
            })
            .collect();
        items.push("↩️  Back".to_string());

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Inspect a job")
            .items(&items)
            .interact()?;
        if selection >= jobs.len() {
            return Ok(());
        }

        let job = &jobs[selection];
        let results = ResultStore::new(self.db_pool.clone());
        let rows = results.list_results(&job.id).await?;

        println!("\n📧 Results for {} ({} rows):", job.name, rows.len());
        for row in rows.iter().take(25) {
            match &row.email {
                Some(email) => println!("  ✅ {} -> {}", row.website, email),
                None => println!("  ⬜ {} -> (none)", row.website),
            }
        }
        if rows.len() > 25 {
            println!("  ... and {} more", rows.len() - 25);
        }

        if !job.status.is_terminal() {
            let cancel = Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt("Cancel this running job?")
                .default(false)
                .interact()?;
            if cancel {
                if self.runner.registry().cancel(&job.id).await {
                    println!("🛑 Cancellation requested");
                } else {
                    println!("⚠️ Job is not cancellable from here");
                }
            }
        }

        Ok(())
    }
}
