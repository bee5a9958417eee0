use dialoguer::{theme::ColorfulTheme, Select};

use crate::export::ResultExporter;
use crate::models::{CliApp, Result};
use crate::store::{JobStore, ResultStore};

impl CliApp {
    pub async fn run_export_results(&self) -> Result<()> {
        println!("\n📤 Export Job Results");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let store = JobStore::new(self.db_pool.clone());
        let jobs = store.list_recent_jobs(20).await?;
        if jobs.is_empty() {
            println!("❌ No jobs to export");
            return Ok(());
        }

        let items: Vec<String> = jobs
            .iter()
            .map(|job| format!("{} - {} ({}%)", job.name, job.status, job.progress))
            .collect();
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Which job?")
            .items(&items)
            .interact()?;
        let job = &jobs[selection];

        let results = ResultStore::new(self.db_pool.clone())
            .list_results(&job.id)
            .await?;
        if results.is_empty() {
            println!("❌ No results recorded for this job yet");
            return Ok(());
        }

        let exporter = ResultExporter::new(&self.config.output.directory);
        let filename = exporter.export_to_file(job, &results).await?;
        println!("✅ Exported {} rows to {}", results.len(), filename);

        Ok(())
    }
}
