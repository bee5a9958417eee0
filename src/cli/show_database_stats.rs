use crate::{database::get_database_stats, models::CliApp};
use tracing::{debug, error};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

impl CliApp {
    pub async fn show_database_stats(&self) -> Result<()> {
        debug!("📊 show_database_stats() - Starting...");

        println!("\n📊 Database Statistics");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let stats = match get_database_stats(&self.db_pool).await {
            Ok(stats) => stats,
            Err(e) => {
                error!("💥 get_database_stats failed: {}", e);

                if let Some(rusqlite_err) = e.downcast_ref::<rusqlite::Error>() {
                    error!("🔥 Specific rusqlite error: {:?}", rusqlite_err);
                }

                return Err(e);
            }
        };

        println!("📦 Total jobs: {}", stats.total_jobs);
        println!("⏳ Active jobs: {}", stats.active_jobs);
        println!("✅ Completed jobs: {}", stats.completed_jobs);
        println!("❌ Failed jobs: {}", stats.failed_jobs);
        println!("🌐 Websites processed: {}", stats.total_results);
        println!("📧 Addresses found: {}", stats.results_with_email);

        if stats.total_results > 0 {
            println!("📈 Hit rate: {:.1}%", stats.email_hit_rate);
        }

        if !stats.recent_jobs.is_empty() {
            println!("\n📋 Recent jobs:");
            for job in &stats.recent_jobs {
                let created = job
                    .created_at
                    .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
                    .unwrap_or_else(|| "unknown".to_string());

                println!(
                    "  • {} [{}] {}% of {} URLs (created: {})",
                    job.name, job.status, job.progress, job.total_urls, created
                );
            }
        }

        debug!("✅ show_database_stats() completed successfully");
        Ok(())
    }
}
