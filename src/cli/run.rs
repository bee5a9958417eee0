use dialoguer::{theme::ColorfulTheme, Select};

use crate::{
    cli::cli::MenuAction,
    models::{CliApp, Result},
};
use tracing::error;

impl CliApp {
    pub async fn run(&self) -> Result<()> {
        println!("\n🚀 Welcome to Email Scout!");
        println!("═══════════════════════════════════════");

        // Show initial stats
        self.show_database_stats().await?;

        loop {
            let actions = vec![
                MenuAction::NewExtractionJob,
                MenuAction::ShowJobs,
                MenuAction::ExportResults,
                MenuAction::ShowStats,
                MenuAction::StartApiServer,
                MenuAction::Exit,
            ];

            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("\nSelect an action")
                .default(0)
                .items(&actions)
                .interact()?;

            match &actions[selection] {
                MenuAction::NewExtractionJob => {
                    if let Err(e) = self.run_new_job().await {
                        error!("Extraction job failed: {}", e);
                    }
                }
                MenuAction::ShowJobs => {
                    if let Err(e) = self.show_jobs().await {
                        error!("Failed to show jobs: {}", e);
                    }
                }
                MenuAction::ExportResults => {
                    if let Err(e) = self.run_export_results().await {
                        error!("Result export failed: {}", e);
                    }
                }
                MenuAction::ShowStats => {
                    if let Err(e) = self.show_database_stats().await {
                        error!("Failed to show stats: {}", e);
                    }
                }
                MenuAction::StartApiServer => {
                    if let Err(e) = self.run_api_server().await {
                        error!("API server failed: {}", e);
                    }
                }
                MenuAction::Exit => {
                    println!("\n👋 Thanks for using Email Scout!");
                    break;
                }
            }
        }

        Ok(())
    }
}
