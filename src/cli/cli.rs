use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::database::DbPool;
use crate::jobs::JobRunner;
use crate::models::CliApp;
use crate::scraper::SiteFetcher;
use crate::sheets::SheetSource;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Clone)]
pub enum MenuAction {
    NewExtractionJob,
    ShowJobs,
    ExportResults,
    ShowStats,
    StartApiServer,
    Exit,
}

impl std::fmt::Display for MenuAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MenuAction::NewExtractionJob => {
                write!(f, "🕷️  New extraction job: find contact emails for websites")
            }
            MenuAction::ShowJobs => write!(f, "📋 Show jobs and their results"),
            MenuAction::ExportResults => write!(f, "📤 Export job results to CSV"),
            MenuAction::ShowStats => write!(f, "📊 Show database statistics"),
            MenuAction::StartApiServer => write!(f, "🌐 Start the HTTP API server"),
            MenuAction::Exit => write!(f, "🚪 Exit"),
        }
    }
}

impl CliApp {
    pub async fn new(config: Config, db_pool: DbPool) -> Result<Self> {
        // Initialize the crawling stack
        let fetcher = SiteFetcher::new(&config.scraping)?;
        let sheets = SheetSource::new(
            config.scraping.request_timeout_seconds,
            &config.scraping.user_agent,
        )?;

        let runner = Arc::new(JobRunner::new(
            &config.scraping,
            db_pool.clone(),
            Arc::new(fetcher),
            sheets,
        ));

        info!(
            "Extraction engine ready (batches of {}, {}ms between batches)",
            config.scraping.batch_size, config.scraping.batch_delay_ms
        );

        Ok(Self {
            config,
            db_pool,
            runner,
        })
    }
}
