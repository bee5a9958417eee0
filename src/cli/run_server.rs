use std::sync::Arc;

use crate::models::{CliApp, Result};
use crate::server::run_server;

impl CliApp {
    pub async fn run_api_server(&self) -> Result<()> {
        println!(
            "\n🌐 Starting API server on {}:{}",
            self.config.server.address, self.config.server.port
        );
        println!("💡 Ctrl+C stops the whole application");

        run_server(
            self.config.clone(),
            self.db_pool.clone(),
            Arc::clone(&self.runner),
        )
        .await
    }
}
