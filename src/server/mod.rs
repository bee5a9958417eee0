// src/server/mod.rs
use crate::api::*;
use crate::config::Config;
use crate::database::DbPool;
use crate::jobs::JobRunner;
use crate::models::Result;
use rocket::{routes, Build, Rocket};
use std::sync::Arc;

pub mod routes;

pub struct ServerState {
    pub config: Config,
    pub db_pool: DbPool,
    pub runner: Arc<JobRunner>,
}

pub fn build_rocket(config: Config, db_pool: DbPool, runner: Arc<JobRunner>) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("address", config.server.address.clone()))
        .merge(("port", config.server.port));

    let state = ServerState {
        config,
        db_pool,
        runner,
    };

    rocket::custom(figment).manage(state).mount(
        "/api",
        routes![
            // Health and info endpoints
            routes::health::health_check,
            routes::health::index,
            // Job lifecycle endpoints
            create_job,
            list_jobs,
            get_job,
            cancel_job,
            delete_job,
            // Result endpoints
            list_results,
            download_results,
            // Stats endpoints
            get_stats,
        ],
    )
}

pub async fn run_server(config: Config, db_pool: DbPool, runner: Arc<JobRunner>) -> Result<()> {
    build_rocket(config, db_pool, runner).launch().await?;
    Ok(())
}
