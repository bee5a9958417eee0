// src/api/stats.rs
use crate::database::{get_database_stats, JobSummary};
use crate::server::ServerState;
use rocket::{get, serde::json::Json, State};
use serde::Serialize;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Serialize)]
pub struct StatsOverview {
    pub total_jobs: i64,
    pub active_jobs: i64,
    pub completed_jobs: i64,
    pub failed_jobs: i64,
    pub total_results: i64,
    pub results_with_email: i64,
    pub email_hit_rate: f64,
    pub recent_jobs: Vec<JobSummary>,
}

#[get("/stats")]
pub async fn get_stats(state: &State<ServerState>) -> Json<ApiResponse<StatsOverview>> {
    match get_database_stats(&state.db_pool).await {
        Ok(stats) => {
            let overview = StatsOverview {
                total_jobs: stats.total_jobs,
                active_jobs: stats.active_jobs,
                completed_jobs: stats.completed_jobs,
                failed_jobs: stats.failed_jobs,
                total_results: stats.total_results,
                results_with_email: stats.results_with_email,
                email_hit_rate: stats.email_hit_rate,
                recent_jobs: stats.recent_jobs,
            };

            Json(ApiResponse::success(overview))
        }
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}
