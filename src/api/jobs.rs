// src/api/jobs.rs
use crate::api::stats::ApiResponse;
use crate::models::{Job, JobSpec};
use crate::server::ServerState;
use crate::store::JobStore;
use rocket::serde::json::Json;
use rocket::{delete, get, post, State};

#[post("/jobs", data = "<spec>")]
pub async fn create_job(
    state: &State<ServerState>,
    spec: Json<JobSpec>,
) -> Json<ApiResponse<Job>> {
    match state.runner.submit(spec.into_inner()).await {
        Ok(job) => Json(ApiResponse::success(job)),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}

#[get("/jobs?<owner_id>")]
pub async fn list_jobs(
    state: &State<ServerState>,
    owner_id: String,
) -> Json<ApiResponse<Vec<Job>>> {
    let store = JobStore::new(state.db_pool.clone());
    match store.list_jobs_for_owner(&owner_id).await {
        Ok(jobs) => Json(ApiResponse::success(jobs)),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}

#[get("/jobs/<id>")]
pub async fn get_job(state: &State<ServerState>, id: String) -> Json<ApiResponse<Job>> {
    match state.runner.registry().get(&id).await {
        Ok(Some(job)) => Json(ApiResponse::success(job)),
        Ok(None) => Json(ApiResponse::error(format!("job {} not found", id))),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}

#[post("/jobs/<id>/cancel")]
pub async fn cancel_job(state: &State<ServerState>, id: String) -> Json<ApiResponse<String>> {
    if state.runner.registry().cancel(&id).await {
        Json(ApiResponse::success(format!(
            "cancellation requested for job {}",
            id
        )))
    } else {
        Json(ApiResponse::error(format!("job {} is not running", id)))
    }
}

#[delete("/jobs/<id>")]
pub async fn delete_job(state: &State<ServerState>, id: String) -> Json<ApiResponse<String>> {
    let registry = state.runner.registry();
    // Stop a live run first so it cannot keep writing rows.
    registry.cancel(&id).await;

    let store = JobStore::new(state.db_pool.clone());
    match store.delete_job(&id).await {
        Ok(true) => {
            registry.release(&id).await;
            Json(ApiResponse::success(format!("job {} deleted", id)))
        }
        Ok(false) => Json(ApiResponse::error(format!("job {} not found", id))),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}
