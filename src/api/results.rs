// src/api/results.rs
use crate::api::stats::ApiResponse;
use crate::export::ResultExporter;
use crate::models::SiteResult;
use crate::server::ServerState;
use crate::store::{JobStore, ResultStore};
use rocket::http::ContentType;
use rocket::serde::json::Json;
use rocket::{get, State};
use serde::Serialize;

#[derive(Serialize)]
pub struct ResultsPage {
    pub results: Vec<SiteResult>,
    pub total: i64,
    pub with_email: i64,
    pub page: i64,
    pub per_page: i64,
}

#[get("/jobs/<id>/results?<page>&<per_page>")]
pub async fn list_results(
    state: &State<ServerState>,
    id: String,
    page: Option<i64>,
    per_page: Option<i64>,
) -> Json<ApiResponse<ResultsPage>> {
    let store = ResultStore::new(state.db_pool.clone());

    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(50).clamp(1, 1000);
    let offset = (page - 1) * per_page;

    let total = match store.count_results(&id).await {
        Ok(count) => count,
        Err(e) => return Json(ApiResponse::error(e.to_string())),
    };
    let with_email = match store.count_results_with_email(&id).await {
        Ok(count) => count,
        Err(e) => return Json(ApiResponse::error(e.to_string())),
    };

    match store.list_results_page(&id, per_page, offset).await {
        Ok(results) => Json(ApiResponse::success(ResultsPage {
            results,
            total,
            with_email,
            page,
            per_page,
        })),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}

/// CSV download of a job's full result set. 404s when the job is unknown.
#[get("/jobs/<id>/download")]
pub async fn download_results(
    state: &State<ServerState>,
    id: String,
) -> Option<(ContentType, String)> {
    let jobs = JobStore::new(state.db_pool.clone());
    jobs.get_job(&id).await.ok()??;

    let store = ResultStore::new(state.db_pool.clone());
    let results = store.list_results(&id).await.ok()?;

    Some((ContentType::CSV, ResultExporter::render_csv(&results)))
}
