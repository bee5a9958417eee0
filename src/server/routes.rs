// src/server/routes.rs
// This file can contain additional route configurations if needed
// For now, all routes are defined in their respective API modules

pub mod health {
    use rocket::{get, serde::json::Json};
    use serde_json::{json, Value};

    #[get("/health")]
    pub async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "service": "email-scout-api"
        }))
    }

    #[get("/")]
    pub async fn index() -> Json<Value> {
        Json(json!({
            "name": "Email Scout API",
            "version": "0.1.0",
            "description": "API for submitting email extraction jobs and reading their results",
            "endpoints": {
                "health": "/api/health",
                "stats": "/api/stats",
                "jobs": "/api/jobs",
                "job": "/api/jobs/<id>",
                "results": "/api/jobs/<id>/results",
                "download": "/api/jobs/<id>/download"
            }
        }))
    }
}
