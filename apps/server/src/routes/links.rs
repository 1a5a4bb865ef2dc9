use actix_web::{HttpResponse, get, web};
use tracing::error;

use crate::state::AppState;

/// Every link with its last observed status, in display order.
#[get("/api/links")]
pub async fn list_links_route(state: web::Data<AppState>) -> HttpResponse {
    match state.store.list_links().await {
        Ok(links) => HttpResponse::Ok().json(links),
        Err(e) => {
            error!(error = %e, "Failed to list links");
            HttpResponse::InternalServerError().json(serde_json::json!({ "error": "Internal error" }))
        }
    }
}
