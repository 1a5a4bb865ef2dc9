use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, post, web};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

use crate::ratelimit::RateLimitResult;
use crate::routes::origin_of;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CheckParams {
    #[serde(default)]
    pub background: bool,
}

/// Compare without short-circuiting on the first differing byte.
fn tokens_match(given: &str, expected: &str) -> bool {
    given.len() == expected.len()
        && given.bytes().zip(expected.bytes()).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Operator-triggered health cycle.
///
/// Runs the cycle on the request and returns its counts, or with
/// `?background=true` starts it and answers 202 immediately. Each origin may
/// call it a few times per minute, token or not.
#[post("/status/check")]
pub async fn status_check_route(
    req: HttpRequest,
    state: web::Data<AppState>,
    params: web::Query<CheckParams>,
) -> HttpResponse {
    if let RateLimitResult::Limited { retry_after } = state.status_limiter.check(&origin_of(&req)).await {
        let retry_secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
        return HttpResponse::TooManyRequests()
            .insert_header((header::RETRY_AFTER, retry_secs.to_string()))
            .json(json!({
                "error": "Too many status check requests, please try again later",
                "retry_after_seconds": retry_secs,
            }));
    }

    if state.admin_token.is_empty() {
        return HttpResponse::Forbidden().json(json!({ "error": "On-demand checks are disabled" }));
    }
    match bearer_token(&req) {
        Some(token) if tokens_match(token, &state.admin_token) => {}
        _ => {
            warn!("Rejected on-demand status check with a missing or wrong token");
            return HttpResponse::Unauthorized().json(json!({ "error": "Unauthorized" }));
        }
    }

    if params.background {
        let _ = state.scheduler.trigger_background();
        return HttpResponse::Accepted().json(json!({ "started": true }));
    }

    match state.scheduler.trigger_now().await {
        Ok(summary) => HttpResponse::Ok().json(summary),
        Err(e) => {
            error!(error = %e, "On-demand status check failed");
            HttpResponse::InternalServerError().json(json!({ "error": "Internal error" }))
        }
    }
}
