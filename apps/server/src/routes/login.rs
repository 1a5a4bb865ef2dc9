//! Login endpoint: block check, CAPTCHA gate, credential check, attempt log.

use actix_web::http::header;
use actix_web::{Either, HttpRequest, HttpResponse, post, web};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::auth::verify_password;
use crate::routes::origin_of;
use crate::state::AppState;

const GENERIC_FAILURE: &str = "Invalid credentials or verification failed";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub captcha_response: Option<String>,
}

fn agent_of(req: &HttpRequest) -> String {
    req.headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn blocked_response(remaining_minutes: i64) -> HttpResponse {
    HttpResponse::TooManyRequests().json(json!({
        "error": format!("Too many failed attempts. Try again in {remaining_minutes} minute(s)."),
        "remaining_minutes": remaining_minutes,
    }))
}

fn internal_error() -> HttpResponse {
    HttpResponse::InternalServerError().json(json!({ "error": "Internal error" }))
}

/// Record a failed attempt and answer with the same body whatever check failed.
async fn reject(state: &AppState, origin: &str, principal: &str, agent: &str) -> HttpResponse {
    if let Err(e) = state.guard.record_attempt(origin, principal, false, agent).await {
        error!(origin = %origin, error = %e, "Failed to record login attempt");
        return internal_error();
    }

    let decision = state.guard.evaluate(origin).await;
    if decision.blocked {
        return blocked_response(decision.remaining_minutes);
    }

    let remaining_attempts = (state.guard.policy().max_failures - decision.failure_count).max(0);
    HttpResponse::Unauthorized().json(json!({
        "error": GENERIC_FAILURE,
        "remaining_attempts": remaining_attempts,
    }))
}

/// Accepts a JSON or form-encoded body.
#[post("/login")]
pub async fn login_route(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: Either<web::Json<LoginRequest>, web::Form<LoginRequest>>,
) -> HttpResponse {
    let login = match body {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => form.into_inner(),
    };
    let origin = origin_of(&req);
    let agent = agent_of(&req);

    let decision = state.guard.evaluate(&origin).await;
    if decision.blocked {
        return blocked_response(decision.remaining_minutes);
    }

    if !state.captcha.verify(login.captcha_response.as_deref(), &origin).await {
        return reject(&state, &origin, &login.username, &agent).await;
    }

    let user = match state.store.find_user_by_username(&login.username).await {
        Ok(user) => user,
        Err(e) => {
            error!(error = %e, "Failed to load user");
            return internal_error();
        }
    };

    let verified = match user {
        Some(user) => {
            let password = login.password.clone();
            web::block(move || verify_password(&password, &user.password_hash))
                .await
                .unwrap_or(false)
        }
        None => false,
    };

    if !verified {
        return reject(&state, &origin, &login.username, &agent).await;
    }

    if let Err(e) = state.guard.record_attempt(&origin, &login.username, true, &agent).await {
        error!(origin = %origin, error = %e, "Failed to record login attempt");
        return internal_error();
    }

    info!(username = %login.username, origin = %origin, "Login succeeded");
    HttpResponse::Ok().json(json!({ "username": login.username }))
}
