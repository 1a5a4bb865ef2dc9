use std::sync::Arc;

use navwatch::{BruteForceGuard, EventStore, LinkScheduler};

use crate::captcha::CaptchaVerifier;
use crate::ratelimit::RateLimiter;

/// Shared handles for every route, wrapped in `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStore>,
    pub guard: Arc<BruteForceGuard>,
    pub scheduler: Arc<LinkScheduler>,
    pub captcha: CaptchaVerifier,
    pub admin_token: String,
    /// Guards the on-demand status check
    pub status_limiter: Arc<RateLimiter>,
}
