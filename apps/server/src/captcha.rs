//! Human-verification gate in front of the login guard.
//!
//! The verifier only answers pass or fail. Callers fold a failure into a
//! failed login attempt, so the response never reveals which check rejected it.

use std::time::Duration;

use navwatch::config::CaptchaSettings;
use serde::Deserialize;
use tracing::{debug, warn};

const RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";
const TURNSTILE_VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptchaProvider {
    Recaptcha,
    Turnstile,
}

impl CaptchaProvider {
    fn from_name(name: &str) -> Self {
        match name {
            "turnstile" => Self::Turnstile,
            _ => Self::Recaptcha,
        }
    }

    fn verify_url(self) -> &'static str {
        match self {
            Self::Recaptcha => RECAPTCHA_VERIFY_URL,
            Self::Turnstile => TURNSTILE_VERIFY_URL,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

#[derive(Clone)]
pub struct CaptchaVerifier {
    enabled: bool,
    provider: CaptchaProvider,
    secret: String,
    endpoint: String,
    client: reqwest::Client,
}

impl CaptchaVerifier {
    pub fn from_settings(settings: &CaptchaSettings) -> anyhow::Result<Self> {
        let provider = CaptchaProvider::from_name(&settings.provider);
        let secret = match provider {
            CaptchaProvider::Recaptcha => settings.recaptcha_secret_key.clone(),
            CaptchaProvider::Turnstile => settings.turnstile_secret_key.clone(),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.verify_timeout_ms))
            .build()?;

        Ok(Self {
            enabled: settings.enabled,
            provider,
            secret,
            endpoint: provider.verify_url().to_string(),
            client,
        })
    }

    /// A verifier that lets every request through.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            provider: CaptchaProvider::Recaptcha,
            secret: String::new(),
            endpoint: RECAPTCHA_VERIFY_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point verification at another siteverify-compatible endpoint.
    #[cfg(test)]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn provider(&self) -> CaptchaProvider {
        self.provider
    }

    /// Verify a client token. Any transport or decoding problem counts as a failure.
    pub async fn verify(&self, token: Option<&str>, remote_ip: &str) -> bool {
        if !self.enabled {
            return true;
        }

        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            debug!("Captcha token missing");
            return false;
        };
        if self.secret.is_empty() {
            warn!(provider = ?self.provider, "Captcha enabled but no secret key configured");
            return false;
        }

        let form = [("secret", self.secret.as_str()), ("response", token), ("remoteip", remote_ip)];
        let response = match self.client.post(&self.endpoint).form(&form).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(provider = ?self.provider, error = %e, "Captcha verification request failed");
                return false;
            }
        };

        match response.json::<SiteVerifyResponse>().await {
            Ok(body) => {
                if !body.success {
                    debug!(errors = ?body.error_codes, "Captcha rejected");
                }
                body.success
            }
            Err(e) => {
                warn!(provider = ?self.provider, error = %e, "Captcha verification response unreadable");
                false
            }
        }
    }
}
