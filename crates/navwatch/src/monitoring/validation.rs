//! Scheme check applied to link URLs before they are stored or probed.

use url::Url;

/// Validation results with specific error messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self { is_valid: true, error: None }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self { is_valid: false, error: Some(msg.into()) }
    }

    pub fn error_message(&self) -> String {
        self.error.clone().unwrap_or_else(|| "Validation failed".to_string())
    }
}

/// Case-insensitive `http://` or `https://` prefix.
pub fn has_http_scheme(target: &str) -> bool {
    let lower = target.get(..8).unwrap_or(target).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Validate a link URL: absolute http(s) with a host.
pub fn validate_link_url(target: &str) -> ValidationResult {
    let target = target.trim();
    if target.is_empty() {
        return ValidationResult::err("URL cannot be empty");
    }

    if !has_http_scheme(target) {
        return ValidationResult::err("URL must start with http:// or https://");
    }

    match Url::parse(target) {
        Ok(url) if url.host_str().is_some_and(|host| !host.is_empty()) => ValidationResult::ok(),
        Ok(_) => ValidationResult::err("URL must have a valid host"),
        Err(e) => ValidationResult::err(format!("Invalid URL: {e}")),
    }
}
