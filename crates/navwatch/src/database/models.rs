use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Convert a timestamp to the stored representation (Unix epoch milliseconds)
pub fn timestamp_to_i64(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

/// Convert a stored Unix epoch milliseconds value back to a timestamp
pub fn i64_to_timestamp(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

/// One recorded login attempt. Rows are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAttempt {
    pub id: i64,
    /// Network address of the requester, compared by exact equality
    pub origin: String,
    /// Attempted username, which may not belong to any account
    pub principal: String,
    pub succeeded: bool,
    pub observed_at: DateTime<Utc>,
    /// Client descriptor, informational only
    pub agent: String,
}

/// Insertable form of [`LoginAttempt`]
#[derive(Debug, Clone, Copy)]
pub struct NewLoginAttempt<'a> {
    pub origin: &'a str,
    pub principal: &'a str,
    pub succeeded: bool,
    pub observed_at: DateTime<Utc>,
    pub agent: &'a str,
}

/// A registered navigation link together with its latest health observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink {
    pub id: i64,
    pub label: String,
    pub url: String,
    pub order_index: i64,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_status_code: Option<u16>,
    pub is_reachable: Option<bool>,
    pub response_time_ms: Option<u64>,
}

/// The four status fields written by the monitor in a single update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkStatus {
    pub checked_at: DateTime<Utc>,
    pub status_code: Option<u16>,
    pub reachable: bool,
    pub response_time_ms: u64,
}

/// Administrator account consulted by the login handler
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// PHC-formatted password hash
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_conversion_keeps_millis() {
        let time = i64_to_timestamp(1_700_000_123_456);
        assert_eq!(timestamp_to_i64(time), 1_700_000_123_456);
    }
}
