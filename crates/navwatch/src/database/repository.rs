use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Row, params};

use super::models::{
    LinkStatus, NavLink, NewLoginAttempt, User, i64_to_timestamp, timestamp_to_i64,
};
use crate::error::StoreError;
use crate::monitoring::validation::validate_link_url;
use crate::pool::{LibsqlManager, LibsqlPool};

type Result<T> = std::result::Result<T, StoreError>;

const LINK_COLUMNS: &str = "id, label, url, order_index, last_checked_at, last_status_code, is_reachable, response_time_ms";

/// Storage consumed by the brute-force guard and the link health monitor
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append one login attempt
    async fn record_login_attempt(&self, attempt: &NewLoginAttempt<'_>) -> Result<i64>;

    /// Count failed attempts for `origin` observed strictly after `since`
    async fn count_failed_since(&self, origin: &str, since: DateTime<Utc>) -> Result<i64>;

    /// Timestamp of the most recent failed attempt for `origin`
    async fn latest_failure(&self, origin: &str) -> Result<Option<DateTime<Utc>>>;

    /// Full current link set
    async fn list_links(&self) -> Result<Vec<NavLink>>;

    /// Get a link by id
    async fn get_link(&self, id: i64) -> Result<Option<NavLink>>;

    /// Register a link; the URL must pass the http(s) scheme check
    async fn create_link(&self, label: &str, url: &str, order_index: i64) -> Result<i64>;

    /// Delete a link, returning the number of rows removed
    async fn delete_link(&self, id: i64) -> Result<u64>;

    /// Overwrite the four status fields of one link in a single statement.
    /// Returns the number of rows affected (zero when the link is gone).
    async fn update_link_status(&self, id: i64, status: &LinkStatus) -> Result<u64>;

    async fn count_users(&self) -> Result<i64>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<i64>;
}

/// LibSQL event store implementation
pub struct LibsqlEventStore {
    pool: LibsqlPool,
}

impl LibsqlEventStore {
    /// Create a new store from a pool
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    /// Get a connection from the pool
    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>> {
        Ok(self.pool.get().await?)
    }
}

fn link_from_row(row: &Row) -> Result<NavLink> {
    Ok(NavLink {
        id: row.get(0)?,
        label: row.get(1)?,
        url: row.get(2)?,
        order_index: row.get(3)?,
        last_checked_at: row.get::<Option<i64>>(4)?.map(i64_to_timestamp),
        last_status_code: row
            .get::<Option<i64>>(5)?
            .map(|code| {
                u16::try_from(code).map_err(|_| StoreError::Corrupt(format!("status code {code}")))
            })
            .transpose()?,
        is_reachable: row.get::<Option<i64>>(6)?.map(|v| v != 0),
        response_time_ms: row.get::<Option<i64>>(7)?.map(|v| v.max(0) as u64),
    })
}

#[async_trait]
impl EventStore for LibsqlEventStore {
    async fn record_login_attempt(&self, attempt: &NewLoginAttempt<'_>) -> Result<i64> {
        let conn = self.get_conn().await?;

        conn.execute(
            "INSERT INTO login_attempts (origin, principal, succeeded, observed_at, agent) VALUES (?, ?, ?, ?, ?)",
            params![
                attempt.origin,
                attempt.principal,
                if attempt.succeeded { 1 } else { 0 },
                timestamp_to_i64(attempt.observed_at),
                attempt.agent
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn count_failed_since(&self, origin: &str, since: DateTime<Utc>) -> Result<i64> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM login_attempts WHERE origin = ? AND succeeded = 0 AND observed_at > ?",
                params![origin, timestamp_to_i64(since)],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Ok(0),
        }
    }

    async fn latest_failure(&self, origin: &str) -> Result<Option<DateTime<Utc>>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT MAX(observed_at) FROM login_attempts WHERE origin = ? AND succeeded = 0",
                params![origin],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<Option<i64>>(0)?.map(i64_to_timestamp)),
            None => Ok(None),
        }
    }

    async fn list_links(&self) -> Result<Vec<NavLink>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(&format!("SELECT {LINK_COLUMNS} FROM nav_items ORDER BY order_index ASC, id ASC"), ())
            .await?;

        let mut links = Vec::new();
        while let Some(row) = rows.next().await? {
            links.push(link_from_row(&row)?);
        }

        Ok(links)
    }

    async fn get_link(&self, id: i64) -> Result<Option<NavLink>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(&format!("SELECT {LINK_COLUMNS} FROM nav_items WHERE id = ?"), params![id])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(link_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn create_link(&self, label: &str, url: &str, order_index: i64) -> Result<i64> {
        let validation = validate_link_url(url);
        if !validation.is_valid {
            return Err(StoreError::InvalidUrl(validation.error_message()));
        }

        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO nav_items (label, url, order_index) VALUES (?, ?, ?)",
            params![label, url.trim(), order_index],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn delete_link(&self, id: i64) -> Result<u64> {
        let conn = self.get_conn().await?;
        Ok(conn.execute("DELETE FROM nav_items WHERE id = ?", params![id]).await?)
    }

    async fn update_link_status(&self, id: i64, status: &LinkStatus) -> Result<u64> {
        let conn = self.get_conn().await?;

        let affected = conn
            .execute(
                "UPDATE nav_items SET last_checked_at = ?, last_status_code = ?, is_reachable = ?, response_time_ms = ? WHERE id = ?",
                params![
                    timestamp_to_i64(status.checked_at),
                    status.status_code.map(|v| v as i64),
                    if status.reachable { 1 } else { 0 },
                    status.response_time_ms as i64,
                    id
                ],
            )
            .await?;

        Ok(affected)
    }

    async fn count_users(&self) -> Result<i64> {
        let conn = self.get_conn().await?;
        let mut rows = conn.query("SELECT COUNT(*) FROM users", ()).await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?),
            None => Ok(0),
        }
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
                params![username],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(User {
                id: row.get(0)?,
                username: row.get(1)?,
                password_hash: row.get(2)?,
                created_at: i64_to_timestamp(row.get(3)?),
            })),
            None => Ok(None),
        }
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<i64> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)",
            params![username, password_hash, timestamp_to_i64(Utc::now())],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }
}
