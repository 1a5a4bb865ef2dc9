use thiserror::Error;

/// Errors raised by the event store.
///
/// The guard propagates these to its caller unchanged; the monitor logs them
/// per link and keeps going.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] libsql::Error),
    #[error("connection pool error: {0}")]
    Pool(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("login window of {0} minutes is out of range")]
    WindowOutOfRange(i64),
}

impl From<deadpool::managed::PoolError<libsql::Error>> for StoreError {
    fn from(err: deadpool::managed::PoolError<libsql::Error>) -> Self {
        match err {
            deadpool::managed::PoolError::Backend(e) => StoreError::Database(e),
            other => StoreError::Pool(other.to_string()),
        }
    }
}
