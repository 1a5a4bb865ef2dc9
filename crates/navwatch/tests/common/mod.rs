//! Shared fixtures: a migrated temporary store and local HTTP endpoints.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use navwatch::database::models::{LoginAttempt, i64_to_timestamp};
use navwatch::pool::open_pool;
use navwatch::{HttpProber, LibsqlEventStore, initialize_database};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const DB_FILE: &str = "navwatch-test.db";

/// Create a store backed by a fresh database file inside a temp dir.
pub async fn temp_store() -> anyhow::Result<(TempDir, Arc<LibsqlEventStore>)> {
    let dir = tempfile::tempdir()?;
    let pool = open_pool(dir.path().join(DB_FILE), 4).await?;

    let conn = pool.get().await.map_err(|e| anyhow::anyhow!("{e}"))?;
    initialize_database(&conn).await?;
    drop(conn);

    Ok((dir, Arc::new(LibsqlEventStore::new_from_pool(pool))))
}

/// Attempts stored for `origin`, newest first, read straight from the database file.
pub async fn stored_attempts(dir: &TempDir, origin: &str) -> anyhow::Result<Vec<LoginAttempt>> {
    let db = libsql::Builder::new_local(dir.path().join(DB_FILE)).build().await?;
    let conn = db.connect()?;
    let mut rows = conn
        .query(
            "SELECT id, origin, principal, succeeded, observed_at, agent FROM login_attempts WHERE origin = ? ORDER BY observed_at DESC, id DESC",
            libsql::params![origin],
        )
        .await?;

    let mut attempts = Vec::new();
    while let Some(row) = rows.next().await? {
        attempts.push(LoginAttempt {
            id: row.get(0)?,
            origin: row.get(1)?,
            principal: row.get(2)?,
            succeeded: row.get::<i64>(3)? != 0,
            observed_at: i64_to_timestamp(row.get(4)?),
            agent: row.get(5)?,
        });
    }
    Ok(attempts)
}

/// Prober that never routes loopback fixtures through an environment proxy.
pub fn direct_prober() -> Arc<HttpProber> {
    let client = reqwest::Client::builder().no_proxy().build().expect("reqwest client");
    Arc::new(HttpProber::with_client(client))
}

/// Serve every connection with `HTTP/1.1 <status_line>` and a two-byte body.
pub async fn spawn_http_fixture(status_line: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fixture");
    let addr = listener.local_addr().expect("fixture addr");

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok"
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Answer every request with `302 Found` pointing at `location`.
pub async fn spawn_redirect_fixture(location: String) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fixture");
    let addr = listener.local_addr().expect("fixture addr");
    serve_redirects(listener, location);
    addr
}

/// Redirect every request back to the fixture itself.
pub async fn spawn_redirect_loop_fixture() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fixture");
    let addr = listener.local_addr().expect("fixture addr");
    serve_redirects(listener, format!("http://{addr}/again"));
    addr
}

fn serve_redirects(listener: TcpListener, location: String) {
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let location = location.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 302 Found\r\nLocation: {location}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
}

/// Accept connections and never answer.
pub async fn spawn_silent_fixture() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fixture");
    let addr = listener.local_addr().expect("fixture addr");

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                drop(socket);
            });
        }
    });

    addr
}
