use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::probe::{ProbeOutcome, Prober};
use super::validation::validate_link_url;
use crate::database::EventStore;
use crate::database::models::{LinkStatus, NavLink};
use crate::error::StoreError;

/// Counts for one cycle. Per-link outcomes live only in the stored status fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    /// Links probed (or rejected by the scheme check) in this cycle
    pub attempted: usize,
    /// Links whose status write failed
    pub failed_writes: usize,
}

/// Probes every registered link and records the latest observation per link
pub struct LinkHealthMonitor {
    store: Arc<dyn EventStore>,
    prober: Arc<dyn Prober>,
    timeout: Duration,
}

impl LinkHealthMonitor {
    pub fn new(store: Arc<dyn EventStore>, prober: Arc<dyn Prober>, timeout: Duration) -> Self {
        Self { store, prober, timeout }
    }

    /// Probe one link and write its four status fields in one statement.
    ///
    /// A link deleted since it was listed affects zero rows; that is not an error.
    pub async fn check_one(&self, link: &NavLink) -> Result<(), StoreError> {
        let validation = validate_link_url(&link.url);
        let outcome = if validation.is_valid {
            self.prober.probe(&link.url, self.timeout).await
        } else {
            warn!(
                link_id = link.id,
                reason = %validation.error_message(),
                "Link URL failed the scheme check, marking unreachable without probing"
            );
            ProbeOutcome::unreachable(0)
        };

        let status = LinkStatus {
            checked_at: Utc::now(),
            status_code: outcome.status_code,
            reachable: outcome.reachable,
            response_time_ms: outcome.elapsed_ms,
        };

        let affected = self.store.update_link_status(link.id, &status).await?;
        if affected == 0 {
            debug!(link_id = link.id, "Link no longer exists, status write skipped");
        } else {
            debug!(
                link_id = link.id,
                status_code = ?outcome.status_code,
                reachable = outcome.reachable,
                elapsed_ms = outcome.elapsed_ms,
                "Link status updated"
            );
        }

        Ok(())
    }

    /// Probe every link currently registered, concurrently.
    ///
    /// Only a failure to load the link set is returned as an error; per-link
    /// probe or write failures are logged and the rest of the fan-out proceeds.
    pub async fn check_all(&self) -> Result<CycleSummary, StoreError> {
        let links = self.store.list_links().await?;

        let results = join_all(links.iter().map(|link| async move {
            (link.id, self.check_one(link).await)
        }))
        .await;

        let mut summary = CycleSummary { attempted: results.len(), failed_writes: 0 };
        for (link_id, result) in results {
            if let Err(e) = result {
                summary.failed_writes += 1;
                warn!(link_id, error = %e, "Failed to persist link status");
            }
        }

        info!(
            attempted = summary.attempted,
            failed_writes = summary.failed_writes,
            "Link health cycle completed"
        );
        Ok(summary)
    }
}
