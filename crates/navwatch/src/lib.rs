//! navwatch - operational safety core of the navigation link directory.
//!
//! Two temporal decision engines share one persistence layer:
//! - the brute-force login guard, which aggregates failed logins per origin
//!   over a trailing window;
//! - the link health monitor, which probes every registered link with a
//!   bounded timeout and stores the latest observation per link.

pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod guard;
pub mod monitoring;
pub mod pool;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use database::{EventStore, LibsqlEventStore, initialize_database};
pub use error::StoreError;
pub use guard::{BlockDecision, BruteForceGuard, LoginPolicy};
pub use monitoring::{HttpProber, LinkHealthMonitor, LinkScheduler, ProbeOutcome, Prober};
pub use pool::{LibsqlManager, LibsqlPool};
