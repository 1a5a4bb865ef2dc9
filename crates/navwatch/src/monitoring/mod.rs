//! Link health monitoring
//!
//! This module is responsible for:
//! - Probing a single URL with a client-enforced timeout
//! - Fanning probes out over every registered link
//! - Running cycles on a timer and on demand
//! - Rejecting link URLs that fail the scheme check

pub mod monitor;
pub mod probe;
pub mod scheduler;
pub mod validation;

pub use monitor::{CycleSummary, LinkHealthMonitor};
pub use probe::{HttpProber, ProbeOutcome, Prober};
pub use scheduler::LinkScheduler;
