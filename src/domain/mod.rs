//! Domain types for batwatch
//!
//! This module contains the core value types:
//! - SiteSpec: a monitored card label and its expected battery total
//! - ExtractedRatio: an N/M value read from the dashboard
//! - SiteCheckResult / CycleResult: per-site and per-cycle outcomes
//! - AlertEvent: disconnected sites raised for one cycle

pub mod alert;
pub mod ratio;
pub mod result;
pub mod site;

pub use alert::{AlertEvent, DisconnectedSite};
pub use ratio::ExtractedRatio;
pub use result::{CycleResult, ErrorKind, RatioSource, SiteCheckResult, SiteOutcome};
pub use site::SiteSpec;
