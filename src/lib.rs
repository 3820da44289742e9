//! batwatch - battery connectivity monitor for site dashboards
//!
//! Each cycle opens an authenticated dashboard document, finds every
//! configured site's card, reads its `connected/expected` battery ratio, and
//! raises an alert listing the sites with disconnected batteries.

pub mod alert;
pub mod check;
pub mod clock;
pub mod config;
pub mod dom;
pub mod domain;
pub mod error;
pub mod monitor;
pub mod wait;

pub use error::{Result, WatchError};
