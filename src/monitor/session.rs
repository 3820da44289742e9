//! Session capability
//!
//! Logging in and rendering the dashboard happen outside batwatch. A
//! SessionProvider hands the monitor a fresh, authenticated document for
//! each cycle; the monitor closes it when the cycle is done.

use async_trait::async_trait;

use crate::dom::DocumentHandle;
use crate::error::Result;

/// Produces one authenticated dashboard document per cycle
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Establish a session positioned on the dashboard
    async fn open(&self) -> Result<Box<dyn DocumentHandle>>;

    /// Short description for logs
    fn describe(&self) -> String {
        "session".to_string()
    }
}
