//! Alert event emitted when a cycle finds disconnected batteries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A site that reported fewer connected batteries than expected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectedSite {
    pub label: String,
    pub connected: u32,
    pub total: u32,
    pub deficit: u32,
}

impl DisconnectedSite {
    /// One line of the alert message
    pub fn line(&self) -> String {
        if self.connected > self.total {
            return format!(
                "{}: {}/{} (over-count: {} more than expected)",
                self.label,
                self.connected,
                self.total,
                self.connected - self.total
            );
        }
        format!(
            "{}: {}/{} (disconnected: {})",
            self.label, self.connected, self.total, self.deficit
        )
    }
}

/// Alert raised for a single cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub title: String,
    pub cycle: u64,
    pub raised_at: DateTime<Utc>,
    pub sites: Vec<DisconnectedSite>,
}

impl AlertEvent {
    /// Multi-line human-readable message, one line per site
    pub fn message(&self) -> String {
        self.sites
            .iter()
            .map(DisconnectedSite::line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Total missing batteries across all listed sites
    pub fn total_deficit(&self) -> u32 {
        self.sites.iter().map(|s| s.deficit).sum()
    }
}
