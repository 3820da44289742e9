//! Alerting
//!
//! The Alerter turns a finished cycle into at most one AlertEvent listing
//! every disconnected site. Failed checks never raise an alert; they are
//! reported through the CycleObserver instead. Alerts carry no memory
//! between cycles: a site that stays disconnected is reported every cycle.

pub mod notify;

pub use notify::{ConsoleReporter, CycleObserver, RecordingObserver};

use log::{info, warn};

use crate::domain::{AlertEvent, CycleResult, DisconnectedSite};

pub const DEFAULT_TITLE: &str = "Battery Alerts";

/// Builds alert events from cycle results
#[derive(Debug, Clone)]
pub struct Alerter {
    title: String,
}

impl Default for Alerter {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE)
    }
}

impl Alerter {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// An event if at least one site is disconnected, otherwise None
    pub fn evaluate(&self, cycle: &CycleResult) -> Option<AlertEvent> {
        let sites: Vec<DisconnectedSite> = cycle
            .disconnected()
            .filter_map(|result| {
                let ratio = result.ratio()?;
                Some(DisconnectedSite {
                    label: result.site.label.clone(),
                    connected: ratio.numerator,
                    total: ratio.denominator,
                    deficit: ratio.deficit(),
                })
            })
            .collect();

        if sites.is_empty() {
            info!("Cycle {}: all reachable sites fully connected", cycle.cycle);
            return None;
        }

        let event = AlertEvent {
            title: self.title.clone(),
            cycle: cycle.cycle,
            raised_at: cycle.finished_at,
            sites,
        };
        warn!(
            "Cycle {}: {} site(s) disconnected, {} batteries missing",
            cycle.cycle,
            event.sites.len(),
            event.total_deficit()
        );
        Some(event)
    }
}
