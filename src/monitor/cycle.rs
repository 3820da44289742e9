//! Cycle runner
//!
//! Checks every configured site once, in configured order. A site that
//! fails is recorded as a failure and the cycle moves on; one broken card
//! never hides the others.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::check::SiteChecker;
use crate::clock::Clock;
use crate::dom::DocumentHandle;
use crate::domain::{CycleResult, SiteOutcome, SiteSpec};

/// Runs the site checker over all sites
pub struct CycleRunner {
    clock: Arc<dyn Clock>,
    checker: SiteChecker,
}

impl CycleRunner {
    pub fn new(clock: Arc<dyn Clock>, checker: SiteChecker) -> Self {
        Self { clock, checker }
    }

    /// Check all sites against one document
    pub async fn run_cycle(
        &self,
        number: u64,
        doc: &dyn DocumentHandle,
        sites: &[SiteSpec],
        per_site_timeout: Duration,
    ) -> CycleResult {
        let started_at = self.clock.wall();
        info!("Cycle {}: checking {} sites", number, sites.len());

        let mut results = Vec::with_capacity(sites.len());
        for (i, site) in sites.iter().enumerate() {
            info!(
                "[{:02}/{}] {} (expected {})",
                i + 1,
                sites.len(),
                site.label,
                site.expected_total
            );
            let result = self.checker.check_site(doc, site, per_site_timeout).await;
            match &result.outcome {
                SiteOutcome::Success { ratio, source } => {
                    info!("{}: {} via {:?} in {}ms", site.label, ratio, source, result.elapsed_ms)
                }
                SiteOutcome::Failure { reason, detail } => {
                    warn!("{}: {:?} - {}", site.label, reason, detail)
                }
            }
            results.push(result);
        }

        CycleResult {
            cycle: number,
            started_at,
            finished_at: self.clock.wall(),
            results,
        }
    }
}
