//! Site and cycle result types
//!
//! A SiteCheckResult has three distinguishable states: connected,
//! disconnected (both `Success`) and `Failure`. A CycleResult collects one
//! result per configured site, in configured order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ratio::ExtractedRatio;
use super::site::SiteSpec;

/// Why a site check failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Label never appeared within the timeout
    NotFound,
    /// Card found but no ratio with the expected denominator appeared
    Timeout,
    /// Session could not be established
    Session,
    /// Document backend failed
    Document,
}

/// Which search step produced a ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioSource {
    /// Full text of the exactly-labelled card
    CardText,
    /// A slash-bearing descendant of the exactly-labelled card
    CardDescendant,
    /// A card found by case-insensitive partial label match
    WidenedCard,
    /// Anywhere in the document; may belong to a neighbouring card
    DocumentScan,
}

impl RatioSource {
    /// Whether the ratio is attributed to the site's own card
    pub fn is_card_scoped(&self) -> bool {
        !matches!(self, RatioSource::DocumentScan)
    }
}

/// Outcome of checking one site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SiteOutcome {
    Success {
        ratio: ExtractedRatio,
        source: RatioSource,
    },
    Failure {
        reason: ErrorKind,
        detail: String,
    },
}

/// Result of checking one site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteCheckResult {
    pub site: SiteSpec,
    pub outcome: SiteOutcome,
    /// Time spent on this site
    pub elapsed_ms: u64,
}

impl SiteCheckResult {
    pub fn success(site: SiteSpec, ratio: ExtractedRatio, source: RatioSource) -> Self {
        Self {
            site,
            outcome: SiteOutcome::Success { ratio, source },
            elapsed_ms: 0,
        }
    }

    pub fn failure(site: SiteSpec, reason: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            site,
            outcome: SiteOutcome::Failure {
                reason,
                detail: detail.into(),
            },
            elapsed_ms: 0,
        }
    }

    /// Set the elapsed time
    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    /// The extracted ratio, if the check succeeded
    pub fn ratio(&self) -> Option<ExtractedRatio> {
        match &self.outcome {
            SiteOutcome::Success { ratio, .. } => Some(*ratio),
            SiteOutcome::Failure { .. } => None,
        }
    }

    /// `Some(true|false)` on success, `None` on failure
    pub fn fully_connected(&self) -> Option<bool> {
        self.ratio().map(|r| r.fully_connected())
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, SiteOutcome::Success { .. })
    }
}

/// One complete pass over every configured site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleResult {
    /// 1-based cycle counter within this process
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<SiteCheckResult>,
}

impl CycleResult {
    /// Sites with every battery connected
    pub fn connected(&self) -> impl Iterator<Item = &SiteCheckResult> {
        self.results.iter().filter(|r| r.fully_connected() == Some(true))
    }

    /// Sites whose check succeeded with at least one battery missing
    pub fn disconnected(&self) -> impl Iterator<Item = &SiteCheckResult> {
        self.results.iter().filter(|r| r.fully_connected() == Some(false))
    }

    /// Sites whose check failed
    pub fn failures(&self) -> impl Iterator<Item = &SiteCheckResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    /// Wall-clock duration of the cycle
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(label: &str, total: u32) -> SiteSpec {
        SiteSpec::new(label, total).unwrap()
    }

    fn sample_cycle() -> CycleResult {
        let now = Utc::now();
        CycleResult {
            cycle: 1,
            started_at: now,
            finished_at: now + chrono::Duration::seconds(4),
            results: vec![
                SiteCheckResult::success(site("A", 10), ExtractedRatio::new(10, 10), RatioSource::CardText),
                SiteCheckResult::success(site("B", 12), ExtractedRatio::new(9, 12), RatioSource::CardDescendant),
                SiteCheckResult::failure(site("C", 8), ErrorKind::NotFound, "label missing"),
            ],
        }
    }

    #[test]
    fn test_three_way_classification() {
        let cycle = sample_cycle();
        assert_eq!(cycle.connected().count(), 1);
        assert_eq!(cycle.disconnected().count(), 1);
        assert_eq!(cycle.failures().count(), 1);
        assert_eq!(cycle.results[2].fully_connected(), None);
    }

    #[test]
    fn test_duration() {
        assert_eq!(sample_cycle().duration(), chrono::Duration::seconds(4));
    }

    #[test]
    fn test_outcome_serialization() {
        let ok = SiteOutcome::Success {
            ratio: ExtractedRatio::new(65, 66),
            source: RatioSource::DocumentScan,
        };
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["source"], "document_scan");
        assert_eq!(json["ratio"]["numerator"], 65);

        let err = SiteOutcome::Failure {
            reason: ErrorKind::Timeout,
            detail: "no N/66".into(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["reason"], "timeout");
    }

    #[test]
    fn test_source_confidence() {
        assert!(RatioSource::CardText.is_card_scoped());
        assert!(RatioSource::WidenedCard.is_card_scoped());
        assert!(!RatioSource::DocumentScan.is_card_scoped());
    }
}
