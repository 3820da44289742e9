//! Cycle observers
//!
//! The scheduler hands every finished cycle (and its alert, if any) to a
//! CycleObserver. ConsoleReporter prints a colored summary for operators;
//! RecordingObserver keeps everything in memory.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::Mutex;

use colored::*;
use log::{error, warn};

use crate::domain::{AlertEvent, CycleResult, SiteOutcome};
use crate::error::WatchError;

/// Receives cycle results from the scheduler
pub trait CycleObserver: Send + Sync {
    fn on_cycle(&self, cycle: &CycleResult, alert: Option<&AlertEvent>);

    /// A cycle that could not run, e.g. the session failed to open
    fn on_cycle_error(&self, err: &WatchError) {
        error!("Cycle did not run: {}", err);
    }
}

/// Prints cycle summaries and alerts to stdout
#[derive(Debug, Clone, Default)]
pub struct ConsoleReporter {
    bell: bool,
    json: bool,
}

impl ConsoleReporter {
    pub fn new(bell: bool) -> Self {
        Self { bell, json: false }
    }

    /// Emit each cycle as one JSON line instead of the text summary
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    fn emit(&self, text: &str) {
        let mut out = io::stdout().lock();
        if let Err(e) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
            warn!("Failed to write cycle report: {}", e);
        }
    }
}

impl CycleObserver for ConsoleReporter {
    fn on_cycle(&self, cycle: &CycleResult, alert: Option<&AlertEvent>) {
        if self.json {
            match serde_json::to_string(&CycleReport { cycle, alert }) {
                Ok(line) => self.emit(&format!("{}\n", line)),
                Err(e) => warn!("Failed to serialize cycle {}: {}", cycle.cycle, e),
            }
            return;
        }

        let mut text = render_summary(cycle);
        if let Some(alert) = alert {
            text.push_str(&render_alert(alert));
            if self.bell {
                text.push('\x07');
            }
        }
        self.emit(&text);
    }

    fn on_cycle_error(&self, err: &WatchError) {
        error!("Cycle did not run: {}", err);
        self.emit(&format!("{} {}\n", "Cycle failed:".red().bold(), err));
    }
}

#[derive(serde::Serialize)]
struct CycleReport<'a> {
    #[serde(flatten)]
    cycle: &'a CycleResult,
    alert: Option<&'a AlertEvent>,
}

/// Three-section summary: connected, disconnected, errors
pub fn render_summary(cycle: &CycleResult) -> String {
    let connected: Vec<_> = cycle.connected().collect();
    let disconnected: Vec<_> = cycle.disconnected().collect();
    let failures: Vec<_> = cycle.failures().collect();

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} ({}s): {} connected, {} disconnected, {} errors",
        "Cycle".bold(),
        cycle.cycle,
        cycle.duration().num_seconds(),
        connected.len(),
        disconnected.len(),
        failures.len()
    );

    if !connected.is_empty() {
        let _ = writeln!(out, "{}", "Fully connected:".green());
        for result in connected {
            if let Some(ratio) = result.ratio() {
                let _ = writeln!(out, "  {}: {}", result.site.label, ratio);
            }
        }
    }

    if !disconnected.is_empty() {
        let _ = writeln!(out, "{}", "Disconnected:".yellow());
        for result in disconnected {
            if let Some(ratio) = result.ratio() {
                if ratio.numerator > ratio.denominator {
                    let _ = writeln!(
                        out,
                        "  {}: {} (over-count {})",
                        result.site.label,
                        ratio,
                        ratio.numerator - ratio.denominator
                    );
                } else {
                    let _ = writeln!(
                        out,
                        "  {}: {} (missing {})",
                        result.site.label,
                        ratio,
                        ratio.deficit()
                    );
                }
            }
        }
    }

    if !failures.is_empty() {
        let _ = writeln!(out, "{}", "Errors:".red());
        for result in failures {
            if let SiteOutcome::Failure { reason, detail } = &result.outcome {
                let _ = writeln!(out, "  {}: {:?} - {}", result.site.label, reason, detail);
            }
        }
    }

    out
}

/// Alert block printed after the summary
pub fn render_alert(alert: &AlertEvent) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", format!("*** {} ***", alert.title).red().bold());
    for site in &alert.sites {
        let _ = writeln!(out, "  {}", site.line());
    }
    out
}

/// Keeps every cycle, alert and error it sees
#[derive(Debug, Default)]
pub struct RecordingObserver {
    cycles: Mutex<Vec<CycleResult>>,
    alerts: Mutex<Vec<AlertEvent>>,
    errors: Mutex<usize>,
}

impl RecordingObserver {
    pub fn cycles(&self) -> Vec<CycleResult> {
        self.cycles.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn alerts(&self) -> Vec<AlertEvent> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn errors(&self) -> usize {
        self.errors.lock().map(|e| *e).unwrap_or_default()
    }
}

impl CycleObserver for RecordingObserver {
    fn on_cycle(&self, cycle: &CycleResult, alert: Option<&AlertEvent>) {
        if let Ok(mut cycles) = self.cycles.lock() {
            cycles.push(cycle.clone());
        }
        if let (Some(alert), Ok(mut alerts)) = (alert, self.alerts.lock()) {
            alerts.push(alert.clone());
        }
    }

    fn on_cycle_error(&self, err: &WatchError) {
        warn!("Recorded cycle error: {}", err);
        if let Ok(mut errors) = self.errors.lock() {
            *errors += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        DisconnectedSite, ErrorKind, ExtractedRatio, RatioSource, SiteCheckResult, SiteSpec,
    };
    use chrono::Utc;

    fn sample() -> CycleResult {
        let now = Utc::now();
        CycleResult {
            cycle: 2,
            started_at: now,
            finished_at: now + chrono::Duration::seconds(12),
            results: vec![
                SiteCheckResult::success(
                    SiteSpec::new("Alpha", 10).unwrap(),
                    ExtractedRatio::new(10, 10),
                    RatioSource::CardText,
                ),
                SiteCheckResult::success(
                    SiteSpec::new("Warburg3", 66).unwrap(),
                    ExtractedRatio::new(65, 66),
                    RatioSource::CardDescendant,
                ),
                SiteCheckResult::failure(
                    SiteSpec::new("Dimona", 12).unwrap(),
                    ErrorKind::NotFound,
                    "label never appeared",
                ),
            ],
        }
    }

    #[test]
    fn test_summary_sections() {
        let text = render_summary(&sample());
        assert!(text.contains("Alpha: 10/10"));
        assert!(text.contains("Warburg3: 65/66 (missing 1)"));
        assert!(text.contains("Dimona: NotFound - label never appeared"));
        assert!(text.contains("(12s): 1 connected, 1 disconnected, 1 errors"));
    }

    #[test]
    fn test_alert_block() {
        let alert = AlertEvent {
            title: "Battery Alerts".into(),
            cycle: 2,
            raised_at: Utc::now(),
            sites: vec![DisconnectedSite {
                label: "Warburg3".into(),
                connected: 65,
                total: 66,
                deficit: 1,
            }],
        };
        let text = render_alert(&alert);
        assert!(text.contains("Battery Alerts"));
        assert!(text.contains("Warburg3: 65/66 (disconnected: 1)"));
    }

    #[test]
    fn test_json_report_shape() {
        let cycle = sample();
        let value = serde_json::to_value(CycleReport { cycle: &cycle, alert: None }).unwrap();
        assert_eq!(value["cycle"], 2);
        assert_eq!(value["results"].as_array().unwrap().len(), 3);
        assert!(value["alert"].is_null());
    }

    #[test]
    fn test_recording_observer() {
        let observer = RecordingObserver::default();
        observer.on_cycle(&sample(), None);
        observer.on_cycle_error(&WatchError::Session("down".into()));
        assert_eq!(observer.cycles().len(), 1);
        assert!(observer.alerts().is_empty());
        assert_eq!(observer.errors(), 1);
    }
}
