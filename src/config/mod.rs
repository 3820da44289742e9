//! Configuration
//!
//! Loaded from YAML (JSON works too) with a fallback chain:
//! 1. `--config <path>`
//! 2. `~/.config/batwatch/batwatch.yml`
//! 3. `./batwatch.yml`
//! 4. `./config.json`
//!
//! Sections other than the ones below (e.g. `auth`, read by the external
//! login tool) are ignored.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use eyre::Context;
use serde::{Deserialize, Serialize};

use crate::alert::{Alerter, ConsoleReporter};
use crate::check::{CardLocator, ClassKeyword, ContainerRule, MinSize, SiteChecker};
use crate::clock::Clock;
use crate::domain::SiteSpec;
use crate::dom::SnapshotSession;
use crate::error::{Result, WatchError};
use crate::monitor::{MonitorConfig, RunMode, StopFile};
use crate::wait::Settle;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub settings: Settings,
    pub sites: Vec<SiteSpec>,
    pub session: SessionConfig,
    pub monitor: MonitorSettings,
    pub alerts: AlertSettings,

    /// File this config was read from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Per-site budget
    pub timeout_sec: u64,
    /// Passed through to session providers that drive a browser
    pub headless: bool,
    /// Target time between cycle starts
    pub interval_sec: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout_sec: 30,
            headless: true,
            interval_sec: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Rendered dashboard snapshot, re-read every cycle
    pub snapshot: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            snapshot: PathBuf::from("dashboard.yml"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub stop_file: PathBuf,
    pub settle_ms: u64,
    pub poll_ms: u64,
    pub max_climb: usize,
    pub card_min_width: f64,
    pub card_min_height: f64,
    pub card_keywords: Vec<String>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        let size = MinSize::default();
        Self {
            stop_file: PathBuf::from("STOP"),
            settle_ms: 2000,
            poll_ms: 100,
            max_climb: 10,
            card_min_width: size.width,
            card_min_height: size.height,
            card_keywords: ClassKeyword::default().keywords,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    /// Ring the terminal bell on alerts
    pub bell: bool,
    pub title: String,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            bell: true,
            title: crate::alert::DEFAULT_TITLE.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            settings: Settings::default(),
            sites: Vec::new(),
            session: SessionConfig::default(),
            monitor: MonitorSettings::default(),
            alerts: AlertSettings::default(),
            source: None,
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> eyre::Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_name = env!("CARGO_PKG_NAME");
        let mut candidates = Vec::new();
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join(project_name).join(format!("{}.yml", project_name)));
        }
        candidates.push(PathBuf::from(format!("{}.yml", project_name)));
        candidates.push(PathBuf::from("config.json"));

        if let Some(config) = Self::load_discovered(&candidates)? {
            return Ok(config);
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load the first candidate that exists.
    ///
    /// A file that exists but cannot be read or parsed is an error rather
    /// than a silent fall-through to defaults.
    pub fn load_discovered(candidates: &[PathBuf]) -> eyre::Result<Option<Self>> {
        match candidates.iter().find(|p| p.exists()) {
            Some(path) => Self::load_from_file(path)
                .context(format!("Failed to load config from {}", path.display()))
                .map(Some),
            None => Ok(None),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> eyre::Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let mut config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.source = Some(path.as_ref().to_path_buf());

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Check everything serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.sites.is_empty() {
            return Err(WatchError::Config("no sites configured".to_string()));
        }
        if self.settings.timeout_sec == 0 {
            return Err(WatchError::Config("settings.timeout_sec must be greater than 0".to_string()));
        }
        if self.settings.interval_sec == 0 {
            return Err(WatchError::Config("settings.interval_sec must be greater than 0".to_string()));
        }
        if self.monitor.poll_ms == 0 {
            return Err(WatchError::Config("monitor.poll_ms must be greater than 0".to_string()));
        }
        for (i, site) in self.sites.iter().enumerate() {
            if self.sites[..i].iter().any(|s| s.label == site.label) {
                log::warn!("Site {} is configured more than once", site.label);
            }
        }
        Ok(())
    }

    /// Resolve a path from the config against the config file's directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match self.source.as_deref().and_then(Path::parent) {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn per_site_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.timeout_sec)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.settings.interval_sec)
    }

    pub fn settle(&self) -> Settle {
        Settle::new(
            Duration::from_millis(self.monitor.settle_ms),
            Duration::from_millis(self.monitor.poll_ms),
        )
    }

    pub fn locator(&self, clock: Arc<dyn Clock>) -> CardLocator {
        let rules: Vec<Box<dyn ContainerRule>> = vec![
            Box::new(MinSize {
                width: self.monitor.card_min_width,
                height: self.monitor.card_min_height,
            }),
            Box::new(ClassKeyword::new(self.monitor.card_keywords.iter().cloned())),
        ];
        CardLocator::new(clock)
            .with_rules(rules)
            .with_max_climb(self.monitor.max_climb)
            .with_poll_interval(Duration::from_millis(self.monitor.poll_ms))
    }

    pub fn checker(&self, clock: Arc<dyn Clock>) -> SiteChecker {
        SiteChecker::new(clock.clone(), self.locator(clock)).with_settle(self.settle())
    }

    pub fn monitor_config(&self, mode: RunMode) -> MonitorConfig {
        MonitorConfig {
            interval: self.interval(),
            per_site_timeout: self.per_site_timeout(),
            mode,
            ..MonitorConfig::default()
        }
    }

    pub fn alerter(&self) -> Alerter {
        Alerter::new(self.alerts.title.clone())
    }

    pub fn reporter(&self) -> ConsoleReporter {
        ConsoleReporter::new(self.alerts.bell)
    }

    pub fn stop_file(&self) -> StopFile {
        StopFile::new(self.resolve(&self.monitor.stop_file))
    }

    pub fn session(&self) -> SnapshotSession {
        SnapshotSession::new(self.resolve(&self.session.snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    const SAMPLE: &str = r#"
log_level: debug
settings:
  timeout_sec: 20
  interval_sec: 120
sites:
  - label: Warburg3
    expected_total: 66
  - label: " Dimona "
    expected_total: 12
session:
  snapshot: snapshots/dashboard.yml
alerts:
  bell: false
auth:
  username: operator
  password: hunter2
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, Some("info".to_string()));
        assert_eq!(config.settings.timeout_sec, 30);
        assert_eq!(config.settings.interval_sec, 300);
        assert!(config.settings.headless);
        assert_eq!(config.monitor.stop_file, PathBuf::from("STOP"));
        assert_eq!(config.monitor.card_keywords, vec!["container", "card", "box"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_yaml_ignores_unknown_sections() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();

        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.sites.len(), 2);
        assert_eq!(config.sites[1].label, "Dimona");
        assert_eq!(config.sites[0].total(), 66);
        assert_eq!(config.per_site_timeout(), Duration::from_secs(20));
        assert_eq!(config.interval(), Duration::from_secs(120));
        // unset sections keep their defaults
        assert_eq!(config.monitor.settle_ms, 2000);
        assert!(!config.alerts.bell);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"{"settings": {"timeout_sec": 30, "headless": false, "interval_sec": 300},
                "sites": [{"label": "Warburg3", "expected_total": 66}]}"#,
        )
        .unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert!(!config.settings.headless);
        assert_eq!(config.sites[0].label, "Warburg3");
    }

    #[test]
    fn test_zero_total_rejected_at_parse() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"sites:\n  - label: Broken\n    expected_total: 0\n").unwrap();
        assert!(Config::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config {
            sites: vec![SiteSpec::new("A", 4).unwrap()],
            ..Config::default()
        };
        config.settings.interval_sec = 0;
        assert!(matches!(config.validate(), Err(WatchError::Config(_))));
    }

    #[test]
    fn test_discovered_file_that_fails_to_parse_is_error() {
        let dir = TempDir::new().unwrap();
        let broken = dir.path().join("config.json");
        std::fs::write(&broken, r#"{"sites": [{"label": "Warburg3""#).unwrap();
        let candidates = vec![dir.path().join("batwatch.yml"), broken];

        let err = Config::load_discovered(&candidates).unwrap_err();

        assert!(err.to_string().contains("config.json"));
    }

    #[test]
    fn test_discovered_first_existing_wins() {
        let dir = TempDir::new().unwrap();
        let yml = dir.path().join("batwatch.yml");
        std::fs::write(&yml, "sites:\n  - label: Dimona\n    expected_total: 12\n").unwrap();
        std::fs::write(dir.path().join("config.json"), "not: [valid").unwrap();
        let candidates = vec![yml, dir.path().join("config.json")];

        let config = Config::load_discovered(&candidates).unwrap().unwrap();
        assert_eq!(config.sites[0].label, "Dimona");
        assert!(Config::load_discovered(&[dir.path().join("absent.yml")]).unwrap().is_none());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.yml");
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_paths_resolve_against_config_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("batwatch.yml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = Config::load_from_file(&path).unwrap();

        assert_eq!(config.session().path(), dir.path().join("snapshots/dashboard.yml"));
        assert_eq!(config.stop_file().path(), dir.path().join("STOP"));
        assert_eq!(config.resolve(Path::new("/abs/STOP")), PathBuf::from("/abs/STOP"));
    }

    #[test]
    fn test_builders_follow_settings() {
        let mut config = Config::default();
        config.monitor.settle_ms = 500;
        config.monitor.poll_ms = 50;
        let settle = config.settle();
        assert_eq!(settle.window, Duration::from_millis(500));
        assert_eq!(settle.interval, Duration::from_millis(50));

        let monitor = config.monitor_config(RunMode::Once);
        assert_eq!(monitor.mode, RunMode::Once);
        assert_eq!(monitor.interval, Duration::from_secs(300));
        assert_eq!(monitor.stop_poll, Duration::from_secs(1));
        assert_eq!(config.alerter().title(), "Battery Alerts");
    }
}
