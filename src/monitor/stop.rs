//! Stop signals
//!
//! Shutdown is cooperative: the scheduler polls a StopSignal before each
//! cycle and once a second while waiting. The operator requests a stop by
//! creating a marker file or pressing Ctrl-C. batwatch never creates or
//! removes the marker.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};

/// Read-only, externally controlled stop request
pub trait StopSignal: Send + Sync {
    fn is_set(&self) -> bool;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Stop requested by the presence of a marker file
#[derive(Debug, Clone)]
pub struct StopFile {
    path: PathBuf,
}

impl StopFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StopSignal for StopFile {
    fn is_set(&self) -> bool {
        self.path.exists()
    }

    fn describe(&self) -> String {
        format!("stop file {}", self.path.display())
    }
}

/// Stop requested in-process, e.g. by Ctrl-C
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    flag: Arc<AtomicBool>,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Set the flag when the process receives Ctrl-C.
    ///
    /// Must be called from within a tokio runtime.
    pub fn install_ctrl_c(&self) {
        let flag = self.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received, stopping after the current cycle");
                    flag.trigger();
                }
                Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
            }
        });
    }
}

impl StopSignal for InterruptFlag {
    fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn describe(&self) -> String {
        "interrupt".to_string()
    }
}

/// Set when any of its signals is set
#[derive(Default)]
pub struct AnyStop {
    signals: Vec<Arc<dyn StopSignal>>,
}

impl AnyStop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, signal: Arc<dyn StopSignal>) -> Self {
        self.signals.push(signal);
        self
    }
}

impl StopSignal for AnyStop {
    fn is_set(&self) -> bool {
        self.signals.iter().any(|s| s.is_set())
    }

    fn describe(&self) -> String {
        self.signals
            .iter()
            .map(|s| s.describe())
            .collect::<Vec<_>>()
            .join(" or ")
    }
}
