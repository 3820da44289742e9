//! Monitoring loop
//!
//! - session: per-cycle document provider
//! - cycle: one pass over every site
//! - scheduler: the state machine driving cycles on an interval
//! - stop: cooperative shutdown signals

pub mod cycle;
pub mod scheduler;
pub mod session;
pub mod stop;

pub use cycle::CycleRunner;
pub use scheduler::{Monitor, MonitorConfig, MonitorState, MonitorStats, RunMode};
pub use session::SessionProvider;
pub use stop::{AnyStop, InterruptFlag, StopFile, StopSignal};
