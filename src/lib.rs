pub mod core;

pub use crate::core::error::{LauncherError, LauncherResult};
pub use crate::core::events::{ConsoleSink, EventSink, LauncherEvent};
pub use crate::core::orchestrator::LaunchOrchestrator;
