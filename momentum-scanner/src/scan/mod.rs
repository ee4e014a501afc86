//! Scan orchestration.
//!
//! - **orchestrator**: runs one scan end to end
//! - **progress**: progress events and sinks
//! - **report**: the scan outcome and its renderings

pub mod orchestrator;
pub mod progress;
pub mod report;

pub use orchestrator::{ScanOrchestrator, ScanSettings};
pub use progress::{NoProgress, ProgressEvent, ProgressKind, ProgressSink};
pub use report::{FunnelStage, ReportFormat, ScanReport};
