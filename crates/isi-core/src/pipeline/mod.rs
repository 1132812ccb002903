pub mod orchestrator;
pub mod types;

pub use orchestrator::{run_analysis, run_analysis_reported};
pub use types::{AnalysisStage, CancelFlag, DirectionInput, ProgressReporter};
