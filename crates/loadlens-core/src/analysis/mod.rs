pub mod narrative;
pub mod overview;
pub mod stages;

pub use narrative::{synthesize, Dimension, Finding, Narrative, NarrativeInput};
pub use overview::{overall_status, round_rate, RunOverview, RunStatus};
pub use stages::{classify, compare_stage_ids, summarize_stages, StageStatus, StageSummary};
