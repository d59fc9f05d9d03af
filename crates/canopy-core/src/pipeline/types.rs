use chrono::{DateTime, Utc};

use crate::compose::CompositeFrame;
use crate::series::TimeSeries;

use super::config::DisplayConfig;

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Querying,
    ComputingIndices,
    Compositing,
    BuildingSeries,
    Writing,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Querying => write!(f, "Querying archive"),
            Self::ComputingIndices => write!(f, "Computing indices"),
            Self::Compositing => write!(f, "Compositing"),
            Self::BuildingSeries => write!(f, "Building series"),
            Self::Writing => write!(f, "Writing output"),
        }
    }
}

/// A finished composite with the name and display hints from its config.
#[derive(Clone, Debug)]
pub struct CompositeOutput {
    pub name: String,
    pub composite: CompositeFrame,
    pub displays: Vec<DisplayConfig>,
}

/// Everything the pipeline produced, as plain data.
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    /// Acquisition times of the frames that passed the query.
    pub timestamps: Vec<DateTime<Utc>>,
    pub composites: Vec<CompositeOutput>,
    pub series: Vec<TimeSeries>,
}

impl PipelineOutput {
    pub fn frame_count(&self) -> usize {
        self.timestamps.len()
    }
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., frame count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter, used when `run_pipeline` delegates.
pub(super) struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
