//! Progress reporting for the title pipeline.
//!
//! The pipeline runs synchronously; a reporter only observes it. Updates are
//! emitted at the start and end of each stage and once per table inside a
//! stage.
//!
//! # Example
//!
//! ```rust,ignore
//! use movie_pruner::TitlePipeline;
//!
//! let result = TitlePipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run()?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of the title pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Reading the four source files
    Loading,
    /// Splitting list-valued columns into rows
    Exploding,
    /// Applying the region, title type and profession filters
    Filtering,
    /// Checking (and possibly remediating) join keys
    Validating,
    /// Joining the four relations on the title key
    Joining,
    /// Writing the combined relation
    Writing,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline aborted with an error
    Failed,
}

impl PipelineStage {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading Tables",
            Self::Exploding => "Exploding Lists",
            Self::Filtering => "Filtering Rows",
            Self::Validating => "Validating Keys",
            Self::Joining => "Joining Tables",
            Self::Writing => "Writing Output",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the whole run this stage typically takes (0.0 - 1.0).
    pub fn weight(&self) -> f32 {
        match self {
            Self::Loading => 0.35,
            Self::Exploding => 0.15,
            Self::Filtering => 0.10,
            Self::Validating => 0.05,
            Self::Joining => 0.20,
            Self::Writing => 0.15,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Loading => 0.0,
            Self::Exploding => 0.35,
            Self::Filtering => 0.50,
            Self::Validating => 0.60,
            Self::Joining => 0.65,
            Self::Writing => 0.85,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// A progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: PipelineStage,

    /// Table being worked on, when the stage goes table by table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within the current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

impl ProgressUpdate {
    pub fn new(stage: PipelineStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            table: None,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    /// Update for table `current` of `total` within a stage.
    pub fn for_table(
        stage: PipelineStage,
        table: impl Into<String>,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if total > 0 {
            current as f32 / total as f32
        } else {
            0.0
        };
        Self {
            table: Some(table.into()),
            ..Self::new(stage, stage_progress, message)
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(PipelineStage::Complete, 1.0, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(PipelineStage::Failed, 0.0, message)
    }
}

/// Receives progress updates from the pipeline.
///
/// Implementations must be `Send + Sync` so a pipeline can be handed to a
/// worker thread together with its reporter.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_stage_weights_sum_to_one() {
        let stages = [
            PipelineStage::Loading,
            PipelineStage::Exploding,
            PipelineStage::Filtering,
            PipelineStage::Validating,
            PipelineStage::Joining,
            PipelineStage::Writing,
        ];
        let total: f32 = stages.iter().map(PipelineStage::weight).sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_base_progress_is_cumulative() {
        let stages = [
            PipelineStage::Loading,
            PipelineStage::Exploding,
            PipelineStage::Filtering,
            PipelineStage::Validating,
            PipelineStage::Joining,
            PipelineStage::Writing,
            PipelineStage::Complete,
        ];
        for pair in stages.windows(2) {
            let end = pair[0].base_progress() + pair[0].weight();
            assert!((end - pair[1].base_progress()).abs() < 1e-6, "{:?}", pair);
        }
    }

    #[test]
    fn test_progress_update_clamps() {
        let update = ProgressUpdate::new(PipelineStage::Joining, 2.0, "overshoot");
        assert_eq!(update.stage_progress, 1.0);
        assert!(update.progress <= 1.0);
    }

    #[test]
    fn test_for_table() {
        let update = ProgressUpdate::for_table(PipelineStage::Loading, "title.akas", 1, 4, "Loading");
        assert_eq!(update.table.as_deref(), Some("title.akas"));
        assert!((update.stage_progress - 0.25).abs() < 1e-6);
        assert!((update.progress - 0.0875).abs() < 1e-6);
    }

    #[test]
    fn test_closure_reporter() {
        let seen = Mutex::new(Vec::new());
        let reporter = ClosureProgressReporter::new(|update: ProgressUpdate| {
            seen.lock().unwrap().push(update.stage);
        });
        reporter.report(ProgressUpdate::complete("done"));
        reporter.report(ProgressUpdate::failed("boom"));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![PipelineStage::Complete, PipelineStage::Failed]
        );
    }

    #[test]
    fn test_serialization() {
        let update = ProgressUpdate::new(PipelineStage::Validating, 0.0, "Checking keys");
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["stage"], "validating");
        assert!(json.get("table").is_none());
    }
}
