//! IMDb Title Pruning Library
//!
//! Combines the public IMDb extracts into one relation of movies, their US
//! release names, ratings and actors, and profiles tabular files into a data
//! dictionary.
//!
//! # Overview
//!
//! - **Relations**: an in-memory row store of typed cells ([`Relation`], [`Cell`])
//! - **Loading and writing**: delimited text with a missing-value sentinel
//!   ([`TableLoader`], [`TableWriter`])
//! - **Transforms**: explode list-valued columns, filter on set membership,
//!   validate join keys and hash-join on a shared key ([`transform`])
//! - **Title pipeline**: the whole combination with progress reporting and
//!   self-checks ([`TitlePipeline`])
//! - **Profiling**: per-column counts, types, classifications and numeric
//!   statistics ([`DatasetProfiler`], [`ProfileReport`])
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use movie_pruner::{PipelineConfig, TitlePipeline};
//!
//! let config = PipelineConfig::builder()
//!     .data_dir("data")
//!     .output_path("data/us.movies.actors.tsv")
//!     .build()?;
//!
//! let result = TitlePipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run()?;
//! ```
//!
//! # Profiling
//!
//! ```rust,ignore
//! use movie_pruner::{ClassificationTable, DatasetProfiler, ProfileReport, TableLoader};
//!
//! let relation = TableLoader::default().load("data/us.movies.actors.tsv", "movies")?;
//! let profile = DatasetProfiler::profile(&relation, &ClassificationTable::imdb())?;
//! let report = ProfileReport::new("data/us.movies.actors.tsv", profile);
//! println!("{}", report.to_json()?);
//! ```

pub mod config;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod profiler;
pub mod relation;
pub mod reporting;
pub mod transform;
pub mod types;

// Re-exports for convenient access
pub use config::{
    Classification, ClassificationTable, ConfigValidationError, JoinMultiplicity, LoadOptions,
    MISSING_TOKEN, PipelineConfig, PipelineConfigBuilder, SourceFiles, TextEncoding,
};
pub use error::{PrunerError, Result, ResultExt};
pub use io::{TableLoader, TableWriter};
pub use pipeline::{
    ClosureProgressReporter, CombinedRelation, PipelineStage, ProgressReporter, ProgressUpdate,
    SourceRelations, TitlePipeline, TitlePipelineBuilder,
};
pub use profiler::{ColumnProfiler, DatasetProfiler, OUTLIER_Z_SCORE};
pub use relation::{Cell, CellKind, Relation};
pub use reporting::{PROFILE_REPORT_COLUMNS, ProfileReport, ReportGenerator, RunReport};
pub use transform::{
    ColumnExploder, ExplodeStats, KeyReport, KeyValidator, MemberOf, RelationFilter,
    RelationJoiner,
};
pub use types::{
    ActionType, ColumnProfile, ColumnType, DatasetProfile, NumericSummary, PipelineAction,
    PipelineResult, PipelineSummary,
};
