//! Pipeline module.
//!
//! The title pipeline and its progress reporting, plus the table and column
//! names of the IMDb extracts it works on.

mod builder;
pub mod progress;

pub use builder::{CombinedRelation, SourceRelations, TitlePipeline, TitlePipelineBuilder};
pub use progress::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};

// ============================================================================
// IMDb table and column names
// ============================================================================

pub const AKAS_TABLE: &str = "title.akas";
pub const BASICS_TABLE: &str = "title.basics";
pub const RATINGS_TABLE: &str = "title.ratings";
pub const NAMES_TABLE: &str = "name.basics";

/// Title identifier as named in title.akas.
pub const TITLE_ID: &str = "titleId";
pub const REGION: &str = "region";
pub const TITLE_TYPE: &str = "titleType";
pub const GENRES: &str = "genres";
pub const PERSON_ID: &str = "nconst";
pub const PRIMARY_PROFESSION: &str = "primaryProfession";
/// Titles a person is known for; holds title identifiers once exploded.
pub const KNOWN_FOR_TITLES: &str = "knownForTitles";
