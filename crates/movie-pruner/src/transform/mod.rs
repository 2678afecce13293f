//! Relation-to-relation operations used by the pipeline.
//!
//! Every operation takes its input by reference and returns a new relation.

pub mod explode;
pub mod filter;
pub mod join;
pub mod keys;

pub use explode::{ColumnExploder, ExplodeStats};
pub use filter::{MemberOf, RelationFilter};
pub use join::RelationJoiner;
pub use keys::{KeyReport, KeyValidator, TITLE_ID_PATTERN};
