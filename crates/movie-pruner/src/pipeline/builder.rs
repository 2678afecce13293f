//! The title pipeline and its builder.
//!
//! This module provides the `TitlePipeline` struct that combines the four
//! IMDb extracts into one relation of US movies and their actors.

use crate::config::{JoinMultiplicity, PipelineConfig};
use crate::error::{PrunerError, Result, ResultExt};
use crate::io::{TableLoader, TableWriter};
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::pipeline::{
    AKAS_TABLE, BASICS_TABLE, GENRES, KNOWN_FOR_TITLES, NAMES_TABLE, PERSON_ID,
    PRIMARY_PROFESSION, RATINGS_TABLE, REGION, TITLE_ID, TITLE_TYPE,
};
use crate::relation::Relation;
use crate::transform::{
    ColumnExploder, KeyReport, KeyValidator, MemberOf, RelationFilter, RelationJoiner,
};
use crate::types::{ActionType, PipelineAction, PipelineResult, PipelineSummary};
use chrono::Local;
use std::fs;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// The four source relations, as loaded.
#[derive(Debug, Clone)]
pub struct SourceRelations {
    pub akas: Relation,
    pub basics: Relation,
    pub ratings: Relation,
    pub names: Relation,
}

/// The combined relation and the record of how it was produced.
#[derive(Debug, Clone)]
pub struct CombinedRelation {
    pub relation: Relation,
    pub summary: PipelineSummary,
}

/// Combines title alternates, title basics, ratings and people into one
/// relation keyed by title.
///
/// Use [`TitlePipeline::builder()`] to create a pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use movie_pruner::{PipelineConfig, TitlePipeline};
///
/// let result = TitlePipeline::builder()
///     .config(PipelineConfig::builder().data_dir("data").build()?)
///     .on_progress(|update| println!("{}", update.message))
///     .build()?
///     .run()?;
/// ```
pub struct TitlePipeline {
    config: PipelineConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    loader: TableLoader,
    writer: TableWriter,
    validator: KeyValidator,
}

static_assertions::assert_impl_all!(TitlePipeline: Send);

impl TitlePipeline {
    pub fn builder() -> TitlePipelineBuilder {
        TitlePipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the four source files, combine them and write the result.
    ///
    /// Any failure aborts the run; nothing is written unless every stage
    /// before writing succeeded.
    pub fn run(&self) -> Result<PipelineResult> {
        match self.run_internal() {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    fn run_internal(&self) -> Result<PipelineResult> {
        let start_time = Instant::now();
        info!("Starting title pipeline...");

        let sources = self.load_sources()?;
        let CombinedRelation {
            relation,
            mut summary,
        } = self.combine(sources)?;

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Writing,
            0.0,
            format!("Writing {}", self.config.output_path.display()),
        ));
        if let Some(parent) = self
            .config
            .output_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            fs::create_dir_all(parent).map_err(|e| PrunerError::io(parent, e))?;
        }
        self.writer
            .write(&relation, &self.config.output_path)
            .context("Writing stage")?;
        self.report_progress(ProgressUpdate::new(PipelineStage::Writing, 1.0, "Output written"));

        summary.duration_ms = start_time.elapsed().as_millis() as u64;
        summary.completed_at = Local::now().to_rfc3339();
        info!(
            "Pipeline finished in {}ms: {} rows x {} columns",
            summary.duration_ms, summary.output_shape.0, summary.output_shape.1
        );

        Ok(PipelineResult::succeeded(
            Some(self.config.output_path.display().to_string()),
            summary,
        ))
    }

    /// Read the four source files named by the configuration.
    pub fn load_sources(&self) -> Result<SourceRelations> {
        let files = [
            (AKAS_TABLE, &self.config.sources.akas),
            (BASICS_TABLE, &self.config.sources.basics),
            (RATINGS_TABLE, &self.config.sources.ratings),
            (NAMES_TABLE, &self.config.sources.names),
        ];

        let mut loaded = Vec::with_capacity(files.len());
        for (i, (table, file)) in files.iter().enumerate() {
            let path = self.config.source_path(file);
            self.report_progress(ProgressUpdate::for_table(
                PipelineStage::Loading,
                *table,
                i,
                files.len(),
                format!("Loading {}", path.display()),
            ));
            loaded.push(self.loader.load(&path, *table).context("Loading stage")?);
        }

        let mut loaded = loaded.into_iter();
        match (loaded.next(), loaded.next(), loaded.next(), loaded.next()) {
            (Some(akas), Some(basics), Some(ratings), Some(names)) => Ok(SourceRelations {
                akas,
                basics,
                ratings,
                names,
            }),
            _ => Err(PrunerError::Internal(
                "expected four loaded tables".to_string(),
            )),
        }
    }

    /// Run every in-memory stage on already loaded relations.
    ///
    /// Stages: explode list columns, filter, rename the title identifiers to
    /// the key column, validate keys, join.
    pub fn combine(&self, sources: SourceRelations) -> Result<CombinedRelation> {
        let mut summary = PipelineSummary::new();
        let key = self.config.key_column.as_str();
        let SourceRelations {
            akas,
            basics,
            ratings,
            names,
        } = sources;
        for relation in [&akas, &basics, &ratings, &names] {
            summary.add_action(PipelineAction::new(
                ActionType::Loaded,
                relation.name(),
                "source rows",
                relation.height(),
                relation.height(),
            ));
        }

        // Step 1: explode list-valued columns
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Exploding,
            0.0,
            "Exploding list columns...",
        ));
        let basics = self.explode(&basics, GENRES, &mut summary)?;
        let names = self.explode(&names, KNOWN_FOR_TITLES, &mut summary)?;
        let names = self.explode(&names, PRIMARY_PROFESSION, &mut summary)?;

        // Step 2: filter
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Filtering,
            0.0,
            "Filtering tables...",
        ));
        let akas = self.filter(
            &akas,
            MemberOf::new(REGION, self.config.regions.clone()),
            &mut summary,
        )?;
        let basics = self.filter(
            &basics,
            MemberOf::new(TITLE_TYPE, self.config.title_types.clone()),
            &mut summary,
        )?;
        let professions = MemberOf::new(PRIMARY_PROFESSION, self.config.professions.clone());
        let filtered_names = RelationFilter::retain_by_key(&names, PERSON_ID, &professions)
            .context("Filtering stage")?;
        summary.add_action(PipelineAction::new(
            ActionType::Filtered,
            names.name(),
            format!("people with a {PRIMARY_PROFESSION} in {:?}", professions.allowed),
            names.height(),
            filtered_names.height(),
        ));
        let names = filtered_names;

        // Step 3: one name for the title identifier everywhere
        let akas = self.rename(akas, TITLE_ID, &mut summary)?;
        let names = self.rename(names, KNOWN_FOR_TITLES, &mut summary)?;

        // Step 4: key validation, before any join
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Validating,
            0.0,
            format!("Validating '{key}' keys..."),
        ));
        let names = self.validate_keys(names, &mut summary)?;
        let basics = self.validate_keys(basics, &mut summary)?;
        let akas = self.validate_keys(akas, &mut summary)?;
        let ratings = self.validate_keys(ratings, &mut summary)?;

        // Step 5: join
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Joining,
            0.0,
            format!("Joining on '{key}'..."),
        ));
        let inputs = [&names, &basics, &akas, &ratings];
        RelationJoiner::check_schemas(&inputs, key).context("Joining stage")?;
        let expected_rows = RelationJoiner::expected_row_count(&inputs, key)?;
        let joined = RelationJoiner::join_all(&inputs, key).context("Joining stage")?;
        if joined.height() != expected_rows {
            return Err(PrunerError::Internal(format!(
                "join produced {} rows but per-key multiplicities give {}",
                joined.height(),
                expected_rows
            )));
        }
        summary.add_action(PipelineAction::new(
            ActionType::Joined,
            joined.name(),
            format!("inner join on {key}"),
            names.height(),
            joined.height(),
        ));
        summary.expected_rows = expected_rows;

        let relation = match self.config.multiplicity {
            JoinMultiplicity::Preserve => joined,
            JoinMultiplicity::DistinctRows => {
                let distinct = joined.distinct();
                summary.add_action(PipelineAction::new(
                    ActionType::DuplicatesRemoved,
                    joined.name(),
                    "repeated output rows",
                    joined.height(),
                    distinct.height(),
                ));
                distinct
            }
        };
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Joining,
            1.0,
            format!("Joined {} rows", relation.height()),
        ));

        summary.output_shape = relation.shape();
        Ok(CombinedRelation {
            relation: relation.with_name("us.movies.actors"),
            summary,
        })
    }

    fn explode(
        &self,
        relation: &Relation,
        column: &str,
        summary: &mut PipelineSummary,
    ) -> Result<Relation> {
        let (exploded, stats) =
            ColumnExploder::explode_with_stats(relation, column, self.config.list_delimiter)
                .context("Exploding stage")?;
        summary.add_action(PipelineAction::new(
            ActionType::Exploded,
            relation.name(),
            column,
            stats.rows_before,
            stats.rows_after,
        ));
        Ok(exploded)
    }

    fn filter(
        &self,
        relation: &Relation,
        predicate: MemberOf,
        summary: &mut PipelineSummary,
    ) -> Result<Relation> {
        let filtered = RelationFilter::retain(relation, &predicate).context("Filtering stage")?;
        summary.add_action(PipelineAction::new(
            ActionType::Filtered,
            relation.name(),
            format!("{} in {:?}", predicate.column, predicate.allowed),
            relation.height(),
            filtered.height(),
        ));
        Ok(filtered)
    }

    fn rename(
        &self,
        relation: Relation,
        column: &str,
        summary: &mut PipelineSummary,
    ) -> Result<Relation> {
        let key = &self.config.key_column;
        let rows = relation.height();
        let table = relation.name().to_string();
        let renamed = relation.rename_column(column, key)?;
        summary.add_action(PipelineAction::new(
            ActionType::ColumnRenamed,
            table,
            format!("{column} -> {key}"),
            rows,
            rows,
        ));
        Ok(renamed)
    }

    /// Check the key column; drop malformed rows or abort, per configuration.
    fn validate_keys(&self, relation: Relation, summary: &mut PipelineSummary) -> Result<Relation> {
        let key = &self.config.key_column;
        let report = self.validator.validate(&relation, key)?;
        summary.key_reports.push(report.clone());
        if report.all_well_formed() {
            return Ok(relation);
        }
        if !self.config.remediate_malformed_keys {
            return report.ensure_valid().map(|_| relation);
        }

        let cleaned = self.validator.retain_well_formed(&relation, key)?;
        let dropped = relation.height() - cleaned.height();
        let kind = if report.only_missing() {
            "missing"
        } else {
            "malformed"
        };
        warn!(
            "Dropped {} row(s) of '{}' with {} '{}' keys: from {} to {} rows",
            dropped,
            relation.name(),
            kind,
            key,
            relation.height(),
            cleaned.height()
        );
        summary.add_warning(format!(
            "{}: dropped {dropped} row(s) with {kind} '{key}' keys, most frequent {:?}",
            relation.name(),
            report.top_offenders
        ));
        summary.add_action(PipelineAction::new(
            ActionType::RowsRemoved,
            relation.name(),
            format!("{kind} {key}"),
            relation.height(),
            cleaned.height(),
        ));
        summary.rows_dropped += dropped;

        // the remediated relation must pass before it may be joined
        let recheck: KeyReport = self.validator.validate(&cleaned, key)?;
        recheck.ensure_valid()?;
        Ok(cleaned)
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }
}

/// Builder for [`TitlePipeline`].
#[derive(Default)]
pub struct TitlePipelineBuilder {
    config: Option<PipelineConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(TitlePipelineBuilder: Send);

impl TitlePipelineBuilder {
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a custom progress reporter.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<TitlePipeline, crate::config::ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(TitlePipeline {
            loader: TableLoader::new(config.load.clone()),
            writer: TableWriter::new(config.load.clone()),
            validator: KeyValidator::title_ids(config.sample_offenders)
                .with_missing_token(config.load.missing_token()),
            progress_reporter: self.progress_reporter,
            config,
        })
    }
}
