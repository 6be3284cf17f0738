//! End-to-end `build` pipeline: concept exports + relationship dump → graph-load CSVs.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use termgraph_concepts::build_concepts;
use termgraph_relationships::{CodeTables, TranscodeStats, write_relationships_csv};
use termgraph_shared::{AppConfig, DomainSource, Result, TermGraphError};

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each top-level lookup chunk is resolved.
    fn chunk_resolved(&self, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn finish(&self);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn chunk_resolved(&self, _current: usize, _total: usize) {}
    fn finish(&self) {}
}

/// Inputs and outputs of the `build` pipeline.
#[derive(Debug, Clone)]
pub struct BuildCsvsConfig {
    /// Per-domain concept exports, merged in order.
    pub sources: Vec<DomainSource>,
    /// Tab-separated relationship export.
    pub relationships_file: PathBuf,
    /// Concept CSV destination.
    pub concepts_out: PathBuf,
    /// Relationship CSV destination.
    pub relationships_out: PathBuf,
    /// Type code tables.
    pub tables: CodeTables,
}

impl From<&AppConfig> for BuildCsvsConfig {
    fn from(config: &AppConfig) -> Self {
        let build = &config.build;
        Self {
            sources: build.domain_sources(),
            relationships_file: build.resolve_path(&build.relationships_file),
            concepts_out: build.resolve_path(&build.concepts_out),
            relationships_out: build.resolve_path(&build.relationships_out),
            tables: CodeTables::with_overrides(
                &config.relationship_types,
                &config.characteristic_types,
            ),
        }
    }
}

/// Result of writing the concept CSV.
#[derive(Debug, Clone)]
pub struct ConceptsReport {
    /// Rows written.
    pub rows: usize,
    /// Domain sources that were skipped because their file is missing.
    pub missing_sources: Vec<DomainSource>,
    /// Destination path.
    pub path: PathBuf,
}

/// Result of the full `build` pipeline.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub concepts: ConceptsReport,
    pub relationships: TranscodeStats,
    pub relationships_path: PathBuf,
    pub elapsed: Duration,
}

/// Merge concept exports and write the concept CSV.
#[instrument(skip_all, fields(out = %config.concepts_out.display()))]
pub fn build_concept_csv(
    config: &BuildCsvsConfig,
    progress: &dyn ProgressReporter,
) -> Result<ConceptsReport> {
    progress.phase("Merging concept exports");
    let build = build_concepts(&config.sources)?;
    for source in &build.missing_sources {
        warn!(domain = %source.label, path = %source.path.display(), "domain skipped");
    }

    progress.phase("Writing concepts CSV");
    ensure_parent(&config.concepts_out)?;
    let rows = termgraph_concepts::write_concepts_csv(&build.records, &config.concepts_out)?;

    Ok(ConceptsReport {
        rows,
        missing_sources: build.missing_sources,
        path: config.concepts_out.clone(),
    })
}

/// Transcode the relationship export into the relationship CSV.
#[instrument(skip_all, fields(out = %config.relationships_out.display()))]
pub fn build_relationship_csv(
    config: &BuildCsvsConfig,
    progress: &dyn ProgressReporter,
) -> Result<TranscodeStats> {
    progress.phase("Transcoding relationships");
    ensure_parent(&config.relationships_out)?;
    write_relationships_csv(
        &config.relationships_file,
        &config.relationships_out,
        &config.tables,
    )
}

/// Run the full `build` pipeline.
///
/// 1. Merge concept exports → concepts CSV
/// 2. Transcode relationships → relationships CSV
pub fn build_csvs(config: &BuildCsvsConfig, progress: &dyn ProgressReporter) -> Result<BuildReport> {
    let start = Instant::now();
    info!(
        sources = config.sources.len(),
        relationships = %config.relationships_file.display(),
        "starting build"
    );

    let concepts = build_concept_csv(config, progress)?;
    let relationships = build_relationship_csv(config, progress)?;
    progress.finish();

    Ok(BuildReport {
        concepts,
        relationships,
        relationships_path: config.relationships_out.clone(),
        elapsed: start.elapsed(),
    })
}

/// Create the parent directory of an output file if needed.
pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| TermGraphError::io(parent, e))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termgraph_shared::ConceptSourceEntry;

    const FIXTURES: &str = "../../../fixtures";

    fn fixture_config(out_dir: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.build.base_dir = PathBuf::from(FIXTURES);
        config.build.relationships_file = PathBuf::from("relationships/rels_core.txt");
        config.build.concepts_out = out_dir.join("concepts.csv");
        config.build.relationships_out = out_dir.join("nested/relationships.csv");
        config.build.concept_sources = vec![
            ConceptSourceEntry {
                label: "BodyStructure".into(),
                path: PathBuf::from("concepts/bs.json"),
            },
            ConceptSourceEntry {
                label: "ClinicalFinding".into(),
                path: PathBuf::from("concepts/cf.json"),
            },
            ConceptSourceEntry {
                label: "Procedure".into(),
                path: PathBuf::from("concepts/pr.json"),
            },
            ConceptSourceEntry {
                label: "Substance".into(),
                path: PathBuf::from("concepts/sub.json"),
            },
        ];
        config
    }

    #[test]
    fn config_resolves_paths_against_base_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = BuildCsvsConfig::from(&fixture_config(dir.path()));
        assert_eq!(
            config.relationships_file,
            Path::new(FIXTURES).join("relationships/rels_core.txt")
        );
        assert_eq!(config.sources[0].path, Path::new(FIXTURES).join("concepts/bs.json"));
        // Absolute outputs are kept as-is.
        assert_eq!(config.concepts_out, dir.path().join("concepts.csv"));
    }

    #[test]
    fn build_writes_both_csvs() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = BuildCsvsConfig::from(&fixture_config(dir.path()));

        let report = build_csvs(&config, &SilentProgress).unwrap();

        // bs.json (2) + cf.json (2) + pr.json (2, one shared with bs.json)
        assert_eq!(report.concepts.rows, 5);
        assert_eq!(report.concepts.missing_sources.len(), 1);
        assert_eq!(report.concepts.missing_sources[0].label, "Substance");
        assert_eq!(report.relationships.written, 5);
        assert_eq!(report.relationships.inactive, 1);

        let concepts = std::fs::read_to_string(dir.path().join("concepts.csv")).unwrap();
        assert!(concepts.starts_with("conceptId,active,"));
        assert!(concepts.contains("80891009,true,PRIMITIVE"));
        assert!(concepts.contains("BodyStructure|Procedure"));

        let rels = std::fs::read_to_string(dir.path().join("nested/relationships.csv")).unwrap();
        assert_eq!(rels.lines().count(), 6);
        assert!(rels.contains(",IS_A,"));
    }

    #[test]
    fn missing_relationship_file_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut app = fixture_config(dir.path());
        app.build.relationships_file = PathBuf::from("relationships/absent.txt");
        let config = BuildCsvsConfig::from(&app);

        let err = build_relationship_csv(&config, &SilentProgress).unwrap_err();
        assert!(matches!(err, TermGraphError::Io { .. }));
    }

    #[test]
    fn custom_relationship_types_apply() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut app = fixture_config(dir.path());
        app.relationship_types
            .insert("260686004".into(), "METHOD".into());
        let config = BuildCsvsConfig::from(&app);

        build_relationship_csv(&config, &SilentProgress).unwrap();
        let rels = std::fs::read_to_string(dir.path().join("nested/relationships.csv")).unwrap();
        assert!(rels.contains(",METHOD,"));
        assert!(!rels.contains(",ATTRIBUTE,"));
    }
}
