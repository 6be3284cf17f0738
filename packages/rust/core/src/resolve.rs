//! `resolve` pipeline: ID list → Snowstorm → `concepts.json` + `not_found.txt`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{info, instrument, warn};

use termgraph_resolver::{BatchResolver, ResolveOptions, SnowstormClient};
use termgraph_shared::{AppConfig, LookupConfig, Result, TermGraphError};

use crate::pipeline::{ProgressReporter, ensure_parent};

/// Configuration for the `resolve_ids` pipeline.
#[derive(Debug, Clone)]
pub struct ResolveIdsConfig {
    /// Server, branch and chunking settings.
    pub lookup: LookupConfig,
    /// One concept ID per line.
    pub input: PathBuf,
    /// Destination of the resolved concept array.
    pub output: PathBuf,
    /// Destination of rejected IDs (only written when there are any).
    pub not_found: PathBuf,
}

impl From<&AppConfig> for ResolveIdsConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            lookup: LookupConfig::from(config),
            input: config.resolve.input.clone(),
            output: config.resolve.output.clone(),
            not_found: config.resolve.not_found.clone(),
        }
    }
}

/// Result of the `resolve_ids` pipeline.
#[derive(Debug)]
pub struct ResolveReport {
    /// Distinct IDs read from the input.
    pub ids: usize,
    /// Concepts written to the output.
    pub resolved: usize,
    /// IDs written to the not-found file.
    pub unresolvable: usize,
    /// Lookup requests issued.
    pub requests: usize,
    /// Path of the resolved concept array.
    pub output: PathBuf,
    /// Path of the not-found file, if one was written.
    pub not_found: Option<PathBuf>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Parse an ID list: one per line, trimmed, blank lines ignored.
///
/// Repeated IDs are kept; each occurrence is looked up and reported.
pub fn parse_id_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read an ID list file.
pub fn read_id_list(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| TermGraphError::io(path, e))?;
    Ok(parse_id_list(&content))
}

/// Run the full `resolve` pipeline.
///
/// Outputs are only written once every chunk has been resolved; a fatal
/// lookup error leaves the filesystem untouched.
#[instrument(skip_all, fields(input = %config.input.display()))]
pub async fn resolve_ids(
    config: &ResolveIdsConfig,
    progress: &dyn ProgressReporter,
) -> Result<ResolveReport> {
    let start = Instant::now();

    progress.phase("Reading ID list");
    let ids = read_id_list(&config.input)?;
    info!(ids = ids.len(), url = %config.lookup.base_url, branch = %config.lookup.branch, "resolving concept ids");

    let client = SnowstormClient::new(&config.lookup)?;
    let resolver = BatchResolver::new(client, ResolveOptions::from(&config.lookup));

    progress.phase("Resolving concepts");
    let resolution = resolver
        .resolve_with_progress(&ids, |current, total| progress.chunk_resolved(current, total))
        .await?;

    progress.phase("Writing results");
    write_concepts_json(&config.output, &resolution.resolved)?;

    let not_found = if resolution.unresolvable.is_empty() {
        None
    } else {
        write_not_found(&config.not_found, &resolution.unresolvable)?;
        warn!(
            count = resolution.unresolvable.len(),
            path = %config.not_found.display(),
            "some ids could not be resolved"
        );
        Some(config.not_found.clone())
    };

    progress.finish();

    Ok(ResolveReport {
        ids: ids.len(),
        resolved: resolution.resolved.len(),
        unresolvable: resolution.unresolvable.len(),
        requests: resolution.requests,
        output: config.output.clone(),
        not_found,
        elapsed: start.elapsed(),
    })
}

/// Write the resolved concepts as a pretty-printed JSON array.
fn write_concepts_json(path: &Path, concepts: &[Value]) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(concepts)
        .map_err(|e| TermGraphError::parse(format!("failed to serialize concepts: {e}")))?;
    std::fs::write(path, json).map_err(|e| TermGraphError::io(path, e))?;
    info!(path = %path.display(), concepts = concepts.len(), "wrote concepts json");
    Ok(())
}

/// Write one ID per line.
fn write_not_found(path: &Path, ids: &[String]) -> Result<()> {
    ensure_parent(path)?;
    std::fs::write(path, ids.join("\n")).map_err(|e| TermGraphError::io(path, e))
}
