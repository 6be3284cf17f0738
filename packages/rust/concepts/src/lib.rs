//! Concept merging: per-domain JSON exports → one deduplicated concept CSV.
//!
//! Each domain export is normalized into [`ConceptRecord`]s, then merged by
//! `conceptId`. The first occurrence of an identifier keeps its fields; later
//! occurrences only contribute their domain label.

mod loader;

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use termgraph_shared::{CONCEPT_CSV_HEADER, ConceptRecord, DomainSource, Result, TermGraphError};
use tracing::{debug, info, instrument, warn};

pub use loader::{parse_concepts, semantic_tag_from_fsn};

// ---------------------------------------------------------------------------
// ConceptMerger
// ---------------------------------------------------------------------------

/// Accumulates concept records keyed by identifier, preserving first-seen order.
#[derive(Debug, Default)]
pub struct ConceptMerger {
    records: Vec<ConceptRecord>,
    index: HashMap<String, usize>,
}

impl ConceptMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one record. Returns `true` if the identifier was new.
    pub fn add(&mut self, record: ConceptRecord) -> bool {
        match self.index.get(&record.concept_id) {
            Some(&pos) => {
                self.records[pos].domain_labels.extend(record.domain_labels);
                false
            }
            None => {
                self.index.insert(record.concept_id.clone(), self.records.len());
                self.records.push(record);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Merged records in first-seen order.
    pub fn into_records(self) -> Vec<ConceptRecord> {
        self.records
    }
}

// ---------------------------------------------------------------------------
// Loading and merging
// ---------------------------------------------------------------------------

/// Outcome of merging all domain exports.
#[derive(Debug)]
pub struct ConceptBuild {
    /// One record per distinct concept.
    pub records: Vec<ConceptRecord>,
    /// Sources whose file did not exist.
    pub missing_sources: Vec<DomainSource>,
}

/// Load one domain export from disk.
pub fn load_concepts(path: &Path, domain_label: &str) -> Result<Vec<ConceptRecord>> {
    let content = std::fs::read_to_string(path).map_err(|e| TermGraphError::io(path, e))?;
    parse_concepts(&content, domain_label, &path.display().to_string())
}

/// Load and merge every domain source, in order.
///
/// Missing files are logged and skipped; any other read or parse failure aborts.
#[instrument(skip_all, fields(sources = sources.len()))]
pub fn build_concepts(sources: &[DomainSource]) -> Result<ConceptBuild> {
    let mut merger = ConceptMerger::new();
    let mut missing_sources = Vec::new();

    for source in sources {
        if !source.path.exists() {
            warn!(path = %source.path.display(), domain = %source.label, "missing concept file, skipping");
            missing_sources.push(source.clone());
            continue;
        }

        let records = load_concepts(&source.path, &source.label)?;
        let loaded = records.len();
        let mut added = 0;
        for record in records {
            if merger.add(record) {
                added += 1;
            }
        }
        debug!(domain = %source.label, loaded, added, "domain merged");
    }

    info!(
        concepts = merger.len(),
        missing = missing_sources.len(),
        "concept sources merged"
    );

    Ok(ConceptBuild {
        records: merger.into_records(),
        missing_sources,
    })
}

// ---------------------------------------------------------------------------
// CSV output
// ---------------------------------------------------------------------------

/// Write concept rows (with header) to any writer. Returns the row count.
pub fn write_concepts<W: Write>(records: &[ConceptRecord], out: W) -> Result<usize> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(CONCEPT_CSV_HEADER)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .flush()
        .map_err(|e| TermGraphError::Csv(format!("flush failed: {e}")))?;
    Ok(records.len())
}

/// Write `concepts.csv`. Returns the row count.
pub fn write_concepts_csv(records: &[ConceptRecord], out_path: &Path) -> Result<usize> {
    let file = std::fs::File::create(out_path).map_err(|e| TermGraphError::io(out_path, e))?;
    let rows = write_concepts(records, file)?;
    info!(path = %out_path.display(), rows, "wrote concepts csv");
    Ok(rows)
}
