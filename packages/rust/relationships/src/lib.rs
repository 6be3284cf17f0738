//! Relationship transcoding: RF2-style tab-separated export → relationship CSV.
//!
//! The input is streamed line by line. Only well-formed, active rows are
//! written; type codes are mapped to graph edge labels via [`CodeTables`].

mod tables;

use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use termgraph_shared::{RELATIONSHIP_CSV_HEADER, RelationshipRecord, Result, TermGraphError};
use tracing::{debug, info, instrument};

pub use tables::{CHARACTERISTIC_TYPES, CodeTables, DEFAULT_REL_TYPE, RELATIONSHIP_TYPES};

/// Value of the `active` column for rows that are kept.
const ACTIVE: &str = "1";

// ---------------------------------------------------------------------------
// Line parsing
// ---------------------------------------------------------------------------

/// Why a line did not produce a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// Blank or header line.
    Skipped,
    /// Fewer than ten fields.
    Malformed,
    /// `active` column is not `1`.
    Inactive,
}

/// Parse one input line into a relationship row.
pub fn parse_line(line: &str, tables: &CodeTables) -> std::result::Result<RelationshipRecord, LineOutcome> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("id\t") {
        return Err(LineOutcome::Skipped);
    }

    let parts: Vec<&str> = line.split('\t').collect();
    let [rel_id, effective_time, active, module_id, source_id, dest_id, group_id, type_id, char_type_id, modifier_id, ..] =
        parts.as_slice()
    else {
        return Err(LineOutcome::Malformed);
    };

    if *active != ACTIVE {
        return Err(LineOutcome::Inactive);
    }

    Ok(RelationshipRecord {
        rel_id: rel_id.to_string(),
        source_id: source_id.to_string(),
        dest_id: dest_id.to_string(),
        type_id: type_id.to_string(),
        rel_type: tables.rel_type(type_id).to_string(),
        group_id: group_id.to_string(),
        char_type: tables.char_type(char_type_id).to_string(),
        module_id: module_id.to_string(),
        effective_time: effective_time.to_string(),
        modifier_id: modifier_id.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Streaming transcoder
// ---------------------------------------------------------------------------

/// Counters from one transcode run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscodeStats {
    /// Rows written to the CSV.
    pub written: usize,
    /// Rows dropped because they were inactive.
    pub inactive: usize,
    /// Rows dropped because they had too few fields.
    pub malformed: usize,
    /// Blank and header lines.
    pub skipped: usize,
}

/// Stream `input` into CSV rows on `out`, header first.
pub fn transcode<R: BufRead, W: Write>(
    input: R,
    out: W,
    tables: &CodeTables,
) -> Result<TranscodeStats> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(RELATIONSHIP_CSV_HEADER)?;

    let mut stats = TranscodeStats::default();
    for (lineno, line) in input.lines().enumerate() {
        let line = line.map_err(|e| TermGraphError::parse(format!("line {}: {e}", lineno + 1)))?;
        match parse_line(&line, tables) {
            Ok(record) => {
                writer.serialize(&record)?;
                stats.written += 1;
            }
            Err(LineOutcome::Skipped) => stats.skipped += 1,
            Err(LineOutcome::Inactive) => stats.inactive += 1,
            Err(LineOutcome::Malformed) => {
                debug!(line = lineno + 1, "malformed relationship row dropped");
                stats.malformed += 1;
            }
        }
    }

    writer
        .flush()
        .map_err(|e| TermGraphError::Csv(format!("flush failed: {e}")))?;
    Ok(stats)
}

/// Transcode `in_path` into `relationships.csv` at `out_path`.
#[instrument(skip_all, fields(input = %in_path.display()))]
pub fn write_relationships_csv(
    in_path: &Path,
    out_path: &Path,
    tables: &CodeTables,
) -> Result<TranscodeStats> {
    let input = std::fs::File::open(in_path).map_err(|e| TermGraphError::io(in_path, e))?;
    let output = std::fs::File::create(out_path).map_err(|e| TermGraphError::io(out_path, e))?;

    let stats = transcode(BufReader::new(input), output, tables)?;

    info!(
        path = %out_path.display(),
        rows = stats.written,
        inactive = stats.inactive,
        malformed = stats.malformed,
        "wrote relationships csv"
    );
    Ok(stats)
}
