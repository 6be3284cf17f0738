//! Record types written to the graph-load CSVs.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Serialize, Serializer};

/// Column order of the concept CSV.
pub const CONCEPT_CSV_HEADER: [&str; 9] = [
    "conceptId",
    "active",
    "definitionStatus",
    "moduleId",
    "effectiveTime",
    "fsn",
    "pt",
    "semanticTag",
    "domainLabel",
];

/// Column order of the relationship CSV.
pub const RELATIONSHIP_CSV_HEADER: [&str; 10] = [
    "relId",
    "sourceId",
    "destId",
    "typeId",
    "relType",
    "groupId",
    "charType",
    "moduleId",
    "effectiveTime",
    "modifierId",
];

/// Separator used when joining domain labels into one CSV field.
pub const DOMAIN_LABEL_SEPARATOR: &str = "|";

// ---------------------------------------------------------------------------
// DomainSource
// ---------------------------------------------------------------------------

/// One per-domain concept export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSource {
    /// Domain label (e.g. `ClinicalFinding`).
    pub label: String,
    /// Path to the JSON export.
    pub path: PathBuf,
}

impl DomainSource {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ConceptRecord
// ---------------------------------------------------------------------------

/// A normalized concept, one row of `concepts.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptRecord {
    pub concept_id: String,
    pub active: bool,
    pub definition_status: Option<String>,
    pub module_id: Option<String>,
    pub effective_time: Option<String>,
    pub fsn: Option<String>,
    pub pt: Option<String>,
    pub semantic_tag: String,
    /// Every domain the concept was found in. Serialized sorted and `|`-joined.
    #[serde(rename = "domainLabel", serialize_with = "join_labels")]
    pub domain_labels: BTreeSet<String>,
}

impl ConceptRecord {
    /// The `domainLabel` column value.
    pub fn domain_label(&self) -> String {
        self.domain_labels
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(DOMAIN_LABEL_SEPARATOR)
    }
}

fn join_labels<S: Serializer>(
    labels: &BTreeSet<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let joined = labels
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(DOMAIN_LABEL_SEPARATOR);
    serializer.serialize_str(&joined)
}

// ---------------------------------------------------------------------------
// RelationshipRecord
// ---------------------------------------------------------------------------

/// An active relationship, one row of `relationships.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipRecord {
    #[serde(rename = "relId")]
    pub rel_id: String,
    #[serde(rename = "sourceId")]
    pub source_id: String,
    #[serde(rename = "destId")]
    pub dest_id: String,
    #[serde(rename = "typeId")]
    pub type_id: String,
    #[serde(rename = "relType")]
    pub rel_type: String,
    #[serde(rename = "groupId")]
    pub group_id: String,
    #[serde(rename = "charType")]
    pub char_type: String,
    #[serde(rename = "moduleId")]
    pub module_id: String,
    #[serde(rename = "effectiveTime")]
    pub effective_time: String,
    #[serde(rename = "modifierId")]
    pub modifier_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(labels: &[&str]) -> ConceptRecord {
        ConceptRecord {
            concept_id: "80891009".into(),
            active: true,
            definition_status: Some("PRIMITIVE".into()),
            module_id: Some("900000000000207008".into()),
            effective_time: None,
            fsn: Some("Heart structure (body structure)".into()),
            pt: Some("Heart structure".into()),
            semantic_tag: "body structure".into(),
            domain_labels: labels.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn domain_label_is_sorted_and_joined() {
        let rec = record(&["Procedure", "BodyStructure"]);
        assert_eq!(rec.domain_label(), "BodyStructure|Procedure");
    }

    #[test]
    fn concept_csv_row_matches_header() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(record(&["BodyStructure"])).expect("serialize");
        let out = String::from_utf8(writer.into_inner().expect("flush")).expect("utf8");

        let mut lines = out.lines();
        assert_eq!(lines.next(), Some(CONCEPT_CSV_HEADER.join(",").as_str()));
        assert_eq!(
            lines.next(),
            Some(
                "80891009,true,PRIMITIVE,900000000000207008,,Heart structure (body structure),\
                 Heart structure,body structure,BodyStructure"
            )
        );
    }

    #[test]
    fn relationship_csv_header_order() {
        let rel = RelationshipRecord {
            rel_id: "1".into(),
            source_id: "2".into(),
            dest_id: "3".into(),
            type_id: "116680003".into(),
            rel_type: "IS_A".into(),
            group_id: "0".into(),
            char_type: "INFERRED".into(),
            module_id: "4".into(),
            effective_time: "20240101".into(),
            modifier_id: "5".into(),
        };
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(&rel).expect("serialize");
        let out = String::from_utf8(writer.into_inner().expect("flush")).expect("utf8");
        assert!(out.starts_with(&RELATIONSHIP_CSV_HEADER.join(",")));
    }
}
