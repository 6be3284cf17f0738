//! Code → label tables used when transcoding relationships.

use std::collections::{BTreeMap, HashMap};

/// Label for relationship types not present in the table.
pub const DEFAULT_REL_TYPE: &str = "ATTRIBUTE";

/// Built-in relationship typeId → graph edge label.
pub const RELATIONSHIP_TYPES: &[(&str, &str)] = &[
    ("116680003", "IS_A"),
    ("363698007", "FINDING_SITE"),
    ("405813007", "PROC_SITE_DIR"),
    ("363589002", "ASSOCIATED_PROCEDURE"),
    ("116676008", "ASSOCIATED_MORPHOLOGY"),
    ("424226004", "USING_DEVICE"),
    ("105904001", "OCCURRENCE"),
];

/// Built-in characteristicTypeId → readable label.
pub const CHARACTERISTIC_TYPES: &[(&str, &str)] = &[
    ("900000000000011006", "INFERRED"),
    ("900000000000010007", "STATED"),
    ("900000000000227009", "ADDITIONAL"),
];

/// Lookup tables for relationship and characteristic type codes.
#[derive(Debug, Clone)]
pub struct CodeTables {
    rel_types: HashMap<String, String>,
    char_types: HashMap<String, String>,
}

impl Default for CodeTables {
    fn default() -> Self {
        Self {
            rel_types: to_map(RELATIONSHIP_TYPES),
            char_types: to_map(CHARACTERISTIC_TYPES),
        }
    }
}

impl CodeTables {
    /// Built-in tables extended (or overridden) by configured entries.
    pub fn with_overrides(
        rel_types: &BTreeMap<String, String>,
        char_types: &BTreeMap<String, String>,
    ) -> Self {
        let mut tables = Self::default();
        tables
            .rel_types
            .extend(rel_types.iter().map(|(k, v)| (k.clone(), v.clone())));
        tables
            .char_types
            .extend(char_types.iter().map(|(k, v)| (k.clone(), v.clone())));
        tables
    }

    /// Edge label for a relationship typeId; unknown codes become `ATTRIBUTE`.
    pub fn rel_type<'a>(&'a self, type_id: &str) -> &'a str {
        self.rel_types
            .get(type_id)
            .map(String::as_str)
            .unwrap_or(DEFAULT_REL_TYPE)
    }

    /// Label for a characteristicTypeId; unknown codes pass through unchanged.
    pub fn char_type<'a>(&'a self, char_type_id: &'a str) -> &'a str {
        self.char_types
            .get(char_type_id)
            .map(String::as_str)
            .unwrap_or(char_type_id)
    }
}

fn to_map(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(code, label)| (code.to_string(), label.to_string()))
        .collect()
}
