//! Shared types, error model, and configuration for termgraph.
//!
//! This crate is the foundation depended on by all other termgraph crates.
//! It provides:
//! - [`TermGraphError`], the unified error type
//! - CSV record types ([`ConceptRecord`], [`RelationshipRecord`]) and [`DomainSource`]
//! - Configuration ([`AppConfig`], [`LookupConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BuildConfig, ConceptSourceEntry, LookupConfig, ResolveFilesConfig,
    SnowstormConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{Result, TermGraphError};
pub use types::{CONCEPT_CSV_HEADER, ConceptRecord, DomainSource, RELATIONSHIP_CSV_HEADER, RelationshipRecord};
