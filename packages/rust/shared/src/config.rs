//! Application configuration for termgraph.
//!
//! User config lives at `~/.termgraph/termgraph.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, TermGraphError};
use crate::types::DomainSource;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "termgraph.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".termgraph";

// ---------------------------------------------------------------------------
// Config structs (matching termgraph.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Terminology server settings.
    #[serde(default)]
    pub snowstorm: SnowstormConfig,

    /// Inputs and outputs of the CSV build.
    #[serde(default)]
    pub build: BuildConfig,

    /// Inputs and outputs of ID resolution.
    #[serde(default)]
    pub resolve: ResolveFilesConfig,

    /// Extra relationship typeId → label entries.
    #[serde(default)]
    pub relationship_types: BTreeMap<String, String>,

    /// Extra characteristicTypeId → label entries.
    #[serde(default)]
    pub characteristic_types: BTreeMap<String, String>,
}

/// `[snowstorm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnowstormConfig {
    /// Server root, e.g. `http://localhost:8080`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Branch path queried, e.g. `MAIN` or `MAIN/SNOMEDCT-KR`.
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Maximum number of IDs sent in one lookup.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Pause between top-level chunks, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Representation form (`inferred` or `stated`).
    #[serde(default = "default_form")]
    pub form: String,

    /// Ask the server to compute leaf flags.
    #[serde(default)]
    pub include_leaf_flag: bool,

    /// `Accept-Language` header sent with lookups.
    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SnowstormConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            branch: default_branch(),
            chunk_size: default_chunk_size(),
            delay_ms: default_delay_ms(),
            form: default_form(),
            include_leaf_flag: false,
            accept_language: default_accept_language(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".into()
}
fn default_branch() -> String {
    "MAIN".into()
}
fn default_chunk_size() -> usize {
    50
}
fn default_delay_ms() -> u64 {
    50
}
fn default_form() -> String {
    "inferred".into()
}
fn default_accept_language() -> String {
    "en".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[build]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Directory that relative paths below are resolved against.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Tab-separated relationship export.
    #[serde(default = "default_relationships_file")]
    pub relationships_file: PathBuf,

    /// Merged concept CSV.
    #[serde(default = "default_concepts_out")]
    pub concepts_out: PathBuf,

    /// Relationship CSV.
    #[serde(default = "default_relationships_out")]
    pub relationships_out: PathBuf,

    /// Per-domain concept exports, merged in this order.
    #[serde(default = "default_concept_sources")]
    pub concept_sources: Vec<ConceptSourceEntry>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            relationships_file: default_relationships_file(),
            concepts_out: default_concepts_out(),
            relationships_out: default_relationships_out(),
            concept_sources: default_concept_sources(),
        }
    }
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_relationships_file() -> PathBuf {
    PathBuf::from("rels_core.txt")
}
fn default_concepts_out() -> PathBuf {
    PathBuf::from("concepts.csv")
}
fn default_relationships_out() -> PathBuf {
    PathBuf::from("relationships.csv")
}
fn default_concept_sources() -> Vec<ConceptSourceEntry> {
    [
        ("BodyStructure", "bs.json"),
        ("ClinicalFinding", "cf.json"),
        ("Procedure", "pr.json"),
    ]
    .into_iter()
    .map(|(label, path)| ConceptSourceEntry {
        label: label.into(),
        path: PathBuf::from(path),
    })
    .collect()
}

/// `[[build.concept_sources]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptSourceEntry {
    /// Domain label, used as fallback semantic tag and in `domainLabel`.
    pub label: String,
    /// JSON export for this domain.
    pub path: PathBuf,
}

impl BuildConfig {
    /// Resolve a configured path against `base_dir` unless it is absolute.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Concept sources with their paths resolved, in configured order.
    pub fn domain_sources(&self) -> Vec<DomainSource> {
        self.concept_sources
            .iter()
            .map(|entry| DomainSource::new(&entry.label, self.resolve_path(&entry.path)))
            .collect()
    }
}

/// `[resolve]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveFilesConfig {
    /// One concept ID per line.
    #[serde(default = "default_resolve_input")]
    pub input: PathBuf,

    /// JSON array of resolved concepts.
    #[serde(default = "default_resolve_output")]
    pub output: PathBuf,

    /// IDs the server rejected, one per line.
    #[serde(default = "default_not_found")]
    pub not_found: PathBuf,
}

impl Default for ResolveFilesConfig {
    fn default() -> Self {
        Self {
            input: default_resolve_input(),
            output: default_resolve_output(),
            not_found: default_not_found(),
        }
    }
}

fn default_resolve_input() -> PathBuf {
    PathBuf::from("missing_ids.txt")
}
fn default_resolve_output() -> PathBuf {
    PathBuf::from("concepts.json")
}
fn default_not_found() -> PathBuf {
    PathBuf::from("not_found.txt")
}

// ---------------------------------------------------------------------------
// Lookup config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime lookup configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// Server root URL.
    pub base_url: String,
    /// Branch path.
    pub branch: String,
    /// Maximum IDs per request.
    pub chunk_size: usize,
    /// Pause between chunks in ms.
    pub delay_ms: u64,
    /// Representation form selector.
    pub form: String,
    /// Leaf-flag toggle.
    pub include_leaf_flag: bool,
    /// `Accept-Language` header value.
    pub accept_language: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl From<&AppConfig> for LookupConfig {
    fn from(config: &AppConfig) -> Self {
        let s = &config.snowstorm;
        Self {
            base_url: s.base_url.clone(),
            branch: s.branch.clone(),
            chunk_size: s.chunk_size,
            delay_ms: s.delay_ms,
            form: s.form.clone(),
            include_leaf_flag: s.include_leaf_flag,
            accept_language: s.accept_language.clone(),
            timeout_secs: s.timeout_secs,
        }
    }
}

impl LookupConfig {
    /// Check option values before any request is made.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(TermGraphError::validation("chunk_size must be at least 1"));
        }
        let url = Url::parse(&self.base_url).map_err(|e| {
            TermGraphError::validation(format!("invalid base_url '{}': {e}", self.base_url))
        })?;
        if url.cannot_be_a_base() {
            return Err(TermGraphError::validation(format!(
                "base_url '{}' cannot be used as a base URL",
                self.base_url
            )));
        }
        if self.branch.trim().is_empty() {
            return Err(TermGraphError::validation("branch must not be empty"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.termgraph/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TermGraphError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.termgraph/termgraph.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TermGraphError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| TermGraphError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TermGraphError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TermGraphError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TermGraphError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
