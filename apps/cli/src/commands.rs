//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use termgraph_core::pipeline::{self, BuildCsvsConfig, ProgressReporter};
use termgraph_core::resolve::{self, ResolveIdsConfig};
use termgraph_shared::{AppConfig, init_config, load_config, load_config_from};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// termgraph: SNOMED CT exports to graph-load CSVs.
#[derive(Parser)]
#[command(
    name = "termgraph",
    version,
    about = "Flatten SNOMED CT exports into graph-load CSVs and resolve concept IDs against Snowstorm.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.termgraph/termgraph.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Write both concepts.csv and relationships.csv.
    Build {
        #[command(flatten)]
        paths: BuildPaths,
    },

    /// Merge concept exports into concepts.csv only.
    Concepts {
        #[command(flatten)]
        paths: BuildPaths,
    },

    /// Transcode the relationship export into relationships.csv only.
    Relationships {
        #[command(flatten)]
        paths: BuildPaths,
    },

    /// Resolve a list of concept IDs against Snowstorm.
    Resolve {
        /// ID list, one per line.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Resolved concepts (JSON array).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Where to list IDs the server rejected.
        #[arg(long)]
        not_found: Option<PathBuf>,

        /// Snowstorm root URL.
        #[arg(long, env = "TERMGRAPH_BASE_URL")]
        base_url: Option<String>,

        /// Branch to query, e.g. MAIN or MAIN/SNOMEDCT-KR.
        #[arg(long)]
        branch: Option<String>,

        /// Maximum IDs per request.
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Pause between chunks in milliseconds.
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Path overrides shared by the build commands.
#[derive(clap::Args)]
pub(crate) struct BuildPaths {
    /// Directory relative paths are resolved against.
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Tab-separated relationship export.
    #[arg(long)]
    relationships_file: Option<PathBuf>,

    /// Concept CSV destination.
    #[arg(long)]
    concepts_out: Option<PathBuf>,

    /// Relationship CSV destination.
    #[arg(long)]
    relationships_out: Option<PathBuf>,
}

impl BuildPaths {
    fn apply(self, config: &mut AppConfig) {
        let build = &mut config.build;
        if let Some(dir) = self.base_dir {
            build.base_dir = dir;
        }
        if let Some(p) = self.relationships_file {
            build.relationships_file = p;
        }
        if let Some(p) = self.concepts_out {
            build.concepts_out = p;
        }
        if let Some(p) = self.relationships_out {
            build.relationships_out = p;
        }
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "termgraph=info",
        1 => "termgraph=debug",
        _ => "termgraph=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Build { paths } => {
            paths.apply(&mut config);
            cmd_build(&config)
        }
        Command::Concepts { paths } => {
            paths.apply(&mut config);
            cmd_concepts(&config)
        }
        Command::Relationships { paths } => {
            paths.apply(&mut config);
            cmd_relationships(&config)
        }
        Command::Resolve {
            input,
            output,
            not_found,
            base_url,
            branch,
            chunk_size,
            delay_ms,
        } => {
            if let Some(p) = input {
                config.resolve.input = p;
            }
            if let Some(p) = output {
                config.resolve.output = p;
            }
            if let Some(p) = not_found {
                config.resolve.not_found = p;
            }
            if let Some(url) = base_url {
                Url::parse(&url).map_err(|e| eyre!("invalid base URL '{url}': {e}"))?;
                config.snowstorm.base_url = url;
            }
            if let Some(b) = branch {
                config.snowstorm.branch = b;
            }
            if let Some(n) = chunk_size {
                if n == 0 {
                    return Err(eyre!("--chunk-size must be at least 1"));
                }
                config.snowstorm.chunk_size = n;
            }
            if let Some(ms) = delay_ms {
                config.snowstorm.delay_ms = ms;
            }
            cmd_resolve(&config).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_build(config: &AppConfig) -> Result<()> {
    let build_config = BuildCsvsConfig::from(config);
    info!(
        base_dir = %config.build.base_dir.display(),
        sources = build_config.sources.len(),
        "building graph-load csvs"
    );

    let reporter = CliProgress::new();
    let result = pipeline::build_csvs(&build_config, &reporter);
    reporter.clear();
    let report = result?;

    println!();
    println!("  CSVs written");
    println!(
        "  Concepts:      {} rows -> {}",
        report.concepts.rows,
        report.concepts.path.display()
    );
    println!(
        "  Relationships: {} rows -> {}",
        report.relationships.written,
        report.relationships_path.display()
    );
    println!(
        "  Dropped:       {} inactive, {} malformed",
        report.relationships.inactive, report.relationships.malformed
    );
    print_missing(&report.concepts.missing_sources);
    println!("  Time:          {:.1}s", report.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_concepts(config: &AppConfig) -> Result<()> {
    let build_config = BuildCsvsConfig::from(config);
    let reporter = CliProgress::new();
    let result = pipeline::build_concept_csv(&build_config, &reporter);
    reporter.clear();
    let report = result?;

    println!();
    println!(
        "  Concepts: {} rows -> {}",
        report.rows,
        report.path.display()
    );
    print_missing(&report.missing_sources);
    println!();

    Ok(())
}

fn cmd_relationships(config: &AppConfig) -> Result<()> {
    let build_config = BuildCsvsConfig::from(config);
    let reporter = CliProgress::new();
    let result = pipeline::build_relationship_csv(&build_config, &reporter);
    reporter.clear();
    let stats = result?;

    println!();
    println!(
        "  Relationships: {} rows -> {}",
        stats.written,
        build_config.relationships_out.display()
    );
    println!(
        "  Dropped:       {} inactive, {} malformed",
        stats.inactive, stats.malformed
    );
    println!();

    Ok(())
}

async fn cmd_resolve(config: &AppConfig) -> Result<()> {
    let resolve_config = ResolveIdsConfig::from(config);
    info!(
        input = %resolve_config.input.display(),
        base_url = %resolve_config.lookup.base_url,
        branch = %resolve_config.lookup.branch,
        chunk_size = resolve_config.lookup.chunk_size,
        "resolving concept ids"
    );

    let reporter = CliProgress::new();
    let result = resolve::resolve_ids(&resolve_config, &reporter).await;
    reporter.clear();
    let report = result?;

    println!();
    println!("  IDs:        {}", report.ids);
    println!(
        "  Resolved:   {} -> {}",
        report.resolved,
        report.output.display()
    );
    match &report.not_found {
        Some(path) => println!("  Not found:  {} -> {}", report.unresolvable, path.display()),
        None => println!("  Not found:  0"),
    }
    println!("  Requests:   {}", report.requests);
    println!("  Time:       {:.1}s", report.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

fn print_missing(missing: &[termgraph_shared::DomainSource]) {
    for source in missing {
        println!(
            "  Skipped:       {} (missing {})",
            source.label,
            source.path.display()
        );
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    /// Remove the spinner whether or not the pipeline succeeded.
    fn clear(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn chunk_resolved(&self, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Resolving concepts [{current}/{total} chunks]"));
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}
