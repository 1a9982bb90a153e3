//! Command-line interface for extdeps.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::analysis::FileAnalyzer;
use crate::config::{self, Config, DEFAULT_TEMPLATE};
use crate::report::{self, Format, IndexReport, QueryReport, RewriteFailure, RewriteReport};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Default configuration file names to search for.
const DEFAULT_CONFIG_NAMES: &[&str] = &["extdeps.yaml", ".extdeps.yaml"];

/// Files rewritten at once by `rewrite`.
const REWRITE_CONCURRENCY: usize = 16;

/// Static dependency resolution for Ext JS class trees.
///
/// extdeps indexes class definitions (`Ext.define` calls and documentation
/// tags) into a namespace registry and rewrites `requires`, `mixins`,
/// `extend` and friends into static `require()` statements.
#[derive(Parser)]
#[command(name = "extdeps")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration YAML file (default: auto-discover)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build or load a registry snapshot
    Index(IndexArgs),
    /// Look up the files registering a class
    Query(QueryArgs),
    /// Show what a single file declares
    Analyze(AnalyzeArgs),
    /// Rewrite files with static dependency references
    Rewrite(RewriteArgs),
    /// Create a starter configuration file
    Init(InitArgs),
}

/// Arguments for the index command.
#[derive(Parser)]
pub struct IndexArgs {
    /// Registry to index (default: dependencies_from, else the first one)
    #[arg(short, long)]
    pub registry: Option<String>,

    /// Re-index even when a snapshot exists
    #[arg(long)]
    pub rebuild: bool,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the query command.
#[derive(Parser)]
pub struct QueryArgs {
    /// Dotted class name, optionally ending in `.*`
    pub name: String,

    /// Registry to query (default: dependencies_from, else the first one)
    #[arg(short, long)]
    pub registry: Option<String>,

    /// Include the files overriding each match
    #[arg(long)]
    pub overrides: bool,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the analyze command.
#[derive(Parser)]
pub struct AnalyzeArgs {
    /// JavaScript file to analyze
    pub file: PathBuf,

    /// Framework root class
    #[arg(long, default_value = "Ext")]
    pub root: String,

    /// Skip `override` properties of registration calls
    #[arg(long)]
    pub ignore_overrides: bool,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the rewrite command.
#[derive(Parser)]
pub struct RewriteArgs {
    /// Files to rewrite
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Write results under this directory (required for several files)
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Output format for the batch summary: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "extdeps.yaml")]
    pub output: PathBuf,
}

/// Discover a configuration file in the current directory.
fn discover_config() -> anyhow::Result<PathBuf> {
    for name in DEFAULT_CONFIG_NAMES {
        let path = PathBuf::from(name);
        if path.exists() {
            return Ok(path);
        }
    }
    anyhow::bail!(
        "no configuration file found (looked for {})",
        DEFAULT_CONFIG_NAMES.join(", ")
    )
}

/// Load and validate the configuration named on the command line, or the
/// discovered one.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => discover_config()?,
    };
    let config = Config::from_file(&path)?;
    config::validate(&config)?;
    Ok(config)
}

impl Commands {
    /// Whether the command reads the configuration file.
    pub fn needs_config(&self) -> bool {
        matches!(self, Commands::Index(_) | Commands::Query(_) | Commands::Rewrite(_))
    }
}

/// Whether debug logging was requested by flag or configuration.
pub fn wants_debug(verbose: bool, config: Option<&Config>) -> bool {
    verbose || config.map_or(false, |c| c.debug)
}

fn parse_format(format: &str) -> Option<Format> {
    match format.parse() {
        Ok(f) => Some(f),
        Err(e) => {
            eprintln!("Error: {}", e);
            None
        }
    }
}

fn config_or_report(config: anyhow::Result<Config>) -> Option<Config> {
    match config {
        Ok(c) => Some(c),
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Run 'extdeps init' to create a configuration file");
            None
        }
    }
}

/// The registry a command works on.
fn pick_registry<'a>(config: &'a Config, requested: Option<&'a str>) -> anyhow::Result<&'a str> {
    if let Some(name) = requested {
        config.registry(name)?;
        return Ok(name);
    }
    config
        .dependencies_from
        .as_deref()
        .or_else(|| config.registries.keys().next().map(|k| k.as_str()))
        .ok_or_else(|| anyhow::anyhow!("no registries configured"))
}

/// Run the index command.
pub fn run_index(config: anyhow::Result<Config>, args: &IndexArgs) -> anyhow::Result<i32> {
    let Some(format) = parse_format(&args.format) else {
        return Ok(EXIT_ERROR);
    };
    let Some(config) = config_or_report(config) else {
        return Ok(EXIT_ERROR);
    };

    let name = pick_registry(&config, args.registry.as_deref())?;
    let store = config.store(name)?;
    let registry = if args.rebuild {
        store.rebuild()?
    } else {
        store.load_or_build()?
    };

    let report = IndexReport::new(name, store.version(), &registry);
    match format {
        Format::Json => report::write_json(&report)?,
        Format::Pretty => report::write_index_pretty(&report),
    }
    Ok(EXIT_SUCCESS)
}

/// Run the query command.
pub fn run_query(config: anyhow::Result<Config>, args: &QueryArgs) -> anyhow::Result<i32> {
    let Some(format) = parse_format(&args.format) else {
        return Ok(EXIT_ERROR);
    };
    let Some(config) = config_or_report(config) else {
        return Ok(EXIT_ERROR);
    };

    let name = pick_registry(&config, args.registry.as_deref())?;
    let registry = config.store(name)?.load_or_build()?;
    let results = if args.overrides {
        registry.query_with_overrides(&args.name)
    } else {
        registry.query(&args.name)
    };
    let found = !results.is_empty();

    let report = QueryReport::new(name, &args.name, results);
    match format {
        Format::Json => report::write_json(&report)?,
        Format::Pretty => report::write_query_pretty(&report),
    }

    if found {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Run the analyze command.
pub fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<i32> {
    let Some(format) = parse_format(&args.format) else {
        return Ok(EXIT_ERROR);
    };

    let analyzer = FileAnalyzer::new(args.root.as_str()).ignore_overrides(args.ignore_overrides);
    let record = match analyzer.analyze_file(&args.file) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_FAILED);
        }
    };

    match format {
        Format::Json => report::write_json(&record)?,
        Format::Pretty => report::write_record_pretty(&record),
    }
    Ok(EXIT_SUCCESS)
}

/// Run the rewrite command.
pub fn run_rewrite(config: anyhow::Result<Config>, args: &RewriteArgs) -> anyhow::Result<i32> {
    let Some(format) = parse_format(&args.format) else {
        return Ok(EXIT_ERROR);
    };
    if args.files.len() > 1 && args.out_dir.is_none() {
        eprintln!("Error: --out-dir is required when rewriting more than one file");
        return Ok(EXIT_ERROR);
    }
    let Some(config) = config_or_report(config) else {
        return Ok(EXIT_ERROR);
    };

    // Registry file maps are keyed by canonical paths.
    let mut files = Vec::with_capacity(args.files.len());
    for file in &args.files {
        match file.canonicalize() {
            Ok(p) => files.push(p),
            Err(e) => {
                eprintln!("Error: cannot access path {:?}: {}", file, e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    let loader = Arc::new(config.loader(false)?);

    let Some(out_dir) = &args.out_dir else {
        return match loader.process_file(&files[0]) {
            Ok(output) => {
                print!("{}", output);
                Ok(EXIT_SUCCESS)
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                Ok(EXIT_FAILED)
            }
        };
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let results = runtime.block_on(loader.process_all(files, REWRITE_CONCURRENCY));

    let cwd = std::env::current_dir()?;
    let mut summary = RewriteReport::default();
    for (path, result) in results {
        let display = path.to_string_lossy().to_string();
        match result {
            Ok(output) => {
                let target = out_dir.join(mirrored_path(&cwd, &path));
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&target, output)?;
                summary.rewritten.push(display);
            }
            Err(e) => summary.failed.push(RewriteFailure {
                file: display,
                error: e.to_string(),
            }),
        }
    }

    match format {
        Format::Json => report::write_json(&summary)?,
        Format::Pretty => report::write_rewrite_pretty(&summary),
    }

    if summary.passed() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Location of `path` inside an output tree: relative to `base` when below
/// it, otherwise just the file name.
fn mirrored_path(base: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(base) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => path.file_name().map(PathBuf::from).unwrap_or_default(),
    }
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    // Check if output already exists
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    // Create output directory if needed
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, DEFAULT_TEMPLATE) {
        eprintln!("Error: failed to write configuration: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Point registries.ext.path at your framework checkout");
    println!("  2. Run: extdeps index --config {}", args.output.display());

    Ok(EXIT_SUCCESS)
}
