//! extdeps CLI entry point.

use clap::Parser;
use extdeps::cli::{self, Cli, Commands, EXIT_ERROR};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "EXTDEPS_LOG";

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    // Read once; `debug: true` in it also raises the log level.
    let config = cli
        .command
        .needs_config()
        .then(|| cli::load_config(cli.config.as_deref()));
    let loaded = config.as_ref().and_then(|c| c.as_ref().ok());
    init_logging(cli::wants_debug(cli.verbose, loaded));

    let config = config.unwrap_or_else(|| Err(anyhow::anyhow!("no configuration loaded")));
    let result = match &cli.command {
        Commands::Index(args) => cli::run_index(config, args),
        Commands::Query(args) => cli::run_query(config, args),
        Commands::Analyze(args) => cli::run_analyze(args),
        Commands::Rewrite(args) => cli::run_rewrite(config, args),
        Commands::Init(args) => cli::run_init(args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
