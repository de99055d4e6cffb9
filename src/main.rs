use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use medlit_search::config::{find_config_file, load_config, Config};
use medlit_search::models::{ReturnFormat, SearchRequest, DEFAULT_MAX_RESULTS};
use medlit_search::output::SearchOutput;
use medlit_search::tools::ToolRegistry;
use medlit_search::LiteratureSearcher;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// medlit - Search medical literature across PubMed, PMC and KoreaMed
#[derive(Parser, Debug)]
#[command(name = "medlit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search medical literature across PubMed, PMC and KoreaMed", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search the literature databases
    Search {
        /// Search query, sent to every database exactly as written
        query: String,

        /// Database to search (repeatable; default: pubmed, pmc, koreamed)
        #[arg(long = "database", short = 'd')]
        databases: Vec<String>,

        /// Maximum results per database
        #[arg(
            long,
            short = 'm',
            default_value_t = DEFAULT_MAX_RESULTS,
            value_parser = parse_positive
        )]
        max_results: usize,

        /// Per-database limit as NAME=N (repeatable), e.g. pubmed=10
        #[arg(long = "max-for", value_parser = parse_limit)]
        max_for: Vec<(String, usize)>,

        /// Output format
        #[arg(long, short = 'f', value_enum, default_value_t = FormatArg::Compact)]
        format: FormatArg,
    },

    /// Execute a tool with JSON arguments (read from stdin when omitted)
    Tool {
        /// Tool name
        #[arg(default_value = "search_literature")]
        name: String,

        /// JSON arguments
        args: Option<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Output format for search results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FormatArg {
    /// Execution summary and a title/summary/link table
    Compact,
    /// Execution summary and full abstracts
    Detailed,
    /// Execution summary and structured results as JSON
    Raw,
}

impl From<FormatArg> for ReturnFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Compact => ReturnFormat::Compact,
            FormatArg::Detailed => ReturnFormat::Detailed,
            FormatArg::Raw => ReturnFormat::Raw,
        }
    }
}

fn parse_positive(value: &str) -> Result<usize, String> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err("limit must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("invalid limit '{}': {}", value, e)),
    }
}

fn parse_limit(value: &str) -> Result<(String, usize), String> {
    let (name, max) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=N, got '{}'", value))?;
    Ok((name.trim().to_string(), parse_positive(max)?))
}

fn init_tracing(verbose: u8, quiet: bool) {
    let log_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("medlit_search={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn resolve_config(path: Option<&PathBuf>) -> Result<Config> {
    let path = match path {
        Some(path) => Some(path.clone()),
        None => find_config_file(),
    };
    if let Some(path) = &path {
        tracing::info!("Using config file: {}", path.display());
    }
    load_config(path.as_deref()).context("Failed to load configuration")
}

fn print_output(output: &SearchOutput, quiet: bool) -> Result<()> {
    match output.format {
        ReturnFormat::Raw => println!("{}", serde_json::to_string_pretty(output)?),
        _ => println!("{}", output.content.as_deref().unwrap_or_default()),
    }

    if !quiet {
        for error in &output.errors {
            eprintln!("warning: {} failed: {}", error.database, error.error);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = resolve_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Search {
            query,
            databases,
            max_results,
            max_for,
            format,
        } => {
            let mut request = SearchRequest::new(query)
                .max_results_per_db(max_results)
                .return_format(format.into());
            if !databases.is_empty() {
                request = request.databases(databases);
            }
            for (name, max) in max_for {
                request = request.max_results_for(name, max);
            }

            let searcher = LiteratureSearcher::new(config)?;
            let output = searcher.search_literature(&request).await;
            print_output(&output, cli.quiet)?;
        }
        Commands::Tool { name, args } => {
            let raw = match args {
                Some(args) => args,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read arguments from stdin")?;
                    buf
                }
            };
            let args: serde_json::Value =
                serde_json::from_str(&raw).context("Tool arguments must be JSON")?;

            let registry = ToolRegistry::new(Arc::new(LiteratureSearcher::new(config)?));
            let value = registry
                .execute(&name, args)
                .await
                .map_err(anyhow::Error::msg)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit("pubmed=10"), Ok(("pubmed".to_string(), 10)));
        assert_eq!(parse_limit(" pmc = 3 "), Ok(("pmc".to_string(), 3)));
        assert!(parse_limit("pubmed").is_err());
        assert!(parse_limit("pubmed=0").is_err());
        assert!(parse_limit("pubmed=many").is_err());
    }

    #[test]
    fn test_max_results_must_be_positive() {
        assert!(Cli::try_parse_from(["medlit", "search", "q", "-m", "0"]).is_err());
        assert!(Cli::try_parse_from(["medlit", "search", "q", "-m", "5"]).is_ok());
    }
}
