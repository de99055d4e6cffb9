//! # medlit-search
//!
//! Medical literature search aggregator. One query is sent verbatim to
//! PubMed, PubMed Central and KoreaMed; the results are normalized into one
//! article schema, kept in each backend's relevance order, and deduplicated
//! across backends by title.
//!
//! ## Architecture
//!
//! - [`models`]: Core data structures (Article, SearchRequest, etc.)
//! - [`sources`]: Backend adapters behind the [`Source`] trait
//! - [`aggregate`]: Sequential multi-backend orchestration
//! - [`output`]: Compact, detailed and raw result projections
//! - [`tools`]: JSON tool boundary for agent hosts
//! - [`utils`]: HTTP client, retry, deduplication and text normalizers
//! - [`config`]: Configuration management
//!
//! ```rust,no_run
//! use medlit_search::{Config, LiteratureSearcher, SearchRequest};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let searcher = LiteratureSearcher::new(Config::default())?;
//! let request = SearchRequest::new("Sarcoidosis[Title/Abstract] AND case reports[Publication Type]")
//!     .max_results_per_db(5);
//! let output = searcher.search_literature(&request).await;
//! println!("{}", output.content.unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod config;
pub mod models;
pub mod output;
pub mod sources;
pub mod tools;
pub mod utils;

// Re-export commonly used types
pub use aggregate::{AggregationResult, LiteratureSearcher};
pub use config::Config;
pub use models::{Article, SearchRequest};
pub use output::SearchOutput;
pub use sources::{Source, SourceError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
