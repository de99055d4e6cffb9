//! Utility modules supporting literature search.
//!
//! - [`deduplicate_articles`]: Remove cross-backend duplicates by normalized title
//! - [`find_duplicates`]: Find duplicate groups without modifying the list
//! - [`HttpClient`]: Shared HTTP client with timeouts and retry
//! - [`RetryConfig`]: Configuration for retry logic with exponential backoff
//! - [`with_retry`]: Execute an operation with automatic retry on transient errors
//! - [`clean_text`] and friends: Normalizers for scraped and XML text
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use medlit_search::sources::SourceError;
//! use medlit_search::utils::{with_retry, RetryConfig};
//!
//! # async fn fetch_data() -> Result<String, SourceError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), SourceError> {
//! let config = RetryConfig::default().max_attempts(3);
//! let body = with_retry(config, || fetch_data()).await?;
//! # Ok(())
//! # }
//! ```

mod dedup;
mod http;
mod retry;
mod text;

pub use dedup::{deduplicate_articles, find_duplicates};
pub use http::HttpClient;
pub use retry::{with_retry, RetryConfig, TransientError};
pub use text::{
    clean_text, format_authors, split_records, strip_inline_tags, title_from_abstract,
    unescape_xml, xml_text,
};
