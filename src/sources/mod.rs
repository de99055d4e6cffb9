//! Literature search backends.
//!
//! Every backend implements the [`Source`] trait and turns one query into a
//! [`SearchResponse`] whose articles are in the backend's own relevance
//! order:
//!
//! - [`PubMedSource`]: bibliographic search (esearch JSON, efetch XML)
//! - [`PmcSource`]: full-text search with PMC-id / PMID reconciliation
//! - [`KoreaMedSource`]: scraped search portal (form POST, HTML)
//!
//! Sources hold no mutable state; one instance can serve concurrent calls.

mod eutils;
mod koreamed;
pub mod mock;
mod pmc;
mod pubmed;

pub use koreamed::KoreaMedSource;
pub use mock::MockSource;
pub use pmc::{IdResolution, PmcSource};
pub use pubmed::PubMedSource;

use async_trait::async_trait;

use crate::models::{Backend, SearchQuery, SearchResponse};

/// The Source trait defines the interface for all search backends.
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Which backend this source implements
    fn backend(&self) -> Backend;

    /// Unique identifier for this source
    fn id(&self) -> &str {
        self.backend().id()
    }

    /// Human-readable name of this source
    fn name(&self) -> &str {
        self.backend().name()
    }

    /// Search for articles matching the query.
    ///
    /// The query string is sent exactly as given.
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SourceError>;
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Connection failure or unreadable response body
    #[error("Network error: {0}")]
    Network(String),

    /// The request exceeded the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Backend temporarily unavailable (HTTP 502/503/504)
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Any other non-success HTTP status
    #[error("API error: {0}")]
    Api(String),

    /// Parsing error (XML, JSON, HTML)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl SourceError {
    /// Whether the backend produced a response before the failure.
    ///
    /// Connection failures and timeouts never reach the backend, so no
    /// execution detail is recorded for them.
    pub fn had_response(&self) -> bool {
        !matches!(self, SourceError::Network(_) | SourceError::Timeout(_))
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout(err.to_string())
        } else if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::DeError> for SourceError {
    fn from(err: quick_xml::DeError) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}
