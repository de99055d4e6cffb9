//! Search request and response models.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::article::{Article, NOT_AVAILABLE};

/// Default number of results requested from each backend
pub const DEFAULT_MAX_RESULTS: usize = 20;

/// The literature databases the aggregator knows how to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Bibliographic backend (PubMed E-utilities)
    PubMed,
    /// Full-text backend (PubMed Central E-utilities)
    Pmc,
    /// Scraped backend (KoreaMed search portal)
    KoreaMed,
}

impl Backend {
    /// Canonical identifier used in requests
    pub fn id(&self) -> &'static str {
        match self {
            Backend::PubMed => "pubmed",
            Backend::Pmc => "pmc",
            Backend::KoreaMed => "koreamed",
        }
    }

    /// Display name used in execution details and errors
    pub fn name(&self) -> &'static str {
        match self {
            Backend::PubMed => "PubMed",
            Backend::Pmc => "PMC",
            Backend::KoreaMed => "KoreaMed",
        }
    }

    /// Resolve a caller-supplied backend name (case-insensitive).
    ///
    /// Accepts the canonical ids as well as the role names
    /// `bibliographic`, `full-text` and `scraped`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "pubmed" | "bibliographic" => Some(Backend::PubMed),
            "pmc" | "full-text" | "fulltext" | "full_text" => Some(Backend::Pmc),
            "koreamed" | "scraped" => Some(Backend::KoreaMed),
            _ => None,
        }
    }

    /// All backends in default invocation order
    pub fn all() -> [Backend; 3] {
        [Backend::PubMed, Backend::Pmc, Backend::KoreaMed]
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Query passed to a single backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Query string, sent verbatim
    pub query: String,

    /// Maximum number of results to return
    pub max_results: usize,
}

impl SearchQuery {
    /// Create a new search query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Set maximum results
    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }
}

/// Counters describing how full-text records were identified
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierStats {
    /// Records identified by their own PMC id
    pub with_pmc_id: usize,

    /// Records that fell back to their PubMed id
    pub pmid_fallback: usize,

    /// Records whose place in the ranking could not be determined
    pub unresolved: usize,
}

impl IdentifierStats {
    /// True when no counter has been incremented
    pub fn is_empty(&self) -> bool {
        self.with_pmc_id == 0 && self.pmid_fallback == 0 && self.unresolved == 0
    }
}

impl std::ops::Add for IdentifierStats {
    type Output = IdentifierStats;

    fn add(self, other: IdentifierStats) -> IdentifierStats {
        IdentifierStats {
            with_pmc_id: self.with_pmc_id + other.with_pmc_id,
            pmid_fallback: self.pmid_fallback + other.pmid_fallback,
            unresolved: self.unresolved + other.unresolved,
        }
    }
}

/// Response from a single backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Articles in the backend's relevance order
    pub articles: Vec<Article>,

    /// Database display name
    pub database: String,

    /// How the backend interpreted the query
    pub query_translation: String,

    /// The query that was sent
    pub executed_query: String,

    /// Identifier resolution counters (full-text backend only)
    #[serde(default)]
    pub id_stats: IdentifierStats,
}

impl SearchResponse {
    /// Create a new search response
    pub fn new(articles: Vec<Article>, database: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            articles,
            database: database.into(),
            query_translation: NOT_AVAILABLE.to_string(),
            executed_query: query.into(),
            id_stats: IdentifierStats::default(),
        }
    }

    /// Set the backend-reported query translation
    pub fn query_translation(mut self, translation: impl Into<String>) -> Self {
        self.query_translation = translation.into();
        self
    }

    /// Set identifier statistics
    pub fn id_stats(mut self, stats: IdentifierStats) -> Self {
        self.id_stats = stats;
        self
    }

    /// Number of articles in the response
    pub fn len(&self) -> usize {
        self.articles.len()
    }

    /// Whether the response is empty
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

/// Execution record for one backend invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDetail {
    pub database: String,
    pub original_query: String,
    /// Always identical to `original_query`; queries are never rewritten
    pub executed_query: String,
    pub query_translation: String,
    pub result_count: usize,
}

impl SearchDetail {
    /// Build the detail row for a successful backend response
    pub fn from_response(original_query: &str, response: &SearchResponse) -> Self {
        Self {
            database: response.database.clone(),
            original_query: original_query.to_string(),
            executed_query: original_query.to_string(),
            query_translation: response.query_translation.clone(),
            result_count: response.len(),
        }
    }

    /// Build a zero-result row for a backend that answered but failed
    pub fn empty(database: impl Into<String>, original_query: &str) -> Self {
        Self {
            database: database.into(),
            original_query: original_query.to_string(),
            executed_query: original_query.to_string(),
            query_translation: NOT_AVAILABLE.to_string(),
            result_count: 0,
        }
    }
}

/// A backend-scoped failure surfaced in the response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendError {
    pub database: String,
    pub error: String,
}

impl BackendError {
    pub fn new(database: impl Into<String>, error: impl ToString) -> Self {
        Self {
            database: database.into(),
            error: error.to_string(),
        }
    }
}

/// Requested output projection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnFormat {
    /// Execution summary plus a title/synopsis/link table
    #[default]
    Compact,
    /// Execution summary plus full article blocks
    Detailed,
    /// Execution summary plus structured results
    #[serde(alias = "json")]
    Raw,
}

impl ReturnFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnFormat::Compact => "compact",
            ReturnFormat::Detailed => "detailed",
            ReturnFormat::Raw => "raw",
        }
    }
}

impl std::str::FromStr for ReturnFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(ReturnFormat::Compact),
            "detailed" => Ok(ReturnFormat::Detailed),
            "raw" | "json" => Ok(ReturnFormat::Raw),
            other => Err(format!("unknown return format '{}'", other)),
        }
    }
}

/// A literature search across several backends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Query string, used exactly as written
    pub query: String,

    /// Backends to search; all three when absent
    #[serde(default)]
    pub databases: Option<Vec<String>>,

    /// Result cap applied to every backend; the tool boundary and CLI
    /// reject zero
    #[serde(default = "default_max_results")]
    pub max_results_per_db: usize,

    /// Per-backend result caps overriding `max_results_per_db`
    #[serde(default)]
    pub max_results_by_db: Option<HashMap<String, usize>>,

    /// Output projection
    #[serde(default)]
    pub return_format: ReturnFormat,
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

impl SearchRequest {
    /// Create a request for all backends with default caps
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            databases: None,
            max_results_per_db: DEFAULT_MAX_RESULTS,
            max_results_by_db: None,
            return_format: ReturnFormat::default(),
        }
    }

    /// Restrict the search to the named backends
    pub fn databases<I, S>(mut self, databases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.databases = Some(databases.into_iter().map(Into::into).collect());
        self
    }

    /// Set the per-backend result cap
    pub fn max_results_per_db(mut self, max: usize) -> Self {
        self.max_results_per_db = max;
        self
    }

    /// Override the cap for a single backend
    pub fn max_results_for(mut self, database: impl Into<String>, max: usize) -> Self {
        self.max_results_by_db
            .get_or_insert_with(HashMap::new)
            .insert(database.into(), max);
        self
    }

    /// Set the output projection
    pub fn return_format(mut self, format: ReturnFormat) -> Self {
        self.return_format = format;
        self
    }

    /// Requested backend names, defaulting to all backends
    pub fn database_names(&self) -> Vec<String> {
        match &self.databases {
            Some(names) => names.clone(),
            None => Backend::all().iter().map(|b| b.id().to_string()).collect(),
        }
    }

    /// Result cap for a requested backend name.
    ///
    /// Override keys match exactly, then case-insensitively, then by the
    /// backend they name (`"bibliographic"` matches a `"pubmed"` key).
    pub fn max_results_for_db(&self, name: &str) -> usize {
        let Some(overrides) = &self.max_results_by_db else {
            return self.max_results_per_db;
        };

        if let Some(max) = overrides.get(name) {
            return *max;
        }

        let backend = Backend::parse(name);
        overrides
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .or_else(|| {
                backend.and_then(|b| overrides.iter().find(|(key, _)| Backend::parse(key) == Some(b)))
            })
            .map(|(_, max)| *max)
            .unwrap_or(self.max_results_per_db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse() {
        assert_eq!(Backend::parse("PubMed"), Some(Backend::PubMed));
        assert_eq!(Backend::parse("bibliographic"), Some(Backend::PubMed));
        assert_eq!(Backend::parse("full-text"), Some(Backend::Pmc));
        assert_eq!(Backend::parse("PMC"), Some(Backend::Pmc));
        assert_eq!(Backend::parse("scraped"), Some(Backend::KoreaMed));
        assert_eq!(Backend::parse("embase"), None);
    }

    #[test]
    fn test_request_defaults_from_json() {
        let request: SearchRequest =
            serde_json::from_value(serde_json::json!({ "query": "sarcoidosis" })).unwrap();

        assert_eq!(request.max_results_per_db, DEFAULT_MAX_RESULTS);
        assert_eq!(request.return_format, ReturnFormat::Compact);
        assert_eq!(request.database_names(), vec!["pubmed", "pmc", "koreamed"]);
    }

    #[test]
    fn test_return_format_json_alias() {
        let request: SearchRequest = serde_json::from_value(serde_json::json!({
            "query": "q",
            "return_format": "json"
        }))
        .unwrap();
        assert_eq!(request.return_format, ReturnFormat::Raw);
        assert_eq!("detailed".parse::<ReturnFormat>(), Ok(ReturnFormat::Detailed));
        assert!("table".parse::<ReturnFormat>().is_err());
    }

    #[test]
    fn test_max_results_overrides() {
        let request = SearchRequest::new("q")
            .max_results_per_db(20)
            .max_results_for("pubmed", 5)
            .max_results_for("PMC", 7);

        assert_eq!(request.max_results_for_db("PubMed"), 5);
        assert_eq!(request.max_results_for_db("pmc"), 7);
        assert_eq!(request.max_results_for_db("koreamed"), 20);
        assert_eq!(request.max_results_for_db("bibliographic"), 5);
    }

    #[test]
    fn test_identifier_stats_add() {
        let a = IdentifierStats {
            with_pmc_id: 2,
            pmid_fallback: 1,
            unresolved: 0,
        };
        let b = IdentifierStats {
            with_pmc_id: 1,
            pmid_fallback: 0,
            unresolved: 1,
        };
        let sum = a + b;
        assert_eq!(sum.with_pmc_id, 3);
        assert_eq!(sum.pmid_fallback, 1);
        assert_eq!(sum.unresolved, 1);
        assert!(IdentifierStats::default().is_empty());
    }
}
