//! Article model shared by every search backend.

use serde::{Deserialize, Serialize};

/// Placeholder abstract used when a backend returns none.
pub const NO_ABSTRACT: &str = "No abstract";

/// Placeholder for unknown year or journal.
pub const UNKNOWN: &str = "Unknown";

/// Placeholder for fields a backend never provides.
pub const NOT_AVAILABLE: &str = "N/A";

/// Placeholder title for full-text records without an `<article-title>`.
pub const NO_TITLE: &str = "No title";

/// Where an article came from.
///
/// `PmcViaPubMed` marks full-text search hits that had no PMC identifier and
/// are represented by their PubMed record instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArticleSource {
    #[serde(rename = "PubMed")]
    PubMed,
    #[serde(rename = "PMC")]
    Pmc,
    #[serde(rename = "PMC (via PubMed)")]
    PmcViaPubMed,
    #[serde(rename = "KoreaMed")]
    KoreaMed,
}

impl ArticleSource {
    /// Returns the tag used in output and statistics
    pub fn tag(&self) -> &'static str {
        match self {
            ArticleSource::PubMed => "PubMed",
            ArticleSource::Pmc => "PMC",
            ArticleSource::PmcViaPubMed => "PMC (via PubMed)",
            ArticleSource::KoreaMed => "KoreaMed",
        }
    }

    /// All tags an article may carry
    pub fn all() -> [ArticleSource; 4] {
        [
            ArticleSource::PubMed,
            ArticleSource::Pmc,
            ArticleSource::PmcViaPubMed,
            ArticleSource::KoreaMed,
        ]
    }
}

impl std::fmt::Display for ArticleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// A normalized article as returned by any backend.
///
/// Every field is always populated; missing values carry the sentinel
/// constants of this module instead of being omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Source-tagged identifier (`PMID:<n>`, `PMC<n>`, `KM<rid>`)
    pub id: String,

    /// Article title, used as the cross-source identity key
    pub title: String,

    /// Abstract text
    #[serde(rename = "abstract")]
    pub r#abstract: String,

    /// Publication year
    pub year: String,

    /// Journal title
    pub journal: String,

    /// Formatted author list (`"Kim, Lee, Park et al."`)
    pub authors: String,

    /// Public page of the article
    pub url: String,

    /// Source tag
    pub source: ArticleSource,
}

impl Article {
    /// Create an article with placeholder metadata
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        source: ArticleSource,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            r#abstract: NO_ABSTRACT.to_string(),
            year: UNKNOWN.to_string(),
            journal: UNKNOWN.to_string(),
            authors: NOT_AVAILABLE.to_string(),
            url: url.into(),
            source,
        }
    }

    /// Lower-cased, trimmed title used for deduplication
    pub fn title_key(&self) -> String {
        self.title.trim().to_lowercase()
    }
}

/// Builder for constructing [`Article`] values
#[derive(Debug, Clone)]
pub struct ArticleBuilder {
    article: Article,
}

impl ArticleBuilder {
    /// Create a new builder with required fields
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        source: ArticleSource,
    ) -> Self {
        Self {
            article: Article::new(id, title, url, source),
        }
    }

    /// Set abstract
    pub fn abstract_text(mut self, abstract_text: impl Into<String>) -> Self {
        self.article.r#abstract = abstract_text.into();
        self
    }

    /// Set publication year
    pub fn year(mut self, year: impl Into<String>) -> Self {
        self.article.year = year.into();
        self
    }

    /// Set journal
    pub fn journal(mut self, journal: impl Into<String>) -> Self {
        self.article.journal = journal.into();
        self
    }

    /// Set formatted authors
    pub fn authors(mut self, authors: impl Into<String>) -> Self {
        self.article.authors = authors.into();
        self
    }

    /// Build the Article
    pub fn build(self) -> Article {
        self.article
    }
}
