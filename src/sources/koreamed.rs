//! KoreaMed source implementation (HTML scraping).
//!
//! KoreaMed has no search API. The search form is posted and results are
//! recovered from the per-result "share on Twitter" links, which carry the
//! record id (`RID`) and the title in their query string.

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;

use crate::config::{Config, EndpointsConfig};
use crate::models::{
    Article, ArticleBuilder, ArticleSource, Backend, SearchQuery, SearchResponse, NOT_AVAILABLE,
    UNKNOWN,
};
use crate::sources::{Source, SourceError};
use crate::utils::{clean_text, HttpClient};

const KOREAMED_ARTICLE_URL: &str = "https://koreamed.org/SearchBasic.php";
const KOREAMED_ABSTRACT: &str = "KoreaMed article (full text available)";
const KOREAMED_JOURNAL: &str = "Korean Medical Journal";

/// KoreaMed research source
#[derive(Debug, Clone)]
pub struct KoreaMedSource {
    client: HttpClient,
    search_url: String,
}

impl KoreaMedSource {
    /// Create a KoreaMed source from configuration
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        let client = HttpClient::from_config(&config.http, config.retry)?;
        Ok(Self::with_client(client, &config.endpoints))
    }

    /// Create with a shared HTTP client
    pub fn with_client(client: HttpClient, endpoints: &EndpointsConfig) -> Self {
        Self {
            client,
            search_url: endpoints.koreamed_search_url.clone(),
        }
    }

    /// Parse a search result page into the query translation and up to
    /// `max_results` articles.
    fn parse_search_page(
        html: &str,
        max_results: usize,
    ) -> Result<(String, Vec<Article>), SourceError> {
        let document = Html::parse_document(html);

        let input_selector = Selector::parse("input[name='query_search']")
            .map_err(|e| SourceError::Parse(format!("Invalid selector: {:?}", e)))?;
        let link_selector = Selector::parse("a[href*='twitter.com/intent/tweet']")
            .map_err(|e| SourceError::Parse(format!("Invalid selector: {:?}", e)))?;

        let query_translation = document
            .select(&input_selector)
            .next()
            .and_then(|input| input.value().attr("value"))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(NOT_AVAILABLE)
            .to_string();

        let links: Vec<&str> = document
            .select(&link_selector)
            .filter_map(|a| a.value().attr("href"))
            .collect();
        tracing::debug!("KoreaMed page has {} share links", links.len());

        let articles = links
            .into_iter()
            .filter_map(Self::parse_share_link)
            .take(max_results)
            .collect();

        Ok((query_translation, articles))
    }

    /// Build an article from one share link; links without a RID are skipped
    fn parse_share_link(href: &str) -> Option<Article> {
        let rid = rid_regex().captures(href)?.get(1)?.as_str();

        let title = text_regex()
            .captures(href)
            .and_then(|caps| caps.get(1))
            .map(|m| decode_title(m.as_str()))
            .unwrap_or_else(|| UNKNOWN.to_string());

        Some(
            ArticleBuilder::new(
                format!("KM{}", rid),
                title,
                format!("{}?RID={}", KOREAMED_ARTICLE_URL, rid),
                ArticleSource::KoreaMed,
            )
            .abstract_text(KOREAMED_ABSTRACT)
            .year(NOT_AVAILABLE)
            .journal(KOREAMED_JOURNAL)
            .authors(NOT_AVAILABLE)
            .build(),
        )
    }
}

fn rid_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"RID%3D(\d+)").expect("valid RID regex"))
}

fn text_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"text=([^&]+)").expect("valid text regex"))
}

/// The tweet text is `<title>%0A<link>`; keep the title line
fn decode_title(encoded: &str) -> String {
    let first_line = encoded.split("%0A").next().unwrap_or_default();
    let spaced = first_line.replace('+', " ");
    let bytes = urlencoding::decode_binary(spaced.as_bytes());
    clean_text(&String::from_utf8_lossy(&bytes))
}

#[async_trait]
impl Source for KoreaMedSource {
    fn backend(&self) -> Backend {
        Backend::KoreaMed
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SourceError> {
        let html = self
            .client
            .post_form_text(&self.search_url, &[("query_search", query.query.as_str())])
            .await?;

        let (query_translation, articles) = Self::parse_search_page(&html, query.max_results)?;
        if query_translation != NOT_AVAILABLE {
            tracing::debug!("KoreaMed query translation: {}", query_translation);
        }

        Ok(SearchResponse::new(articles, self.name(), &query.query)
            .query_translation(query_translation))
    }
}
