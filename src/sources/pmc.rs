//! PubMed Central (PMC) source implementation.
//!
//! Same two-phase E-utilities shape as PubMed, but a PMC record may be
//! identified by its PMC id, its PubMed id, or both. Each record is
//! resolved once into an [`IdResolution`], then mapped back onto a slot of
//! the esearch id list so the backend's relevance order survives.

use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

use crate::config::{Config, EndpointsConfig};
use crate::models::{
    Article, ArticleBuilder, ArticleSource, Backend, IdentifierStats, SearchQuery, SearchResponse,
    NOT_AVAILABLE, NO_ABSTRACT, NO_TITLE, UNKNOWN,
};
use crate::sources::eutils::{parse_esearch, Eutils};
use crate::sources::{Source, SourceError};
use crate::utils::{clean_text, format_authors, split_records, xml_text, HttpClient};

const PMC_ARTICLE_URL: &str = "https://www.ncbi.nlm.nih.gov/pmc/articles";
const PUBMED_ARTICLE_URL: &str = "https://pubmed.ncbi.nlm.nih.gov";

/// How a full-text record is identified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdResolution {
    /// Native PMC id, without the `PMC` prefix
    Primary(String),
    /// No PMC id; the PubMed id stands in
    Fallback(String),
    /// Neither identifier present
    Unresolved,
}

impl IdResolution {
    /// Resolve the identifiers found on a record. A PMC id always wins.
    pub fn resolve(pmc_id: Option<&str>, pmid: Option<&str>) -> Self {
        let pmc_id = pmc_id.map(strip_pmc_prefix).filter(|id| !id.is_empty());
        let pmid = pmid.map(str::trim).filter(|id| !id.is_empty());

        match (pmc_id, pmid) {
            (Some(pmc_id), _) => IdResolution::Primary(pmc_id.to_string()),
            (None, Some(pmid)) => IdResolution::Fallback(pmid.to_string()),
            (None, None) => IdResolution::Unresolved,
        }
    }

    /// Article id: `PMC<n>` or `PMID:<n>`
    pub fn article_id(&self) -> Option<String> {
        match self {
            IdResolution::Primary(id) => Some(format!("PMC{}", id)),
            IdResolution::Fallback(id) => Some(format!("PMID:{}", id)),
            IdResolution::Unresolved => None,
        }
    }

    /// Public page of the record
    pub fn url(&self) -> Option<String> {
        match self {
            IdResolution::Primary(id) => Some(format!("{}/PMC{}/", PMC_ARTICLE_URL, id)),
            IdResolution::Fallback(id) => Some(format!("{}/{}/", PUBMED_ARTICLE_URL, id)),
            IdResolution::Unresolved => None,
        }
    }

    /// Source tag of the record
    pub fn source(&self) -> Option<ArticleSource> {
        match self {
            IdResolution::Primary(_) => Some(ArticleSource::Pmc),
            IdResolution::Fallback(_) => Some(ArticleSource::PmcViaPubMed),
            IdResolution::Unresolved => None,
        }
    }
}

fn strip_pmc_prefix(id: &str) -> &str {
    let id = id.trim();
    id.strip_prefix("PMC").unwrap_or(id).trim()
}

/// A parsed full-text record with a resolved identity
#[derive(Debug, Clone)]
struct PmcRecord {
    resolution: IdResolution,
    article: Article,
}

/// PMC research source
#[derive(Debug, Clone)]
pub struct PmcSource {
    client: HttpClient,
    eutils: Eutils,
    strict_id_matching: bool,
}

impl PmcSource {
    /// Create a PMC source from configuration
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        let client = HttpClient::from_config(&config.http, config.retry)?;
        Ok(Self::with_client(client, &config.endpoints)
            .strict_id_matching(config.search.strict_id_matching))
    }

    /// Create with a shared HTTP client
    pub fn with_client(client: HttpClient, endpoints: &EndpointsConfig) -> Self {
        Self {
            client,
            eutils: Eutils::new(endpoints, "pmc"),
            strict_id_matching: false,
        }
    }

    /// Disable positional slot assignment for unmatched fallback records
    pub fn strict_id_matching(mut self, strict: bool) -> Self {
        self.strict_id_matching = strict;
        self
    }

    /// Parse a `pmc-articleset` document. Records without any identifier
    /// are discarded.
    fn parse_fetch_response(xml: &str) -> Result<Vec<PmcRecord>, SourceError> {
        let records = split_records(xml, "article");

        if records.is_empty() && !xml.contains("pmc-articleset") {
            return Err(SourceError::Parse(
                "efetch response is not a pmc-articleset".to_string(),
            ));
        }

        let mut parsed = Vec::with_capacity(records.len());
        for record in records {
            let (pmc_id, pmid) = extract_article_ids(record);
            let resolution = IdResolution::resolve(pmc_id.as_deref(), pmid.as_deref());

            let (Some(id), Some(url), Some(source)) =
                (resolution.article_id(), resolution.url(), resolution.source())
            else {
                tracing::warn!("Skipping PMC article without any identifier");
                continue;
            };

            let title = first_element(record, title_regex())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| NO_TITLE.to_string());

            let article = ArticleBuilder::new(id, title, url, source)
                .abstract_text(extract_abstract(record).unwrap_or_else(|| NO_ABSTRACT.to_string()))
                .year(extract_year(record).unwrap_or_else(|| UNKNOWN.to_string()))
                .journal(
                    first_element(record, journal_regex())
                        .filter(|j| !j.is_empty())
                        .unwrap_or_else(|| UNKNOWN.to_string()),
                )
                .authors(extract_authors(record))
                .build();

            parsed.push(PmcRecord { resolution, article });
        }

        Ok(parsed)
    }
}

/// Map records back onto the esearch id list.
///
/// Primary records claim the slot whose id equals their PMC id. Fallback
/// records then take the first unconsumed slot equal to or ending with
/// their PMID, and otherwise (unless `strict`) the next unconsumed slot in
/// positional order. Records left without a slot are counted as
/// unresolved and dropped.
fn resolve_records(
    search_ids: &[String],
    records: Vec<PmcRecord>,
    strict: bool,
) -> (Vec<Article>, IdentifierStats) {
    let normalized: Vec<&str> = search_ids.iter().map(|id| strip_pmc_prefix(id)).collect();
    let mut slots: Vec<Option<Article>> = vec![None; search_ids.len()];
    let mut stats = IdentifierStats::default();
    let mut pending: Vec<(String, Article)> = Vec::new();

    for record in records {
        match record.resolution {
            IdResolution::Primary(pmc_id) => {
                stats.with_pmc_id += 1;
                let slot = normalized
                    .iter()
                    .enumerate()
                    .position(|(idx, id)| *id == pmc_id && slots[idx].is_none());
                match slot {
                    Some(idx) => slots[idx] = Some(record.article),
                    None => {
                        tracing::warn!("PMC{} was not among the search results", pmc_id);
                        stats.unresolved += 1;
                    }
                }
            }
            IdResolution::Fallback(pmid) => {
                stats.pmid_fallback += 1;
                pending.push((pmid, record.article));
            }
            IdResolution::Unresolved => {}
        }
    }

    let mut unmatched: Vec<(String, Article)> = Vec::new();
    for (pmid, article) in pending {
        let slot = normalized.iter().enumerate().position(|(idx, id)| {
            slots[idx].is_none() && (*id == pmid || id.ends_with(pmid.as_str()))
        });
        match slot {
            Some(idx) => slots[idx] = Some(article),
            None => unmatched.push((pmid, article)),
        }
    }

    for (pmid, article) in unmatched {
        let slot = if strict {
            None
        } else {
            slots.iter().position(Option::is_none)
        };
        match slot {
            Some(idx) => {
                tracing::debug!(
                    "Assigning PMID:{} to search position {} by order",
                    pmid,
                    idx + 1
                );
                slots[idx] = Some(article);
            }
            None => {
                tracing::warn!("Dropping PMID:{}: no search position left", pmid);
                stats.unresolved += 1;
            }
        }
    }

    (slots.into_iter().flatten().collect(), stats)
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("valid JATS regex"))
}

fn article_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r#"(?s)<article-id\s[^>]*pub-id-type\s*=\s*["']([^"']+)["'][^>]*>(.*?)</article-id>"#,
    )
}

fn title_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?s)<article-title(?:\s[^>]*)?>(.*?)</article-title>")
}

fn abstract_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?s)<abstract(?:\s[^>]*)?>(.*?)</abstract>")
}

fn paragraph_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?s)<p(?:\s[^>]*)?>(.*?)</p>")
}

fn pub_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?s)<pub-date(?:\s[^>]*)?>(.*?)</pub-date>")
}

fn year_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?s)<year(?:\s[^>]*)?>(.*?)</year>")
}

fn journal_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?s)<journal-title(?:\s[^>]*)?>(.*?)</journal-title>")
}

fn author_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        r#"(?s)<contrib\s[^>]*contrib-type\s*=\s*["']author["'][^>]*>(.*?)</contrib>"#,
    )
}

fn surname_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(?s)<surname(?:\s[^>]*)?>(.*?)</surname>")
}

/// Text of the first element matched by `re`, tags stripped
fn first_element(xml: &str, re: &Regex) -> Option<String> {
    re.captures(xml)
        .and_then(|caps| caps.get(1))
        .map(|m| xml_text(m.as_str()))
}

/// First PMC id (`pmc` or `pmcid`) and first PMID of a record
fn extract_article_ids(xml: &str) -> (Option<String>, Option<String>) {
    let mut pmc_id = None;
    let mut pmid = None;

    for caps in article_id_regex().captures_iter(xml) {
        let value = clean_text(&caps[2]);
        if value.is_empty() {
            continue;
        }
        match &caps[1] {
            "pmc" | "pmcid" if pmc_id.is_none() => pmc_id = Some(value),
            "pmid" if pmid.is_none() => pmid = Some(value),
            _ => {}
        }
    }

    (pmc_id, pmid)
}

fn extract_abstract(xml: &str) -> Option<String> {
    let body = abstract_regex().captures(xml)?.get(1)?.as_str();

    let paragraphs: Vec<String> = paragraph_regex()
        .captures_iter(body)
        .map(|caps| xml_text(&caps[1]))
        .filter(|p| !p.is_empty())
        .collect();

    let text = if paragraphs.is_empty() {
        xml_text(body)
    } else {
        paragraphs.join(" ")
    };

    (!text.is_empty()).then_some(text)
}

fn extract_year(xml: &str) -> Option<String> {
    let pub_date = pub_date_regex().captures(xml)?.get(1)?.as_str();
    first_element(pub_date, year_regex()).filter(|y| !y.is_empty())
}

fn extract_authors(xml: &str) -> String {
    let surnames: Vec<String> = author_regex()
        .captures_iter(xml)
        .filter_map(|caps| first_element(&caps[1], surname_regex()))
        .filter(|s| !s.is_empty())
        .collect();

    if surnames.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        format_authors(&surnames)
    }
}

#[async_trait]
impl Source for PmcSource {
    fn backend(&self) -> Backend {
        Backend::Pmc
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SourceError> {
        let search_url = self.eutils.search_url(&query.query, query.max_results, None)?;
        let body = self.client.get_text(&search_url).await?;

        let mut search = parse_esearch(&body)?;
        search.ids.truncate(query.max_results);
        tracing::debug!("PMC query translation: {}", search.query_translation);

        if search.ids.is_empty() {
            return Ok(SearchResponse::new(Vec::new(), self.name(), &query.query)
                .query_translation(search.query_translation));
        }

        let fetch_url = self.eutils.fetch_url(&search.ids)?;
        let xml = self.client.get_text(&fetch_url).await?;
        let records = Self::parse_fetch_response(&xml)?;
        let (articles, stats) = resolve_records(&search.ids, records, self.strict_id_matching);

        tracing::debug!(
            "PMC identifiers: {} native, {} via PMID, {} unresolved",
            stats.with_pmc_id,
            stats.pmid_fallback,
            stats.unresolved
        );

        Ok(SearchResponse::new(articles, self.name(), &query.query)
            .query_translation(search.query_translation)
            .id_stats(stats))
    }
}
