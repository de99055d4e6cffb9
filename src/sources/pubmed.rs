//! PubMed source implementation using the E-utilities API.
//!
//! Two phases: esearch (JSON, relevance-sorted) yields the ranked PMID list,
//! then a single batched efetch (XML) yields the records. Records are
//! re-sequenced by the esearch order since efetch does not preserve it.

use async_trait::async_trait;
use quick_xml::de::from_str;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::config::{Config, EndpointsConfig};
use crate::models::{
    Article, ArticleBuilder, ArticleSource, Backend, SearchQuery, SearchResponse, NOT_AVAILABLE,
    NO_ABSTRACT, UNKNOWN,
};
use crate::sources::eutils::{parse_esearch, Eutils};
use crate::sources::{Source, SourceError};
use crate::utils::{
    clean_text, format_authors, split_records, strip_inline_tags, title_from_abstract, HttpClient,
};

/// Titles PubMed uses when the record has no real title
const NOT_AVAILABLE_TITLES: [&str; 3] = ["[Not Available].", "[Not Available]", "Not Available"];

/// PubMed research source
#[derive(Debug, Clone)]
pub struct PubMedSource {
    client: HttpClient,
    eutils: Eutils,
}

impl PubMedSource {
    /// Create a PubMed source from configuration
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        let client = HttpClient::from_config(&config.http, config.retry)?;
        Ok(Self::with_client(client, &config.endpoints))
    }

    /// Create with a shared HTTP client
    pub fn with_client(client: HttpClient, endpoints: &EndpointsConfig) -> Self {
        Self {
            client,
            eutils: Eutils::new(endpoints, "pubmed"),
        }
    }

    /// Parse an efetch XML document into `(pmid, article)` pairs in document
    /// order. Records that fail to deserialize are skipped.
    fn parse_fetch_response(xml: &str) -> Result<Vec<(String, Article)>, SourceError> {
        let xml = strip_inline_tags(xml);
        let records = split_records(&xml, "PubmedArticle");

        if records.is_empty() {
            if xml.contains("PubmedArticleSet") {
                return Ok(Vec::new());
            }
            return Err(SourceError::Parse(
                "efetch response is not a PubmedArticleSet".to_string(),
            ));
        }

        let mut parsed = Vec::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            match from_str::<PubmedArticle>(&flatten_text_elements(record)) {
                Ok(article) => match Self::to_article(article) {
                    Some(pair) => parsed.push(pair),
                    None => tracing::warn!("Skipping PubMed record {} without PMID", idx),
                },
                Err(e) => tracing::warn!("Skipping malformed PubMed record {}: {}", idx, e),
            }
        }

        Ok(parsed)
    }

    fn to_article(record: PubmedArticle) -> Option<(String, Article)> {
        let citation = record.MedlineCitation?;
        let pmid = citation
            .PMID
            .map(|p| p.value.trim().to_string())
            .filter(|p| !p.is_empty())?;

        let article = citation.Article.unwrap_or_default();

        let abstract_parts: Vec<String> = article
            .Abstract
            .map(|ab| {
                ab.texts
                    .iter()
                    .map(|t| clean_text(&t.value))
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let abstract_text = (!abstract_parts.is_empty()).then(|| abstract_parts.join(" "));

        let raw_title = article
            .ArticleTitle
            .map(|t| clean_text(&t.value))
            .unwrap_or_default();
        let first_section = abstract_parts.first().map(String::as_str);
        let title = Self::choose_title(&raw_title, first_section, &pmid);

        let journal = article.Journal.unwrap_or_default();
        let year = journal
            .JournalIssue
            .and_then(|issue| issue.PubDate)
            .and_then(|date| {
                date.Year
                    .map(|y| y.trim().to_string())
                    .filter(|y| !y.is_empty())
                    .or_else(|| date.MedlineDate.as_deref().and_then(leading_year))
            })
            .unwrap_or_else(|| UNKNOWN.to_string());
        let journal_title = journal
            .Title
            .map(|t| clean_text(&t))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());

        let surnames: Vec<String> = article
            .AuthorList
            .map(|list| {
                list.authors
                    .into_iter()
                    .filter_map(|a| a.LastName)
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let authors = if surnames.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            format_authors(&surnames)
        };

        let built = ArticleBuilder::new(
            format!("PMID:{}", pmid),
            title,
            format!("https://pubmed.ncbi.nlm.nih.gov/{}/", pmid),
            ArticleSource::PubMed,
        )
        .abstract_text(abstract_text.unwrap_or_else(|| NO_ABSTRACT.to_string()))
        .year(year)
        .journal(journal_title)
        .authors(authors)
        .build();

        Some((pmid, built))
    }

    /// Own title, else a title synthesized from the first abstract
    /// section, else a placeholder naming the PMID.
    fn choose_title(title: &str, abstract_text: Option<&str>, pmid: &str) -> String {
        let title = title.trim();
        if !title.is_empty() && !NOT_AVAILABLE_TITLES.contains(&title) {
            return title.to_string();
        }
        match abstract_text {
            Some(text) => title_from_abstract(text),
            None => format!("[No title available - PMID:{}]", pmid),
        }
    }

    /// Re-sequence parsed records by the esearch id order
    fn order_by_ids(ids: &[String], records: Vec<(String, Article)>) -> Vec<Article> {
        let mut by_id: HashMap<String, Article> = HashMap::with_capacity(records.len());
        for (pmid, article) in records {
            by_id.entry(pmid).or_insert(article);
        }

        let ordered: Vec<Article> = ids.iter().filter_map(|id| by_id.remove(id)).collect();

        if ordered.len() < ids.len() {
            tracing::debug!(
                "PubMed efetch returned {} of {} requested records",
                ordered.len(),
                ids.len()
            );
        }
        if !by_id.is_empty() {
            tracing::debug!("Ignoring {} unrequested PubMed records", by_id.len());
        }

        ordered
    }
}

fn title_element_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<ArticleTitle(\s[^>]*)?>(.*?)</ArticleTitle>")
            .expect("valid ArticleTitle regex")
    })
}

fn abstract_element_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<AbstractText(\s[^>]*)?>(.*?)</AbstractText>")
            .expect("valid AbstractText regex")
    })
}

/// Reduce `ArticleTitle` and `AbstractText` content to plain text so that
/// embedded markup (MathML, tables) cannot fail the whole record.
/// Entities are left escaped for the XML deserializer.
fn flatten_text_elements(xml: &str) -> String {
    let xml = title_element_regex()
        .replace_all(xml, |caps: &Captures| flatten_element("ArticleTitle", caps));
    abstract_element_regex()
        .replace_all(&xml, |caps: &Captures| flatten_element("AbstractText", caps))
        .into_owned()
}

fn flatten_element(tag: &str, caps: &Captures) -> String {
    format!(
        "<{tag}{}>{}</{tag}>",
        caps.get(1).map_or("", |m| m.as_str()),
        clean_text(&caps[2])
    )
}

/// Year prefix of a free-form MedlineDate such as `"1998 Dec-1999 Jan"`
fn leading_year(date: &str) -> Option<String> {
    let year: String = date.trim().chars().take(4).collect();
    (year.len() == 4 && year.chars().all(|c| c.is_ascii_digit())).then_some(year)
}

#[async_trait]
impl Source for PubMedSource {
    fn backend(&self) -> Backend {
        Backend::PubMed
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SourceError> {
        let search_url = self
            .eutils
            .search_url(&query.query, query.max_results, Some("relevance"))?;
        let body = self.client.get_text(&search_url).await?;

        let mut search = parse_esearch(&body)?;
        search.ids.truncate(query.max_results);
        tracing::debug!("PubMed query translation: {}", search.query_translation);

        if search.ids.is_empty() {
            return Ok(SearchResponse::new(Vec::new(), self.name(), &query.query)
                .query_translation(search.query_translation));
        }

        let fetch_url = self.eutils.fetch_url(&search.ids)?;
        let xml = self.client.get_text(&fetch_url).await?;
        let records = Self::parse_fetch_response(&xml)?;
        let articles = Self::order_by_ids(&search.ids, records);

        Ok(SearchResponse::new(articles, self.name(), &query.query)
            .query_translation(search.query_translation))
    }
}

// ===== PubMed efetch XML types =====

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct PubmedArticle {
    MedlineCitation: Option<MedlineCitation>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct MedlineCitation {
    PMID: Option<TextElement>,
    Article: Option<ArticleElement>,
}

/// Element whose text is wanted regardless of its attributes
#[derive(Debug, Default, Deserialize)]
struct TextElement {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[allow(non_snake_case)]
struct ArticleElement {
    Journal: Option<Journal>,
    ArticleTitle: Option<TextElement>,
    Abstract: Option<Abstract>,
    AuthorList: Option<AuthorList>,
}

#[derive(Debug, Default, Deserialize)]
#[allow(non_snake_case)]
struct Journal {
    JournalIssue: Option<JournalIssue>,
    Title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JournalIssue {
    PubDate: Option<PubDate>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct PubDate {
    Year: Option<String>,
    MedlineDate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Abstract {
    #[serde(rename = "AbstractText", default)]
    texts: Vec<TextElement>,
}

#[derive(Debug, Deserialize)]
struct AuthorList {
    #[serde(rename = "Author", default)]
    authors: Vec<Author>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct Author {
    LastName: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::utils::RetryConfig;
    use mockito::Matcher;

    fn record(pmid: &str, title: &str, extra: &str) -> String {
        format!(
            r#"<PubmedArticle><MedlineCitation Status="MEDLINE" Owner="NLM">
<PMID Version="1">{pmid}</PMID>
<Article PubModel="Print">
<Journal><JournalIssue CitedMedium="Internet"><PubDate><Year>2021</Year><Month>Mar</Month></PubDate></JournalIssue>
<Title>Respiratory medicine</Title></Journal>
<ArticleTitle>{title}</ArticleTitle>
{extra}
</Article></MedlineCitation></PubmedArticle>"#
        )
    }

    fn article_set(records: &[String]) -> String {
        format!(
            "<?xml version=\"1.0\" ?>\n<PubmedArticleSet>{}</PubmedArticleSet>",
            records.join("\n")
        )
    }

    fn source(base: &str) -> PubMedSource {
        let endpoints = EndpointsConfig {
            eutils_base_url: base.to_string(),
            ..EndpointsConfig::default()
        };
        let client = HttpClient::from_config(&HttpConfig::default(), RetryConfig::no_retry()).unwrap();
        PubMedSource::with_client(client, &endpoints)
    }

    #[test]
    fn test_parse_fetch_response_fields() {
        let xml = article_set(&[record(
            "111",
            "Cardiac <i>sarcoidosis</i>: a case",
            r#"<Abstract><AbstractText Label="BACKGROUND">First part.</AbstractText>
<AbstractText Label="RESULTS">CO<sub>2</sub> rose.</AbstractText></Abstract>
<AuthorList><Author><LastName>Kim</LastName><ForeName>A</ForeName></Author>
<Author><LastName>Lee</LastName></Author><Author><LastName>Park</LastName></Author>
<Author><LastName>Choi</LastName></Author></AuthorList>"#,
        )]);

        let parsed = PubMedSource::parse_fetch_response(&xml).unwrap();
        assert_eq!(parsed.len(), 1);

        let (pmid, article) = &parsed[0];
        assert_eq!(pmid, "111");
        assert_eq!(article.id, "PMID:111");
        assert_eq!(article.title, "Cardiac sarcoidosis: a case");
        assert_eq!(article.r#abstract, "First part. CO2 rose.");
        assert_eq!(article.year, "2021");
        assert_eq!(article.journal, "Respiratory medicine");
        assert_eq!(article.authors, "Kim, Lee, Park et al.");
        assert_eq!(article.url, "https://pubmed.ncbi.nlm.nih.gov/111/");
        assert_eq!(article.source, ArticleSource::PubMed);
    }

    #[test]
    fn test_title_policy() {
        let xml = article_set(&[
            record(
                "1",
                "[Not Available].",
                "<Abstract><AbstractText>Renal involvement is rare. More text.</AbstractText></Abstract>",
            ),
            record("2", "", ""),
        ]);

        let parsed = PubMedSource::parse_fetch_response(&xml).unwrap();
        assert_eq!(parsed[0].1.title, "Renal involvement is rare...");
        assert_eq!(parsed[1].1.title, "[No title available - PMID:2]");
        assert_eq!(parsed[1].1.r#abstract, NO_ABSTRACT);
        assert_eq!(parsed[1].1.authors, NOT_AVAILABLE);
    }

    #[test]
    fn test_title_from_first_abstract_section() {
        let xml = article_set(&[record(
            "3",
            "[Not Available]",
            r#"<Abstract><AbstractText Label="BACKGROUND">Hepatic granulomas without a stop</AbstractText>
<AbstractText Label="RESULTS">Second section. More.</AbstractText></Abstract>"#,
        )]);

        let parsed = PubMedSource::parse_fetch_response(&xml).unwrap();
        assert_eq!(parsed[0].1.title, "Hepatic granulomas without a stop...");
        assert_eq!(
            parsed[0].1.r#abstract,
            "Hepatic granulomas without a stop Second section. More."
        );
    }

    #[test]
    fn test_mathml_markup_keeps_record() {
        let xml = article_set(&[
            record(
                "4",
                "Effect of <mml:math><mml:mi>x</mml:mi></mml:math> on sarcoidosis",
                r#"<Abstract><AbstractText>Levels of <mml:math display="inline"><mml:msub><mml:mi>T</mml:mi><mml:mn>4</mml:mn></mml:msub></mml:math> rose &amp; fell.</AbstractText></Abstract>"#,
            ),
            record("5", "Plain title", ""),
        ]);

        let parsed = PubMedSource::parse_fetch_response(&xml).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].1.title, "Effect of x on sarcoidosis");
        assert_eq!(parsed[0].1.r#abstract, "Levels of T4 rose & fell.");
        assert_eq!(parsed[1].1.title, "Plain title");
    }

    #[test]
    fn test_medline_date_year() {
        let xml = article_set(&[r#"<PubmedArticle><MedlineCitation><PMID>5</PMID><Article>
<Journal><JournalIssue><PubDate><MedlineDate>1998 Dec-1999 Jan</MedlineDate></PubDate></JournalIssue></Journal>
<ArticleTitle>T</ArticleTitle></Article></MedlineCitation></PubmedArticle>"#
            .to_string()]);

        let parsed = PubMedSource::parse_fetch_response(&xml).unwrap();
        assert_eq!(parsed[0].1.year, "1998");
        assert_eq!(parsed[0].1.journal, UNKNOWN);
    }

    #[test]
    fn test_malformed_record_is_skipped() {
        let broken = "<PubmedArticle><MedlineCitation><PMID>9</PMID><Article>\
                      <ArticleTitle>Mismatched</ArticleTitel></Article></MedlineCitation></PubmedArticle>"
            .to_string();
        let xml = article_set(&[record("1", "Good", ""), broken, record("2", "Also good", "")]);

        let parsed = PubMedSource::parse_fetch_response(&xml).unwrap();
        let ids: Vec<_> = parsed.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_non_xml_fetch_body_is_parse_error() {
        let result = PubMedSource::parse_fetch_response("<html><body>Busy</body></html>");
        assert!(matches!(result, Err(SourceError::Parse(_))));
    }

    #[test]
    fn test_order_by_ids() {
        let xml = article_set(&[
            record("2", "Second", ""),
            record("1", "First", ""),
            record("77", "Unrequested", ""),
        ]);
        let records = PubMedSource::parse_fetch_response(&xml).unwrap();

        let ids = vec!["1".to_string(), "2".to_string(), "3".to_string()];
        let ordered = PubMedSource::order_by_ids(&ids, records);
        let ids: Vec<_> = ordered.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["PMID:1", "PMID:2"]);
    }

    #[tokio::test]
    async fn test_search_two_phase() {
        let mut server = mockito::Server::new_async().await;
        let esearch = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("db".into(), "pubmed".into()),
                Matcher::UrlEncoded("sort".into(), "relevance".into()),
                Matcher::UrlEncoded("retmax".into(), "3".into()),
                Matcher::UrlEncoded("term".into(), "lung nodule".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"esearchresult":{"idlist":["3","1","2"],"querytranslation":"lung[All Fields] AND nodule[All Fields]"}}"#,
            )
            .create_async()
            .await;
        let efetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::UrlEncoded("id".into(), "3,1,2".into()))
            .with_body(article_set(&[
                record("1", "One", ""),
                record("2", "Two", ""),
                record("3", "Three", ""),
            ]))
            .create_async()
            .await;

        let response = source(&server.url())
            .search(&SearchQuery::new("lung nodule").max_results(3))
            .await
            .unwrap();

        let titles: Vec<_> = response.articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Three", "One", "Two"]);
        assert_eq!(response.database, "PubMed");
        assert_eq!(response.executed_query, "lung nodule");
        assert_eq!(
            response.query_translation,
            "lung[All Fields] AND nodule[All Fields]"
        );
        esearch.assert_async().await;
        efetch.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_no_ids_skips_fetch() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_body(r#"{"esearchresult":{"idlist":[],"querytranslation":"zzz[All Fields]"}}"#)
            .create_async()
            .await;
        let efetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let response = source(&server.url())
            .search(&SearchQuery::new("zzz"))
            .await
            .unwrap();

        assert!(response.is_empty());
        assert_eq!(response.query_translation, "zzz[All Fields]");
        efetch.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_http_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let result = source(&server.url()).search(&SearchQuery::new("q")).await;
        assert!(matches!(result, Err(SourceError::Api(_))));
    }
}
