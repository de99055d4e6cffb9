//! Shared NCBI E-utilities plumbing for the PubMed and PMC sources.

use serde::Deserialize;
use url::Url;

use crate::config::EndpointsConfig;
use crate::models::NOT_AVAILABLE;
use crate::sources::SourceError;

/// E-utilities endpoint builder for one database (`pubmed` or `pmc`)
#[derive(Debug, Clone)]
pub(crate) struct Eutils {
    base_url: String,
    db: &'static str,
    api_key: Option<String>,
}

/// Ids and query translation returned by esearch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SearchIds {
    pub ids: Vec<String>,
    pub query_translation: String,
}

impl Eutils {
    pub fn new(endpoints: &EndpointsConfig, db: &'static str) -> Self {
        Self {
            base_url: endpoints.eutils_base_url.trim_end_matches('/').to_string(),
            db,
            api_key: endpoints.ncbi_api_key.clone().filter(|k| !k.is_empty()),
        }
    }

    /// esearch URL; `sort` is only sent when given
    pub fn search_url(
        &self,
        term: &str,
        max_results: usize,
        sort: Option<&str>,
    ) -> Result<String, SourceError> {
        let retmax = max_results.to_string();
        let mut params = vec![
            ("db", self.db),
            ("term", term),
            ("retmode", "json"),
            ("retmax", retmax.as_str()),
        ];
        if let Some(sort) = sort {
            params.push(("sort", sort));
        }
        self.build("esearch.fcgi", params)
    }

    /// Batched efetch URL returning XML for every id
    pub fn fetch_url(&self, ids: &[String]) -> Result<String, SourceError> {
        let joined = ids.join(",");
        self.build(
            "efetch.fcgi",
            vec![("db", self.db), ("id", joined.as_str()), ("retmode", "xml")],
        )
    }

    fn build<'a>(
        &'a self,
        endpoint: &str,
        mut params: Vec<(&'a str, &'a str)>,
    ) -> Result<String, SourceError> {
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.as_str()));
        }
        let url = Url::parse_with_params(&format!("{}/{}", self.base_url, endpoint), &params)
            .map_err(|e| SourceError::InvalidRequest(format!("Invalid E-utilities URL: {}", e)))?;
        Ok(url.into())
    }
}

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
    #[serde(default)]
    querytranslation: Option<String>,
    /// Present when E-utilities rejects the query
    #[serde(rename = "ERROR", default)]
    error: Option<String>,
}

/// Parse an esearch JSON body into ids and query translation
pub(crate) fn parse_esearch(body: &str) -> Result<SearchIds, SourceError> {
    let response: ESearchResponse = serde_json::from_str(body)?;
    let result = response.esearchresult;

    if let Some(error) = result.error.filter(|e| !e.is_empty()) {
        if result.idlist.is_empty() {
            return Err(SourceError::Api(format!("esearch: {}", error)));
        }
        tracing::debug!("esearch reported '{}' alongside results", error);
    }

    let query_translation = result
        .querytranslation
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    Ok(SearchIds {
        ids: result.idlist,
        query_translation,
    })
}
