//! Multi-backend search orchestration.
//!
//! [`LiteratureSearcher`] invokes the selected backends one after another,
//! pausing between invocations, and folds each backend's outcome into an
//! [`AggregationResult`]. A failing backend never aborts the run.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::models::{
    Article, Backend, BackendError, IdentifierStats, SearchDetail, SearchQuery, SearchRequest,
    SearchResponse,
};
use crate::output::{present, SearchOutput};
use crate::sources::{KoreaMedSource, PmcSource, PubMedSource, Source, SourceError};
use crate::utils::{deduplicate_articles, find_duplicates, HttpClient};

/// Result of one backend invocation
#[derive(Debug)]
pub enum BackendOutcome {
    /// The backend answered with a (possibly empty) result list
    Success(SearchResponse),
    /// The backend failed
    Failure {
        database: String,
        query: String,
        error: SourceError,
    },
}

/// Everything one aggregation run produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    /// The query, exactly as given
    pub query: String,

    /// Requested backend names, lower-cased
    pub databases_searched: Vec<String>,

    /// Articles in backend invocation order, then backend relevance order
    pub articles: Vec<Article>,

    /// One entry per backend that produced a response
    pub search_details: Vec<SearchDetail>,

    /// One entry per failing backend
    pub errors: Vec<BackendError>,

    /// Identifier statistics summed over all full-text responses
    pub id_stats: IdentifierStats,
}

impl AggregationResult {
    /// Empty result for a run over `databases`
    pub fn new(query: impl Into<String>, databases: &[String]) -> Self {
        Self {
            query: query.into(),
            databases_searched: databases.iter().map(|d| d.to_lowercase()).collect(),
            ..Self::default()
        }
    }

    /// Fold one backend outcome into the result.
    ///
    /// Failures without any response (connection refused, timeout) only
    /// add an error entry. Failures after a response also add a zero-count
    /// execution detail.
    pub fn with_outcome(mut self, outcome: BackendOutcome) -> Self {
        match outcome {
            BackendOutcome::Success(response) => {
                self.search_details
                    .push(SearchDetail::from_response(&self.query, &response));
                self.id_stats = self.id_stats + response.id_stats;
                self.articles.extend(response.articles);
            }
            BackendOutcome::Failure {
                database,
                query,
                error,
            } => {
                if error.had_response() {
                    self.search_details.push(SearchDetail::empty(&database, &query));
                }
                self.errors.push(BackendError::new(database, error));
            }
        }
        self
    }

    /// Drop cross-backend duplicates, keeping the first occurrence
    pub fn deduplicated(mut self) -> Self {
        let groups = find_duplicates(&self.articles);
        if !groups.is_empty() {
            let removed: usize = groups.iter().map(|g| g.len() - 1).sum();
            tracing::info!(duplicates_removed = removed, "Merged duplicate articles");
        }
        self.articles = deduplicate_articles(self.articles);
        self
    }
}

/// Searches several literature backends for one query
#[derive(Debug, Clone)]
pub struct LiteratureSearcher {
    sources: Vec<Arc<dyn Source>>,
    inter_backend_delay: Duration,
}

impl LiteratureSearcher {
    /// Build the PubMed, PMC and KoreaMed sources over one shared HTTP
    /// client.
    pub fn new(config: Config) -> Result<Self, SourceError> {
        let client = HttpClient::from_config(&config.http, config.retry)?;

        let sources: Vec<Arc<dyn Source>> = vec![
            Arc::new(PubMedSource::with_client(client.clone(), &config.endpoints)),
            Arc::new(
                PmcSource::with_client(client.clone(), &config.endpoints)
                    .strict_id_matching(config.search.strict_id_matching),
            ),
            Arc::new(KoreaMedSource::with_client(client, &config.endpoints)),
        ];

        Ok(Self::with_sources(sources, config.search.inter_backend_delay()))
    }

    /// Use arbitrary source implementations
    pub fn with_sources(sources: Vec<Arc<dyn Source>>, inter_backend_delay: Duration) -> Self {
        Self {
            sources,
            inter_backend_delay,
        }
    }

    fn source_for(&self, backend: Backend) -> Option<&Arc<dyn Source>> {
        self.sources.iter().find(|s| s.backend() == backend)
    }

    /// Run the query against every requested backend. Never fails; backend
    /// failures are recorded in the result.
    pub async fn search(&self, request: &SearchRequest) -> AggregationResult {
        let names = request.database_names();
        tracing::info!("Searching {} for: {}", names.join(", "), request.query);

        let mut result = AggregationResult::new(&request.query, &names);
        let mut invoked = 0usize;

        for name in &names {
            let Some(source) = Backend::parse(name).and_then(|b| self.source_for(b)) else {
                tracing::debug!("Skipping unknown database '{}'", name);
                continue;
            };

            if invoked > 0 && !self.inter_backend_delay.is_zero() {
                tracing::debug!(
                    "Waiting {:?} before querying {}",
                    self.inter_backend_delay,
                    source.name()
                );
                tokio::time::sleep(self.inter_backend_delay).await;
            }
            invoked += 1;

            let query =
                SearchQuery::new(&request.query).max_results(request.max_results_for_db(name));
            result = result.with_outcome(Self::run_source(source.as_ref(), &query).await);
        }

        tracing::info!(
            "Search finished: {} articles, {} errors",
            result.articles.len(),
            result.errors.len()
        );
        result
    }

    async fn run_source(source: &dyn Source, query: &SearchQuery) -> BackendOutcome {
        tracing::info!("Querying {} (max {} results)", source.name(), query.max_results);

        match source.search(query).await {
            Ok(response) => {
                tracing::info!("{} returned {} articles", source.name(), response.len());
                BackendOutcome::Success(response)
            }
            Err(error) => {
                tracing::warn!("{} search failed: {}", source.name(), error);
                BackendOutcome::Failure {
                    database: source.name().to_string(),
                    query: query.query.clone(),
                    error,
                }
            }
        }
    }

    /// Search, deduplicate and render in the requested format
    pub async fn search_literature(&self, request: &SearchRequest) -> SearchOutput {
        let result = self.search(request).await.deduplicated();
        present(result, request.return_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleSource, ReturnFormat};
    use crate::sources::mock::{make_article, MockError};
    use crate::sources::MockSource;

    fn searcher(sources: Vec<Arc<MockSource>>) -> LiteratureSearcher {
        let sources = sources
            .into_iter()
            .map(|s| s as Arc<dyn Source>)
            .collect();
        LiteratureSearcher::with_sources(sources, Duration::ZERO)
    }

    fn pubmed_mock() -> Arc<MockSource> {
        Arc::new(MockSource::new(Backend::PubMed).with_articles(vec![
            make_article("PMID:1", "Cardiac sarcoidosis", ArticleSource::PubMed),
            make_article("PMID:2", "Renal sarcoidosis", ArticleSource::PubMed),
        ]))
    }

    #[tokio::test]
    async fn test_search_merges_in_backend_order() {
        let pubmed = pubmed_mock();
        let pmc = Arc::new(MockSource::new(Backend::Pmc).with_articles(vec![make_article(
            "PMC9",
            "cardiac sarcoidosis",
            ArticleSource::Pmc,
        )]));
        let koreamed = Arc::new(MockSource::new(Backend::KoreaMed));

        let result = searcher(vec![pubmed, pmc, koreamed])
            .search(&SearchRequest::new("sarcoidosis"))
            .await;

        let ids: Vec<_> = result.articles.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["PMID:1", "PMID:2", "PMC9"]);
        assert_eq!(result.search_details.len(), 3);
        assert_eq!(result.search_details[2].result_count, 0);
        assert!(result.errors.is_empty());

        let deduped = result.deduplicated();
        let ids: Vec<_> = deduped.articles.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["PMID:1", "PMID:2"]);
    }

    #[tokio::test]
    async fn test_partial_failure_isolation() {
        let pubmed = pubmed_mock();
        let pmc = Arc::new(MockSource::new(Backend::Pmc).with_error(MockError::Api));
        let koreamed = Arc::new(MockSource::new(Backend::KoreaMed).with_articles(vec![
            make_article("KM1", "Korean case", ArticleSource::KoreaMed),
        ]));

        let result = searcher(vec![pubmed, pmc.clone(), koreamed.clone()])
            .search(&SearchRequest::new("q"))
            .await;

        assert_eq!(result.articles.len(), 3);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].database, "PMC");
        assert!(result.errors[0].error.contains("HTTP 500"));
        // a backend that answered with an error status still gets a row
        assert_eq!(result.search_details.len(), 3);
        assert_eq!(pmc.calls(), 1);
        assert_eq!(koreamed.calls(), 1);
    }

    #[tokio::test]
    async fn test_network_failure_has_no_detail() {
        let pubmed = Arc::new(MockSource::new(Backend::PubMed).with_error(MockError::Network));

        let result = searcher(vec![pubmed])
            .search(&SearchRequest::new("q").databases(["pubmed"]))
            .await;

        assert!(result.search_details.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].database, "PubMed");
    }

    #[tokio::test]
    async fn test_unknown_and_aliased_databases() {
        let pubmed = pubmed_mock();
        let pmc = Arc::new(MockSource::new(Backend::Pmc));

        let result = searcher(vec![pubmed.clone(), pmc.clone()])
            .search(&SearchRequest::new("q").databases(["Embase", "BIBLIOGRAPHIC"]))
            .await;

        assert_eq!(result.databases_searched, vec!["embase", "bibliographic"]);
        assert_eq!(result.search_details.len(), 1);
        assert_eq!(result.search_details[0].database, "PubMed");
        assert!(result.errors.is_empty());
        assert_eq!(pubmed.calls(), 1);
        assert_eq!(pmc.calls(), 0);
    }

    #[tokio::test]
    async fn test_per_database_caps() {
        let pubmed = pubmed_mock();

        let request = SearchRequest::new("q")
            .databases(["pubmed"])
            .max_results_per_db(20)
            .max_results_for("PubMed", 1);
        let result = searcher(vec![pubmed]).search(&request).await;

        assert_eq!(result.articles.len(), 1);
    }

    #[tokio::test]
    async fn test_id_stats_are_summed() {
        let stats = IdentifierStats {
            with_pmc_id: 2,
            pmid_fallback: 1,
            unresolved: 0,
        };
        let pmc = Arc::new(
            MockSource::new(Backend::Pmc)
                .with_response(SearchResponse::new(Vec::new(), "PMC", "q").id_stats(stats)),
        );

        let result = searcher(vec![pmc])
            .search(&SearchRequest::new("q").databases(["pmc", "pmc"]))
            .await;

        assert_eq!(result.id_stats.with_pmc_id, 4);
        assert_eq!(result.id_stats.pmid_fallback, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_between_backends() {
        let sources: Vec<Arc<dyn Source>> = vec![
            Arc::new(MockSource::new(Backend::PubMed)),
            Arc::new(MockSource::new(Backend::Pmc)),
            Arc::new(MockSource::new(Backend::KoreaMed)),
        ];
        let searcher = LiteratureSearcher::with_sources(sources, Duration::from_millis(500));

        let start = tokio::time::Instant::now();
        searcher.search(&SearchRequest::new("q")).await;
        let elapsed = start.elapsed();

        // two pauses, none after the last backend
        assert!(elapsed >= Duration::from_millis(1000));
        assert!(elapsed < Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_search_literature_raw() {
        let output = searcher(vec![pubmed_mock()])
            .search_literature(
                &SearchRequest::new("q")
                    .databases(["pubmed"])
                    .return_format(ReturnFormat::Raw),
            )
            .await;

        assert!(output.success);
        assert_eq!(output.results.as_ref().map(Vec::len), Some(2));
        assert_eq!(output.statistics.total_results, 2);
    }
}
