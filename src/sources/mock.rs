//! Mock source for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::models::{Article, ArticleSource, Backend, SearchQuery, SearchResponse};
use crate::sources::{Source, SourceError};

/// What the mock answers with
#[derive(Debug, Clone)]
enum MockReply {
    Articles(SearchResponse),
    Error(MockError),
}

/// Failure kinds a mock can reproduce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockError {
    /// No response at all (connection refused)
    Network,
    /// The backend answered with an error status
    Api,
    /// The backend answered with an unreadable body
    Parse,
}

impl MockError {
    fn to_source_error(self) -> SourceError {
        match self {
            MockError::Network => SourceError::Network("connection refused".to_string()),
            MockError::Api => SourceError::Api("HTTP 500 Internal Server Error".to_string()),
            MockError::Parse => SourceError::Parse("unexpected body".to_string()),
        }
    }
}

/// A mock source that returns predefined responses and counts calls.
#[derive(Debug)]
pub struct MockSource {
    backend: Backend,
    reply: Mutex<Option<MockReply>>,
    calls: AtomicUsize,
}

impl MockSource {
    /// Create a mock standing in for `backend`, answering with no results.
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            reply: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Answer with these articles (truncated to the query's cap).
    pub fn with_articles(self, articles: Vec<Article>) -> Self {
        let response = SearchResponse::new(articles, self.backend.name(), "");
        self.with_response(response)
    }

    /// Answer with a complete response.
    pub fn with_response(self, response: SearchResponse) -> Self {
        self.set_reply(MockReply::Articles(response));
        self
    }

    /// Fail every search.
    pub fn with_error(self, error: MockError) -> Self {
        self.set_reply(MockReply::Error(error));
        self
    }

    /// Number of searches performed
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn set_reply(&self, reply: MockReply) {
        if let Ok(mut guard) = self.reply.lock() {
            *guard = Some(reply);
        }
    }
}

#[async_trait]
impl Source for MockSource {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let reply = self
            .reply
            .lock()
            .map_err(|_| SourceError::Other("mock lock poisoned".to_string()))?
            .clone();

        match reply {
            Some(MockReply::Articles(mut response)) => {
                response.articles.truncate(query.max_results);
                response.executed_query = query.query.clone();
                Ok(response)
            }
            Some(MockReply::Error(error)) => Err(error.to_source_error()),
            None => Ok(SearchResponse::new(Vec::new(), self.backend.name(), &query.query)),
        }
    }
}

/// Helper function to create a mock article for testing.
pub fn make_article(id: &str, title: &str, source: ArticleSource) -> Article {
    Article::new(id, title, format!("https://example.com/{}", id), source)
}
