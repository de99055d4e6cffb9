//! Core data models for articles and search operations.

mod article;
mod search;

pub use article::{
    Article, ArticleBuilder, ArticleSource, NOT_AVAILABLE, NO_ABSTRACT, NO_TITLE, UNKNOWN,
};
pub use search::{
    Backend, BackendError, IdentifierStats, ReturnFormat, SearchDetail, SearchQuery,
    SearchRequest, SearchResponse, DEFAULT_MAX_RESULTS,
};
