//! Result presentation.
//!
//! Turns an [`AggregationResult`] into a [`SearchOutput`] in one of three
//! projections:
//!
//! - **compact**: execution summary plus a title / synopsis / link table
//! - **detailed**: execution summary plus one block per article
//! - **raw**: execution summary plus the structured article list

mod markdown;
mod summary;

pub use markdown::{
    compact_table, deep_search_url, detailed_blocks, escape_cell, execution_summary,
    truncate_chars,
};
pub use summary::{extract_summary, SUMMARY_MAX_WORDS};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aggregate::AggregationResult;
use crate::models::{Article, BackendError, ReturnFormat};

/// Counts describing the final (deduplicated) result list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStatistics {
    pub query: String,
    pub total_results: usize,
    pub databases_searched: Vec<String>,
    /// Article count per source tag
    pub results_by_source: BTreeMap<String, usize>,
}

impl SearchStatistics {
    pub fn from_result(result: &AggregationResult) -> Self {
        let mut results_by_source = BTreeMap::new();
        for article in &result.articles {
            *results_by_source
                .entry(article.source.tag().to_string())
                .or_insert(0) += 1;
        }

        Self {
            query: result.query.clone(),
            total_results: result.articles.len(),
            databases_searched: result.databases_searched.clone(),
            results_by_source,
        }
    }
}

/// Response of a literature search, ready for serialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutput {
    pub success: bool,
    pub format: ReturnFormat,
    pub query: String,

    /// Rendered markdown (compact and detailed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Execution report (raw)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_summary: Option<String>,

    /// Structured articles (raw)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<Article>>,

    pub statistics: SearchStatistics,
    pub errors: Vec<BackendError>,
}

/// Render an aggregation result in the requested format
pub fn present(result: AggregationResult, format: ReturnFormat) -> SearchOutput {
    let statistics = SearchStatistics::from_result(&result);
    let summary = execution_summary(&result.search_details, &result.id_stats);

    let (content, execution_summary, results) = match format {
        ReturnFormat::Compact => (
            Some(format!("{}\n\n{}", summary, compact_table(&result.articles))),
            None,
            None,
        ),
        ReturnFormat::Detailed => (
            Some(format!("{}\n\n{}", summary, detailed_blocks(&result.articles))),
            None,
            None,
        ),
        ReturnFormat::Raw => (None, Some(summary), Some(result.articles)),
    };

    SearchOutput {
        success: true,
        format,
        query: result.query,
        content,
        execution_summary,
        results,
        statistics,
        errors: result.errors,
    }
}
