//! Markdown rendering of results and execution details.

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::models::{Article, Backend, IdentifierStats, SearchDetail};

use super::summary::{extract_summary, SUMMARY_MAX_WORDS};

/// Longest query or translation shown in the execution table
const CELL_MAX_CHARS: usize = 50;

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Summary (≤70 words)")]
    summary: String,
    #[tabled(rename = "Link")]
    link: String,
}

#[derive(Tabled)]
struct ExecutionRow {
    #[tabled(rename = "Database")]
    database: String,
    #[tabled(rename = "Query Used")]
    query: String,
    #[tabled(rename = "Query Translation")]
    translation: String,
    #[tabled(rename = "Results")]
    results: usize,
    #[tabled(rename = "Status")]
    status: &'static str,
}

/// Flatten newlines and escape pipes so text fits in one table cell
pub fn escape_cell(text: &str) -> String {
    text.replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .replace('|', "\\|")
}

/// Cut `text` to `max` characters, appending `...` when shortened
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max).collect();
    format!("{}...", head)
}

/// Public search page for `query` on `backend`
pub fn deep_search_url(backend: Backend, query: &str) -> String {
    let encoded = urlencoding::encode(query);
    match backend {
        Backend::PubMed => format!("https://pubmed.ncbi.nlm.nih.gov/?term={}", encoded),
        Backend::Pmc => format!("https://www.ncbi.nlm.nih.gov/pmc/?term={}", encoded),
        Backend::KoreaMed => format!(
            "https://koreamed.org/SearchBasic.php?RID=0&DT=1&QY={}",
            encoded
        ),
    }
}

/// Title / synopsis / link table, or `"No results found."`
pub fn compact_table(articles: &[Article]) -> String {
    if articles.is_empty() {
        return "No results found.".to_string();
    }

    let rows = articles.iter().map(|article| ResultRow {
        title: escape_cell(&article.title),
        summary: escape_cell(&extract_summary(&article.r#abstract, SUMMARY_MAX_WORDS)),
        link: format!("[{}]({})", article.id, article.url),
    });

    format!(
        "## Results\n\n{}\n",
        Table::new(rows).with(Style::markdown())
    )
}

/// One block per article with the full abstract
pub fn detailed_blocks(articles: &[Article]) -> String {
    let mut out = String::from("## Detailed Results\n\n");

    for (i, article) in articles.iter().enumerate() {
        out.push_str(&format!("### [{}] {}\n\n", i + 1, article.title));
        out.push_str(&format!("**ID:** {}  \n", article.id));
        out.push_str(&format!("**Source:** {}  \n", article.source));
        out.push_str(&format!(
            "**Journal:** {} ({})  \n",
            article.journal, article.year
        ));
        out.push_str(&format!("**Authors:** {}  \n", article.authors));
        out.push_str(&format!("**URL:** {}  \n\n", article.url));
        out.push_str(&format!("**Abstract:**  \n{}\n\n", article.r#abstract));
        out.push_str("---\n\n");
    }

    out
}

/// Execution report: per-backend table, deep-search links for backends
/// with results, and full-text identifier statistics when present.
pub fn execution_summary(details: &[SearchDetail], id_stats: &IdentifierStats) -> String {
    let mut out = String::from("## Search Execution Summary\n\n");

    let rows = details.iter().map(|detail| ExecutionRow {
        database: escape_cell(&detail.database),
        query: format!(
            "`{}`",
            escape_cell(&truncate_chars(&detail.executed_query, CELL_MAX_CHARS))
        ),
        translation: escape_cell(&truncate_chars(&detail.query_translation, CELL_MAX_CHARS)),
        results: detail.result_count,
        status: if detail.result_count > 0 {
            "✅ Success"
        } else {
            "❌ No results"
        },
    });
    out.push_str(&Table::new(rows).with(Style::markdown()).to_string());
    out.push_str("\n\n");

    out.push_str("### 🔗 Search More Results Externally\n\n");
    out.push_str(
        "Only a subset of results is shown. Use these direct links to explore more results:\n\n",
    );
    for detail in details.iter().filter(|d| d.result_count > 0) {
        if let Some(backend) = Backend::parse(&detail.database) {
            out.push_str(&format!(
                "- **{}**: [Search on {}]({})\n",
                detail.database,
                backend.name(),
                deep_search_url(backend, &detail.executed_query)
            ));
        }
    }
    out.push('\n');

    if !id_stats.is_empty() {
        out.push_str("### 🔍 PMC Search Details\n\n");
        out.push_str(&format!(
            "- **With PMC ID**: {} articles (full-text available on PMC)\n",
            id_stats.with_pmc_id
        ));
        out.push_str(&format!(
            "- **PMID Fallback**: {} articles (PubMed links, no PMC full-text)\n",
            id_stats.pmid_fallback
        ));
        out.push_str(&format!(
            "- **Unresolved**: {} articles (search position unknown, omitted)\n\n",
            id_stats.unresolved
        ));
    }

    out
}
