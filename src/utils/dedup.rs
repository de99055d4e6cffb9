//! Cross-backend deduplication of articles.
//!
//! Two articles are treated as the same document when their normalized
//! titles (lower-cased, trimmed) are equal. Input order is the backend
//! invocation order, so earlier backends win ties.

use std::collections::{HashMap, HashSet};

use crate::models::Article;

/// Title keys that carry no identity and are never emitted
const PLACEHOLDER_KEYS: [&str; 2] = ["", "no title"];

fn is_placeholder(key: &str) -> bool {
    PLACEHOLDER_KEYS.contains(&key)
}

/// Keep the first article for every normalized title and drop the rest.
///
/// Articles with an empty or `"no title"` title are dropped entirely.
pub fn deduplicate_articles(articles: Vec<Article>) -> Vec<Article> {
    let mut seen: HashSet<String> = HashSet::new();
    let input_len = articles.len();

    let unique: Vec<Article> = articles
        .into_iter()
        .filter(|article| {
            let key = article.title_key();
            !is_placeholder(&key) && seen.insert(key)
        })
        .collect();

    if unique.len() != input_len {
        tracing::debug!(
            "Deduplication removed {} of {} articles",
            input_len - unique.len(),
            input_len
        );
    }

    unique
}

/// Find groups of articles sharing a normalized title.
///
/// Returns index groups (in input order) with more than one member;
/// placeholder titles are ignored.
pub fn find_duplicates(articles: &[Article]) -> Vec<Vec<usize>> {
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for (idx, article) in articles.iter().enumerate() {
        let key = article.title_key();
        if is_placeholder(&key) {
            continue;
        }
        let group = groups.entry(key.clone()).or_default();
        if group.is_empty() {
            order.push(key);
        }
        group.push(idx);
    }

    order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .filter(|group| group.len() > 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArticleSource;

    fn article(id: &str, title: &str, source: ArticleSource) -> Article {
        Article::new(id, title, format!("https://example.com/{}", id), source)
    }

    #[test]
    fn test_keeps_first_occurrence() {
        let articles = vec![
            article("PMID:1", "Cardiac Sarcoidosis", ArticleSource::PubMed),
            article("PMC9", "cardiac sarcoidosis ", ArticleSource::Pmc),
            article("KM3", "Renal sarcoidosis", ArticleSource::KoreaMed),
        ];

        let unique = deduplicate_articles(articles);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].id, "PMID:1");
        assert_eq!(unique[1].id, "KM3");
    }

    #[test]
    fn test_drops_placeholder_titles() {
        let articles = vec![
            article("PMC1", "", ArticleSource::Pmc),
            article("PMC2", "No title", ArticleSource::Pmc),
            article("PMC3", "   ", ArticleSource::Pmc),
            article("PMC4", "Real title", ArticleSource::Pmc),
        ];

        let unique = deduplicate_articles(articles);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].id, "PMC4");
    }

    #[test]
    fn test_idempotent() {
        let articles = vec![
            article("PMID:1", "A", ArticleSource::PubMed),
            article("PMID:2", "B", ArticleSource::PubMed),
            article("PMC1", "a", ArticleSource::Pmc),
            article("KM1", "no title", ArticleSource::KoreaMed),
        ];

        let once = deduplicate_articles(articles);
        let twice = deduplicate_articles(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_preserves_order() {
        let articles = vec![
            article("PMID:3", "C", ArticleSource::PubMed),
            article("PMID:1", "A", ArticleSource::PubMed),
            article("PMID:2", "B", ArticleSource::PubMed),
        ];
        let ids: Vec<_> = deduplicate_articles(articles)
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec!["PMID:3", "PMID:1", "PMID:2"]);
    }

    #[test]
    fn test_find_duplicates() {
        let articles = vec![
            article("PMID:1", "A", ArticleSource::PubMed),
            article("PMID:2", "B", ArticleSource::PubMed),
            article("PMC1", "a", ArticleSource::Pmc),
            article("KM1", "A ", ArticleSource::KoreaMed),
            article("KM2", "", ArticleSource::KoreaMed),
            article("KM3", "", ArticleSource::KoreaMed),
        ];

        let groups = find_duplicates(&articles);
        assert_eq!(groups, vec![vec![0, 2, 3]]);
    }
}
