//! Text normalizers shared by the backend parsers.

use regex::Regex;
use std::sync::OnceLock;

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid tag regex"))
}

fn whitespace_regex() -> &'static Regex {
    static WS: OnceLock<Regex> = OnceLock::new();
    WS.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

/// Strip markup tags and collapse runs of whitespace into single spaces.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let stripped = tag_regex().replace_all(text, "");
    whitespace_regex()
        .replace_all(&stripped, " ")
        .trim()
        .to_string()
}

/// Strip inline formatting tags (`<i>`, `<sup>`, ...) from XML so that
/// text-only elements deserialize cleanly.
pub fn strip_inline_tags(xml: &str) -> String {
    static INLINE: OnceLock<Regex> = OnceLock::new();
    let re = INLINE.get_or_init(|| {
        Regex::new(r"</?(?:i|b|u|sup|sub|em|strong|italic|bold|underline|sc)(?:\s[^>]*)?>")
            .expect("valid inline tag regex")
    });

    let cleaned = re.replace_all(xml, "");
    if cleaned.len() != xml.len() {
        tracing::trace!(
            "Stripped inline tags: {} bytes -> {} bytes",
            xml.len(),
            cleaned.len()
        );
    }
    cleaned.into_owned()
}

/// Decode XML entities and numeric character references
/// (`&amp;`, `&#x02014;`, `&#8211;`). Text with an unknown or malformed
/// entity is returned unchanged.
pub fn unescape_xml(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    match quick_xml::escape::unescape(text) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            tracing::trace!("Leaving text escaped: {}", e);
            text.to_string()
        }
    }
}

/// Plain text of raw XML element content: markup removed, entities
/// decoded, escaped inline formatting (`&lt;i&gt;`) removed, whitespace
/// collapsed.
pub fn xml_text(raw: &str) -> String {
    let decoded = unescape_xml(&clean_text(raw));
    let decoded = strip_inline_tags(&decoded);
    whitespace_regex()
        .replace_all(&decoded, " ")
        .trim()
        .to_string()
}

/// Join up to three surnames with `", "`, appending `" et al."` when more
/// authors exist. Returns an empty string for no authors.
pub fn format_authors<S: AsRef<str>>(surnames: &[S]) -> String {
    let shown = surnames
        .iter()
        .take(3)
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(", ");

    if surnames.len() > 3 {
        format!("{} et al.", shown)
    } else {
        shown
    }
}

/// Synthesize a title from the first sentence of an abstract, truncated to
/// 100 characters.
pub fn title_from_abstract(abstract_text: &str) -> String {
    let first_sentence: String = abstract_text
        .split('.')
        .next()
        .unwrap_or_default()
        .chars()
        .take(100)
        .collect();
    format!("{}...", first_sentence)
}

/// Split an XML document into the raw text of every `<tag ...>...</tag>`
/// record, in document order.
///
/// Records are located textually so that one malformed record cannot
/// prevent the others from being parsed.
pub fn split_records<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let mut records = Vec::new();
    let mut pos = 0;

    while let Some(found) = xml[pos..].find(&open) {
        let start = pos + found;
        let after = start + open.len();

        // `<article` must not match `<article-id` or `<articleSet`
        let boundary = xml[after..].chars().next();
        if !matches!(boundary, Some(c) if c == '>' || c == '/' || c.is_whitespace()) {
            pos = after;
            continue;
        }

        match xml[after..].find(&close) {
            Some(end) => {
                let end = after + end + close.len();
                records.push(&xml[start..end]);
                pos = end;
            }
            None => break,
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  <b>Lung</b>\n\n  nodules  "), "Lung nodules");
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("a\t\tb"), "a b");
    }

    #[test]
    fn test_strip_inline_tags() {
        let xml = r#"<AbstractText>CO<sup>2</sup> and <i>in vivo</i></AbstractText>"#;
        assert_eq!(
            strip_inline_tags(xml),
            "<AbstractText>CO2 and in vivo</AbstractText>"
        );
        // structural tags are untouched
        assert_eq!(strip_inline_tags("<Title>x</Title>"), "<Title>x</Title>");
    }

    #[test]
    fn test_unescape_xml() {
        assert_eq!(unescape_xml("A &amp; B &lt;5&gt;"), "A & B <5>");
        assert_eq!(unescape_xml("&amp;lt;"), "&lt;");
        assert_eq!(
            unescape_xml("Cardiac sarcoidosis&#x02014;a case"),
            "Cardiac sarcoidosis\u{2014}a case"
        );
        assert_eq!(unescape_xml("1990&#8211;2000"), "1990\u{2013}2000");
        assert_eq!(unescape_xml("AT&T &bogus;"), "AT&T &bogus;");
    }

    #[test]
    fn test_xml_text() {
        assert_eq!(
            xml_text("Lung <italic>nodules</italic>&#x000a0;in &lt;i&gt;adults&lt;/i&gt;"),
            "Lung nodules in adults"
        );
        assert_eq!(xml_text("p &lt; 0.05 &amp; q &gt; 1"), "p < 0.05 & q > 1");
    }

    #[test]
    fn test_format_authors() {
        assert_eq!(format_authors::<&str>(&[]), "");
        assert_eq!(format_authors(&["Kim"]), "Kim");
        assert_eq!(format_authors(&["Kim", "Lee", "Park"]), "Kim, Lee, Park");
        assert_eq!(
            format_authors(&["Kim", "Lee", "Park", "Choi"]),
            "Kim, Lee, Park et al."
        );
    }

    #[test]
    fn test_title_from_abstract() {
        assert_eq!(
            title_from_abstract("Sarcoidosis is rare. It is granulomatous."),
            "Sarcoidosis is rare..."
        );
        let long = "x".repeat(150);
        assert_eq!(title_from_abstract(&long).chars().count(), 103);
    }

    #[test]
    fn test_split_records() {
        let xml = "<set><article a=\"1\"><article-id>1</article-id></article>\
                   <article><article-title>T</article-title></article></set>";
        let records = split_records(xml, "article");
        assert_eq!(records.len(), 2);
        assert!(records[0].contains("<article-id>1</article-id>"));
        assert!(records[1].starts_with("<article>"));
    }

    #[test]
    fn test_split_records_skips_prefixed_tags() {
        let xml = "<PubmedArticleSet><PubmedArticle><PMID>1</PMID></PubmedArticle></PubmedArticleSet>";
        let records = split_records(xml, "PubmedArticle");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0], "<PubmedArticle><PMID>1</PMID></PubmedArticle>");
    }
}
