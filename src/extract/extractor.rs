//! Ties title/container/table/link/markdown extraction into one
//! [`FetchResult`], recording every attempt into the request's
//! [`DecisionTrace`] (spec §4.10).

use scraper::{Html, Selector};

use crate::domain::{
    DecisionTrace, FetchResult, LinkData, SelectorAttempt, TableData, Tier,
};

use super::links::extract_links;
use super::markdown::html_to_markdown;
use super::tables::extract_tables;
use super::title::extract_title;

const CONTENT_SELECTORS: &[&str] = &["main", "article", "[role=main]", ".content", "#content", ".main"];
/// Minimum text length to accept a non-body container as content (spec
/// §4.10). A container that matches but falls short keeps looking rather
/// than winning on a near-empty match.
const CONTAINER_MIN_CHARS: usize = 100;
const BODY_FALLBACK_MIN_CHARS: usize = 100;
const BODY_FALLBACK_CONFIDENCE: f64 = 0.4;

pub fn extract(html: &str, final_url: &str, tier_used: Tier, domain: &str) -> FetchResult {
    let document = Html::parse_document(html);
    let mut trace = DecisionTrace::new(domain);

    let title_attempts = extract_title(&document);
    for attempt in &title_attempts {
        trace.record_title(attempt.clone());
    }
    let selected_title = title_attempts.iter().find(|a| a.selected);
    let title = selected_title.and_then(|a| a.value.clone());
    let title_source = selected_title.map(|a| a.source).unwrap_or(crate::domain::TitleSource::Unknown);

    let (content_text, content_confidence, selector_attempts) = select_content(&document);
    for attempt in &selector_attempts {
        trace.record_selector(attempt.clone());
    }

    let markdown = html_to_markdown(&document);
    let tables: Vec<TableData> = extract_tables(&document);
    let links: Vec<LinkData> = extract_links(&document);

    let title_confidence = selected_title.map(|a| a.confidence).unwrap_or(0.0);
    let confidence = (title_confidence + content_confidence) / 2.0;

    trace.finish(true, Some(tier_used));

    FetchResult {
        final_url: final_url.to_string(),
        title,
        title_source,
        text: content_text,
        markdown,
        tables,
        links,
        structured: None,
        tier_used,
        fell_back: trace.fell_back(),
        confidence,
        decision_trace: trace,
    }
}

/// Tries each content container in priority order; falls back to `<body>`
/// text if none match, or if no matched container clears the minimum
/// length to trust over the body fallback (spec §4.10: a non-body
/// container must exceed 100 characters to be accepted; a short match is
/// recorded as unmatched and the search continues to the next selector).
fn select_content(document: &Html) -> (String, f64, Vec<SelectorAttempt>) {
    let mut attempts = Vec::new();

    for selector_str in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        if let Some(el) = document.select(&selector).next() {
            let text = el.text().collect::<String>().trim().to_string();
            if text.chars().count() > CONTAINER_MIN_CHARS {
                attempts.push(SelectorAttempt {
                    selector: selector_str.to_string(),
                    matched: true,
                    confidence: 0.8,
                    selected: true,
                });
                return (text, 0.8, attempts);
            }
            attempts.push(SelectorAttempt {
                selector: selector_str.to_string(),
                matched: !text.is_empty(),
                confidence: 0.0,
                selected: false,
            });
        } else {
            attempts.push(SelectorAttempt {
                selector: selector_str.to_string(),
                matched: false,
                confidence: 0.0,
                selected: false,
            });
        }
    }

    let body_selector = Selector::parse("body").unwrap();
    let body_text = document
        .select(&body_selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let accepted = body_text.chars().count() >= BODY_FALLBACK_MIN_CHARS;
    attempts.push(SelectorAttempt {
        selector: "body".to_string(),
        matched: !body_text.is_empty(),
        confidence: if accepted { BODY_FALLBACK_CONFIDENCE } else { 0.0 },
        selected: true,
    });

    if accepted {
        (body_text, BODY_FALLBACK_CONFIDENCE, attempts)
    } else {
        (body_text, 0.0, attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_main_over_body() {
        let html = format!(
            "<html><body><main>Main content here. {}</main><div>noise</div></body></html>",
            "More article text to clear the minimum length. ".repeat(3)
        );
        let result = extract(&html, "https://example.com", Tier::Intelligence, "example.com");
        assert!(result.text.contains("Main content"));
        assert!(!result.text.contains("noise"));
    }

    #[test]
    fn short_container_match_falls_through_to_body() {
        let html = format!(
            "<html><body><main>hi</main><p>{}</p></body></html>",
            "word ".repeat(30)
        );
        let result = extract(&html, "https://example.com", Tier::Intelligence, "example.com");
        assert!(!result.text.contains("hi word"));
        assert!(result.text.contains("word"));
        let main_attempt = result
            .decision_trace
            .selectors
            .iter()
            .find(|s| s.selector == "main")
            .unwrap();
        assert!(!main_attempt.selected);
    }

    #[test]
    fn falls_back_to_body_when_no_container_matches() {
        let html = format!(
            "<html><body><p>{}</p></body></html>",
            "word ".repeat(30)
        );
        let result = extract(&html, "https://example.com", Tier::Intelligence, "example.com");
        assert!(result.text.len() > BODY_FALLBACK_MIN_CHARS);
        assert_eq!(result.confidence.max(0.0), result.confidence);
    }

    #[test]
    fn short_body_fallback_is_rejected_as_low_confidence() {
        let html = "<html><body><p>hi</p></body></html>";
        let result = extract(html, "https://example.com", Tier::Intelligence, "example.com");
        let body_attempt = result
            .decision_trace
            .selectors
            .iter()
            .find(|s| s.selector == "body")
            .unwrap();
        assert_eq!(body_attempt.confidence, 0.0);
    }

    #[test]
    fn records_decision_trace_with_title_and_selector_attempts() {
        let html = r#"<html><head><title>T</title></head><body><main>Main content here, long enough.</main></body></html>"#;
        let result = extract(html, "https://example.com", Tier::Intelligence, "example.com");
        assert!(!result.decision_trace.title.is_empty());
        assert!(!result.decision_trace.selectors.is_empty());
    }
}
