//! Link extraction (spec §4.10): every `<a href>` except bare anchors and
//! `javascript:` URLs, with surrounding-text context truncated to 200 chars.

use scraper::{ElementRef, Html, Selector};

use crate::domain::LinkData;

const CONTEXT_MAX_CHARS: usize = 200;

pub fn extract_links(document: &Html) -> Vec<LinkData> {
    let selector = Selector::parse("a[href]").unwrap();

    document
        .select(&selector)
        .filter_map(|el| {
            let href = el.value().attr("href")?.trim();
            if href.is_empty() || href.starts_with('#') || is_javascript_url(href) {
                return None;
            }

            let text = el.text().collect::<String>().trim().to_string();
            let context = parent_context(el);

            Some(LinkData {
                href: href.to_string(),
                text,
                context,
            })
        })
        .collect()
}

fn is_javascript_url(href: &str) -> bool {
    href.trim_start()
        .get(..11)
        .map(|prefix| prefix.eq_ignore_ascii_case("javascript:"))
        .unwrap_or(false)
}

fn parent_context(el: ElementRef) -> String {
    let text = el
        .parent()
        .and_then(ElementRef::wrap)
        .map(|parent| parent.text().collect::<String>())
        .unwrap_or_default();

    let trimmed = text.trim();
    truncate_chars(trimmed, CONTEXT_MAX_CHARS)
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_basic_link() {
        let html = Html::parse_document(r#"<p>See <a href="/docs">docs</a> for more.</p>"#);
        let links = extract_links(&html);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].href, "/docs");
        assert_eq!(links[0].text, "docs");
        assert!(links[0].context.contains("docs"));
    }

    #[test]
    fn excludes_anchor_and_javascript_links() {
        let html = Html::parse_document(
            r#"<a href="#section">jump</a><a href="javascript:void(0)">click</a><a href="https://x.com">ok</a>"#,
        );
        let links = extract_links(&html);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].href, "https://x.com");
    }

    #[test]
    fn truncates_long_context() {
        let long_text = "x".repeat(500);
        let html = format!(r#"<p>{long_text}<a href="/a">link</a></p>"#);
        let doc = Html::parse_document(&html);
        let links = extract_links(&doc);
        assert!(links[0].context.chars().count() <= CONTEXT_MAX_CHARS);
    }
}
