//! Title extraction with a source-confidence hierarchy (spec §4.10):
//! `og:title` (0.95) > `<title>` (0.85) > first `<h1>` (0.70) > none (0.00).

use scraper::{Html, Selector};

use crate::domain::{TitleAttempt, TitleSource};

pub fn extract_title(document: &Html) -> Vec<TitleAttempt> {
    let mut attempts = Vec::new();

    if let Some(value) = og_title(document) {
        attempts.push(TitleAttempt {
            source: TitleSource::OgTitle,
            value: Some(value),
            confidence: TitleSource::OgTitle.base_confidence(),
            selected: false,
        });
    }

    if let Some(value) = title_tag(document) {
        attempts.push(TitleAttempt {
            source: TitleSource::TitleTag,
            value: Some(value),
            confidence: TitleSource::TitleTag.base_confidence(),
            selected: false,
        });
    }

    if let Some(value) = first_h1(document) {
        attempts.push(TitleAttempt {
            source: TitleSource::H1,
            value: Some(value),
            confidence: TitleSource::H1.base_confidence(),
            selected: false,
        });
    }

    if let Some(best) = attempts
        .iter_mut()
        .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap())
    {
        best.selected = true;
    } else {
        attempts.push(TitleAttempt {
            source: TitleSource::Unknown,
            value: None,
            confidence: TitleSource::Unknown.base_confidence(),
            selected: true,
        });
    }

    attempts
}

fn og_title(document: &Html) -> Option<String> {
    let selector = Selector::parse(r#"meta[property="og:title"]"#).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn title_tag(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn first_h1(document: &Html) -> Option<String> {
    let selector = Selector::parse("h1").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn og_title_wins_over_title_tag() {
        let html = Html::parse_document(
            r#"<html><head><meta property="og:title" content="OG"><title>Tag</title></head></html>"#,
        );
        let attempts = extract_title(&html);
        let selected = attempts.iter().find(|a| a.selected).unwrap();
        assert_eq!(selected.source, TitleSource::OgTitle);
        assert_eq!(selected.value.as_deref(), Some("OG"));
    }

    #[test]
    fn falls_back_to_h1_when_no_meta_or_title() {
        let html = Html::parse_document(r#"<html><body><h1>Heading</h1></body></html>"#);
        let attempts = extract_title(&html);
        let selected = attempts.iter().find(|a| a.selected).unwrap();
        assert_eq!(selected.source, TitleSource::H1);
    }

    #[test]
    fn unknown_when_nothing_present() {
        let html = Html::parse_document("<html><body><p>hi</p></body></html>");
        let attempts = extract_title(&html);
        let selected = attempts.iter().find(|a| a.selected).unwrap();
        assert_eq!(selected.source, TitleSource::Unknown);
        assert!(selected.value.is_none());
    }
}
