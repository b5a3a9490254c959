//! Table extraction (spec §4.10): every `<table>` becomes headers + rows,
//! plus an optional caption and id.

use scraper::{ElementRef, Html, Selector};

use crate::domain::TableData;

pub fn extract_tables(document: &Html) -> Vec<TableData> {
    let table_sel = Selector::parse("table").unwrap();
    let row_sel = Selector::parse("tr").unwrap();
    let header_cell_sel = Selector::parse("th").unwrap();
    let cell_sel = Selector::parse("td").unwrap();
    let caption_sel = Selector::parse("caption").unwrap();

    document
        .select(&table_sel)
        .map(|table| {
            let caption = table
                .select(&caption_sel)
                .next()
                .map(|c| cell_text(c))
                .filter(|s| !s.is_empty());

            let id = table.value().attr("id").map(str::to_string);

            let mut rows_iter = table.select(&row_sel);
            let headers = rows_iter
                .next()
                .map(|row| {
                    let hdrs: Vec<String> =
                        row.select(&header_cell_sel).map(cell_text).collect();
                    if hdrs.is_empty() {
                        row.select(&cell_sel).map(cell_text).collect()
                    } else {
                        hdrs
                    }
                })
                .unwrap_or_default();

            let rows: Vec<Vec<String>> = table
                .select(&row_sel)
                .skip(1)
                .map(|row| row.select(&cell_sel).map(cell_text).collect())
                .filter(|row: &Vec<String>| !row.is_empty())
                .collect();

            TableData {
                headers,
                rows,
                caption,
                id,
            }
        })
        .collect()
}

fn cell_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_headers_and_rows() {
        let html = Html::parse_document(
            r#"<table><tr><th>Name</th><th>Age</th></tr><tr><td>Alice</td><td>30</td></tr></table>"#,
        );
        let tables = extract_tables(&html);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].headers, vec!["Name", "Age"]);
        assert_eq!(tables[0].rows, vec![vec!["Alice".to_string(), "30".to_string()]]);
    }

    #[test]
    fn as_json_rows_defaults_missing_cells() {
        let table = TableData {
            headers: vec!["a".into(), "b".into()],
            rows: vec![vec!["1".into()]],
            caption: None,
            id: None,
        };
        let rows = table.as_json_rows();
        assert_eq!(rows[0]["a"], serde_json::json!("1"));
        assert_eq!(rows[0]["b"], serde_json::json!(""));
    }
}
