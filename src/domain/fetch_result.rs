use serde::{Deserialize, Serialize};

use super::tier::Tier;
use super::trace::{DecisionTrace, TitleSource};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub caption: Option<String>,
    pub id: Option<String>,
}

impl TableData {
    /// JSON projection: headers become keys, missing cells default to "" (spec §4.10).
    pub fn as_json_rows(&self) -> Vec<serde_json::Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut obj = serde_json::Map::new();
                for (i, header) in self.headers.iter().enumerate() {
                    let cell = row.get(i).cloned().unwrap_or_default();
                    obj.insert(header.clone(), serde_json::Value::String(cell));
                }
                serde_json::Value::Object(obj)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkData {
    pub href: String,
    pub text: String,
    pub context: String,
}

/// Successful extraction result for one request (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    pub final_url: String,
    pub title: Option<String>,
    pub title_source: TitleSource,
    pub text: String,
    pub markdown: String,
    pub tables: Vec<TableData>,
    pub links: Vec<LinkData>,
    pub structured: Option<serde_json::Value>,
    pub tier_used: Tier,
    pub fell_back: bool,
    pub confidence: f64,
    pub decision_trace: DecisionTrace,
}
