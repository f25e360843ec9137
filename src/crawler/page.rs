use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A crawled page as emitted to writers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub crawled_at: DateTime<Utc>,
    pub status_code: u16,
    pub depth: u32,
}

impl Page {
    /// Text length in characters, zero when no text was extracted
    pub fn text_len(&self) -> usize {
        self.text.as_deref().map_or(0, |t| t.chars().count())
    }
}
