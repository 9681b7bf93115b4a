use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Author-level indices from a Google Scholar profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorMetrics {
    pub total_citations: u64,
    pub total_citations_5y: u64,
    pub h_index: u64,
    pub h_index_5y: u64,
    pub i10_index: u64,
    pub i10_index_5y: u64,
    pub cites_per_year: BTreeMap<i32, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScholarPublication {
    pub title: String,
    pub citations: u64,
    pub year: Option<i32>,
    pub fetched_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct ScholarProfile {
    pub name: String,
    pub metrics: AuthorMetrics,
    pub publications: Vec<ScholarPublication>,
}

/// Snapshot written to `citation_cache.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CitationCache {
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    /// BibTeX citation key -> citation count
    #[serde(default)]
    pub citations: BTreeMap<String, i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<AuthorMetrics>,
}

impl CitationCache {
    pub fn total_citations(&self) -> i64 {
        self.citations.values().sum()
    }
}
