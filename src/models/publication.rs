use serde::{Deserialize, Serialize};

use crate::models::entry::lenient_string;

/// One BibTeX record, cleaned of LaTeX markup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BibPublication {
    pub citation_key: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: String,
    pub journal: String,
    pub volume: String,
    pub pages: String,
    pub doi: String,
    pub url: String,
    pub note: String,
    pub entry_type: String,
}

impl BibPublication {
    /// Numeric year for sorting, 0 when the field is not a plain number
    pub fn year_number(&self) -> i32 {
        let year = self.year.trim();
        if !year.is_empty() && year.chars().all(|c| c.is_ascii_digit()) {
            year.parse().unwrap_or(0)
        } else {
            0
        }
    }
}

/// A publication entry of the CV document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicationEntry {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    /// -1 means no citation data was available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_coverage: Option<Vec<String>>,
    #[serde(skip)]
    pub citation_key: Option<String>,
}

impl PublicationEntry {
    pub fn doi_url(&self) -> Option<String> {
        self.doi.as_ref().map(|doi| format!("https://doi.org/{}", doi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_numeric_years_sort_as_zero() {
        let mut publication = BibPublication {
            year: "2021".to_string(),
            ..Default::default()
        };
        assert_eq!(publication.year_number(), 2021);

        publication.year = "in press".to_string();
        assert_eq!(publication.year_number(), 0);

        publication.year = String::new();
        assert_eq!(publication.year_number(), 0);
    }

    #[test]
    fn entry_accepts_numeric_dates() {
        let entry: PublicationEntry =
            serde_yaml::from_str("title: Ambient noise\ndate: 2020\ndoi: 10.1/abc\n").unwrap();

        assert_eq!(entry.date.as_deref(), Some("2020"));
        assert_eq!(entry.doi_url().as_deref(), Some("https://doi.org/10.1/abc"));
        assert!(entry.citation_key.is_none());
    }
}
