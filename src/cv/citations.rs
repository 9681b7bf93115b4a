use std::collections::BTreeMap;

use eyre::{Result, bail, eyre};
use log::info;
use serde_yaml::{Mapping, Value};

use crate::cv::document::CvDocument;
use crate::models::scholar::{AuthorMetrics, CitationCache};
use crate::utils::misc::thousands;

pub const IMPACT_SECTION: &str = "research_impact_summary";
const CITATIONS_LABEL: &str = "Research Citations";

/// Change between the two most recent years of the citation histogram
pub fn calculate_yoy_growth(cites_per_year: &BTreeMap<i32, u64>) -> Option<String> {
    let mut recent = cites_per_year.iter().rev();
    let (current_year, current) = recent.next()?;
    let (previous_year, previous) = recent.next()?;

    if *previous == 0 {
        return None;
    }

    let growth = (*current as f64 - *previous as f64) / *previous as f64 * 100.0;
    Some(format!("{:+.1}% from {} to {}", growth, previous_year, current_year))
}

pub fn citation_details(metrics: &AuthorMetrics) -> String {
    let mut details = format!(
        "{} total citations, h-index: {}, i10-index: {}",
        thousands(metrics.total_citations),
        metrics.h_index,
        metrics.i10_index
    );

    if let Some(growth) = calculate_yoy_growth(&metrics.cites_per_year) {
        details.push_str(&format!(" ({})", growth));
    }
    details.push_str(" (Google Scholar)");

    details
}

fn impact_entry_mut<'a>(entries: &'a mut [Value], label: &str) -> Option<&'a mut Mapping> {
    entries
        .iter_mut()
        .find(|entry| entry.get("label").and_then(Value::as_str) == Some(label))
        .and_then(Value::as_mapping_mut)
}

/// Sets the details of the labelled impact entry. Returns false when no entry has that label.
pub fn update_impact_entry(entries: &mut [Value], label: &str, details: &str) -> bool {
    match impact_entry_mut(entries, label) {
        Some(entry) => {
            entry.insert(Value::from("details"), Value::from(details));
            true
        }
        None => false,
    }
}

/// Sets the details of the labelled impact entry, inserting it first when missing
pub fn upsert_impact_entry(entries: &mut Vec<Value>, label: &str, details: &str) {
    if update_impact_entry(entries, label, details) {
        return;
    }

    let mut entry = Mapping::new();
    entry.insert(Value::from("label"), Value::from(label));
    entry.insert(Value::from("details"), Value::from(details));
    entries.insert(0, Value::Mapping(entry));
}

/// Writes the author metrics into the research impact summary
pub fn update_cv_with_metrics(doc: &mut CvDocument, cache: &CitationCache) -> Result<String> {
    let metrics = cache.metrics.as_ref().ok_or_else(|| {
        eyre!("no author metrics in the citation cache, run `fetch-citations --force-refresh` first")
    })?;

    let details = citation_details(metrics);

    let Some(entries) = doc.section_mut(IMPACT_SECTION)? else {
        bail!("no '{}' section in the CV", IMPACT_SECTION);
    };
    upsert_impact_entry(entries, CITATIONS_LABEL, &details);

    info!("research citations: {}", details);
    Ok(details)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn metrics() -> AuthorMetrics {
        AuthorMetrics {
            total_citations: 12345,
            h_index: 40,
            i10_index: 80,
            cites_per_year: BTreeMap::from([(2022, 1000), (2023, 1250)]),
            ..Default::default()
        }
    }

    #[test]
    fn computes_growth_of_last_two_years() {
        assert_eq!(
            calculate_yoy_growth(&BTreeMap::from([(2021, 5), (2022, 1000), (2023, 1250)])).as_deref(),
            Some("+25.0% from 2022 to 2023")
        );
        assert_eq!(
            calculate_yoy_growth(&BTreeMap::from([(2022, 200), (2023, 150)])).as_deref(),
            Some("-25.0% from 2022 to 2023")
        );
        assert!(calculate_yoy_growth(&BTreeMap::from([(2023, 150)])).is_none());
        assert!(calculate_yoy_growth(&BTreeMap::from([(2022, 0), (2023, 150)])).is_none());
    }

    #[test]
    fn formats_details() {
        assert_eq!(
            citation_details(&metrics()),
            "12,345 total citations, h-index: 40, i10-index: 80 (+25.0% from 2022 to 2023) (Google Scholar)"
        );

        let flat = AuthorMetrics {
            total_citations: 12,
            h_index: 2,
            i10_index: 1,
            ..Default::default()
        };
        assert_eq!(
            citation_details(&flat),
            "12 total citations, h-index: 2, i10-index: 1 (Google Scholar)"
        );
    }

    #[test]
    fn updates_or_inserts_citation_entry() {
        let raw = "cv:\n  sections:\n    research_impact_summary:\n      - label: Funding\n        details: lots\n";
        let mut doc = CvDocument::parse(Path::new("CV.yaml"), raw).unwrap();
        let cache = CitationCache {
            metrics: Some(metrics()),
            ..Default::default()
        };

        update_cv_with_metrics(&mut doc, &cache).unwrap();
        update_cv_with_metrics(&mut doc, &cache).unwrap();

        let entries = doc.section_mut(IMPACT_SECTION).unwrap().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["label"].as_str(), Some("Research Citations"));
        assert!(entries[0]["details"].as_str().unwrap().starts_with("12,345 total citations"));
        assert_eq!(entries[1]["label"].as_str(), Some("Funding"));
    }

    #[test]
    fn update_only_touches_existing_labels() {
        let mut entries = vec![Value::from("plain text entry")];
        let mut funding = Mapping::new();
        funding.insert(Value::from("label"), Value::from("Funding"));
        funding.insert(Value::from("details"), Value::from("lots"));
        entries.push(Value::Mapping(funding));

        assert!(!update_impact_entry(&mut entries, "Software Downloads", "100+"));
        assert_eq!(entries.len(), 2);

        assert!(update_impact_entry(&mut entries, "Funding", "more"));
        assert_eq!(entries[1]["details"].as_str(), Some("more"));
    }

    #[test]
    fn rejects_missing_metrics_or_section() {
        let mut doc =
            CvDocument::parse(Path::new("CV.yaml"), "cv:\n  sections:\n    software: []\n").unwrap();

        assert!(update_cv_with_metrics(&mut doc, &CitationCache::default()).is_err());

        let cache = CitationCache {
            metrics: Some(metrics()),
            ..Default::default()
        };
        assert!(update_cv_with_metrics(&mut doc, &cache).is_err());
    }
}
