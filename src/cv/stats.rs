use chrono::Local;
use eyre::Result;
use log::{debug, info, warn};
use serde_yaml::Value;

use crate::cv::citations::{IMPACT_SECTION, update_impact_entry};
use crate::cv::document::CvDocument;
use crate::models::github::StatsCache;
use crate::utils::cache::parse_timestamp;
use crate::utils::config::CvConfig;
use crate::utils::misc::thousands;

const SOFTWARE_SECTION: &str = "software";
const TOP_CONTRIBUTOR_REPOS: usize = 5;

/// "Jan 2025" for a cache timestamp, the current month when it cannot be parsed
pub fn format_month_year(timestamp: Option<&str>) -> String {
    timestamp
        .and_then(parse_timestamp)
        .unwrap_or_else(|| Local::now().naive_local())
        .format("%b %Y")
        .to_string()
}

fn impact_entries(cache: &StatsCache, cv_config: &CvConfig) -> Vec<(&'static str, String)> {
    let aggregate = &cache.github.aggregate;
    let monthly_downloads: u64 = cache.pypi.values().map(|stats| stats.last_month).sum();
    let contributors: u64 = cache
        .github
        .featured_by_stars()
        .into_iter()
        .take(TOP_CONTRIBUTOR_REPOS)
        .map(|repo| repo.contributors)
        .sum();

    let downloads = if monthly_downloads > 0 {
        format!(
            "{}+ PyPI downloads annually ({} package)",
            thousands(monthly_downloads * 12),
            cv_config.pypi_label
        )
    } else {
        format!("PyPI package available ({})", cv_config.pypi_label)
    };

    vec![
        (
            "Open-Source Software",
            format!(
                "{} GitHub stars across {} active repositories",
                aggregate.total_stars, aggregate.active_repos
            ),
        ),
        ("Software Downloads", downloads),
        (
            "Development Community",
            format!(
                "{}+ contributors across lab and collaborative projects",
                contributors
            ),
        ),
    ]
}

fn highlights_mut(entry: &mut Value) -> Option<&mut Vec<Value>> {
    entry
        .get_mut("highlights")?
        .as_sequence_mut()
        .filter(|highlights| !highlights.is_empty())
}

/// Replaces `highlights[index]` when it matches, inserts at `index` otherwise
fn set_highlight(highlights: &mut Vec<Value>, index: usize, text: String, matches: impl Fn(&str) -> bool) {
    match highlights.get_mut(index) {
        Some(current) if current.as_str().is_some_and(&matches) => *current = Value::from(text),
        _ => highlights.insert(index.min(highlights.len()), Value::from(text)),
    }
}

fn update_software_entry(entry: &mut Value, cache: &StatsCache, cv_config: &CvConfig, updated: &str) {
    let Some(name) = entry.get("name").and_then(Value::as_str).map(str::to_string) else {
        return;
    };
    let Some(repo) = cv_config
        .repo_map
        .get(&name)
        .and_then(|full_name| cache.github.featured_repos.get(full_name))
    else {
        return;
    };
    let pypi = cv_config
        .pypi_map
        .get(&name)
        .and_then(|package| cache.pypi.get(package))
        .copied();

    let Some(highlights) = highlights_mut(entry) else {
        debug!("{} has no highlights, leaving it alone", name);
        return;
    };

    let stats_line = format!(
        "{} GitHub stars, {} forks, {} contributors ({})",
        repo.stars, repo.forks, repo.contributors, updated
    );
    set_highlight(highlights, 0, stats_line, |current| {
        current.contains("stars") || current.contains("forks")
    });

    if let Some(pypi) = pypi {
        let downloads_line = format!("{} PyPI downloads/month", pypi.last_month);
        set_highlight(highlights, 1, downloads_line, |current| current.contains("PyPI downloads"));
    }

    info!("updated software entry {}", name);
}

/// Writes the cached GitHub and PyPI statistics into the CV
pub fn update_cv_with_stats(doc: &mut CvDocument, cache: &StatsCache, cv_config: &CvConfig) -> Result<()> {
    let updated = format_month_year(cache.last_updated.as_deref());
    let sections = doc.sections_mut()?;

    match sections.get_mut(IMPACT_SECTION).and_then(Value::as_sequence_mut) {
        Some(entries) => {
            for (label, details) in impact_entries(cache, cv_config) {
                if update_impact_entry(entries, label, &details) {
                    debug!("{}: {}", label, details);
                } else {
                    debug!("no '{}' entry in the impact summary, skipping", label);
                }
            }
        }
        None => warn!("no '{}' section in the CV, skipping impact summary", IMPACT_SECTION),
    }

    match sections.get_mut(SOFTWARE_SECTION).and_then(Value::as_sequence_mut) {
        Some(entries) => {
            for entry in entries.iter_mut() {
                update_software_entry(entry, cache, cv_config, &updated);
            }
        }
        None => warn!("no '{}' section in the CV, skipping software entries", SOFTWARE_SECTION),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::Path;

    use super::*;
    use crate::models::github::{AggregateStats, FeaturedRepo, GithubStats, PypiStats};

    fn cache() -> StatsCache {
        let featured = |name: &str, stars: u64, contributors: u64| FeaturedRepo {
            name: name.to_string(),
            owner: "noisepy".to_string(),
            stars,
            forks: 80,
            contributors,
            ..Default::default()
        };

        StatsCache {
            last_updated: Some("2025-03-14T09:00:00.000000".to_string()),
            github: GithubStats {
                aggregate: AggregateStats {
                    total_stars: 420,
                    active_repos: 9,
                    ..Default::default()
                },
                per_account: BTreeMap::new(),
                featured_repos: BTreeMap::from([
                    ("noisepy/NoisePy".to_string(), featured("NoisePy", 180, 25)),
                    ("noisepy/tiny".to_string(), featured("tiny", 1, 1)),
                ]),
            },
            pypi: BTreeMap::from([(
                "noisepy-seis".to_string(),
                PypiStats {
                    last_day: 10,
                    last_week: 90,
                    last_month: 1500,
                },
            )]),
        }
    }

    fn cv_config() -> CvConfig {
        CvConfig {
            repo_map: BTreeMap::from([("NoisePy".to_string(), "noisepy/NoisePy".to_string())]),
            pypi_map: BTreeMap::from([("NoisePy".to_string(), "noisepy-seis".to_string())]),
            pypi_label: "NoisePy".to_string(),
        }
    }

    const CV: &str = r#"
cv:
  sections:
    research_impact_summary:
      - label: Open-Source Software
        details: old
      - label: Software Downloads
        details: old
      - label: Development Community
        details: old
    software:
      - name: NoisePy
        highlights:
          - 100 GitHub stars, 10 forks
          - 200 PyPI downloads/month
          - Used by many labs
      - name: Unmapped
        highlights: [Something]
"#;

    #[test]
    fn formats_month_year() {
        assert_eq!(format_month_year(Some("2025-03-14T09:00:00.000000")), "Mar 2025");
        assert_eq!(
            format_month_year(Some("garbage")),
            Local::now().naive_local().format("%b %Y").to_string()
        );
    }

    #[test]
    fn updates_impact_summary_and_software() {
        let mut doc = CvDocument::parse(Path::new("CV.yaml"), CV).unwrap();
        update_cv_with_stats(&mut doc, &cache(), &cv_config()).unwrap();

        let impact = doc.section_mut(IMPACT_SECTION).unwrap().unwrap().clone();
        let details = |label: &str| {
            impact
                .iter()
                .find(|entry| entry["label"].as_str() == Some(label))
                .and_then(|entry| entry["details"].as_str())
                .map(str::to_string)
        };
        assert_eq!(
            details("Open-Source Software").as_deref(),
            Some("420 GitHub stars across 9 active repositories")
        );
        assert_eq!(
            details("Software Downloads").as_deref(),
            Some("18,000+ PyPI downloads annually (NoisePy package)")
        );
        assert_eq!(
            details("Development Community").as_deref(),
            Some("26+ contributors across lab and collaborative projects")
        );

        let software = doc.section_mut("software").unwrap().unwrap();
        let highlights = software[0]["highlights"].as_sequence().unwrap();
        assert_eq!(highlights.len(), 3);
        assert_eq!(
            highlights[0].as_str(),
            Some("180 GitHub stars, 80 forks, 25 contributors (Mar 2025)")
        );
        assert_eq!(highlights[1].as_str(), Some("1500 PyPI downloads/month"));
        assert_eq!(software[1]["highlights"][0].as_str(), Some("Something"));
    }

    #[test]
    fn inserts_highlights_when_absent() {
        let raw = "cv:\n  sections:\n    software:\n      - name: NoisePy\n        highlights: [Used by many labs]\n";
        let mut doc = CvDocument::parse(Path::new("CV.yaml"), raw).unwrap();
        update_cv_with_stats(&mut doc, &cache(), &cv_config()).unwrap();

        let software = doc.section_mut("software").unwrap().unwrap();
        let highlights = software[0]["highlights"].as_sequence().unwrap();
        assert_eq!(highlights.len(), 3);
        assert!(highlights[0].as_str().unwrap().starts_with("180 GitHub stars"));
        assert_eq!(highlights[1].as_str(), Some("1500 PyPI downloads/month"));
        assert_eq!(highlights[2].as_str(), Some("Used by many labs"));
    }

    #[test]
    fn leaves_impact_summary_without_stats_labels_alone() {
        let raw = "cv:\n  sections:\n    research_impact_summary:\n      - label: Research Citations\n        details: 12 total citations\n";
        let mut doc = CvDocument::parse(Path::new("CV.yaml"), raw).unwrap();
        update_cv_with_stats(&mut doc, &cache(), &cv_config()).unwrap();

        let impact = doc.section_mut(IMPACT_SECTION).unwrap().unwrap();
        assert_eq!(impact.len(), 1);
        assert_eq!(impact[0]["label"].as_str(), Some("Research Citations"));
        assert_eq!(impact[0]["details"].as_str(), Some("12 total citations"));
    }

    #[test]
    fn zero_downloads_mentions_package_only() {
        let mut cache = cache();
        cache.pypi.clear();
        let entries = impact_entries(&cache, &cv_config());

        assert_eq!(entries[1].1, "PyPI package available (NoisePy)");
    }

    #[test]
    fn requires_sections() {
        let mut doc = CvDocument::parse(Path::new("CV.yaml"), "cv:\n  name: X\n").unwrap();
        assert!(update_cv_with_stats(&mut doc, &cache(), &cv_config()).is_err());
    }
}
