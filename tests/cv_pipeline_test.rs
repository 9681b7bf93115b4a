use std::collections::BTreeMap;
use std::fs;

use cv_metrics::bibtex::parser::parse_bibtex_file;
use cv_metrics::bibtex::publications::{
    add_citations_to_publications, bibtex_to_cv, publications_yaml,
};
use cv_metrics::cv::citations::update_cv_with_metrics;
use cv_metrics::cv::document::CvDocument;
use cv_metrics::cv::stats::update_cv_with_stats;
use cv_metrics::models::github::{FeaturedRepo, PypiStats, StatsCache};
use cv_metrics::models::scholar::{AuthorMetrics, CitationCache};
use cv_metrics::utils::cache::{
    append_history, load_json_cache, read_json_cache, save_json_cache,
};
use cv_metrics::utils::config::CvConfig;
use tempfile::TempDir;

const BIB: &str = r#"
@article{Ni2023,
  title = {Ambient noise monitoring of {Mount Rainier}},
  author = {Ni, Yiyu and Denolle, Marine A.},
  journal = {Seismological Research Letters},
  volume = {94},
  year = {2023},
  doi = {10.1785/0220230001}
}

@article{Olinger2023,
  title = {Seismic tremor of a glacial rift},
  author = {Olinger, Stephanie and Denolle, Marine A.},
  journal = {Geophysical Research Letters},
  year = {2023},
  note = {\url{https://www.washington.edu/news/2023/12/04/rift/}}
}
"#;

const CV: &str = r#"
cv:
  name: Marine Denolle
  social_networks:
    - network: Google Scholar
      username: abcdEFGhijk
  sections:
    research_impact_summary:
      - label: Open-Source Software
        details: outdated
      - label: Software Downloads
        details: outdated
      - label: Development Community
        details: outdated
    software:
      - name: NoisePy
        highlights:
          - 10 GitHub stars, 1 forks
          - Used by many labs
"#;

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_publications_from_bibtex_and_cache() {
    let dir = tempfile::tempdir().unwrap();
    let bib = write(&dir, "publications.bib", BIB);

    let mut cache = CitationCache::default();
    cache.citations.insert("Ni2023".to_string(), 7);
    let cache_path = dir.path().join("cache").join("citation_cache.json");
    save_json_cache(&cache_path, &cache).unwrap();

    let publications = parse_bibtex_file(&bib).unwrap();
    let mut entries = bibtex_to_cv(
        &publications,
        &["Yiyu Ni".to_string()],
        &BTreeMap::new(),
    );
    add_citations_to_publications(&mut entries, &cache_path);

    let ni = entries.iter().find(|e| e.title.starts_with("Ambient")).unwrap();
    assert_eq!(ni.title, "Ambient noise monitoring of Mount Rainier");
    assert_eq!(ni.authors, vec!["Yiyu Ni*", "Marine A. Denolle"]);
    assert_eq!(ni.journal.as_deref(), Some("Seismological Research Letters, 94"));
    assert_eq!(ni.url.as_deref(), Some("https://doi.org/10.1785/0220230001"));
    assert_eq!(ni.citations, Some(7));

    let olinger = entries.iter().find(|e| e.title.starts_with("Seismic")).unwrap();
    assert_eq!(olinger.citations, Some(-1));
    assert_eq!(
        olinger.media_coverage.as_deref(),
        Some(&["https://www.washington.edu/news/2023/12/04/rift/".to_string()][..])
    );

    let yaml = publications_yaml(&entries).unwrap();
    assert!(yaml.contains("# 2 publications with group member tagging (*)"));
    assert!(yaml.contains("citations: -1"));
}

#[test]
fn test_update_cv_citations_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let cv_path = write(&dir, "CV.yaml", CV);

    let cache = CitationCache {
        last_updated: Some("2025-01-01T00:00:00.000000".to_string()),
        author_id: Some("abcdEFGhijk".to_string()),
        citations: BTreeMap::from([("Ni2023".to_string(), 7)]),
        metrics: Some(AuthorMetrics {
            total_citations: 5120,
            h_index: 31,
            i10_index: 55,
            cites_per_year: BTreeMap::from([(2023, 800), (2024, 1000)]),
            ..Default::default()
        }),
    };
    let cache_path = dir.path().join("citation_cache.json");
    save_json_cache(&cache_path, &cache).unwrap();
    let cache: CitationCache = read_json_cache(&cache_path).unwrap();

    let mut doc = CvDocument::load(&cv_path).unwrap();
    assert_eq!(doc.google_scholar_id().as_deref(), Some("abcdEFGhijk"));
    update_cv_with_metrics(&mut doc, &cache).unwrap();
    doc.save().unwrap();

    let mut reloaded = CvDocument::load(&cv_path).unwrap();
    let entries = reloaded
        .section_mut("research_impact_summary")
        .unwrap()
        .unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(
        entries[0]["details"].as_str(),
        Some("5,120 total citations, h-index: 31, i10-index: 55 (+25.0% from 2023 to 2024) (Google Scholar)")
    );
    assert_eq!(entries[1]["details"].as_str(), Some("outdated"));
}

#[test]
fn test_update_cv_stats_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let cv_path = write(&dir, "CV.yaml", CV);

    let mut cache = StatsCache {
        last_updated: Some("2025-02-10T12:00:00.000000".to_string()),
        ..Default::default()
    };
    cache.github.aggregate.total_stars = 300;
    cache.github.aggregate.active_repos = 6;
    cache.github.featured_repos.insert(
        "noisepy/NoisePy".to_string(),
        FeaturedRepo {
            name: "NoisePy".to_string(),
            owner: "noisepy".to_string(),
            stars: 190,
            forks: 85,
            contributors: 30,
            ..Default::default()
        },
    );
    cache.pypi.insert(
        "noisepy-seis".to_string(),
        PypiStats {
            last_month: 2000,
            ..Default::default()
        },
    );

    let cv_config = CvConfig {
        repo_map: BTreeMap::from([("NoisePy".to_string(), "noisepy/NoisePy".to_string())]),
        pypi_map: BTreeMap::from([("NoisePy".to_string(), "noisepy-seis".to_string())]),
        pypi_label: "NoisePy".to_string(),
    };

    let mut doc = CvDocument::load(&cv_path).unwrap();
    update_cv_with_stats(&mut doc, &cache, &cv_config).unwrap();
    doc.save().unwrap();

    let raw = fs::read_to_string(&cv_path).unwrap();
    assert!(raw.contains("300 GitHub stars across 6 active repositories"));
    assert!(raw.contains("24,000+ PyPI downloads annually (NoisePy package)"));
    assert!(raw.contains("30+ contributors across lab and collaborative projects"));
    assert!(raw.contains("190 GitHub stars, 85 forks, 30 contributors (Feb 2025)"));
    assert!(raw.contains("2000 PyPI downloads/month"));
    assert!(!raw.contains("10 GitHub stars, 1 forks"));
    assert!(raw.contains("Used by many labs"));
    assert!(!raw.contains("outdated"));
}

#[test]
fn test_history_header_written_once() {
    let dir = tempfile::tempdir().unwrap();
    let history = dir.path().join("stats").join("github_stats_history.csv");

    let cache = StatsCache {
        last_updated: Some("2025-02-10T12:00:00.000000".to_string()),
        ..Default::default()
    };
    let packages = vec!["noisepy-seis".to_string()];
    let (header, row) = cache.history_record(&packages);

    append_history(&history, &header, &row).unwrap();
    append_history(&history, &header, &row).unwrap();

    let raw = fs::read_to_string(&history).unwrap();
    let lines: Vec<&str> = raw.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("timestamp,total_repos"));
    assert!(lines[0].ends_with("pypi_noisepy-seis_last_month"));
    assert_eq!(lines[1], lines[2]);
}

#[test]
fn test_corrupt_cache_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "github_stats_cache.json", "{ not json");

    let cache: StatsCache = load_json_cache(&path);
    assert_eq!(cache, StatsCache::default());
    assert!(read_json_cache::<StatsCache>(&path).is_err());
}
