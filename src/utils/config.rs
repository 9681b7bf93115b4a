use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use easy_config_store::ConfigStore;
use eyre::Result;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::models::entry::{Entry, EntryKind};

pub type Config = Arc<ConfigInner>;

pub fn config(path: PathBuf) -> Result<Config> {
    let config_store = ConfigStore::<ConfigInner>::read(path, "config".to_string())?;
    let inner = (*config_store).clone();

    info!("config parsing successful");
    debug!("loaded configuration:\n{}", toml::to_string_pretty(&inner)?);

    Ok(Arc::new(inner))
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ConfigInner {
    pub paths: PathsConfig,
    pub citations: CitationsConfig,
    pub github: GithubConfig,
    #[serde(default)]
    pub pypi: PypiConfig,
    #[serde(default)]
    pub publications: PublicationsConfig,
    #[serde(default)]
    pub cv: CvConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub locale: LocaleConfig,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct PathsConfig {
    pub cv_yaml: PathBuf,
    pub bibliography: PathBuf,
    pub citation_cache: PathBuf,
    pub github_stats_cache: PathBuf,
    pub github_stats_history: PathBuf,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct CitationsConfig {
    /// Overrides the GoogleScholar entry of the CV's social networks
    pub scholar_id: Option<String>,
    #[serde(default = "default_scholar_base")]
    pub scholar_base: String,
    #[serde(default = "default_citation_expiry")]
    pub expiry_days: i64,
    #[serde(default = "default_match_threshold")]
    pub match_threshold: u8,
    #[serde(default = "default_scholar_delay")]
    pub request_delay_ms: u64,
}

impl CitationsConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct GithubConfig {
    pub token: Option<String>,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub orgs: Vec<String>,
    #[serde(default = "default_github_api")]
    pub api_base: String,
    #[serde(default = "default_stats_expiry")]
    pub expiry_days: i64,
    #[serde(default = "default_github_delay")]
    pub request_delay_ms: u64,
    #[serde(default = "default_featured_limit")]
    pub featured_limit: usize,
    #[serde(default = "default_max_repos")]
    pub max_repos_per_account: usize,
}

impl GithubConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct PypiConfig {
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default = "default_pypi_api")]
    pub api_base: String,
}

impl Default for PypiConfig {
    fn default() -> Self {
        Self {
            packages: Vec::new(),
            api_base: default_pypi_api(),
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
pub struct PublicationsConfig {
    #[serde(default)]
    pub group_members: Vec<String>,
    /// Citation key -> media coverage URLs. Wins over URLs found in the note field.
    #[serde(default)]
    pub media_coverage: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct CvConfig {
    /// Software entry name -> GitHub "owner/repo"
    #[serde(default)]
    pub repo_map: BTreeMap<String, String>,
    /// Software entry name -> PyPI package
    #[serde(default)]
    pub pypi_map: BTreeMap<String, String>,
    #[serde(default = "default_pypi_label")]
    pub pypi_label: String,
}

impl Default for CvConfig {
    fn default() -> Self {
        Self {
            repo_map: BTreeMap::new(),
            pypi_map: BTreeMap::new(),
            pypi_label: default_pypi_label(),
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct TemplatesConfig {
    #[serde(default = "default_single_date")]
    pub single_date: String,
    #[serde(default = "default_date_range")]
    pub date_range: String,
    #[serde(default = "default_time_span")]
    pub time_span: String,
    #[serde(default)]
    pub publication: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub normal: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub bullet: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub one_line: Option<BTreeMap<String, String>>,
}

impl TemplatesConfig {
    /// Templates for the entry's kind, `None` when that kind has none configured
    pub fn for_entry(&self, entry: &Entry) -> Option<&BTreeMap<String, String>> {
        match entry.kind() {
            EntryKind::Text => None,
            EntryKind::Publication => self.publication.as_ref(),
            EntryKind::Normal => self.normal.as_ref(),
            EntryKind::Bullet => self.bullet.as_ref(),
            EntryKind::OneLine => self.one_line.as_ref(),
        }
    }
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            single_date: default_single_date(),
            date_range: default_date_range(),
            time_span: default_time_span(),
            publication: None,
            normal: None,
            bullet: None,
            one_line: None,
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct LocaleConfig {
    pub month_names: Vec<String>,
    pub month_abbreviations: Vec<String>,
    pub present: String,
    pub year: String,
    pub years: String,
    pub month: String,
    pub months: String,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        let names = [
            "January", "February", "March", "April", "May", "June", "July", "August",
            "September", "October", "November", "December",
        ];
        let abbreviations = [
            "Jan", "Feb", "Mar", "Apr", "May", "June", "July", "Aug", "Sept", "Oct", "Nov", "Dec",
        ];

        Self {
            month_names: names.iter().map(|s| s.to_string()).collect(),
            month_abbreviations: abbreviations.iter().map(|s| s.to_string()).collect(),
            present: "present".to_string(),
            year: "year".to_string(),
            years: "years".to_string(),
            month: "month".to_string(),
            months: "months".to_string(),
        }
    }
}

fn default_scholar_base() -> String {
    "https://scholar.google.com".to_string()
}

fn default_citation_expiry() -> i64 {
    30
}

fn default_match_threshold() -> u8 {
    85
}

fn default_scholar_delay() -> u64 {
    2000
}

fn default_github_api() -> String {
    "https://api.github.com".to_string()
}

fn default_stats_expiry() -> i64 {
    7
}

fn default_github_delay() -> u64 {
    500
}

fn default_featured_limit() -> usize {
    20
}

fn default_max_repos() -> usize {
    500
}

fn default_pypi_api() -> String {
    "https://pypistats.org/api".to_string()
}

fn default_pypi_label() -> String {
    "NoisePy".to_string()
}

fn default_single_date() -> String {
    "MONTH_ABBREVIATION YEAR".to_string()
}

fn default_date_range() -> String {
    "START_DATE – END_DATE".to_string()
}

fn default_time_span() -> String {
    "HOW_MANY_YEARS YEARS HOW_MANY_MONTHS MONTHS".to_string()
}

impl Default for ConfigInner {
    fn default() -> Self {
        let cfg = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.default.toml",));

        toml::from_str(cfg).unwrap() // should be okay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_default_config_parses() {
        let config = ConfigInner::default();

        assert_eq!(config.citations.expiry_days, 30);
        assert_eq!(config.citations.match_threshold, 85);
        assert_eq!(config.github.expiry_days, 7);
        assert_eq!(config.github.request_delay(), Duration::from_millis(500));
        assert_eq!(config.github.api_base, "https://api.github.com");
        assert_eq!(config.pypi.api_base, "https://pypistats.org/api");
        assert!(config.templates.publication.is_some());
    }

    #[test]
    fn missing_optional_sections_fall_back_to_defaults() {
        let raw = r#"
            [paths]
            cv_yaml = "cv.yaml"
            bibliography = "pubs.bib"
            citation_cache = "citation_cache.json"
            github_stats_cache = "github_stats_cache.json"
            github_stats_history = "github_stats_history.csv"

            [citations]

            [github]
            users = ["octocat"]
        "#;

        let config: ConfigInner = toml::from_str(raw).unwrap();

        assert_eq!(config.github.users, vec!["octocat"]);
        assert_eq!(config.github.featured_limit, 20);
        assert_eq!(config.citations.request_delay(), Duration::from_secs(2));
        assert_eq!(config.cv.pypi_label, "NoisePy");
        assert_eq!(config.locale.month_names.len(), 12);
        assert!(config.templates.bullet.is_none());
    }
}
