use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Clone)]
pub struct RepositoryOwner {
    pub login: String,
}

/// The subset of the GitHub repository payload the statistics are built from
#[derive(Debug, Deserialize, Clone)]
pub struct Repository {
    pub name: String,
    pub owner: RepositoryOwner,
    #[serde(default)]
    pub html_url: String,
    pub description: Option<String>,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub watchers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    pub language: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub pushed_at: Option<String>,
}

impl Repository {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner.login, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    User,
    Org,
}

impl AccountKind {
    /// Path segment of the GitHub API for this kind of account
    pub fn endpoint(&self) -> &'static str {
        match self {
            AccountKind::User => "users",
            AccountKind::Org => "orgs",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateStats {
    pub total_repos: u64,
    pub total_stars: u64,
    pub total_forks: u64,
    pub total_watchers: u64,
    pub total_open_issues: u64,
    pub active_repos: u64,
    pub languages: BTreeMap<String, u64>,
}

impl AggregateStats {
    /// Languages ordered by how many repositories use them
    pub fn top_languages(&self, n: usize) -> Vec<&str> {
        let mut languages: Vec<(&String, &u64)> = self.languages.iter().collect();
        languages.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        languages
            .into_iter()
            .take(n)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturedRepo {
    pub name: String,
    pub owner: String,
    pub url: String,
    pub description: String,
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub open_issues: u64,
    pub contributors: u64,
    pub language: String,
    pub created_at: String,
    pub updated_at: String,
    pub pushed_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubStats {
    pub aggregate: AggregateStats,
    pub per_account: BTreeMap<String, AggregateStats>,
    /// Keyed by "owner/name"
    pub featured_repos: BTreeMap<String, FeaturedRepo>,
}

impl GithubStats {
    /// Featured repositories, most starred first
    pub fn featured_by_stars(&self) -> Vec<&FeaturedRepo> {
        let mut repos: Vec<&FeaturedRepo> = self.featured_repos.values().collect();
        repos.sort_by(|a, b| b.stars.cmp(&a.stars));
        repos
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PypiStats {
    pub last_day: u64,
    pub last_week: u64,
    pub last_month: u64,
}

/// Snapshot written to `github_stats_cache.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsCache {
    pub last_updated: Option<String>,
    pub github: GithubStats,
    pub pypi: BTreeMap<String, PypiStats>,
}

impl StatsCache {
    /// Header and values of one `github_stats_history.csv` row
    pub fn history_record(&self, packages: &[String]) -> (Vec<String>, Vec<String>) {
        let aggregate = &self.github.aggregate;

        let mut header: Vec<String> = [
            "timestamp",
            "total_repos",
            "total_stars",
            "total_forks",
            "total_watchers",
            "active_repos",
            "total_open_issues",
        ]
        .iter()
        .map(|column| column.to_string())
        .collect();

        let mut row = vec![
            self.last_updated.clone().unwrap_or_default(),
            aggregate.total_repos.to_string(),
            aggregate.total_stars.to_string(),
            aggregate.total_forks.to_string(),
            aggregate.total_watchers.to_string(),
            aggregate.active_repos.to_string(),
            aggregate.total_open_issues.to_string(),
        ];

        for package in packages {
            header.push(format!("pypi_{}_last_month", package));
            row.push(
                self.pypi
                    .get(package)
                    .map(|stats| stats.last_month)
                    .unwrap_or(0)
                    .to_string(),
            );
        }

        (header, row)
    }
}
