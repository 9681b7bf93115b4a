use std::env;

use chrono::NaiveDateTime;
use log::{debug, info, warn};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::models::github::{AccountKind, AggregateStats, FeaturedRepo, GithubStats, Repository};
use crate::utils::cache::parse_timestamp;
use crate::utils::config::Config;

const USER_AGENT: &str = "cv-metrics";
const ACTIVE_WITHIN_DAYS: i64 = 180;

pub struct GitHubScraper {
    config: Config,
    token: Option<String>,
    client: reqwest::Client,
}

impl GitHubScraper {
    pub fn new(config: Config) -> Self {
        let token = config
            .github
            .token
            .clone()
            .or_else(|| env::var("GITHUB_TOKEN").ok())
            .filter(|token| !token.trim().is_empty());

        if token.is_none() {
            warn!("no GitHub token configured, requests are limited to 60 per hour");
        }

        GitHubScraper {
            config,
            token,
            client: reqwest::Client::new(),
        }
    }

    /// GETs an API endpoint after the configured delay. Failures are logged and yield `None`.
    async fn request<T: DeserializeOwned>(&self, endpoint: &str) -> Option<T> {
        tokio::time::sleep(self.config.github.request_delay()).await;

        let url = format!("{}{}", self.config.github.api_base.trim_end_matches('/'), endpoint);
        debug!("GET {}", url);

        let mut req = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", USER_AGENT);

        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("token {}", token));
        }

        let response = match req.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("request to {} failed: {}", endpoint, e);
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::FORBIDDEN && body.to_lowercase().contains("rate limit") {
                warn!("GitHub API rate limit exceeded while requesting {}", endpoint);
            } else {
                warn!("request to {} returned {}", endpoint, status);
            }
            return None;
        }

        match response.json::<T>().await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("unexpected response from {}: {}", endpoint, e);
                None
            }
        }
    }

    pub async fn list_repositories(&self, account: &str, kind: AccountKind) -> Vec<Repository> {
        let max_repos = self.config.github.max_repos_per_account;
        let mut repositories = Vec::new();
        let mut page: u32 = 1;

        loop {
            let endpoint = format!(
                "/{}/{}/repos?per_page=100&page={}",
                kind.endpoint(),
                account,
                page
            );

            let mut batch: Vec<Repository> = match self.request(&endpoint).await {
                Some(batch) => batch,
                None => break,
            };
            if batch.is_empty() {
                break;
            }

            repositories.append(&mut batch);
            if repositories.len() >= max_repos {
                repositories.truncate(max_repos);
                break;
            }

            page += 1;
        }

        debug!("{} repositories listed for {}", repositories.len(), account);
        repositories
    }

    /// Number of contributors, capped at the first page of 100
    pub async fn contributor_count(&self, owner: &str, repo: &str) -> u64 {
        self.request::<Vec<serde_json::Value>>(&format!(
            "/repos/{}/{}/contributors?per_page=100",
            owner, repo
        ))
        .await
        .map(|contributors| contributors.len() as u64)
        .unwrap_or(0)
    }

    /// Collects statistics for every configured user and organization
    pub async fn fetch_all(&self, now: NaiveDateTime) -> GithubStats {
        let accounts = self
            .config
            .github
            .users
            .iter()
            .map(|user| (user, AccountKind::User))
            .chain(self.config.github.orgs.iter().map(|org| (org, AccountKind::Org)));

        let mut stats = GithubStats::default();
        let mut all_repos = Vec::new();

        for (account, kind) in accounts {
            info!("fetching repositories of {} ({})", account, kind.endpoint());

            let repos = self.list_repositories(account, kind).await;
            stats
                .per_account
                .insert(account.clone(), aggregate_repo_stats(&repos, now));
            all_repos.extend(repos);
        }

        stats.aggregate = aggregate_repo_stats(&all_repos, now);

        let mut by_stars: Vec<&Repository> = all_repos.iter().collect();
        by_stars.sort_by(|a, b| b.stargazers_count.cmp(&a.stargazers_count));

        for repo in by_stars
            .into_iter()
            .take(self.config.github.featured_limit)
            .filter(|repo| !repo.fork)
        {
            let contributors = self.contributor_count(&repo.owner.login, &repo.name).await;
            debug!("{}: {} contributors", repo.full_name(), contributors);

            stats.featured_repos.insert(
                repo.full_name(),
                FeaturedRepo {
                    name: repo.name.clone(),
                    owner: repo.owner.login.clone(),
                    url: repo.html_url.clone(),
                    description: repo.description.clone().unwrap_or_default(),
                    stars: repo.stargazers_count,
                    forks: repo.forks_count,
                    watchers: repo.watchers_count,
                    open_issues: repo.open_issues_count,
                    contributors,
                    language: repo.language.clone().unwrap_or_default(),
                    created_at: repo.created_at.clone().unwrap_or_default(),
                    updated_at: repo.updated_at.clone().unwrap_or_default(),
                    pushed_at: repo.pushed_at.clone().unwrap_or_default(),
                },
            );
        }

        stats
    }
}

/// Totals over `repos`. Forks only count towards `total_repos`.
pub fn aggregate_repo_stats(repos: &[Repository], now: NaiveDateTime) -> AggregateStats {
    let mut stats = AggregateStats {
        total_repos: repos.len() as u64,
        ..Default::default()
    };

    for repo in repos.iter().filter(|repo| !repo.fork) {
        stats.total_stars += repo.stargazers_count;
        stats.total_forks += repo.forks_count;
        stats.total_watchers += repo.watchers_count;
        stats.total_open_issues += repo.open_issues_count;

        if let Some(language) = &repo.language {
            *stats.languages.entry(language.clone()).or_insert(0) += 1;
        }

        if let Some(pushed_at) = repo.pushed_at.as_deref().and_then(parse_timestamp)
            && (now - pushed_at).num_days() < ACTIVE_WITHIN_DAYS
        {
            stats.active_repos += 1;
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::github::RepositoryOwner;

    fn repo(name: &str, stars: u64, fork: bool, pushed_at: &str) -> Repository {
        Repository {
            name: name.to_string(),
            owner: RepositoryOwner {
                login: "noisepy".to_string(),
            },
            html_url: format!("https://github.com/noisepy/{}", name),
            description: None,
            fork,
            stargazers_count: stars,
            watchers_count: stars,
            forks_count: 2,
            open_issues_count: 1,
            language: Some("Python".to_string()),
            created_at: None,
            updated_at: None,
            pushed_at: Some(pushed_at.to_string()),
        }
    }

    #[test]
    fn forks_count_only_as_repositories() {
        let now = parse_timestamp("2025-06-01T00:00:00").unwrap();
        let repos = vec![
            repo("NoisePy", 180, false, "2025-05-20T10:00:00"),
            repo("SeisMIC", 20, false, "2023-01-01T00:00:00"),
            repo("obspy", 1000, true, "2025-05-30T00:00:00"),
        ];

        let stats = aggregate_repo_stats(&repos, now);

        assert_eq!(stats.total_repos, 3);
        assert_eq!(stats.total_stars, 200);
        assert_eq!(stats.total_forks, 4);
        assert_eq!(stats.total_watchers, 200);
        assert_eq!(stats.total_open_issues, 2);
        assert_eq!(stats.active_repos, 1);
        assert_eq!(stats.languages.get("Python"), Some(&2));
    }

    #[test]
    fn empty_account_has_zero_totals() {
        let now = parse_timestamp("2025-06-01T00:00:00").unwrap();
        assert_eq!(aggregate_repo_stats(&[], now), AggregateStats::default());
    }
}
