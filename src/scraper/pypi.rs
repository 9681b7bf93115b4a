use std::collections::BTreeMap;

use eyre::Result;
use log::{debug, info, warn};
use serde_json::Value;

use crate::models::github::PypiStats;
use crate::utils::config::PypiConfig;

pub struct PypiScraper {
    api_base: String,
    client: reqwest::Client,
}

impl PypiScraper {
    pub fn new(config: &PypiConfig) -> Self {
        PypiScraper {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_recent(&self, package: &str) -> Result<PypiStats> {
        let url = format!("{}/packages/{}/recent", self.api_base, package);
        debug!("GET {}", url);

        let body: Value = self
            .client
            .get(&url)
            .header("User-Agent", "cv-metrics")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let count = |key: &str| body["data"][key].as_u64().unwrap_or(0);

        Ok(PypiStats {
            last_day: count("last_day"),
            last_week: count("last_week"),
            last_month: count("last_month"),
        })
    }

    /// Recent download counts. A failed request yields zeros.
    pub async fn recent(&self, package: &str) -> PypiStats {
        match self.fetch_recent(package).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("failed to fetch PyPI stats for {}: {}", package, e);
                PypiStats::default()
            }
        }
    }

    pub async fn fetch_all(&self, packages: &[String]) -> BTreeMap<String, PypiStats> {
        let mut stats = BTreeMap::new();

        for package in packages {
            let recent = self.recent(package).await;
            info!("{}: {} downloads last month", package, recent.last_month);
            stats.insert(package.clone(), recent);
        }

        stats
    }
}
