use clap::Parser;
use colored::Colorize;
use eyre::{Result, bail};
use log::info;

use cv_metrics::cv::document::CvDocument;
use cv_metrics::cv::stats::update_cv_with_stats;
use cv_metrics::models::github::StatsCache;
use cv_metrics::utils::cache::read_json_cache;
use cv_metrics::utils::cli::CommonArgs;
use cv_metrics::utils::config::{Config, config};
use cv_metrics::utils::log::Logger;

/// Writes the cached GitHub and PyPI statistics into the CV
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    Logger::init(args.common.verbosity);

    info!(
        "starting update-cv-stats {}",
        format!("v{}", env!("CARGO_PKG_VERSION")).magenta()
    );

    let config: Config = config(args.common.config)?;

    let cache_path = &config.paths.github_stats_cache;
    if !cache_path.exists() {
        bail!(
            "stats cache not found at {}, run fetch-github-stats first",
            cache_path.display()
        );
    }
    let cache: StatsCache = read_json_cache(cache_path)?;

    let mut doc = CvDocument::load(&config.paths.cv_yaml)?;
    update_cv_with_stats(&mut doc, &cache, &config.cv)?;
    doc.save()?;

    println!(
        "{} CV updated with {} GitHub stars and {} PyPI packages",
        "✓".green(),
        cache.github.aggregate.total_stars.to_string().bold(),
        cache.pypi.len()
    );

    Ok(())
}
