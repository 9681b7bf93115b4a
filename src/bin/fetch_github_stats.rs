use chrono::Local;
use clap::Parser;
use colored::Colorize;
use eyre::{Result, bail};
use log::info;

use cv_metrics::models::github::StatsCache;
use cv_metrics::scraper::github::GitHubScraper;
use cv_metrics::scraper::pypi::PypiScraper;
use cv_metrics::utils::cache::{append_history, is_fresh, load_json_cache, now_timestamp, save_json_cache};
use cv_metrics::utils::cli::{CommonArgs, RefreshArgs};
use cv_metrics::utils::config::{Config, config};
use cv_metrics::utils::log::Logger;
use cv_metrics::utils::misc::thousands;

/// Collects GitHub repository and PyPI download statistics
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    refresh: RefreshArgs,
}

fn print_summary(cache: &StatsCache) {
    let aggregate = &cache.github.aggregate;

    println!("{}", "GitHub".cyan().bold());
    println!("  repositories:  {}", aggregate.total_repos);
    println!("  active:        {}", aggregate.active_repos);
    println!("  stars:         {}", thousands(aggregate.total_stars));
    println!("  forks:         {}", thousands(aggregate.total_forks));
    println!("  watchers:      {}", thousands(aggregate.total_watchers));
    println!("  open issues:   {}", aggregate.total_open_issues);
    println!("  languages:     {}", aggregate.top_languages(5).join(", "));

    if !cache.pypi.is_empty() {
        println!("{}", "PyPI".cyan().bold());
        for (package, stats) in &cache.pypi {
            println!(
                "  {}: {} last month, {} last week, {} last day",
                package.bold(),
                thousands(stats.last_month),
                thousands(stats.last_week),
                thousands(stats.last_day)
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    Logger::init(args.common.verbosity);

    info!(
        "starting fetch-github-stats {}",
        format!("v{}", env!("CARGO_PKG_VERSION")).magenta()
    );

    let config: Config = config(args.common.config)?;

    if config.github.users.is_empty() && config.github.orgs.is_empty() {
        bail!("no GitHub users or organizations configured under [github]");
    }

    let cache_path = &config.paths.github_stats_cache;
    let cached: StatsCache = load_json_cache(cache_path);

    let now = Local::now().naive_local();
    if !args.refresh.force_refresh
        && is_fresh(cached.last_updated.as_deref(), config.github.expiry_days, now)
    {
        println!(
            "{} stats cache is fresh (updated {})",
            "✓".green(),
            cached.last_updated.as_deref().unwrap_or_default()
        );
        print_summary(&cached);
        println!("  use {} to fetch anyway", "--force-refresh".cyan());
        return Ok(());
    }

    let github = GitHubScraper::new(config.clone()).fetch_all(now).await;
    if github.aggregate.total_repos == 0 {
        bail!("no repositories could be fetched from GitHub");
    }

    let pypi = PypiScraper::new(&config.pypi)
        .fetch_all(&config.pypi.packages)
        .await;

    let cache = StatsCache {
        last_updated: Some(now_timestamp()),
        github,
        pypi,
    };
    save_json_cache(cache_path, &cache)?;

    let (header, row) = cache.history_record(&config.pypi.packages);
    append_history(&config.paths.github_stats_history, &header, &row)?;

    print_summary(&cache);
    println!("  saved to {}", cache_path.display());

    Ok(())
}
