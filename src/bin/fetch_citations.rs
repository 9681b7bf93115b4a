use chrono::Local;
use clap::Parser;
use colored::Colorize;
use eyre::{Result, bail, eyre};
use log::info;

use cv_metrics::bibtex::matching::match_bibtex_to_scholar;
use cv_metrics::bibtex::parser::parse_bibtex_file;
use cv_metrics::cv::document::CvDocument;
use cv_metrics::models::scholar::CitationCache;
use cv_metrics::scraper::scholar::ScholarScraper;
use cv_metrics::utils::cache::{is_fresh, load_json_cache, now_timestamp, save_json_cache};
use cv_metrics::utils::cli::{CommonArgs, RefreshArgs};
use cv_metrics::utils::config::{Config, config};
use cv_metrics::utils::log::Logger;
use cv_metrics::utils::misc::thousands;

/// Fetches Google Scholar citation counts for every BibTeX entry
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    refresh: RefreshArgs,
}

fn scholar_id(config: &Config) -> Result<String> {
    if let Some(id) = config.citations.scholar_id.clone().filter(|id| !id.is_empty()) {
        return Ok(id);
    }

    CvDocument::load(&config.paths.cv_yaml)?
        .google_scholar_id()
        .ok_or_else(|| {
            eyre!(
                "no Google Scholar id: add a GoogleScholar entry to cv.social_networks in {}",
                config.paths.cv_yaml.display()
            )
        })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    Logger::init(args.common.verbosity);

    info!(
        "starting fetch-citations {}",
        format!("v{}", env!("CARGO_PKG_VERSION")).magenta()
    );

    let config: Config = config(args.common.config)?;

    let author_id = scholar_id(&config)?;
    info!("Google Scholar id: {}", author_id);

    let bib_path = &config.paths.bibliography;
    if !bib_path.exists() {
        bail!("BibTeX file not found: {}", bib_path.display());
    }

    let cache_path = &config.paths.citation_cache;
    let mut cache: CitationCache = load_json_cache(cache_path);

    let now = Local::now().naive_local();
    if !args.refresh.force_refresh
        && is_fresh(cache.last_updated.as_deref(), config.citations.expiry_days, now)
    {
        println!(
            "{} citation cache is fresh (updated {})",
            "✓".green(),
            cache.last_updated.as_deref().unwrap_or_default()
        );
        println!(
            "  {} publications, {} citations",
            cache.citations.len(),
            thousands(cache.total_citations())
        );
        println!("  use {} to fetch anyway", "--force-refresh".cyan());
        return Ok(());
    }

    let publications = parse_bibtex_file(bib_path)?;
    info!("loaded {} BibTeX entries from {}", publications.len(), bib_path.display());

    let profile = ScholarScraper::new(&config.citations)
        .fetch_profile(&author_id)
        .await?;
    if profile.publications.is_empty() {
        bail!("no publications found on the Google Scholar profile of {}", profile.name);
    }

    let report = match_bibtex_to_scholar(
        &publications,
        &profile.publications,
        config.citations.match_threshold,
    );

    cache.citations = report.matched;
    cache.metrics = Some(profile.metrics);
    cache.last_updated = Some(now_timestamp());
    cache.author_id = Some(author_id);
    save_json_cache(cache_path, &cache)?;

    println!(
        "{} {} matched, {} unmatched, {} citations",
        "✓".green(),
        cache.citations.len().to_string().bold(),
        report.unmatched.len(),
        thousands(cache.total_citations())
    );
    println!("  saved to {}", cache_path.display());

    Ok(())
}
