use clap::Parser;
use colored::Colorize;
use eyre::{Result, bail};
use log::info;

use cv_metrics::cv::citations::update_cv_with_metrics;
use cv_metrics::cv::document::CvDocument;
use cv_metrics::models::scholar::CitationCache;
use cv_metrics::utils::cache::read_json_cache;
use cv_metrics::utils::cli::CommonArgs;
use cv_metrics::utils::config::{Config, config};
use cv_metrics::utils::log::Logger;

/// Writes the cached Google Scholar metrics into the CV's research impact summary
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
        "starting update-cv-citations {}",
        format!("v{}", env!("CARGO_PKG_VERSION")).magenta()
    );

    let config: Config = config(args.common.config)?;

    let cache_path = &config.paths.citation_cache;
    if !cache_path.exists() {
        bail!(
            "citation cache not found at {}, run fetch-citations first",
            cache_path.display()
        );
    }
    let cache: CitationCache = read_json_cache(cache_path)?;

    let mut doc = CvDocument::load(&config.paths.cv_yaml)?;
    let details = update_cv_with_metrics(&mut doc, &cache)?;
    doc.save()?;

    println!("{} Research Citations: {}", "✓".green(), details);

    Ok(())
}
