use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use eyre::{Result, WrapErr};
use log::info;
use serde_yaml::Value;

use cv_metrics::bibtex::parser::parse_bibtex_file;
use cv_metrics::bibtex::publications::{
    add_citations_to_publications, bibtex_to_cv, extract_group_member_publications,
    publications_yaml,
};
use cv_metrics::cv::document::CvDocument;
use cv_metrics::utils::cli::{CommonArgs, OutputFormat};
use cv_metrics::utils::config::{Config, config};
use cv_metrics::utils::log::Logger;

/// Converts the BibTeX bibliography into the CV's publications section
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Write the result to this file instead of stdout
    #[arg(short, long, value_name = "FILE", conflicts_with = "in_place")]
    output: Option<PathBuf>,

    /// Replace cv.sections.publications in the CV file
    #[arg(long)]
    in_place: bool,

    /// Only list publications with a group member among the authors
    #[arg(long, conflicts_with = "in_place")]
    group_only: bool,

    /// Output format of --group-only
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    format: OutputFormat,
}

fn emit(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            println!("{} wrote {}", "✓".green(), path.display());
        }
        None => print!("{}", content),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    Logger::init(args.common.verbosity);

    info!(
        "starting generate-publications {}",
        format!("v{}", env!("CARGO_PKG_VERSION")).magenta()
    );

    let config: Config = config(args.common.config)?;
    let group_members = &config.publications.group_members;

    let publications = parse_bibtex_file(&config.paths.bibliography)?;
    info!("loaded {} BibTeX entries", publications.len());

    if args.group_only {
        let listing = extract_group_member_publications(&publications, group_members, args.format)?;
        return emit(args.output.as_ref(), &listing);
    }

    let mut entries = bibtex_to_cv(&publications, group_members, &config.publications.media_coverage);
    add_citations_to_publications(&mut entries, &config.paths.citation_cache);

    let with_data = entries
        .iter()
        .filter(|entry| entry.citations.is_some_and(|n| n >= 0))
        .count();
    info!("{} of {} publications have citation data", with_data, entries.len());

    if args.in_place {
        let mut doc = CvDocument::load(&config.paths.cv_yaml)?;
        doc.sections_mut()?
            .insert(Value::from("publications"), serde_yaml::to_value(&entries)?);
        doc.save()?;

        println!(
            "{} replaced {} publications in {}",
            "✓".green(),
            entries.len().to_string().bold(),
            config.paths.cv_yaml.display()
        );
        return Ok(());
    }

    emit(args.output.as_ref(), &publications_yaml(&entries)?)
}
