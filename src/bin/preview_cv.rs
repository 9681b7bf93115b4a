use chrono::Local;
use clap::Parser;
use colored::Colorize;
use eyre::{Result, eyre};
use log::{info, warn};

use cv_metrics::cv::document::CvDocument;
use cv_metrics::models::entry::Entry;
use cv_metrics::render::templater::{entry_markdown, render_entry_templates};
use cv_metrics::utils::cli::CommonArgs;
use cv_metrics::utils::config::{Config, config};
use cv_metrics::utils::log::Logger;

/// Prints CV sections with their entry templates expanded
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Only preview this section (e.g. publications)
    #[arg(short, long, value_name = "NAME")]
    section: Option<String>,

    /// Append the time span to date ranges
    #[arg(long)]
    show_time_span: bool,
}

fn section_title(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    Logger::init(args.common.verbosity);

    info!(
        "starting preview-cv {}",
        format!("v{}", env!("CARGO_PKG_VERSION")).magenta()
    );

    let config: Config = config(args.common.config)?;
    let doc = CvDocument::load(&config.paths.cv_yaml)?;
    let sections = doc
        .sections()
        .ok_or_else(|| eyre!("no 'cv.sections' mapping in {}", config.paths.cv_yaml.display()))?;

    let today = Local::now().date_naive();
    let mut shown = 0;

    for (name, entries) in sections {
        let Some(name) = name.as_str() else {
            continue;
        };
        if args.section.as_deref().is_some_and(|wanted| wanted != name) {
            continue;
        }
        let Some(entries) = entries.as_sequence() else {
            warn!("section {} is not a list, skipping", name);
            continue;
        };

        println!("{}\n", format!("## {}", section_title(name)).bold());

        for value in entries {
            let entry = match Entry::from_yaml(value) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipping entry in {}: {}", name, e);
                    continue;
                }
            };

            match render_entry_templates(
                &entry,
                &config.templates,
                &config.locale,
                args.show_time_span,
                today,
            ) {
                Ok(rendered) => println!("{}\n", entry_markdown(&rendered)),
                Err(e) => warn!("failed to render an entry of {}: {}", name, e),
            }
        }

        shown += 1;
    }

    if shown == 0 {
        match &args.section {
            Some(section) => warn!("no section named {} in the CV", section),
            None => warn!("the CV has no sections"),
        }
    }

    Ok(())
}
