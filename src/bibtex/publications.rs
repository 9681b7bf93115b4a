use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use eyre::Result;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::bibtex::parser::clean_bibtex_string;
use crate::models::publication::{BibPublication, PublicationEntry};
use crate::models::scholar::CitationCache;
use crate::utils::cli::OutputFormat;

static NOTE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\url\{([^}]+)\}|https?://[^\s,;\}\]]+").unwrap());

fn is_group_member(author: &str, group_members: &[String]) -> bool {
    let author = author.to_lowercase();
    group_members.iter().any(|member| {
        member
            .split_whitespace()
            .last()
            .is_some_and(|last_name| author.contains(&last_name.to_lowercase()))
    })
}

/// Cleans every author name and marks group members with a trailing `*`
pub fn tag_authors(authors: &[String], group_members: &[String]) -> Vec<String> {
    authors
        .iter()
        .map(|author| clean_bibtex_string(author))
        .filter(|author| !author.is_empty())
        .map(|author| {
            if is_group_member(&author, group_members) {
                format!("{}*", author)
            } else {
                author
            }
        })
        .collect()
}

/// "A and B" for up to two authors, "A, B, and C" otherwise
pub fn format_authors(authors: &[String], group_members: &[String]) -> String {
    let formatted = tag_authors(authors, group_members);

    match formatted.as_slice() {
        [] => String::new(),
        [_] | [_, _] => formatted.join(" and "),
        [init @ .., last] => format!("{}, and {}", init.join(", "), last),
    }
}

pub fn extract_urls_from_note(note: &str) -> Vec<String> {
    NOTE_URL
        .captures_iter(note)
        .filter_map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(0))
                .map(|m| m.as_str().trim().to_string())
        })
        .filter(|url| !url.is_empty())
        .collect()
}

/// Converts parsed BibTeX records into CV publication entries
pub fn bibtex_to_cv(
    publications: &[BibPublication],
    group_members: &[String],
    media_coverage: &BTreeMap<String, Vec<String>>,
) -> Vec<PublicationEntry> {
    publications
        .iter()
        .map(|publication| {
            let mut journal = publication.journal.clone();
            if !publication.volume.is_empty() {
                journal.push_str(&format!(", {}", publication.volume));
            }

            let (doi, url) = match (publication.doi.is_empty(), publication.url.is_empty()) {
                (false, true) => (
                    Some(publication.doi.clone()),
                    Some(format!("https://doi.org/{}", publication.doi)),
                ),
                (false, false) => (Some(publication.doi.clone()), None),
                (true, false) => (None, Some(publication.url.clone())),
                (true, true) => (None, None),
            };

            let media = match media_coverage.get(&publication.citation_key) {
                Some(urls) => Some(urls.clone()),
                None => Some(extract_urls_from_note(&publication.note)).filter(|urls| !urls.is_empty()),
            };

            PublicationEntry {
                title: publication.title.clone(),
                authors: tag_authors(&publication.authors, group_members),
                summary: None,
                doi,
                url,
                journal: Some(journal).filter(|journal| !journal.is_empty()),
                date: Some(format!("{}-01", publication.year)).filter(|_| !publication.year.is_empty()),
                citations: None,
                media_coverage: media,
                citation_key: Some(publication.citation_key.clone()),
            }
        })
        .collect()
}

/// Attaches cached citation counts. Entries without a cached count get -1.
/// A missing cache leaves the entries untouched.
pub fn add_citations_to_publications(entries: &mut [PublicationEntry], cache_path: &Path) {
    if !cache_path.exists() {
        debug!("no citation cache at {}, skipping counts", cache_path.display());
        return;
    }

    let cache: CitationCache = match fs::read_to_string(cache_path)
        .map_err(eyre::Report::from)
        .and_then(|raw| serde_json::from_str::<CitationCache>(&raw).map_err(eyre::Report::from))
    {
        Ok(cache) => cache,
        Err(e) => {
            warn!("could not read citation cache {}: {}", cache_path.display(), e);
            return;
        }
    };

    apply_citations(entries, &cache);
}

pub fn apply_citations(entries: &mut [PublicationEntry], cache: &CitationCache) {
    for entry in entries.iter_mut() {
        if let Some(key) = &entry.citation_key {
            entry.citations = Some(cache.citations.get(key).copied().unwrap_or(-1));
        }
    }
}

/// Publications with at least one group member among the authors
pub fn extract_group_member_publications(
    publications: &[BibPublication],
    group_members: &[String],
    format: OutputFormat,
) -> Result<String> {
    let group_publications: Vec<&BibPublication> = publications
        .iter()
        .filter(|publication| {
            publication
                .authors
                .iter()
                .any(|author| is_group_member(author, group_members))
        })
        .collect();

    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&group_publications)?),
        OutputFormat::Yaml => {
            let mut out = Vec::new();
            for publication in group_publications {
                let authors = format_authors(&publication.authors, group_members);
                out.push(format!("  - title: {}", single_quoted(&publication.title)));
                out.push(format!("    authors: [{}]", authors));
                out.push(format!("    journal: {}", single_quoted(&publication.journal)));
                out.push(format!("    date: {}-01", publication.year));
                if !publication.doi.is_empty() {
                    out.push(format!("    doi: {}", publication.doi));
                    out.push(format!("    url: https://doi.org/{}", publication.doi));
                }
                out.push(String::new());
            }
            Ok(out.join("\n"))
        }
    }
}

/// Escapes a value for a single-quoted YAML scalar
fn single_quoted(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// The publications section as YAML, ready to paste under `cv.sections`
pub fn publications_yaml(entries: &[PublicationEntry]) -> Result<String> {
    let mut out = String::new();
    out.push_str("    publications:\n");
    out.push_str("      # AUTO-GENERATED from the BibTeX bibliography by generate-publications\n");
    out.push_str(&format!(
        "      # {} publications with group member tagging (*)\n",
        entries.len()
    ));
    out.push_str("      # Citations marked with -1 indicate 'no data available'\n");
    out.push('\n');

    for entry in entries {
        let yaml = serde_yaml::to_string(std::slice::from_ref(entry))?;
        for line in yaml.lines() {
            out.push_str("      ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }

    Ok(out)
}
