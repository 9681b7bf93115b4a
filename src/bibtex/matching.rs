use std::collections::BTreeMap;

use log::{debug, info};
use rayon::prelude::*;

use crate::models::publication::BibPublication;
use crate::models::scholar::ScholarPublication;
use crate::utils::misc::truncate;

/// Similarity score of two titles, 0-100. Case and surrounding whitespace are ignored.
pub fn match_titles(a: &str, b: &str) -> u8 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a == b {
        return 100;
    }

    (strsim::normalized_levenshtein(&a, &b) * 100.0).round() as u8
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchReport {
    /// citation key -> citation count
    pub matched: BTreeMap<String, i64>,
    /// titles of the BibTeX entries without a good enough match
    pub unmatched: Vec<String>,
}

/// Pairs every BibTeX entry with its best scoring Scholar publication.
/// Entries without a title or a citation key are skipped.
pub fn match_bibtex_to_scholar(
    bibtex: &[BibPublication],
    scholar: &[ScholarPublication],
    threshold: u8,
) -> MatchReport {
    let candidates: Vec<&BibPublication> = bibtex
        .iter()
        .filter(|entry| !entry.title.trim().is_empty() && !entry.citation_key.trim().is_empty())
        .collect();
    if candidates.len() < bibtex.len() {
        debug!(
            "skipping {} BibTeX entries without a title or key",
            bibtex.len() - candidates.len()
        );
    }

    let best: Vec<Option<(&ScholarPublication, u8)>> = candidates
        .par_iter()
        .map(|entry| {
            scholar
                .iter()
                .map(|publication| (publication, match_titles(&entry.title, &publication.title)))
                .fold(None, |best: Option<(&ScholarPublication, u8)>, candidate| match best {
                    Some((_, score)) if score >= candidate.1 => best,
                    _ => Some(candidate),
                })
        })
        .collect();

    let mut report = MatchReport::default();
    for (entry, best) in candidates.iter().zip(best) {
        match best {
            Some((publication, score)) if score >= threshold => {
                debug!(
                    "matched {} ({}) -> {} citations",
                    entry.citation_key, score, publication.citations
                );
                report
                    .matched
                    .insert(entry.citation_key.clone(), publication.citations as i64);
            }
            _ => {
                debug!("no match for {}: {}", entry.citation_key, truncate(&entry.title, 60));
                report.unmatched.push(entry.title.clone());
            }
        }
    }

    info!(
        "matched {} of {} BibTeX entries to Google Scholar",
        report.matched.len(),
        candidates.len()
    );
    if !report.unmatched.is_empty() {
        info!("{} entries without a match:", report.unmatched.len());
        for title in report.unmatched.iter().take(10) {
            info!("  - {}", truncate(title, 80));
        }
    }
    info!(
        "total citations across matched entries: {}",
        report.matched.values().sum::<i64>()
    );

    report
}
