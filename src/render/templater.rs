use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use eyre::{Result, bail};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::models::entry::{Entry, FieldValue};
use crate::render::date::{compute_time_span_string, format_date_range, format_single_date};
use crate::utils::config::{LocaleConfig, TemplatesConfig};
use crate::utils::misc::strip_url;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z_]+\b").unwrap());
static UNWANTED_TRAILING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9.!?\[\]\(\)\*_%]+$").unwrap());
static DOMAIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://(?:www\.)?([^/]+)").unwrap());

/// Known news outlets, checked in order against the URL's domain
const MEDIA_SOURCES: &[(&str, &str)] = &[
    ("news.washington.edu", "UW News"),
    ("washington.edu", "UW News"),
    ("news.harvard.edu", "Harvard Gazette"),
    ("harvard.edu", "Harvard Gazette"),
    ("news.stanford.edu", "Stanford News"),
    ("sciencedaily.com", "ScienceDaily"),
    ("eos.org", "EOS"),
    ("science.org", "Science"),
    ("sciencemag.org", "Science"),
    ("nature.com", "Nature"),
    ("youtube.com", "Video"),
    ("youtu.be", "Video"),
];

/// Template name (or upper-cased field name) -> rendered text
pub type RenderedEntry = BTreeMap<String, String>;

const ROW_ORDER: &[&str] = &[
    "main_column_first_row",
    "main_column_second_row",
    "main_column_third_row",
    "main_column_fourth_row",
    "date_and_location_column",
];

/// Expands the templates of an entry kind with the entry's processed fields.
/// Text entries and kinds without templates come back as their plain fields.
pub fn render_entry_templates(
    entry: &Entry,
    templates: &TemplatesConfig,
    locale: &LocaleConfig,
    show_time_span: bool,
    current_date: NaiveDate,
) -> Result<RenderedEntry> {
    let entry_templates = match (entry, templates.for_entry(entry)) {
        (Entry::Text(text), _) => return Ok(RenderedEntry::from([("TEXT".to_string(), text.clone())])),
        (_, None) => {
            return Ok(entry
                .fields()
                .into_iter()
                .map(|(key, value)| (key, value.to_text()))
                .collect());
        }
        (_, Some(entry_templates)) => entry_templates.clone(),
    };

    let raw_fields = entry.fields();
    let hidden: BTreeSet<String> = raw_fields
        .iter()
        .filter(|(_, value)| value.is_hidden())
        .map(|(key, _)| key.clone())
        .collect();

    let mut fields: BTreeMap<String, String> = raw_fields
        .iter()
        .map(|(key, value)| (key.clone(), value.to_text()))
        .collect();

    if let Some(FieldValue::List(highlights)) = raw_fields.get("HIGHLIGHTS") {
        fields.insert("HIGHLIGHTS".to_string(), process_highlights(highlights));
    }

    if let Some(FieldValue::Number(citations)) = raw_fields.get("CITATIONS") {
        fields.insert("CITATIONS".to_string(), process_citations(*citations));
    }

    if let Some(FieldValue::List(media)) = raw_fields.get("MEDIA_COVERAGE") {
        fields.insert("MEDIA_COVERAGE".to_string(), process_media_coverage(media));
    }

    match entry {
        Entry::Normal(normal) => {
            fields.insert("TITLE".to_string(), normal.name.clone());
        }
        _ => {
            if let Some(FieldValue::List(authors)) = raw_fields.get("AUTHORS") {
                fields.insert("AUTHORS".to_string(), authors.join(", "));
            }
        }
    }

    let date = text_field(&raw_fields, "DATE");
    let start_date = text_field(&raw_fields, "START_DATE");
    let end_date = text_field(&raw_fields, "END_DATE");

    if date.is_some() || start_date.is_some() || end_date.is_some() {
        let processed = process_date(
            date.as_deref(),
            start_date.as_deref(),
            end_date.as_deref(),
            templates,
            locale,
            show_time_span,
            current_date,
        )?;
        fields.insert("DATE".to_string(), processed);
    }
    if let Some(start_date) = &start_date {
        fields.insert(
            "START_DATE".to_string(),
            format_single_date(start_date, locale, &templates.single_date),
        );
    }
    if let Some(end_date) = &end_date {
        fields.insert(
            "END_DATE".to_string(),
            format_single_date(end_date, locale, &templates.single_date),
        );
    }

    if fields.contains_key("URL") || fields.contains_key("DOI") {
        fields.insert("URL".to_string(), process_url(entry)?);
    }
    if let Entry::Publication(publication) = entry
        && let (Some(doi), Some(doi_url)) = (&publication.doi, publication.doi_url())
    {
        let doi = format!("[{}]({})", doi, doi_url);
        let journal_with_doi = fields
            .get("JOURNAL")
            .map(|journal| format!("{}, {}", journal, doi));
        if let Some(journal_with_doi) = journal_with_doi {
            fields.insert("JOURNAL_WITH_DOI".to_string(), journal_with_doi);
        }
        fields.insert("DOI".to_string(), doi);
    }

    if let Some(summary) = fields.get("SUMMARY") {
        let summary = process_summary(summary);
        fields.insert("SUMMARY".to_string(), summary);
    }

    for key in &hidden {
        fields.remove(key);
    }

    let entry_templates = remove_not_provided_placeholders(&entry_templates, &fields);

    Ok(entry_templates
        .iter()
        .chain(fields.iter())
        .map(|(name, template)| (name.clone(), substitute_placeholders(template, &fields)))
        .collect())
}

/// The non-empty template rows of a rendered entry, in reading order
pub fn entry_markdown(rendered: &RenderedEntry) -> String {
    if let Some(text) = rendered.get("TEXT") {
        return text.clone();
    }

    let is_template = |name: &str| name.chars().any(|c| c.is_ascii_lowercase());

    let mut rows: Vec<&str> = ROW_ORDER
        .iter()
        .filter_map(|row| rendered.get(*row))
        .map(String::as_str)
        .collect();
    rows.extend(
        rendered
            .iter()
            .filter(|(name, _)| is_template(name) && !ROW_ORDER.contains(&name.as_str()))
            .map(|(_, row)| row.as_str()),
    );
    if rows.is_empty() {
        rows = rendered.values().map(String::as_str).collect();
    }

    rows.into_iter()
        .filter(|row| !row.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn text_field(fields: &BTreeMap<String, FieldValue>, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(FieldValue::Text(text)) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
}

/// Markdown list, " - " inside a highlight starts a nested item
pub fn process_highlights(highlights: &[String]) -> String {
    highlights
        .iter()
        .map(|highlight| format!("- {}", highlight.replace(" - ", "\n  - ")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Negative counts mean no data was available
pub fn process_citations(citations: i64) -> String {
    match citations {
        n if n < 0 => "Citations: no data".to_string(),
        0 => "Citations: 0".to_string(),
        n => format!("Cited by {}", n),
    }
}

fn media_source_name(url: &str) -> String {
    let Some(domain) = DOMAIN.captures(url).map(|caps| caps[1].to_string()) else {
        return "Coverage".to_string();
    };

    if let Some((_, name)) = MEDIA_SOURCES.iter().find(|(pattern, _)| domain.contains(pattern)) {
        return name.to_string();
    }

    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() >= 2 {
        capitalize(parts[0])
    } else {
        "Coverage".to_string()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

pub fn process_media_coverage(urls: &[String]) -> String {
    if urls.is_empty() {
        return String::new();
    }

    let links: Vec<String> = urls
        .iter()
        .map(|url| format!("[{}]({})", media_source_name(url), url))
        .collect();

    format!("Featured in: {}", links.join(", "))
}

/// Link to the DOI for publications that have one, else to the entry's URL
pub fn process_url(entry: &Entry) -> Result<String> {
    let url = match entry {
        Entry::Publication(publication) => {
            if let (Some(doi), Some(doi_url)) = (&publication.doi, publication.doi_url()) {
                return Ok(format!("[{}]({})", doi, doi_url));
            }
            publication.url.as_ref()
        }
        Entry::Normal(normal) => normal.url.as_ref(),
        _ => None,
    };

    match url.filter(|url| !url.is_empty()) {
        Some(url) => Ok(format!("[{}]({})", strip_url(url), url)),
        None => bail!("no URL provided for this entry"),
    }
}

pub fn process_summary(summary: &str) -> String {
    let indented: Vec<String> = summary
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                line.to_string()
            } else {
                format!("    {}", line)
            }
        })
        .collect();

    format!("!!! summary\n{}", indented.join("\n"))
}

/// A single date, or a range (with its time span when asked for)
pub fn process_date(
    date: Option<&str>,
    start_date: Option<&str>,
    end_date: Option<&str>,
    templates: &TemplatesConfig,
    locale: &LocaleConfig,
    show_time_span: bool,
    current_date: NaiveDate,
) -> Result<String> {
    match (date, start_date, end_date) {
        (Some(date), None, None) => Ok(format_single_date(date, locale, &templates.single_date)),
        (_, Some(start), Some(end)) => {
            let range = format_date_range(
                start,
                end,
                locale,
                &templates.single_date,
                &templates.date_range,
            );
            if !show_time_span {
                return Ok(range);
            }

            let span = compute_time_span_string(start, end, locale, current_date, &templates.time_span)?;
            Ok(format!("{}\n\n{}", range, span))
        }
        _ => bail!("incomplete date for this entry: a range needs both start_date and end_date"),
    }
}

/// Strips placeholders without a value, with the characters stuck to them and
/// the separators they leave at line ends
pub fn remove_not_provided_placeholders(
    templates: &BTreeMap<String, String>,
    fields: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let used: BTreeSet<&str> = templates
        .values()
        .flat_map(|template| PLACEHOLDER.find_iter(template).map(|m| m.as_str()))
        .collect();
    let missing: Vec<String> = used
        .into_iter()
        .filter(|placeholder| !fields.contains_key(*placeholder))
        .map(regex::escape)
        .collect();

    if missing.is_empty() {
        return templates.clone();
    }

    let pattern = format!(r"\S*(?:{})\S*", missing.join("|"));
    let Ok(missing_pattern) = Regex::new(&pattern) else {
        return templates.clone();
    };

    templates
        .iter()
        .map(|(name, template)| {
            (
                name.clone(),
                clean_trailing_parts(&missing_pattern.replace_all(template, "")),
            )
        })
        .collect()
}

/// Drops empty lines and trailing punctuation left over on each line
pub fn clean_trailing_parts(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(|line| UNWANTED_TRAILING.replace(line, "").trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replaces every upper-case word that names a field with the field's value
pub fn substitute_placeholders(text: &str, values: &BTreeMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures| {
            values
                .get(&caps[0])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .to_string()
}
