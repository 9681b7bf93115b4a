use std::cmp::Reverse;
use std::fs;
use std::path::Path;

use biblatex::{Bibliography, Chunk, Entry, Person, Spanned};
use eyre::{Result, WrapErr, eyre};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::models::publication::BibPublication;

static OUTER_BRACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^\{(.*)\}$").unwrap());
static TEXT_COMMAND: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\text[a-z]+\{([^}]*)\}").unwrap());
static ANY_COMMAND: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\[a-z]+\{([^}]*)\}").unwrap());
static ACCENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\\(['"`^~])\{?(\\i|[A-Za-z])\}?"#).unwrap());
static CEDILLA: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\c\{?([cCsS])\}?").unwrap());
static ESCAPED_SYMBOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\([&%$#_])").unwrap());
static STRAY_BACKSLASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\([a-zA-Z])").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

pub fn parse_bibtex_file(path: &Path) -> Result<Vec<BibPublication>> {
    let source = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read BibTeX file {}", path.display()))?;

    parse_bibtex(&source)
}

/// Parses every entry of a bibliography, newest first. Entries with the same
/// year keep their file order.
pub fn parse_bibtex(source: &str) -> Result<Vec<BibPublication>> {
    let bibliography =
        Bibliography::parse(source).map_err(|e| eyre!("failed to parse BibTeX: {}", e))?;

    let mut publications: Vec<BibPublication> = bibliography.iter().map(to_publication).collect();
    publications.sort_by_key(|publication| Reverse(publication.year_number()));

    debug!("parsed {} BibTeX entries", publications.len());
    Ok(publications)
}

fn to_publication(entry: &Entry) -> BibPublication {
    let authors = match entry.author() {
        Ok(people) => people.iter().map(person_name).collect(),
        Err(e) => {
            warn!("entry {} has no usable author field: {}", entry.key, e);
            Vec::new()
        }
    };

    let year = match field(entry, "year") {
        year if !year.is_empty() => year,
        _ => field(entry, "date").chars().take(4).collect(),
    };

    BibPublication {
        citation_key: entry.key.clone(),
        title: clean_bibtex_string(&field(entry, "title")),
        authors,
        year,
        journal: clean_bibtex_string(&first_field(entry, &["journal", "journaltitle", "booktitle"])),
        volume: field(entry, "volume"),
        pages: field(entry, "pages"),
        doi: field(entry, "doi"),
        url: field(entry, "url"),
        note: field(entry, "note"),
        entry_type: entry.entry_type.to_string().to_lowercase(),
    }
}

fn field(entry: &Entry, name: &str) -> String {
    entry
        .fields
        .get(name)
        .map(|chunks| format_field_value(chunks))
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn first_field(entry: &Entry, names: &[&str]) -> String {
    names
        .iter()
        .map(|name| field(entry, name))
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

fn format_field_value(value: &[Spanned<Chunk>]) -> String {
    value
        .iter()
        .map(|spanned_chunk| match &spanned_chunk.v {
            Chunk::Normal(s) => s.clone(),
            Chunk::Verbatim(s) => s.clone(),
            Chunk::Math(s) => format!("${}$", s),
        })
        .collect::<Vec<String>>()
        .join("")
}

/// "Given Prefix Family, Suffix", cleaned of LaTeX markup
fn person_name(person: &Person) -> String {
    let name = [&person.given_name, &person.prefix, &person.name]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let name = if person.suffix.trim().is_empty() {
        name
    } else {
        format!("{}, {}", name, person.suffix.trim())
    };

    clean_bibtex_string(&name)
}

/// Removes BibTeX/LaTeX markup: protective braces, formatting commands and
/// accent escapes (`\'e` becomes `é`).
pub fn clean_bibtex_string(s: &str) -> String {
    let s = OUTER_BRACES.replace(s.trim(), "$1");
    let s = ACCENT.replace_all(&s, |caps: &Captures| {
        let letter = if &caps[2] == "\\i" { "i" } else { &caps[2] };
        accented(&caps[1], letter).unwrap_or_else(|| caps[0].to_string())
    });
    let s = CEDILLA.replace_all(&s, |caps: &Captures| {
        accented("c", &caps[1]).unwrap_or_else(|| caps[0].to_string())
    });
    let s = TEXT_COMMAND.replace_all(&s, "$1");
    let s = ANY_COMMAND.replace_all(&s, "$1");
    let s = ESCAPED_SYMBOL.replace_all(&s, "$1");
    let s = STRAY_BACKSLASH.replace_all(&s, "$1");
    let s = s.replace(['{', '}'], "");

    WHITESPACE.replace_all(s.trim(), " ").to_string()
}

fn accented(accent: &str, letter: &str) -> Option<String> {
    let (plain, marked) = match accent {
        "'" => ("aeiouyAEIOUYcnszCNSZ", "áéíóúýÁÉÍÓÚÝćńśźĆŃŚŹ"),
        "`" => ("aeiouAEIOU", "àèìòùÀÈÌÒÙ"),
        "^" => ("aeiouAEIOU", "âêîôûÂÊÎÔÛ"),
        "\"" => ("aeiouyAEIOU", "äëïöüÿÄËÏÖÜ"),
        "~" => ("anoANO", "ãñõÃÑÕ"),
        "c" => ("cCsS", "çÇşŞ"),
        _ => return None,
    };

    let position = plain.chars().position(|c| letter.starts_with(c) && letter.len() == 1)?;
    marked.chars().nth(position).map(String::from)
}
