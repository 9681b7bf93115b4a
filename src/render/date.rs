use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use eyre::{Result, eyre};

use crate::render::templater::substitute_placeholders;
use crate::utils::config::LocaleConfig;

/// A CV date: `YYYY-MM-DD`, `YYYY-MM` or `YYYY`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CvDate {
    Year(i32),
    Month(NaiveDate),
    Day(NaiveDate),
}

impl CvDate {
    fn parse(raw: &str) -> Option<CvDate> {
        let raw = raw.trim();

        if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(CvDate::Day(day));
        }
        if let Ok(month) = NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d") {
            return Some(CvDate::Month(month));
        }
        if raw.len() == 4 && raw.chars().all(|c| c.is_ascii_digit()) {
            return raw.parse().ok().map(CvDate::Year);
        }

        None
    }

    fn first_day(&self) -> Option<NaiveDate> {
        match self {
            CvDate::Year(year) => NaiveDate::from_ymd_opt(*year, 1, 1),
            CvDate::Month(date) | CvDate::Day(date) => Some(*date),
        }
    }
}

fn is_present(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("present")
}

/// Formats one date with the single date template. Years stay bare and
/// unrecognised strings are returned as written.
pub fn format_single_date(date: &str, locale: &LocaleConfig, template: &str) -> String {
    if is_present(date) {
        return locale.present.clone();
    }

    let (date, has_day) = match CvDate::parse(date) {
        Some(CvDate::Year(year)) => return year.to_string(),
        Some(CvDate::Month(date)) => (date, false),
        Some(CvDate::Day(date)) => (date, true),
        None => return date.to_string(),
    };

    let month = date.month0() as usize;
    let pick = |names: &[String]| names.get(month).cloned().unwrap_or_default();

    let values = BTreeMap::from([
        ("MONTH_NAME".to_string(), pick(&locale.month_names)),
        ("MONTH_ABBREVIATION".to_string(), pick(&locale.month_abbreviations)),
        ("MONTH".to_string(), date.month().to_string()),
        ("MONTH_IN_TWO_DIGITS".to_string(), format!("{:02}", date.month())),
        ("YEAR".to_string(), date.year().to_string()),
        ("YEAR_IN_TWO_DIGITS".to_string(), format!("{:02}", date.year().rem_euclid(100))),
        (
            "DAY".to_string(),
            if has_day { date.day().to_string() } else { String::new() },
        ),
    ]);

    collapse_spaces(&substitute_placeholders(template, &values))
}

pub fn format_date_range(
    start: &str,
    end: &str,
    locale: &LocaleConfig,
    single_date_template: &str,
    date_range_template: &str,
) -> String {
    let values = BTreeMap::from([
        (
            "START_DATE".to_string(),
            format_single_date(start, locale, single_date_template),
        ),
        (
            "END_DATE".to_string(),
            format_single_date(end, locale, single_date_template),
        ),
    ]);

    substitute_placeholders(date_range_template, &values)
}

/// Duration between two dates, e.g. "2 years 3 months". `present` means `current_date`.
pub fn compute_time_span_string(
    start: &str,
    end: &str,
    locale: &LocaleConfig,
    current_date: NaiveDate,
    template: &str,
) -> Result<String> {
    let resolve = |raw: &str| -> Result<CvDate> {
        if is_present(raw) {
            return Ok(CvDate::Day(current_date));
        }
        CvDate::parse(raw).ok_or_else(|| eyre!("cannot compute a time span from date '{}'", raw))
    };

    let start = resolve(start)?;
    let end = resolve(end)?;

    let (years, months) = match (start, end) {
        (CvDate::Year(from), CvDate::Year(to)) => ((to - from).max(1) as i64, 0),
        _ => {
            let from = start.first_day().ok_or_else(|| eyre!("invalid start date"))?;
            let to = end.first_day().ok_or_else(|| eyre!("invalid end date"))?;
            let days = (to - from).num_days().max(0);

            let mut years = days / 365;
            let mut months = ((days % 365) as f64 / 30.0).round() as i64;
            if months >= 12 {
                years += 1;
                months = 0;
            }
            if years == 0 && months == 0 {
                months = 1;
            }
            (years, months)
        }
    };

    let unit = |n: i64, singular: &str, plural: &str| {
        if n == 1 { singular.to_string() } else { plural.to_string() }
    };
    let count = |n: i64| if n == 0 { String::new() } else { n.to_string() };

    let values = BTreeMap::from([
        ("HOW_MANY_YEARS".to_string(), count(years)),
        (
            "YEARS".to_string(),
            if years == 0 { String::new() } else { unit(years, &locale.year, &locale.years) },
        ),
        ("HOW_MANY_MONTHS".to_string(), count(months)),
        (
            "MONTHS".to_string(),
            if months == 0 { String::new() } else { unit(months, &locale.month, &locale.months) },
        ),
    ]);

    Ok(collapse_spaces(&substitute_placeholders(template, &values)))
}

fn collapse_spaces(text: &str) -> String {
    text.split(' ')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
