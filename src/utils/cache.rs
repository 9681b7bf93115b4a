use std::fs::{self, OpenOptions};
use std::path::Path;

use chrono::{DateTime, Local, NaiveDateTime};
use eyre::{Result, WrapErr};
use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Current local time in the format the caches are written with
pub fn now_timestamp() -> String {
    format_timestamp(Local::now().naive_local())
}

pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a naive ISO-8601 timestamp, or an RFC 3339 one converted to local time
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(naive) = raw.parse::<NaiveDateTime>() {
        return Some(naive);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
        return Some(naive);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Local).naive_local())
}

/// A snapshot is fresh while fewer than `expiry_days` whole days have passed
pub fn is_fresh(last_updated: Option<&str>, expiry_days: i64, now: NaiveDateTime) -> bool {
    let Some(last_updated) = last_updated.and_then(parse_timestamp) else {
        return false;
    };

    (now - last_updated).num_days() < expiry_days
}

/// Loads a JSON snapshot. A missing or corrupted file yields the default value.
pub fn load_json_cache<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        debug!("no cache at {}, starting fresh", path.display());
        return T::default();
    }

    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(cache) => {
                debug!("loaded cache from {}", path.display());
                cache
            }
            Err(e) => {
                warn!("corrupted cache file {} ({}), starting fresh", path.display(), e);
                T::default()
            }
        },
        Err(e) => {
            warn!("failed to read cache {} ({}), starting fresh", path.display(), e);
            T::default()
        }
    }
}

/// Loads a JSON snapshot that must exist
pub fn read_json_cache<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("cache file not found: {}", path.display()))?;

    serde_json::from_str(&content)
        .wrap_err_with(|| format!("failed to parse cache file {}", path.display()))
}

pub fn save_json_cache<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content)
        .wrap_err_with(|| format!("failed to write cache {}", path.display()))?;
    debug!("saved cache to {}", path.display());

    Ok(())
}

/// Appends one row to a CSV history file. The header goes in only when the file is created.
pub fn append_history(path: &Path, header: &[String], row: &[String]) -> Result<()> {
    let file_exists = path.exists();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .wrap_err_with(|| format!("failed to open history file {}", path.display()))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    if !file_exists {
        writer.write_record(header)?;
    }
    writer.write_record(row)?;
    writer.flush()?;

    Ok(())
}
