use std::path::PathBuf;

use clap::{Args, ValueEnum};
use log::LevelFilter;

/// Flags shared by every binary of the toolkit.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    /// Sets the logger's verbosity level
    #[arg(short, long, value_name = "VERBOSITY", default_value_t = LevelFilter::Info)]
    pub verbosity: LevelFilter,
}

#[derive(Args, Debug, Clone)]
pub struct RefreshArgs {
    /// Refresh even if the cache is still fresh
    #[arg(long)]
    pub force_refresh: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}
