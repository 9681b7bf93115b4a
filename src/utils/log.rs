use env_logger::{Builder, Target};
use log::LevelFilter;

pub struct Logger;

impl Logger {
    /// Installs the colored logger on stderr, so generated YAML on stdout stays clean.
    /// `RUST_LOG` still overrides per-module levels.
    pub fn init(level: LevelFilter) {
        let mut builder: Builder = colog::default_builder();
        builder.filter_level(level);
        builder.target(Target::Stderr);
        builder.parse_default_env();
        builder.init();
    }
}
