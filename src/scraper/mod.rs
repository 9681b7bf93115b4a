pub mod github;
pub mod pypi;
pub mod scholar;
