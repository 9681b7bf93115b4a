pub mod entry;
pub mod github;
pub mod publication;
pub mod scholar;
