pub mod bibtex;
pub mod cv;
pub mod models;
pub mod render;
pub mod scraper;
pub mod utils;
