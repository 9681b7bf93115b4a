pub mod citations;
pub mod document;
pub mod stats;
