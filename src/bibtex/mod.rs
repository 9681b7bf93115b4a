pub mod matching;
pub mod parser;
pub mod publications;
