pub mod date;
pub mod templater;
