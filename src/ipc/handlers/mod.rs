pub mod content;
pub mod core;
pub mod records;
pub mod statistics;
