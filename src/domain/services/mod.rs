pub mod aggregate;
pub mod analyzer;
pub mod dedup;
pub mod summary;
