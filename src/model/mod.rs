pub mod cache;
pub mod records;
