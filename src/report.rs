pub mod charts;
pub mod summary;
