pub mod api;
pub mod db;
pub mod elec;
pub mod report;
