pub mod carbon_intensity_archive;
pub mod electricity_costs_archive;
pub mod lib_store;
pub mod prod_db;
