pub mod carbon_intensity;
pub mod electricity_costs;
pub mod lib_http;
