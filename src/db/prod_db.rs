use std::env;

use crate::api::{
    carbon_intensity::{self, CarbonIntensityApi},
    electricity_costs::{self, ElectricityCostsApi},
};
use crate::db::{
    carbon_intensity_archive::CarbonIntensityArchive,
    electricity_costs_archive::ElectricityCostsArchive,
};

/// Both archives live in the same DuckDB file so that prices and carbon
/// intensity can be joined.
pub struct ProdDb {}

impl ProdDb {
    /// `UKGRID_DUCKDB_PATH`, defaults to `ukgrid.duckdb`
    pub fn duckdb_path() -> String {
        env::var("UKGRID_DUCKDB_PATH").unwrap_or_else(|_| "ukgrid.duckdb".to_string())
    }

    /// `UKGRID_REPORT_DIR`, defaults to `reports`
    pub fn report_dir() -> String {
        env::var("UKGRID_REPORT_DIR").unwrap_or_else(|_| "reports".to_string())
    }

    pub fn carbon_intensity() -> CarbonIntensityArchive {
        CarbonIntensityArchive {
            duckdb_path: ProdDb::duckdb_path(),
            api: CarbonIntensityApi {
                base_url: env::var("CARBON_INTENSITY_API")
                    .unwrap_or_else(|_| carbon_intensity::DEFAULT_BASE_URL.to_string()),
            },
        }
    }

    pub fn electricity_costs() -> ElectricityCostsArchive {
        ElectricityCostsArchive {
            duckdb_path: ProdDb::duckdb_path(),
            api: ElectricityCostsApi {
                base_url: env::var("ELECTRICITY_COSTS_API")
                    .unwrap_or_else(|_| electricity_costs::DEFAULT_BASE_URL.to_string()),
            },
        }
    }
}
