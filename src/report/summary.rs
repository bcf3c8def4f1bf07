use std::error::Error;
use std::fs;
use std::path::Path;

use log::info;
use rust_decimal::Decimal;
use tabled::{builder::Builder, settings::Style};

use crate::db::{
    carbon_intensity_archive::RegionIntensityAverage,
    electricity_costs_archive::CostIntensityAverage,
};
use crate::elec::{dno::DnoRegion, fuel::Fuel};

pub const INTENSITY_CSV: &str = "avg_intensity_dnoregions.csv";

/// Write the average carbon intensity of each DNO region, ordered by DNO id.
/// Regions without data are not written.  The `ID` column matches the
/// feature property of the DNO region shapefile.
pub fn write_intensity_csv(
    path: &Path,
    averages: &[RegionIntensityAverage],
) -> Result<usize, Box<dyn Error>> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["ID", "dno_region", "average_carbon_intensity"])?;
    let mut n = 0;
    for region in DnoRegion::ALL {
        if let Some(avg) = averages.iter().find(|e| e.region == region.name()) {
            wtr.write_record([
                region.dno_id().to_string(),
                region.name().to_string(),
                avg.intensity.to_string(),
            ])?;
            n += 1;
        }
    }
    wtr.flush()?;
    info!("wrote {} regions to {}", n, path.display());
    Ok(n)
}

pub fn cost_intensity_table(data: &[CostIntensityAverage]) -> tabled::Table {
    let mut builder = Builder::new();
    builder.push_record(vec!["Half Hour", "Carbon Intensity", "Price (p/kWh)"]);
    for e in data {
        builder.push_record(vec![
            e.half_hour_start.strftime("%H:%M").to_string(),
            e.intensity.to_string(),
            e.price.to_string(),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::empty());
    table
}

pub fn region_intensity_table(data: &[RegionIntensityAverage]) -> tabled::Table {
    let mut builder = Builder::new();
    builder.push_record(vec!["Region", "Carbon Intensity"]);
    for e in data {
        builder.push_record(vec![e.region.clone(), e.intensity.to_string()]);
    }
    let mut table = builder.build();
    table.with(Style::empty());
    table
}

pub fn generation_mix_table(mix: &[(Fuel, Decimal)]) -> tabled::Table {
    let mut builder = Builder::new();
    builder.push_record(vec!["Fuel", "Share (%)"]);
    for (fuel, share) in mix {
        builder.push_record(vec![fuel.label().to_string(), share.to_string()]);
    }
    let mut table = builder.build();
    table.with(Style::empty());
    table
}
