// Half-hourly regional carbon intensity forecasts and generation mix.
// https://carbon-intensity.github.io/api-definitions/

use duckdb::{types::Value, Connection};
use jiff::civil::{Date, Time};
use log::info;
use rust_decimal::Decimal;
use serde::Serialize;
use std::error::Error;

use crate::api::carbon_intensity::{self, CarbonIntensityApi};
use crate::db::lib_store::{self, mean_at, mean_sql, RecordKey, StoredRecord};
use crate::elec::fuel::{Fuel, GenerationMix};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntensityRecord {
    pub region: String,
    pub date: Date,
    pub half_hour_start: Time,
    /// gCO2/kWh
    pub forecast_intensity: i32,
}

impl StoredRecord for IntensityRecord {
    const TABLE: &'static str = "carbon_intensity";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[("forecast_intensity", "INTEGER")];

    fn key(&self) -> RecordKey {
        RecordKey::new(self.half_hour_start, self.date, &self.region)
    }

    fn values(&self) -> Vec<Value> {
        vec![Value::Int(self.forecast_intensity)]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationMixRecord {
    pub region: String,
    pub date: Date,
    pub half_hour_start: Time,
    pub mix: GenerationMix,
}

impl StoredRecord for GenerationMixRecord {
    const TABLE: &'static str = "generation_mix";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("gas", "DECIMAL(5,2)"),
        ("coal", "DECIMAL(5,2)"),
        ("biomass", "DECIMAL(5,2)"),
        ("nuclear", "DECIMAL(5,2)"),
        ("hydro", "DECIMAL(5,2)"),
        ("wind", "DECIMAL(5,2)"),
        ("solar", "DECIMAL(5,2)"),
        ("imports", "DECIMAL(5,2)"),
        ("other", "DECIMAL(5,2)"),
    ];

    fn key(&self) -> RecordKey {
        RecordKey::new(self.half_hour_start, self.date, &self.region)
    }

    fn values(&self) -> Vec<Value> {
        Fuel::ALL
            .iter()
            .map(|fuel| Value::Text(self.mix.get(*fuel).to_string()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntensityAverage {
    pub half_hour_start: Time,
    pub intensity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionIntensityAverage {
    pub region: String,
    pub intensity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationMixAverage {
    pub half_hour_start: Time,
    pub mix: Vec<(Fuel, Decimal)>,
}

#[derive(Clone)]
pub struct CarbonIntensityArchive {
    pub duckdb_path: String,
    pub api: CarbonIntensityApi,
}

impl CarbonIntensityArchive {
    pub fn setup(&self, conn: &Connection) -> Result<(), duckdb::Error> {
        conn.execute_batch(
            r"
    CREATE TABLE IF NOT EXISTS carbon_intensity (
        region VARCHAR NOT NULL,
        date DATE NOT NULL,
        half_hour_start TIME NOT NULL,
        forecast_intensity INTEGER NOT NULL,
        PRIMARY KEY (half_hour_start, date, region)
    );
    CREATE TABLE IF NOT EXISTS generation_mix (
        region VARCHAR NOT NULL,
        date DATE NOT NULL,
        half_hour_start TIME NOT NULL,
        gas DECIMAL(5,2) NOT NULL,
        coal DECIMAL(5,2) NOT NULL,
        biomass DECIMAL(5,2) NOT NULL,
        nuclear DECIMAL(5,2) NOT NULL,
        hydro DECIMAL(5,2) NOT NULL,
        wind DECIMAL(5,2) NOT NULL,
        solar DECIMAL(5,2) NOT NULL,
        imports DECIMAL(5,2) NOT NULL,
        other DECIMAL(5,2) NOT NULL,
        PRIMARY KEY (half_hour_start, date, region)
    );
        ",
        )?;
        Ok(())
    }

    /// Download the forecasts for the days [start, end] of one region and
    /// insert the new intervals in both tables.  Return the number of rows
    /// inserted in (carbon_intensity, generation_mix).
    pub fn update_duckdb(
        &self,
        conn: &mut Connection,
        start: Date,
        end: Date,
        region_id: u8,
        limit: Option<usize>,
    ) -> Result<(usize, usize), Box<dyn Error>> {
        info!(
            "updating carbon intensity for region {} from {} to {} ...",
            region_id, start, end
        );
        let body = self.api.get_json(start, end, region_id)?;
        let intensity = carbon_intensity::intensity_records(&body);
        let mix = carbon_intensity::generation_mix_records(&body);
        self.setup(conn)?;
        let n1 = self.upsert_intensity(conn, &intensity, limit)?;
        let n2 = self.upsert_generation_mix(conn, &mix, limit)?;
        info!("done");
        Ok((n1, n2))
    }

    pub fn upsert_intensity(
        &self,
        conn: &mut Connection,
        records: &[IntensityRecord],
        limit: Option<usize>,
    ) -> Result<usize, duckdb::Error> {
        match limit {
            Some(n) => lib_store::upsert_with_limit(conn, records, n),
            None => lib_store::upsert(conn, records),
        }
    }

    pub fn upsert_generation_mix(
        &self,
        conn: &mut Connection,
        records: &[GenerationMixRecord],
        limit: Option<usize>,
    ) -> Result<usize, duckdb::Error> {
        match limit {
            Some(n) => lib_store::upsert_with_limit(conn, records, n),
            None => lib_store::upsert(conn, records),
        }
    }

    /// Average forecast intensity for each half hour of the day.
    /// If `region` is `None`, use all regions.
    pub fn average_intensity_by_time(
        &self,
        conn: &Connection,
        region: Option<&str>,
    ) -> Result<Vec<IntensityAverage>, duckdb::Error> {
        let res = lib_store::average_by_time_of_day(
            conn,
            IntensityRecord::TABLE,
            &["forecast_intensity"],
            region,
        )?;
        Ok(res
            .into_iter()
            .map(|(half_hour_start, vs)| IntensityAverage {
                half_hour_start,
                intensity: vs[0],
            })
            .collect())
    }

    /// Average forecast intensity over all the stored intervals of each region.
    pub fn average_intensity_by_region(
        &self,
        conn: &Connection,
    ) -> Result<Vec<RegionIntensityAverage>, duckdb::Error> {
        let query = format!(
            r#"
SELECT region, {}
FROM carbon_intensity
GROUP BY region
ORDER BY region;
        "#,
            mean_sql("forecast_intensity")
        );
        let mut stmt = conn.prepare(&query)?;
        let res = stmt
            .query_map([], |row| Ok((row.get::<usize, String>(0)?, mean_at(row, 1))))?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(res
            .into_iter()
            .filter_map(|(region, v)| {
                v.map(|intensity| RegionIntensityAverage { region, intensity })
            })
            .collect())
    }

    /// Average percentage of each fuel over all the stored intervals.
    /// Empty if there is no data.
    pub fn average_generation_mix(
        &self,
        conn: &Connection,
    ) -> Result<Vec<(Fuel, Decimal)>, duckdb::Error> {
        let means: Vec<String> = Fuel::ALL
            .iter()
            .map(|fuel| mean_sql(&fuel.to_string()))
            .collect();
        let query = format!("SELECT {} FROM generation_mix;", means.join(", "));
        let values = conn.query_row(&query, [], |row| {
            Ok((0..Fuel::ALL.len())
                .map(|i| mean_at(row, 2 * i))
                .collect::<Option<Vec<Decimal>>>())
        })?;
        Ok(match values {
            Some(vs) => Fuel::ALL.into_iter().zip(vs).collect(),
            None => vec![],
        })
    }

    /// Average percentage of each fuel for each half hour of the day.
    pub fn average_generation_mix_by_time(
        &self,
        conn: &Connection,
        region: Option<&str>,
    ) -> Result<Vec<GenerationMixAverage>, duckdb::Error> {
        let columns: Vec<String> = Fuel::ALL.iter().map(|fuel| fuel.to_string()).collect();
        let columns: Vec<&str> = columns.iter().map(|c| c.as_str()).collect();
        let res = lib_store::average_by_time_of_day(
            conn,
            GenerationMixRecord::TABLE,
            &columns,
            region,
        )?;
        Ok(res
            .into_iter()
            .map(|(half_hour_start, vs)| GenerationMixAverage {
                half_hour_start,
                mix: Fuel::ALL.into_iter().zip(vs).collect(),
            })
            .collect())
    }

    pub fn count_intensity(&self, conn: &Connection) -> Result<usize, duckdb::Error> {
        lib_store::count(conn, IntensityRecord::TABLE)
    }

    pub fn count_generation_mix(&self, conn: &Connection) -> Result<usize, duckdb::Error> {
        lib_store::count(conn, GenerationMixRecord::TABLE)
    }
}
