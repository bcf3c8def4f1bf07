use duckdb::{types::Value, Connection};
use jiff::civil::{Date, Time};
use log::info;
use rust_decimal::Decimal;
use serde::Serialize;
use std::error::Error;

use crate::api::electricity_costs::{self, ElectricityCostsApi, Voltage};
use crate::db::lib_store::{self, mean_at, time_at, RecordKey, StoredRecord};
use crate::elec::dno::DnoRegion;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRecord {
    pub region: String,
    pub date: Date,
    pub half_hour_start: Time,
    pub voltage: Voltage,
    /// p/kWh
    pub price_per_kwh: Decimal,
}

impl StoredRecord for PriceRecord {
    const TABLE: &'static str = "electricity_costs";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("voltage", "VARCHAR"),
        ("price_per_kwh", "DECIMAL(12,6)"),
    ];

    fn key(&self) -> RecordKey {
        RecordKey::new(self.half_hour_start, self.date, &self.region)
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.voltage.to_string()),
            Value::Text(self.price_per_kwh.to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceAverage {
    pub half_hour_start: Time,
    pub price: Decimal,
}

/// Averages over the half hours where both an intensity forecast and a
/// price exist for the region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostIntensityAverage {
    pub half_hour_start: Time,
    pub intensity: Decimal,
    pub price: Decimal,
}

#[derive(Clone)]
pub struct ElectricityCostsArchive {
    pub duckdb_path: String,
    pub api: ElectricityCostsApi,
}

impl ElectricityCostsArchive {
    pub fn setup(&self, conn: &Connection) -> Result<(), duckdb::Error> {
        conn.execute_batch(
            r"
    CREATE TABLE IF NOT EXISTS electricity_costs (
        region VARCHAR NOT NULL,
        date DATE NOT NULL,
        half_hour_start TIME NOT NULL,
        voltage VARCHAR NOT NULL,
        price_per_kwh DECIMAL(12,6) NOT NULL,
        PRIMARY KEY (half_hour_start, date, region)
    );
        ",
        )?;
        Ok(())
    }

    /// Download the prices for the days [start, end] of one region and insert
    /// the new half hours.  Return the number of rows inserted.
    pub fn update_duckdb(
        &self,
        conn: &mut Connection,
        start: Date,
        end: Date,
        region: DnoRegion,
        voltage: Voltage,
        limit: Option<usize>,
    ) -> Result<usize, Box<dyn Error>> {
        info!(
            "updating {} electricity costs for {} from {} to {} ...",
            voltage, region, start, end
        );
        let body = self.api.get_json(start, end, region, voltage)?;
        let records = electricity_costs::price_records(&body, region, voltage);
        self.setup(conn)?;
        let n = self.upsert(conn, &records, limit)?;
        info!("done");
        Ok(n)
    }

    pub fn upsert(
        &self,
        conn: &mut Connection,
        records: &[PriceRecord],
        limit: Option<usize>,
    ) -> Result<usize, duckdb::Error> {
        match limit {
            Some(n) => lib_store::upsert_with_limit(conn, records, n),
            None => lib_store::upsert(conn, records),
        }
    }

    /// Average price for each half hour of the day.
    /// If `region` is `None`, use all regions.
    pub fn average_price_by_time(
        &self,
        conn: &Connection,
        region: Option<&str>,
    ) -> Result<Vec<PriceAverage>, duckdb::Error> {
        let res = lib_store::average_by_time_of_day(
            conn,
            PriceRecord::TABLE,
            &["price_per_kwh"],
            region,
        )?;
        Ok(res
            .into_iter()
            .map(|(half_hour_start, vs)| PriceAverage {
                half_hour_start,
                price: vs[0],
            })
            .collect())
    }

    /// Join the prices with the carbon intensity table on the full key and
    /// average both for each half hour of the day.  The carbon intensity
    /// table needs to exist.
    pub fn average_cost_intensity_by_time(
        &self,
        conn: &Connection,
        region: &str,
    ) -> Result<Vec<CostIntensityAverage>, duckdb::Error> {
        let mut stmt = conn.prepare(
            r#"
SELECT
    CAST(c.half_hour_start AS VARCHAR),
    SUM(c.forecast_intensity)::DECIMAL(18,6),
    COUNT(c.forecast_intensity),
    SUM(p.price_per_kwh)::DECIMAL(18,6),
    COUNT(p.price_per_kwh)
FROM carbon_intensity c
JOIN electricity_costs p
    ON c.half_hour_start = p.half_hour_start
    AND c.date = p.date
    AND c.region = p.region
WHERE p.region = ?
GROUP BY c.half_hour_start
ORDER BY c.half_hour_start;
        "#,
        )?;
        let res = stmt
            .query_map([region], |row| {
                Ok((time_at(row, 0)?, mean_at(row, 1), mean_at(row, 3)))
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(res
            .into_iter()
            .filter_map(|(half_hour_start, intensity, price)| {
                Some(CostIntensityAverage {
                    half_hour_start,
                    intensity: intensity?,
                    price: price?,
                })
            })
            .collect())
    }

    pub fn count(&self, conn: &Connection) -> Result<usize, duckdb::Error> {
        lib_store::count(conn, PriceRecord::TABLE)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use jiff::civil::{date, time};
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};

    use super::*;
    use crate::api::carbon_intensity::CarbonIntensityApi;
    use crate::api::electricity_costs::price_records;
    use crate::db::carbon_intensity_archive::{CarbonIntensityArchive, IntensityRecord};

    fn archive() -> ElectricityCostsArchive {
        ElectricityCostsArchive {
            duckdb_path: ":memory:".to_string(),
            api: ElectricityCostsApi::default(),
        }
    }

    fn price(region: &str, day: i8, hour: i8, minute: i8, p: Decimal) -> PriceRecord {
        PriceRecord {
            region: region.to_string(),
            date: date(2024, 4, day),
            half_hour_start: time(hour, minute, 0, 0),
            voltage: Voltage::Hv,
            price_per_kwh: p,
        }
    }

    fn intensity(region: &str, day: i8, hour: i8, minute: i8, v: i32) -> IntensityRecord {
        IntensityRecord {
            region: region.to_string(),
            date: date(2024, 4, day),
            half_hour_start: time(hour, minute, 0, 0),
            forecast_intensity: v,
        }
    }

    fn one_day() -> Value {
        let data: Vec<Value> = (0..48)
            .map(|i| {
                json!({
                    "Overall": 20.0 + i as f64 / 4.0,
                    "Timestamp": format!("{:02}:{:02} 09-04-2024", i / 2, 30 * (i % 2)),
                })
            })
            .collect();
        json!({"data": {"dnoRegion": "London", "voltageLevel": "HV", "data": data}})
    }

    #[test]
    fn ingest_one_day_twice() -> Result<(), Box<dyn Error>> {
        let archive = archive();
        let mut conn = Connection::open_in_memory()?;
        archive.setup(&conn)?;
        let records = price_records(&one_day(), DnoRegion::London, Voltage::Hv);
        assert_eq!(records.len(), 48);
        assert_eq!(archive.upsert(&mut conn, &records, None)?, 48);
        assert_eq!(archive.upsert(&mut conn, &records, None)?, 0);
        assert_eq!(archive.count(&conn)?, 48);

        // another voltage level for the same half hours is a duplicate
        let lv = price_records(&one_day(), DnoRegion::London, Voltage::Lv);
        assert_eq!(archive.upsert(&mut conn, &lv, None)?, 0);
        Ok(())
    }

    #[test]
    fn average_price() -> Result<(), Box<dyn Error>> {
        let archive = archive();
        let mut conn = Connection::open_in_memory()?;
        archive.setup(&conn)?;
        let records = vec![
            price("London", 9, 0, 30, dec!(10.1)),
            price("London", 10, 0, 30, dec!(20.2)),
            price("Yorkshire", 10, 0, 30, dec!(30.3)),
            price("Yorkshire", 10, 1, 0, dec!(1.005)),
        ];
        archive.upsert(&mut conn, &records, None)?;

        let all = archive.average_price_by_time(&conn, None)?;
        assert_eq!(
            all,
            vec![
                PriceAverage {
                    half_hour_start: time(0, 30, 0, 0),
                    price: dec!(20.20),
                },
                PriceAverage {
                    half_hour_start: time(1, 0, 0, 0),
                    price: dec!(1.01),
                },
            ]
        );
        let london = archive.average_price_by_time(&conn, Some("London"))?;
        assert_eq!(london.len(), 1);
        assert_eq!(london[0].price, dec!(15.15));
        Ok(())
    }

    #[test]
    fn average_price_rounds_once() -> Result<(), Box<dyn Error>> {
        let archive = archive();
        let mut conn = Connection::open_in_memory()?;
        archive.setup(&conn)?;
        let records = vec![
            price("London", 9, 0, 30, dec!(1.004999)),
            price("London", 10, 0, 30, dec!(1.005)),
        ];
        archive.upsert(&mut conn, &records, None)?;
        // the mean is 1.0049995, not 1.005
        let avg = archive.average_price_by_time(&conn, None)?;
        assert_eq!(avg[0].price, dec!(1.00));
        Ok(())
    }

    #[test]
    fn cost_vs_intensity()-> Result<(), Box<dyn Error>> {
        let costs = archive();
        let carbon = CarbonIntensityArchive {
            duckdb_path: ":memory:".to_string(),
            api: CarbonIntensityApi::default(),
        };
        let mut conn = Connection::open_in_memory()?;
        costs.setup(&conn)?;
        carbon.setup(&conn)?;

        costs.upsert(
            &mut conn,
            &[
                price("London", 9, 0, 30, dec!(10)),
                price("London", 10, 0, 30, dec!(20)),
                price("London", 11, 0, 30, dec!(99)),
                price("Yorkshire", 9, 0, 30, dec!(50)),
            ],
            None,
        )?;
        carbon.upsert_intensity(
            &mut conn,
            &[
                intensity("London", 9, 0, 30, 100),
                intensity("London", 10, 0, 30, 201),
                intensity("London", 10, 1, 0, 300),
                intensity("Yorkshire", 9, 0, 30, 500),
            ],
            None,
        )?;

        let avg = costs.average_cost_intensity_by_time(&conn, "London")?;
        assert_eq!(
            avg,
            vec![CostIntensityAverage {
                half_hour_start: time(0, 30, 0, 0),
                intensity: dec!(150.50),
                price: dec!(15.00),
            }]
        );
        assert!(costs.average_cost_intensity_by_time(&conn, "Wales")?.is_empty());
        Ok(())
    }

    #[ignore]
    #[test]
    fn update_db() -> Result<(), Box<dyn Error>> {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Info)
            .is_test(true)
            .try_init();
        let archive = archive();
        let mut conn = Connection::open_in_memory()?;
        let n = archive.update_duckdb(
            &mut conn,
            date(2024, 4, 9),
            date(2024, 4, 10),
            DnoRegion::London,
            Voltage::Lv,
            Some(24),
        )?;
        assert!(n <= 24);
        Ok(())
    }
}
