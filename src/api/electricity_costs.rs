// Half-hourly electricity prices by DNO region and voltage level.
//
// GET {base}/prices?dno=12&voltage=LV&start=09-04-2024&end=10-04-2024
//
// {"data": {"dnoRegion": "London", "voltageLevel": "LV", "data": [
//     {"Overall": 21.53, "unixTimestamp": 1712620800, "Timestamp": "00:00 09-04-2024"}, ...]}}
// Prices are in p/kWh.

use std::error::Error;
use std::fmt;
use std::str::FromStr;

use jiff::civil::{Date, DateTime};
use log::warn;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::lib_http::{self, FetchError};
use crate::db::electricity_costs_archive::PriceRecord;
use crate::elec::{dno::DnoRegion, ParseError};

pub const DEFAULT_BASE_URL: &str =
    "https://odegdcpnma.execute-api.eu-west-2.amazonaws.com/development";

/// Prices are stored as `DECIMAL(12,6)`.  Negative prices are allowed.
const PRICE_LIMIT: Decimal = dec!(1000000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Voltage {
    /// high voltage
    Hv,
    /// low voltage
    Lv,
    /// low voltage, connected at the substation
    LvSub,
}

impl fmt::Display for Voltage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Voltage::Hv => write!(f, "HV"),
            Voltage::Lv => write!(f, "LV"),
            Voltage::LvSub => write!(f, "LV-Sub"),
        }
    }
}

impl FromStr for Voltage {
    type Err = ParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HV" => Ok(Voltage::Hv),
            "LV" => Ok(Voltage::Lv),
            "LV-SUB" | "LVSUB" => Ok(Voltage::LvSub),
            _ => Err(ParseError(format!("Failed parsing {} as a voltage level", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElectricityCostsApi {
    pub base_url: String,
}

impl Default for ElectricityCostsApi {
    fn default() -> Self {
        ElectricityCostsApi {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl ElectricityCostsApi {
    pub fn url(
        &self,
        start: Date,
        end: Date,
        region: DnoRegion,
        voltage: Voltage,
    ) -> Result<String, FetchError> {
        if end < start {
            return Err(FetchError::Request(format!(
                "end date {} is before start date {}",
                end, start
            )));
        }
        Ok(format!(
            "{}/prices?dno={}&voltage={}&start={}&end={}",
            self.base_url.trim_end_matches('/'),
            region.dno_id(),
            voltage,
            start.strftime("%d-%m-%Y"),
            end.strftime("%d-%m-%Y"),
        ))
    }

    pub fn get_json(
        &self,
        start: Date,
        end: Date,
        region: DnoRegion,
        voltage: Voltage,
    ) -> Result<Value, FetchError> {
        lib_http::get_json(&self.url(start, end, region, voltage)?)
    }
}

#[derive(Debug, Deserialize)]
struct PriceInterval {
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "Overall")]
    overall: Decimal,
}

fn price_record(
    value: &Value,
    region: DnoRegion,
    voltage: Voltage,
) -> Result<PriceRecord, Box<dyn Error>> {
    let interval: PriceInterval = serde_json::from_value(value.clone())?;
    let start = DateTime::strptime("%H:%M %d-%m-%Y", interval.timestamp.trim())?;
    if interval.overall.abs() >= PRICE_LIMIT {
        return Err(format!("price {} out of range", interval.overall).into());
    }
    Ok(PriceRecord {
        region: region.name().to_string(),
        date: start.date(),
        half_hour_start: start.time(),
        voltage,
        price_per_kwh: interval.overall,
    })
}

/// Flatten the response into one record per half hour.  The region is the
/// one that was requested.  Malformed intervals are logged and skipped.
pub fn price_records(body: &Value, region: DnoRegion, voltage: Voltage) -> Vec<PriceRecord> {
    let Some(intervals) = body["data"]["data"].as_array() else {
        return vec![];
    };
    intervals
        .iter()
        .filter_map(|v| match price_record(v, region, voltage) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("skipping malformed price interval {}: {}", v, e);
                None
            }
        })
        .collect()
}
