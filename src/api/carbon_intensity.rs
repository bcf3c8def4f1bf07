// Regional carbon intensity API, see https://carbon-intensity.github.io/api-definitions/
//
// GET {base}/regional/intensity/{from}/{to}/regionid/{regionid}
//
// Region ids 1-14 are the DNO regions, 15 is England, 16 Scotland, 17 Wales.
// The response contains one entry for each half hour:
// {"data": {"regionid": 13, "shortname": "London", "data": [
//     {"from": "2024-04-21T00:30Z", "to": "2024-04-21T01:00Z",
//      "intensity": {"forecast": 144, "index": "moderate"},
//      "generationmix": [{"fuel": "gas", "perc": 35.2}, ...]}, ...]}}

use std::error::Error;

use jiff::civil::{Date, DateTime};
use log::warn;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::Value;

use crate::api::lib_http::{self, FetchError};
use crate::db::carbon_intensity_archive::{GenerationMixRecord, IntensityRecord};
use crate::elec::dno::DnoRegion;
use crate::elec::fuel::{Fuel, GenerationMix};

pub const DEFAULT_BASE_URL: &str = "https://api.carbonintensity.org.uk";

/// How far the sum of the fuel percentages of one interval can be from 100.
pub const MIX_TOTAL_TOLERANCE: Decimal = dec!(1);

#[derive(Debug, Clone, PartialEq)]
pub struct CarbonIntensityApi {
    pub base_url: String,
}

impl Default for CarbonIntensityApi {
    fn default() -> Self {
        CarbonIntensityApi {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl CarbonIntensityApi {
    /// The url for the half hours between `start` 00:30 and the end of the `end` day.
    pub fn url(&self, start: Date, end: Date, region_id: u8) -> Result<String, FetchError> {
        if !(1..=17).contains(&region_id) {
            return Err(FetchError::Request(format!(
                "region id {} not in 1..=17",
                region_id
            )));
        }
        if end < start {
            return Err(FetchError::Request(format!(
                "end date {} is before start date {}",
                end, start
            )));
        }
        Ok(format!(
            "{}/regional/intensity/{}T00:30Z/{}T24:00Z/regionid/{}",
            self.base_url.trim_end_matches('/'),
            start,
            end,
            region_id
        ))
    }

    pub fn get_json(&self, start: Date, end: Date, region_id: u8) -> Result<Value, FetchError> {
        lib_http::get_json(&self.url(start, end, region_id)?)
    }
}

#[derive(Debug, Deserialize)]
struct IntensityInterval {
    from: String,
    intensity: Forecast,
}

#[derive(Debug, Deserialize)]
struct Forecast {
    forecast: i32,
}

#[derive(Debug, Deserialize)]
struct MixInterval {
    from: String,
    generationmix: Vec<MixEntry>,
}

#[derive(Debug, Deserialize)]
struct MixEntry {
    fuel: String,
    perc: Decimal,
}

fn intervals(body: &Value) -> &[Value] {
    body["data"]["data"]
        .as_array()
        .map(|xs| xs.as_slice())
        .unwrap_or(&[])
}

/// Use the canonical DNO name if the region id is a DNO region, so the rows
/// join with the price data.  Otherwise use the short name from the response.
fn region_name(body: &Value) -> Option<String> {
    let data = &body["data"];
    data["regionid"]
        .as_u64()
        .and_then(|id| u8::try_from(id).ok())
        .and_then(DnoRegion::from_carbon_region_id)
        .map(|r| r.name().to_string())
        .or_else(|| data["shortname"].as_str().map(|s| s.to_string()))
}

/// Parse the `from` field, e.g. "2024-04-21T00:30Z".
fn parse_from(from: &str) -> Result<DateTime, jiff::Error> {
    DateTime::strptime("%Y-%m-%dT%H:%MZ", from)
}

fn intensity_record(value: &Value, region: &str) -> Result<IntensityRecord, Box<dyn Error>> {
    let interval: IntensityInterval = serde_json::from_value(value.clone())?;
    let start = parse_from(&interval.from)?;
    Ok(IntensityRecord {
        region: region.to_string(),
        date: start.date(),
        half_hour_start: start.time(),
        forecast_intensity: interval.intensity.forecast,
    })
}

fn generation_mix_record(
    value: &Value,
    region: &str,
) -> Result<GenerationMixRecord, Box<dyn Error>> {
    let interval: MixInterval = serde_json::from_value(value.clone())?;
    let start = parse_from(&interval.from)?;
    if let Some(e) = interval
        .generationmix
        .iter()
        .find(|e| e.perc < Decimal::ZERO || e.perc > dec!(100))
    {
        return Err(format!("{} percentage {} not in [0, 100]", e.fuel, e.perc).into());
    }
    let entries = interval
        .generationmix
        .into_iter()
        .filter_map(|e| e.fuel.parse::<Fuel>().ok().map(|fuel| (fuel, e.perc)));
    let mix = GenerationMix::from_entries(entries)
        .ok_or_else(|| format!("incomplete generation mix for {}", interval.from))?;
    let total = mix.total();
    if (total - dec!(100)).abs() > MIX_TOTAL_TOLERANCE {
        return Err(format!("generation mix adds up to {}", total).into());
    }
    Ok(GenerationMixRecord {
        region: region.to_string(),
        date: start.date(),
        half_hour_start: start.time(),
        mix,
    })
}

/// Flatten the response into one record per half hour.  Malformed intervals
/// are logged and skipped.
pub fn intensity_records(body: &Value) -> Vec<IntensityRecord> {
    let Some(region) = region_name(body) else {
        warn!("no region in carbon intensity response, skipping it");
        return vec![];
    };
    intervals(body)
        .iter()
        .filter_map(|v| match intensity_record(v, &region) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("skipping malformed interval {}: {}", v, e);
                None
            }
        })
        .collect()
}

/// Flatten the generation mix of the response into one record per half hour.
/// Intervals with a missing fuel, a percentage outside [0, 100] or a total
/// too far from 100 are logged and skipped.
pub fn generation_mix_records(body: &Value) -> Vec<GenerationMixRecord> {
    let Some(region) = region_name(body) else {
        warn!("no region in carbon intensity response, skipping it");
        return vec![];
    };
    intervals(body)
        .iter()
        .filter_map(|v| match generation_mix_record(v, &region) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("skipping malformed interval {}: {}", v, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use jiff::civil::{date, time};
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    fn response() -> Value {
        json!({
            "data": {
                "regionid": 13,
                "dnoregion": "UKPN London",
                "shortname": "London",
                "data": [
                    {
                        "from": "2024-04-21T00:30Z",
                        "to": "2024-04-21T01:00Z",
                        "intensity": {"forecast": 144, "index": "moderate"},
                        "generationmix": [
                            {"fuel": "biomass", "perc": 6.2},
                            {"fuel": "coal", "perc": 0},
                            {"fuel": "imports", "perc": 21.4},
                            {"fuel": "gas", "perc": 18.3},
                            {"fuel": "nuclear", "perc": 15.1},
                            {"fuel": "other", "perc": 0},
                            {"fuel": "hydro", "perc": 0.5},
                            {"fuel": "solar", "perc": 0},
                            {"fuel": "wind", "perc": 38.5}
                        ]
                    },
                    {
                        "from": "2024-04-21T01:00Z",
                        "to": "2024-04-21T01:30Z",
                        "intensity": {"forecast": null, "index": "moderate"},
                        "generationmix": [{"fuel": "gas", "perc": 100}]
                    },
                    {
                        "from": "yesterday",
                        "intensity": {"forecast": 150},
                        "generationmix": []
                    },
                    {
                        "from": "2024-04-21T02:00Z",
                        "to": "2024-04-21T02:30Z",
                        "intensity": {"forecast": 131, "index": "moderate"},
                        "generationmix": [
                            {"fuel": "biomass", "perc": 5.8},
                            {"fuel": "coal", "perc": 0.1},
                            {"fuel": "imports", "perc": 22},
                            {"fuel": "gas", "perc": 16.6},
                            {"fuel": "nuclear", "perc": 15.6},
                            {"fuel": "other", "perc": 0},
                            {"fuel": "hydro", "perc": 0.6},
                            {"fuel": "solar", "perc": 0},
                            {"fuel": "wind", "perc": 39.3},
                            {"fuel": "geothermal", "perc": 0}
                        ]
                    }
                ]
            }
        })
    }

    #[test]
    fn url() {
        let api = CarbonIntensityApi::default();
        assert_eq!(
            api.url(date(2024, 4, 21), date(2024, 4, 27), 13).unwrap(),
            "https://api.carbonintensity.org.uk/regional/intensity/2024-04-21T00:30Z/2024-04-27T24:00Z/regionid/13"
        );
        let api = CarbonIntensityApi {
            base_url: "http://localhost:8080/".to_string(),
        };
        assert_eq!(
            api.url(date(2024, 4, 21), date(2024, 4, 21), 17).unwrap(),
            "http://localhost:8080/regional/intensity/2024-04-21T00:30Z/2024-04-21T24:00Z/regionid/17"
        );
    }

    #[test]
    fn url_invalid() {
        let api = CarbonIntensityApi::default();
        assert!(matches!(
            api.url(date(2024, 4, 21), date(2024, 4, 21), 0),
            Err(FetchError::Request(_))
        ));
        assert!(matches!(
            api.url(date(2024, 4, 21), date(2024, 4, 21), 18),
            Err(FetchError::Request(_))
        ));
        assert!(api.url(date(2024, 4, 21), date(2024, 4, 20), 1).is_err());
    }

    #[test]
    fn parse_intensity() {
        let records = intensity_records(&response());
        assert_eq!(
            records,
            vec![
                IntensityRecord {
                    region: "London".to_string(),
                    date: date(2024, 4, 21),
                    half_hour_start: time(0, 30, 0, 0),
                    forecast_intensity: 144,
                },
                IntensityRecord {
                    region: "London".to_string(),
                    date: date(2024, 4, 21),
                    half_hour_start: time(2, 0, 0, 0),
                    forecast_intensity: 131,
                },
            ]
        );
        // same input, same keys
        assert_eq!(intensity_records(&response()), records);
    }

    #[test]
    fn parse_generation_mix() {
        let records = generation_mix_records(&response());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].half_hour_start, time(0, 30, 0, 0));
        assert_eq!(records[0].mix.get(Fuel::Wind), dec!(38.5));
        assert_eq!(records[1].mix.get(Fuel::Coal), dec!(0.1));
        for record in &records {
            let total = record.mix.total();
            assert!((total - dec!(100)).abs() <= dec!(0.5), "total {}", total);
        }
    }

    #[test]
    fn skip_bad_generation_mix() {
        let mut body = response();
        // out of range
        body["data"]["data"][0]["generationmix"][3]["perc"] = json!(1000);
        let records = generation_mix_records(&body);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].half_hour_start, time(2, 0, 0, 0));

        // adds up to 10
        let mut body = response();
        body["data"]["data"][0]["generationmix"] = json!([
            {"fuel": "biomass", "perc": 1}, {"fuel": "coal", "perc": 1},
            {"fuel": "imports", "perc": 1}, {"fuel": "gas", "perc": 1},
            {"fuel": "nuclear", "perc": 1}, {"fuel": "other", "perc": 1},
            {"fuel": "hydro", "perc": 1}, {"fuel": "solar", "perc": 1},
            {"fuel": "wind", "perc": 2}
        ]);
        let records = generation_mix_records(&body);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].mix.total(), dec!(100.0));

        // negative
        body["data"]["data"][3]["generationmix"][1]["perc"] = json!(-0.1);
        assert!(generation_mix_records(&body).is_empty());
        // the intensity of the same intervals is still good
        assert_eq!(intensity_records(&body).len(), 2);
    }

    #[test]
    fn region_from_shortname() {
        let mut body = response();
        body["data"]["regionid"] = json!(16);
        body["data"]["shortname"] = json!("Scotland");
        let records = intensity_records(&body);
        assert!(records.iter().all(|r| r.region == "Scotland"));

        body["data"]["regionid"] = json!(6);
        body["data"]["shortname"] = json!("N Wales & Mersey");
        let records = intensity_records(&body);
        assert!(records.iter().all(|r| r.region == "North Wales & Merseyside"));
    }

    #[test]
    fn empty_and_unexpected_bodies() {
        let empty = json!({"data": {"regionid": 13, "shortname": "London", "data": []}});
        assert!(intensity_records(&empty).is_empty());
        assert!(generation_mix_records(&empty).is_empty());
        assert!(intensity_records(&json!({"error": {"code": "400"}})).is_empty());
        assert!(intensity_records(&json!({"data": {"data": [{"from": "2024-04-21T00:30Z"}]}})).is_empty());
    }

    #[ignore]
    #[test]
    fn download_one_day() -> Result<(), Box<dyn Error>> {
        let api = CarbonIntensityApi::default();
        let body = api.get_json(date(2024, 4, 21), date(2024, 4, 21), 13)?;
        let records = intensity_records(&body);
        assert!(!records.is_empty() && records.len() <= 48);
        Ok(())
    }
}
