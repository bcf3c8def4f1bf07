// The 14 distribution network operator (DNO) license areas of Great Britain.
// The two upstream APIs number them differently: the carbon intensity API uses
// region ids 1-14 (15-17 are England, Scotland, Wales), the price API uses the
// DNO ids 10-23.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DnoRegion {
    EastEngland,
    EastMidlands,
    London,
    NorthWalesMerseyside,
    WestMidlands,
    NorthEastEngland,
    NorthWestEngland,
    NorthScotland,
    SouthScotland,
    SouthEastEngland,
    SouthEngland,
    SouthWales,
    SouthWestEngland,
    Yorkshire,
}

impl DnoRegion {
    /// All regions, ordered by DNO id.
    pub const ALL: [DnoRegion; 14] = [
        DnoRegion::EastEngland,
        DnoRegion::EastMidlands,
        DnoRegion::London,
        DnoRegion::NorthWalesMerseyside,
        DnoRegion::WestMidlands,
        DnoRegion::NorthEastEngland,
        DnoRegion::NorthWestEngland,
        DnoRegion::NorthScotland,
        DnoRegion::SouthScotland,
        DnoRegion::SouthEastEngland,
        DnoRegion::SouthEngland,
        DnoRegion::SouthWales,
        DnoRegion::SouthWestEngland,
        DnoRegion::Yorkshire,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DnoRegion::EastEngland => "East England",
            DnoRegion::EastMidlands => "East Midlands",
            DnoRegion::London => "London",
            DnoRegion::NorthWalesMerseyside => "North Wales & Merseyside",
            DnoRegion::WestMidlands => "West Midlands",
            DnoRegion::NorthEastEngland => "North East England",
            DnoRegion::NorthWestEngland => "North West England",
            DnoRegion::NorthScotland => "North Scotland",
            DnoRegion::SouthScotland => "South Scotland",
            DnoRegion::SouthEastEngland => "South East England",
            DnoRegion::SouthEngland => "South England",
            DnoRegion::SouthWales => "South Wales",
            DnoRegion::SouthWestEngland => "South West England",
            DnoRegion::Yorkshire => "Yorkshire",
        }
    }

    /// The id used by the price API and by the DNO license area GeoJSON.
    pub fn dno_id(&self) -> u8 {
        match self {
            DnoRegion::EastEngland => 10,
            DnoRegion::EastMidlands => 11,
            DnoRegion::London => 12,
            DnoRegion::NorthWalesMerseyside => 13,
            DnoRegion::WestMidlands => 14,
            DnoRegion::NorthEastEngland => 15,
            DnoRegion::NorthWestEngland => 16,
            DnoRegion::NorthScotland => 17,
            DnoRegion::SouthScotland => 18,
            DnoRegion::SouthEastEngland => 19,
            DnoRegion::SouthEngland => 20,
            DnoRegion::SouthWales => 21,
            DnoRegion::SouthWestEngland => 22,
            DnoRegion::Yorkshire => 23,
        }
    }

    /// The region id used by the carbon intensity API.
    pub fn carbon_region_id(&self) -> u8 {
        match self {
            DnoRegion::NorthScotland => 1,
            DnoRegion::SouthScotland => 2,
            DnoRegion::NorthWestEngland => 3,
            DnoRegion::NorthEastEngland => 4,
            DnoRegion::Yorkshire => 5,
            DnoRegion::NorthWalesMerseyside => 6,
            DnoRegion::SouthWales => 7,
            DnoRegion::WestMidlands => 8,
            DnoRegion::EastMidlands => 9,
            DnoRegion::EastEngland => 10,
            DnoRegion::SouthWestEngland => 11,
            DnoRegion::SouthEngland => 12,
            DnoRegion::London => 13,
            DnoRegion::SouthEastEngland => 14,
        }
    }

    pub fn from_dno_id(id: u8) -> Option<DnoRegion> {
        DnoRegion::ALL.into_iter().find(|r| r.dno_id() == id)
    }

    /// Return `None` for the nation level ids 15, 16, 17 and anything out of range.
    pub fn from_carbon_region_id(id: u8) -> Option<DnoRegion> {
        DnoRegion::ALL.into_iter().find(|r| r.carbon_region_id() == id)
    }
}

impl fmt::Display for DnoRegion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DnoRegion {
    type Err = ParseError;

    /// Parse a region from its name (case insensitive) or from its DNO id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = s.parse::<u8>() {
            return DnoRegion::from_dno_id(id)
                .ok_or_else(|| ParseError(format!("Unknown DNO id: {}", id)));
        }
        DnoRegion::ALL
            .into_iter()
            .find(|r| r.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError(format!("Failed parsing {} as a DNO region", s)))
    }
}
