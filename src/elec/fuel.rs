use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fuel {
    Gas,
    Coal,
    Biomass,
    Nuclear,
    Hydro,
    Wind,
    Solar,
    Imports,
    Other,
}

impl Fuel {
    /// In the order of the generation mix table columns.
    pub const ALL: [Fuel; 9] = [
        Fuel::Gas,
        Fuel::Coal,
        Fuel::Biomass,
        Fuel::Nuclear,
        Fuel::Hydro,
        Fuel::Wind,
        Fuel::Solar,
        Fuel::Imports,
        Fuel::Other,
    ];

    /// Label used in charts and tables, e.g. "Biomass".
    pub fn label(&self) -> &'static str {
        match self {
            Fuel::Gas => "Gas",
            Fuel::Coal => "Coal",
            Fuel::Biomass => "Biomass",
            Fuel::Nuclear => "Nuclear",
            Fuel::Hydro => "Hydro",
            Fuel::Wind => "Wind",
            Fuel::Solar => "Solar",
            Fuel::Imports => "Imports",
            Fuel::Other => "Other",
        }
    }
}

impl fmt::Display for Fuel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Fuel::Gas => write!(f, "gas"),
            Fuel::Coal => write!(f, "coal"),
            Fuel::Biomass => write!(f, "biomass"),
            Fuel::Nuclear => write!(f, "nuclear"),
            Fuel::Hydro => write!(f, "hydro"),
            Fuel::Wind => write!(f, "wind"),
            Fuel::Solar => write!(f, "solar"),
            Fuel::Imports => write!(f, "imports"),
            Fuel::Other => write!(f, "other"),
        }
    }
}

impl FromStr for Fuel {
    type Err = ParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gas" => Ok(Fuel::Gas),
            "coal" => Ok(Fuel::Coal),
            "biomass" => Ok(Fuel::Biomass),
            "nuclear" => Ok(Fuel::Nuclear),
            "hydro" => Ok(Fuel::Hydro),
            "wind" => Ok(Fuel::Wind),
            "solar" => Ok(Fuel::Solar),
            "imports" => Ok(Fuel::Imports),
            "other" => Ok(Fuel::Other),
            _ => Err(ParseError(format!("Failed parsing {} as a fuel", s))),
        }
    }
}

/// Percentage of generation by fuel for one half-hour interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMix {
    pub gas: Decimal,
    pub coal: Decimal,
    pub biomass: Decimal,
    pub nuclear: Decimal,
    pub hydro: Decimal,
    pub wind: Decimal,
    pub solar: Decimal,
    pub imports: Decimal,
    pub other: Decimal,
}

impl GenerationMix {
    /// Build a mix from (fuel, percentage) pairs.  Return `None` if any of
    /// the nine fuels is missing.  Later duplicates overwrite earlier ones.
    pub fn from_entries<I>(entries: I) -> Option<GenerationMix>
    where
        I: IntoIterator<Item = (Fuel, Decimal)>,
    {
        let perc: HashMap<Fuel, Decimal> = entries.into_iter().collect();
        Some(GenerationMix {
            gas: *perc.get(&Fuel::Gas)?,
            coal: *perc.get(&Fuel::Coal)?,
            biomass: *perc.get(&Fuel::Biomass)?,
            nuclear: *perc.get(&Fuel::Nuclear)?,
            hydro: *perc.get(&Fuel::Hydro)?,
            wind: *perc.get(&Fuel::Wind)?,
            solar: *perc.get(&Fuel::Solar)?,
            imports: *perc.get(&Fuel::Imports)?,
            other: *perc.get(&Fuel::Other)?,
        })
    }

    pub fn get(&self, fuel: Fuel) -> Decimal {
        match fuel {
            Fuel::Gas => self.gas,
            Fuel::Coal => self.coal,
            Fuel::Biomass => self.biomass,
            Fuel::Nuclear => self.nuclear,
            Fuel::Hydro => self.hydro,
            Fuel::Wind => self.wind,
            Fuel::Solar => self.solar,
            Fuel::Imports => self.imports,
            Fuel::Other => self.other,
        }
    }

    /// Should be 100 give or take the rounding of the individual percentages.
    pub fn total(&self) -> Decimal {
        Fuel::ALL.iter().map(|fuel| self.get(*fuel)).sum()
    }
}
