use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One power plant from the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    #[serde(rename(deserialize = "name_g"))]
    pub name: String,
    pub country: String,
    #[serde(rename(deserialize = "type_g"))]
    pub technology: String,
    /// Installed capacity in MW
    #[serde(rename(deserialize = "capacity_g"))]
    pub capacity_mw: f64,
    #[serde(rename(deserialize = "eff"), default, deserialize_with = "csv::invalid_option")]
    pub efficiency: Option<f64>,
    /// gr/kWh; overrides the technology-level value when present
    #[serde(
        rename(deserialize = "Emissions (gr/kWh)"),
        default,
        deserialize_with = "csv::invalid_option"
    )]
    pub emissions: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub lon: Option<f64>,
}

impl Generator {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }

    /// Efficiency usable as a cost divisor: present, finite and positive.
    pub fn usable_efficiency(&self) -> Option<f64> {
        self.efficiency.filter(|e| e.is_finite() && *e > 0.0)
    }
}

/// Technology-level cost parameters (one row of `parameters.csv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelParameter {
    #[serde(rename(deserialize = "type_g"))]
    pub technology: String,
    /// Default fuel cost in EUR/MWh
    #[serde(rename(deserialize = "Cost (EUR/Mwh)"))]
    pub cost: f64,
    #[serde(
        rename(deserialize = "Emissions (gr/kWh)"),
        default,
        deserialize_with = "csv::invalid_option"
    )]
    pub emissions: Option<f64>,
    #[serde(
        rename(deserialize = "Capacity Factor"),
        default,
        deserialize_with = "csv::invalid_option"
    )]
    pub capacity_factor: Option<f64>,
}

/// Historical demand range of one country.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandBand {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DemandRecord {
    pub country: String,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    generators: Vec<Generator>,
}

impl Registry {
    pub fn new(generators: Vec<Generator>) -> Self {
        Self { generators }
    }

    pub fn generators(&self) -> &[Generator] {
        &self.generators
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Distinct countries, sorted.
    pub fn countries(&self) -> Vec<String> {
        self.generators
            .iter()
            .map(|g| g.country.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn has_country(&self, country: &str) -> bool {
        self.generators.iter().any(|g| g.country == country)
    }

    /// Generators whose country is in `countries`, in registry order.
    pub fn in_countries<'a>(
        &'a self,
        countries: &'a BTreeSet<String>,
    ) -> impl Iterator<Item = &'a Generator> + 'a {
        self.generators
            .iter()
            .filter(move |g| countries.contains(&g.country))
    }
}

#[derive(Debug, Clone, Default)]
pub struct DemandTable {
    bands: BTreeMap<String, DemandBand>,
}

impl DemandTable {
    pub fn new(bands: BTreeMap<String, DemandBand>) -> Self {
        Self { bands }
    }

    pub fn get(&self, country: &str) -> Option<DemandBand> {
        self.bands.get(country).copied()
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }
}
