//! Live fuel-price table.
//!
//! Holds one entry per technology with the cost loaded from the parameter
//! file (`default`) and the cost currently in effect (`live`). Only `live`
//! ever changes. Bounds are the caller's business.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::data::FuelParameter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelPrice {
    pub technology: String,
    /// EUR/MWh currently applied
    pub live: f64,
    /// EUR/MWh as loaded
    pub default: f64,
    /// Technology-level emissions intensity, gr/kWh
    pub emissions: Option<f64>,
    pub capacity_factor: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTechnology(pub String);

impl fmt::Display for UnknownTechnology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown technology: {}", self.0)
    }
}

impl std::error::Error for UnknownTechnology {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FuelPrices {
    entries: Vec<FuelPrice>,
}

impl FuelPrices {
    pub fn from_parameters(params: &[FuelParameter]) -> Self {
        Self {
            entries: params
                .iter()
                .map(|p| FuelPrice {
                    technology: p.technology.clone(),
                    live: p.cost,
                    default: p.cost,
                    emissions: p.emissions,
                    capacity_factor: p.capacity_factor,
                })
                .collect(),
        }
    }

    /// Cost-only table, no emissions or capacity factors.
    pub fn from_costs<'a>(costs: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self {
            entries: costs
                .into_iter()
                .map(|(t, c)| FuelPrice {
                    technology: t.to_string(),
                    live: c,
                    default: c,
                    emissions: None,
                    capacity_factor: None,
                })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[FuelPrice] {
        &self.entries
    }

    pub fn get(&self, technology: &str) -> Option<&FuelPrice> {
        self.entries.iter().find(|e| e.technology == technology)
    }

    pub fn live_cost(&self, technology: &str) -> Option<f64> {
        self.get(technology).map(|e| e.live)
    }

    pub fn technologies(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.technology.as_str())
    }

    /// Overwrites the live cost, returning the previous one.
    pub fn set(&mut self, technology: &str, value: f64) -> Result<f64, UnknownTechnology> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.technology == technology)
            .ok_or_else(|| UnknownTechnology(technology.to_string()))?;
        let old = entry.live;
        entry.live = value;
        Ok(old)
    }

    /// Restores every live cost to its default. Returns how many differed.
    pub fn reset_all(&mut self) -> usize {
        let mut changed = 0;
        for e in self.entries.iter_mut() {
            if e.live != e.default {
                changed += 1;
            }
            e.live = e.default;
        }
        changed
    }

    pub fn is_default(&self) -> bool {
        self.entries.iter().all(|e| e.live == e.default)
    }

    pub fn live_costs(&self) -> BTreeMap<String, f64> {
        self.entries
            .iter()
            .map(|e| (e.technology.clone(), e.live))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
