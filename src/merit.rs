//! Merit-order cost engine.
//!
//! ```text
//! registry ──filter(countries)──► join(fuel prices) ──► marginal cost
//!                                                          │ (+ carbon adder)
//!                                                          ▼
//!                        [x2, x1) GW intervals ◄── stable sort by cost
//! ```
//!
//! Rows are recomputed from scratch on every call; nothing is kept between
//! calls.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::colors::technology_color;
use crate::data::Registry;
use crate::logging::{log_merit_order, ProfileScope};
use crate::prices::FuelPrices;

/// Whether capacity is taken at nameplate or scaled to an average day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    #[default]
    FullCapacity,
    AverageDay,
}

impl OperationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationMode::FullCapacity => "full_capacity",
            OperationMode::AverageDay => "average_day",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OperationMode::FullCapacity => "Full capacity",
            OperationMode::AverageDay => "Average day",
        }
    }

    /// Accepts both the wire name and the display label.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "full_capacity" | "Full capacity" => Some(OperationMode::FullCapacity),
            "average_day" | "Average day" => Some(OperationMode::AverageDay),
            _ => None,
        }
    }
}

/// Engine inputs other than the price table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub countries: BTreeSet<String>,
    pub mode: OperationMode,
    /// EUR per tonne CO2; `None` skips the emissions adder
    pub carbon_price: Option<f64>,
}

impl Selection {
    pub fn new<I, S>(countries: I, mode: OperationMode, carbon_price: Option<f64>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            countries: countries.into_iter().map(Into::into).collect(),
            mode,
            carbon_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeritOrderRow {
    pub name: String,
    pub country: String,
    pub technology: String,
    pub capacity_mw: f64,
    pub effective_capacity_mw: f64,
    /// EUR/MWh including the carbon adder
    pub marginal_cost: f64,
    /// Left edge in GW
    pub x2: f64,
    /// Right edge in GW
    pub x1: f64,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeritOrder {
    pub rows: Vec<MeritOrderRow>,
    /// Technology missing from the price table
    pub dropped_unpriced: usize,
    /// Efficiency missing, zero or negative
    pub dropped_no_efficiency: usize,
    /// Average-day mode without a capacity factor for the technology
    pub dropped_no_capacity_factor: usize,
}

impl MeritOrder {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total_capacity_gw(&self) -> f64 {
        self.rows.last().map(|r| r.x1).unwrap_or(0.0)
    }

    pub fn dropped(&self) -> usize {
        self.dropped_unpriced + self.dropped_no_efficiency + self.dropped_no_capacity_factor
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn compute(registry: &Registry, selection: &Selection, prices: &FuelPrices) -> MeritOrder {
    let _profile = ProfileScope::new("merit_order");
    let mut out = MeritOrder::default();

    let mut rows = Vec::new();
    for g in registry.in_countries(&selection.countries) {
        let Some(price) = prices.get(&g.technology) else {
            out.dropped_unpriced += 1;
            continue;
        };
        let Some(eff) = g.usable_efficiency() else {
            out.dropped_no_efficiency += 1;
            continue;
        };
        let effective_capacity_mw = match selection.mode {
            OperationMode::FullCapacity => g.capacity_mw,
            OperationMode::AverageDay => match price.capacity_factor {
                Some(cf) if cf.is_finite() => g.capacity_mw * cf,
                _ => {
                    out.dropped_no_capacity_factor += 1;
                    continue;
                }
            },
        };

        let mut marginal_cost = round_to(price.live / eff, 2);
        if let Some(carbon_price) = selection.carbon_price {
            let emissions = g.emissions.or(price.emissions).unwrap_or(0.0);
            marginal_cost += round_to(emissions / eff / 1000.0 * carbon_price, 2);
        }

        rows.push(MeritOrderRow {
            name: g.name.clone(),
            country: g.country.clone(),
            technology: g.technology.clone(),
            capacity_mw: g.capacity_mw,
            effective_capacity_mw,
            marginal_cost,
            x2: 0.0,
            x1: 0.0,
            color: technology_color(&g.technology).to_string(),
        });
    }

    // stable: equal costs keep registry order
    rows.sort_by(|a, b| a.marginal_cost.total_cmp(&b.marginal_cost));

    let mut running_mw = 0.0;
    let mut left = 0.0;
    for row in rows.iter_mut() {
        running_mw += row.effective_capacity_mw;
        row.x2 = left;
        row.x1 = running_mw / 1e3;
        left = row.x1;
    }
    out.rows = rows;

    let countries: Vec<String> = selection.countries.iter().cloned().collect();
    log_merit_order(
        &countries,
        selection.mode.as_str(),
        selection.carbon_price.unwrap_or(0.0),
        out.rows.len(),
        out.dropped(),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Generator;

    fn gen(name: &str, country: &str, tech: &str, cap: f64, eff: Option<f64>) -> Generator {
        Generator {
            name: name.to_string(),
            country: country.to_string(),
            technology: tech.to_string(),
            capacity_mw: cap,
            efficiency: eff,
            emissions: None,
            lat: None,
            lon: None,
        }
    }

    #[test]
    fn round_to_two_places() {
        assert_eq!(round_to(1.234, 2), 1.23);
        assert_eq!(round_to(1.236, 2), 1.24);
        assert_eq!(round_to(12.34, 1), 12.3);
    }

    #[test]
    fn mode_parse_accepts_labels() {
        assert_eq!(OperationMode::parse("Average day"), Some(OperationMode::AverageDay));
        assert_eq!(OperationMode::parse("full_capacity"), Some(OperationMode::FullCapacity));
        assert_eq!(OperationMode::parse("half"), None);
    }

    #[test]
    fn unpriced_and_inefficient_rows_are_dropped() {
        let reg = Registry::new(vec![
            gen("a", "Greece", "Nuclear", 100.0, Some(0.5)),
            gen("b", "Greece", "Fusion", 100.0, Some(0.5)),
            gen("c", "Greece", "Nuclear", 100.0, None),
            gen("d", "Greece", "Nuclear", 100.0, Some(0.0)),
        ]);
        let prices = FuelPrices::from_costs([("Nuclear", 5.0)]);
        let mo = compute(&reg, &Selection::new(["Greece"], OperationMode::FullCapacity, None), &prices);
        assert_eq!(mo.len(), 1);
        assert_eq!(mo.rows[0].name, "a");
        assert_eq!(mo.rows[0].marginal_cost, 10.0);
        assert_eq!(mo.dropped_unpriced, 1);
        assert_eq!(mo.dropped_no_efficiency, 2);
    }

    #[test]
    fn ties_keep_registry_order() {
        let reg = Registry::new(vec![
            gen("z", "Greece", "Nuclear", 10.0, Some(1.0)),
            gen("cheap", "Greece", "Solar", 10.0, Some(1.0)),
            gen("a", "Greece", "Nuclear", 10.0, Some(1.0)),
        ]);
        let prices = FuelPrices::from_costs([("Nuclear", 5.0), ("Solar", 0.0)]);
        let mo = compute(&reg, &Selection::new(["Greece"], OperationMode::FullCapacity, None), &prices);
        let names: Vec<_> = mo.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["cheap", "z", "a"]);
    }

    #[test]
    fn average_day_without_capacity_factor_is_excluded() {
        let reg = Registry::new(vec![
            gen("n", "Greece", "Nuclear", 1000.0, Some(1.0)),
            gen("s", "Greece", "Solar", 500.0, Some(1.0)),
        ]);
        let prices = FuelPrices::from_parameters(&[
            crate::data::FuelParameter {
                technology: "Nuclear".to_string(),
                cost: 5.0,
                emissions: None,
                capacity_factor: Some(0.9),
            },
            crate::data::FuelParameter {
                technology: "Solar".to_string(),
                cost: 0.0,
                emissions: None,
                capacity_factor: None,
            },
        ]);
        let sel = Selection::new(["Greece"], OperationMode::AverageDay, None);
        let mo = compute(&reg, &sel, &prices);
        assert_eq!(mo.len(), 1);
        assert_eq!(mo.dropped_no_capacity_factor, 1);
        assert_eq!(mo.rows[0].effective_capacity_mw, 900.0);
        assert_eq!(mo.rows[0].x1, 0.9);

        // full capacity keeps both
        let full = compute(&reg, &Selection::new(["Greece"], OperationMode::FullCapacity, None), &prices);
        assert_eq!(full.len(), 2);
        assert_eq!(full.total_capacity_gw(), 1.5);
    }

    #[test]
    fn generator_emissions_override_technology_value() {
        let mut g = gen("coal", "Greece", "Fossil Hard coal", 100.0, Some(0.5));
        g.emissions = Some(800.0);
        let reg = Registry::new(vec![g]);
        let prices = FuelPrices::from_parameters(&[crate::data::FuelParameter {
            technology: "Fossil Hard coal".to_string(),
            cost: 10.0,
            emissions: Some(340.0),
            capacity_factor: None,
        }]);
        let mo = compute(&reg, &Selection::new(["Greece"], OperationMode::FullCapacity, Some(10.0)), &prices);
        // 10/0.5 = 20; (800/0.5)/1000*10 = 16
        assert_eq!(mo.rows[0].marginal_cost, 36.0);
    }
}
