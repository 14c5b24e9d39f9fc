use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::data::Registry;
use crate::merit::round_to;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityRow {
    /// Generator name, or the technology when aggregated
    pub key: String,
    /// Only set on per-generator rows
    pub technology: Option<String>,
    pub capacity_mw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityTable {
    pub aggregated: bool,
    pub columns: Vec<String>,
    pub rows: Vec<CapacityRow>,
}

/// Installed capacity of the selected countries, per generator or summed by
/// technology (sorted by technology). Values are rounded to 1 dp after summing.
pub fn capacity_table(registry: &Registry, countries: &BTreeSet<String>, aggregate_by_type: bool) -> CapacityTable {
    if aggregate_by_type {
        let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
        for g in registry.in_countries(countries) {
            *sums.entry(g.technology.as_str()).or_insert(0.0) += g.capacity_mw;
        }
        CapacityTable {
            aggregated: true,
            columns: vec!["Technology".to_string(), "Capacity (MW)".to_string()],
            rows: sums
                .into_iter()
                .map(|(tech, mw)| CapacityRow {
                    key: tech.to_string(),
                    technology: None,
                    capacity_mw: round_to(mw, 1),
                })
                .collect(),
        }
    } else {
        CapacityTable {
            aggregated: false,
            columns: vec![
                "Name".to_string(),
                "Technology".to_string(),
                "Capacity (MW)".to_string(),
            ],
            rows: registry
                .in_countries(countries)
                .map(|g| CapacityRow {
                    key: g.name.clone(),
                    technology: Some(g.technology.clone()),
                    capacity_mw: round_to(g.capacity_mw, 1),
                })
                .collect(),
        }
    }
}

impl CapacityTable {
    pub fn total_mw(&self) -> f64 {
        self.rows.iter().map(|r| r.capacity_mw).sum()
    }

    /// Fixed-width text rendering for terminals.
    pub fn to_text(&self) -> String {
        let key_width = self
            .rows
            .iter()
            .map(|r| r.key.chars().count())
            .chain(std::iter::once(self.columns[0].len()))
            .max()
            .unwrap_or(0);
        let mut out = String::new();
        if self.aggregated {
            out.push_str(&format!("{:<w$}  {:>12}\n", self.columns[0], self.columns[1], w = key_width));
            for r in &self.rows {
                out.push_str(&format!("{:<w$}  {:>12.1}\n", r.key, r.capacity_mw, w = key_width));
            }
        } else {
            let tech_width = self
                .rows
                .iter()
                .filter_map(|r| r.technology.as_ref().map(|t| t.chars().count()))
                .chain(std::iter::once(self.columns[1].len()))
                .max()
                .unwrap_or(0);
            out.push_str(&format!(
                "{:<w$}  {:<t$}  {:>12}\n",
                self.columns[0],
                self.columns[1],
                self.columns[2],
                w = key_width,
                t = tech_width
            ));
            for r in &self.rows {
                out.push_str(&format!(
                    "{:<w$}  {:<t$}  {:>12.1}\n",
                    r.key,
                    r.technology.as_deref().unwrap_or(""),
                    r.capacity_mw,
                    w = key_width,
                    t = tech_width
                ));
            }
        }
        out
    }
}
