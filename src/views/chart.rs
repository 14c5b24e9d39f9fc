//! Merit-order chart as a Vega-Lite spec.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;

use crate::colors::{legend_domain, legend_range};
use crate::data::{DemandBand, DemandTable};
use crate::merit::MeritOrder;

const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

#[derive(Debug, Clone, Copy)]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self { width: 550, height: 500 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeritChart {
    pub rows: usize,
    pub total_capacity_gw: f64,
    pub demand: Option<DemandBand>,
    pub spec: Value,
}

/// The demand band is drawn only for a single selected country that has one.
pub fn demand_overlay(countries: &BTreeSet<String>, demand: &DemandTable) -> Option<DemandBand> {
    if countries.len() != 1 {
        return None;
    }
    countries.iter().next().and_then(|c| demand.get(c))
}

pub fn merit_chart(order: &MeritOrder, demand: Option<DemandBand>, opts: &ChartOptions) -> MeritChart {
    let values: Vec<Value> = order
        .rows
        .iter()
        .map(|r| {
            json!({
                "name_g": r.name,
                "type_g": r.technology,
                "capacity_g": r.capacity_mw,
                "marg_cost": r.marginal_cost,
                "x1": r.x1,
                "x2": r.x2,
            })
        })
        .collect();

    let power = json!({
        "data": { "values": values },
        "mark": "rect",
        "encoding": {
            "x": { "field": "x1", "type": "quantitative", "title": "Capacity (GW)" },
            "x2": { "field": "x2" },
            "y": { "field": "marg_cost", "type": "quantitative", "title": "Marginal Cost (EUR/MWh)" },
            "y2": { "datum": 0 },
            "color": {
                "field": "type_g",
                "type": "nominal",
                "scale": { "domain": legend_domain(), "range": legend_range() },
                "legend": { "title": "Technology" },
            },
            "tooltip": [
                { "field": "name_g", "type": "nominal" },
                { "field": "type_g", "type": "nominal" },
                { "field": "capacity_g", "type": "quantitative" },
                { "field": "marg_cost", "type": "quantitative" },
            ],
        },
    });

    let mut layers = Vec::with_capacity(2);
    if let Some(band) = demand {
        // behind the bars
        layers.push(json!({
            "data": { "values": [{ "min": band.min, "max": band.max }] },
            "mark": { "type": "rect", "opacity": 0.3, "color": "grey" },
            "encoding": {
                "x": { "field": "min", "type": "quantitative" },
                "x2": { "field": "max" },
            },
        }));
    }
    layers.push(power);

    let spec = json!({
        "$schema": VEGA_LITE_SCHEMA,
        "width": opts.width,
        "height": opts.height,
        "layer": layers,
        "config": {
            "axis": { "grid": false },
            "view": { "strokeWidth": 1 },
        },
    });

    MeritChart {
        rows: order.len(),
        total_capacity_gw: order.total_capacity_gw(),
        demand,
        spec,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merit::MeritOrderRow;
    use std::collections::BTreeMap;

    fn order() -> MeritOrder {
        MeritOrder {
            rows: vec![MeritOrderRow {
                name: "Plant".to_string(),
                country: "Greece".to_string(),
                technology: "Nuclear".to_string(),
                capacity_mw: 1000.0,
                effective_capacity_mw: 1000.0,
                marginal_cost: 5.0,
                x2: 0.0,
                x1: 1.0,
                color: "purple".to_string(),
            }],
            ..MeritOrder::default()
        }
    }

    fn demand() -> DemandTable {
        let mut bands = BTreeMap::new();
        bands.insert("Greece".to_string(), DemandBand { min: 4.0, max: 9.0 });
        DemandTable::new(bands)
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn overlay_only_for_single_known_country() {
        let d = demand();
        assert!(demand_overlay(&set(&["Greece"]), &d).is_some());
        assert!(demand_overlay(&set(&["Greece", "Spain"]), &d).is_none());
        assert!(demand_overlay(&set(&["Spain"]), &d).is_none());
        assert!(demand_overlay(&set(&[]), &d).is_none());
    }

    #[test]
    fn spec_layers_demand_behind_bars() {
        let band = demand_overlay(&set(&["Greece"]), &demand());
        let chart = merit_chart(&order(), band, &ChartOptions::default());
        let layers = chart.spec["layer"].as_array().unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0]["encoding"]["x"]["field"], "min");
        assert_eq!(layers[1]["data"]["values"][0]["marg_cost"], 5.0);
        assert_eq!(chart.spec["width"], 550);
        assert_eq!(chart.total_capacity_gw, 1.0);
    }

    #[test]
    fn spec_without_demand_has_single_layer() {
        let chart = merit_chart(&order(), None, &ChartOptions { width: 300, height: 200 });
        assert_eq!(chart.spec["layer"].as_array().unwrap().len(), 1);
        assert_eq!(chart.spec["height"], 200);
        assert_eq!(chart.spec["config"]["axis"]["grid"], false);
    }
}
