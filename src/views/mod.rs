//! Presentation adapters. Each turns engine or registry output into a
//! serializable artifact the page can draw without further computation.

pub mod chart;
pub mod map;
pub mod table;

use serde::{Deserialize, Serialize};

pub use chart::{demand_overlay, merit_chart, ChartOptions, MeritChart};
pub use map::{generator_map, MapMarker, MapOptions, MapView};
pub use table::{capacity_table, CapacityRow, CapacityTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    MeritOrder,
    Map,
    Capacities,
}

impl ViewKind {
    pub const ALL: [ViewKind; 3] = [ViewKind::MeritOrder, ViewKind::Map, ViewKind::Capacities];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKind::MeritOrder => "merit_order",
            ViewKind::Map => "map",
            ViewKind::Capacities => "capacities",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == raw)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "view", content = "artifact", rename_all = "snake_case")]
pub enum View {
    MeritOrder(MeritChart),
    Map(MapView),
    Capacities(CapacityTable),
}

impl View {
    pub fn kind(&self) -> ViewKind {
        match self {
            View::MeritOrder(_) => ViewKind::MeritOrder,
            View::Map(_) => ViewKind::Map,
            View::Capacities(_) => ViewKind::Capacities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for k in ViewKind::ALL {
            assert_eq!(ViewKind::parse(k.as_str()), Some(k));
        }
        assert_eq!(ViewKind::parse("histogram"), None);
    }

    #[test]
    fn view_serializes_with_tag() {
        let v = View::Capacities(CapacityTable {
            aggregated: true,
            columns: vec![],
            rows: vec![],
        });
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["view"], "capacities");
        assert_eq!(json["artifact"]["aggregated"], true);
    }
}
