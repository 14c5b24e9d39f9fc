//! Generator location map: circle markers sized by capacity.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::colors::technology_color;
use crate::data::{Generator, Registry};
use crate::prices::FuelPrices;

/// Marker radius in metres per MW of capacity.
const RADIUS_M_PER_MW: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct MapOptions {
    pub zoom: u8,
    /// Figure edge in pixels
    pub size: u32,
    pub tiles: String,
    pub attribution: String,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            zoom: 6,
            size: 700,
            tiles: "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}.png".to_string(),
            attribution: "&copy; OpenStreetMap contributors &copy; CARTO".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMarker {
    pub name: String,
    pub technology: String,
    pub capacity_mw: f64,
    pub lat: f64,
    pub lon: f64,
    pub radius_m: f64,
    pub color: String,
    pub popup: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    /// `[lat, lon]`; absent when nothing in the selection has a location
    pub center: Option<[f64; 2]>,
    pub zoom: u8,
    pub width: u32,
    pub height: u32,
    pub tiles: String,
    pub attribution: String,
    pub markers: Vec<MapMarker>,
}

fn popup(g: &Generator) -> String {
    format!("Name: {} \n{} MW\n{}", g.name, g.capacity_mw, g.technology)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Generators of the selected countries that the merit order can cost
/// (priced, usable efficiency). Latitude and longitude are averaged
/// independently over whatever values are present.
pub fn generator_map(
    registry: &Registry,
    countries: &BTreeSet<String>,
    prices: &FuelPrices,
    opts: &MapOptions,
) -> MapView {
    let priced: Vec<&Generator> = registry
        .in_countries(countries)
        .filter(|g| prices.get(&g.technology).is_some() && g.usable_efficiency().is_some())
        .collect();

    let center = match (
        mean(priced.iter().filter_map(|g| g.lat)),
        mean(priced.iter().filter_map(|g| g.lon)),
    ) {
        (Some(lat), Some(lon)) => Some([lat, lon]),
        _ => None,
    };

    let markers = priced
        .iter()
        .filter_map(|g| {
            let (lat, lon) = g.coordinates()?;
            Some(MapMarker {
                name: g.name.clone(),
                technology: g.technology.clone(),
                capacity_mw: g.capacity_mw,
                lat,
                lon,
                radius_m: g.capacity_mw * RADIUS_M_PER_MW,
                color: technology_color(&g.technology).to_string(),
                popup: popup(g),
            })
        })
        .collect();

    MapView {
        center,
        zoom: opts.zoom,
        width: opts.size,
        height: opts.size,
        tiles: opts.tiles.clone(),
        attribution: opts.attribution.clone(),
        markers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gen(name: &str, tech: &str, lat: Option<f64>, lon: Option<f64>) -> Generator {
        Generator {
            name: name.to_string(),
            country: "Greece".to_string(),
            technology: tech.to_string(),
            capacity_mw: 200.0,
            efficiency: Some(0.4),
            emissions: None,
            lat,
            lon,
        }
    }

    fn greece() -> BTreeSet<String> {
        ["Greece".to_string()].into_iter().collect()
    }

    #[test]
    fn center_is_mean_of_present_coordinates() {
        let reg = Registry::new(vec![
            gen("a", "Fossil Gas", Some(38.0), Some(22.0)),
            gen("b", "Fossil Gas", Some(40.0), None),
            gen("c", "Fossil Gas", None, Some(24.0)),
        ]);
        let prices = FuelPrices::from_costs([("Fossil Gas", 40.0)]);
        let view = generator_map(&reg, &greece(), &prices, &MapOptions::default());
        assert_eq!(view.center, Some([39.0, 23.0]));
        assert_eq!(view.markers.len(), 1);
        let m = &view.markers[0];
        assert_eq!(m.radius_m, 2000.0);
        assert_eq!(m.color, "grey");
        assert_eq!(m.popup, "Name: a \n200 MW\nFossil Gas");
    }

    #[test]
    fn unpriced_generators_are_not_mapped() {
        let reg = Registry::new(vec![gen("a", "Fusion", Some(38.0), Some(22.0))]);
        let prices = FuelPrices::from_costs([("Fossil Gas", 40.0)]);
        let view = generator_map(&reg, &greece(), &prices, &MapOptions::default());
        assert!(view.markers.is_empty());
        assert!(view.center.is_none());
    }

    #[test]
    fn generators_without_usable_efficiency_are_not_mapped() {
        let mut no_eff = gen("b", "Fossil Gas", Some(40.0), Some(24.0));
        no_eff.efficiency = None;
        let mut zero_eff = gen("c", "Fossil Gas", Some(42.0), Some(26.0));
        zero_eff.efficiency = Some(0.0);
        let reg = Registry::new(vec![gen("a", "Fossil Gas", Some(38.0), Some(22.0)), no_eff, zero_eff]);
        let prices = FuelPrices::from_costs([("Fossil Gas", 40.0)]);
        let view = generator_map(&reg, &greece(), &prices, &MapOptions::default());
        assert_eq!(view.markers.len(), 1);
        assert_eq!(view.markers[0].name, "a");
        assert_eq!(view.center, Some([38.0, 22.0]));
    }

    #[test]
    fn empty_selection_has_no_center() {
        let reg = Registry::new(vec![gen("a", "Fossil Gas", Some(38.0), Some(22.0))]);
        let prices = FuelPrices::from_costs([("Fossil Gas", 40.0)]);
        let view = generator_map(&reg, &BTreeSet::new(), &prices, &MapOptions::default());
        assert!(view.center.is_none());
        assert_eq!(view.width, 700);
    }
}
