//! Session controller: (Controls, FuelPrices) × Input → recomputed views.
//!
//! ```text
//! ┌──────────┐  validate   ┌──────────────┐  affects()  ┌─────────────┐
//! │  Input   │────────────►│ Session state│────────────►│ render(kind)│──► observers
//! └──────────┘             └──────────────┘             └─────────────┘
//! ```
//!
//! Every input names the views that depend on it. Only those views are
//! rebuilt, and only after the whole state change has been applied, so a
//! reset is never observed half done.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::config::Config;
use crate::data::{Datasets, DemandTable, Registry};
use crate::logging::{
    log, log_input, log_price_change, log_price_reset, log_recompute, obj, v_str, Domain, Level,
    ProfileScope,
};
use crate::merit::{compute, MeritOrder, OperationMode, Selection};
use crate::prices::FuelPrices;
use crate::views::{
    capacity_table, demand_overlay, generator_map, merit_chart, ChartOptions, MapOptions, View,
    ViewKind,
};

pub const CARBON_PRICE_BOUNDS: (f64, f64) = (0.0, 100.0);
pub const FUEL_PRICE_BOUNDS: (f64, f64) = (0.0, 100.0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Controls {
    pub countries: BTreeSet<String>,
    /// EUR per tonne
    pub carbon_price: f64,
    pub mode: OperationMode,
    pub aggregate_by_type: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            countries: ["Greece".to_string()].into_iter().collect(),
            carbon_price: 0.0,
            mode: OperationMode::FullCapacity,
            aggregate_by_type: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "input", rename_all = "snake_case")]
pub enum Input {
    SelectCountries { countries: Vec<String> },
    SetCarbonPrice { value: f64 },
    SetOperationMode { mode: OperationMode },
    SetFuelPrice { technology: String, value: f64 },
    ResetPrices,
    SetAggregateByType { value: bool },
}

impl Input {
    pub fn name(&self) -> &'static str {
        match self {
            Input::SelectCountries { .. } => "select_countries",
            Input::SetCarbonPrice { .. } => "set_carbon_price",
            Input::SetOperationMode { .. } => "set_operation_mode",
            Input::SetFuelPrice { .. } => "set_fuel_price",
            Input::ResetPrices => "reset_prices",
            Input::SetAggregateByType { .. } => "set_aggregate_by_type",
        }
    }

    /// Views whose content depends on this input. The map only depends on
    /// which technologies are priced, never on the price values.
    pub fn affects(&self) -> &'static [ViewKind] {
        match self {
            Input::SelectCountries { .. } => &ViewKind::ALL,
            Input::SetCarbonPrice { .. }
            | Input::SetOperationMode { .. }
            | Input::SetFuelPrice { .. }
            | Input::ResetPrices => &[ViewKind::MeritOrder],
            Input::SetAggregateByType { .. } => &[ViewKind::Capacities],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputError {
    NotFinite { field: &'static str },
    OutOfBounds { field: &'static str, value: f64, min: f64, max: f64 },
    UnknownTechnology(String),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::NotFinite { field } => write!(f, "{} must be a finite number", field),
            InputError::OutOfBounds { field, value, min, max } => {
                write!(f, "{} = {} outside [{}, {}]", field, value, min, max)
            }
            InputError::UnknownTechnology(t) => write!(f, "unknown technology: {}", t),
        }
    }
}

impl std::error::Error for InputError {}

fn check_bounds(field: &'static str, value: f64, (min, max): (f64, f64)) -> Result<(), InputError> {
    if !value.is_finite() {
        return Err(InputError::NotFinite { field });
    }
    if value < min || value > max {
        return Err(InputError::OutOfBounds { field, value, min, max });
    }
    Ok(())
}

/// Receives every view rebuilt by [`Session::apply`].
pub trait ViewObserver {
    fn on_view(&mut self, input: &Input, view: &View);
}

impl<F: FnMut(&Input, &View)> ViewObserver for F {
    fn on_view(&mut self, input: &Input, view: &View) {
        self(input, view)
    }
}

/// Logs a one-line summary of each rebuilt view.
pub struct ViewLog;

impl ViewObserver for ViewLog {
    fn on_view(&mut self, input: &Input, view: &View) {
        let size = match view {
            View::MeritOrder(c) => c.rows,
            View::Map(m) => m.markers.len(),
            View::Capacities(t) => t.rows.len(),
        };
        log(
            Level::Debug,
            Domain::View,
            "view_rebuilt",
            obj(&[
                ("input", v_str(input.name())),
                ("view", v_str(view.kind().as_str())),
                ("size", serde_json::json!(size)),
            ]),
        );
    }
}

/// Result of applying one input.
#[derive(Debug, Clone, Serialize)]
pub struct Recompute {
    pub input: &'static str,
    pub views: Vec<View>,
    pub state_hash: String,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub default_countries: Vec<String>,
    pub chart: ChartOptions,
    pub map: MapOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            default_countries: vec!["Greece".to_string()],
            chart: ChartOptions::default(),
            map: MapOptions::default(),
        }
    }
}

impl SessionOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            default_countries: cfg.default_countries.clone(),
            chart: ChartOptions {
                width: cfg.chart_width,
                height: cfg.chart_height,
            },
            map: MapOptions {
                zoom: cfg.map_zoom,
                size: cfg.map_size,
                ..MapOptions::default()
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FuelPriceControl {
    pub technology: String,
    pub live: f64,
    pub default: f64,
    pub min: f64,
    pub max: f64,
}

/// Everything the page needs to draw its widgets.
#[derive(Debug, Clone, Serialize)]
pub struct ControlsSnapshot {
    pub countries_available: Vec<String>,
    pub selected: Vec<String>,
    pub carbon_price: f64,
    pub carbon_price_bounds: [f64; 2],
    pub mode: OperationMode,
    pub modes: Vec<(OperationMode, &'static str)>,
    pub aggregate_by_type: bool,
    pub fuel_prices: Vec<FuelPriceControl>,
    pub prices_at_default: bool,
}

pub struct Session {
    registry: Registry,
    demand: DemandTable,
    prices: FuelPrices,
    controls: Controls,
    opts: SessionOptions,
    observers: Vec<Box<dyn ViewObserver>>,
    seq: u64,
}

impl Session {
    pub fn new(registry: Registry, prices: FuelPrices, demand: DemandTable, opts: SessionOptions) -> Self {
        let controls = Controls {
            countries: opts.default_countries.iter().cloned().collect(),
            ..Controls::default()
        };
        Self {
            registry,
            demand,
            prices,
            controls,
            opts,
            observers: Vec::new(),
            seq: 0,
        }
    }

    pub fn from_datasets(ds: Datasets, cfg: &Config) -> Self {
        let prices = FuelPrices::from_parameters(&ds.parameters);
        Self::new(ds.registry, prices, ds.demand, SessionOptions::from_config(cfg))
    }

    pub fn subscribe(&mut self, observer: Box<dyn ViewObserver>) {
        self.observers.push(observer);
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn prices(&self) -> &FuelPrices {
        &self.prices
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Validates and applies one input, then rebuilds the views it affects.
    /// A rejected input leaves the session untouched.
    pub fn apply(&mut self, input: Input) -> Result<Recompute, InputError> {
        if let Err(err) = self.reduce(&input) {
            log_input(input.name(), false, Some(err.to_string().as_str()));
            return Err(err);
        }
        log_input(input.name(), true, None);
        self.seq += 1;

        let views: Vec<View> = input.affects().iter().map(|k| self.render(*k)).collect();
        for observer in self.observers.iter_mut() {
            for view in &views {
                observer.on_view(&input, view);
            }
        }

        let hash = self.state_hash();
        let kinds: Vec<&str> = views.iter().map(|v| v.kind().as_str()).collect();
        log_recompute(input.name(), &kinds, hash);
        Ok(Recompute {
            input: input.name(),
            views,
            state_hash: format!("{:016x}", hash),
        })
    }

    fn reduce(&mut self, input: &Input) -> Result<(), InputError> {
        match input {
            Input::SelectCountries { countries } => {
                let unknown: Vec<&String> = countries
                    .iter()
                    .filter(|c| !self.registry.has_country(c))
                    .collect();
                if !unknown.is_empty() {
                    log(
                        Level::Warn,
                        Domain::Session,
                        "unknown_countries",
                        obj(&[("countries", serde_json::json!(unknown))]),
                    );
                }
                self.controls.countries = countries.iter().cloned().collect();
            }
            Input::SetCarbonPrice { value } => {
                check_bounds("carbon_price", *value, CARBON_PRICE_BOUNDS)?;
                self.controls.carbon_price = *value;
            }
            Input::SetOperationMode { mode } => {
                self.controls.mode = *mode;
            }
            Input::SetFuelPrice { technology, value } => {
                if self.prices.get(technology).is_none() {
                    return Err(InputError::UnknownTechnology(technology.clone()));
                }
                check_bounds("fuel_price", *value, FUEL_PRICE_BOUNDS)?;
                let old = self
                    .prices
                    .set(technology, *value)
                    .map_err(|e| InputError::UnknownTechnology(e.0))?;
                log_price_change(technology, old, *value);
            }
            Input::ResetPrices => {
                let changed = self.prices.reset_all();
                log_price_reset(self.prices.len(), changed);
            }
            Input::SetAggregateByType { value } => {
                self.controls.aggregate_by_type = *value;
            }
        }
        Ok(())
    }

    pub fn selection(&self) -> Selection {
        Selection {
            countries: self.controls.countries.clone(),
            mode: self.controls.mode,
            carbon_price: Some(self.controls.carbon_price),
        }
    }

    pub fn merit_order(&self) -> MeritOrder {
        compute(&self.registry, &self.selection(), &self.prices)
    }

    /// Runs the engine for an arbitrary selection against the live prices,
    /// without touching the controls.
    pub fn query(&self, selection: &Selection) -> MeritOrder {
        compute(&self.registry, selection, &self.prices)
    }

    pub fn render(&self, kind: ViewKind) -> View {
        let _profile = ProfileScope::with_context("render_view", &[("view", v_str(kind.as_str()))]);
        let countries = &self.controls.countries;
        match kind {
            ViewKind::MeritOrder => {
                let band = demand_overlay(countries, &self.demand);
                View::MeritOrder(merit_chart(&self.merit_order(), band, &self.opts.chart))
            }
            ViewKind::Map => View::Map(generator_map(&self.registry, countries, &self.prices, &self.opts.map)),
            ViewKind::Capacities => View::Capacities(capacity_table(
                &self.registry,
                countries,
                self.controls.aggregate_by_type,
            )),
        }
    }

    pub fn render_all(&self) -> Vec<View> {
        ViewKind::ALL.iter().map(|k| self.render(*k)).collect()
    }

    pub fn snapshot(&self) -> ControlsSnapshot {
        ControlsSnapshot {
            countries_available: self.registry.countries(),
            selected: self.controls.countries.iter().cloned().collect(),
            carbon_price: self.controls.carbon_price,
            carbon_price_bounds: [CARBON_PRICE_BOUNDS.0, CARBON_PRICE_BOUNDS.1],
            mode: self.controls.mode,
            modes: [OperationMode::FullCapacity, OperationMode::AverageDay]
                .into_iter()
                .map(|m| (m, m.label()))
                .collect(),
            aggregate_by_type: self.controls.aggregate_by_type,
            fuel_prices: self
                .prices
                .entries()
                .iter()
                .map(|e| FuelPriceControl {
                    technology: e.technology.clone(),
                    live: e.live,
                    default: e.default,
                    min: FUEL_PRICE_BOUNDS.0,
                    max: FUEL_PRICE_BOUNDS.1,
                })
                .collect(),
            prices_at_default: self.prices.is_default(),
        }
    }

    /// Hash of everything a view can depend on (floats quantized).
    pub fn state_hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut h = DefaultHasher::new();
        self.seq.hash(&mut h);
        self.controls.countries.hash(&mut h);
        ((self.controls.carbon_price * 1e6) as i64).hash(&mut h);
        self.controls.mode.hash(&mut h);
        self.controls.aggregate_by_type.hash(&mut h);
        for e in self.prices.entries() {
            e.technology.hash(&mut h);
            ((e.live * 1e6) as i64).hash(&mut h);
        }
        h.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Generator;

    fn session() -> Session {
        let registry = Registry::new(vec![Generator {
            name: "Plant".to_string(),
            country: "Greece".to_string(),
            technology: "Nuclear".to_string(),
            capacity_mw: 1000.0,
            efficiency: Some(1.0),
            emissions: Some(0.0),
            lat: Some(38.0),
            lon: Some(23.0),
        }]);
        Session::new(
            registry,
            FuelPrices::from_costs([("Nuclear", 5.0)]),
            DemandTable::default(),
            SessionOptions::default(),
        )
    }

    #[test]
    fn affects_matches_view_dependencies() {
        assert_eq!(Input::ResetPrices.affects(), &[ViewKind::MeritOrder]);
        assert_eq!(Input::SetAggregateByType { value: false }.affects(), &[ViewKind::Capacities]);
        assert_eq!(Input::SelectCountries { countries: vec![] }.affects().len(), 3);
    }

    #[test]
    fn out_of_bounds_carbon_price_is_rejected() {
        let mut s = session();
        let before = s.controls().clone();
        let err = s.apply(Input::SetCarbonPrice { value: 150.0 }).unwrap_err();
        assert!(matches!(err, InputError::OutOfBounds { field: "carbon_price", .. }));
        assert_eq!(s.controls(), &before);
        assert!(matches!(
            s.apply(Input::SetCarbonPrice { value: f64::NAN }),
            Err(InputError::NotFinite { .. })
        ));
    }

    #[test]
    fn unknown_technology_is_rejected() {
        let mut s = session();
        let err = s
            .apply(Input::SetFuelPrice { technology: "Fusion".to_string(), value: 1.0 })
            .unwrap_err();
        assert_eq!(err, InputError::UnknownTechnology("Fusion".to_string()));
    }

    #[test]
    fn state_hash_tracks_changes() {
        let mut s = session();
        let h0 = s.state_hash();
        let r = s.apply(Input::SetOperationMode { mode: OperationMode::AverageDay }).unwrap();
        assert_ne!(format!("{:016x}", h0), r.state_hash);
        assert_eq!(r.views.len(), 1);
    }

    #[test]
    fn input_json_uses_tag() {
        let input: Input =
            serde_json::from_str(r#"{"input":"set_fuel_price","technology":"Nuclear","value":7.5}"#).unwrap();
        assert_eq!(
            input,
            Input::SetFuelPrice { technology: "Nuclear".to_string(), value: 7.5 }
        );
        let reset: Input = serde_json::from_str(r#"{"input":"reset_prices"}"#).unwrap();
        assert_eq!(reset, Input::ResetPrices);
    }
}
