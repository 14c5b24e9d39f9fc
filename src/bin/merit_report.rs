//! Merit-order report for the terminal.
//!
//! Usage: cargo run --bin merit_report -- Greece,Spain [full_capacity|average_day] [carbon] [--json] [--capacities]
//!
//! Data locations come from the same env vars as the dashboard (DATA_DIR, ...).

use meritdash::config::{parse_list, Config};
use meritdash::data::Datasets;
use meritdash::merit::{compute, MeritOrder, OperationMode, Selection};
use meritdash::prices::FuelPrices;
use meritdash::views::capacity_table;

fn print_table(order: &MeritOrder) {
    let name_width = order
        .rows
        .iter()
        .map(|r| r.name.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);
    println!(
        "{:<w$}  {:<32}  {:>10}  {:>10}  {:>8}  {:>8}",
        "Name",
        "Technology",
        "MW",
        "EUR/MWh",
        "x2 GW",
        "x1 GW",
        w = name_width
    );
    for r in &order.rows {
        println!(
            "{:<w$}  {:<32}  {:>10.1}  {:>10.2}  {:>8.3}  {:>8.3}",
            r.name,
            r.technology,
            r.effective_capacity_mw,
            r.marginal_cost,
            r.x2,
            r.x1,
            w = name_width
        );
    }
    println!();
    println!(
        "rows={} total={:.3} GW dropped: unpriced={} no_efficiency={} no_capacity_factor={}",
        order.len(),
        order.total_capacity_gw(),
        order.dropped_unpriced,
        order.dropped_no_efficiency,
        order.dropped_no_capacity_factor
    );
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let as_json = args.iter().any(|a| a == "--json");
    let with_capacities = args.iter().any(|a| a == "--capacities");
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

    let cfg = Config::from_env();
    let countries = positional
        .first()
        .map(|s| parse_list(s))
        .unwrap_or_else(|| cfg.default_countries.clone());
    let mode = match positional.get(1) {
        Some(raw) => match OperationMode::parse(raw) {
            Some(m) => m,
            None => {
                eprintln!("unknown mode: {} (expected full_capacity or average_day)", raw);
                std::process::exit(2);
            }
        },
        None => OperationMode::FullCapacity,
    };
    let carbon_price = match positional.get(2).map(|raw| raw.parse::<f64>()) {
        Some(Ok(v)) if v.is_finite() && v >= 0.0 => Some(v),
        Some(_) => {
            eprintln!("carbon price must be a non-negative number");
            std::process::exit(2);
        }
        None => None,
    };

    let datasets = match Datasets::load(&cfg) {
        Ok(d) => d,
        Err(err) => {
            eprintln!("failed to load datasets: {:#}", err);
            std::process::exit(1);
        }
    };
    let prices = FuelPrices::from_parameters(&datasets.parameters);
    let selection = Selection::new(countries, mode, carbon_price);
    let order = compute(&datasets.registry, &selection, &prices);

    if as_json {
        match serde_json::to_string_pretty(&order) {
            Ok(s) => println!("{}", s),
            Err(err) => {
                eprintln!("failed to encode report: {}", err);
                std::process::exit(1);
            }
        }
        return;
    }

    println!("Merit order");
    println!("===========");
    println!(
        "Countries: {:?}  Mode: {}  Carbon: {} EUR/t",
        selection.countries,
        mode.label(),
        carbon_price.unwrap_or(0.0)
    );
    println!();
    print_table(&order);

    if with_capacities {
        println!();
        print!("{}", capacity_table(&datasets.registry, &selection.countries, true).to_text());
    }
}
