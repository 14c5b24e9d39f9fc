use meritdash::config::Config;
use meritdash::data::{
    load_demand, load_parameters, load_registry, validate_schema, DatasetKind, Datasets,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_csv(path: &Path, header: &str, rows: &[&str]) {
    let mut out = String::new();
    out.push_str(header);
    out.push('\n');
    for row in rows {
        out.push_str(row);
        out.push('\n');
    }
    fs::write(path, out).unwrap();
}

fn config_for(dir: &TempDir) -> Config {
    let mut cfg = Config::from_env();
    cfg.data_dir = dir.path().to_path_buf();
    cfg.registry_csv = "clean_db.csv".to_string();
    cfg.parameters_csv = "parameters.csv".to_string();
    cfg.demand_csv = "demand_stats.csv".to_string();
    cfg
}

#[test]
fn registry_optional_columns_may_be_blank() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clean_db.csv");
    write_csv(
        &path,
        ",name_g,country,type_g,capacity_g,eff,lat,lon",
        &[
            "0,Lavrio,Greece,Fossil Gas,1002.0,0.52,37.7,24.05",
            "1,\"Plant, with comma\",Greece,Solar,20.5,,,",
        ],
    );
    let (gens, manifest) = load_registry(&path).unwrap();
    assert_eq!(gens.len(), 2);
    assert_eq!(manifest.bad_rows, 0);
    assert_eq!(gens[1].name, "Plant, with comma");
    assert_eq!(gens[1].efficiency, None);
    assert_eq!(gens[1].coordinates(), None);
    assert_eq!(gens[0].emissions, None);
    assert_eq!(manifest.hash_sha256.len(), 64);
}

#[test]
fn registry_bad_rows_are_counted_and_skipped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clean_db.csv");
    write_csv(
        &path,
        "name_g,country,type_g,capacity_g,eff,lat,lon",
        &[
            "A,Greece,Nuclear,not-a-number,0.3,,",
            "B,Greece,Nuclear,100,0.3,,",
        ],
    );
    let (gens, manifest) = load_registry(&path).unwrap();
    assert_eq!(gens.len(), 1);
    assert_eq!(manifest.bad_rows, 1);
    assert!(manifest.warnings[0].starts_with("bad_row 2"));
}

#[test]
fn missing_required_column_fails_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("parameters.csv");
    write_csv(&path, "type_g,Emissions (gr/kWh)", &["Nuclear,0"]);
    assert!(load_parameters(&path).is_err());
    let report = validate_schema(&path, DatasetKind::Parameters).unwrap();
    assert!(!report.ok);
    assert_eq!(report.missing, vec!["Cost (EUR/Mwh)"]);
}

#[test]
fn parameters_keep_first_duplicate() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("parameters.csv");
    write_csv(
        &path,
        "type_g,Cost (EUR/Mwh),Emissions (gr/kWh),Capacity Factor",
        &["Nuclear,5,0,0.9", "Fossil Gas,25,202,", "Nuclear,99,0,0.1"],
    );
    let (params, manifest) = load_parameters(&path).unwrap();
    assert_eq!(params.len(), 2);
    assert_eq!(params[0].cost, 5.0);
    assert_eq!(params[1].capacity_factor, None);
    assert_eq!(manifest.warnings, vec!["duplicate_technology: Nuclear"]);
}

#[test]
fn demand_table_lookup() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("demand_stats.csv");
    write_csv(&path, "country,min,max", &["Greece,3.9,9.2", "Bulgaria,2.8,7.4"]);
    let (table, _) = load_demand(&path).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.get("Greece").unwrap().max, 9.2);
    assert!(table.get("Spain").is_none());
}

#[test]
fn datasets_load_without_demand_file() {
    let dir = TempDir::new().unwrap();
    write_csv(
        &dir.path().join("clean_db.csv"),
        "name_g,country,type_g,capacity_g,eff,lat,lon",
        &["A,Greece,Nuclear,100,0.3,40,22"],
    );
    write_csv(&dir.path().join("parameters.csv"), "type_g,Cost (EUR/Mwh)", &["Nuclear,5"]);
    let ds = Datasets::load(&config_for(&dir)).unwrap();
    assert_eq!(ds.registry.len(), 1);
    assert!(ds.demand.is_empty());
    assert_eq!(ds.manifests.len(), 2);
}

#[test]
fn bundled_sample_data_loads() {
    let mut cfg = Config::from_env();
    cfg.data_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
    if !cfg.registry_path().exists() {
        eprintln!("SKIP: {} not found", cfg.registry_path().display());
        return;
    }
    let ds = Datasets::load(&cfg).unwrap();
    assert!(ds.registry.countries().contains(&"Greece".to_string()));
    assert!(ds.demand.get("Greece").is_some());
    assert!(ds.manifests.iter().all(|m| m.bad_rows == 0));
}
