//! Reference dataset loading: registry, fuel parameters, demand bands.
//!
//! Each CSV is read once at startup. Rows that fail to deserialize are
//! counted and skipped; a missing required column fails the load.

mod records;

pub use records::{DemandBand, DemandTable, FuelParameter, Generator, Registry};

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::logging::{log, log_dataset_loaded, obj, v_str, Domain, Level};
use records::DemandRecord;

pub const REGISTRY_COLUMNS: [&str; 7] = ["name_g", "country", "type_g", "capacity_g", "eff", "lat", "lon"];
pub const PARAMETER_COLUMNS: [&str; 2] = ["type_g", "Cost (EUR/Mwh)"];
pub const DEMAND_COLUMNS: [&str; 3] = ["country", "min", "max"];

/// Cap on per-file warnings kept in a manifest.
const MAX_WARNINGS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Registry,
    Parameters,
    Demand,
}

impl DatasetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Registry => "registry",
            DatasetKind::Parameters => "parameters",
            DatasetKind::Demand => "demand",
        }
    }

    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            DatasetKind::Registry => &REGISTRY_COLUMNS,
            DatasetKind::Parameters => &PARAMETER_COLUMNS,
            DatasetKind::Demand => &DEMAND_COLUMNS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub kind: DatasetKind,
    pub path: String,
    pub hash_sha256: String,
    pub row_count: u64,
    pub bad_rows: u64,
    pub columns: Vec<String>,
    pub warnings: Vec<String>,
    pub generated_at_epoch: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaReport {
    pub columns: Vec<String>,
    pub missing: Vec<String>,
    pub ok: bool,
    pub message: String,
}

/// Everything the dashboard reads at startup.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub registry: Registry,
    pub parameters: Vec<FuelParameter>,
    pub demand: DemandTable,
    pub manifests: Vec<DatasetManifest>,
}

impl Datasets {
    pub fn load(cfg: &Config) -> Result<Self> {
        let (generators, registry_manifest) = load_registry(&cfg.registry_path())?;
        let (parameters, parameters_manifest) = load_parameters(&cfg.parameters_path())?;

        let mut manifests = vec![registry_manifest, parameters_manifest];
        let demand_path = cfg.demand_path();
        let demand = if demand_path.exists() {
            let (demand, manifest) = load_demand(&demand_path)?;
            manifests.push(manifest);
            demand
        } else {
            log(
                Level::Warn,
                Domain::Data,
                "demand_missing",
                obj(&[("path", v_str(&demand_path.display().to_string()))]),
            );
            DemandTable::default()
        };

        for m in &manifests {
            log_dataset_loaded(m.kind.as_str(), &m.path, m.row_count, m.bad_rows, &m.hash_sha256);
        }

        Ok(Self {
            registry: Registry::new(generators),
            parameters,
            demand,
            manifests,
        })
    }
}

pub fn load_registry(path: &Path) -> Result<(Vec<Generator>, DatasetManifest)> {
    read_records::<Generator>(path, DatasetKind::Registry)
}

/// Loads technology parameters. A technology listed twice keeps its first row.
pub fn load_parameters(path: &Path) -> Result<(Vec<FuelParameter>, DatasetManifest)> {
    let (rows, mut manifest) = read_records::<FuelParameter>(path, DatasetKind::Parameters)?;
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(rows.len());
    for p in rows {
        if seen.insert(p.technology.clone()) {
            out.push(p);
        } else {
            push_warning(&mut manifest.warnings, format!("duplicate_technology: {}", p.technology));
        }
    }
    Ok((out, manifest))
}

/// Loads per-country demand bands. A country listed twice keeps its first row.
pub fn load_demand(path: &Path) -> Result<(DemandTable, DatasetManifest)> {
    let (rows, mut manifest) = read_records::<DemandRecord>(path, DatasetKind::Demand)?;
    let mut bands = BTreeMap::new();
    for r in rows {
        if bands.contains_key(&r.country) {
            push_warning(&mut manifest.warnings, format!("duplicate_country: {}", r.country));
            continue;
        }
        bands.insert(r.country, DemandBand { min: r.min, max: r.max });
    }
    Ok((DemandTable::new(bands), manifest))
}

fn read_records<T: DeserializeOwned>(path: &Path, kind: DatasetKind) -> Result<(Vec<T>, DatasetManifest)> {
    let hash = file_sha256(path)?;
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(file);

    let columns: Vec<String> = reader
        .headers()
        .with_context(|| format!("reading header of {}", path.display()))?
        .iter()
        .map(|s| s.to_string())
        .collect();
    let schema = check_columns(&columns, kind.required_columns());
    if !schema.ok {
        bail!("{} ({}): {}", path.display(), kind.as_str(), schema.message);
    }

    let mut rows = Vec::new();
    let mut bad_rows = 0u64;
    let mut warnings = Vec::new();
    for (idx, result) in reader.deserialize::<T>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(err) => {
                bad_rows += 1;
                // +2: 1-based and the header line
                push_warning(&mut warnings, format!("bad_row {}: {}", idx + 2, err));
            }
        }
    }

    let manifest = DatasetManifest {
        kind,
        path: path.display().to_string(),
        hash_sha256: hash,
        row_count: rows.len() as u64,
        bad_rows,
        columns,
        warnings,
        generated_at_epoch: chrono::Utc::now().timestamp() as u64,
    };
    Ok((rows, manifest))
}

fn push_warning(warnings: &mut Vec<String>, warning: String) {
    if warnings.len() < MAX_WARNINGS {
        warnings.push(warning);
    }
}

fn check_columns(columns: &[String], required: &[&str]) -> SchemaReport {
    let missing: Vec<String> = required
        .iter()
        .filter(|c| !columns.iter().any(|h| h == *c))
        .map(|c| c.to_string())
        .collect();
    let ok = missing.is_empty();
    let message = if ok {
        "schema ok".to_string()
    } else {
        format!("missing columns {:?} in {:?}", missing, columns)
    };
    SchemaReport {
        columns: columns.to_vec(),
        missing,
        ok,
        message,
    }
}

pub fn validate_schema(path: &Path, kind: DatasetKind) -> Result<SchemaReport> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(file);
    let columns: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
    Ok(check_columns(&columns, kind.required_columns()))
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn default_manifest_path(dataset_path: &Path) -> PathBuf {
    let mut p = dataset_path.to_path_buf();
    let fname = dataset_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset.csv");
    p.set_file_name(format!("{}.manifest.json", fname));
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_columns_reports_missing() {
        let cols = vec!["type_g".to_string()];
        let report = check_columns(&cols, &PARAMETER_COLUMNS);
        assert!(!report.ok);
        assert_eq!(report.missing, vec!["Cost (EUR/Mwh)"]);
    }

    #[test]
    fn check_columns_allows_extra() {
        let cols: Vec<String> = ["", "country", "min", "max", "mean"].iter().map(|s| s.to_string()).collect();
        assert!(check_columns(&cols, &DEMAND_COLUMNS).ok);
    }

    #[test]
    fn manifest_path_sits_next_to_dataset() {
        let p = default_manifest_path(Path::new("data/clean_db.csv"));
        assert_eq!(p, PathBuf::from("data/clean_db.csv.manifest.json"));
    }
}
