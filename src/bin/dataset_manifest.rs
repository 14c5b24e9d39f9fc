//! Writes `<file>.manifest.json` next to each reference CSV.
//!
//! Usage: cargo run --bin dataset_manifest   (paths from DATA_DIR / *_CSV env vars)

use meritdash::config::Config;
use meritdash::data::{
    default_manifest_path, load_demand, load_parameters, load_registry, validate_schema, DatasetKind,
    DatasetManifest,
};
use serde_json::json;
use std::fs;
use std::path::Path;

fn manifest_for(kind: DatasetKind, path: &Path) -> anyhow::Result<DatasetManifest> {
    Ok(match kind {
        DatasetKind::Registry => load_registry(path)?.1,
        DatasetKind::Parameters => load_parameters(path)?.1,
        DatasetKind::Demand => load_demand(path)?.1,
    })
}

fn main() {
    let cfg = Config::from_env();
    let targets = [
        (DatasetKind::Registry, cfg.registry_path()),
        (DatasetKind::Parameters, cfg.parameters_path()),
        (DatasetKind::Demand, cfg.demand_path()),
    ];

    let mut failures = 0;
    for (kind, path) in targets.iter() {
        let schema = match validate_schema(path, *kind) {
            Ok(s) => s,
            Err(err) => {
                eprintln!("{}: schema check failed: {:#}", kind.as_str(), err);
                failures += 1;
                continue;
            }
        };
        if !schema.ok {
            eprintln!("{}: {}", kind.as_str(), schema.message);
            failures += 1;
            continue;
        }

        let manifest = match manifest_for(*kind, path) {
            Ok(m) => m,
            Err(err) => {
                eprintln!("{}: analysis failed: {:#}", kind.as_str(), err);
                failures += 1;
                continue;
            }
        };

        let out_path = default_manifest_path(path);
        let payload = json!({ "manifest": manifest, "schema": schema });
        let written = serde_json::to_string_pretty(&payload)
            .map_err(anyhow::Error::from)
            .and_then(|s| fs::write(&out_path, s).map_err(anyhow::Error::from));
        match written {
            Ok(()) => println!(
                "wrote manifest {} (rows={} bad_rows={})",
                out_path.display(),
                manifest.row_count,
                manifest.bad_rows
            ),
            Err(err) => {
                eprintln!("failed to write {}: {}", out_path.display(), err);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
}
