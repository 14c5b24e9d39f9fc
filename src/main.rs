use anyhow::{Context, Result};
use meritdash::config::Config;
use meritdash::data::Datasets;
use meritdash::logging::{log, obj, v_str, Domain, Level};
use meritdash::server;
use meritdash::session::{Session, ViewLog};
use serde_json::json;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let datasets = Datasets::load(&cfg).context("loading reference datasets")?;

    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("data_dir", v_str(&cfg.data_dir.display().to_string())),
            ("generators", json!(datasets.registry.len())),
            ("technologies", json!(datasets.parameters.len())),
            ("demand_countries", json!(datasets.demand.len())),
            ("default_countries", json!(cfg.default_countries)),
        ]),
    );

    let mut session = Session::from_datasets(datasets, &cfg);
    session.subscribe(Box::new(ViewLog));

    server::serve(&cfg.listen_addr(), session).await
}
