// Loads settings, opens the database and optionally populates it from a
// JSON document given as the first argument.
use std::path::PathBuf;
use std::process::ExitCode;

use atomicdb::construct::Database;
use atomicdb::load::load_from_file;
use atomicdb::settings::Settings;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn run(document: Option<PathBuf>, settings: &Settings) -> atomicdb::Result<()> {
    let mut database = Database::with_settings(settings)?;
    info!(persistent = database.is_persistent(), policy = ?settings.fact_policy, "database opened");
    if let Some(path) = document {
        let document = load_from_file(&path)?;
        database.load(&document)?;
    }
    info!(
        entities = database.entities().len(),
        attributes = database.attributes().len(),
        facts = database.fact_keeper().len(),
        rules = database.rules().len(),
        "ready"
    );
    Ok(())
}

fn main() -> ExitCode {
    let config = std::env::var_os("ATOMICDB_CONFIG").map(PathBuf::from);
    let settings = match Settings::load(config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(std::env::args_os().nth(1).map(PathBuf::from), &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "failed");
            ExitCode::FAILURE
        }
    }
}
