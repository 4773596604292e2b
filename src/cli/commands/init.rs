//! `mnemex init`: create the database (applying the schema) and write out a
//! default `config.json` under the platform data directory.

use crate::config::{self, Config};
use crate::error::{Error, Result};
use crate::storage::Store;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct InitOutput {
    database: PathBuf,
    config: Option<PathBuf>,
}

/// # Errors
///
/// Returns an error if the database already exists and `force` is not set,
/// or if the database/config file cannot be created.
pub fn execute(db: Option<&PathBuf>, force: bool, json: bool) -> Result<()> {
    let db_path = config::resolve_db_path(db.cloned())?;

    if db_path.exists() && !force {
        return Err(Error::Validation(format!(
            "database already exists at {}; pass --force to reinitialize",
            db_path.display()
        )));
    }

    Store::open(&db_path)?.close();

    let config_path = config::config_file_path();
    if let Some(path) = &config_path {
        if !path.exists() || force {
            Config::default().save()?;
        }
    }

    if json {
        let output = InitOutput { database: db_path, config: config_path };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Initialized mnemex database at {}", db_path.display());
        if let Some(path) = config_path {
            println!("Configuration: {}", path.display());
        }
    }

    Ok(())
}
