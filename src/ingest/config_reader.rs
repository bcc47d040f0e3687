use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::ingest::*;

pub const DEFAULT_STORE_PATH: &str = "data/store.json";
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// The content of the configuration file.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(rename = "storePath")]
    pub store_path: Option<String>,
    #[serde(rename = "uploadDir")]
    pub upload_dir: Option<String>,
}

/// Where the store and the staged uploads live.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Locations {
    pub store_path: PathBuf,
    pub upload_dir: PathBuf,
}

pub fn read_config(path: &Path) -> IngestResult<ImportConfig> {
    let contents = fs::read_to_string(path).context(OpeningConfigSnafu { path })?;
    let config: ImportConfig =
        serde_json::from_str(&contents).context(ParsingConfigSnafu { path })?;
    debug!("read_config: {:?}: {:?}", path, config);
    Ok(config)
}

/// Resolves the locations: command-line values first, then the
/// configuration file (relative to its own directory), then the defaults.
pub fn resolve_locations(
    config_path: Option<&Path>,
    store_override: Option<&str>,
    upload_override: Option<&str>,
) -> IngestResult<Locations> {
    let (config, root) = match config_path {
        Some(p) => (
            read_config(p)?,
            p.parent().map(|d| d.to_path_buf()).unwrap_or_default(),
        ),
        None => (ImportConfig::default(), PathBuf::new()),
    };

    let store_path = match (store_override, config.store_path) {
        (Some(s), _) => PathBuf::from(s),
        (None, Some(s)) => root.join(s),
        (None, None) => PathBuf::from(DEFAULT_STORE_PATH),
    };
    let upload_dir = match (upload_override, config.upload_dir) {
        (Some(s), _) => PathBuf::from(s),
        (None, Some(s)) => root.join(s),
        (None, None) => PathBuf::from(DEFAULT_UPLOAD_DIR),
    };
    Ok(Locations {
        store_path,
        upload_dir,
    })
}
