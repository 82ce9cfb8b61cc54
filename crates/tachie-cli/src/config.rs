//! Locates and parses the TOML settings file.

use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};

use tachie::{TachieError, config::AppConfig};

/// Candidate settings files, most specific first.
fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("tachie/config.toml")];
    if let Some(dirs) = ProjectDirs::from("com", "tachie", "tachie") {
        paths.push(dirs.config_dir().join("config.toml"));
    }
    paths
}

/// Loads `explicit` if given, otherwise the first settings file that exists.
///
/// Without any file the built-in defaults apply.
///
/// # Errors
///
/// Returns [`TachieError::Config`] if the chosen file cannot be read or is
/// not valid TOML for [`AppConfig`].
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, TachieError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match search_paths().into_iter().find(|path| path.exists()) {
            Some(path) => path,
            None => {
                debug!("No settings file found, using defaults");
                return Ok(AppConfig::default());
            }
        },
    };

    info!(path:?; "Loading settings");
    let content = fs::read_to_string(&path)
        .map_err(|err| TachieError::Config(format!("cannot read `{}`: {err}", path.display())))?;
    toml::from_str(&content)
        .map_err(|err| TachieError::Config(format!("invalid TOML in `{}`: {err}", path.display())))
}
