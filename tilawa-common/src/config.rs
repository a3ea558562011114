//! Configuration file and root folder resolution

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory name used under the platform config/data directories
const APP_DIR: &str = "tilawa";

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. `root_folder` key of the TOML config file (explicit path, else platform default)
/// 4. OS-dependent compiled default
pub fn resolve_root_folder(
    cli_arg: Option<&str>,
    env_var_name: &str,
    config_file: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(path) = cli_arg {
        debug!("Root folder from command line: {}", path);
        return Ok(PathBuf::from(path));
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            debug!("Root folder from {}: {}", env_var_name, path);
            return Ok(PathBuf::from(path));
        }
    }

    let config_path = match config_file {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file().ok(),
    };

    if let Some(config_path) = config_path {
        if let Some(root_folder) = read_root_folder_key(&config_path) {
            debug!("Root folder from {}: {}", config_path.display(), root_folder.display());
            return Ok(root_folder);
        }
    }

    Ok(default_root_folder())
}

fn read_root_folder_key(config_path: &Path) -> Option<PathBuf> {
    let toml_content = std::fs::read_to_string(config_path).ok()?;
    let config = toml::from_str::<toml::Value>(&toml_content).ok()?;
    config
        .get("root_folder")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
}

/// Locate the platform configuration file
///
/// Linux checks `~/.config/tilawa/config.toml` then `/etc/tilawa/config.toml`.
pub fn find_config_file() -> Result<PathBuf> {
    let config_path = if cfg!(target_os = "linux") {
        let user_config = dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"));
        let system_config = PathBuf::from("/etc/tilawa/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::NotFound("No config file found".to_string()));
    } else if cfg!(any(target_os = "macos", target_os = "windows")) {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR).join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?
    } else {
        return Err(Error::Config("Unsupported platform".to_string()));
    };

    if config_path.exists() {
        Ok(config_path)
    } else {
        Err(Error::NotFound(format!("Config file {:?}", config_path)))
    }
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("/var/lib/tilawa"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/tilawa"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\tilawa"))
    } else {
        PathBuf::from("./tilawa_data")
    }
}
