use anyhow::Result;
use std::path::PathBuf;

pub const ENV_CONFIG_FILE: &str = "LAUNCHER_SETUP_CONFIG";
pub const ENV_LOG_DIR: &str = "LAUNCHER_SETUP_LOG_DIR";

const APP_DIR: &str = "launcher-setup";

/// Resolve deployment folder (absolute path)
pub fn resolve_deployment_folder() -> PathBuf {
    // Prefer the folder where the binary is running from
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(dir) = exe_path.parent() {
            return dir.to_path_buf();
        }
    }

    // Fallback: current working directory
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Resolve log folder (absolute path), creating it when missing.
///
/// Order: `LAUNCHER_SETUP_LOG_DIR`, then `<data_local_dir>/launcher-setup/logs`, then
/// `<deployment folder>/logs`.
pub fn resolve_log_folder() -> Result<PathBuf> {
    let dir = std::env::var_os(ENV_LOG_DIR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::data_local_dir().map(|d| d.join(APP_DIR).join("logs")))
        .unwrap_or_else(|| resolve_deployment_folder().join("logs"));

    std::fs::create_dir_all(&dir)
        .map_err(|e| anyhow::anyhow!("Failed to create log folder {:?}: {}", dir, e))?;
    Ok(dir)
}

/// Config file location. The file itself is optional.
pub fn resolve_config_file() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os(ENV_CONFIG_FILE).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(explicit));
    }
    dirs::config_dir().map(|d| d.join(APP_DIR).join("setup.toml"))
}
