use std::path::PathBuf;

use crate::helix::HelixConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    /// Set when `ENABLE_FILE_LOGS` is on; `LOG_DIR` or `./logs`.
    pub log_dir: Option<PathBuf>,
    pub state_path: Option<PathBuf>,
    pub helix: HelixConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let file_logs = std::env::var("ENABLE_FILE_LOGS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let log_dir = file_logs.then(|| {
            std::env::var("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./logs"))
        });

        let state_path = std::env::var("HELIX_STATE_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Self {
            log_level,
            log_dir,
            state_path,
            helix: HelixConfig::from_env(),
        }
    }
}
