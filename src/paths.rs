use std::path::PathBuf;
use std::sync::OnceLock;

const APP_DIR_NAME: &str = "race-score-overlay";

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the per-user data directory, falling back to `<exe_dir>/data/`.
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| get_exe_dir().join("data"))
}

/// `<data_dir>/scores.json`
pub fn default_ledger_path() -> PathBuf {
    get_data_dir().join("scores.json")
}

/// `<data_dir>/history.csv`
pub fn default_history_path() -> PathBuf {
    get_data_dir().join("history.csv")
}

/// `<data_dir>/overlay.txt`
pub fn default_overlay_path() -> PathBuf {
    get_data_dir().join("overlay.txt")
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    std::fs::create_dir_all(get_data_dir())?;
    Ok(())
}
