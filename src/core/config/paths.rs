use std::env;
use std::fs;
use std::path::PathBuf;

/// Filesystem layout for the service.
///
/// Everything lives under one data directory so a deployment can be moved
/// or wiped as a unit. The vector index snapshot and the update ledger sit
/// side by side; the ledger is only meaningful relative to the index it
/// was written with.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub docs_dir: PathBuf,
    pub log_dir: PathBuf,
    pub index_path: PathBuf,
    pub ledger_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let data_dir = discover_data_dir();
        Self::with_data_dir(data_dir)
    }

    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        let docs_dir = env::var("ETF_ADVISOR_DOCS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("docs"));
        let log_dir = data_dir.join("logs");
        let index_path = data_dir.join("vector_index.json");
        let ledger_path = data_dir.join("update_ledger.json");

        for dir in [&data_dir, &docs_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            data_dir,
            docs_dir,
            log_dir,
            index_path,
            ledger_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_data_dir() -> PathBuf {
    if let Ok(dir) = env::var("ETF_ADVISOR_DATA_DIR") {
        return PathBuf::from(dir);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").exists() {
        return manifest_dir.join("data");
    }

    env::current_dir()
        .map(|cwd| cwd.join("data"))
        .unwrap_or_else(|_| manifest_dir.join("data"))
}
