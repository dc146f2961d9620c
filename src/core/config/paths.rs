use std::env;
use std::fs;
use std::path::PathBuf;

/// Filesystem layout for everything the service persists: the query-result
/// cache, the query history, the feedback log, logs and secrets.
///
/// Debug builds keep data next to the project so a dev run is
/// self-contained; release builds use the platform data dir. `LYRA_ROOT`
/// and `LYRA_DATA_DIR` override either half.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub query_cache_path: PathBuf,
    pub history_path: PathBuf,
    pub feedback_path: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = project_root();
        let user_data_dir = user_data_dir(&project_root);

        let log_dir = user_data_dir.join("logs");
        for dir in [&user_data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            query_cache_path: user_data_dir.join("query_cache.json"),
            history_path: user_data_dir.join("query_history.json"),
            feedback_path: user_data_dir.join("user_feedback.json"),
            secrets_path: user_data_dir.join("secrets.yaml"),
            log_dir,
            project_root,
            user_data_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn project_root() -> PathBuf {
    if let Ok(root) = env::var("LYRA_ROOT") {
        return PathBuf::from(root);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").exists() {
        manifest_dir
    } else {
        env::current_dir().unwrap_or(manifest_dir)
    }
}

fn user_data_dir(project_root: &std::path::Path) -> PathBuf {
    if let Ok(dir) = env::var("LYRA_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if cfg!(debug_assertions) {
        return project_root.to_path_buf();
    }

    platform_data_dir()
}

fn platform_data_dir() -> PathBuf {
    if cfg!(target_os = "windows") {
        let base = env::var("LOCALAPPDATA")
            .or_else(|_| env::var("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));
        base.join("Lyra")
    } else if cfg!(target_os = "macos") {
        home_dir().join("Library/Application Support").join("Lyra")
    } else {
        let base = env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir().join(".local/share"));
        base.join("lyra")
    }
}

fn home_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}
