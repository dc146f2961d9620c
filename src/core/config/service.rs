use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use crate::core::errors::ApiError;

/// Loads the public `config.yml` with the `secrets.yaml` overlay merged on
/// top.
///
/// Secrets (the search API key and engine id, runner tokens) live in a
/// separate file under the user data dir so the public config can be
/// checked in or shared freely. Either file may be absent; a missing or
/// malformed file contributes an empty mapping.
#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    /// The public config file: `LYRA_CONFIG_PATH` if set, then a per-user
    /// copy under the data dir, then the one shipped at the project root.
    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("LYRA_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_copy = self.paths.user_data_dir.join("config.yml");
        if user_copy.exists() {
            user_copy
        } else {
            self.paths.project_root.join("config.yml")
        }
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    pub fn load_config(&self) -> Result<Value, ApiError> {
        let mut config = read_yaml_mapping(&self.config_path());
        overlay(&mut config, read_yaml_mapping(&self.secrets_path()));
        Ok(config)
    }
}

/// Reads a YAML file as a JSON object. Anything that is not a readable
/// mapping becomes an empty one.
fn read_yaml_mapping(path: &Path) -> Value {
    let parsed = fs::read_to_string(path)
        .ok()
        .and_then(|contents| serde_yaml::from_str::<Value>(&contents).ok());

    match parsed {
        Some(value @ Value::Object(_)) => value,
        _ => Value::Object(Map::new()),
    }
}

/// Recursively merges `overlay_value` into `base` in place. Objects merge
/// key by key; any other value replaces the base value outright.
fn overlay(base: &mut Value, overlay_value: Value) {
    match (base, overlay_value) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => overlay(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay_value) => *base = overlay_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overlay_merges_nested_objects_and_replaces_scalars() {
        let mut base = json!({
            "a": 1,
            "b": { "c": 2, "d": 3 },
            "arr": [1, 2]
        });
        overlay(
            &mut base,
            json!({
                "b": { "c": 99 },
                "arr": [3],
                "e": "x"
            }),
        );

        assert_eq!(
            base,
            json!({
                "a": 1,
                "b": { "c": 99, "d": 3 },
                "arr": [3],
                "e": "x"
            })
        );
    }

    #[test]
    fn overlay_on_empty_base_takes_the_overlay() {
        let mut base = json!({});
        overlay(&mut base, json!({ "search": { "api_key": "k" } }));
        assert_eq!(base["search"]["api_key"], "k");
    }

    #[test]
    fn missing_files_read_as_empty_mappings() {
        let value = read_yaml_mapping(Path::new("/nonexistent/config.yml"));
        assert_eq!(value, json!({}));
    }
}
