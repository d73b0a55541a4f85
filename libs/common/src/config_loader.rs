//! Configuration loading helper functions
//!
//! Layers, lowest priority first: `T::default()`, the optional config file
//! (format picked by extension), then prefixed environment variables with
//! `__` separating nested keys (`VFDMASTER_SERIAL__DEVICE=/dev/ttyUSB0`).

use std::path::Path;

use errors::{config_error, VfdResult};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

/// Build the figment for a service configuration
pub fn config_figment<T>(path: Option<&Path>, env_prefix: &str) -> VfdResult<Figment>
where
    T: Serialize + Default,
{
    let mut figment = Figment::from(Serialized::defaults(T::default()));

    if let Some(path) = path {
        if path.exists() {
            let extension = path
                .extension()
                .and_then(|s| s.to_str())
                .ok_or_else(|| config_error!("Config file must have an extension: {:?}", path))?;

            figment = match extension {
                "toml" => figment.merge(Toml::file(path)),
                "yaml" | "yml" => figment.merge(Yaml::file(path)),
                "json" => figment.merge(Json::file(path)),
                _ => {
                    return Err(config_error!(
                        "Unsupported config file format: {}",
                        extension
                    ))
                },
            };
            debug!("Config file: {:?}", path);
        } else {
            warn!("Config file {:?} not found, using defaults", path);
        }
    }

    Ok(figment.merge(Env::prefixed(env_prefix).split("__")))
}

/// Load configuration from defaults, an optional file and the environment
pub fn load_config<T>(path: Option<&Path>, env_prefix: &str) -> VfdResult<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    Ok(config_figment::<T>(path, env_prefix)?.extract()?)
}

/// Render a configuration as YAML (used by `--validate`)
pub fn dump_config<T: Serialize>(config: &T) -> VfdResult<String> {
    Ok(serde_yaml::to_string(config)?)
}
