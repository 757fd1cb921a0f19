use std::{env, path::{Path, PathBuf}};

use color_eyre::Result;
use directories::BaseDirs;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::debug;

use crate::core::{FilterMode, FilterType};
use crate::services::FieldCatalog;

const CONFIG: &str = include_str!("../.config/config.json5");

/// How the resulting filter is printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
    Outline,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct FilterSettings {
    #[serde(default)]
    pub mode: FilterMode,
    #[serde(default)]
    pub filter_type: FilterType,
    #[serde(default)]
    pub output: OutputFormat,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct FieldSettings {
    #[serde(default)]
    pub dimensions: FieldCatalog,
    #[serde(default)]
    pub metrics: FieldCatalog,
}

impl FieldSettings {
    /// The catalog for `filter_type`; `None` when the list is empty
    pub fn catalog(&self, filter_type: FilterType) -> Option<&FieldCatalog> {
        let catalog = match filter_type {
            FilterType::Dimension => &self.dimensions,
            FilterType::Metric => &self.metrics,
        };
        (!catalog.is_empty()).then_some(catalog)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub filter: FilterSettings,
    #[serde(default)]
    pub fields: FieldSettings,
}

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref CONFIG_FOLDER: Option<PathBuf> =
        env::var(format!("{}_CONFIG", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
}

impl Config {
    /// Load the embedded defaults, then layer a user file over them.
    ///
    /// An explicit `config_path` must exist. Without one, the file in the
    /// config folder (`$GA4FILTER_CONFIG`, else `~/.ga4filter.json5`) is read
    /// when present.
    pub fn from_path(config_path: Option<&PathBuf>) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(CONFIG, config::FileFormat::Json5));

        let (user_path, required) = match config_path {
            Some(p) => (expand_tilde(p), true),
            None => (default_user_config_path(), false),
        };

        debug!(path = %user_path.display(), required, "loading user config");
        builder
            .add_source(config::File::from(user_path).format(config::FileFormat::Json5).required(required))
            .build()?
            .try_deserialize()
    }

    /// The embedded defaults alone
    pub fn embedded() -> Result<Self> {
        Ok(json5::from_str(CONFIG)?)
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(s) = path.to_str()
        && s.starts_with('~')
        && let Some(base) = BaseDirs::new()
    {
        return PathBuf::from(s.replacen('~', &base.home_dir().to_string_lossy(), 1));
    }
    path.to_path_buf()
}

fn default_user_config_path() -> PathBuf {
    let home = BaseDirs::new().map(|base| base.home_dir().to_path_buf());
    user_config_path(CONFIG_FOLDER.as_deref(), home.as_deref())
}

/// `config.json5` in the config folder, else `.ga4filter.json5` in home
fn user_config_path(config_folder: Option<&Path>, home: Option<&Path>) -> PathBuf {
    match (config_folder, home) {
        (Some(dir), _) => dir.join("config.json5"),
        (None, Some(home)) => home.join(".ga4filter.json5"),
        (None, None) => PathBuf::from(".ga4filter.json5"),
    }
}
