use crate::error::{GeoroiError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const EE_PROJECT: &str = "EE_PROJECT";
pub const EE_SERVICE_ACCOUNT: &str = "EE_SERVICE_ACCOUNT";
pub const EE_KEY_FILE: &str = "EE_KEY_FILE";
pub const RDTR_PATH: &str = "RDTR_PATH";
pub const STORAGE_DIR: &str = "STORAGE_DIR";
pub const ROI_DIR: &str = "ROI_DIR";
pub const INTERSECT_DIR: &str = "INTERSECT_DIR";
pub const DEFAULT_UTM_EPSG: &str = "DEFAULT_UTM_EPSG";

/// Every recognised key with its default (empty means unset).
const KEYS: [(&str, &str); 8] = [
    (EE_PROJECT, ""),
    (EE_SERVICE_ACCOUNT, ""),
    (EE_KEY_FILE, ""),
    (RDTR_PATH, "./Kawasan_Konservasi/Kawasan_Konservasi.shp"),
    (STORAGE_DIR, "./data"),
    (ROI_DIR, "./data/rois"),
    (INTERSECT_DIR, "./data/intersections"),
    (DEFAULT_UTM_EPSG, "32749"),
];

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from the `.env` file
    File,
    /// Loaded from environment variable
    Environment,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Raw settings collected from defaults, the `.env` file and the environment.
///
/// Values stay as strings until [`LayeredSettings::resolve`] so that the
/// source of each one can still be reported when parsing fails.
#[derive(Debug, Clone)]
pub struct LayeredSettings {
    values: BTreeMap<&'static str, ConfigValue<String>>,
}

impl LayeredSettings {
    /// Create settings holding only the built-in defaults
    pub fn with_defaults() -> Self {
        let values = KEYS
            .iter()
            .map(|(key, default)| {
                (*key, ConfigValue::new(default.to_string(), ConfigSource::Default))
            })
            .collect();
        Self { values }
    }

    /// Layer values from a dotenv file. Unknown keys are ignored.
    pub fn load_from_env_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let iter = dotenvy::from_path_iter(path.as_ref()).map_err(|e| GeoroiError::ConfigInvalid {
            key: "env_file".to_string(),
            reason: format!("Failed to read {}: {}", path.as_ref().display(), e),
        })?;

        for item in iter {
            let (key, value) = item.map_err(|e| GeoroiError::ConfigInvalid {
                key: "env_file".to_string(),
                reason: format!("Failed to parse {}: {}", path.as_ref().display(), e),
            })?;
            self.set(&key, value, ConfigSource::File);
        }

        Ok(self)
    }

    /// Layer values from the process environment
    pub fn load_from_env(self) -> Self {
        self.load_from_lookup(|key| env::var(key).ok())
    }

    /// Layer values from an arbitrary lookup, treated as environment values
    pub fn load_from_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        for (key, _) in KEYS {
            if let Some(value) = lookup(key) {
                self.set(key, value, ConfigSource::Environment);
            }
        }
        self
    }

    fn set(&mut self, key: &str, value: String, source: ConfigSource) {
        if let Some(entry) = self.values.get_mut(key) {
            entry.update(value, source);
        }
    }

    fn raw(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.value.trim())
            .filter(|v| !v.is_empty())
    }

    /// Source of a key's current value
    pub fn source_of(&self, key: &str) -> Option<ConfigSource> {
        self.values.get(key).map(|v| v.source)
    }

    /// Get all configuration values as a map for inspection.
    ///
    /// The key file path is shown, never its contents.
    pub fn to_inspection_map(&self) -> BTreeMap<String, (String, ConfigSource)> {
        self.values
            .iter()
            .map(|(key, v)| (key.to_string(), (v.value.clone(), v.source)))
            .collect()
    }

    /// Parse the layered values into typed settings
    pub fn resolve(&self) -> Result<Settings> {
        let path = |key: &str| PathBuf::from(self.raw(key).unwrap_or_default());

        let epsg_raw = self.raw(DEFAULT_UTM_EPSG).unwrap_or("32749");
        let default_utm_epsg = epsg_raw.parse::<u32>().map_err(|_| GeoroiError::ConfigInvalid {
            key: DEFAULT_UTM_EPSG.to_string(),
            reason: format!("expected integer EPSG code, got '{}'", epsg_raw),
        })?;

        Ok(Settings {
            ee_project: self.raw(EE_PROJECT).unwrap_or_default().to_string(),
            ee_service_account: self.raw(EE_SERVICE_ACCOUNT).map(str::to_string),
            ee_key_file: self.raw(EE_KEY_FILE).map(PathBuf::from),
            rdtr_path: path(RDTR_PATH),
            storage_dir: path(STORAGE_DIR),
            roi_dir: path(ROI_DIR),
            intersect_dir: path(INTERSECT_DIR),
            default_utm_epsg,
        })
    }
}

/// Process-wide settings, immutable once loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Earth Engine cloud project id. Required before a session can be opened.
    pub ee_project: String,
    pub ee_service_account: Option<String>,
    /// Service-account JSON key
    pub ee_key_file: Option<PathBuf>,
    /// Reference (conservation zone) shapefile
    pub rdtr_path: PathBuf,
    pub storage_dir: PathBuf,
    pub roi_dir: PathBuf,
    pub intersect_dir: PathBuf,
    /// Metric CRS used for area computation
    pub default_utm_epsg: u32,
}

impl Settings {
    /// Load settings the way the server does at start-up: defaults, then
    /// `.env` in the working directory if present, then the environment.
    pub fn load() -> Result<Self> {
        Self::layered(Path::new(".env"))?.resolve()
    }

    /// Build the layered view from a specific dotenv path (missing file is fine)
    pub fn layered(env_file: &Path) -> Result<LayeredSettings> {
        let mut layered = LayeredSettings::with_defaults();
        if env_file.exists() {
            layered = layered.load_from_env_file(env_file)?;
        }
        Ok(layered.load_from_env())
    }

    /// Create the storage directories if they do not exist yet
    pub fn prepare_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.storage_dir)?;
        fs::create_dir_all(&self.roi_dir)?;
        fs::create_dir_all(&self.intersect_dir)?;
        Ok(())
    }

    /// Settings rooted at a single directory, used by tests and tooling
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            ee_project: String::new(),
            ee_service_account: None,
            ee_key_file: None,
            rdtr_path: root.join("reference.shp"),
            storage_dir: root.to_path_buf(),
            roi_dir: root.join("rois"),
            intersect_dir: root.join("intersections"),
            default_utm_epsg: 32749,
        }
    }
}
