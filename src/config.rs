use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub generator: GeneratorConfig,
    pub filter: FilterConfig,
    pub geocoder: GeocoderConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct InputConfig {
    /// GeoJSON FeatureCollection of neighbourhood polygons.
    pub boundaries: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub count: usize,
    pub center_lat: f64,
    pub center_lon: f64,
    pub lat_jitter: f64, // degrees, half-width
    pub lon_jitter: f64,
    pub min_spacing_m: f64,
    pub max_age_days: i64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            count: 80,
            center_lat: 43.6532,
            center_lon: -79.3832,
            lat_jitter: 0.04,
            lon_jitter: 0.06,
            min_spacing_m: 10.0,
            max_age_days: 7,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FilterConfig {
    /// Drop records lying outside every known boundary, even with no selection.
    pub require_within_boundaries: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            require_within_boundaries: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeocoderConfig {
    pub endpoint: String,
    pub country_codes: String,
    pub zoom: u8,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://nominatim.openstreetmap.org/search".to_string(),
            country_codes: "ca".to_string(),
            zoom: 16,
            timeout_secs: 10,
            user_agent: concat!("pothole-map/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            static_dir: PathBuf::from("static"),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}
