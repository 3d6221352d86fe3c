use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};

const COUNTIES_TOPOLOGY_URL: &str =
    "https://cdn.freecodecamp.org/testable-projects-fcc/data/choropleth_map/counties.json";
const COUNTY_CASES_URL: &str =
    "https://raw.githubusercontent.com/nytimes/covid-19-data/master/us-counties.csv";
const STATE_CASES_URL: &str =
    "https://raw.githubusercontent.com/nytimes/covid-19-data/master/us-states.csv";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub sources: SourcesConfig,
    pub map: MapConfig,
    pub trend: TrendConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

/// Data sources. Anything not starting with http(s):// is read from disk.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourcesConfig {
    pub boundaries: String,
    pub county_cases: String,
    pub state_cases: String,
    /// Named object in the boundary topology holding county shapes.
    pub county_object: String,
    /// Named object in the boundary topology holding state shapes.
    pub state_object: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            boundaries: COUNTIES_TOPOLOGY_URL.to_string(),
            county_cases: COUNTY_CASES_URL.to_string(),
            state_cases: STATE_CASES_URL.to_string(),
            county_object: "counties".to_string(),
            state_object: "states".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub width: f64,
    pub height: f64,
    pub padding_right: f64,
    pub padding_bottom: f64,
    pub legend_cells: usize,
    /// Fill for shapes with no case report. Distinct from the scale's light
    /// end, which means "one case".
    pub no_data_fill: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 600.0,
            padding_right: 75.0,
            padding_bottom: 50.0,
            legend_cells: 25,
            no_data_fill: "white".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrendConfig {
    /// State whose cumulative case series is charted.
    pub state: String,
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            state: "New York".to_string(),
            width: 1200.0,
            height: 800.0,
            padding: 50.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("out") }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

impl AppConfig {
    /// Load from a TOML file. A missing file is not an error: the built-in
    /// defaults point at the public upstream datasets.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_upstream() {
        let cfg = AppConfig::default();
        assert!(cfg.sources.boundaries.starts_with("https://"));
        assert_eq!(cfg.map.legend_cells, 25);
        assert_eq!(cfg.trend.state, "New York");
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [trend]
            state = "Washington"

            [server]
            port = 4000
            "#,
        )
        .unwrap();
        assert_eq!(cfg.trend.state, "Washington");
        assert_eq!(cfg.server.port, 4000);
        assert_eq!(cfg.map.width, 960.0);
        assert_eq!(cfg.sources.county_object, "counties");
    }
}
