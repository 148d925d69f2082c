//! JSON plot configuration.
//!
//! ```json
//! {
//!   "name": "adc_top",
//!   "root_cell": "adc_core",
//!   "scale": 10,
//!   "svg": { "width": 1200, "height": 800, "stroke_width": 1 },
//!   "layers": {
//!     "31": { "name": "M1", "fill": "0000ff", "fill_opacity": 0.3, "stroke": "0000ff" }
//!   }
//! }
//! ```
//!
//! Every field is optional. `layers` is overlaid on the built-in technology
//! table unless `replace_default_layers` is set.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cadplot_core::StyleTable;

use crate::dump::DEFAULT_SCALE;
use crate::svg::SvgConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid scale factor {0}; must be a positive number")]
    InvalidScale(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub name: Option<String>,
    /// Cell to resolve when none is given on the command line.
    pub root_cell: Option<String>,
    /// Raw dump units per layout unit.
    pub scale: f64,
    pub svg: SvgConfig,
    pub layers: StyleTable,
    pub replace_default_layers: bool,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            name: None,
            root_cell: None,
            scale: DEFAULT_SCALE,
            svg: SvgConfig::default(),
            layers: StyleTable::new(),
            replace_default_layers: false,
        }
    }
}

impl PlotConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: PlotConfig = serde_json::from_str(content)?;
        if !config.scale.is_finite() || config.scale <= 0.0 {
            return Err(ConfigError::InvalidScale(config.scale));
        }
        log::debug!(
            "Loaded config with {} layer overrides",
            config.layers.layer_count()
        );
        Ok(config)
    }

    /// The table layers are drawn with: the technology default plus the
    /// configured overrides.
    pub fn style_table(&self) -> StyleTable {
        if self.replace_default_layers {
            return self.layers.clone();
        }
        let mut table = StyleTable::technology_default();
        table.merge(self.layers.clone());
        table
    }
}
