//! Engine configuration schema and loading.
//!
//! Configured via a TOML file (`gare.toml`). Every table is optional and
//! falls back to defaults:
//!
//! ```toml
//! strategy = "force"
//!
//! [engine]
//! infer_on_expand = true
//! expand_all = true
//!
//! [inference]
//! surname_max_group = 12
//!
//! [layout]
//! link_distance = 180
//!
//! [layout.force]
//! charge = -300
//!
//! [canvas]
//! width = 1200
//! height = 800
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::inference::InferenceConfig;
use crate::layout::{LayoutConfig, LayoutStrategy};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Strategy used until a `set_strategy` event arrives
    pub strategy: LayoutStrategy,
    pub engine: BehaviourConfig,
    pub inference: InferenceConfig,
    pub layout: LayoutConfig,
    pub canvas: CanvasConfig,
}

/// Interaction behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviourConfig {
    /// Run the single-record inference pass when a node is expanded.
    pub infer_on_expand: bool,
    /// Start with every node expanded.
    pub expand_all: bool,
}

impl Default for BehaviourConfig {
    fn default() -> Self {
        Self {
            infer_on_expand: true,
            expand_all: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
        }
    }
}

impl EngineConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .layout
            .validate()
            .with_context(|| format!("Invalid layout settings in {}", path.display()))?;
        Ok(config)
    }
}
