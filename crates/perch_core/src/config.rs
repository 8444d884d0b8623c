//! Perch configuration
//!
//! Tuning knobs for placement, menu sizing and interaction timing, loaded from
//! a `perch.toml` file. Every field has a default, so an empty file (or no
//! file at all) gives the stock behaviour:
//!
//! ```toml
//! [placement]
//! margin = 8.0
//! popper_gap = 8.0
//!
//! [menu]
//! default_max_height = 300.0
//! min_height = 100.0
//!
//! [combobox]
//! close_delay_ms = 300
//!
//! [reposition]
//! fade = true
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Top-level configuration
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PerchConfig {
    pub placement: PlacementSettings,
    pub menu: MenuSettings,
    pub combobox: ComboboxSettings,
    pub reposition: RepositionSettings,
}

/// Viewport clamping and popper offsets
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlacementSettings {
    /// Minimum distance kept between an overlay and the viewport edges
    pub margin: f32,
    /// Distance between a popper and its anchor
    pub popper_gap: f32,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            margin: 8.0,
            popper_gap: 8.0,
        }
    }
}

/// Sizing of flexible-height menus
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MenuSettings {
    /// Height cap when there is plenty of room
    pub default_max_height: f32,
    /// Floor applied to the computed height cap
    pub min_height: f32,
    /// Room below the anchor that is always enough to open downwards
    pub comfortable_height: f32,
    /// Space kept free between the menu and the viewport edge
    pub viewport_padding: f32,
    /// Distance between the menu and its anchor
    pub gap: f32,
}

impl Default for MenuSettings {
    fn default() -> Self {
        Self {
            default_max_height: 300.0,
            min_height: 100.0,
            comfortable_height: 150.0,
            viewport_padding: 10.0,
            gap: 0.0,
        }
    }
}

/// Combobox timing and sentinel labels
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ComboboxSettings {
    /// Delay between focus leaving the input and the menu closing
    pub close_delay_ms: u64,
    /// Sentinel shown when a non-empty query matches nothing
    pub no_option_found: String,
    /// Sentinel shown when there are no options at all
    pub no_option_provided: String,
}

impl Default for ComboboxSettings {
    fn default() -> Self {
        Self {
            close_delay_ms: 300,
            no_option_found: "No option found".to_string(),
            no_option_provided: "No option provided".to_string(),
        }
    }
}

/// Reposition behaviour
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RepositionSettings {
    /// Hide overlays for one frame while they move after a scroll or resize
    pub fade: bool,
}

impl Default for RepositionSettings {
    fn default() -> Self {
        Self { fade: true }
    }
}

impl PerchConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: PerchConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from a file if it exists, otherwise use defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject negative or non-finite lengths and inconsistent menu bounds
    pub fn validate(&self) -> Result<()> {
        let lengths: [(&'static str, f32); 7] = [
            ("placement.margin", self.placement.margin),
            ("placement.popper_gap", self.placement.popper_gap),
            ("menu.default_max_height", self.menu.default_max_height),
            ("menu.min_height", self.menu.min_height),
            ("menu.comfortable_height", self.menu.comfortable_height),
            ("menu.viewport_padding", self.menu.viewport_padding),
            ("menu.gap", self.menu.gap),
        ];
        for (field, value) in lengths {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("expected a non-negative length, got {}", value),
                });
            }
        }

        if self.menu.min_height > self.menu.default_max_height {
            return Err(ConfigError::InvalidValue {
                field: "menu.min_height",
                reason: format!(
                    "{} exceeds menu.default_max_height ({})",
                    self.menu.min_height, self.menu.default_max_height
                ),
            });
        }

        Ok(())
    }
}
