use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{EditorError, Result};
use crate::geometry::Size;

/// Editor-wide settings.
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// grid = 20.0
/// drag_threshold = 3.0
/// connection_timeout_ms = 10000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// node drag grid, 0 disables snapping
    pub grid: f32,
    /// snap on release only, instead of on every move
    pub smooth_drag: bool,
    /// pointer travel in pixels before a node drag starts
    pub drag_threshold: f32,
    /// ambient zoom factor applied to the canvas by the host
    pub zoom: f32,
    /// horizontal power of connector curves
    pub route_power: f32,
    pub pin_size: Size,
    pub default_node_size: Size,
    /// height of the drag handle strip at the top of each node
    pub header_height: f32,
    pub close_size: f32,
    pub palette_width: f32,
    pub palette_item_height: f32,
    /// dead-man timeout for an unreleased connector drag, `None` disables it
    pub connection_timeout_ms: Option<u64>,
    /// key of the save slot used by save/load
    pub save_key: String,
    pub connector_color: [u8; 3],
    pub connector_width: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid: 10.0,
            smooth_drag: true,
            drag_threshold: 0.0,
            zoom: 1.0,
            route_power: crate::path::ROUTE_POWER,
            pin_size: Size::new(10.0, 10.0),
            default_node_size: Size::new(100.0, 100.0),
            header_height: 20.0,
            close_size: 14.0,
            palette_width: 120.0,
            palette_item_height: 30.0,
            connection_timeout_ms: Some(30_000),
            save_key: "save".to_string(),
            connector_color: [0, 0, 0],
            connector_width: 2.0,
        }
    }
}

impl EditorConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EditorConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("grid", self.grid),
            ("drag_threshold", self.drag_threshold),
            ("route_power", self.route_power),
            ("header_height", self.header_height),
            ("close_size", self.close_size),
            ("palette_width", self.palette_width),
            ("palette_item_height", self.palette_item_height),
            ("connector_width", self.connector_width),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(EditorError::Config(format!(
                    "{name} must be a finite, non-negative number (got {value})"
                )));
            }
        }
        if !self.zoom.is_finite() || self.zoom <= 0.0 {
            return Err(EditorError::Config(format!("zoom must be positive (got {})", self.zoom)));
        }
        if !self.pin_size.is_valid() || !self.default_node_size.is_valid() {
            return Err(EditorError::Config("sizes must be finite and non-negative".into()));
        }
        if self.save_key.is_empty() {
            return Err(EditorError::Config("save_key must not be empty".into()));
        }
        Ok(())
    }

    pub fn connector_color(&self) -> slint::Color {
        let [r, g, b] = self.connector_color;
        slint::Color::from_rgb_u8(r, g, b)
    }
}
