//! Viewer configuration, loadable from TOML. Every field has a default, so a
//! config file only needs the values it changes.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use cgmath::Vector3;
use serde::{Deserialize, Serialize};

use crate::common::RgbaColor;
use crate::light::Light;

/// A `#rrggbb` sRGB color as written in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(pub u32);

impl HexColor {
    /// Linear color for the GPU.
    pub fn to_linear(self) -> RgbaColor {
        RgbaColor::from_srgb_hex(self.0)
    }

    /// 8-bit sRGB channels, for UI toolkits that take them directly.
    pub fn to_srgb_bytes(self) -> [u8; 3] {
        [(self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8]
    }
}

impl TryFrom<String> for HexColor {
    type Error = String;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        let trimmed = text.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("expected a #rrggbb color, got {:?}", text));
        }
        u32::from_str_radix(digits, 16)
            .map(HexColor)
            .map_err(|_| format!("expected a #rrggbb color, got {:?}", text))
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub background: HexColor,
    pub camera: CameraConfig,
    pub lights: LightsConfig,
    pub grid: GridConfig,
    pub model: ModelConfig,
    pub controls: ControlSettings,
    pub ui: UiColors,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            background: HexColor(0xf0f0f0),
            camera: CameraConfig::default(),
            lights: LightsConfig::default(),
            grid: GridConfig::default(),
            model: ModelConfig::default(),
            controls: ControlSettings::default(),
            ui: UiColors::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse config file as TOML")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
            position: [0.0, 5.0, 10.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightsConfig {
    pub color: HexColor,
    pub ambient_intensity: f32,
    pub directional_intensity: f32,
    /// The directional light shines from here toward the origin.
    pub directional_position: [f32; 3],
    pub point_intensity: f32,
    pub point_position: [f32; 3],
}

impl Default for LightsConfig {
    fn default() -> Self {
        Self {
            color: HexColor(0xffffff),
            ambient_intensity: 0.8,
            directional_intensity: 1.0,
            directional_position: [10.0, 10.0, 10.0],
            point_intensity: 0.5,
            point_position: [-10.0, 10.0, 5.0],
        }
    }
}

impl LightsConfig {
    /// Ambient, directional and point light, in that order.
    pub fn to_lights(&self) -> Vec<Light> {
        let color = self.color.to_linear();
        vec![
            Light::ambient(color, self.ambient_intensity),
            Light::directional_from(
                Vector3::from(self.directional_position),
                Vector3::new(0.0, 0.0, 0.0),
                color,
                self.directional_intensity,
            ),
            Light::point(Vector3::from(self.point_position), color, self.point_intensity),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub visible: bool,
    pub size: f32,
    pub divisions: u32,
    pub center_color: HexColor,
    pub line_color: HexColor,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            visible: true,
            size: 20.0,
            divisions: 20,
            center_color: HexColor(0x444444),
            line_color: HexColor(0x888888),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Longest bounding-box side after normalization
    pub target_size: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self { target_size: 10.0 }
    }
}

/// Camera control behavior shared by the navigation and auto-rotate operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    pub enable_zoom: bool,
    pub enable_pan: bool,
    pub auto_rotate: bool,
    /// 1.0 is one revolution per minute at 60 fps.
    pub auto_rotate_speed: f32,
    /// Radians per pixel of drag
    pub orbit_sensitivity: f32,
    /// Fractional distance change per wheel line
    pub zoom_sensitivity: f32,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            enable_zoom: true,
            enable_pan: true,
            auto_rotate: true,
            auto_rotate_speed: 5.0,
            orbit_sensitivity: 0.005,
            zoom_sensitivity: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiColors {
    pub primary: HexColor,
    pub primary_hover: HexColor,
    pub dark: HexColor,
    pub light: HexColor,
    pub gray: HexColor,
}

impl Default for UiColors {
    fn default() -> Self {
        Self {
            primary: HexColor(0xff6b00),
            primary_hover: HexColor(0xff8534),
            dark: HexColor(0x1a1a1a),
            light: HexColor(0xffffff),
            gray: HexColor(0xf0f0f0),
        }
    }
}

/// Reads a TOML config file. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<ViewerConfig> {
    if !path.exists() {
        log::warn!("Config file {} not found, using defaults", path.display());
        return Ok(ViewerConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    ViewerConfig::from_toml_str(&contents)
}
