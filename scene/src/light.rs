use cgmath::{InnerSpace, Vector3};

use crate::common::RgbaColor;

/// Maximum number of lights supported in the scene.
pub const MAX_LIGHTS: usize = 8;

/// Light type identifiers for GPU shader discrimination.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LightType {
    /// Radiates in all directions from a position.
    Point = 0,
    /// Parallel rays, like sunlight.
    Directional = 1,
    /// Uniform light from every direction, no shading.
    Ambient = 2,
}

/// A light source in the scene.
#[derive(Debug, Clone, PartialEq)]
pub enum Light {
    Point {
        position: Vector3<f32>,
        color: RgbaColor,
        intensity: f32,
        /// Distance at which the light fades to zero. 0.0 means no falloff.
        range: f32,
    },
    Directional {
        /// Direction the light travels (normalized).
        direction: Vector3<f32>,
        color: RgbaColor,
        intensity: f32,
    },
    Ambient {
        color: RgbaColor,
        intensity: f32,
    },
}

impl Light {
    pub fn point(position: Vector3<f32>, color: RgbaColor, intensity: f32) -> Self {
        Self::Point { position, color, intensity, range: 0.0 }
    }

    pub fn point_with_range(position: Vector3<f32>, color: RgbaColor, intensity: f32, range: f32) -> Self {
        Self::Point { position, color, intensity, range }
    }

    pub fn directional(direction: Vector3<f32>, color: RgbaColor, intensity: f32) -> Self {
        Self::Directional {
            direction: direction.normalize(),
            color,
            intensity,
        }
    }

    /// Directional light placed at `position` shining toward `target`.
    pub fn directional_from(position: Vector3<f32>, target: Vector3<f32>, color: RgbaColor, intensity: f32) -> Self {
        let direction = target - position;
        let direction = if direction.magnitude2() > 0.0 {
            direction
        } else {
            Vector3::new(0.0, -1.0, 0.0)
        };
        Self::directional(direction, color, intensity)
    }

    pub fn ambient(color: RgbaColor, intensity: f32) -> Self {
        Self::Ambient { color, intensity }
    }

    pub fn light_type(&self) -> LightType {
        match self {
            Light::Point { .. } => LightType::Point,
            Light::Directional { .. } => LightType::Directional,
            Light::Ambient { .. } => LightType::Ambient,
        }
    }

    /// Converts the light to a GPU-compatible uniform structure.
    pub fn to_uniform(&self) -> LightUniform {
        let mut uniform = LightUniform::zeroed();
        uniform.light_type = self.light_type() as u32;
        match self {
            Light::Point { position, color, intensity, range } => {
                uniform.range = *range;
                uniform.position = (*position).into();
                uniform.intensity = *intensity;
                uniform.color = [color.r, color.g, color.b];
            }
            Light::Directional { direction, color, intensity } => {
                uniform.direction = (*direction).into();
                uniform.intensity = *intensity;
                uniform.color = [color.r, color.g, color.b];
            }
            Light::Ambient { color, intensity } => {
                uniform.intensity = *intensity;
                uniform.color = [color.r, color.g, color.b];
            }
        }
        uniform
    }
}

/// GPU-compatible representation of a single light.
///
/// vec3 fields need 16-byte alignment in WGSL, so scalars pad them out.
///
/// | Offset | Size | Field      |
/// |--------|------|------------|
/// | 0      | 4    | light_type |
/// | 4      | 4    | range      |
/// | 8      | 8    | _padding0  |
/// | 16     | 12   | position   |
/// | 28     | 4    | intensity  |
/// | 32     | 12   | direction  |
/// | 44     | 4    | _padding1  |
/// | 48     | 12   | color      |
/// | 60     | 4    | _padding2  |
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    light_type: u32,
    range: f32,
    _padding0: [f32; 2],
    position: [f32; 3],
    intensity: f32,
    direction: [f32; 3],
    _padding1: f32,
    color: [f32; 3],
    _padding2: f32,
}

impl LightUniform {
    fn zeroed() -> Self {
        bytemuck::Zeroable::zeroed()
    }
}

/// GPU-compatible array of lights with count (16 + 64 * MAX_LIGHTS bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightsArrayUniform {
    pub light_count: u32,
    _padding: [u32; 3],
    pub lights: [LightUniform; MAX_LIGHTS],
}

impl LightsArrayUniform {
    pub fn new() -> Self {
        bytemuck::Zeroable::zeroed()
    }

    /// Only the first `MAX_LIGHTS` lights are used.
    pub fn from_lights(lights: &[Light]) -> Self {
        let mut uniform = Self::new();
        uniform.light_count = lights.len().min(MAX_LIGHTS) as u32;
        for (slot, light) in uniform.lights.iter_mut().zip(lights) {
            *slot = light.to_uniform();
        }
        uniform
    }
}

impl Default for LightsArrayUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::EPSILON;

    #[test]
    fn test_light_uniform_from_point_light() {
        let color = RgbaColor::new(0.5, 0.6, 0.7, 1.0);
        let light = Light::point(Vector3::new(1.0, 2.0, 3.0), color, 2.0);

        let uniform = light.to_uniform();

        assert_eq!(uniform.light_type, LightType::Point as u32);
        assert_eq!(uniform.position, [1.0, 2.0, 3.0]);
        assert!((uniform.color[2] - 0.7).abs() < EPSILON);
        assert!((uniform.intensity - 2.0).abs() < EPSILON);
        assert_eq!(uniform.range, 0.0);
    }

    #[test]
    fn test_directional_from_position_points_at_target() {
        let light = Light::directional_from(
            Vector3::new(10.0, 10.0, 10.0),
            Vector3::new(0.0, 0.0, 0.0),
            RgbaColor::WHITE,
            1.0,
        );
        let Light::Directional { direction, .. } = light else {
            panic!("expected directional light");
        };
        let expected = -1.0 / 3.0f32.sqrt();
        assert!((direction.x - expected).abs() < 1e-5);
        assert!((direction.y - expected).abs() < 1e-5);
        assert!((direction.magnitude() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_ambient_uniform() {
        let uniform = Light::ambient(RgbaColor::WHITE, 0.8).to_uniform();
        assert_eq!(uniform.light_type, LightType::Ambient as u32);
        assert!((uniform.intensity - 0.8).abs() < EPSILON);
        assert_eq!(uniform.direction, [0.0; 3]);
    }

    #[test]
    fn test_light_uniform_layout() {
        assert_eq!(std::mem::size_of::<LightUniform>(), 64);
        assert_eq!(std::mem::size_of::<LightsArrayUniform>(), 16 + 64 * MAX_LIGHTS);
    }

    #[test]
    fn test_lights_array_truncates() {
        let lights: Vec<Light> = (0..MAX_LIGHTS + 3)
            .map(|i| Light::point(Vector3::new(i as f32, 0.0, 0.0), RgbaColor::WHITE, 1.0))
            .collect();
        let uniform = LightsArrayUniform::from_lights(&lights);
        assert_eq!(uniform.light_count as usize, MAX_LIGHTS);
        assert_eq!(uniform.lights[MAX_LIGHTS - 1].position[0], (MAX_LIGHTS - 1) as f32);
    }
}
