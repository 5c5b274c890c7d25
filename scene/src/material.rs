use bitflags::bitflags;

use crate::common::RgbaColor;
use crate::mesh::PrimitiveType;
use crate::texture::TextureId;

/// Default roughness factor when not specified
pub const DEFAULT_ROUGHNESS: f32 = 1.0;
/// Default metallic factor when not specified
pub const DEFAULT_METALLIC: f32 = 1.0;

/// Name reported for materials that carry none.
pub const UNNAMED_MATERIAL: &str = "Material";

bitflags! {
    /// Material rendering flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MaterialFlags: u32 {
        const NONE = 0;
        /// Blend with what is behind using base color alpha
        const ALPHA_BLEND = 1 << 0;
        /// Disable back-face culling
        const DOUBLE_SIDED = 1 << 1;
        /// Faces appear at constant luminance
        const DO_NOT_LIGHT = 1 << 2;
        /// Draw triangle edges as lines instead of filled faces
        const WIREFRAME = 1 << 3;
    }
}

/// Material properties that select a shader variant and pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MaterialProperties {
    pub has_base_color_texture: bool,
    pub has_lighting: bool,
    pub alpha_blend: bool,
    pub double_sided: bool,
}

/// The ID of the fallback material used for primitives that reference none.
pub const DEFAULT_MATERIAL_ID: MaterialId = u32::MAX;

/// Unique identifier for materials, assigned sequentially by the Scene.
pub type MaterialId = u32;

/// Surface description for a primitive: base color factor and texture,
/// metallic/roughness factors, a line color for line primitives, and flags.
///
/// Every mutation bumps the generation so the renderer re-uploads the uniform.
#[derive(Debug, Clone)]
pub struct Material {
    pub id: MaterialId,
    name: Option<String>,
    base_color_texture: Option<TextureId>,
    base_color_factor: RgbaColor,
    metallic_factor: f32,
    roughness_factor: f32,
    line_color: Option<RgbaColor>,
    flags: MaterialFlags,
    generation: u64,
}

impl Material {
    /// Create a new material: white, fully rough metal as glTF defaults.
    pub fn new() -> Self {
        Self {
            id: 0,
            name: None,
            base_color_texture: None,
            base_color_factor: RgbaColor::WHITE,
            metallic_factor: DEFAULT_METALLIC,
            roughness_factor: DEFAULT_ROUGHNESS,
            line_color: None,
            flags: MaterialFlags::NONE,
            generation: 1,
        }
    }

    // ========== Getters ==========

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name used in model statistics; unnamed materials share one name.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(UNNAMED_MATERIAL)
    }

    pub fn base_color_texture(&self) -> Option<TextureId> {
        self.base_color_texture
    }

    pub fn base_color_factor(&self) -> RgbaColor {
        self.base_color_factor
    }

    pub fn metallic_factor(&self) -> f32 {
        self.metallic_factor
    }

    pub fn roughness_factor(&self) -> f32 {
        self.roughness_factor
    }

    pub fn line_color(&self) -> Option<RgbaColor> {
        self.line_color
    }

    pub fn flags(&self) -> MaterialFlags {
        self.flags
    }

    pub fn wireframe(&self) -> bool {
        self.flags.contains(MaterialFlags::WIREFRAME)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ========== Builders ==========

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_base_color_texture(mut self, texture_id: TextureId) -> Self {
        self.set_base_color_texture(Some(texture_id));
        self
    }

    pub fn with_base_color_factor(mut self, color: RgbaColor) -> Self {
        self.set_base_color_factor(color);
        self
    }

    pub fn with_metallic_factor(mut self, metallic: f32) -> Self {
        self.metallic_factor = metallic;
        self.generation += 1;
        self
    }

    pub fn with_roughness_factor(mut self, roughness: f32) -> Self {
        self.roughness_factor = roughness;
        self.generation += 1;
        self
    }

    pub fn with_line_color(mut self, color: RgbaColor) -> Self {
        self.line_color = Some(color);
        self.generation += 1;
        self
    }

    pub fn with_flags(mut self, flags: MaterialFlags) -> Self {
        self.set_flags(flags);
        self
    }

    // ========== Mutation ==========

    pub fn set_base_color_texture(&mut self, texture_id: Option<TextureId>) {
        self.base_color_texture = texture_id;
        self.generation += 1;
    }

    pub fn set_base_color_factor(&mut self, color: RgbaColor) {
        self.base_color_factor = color;
        self.generation += 1;
    }

    pub fn set_flags(&mut self, flags: MaterialFlags) {
        if self.flags != flags {
            self.flags = flags;
            self.generation += 1;
        }
    }

    pub fn set_wireframe(&mut self, enabled: bool) {
        let mut flags = self.flags;
        flags.set(MaterialFlags::WIREFRAME, enabled);
        self.set_flags(flags);
    }

    /// Properties that select the pipeline for this material when drawn as
    /// the given primitive type. Lines and points are always unlit and untextured.
    pub fn get_properties(&self, primitive_type: PrimitiveType) -> MaterialProperties {
        let alpha_blend = self.flags.contains(MaterialFlags::ALPHA_BLEND);
        match primitive_type {
            PrimitiveType::TriangleList => MaterialProperties {
                has_base_color_texture: self.base_color_texture.is_some(),
                has_lighting: !self.flags.contains(MaterialFlags::DO_NOT_LIGHT),
                alpha_blend,
                double_sided: self.flags.contains(MaterialFlags::DOUBLE_SIDED),
            },
            PrimitiveType::LineList | PrimitiveType::PointList => MaterialProperties {
                has_base_color_texture: false,
                has_lighting: false,
                alpha_blend,
                double_sided: true,
            },
        }
    }

    /// Color for line and point draws: the line color, else the base color.
    pub fn edge_color(&self) -> RgbaColor {
        self.line_color.unwrap_or(self.base_color_factor)
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_defaults() {
        let m = Material::new();
        assert_eq!(m.base_color_factor(), RgbaColor::WHITE);
        assert_eq!(m.display_name(), UNNAMED_MATERIAL);
        assert!(!m.wireframe());
    }

    #[test]
    fn test_wireframe_bumps_generation_once() {
        let mut m = Material::new();
        let g0 = m.generation();
        m.set_wireframe(true);
        assert!(m.wireframe());
        assert_eq!(m.generation(), g0 + 1);

        // Setting the same value again is not a change
        m.set_wireframe(true);
        assert_eq!(m.generation(), g0 + 1);

        m.set_wireframe(false);
        assert!(!m.wireframe());
        assert_eq!(m.generation(), g0 + 2);
    }

    #[test]
    fn test_properties_per_primitive() {
        let m = Material::new()
            .with_base_color_texture(4)
            .with_flags(MaterialFlags::DOUBLE_SIDED);
        let faces = m.get_properties(PrimitiveType::TriangleList);
        assert!(faces.has_base_color_texture);
        assert!(faces.has_lighting);
        assert!(faces.double_sided);

        let lines = m.get_properties(PrimitiveType::LineList);
        assert!(!lines.has_base_color_texture);
        assert!(!lines.has_lighting);
    }

    #[test]
    fn test_empty_name_uses_fallback() {
        let m = Material::new().with_name("");
        assert_eq!(m.display_name(), UNNAMED_MATERIAL);
        let m = Material::new().with_name("Body");
        assert_eq!(m.display_name(), "Body");
    }

    #[test]
    fn test_edge_color_fallback() {
        let red = RgbaColor::new(1.0, 0.0, 0.0, 1.0);
        let m = Material::new().with_base_color_factor(red);
        assert_eq!(m.edge_color(), red);
        let m = m.with_line_color(RgbaColor::BLACK);
        assert_eq!(m.edge_color(), RgbaColor::BLACK);
    }
}
