use std::collections::HashMap;

use anyhow::Result;
use wesl::{ModulePath, VirtualResolver, Wesl};
use wgpu::ShaderModuleDescriptor;

use crate::scene::MaterialProperties;

// Embedded so the web build needs no filesystem access
const SHADER_MAIN: &str = include_str!("shaders/main.wesl");
const SHADER_CAMERA: &str = include_str!("shaders/camera.wesl");
const SHADER_VERTEX: &str = include_str!("shaders/vertex.wesl");
const SHADER_MATERIAL: &str = include_str!("shaders/material.wesl");
const SHADER_LIGHTING: &str = include_str!("shaders/lighting.wesl");

/// The subset of material properties that changes generated shader code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ShaderFeatures {
    pub has_texture: bool,
    pub has_lighting: bool,
}

impl From<&MaterialProperties> for ShaderFeatures {
    fn from(properties: &MaterialProperties) -> Self {
        Self {
            has_texture: properties.has_base_color_texture,
            has_lighting: properties.has_lighting,
        }
    }
}

impl ShaderFeatures {
    fn label(&self) -> &'static str {
        match (self.has_texture, self.has_lighting) {
            (true, true) => "Lit Texture Material Shader",
            (true, false) => "Unlit Texture Material Shader",
            (false, true) => "Lit Color Material Shader",
            (false, false) => "Unlit Color Material Shader",
        }
    }
}

/// Compiles the WESL sources into one WGSL module per feature combination.
pub(crate) struct ShaderGenerator {
    compiler: Wesl<VirtualResolver<'static>>,
    module_cache: HashMap<ShaderFeatures, wgpu::ShaderModule>,
}

impl ShaderGenerator {
    pub fn new() -> Result<Self> {
        let mut resolver = VirtualResolver::default();
        resolver.add_module("package::main".parse()?, SHADER_MAIN.into());
        resolver.add_module("package::camera".parse()?, SHADER_CAMERA.into());
        resolver.add_module("package::vertex".parse()?, SHADER_VERTEX.into());
        resolver.add_module("package::material".parse()?, SHADER_MATERIAL.into());
        resolver.add_module("package::lighting".parse()?, SHADER_LIGHTING.into());

        let compiler = Wesl::new(".").set_custom_resolver(resolver);

        Ok(Self {
            compiler,
            module_cache: HashMap::new(),
        })
    }

    /// Linked WGSL source for the given features.
    pub fn generate_wgsl(&mut self, features: ShaderFeatures) -> Result<String> {
        let path: ModulePath = "package::main".parse()?;
        self.compiler.set_features([
            ("has_texture", features.has_texture),
            ("has_lighting", features.has_lighting),
        ]);
        let result = self.compiler.compile(&path)?;
        Ok(result.to_string())
    }

    pub fn generate_shader(
        &mut self,
        device: &wgpu::Device,
        features: ShaderFeatures,
    ) -> Result<wgpu::ShaderModule> {
        if let Some(cached) = self.module_cache.get(&features) {
            return Ok(cached.clone());
        }

        let wgsl = self.generate_wgsl(features)?;
        log::debug!("Compiled {}", features.label());

        let module = device.create_shader_module(ShaderModuleDescriptor {
            label: Some(features.label()),
            source: wgpu::ShaderSource::Wgsl(wgsl.into()),
        });

        self.module_cache.insert(features, module.clone());
        Ok(module)
    }
}
