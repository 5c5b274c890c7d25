use anyhow::Result;

use crate::scene::PrimitiveType;
use crate::shaders::ShaderFeatures;

use super::gpu_resources::DEPTH_FORMAT;
use super::types::{instance_buffer_layout, vertex_buffer_layout, PipelineCacheKey};
use super::Renderer;

pub(super) fn topology(primitive_type: PrimitiveType) -> wgpu::PrimitiveTopology {
    match primitive_type {
        PrimitiveType::TriangleList => wgpu::PrimitiveTopology::TriangleList,
        PrimitiveType::LineList => wgpu::PrimitiveTopology::LineList,
        PrimitiveType::PointList => wgpu::PrimitiveTopology::PointList,
    }
}

/// Back faces are culled only for single-sided triangles.
pub(super) fn cull_mode(key: &PipelineCacheKey) -> Option<wgpu::Face> {
    if key.primitive_type == PrimitiveType::TriangleList && !key.material_props.double_sided {
        Some(wgpu::Face::Back)
    } else {
        None
    }
}

/// Blended materials test against depth but do not write it.
pub(super) fn blend_and_depth_write(key: &PipelineCacheKey) -> (wgpu::BlendState, bool) {
    if key.material_props.alpha_blend {
        (wgpu::BlendState::ALPHA_BLENDING, false)
    } else {
        (wgpu::BlendState::REPLACE, true)
    }
}

impl<'a> Renderer<'a> {
    pub(super) fn get_or_create_pipeline(
        &mut self,
        cache_key: &PipelineCacheKey,
    ) -> Result<&wgpu::RenderPipeline> {
        if !self.pipeline_cache.contains_key(cache_key) {
            let pipeline = self.create_pipeline(cache_key)?;
            self.pipeline_cache.insert(cache_key.clone(), pipeline);
        }
        self.pipeline_cache
            .get(cache_key)
            .ok_or_else(|| anyhow::anyhow!("Pipeline missing from cache"))
    }

    fn create_pipeline(&mut self, cache_key: &PipelineCacheKey) -> Result<wgpu::RenderPipeline> {
        let features = ShaderFeatures::from(&cache_key.material_props);
        let shader = self.shader_generator.generate_shader(&self.device, features)?;
        let (blend, depth_write_enabled) = blend_and_depth_write(cache_key);

        log::debug!(
            "Creating pipeline for {:?} ({:?})",
            cache_key.primitive_type,
            cache_key.material_props
        );

        Ok(self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Render Pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[vertex_buffer_layout(), instance_buffer_layout()],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.config.format,
                        blend: Some(blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: topology(cache_key.primitive_type),
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: cull_mode(cache_key),
                    // Setting this to anything other than Fill requires Features::NON_FILL_POLYGON_MODE
                    polygon_mode: wgpu::PolygonMode::Fill,
                    // Requires Features::DEPTH_CLIP_CONTROL
                    unclipped_depth: false,
                    // Requires Features::CONSERVATIVE_RASTERIZATION
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
                cache: None,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Material, MaterialFlags};

    fn key(material: &Material, primitive_type: PrimitiveType) -> PipelineCacheKey {
        PipelineCacheKey {
            material_props: material.get_properties(primitive_type),
            primitive_type,
        }
    }

    #[test]
    fn test_single_sided_triangles_cull_back() {
        let material = Material::new();
        assert_eq!(
            cull_mode(&key(&material, PrimitiveType::TriangleList)),
            Some(wgpu::Face::Back)
        );
    }

    #[test]
    fn test_double_sided_and_lines_not_culled() {
        let double = Material::new().with_flags(MaterialFlags::DOUBLE_SIDED);
        assert_eq!(cull_mode(&key(&double, PrimitiveType::TriangleList)), None);
        assert_eq!(cull_mode(&key(&Material::new(), PrimitiveType::LineList)), None);
    }

    #[test]
    fn test_alpha_blend_disables_depth_write() {
        let blended = Material::new().with_flags(MaterialFlags::ALPHA_BLEND);
        let (blend, write) = blend_and_depth_write(&key(&blended, PrimitiveType::TriangleList));
        assert_eq!(blend, wgpu::BlendState::ALPHA_BLENDING);
        assert!(!write);

        let (blend, write) = blend_and_depth_write(&key(&Material::new(), PrimitiveType::TriangleList));
        assert_eq!(blend, wgpu::BlendState::REPLACE);
        assert!(write);
    }
}
