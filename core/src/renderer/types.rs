use crate::scene::{MaterialProperties, PrimitiveType, Vertex};

use super::gpu_resources::{
    create_depth_texture, create_solid_color_texture, CameraUniform, GpuInstance, GpuTexture,
    LightsArrayUniform,
};

// Vertex shader attribute locations
pub(crate) enum VertexShaderLocations {
    VertexPosition = 0,
    TextureCoords,
    VertexNormal,
    InstanceTransformCol0,
    InstanceTransformCol1,
    InstanceTransformCol2,
    InstanceTransformCol3,
    InstanceNormalCol0,
    InstanceNormalCol1,
    InstanceNormalCol2,
}

/// Layout of [`Vertex`]: position, 2D texture coordinates, normal.
pub(crate) fn vertex_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    use VertexShaderLocations as VSL;

    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: VSL::VertexPosition as u32,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                shader_location: VSL::TextureCoords as u32,
                format: wgpu::VertexFormat::Float32x2,
            },
            wgpu::VertexAttribute {
                offset: std::mem::size_of::<[f32; 3 + 2]>() as wgpu::BufferAddress,
                shader_location: VSL::VertexNormal as u32,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    }
}

/// Layout of [`GpuInstance`], stepped once per instance.
pub(crate) fn instance_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    use VertexShaderLocations as VSL;

    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<GpuInstance>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: VSL::InstanceTransformCol0 as u32,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                shader_location: VSL::InstanceTransformCol1 as u32,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: std::mem::size_of::<[f32; 4 * 2]>() as wgpu::BufferAddress,
                shader_location: VSL::InstanceTransformCol2 as u32,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: std::mem::size_of::<[f32; 4 * 3]>() as wgpu::BufferAddress,
                shader_location: VSL::InstanceTransformCol3 as u32,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: std::mem::size_of::<[f32; 4 * 4]>() as wgpu::BufferAddress,
                shader_location: VSL::InstanceNormalCol0 as u32,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: std::mem::size_of::<[f32; (4 * 4) + 3]>() as wgpu::BufferAddress,
                shader_location: VSL::InstanceNormalCol1 as u32,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: std::mem::size_of::<[f32; (4 * 4) + (3 * 2)]>() as wgpu::BufferAddress,
                shader_location: VSL::InstanceNormalCol2 as u32,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    }
}

/// Largest surface edge WebGL2 reliably supports. Larger canvases are scaled
/// down keeping the aspect ratio.
#[cfg(target_arch = "wasm32")]
pub(super) const MAX_TEXTURE_DIMENSION: u32 = 2048;

fn uniform_layout_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Uniform buffer holding the view-projection matrix and eye position.
pub(super) struct CameraResources {
    pub(super) buffer: wgpu::Buffer,
    pub(super) bind_group_layout: wgpu::BindGroupLayout,
    pub(super) bind_group: wgpu::BindGroup,
}

impl CameraResources {
    pub(super) fn new(device: &wgpu::Device) -> CameraResources {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Buffer"),
            size: std::mem::size_of::<CameraUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Fragment stage reads eye_position for specular highlights
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_layout_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT)],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        CameraResources {
            buffer,
            bind_group_layout,
            bind_group,
        }
    }
}

/// Uniform buffer holding the scene lights.
pub(super) struct LightResources {
    pub(super) buffer: wgpu::Buffer,
    pub(super) bind_group_layout: wgpu::BindGroupLayout,
    pub(super) bind_group: wgpu::BindGroup,
}

impl LightResources {
    pub(super) fn new(device: &wgpu::Device) -> LightResources {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Light buffer"),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            size: std::mem::size_of::<LightsArrayUniform>() as wgpu::BufferAddress,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_layout_entry(0, wgpu::ShaderStages::FRAGMENT)],
            label: Some("Light bind group layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("Light bind group"),
        });

        LightResources {
            buffer,
            bind_group_layout,
            bind_group,
        }
    }
}

/// Material bind group layout: uniform factors, base color texture, sampler.
///
/// Every material binds all three. Untextured materials get the white
/// fallback texture, which their shader variant never samples.
pub(super) fn material_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Material Bind Group Layout"),
        entries: &[
            uniform_layout_entry(0, wgpu::ShaderStages::FRAGMENT),
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

/// Pipeline layout shared by every material pipeline: camera, lights, material.
pub(super) fn material_pipeline_layout(
    device: &wgpu::Device,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    light_bind_group_layout: &wgpu::BindGroupLayout,
    material_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Material Pipeline Layout"),
        bind_group_layouts: &[
            camera_bind_group_layout,
            light_bind_group_layout,
            material_bind_group_layout,
        ],
        push_constant_ranges: &[],
    })
}

/// Depth buffer and fallback textures.
pub(super) struct DefaultTextures {
    pub(super) depth: GpuTexture,
    pub(super) white: GpuTexture,
}

impl DefaultTextures {
    pub(super) fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        config: &wgpu::SurfaceConfiguration,
    ) -> DefaultTextures {
        let depth = create_depth_texture(device, config.width, config.height, "depth_texture");
        let white = create_solid_color_texture(
            device,
            queue,
            [255, 255, 255, 255],
            "default_white_texture",
        );

        DefaultTextures { depth, white }
    }
}

/// Everything that requires a distinct compiled pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) struct PipelineCacheKey {
    pub(super) material_props: MaterialProperties,
    pub(super) primitive_type: PrimitiveType,
}

/// Clamp dimensions to the maximum texture size while preserving aspect ratio.
/// On native platforms, returns the input dimensions unchanged.
pub(super) fn clamp_surface_size(width: u32, height: u32) -> (u32, u32) {
    #[cfg(target_arch = "wasm32")]
    {
        clamp_to_dimension(width, height, MAX_TEXTURE_DIMENSION)
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        (width, height)
    }
}

#[cfg_attr(not(any(test, target_arch = "wasm32")), allow(dead_code))]
pub(super) fn clamp_to_dimension(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }

    let scale = if width >= height {
        max_dimension as f32 / width as f32
    } else {
        max_dimension as f32 / height as f32
    };

    let new_width = ((width as f32 * scale).round() as u32).max(1);
    let new_height = ((height as f32 * scale).round() as u32).max(1);
    (new_width, new_height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout_matches_vertex_struct() {
        let layout = vertex_buffer_layout();
        assert_eq!(layout.array_stride, 32);
        assert_eq!(layout.attributes[1].offset, 12);
        assert_eq!(layout.attributes[1].format, wgpu::VertexFormat::Float32x2);
        assert_eq!(layout.attributes[2].offset, 20);
    }

    #[test]
    fn test_instance_layout_covers_instance_struct() {
        let layout = instance_buffer_layout();
        assert_eq!(layout.array_stride, 100);
        let last = layout.attributes.last().unwrap();
        assert_eq!(last.offset + last.format.size(), layout.array_stride);
        assert_eq!(last.shader_location, VertexShaderLocations::InstanceNormalCol2 as u32);
    }

    #[test]
    fn test_clamp_leaves_small_sizes() {
        assert_eq!(clamp_to_dimension(800, 600, 2048), (800, 600));
        assert_eq!(clamp_to_dimension(2048, 2048, 2048), (2048, 2048));
    }

    #[test]
    fn test_clamp_preserves_aspect() {
        assert_eq!(clamp_to_dimension(4096, 2048, 2048), (2048, 1024));
        assert_eq!(clamp_to_dimension(1000, 3000, 2048), (683, 2048));
    }

    #[test]
    fn test_clamp_never_zero() {
        assert_eq!(clamp_to_dimension(100_000, 1, 2048), (2048, 1));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_native_surface_not_clamped() {
        assert_eq!(clamp_surface_size(5000, 3000), (5000, 3000));
    }
}
