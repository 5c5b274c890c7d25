//! GPU resource management for scene objects.
//!
//! Meshes, textures and materials live device-free in the scene. This module
//! mirrors them on the GPU, keyed by id, and uses generation numbers to know
//! when a resource changed and must be uploaded again.

use std::collections::HashMap;

use wgpu::util::{BufferInitDescriptor, DeviceExt};

use crate::scene::{
    Camera, InstanceTransform, Material, MaterialId, Mesh, MeshId, MeshIndex, PrimitiveType, Scene,
    Texture, TextureId,
};

pub(crate) use crate::scene::LightsArrayUniform;

/// Per-instance vertex data: column-major world transform and normal matrix.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuInstance {
    pub transform: [[f32; 4]; 4],
    pub normal_mat: [[f32; 3]; 3],
}

impl From<&InstanceTransform> for GpuInstance {
    fn from(instance: &InstanceTransform) -> Self {
        Self {
            transform: instance.world_transform.into(),
            normal_mat: instance.normal_matrix.into(),
        }
    }
}

/// Camera uniform (80 bytes). `eye_position.w` is unused.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub eye_position: [f32; 4],
}

impl CameraUniform {
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            view_proj: camera.build_view_projection_matrix().into(),
            eye_position: [camera.eye.x, camera.eye.y, camera.eye.z, 1.0],
        }
    }
}

/// Material factors for the fragment shader (32 bytes).
///
/// | Offset | Size | Field      |
/// |--------|------|------------|
/// | 0      | 16   | base_color |
/// | 16     | 4    | metallic   |
/// | 20     | 4    | roughness  |
/// | 24     | 8    | _padding   |
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    _padding: [f32; 2],
}

impl MaterialUniform {
    /// Faces use the base color factor; lines and points use the edge color.
    pub fn from_material(material: &Material, primitive_type: PrimitiveType) -> Self {
        let color = match primitive_type {
            PrimitiveType::TriangleList => material.base_color_factor(),
            PrimitiveType::LineList | PrimitiveType::PointList => material.edge_color(),
        };
        Self {
            base_color: color.to_array(),
            metallic: material.metallic_factor(),
            roughness: material.roughness_factor(),
            _padding: [0.0; 2],
        }
    }
}

/// An index buffer together with the number of indices it holds.
pub(crate) struct IndexBuffer {
    pub buffer: wgpu::Buffer,
    pub count: u32,
}

/// GPU resources for a mesh. Index buffers are absent when the mesh has
/// no indices of that primitive type.
pub(crate) struct MeshGpuResources {
    pub vertex_buffer: wgpu::Buffer,
    pub triangles: Option<IndexBuffer>,
    pub lines: Option<IndexBuffer>,
    pub points: Option<IndexBuffer>,
    /// Edge list of the triangles, created on the first wireframe draw.
    pub wireframe: Option<IndexBuffer>,
}

impl MeshGpuResources {
    pub fn index_buffer(&self, primitive_type: PrimitiveType, wireframe: bool) -> Option<&IndexBuffer> {
        if wireframe {
            return self.wireframe.as_ref();
        }
        match primitive_type {
            PrimitiveType::TriangleList => self.triangles.as_ref(),
            PrimitiveType::LineList => self.lines.as_ref(),
            PrimitiveType::PointList => self.points.as_ref(),
        }
    }
}

/// GPU resources for a texture.
pub(crate) struct GpuTexture {
    pub _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

pub(crate) struct TextureGpuState {
    pub gpu_texture: GpuTexture,
    pub synced_generation: u64,
}

/// Bind group for one material drawn as one primitive type.
pub(crate) struct MaterialGpuResources {
    pub bind_group: wgpu::BindGroup,
    pub _buffer: wgpu::Buffer,
}

#[derive(Default)]
struct MaterialSlot {
    resources: Option<MaterialGpuResources>,
    synced_generation: u64,
    /// Generation of the bound texture when the bind group was built.
    texture_generation: u64,
}

/// GPU state for a material, tracked separately per primitive type.
#[derive(Default)]
pub(crate) struct MaterialGpuState {
    face: MaterialSlot,
    line: MaterialSlot,
    point: MaterialSlot,
}

impl MaterialGpuState {
    fn slot(&self, primitive_type: PrimitiveType) -> &MaterialSlot {
        match primitive_type {
            PrimitiveType::TriangleList => &self.face,
            PrimitiveType::LineList => &self.line,
            PrimitiveType::PointList => &self.point,
        }
    }

    fn slot_mut(&mut self, primitive_type: PrimitiveType) -> &mut MaterialSlot {
        match primitive_type {
            PrimitiveType::TriangleList => &mut self.face,
            PrimitiveType::LineList => &mut self.line,
            PrimitiveType::PointList => &mut self.point,
        }
    }

    pub fn get(&self, primitive_type: PrimitiveType) -> Option<&MaterialGpuResources> {
        self.slot(primitive_type).resources.as_ref()
    }
}

/// Tracks the GPU mirror of every scene mesh, texture and material.
pub(crate) struct GpuResourceManager {
    pub meshes: HashMap<MeshId, MeshGpuResources>,
    pub textures: HashMap<TextureId, TextureGpuState>,
    pub materials: HashMap<MaterialId, MaterialGpuState>,
}

impl GpuResourceManager {
    pub fn new() -> Self {
        Self {
            meshes: HashMap::new(),
            textures: HashMap::new(),
            materials: HashMap::new(),
        }
    }

    pub fn texture_needs_upload(&self, texture_id: TextureId, current_generation: u64) -> bool {
        match self.textures.get(&texture_id) {
            None => true,
            Some(state) => state.synced_generation != current_generation,
        }
    }

    /// A material bind group is stale when the material changed or its
    /// texture was re-uploaded since the bind group was built.
    pub fn material_needs_upload(
        &self,
        material: &Material,
        primitive_type: PrimitiveType,
    ) -> bool {
        let Some(state) = self.materials.get(&material.id) else {
            return true;
        };
        let slot = state.slot(primitive_type);
        if slot.resources.is_none() || slot.synced_generation != material.generation() {
            return true;
        }
        if !material.get_properties(primitive_type).has_base_color_texture {
            return false;
        }
        match material.base_color_texture() {
            Some(texture_id) => self
                .textures
                .get(&texture_id)
                .is_some_and(|t| t.synced_generation != slot.texture_generation),
            None => false,
        }
    }

    pub fn get_mesh(&self, mesh_id: MeshId) -> Option<&MeshGpuResources> {
        self.meshes.get(&mesh_id)
    }

    pub fn get_texture(&self, texture_id: TextureId) -> Option<&GpuTexture> {
        self.textures.get(&texture_id).map(|s| &s.gpu_texture)
    }

    pub fn texture_generation(&self, texture_id: TextureId) -> Option<u64> {
        self.textures.get(&texture_id).map(|s| s.synced_generation)
    }

    pub fn get_material(
        &self,
        material_id: MaterialId,
        primitive_type: PrimitiveType,
    ) -> Option<&MaterialGpuResources> {
        self.materials
            .get(&material_id)
            .and_then(|s| s.get(primitive_type))
    }

    pub fn set_material(
        &mut self,
        material: &Material,
        primitive_type: PrimitiveType,
        resources: MaterialGpuResources,
        texture_generation: u64,
    ) {
        let slot = self
            .materials
            .entry(material.id)
            .or_default()
            .slot_mut(primitive_type);
        slot.resources = Some(resources);
        slot.synced_generation = material.generation();
        slot.texture_generation = texture_generation;
    }

    /// Meshes never change after they are added, so presence is enough.
    pub fn ensure_mesh(&mut self, mesh: &Mesh, device: &wgpu::Device) {
        if !self.meshes.contains_key(&mesh.id()) {
            self.meshes
                .insert(mesh.id(), create_mesh_gpu_resources(mesh, device));
        }
    }

    pub fn ensure_wireframe(&mut self, mesh: &Mesh, device: &wgpu::Device) {
        if let Some(resources) = self.meshes.get_mut(&mesh.id()) {
            if resources.wireframe.is_none() {
                resources.wireframe =
                    create_index_buffer(device, mesh.wireframe_indices(), "Wireframe Index Buffer");
            }
        }
    }

    pub fn ensure_texture(&mut self, texture: &Texture, device: &wgpu::Device, queue: &wgpu::Queue) {
        let generation = texture.generation();
        if !self.texture_needs_upload(texture.id(), generation) {
            return;
        }

        let gpu_texture = create_texture_gpu_resources(texture, device, queue);
        self.textures.insert(
            texture.id(),
            TextureGpuState {
                gpu_texture,
                synced_generation: generation,
            },
        );
    }

    /// Drops GPU resources whose scene object is gone.
    pub fn retain_scene(&mut self, scene: &Scene) {
        let before = self.meshes.len() + self.textures.len() + self.materials.len();
        self.meshes.retain(|id, _| scene.meshes.contains_key(id));
        self.textures.retain(|id, _| scene.textures.contains_key(id));
        self.materials.retain(|id, _| scene.materials.contains_key(id));
        let dropped = before - (self.meshes.len() + self.textures.len() + self.materials.len());
        if dropped > 0 {
            log::debug!("Released {} GPU resources", dropped);
        }
    }
}

fn create_index_buffer(device: &wgpu::Device, indices: &[MeshIndex], label: &str) -> Option<IndexBuffer> {
    if indices.is_empty() {
        return None;
    }
    let buffer = device.create_buffer_init(&BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    Some(IndexBuffer {
        buffer,
        count: indices.len() as u32,
    })
}

fn create_mesh_gpu_resources(mesh: &Mesh, device: &wgpu::Device) -> MeshGpuResources {
    let vertex_buffer = device.create_buffer_init(&BufferInitDescriptor {
        label: Some("Mesh Vertex Buffer"),
        contents: bytemuck::cast_slice(mesh.vertices()),
        usage: wgpu::BufferUsages::VERTEX,
    });

    MeshGpuResources {
        vertex_buffer,
        triangles: create_index_buffer(
            device,
            &mesh.indices_of(PrimitiveType::TriangleList),
            "Triangle Index Buffer",
        ),
        lines: create_index_buffer(
            device,
            &mesh.indices_of(PrimitiveType::LineList),
            "Line Index Buffer",
        ),
        points: create_index_buffer(
            device,
            &mesh.indices_of(PrimitiveType::PointList),
            "Point Index Buffer",
        ),
        wireframe: None,
    }
}

fn create_texture_gpu_resources(
    texture: &Texture,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> GpuTexture {
    let rgba = texture.image().to_rgba8();
    let (width, height) = rgba.dimensions();

    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };

    let wgpu_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture: &wgpu_texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        &rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );

    let view = wgpu_texture.create_view(&wgpu::TextureViewDescriptor::default());
    // glTF samplers default to repeat wrapping
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    GpuTexture {
        _texture: wgpu_texture,
        view,
        sampler,
    }
}

/// Uploads the batch instances and issues one instanced draw.
pub(crate) fn draw_mesh_instances(
    device: &wgpu::Device,
    render_pass: &mut wgpu::RenderPass,
    gpu_resources: &MeshGpuResources,
    index_buffer: &IndexBuffer,
    instance_transforms: &[InstanceTransform],
) {
    if index_buffer.count == 0 || instance_transforms.is_empty() {
        return;
    }

    let instance_raws: Vec<GpuInstance> = instance_transforms.iter().map(GpuInstance::from).collect();

    // TODO: reuse instance buffers across frames instead of creating one per draw
    let instance_buffer = device.create_buffer_init(&BufferInitDescriptor {
        label: Some("Instance Buffer"),
        contents: bytemuck::cast_slice(&instance_raws),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let n_instances = instance_transforms.len() as u32;
    render_pass.set_vertex_buffer(0, gpu_resources.vertex_buffer.slice(..));
    render_pass.set_vertex_buffer(1, instance_buffer.slice(..));
    render_pass.set_index_buffer(index_buffer.buffer.slice(..), wgpu::IndexFormat::Uint32);
    render_pass.draw_indexed(0..index_buffer.count, 0, 0..n_instances);
}

// ========== Helper functions for creating internal GPU textures ==========

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Create a 1x1 solid color texture, bound where a material has no texture.
pub(crate) fn create_solid_color_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    color: [u8; 4],
    label: &str,
) -> GpuTexture {
    let size = wgpu::Extent3d {
        width: 1,
        height: 1,
        depth_or_array_layers: 1,
    };

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        &color,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4),
            rows_per_image: Some(1),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    GpuTexture { _texture: texture, view, sampler }
}

/// Create a depth buffer of the given size (at least 1x1).
pub(crate) fn create_depth_texture(
    device: &wgpu::Device,
    width: u32,
    height: u32,
    label: &str,
) -> GpuTexture {
    let size = wgpu::Extent3d {
        width: width.max(1),
        height: height.max(1),
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        compare: Some(wgpu::CompareFunction::LessEqual),
        lod_min_clamp: 0.0,
        lod_max_clamp: 100.0,
        ..Default::default()
    });

    GpuTexture { _texture: texture, view, sampler }
}
