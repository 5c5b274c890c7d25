use anyhow::Result;
use bytemuck::bytes_of;
use wgpu::util::DeviceExt;

use crate::scene::{DrawBatch, Material, PrimitiveType, Scene};

use super::gpu_resources::{MaterialGpuResources, MaterialUniform};
use super::Renderer;

impl<'a> Renderer<'a> {
    /// Prepare all GPU resources the given batches need.
    ///
    /// Resources of removed scene objects are released first. Textures are
    /// uploaded before materials since material bind groups reference them.
    pub(super) fn prepare_scene(&mut self, scene: &Scene, batches: &[DrawBatch]) -> Result<()> {
        self.gpu_resources.retain_scene(scene);

        for texture in scene.textures.values() {
            self.gpu_resources
                .ensure_texture(texture, &self.device, &self.queue);
        }

        for mesh in scene.meshes.values() {
            self.gpu_resources.ensure_mesh(mesh, &self.device);
        }

        for batch in batches {
            if batch.wireframe {
                if let Some(mesh) = scene.meshes.get(&batch.mesh_id) {
                    self.gpu_resources.ensure_wireframe(mesh, &self.device);
                }
            }

            let Some(material) = scene.materials.get(&batch.material_id) else {
                continue;
            };
            if self
                .gpu_resources
                .material_needs_upload(material, batch.primitive_type)
            {
                self.prepare_material(material, batch.primitive_type)?;
            }
        }

        Ok(())
    }

    /// Build the uniform buffer and bind group for one material drawn as
    /// one primitive type.
    fn prepare_material(&mut self, material: &Material, primitive_type: PrimitiveType) -> Result<()> {
        let uniform = MaterialUniform::from_material(material, primitive_type);
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Material Uniform Buffer"),
                contents: bytes_of(&uniform),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let textured = material.get_properties(primitive_type).has_base_color_texture;
        let (gpu_texture, texture_generation) = match material.base_color_texture() {
            Some(texture_id) if textured => {
                let gpu = self.gpu_resources.get_texture(texture_id).ok_or_else(|| {
                    anyhow::anyhow!(
                        "Texture {} GPU resources not found for material {}",
                        texture_id,
                        material.id
                    )
                })?;
                let generation = self
                    .gpu_resources
                    .texture_generation(texture_id)
                    .unwrap_or_default();
                (gpu, generation)
            }
            _ => (&self.default_textures.white, 0),
        };

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material Bind Group"),
            layout: &self.material_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&gpu_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&gpu_texture.sampler),
                },
            ],
        });

        self.gpu_resources.set_material(
            material,
            primitive_type,
            MaterialGpuResources {
                bind_group,
                _buffer: buffer,
            },
            texture_generation,
        );
        Ok(())
    }
}
