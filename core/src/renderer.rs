mod gpu_resources;
mod pipeline;
mod prepare;
pub mod readback;
mod types;

use std::collections::HashMap;

use anyhow::{Context, Result};
use bytemuck::bytes_of;

use crate::{
    scene::{common::RgbaColor, Camera, DrawBatch, LightsArrayUniform, Scene, ViewerConfig},
    shaders::ShaderGenerator,
};

use gpu_resources::{create_depth_texture, draw_mesh_instances, CameraUniform, GpuResourceManager};
use types::{
    clamp_surface_size, material_bind_group_layout, material_pipeline_layout, CameraResources,
    DefaultTextures, LightResources, PipelineCacheKey,
};

pub struct Renderer<'a> {
    // Core GPU resources
    pub surface: wgpu::Surface<'a>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: (u32, u32),

    camera_resources: CameraResources,
    lights: LightResources,
    material_bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    default_textures: DefaultTextures,
    clear_color: wgpu::Color,

    shader_generator: ShaderGenerator,
    pipeline_cache: HashMap<PipelineCacheKey, wgpu::RenderPipeline>,
    gpu_resources: GpuResourceManager,
}

impl<'a> Renderer<'a> {
    // Creating some of the wgpu types requires async code
    // The target parameter can be a Window, Canvas, or any type implementing the necessary traits
    pub async fn new<T>(target: T, width: u32, height: u32, viewer_config: &ViewerConfig) -> Result<Renderer<'a>>
    where
        T: Into<wgpu::SurfaceTarget<'a>>,
    {
        let size = clamp_surface_size(width.max(1), height.max(1));

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(target)
            .context("Failed to create rendering surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No compatible graphics adapter found")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web, we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                label: None,
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
                experimental_features: Default::default(),
            })
            .await
            .context("Failed to create graphics device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("Surface reports no supported formats")?;

        // Prefer Fifo (vsync) to avoid tearing/flickering, fallback to first available
        let present_mode = surface_caps
            .present_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::PresentMode::Fifo)
            .or_else(|| surface_caps.present_modes.first().copied())
            .unwrap_or(wgpu::PresentMode::Fifo);

        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.0,
            height: size.1,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);
        log::info!(
            "Renderer ready: {}x{} {:?} on {}",
            size.0,
            size.1,
            surface_format,
            adapter.get_info().name
        );

        let camera_resources = CameraResources::new(&device);
        let lights = LightResources::new(&device);
        let material_bind_group_layout = material_bind_group_layout(&device);
        let pipeline_layout = material_pipeline_layout(
            &device,
            &camera_resources.bind_group_layout,
            &lights.bind_group_layout,
            &material_bind_group_layout,
        );
        let default_textures = DefaultTextures::new(&device, &queue, &config);
        let shader_generator = ShaderGenerator::new()?;

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            camera_resources,
            lights,
            material_bind_group_layout,
            pipeline_layout,
            default_textures,
            clear_color: clear_color(viewer_config.background.to_linear()),
            shader_generator,
            pipeline_cache: HashMap::new(),
            gpu_resources: GpuResourceManager::new(),
        })
    }

    /// Reconfigure the surface for a new size. Zero sizes are ignored.
    pub fn resize(&mut self, new_size: (u32, u32)) {
        let (width, height) = new_size;
        if width > 0 && height > 0 {
            let (clamped_width, clamped_height) = clamp_surface_size(width, height);
            self.size = (clamped_width, clamped_height);
            self.config.width = clamped_width;
            self.config.height = clamped_height;
            self.surface.configure(&self.device, &self.config);

            self.default_textures.depth =
                create_depth_texture(&self.device, clamped_width, clamped_height, "depth_texture");
        }
    }

    /// Prepare GPU resources, update uniforms and record the draw passes for
    /// the scene into `encoder`. The encoder is not submitted.
    pub(crate) fn render_scene_to_view(
        &mut self,
        view: &wgpu::TextureView,
        depth_view: Option<&wgpu::TextureView>,
        encoder: &mut wgpu::CommandEncoder,
        scene: &Scene,
        camera: &Camera,
    ) -> Result<()> {
        let batches = scene.collect_draw_batches();
        self.prepare_scene(scene, &batches)?;

        // The render pass holds shared borrows of self
        for batch in &batches {
            if let Some(key) = self.batch_pipeline_key(scene, batch) {
                self.get_or_create_pipeline(&key)?;
            }
        }

        let camera_uniform = CameraUniform::from_camera(camera);
        self.queue
            .write_buffer(&self.camera_resources.buffer, 0, bytes_of(&camera_uniform));

        let lights_uniform = LightsArrayUniform::from_lights(&scene.lights);
        self.queue
            .write_buffer(&self.lights.buffer, 0, bytes_of(&lights_uniform));

        let depth_view = depth_view.unwrap_or(&self.default_textures.depth.view);
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("3D Scene Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        render_pass.set_bind_group(0, &self.camera_resources.bind_group, &[]);
        render_pass.set_bind_group(1, &self.lights.bind_group, &[]);

        // Track current pipeline key to minimize pipeline changes
        let mut current_pipeline_key: Option<PipelineCacheKey> = None;

        for batch in &batches {
            let Some(pipeline_key) = self.batch_pipeline_key(scene, batch) else {
                continue;
            };
            let Some(mesh_gpu) = self.gpu_resources.get_mesh(batch.mesh_id) else {
                continue;
            };
            let Some(index_buffer) = mesh_gpu.index_buffer(batch.primitive_type, batch.wireframe) else {
                continue;
            };
            let Some(material_gpu) = self
                .gpu_resources
                .get_material(batch.material_id, batch.primitive_type)
            else {
                continue;
            };

            if current_pipeline_key.as_ref() != Some(&pipeline_key) {
                let Some(pipeline) = self.pipeline_cache.get(&pipeline_key) else {
                    continue;
                };
                render_pass.set_pipeline(pipeline);
                current_pipeline_key = Some(pipeline_key);
            }

            render_pass.set_bind_group(2, &material_gpu.bind_group, &[]);
            draw_mesh_instances(
                &self.device,
                &mut render_pass,
                mesh_gpu,
                index_buffer,
                &batch.instances,
            );
        }

        Ok(())
    }

    fn batch_pipeline_key(&self, scene: &Scene, batch: &DrawBatch) -> Option<PipelineCacheKey> {
        let material = scene.materials.get(&batch.material_id)?;
        Some(PipelineCacheKey {
            material_props: material.get_properties(batch.primitive_type),
            primitive_type: batch.primitive_type,
        })
    }

    /// Render one frame of the scene to the surface and present it.
    pub fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<()> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.render_scene_to_view(&view, None, &mut encoder, scene, camera)?;

        // submit will accept anything that implements IntoIter
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    /// Render the scene once into an offscreen texture of the current size
    /// and read it back as RGBA pixels.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn capture_frame(&mut self, scene: &Scene, camera: &Camera) -> Result<image::RgbaImage> {
        let (width, height) = self.size;
        let target = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Screenshot Target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.config.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());
        let depth = create_depth_texture(&self.device, width, height, "screenshot_depth");

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Screenshot Encoder"),
            });
        self.render_scene_to_view(&view, Some(&depth.view), &mut encoder, scene, camera)?;
        self.queue.submit(std::iter::once(encoder.finish()));

        let image = readback::read_texture_rgba(&self.device, &self.queue, &target, self.config.format)?;
        log::info!("Captured {}x{} frame", width, height);
        Ok(image)
    }
}

fn clear_color(color: RgbaColor) -> wgpu::Color {
    wgpu::Color {
        r: color.r as f64,
        g: color.g as f64,
        b: color.b as f64,
        a: color.a as f64,
    }
}
