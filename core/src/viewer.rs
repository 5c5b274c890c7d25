use anyhow::Result;
use web_time::Instant;

use crate::{
    event::{Event, EventContext, EventDispatcher, EventKind},
    operator::{AutoRotateOperator, BuiltinOperatorId, NavigationOperator, OperatorManager},
    renderer::Renderer,
    scene::{Camera, ControlSettings, LoadedModel, ModelInfo, ModelStage, ViewerConfig},
};

/// Main viewer: owns the renderer, the model stage, the camera and the
/// event handling that drives them.
pub struct Viewer<'a> {
    renderer: Renderer<'a>,
    stage: ModelStage,
    camera: Camera,
    controls: ControlSettings,
    config: ViewerConfig,
    dispatcher: EventDispatcher,
    operator_manager: OperatorManager,
    /// Last time update() was called, for delta_time calculation
    last_update_time: Option<Instant>,
}

impl<'a> Viewer<'a> {
    pub async fn new<T>(surface_target: T, width: u32, height: u32, config: ViewerConfig) -> Result<Self>
    where
        T: Into<wgpu::SurfaceTarget<'a>>,
    {
        let renderer = Renderer::new(surface_target, width, height, &config).await?;
        let stage = ModelStage::new(&config)?;
        let (w, h) = renderer.size;
        let camera = Camera::from_config(&config.camera, w as f32 / h.max(1) as f32);

        let mut dispatcher = EventDispatcher::new();
        let mut operator_manager = OperatorManager::new();
        operator_manager.push_back(
            Box::new(NavigationOperator::new(BuiltinOperatorId::Navigation.into())),
            &mut dispatcher,
        );
        operator_manager.push_back(
            Box::new(AutoRotateOperator::new(BuiltinOperatorId::AutoRotate.into())),
            &mut dispatcher,
        );

        let mut viewer = Self {
            renderer,
            stage,
            camera,
            controls: config.controls.clone(),
            config,
            dispatcher,
            operator_manager,
            last_update_time: None,
        };
        viewer.register_default_handlers();
        Ok(viewer)
    }

    /// Create a viewer sized to a winit window.
    #[cfg(feature = "winit-support")]
    pub async fn from_window(window: std::sync::Arc<winit::window::Window>, config: ViewerConfig) -> Result<Self> {
        let size = window.inner_size();
        Self::new(window, size.width, size.height, config).await
    }

    /// Create a viewer sized to an HTML canvas.
    #[cfg(target_arch = "wasm32")]
    pub async fn from_canvas(canvas: web_sys::HtmlCanvasElement, config: ViewerConfig) -> Result<Self> {
        let width = canvas.width();
        let height = canvas.height();
        Self::new(wgpu::SurfaceTarget::Canvas(canvas), width, height, config).await
    }

    fn register_default_handlers(&mut self) {
        self.dispatcher.register(EventKind::Resized, |event, ctx| {
            if let Event::Resized((width, height)) = event {
                ctx.camera.set_aspect(*width, *height);
            }
            true
        });
    }

    /// Dispatch an event to the registered handlers.
    pub fn handle_event(&mut self, event: &Event) {
        if let Event::Resized(size) = event {
            self.renderer.resize(*size);
        }
        let mut ctx = EventContext {
            camera: &mut self.camera,
            stage: &mut self.stage,
            controls: &self.controls,
        };
        self.dispatcher.dispatch(event, &mut ctx);
    }

    /// Advance animations and dispatch an Update event. Call once per frame
    /// before rendering.
    pub fn update(&mut self) {
        let now = Instant::now();
        let delta_time = match self.last_update_time {
            Some(last) => now.duration_since(last).as_secs_f32(),
            None => 1.0 / 60.0, // Assume 60 FPS on first frame
        };
        self.last_update_time = Some(now);

        self.stage.update(delta_time);
        self.handle_event(&Event::Update { delta_time });
    }

    // ========== Model ==========

    /// Replace the current model. On error the previous model stays.
    pub fn load_model(&mut self, model: LoadedModel) -> Result<&ModelInfo> {
        self.stage.load(model)
    }

    pub fn model_info(&self) -> Option<&ModelInfo> {
        self.stage.model_info()
    }

    pub fn wireframe(&self) -> bool {
        self.stage.wireframe()
    }

    pub fn set_wireframe(&mut self, enabled: bool) {
        self.stage.set_wireframe(enabled);
    }

    pub fn toggle_wireframe(&mut self) -> bool {
        let enabled = !self.stage.wireframe();
        self.stage.set_wireframe(enabled);
        enabled
    }

    pub fn grid_visible(&self) -> bool {
        self.stage.grid_visible()
    }

    pub fn toggle_grid(&mut self) -> bool {
        let visible = !self.stage.grid_visible();
        self.stage.set_grid_visible(visible);
        visible
    }

    pub fn play_animation(&mut self, index: usize) {
        self.stage.play_animation(index);
    }

    pub fn toggle_animation(&mut self) {
        self.stage.toggle_animation();
    }

    pub fn stop_animation(&mut self) {
        self.stage.stop_animation();
    }

    // ========== Camera ==========

    pub fn auto_rotate(&self) -> bool {
        self.controls.auto_rotate
    }

    pub fn set_auto_rotate(&mut self, enabled: bool) {
        self.controls.auto_rotate = enabled;
    }

    /// Move the camera back to its configured position and target.
    pub fn reset_camera(&mut self) {
        self.camera.reset(&self.config.camera);
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn controls(&self) -> &ControlSettings {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut ControlSettings {
        &mut self.controls
    }

    // ========== Accessors ==========

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn stage(&self) -> &ModelStage {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut ModelStage {
        &mut self.stage
    }

    /// Current viewport size as (width, height)
    pub fn size(&self) -> (u32, u32) {
        self.renderer.size
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.renderer.config.format
    }

    pub fn wgpu_resources(&self) -> (&wgpu::Device, &wgpu::Queue) {
        (&self.renderer.device, &self.renderer.queue)
    }

    pub fn dispatcher_mut(&mut self) -> &mut EventDispatcher {
        &mut self.dispatcher
    }

    pub fn operator_manager(&self) -> &OperatorManager {
        &self.operator_manager
    }

    /// Both at once, since reordering operators also reorders callbacks.
    pub fn operator_manager_and_dispatcher_mut(&mut self) -> (&mut OperatorManager, &mut EventDispatcher) {
        (&mut self.operator_manager, &mut self.dispatcher)
    }

    // ========== Rendering ==========

    pub fn render(&mut self) -> Result<()> {
        self.renderer.render(self.stage.scene(), &self.camera)
    }

    /// Render the scene, then let `overlay_fn` record more passes (UI,
    /// debug drawing) into the same encoder before presenting.
    pub fn render_with_overlay<F>(&mut self, overlay_fn: F) -> Result<()>
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        let output = self.renderer.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.renderer.device.create_command_encoder(
            &wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder with Overlay"),
            },
        );

        self.renderer
            .render_scene_to_view(&view, None, &mut encoder, self.stage.scene(), &self.camera)?;

        overlay_fn(
            &self.renderer.device,
            &self.renderer.queue,
            &mut encoder,
            &view,
        );

        self.renderer
            .queue
            .submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    /// Render the current view offscreen and return its pixels. UI overlays
    /// are not included.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn screenshot(&mut self) -> Result<image::RgbaImage> {
        self.renderer.capture_frame(self.stage.scene(), &self.camera)
    }

    /// [`Self::screenshot`] encoded as PNG.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn screenshot_png(&mut self) -> Result<Vec<u8>> {
        let image = self.screenshot()?;
        crate::renderer::readback::encode_png(&image)
    }
}
