use std::sync::Arc;

use anyhow::{Context, Result};
use winit::event::{DeviceEvent, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes};

use crate::scene::ViewerConfig;
use crate::winit_support;
use crate::Viewer;

use super::render::EguiOverlay;

/// Window, viewer and egui overlay bundled together.
///
/// Window events go to egui first and reach the viewer only when egui did
/// not consume them, so dragging a slider never orbits the camera.
pub struct EguiViewerApp<'a> {
    window: Arc<Window>,
    viewer: Viewer<'a>,
    overlay: EguiOverlay,
}

impl<'a> EguiViewerApp<'a> {
    pub async fn new(event_loop: &ActiveEventLoop, config: ViewerConfig) -> Result<Self> {
        Self::with_window_attrs(event_loop, Window::default_attributes(), config).await
    }

    /// Create the window from `window_attrs` (title, size...) and build the
    /// viewer on it.
    pub async fn with_window_attrs(
        event_loop: &ActiveEventLoop,
        window_attrs: WindowAttributes,
        config: ViewerConfig,
    ) -> Result<Self> {
        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .context("Failed to create window")?,
        );

        let viewer = Viewer::from_window(Arc::clone(&window), config).await?;
        let (device, _queue) = viewer.wgpu_resources();
        let overlay = EguiOverlay::new(&window, device, viewer.surface_format());

        Ok(Self {
            window,
            viewer,
            overlay,
        })
    }

    pub fn viewer(&self) -> &Viewer<'a> {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut Viewer<'a> {
        &mut self.viewer
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// For one-time setup such as fonts and visuals.
    pub fn egui_ctx(&self) -> &egui::Context {
        self.overlay.context()
    }

    /// Returns `true` if egui consumed the event.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        let consumed = self.overlay.on_window_event(&self.window, event);

        // Resizes always reach the viewer so the surface matches the window
        let forward = !consumed || matches!(event, WindowEvent::Resized(_));
        if forward {
            if let Some(viewer_event) = winit_support::convert_window_event(event) {
                self.viewer.handle_event(&viewer_event);
            }
        }
        consumed
    }

    /// Raw mouse motion; egui never consumes these.
    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        if let Some(viewer_event) = winit_support::convert_device_event(event) {
            self.viewer.handle_event(&viewer_event);
        }
    }

    /// Advance the viewer one frame, build the UI with `ui_fn` and present
    /// scene plus overlay.
    pub fn render<F>(&mut self, mut ui_fn: F) -> Result<()>
    where
        F: FnMut(&egui::Context, &mut Viewer<'a>),
    {
        self.viewer.update();

        let viewer = &mut self.viewer;
        let full_output = self.overlay.run(&self.window, |ctx| ui_fn(ctx, viewer));

        let size = self.viewer.size();
        let scale_factor = self.window.scale_factor() as f32;
        let overlay = &mut self.overlay;
        self.viewer.render_with_overlay(|device, queue, encoder, view| {
            overlay.paint(full_output, size, scale_factor, device, queue, encoder, view);
        })
    }
}
