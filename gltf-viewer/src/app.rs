use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, WindowEvent},
    event_loop::ActiveEventLoop,
    window::{Window, WindowId},
};

use model_viewer::egui_support::EguiViewerApp;
use model_viewer::input::{Key, NamedKey};
use model_viewer::scene::{loader, upload, validate_file_name, LoadHandle, ViewerConfig};
use model_viewer::winit_support;

use crate::ui::{self, LoadingStatus, PanelState};

struct PendingLoad {
    handle: LoadHandle,
    file_name: String,
    started: Instant,
}

/// Application state for the winit event loop.
pub struct App<'a> {
    viewer_app: Option<EguiViewerApp<'a>>,
    config: ViewerConfig,
    screenshot_dir: PathBuf,
    /// Model given on the command line, opened once the window exists
    startup_model: Option<PathBuf>,
    pending: Option<PendingLoad>,
    panel: PanelState,
    /// Initialization failure, reported by `finish`
    fatal: Option<anyhow::Error>,
}

impl<'a> App<'a> {
    pub fn new(config: ViewerConfig, startup_model: Option<PathBuf>, screenshot_dir: PathBuf) -> Self {
        Self {
            viewer_app: None,
            config,
            screenshot_dir,
            startup_model,
            pending: None,
            panel: PanelState::default(),
            fatal: None,
        }
    }

    /// Result of the run once the event loop has returned.
    pub fn finish(self) -> Result<()> {
        match self.fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn handle_redraw_requested(&mut self) {
        self.poll_load();

        let Some(viewer_app) = self.viewer_app.as_mut() else {
            return;
        };

        self.panel.loading = self.pending.as_ref().map(|pending| LoadingStatus {
            file_name: pending.file_name.clone(),
            phase: pending.handle.progress().phase(),
            percent: pending.handle.progress().progress_pct(),
        });

        let mut actions = ui::UiActions::default();
        let panel = &self.panel;
        if let Err(e) = viewer_app.render(|ctx, viewer| {
            actions = ui::build(ctx, viewer, panel);
        }) {
            log::error!("Render error: {:#}", e);
        }
        viewer_app.window().request_redraw();

        if actions.dismiss_message {
            self.panel.error = None;
            self.panel.notice = None;
        }
        if actions.open_file {
            self.open_file_dialog();
        }
        if actions.screenshot {
            self.save_screenshot();
        }
    }

    fn open_file_dialog(&mut self) {
        let file = rfd::FileDialog::new()
            .add_filter("glTF", &upload::dialog_extensions())
            .pick_file();
        if let Some(path) = file {
            self.start_load(path);
        }
    }

    fn start_load(&mut self, path: PathBuf) {
        let file_name = loader::file_name_of(&path);
        if let Err(e) = validate_file_name(&file_name) {
            log::warn!("Rejected {}: {}", path.display(), e);
            self.panel.error = Some(e.to_string());
            return;
        }

        log::info!("Loading {}", path.display());
        self.panel.error = None;
        self.panel.notice = None;
        self.pending = Some(PendingLoad {
            handle: loader::load_path_async(path),
            file_name,
            started: Instant::now(),
        });
    }

    fn poll_load(&mut self) {
        let Some(result) = self.pending.as_ref().and_then(|p| p.handle.try_recv()) else {
            return;
        };
        let Some(pending) = self.pending.take() else {
            return;
        };
        let Some(viewer_app) = self.viewer_app.as_mut() else {
            return;
        };

        let outcome = result
            .map_err(anyhow::Error::from)
            .and_then(|model| viewer_app.viewer_mut().load_model(model).map(|info| info.vertices.clone()));
        match outcome {
            Ok(vertices) => {
                log::info!(
                    "Loaded {} ({} vertices) in {:.2?}",
                    pending.file_name,
                    vertices,
                    pending.started.elapsed()
                );
            }
            Err(e) => {
                log::error!("Failed to load {}: {:#}", pending.file_name, e);
                self.panel.error = Some(format!("Could not load {}: {}", pending.file_name, e));
            }
        }
    }

    fn save_screenshot(&mut self) {
        let Some(viewer_app) = self.viewer_app.as_mut() else {
            return;
        };
        let result = viewer_app
            .viewer_mut()
            .screenshot_png()
            .and_then(|png| write_screenshot(&self.screenshot_dir, &png));
        match result {
            Ok(path) => {
                log::info!("Saved screenshot to {}", path.display());
                self.panel.notice = Some(format!("Saved {}", path.display()));
            }
            Err(e) => {
                log::error!("Screenshot failed: {:#}", e);
                self.panel.error = Some(format!("Screenshot failed: {}", e));
            }
        }
    }
}

fn screenshot_file_name(time: SystemTime) -> String {
    let secs = time.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs());
    format!("screenshot_{}.png", secs)
}

fn write_screenshot(dir: &Path, png: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create screenshot directory {}", dir.display()))?;
    let path = dir.join(screenshot_file_name(SystemTime::now()));
    std::fs::write(&path, png).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

impl<'a> ApplicationHandler for App<'a> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer_app.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title("glTF Model Viewer")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 800))
            .with_min_inner_size(winit::dpi::PhysicalSize::new(800, 600));

        let created = pollster::block_on(EguiViewerApp::with_window_attrs(
            event_loop,
            window_attrs,
            self.config.clone(),
        ));
        let viewer_app = match created {
            Ok(app) => app,
            Err(e) => {
                log::error!("Failed to initialize viewer: {:#}", e);
                self.fatal = Some(e);
                event_loop.exit();
                return;
            }
        };

        ui::apply_theme(viewer_app.egui_ctx(), &self.config.ui);
        viewer_app.window().request_redraw();
        self.viewer_app = Some(viewer_app);

        if let Some(path) = self.startup_model.take() {
            self.start_load(path);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(viewer_app) = self.viewer_app.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => self.handle_redraw_requested(),
            _ => {
                let consumed = viewer_app.handle_window_event(&event);
                if consumed {
                    return;
                }
                let escape = Key::Named(NamedKey::Escape);
                if let Some(model_viewer::event::Event::KeyboardInput { event: key, .. }) =
                    winit_support::convert_window_event(&event)
                {
                    if key.is_press_of(&escape) {
                        event_loop.exit();
                    }
                }
            }
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: winit::event::DeviceId, event: DeviceEvent) {
        if let Some(viewer_app) = &mut self.viewer_app {
            viewer_app.handle_device_event(&event);
        }
    }
}
