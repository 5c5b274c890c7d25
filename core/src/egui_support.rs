//! egui overlay on top of the 3D viewer.
//!
//! [`EguiViewerApp`] owns the window, the [`Viewer`](crate::Viewer) and the
//! egui state, routes winit events (egui first) and draws the UI after the
//! scene in the same frame.
//!
//! ```rust,no_run
//! use model_viewer::egui_support::EguiViewerApp;
//! use model_viewer::scene::ViewerConfig;
//!
//! # fn demo(event_loop: &winit::event_loop::ActiveEventLoop) -> anyhow::Result<()> {
//! let mut app = pollster::block_on(EguiViewerApp::new(event_loop, ViewerConfig::default()))?;
//! app.render(|ctx, viewer| {
//!     egui::SidePanel::left("info").show(ctx, |ui| {
//!         ui.label(format!("Wireframe: {}", viewer.wireframe()));
//!     });
//! })?;
//! # Ok(())
//! # }
//! ```

mod app;
mod render;

pub use app::EguiViewerApp;
