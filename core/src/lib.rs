pub mod event;
pub mod input;
pub mod operator;
mod renderer;
mod scene_scale;
mod shaders;
mod viewer;

// `crate::scene::*` resolves to the scene crate
pub use model_viewer_scene as scene;

#[cfg(feature = "winit-support")]
pub mod winit_support;

#[cfg(feature = "egui-support")]
pub mod egui_support;

#[cfg(target_arch = "wasm32")]
mod web;

pub use renderer::readback::encode_png;
pub use scene::{Camera, ControlSettings, LoadedModel, ModelInfo, ModelStage, ViewerConfig};
pub use viewer::Viewer;
