#[cfg(not(target_arch = "wasm32"))]
mod app;
#[cfg(not(target_arch = "wasm32"))]
mod ui;

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    use std::path::PathBuf;

    use anyhow::Context;
    use clap::Parser;
    use model_viewer::scene::{config, ViewerConfig};
    use winit::event_loop::EventLoop;

    /// Interactive glTF/GLB model viewer
    #[derive(Parser, Debug)]
    #[command(version, about)]
    struct Args {
        /// .glb or .gltf file to open at startup
        model: Option<PathBuf>,

        /// TOML file overriding colors, lights, camera and controls
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Where screenshots are written
        #[arg(long, default_value = ".")]
        screenshot_dir: PathBuf,
    }

    env_logger::init();
    let args = Args::parse();

    let viewer_config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => ViewerConfig::default(),
    };

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let mut app = app::App::new(viewer_config, args.model, args.screenshot_dir);
    event_loop.run_app(&mut app)?;
    app.finish()
}

// The browser build is the host page in web/ driving model_viewer's WebViewer.
#[cfg(target_arch = "wasm32")]
fn main() {}
