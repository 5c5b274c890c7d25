use wasm_bindgen::prelude::*;
use web_sys::HtmlCanvasElement;

use crate::event::Event;
use crate::input::{ElementState, Key, KeyEvent, MouseButton, MouseScrollDelta};
use crate::scene::{loader, upload, validate_file_name, LoadHandle, ViewerConfig};
use crate::viewer::Viewer;

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Browser entry point. The host page owns the DOM (file input, buttons,
/// info panel) and forwards canvas events here.
#[wasm_bindgen]
pub struct WebViewer {
    viewer: Viewer<'static>,
    canvas: HtmlCanvasElement,
    pending: Option<LoadHandle>,
    last_error: Option<String>,
}

#[wasm_bindgen]
impl WebViewer {
    /// `const viewer = await WebViewer.create(canvas, configToml);`
    ///
    /// `config_toml` overrides the default look; pass `undefined` for the
    /// defaults.
    pub async fn create(canvas: HtmlCanvasElement, config_toml: Option<String>) -> Result<WebViewer, JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).ok();

        let config = match config_toml {
            Some(text) => ViewerConfig::from_toml_str(&text).map_err(js_error)?,
            None => ViewerConfig::default(),
        };
        let viewer = Viewer::from_canvas(canvas.clone(), config)
            .await
            .map_err(js_error)?;
        Ok(WebViewer {
            viewer,
            canvas,
            pending: None,
            last_error: None,
        })
    }

    /// `accept` attribute for the page's file input.
    pub fn file_input_accept() -> String {
        upload::file_input_accept()
    }

    /// Call once per frame from requestAnimationFrame.
    pub fn update_and_render(&mut self) {
        self.poll_load();
        self.viewer.update();
        if let Err(e) = self.viewer.render() {
            log::error!("Render error: {}", e);
        }
    }

    /// Canvas size in device pixels (CSS size * devicePixelRatio).
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewer.handle_event(&Event::Resized((width, height)));
    }

    /// `dx`, `dy` come from MouseEvent.movementX/Y.
    pub fn on_mouse_move(&mut self, x: f64, y: f64, dx: f64, dy: f64) {
        self.viewer
            .handle_event(&Event::CursorMoved { position: (x, y) });
        self.viewer
            .handle_event(&Event::MouseMotion { delta: (dx, dy) });
    }

    pub fn on_mouse_down(&mut self, button: i16) {
        self.viewer.handle_event(&Event::MouseInput {
            state: ElementState::Pressed,
            button: MouseButton::from_dom_button(button),
        });
    }

    pub fn on_mouse_up(&mut self, button: i16) {
        self.viewer.handle_event(&Event::MouseInput {
            state: ElementState::Released,
            button: MouseButton::from_dom_button(button),
        });
    }

    /// WheelEvent deltas in pixels. DOM deltaY is positive when scrolling
    /// toward the user, the opposite of winit.
    pub fn on_wheel(&mut self, delta_x: f32, delta_y: f32) {
        self.viewer.handle_event(&Event::MouseWheel {
            delta: MouseScrollDelta::PixelDelta(-delta_x, -delta_y),
        });
    }

    pub fn on_key_down(&mut self, key: &str, repeat: bool) {
        self.key_event(key, ElementState::Pressed, repeat);
    }

    pub fn on_key_up(&mut self, key: &str) {
        self.key_event(key, ElementState::Released, false);
    }

    fn key_event(&mut self, key: &str, state: ElementState, repeat: bool) {
        self.viewer.handle_event(&Event::KeyboardInput {
            event: KeyEvent {
                logical_key: Key::from_dom_key(key),
                state,
                repeat,
            },
            is_synthetic: false,
        });
    }

    /// Start loading a .glb/.gltf from the bytes of a selected file. Rejects
    /// other extensions immediately; later failures show up in
    /// `take_error()`.
    pub fn load_model(&mut self, bytes: Vec<u8>, file_name: String) -> Result<(), JsValue> {
        validate_file_name(&file_name).map_err(js_error)?;
        log::info!("Loading {} ({} bytes)", file_name, bytes.len());
        self.last_error = None;
        self.pending = Some(loader::load_async(bytes, file_name));
        Ok(())
    }

    fn poll_load(&mut self) {
        let Some(result) = self.pending.as_ref().and_then(|handle| handle.try_recv()) else {
            return;
        };
        self.pending = None;
        let outcome = result
            .map_err(anyhow::Error::from)
            .and_then(|model| self.viewer.load_model(model).map(|_| ()));
        if let Err(e) = outcome {
            log::error!("Failed to load model: {:#}", e);
            self.last_error = Some(format!("{:#}", e));
        }
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// 0..=100 while a load is running.
    pub fn load_progress(&self) -> u8 {
        self.pending
            .as_ref()
            .map_or(0, |handle| handle.progress().progress_pct())
    }

    pub fn load_phase(&self) -> Option<String> {
        self.pending
            .as_ref()
            .map(|handle| format!("{:?}", handle.progress().phase()))
    }

    /// The last load error, cleared by reading it.
    pub fn take_error(&mut self) -> Option<String> {
        self.last_error.take()
    }

    /// `{ fileName, fileSize, vertices, faces, dimensions, materials, scale }`
    /// or `null` when no model is loaded.
    pub fn model_info(&self) -> Result<JsValue, JsValue> {
        let Some(info) = self.viewer.model_info() else {
            return Ok(JsValue::NULL);
        };
        let object = js_sys::Object::new();
        let fields: [(&str, JsValue); 7] = [
            ("fileName", info.file_name.as_str().into()),
            ("fileSize", info.file_size.as_str().into()),
            ("vertices", info.vertices.as_str().into()),
            ("faces", info.faces.as_str().into()),
            ("dimensions", info.dimensions.as_str().into()),
            ("materials", (info.materials as u32).into()),
            ("scale", info.scale.as_str().into()),
        ];
        for (key, value) in fields {
            js_sys::Reflect::set(&object, &key.into(), &value)?;
        }
        Ok(object.into())
    }

    pub fn toggle_wireframe(&mut self) -> bool {
        self.viewer.toggle_wireframe()
    }

    pub fn toggle_grid(&mut self) -> bool {
        self.viewer.toggle_grid()
    }

    pub fn set_auto_rotate(&mut self, enabled: bool) {
        self.viewer.set_auto_rotate(enabled);
    }

    pub fn reset_camera(&mut self) {
        self.viewer.reset_camera();
    }

    pub fn animation_names(&self) -> js_sys::Array {
        self.viewer
            .stage()
            .animation_names()
            .iter()
            .map(|name| JsValue::from_str(name))
            .collect()
    }

    pub fn play_animation(&mut self, index: usize) {
        self.viewer.play_animation(index);
    }

    pub fn toggle_animation(&mut self) {
        self.viewer.toggle_animation();
    }

    pub fn stop_animation(&mut self) {
        self.viewer.stop_animation();
    }

    /// PNG data URL of the current view for an `<a download>` link, or an
    /// empty string when nothing could be captured. Renders first so the
    /// drawing buffer still holds the frame.
    pub fn take_screenshot(&mut self) -> String {
        if let Err(e) = self.viewer.render() {
            log::error!("Screenshot render failed: {}", e);
            return String::new();
        }
        match self.canvas.to_data_url_with_type("image/png") {
            Ok(url) => url,
            Err(e) => {
                log::error!("Screenshot capture failed: {:?}", e);
                String::new()
            }
        }
    }
}
