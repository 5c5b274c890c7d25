//! Model loading with progress reporting.
//!
//! Format is detected from magic bytes, falling back to the file name
//! extension. Import runs in phases (parse, buffers, images, build) and the
//! shared [`LoadProgress`] is updated between them.
//!
//! # Native
//! [`load_async`] runs on a background thread. The caller polls
//! [`LoadHandle`] each frame for completion and progress.
//!
//! # WASM
//! Loading runs via `wasm_bindgen_futures::spawn_local`, yielding to the
//! browser event loop between phases so the page keeps painting.
//!
//! # Examples
//!
//! ```no_run
//! use model_viewer_scene::loader::load_async;
//!
//! let bytes = std::fs::read("model.glb").unwrap();
//! let handle = load_async(bytes, "model.glb".to_string());
//!
//! // In your render loop:
//! // if let Some(result) = handle.try_recv() { ... }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use thiserror::Error;
use web_time::Instant;

use crate::animation::AnimationClip;
use crate::model_info::ModelStats;
use crate::Scene;

// ============================================================================
// Type Aliases
// ============================================================================

/// The result type produced by a completed load operation.
pub type LoadResult = Result<LoadedModel, LoadError>;

/// Receiver for the native async load result.
#[cfg(not(target_arch = "wasm32"))]
type LoadReceiver = std::sync::mpsc::Receiver<LoadResult>;

/// Shared cell for the WASM async load result.
#[cfg(target_arch = "wasm32")]
type LoadResultCell = std::rc::Rc<std::cell::RefCell<Option<LoadResult>>>;

// ============================================================================
// Types
// ============================================================================

/// A model imported from a file, before it is placed on a stage.
pub struct LoadedModel {
    pub scene: Scene,
    pub animations: Vec<AnimationClip>,
    pub stats: ModelStats,
    pub file_name: String,
    /// Size of the source in bytes
    pub file_size: Option<u64>,
}

/// The container format that was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedFormat {
    /// Binary glTF
    Glb,
    /// JSON glTF
    Gltf,
}

/// Coarse loading phases for progress display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoadPhase {
    Pending = 0,
    Parsing = 1,
    Buffers = 2,
    Images = 3,
    Building = 4,
    Complete = 5,
    Failed = 6,
}

impl LoadPhase {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Pending,
            1 => Self::Parsing,
            2 => Self::Buffers,
            3 => Self::Images,
            4 => Self::Building,
            5 => Self::Complete,
            _ => Self::Failed,
        }
    }
}

/// Errors that can occur during model loading.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("glTF error: {0}")]
    Gltf(String),

    #[error("Unknown file format")]
    UnknownFormat,

    #[error("Unsupported required glTF extension: {0}")]
    UnsupportedExtension(String),

    #[error("The file contains no renderable geometry")]
    EmptyModel,
}

/// Shared progress state, readable from any thread.
pub struct LoadProgress {
    phase: Arc<AtomicU8>,
    progress_pct: Arc<AtomicU8>,
}

impl LoadProgress {
    fn new() -> Self {
        Self {
            phase: Arc::new(AtomicU8::new(LoadPhase::Pending as u8)),
            progress_pct: Arc::new(AtomicU8::new(0)),
        }
    }

    /// Current loading phase.
    pub fn phase(&self) -> LoadPhase {
        LoadPhase::from_u8(self.phase.load(Ordering::Relaxed))
    }

    /// Overall progress percentage (0-100).
    pub fn progress_pct(&self) -> u8 {
        self.progress_pct.load(Ordering::Relaxed)
    }

    fn set_phase(&self, phase: LoadPhase, pct: u8) {
        self.phase.store(phase as u8, Ordering::Relaxed);
        self.progress_pct.store(pct.min(100), Ordering::Relaxed);
        if phase != LoadPhase::Failed {
            log::info!("Loading: {}%", pct.min(100));
        }
    }

    fn clone_arcs(&self) -> Self {
        Self {
            phase: Arc::clone(&self.phase),
            progress_pct: Arc::clone(&self.progress_pct),
        }
    }
}

/// Handle to a loading operation in progress.
///
/// Poll this each frame with [`try_recv`](LoadHandle::try_recv) to check for
/// completion, and read [`progress`](LoadHandle::progress) to display a
/// progress bar.
pub struct LoadHandle {
    progress: LoadProgress,
    done: Arc<AtomicBool>,
    #[cfg(not(target_arch = "wasm32"))]
    receiver: LoadReceiver,
    #[cfg(target_arch = "wasm32")]
    result: LoadResultCell,
}

impl LoadHandle {
    /// Returns `Some(result)` if loading has completed, `None` if still in progress.
    ///
    /// Consumes the result on first successful call. Subsequent calls return `None`.
    pub fn try_recv(&self) -> Option<LoadResult> {
        #[cfg(not(target_arch = "wasm32"))]
        {
            self.receiver.try_recv().ok()
        }

        #[cfg(target_arch = "wasm32")]
        {
            self.result.borrow_mut().take()
        }
    }

    pub fn progress(&self) -> &LoadProgress {
        &self.progress
    }

    /// Returns true if loading has completed (success or failure).
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

// ============================================================================
// Format Detection
// ============================================================================

/// Detect format from magic bytes.
pub fn detect_format_from_bytes(bytes: &[u8]) -> Option<DetectedFormat> {
    if bytes.starts_with(b"glTF") {
        return Some(DetectedFormat::Glb);
    }

    // JSON starts with '{', possibly after whitespace or a UTF-8 BOM
    let body = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    match body.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') => Some(DetectedFormat::Gltf),
        _ => None,
    }
}

/// Detect format from the file name extension as a fallback.
pub fn detect_format_from_name(name: &str) -> Option<DetectedFormat> {
    match crate::upload::file_extension(name).as_deref() {
        Some(".glb") => Some(DetectedFormat::Glb),
        Some(".gltf") => Some(DetectedFormat::Gltf),
        _ => None,
    }
}

pub fn detect_format(bytes: &[u8], name: &str) -> Result<DetectedFormat, LoadError> {
    detect_format_from_bytes(bytes)
        .or_else(|| detect_format_from_name(name))
        .ok_or(LoadError::UnknownFormat)
}

// ============================================================================
// Sync Loading (core logic)
// ============================================================================

/// Load a model held in memory. External resources cannot be resolved and
/// fail the load.
pub fn load_sync(bytes: Vec<u8>, name: &str) -> LoadResult {
    load_with_progress(bytes, name, None, &LoadProgress::new())
}

/// Load a model from disk. External `.bin` and image files resolve relative
/// to the file's directory.
pub fn load_path(path: &Path) -> LoadResult {
    let bytes = std::fs::read(path)?;
    load_with_progress(bytes, &file_name_of(path), path.parent(), &LoadProgress::new())
}

/// Final path component, or the whole path when there is none.
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn load_with_progress(bytes: Vec<u8>, name: &str, base: Option<&Path>, progress: &LoadProgress) -> LoadResult {
    use crate::gltf::{build_model, load_buffers, load_images, parse_gltf};

    let started = Instant::now();
    log::info!("Loading model '{}' ({} bytes)", name, bytes.len());
    let file_size = Some(bytes.len() as u64);

    progress.set_phase(LoadPhase::Parsing, 10);
    let format = detect_format(&bytes, name)?;
    log::debug!("Detected {:?} format", format);
    let mut parsed = parse_gltf(&bytes)?;
    drop(bytes);

    progress.set_phase(LoadPhase::Buffers, 30);
    let buffers = load_buffers(&mut parsed, base)?;

    progress.set_phase(LoadPhase::Images, 50);
    let images = load_images(&parsed, base, &buffers)?;

    progress.set_phase(LoadPhase::Building, 80);
    let imported = build_model(&parsed, &buffers, &images)?;
    let model = finish(imported, name, file_size)?;

    progress.set_phase(LoadPhase::Complete, 100);
    log::info!("Loaded '{}' in {:.1?}", name, started.elapsed());
    Ok(model)
}

fn finish(imported: crate::gltf::ImportedGltf, name: &str, file_size: Option<u64>) -> LoadResult {
    if imported.scene.meshes.is_empty() {
        return Err(LoadError::EmptyModel);
    }
    Ok(LoadedModel {
        scene: imported.scene,
        animations: imported.animations,
        stats: imported.stats,
        file_name: name.to_string(),
        file_size,
    })
}

// ============================================================================
// Async Loading: Native
// ============================================================================

/// Start loading a model asynchronously.
///
/// On native, spawns a background thread. On WASM, runs as a local future
/// with yield points between loading phases.
#[cfg(not(target_arch = "wasm32"))]
pub fn load_async(bytes: Vec<u8>, name: String) -> LoadHandle {
    spawn_load(move |progress| load_with_progress(bytes, &name, None, progress))
}

/// Like [`load_async`] but reads from disk, resolving external resources.
#[cfg(not(target_arch = "wasm32"))]
pub fn load_path_async(path: PathBuf) -> LoadHandle {
    spawn_load(move |progress| {
        let bytes = std::fs::read(&path)?;
        load_with_progress(bytes, &file_name_of(&path), path.parent(), progress)
    })
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_load<F>(job: F) -> LoadHandle
where
    F: FnOnce(&LoadProgress) -> LoadResult + Send + 'static,
{
    let progress = LoadProgress::new();
    let progress_clone = progress.clone_arcs();
    let done = Arc::new(AtomicBool::new(false));
    let done_clone = Arc::clone(&done);
    let (tx, rx) = std::sync::mpsc::channel();

    std::thread::spawn(move || {
        let result = job(&progress_clone);
        if let Err(e) = &result {
            log::error!("Load failed: {}", e);
            progress_clone.set_phase(LoadPhase::Failed, 0);
        }
        done_clone.store(true, Ordering::Release);
        let _ = tx.send(result);
    });

    LoadHandle {
        progress,
        done,
        receiver: rx,
    }
}

// ============================================================================
// Async Loading: WASM
// ============================================================================

/// Start loading a model asynchronously.
///
/// On native, spawns a background thread. On WASM, runs as a local future
/// with yield points between loading phases.
#[cfg(target_arch = "wasm32")]
pub fn load_async(bytes: Vec<u8>, name: String) -> LoadHandle {
    use std::cell::RefCell;
    use std::rc::Rc;

    let progress = LoadProgress::new();
    let progress_clone = progress.clone_arcs();
    let done = Arc::new(AtomicBool::new(false));
    let done_clone = Arc::clone(&done);
    let result_cell: LoadResultCell = Rc::new(RefCell::new(None));
    let result_clone = Rc::clone(&result_cell);

    wasm_bindgen_futures::spawn_local(async move {
        let result = load_chunked_wasm(bytes, &name, &progress_clone).await;
        if let Err(e) = &result {
            log::error!("Load failed: {}", e);
            progress_clone.set_phase(LoadPhase::Failed, 0);
        }
        done_clone.store(true, Ordering::Release);
        *result_clone.borrow_mut() = Some(result);
    });

    LoadHandle {
        progress,
        done,
        result: result_cell,
    }
}

/// Yield to the browser event loop so it can render and handle input
/// between expensive phases.
///
/// Uses `setTimeout(0)` to schedule a macrotask; a resolved `Promise` alone
/// only creates a microtask, which runs before the browser paints. Resolves
/// immediately when no `setTimeout` is available.
#[cfg(target_arch = "wasm32")]
async fn yield_to_event_loop() {
    use wasm_bindgen::{JsCast, JsValue};

    let promise = js_sys::Promise::new(&mut |resolve, _| {
        let global = js_sys::global();
        let set_timeout = js_sys::Reflect::get(&global, &JsValue::from_str("setTimeout"))
            .ok()
            .and_then(|f| f.dyn_into::<js_sys::Function>().ok());
        match set_timeout {
            Some(set_timeout) => {
                let _ = set_timeout.call2(&JsValue::NULL, &resolve, &JsValue::from(0));
            }
            None => {
                let _ = resolve.call0(&JsValue::NULL);
            }
        }
    });
    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}

/// WASM chunked loading: the same phases as the sync path with yields between them.
#[cfg(target_arch = "wasm32")]
async fn load_chunked_wasm(bytes: Vec<u8>, name: &str, progress: &LoadProgress) -> LoadResult {
    use crate::gltf::{build_model, load_buffers, load_images, parse_gltf};

    let started = Instant::now();
    log::info!("Loading model '{}' ({} bytes)", name, bytes.len());
    let file_size = Some(bytes.len() as u64);

    progress.set_phase(LoadPhase::Parsing, 10);
    yield_to_event_loop().await;
    detect_format(&bytes, name)?;
    let mut parsed = parse_gltf(&bytes)?;
    drop(bytes);

    progress.set_phase(LoadPhase::Buffers, 30);
    yield_to_event_loop().await;
    let buffers = load_buffers(&mut parsed, None)?;

    progress.set_phase(LoadPhase::Images, 50);
    yield_to_event_loop().await;
    let images = load_images(&parsed, None, &buffers)?;

    progress.set_phase(LoadPhase::Building, 80);
    yield_to_event_loop().await;
    let imported = build_model(&parsed, &buffers, &images)?;
    let model = finish(imported, name, file_size)?;

    progress.set_phase(LoadPhase::Complete, 100);
    log::info!("Loaded '{}' in {:.1?}", name, started.elapsed());
    Ok(model)
}
