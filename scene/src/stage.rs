//! The viewing stage: lights, ground grid and at most one loaded model with
//! its animation state.

use anyhow::Context;

use crate::animation::AnimationMixer;
use crate::config::{GridConfig, ViewerConfig};
use crate::grid::build_grid;
use crate::loader::{LoadError, LoadedModel};
use crate::material::{Material, MaterialFlags, MaterialId};
use crate::model_info::ModelInfo;
use crate::node::{NodeId, Transform, Visibility};
use crate::normalize::{normalize_model, Normalization};
use crate::scene::Scene;

/// Owns the scene and everything tied to the currently loaded model.
///
/// Loading replaces the previous model completely: its nodes, meshes,
/// materials and textures are removed, its mixer is dropped and the playback
/// state is reset before the new model is placed.
pub struct ModelStage {
    scene: Scene,
    target_size: f32,
    grid_root: NodeId,
    model_root: Option<NodeId>,
    mixer: Option<AnimationMixer>,
    animation_names: Vec<String>,
    current_animation: Option<usize>,
    is_playing: bool,
    wireframe: bool,
    grid_visible: bool,
    model_info: Option<ModelInfo>,
    normalization: Option<Normalization>,
}

impl ModelStage {
    pub fn new(config: &ViewerConfig) -> anyhow::Result<Self> {
        let mut scene = Scene::new();
        scene.lights = config.lights.to_lights();
        let grid_root = add_grid(&mut scene, &config.grid)?;

        let mut stage = Self {
            scene,
            target_size: config.model.target_size,
            grid_root,
            model_root: None,
            mixer: None,
            animation_names: Vec::new(),
            current_animation: None,
            is_playing: false,
            wireframe: false,
            grid_visible: true,
            model_info: None,
            normalization: None,
        };
        stage.set_grid_visible(config.grid.visible);
        Ok(stage)
    }

    // ========== Accessors ==========

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn model_root(&self) -> Option<NodeId> {
        self.model_root
    }

    pub fn has_model(&self) -> bool {
        self.model_root.is_some()
    }

    pub fn model_info(&self) -> Option<&ModelInfo> {
        self.model_info.as_ref()
    }

    pub fn normalization(&self) -> Option<&Normalization> {
        self.normalization.as_ref()
    }

    pub fn animation_names(&self) -> &[String] {
        &self.animation_names
    }

    pub fn current_animation(&self) -> Option<usize> {
        self.current_animation
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn wireframe(&self) -> bool {
        self.wireframe
    }

    pub fn grid_visible(&self) -> bool {
        self.grid_visible
    }

    // ========== Model lifecycle ==========

    /// Replaces the current model with `model`.
    ///
    /// A model without geometry is rejected before anything is torn down, so
    /// the previous model stays on stage.
    pub fn load(&mut self, model: LoadedModel) -> anyhow::Result<&ModelInfo> {
        if model.scene.bounding().is_none() {
            return Err(LoadError::EmptyModel.into());
        }

        self.teardown();

        let LoadedModel {
            scene,
            animations,
            stats,
            file_name,
            file_size,
        } = model;

        let root = self
            .scene
            .add_node(None, Some(file_name.clone()), Transform::IDENTITY)?;
        let node_map = self
            .scene
            .merge(scene, Some(root))
            .context("Failed to place model in scene")?;
        self.model_root = Some(root);

        if !animations.is_empty() {
            let clips: Vec<_> = animations.iter().map(|clip| clip.remap_targets(&node_map)).collect();
            self.animation_names = clips.iter().map(|clip| clip.name.clone()).collect();
            self.mixer = Some(AnimationMixer::new(clips, &self.scene));
        }

        let normalization = normalize_model(&mut self.scene, root, self.target_size).ok_or(LoadError::EmptyModel)?;
        let info = ModelInfo::new(&stats, &normalization, &file_name, file_size);
        log::info!(
            "Model '{}': {} vertices, {} faces, {} materials, {} animations",
            info.file_name,
            info.vertices,
            info.faces,
            info.materials,
            self.animation_names.len()
        );
        self.normalization = Some(normalization);

        if self.wireframe {
            self.apply_wireframe();
        }

        Ok(&*self.model_info.insert(info))
    }

    /// Removes the current model, if any.
    pub fn clear(&mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(mixer) = self.mixer.as_mut() {
            mixer.stop_all_action();
        }
        self.mixer = None;
        self.animation_names.clear();
        self.current_animation = None;
        self.is_playing = false;

        if let Some(root) = self.model_root.take() {
            self.scene.remove_node(root);
            self.scene.prune_unused_resources();
        }
        self.model_info = None;
        self.normalization = None;
    }

    // ========== Display toggles ==========

    pub fn set_wireframe(&mut self, enabled: bool) {
        self.wireframe = enabled;
        self.apply_wireframe();
    }

    fn apply_wireframe(&mut self) {
        for id in self.model_material_ids() {
            if let Some(material) = self.scene.get_material_mut(id) {
                material.set_wireframe(self.wireframe);
            }
        }
    }

    fn model_material_ids(&self) -> Vec<MaterialId> {
        let Some(root) = self.model_root else {
            return Vec::new();
        };
        let mut ids: Vec<MaterialId> = self
            .scene
            .subtree(root)
            .into_iter()
            .filter_map(|id| self.scene.get_node(id)?.instance())
            .filter_map(|instance| self.scene.instances.get(&instance).map(|i| i.material))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn set_grid_visible(&mut self, visible: bool) {
        self.grid_visible = visible;
        let visibility = if visible {
            Visibility::Visible
        } else {
            Visibility::Invisible
        };
        if let Err(e) = self.scene.set_node_visibility(self.grid_root, visibility) {
            log::warn!("Failed to update grid visibility: {}", e);
        }
    }

    // ========== Animation ==========

    /// Plays clip `index` from the start, stopping whatever was playing.
    /// Does nothing without animations or for an out-of-range index.
    pub fn play_animation(&mut self, index: usize) {
        let Some(mixer) = self.mixer.as_mut() else {
            return;
        };
        if index >= mixer.clips().len() {
            return;
        }

        if let Some(current) = self.current_animation {
            if let Some(action) = mixer.clip_action(current) {
                action.stop();
            }
        }

        if let Some(action) = mixer.clip_action(index) {
            action.stop();
            action.play();
            self.current_animation = Some(index);
            self.is_playing = true;
            log::debug!("Playing animation '{}'", action.clip().name);
        }
    }

    /// Pauses or resumes the current animation. A stopped current animation
    /// starts again from the beginning.
    pub fn toggle_animation(&mut self) {
        let (Some(mixer), Some(index)) = (self.mixer.as_mut(), self.current_animation) else {
            return;
        };
        let Some(action) = mixer.clip_action(index) else {
            return;
        };
        self.is_playing = if action.is_active() {
            action.toggle_pause()
        } else {
            action.play();
            true
        };
    }

    /// Stops the current animation and returns the model to its rest pose.
    pub fn stop_animation(&mut self) {
        let (Some(mixer), Some(index)) = (self.mixer.as_mut(), self.current_animation) else {
            return;
        };
        if let Some(action) = mixer.clip_action(index) {
            action.stop();
        }
        mixer.apply(&mut self.scene);
        self.is_playing = false;
    }

    /// Advances animation playback by `delta_time` seconds.
    pub fn update(&mut self, delta_time: f32) {
        let Some(mixer) = self.mixer.as_mut() else {
            return;
        };
        mixer.update(delta_time, &mut self.scene);

        // A clip that plays once ends paused on its last frame
        if self.is_playing {
            self.is_playing = mixer.is_playing();
        }
    }
}

/// Adds the grid under its own root node and returns that root.
fn add_grid(scene: &mut Scene, config: &GridConfig) -> anyhow::Result<NodeId> {
    let grid = build_grid(config);
    let root = scene.add_node(None, Some("grid".to_string()), Transform::IDENTITY)?;

    for (mesh, color, name) in [
        (grid.center_lines, config.center_color, "grid center"),
        (grid.lines, config.line_color, "grid lines"),
    ] {
        if mesh.vertices().is_empty() {
            continue;
        }
        let material = scene.add_material(
            Material::new()
                .with_name(name)
                .with_line_color(color.to_linear())
                .with_flags(MaterialFlags::DO_NOT_LIGHT),
        );
        let mesh = scene.add_mesh(mesh);
        scene.add_instance_node(Some(root), mesh, material, Some(name.to_string()), Transform::IDENTITY)?;
    }

    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gltf::tests::triangle_gltf;
    use crate::loader::load_sync;
    use crate::mesh::PrimitiveType;
    use cgmath::Point3;

    fn stage() -> ModelStage {
        ModelStage::new(&ViewerConfig::default()).unwrap()
    }

    fn triangle_model() -> LoadedModel {
        load_sync(triangle_gltf(), "triangle.gltf").unwrap()
    }

    fn model_mesh_count(stage: &ModelStage) -> usize {
        let root = stage.model_root().unwrap();
        stage
            .scene()
            .subtree(root)
            .into_iter()
            .filter(|id| stage.scene().get_node(*id).unwrap().instance().is_some())
            .count()
    }

    // ========================================================================
    // Construction
    // ========================================================================

    #[test]
    fn test_new_stage_has_lights_and_grid() {
        let stage = stage();
        assert_eq!(stage.scene().lights.len(), 3);
        assert!(!stage.has_model());
        assert!(stage.grid_visible());

        let batches = stage.scene().collect_draw_batches();
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.primitive_type == PrimitiveType::LineList));
    }

    #[test]
    fn test_grid_toggle_hides_grid_batches() {
        let mut stage = stage();
        stage.set_grid_visible(false);
        assert!(stage.scene().collect_draw_batches().is_empty());
        stage.set_grid_visible(true);
        assert_eq!(stage.scene().collect_draw_batches().len(), 2);
    }

    // ========================================================================
    // Loading
    // ========================================================================

    #[test]
    fn test_load_normalizes_and_reports_info() {
        let mut stage = stage();
        let info = stage.load(triangle_model()).unwrap().clone();
        assert_eq!(info.file_name, "triangle.gltf");
        assert_eq!(info.vertices, "3");
        assert_eq!(info.faces, "1");
        assert_eq!(info.materials, 1);
        assert_eq!(info.dimensions, "2.00 x 1.00 x 0.00");
        assert_eq!(info.scale, "1:0.20");

        let root = stage.model_root().unwrap();
        let bounds = stage.scene().subtree_bounding(root).unwrap();
        assert!((bounds.max_dimension() - 10.0).abs() < 1e-4);
        assert!(bounds.min.y.abs() < 1e-4);
        assert_eq!(stage.animation_names(), ["Slide".to_string()]);
    }

    #[test]
    fn test_reload_replaces_previous_model() {
        let mut stage = stage();
        stage.load(triangle_model()).unwrap();
        let first_root = stage.model_root().unwrap();
        let resources = (stage.scene().meshes.len(), stage.scene().materials.len());

        stage.play_animation(0);
        stage.load(triangle_model()).unwrap();

        assert_ne!(stage.model_root(), Some(first_root));
        assert!(stage.scene().get_node(first_root).is_none());
        assert_eq!((stage.scene().meshes.len(), stage.scene().materials.len()), resources);
        assert_eq!(model_mesh_count(&stage), 1);
        assert_eq!(stage.current_animation(), None);
        assert!(!stage.is_playing());
    }

    #[test]
    fn test_empty_model_keeps_previous() {
        let mut stage = stage();
        stage.load(triangle_model()).unwrap();
        let root = stage.model_root();

        let empty = LoadedModel {
            scene: Scene::new(),
            animations: Vec::new(),
            stats: Default::default(),
            file_name: "empty.glb".into(),
            file_size: None,
        };
        assert!(stage.load(empty).is_err());
        assert_eq!(stage.model_root(), root);
        assert!(stage.model_info().is_some());
    }

    #[test]
    fn test_clear_removes_model() {
        let mut stage = stage();
        stage.load(triangle_model()).unwrap();
        stage.clear();
        assert!(!stage.has_model());
        assert!(stage.model_info().is_none());
        assert!(stage.animation_names().is_empty());
        // Only the grid remains
        assert_eq!(stage.scene().collect_draw_batches().len(), 2);
    }

    // ========================================================================
    // Wireframe
    // ========================================================================

    #[test]
    fn test_wireframe_applies_to_model_only() {
        let mut stage = stage();
        stage.load(triangle_model()).unwrap();
        stage.set_wireframe(true);

        let batches = stage.scene().collect_draw_batches();
        assert_eq!(batches.iter().filter(|b| b.wireframe).count(), 1);
        assert!(batches.iter().all(|b| b.primitive_type == PrimitiveType::LineList));
    }

    #[test]
    fn test_wireframe_survives_reload() {
        let mut stage = stage();
        stage.set_wireframe(true);
        stage.load(triangle_model()).unwrap();
        assert!(stage.scene().collect_draw_batches().iter().any(|b| b.wireframe));

        stage.set_wireframe(false);
        assert!(!stage.scene().collect_draw_batches().iter().any(|b| b.wireframe));
    }

    // ========================================================================
    // Animation
    // ========================================================================

    fn animated_node_position(stage: &ModelStage) -> Point3<f32> {
        let root = stage.model_root().unwrap();
        let id = stage
            .scene()
            .subtree(root)
            .into_iter()
            .find(|id| stage.scene().get_node(*id).unwrap().name.as_deref() == Some("TriNode"))
            .unwrap();
        stage.scene().get_node(id).unwrap().position()
    }

    #[test]
    fn test_animation_controls_without_model_are_noops() {
        let mut stage = stage();
        stage.play_animation(0);
        stage.toggle_animation();
        stage.stop_animation();
        stage.update(0.5);
        assert!(!stage.is_playing());
        assert_eq!(stage.current_animation(), None);
    }

    #[test]
    fn test_play_invalid_index_is_ignored() {
        let mut stage = stage();
        stage.load(triangle_model()).unwrap();
        stage.play_animation(3);
        assert_eq!(stage.current_animation(), None);
        assert!(!stage.is_playing());
    }

    #[test]
    fn test_play_toggle_stop() {
        let mut stage = stage();
        stage.load(triangle_model()).unwrap();
        let rest = animated_node_position(&stage);

        stage.play_animation(0);
        assert!(stage.is_playing());
        stage.update(0.5);
        assert_eq!(animated_node_position(&stage), Point3::new(2.5, 0.0, 0.0));

        stage.toggle_animation();
        assert!(!stage.is_playing());
        stage.update(0.25);
        assert_eq!(animated_node_position(&stage), Point3::new(2.5, 0.0, 0.0));

        stage.toggle_animation();
        assert!(stage.is_playing());

        stage.stop_animation();
        assert!(!stage.is_playing());
        assert_eq!(animated_node_position(&stage), rest);
        assert_eq!(stage.current_animation(), Some(0));
    }
}
