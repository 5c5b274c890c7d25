//! Navigation limits derived from the size of what is on stage, so zoom
//! and pan feel the same for any model.

use crate::scene::common::Aabb;
use crate::scene::ModelStage;

/// Radius used when nothing is loaded or the bounds are degenerate.
const DEFAULT_MODEL_RADIUS: f32 = 1.0;

const MIN_MODEL_RADIUS: f32 = 1e-6;
const MAX_MODEL_RADIUS: f32 = 1e9;

/// Bounding sphere radius of `bounds`, clamped to sane limits.
pub fn model_radius_from_bounds(bounds: Option<&Aabb>) -> f32 {
    match bounds {
        Some(aabb) => {
            let radius = aabb.bounding_sphere_radius();
            if radius > 0.0 {
                radius.clamp(MIN_MODEL_RADIUS, MAX_MODEL_RADIUS)
            } else {
                DEFAULT_MODEL_RADIUS
            }
        }
        None => DEFAULT_MODEL_RADIUS,
    }
}

/// Radius of the loaded model, or of the whole scene (grid included)
/// when no model is loaded.
pub fn stage_radius(stage: &ModelStage) -> f32 {
    let scene = stage.scene();
    let bounds = stage
        .model_root()
        .and_then(|root| scene.subtree_bounding(root))
        .or_else(|| scene.bounding());
    model_radius_from_bounds(bounds.as_ref())
}

/// Closest zoom distance: 1% of the model radius.
pub fn min_camera_radius(model_radius: f32) -> f32 {
    model_radius * 0.01
}

/// Farthest zoom distance: 100x the model radius.
pub fn max_camera_radius(model_radius: f32) -> f32 {
    model_radius * 100.0
}

/// World units moved per pixel of pan drag.
pub fn pan_sensitivity(model_radius: f32) -> f32 {
    model_radius * 0.001
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ViewerConfig;
    use cgmath::Point3;

    #[test]
    fn test_model_radius_from_bounds_none() {
        assert_eq!(model_radius_from_bounds(None), DEFAULT_MODEL_RADIUS);
    }

    #[test]
    fn test_model_radius_matches_sphere() {
        let bounds = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 10.0, 10.0));
        let radius = model_radius_from_bounds(Some(&bounds));
        assert!((radius - bounds.bounding_sphere_radius()).abs() < 0.01);
    }

    #[test]
    fn test_model_radius_degenerate_and_huge() {
        let point = Aabb::new(Point3::new(1.0, 1.0, 1.0), Point3::new(1.0, 1.0, 1.0));
        assert_eq!(model_radius_from_bounds(Some(&point)), DEFAULT_MODEL_RADIUS);

        let huge = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1e12, 1e12, 1e12));
        assert!(model_radius_from_bounds(Some(&huge)) <= MAX_MODEL_RADIUS);
    }

    #[test]
    fn test_empty_stage_uses_grid_bounds() {
        let stage = ModelStage::new(&ViewerConfig::default()).unwrap();
        // 20x20 grid on the ground plane
        let radius = stage_radius(&stage);
        assert!((radius - 200f32.sqrt()).abs() < 0.01);
    }

    #[test]
    fn test_scaling_factors() {
        let model_radius = 10.0;
        assert!((min_camera_radius(model_radius) - 0.1).abs() < 0.001);
        assert!((max_camera_radius(model_radius) - 1000.0).abs() < 0.1);
        assert!((pan_sensitivity(model_radius) - 0.01).abs() < 0.0001);
    }
}
