//! Fits an arbitrary model into the canonical viewing frame.

use cgmath::{EuclideanSpace, Point3, Vector3};

use crate::common::Aabb;
use crate::node::NodeId;
use crate::scene::Scene;

/// What normalization measured and applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalization {
    /// World bounds before normalization
    pub bounds: Aabb,
    pub center: Point3<f32>,
    /// Unscaled size of the bounds
    pub size: Vector3<f32>,
    /// Uniform factor applied to the root
    pub scale: f32,
}

/// World-space bounds of everything under `root`.
pub fn model_bounds(scene: &Scene, root: NodeId) -> Option<Aabb> {
    scene.subtree_bounding(root)
}

/// Uniform scale that makes the longest side `target_size`. A degenerate
/// (zero-size) model keeps its scale.
pub fn fit_scale(size: Vector3<f32>, target_size: f32) -> f32 {
    let max_dim = size.x.max(size.y).max(size.z);
    if max_dim > 0.0 {
        target_size / max_dim
    } else {
        1.0
    }
}

/// Rescales `root` so the model's longest side is `target_size`, centers it
/// on X and Z and sets it down on y = 0.
///
/// Returns None, leaving the root untouched, when the subtree has no geometry.
pub fn normalize_model(scene: &mut Scene, root: NodeId, target_size: f32) -> Option<Normalization> {
    let bounds = model_bounds(scene, root)?;
    let center = bounds.center();
    let size = bounds.size();
    let scale = fit_scale(size, target_size);

    let node = scene.get_node_mut(root)?;
    let mut transform = *node.transform();
    // Scaling the root scales its existing offset too, then the offset moves
    // the scaled bounds so that center.xz and min.y land on the origin.
    let offset = Vector3::new(-center.x * scale, -bounds.min.y * scale, -center.z * scale);
    transform.position = Point3::from_vec(transform.position.to_vec() * scale + offset);
    transform.scale *= scale;
    node.set_transform(transform);

    log::debug!(
        "Normalized model: size {:.3} x {:.3} x {:.3}, scale {:.4}",
        size.x,
        size.y,
        size.z,
        scale
    );

    Some(Normalization {
        bounds,
        center,
        size,
        scale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::DEFAULT_MATERIAL_ID;
    use crate::mesh::{Mesh, MeshPrimitive, PrimitiveType, Vertex};
    use crate::node::Transform;

    /// A model root holding one triangle spanning the given corners.
    fn scene_with_triangle(min: [f32; 3], max: [f32; 3]) -> (Scene, NodeId) {
        let mut scene = Scene::new();
        let vertices = vec![
            Vertex::new(min, [0.0, 0.0], [0.0, 0.0, 1.0]),
            Vertex::new([max[0], min[1], max[2]], [0.0, 0.0], [0.0, 0.0, 1.0]),
            Vertex::new(max, [0.0, 0.0], [0.0, 0.0, 1.0]),
        ];
        let mesh = scene.add_mesh(Mesh::from_raw(
            0,
            vertices,
            vec![MeshPrimitive {
                primitive_type: PrimitiveType::TriangleList,
                indices: vec![0, 1, 2],
            }],
        ));
        let root = scene.add_node(None, Some("model".into()), Transform::IDENTITY).unwrap();
        scene
            .add_instance_node(Some(root), mesh, DEFAULT_MATERIAL_ID, None, Transform::IDENTITY)
            .unwrap();
        (scene, root)
    }

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-4, "{} != {}", a, b);
    }

    #[test]
    fn test_fit_scale() {
        assert_eq!(fit_scale(Vector3::new(2.0, 5.0, 1.0), 10.0), 2.0);
        assert_eq!(fit_scale(Vector3::new(0.0, 0.0, 0.0), 10.0), 1.0);
    }

    #[test]
    fn test_normalize_centers_and_grounds() {
        let (mut scene, root) = scene_with_triangle([2.0, 1.0, -4.0], [6.0, 3.0, 0.0]);
        let result = normalize_model(&mut scene, root, 10.0).unwrap();

        assert_eq!(result.size, Vector3::new(4.0, 2.0, 4.0));
        assert_eq!(result.center, Point3::new(4.0, 2.0, -2.0));
        assert_close(result.scale, 2.5);

        let after = model_bounds(&scene, root).unwrap();
        assert_close(after.min.y, 0.0);
        assert_close(after.center().x, 0.0);
        assert_close(after.center().z, 0.0);
        assert_close(after.max_dimension(), 10.0);
    }

    #[test]
    fn test_normalize_composes_existing_root_transform() {
        let (mut scene, root) = scene_with_triangle([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        scene
            .get_node_mut(root)
            .unwrap()
            .set_position(Point3::new(100.0, -50.0, 7.0));

        normalize_model(&mut scene, root, 10.0).unwrap();
        let after = model_bounds(&scene, root).unwrap();
        assert_close(after.min.y, 0.0);
        assert_close(after.center().x, 0.0);
        assert_close(after.center().z, 0.0);
        assert_close(after.size().y, 10.0);
    }

    #[test]
    fn test_normalize_flat_point_model_keeps_scale() {
        let (mut scene, root) = scene_with_triangle([3.0, 3.0, 3.0], [3.0, 3.0, 3.0]);
        let result = normalize_model(&mut scene, root, 10.0).unwrap();
        assert_eq!(result.scale, 1.0);
        let after = model_bounds(&scene, root).unwrap();
        assert_close(after.min.x, 0.0);
        assert_close(after.min.y, 0.0);
    }

    #[test]
    fn test_normalize_empty_subtree() {
        let mut scene = Scene::new();
        let root = scene.add_node(None, None, Transform::IDENTITY).unwrap();
        assert!(normalize_model(&mut scene, root, 10.0).is_none());
        assert_eq!(*scene.get_node(root).unwrap().transform(), Transform::IDENTITY);
    }
}
