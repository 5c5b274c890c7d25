use cgmath::{EuclideanSpace, Matrix4, Point3, Quaternion, Vector3};

use crate::scene::InstanceId;

/// Unique identifier for a Node in the scene tree.
pub type NodeId = u32;

/// Explicit visibility state. Hidden nodes hide their whole subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Invisible,
}

/// Translation, rotation and scale of a node relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Point3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Point3::new(0.0, 0.0, 0.0),
        rotation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
        scale: Vector3::new(1.0, 1.0, 1.0),
    };

    /// Translation * Rotation * Scale
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position.to_vec())
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A node in the scene tree hierarchy.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: Option<String>,
    transform: Transform,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    instance: Option<InstanceId>,
    visibility: Visibility,
}

impl Node {
    pub fn new(id: NodeId, name: Option<String>, transform: Transform) -> Self {
        Self {
            id,
            name,
            transform,
            parent: None,
            children: Vec::new(),
            instance: None,
            visibility: Visibility::default(),
        }
    }

    pub fn new_default(id: NodeId) -> Self {
        Self::new(id, None, Transform::IDENTITY)
    }

    pub fn compute_local_transform(&self) -> Matrix4<f32> {
        self.transform.to_matrix()
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    pub fn position(&self) -> Point3<f32> {
        self.transform.position
    }

    pub fn set_position(&mut self, position: Point3<f32>) {
        self.transform.position = position;
    }

    pub fn rotation(&self) -> Quaternion<f32> {
        self.transform.rotation
    }

    pub fn set_rotation(&mut self, rotation: Quaternion<f32>) {
        self.transform.rotation = rotation;
    }

    pub fn scale(&self) -> Vector3<f32> {
        self.transform.scale
    }

    pub fn set_scale(&mut self, scale: Vector3<f32>) {
        self.transform.scale = scale;
    }

    // Hierarchy is maintained by Scene

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub(crate) fn add_child(&mut self, child: NodeId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    pub(crate) fn remove_child(&mut self, child: NodeId) {
        self.children.retain(|&id| id != child);
    }

    pub fn instance(&self) -> Option<InstanceId> {
        self.instance
    }

    pub(crate) fn set_instance(&mut self, instance: Option<InstanceId>) {
        self.instance = instance;
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
    }

    pub fn is_visible(&self) -> bool {
        self.visibility == Visibility::Visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::EPSILON;
    use cgmath::{Deg, Rotation3, SquareMatrix, Transform as _};

    #[test]
    fn test_node_default_values() {
        let node = Node::new_default(7);

        assert_eq!(node.id, 7);
        assert_eq!(node.name, None);
        assert_eq!(node.parent(), None);
        assert!(node.children().is_empty());
        assert_eq!(node.instance(), None);
        assert!(node.is_visible());
    }

    #[test]
    fn test_identity_transform() {
        let node = Node::new_default(0);
        assert_eq!(node.compute_local_transform(), Matrix4::identity());
    }

    #[test]
    fn test_trs_order() {
        let transform = Transform {
            position: Point3::new(5.0, 0.0, 0.0),
            rotation: Quaternion::from_angle_z(Deg(90.0)),
            scale: Vector3::new(2.0, 2.0, 2.0),
        };
        // Scale first, then rotate, then translate: (1,0,0) -> (2,0,0) -> (0,2,0) -> (5,2,0)
        let p = transform.to_matrix().transform_point(Point3::new(1.0, 0.0, 0.0));
        assert!((p.x - 5.0).abs() < EPSILON * 10.0);
        assert!((p.y - 2.0).abs() < EPSILON * 10.0);
    }

    #[test]
    fn test_add_child_is_idempotent() {
        let mut node = Node::new_default(1);
        node.add_child(2);
        node.add_child(2);
        assert_eq!(node.children(), &[2]);
        node.remove_child(2);
        assert!(node.children().is_empty());
    }
}
