use cgmath::{Matrix, Matrix3, Matrix4, SquareMatrix};

use crate::material::MaterialId;
use crate::mesh::{MeshId, PrimitiveType};
use crate::node::NodeId;

/// World transform of one drawn node, with the matrix used to transform its normals.
#[derive(Debug, Clone)]
pub struct InstanceTransform {
    pub node_id: NodeId,
    pub world_transform: Matrix4<f32>,
    pub normal_matrix: Matrix3<f32>,
}

impl InstanceTransform {
    pub fn new(node_id: NodeId, world_transform: Matrix4<f32>) -> Self {
        Self {
            node_id,
            world_transform,
            normal_matrix: compute_normal_matrix(&world_transform),
        }
    }
}

/// Inverse-transpose of the upper 3x3. Falls back to the plain 3x3 for
/// singular transforms (zero scale on an axis).
pub fn compute_normal_matrix(world: &Matrix4<f32>) -> Matrix3<f32> {
    let upper = Matrix3::from_cols(world.x.truncate(), world.y.truncate(), world.z.truncate());
    upper.invert().map(|inv| inv.transpose()).unwrap_or(upper)
}

/// A group of instances that share mesh, material and draw mode, so they
/// can go out in one instanced draw call.
#[derive(Debug, Clone)]
pub struct DrawBatch {
    pub mesh_id: MeshId,
    pub material_id: MaterialId,
    /// Topology actually drawn. Wireframe batches are LineList.
    pub primitive_type: PrimitiveType,
    /// Triangle data drawn through the mesh's edge index list.
    pub wireframe: bool,
    /// Drawn after opaque batches
    pub alpha_blend: bool,
    pub instances: Vec<InstanceTransform>,
}

impl DrawBatch {
    pub fn new(mesh_id: MeshId, material_id: MaterialId, primitive_type: PrimitiveType) -> Self {
        Self {
            mesh_id,
            material_id,
            primitive_type,
            wireframe: false,
            alpha_blend: false,
            instances: Vec::new(),
        }
    }

    pub fn add_instance(&mut self, instance_transform: InstanceTransform) {
        self.instances.push(instance_transform);
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
