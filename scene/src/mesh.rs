use std::cell::{Cell, OnceCell};

use cgmath::Point3;

use crate::common::Aabb;
use crate::wireframe;

/// Unique identifier for a mesh in the scene.
pub type MeshId = u32;

/// Index type used for mesh index buffers. 32-bit so that scanned and
/// photogrammetry models with more than 65k vertices load unchanged.
pub type MeshIndex = u32;

/// Primitive types for mesh rendering
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveType {
    TriangleList,
    LineList,
    PointList,
}

/// A collection of indices representing a single primitive type in a mesh
#[derive(Debug, Clone)]
pub struct MeshPrimitive {
    pub primitive_type: PrimitiveType,
    pub indices: Vec<MeshIndex>,
}

/// Vertex layout shared with the renderer: position, texture coordinates, normal.
///
/// 32 bytes, `#[repr(C)]` and `Pod` so vertex slices upload without copying.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex {
    pub fn new(position: [f32; 3], tex_coords: [f32; 2], normal: [f32; 3]) -> Self {
        Self { position, tex_coords, normal }
    }
}

/// Device-free mesh data. GPU buffers are created by the renderer on first use.
#[derive(Debug)]
pub struct Mesh {
    id: MeshId,
    vertices: Vec<Vertex>,
    primitives: Vec<MeshPrimitive>,
    cached_bounding: Cell<Option<Aabb>>,
    wireframe_indices: OnceCell<Vec<MeshIndex>>,
}

impl Mesh {
    /// Creates a mesh from raw vertex and primitive data.
    pub fn from_raw(id: MeshId, vertices: Vec<Vertex>, primitives: Vec<MeshPrimitive>) -> Self {
        Self {
            id,
            vertices,
            primitives,
            cached_bounding: Cell::new(None),
            wireframe_indices: OnceCell::new(),
        }
    }

    pub fn id(&self) -> MeshId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: MeshId) {
        self.id = id;
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn primitives(&self) -> &[MeshPrimitive] {
        &self.primitives
    }

    pub fn has_primitive_type(&self, primitive_type: PrimitiveType) -> bool {
        self.primitives
            .iter()
            .any(|p| p.primitive_type == primitive_type && !p.indices.is_empty())
    }

    /// All indices of the given primitive type, concatenated.
    pub fn indices_of(&self, primitive_type: PrimitiveType) -> Vec<MeshIndex> {
        self.primitives
            .iter()
            .filter(|p| p.primitive_type == primitive_type)
            .flat_map(|p| p.indices.iter().copied())
            .collect()
    }

    /// Line-list indices covering each unique triangle edge once. Built lazily
    /// the first time a wireframe draw needs them.
    pub fn wireframe_indices(&self) -> &[MeshIndex] {
        self.wireframe_indices.get_or_init(|| {
            wireframe::edge_indices(&self.indices_of(PrimitiveType::TriangleList))
        })
    }

    /// Local-space bounding box, or None for a mesh with no vertices.
    pub fn bounding(&self) -> Option<Aabb> {
        if let Some(cached) = self.cached_bounding.get() {
            return Some(cached);
        }
        let bounds = Aabb::from_points(self.vertices.iter().map(|v| Point3::from(v.position)))?;
        self.cached_bounding.set(Some(bounds));
        Some(bounds)
    }
}

/// Computes flat per-face normals for a triangle list, averaged at shared vertices.
pub fn compute_normals(vertices: &mut [Vertex], indices: &[MeshIndex]) {
    use cgmath::{InnerSpace, Vector3};

    let mut accum = vec![Vector3::new(0.0f32, 0.0, 0.0); vertices.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= vertices.len() || b >= vertices.len() || c >= vertices.len() {
            continue;
        }
        let pa = Vector3::from(vertices[a].position);
        let pb = Vector3::from(vertices[b].position);
        let pc = Vector3::from(vertices[c].position);
        let face = (pb - pa).cross(pc - pa);
        for i in [a, b, c] {
            accum[i] += face;
        }
    }

    for (vertex, n) in vertices.iter_mut().zip(accum) {
        vertex.normal = if n.magnitude2() > 0.0 {
            n.normalize().into()
        } else {
            [0.0, 1.0, 0.0]
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Mesh {
        let vertices = vec![
            Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0], [0.0, 0.0, 1.0]),
            Vertex::new([1.0, 0.0, 0.0], [1.0, 0.0], [0.0, 0.0, 1.0]),
            Vertex::new([1.0, 1.0, 0.0], [1.0, 1.0], [0.0, 0.0, 1.0]),
            Vertex::new([0.0, 1.0, 0.0], [0.0, 1.0], [0.0, 0.0, 1.0]),
        ];
        let primitives = vec![MeshPrimitive {
            primitive_type: PrimitiveType::TriangleList,
            indices: vec![0, 1, 2, 0, 2, 3],
        }];
        Mesh::from_raw(0, vertices, primitives)
    }

    #[test]
    fn test_vertex_size() {
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
    }

    #[test]
    fn test_mesh_bounding() {
        let mesh = quad();
        let bounds = mesh.bounding().unwrap();
        assert_eq!(bounds.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(bounds.max, Point3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_empty_mesh_has_no_bounds() {
        let mesh = Mesh::from_raw(3, Vec::new(), Vec::new());
        assert!(mesh.bounding().is_none());
        assert!(!mesh.has_primitive_type(PrimitiveType::TriangleList));
    }

    #[test]
    fn test_wireframe_indices_share_diagonal() {
        let mesh = quad();
        // Two triangles sharing one edge: 5 unique edges
        assert_eq!(mesh.wireframe_indices().len(), 10);
    }

    #[test]
    fn test_compute_normals_ccw_faces_point_up_z() {
        let mut mesh = quad();
        let indices = mesh.indices_of(PrimitiveType::TriangleList);
        for v in mesh.vertices.iter_mut() {
            v.normal = [0.0; 3];
        }
        compute_normals(&mut mesh.vertices, &indices);
        for v in mesh.vertices() {
            assert!((v.normal[2] - 1.0).abs() < 1e-5);
        }
    }
}
