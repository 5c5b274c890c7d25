//! Ground grid made of two line meshes: the center axes and the rest.

use crate::config::GridConfig;
use crate::mesh::{Mesh, MeshIndex, MeshPrimitive, PrimitiveType, Vertex};

/// Square grid on the XZ plane centered on the origin.
pub struct GridMeshes {
    pub center_lines: Mesh,
    pub lines: Mesh,
}

pub fn build_grid(config: &GridConfig) -> GridMeshes {
    let divisions = config.divisions.max(1);
    let half = config.size / 2.0;
    let step = config.size / divisions as f32;
    // Only an even division count has a line through the origin
    let center = (divisions % 2 == 0).then_some(divisions / 2);

    let mut center_vertices = Vec::new();
    let mut line_vertices = Vec::new();
    for i in 0..=divisions {
        let k = -half + i as f32 * step;
        let target = if Some(i) == center {
            &mut center_vertices
        } else {
            &mut line_vertices
        };
        // One line parallel to X and one parallel to Z
        target.push(grid_vertex(-half, k));
        target.push(grid_vertex(half, k));
        target.push(grid_vertex(k, -half));
        target.push(grid_vertex(k, half));
    }

    GridMeshes {
        center_lines: line_mesh(center_vertices),
        lines: line_mesh(line_vertices),
    }
}

fn grid_vertex(x: f32, z: f32) -> Vertex {
    Vertex::new([x, 0.0, z], [0.0, 0.0], [0.0, 1.0, 0.0])
}

fn line_mesh(vertices: Vec<Vertex>) -> Mesh {
    let indices: Vec<MeshIndex> = (0..vertices.len() as MeshIndex).collect();
    Mesh::from_raw(
        0,
        vertices,
        vec![MeshPrimitive {
            primitive_type: PrimitiveType::LineList,
            indices,
        }],
    )
}
