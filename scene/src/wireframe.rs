//! Triangle edge extraction for wireframe rendering.

use std::collections::HashSet;

use crate::mesh::MeshIndex;

/// Converts a triangle list into a line list with every unique edge once.
///
/// Edges are emitted in first-seen order; an edge shared by two triangles is
/// emitted only for the first one. Trailing indices that do not form a full
/// triangle are ignored.
pub fn edge_indices(triangles: &[MeshIndex]) -> Vec<MeshIndex> {
    let mut seen: HashSet<(MeshIndex, MeshIndex)> = HashSet::with_capacity(triangles.len());
    let mut lines = Vec::with_capacity(triangles.len() * 2);

    for tri in triangles.chunks_exact(3) {
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            if a == b {
                continue;
            }
            let key = if a < b { (a, b) } else { (b, a) };
            if seen.insert(key) {
                lines.push(a);
                lines.push(b);
            }
        }
    }

    lines
}
