use std::collections::{HashMap, HashSet};

use anyhow::bail;
use cgmath::{Matrix4, SquareMatrix};

use crate::batch::{DrawBatch, InstanceTransform};
use crate::common::{Aabb, RgbaColor};
use crate::light::Light;
use crate::material::{Material, MaterialFlags, MaterialId, DEFAULT_MATERIAL_ID};
use crate::mesh::{Mesh, MeshId, PrimitiveType};
use crate::node::{Node, NodeId, Transform, Visibility};
use crate::texture::{Texture, TextureId};

/// Unique identifier for a mesh instance
pub type InstanceId = u32;

/// An instance references a mesh and material to be rendered.
#[derive(Debug, Clone)]
pub struct Instance {
    pub id: InstanceId,
    pub mesh: MeshId,
    pub material: MaterialId,
}

impl Instance {
    pub fn new(id: InstanceId, mesh: MeshId, material: MaterialId) -> Self {
        Self { id, mesh, material }
    }
}

/// The scene container holding all meshes, materials, textures, instances, nodes, and lights.
///
/// Scene is device-free: GPU resources are derived from it by the renderer,
/// keyed by the ids handed out here.
#[derive(Debug)]
pub struct Scene {
    nodes: HashMap<NodeId, Node>,
    root_nodes: Vec<NodeId>,
    pub meshes: HashMap<MeshId, Mesh>,
    pub materials: HashMap<MaterialId, Material>,
    pub textures: HashMap<TextureId, Texture>,
    pub instances: HashMap<InstanceId, Instance>,
    pub lights: Vec<Light>,

    next_node_id: NodeId,
    next_mesh_id: MeshId,
    next_material_id: MaterialId,
    next_texture_id: TextureId,
    next_instance_id: InstanceId,
}

impl Scene {
    pub fn new() -> Self {
        let mut materials = HashMap::new();
        // Fallback for primitives without a material, as glTF specifies
        let mut default_material = Material::new()
            .with_roughness_factor(1.0)
            .with_line_color(RgbaColor::BLACK);
        default_material.id = DEFAULT_MATERIAL_ID;
        materials.insert(DEFAULT_MATERIAL_ID, default_material);

        Self {
            nodes: HashMap::new(),
            root_nodes: Vec::new(),
            meshes: HashMap::new(),
            materials,
            textures: HashMap::new(),
            instances: HashMap::new(),
            lights: Vec::new(),
            next_node_id: 0,
            next_mesh_id: 0,
            next_material_id: 0,
            next_texture_id: 0,
            next_instance_id: 0,
        }
    }

    // ========== Resources ==========

    pub fn add_mesh(&mut self, mut mesh: Mesh) -> MeshId {
        let id = self.next_mesh_id;
        self.next_mesh_id += 1;
        mesh.set_id(id);
        self.meshes.insert(id, mesh);
        id
    }

    pub fn get_mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(&id)
    }

    pub fn add_material(&mut self, mut material: Material) -> MaterialId {
        let id = self.next_material_id;
        self.next_material_id += 1;
        material.id = id;
        self.materials.insert(id, material);
        id
    }

    pub fn get_material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(&id)
    }

    pub fn get_material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(&id)
    }

    pub fn add_texture(&mut self, mut texture: Texture) -> TextureId {
        let id = self.next_texture_id;
        self.next_texture_id += 1;
        texture.id = id;
        self.textures.insert(id, texture);
        id
    }

    pub fn get_texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(&id)
    }

    pub fn add_instance(&mut self, mesh: MeshId, material: MaterialId) -> InstanceId {
        let id = self.next_instance_id;
        self.next_instance_id += 1;
        self.instances.insert(id, Instance::new(id, mesh, material));
        id
    }

    // ========== Nodes ==========

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn root_nodes(&self) -> &[NodeId] {
        &self.root_nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Adds a node under `parent`, or as a root when `parent` is None.
    pub fn add_node(
        &mut self,
        parent: Option<NodeId>,
        name: Option<String>,
        transform: Transform,
    ) -> anyhow::Result<NodeId> {
        if let Some(parent_id) = parent {
            if !self.nodes.contains_key(&parent_id) {
                bail!("Parent node with ID {} not found in scene", parent_id);
            }
        }

        let id = self.next_node_id;
        self.next_node_id += 1;

        let mut node = Node::new(id, name, transform);
        node.set_parent(parent);
        self.nodes.insert(id, node);

        match parent {
            Some(parent_id) => {
                if let Some(parent_node) = self.nodes.get_mut(&parent_id) {
                    parent_node.add_child(id);
                }
            }
            None => self.root_nodes.push(id),
        }

        Ok(id)
    }

    /// Adds a node that draws `mesh` with `material`.
    pub fn add_instance_node(
        &mut self,
        parent: Option<NodeId>,
        mesh: MeshId,
        material: MaterialId,
        name: Option<String>,
        transform: Transform,
    ) -> anyhow::Result<NodeId> {
        let node_id = self.add_node(parent, name, transform)?;
        let instance_id = self.add_instance(mesh, material);
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.set_instance(Some(instance_id));
        }
        Ok(node_id)
    }

    /// The node and all its descendants, parents before children.
    pub fn subtree(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node_id];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                out.push(id);
                stack.extend(node.children().iter().rev().copied());
            }
        }
        out
    }

    /// Removes a node and its subtree along with their instances.
    /// Meshes, materials and textures stay until [`Scene::prune_unused_resources`].
    pub fn remove_node(&mut self, node_id: NodeId) -> bool {
        let Some(node) = self.nodes.get(&node_id) else {
            return false;
        };

        match node.parent() {
            Some(parent_id) => {
                if let Some(parent) = self.nodes.get_mut(&parent_id) {
                    parent.remove_child(node_id);
                }
            }
            None => self.root_nodes.retain(|&id| id != node_id),
        }

        for id in self.subtree(node_id) {
            if let Some(removed) = self.nodes.remove(&id) {
                if let Some(instance_id) = removed.instance() {
                    self.instances.remove(&instance_id);
                }
            }
        }
        true
    }

    /// Drops meshes, materials and textures that no instance references.
    /// The fallback material is always kept.
    pub fn prune_unused_resources(&mut self) {
        let used_meshes: HashSet<MeshId> = self.instances.values().map(|i| i.mesh).collect();
        let used_materials: HashSet<MaterialId> = self.instances.values().map(|i| i.material).collect();

        self.meshes.retain(|id, _| used_meshes.contains(id));
        self.materials
            .retain(|id, _| *id == DEFAULT_MATERIAL_ID || used_materials.contains(id));

        let used_textures: HashSet<TextureId> = self
            .materials
            .values()
            .filter_map(|m| m.base_color_texture())
            .collect();
        self.textures.retain(|id, _| used_textures.contains(id));
    }

    pub fn set_node_visibility(&mut self, node_id: NodeId, visibility: Visibility) -> anyhow::Result<()> {
        match self.nodes.get_mut(&node_id) {
            Some(node) => {
                node.set_visibility(visibility);
                Ok(())
            }
            None => bail!("Node with ID {} not found in scene", node_id),
        }
    }

    /// Removes all nodes and resources except the fallback material. Lights are kept.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root_nodes.clear();
        self.meshes.clear();
        self.instances.clear();
        self.textures.clear();
        self.materials.retain(|id, _| *id == DEFAULT_MATERIAL_ID);
    }

    // ========== Transforms & bounds ==========

    /// World transform of a node: product of local transforms from the root down.
    pub fn world_transform(&self, node_id: NodeId) -> Option<Matrix4<f32>> {
        let node = self.nodes.get(&node_id)?;
        let local = node.compute_local_transform();
        match node.parent() {
            Some(parent_id) => Some(self.world_transform(parent_id)? * local),
            None => Some(local),
        }
    }

    /// World-space bounds of everything drawn in the subtree, hidden nodes included.
    pub fn subtree_bounding(&self, node_id: NodeId) -> Option<Aabb> {
        let parent_world = match self.nodes.get(&node_id)?.parent() {
            Some(parent_id) => self.world_transform(parent_id)?,
            None => Matrix4::identity(),
        };
        let mut bounds: Option<Aabb> = None;
        self.walk(node_id, parent_world, false, &mut |node, world| {
            if let Some(mesh_bounds) = self.node_mesh_bounds(node) {
                let world_bounds = mesh_bounds.transform(&world);
                bounds = Some(bounds.map_or(world_bounds, |b| b.merge(&world_bounds)));
            }
        });
        bounds
    }

    /// World-space bounds of all visible geometry.
    pub fn bounding(&self) -> Option<Aabb> {
        let mut bounds: Option<Aabb> = None;
        for &root in &self.root_nodes {
            self.walk(root, Matrix4::identity(), true, &mut |node, world| {
                if let Some(mesh_bounds) = self.node_mesh_bounds(node) {
                    let world_bounds = mesh_bounds.transform(&world);
                    bounds = Some(bounds.map_or(world_bounds, |b| b.merge(&world_bounds)));
                }
            });
        }
        bounds
    }

    fn node_mesh_bounds(&self, node: &Node) -> Option<Aabb> {
        let instance = self.instances.get(&node.instance()?)?;
        self.meshes.get(&instance.mesh)?.bounding()
    }

    /// Depth-first walk accumulating world transforms. With `visible_only`,
    /// hidden nodes prune their subtree.
    fn walk<F>(&self, node_id: NodeId, parent_world: Matrix4<f32>, visible_only: bool, visit: &mut F)
    where
        F: FnMut(&Node, Matrix4<f32>),
    {
        let Some(node) = self.nodes.get(&node_id) else {
            return;
        };
        if visible_only && !node.is_visible() {
            return;
        }
        let world = parent_world * node.compute_local_transform();
        visit(node, world);
        for &child in node.children() {
            self.walk(child, world, visible_only, visit);
        }
    }

    // ========== Drawing ==========

    /// Groups every visible instance by (mesh, material, draw mode).
    ///
    /// Triangle primitives of wireframe materials become LineList batches
    /// flagged `wireframe`. Opaque batches come first, then blended ones;
    /// within each group batches are ordered by material, primitive, mesh.
    pub fn collect_draw_batches(&self) -> Vec<DrawBatch> {
        type BatchKey = (MeshId, MaterialId, PrimitiveType, bool);
        let mut batches: HashMap<BatchKey, DrawBatch> = HashMap::new();

        for &root in &self.root_nodes {
            self.walk(root, Matrix4::identity(), true, &mut |node, world| {
                let Some(instance) = node.instance().and_then(|id| self.instances.get(&id)) else {
                    return;
                };
                let Some(mesh) = self.meshes.get(&instance.mesh) else {
                    return;
                };
                let material_id = if self.materials.contains_key(&instance.material) {
                    instance.material
                } else {
                    DEFAULT_MATERIAL_ID
                };
                let Some(material) = self.materials.get(&material_id) else {
                    return;
                };

                for primitive_type in [PrimitiveType::TriangleList, PrimitiveType::LineList, PrimitiveType::PointList] {
                    if !mesh.has_primitive_type(primitive_type) {
                        continue;
                    }
                    let wireframe = primitive_type == PrimitiveType::TriangleList && material.wireframe();
                    let drawn_type = if wireframe { PrimitiveType::LineList } else { primitive_type };
                    let batch = batches
                        .entry((mesh.id(), material_id, primitive_type, wireframe))
                        .or_insert_with(|| {
                            let mut batch = DrawBatch::new(mesh.id(), material_id, drawn_type);
                            batch.wireframe = wireframe;
                            batch.alpha_blend = material.flags().contains(MaterialFlags::ALPHA_BLEND);
                            batch
                        });
                    batch.add_instance(InstanceTransform::new(node.id, world));
                }
            });
        }

        let mut batches: Vec<DrawBatch> = batches.into_values().collect();
        batches.sort_by_key(|b| (b.alpha_blend, b.material_id, b.primitive_type, b.wireframe, b.mesh_id));
        batches
    }

    // ========== Composition ==========

    /// Moves all nodes and resources of `other` into this scene, attaching its
    /// root nodes under `parent`. Ids are reassigned; the returned map takes
    /// node ids of `other` to their new ids here. Lights of `other` are dropped.
    pub fn merge(&mut self, other: Scene, parent: Option<NodeId>) -> anyhow::Result<HashMap<NodeId, NodeId>> {
        if let Some(parent_id) = parent {
            if !self.nodes.contains_key(&parent_id) {
                bail!("Parent node with ID {} not found in scene", parent_id);
            }
        }

        let Scene {
            mut nodes,
            root_nodes,
            meshes,
            materials,
            textures,
            instances,
            ..
        } = other;

        let mut texture_map = HashMap::new();
        let mut sorted_textures: Vec<_> = textures.into_iter().collect();
        sorted_textures.sort_by_key(|(id, _)| *id);
        for (old_id, texture) in sorted_textures {
            texture_map.insert(old_id, self.add_texture(texture));
        }

        let mut material_map = HashMap::new();
        let mut sorted_materials: Vec<_> = materials.into_iter().collect();
        sorted_materials.sort_by_key(|(id, _)| *id);
        for (old_id, mut material) in sorted_materials {
            if old_id == DEFAULT_MATERIAL_ID {
                material_map.insert(old_id, DEFAULT_MATERIAL_ID);
                continue;
            }
            let remapped = material.base_color_texture().and_then(|t| texture_map.get(&t).copied());
            if material.base_color_texture().is_some() {
                material.set_base_color_texture(remapped);
            }
            material_map.insert(old_id, self.add_material(material));
        }

        let mut mesh_map = HashMap::new();
        let mut sorted_meshes: Vec<_> = meshes.into_iter().collect();
        sorted_meshes.sort_by_key(|(id, _)| *id);
        for (old_id, mesh) in sorted_meshes {
            mesh_map.insert(old_id, self.add_mesh(mesh));
        }

        let mut node_map = HashMap::new();
        let mut stack: Vec<(NodeId, Option<NodeId>)> =
            root_nodes.iter().rev().map(|&id| (id, parent)).collect();
        while let Some((old_id, new_parent)) = stack.pop() {
            let Some(node) = nodes.remove(&old_id) else {
                continue;
            };
            let new_id = self.add_node(new_parent, node.name.clone(), *node.transform())?;
            if let Some(new_node) = self.nodes.get_mut(&new_id) {
                new_node.set_visibility(node.visibility());
            }
            if let Some(instance) = node.instance().and_then(|i| instances.get(&i)) {
                if let Some(&mesh_id) = mesh_map.get(&instance.mesh) {
                    let material_id = material_map
                        .get(&instance.material)
                        .copied()
                        .unwrap_or(DEFAULT_MATERIAL_ID);
                    let instance_id = self.add_instance(mesh_id, material_id);
                    if let Some(new_node) = self.nodes.get_mut(&new_id) {
                        new_node.set_instance(Some(instance_id));
                    }
                }
            }
            node_map.insert(old_id, new_id);
            stack.extend(node.children().iter().rev().map(|&child| (child, Some(new_id))));
        }

        Ok(node_map)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{MeshPrimitive, Vertex};
    use cgmath::{Point3, Vector3};

    fn triangle_mesh() -> Mesh {
        let vertices = vec![
            Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0], [0.0, 0.0, 1.0]),
            Vertex::new([1.0, 0.0, 0.0], [1.0, 0.0], [0.0, 0.0, 1.0]),
            Vertex::new([0.0, 1.0, 0.0], [0.0, 1.0], [0.0, 0.0, 1.0]),
        ];
        Mesh::from_raw(
            0,
            vertices,
            vec![MeshPrimitive {
                primitive_type: PrimitiveType::TriangleList,
                indices: vec![0, 1, 2],
            }],
        )
    }

    fn translated(x: f32, y: f32, z: f32) -> Transform {
        Transform {
            position: Point3::new(x, y, z),
            ..Transform::IDENTITY
        }
    }

    // ===================================================================
    // Construction & hierarchy
    // ===================================================================

    #[test]
    fn test_scene_new() {
        let scene = Scene::new();
        assert!(scene.root_nodes().is_empty());
        assert!(scene.meshes.is_empty());
        assert!(scene.get_material(DEFAULT_MATERIAL_ID).is_some());
    }

    #[test]
    fn test_add_child_node() {
        let mut scene = Scene::new();
        let root = scene.add_node(None, Some("root".into()), Transform::IDENTITY).unwrap();
        let child = scene.add_node(Some(root), None, Transform::IDENTITY).unwrap();

        assert_eq!(scene.root_nodes(), &[root]);
        assert_eq!(scene.get_node(root).unwrap().children(), &[child]);
        assert_eq!(scene.get_node(child).unwrap().parent(), Some(root));
    }

    #[test]
    fn test_add_node_with_invalid_parent_fails() {
        let mut scene = Scene::new();
        let err = scene.add_node(Some(42), None, Transform::IDENTITY).unwrap_err();
        assert!(err.to_string().contains("42"));
        assert_eq!(scene.node_count(), 0);
    }

    #[test]
    fn test_remove_node_recursive() {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(triangle_mesh());
        let root = scene.add_node(None, None, Transform::IDENTITY).unwrap();
        let child = scene.add_instance_node(Some(root), mesh, DEFAULT_MATERIAL_ID, None, Transform::IDENTITY).unwrap();
        let grandchild = scene.add_instance_node(Some(child), mesh, DEFAULT_MATERIAL_ID, None, Transform::IDENTITY).unwrap();

        assert!(scene.remove_node(child));
        assert!(scene.get_node(child).is_none());
        assert!(scene.get_node(grandchild).is_none());
        assert!(scene.instances.is_empty());
        assert!(scene.get_node(root).unwrap().children().is_empty());
        assert!(!scene.remove_node(child));
    }

    #[test]
    fn test_prune_unused_resources() {
        let mut scene = Scene::new();
        let texture = scene.add_texture(Texture::from_image(image::DynamicImage::new_rgba8(1, 1)));
        let material = scene.add_material(Material::new().with_base_color_texture(texture));
        let mesh = scene.add_mesh(triangle_mesh());
        let node = scene.add_instance_node(None, mesh, material, None, Transform::IDENTITY).unwrap();

        scene.prune_unused_resources();
        assert_eq!(scene.meshes.len(), 1);
        assert_eq!(scene.textures.len(), 1);

        scene.remove_node(node);
        scene.prune_unused_resources();
        assert!(scene.meshes.is_empty());
        assert!(scene.textures.is_empty());
        assert_eq!(scene.materials.len(), 1);
        assert!(scene.get_material(DEFAULT_MATERIAL_ID).is_some());
    }

    // ===================================================================
    // Transforms & bounds
    // ===================================================================

    #[test]
    fn test_child_transform_accumulation() {
        let mut scene = Scene::new();
        let root = scene.add_node(None, None, translated(1.0, 0.0, 0.0)).unwrap();
        let child = scene.add_node(Some(root), None, translated(0.0, 2.0, 0.0)).unwrap();

        let world = scene.world_transform(child).unwrap();
        assert_eq!(world.w.truncate(), Vector3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn test_subtree_bounding_includes_hidden() {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(triangle_mesh());
        let root = scene.add_node(None, None, translated(10.0, 0.0, 0.0)).unwrap();
        let child = scene.add_instance_node(Some(root), mesh, DEFAULT_MATERIAL_ID, None, Transform::IDENTITY).unwrap();
        scene.set_node_visibility(child, Visibility::Invisible).unwrap();

        let bounds = scene.subtree_bounding(root).unwrap();
        assert_eq!(bounds.min, Point3::new(10.0, 0.0, 0.0));
        assert_eq!(bounds.max, Point3::new(11.0, 1.0, 0.0));

        // Hidden geometry does not count toward the visible scene bounds
        assert!(scene.bounding().is_none());
    }

    #[test]
    fn test_subtree_bounding_empty() {
        let mut scene = Scene::new();
        let root = scene.add_node(None, None, Transform::IDENTITY).unwrap();
        assert!(scene.subtree_bounding(root).is_none());
        assert!(scene.subtree_bounding(999).is_none());
    }

    // ===================================================================
    // Draw batches
    // ===================================================================

    #[test]
    fn test_collect_draw_batches_empty_scene() {
        assert!(Scene::new().collect_draw_batches().is_empty());
    }

    #[test]
    fn test_collect_draw_batches_groups_instances() {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(triangle_mesh());
        let material = scene.add_material(Material::new());
        scene.add_instance_node(None, mesh, material, None, translated(0.0, 0.0, 0.0)).unwrap();
        scene.add_instance_node(None, mesh, material, None, translated(5.0, 0.0, 0.0)).unwrap();

        let batches = scene.collect_draw_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[0].primitive_type, PrimitiveType::TriangleList);
    }

    #[test]
    fn test_collect_draw_batches_wireframe() {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(triangle_mesh());
        let material = scene.add_material(Material::new());
        scene.add_instance_node(None, mesh, material, None, Transform::IDENTITY).unwrap();
        scene.get_material_mut(material).unwrap().set_wireframe(true);

        let batches = scene.collect_draw_batches();
        assert_eq!(batches.len(), 1);
        assert!(batches[0].wireframe);
        assert_eq!(batches[0].primitive_type, PrimitiveType::LineList);
    }

    #[test]
    fn test_collect_draw_batches_skips_hidden_subtree() {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(triangle_mesh());
        let root = scene.add_node(None, None, Transform::IDENTITY).unwrap();
        scene.add_instance_node(Some(root), mesh, DEFAULT_MATERIAL_ID, None, Transform::IDENTITY).unwrap();
        scene.set_node_visibility(root, Visibility::Invisible).unwrap();

        assert!(scene.collect_draw_batches().is_empty());
    }

    #[test]
    fn test_collect_draw_batches_blended_last() {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(triangle_mesh());
        let blended = scene.add_material(Material::new().with_flags(MaterialFlags::ALPHA_BLEND));
        let opaque = scene.add_material(Material::new());
        scene.add_instance_node(None, mesh, blended, None, Transform::IDENTITY).unwrap();
        scene.add_instance_node(None, mesh, opaque, None, Transform::IDENTITY).unwrap();

        let batches = scene.collect_draw_batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].material_id, opaque);
        assert_eq!(batches[1].material_id, blended);
    }

    #[test]
    fn test_missing_material_uses_default() {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(triangle_mesh());
        scene.add_instance_node(None, mesh, 77, None, Transform::IDENTITY).unwrap();
        let batches = scene.collect_draw_batches();
        assert_eq!(batches[0].material_id, DEFAULT_MATERIAL_ID);
    }

    // ===================================================================
    // Merge
    // ===================================================================

    #[test]
    fn test_merge_remaps_ids() {
        let mut target = Scene::new();
        // Occupy some ids so the merged ones must shift
        let existing_mesh = target.add_mesh(triangle_mesh());
        let anchor = target.add_instance_node(None, existing_mesh, DEFAULT_MATERIAL_ID, None, Transform::IDENTITY).unwrap();

        let mut source = Scene::new();
        let texture = source.add_texture(Texture::from_image(image::DynamicImage::new_rgba8(2, 2)));
        let material = source.add_material(Material::new().with_name("Skin").with_base_color_texture(texture));
        let mesh = source.add_mesh(triangle_mesh());
        let src_root = source.add_node(None, Some("model".into()), translated(0.0, 1.0, 0.0)).unwrap();
        let src_child = source.add_instance_node(Some(src_root), mesh, material, None, Transform::IDENTITY).unwrap();

        let map = target.merge(source, Some(anchor)).unwrap();

        let new_root = map[&src_root];
        let new_child = map[&src_child];
        assert_eq!(target.get_node(new_root).unwrap().parent(), Some(anchor));
        assert_eq!(target.get_node(new_root).unwrap().name.as_deref(), Some("model"));
        assert_eq!(target.get_node(new_child).unwrap().parent(), Some(new_root));

        let instance_id = target.get_node(new_child).unwrap().instance().unwrap();
        let instance = &target.instances[&instance_id];
        assert_ne!(instance.mesh, existing_mesh);
        let merged_material = target.get_material(instance.material).unwrap();
        assert_eq!(merged_material.name(), Some("Skin"));
        let tex = merged_material.base_color_texture().unwrap();
        assert!(target.get_texture(tex).is_some());
    }

    #[test]
    fn test_merge_invalid_parent() {
        let mut target = Scene::new();
        assert!(target.merge(Scene::new(), Some(5)).is_err());
    }
}
