//! glTF 2.0 import into a [`Scene`].
//!
//! Import runs in stages so the loader can report progress between them:
//! [`parse_gltf`], then [`load_buffers`], [`load_images`] and finally
//! [`build_model`].

use std::collections::HashMap;
use std::path::Path;

use cgmath::{Point3, Quaternion, Vector3};
use image::{DynamicImage, RgbaImage};

use crate::animation::{AnimationClip, Interpolation, Keyframes, Track};
use crate::common::RgbaColor;
use crate::loader::LoadError;
use crate::material::{Material, MaterialFlags, MaterialId, DEFAULT_MATERIAL_ID};
use crate::mesh::{compute_normals, Mesh, MeshId, MeshIndex, MeshPrimitive, PrimitiveType, Vertex};
use crate::model_info::ModelStats;
use crate::node::{NodeId, Transform};
use crate::scene::Scene;
use crate::texture::{Texture, TextureId};

/// Extensions a file may list as required and still be loaded.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["KHR_materials_unlit"];

/// A validated glTF document plus the GLB binary chunk, if any.
pub struct ParsedGltf {
    pub document: gltf::Document,
    blob: Option<Vec<u8>>,
}

/// Everything produced by importing one file.
pub struct ImportedGltf {
    pub scene: Scene,
    pub animations: Vec<AnimationClip>,
    pub stats: ModelStats,
}

/// One loaded primitive of a glTF mesh.
#[derive(Debug, Clone)]
struct LoadedPrimitive {
    mesh_id: MeshId,
    material_id: MaterialId,
    material_name: Option<String>,
    primitive_type: PrimitiveType,
    vertex_count: usize,
    /// Index count when the source primitive was indexed triangles
    triangle_indices: Option<usize>,
}

/// Parses JSON or GLB and rejects files that require extensions we cannot honor.
pub fn parse_gltf(bytes: &[u8]) -> Result<ParsedGltf, LoadError> {
    let gltf::Gltf { document, blob } =
        gltf::Gltf::from_slice_without_validation(bytes).map_err(|e| LoadError::Gltf(e.to_string()))?;

    if let Some(ext) = document
        .extensions_required()
        .find(|ext| !SUPPORTED_EXTENSIONS.contains(ext))
    {
        return Err(LoadError::UnsupportedExtension(ext.to_string()));
    }

    let document = gltf::Document::from_json(document.into_json()).map_err(|e| LoadError::Gltf(e.to_string()))?;
    Ok(ParsedGltf { document, blob })
}

/// Resolves buffer data: GLB chunk, data URIs, or files next to `base`.
pub fn load_buffers(parsed: &mut ParsedGltf, base: Option<&Path>) -> Result<Vec<gltf::buffer::Data>, LoadError> {
    gltf::import_buffers(&parsed.document, base, parsed.blob.take()).map_err(|e| LoadError::Gltf(e.to_string()))
}

/// Decodes all images referenced by the document.
pub fn load_images(
    parsed: &ParsedGltf,
    base: Option<&Path>,
    buffers: &[gltf::buffer::Data],
) -> Result<Vec<gltf::image::Data>, LoadError> {
    gltf::import_images(&parsed.document, base, buffers).map_err(|e| LoadError::Gltf(e.to_string()))
}

/// Parses and imports a file held in memory. External resources resolve
/// against `base` when given.
pub fn import_slice(bytes: &[u8], base: Option<&Path>) -> Result<ImportedGltf, LoadError> {
    let mut parsed = parse_gltf(bytes)?;
    let buffers = load_buffers(&mut parsed, base)?;
    let images = load_images(&parsed, base, &buffers)?;
    build_model(&parsed, &buffers, &images)
}

/// Builds scene, animations and statistics from loaded data.
pub fn build_model(
    parsed: &ParsedGltf,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
) -> Result<ImportedGltf, LoadError> {
    let document = &parsed.document;
    let mut scene = Scene::new();

    let mut image_textures: HashMap<usize, Option<TextureId>> = HashMap::new();
    let mut material_map: Vec<MaterialId> = Vec::new();
    for material in document.materials() {
        let id = load_material(&material, images, &mut image_textures, &mut scene);
        material_map.push(id);
    }

    let mut mesh_map: Vec<Vec<LoadedPrimitive>> = Vec::new();
    for mesh in document.meshes() {
        let mut loaded = Vec::new();
        for primitive in mesh.primitives() {
            match load_primitive(&primitive, buffers, &material_map, &mut scene) {
                Ok(Some(p)) => loaded.push(p),
                Ok(None) => {}
                Err(e) => {
                    return Err(LoadError::Gltf(format!(
                        "mesh {}: {}",
                        mesh.name().unwrap_or("unnamed"),
                        e
                    )))
                }
            }
        }
        mesh_map.push(loaded);
    }

    let mut stats = ModelStats::default();
    let mut node_map: HashMap<usize, NodeId> = HashMap::new();
    if let Some(gltf_scene) = document.default_scene().or_else(|| document.scenes().next()) {
        let mut ancestors = Vec::new();
        for gltf_node in gltf_scene.nodes() {
            let mut walk = NodeWalk {
                scene: &mut scene,
                mesh_map: &mesh_map,
                node_map: &mut node_map,
                stats: &mut stats,
                ancestors: &mut ancestors,
            };
            walk.load_node(&gltf_node, None)?;
        }
    } else {
        log::warn!("glTF file has no scenes");
    }

    let animations = document
        .animations()
        .filter_map(|animation| load_animation(&animation, buffers, &node_map))
        .collect();

    Ok(ImportedGltf {
        scene,
        animations,
        stats,
    })
}

// ========== Materials & textures ==========

fn load_material(
    gltf_material: &gltf::Material,
    images: &[gltf::image::Data],
    image_textures: &mut HashMap<usize, Option<TextureId>>,
    scene: &mut Scene,
) -> MaterialId {
    let pbr = gltf_material.pbr_metallic_roughness();

    let mut flags = MaterialFlags::NONE;
    if gltf_material.double_sided() {
        flags |= MaterialFlags::DOUBLE_SIDED;
    }
    if gltf_material.alpha_mode() == gltf::material::AlphaMode::Blend {
        flags |= MaterialFlags::ALPHA_BLEND;
    }
    if gltf_material.unlit() {
        flags |= MaterialFlags::DO_NOT_LIGHT;
    }

    let mut material = Material::new()
        .with_base_color_factor(RgbaColor::from(pbr.base_color_factor()))
        .with_metallic_factor(pbr.metallic_factor())
        .with_roughness_factor(pbr.roughness_factor())
        .with_flags(flags);
    if let Some(name) = gltf_material.name() {
        material = material.with_name(name);
    }

    if let Some(info) = pbr.base_color_texture() {
        let image_index = info.texture().source().index();
        let texture = *image_textures
            .entry(image_index)
            .or_insert_with(|| load_texture(images, image_index, scene));
        if let Some(texture_id) = texture {
            material = material.with_base_color_texture(texture_id);
        }
    }

    scene.add_material(material)
}

fn load_texture(images: &[gltf::image::Data], image_index: usize, scene: &mut Scene) -> Option<TextureId> {
    let data = images.get(image_index)?;
    match image_to_rgba8(data) {
        Some(image) => Some(scene.add_texture(Texture::from_image(DynamicImage::ImageRgba8(image)))),
        None => {
            log::warn!(
                "Skipping image {} with unsupported pixel format {:?}",
                image_index,
                data.format
            );
            None
        }
    }
}

/// Expands any glTF pixel format to 8-bit RGBA.
fn image_to_rgba8(data: &gltf::image::Data) -> Option<RgbaImage> {
    use gltf::image::Format;

    let (channels, channel_bytes) = match data.format {
        Format::R8 => (1, 1),
        Format::R8G8 => (2, 1),
        Format::R8G8B8 => (3, 1),
        Format::R8G8B8A8 => (4, 1),
        Format::R16 => (1, 2),
        Format::R16G16 => (2, 2),
        Format::R16G16B16 => (3, 2),
        Format::R16G16B16A16 => (4, 2),
        Format::R32G32B32FLOAT => (3, 4),
        Format::R32G32B32A32FLOAT => (4, 4),
    };

    let read_channel = |bytes: &[u8]| -> u8 {
        match bytes.len() {
            1 => bytes[0],
            2 => (u16::from_ne_bytes([bytes[0], bytes[1]]) >> 8) as u8,
            _ => {
                let v = f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                (v.clamp(0.0, 1.0) * 255.0).round() as u8
            }
        }
    };

    let pixel_bytes = channels * channel_bytes;
    let expected = data.width as usize * data.height as usize * pixel_bytes;
    if data.pixels.len() < expected {
        return None;
    }

    let mut rgba = Vec::with_capacity(data.width as usize * data.height as usize * 4);
    for pixel in data.pixels[..expected].chunks_exact(pixel_bytes) {
        let c: Vec<u8> = pixel.chunks_exact(channel_bytes).map(read_channel).collect();
        let out = match channels {
            1 => [c[0], c[0], c[0], 255],
            2 => [c[0], c[0], c[0], c[1]],
            3 => [c[0], c[1], c[2], 255],
            _ => [c[0], c[1], c[2], c[3]],
        };
        rgba.extend_from_slice(&out);
    }

    RgbaImage::from_raw(data.width, data.height, rgba)
}

// ========== Meshes ==========

/// Loads one primitive as its own scene mesh. Ok(None) for primitives that
/// are skipped (no positions).
fn load_primitive(
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
    material_map: &[MaterialId],
    scene: &mut Scene,
) -> anyhow::Result<Option<LoadedPrimitive>> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

    let Some(positions) = reader.read_positions() else {
        log::warn!("Skipping primitive without POSITION attribute");
        return Ok(None);
    };
    let positions: Vec<[f32; 3]> = positions.collect();
    let vertex_count = positions.len();

    if primitive.morph_targets().next().is_some() {
        log::debug!("Ignoring morph targets on primitive {}", primitive.index());
    }

    let tex_coords: Vec<[f32; 2]> = reader
        .read_tex_coords(0)
        .map(|t| t.into_f32().collect())
        .unwrap_or_default();
    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|n| n.collect());

    let source_indices: Option<Vec<MeshIndex>> = reader.read_indices().map(|i| i.into_u32().collect());
    let indexed = source_indices.is_some();
    let indices = source_indices.unwrap_or_else(|| (0..vertex_count as MeshIndex).collect());
    anyhow::ensure!(
        indices.iter().all(|&i| (i as usize) < vertex_count),
        "index out of range for {} vertices",
        vertex_count
    );

    let (primitive_type, indices) = convert_mode(primitive.mode(), &indices);

    let mut vertices: Vec<Vertex> = positions
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            Vertex::new(
                position,
                tex_coords.get(i).copied().unwrap_or([0.0, 0.0]),
                normals.as_ref().and_then(|n| n.get(i).copied()).unwrap_or([0.0, 0.0, 0.0]),
            )
        })
        .collect();

    let triangle_indices = (indexed && primitive_type == PrimitiveType::TriangleList).then_some(indices.len());

    let indices = if normals.is_none() && primitive_type == PrimitiveType::TriangleList {
        // Unweld so each face gets its own normal
        let (flat_vertices, flat_indices) = unweld(&vertices, &indices);
        vertices = flat_vertices;
        compute_normals(&mut vertices, &flat_indices);
        flat_indices
    } else {
        indices
    };

    let (material_id, material_name) = match primitive.material().index() {
        Some(index) => (
            material_map.get(index).copied().unwrap_or(DEFAULT_MATERIAL_ID),
            primitive.material().name().map(str::to_string),
        ),
        None => (DEFAULT_MATERIAL_ID, None),
    };

    let mesh = Mesh::from_raw(0, vertices, vec![MeshPrimitive { primitive_type, indices }]);
    let mesh_id = scene.add_mesh(mesh);

    Ok(Some(LoadedPrimitive {
        mesh_id,
        material_id,
        material_name,
        primitive_type,
        vertex_count,
        triangle_indices,
    }))
}

/// Converts any glTF topology to a list topology.
fn convert_mode(mode: gltf::mesh::Mode, indices: &[MeshIndex]) -> (PrimitiveType, Vec<MeshIndex>) {
    use gltf::mesh::Mode;

    match mode {
        Mode::Triangles => (PrimitiveType::TriangleList, indices.to_vec()),
        Mode::TriangleStrip => {
            let mut out = Vec::with_capacity(indices.len().saturating_sub(2) * 3);
            for i in 0..indices.len().saturating_sub(2) {
                if i % 2 == 0 {
                    out.extend_from_slice(&[indices[i], indices[i + 1], indices[i + 2]]);
                } else {
                    out.extend_from_slice(&[indices[i + 2], indices[i + 1], indices[i]]);
                }
            }
            (PrimitiveType::TriangleList, out)
        }
        Mode::TriangleFan => {
            let mut out = Vec::with_capacity(indices.len().saturating_sub(2) * 3);
            for i in 1..indices.len().saturating_sub(1) {
                out.extend_from_slice(&[indices[0], indices[i], indices[i + 1]]);
            }
            (PrimitiveType::TriangleList, out)
        }
        Mode::Lines => (PrimitiveType::LineList, indices.to_vec()),
        Mode::LineStrip | Mode::LineLoop => {
            let mut out: Vec<MeshIndex> = indices.windows(2).flat_map(|w| [w[0], w[1]]).collect();
            if mode == Mode::LineLoop && indices.len() > 2 {
                out.extend_from_slice(&[indices[indices.len() - 1], indices[0]]);
            }
            (PrimitiveType::LineList, out)
        }
        Mode::Points => (PrimitiveType::PointList, indices.to_vec()),
    }
}

/// One vertex per triangle corner, with sequential indices.
fn unweld(vertices: &[Vertex], indices: &[MeshIndex]) -> (Vec<Vertex>, Vec<MeshIndex>) {
    let flat: Vec<Vertex> = indices.iter().map(|&i| vertices[i as usize]).collect();
    let flat_indices = (0..flat.len() as MeshIndex).collect();
    (flat, flat_indices)
}

// ========== Nodes ==========

/// State shared while walking the node hierarchy of one scene.
struct NodeWalk<'s> {
    scene: &'s mut Scene,
    mesh_map: &'s [Vec<LoadedPrimitive>],
    node_map: &'s mut HashMap<usize, NodeId>,
    stats: &'s mut ModelStats,
    /// glTF indices of the nodes on the path from the root to the current node
    ancestors: &'s mut Vec<usize>,
}

impl NodeWalk<'_> {
    fn load_node(&mut self, gltf_node: &gltf::Node, parent: Option<NodeId>) -> Result<(), LoadError> {
        let index = gltf_node.index();
        if self.ancestors.contains(&index) {
            return Err(LoadError::Gltf("node hierarchy contains a cycle".to_string()));
        }
        if self.node_map.contains_key(&index) {
            log::warn!("Node {} has more than one parent, keeping the first", index);
            return Ok(());
        }

        let (translation, rotation, scale) = gltf_node.transform().decomposed();
        let transform = Transform {
            position: Point3::from(translation),
            rotation: Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
            scale: Vector3::from(scale),
        };
        let name = gltf_node.name().map(str::to_string);

        let mesh_map = self.mesh_map;
        let primitives = gltf_node
            .mesh()
            .and_then(|mesh| mesh_map.get(mesh.index()))
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let node_id = self
            .add_nodes(parent, primitives, name, transform)
            .map_err(|e| LoadError::Gltf(e.to_string()))?;

        for p in primitives {
            if p.primitive_type == PrimitiveType::TriangleList {
                self.stats
                    .add_primitive(p.vertex_count, p.triangle_indices, p.material_name.as_deref());
            }
        }

        self.node_map.insert(index, node_id);

        self.ancestors.push(index);
        for child in gltf_node.children() {
            self.load_node(&child, Some(node_id))?;
        }
        self.ancestors.pop();

        Ok(())
    }

    /// A single primitive becomes an instance node; several hang under a group node.
    fn add_nodes(
        &mut self,
        parent: Option<NodeId>,
        primitives: &[LoadedPrimitive],
        name: Option<String>,
        transform: Transform,
    ) -> anyhow::Result<NodeId> {
        match primitives {
            [single] => self
                .scene
                .add_instance_node(parent, single.mesh_id, single.material_id, name, transform),
            _ => {
                let node_id = self.scene.add_node(parent, name, transform)?;
                for p in primitives {
                    self.scene
                        .add_instance_node(Some(node_id), p.mesh_id, p.material_id, None, Transform::IDENTITY)?;
                }
                Ok(node_id)
            }
        }
    }
}

// ========== Animations ==========

fn load_animation(
    animation: &gltf::Animation,
    buffers: &[gltf::buffer::Data],
    node_map: &HashMap<usize, NodeId>,
) -> Option<AnimationClip> {
    use gltf::animation::util::ReadOutputs;

    let name = animation
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("animation_{}", animation.index()));

    let mut tracks = Vec::new();
    for channel in animation.channels() {
        let Some(&target) = node_map.get(&channel.target().node().index()) else {
            continue;
        };
        let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
        let Some(inputs) = reader.read_inputs() else {
            continue;
        };
        let times: Vec<f32> = inputs.collect();

        let keyframes = match reader.read_outputs() {
            Some(ReadOutputs::Translations(values)) => Keyframes::Translation(values.collect()),
            Some(ReadOutputs::Rotations(values)) => Keyframes::Rotation(values.into_f32().collect()),
            Some(ReadOutputs::Scales(values)) => Keyframes::Scale(values.collect()),
            Some(ReadOutputs::MorphTargetWeights(_)) => {
                log::warn!("Animation '{}': skipping morph target weights channel", name);
                continue;
            }
            None => continue,
        };

        let interpolation = match channel.sampler().interpolation() {
            gltf::animation::Interpolation::Step => Interpolation::Step,
            gltf::animation::Interpolation::Linear => Interpolation::Linear,
            gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
        };

        tracks.push(Track::new(target, interpolation, times, keyframes));
    }

    if tracks.is_empty() {
        log::warn!("Animation '{}' has no node channels, skipping", name);
        return None;
    }
    Some(AnimationClip::new(name, tracks))
}
