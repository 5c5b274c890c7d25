pub mod animation;
mod batch;
pub mod camera;
pub mod common;
pub mod config;
pub mod gltf;
pub mod grid;
mod light;
pub mod loader;
mod material;
mod mesh;
pub mod model_info;
mod node;
pub mod normalize;
mod scene;
pub mod stage;
mod texture;
pub mod upload;
mod wireframe;

pub use batch::{compute_normal_matrix, DrawBatch, InstanceTransform};
pub use camera::Camera;
pub use config::{ControlSettings, HexColor, ViewerConfig};
pub use light::{Light, LightType, LightUniform, LightsArrayUniform, MAX_LIGHTS};
pub use loader::{LoadError, LoadHandle, LoadPhase, LoadedModel};
pub use material::{
    Material, MaterialFlags, MaterialId, MaterialProperties, DEFAULT_MATERIAL_ID, UNNAMED_MATERIAL,
};
pub use mesh::{compute_normals, Mesh, MeshId, MeshIndex, MeshPrimitive, PrimitiveType, Vertex};
pub use model_info::{ModelInfo, ModelStats};
pub use node::{Node, NodeId, Transform, Visibility};
pub use scene::{Instance, InstanceId, Scene};
pub use stage::ModelStage;
pub use texture::{Texture, TextureId};
pub use upload::{validate_file_name, ValidationError};
pub use wireframe::edge_indices;
