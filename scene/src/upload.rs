//! File-name checks applied before a model is read.

use thiserror::Error;

/// Extensions accepted by the viewer, lowercase with the leading dot.
pub const ACCEPTED_EXTENSIONS: [&str; 2] = [".glb", ".gltf"];

/// MIME types for browser file inputs.
pub const ACCEPTED_MIME_TYPES: &str = "model/gltf-binary,model/gltf+json";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select a .glb or .gltf file")]
    UnsupportedExtension { file_name: String },
}

/// Lowercased extension including the dot, taken from the last `.`.
pub fn file_extension(file_name: &str) -> Option<String> {
    file_name.rfind('.').map(|dot| file_name[dot..].to_lowercase())
}

/// Extensions without the dot, as native file dialogs take them.
pub fn dialog_extensions() -> Vec<&'static str> {
    ACCEPTED_EXTENSIONS
        .iter()
        .map(|ext| ext.trim_start_matches('.'))
        .collect()
}

/// Value for the `accept` attribute of an HTML file input.
pub fn file_input_accept() -> String {
    format!("{},{}", ACCEPTED_EXTENSIONS.join(","), ACCEPTED_MIME_TYPES)
}

pub fn validate_file_name(file_name: &str) -> Result<(), ValidationError> {
    match file_extension(file_name) {
        Some(ext) if ACCEPTED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(ValidationError::UnsupportedExtension {
            file_name: file_name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_gltf_and_glb() {
        assert!(validate_file_name("duck.glb").is_ok());
        assert!(validate_file_name("scene.gltf").is_ok());
        assert!(validate_file_name("UPPER.GLB").is_ok());
        assert!(validate_file_name("archive.v2.gltf").is_ok());
    }

    #[test]
    fn test_rejects_other_extensions() {
        assert!(validate_file_name("model.obj").is_err());
        assert!(validate_file_name("model.glb.zip").is_err());
        assert!(validate_file_name("glb").is_err());
        assert!(validate_file_name("").is_err());
    }

    #[test]
    fn test_error_message() {
        let err = validate_file_name("cube.fbx").unwrap_err();
        assert_eq!(err.to_string(), "Please select a .glb or .gltf file");
    }

    #[test]
    fn test_picker_filters() {
        assert_eq!(dialog_extensions(), ["glb", "gltf"]);
        assert_eq!(file_input_accept(), ".glb,.gltf,model/gltf-binary,model/gltf+json");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("a.b.GlTf").as_deref(), Some(".gltf"));
        assert_eq!(file_extension("noext"), None);
    }
}
