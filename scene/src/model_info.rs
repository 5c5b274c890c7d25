//! Statistics about the loaded model, formatted for display.

use std::collections::BTreeSet;

use cgmath::Vector3;

use crate::material::UNNAMED_MATERIAL;
use crate::normalize::Normalization;

/// Raw counts gathered while importing, one entry per drawn primitive instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelStats {
    pub vertices: u64,
    /// Index count of indexed triangle primitives
    pub triangle_indices: u64,
    pub material_names: BTreeSet<String>,
}

impl ModelStats {
    pub fn add_primitive(&mut self, vertex_count: usize, triangle_indices: Option<usize>, material_name: Option<&str>) {
        self.vertices += vertex_count as u64;
        if let Some(count) = triangle_indices {
            self.triangle_indices += count as u64;
        }
        let name = match material_name {
            Some(name) if !name.is_empty() => name,
            _ => UNNAMED_MATERIAL,
        };
        self.material_names.insert(name.to_string());
    }

    pub fn faces(&self) -> u64 {
        self.triangle_indices / 3
    }
}

/// Display strings for the info panel.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub file_name: String,
    pub file_size: String,
    pub vertices: String,
    pub faces: String,
    pub dimensions: String,
    pub materials: usize,
    pub scale: String,
}

impl ModelInfo {
    pub fn new(stats: &ModelStats, normalization: &Normalization, file_name: &str, file_size: Option<u64>) -> Self {
        Self {
            file_name: file_name.to_string(),
            file_size: format_file_size(file_size),
            vertices: format_count(stats.vertices),
            faces: format_count(stats.faces()),
            dimensions: format_dimensions(normalization.size),
            materials: stats.material_names.len(),
            scale: format_scale(normalization.scale),
        }
    }
}

pub fn format_file_size(bytes: Option<u64>) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    match bytes {
        None => "N/A".to_string(),
        Some(b) if b < KB => format!("{} B", b),
        Some(b) if b < MB => format!("{:.2} KB", b as f64 / KB as f64),
        Some(b) => format!("{:.2} MB", b as f64 / MB as f64),
    }
}

/// Groups digits in threes with `.` separators: 1234567 -> "1.234.567".
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

pub fn format_dimensions(size: Vector3<f32>) -> String {
    format!("{:.2} x {:.2} x {:.2}", size.x, size.y, size.z)
}

pub fn format_scale(scale: f32) -> String {
    format!("1:{:.2}", 1.0 / scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Aabb;
    use cgmath::Point3;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(None), "N/A");
        assert_eq!(format_file_size(Some(0)), "0 B");
        assert_eq!(format_file_size(Some(1023)), "1023 B");
        assert_eq!(format_file_size(Some(1024)), "1.00 KB");
        assert_eq!(format_file_size(Some(1536)), "1.50 KB");
        assert_eq!(format_file_size(Some(5 * 1024 * 1024 + 512 * 1024)), "5.50 MB");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1.000");
        assert_eq!(format_count(1234567), "1.234.567");
    }

    #[test]
    fn test_format_dimensions_and_scale() {
        assert_eq!(format_dimensions(Vector3::new(2.0, 1.5, 0.25)), "2.00 x 1.50 x 0.25");
        assert_eq!(format_scale(5.0), "1:0.20");
        assert_eq!(format_scale(0.5), "1:2.00");
        assert_eq!(format_scale(1.0), "1:1.00");
    }

    #[test]
    fn test_stats_counts() {
        let mut stats = ModelStats::default();
        stats.add_primitive(24, Some(36), Some("Wood"));
        stats.add_primitive(4, None, None);
        stats.add_primitive(3, Some(4), Some(""));

        assert_eq!(stats.vertices, 31);
        // 40 indices: 13 whole faces
        assert_eq!(stats.faces(), 13);
        assert_eq!(stats.material_names.len(), 2);
        assert!(stats.material_names.contains("Material"));
    }

    #[test]
    fn test_model_info_new() {
        let mut stats = ModelStats::default();
        stats.add_primitive(1200, Some(3000), Some("Body"));
        let normalization = Normalization {
            bounds: Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 1.0, 0.5)),
            center: Point3::new(1.0, 0.5, 0.25),
            size: Vector3::new(2.0, 1.0, 0.5),
            scale: 5.0,
        };

        let info = ModelInfo::new(&stats, &normalization, "robot.glb", Some(2048));
        assert_eq!(info.file_name, "robot.glb");
        assert_eq!(info.file_size, "2.00 KB");
        assert_eq!(info.vertices, "1.200");
        assert_eq!(info.faces, "1.000");
        assert_eq!(info.dimensions, "2.00 x 1.00 x 0.50");
        assert_eq!(info.materials, 1);
        assert_eq!(info.scale, "1:0.20");
    }
}
