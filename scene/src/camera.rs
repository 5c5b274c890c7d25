use cgmath::{InnerSpace, MetricSpace, Point3, Vector3};

use crate::config::CameraConfig;

/// Remaps OpenGL clip-space depth [-1, 1] to the wgpu range [0, 1]: `z' = 0.5 * z + 0.5`
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// A camera that defines the viewpoint and projection for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// The position of the camera in world space.
    pub eye: Point3<f32>,
    /// The point the camera is looking at in world space.
    pub target: Point3<f32>,
    /// The up direction vector (Y-up).
    pub up: Vector3<f32>,
    /// The aspect ratio of the viewport (width / height).
    pub aspect: f32,
    /// Vertical field of view in degrees.
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    /// Camera placed as the configuration describes.
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            eye: Point3::from(config.position),
            target: Point3::from(config.target),
            up: Vector3::unit_y(),
            aspect,
            fovy: config.fov,
            znear: config.near,
            zfar: config.far,
        }
    }

    /// Puts eye and target back where the configuration places them.
    /// Projection settings and aspect are left alone.
    pub fn reset(&mut self, config: &CameraConfig) {
        self.eye = Point3::from(config.position);
        self.target = Point3::from(config.target);
        self.up = Vector3::unit_y();
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// World to clip space, in the wgpu depth convention.
    pub fn build_view_projection_matrix(&self) -> cgmath::Matrix4<f32> {
        let view = cgmath::Matrix4::look_at_rh(self.eye, self.target, self.up);
        let proj = cgmath::perspective(cgmath::Deg(self.fovy), self.aspect, self.znear, self.zfar);

        OPENGL_TO_WGPU_MATRIX * proj * view
    }

    pub fn forward(&self) -> Vector3<f32> {
        (self.target - self.eye).normalize()
    }

    pub fn right(&self) -> Vector3<f32> {
        self.forward().cross(self.up).normalize()
    }

    /// Distance from eye to target
    pub fn length(&self) -> f32 {
        self.eye.distance(self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{SquareMatrix, Vector4};

    const EPSILON: f32 = 1e-6;

    fn create_test_camera() -> Camera {
        Camera {
            eye: Point3::new(0.0, 0.0, 5.0),
            target: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::new(0.0, 1.0, 0.0),
            aspect: 16.0 / 9.0,
            fovy: 45.0,
            znear: 0.1,
            zfar: 100.0,
        }
    }

    #[test]
    fn test_camera_from_default_config() {
        let camera = Camera::from_config(&CameraConfig::default(), 1.5);
        assert_eq!(camera.eye, Point3::new(0.0, 5.0, 10.0));
        assert_eq!(camera.target, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(camera.fovy, 75.0);
        assert_eq!(camera.znear, 0.1);
        assert_eq!(camera.zfar, 1000.0);
        assert_eq!(camera.aspect, 1.5);
    }

    #[test]
    fn test_reset_keeps_aspect() {
        let config = CameraConfig::default();
        let mut camera = Camera::from_config(&config, 2.0);
        camera.eye = Point3::new(40.0, -3.0, 1.0);
        camera.target = Point3::new(1.0, 1.0, 1.0);

        camera.reset(&config);
        assert_eq!(camera.eye, Point3::new(0.0, 5.0, 10.0));
        assert_eq!(camera.target, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(camera.aspect, 2.0);
    }

    #[test]
    fn test_set_aspect_ignores_zero_height() {
        let mut camera = create_test_camera();
        camera.set_aspect(800, 400);
        assert_eq!(camera.aspect, 2.0);
        camera.set_aspect(800, 0);
        assert_eq!(camera.aspect, 2.0);
    }

    #[test]
    fn test_camera_forward_and_right() {
        let camera = create_test_camera();
        let forward = camera.forward();
        assert!((forward.z + 1.0).abs() < EPSILON);

        let right = camera.right();
        assert!(forward.dot(right).abs() < EPSILON);
        assert!((right.x - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_camera_length() {
        let mut camera = create_test_camera();
        camera.eye = Point3::new(3.0, 4.0, 0.0);
        assert!((camera.length() - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_build_view_projection_invertible() {
        let vp = create_test_camera().build_view_projection_matrix();
        assert!(vp.determinant().abs() > EPSILON);
    }

    #[test]
    fn test_depth_remapping() {
        let near = OPENGL_TO_WGPU_MATRIX * Vector4::new(0.0, 0.0, -1.0, 1.0);
        let far = OPENGL_TO_WGPU_MATRIX * Vector4::new(0.0, 0.0, 1.0, 1.0);
        assert!(near.z.abs() < EPSILON);
        assert!((far.z - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_target_projects_to_center() {
        let camera = create_test_camera();
        let clip = camera.build_view_projection_matrix() * camera.target.to_homogeneous();
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4);
        assert!(ndc.y.abs() < 1e-4);
        assert!(ndc.z >= 0.0 && ndc.z <= 1.0);
    }
}
