use std::f32::consts::FRAC_PI_2;

use cgmath::{InnerSpace, MetricSpace};

use crate::event::{CallbackId, Event, EventDispatcher, EventKind};
use crate::input::MouseButton;
use crate::operator::{Operator, OperatorId};
use crate::scene::Camera;
use crate::scene_scale;

/// Just under straight up or down, where the orbit frame would flip.
const MAX_ELEVATION: f32 = FRAC_PI_2 - 0.01;

/// Spherical coordinates of the eye around the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Orbit {
    /// Horizontal angle around +Y, 0 looking down -Z
    pub azimuth: f32,
    /// Angle above the horizontal plane
    pub elevation: f32,
    pub radius: f32,
}

impl Orbit {
    pub fn from_camera(camera: &Camera) -> Self {
        let direction = camera.eye - camera.target;
        let horizontal = (direction.x * direction.x + direction.z * direction.z).sqrt();
        Self {
            azimuth: direction.x.atan2(direction.z),
            elevation: direction.y.atan2(horizontal),
            radius: camera.eye.distance(camera.target),
        }
    }

    /// Places the eye on the sphere and re-derives an up vector
    /// perpendicular to the view direction.
    pub fn apply(&self, camera: &mut Camera) {
        let t = camera.target;
        camera.eye = cgmath::point3(
            t.x + self.radius * self.elevation.cos() * self.azimuth.sin(),
            t.y + self.radius * self.elevation.sin(),
            t.z + self.radius * self.elevation.cos() * self.azimuth.cos(),
        );

        let forward = (camera.target - camera.eye).normalize();
        let right = cgmath::vec3(0.0, 1.0, 0.0).cross(forward).normalize();
        camera.up = forward.cross(right).normalize();
    }

    /// Drag right swings the eye left around the target; drag down raises it.
    pub fn rotate(&mut self, dx: f32, dy: f32, sensitivity: f32) {
        self.azimuth -= dx * sensitivity;
        self.elevation = (self.elevation + dy * sensitivity).clamp(-MAX_ELEVATION, MAX_ELEVATION);
    }

    /// Exponential zoom: each wheel line scales the distance by
    /// `1 ± sensitivity`. Positive `lines` moves closer.
    pub fn zoom(&mut self, lines: f32, sensitivity: f32, model_radius: f32) {
        let factor = if lines > 0.0 {
            1.0 - sensitivity
        } else {
            1.0 + sensitivity
        };
        self.radius = (self.radius * factor.powf(lines.abs())).clamp(
            scene_scale::min_camera_radius(model_radius),
            scene_scale::max_camera_radius(model_radius),
        );
    }
}

/// Moves eye and target together in the view plane.
pub(crate) fn pan(camera: &mut Camera, dx: f32, dy: f32, model_radius: f32) {
    let scale = scene_scale::pan_sensitivity(model_radius);
    let offset = camera.right() * (-dx * scale) + camera.up * (dy * scale);
    camera.eye += offset;
    camera.target += offset;
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragMode {
    Orbit,
    Pan,
}

fn drag_mode(button: MouseButton) -> Option<DragMode> {
    match button {
        MouseButton::Left => Some(DragMode::Orbit),
        MouseButton::Right | MouseButton::Middle => Some(DragMode::Pan),
        _ => None,
    }
}

/// Orbit-style mouse navigation.
///
/// - Left drag: orbit around the target
/// - Right or middle drag: pan (when panning is enabled)
/// - Wheel: zoom toward the target (when zooming is enabled)
pub struct NavigationOperator {
    id: OperatorId,
    callback_ids: Vec<CallbackId>,
}

impl NavigationOperator {
    pub fn new(id: OperatorId) -> Self {
        Self {
            id,
            callback_ids: Vec::new(),
        }
    }
}

impl Operator for NavigationOperator {
    fn activate(&mut self, dispatcher: &mut EventDispatcher) {
        let drag_start = dispatcher.register(EventKind::MouseDragStart, move |event, ctx| {
            let Event::MouseDragStart { button, .. } = event else {
                return false;
            };
            match drag_mode(*button) {
                Some(DragMode::Orbit) => true,
                Some(DragMode::Pan) => ctx.controls.enable_pan,
                None => false,
            }
        });

        // Re-derived from the camera every step; auto-rotate moves it too
        let drag = dispatcher.register(EventKind::MouseDrag, move |event, ctx| {
            let Event::MouseDrag { button, delta, .. } = event else {
                return false;
            };
            match drag_mode(*button) {
                Some(DragMode::Orbit) => {
                    let mut orbit = Orbit::from_camera(ctx.camera);
                    orbit.rotate(delta.0, delta.1, ctx.controls.orbit_sensitivity);
                    orbit.apply(ctx.camera);
                    true
                }
                Some(DragMode::Pan) if ctx.controls.enable_pan => {
                    let radius = scene_scale::stage_radius(ctx.stage);
                    pan(ctx.camera, delta.0, delta.1, radius);
                    true
                }
                _ => false,
            }
        });

        let wheel = dispatcher.register(EventKind::MouseWheel, move |event, ctx| {
            let Event::MouseWheel { delta } = event else {
                return false;
            };
            if !ctx.controls.enable_zoom {
                return false;
            }
            let radius = scene_scale::stage_radius(ctx.stage);
            let mut orbit = Orbit::from_camera(ctx.camera);
            orbit.zoom(delta.vertical_lines(), ctx.controls.zoom_sensitivity, radius);
            orbit.apply(ctx.camera);
            true
        });

        self.callback_ids = vec![drag_start, drag, wheel];
    }

    fn deactivate(&mut self, dispatcher: &mut EventDispatcher) {
        for id in self.callback_ids.drain(..) {
            dispatcher.unregister(id);
        }
    }

    fn id(&self) -> OperatorId {
        self.id
    }

    fn name(&self) -> &str {
        "Navigation"
    }

    fn callback_ids(&self) -> &[CallbackId] {
        &self.callback_ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::test_support::TestState;
    use crate::input::MouseScrollDelta;
    use cgmath::Point3;

    const EPSILON: f32 = 1e-4;

    fn camera_at(eye: Point3<f32>) -> Camera {
        let mut camera = Camera::from_config(&Default::default(), 1.0);
        camera.eye = eye;
        camera.target = Point3::new(0.0, 0.0, 0.0);
        camera
    }

    #[test]
    fn test_orbit_round_trips_camera() {
        let mut camera = camera_at(Point3::new(3.0, 4.0, 5.0));
        let orbit = Orbit::from_camera(&camera);
        let before = camera.eye;
        orbit.apply(&mut camera);
        assert!(camera.eye.distance(before) < EPSILON);
    }

    #[test]
    fn test_orbit_keeps_distance() {
        let mut camera = camera_at(Point3::new(0.0, 0.0, 10.0));
        let mut orbit = Orbit::from_camera(&camera);
        orbit.rotate(100.0, 50.0, 0.005);
        orbit.apply(&mut camera);
        assert!((camera.length() - 10.0).abs() < EPSILON);
        assert!(camera.eye.x < 0.0);
        assert!(camera.eye.y > 0.0);
    }

    #[test]
    fn test_elevation_clamped() {
        let mut orbit = Orbit::from_camera(&camera_at(Point3::new(0.0, 0.0, 10.0)));
        orbit.rotate(0.0, 10_000.0, 0.005);
        assert_eq!(orbit.elevation, MAX_ELEVATION);
        orbit.rotate(0.0, -100_000.0, 0.005);
        assert_eq!(orbit.elevation, -MAX_ELEVATION);
    }

    #[test]
    fn test_zoom_exponential_and_clamped() {
        let mut orbit = Orbit::from_camera(&camera_at(Point3::new(0.0, 0.0, 10.0)));
        orbit.zoom(1.0, 0.1, 10.0);
        assert!((orbit.radius - 9.0).abs() < EPSILON);
        orbit.zoom(-1.0, 0.1, 10.0);
        assert!((orbit.radius - 9.9).abs() < EPSILON);

        orbit.zoom(1000.0, 0.1, 10.0);
        assert!((orbit.radius - scene_scale::min_camera_radius(10.0)).abs() < EPSILON);
        orbit.zoom(-1000.0, 0.1, 10.0);
        assert!((orbit.radius - scene_scale::max_camera_radius(10.0)).abs() < EPSILON);
    }

    #[test]
    fn test_pan_moves_eye_and_target_together() {
        let mut camera = camera_at(Point3::new(0.0, 0.0, 10.0));
        camera.up = cgmath::vec3(0.0, 1.0, 0.0);
        pan(&mut camera, 100.0, 0.0, 10.0);
        // 100 px * 0.01 units/px to the left
        assert!((camera.target.x + 1.0).abs() < EPSILON);
        assert!((camera.eye.x + 1.0).abs() < EPSILON);
        assert!((camera.length() - 10.0).abs() < EPSILON);
    }

    #[test]
    fn test_wheel_respects_enable_zoom() {
        let mut dispatcher = EventDispatcher::new();
        let mut operator = NavigationOperator::new(0);
        operator.activate(&mut dispatcher);

        let mut state = TestState::new();
        let before = state.camera.length();
        let wheel = Event::MouseWheel {
            delta: MouseScrollDelta::LineDelta(0.0, 1.0),
        };

        assert!(dispatcher.dispatch(&wheel, &mut state.ctx()));
        assert!(state.camera.length() < before);

        state.controls.enable_zoom = false;
        let zoomed = state.camera.length();
        assert!(!dispatcher.dispatch(&wheel, &mut state.ctx()));
        assert_eq!(state.camera.length(), zoomed);
    }

    #[test]
    fn test_right_drag_pans_only_when_enabled() {
        let mut dispatcher = EventDispatcher::new();
        let mut operator = NavigationOperator::new(0);
        operator.activate(&mut dispatcher);

        let mut state = TestState::new();
        let drag = Event::MouseDrag {
            button: MouseButton::Right,
            start_pos: (0.0, 0.0),
            current_pos: (50.0, 0.0),
            delta: (50.0, 0.0),
        };

        let target = state.camera.target;
        state.controls.enable_pan = false;
        dispatcher.dispatch(&drag, &mut state.ctx());
        assert_eq!(state.camera.target, target);

        state.controls.enable_pan = true;
        dispatcher.dispatch(&drag, &mut state.ctx());
        assert_ne!(state.camera.target, target);
    }

    #[test]
    fn test_deactivate_unregisters() {
        let mut dispatcher = EventDispatcher::new();
        let mut operator = NavigationOperator::new(0);
        operator.activate(&mut dispatcher);
        assert_eq!(operator.callback_ids().len(), 3);
        assert!(operator.is_active());

        operator.deactivate(&mut dispatcher);
        assert!(!operator.is_active());

        let mut state = TestState::new();
        let before = state.camera.eye;
        let wheel = Event::MouseWheel {
            delta: MouseScrollDelta::LineDelta(0.0, 1.0),
        };
        assert!(!dispatcher.dispatch(&wheel, &mut state.ctx()));
        assert_eq!(state.camera.eye, before);
    }
}
