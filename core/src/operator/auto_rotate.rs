use std::f32::consts::TAU;

use crate::event::{CallbackId, Event, EventDispatcher, EventKind};
use crate::operator::navigation::Orbit;
use crate::operator::{Operator, OperatorId};
use crate::scene::Camera;

/// Radians per second for a given speed. Speed 1.0 is one revolution per
/// minute at 60 fps.
pub(crate) fn angular_speed(speed: f32) -> f32 {
    TAU / 60.0 * speed
}

/// Swing the eye around the target's vertical axis, keeping distance and height.
pub(crate) fn rotate_about_target(camera: &mut Camera, angle: f32) {
    let mut orbit = Orbit::from_camera(camera);
    orbit.azimuth += angle;
    orbit.apply(camera);
}

/// Turns the camera around the model on every update tick while
/// `ControlSettings::auto_rotate` is set.
pub struct AutoRotateOperator {
    id: OperatorId,
    callback_ids: Vec<CallbackId>,
}

impl AutoRotateOperator {
    pub fn new(id: OperatorId) -> Self {
        Self {
            id,
            callback_ids: Vec::new(),
        }
    }
}

impl Operator for AutoRotateOperator {
    fn activate(&mut self, dispatcher: &mut EventDispatcher) {
        let update = dispatcher.register(EventKind::Update, |event, ctx| {
            let Event::Update { delta_time } = event else {
                return false;
            };
            if ctx.controls.auto_rotate && *delta_time > 0.0 {
                let angle = angular_speed(ctx.controls.auto_rotate_speed) * delta_time;
                rotate_about_target(ctx.camera, angle);
            }
            // Other update listeners still run
            false
        });
        self.callback_ids = vec![update];
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
        "Auto Rotate"
    }

    fn callback_ids(&self) -> &[CallbackId] {
        &self.callback_ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::test_support::TestState;
    use cgmath::{MetricSpace, Point3};

    #[test]
    fn test_default_speed_is_twelve_second_revolution() {
        let per_second = angular_speed(5.0);
        assert!((TAU / per_second - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_rotation_keeps_height_and_distance() {
        let mut camera = Camera::from_config(&Default::default(), 1.0);
        camera.target = Point3::new(1.0, 0.0, 1.0);
        let (height, distance) = (camera.eye.y, camera.length());

        rotate_about_target(&mut camera, 1.0);

        assert!((camera.eye.y - height).abs() < 1e-4);
        assert!((camera.length() - distance).abs() < 1e-4);
    }

    #[test]
    fn test_update_rotates_only_when_enabled() {
        let mut dispatcher = EventDispatcher::new();
        let mut operator = AutoRotateOperator::new(1);
        operator.activate(&mut dispatcher);

        let mut state = TestState::new();
        let tick = Event::Update { delta_time: 0.5 };

        state.controls.auto_rotate = false;
        let start = state.camera.eye;
        assert!(!dispatcher.dispatch(&tick, &mut state.ctx()));
        assert_eq!(state.camera.eye, start);

        state.controls.auto_rotate = true;
        dispatcher.dispatch(&tick, &mut state.ctx());
        assert!(state.camera.eye.distance(start) > 1e-3);
    }

    #[test]
    fn test_full_revolution_returns_home() {
        let mut dispatcher = EventDispatcher::new();
        let mut operator = AutoRotateOperator::new(1);
        operator.activate(&mut dispatcher);

        let mut state = TestState::new();
        state.controls.auto_rotate = true;
        state.controls.auto_rotate_speed = 5.0;
        let start = state.camera.eye;

        // 12 seconds in 1/10 s steps
        for _ in 0..120 {
            dispatcher.dispatch(&Event::Update { delta_time: 0.1 }, &mut state.ctx());
        }
        assert!(state.camera.eye.distance(start) < 1e-2);
    }
}
