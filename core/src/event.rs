use std::collections::HashMap;
use web_time::Instant;

use crate::input::{ElementState, KeyEvent, MouseButton, MouseScrollDelta};
use crate::scene::{Camera, ControlSettings, ModelStage};

/// Movement threshold in pixels before a mouse button hold becomes a drag.
const DRAG_THRESHOLD_PIXELS: f32 = 4.0;

/// Maximum time in milliseconds for a button press/release to be considered a click.
const CLICK_TIME_THRESHOLD_MS: u64 = 300;

/// State handed to event callbacks for the duration of one dispatch.
///
/// Operators move the camera, drive the stage (animation, wireframe) and
/// read the user's control settings through it.
pub struct EventContext<'c> {
    pub camera: &'c mut Camera,
    pub stage: &'c mut ModelStage,
    pub controls: &'c ControlSettings,
}

/// Unique identifier for a registered callback.
pub type CallbackId = u32;

/// Callbacks return `true` to stop propagation to later callbacks of the
/// same event kind.
type EventCallback = Box<dyn for<'c> Fn(&Event, &mut EventContext<'c>) -> bool>;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum EventKind {
    #[cfg(test)]
    Test,
    Update,
    Resized,
    KeyboardInput,
    MouseMotion,
    CursorMoved,
    MouseInput,
    MouseWheel,
    MouseDragStart,
    MouseDrag,
    MouseDragEnd,
    MouseClick,
}

/// Viewer events. The drag and click variants are synthesized by the
/// dispatcher from raw button and motion events.
#[derive(Debug)]
pub enum Event {
    #[cfg(test)]
    Test,
    /// Per-frame tick, dispatched once before rendering.
    Update {
        /// Seconds since the previous update
        delta_time: f32,
    },
    /// New physical size (width, height)
    Resized((u32, u32)),
    KeyboardInput {
        event: KeyEvent,
        is_synthetic: bool,
    },
    /// Relative pointer motion in pixels
    MouseMotion { delta: (f64, f64) },
    /// Absolute cursor position in physical pixels
    CursorMoved { position: (f64, f64) },
    MouseInput {
        state: ElementState,
        button: MouseButton,
    },
    MouseWheel { delta: MouseScrollDelta },
    MouseDragStart {
        button: MouseButton,
        start_pos: (f32, f32),
        current_pos: (f32, f32),
    },
    MouseDrag {
        button: MouseButton,
        start_pos: (f32, f32),
        current_pos: (f32, f32),
        /// Motion since the previous drag event
        delta: (f32, f32),
    },
    MouseDragEnd {
        button: MouseButton,
        start_pos: (f32, f32),
        end_pos: (f32, f32),
    },
    MouseClick {
        button: MouseButton,
        position: (f32, f32),
        duration_ms: u64,
    },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Update { .. } => EventKind::Update,
            Self::Resized(_) => EventKind::Resized,
            Self::KeyboardInput { .. } => EventKind::KeyboardInput,
            Self::MouseMotion { .. } => EventKind::MouseMotion,
            Self::CursorMoved { .. } => EventKind::CursorMoved,
            Self::MouseInput { .. } => EventKind::MouseInput,
            Self::MouseWheel { .. } => EventKind::MouseWheel,
            Self::MouseDragStart { .. } => EventKind::MouseDragStart,
            Self::MouseDrag { .. } => EventKind::MouseDrag,
            Self::MouseDragEnd { .. } => EventKind::MouseDragEnd,
            Self::MouseClick { .. } => EventKind::MouseClick,
            #[cfg(test)]
            Self::Test => EventKind::Test,
        }
    }
}

/// A mouse button currently held down.
#[derive(Debug, Clone)]
struct PressedButton {
    down_position: (f32, f32),
    down_time: Instant,
    is_dragging: bool,
    distance_dragged: f32,
}

/// Routes events to callbacks registered per [`EventKind`].
///
/// Callbacks for a kind run in registration order until one returns `true`.
/// The dispatcher also tracks held buttons to synthesize drag and click
/// events, which are delivered before the raw event that caused them.
pub struct EventDispatcher {
    callback_map: HashMap<EventKind, Vec<(CallbackId, EventCallback)>>,
    next_id: u32,
    pressed: HashMap<MouseButton, PressedButton>,
    cursor_position: Option<(f32, f32)>,
}

impl EventDispatcher {
    pub(crate) fn new() -> Self {
        Self {
            callback_map: HashMap::new(),
            next_id: 0,
            pressed: HashMap::new(),
            cursor_position: None,
        }
    }

    /// Registers a callback for one event kind and returns its id.
    pub fn register<F>(&mut self, kind: EventKind, callback: F) -> CallbackId
    where
        F: for<'c> Fn(&Event, &mut EventContext<'c>) -> bool + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;

        self.callback_map
            .entry(kind)
            .or_default()
            .push((id, Box::new(callback)));

        id
    }

    /// Returns `true` if a callback with this id was removed.
    pub fn unregister(&mut self, id: CallbackId) -> bool {
        for callbacks in self.callback_map.values_mut() {
            if let Some(pos) = callbacks.iter().position(|(cid, _)| *cid == id) {
                callbacks.remove(pos);
                return true;
            }
        }
        false
    }

    /// Puts the listed callbacks of `kind` first, in the given order.
    /// Unlisted callbacks keep their relative order after them; unknown ids
    /// are ignored. Returns `false` if nothing is registered for `kind`.
    pub fn reorder_kind(&mut self, kind: EventKind, ids: &[CallbackId]) -> bool {
        let Some(callbacks) = self.callback_map.get_mut(&kind) else {
            return false;
        };

        let mut reordered = Vec::with_capacity(callbacks.len());
        for &id in ids {
            if let Some(pos) = callbacks.iter().position(|(cid, _)| *cid == id) {
                reordered.push(callbacks.remove(pos));
            }
        }
        reordered.append(callbacks);
        *callbacks = reordered;
        true
    }

    /// Applies [`Self::reorder_kind`] to every registered kind.
    pub fn reorder(&mut self, ids: &[CallbackId]) {
        let kinds: Vec<EventKind> = self.callback_map.keys().copied().collect();
        for kind in kinds {
            self.reorder_kind(kind, ids);
        }
    }

    /// Dispatches `event`, synthesizing drag and click events first.
    /// Returns `true` if a callback stopped propagation of `event`.
    pub fn dispatch(&mut self, event: &Event, ctx: &mut EventContext<'_>) -> bool {
        for synthesized in self.track_pointer(event) {
            self.dispatch_to_callbacks(&synthesized, ctx);
        }
        self.dispatch_to_callbacks(event, ctx)
    }

    fn dispatch_to_callbacks(&self, event: &Event, ctx: &mut EventContext<'_>) -> bool {
        let Some(callbacks) = self.callback_map.get(&event.kind()) else {
            return false;
        };
        callbacks.iter().any(|(_id, callback)| callback(event, ctx))
    }

    /// Updates pointer state from a raw event and returns the events it implies.
    fn track_pointer(&mut self, event: &Event) -> Vec<Event> {
        match event {
            Event::CursorMoved { position } => {
                self.cursor_position = Some((position.0 as f32, position.1 as f32));
                Vec::new()
            }
            Event::MouseInput { state, button } => self.track_button(*state, *button),
            Event::MouseMotion { delta } => self.track_motion(*delta),
            _ => Vec::new(),
        }
    }

    fn track_button(&mut self, state: ElementState, button: MouseButton) -> Vec<Event> {
        match state {
            ElementState::Pressed => {
                if let Some(pos) = self.cursor_position {
                    self.pressed.insert(
                        button,
                        PressedButton {
                            down_position: pos,
                            down_time: Instant::now(),
                            is_dragging: false,
                            distance_dragged: 0.0,
                        },
                    );
                }
                Vec::new()
            }
            ElementState::Released => {
                let Some(pressed) = self.pressed.remove(&button) else {
                    return Vec::new();
                };
                if pressed.is_dragging {
                    self.cursor_position
                        .map(|end_pos| Event::MouseDragEnd {
                            button,
                            start_pos: pressed.down_position,
                            end_pos,
                        })
                        .into_iter()
                        .collect()
                } else {
                    let duration_ms = pressed.down_time.elapsed().as_millis() as u64;
                    if duration_ms <= CLICK_TIME_THRESHOLD_MS {
                        vec![Event::MouseClick {
                            button,
                            position: pressed.down_position,
                            duration_ms,
                        }]
                    } else {
                        Vec::new()
                    }
                }
            }
        }
    }

    fn track_motion(&mut self, delta: (f64, f64)) -> Vec<Event> {
        let magnitude = ((delta.0 * delta.0 + delta.1 * delta.1) as f32).sqrt();
        let Some(current_pos) = self.cursor_position else {
            return Vec::new();
        };

        let mut events = Vec::new();
        for (button, pressed) in &mut self.pressed {
            pressed.distance_dragged += magnitude;

            if pressed.is_dragging {
                events.push(Event::MouseDrag {
                    button: *button,
                    start_pos: pressed.down_position,
                    current_pos,
                    delta: (delta.0 as f32, delta.1 as f32),
                });
            } else if pressed.distance_dragged > DRAG_THRESHOLD_PIXELS {
                pressed.is_dragging = true;
                events.push(Event::MouseDragStart {
                    button: *button,
                    start_pos: pressed.down_position,
                    current_pos,
                });
            }
        }
        events
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::EventContext;
    use crate::scene::{Camera, ControlSettings, ModelStage, ViewerConfig};

    /// Owns real context state so callbacks can be exercised without a GPU.
    pub(crate) struct TestState {
        pub camera: Camera,
        pub stage: ModelStage,
        pub controls: ControlSettings,
    }

    impl TestState {
        pub fn new() -> Self {
            let config = ViewerConfig::default();
            Self {
                camera: Camera::from_config(&config.camera, 1.0),
                stage: ModelStage::new(&config).unwrap(),
                controls: config.controls.clone(),
            }
        }

        pub fn ctx(&mut self) -> EventContext<'_> {
            EventContext {
                camera: &mut self.camera,
                stage: &mut self.stage,
                controls: &self.controls,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::TestState;
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn cursor(x: f64, y: f64) -> Event {
        Event::CursorMoved { position: (x, y) }
    }

    fn button(state: ElementState) -> Event {
        Event::MouseInput {
            state,
            button: MouseButton::Left,
        }
    }

    /// Records the kinds of every event seen by the registered callbacks.
    fn record_kinds(dispatcher: &mut EventDispatcher, kinds: &[EventKind]) -> Rc<RefCell<Vec<EventKind>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        for &kind in kinds {
            let seen = Rc::clone(&seen);
            dispatcher.register(kind, move |event, _ctx| {
                seen.borrow_mut().push(event.kind());
                false
            });
        }
        seen
    }

    #[test]
    fn test_register_assigns_sequential_ids() {
        let mut dispatcher = EventDispatcher::new();
        let id1 = dispatcher.register(EventKind::KeyboardInput, |_event, _ctx| false);
        let id2 = dispatcher.register(EventKind::MouseInput, |_event, _ctx| false);
        let id3 = dispatcher.register(EventKind::KeyboardInput, |_event, _ctx| false);

        assert_eq!((id1, id2, id3), (0, 1, 2));
        assert_eq!(dispatcher.callback_map[&EventKind::KeyboardInput].len(), 2);
    }

    #[test]
    fn test_unregister() {
        let mut dispatcher = EventDispatcher::new();
        let id = dispatcher.register(EventKind::MouseMotion, |_event, _ctx| false);

        assert!(dispatcher.unregister(id));
        assert!(dispatcher.callback_map[&EventKind::MouseMotion].is_empty());
        assert!(!dispatcher.unregister(999));
    }

    #[test]
    fn test_dispatch_without_callbacks() {
        let mut dispatcher = EventDispatcher::new();
        let mut state = TestState::new();
        assert!(!dispatcher.dispatch(&Event::Test, &mut state.ctx()));
    }

    #[test]
    fn test_dispatch_stops_propagation() {
        let mut dispatcher = EventDispatcher::new();
        let counter = Rc::new(Cell::new(0));

        for (increment, stop) in [(1, false), (10, true), (100, false)] {
            let counter = Rc::clone(&counter);
            dispatcher.register(EventKind::Test, move |_event, _ctx| {
                counter.set(counter.get() + increment);
                stop
            });
        }

        let mut state = TestState::new();
        assert!(dispatcher.dispatch(&Event::Test, &mut state.ctx()));
        assert_eq!(counter.get(), 11);
    }

    #[test]
    fn test_callbacks_can_mutate_context() {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(EventKind::Resized, |event, ctx| {
            if let Event::Resized((w, h)) = event {
                ctx.camera.set_aspect(*w, *h);
            }
            true
        });

        let mut state = TestState::new();
        dispatcher.dispatch(&Event::Resized((200, 100)), &mut state.ctx());
        assert_eq!(state.camera.aspect, 2.0);
    }

    #[test]
    fn test_reorder_kind() {
        let mut dispatcher = EventDispatcher::new();
        let id1 = dispatcher.register(EventKind::Resized, |_event, _ctx| false);
        let id2 = dispatcher.register(EventKind::Resized, |_event, _ctx| false);
        let id3 = dispatcher.register(EventKind::Resized, |_event, _ctx| false);

        assert!(dispatcher.reorder_kind(EventKind::Resized, &[id3, 999, id1]));
        let order: Vec<_> = dispatcher.callback_map[&EventKind::Resized]
            .iter()
            .map(|(id, _)| *id)
            .collect();
        assert_eq!(order, vec![id3, id1, id2]);

        assert!(!dispatcher.reorder_kind(EventKind::MouseClick, &[id1]));
    }

    #[test]
    fn test_reorder_all_kinds() {
        let mut dispatcher = EventDispatcher::new();
        let id1 = dispatcher.register(EventKind::MouseInput, |_event, _ctx| false);
        let id2 = dispatcher.register(EventKind::MouseInput, |_event, _ctx| false);
        let id3 = dispatcher.register(EventKind::KeyboardInput, |_event, _ctx| false);
        let id4 = dispatcher.register(EventKind::KeyboardInput, |_event, _ctx| false);

        dispatcher.reorder(&[id2, id4, id1, id3]);

        assert_eq!(dispatcher.callback_map[&EventKind::MouseInput][0].0, id2);
        assert_eq!(dispatcher.callback_map[&EventKind::KeyboardInput][0].0, id4);
    }

    #[test]
    fn test_quick_press_release_is_click() {
        let mut dispatcher = EventDispatcher::new();
        let seen = record_kinds(&mut dispatcher, &[EventKind::MouseClick, EventKind::MouseInput]);
        let mut state = TestState::new();

        dispatcher.dispatch(&cursor(10.0, 10.0), &mut state.ctx());
        dispatcher.dispatch(&button(ElementState::Pressed), &mut state.ctx());
        dispatcher.dispatch(&button(ElementState::Released), &mut state.ctx());

        assert_eq!(
            *seen.borrow(),
            vec![EventKind::MouseInput, EventKind::MouseClick, EventKind::MouseInput]
        );
    }

    #[test]
    fn test_small_motion_is_not_drag() {
        let mut dispatcher = EventDispatcher::new();
        let seen = record_kinds(&mut dispatcher, &[EventKind::MouseDragStart, EventKind::MouseClick]);
        let mut state = TestState::new();

        dispatcher.dispatch(&cursor(10.0, 10.0), &mut state.ctx());
        dispatcher.dispatch(&button(ElementState::Pressed), &mut state.ctx());
        dispatcher.dispatch(&Event::MouseMotion { delta: (2.0, 2.0) }, &mut state.ctx());
        dispatcher.dispatch(&button(ElementState::Released), &mut state.ctx());

        assert_eq!(*seen.borrow(), vec![EventKind::MouseClick]);
    }

    #[test]
    fn test_drag_sequence() {
        let mut dispatcher = EventDispatcher::new();
        let seen = record_kinds(
            &mut dispatcher,
            &[
                EventKind::MouseDragStart,
                EventKind::MouseDrag,
                EventKind::MouseDragEnd,
                EventKind::MouseClick,
            ],
        );
        let mut state = TestState::new();

        dispatcher.dispatch(&cursor(10.0, 10.0), &mut state.ctx());
        dispatcher.dispatch(&button(ElementState::Pressed), &mut state.ctx());
        dispatcher.dispatch(&cursor(20.0, 10.0), &mut state.ctx());
        dispatcher.dispatch(&Event::MouseMotion { delta: (10.0, 0.0) }, &mut state.ctx());
        dispatcher.dispatch(&Event::MouseMotion { delta: (3.0, 0.0) }, &mut state.ctx());
        dispatcher.dispatch(&button(ElementState::Released), &mut state.ctx());

        assert_eq!(
            *seen.borrow(),
            vec![
                EventKind::MouseDragStart,
                EventKind::MouseDrag,
                EventKind::MouseDragEnd
            ]
        );
    }

    #[test]
    fn test_drag_delta_matches_motion() {
        let mut dispatcher = EventDispatcher::new();
        let deltas = Rc::new(RefCell::new(Vec::new()));
        let recorded = Rc::clone(&deltas);
        dispatcher.register(EventKind::MouseDrag, move |event, _ctx| {
            if let Event::MouseDrag { delta, start_pos, .. } = event {
                assert_eq!(*start_pos, (0.0, 0.0));
                recorded.borrow_mut().push(*delta);
            }
            false
        });
        let mut state = TestState::new();

        dispatcher.dispatch(&cursor(0.0, 0.0), &mut state.ctx());
        dispatcher.dispatch(&button(ElementState::Pressed), &mut state.ctx());
        dispatcher.dispatch(&Event::MouseMotion { delta: (5.0, 0.0) }, &mut state.ctx());
        dispatcher.dispatch(&Event::MouseMotion { delta: (1.5, -2.0) }, &mut state.ctx());

        assert_eq!(*deltas.borrow(), vec![(1.5, -2.0)]);
    }

    #[test]
    fn test_press_without_cursor_is_ignored() {
        let mut dispatcher = EventDispatcher::new();
        let seen = record_kinds(&mut dispatcher, &[EventKind::MouseClick]);
        let mut state = TestState::new();

        dispatcher.dispatch(&button(ElementState::Pressed), &mut state.ctx());
        dispatcher.dispatch(&button(ElementState::Released), &mut state.ctx());

        assert!(seen.borrow().is_empty());
    }
}
