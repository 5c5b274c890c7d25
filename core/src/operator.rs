mod auto_rotate;
mod navigation;

pub use auto_rotate::AutoRotateOperator;
pub use navigation::NavigationOperator;

use crate::event::{CallbackId, EventDispatcher};

pub type OperatorId = u32;

/// Ids of the operators the viewer installs.
pub enum BuiltinOperatorId {
    Navigation = 0,
    AutoRotate = 1,
}

impl From<BuiltinOperatorId> for OperatorId {
    fn from(id: BuiltinOperatorId) -> Self {
        id as OperatorId
    }
}

/// An interaction mode that owns a set of dispatcher callbacks.
///
/// Activation registers the callbacks and records their ids; deactivation
/// unregisters them. The [`OperatorManager`] decides the order in which
/// operators see events.
pub trait Operator {
    fn activate(&mut self, dispatcher: &mut EventDispatcher);

    fn deactivate(&mut self, dispatcher: &mut EventDispatcher);

    fn id(&self) -> OperatorId;

    fn name(&self) -> &str;

    /// Ids of the registered callbacks; empty while inactive.
    fn callback_ids(&self) -> &[CallbackId];

    fn is_active(&self) -> bool {
        !self.callback_ids().is_empty()
    }
}

/// Ordered stack of operators. The front operator receives events first.
pub struct OperatorManager {
    operators: Vec<Box<dyn Operator>>,
}

impl OperatorManager {
    pub(crate) fn new() -> Self {
        Self {
            operators: Vec::new(),
        }
    }

    /// Activates `operator` and gives it the highest priority.
    pub fn push_front(&mut self, operator: Box<dyn Operator>, dispatcher: &mut EventDispatcher) {
        self.insert(0, operator, dispatcher);
    }

    /// Activates `operator` and gives it the lowest priority.
    pub fn push_back(&mut self, operator: Box<dyn Operator>, dispatcher: &mut EventDispatcher) {
        self.insert(self.operators.len(), operator, dispatcher);
    }

    fn insert(&mut self, index: usize, mut operator: Box<dyn Operator>, dispatcher: &mut EventDispatcher) {
        if !operator.is_active() {
            operator.activate(dispatcher);
        }
        log::debug!("Operator '{}' installed at position {}", operator.name(), index);
        self.operators.insert(index, operator);
        self.reorder_callbacks(dispatcher);
    }

    /// Deactivates and drops the operator with `id`. Returns whether it existed.
    pub fn remove(&mut self, id: OperatorId, dispatcher: &mut EventDispatcher) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };
        let mut operator = self.operators.remove(pos);
        if operator.is_active() {
            operator.deactivate(dispatcher);
        }
        self.reorder_callbacks(dispatcher);
        true
    }

    pub fn move_to_front(&mut self, id: OperatorId, dispatcher: &mut EventDispatcher) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };
        let operator = self.operators.remove(pos);
        self.operators.insert(0, operator);
        self.reorder_callbacks(dispatcher);
        true
    }

    /// Swaps two operators. Swapping an operator with itself succeeds.
    pub fn swap(&mut self, id1: OperatorId, id2: OperatorId, dispatcher: &mut EventDispatcher) -> bool {
        match (self.position(id1), self.position(id2)) {
            (Some(p1), Some(p2)) => {
                if p1 != p2 {
                    self.operators.swap(p1, p2);
                    self.reorder_callbacks(dispatcher);
                }
                true
            }
            _ => false,
        }
    }

    // Dispatcher order must follow operator order for shared event kinds
    fn reorder_callbacks(&self, dispatcher: &mut EventDispatcher) {
        let ordered_ids: Vec<CallbackId> = self
            .operators
            .iter()
            .flat_map(|op| op.callback_ids().iter().copied())
            .collect();
        dispatcher.reorder(&ordered_ids);
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Operators in priority order (front to back).
    pub fn iter(&self) -> impl Iterator<Item = &dyn Operator> {
        self.operators.iter().map(|op| op.as_ref())
    }

    pub fn position(&self, id: OperatorId) -> Option<usize> {
        self.operators.iter().position(|op| op.id() == id)
    }
}
