//! Drives a scene's nodes from a set of clips.

use std::collections::HashMap;
use std::sync::Arc;

use cgmath::{EuclideanSpace, InnerSpace, Point3, Quaternion, Vector3, VectorSpace};

use super::{AnimationAction, AnimationClip, TrackProperty, TrackValue};
use crate::node::{NodeId, Transform};
use crate::scene::Scene;

/// Owns one action per clip and writes their blended poses into the scene.
///
/// The transform each animated node had when the mixer was created is its
/// rest pose. Nodes with no active action are returned to it on apply.
#[derive(Debug)]
pub struct AnimationMixer {
    clips: Vec<Arc<AnimationClip>>,
    actions: HashMap<usize, AnimationAction>,
    rest_pose: HashMap<NodeId, Transform>,
    /// Global playback speed multiplier
    pub time_scale: f32,
}

impl AnimationMixer {
    pub fn new(clips: Vec<AnimationClip>, scene: &Scene) -> Self {
        let clips: Vec<Arc<AnimationClip>> = clips.into_iter().map(Arc::new).collect();
        let rest_pose = clips
            .iter()
            .flat_map(|clip| clip.targets())
            .filter_map(|id| scene.get_node(id).map(|node| (id, *node.transform())))
            .collect();

        Self {
            clips,
            actions: HashMap::new(),
            rest_pose,
            time_scale: 1.0,
        }
    }

    pub fn clips(&self) -> &[Arc<AnimationClip>] {
        &self.clips
    }

    /// The action for clip `index`, created stopped on first request.
    pub fn clip_action(&mut self, index: usize) -> Option<&mut AnimationAction> {
        let clip = self.clips.get(index)?;
        Some(
            self.actions
                .entry(index)
                .or_insert_with(|| AnimationAction::new(Arc::clone(clip))),
        )
    }

    pub fn stop_all_action(&mut self) {
        for action in self.actions.values_mut() {
            action.stop();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.actions.values().any(AnimationAction::is_playing)
    }

    /// Advances every action and poses the scene.
    pub fn update(&mut self, delta_time: f32, scene: &mut Scene) {
        let scaled = delta_time * self.time_scale;
        for action in self.actions.values_mut() {
            action.update(scaled);
        }
        self.apply(scene);
    }

    /// Writes the current pose of all animated nodes into the scene.
    pub fn apply(&self, scene: &mut Scene) {
        // (accumulated weight, blended value) per node and property
        let mut blended: HashMap<(NodeId, TrackProperty), (f32, TrackValue)> = HashMap::new();

        let mut indices: Vec<&usize> = self.actions.keys().collect();
        indices.sort_unstable();
        for index in indices {
            let action = &self.actions[index];
            if !action.is_active() || action.weight <= 0.0 {
                continue;
            }
            let time = action.time();
            for track in action.clip().tracks() {
                let Some(value) = track.sample(time) else {
                    continue;
                };
                let key = (track.target, track.property());
                match blended.get_mut(&key) {
                    Some((weight, current)) => {
                        let total = *weight + action.weight;
                        *current = blend_values(*current, value, action.weight / total);
                        *weight = total;
                    }
                    None => {
                        blended.insert(key, (action.weight, value));
                    }
                }
            }
        }

        for (&node_id, rest) in &self.rest_pose {
            let mut pose = *rest;
            for property in [TrackProperty::Translation, TrackProperty::Rotation, TrackProperty::Scale] {
                let Some(&(weight, value)) = blended.get(&(node_id, property)) else {
                    continue;
                };
                let value = blend_values(rest_value(rest, property), value, weight.min(1.0));
                match value {
                    TrackValue::Translation(v) => pose.position = Point3::from_vec(v),
                    TrackValue::Rotation(q) => pose.rotation = q,
                    TrackValue::Scale(s) => pose.scale = s,
                }
            }
            if let Some(node) = scene.get_node_mut(node_id) {
                node.set_transform(pose);
            }
        }
    }
}

fn rest_value(rest: &Transform, property: TrackProperty) -> TrackValue {
    match property {
        TrackProperty::Translation => TrackValue::Translation(rest.position.to_vec()),
        TrackProperty::Rotation => TrackValue::Rotation(rest.rotation),
        TrackProperty::Scale => TrackValue::Scale(rest.scale),
    }
}

fn blend_values(from: TrackValue, to: TrackValue, t: f32) -> TrackValue {
    match (from, to) {
        (TrackValue::Translation(a), TrackValue::Translation(b)) => TrackValue::Translation(lerp_vec(a, b, t)),
        (TrackValue::Scale(a), TrackValue::Scale(b)) => TrackValue::Scale(lerp_vec(a, b, t)),
        (TrackValue::Rotation(a), TrackValue::Rotation(b)) => {
            let b: Quaternion<f32> = if a.dot(b) < 0.0 { -b } else { b };
            TrackValue::Rotation(a.nlerp(b, t))
        }
        // Keys always pair equal properties
        (_, to) => to,
    }
}

fn lerp_vec(a: Vector3<f32>, b: Vector3<f32>, t: f32) -> Vector3<f32> {
    a.lerp(b, t)
}
