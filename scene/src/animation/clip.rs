use std::collections::HashMap;

use super::Track;
use crate::node::NodeId;

/// A named set of tracks played together.
#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    duration: f32,
    tracks: Vec<Track>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        let duration = tracks.iter().map(Track::duration).fold(0.0, f32::max);
        Self {
            name: name.into(),
            duration,
            tracks,
        }
    }

    /// Longest track duration, in seconds.
    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Nodes driven by this clip, without duplicates.
    pub fn targets(&self) -> Vec<NodeId> {
        let mut targets: Vec<NodeId> = self.tracks.iter().map(|t| t.target).collect();
        targets.sort_unstable();
        targets.dedup();
        targets
    }

    /// Rewrites track targets through `node_map`. Tracks whose target is not
    /// in the map are dropped. Duration is kept so playback timing is unchanged.
    pub fn remap_targets(&self, node_map: &HashMap<NodeId, NodeId>) -> Self {
        let tracks = self
            .tracks
            .iter()
            .filter_map(|track| {
                let target = *node_map.get(&track.target)?;
                let mut track = track.clone();
                track.target = target;
                Some(track)
            })
            .collect();
        Self {
            name: self.name.clone(),
            duration: self.duration,
            tracks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Interpolation, Keyframes};

    fn track(target: NodeId, end: f32) -> Track {
        Track::new(
            target,
            Interpolation::Linear,
            vec![0.0, end],
            Keyframes::Scale(vec![[1.0; 3], [2.0; 3]]),
        )
    }

    #[test]
    fn test_duration_is_longest_track() {
        let clip = AnimationClip::new("Walk", vec![track(0, 1.5), track(1, 4.0)]);
        assert_eq!(clip.duration(), 4.0);
        assert_eq!(clip.targets(), vec![0, 1]);
    }

    #[test]
    fn test_empty_clip() {
        let clip = AnimationClip::new("Idle", Vec::new());
        assert!(clip.is_empty());
        assert_eq!(clip.duration(), 0.0);
    }

    #[test]
    fn test_remap_targets_drops_unknown() {
        let clip = AnimationClip::new("Spin", vec![track(0, 1.0), track(5, 3.0)]);
        let map = HashMap::from([(0, 40)]);
        let remapped = clip.remap_targets(&map);

        assert_eq!(remapped.tracks().len(), 1);
        assert_eq!(remapped.tracks()[0].target, 40);
        assert_eq!(remapped.duration(), 3.0);
        assert_eq!(remapped.name, "Spin");
    }
}
