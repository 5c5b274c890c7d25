//! Playback state of one clip.

use std::sync::Arc;

use super::AnimationClip;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    /// Play once and hold the last frame.
    Once,
    #[default]
    Loop,
    /// Forward then backward, repeating.
    PingPong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone)]
pub struct AnimationAction {
    clip: Arc<AnimationClip>,
    time: f32,
    /// Playback speed multiplier
    pub time_scale: f32,
    /// Blend weight, 0.0 to 1.0
    pub weight: f32,
    pub loop_mode: LoopMode,
    state: ActionState,
    is_reversed: bool,
}

impl AnimationAction {
    pub fn new(clip: Arc<AnimationClip>) -> Self {
        Self {
            clip,
            time: 0.0,
            time_scale: 1.0,
            weight: 1.0,
            loop_mode: LoopMode::default(),
            state: ActionState::Stopped,
            is_reversed: false,
        }
    }

    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn set_time(&mut self, time: f32) {
        self.time = time.clamp(0.0, self.clip.duration());
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == ActionState::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.state == ActionState::Paused
    }

    /// Playing or paused: the clip still poses its nodes.
    pub fn is_active(&self) -> bool {
        self.state != ActionState::Stopped
    }

    pub fn play(&mut self) {
        self.state = ActionState::Playing;
    }

    /// Stops and rewinds.
    pub fn stop(&mut self) {
        self.state = ActionState::Stopped;
        self.time = 0.0;
        self.is_reversed = false;
    }

    pub fn pause(&mut self) {
        if self.state == ActionState::Playing {
            self.state = ActionState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == ActionState::Paused {
            self.state = ActionState::Playing;
        }
    }

    /// Pause when playing, resume when paused. Returns whether it is now playing.
    pub fn toggle_pause(&mut self) -> bool {
        match self.state {
            ActionState::Playing => self.pause(),
            ActionState::Paused => self.resume(),
            ActionState::Stopped => {}
        }
        self.is_playing()
    }

    /// Advances playback by `delta_time` seconds.
    /// Returns false once a `Once` action reaches its end.
    pub fn update(&mut self, delta_time: f32) -> bool {
        if self.state != ActionState::Playing {
            return self.is_active();
        }

        let duration = self.clip.duration();
        if duration <= 0.0 {
            return true;
        }

        let direction = if self.is_reversed { -1.0 } else { 1.0 };
        self.time += delta_time * self.time_scale * direction;

        match self.loop_mode {
            LoopMode::Once => {
                if self.time >= duration {
                    // Hold the final pose
                    self.time = duration;
                    self.state = ActionState::Paused;
                    return false;
                }
                self.time = self.time.max(0.0);
            }
            LoopMode::Loop => {
                self.time = self.time.rem_euclid(duration);
            }
            LoopMode::PingPong => {
                if !self.is_reversed && self.time >= duration {
                    self.time = duration - (self.time - duration).min(duration);
                    self.is_reversed = true;
                } else if self.is_reversed && self.time <= 0.0 {
                    self.time = (-self.time).min(duration);
                    self.is_reversed = false;
                }
            }
        }

        true
    }
}
