//! Keyframe tracks that animate one TRS property of one node.

use cgmath::{Quaternion, Vector3};

use crate::node::NodeId;

/// How values between keyframes are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Hold the previous keyframe value.
    Step,
    #[default]
    Linear,
    /// Hermite spline. Each keyframe stores in-tangent, value, out-tangent.
    CubicSpline,
}

/// The node property a track drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackProperty {
    Translation,
    Rotation,
    Scale,
}

/// Keyframe values. Rotations are `[x, y, z, w]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Keyframes {
    Translation(Vec<[f32; 3]>),
    Rotation(Vec<[f32; 4]>),
    Scale(Vec<[f32; 3]>),
}

/// A sampled track value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackValue {
    Translation(Vector3<f32>),
    Rotation(Quaternion<f32>),
    Scale(Vector3<f32>),
}

#[derive(Debug, Clone)]
pub struct Track {
    pub target: NodeId,
    pub interpolation: Interpolation,
    times: Vec<f32>,
    keyframes: Keyframes,
}

impl Track {
    pub fn new(target: NodeId, interpolation: Interpolation, times: Vec<f32>, keyframes: Keyframes) -> Self {
        Self {
            target,
            interpolation,
            times,
            keyframes,
        }
    }

    pub fn property(&self) -> TrackProperty {
        match self.keyframes {
            Keyframes::Translation(_) => TrackProperty::Translation,
            Keyframes::Rotation(_) => TrackProperty::Rotation,
            Keyframes::Scale(_) => TrackProperty::Scale,
        }
    }

    pub fn times(&self) -> &[f32] {
        &self.times
    }

    /// Time of the last keyframe.
    pub fn duration(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Value at `time`, clamped to the first and last keyframes.
    /// None when the track has no usable keyframes.
    pub fn sample(&self, time: f32) -> Option<TrackValue> {
        match &self.keyframes {
            Keyframes::Translation(values) => {
                sample_keys(&self.times, values, self.interpolation, time, lerp_array)
                    .map(|v| TrackValue::Translation(Vector3::from(v)))
            }
            Keyframes::Scale(values) => {
                sample_keys(&self.times, values, self.interpolation, time, lerp_array)
                    .map(|v| TrackValue::Scale(Vector3::from(v)))
            }
            Keyframes::Rotation(values) => {
                sample_keys(&self.times, values, self.interpolation, time, slerp)
                    .map(|v| TrackValue::Rotation(normalize_quat(v)))
            }
        }
    }
}

/// Index of the value for keyframe `k`, accounting for spline tangents.
fn value_index(interpolation: Interpolation, k: usize) -> usize {
    match interpolation {
        Interpolation::CubicSpline => 3 * k + 1,
        _ => k,
    }
}

fn sample_keys<const N: usize>(
    times: &[f32],
    values: &[[f32; N]],
    interpolation: Interpolation,
    time: f32,
    blend: fn(&[f32; N], &[f32; N], f32) -> [f32; N],
) -> Option<[f32; N]> {
    let first = *times.first()?;
    let last = times.len() - 1;

    if times.len() == 1 || time <= first {
        return values.get(value_index(interpolation, 0)).copied();
    }
    if time >= times[last] {
        return values.get(value_index(interpolation, last)).copied();
    }

    // First keyframe strictly after `time`; never 0 or past the end here
    let next = times.partition_point(|&t| t <= time);
    let prev = next - 1;
    let dt = times[next] - times[prev];
    let t = if dt > 0.0 { (time - times[prev]) / dt } else { 0.0 };

    match interpolation {
        Interpolation::Step => values.get(prev).copied(),
        Interpolation::Linear => Some(blend(values.get(prev)?, values.get(next)?, t)),
        Interpolation::CubicSpline => {
            let p0 = values.get(3 * prev + 1)?;
            let m0 = values.get(3 * prev + 2)?;
            let m1 = values.get(3 * next)?;
            let p1 = values.get(3 * next + 1)?;
            let mut out = [0.0; N];
            for i in 0..N {
                out[i] = cubic_hermite(p0[i], m0[i] * dt, p1[i], m1[i] * dt, t);
            }
            Some(out)
        }
    }
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn lerp_array<const N: usize>(a: &[f32; N], b: &[f32; N], t: f32) -> [f32; N] {
    let mut out = [0.0; N];
    for i in 0..N {
        out[i] = lerp(a[i], b[i], t);
    }
    out
}

/// Spherical interpolation along the shorter arc, `[x, y, z, w]` layout.
pub fn slerp(a: &[f32; 4], b: &[f32; 4], t: f32) -> [f32; 4] {
    let mut b = *b;
    let mut dot = a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3];
    if dot < 0.0 {
        b = [-b[0], -b[1], -b[2], -b[3]];
        dot = -dot;
    }

    if dot > 0.9995 {
        return lerp_array(a, &b, t);
    }

    let theta_0 = dot.acos();
    let theta = theta_0 * t;
    let sin_theta_0 = theta_0.sin();
    let s0 = (theta_0 - theta).sin() / sin_theta_0;
    let s1 = theta.sin() / sin_theta_0;

    [
        a[0] * s0 + b[0] * s1,
        a[1] * s0 + b[1] * s1,
        a[2] * s0 + b[2] * s1,
        a[3] * s0 + b[3] * s1,
    ]
}

pub fn cubic_hermite(p0: f32, m0: f32, p1: f32, m1: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;

    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;

    h00 * p0 + h10 * m0 + h01 * p1 + h11 * m1
}

/// `[x, y, z, w]` to a unit cgmath quaternion. Zero input yields identity.
fn normalize_quat(q: [f32; 4]) -> Quaternion<f32> {
    let len = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
    if len <= f32::EPSILON {
        return Quaternion::new(1.0, 0.0, 0.0, 0.0);
    }
    Quaternion::new(q[3] / len, q[0] / len, q[1] / len, q[2] / len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translation_track(interpolation: Interpolation) -> Track {
        Track::new(
            0,
            interpolation,
            vec![0.0, 1.0, 2.0],
            Keyframes::Translation(vec![[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [10.0, 10.0, 0.0]]),
        )
    }

    fn translation(value: Option<TrackValue>) -> Vector3<f32> {
        match value {
            Some(TrackValue::Translation(v)) => v,
            other => panic!("expected translation, got {:?}", other),
        }
    }

    #[test]
    fn test_linear_sampling() {
        let track = translation_track(Interpolation::Linear);
        assert_eq!(track.duration(), 2.0);
        assert_eq!(track.property(), TrackProperty::Translation);
        assert_eq!(translation(track.sample(0.5)), Vector3::new(5.0, 0.0, 0.0));
        assert_eq!(translation(track.sample(1.5)), Vector3::new(10.0, 5.0, 0.0));
    }

    #[test]
    fn test_sampling_clamps_outside_range() {
        let track = translation_track(Interpolation::Linear);
        assert_eq!(translation(track.sample(-1.0)), Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(translation(track.sample(99.0)), Vector3::new(10.0, 10.0, 0.0));
    }

    #[test]
    fn test_step_sampling_holds_previous() {
        let track = translation_track(Interpolation::Step);
        assert_eq!(translation(track.sample(0.99)), Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(translation(track.sample(1.0)), Vector3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn test_cubic_spline_hits_keyframes_and_uses_tangents() {
        // in-tangent, value, out-tangent per keyframe; zero tangents give smoothstep
        let track = Track::new(
            0,
            Interpolation::CubicSpline,
            vec![0.0, 2.0],
            Keyframes::Scale(vec![
                [0.0; 3], [1.0, 1.0, 1.0], [0.0; 3],
                [0.0; 3], [3.0, 3.0, 3.0], [0.0; 3],
            ]),
        );
        let Some(TrackValue::Scale(start)) = track.sample(0.0) else { panic!() };
        assert_eq!(start, Vector3::new(1.0, 1.0, 1.0));
        let Some(TrackValue::Scale(mid)) = track.sample(1.0) else { panic!() };
        assert!((mid.x - 2.0).abs() < 1e-6);
        let Some(TrackValue::Scale(quarter)) = track.sample(0.5) else { panic!() };
        // smoothstep(0.25) = 0.15625
        assert!((quarter.x - (1.0 + 2.0 * 0.15625)).abs() < 1e-5);
    }

    #[test]
    fn test_rotation_slerp_halfway() {
        let half = std::f32::consts::FRAC_1_SQRT_2;
        let track = Track::new(
            3,
            Interpolation::Linear,
            vec![0.0, 1.0],
            // identity to 90 degrees about Y
            Keyframes::Rotation(vec![[0.0, 0.0, 0.0, 1.0], [0.0, half, 0.0, half]]),
        );
        let Some(TrackValue::Rotation(q)) = track.sample(0.5) else { panic!() };
        let expected = (std::f32::consts::FRAC_PI_8).sin();
        assert!((q.v.y - expected).abs() < 1e-5);
        assert!((q.s - std::f32::consts::FRAC_PI_8.cos()).abs() < 1e-5);
    }

    #[test]
    fn test_empty_track_samples_nothing() {
        let track = Track::new(0, Interpolation::Linear, vec![], Keyframes::Translation(vec![]));
        assert_eq!(track.duration(), 0.0);
        assert!(track.sample(0.0).is_none());
    }

    #[test]
    fn test_zero_quaternion_becomes_identity() {
        assert_eq!(normalize_quat([0.0; 4]), Quaternion::new(1.0, 0.0, 0.0, 0.0));
    }
}
