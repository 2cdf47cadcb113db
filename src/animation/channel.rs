// Keyframe channel sampling

use super::interpolation::{interpolate_rotation, lerp_vec3, RotationInterpolation};
use super::types::*;
use crate::error::{Error, Result};

/// One animated property of one bone, sampled at non-decreasing times.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    bone: usize,
    times: Vec<f32>,
    values: ChannelValues,
}

impl Channel {
    /// Validate and build a channel. Needs at least one keyframe, matching
    /// time/value counts, non-decreasing finite times and finite values.
    pub fn new(bone: usize, times: Vec<f32>, values: ChannelValues) -> Result<Self> {
        if times.is_empty() {
            return Err(Error::EmptyChannel { bone });
        }
        if times.len() != values.len() {
            return Err(Error::length("channel values", times.len(), values.len()));
        }
        for (index, &t) in times.iter().enumerate() {
            if !t.is_finite() || !values.is_finite(index) {
                return Err(Error::NonFiniteKeyframe { bone, index });
            }
            if index > 0 && t < times[index - 1] {
                return Err(Error::UnsortedKeyframes { bone, index });
            }
        }

        Ok(Self {
            bone,
            times,
            values,
        })
    }

    pub fn bone(&self) -> usize {
        self.bone
    }

    pub fn kind(&self) -> ChannelKind {
        self.values.kind()
    }

    pub fn times(&self) -> &[f32] {
        &self.times
    }

    pub fn values(&self) -> &ChannelValues {
        &self.values
    }

    /// Time of the last keyframe.
    pub fn duration(&self) -> f32 {
        self.times[self.times.len() - 1]
    }

    /// Keyframe pair bracketing `time` and the blend ratio between them.
    /// Times past the last keyframe hold the last value.
    fn bracket(&self, time: f32) -> (usize, usize, f32) {
        let n = self.times.len();
        // first keyframe strictly after `time`
        let i = self.times.partition_point(|&t| t <= time);
        if i == n {
            return (n - 1, n - 1, 0.0);
        }

        let i1 = i;
        let i0 = i1.saturating_sub(1);
        if i0 == i1 {
            return (i0, i1, 0.0);
        }

        let span = self.times[i1] - self.times[i0];
        let ratio = if span > 0.0 {
            (time - self.times[i0]) / span
        } else {
            0.0
        };
        (i0, i1, ratio)
    }

    /// Interpolated value at `time`, clamped to the first and last keyframes.
    pub fn evaluate(&self, time: f32, rotation: RotationInterpolation) -> ChannelSample {
        let (i0, i1, ratio) = self.bracket(time);
        match &self.values {
            ChannelValues::Translation(v) => {
                ChannelSample::Translation(lerp_vec3(&v[i0], &v[i1], ratio))
            }
            ChannelValues::Scale(v) => ChannelSample::Scale(lerp_vec3(&v[i0], &v[i1], ratio)),
            ChannelValues::Rotation(v) => {
                if i0 == i1 {
                    ChannelSample::Rotation(v[i0])
                } else {
                    ChannelSample::Rotation(interpolate_rotation(&v[i0], &v[i1], ratio, rotation))
                }
            }
        }
    }
}
