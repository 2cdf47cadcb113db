// Per-frame pose evaluation

use nalgebra_glm as glm;

use super::channel::Channel;
use super::interpolation::RotationInterpolation;
use super::skeleton::Skeleton;
use super::transform::compose;
use crate::error::{Error, Result};

/// Local and model-space transforms of every bone at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub time: f32,
    pub local: Vec<glm::Mat4>,
    pub global: Vec<glm::Mat4>,
}

impl Pose {
    /// `global[b] * inverse_bind[b]` for every bone.
    pub fn skinning_matrices(&self, skeleton: &Skeleton) -> Vec<glm::Mat4> {
        self.global
            .iter()
            .zip(skeleton.bones())
            .map(|(g, bone)| compose(g, &bone.inverse_bind))
            .collect()
    }

    /// Model-space origin of every bone, for skeleton debug drawing.
    pub fn joint_positions(&self) -> Vec<glm::Vec3> {
        self.global
            .iter()
            .map(|m| glm::vec3(m[(0, 3)], m[(1, 3)], m[(2, 3)]))
            .collect()
    }
}

/// Skeleton plus the channels that drive it.
#[derive(Debug, Clone)]
pub struct AnimationSystem {
    skeleton: Skeleton,
    channels: Vec<Channel>,
    by_bone: Vec<Vec<usize>>,
    duration: f32,
    rotation: RotationInterpolation,
}

impl AnimationSystem {
    pub fn new(skeleton: Skeleton, channels: Vec<Channel>) -> Result<Self> {
        let mut by_bone = vec![Vec::new(); skeleton.len()];
        for (i, channel) in channels.iter().enumerate() {
            let slot = by_bone
                .get_mut(channel.bone())
                .ok_or_else(|| Error::out_of_range("channel bone", channel.bone(), skeleton.len()))?;
            slot.push(i);
        }

        let duration = channels
            .iter()
            .map(Channel::duration)
            .fold(0.0f32, f32::max);

        log::debug!(
            "animation system: {} bones, {} channels, {:.3}s",
            skeleton.len(),
            channels.len(),
            duration
        );

        Ok(Self {
            skeleton,
            channels,
            by_bone,
            duration,
            rotation: RotationInterpolation::default(),
        })
    }

    pub fn with_rotation_interpolation(mut self, rotation: RotationInterpolation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Largest last-keyframe time over all channels.
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Wrap `time` into `[0, duration)`. A zero-length animation maps to 0.
    pub fn loop_time(&self, time: f32) -> f32 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        // rem_euclid rounds up to `duration` for tiny negative inputs
        let t = time.rem_euclid(self.duration);
        if t < self.duration { t } else { 0.0 }
    }

    /// Local transform of `bone` at `time`: rest TRS with animated
    /// properties replaced by their channel values.
    pub fn local_transform(&self, bone: usize, time: f32) -> Result<glm::Mat4> {
        if bone >= self.skeleton.len() {
            return Err(Error::out_of_range("bone", bone, self.skeleton.len()));
        }
        Ok(self.evaluate_bone(bone, time))
    }

    pub fn local_transforms(&self, time: f32) -> Vec<glm::Mat4> {
        (0..self.skeleton.len())
            .map(|bone| self.evaluate_bone(bone, time))
            .collect()
    }

    fn evaluate_bone(&self, bone: usize, time: f32) -> glm::Mat4 {
        let mut trs = self.skeleton.bones()[bone].rest;
        for &c in &self.by_bone[bone] {
            trs.apply(self.channels[c].evaluate(time, self.rotation));
        }
        trs.to_matrix()
    }

    pub fn global_transforms(&self, time: f32) -> Vec<glm::Mat4> {
        self.pose(time).global
    }

    /// Full hierarchy pass at `time` (no looping applied).
    pub fn pose(&self, time: f32) -> Pose {
        let local = self.local_transforms(time);
        let global = self.skeleton.walk(&local);
        Pose {
            time,
            local,
            global,
        }
    }
}
