// Animation data types

use nalgebra_glm as glm;
use serde::{Deserialize, Serialize};

/// Which property of a bone a channel animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelKind {
    Translation,
    Rotation,
    Scale,
}

/// Keyframe values of a channel, one per time sample.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelValues {
    Translation(Vec<glm::Vec3>),
    /// Unit quaternions
    Rotation(Vec<glm::Quat>),
    Scale(Vec<glm::Vec3>),
}

impl ChannelValues {
    pub fn kind(&self) -> ChannelKind {
        match self {
            ChannelValues::Translation(_) => ChannelKind::Translation,
            ChannelValues::Rotation(_) => ChannelKind::Rotation,
            ChannelValues::Scale(_) => ChannelKind::Scale,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ChannelValues::Translation(v) | ChannelValues::Scale(v) => v.len(),
            ChannelValues::Rotation(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn is_finite(&self, index: usize) -> bool {
        match self {
            ChannelValues::Translation(v) | ChannelValues::Scale(v) => {
                v[index].iter().all(|c| c.is_finite())
            }
            ChannelValues::Rotation(v) => v[index].coords.iter().all(|c| c.is_finite()),
        }
    }
}

/// Single value produced by evaluating a channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelSample {
    Translation(glm::Vec3),
    Rotation(glm::Quat),
    Scale(glm::Vec3),
}

/// Translation, rotation and scale of a bone relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trs {
    pub translation: glm::Vec3,
    pub rotation: glm::Quat,
    pub scale: glm::Vec3,
}

impl Default for Trs {
    fn default() -> Self {
        Self {
            translation: glm::vec3(0.0, 0.0, 0.0),
            rotation: glm::quat_identity(),
            scale: glm::vec3(1.0, 1.0, 1.0),
        }
    }
}

impl Trs {
    pub fn from_translation(translation: glm::Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Overwrite the property the sample animates.
    pub fn apply(&mut self, sample: ChannelSample) {
        match sample {
            ChannelSample::Translation(t) => self.translation = t,
            ChannelSample::Rotation(r) => self.rotation = r,
            ChannelSample::Scale(s) => self.scale = s,
        }
    }

    pub fn to_matrix(&self) -> glm::Mat4 {
        super::transform::from_trs(&self.translation, &self.rotation, &self.scale)
    }
}
