// Skeletal animation: keyframe channels, bone hierarchy, pose evaluation

pub mod channel;
pub mod interpolation;
pub mod skeleton;
pub mod system;
pub mod transform;
pub mod types;

pub use channel::Channel;
pub use interpolation::RotationInterpolation;
pub use skeleton::{Bone, Skeleton};
pub use system::{AnimationSystem, Pose};
pub use types::*;
