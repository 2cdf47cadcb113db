//! Skeletal animation, linear blend skinning and Laplacian mesh deformation.

pub mod animation;
pub mod deform;
pub mod error;
pub mod model;
pub mod parser;
pub mod settings;
pub mod skinning;

pub use animation::{AnimationSystem, Bone, Channel, ChannelValues, Pose, Skeleton};
pub use deform::{DeformationSolver, Smoothing};
pub use error::{Error, Result};
pub use model::{Frame, Rig, RigData, TriMesh};
pub use skinning::{SkinnedMesh, VertexInfluences};

pub const CONFY_APP_NAME: &str = "skindeform";
