mod mesh;
mod rig;

pub use mesh::*;
pub use rig::*;
