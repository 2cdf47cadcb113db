pub mod gltf;
pub mod obj;

pub use gltf::{load_gltf, parse_glb, parse_gltf};
pub use obj::{load_obj, parse_obj};
