// Linear blend skinning

mod skinning;

pub use skinning::*;
