// Differential mesh deformation

pub mod laplacian;
pub mod solver;

pub use laplacian::{bilaplacian, graph_laplacian};
pub use solver::{
    select_vertices, solve_constrained, translate_targets, DeformationSolver, Smoothing,
};
