// Vertex skinning against a posed skeleton

use nalgebra_glm as glm;
use rayon::prelude::*;

use crate::animation::transform::{apply_to_point, compose};
use crate::error::{Error, Result};

pub const MAX_INFLUENCES: usize = 4;

/// Up to four `(bone, weight)` pairs. Unused slots carry weight 0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VertexInfluences {
    pub bones: [u32; MAX_INFLUENCES],
    pub weights: [f32; MAX_INFLUENCES],
}

impl VertexInfluences {
    pub fn new(bones: [u32; MAX_INFLUENCES], weights: [f32; MAX_INFLUENCES]) -> Self {
        Self { bones, weights }
    }

    /// Full weight on a single bone.
    pub fn single(bone: u32) -> Self {
        Self {
            bones: [bone, 0, 0, 0],
            weights: [1.0, 0.0, 0.0, 0.0],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.bones
            .iter()
            .zip(&self.weights)
            .filter(|(_, w)| **w != 0.0)
            .map(|(&b, &w)| (b as usize, w))
    }

    pub fn weight_sum(&self) -> f32 {
        self.weights.iter().sum()
    }

    fn max_bone(&self) -> Option<usize> {
        self.iter().map(|(b, _)| b).max()
    }
}

/// Triangle mesh in bind pose with per-vertex bone influences.
#[derive(Debug, Clone)]
pub struct SkinnedMesh {
    triangles: Vec<[u32; 3]>,
    bind_positions: Vec<glm::Vec3>,
    influences: Vec<VertexInfluences>,
}

impl SkinnedMesh {
    pub fn new(
        triangles: Vec<[u32; 3]>,
        bind_positions: Vec<glm::Vec3>,
        influences: Vec<VertexInfluences>,
    ) -> Result<Self> {
        if influences.len() != bind_positions.len() {
            return Err(Error::length(
                "vertex influences",
                bind_positions.len(),
                influences.len(),
            ));
        }
        let n = bind_positions.len();
        if let Some(&bad) = triangles.iter().flatten().find(|&&v| v as usize >= n) {
            return Err(Error::out_of_range("triangle vertex", bad as usize, n));
        }

        let mesh = Self {
            triangles,
            bind_positions,
            influences,
        };

        // weights are left as given, debug builds report them once here
        #[cfg(debug_assertions)]
        {
            let bad = mesh.weight_violations(1e-3);
            if !bad.is_empty() {
                log::warn!(
                    "{} of {} vertices have skinning weights that do not sum to 1 (first: {})",
                    bad.len(),
                    mesh.vertex_count(),
                    bad[0]
                );
            }
        }

        Ok(mesh)
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn bind_positions(&self) -> &[glm::Vec3] {
        &self.bind_positions
    }

    pub fn influences(&self) -> &[VertexInfluences] {
        &self.influences
    }

    pub fn vertex_count(&self) -> usize {
        self.bind_positions.len()
    }

    /// Largest bone index any vertex refers to with nonzero weight.
    pub fn max_bone(&self) -> Option<usize> {
        self.influences.iter().filter_map(VertexInfluences::max_bone).max()
    }

    /// Vertices whose weights are negative or do not sum to 1 within `tolerance`.
    pub fn weight_violations(&self, tolerance: f32) -> Vec<usize> {
        self.influences
            .iter()
            .enumerate()
            .filter(|(_, inf)| {
                (inf.weight_sum() - 1.0).abs() > tolerance || inf.weights.iter().any(|&w| w < 0.0)
            })
            .map(|(i, _)| i)
            .collect()
    }
}

/// Deform every vertex of `mesh`:
/// `sum_i w_i * (global[b_i] * inverse_bind[b_i] * p)`.
///
/// Weights are expected to sum to 1 per vertex; this is not corrected.
pub fn deform(
    mesh: &SkinnedMesh,
    global: &[glm::Mat4],
    inverse_bind: &[glm::Mat4],
) -> Result<Vec<glm::Vec3>> {
    if global.len() != inverse_bind.len() {
        return Err(Error::length(
            "inverse bind matrices",
            global.len(),
            inverse_bind.len(),
        ));
    }
    if let Some(bone) = mesh.max_bone().filter(|&b| b >= global.len()) {
        return Err(Error::out_of_range("influence bone", bone, global.len()));
    }

    let skin: Vec<glm::Mat4> = global
        .iter()
        .zip(inverse_bind)
        .map(|(g, ib)| compose(g, ib))
        .collect();

    Ok(deform_with(mesh, &skin))
}

/// Same as [`deform`] with `global * inverse_bind` already folded per bone.
/// Bone indices must have been checked against `skin`.
pub fn deform_with(mesh: &SkinnedMesh, skin: &[glm::Mat4]) -> Vec<glm::Vec3> {
    mesh.bind_positions
        .par_iter()
        .zip(mesh.influences.par_iter())
        .map(|(p, influences)| {
            influences
                .iter()
                .fold(glm::Vec3::zeros(), |acc, (bone, w)| {
                    acc + apply_to_point(&skin[bone], p) * w
                })
        })
        .collect()
}
