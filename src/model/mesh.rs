use std::collections::BTreeSet;

use nalgebra_glm as glm;

use crate::deform::select_vertices;
use crate::error::{Error, Result};

/// Static triangle mesh: index triples plus vertex positions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriMesh {
    pub triangles: Vec<[u32; 3]>,
    pub positions: Vec<glm::Vec3>,
}

impl TriMesh {
    pub fn new(triangles: Vec<[u32; 3]>, positions: Vec<glm::Vec3>) -> Result<Self> {
        let n = positions.len();
        if let Some(&bad) = triangles.iter().flatten().find(|&&v| v as usize >= n) {
            return Err(Error::out_of_range("triangle vertex", bad as usize, n));
        }
        Ok(Self {
            triangles,
            positions,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Unique undirected edges, each stored as `[low, high]`, sorted.
    pub fn edges(&self) -> Vec<[u32; 2]> {
        let mut edges = BTreeSet::new();
        for &[a, b, c] in &self.triangles {
            for (i, j) in [(a, b), (b, c), (c, a)] {
                edges.insert([i.min(j), i.max(j)]);
            }
        }
        edges.into_iter().collect()
    }

    /// Area-weighted vertex normals.
    ///
    /// A zero-area triangle or a vertex whose normal cancels out is an
    /// error rather than a NaN in the output.
    pub fn vertex_normals(&self) -> Result<Vec<glm::Vec3>> {
        let mut normals = vec![glm::Vec3::zeros(); self.positions.len()];
        for (t, &[a, b, c]) in self.triangles.iter().enumerate() {
            let p0 = self.positions[a as usize];
            let u = self.positions[b as usize] - p0;
            let v = self.positions[c as usize] - p0;
            let n = u.cross(&v);
            if n.norm() <= f32::EPSILON {
                return Err(Error::DegenerateTriangle(t));
            }
            for i in [a, b, c] {
                normals[i as usize] += n;
            }
        }

        let referenced: BTreeSet<u32> = self.triangles.iter().flatten().copied().collect();
        for &i in &referenced {
            let n = &mut normals[i as usize];
            let len = n.norm();
            if len <= f32::EPSILON {
                return Err(Error::DegenerateNormal(i as usize));
            }
            *n /= len;
        }
        Ok(normals)
    }

    /// Center the bounding box on the origin and scale its longest side to 1.
    pub fn normalize_to_unit_cube(&mut self) {
        let Some(first) = self.positions.first().copied() else {
            return;
        };
        let (min, max) = self.positions.iter().fold((first, first), |(lo, hi), p| {
            (glm::min2(&lo, p), glm::max2(&hi, p))
        });

        let center = (min + max) * 0.5;
        let extent = glm::comp_max(&(max - min));
        let scale = if extent > 0.0 { 1.0 / extent } else { 1.0 };
        for p in &mut self.positions {
            *p = (*p - center) * scale;
        }
    }

    pub fn select_vertices<F>(&self, predicate: F) -> Vec<usize>
    where
        F: Fn(&glm::Vec3) -> bool,
    {
        select_vertices(&self.positions, predicate)
    }
}

/// Positions as plain arrays, the layout vertex buffers expect.
pub fn vertex_buffer(positions: &[glm::Vec3]) -> Vec<[f32; 3]> {
    positions.iter().map(|p| [p.x, p.y, p.z]).collect()
}

pub fn as_bytes(buffer: &[[f32; 3]]) -> &[u8] {
    bytemuck::cast_slice(buffer)
}
