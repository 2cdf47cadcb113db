//! Uniform-weight graph Laplacian of a triangle mesh.
//!
//! For every triangle, each of the nine ordered corner pairs `(a, b)`
//! contributes `+1` when `a` and `b` are the same corner and `-0.5`
//! otherwise. Contributions accumulate, so an interior edge shared by two
//! triangles ends up at `-1`. Rows sum to zero and the matrix is symmetric,
//! even for triangles that repeat a vertex.

use nalgebra_sparse::{CooMatrix, CscMatrix};

use crate::error::{Error, Result};

/// Build the graph Laplacian `L` over `num_vertices` vertices.
pub fn graph_laplacian(triangles: &[[u32; 3]], num_vertices: usize) -> Result<CscMatrix<f64>> {
    let mut coo = CooMatrix::new(num_vertices, num_vertices);

    for tri in triangles {
        for &v in tri {
            if v as usize >= num_vertices {
                return Err(Error::out_of_range("triangle vertex", v as usize, num_vertices));
            }
        }
        for a in 0..3 {
            for b in 0..3 {
                let coeff = if a == b { 1.0 } else { -0.5 };
                coo.push(tri[a] as usize, tri[b] as usize, coeff);
            }
        }
    }

    // duplicate entries are summed by the conversion
    Ok(CscMatrix::from(&coo))
}

/// Bi-Laplacian `L * L`.
pub fn bilaplacian(laplacian: &CscMatrix<f64>) -> CscMatrix<f64> {
    laplacian * laplacian
}
