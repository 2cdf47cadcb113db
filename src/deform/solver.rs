//! Penalty-constrained smooth deformation.
//!
//! Minimizes `(x - t)' D (x - t) + (x - r)' S (x - r)` where `r` is the rest
//! shape, `t` the targets, `D` the diagonal constraint weights and `S` the
//! smoothness operator (`L` or `L * L`). Setting the gradient to zero and
//! writing `x = r + u` gives `(D + S) u = D (t - r)`, solved once per axis
//! against a single sparse Cholesky factor.

use nalgebra::DMatrix;
use nalgebra_glm as glm;
use nalgebra_sparse::factorization::CscCholesky;
use nalgebra_sparse::{CooMatrix, CscMatrix};
use serde::{Deserialize, Serialize};

use super::laplacian::{bilaplacian, graph_laplacian};
use crate::error::{Error, Result};

/// Smoothness operator used as the regularizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Smoothing {
    /// First order, the graph Laplacian `L`
    #[default]
    Laplacian,
    /// Second order, the bi-Laplacian `L * L`
    BiLaplacian,
}

/// Indices of the vertices whose position satisfies `predicate`.
pub fn select_vertices<F>(positions: &[glm::Vec3], predicate: F) -> Vec<usize>
where
    F: Fn(&glm::Vec3) -> bool,
{
    positions
        .iter()
        .enumerate()
        .filter(|(_, p)| predicate(p))
        .map(|(i, _)| i)
        .collect()
}

/// Copy of `rest` with `offset` added to the listed vertices.
pub fn translate_targets(rest: &[glm::Vec3], vertices: &[usize], offset: &glm::Vec3) -> Vec<glm::Vec3> {
    let mut targets = rest.to_vec();
    for &v in vertices {
        if let Some(t) = targets.get_mut(v) {
            *t += offset;
        }
    }
    targets
}

/// Diagonal of `D` with `weight` at every listed vertex.
fn constraint_weights(num_vertices: usize, vertices: &[usize], weight: f64) -> Result<Vec<f64>> {
    if vertices.is_empty() {
        return Err(Error::NoConstraints);
    }
    if !weight.is_finite() || weight <= 0.0 {
        return Err(Error::InvalidWeight(weight));
    }

    let mut weights = vec![0.0; num_vertices];
    for &v in vertices {
        *weights
            .get_mut(v)
            .ok_or_else(|| Error::out_of_range("constrained vertex", v, num_vertices))? = weight;
    }
    Ok(weights)
}

/// Factor `D + S`.
fn factor(operator: &CscMatrix<f64>, weights: &[f64]) -> Result<CscCholesky<f64>> {
    let n = operator.nrows();
    let mut coo = CooMatrix::new(n, n);
    for (i, j, &v) in operator.triplet_iter() {
        coo.push(i, j, v);
    }
    for (i, &w) in weights.iter().enumerate() {
        if w != 0.0 {
            coo.push(i, i, w);
        }
    }
    let system = CscMatrix::from(&coo);

    log::debug!("factoring {}x{} system, {} nonzeros", n, n, system.nnz());
    CscCholesky::factor(&system).map_err(|e| Error::Factorization(format!("{e:?}")))
}

fn back_substitute(
    cholesky: &CscCholesky<f64>,
    weights: &[f64],
    rest: &[glm::Vec3],
    targets: &[glm::Vec3],
) -> Result<Vec<glm::Vec3>> {
    if targets.len() != rest.len() {
        return Err(Error::length("targets", rest.len(), targets.len()));
    }

    // one right-hand side column per axis
    let mut rhs = DMatrix::<f64>::zeros(rest.len(), 3);
    for (i, ((r, t), &w)) in rest.iter().zip(targets).zip(weights).enumerate() {
        if w == 0.0 {
            continue;
        }
        for axis in 0..3 {
            rhs[(i, axis)] = w * (t[axis] as f64 - r[axis] as f64);
        }
    }

    let u = cholesky.solve(&rhs);
    if u.iter().any(|v| !v.is_finite()) {
        return Err(Error::Factorization("solution is not finite".to_string()));
    }

    Ok(rest
        .iter()
        .enumerate()
        .map(|(i, r)| {
            glm::vec3(
                (r.x as f64 + u[(i, 0)]) as f32,
                (r.y as f64 + u[(i, 1)]) as f32,
                (r.z as f64 + u[(i, 2)]) as f32,
            )
        })
        .collect())
}

/// One-shot solve with per-vertex constraint weights (0 = free).
pub fn solve_constrained(
    operator: &CscMatrix<f64>,
    weights: &[f64],
    rest: &[glm::Vec3],
    targets: &[glm::Vec3],
) -> Result<Vec<glm::Vec3>> {
    let n = operator.nrows();
    if operator.ncols() != n {
        return Err(Error::length("operator columns", n, operator.ncols()));
    }
    if weights.len() != n {
        return Err(Error::length("constraint weights", n, weights.len()));
    }
    if rest.len() != n {
        return Err(Error::length("rest positions", n, rest.len()));
    }
    if let Some(&bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(Error::InvalidWeight(bad));
    }
    if weights.iter().all(|&w| w == 0.0) {
        return Err(Error::NoConstraints);
    }

    let cholesky = factor(operator, weights)?;
    back_substitute(&cholesky, weights, rest, targets)
}

struct Factorization {
    vertices: Vec<usize>,
    weight: f64,
    smoothing: Smoothing,
    weights: Vec<f64>,
    cholesky: CscCholesky<f64>,
}

/// Deformation solver for a fixed mesh topology.
///
/// `L` and `L * L` are built once. The factorization of `D + S` is cached
/// per constraint set, so moving targets only costs a back-substitution.
pub struct DeformationSolver {
    rest: Vec<glm::Vec3>,
    laplacian: CscMatrix<f64>,
    bilaplacian: CscMatrix<f64>,
    factorization: Option<Factorization>,
}

impl DeformationSolver {
    pub fn new(triangles: &[[u32; 3]], rest: Vec<glm::Vec3>) -> Result<Self> {
        let laplacian = graph_laplacian(triangles, rest.len())?;
        let bilaplacian = bilaplacian(&laplacian);
        log::info!(
            "deformation solver: {} vertices, {} triangles, L nnz {}, L2 nnz {}",
            rest.len(),
            triangles.len(),
            laplacian.nnz(),
            bilaplacian.nnz()
        );

        Ok(Self {
            rest,
            laplacian,
            bilaplacian,
            factorization: None,
        })
    }

    pub fn rest_positions(&self) -> &[glm::Vec3] {
        &self.rest
    }

    pub fn laplacian(&self) -> &CscMatrix<f64> {
        &self.laplacian
    }

    pub fn bilaplacian(&self) -> &CscMatrix<f64> {
        &self.bilaplacian
    }

    pub fn operator(&self, smoothing: Smoothing) -> &CscMatrix<f64> {
        match smoothing {
            Smoothing::Laplacian => &self.laplacian,
            Smoothing::BiLaplacian => &self.bilaplacian,
        }
    }

    /// Vertices of the current constraint set, sorted.
    pub fn constrained_vertices(&self) -> &[usize] {
        self.factorization
            .as_ref()
            .map(|f| f.vertices.as_slice())
            .unwrap_or(&[])
    }

    pub fn smoothing(&self) -> Option<Smoothing> {
        self.factorization.as_ref().map(|f| f.smoothing)
    }

    /// Fix the constraint set and factor `D + S`. Re-setting the current
    /// set is free.
    pub fn set_constraints(
        &mut self,
        vertices: &[usize],
        weight: f64,
        smoothing: Smoothing,
    ) -> Result<()> {
        let mut vertices = vertices.to_vec();
        vertices.sort_unstable();
        vertices.dedup();

        if let Some(f) = &self.factorization {
            if f.vertices == vertices && f.weight == weight && f.smoothing == smoothing {
                log::trace!("constraint set unchanged, reusing factorization");
                return Ok(());
            }
        }

        let weights = constraint_weights(self.rest.len(), &vertices, weight)?;
        let cholesky = factor(self.operator(smoothing), &weights)?;
        self.factorization = Some(Factorization {
            vertices,
            weight,
            smoothing,
            weights,
            cholesky,
        });
        Ok(())
    }

    /// Solve for new positions. `targets` holds one position per vertex;
    /// only entries of constrained vertices matter.
    pub fn solve(&self, targets: &[glm::Vec3]) -> Result<Vec<glm::Vec3>> {
        let f = self.factorization.as_ref().ok_or(Error::NoConstraints)?;
        back_substitute(&f.cholesky, &f.weights, &self.rest, targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Unit square in the xy plane, split along the 0-2 diagonal.
    fn quad() -> (Vec<[u32; 3]>, Vec<glm::Vec3>) {
        (
            vec![[0, 1, 2], [0, 2, 3]],
            vec![
                glm::vec3(0.0, 0.0, 0.0),
                glm::vec3(1.0, 0.0, 0.0),
                glm::vec3(1.0, 1.0, 0.0),
                glm::vec3(0.0, 1.0, 0.0),
            ],
        )
    }

    #[test]
    fn harmonic_interpolation_between_constraints() {
        let (tris, rest) = quad();
        let mut solver = DeformationSolver::new(&tris, rest.clone()).unwrap();
        solver.set_constraints(&[0, 1], 1e7, Smoothing::Laplacian).unwrap();

        let lift = glm::vec3(0.0, 0.0, 1.0);
        let targets = translate_targets(&rest, &[0], &lift);
        let x = solver.solve(&targets).unwrap();

        // free rows of L u = 0 with u0 = 1, u1 = 0 give u2 = 5/7, u3 = 6/7
        assert_relative_eq!(x[0].z, 1.0, epsilon = 1e-4);
        assert_relative_eq!(x[1].z, 0.0, epsilon = 1e-4);
        assert_relative_eq!(x[2].z, 5.0 / 7.0, epsilon = 1e-4);
        assert_relative_eq!(x[3].z, 6.0 / 7.0, epsilon = 1e-4);
        for (a, b) in x.iter().zip(&rest) {
            assert_relative_eq!(a.x, b.x, epsilon = 1e-6);
            assert_relative_eq!(a.y, b.y, epsilon = 1e-6);
        }
    }

    #[test]
    fn single_constraint_translates_rigidly() {
        let (tris, rest) = quad();
        let mut solver = DeformationSolver::new(&tris, rest.clone()).unwrap();
        solver.set_constraints(&[2], 10.0, Smoothing::BiLaplacian).unwrap();

        let offset = glm::vec3(0.5, -0.25, 2.0);
        let x = solver.solve(&translate_targets(&rest, &[2], &offset)).unwrap();
        for (a, b) in x.iter().zip(&rest) {
            assert_relative_eq!(*a, b + offset, epsilon = 1e-5);
        }
    }

    #[test]
    fn penalty_converges_as_weight_grows() {
        let (tris, rest) = quad();
        let l = graph_laplacian(&tris, 4).unwrap();
        let targets = translate_targets(&rest, &[0], &glm::vec3(0.0, 0.0, 1.0));

        let mut last = f32::INFINITY;
        for c in [1.0, 10.0, 100.0, 1e4, 1e6] {
            // vertex 1 anchored at unit weight competes with vertex 0
            let weights = [c, 1.0, 0.0, 0.0];
            let x = solve_constrained(&l, &weights, &rest, &targets).unwrap();
            let error = (x[0] - targets[0]).norm();
            assert!(error < last, "error {error} did not shrink below {last}");
            last = error;
        }
        assert!(last < 1e-4);
    }

    #[test]
    fn factorization_is_reused() {
        let (tris, rest) = quad();
        let mut solver = DeformationSolver::new(&tris, rest.clone()).unwrap();
        solver.set_constraints(&[3, 0, 3], 100.0, Smoothing::Laplacian).unwrap();
        assert_eq!(solver.constrained_vertices(), &[0, 3]);

        let first = solver.solve(&rest).unwrap();
        solver.set_constraints(&[0, 3], 100.0, Smoothing::Laplacian).unwrap();
        let second = solver.solve(&rest).unwrap();
        assert_eq!(first, second);
        for (a, b) in first.iter().zip(&rest) {
            assert_relative_eq!(*a, *b, epsilon = 1e-6);
        }

        solver.set_constraints(&[0, 3], 100.0, Smoothing::BiLaplacian).unwrap();
        assert_eq!(solver.smoothing(), Some(Smoothing::BiLaplacian));
    }

    #[test]
    fn rejects_degenerate_constraint_sets() {
        let (tris, rest) = quad();
        let mut solver = DeformationSolver::new(&tris, rest.clone()).unwrap();

        assert!(matches!(solver.solve(&rest), Err(Error::NoConstraints)));
        assert!(matches!(
            solver.set_constraints(&[], 1.0, Smoothing::Laplacian),
            Err(Error::NoConstraints)
        ));
        assert!(matches!(
            solver.set_constraints(&[0], 0.0, Smoothing::Laplacian),
            Err(Error::InvalidWeight(_))
        ));
        assert!(matches!(
            solver.set_constraints(&[9], 1.0, Smoothing::Laplacian),
            Err(Error::IndexOutOfRange { index: 9, .. })
        ));

        let l = solver.laplacian().clone();
        assert!(matches!(
            solve_constrained(&l, &[0.0; 4], &rest, &rest),
            Err(Error::NoConstraints)
        ));
        assert!(matches!(
            solve_constrained(&l, &[1.0, -1.0, 0.0, 0.0], &rest, &rest),
            Err(Error::InvalidWeight(_))
        ));

        solver.set_constraints(&[0], 1.0, Smoothing::Laplacian).unwrap();
        assert!(matches!(
            solver.solve(&rest[..2]),
            Err(Error::LengthMismatch { .. })
        ));
    }

    #[test]
    fn selects_by_predicate() {
        let (_, rest) = quad();
        assert_eq!(select_vertices(&rest, |p| p.y > 0.5), vec![2, 3]);
        assert!(select_vertices(&rest, |p| p.z > 0.0).is_empty());
    }
}
