//! Core Davidson solver implementation

extern crate nalgebra as na;

use std::cmp::Ordering;

use na::{DMatrix, DVector};
use tracing::{debug, info};

use crate::error::{Result, TensorError};
use crate::matrix_impl::{DenseMatrix, PackedMatrix};

/// Correction vectors whose norm drops below this after re-orthogonalization
/// are discarded as linearly dependent.
const LINEAR_DEPENDENCE_CUTOFF: f64 = 1e-10;

/// Guard for near-singular preconditioner denominators.
const DENOMINATOR_FLOOR: f64 = 1e-8;

/// A symmetric operator available through its action on a vector.
///
/// Implemented for the owning matrix types of this crate and for plain
/// nalgebra matrices, so explicitly stored operators and implicit
/// tensor-contraction operators share one solver entry point.
pub trait LinearOperator {
    /// Dimension of the vector space the operator acts on.
    fn dim(&self) -> usize;

    /// The matrix-vector product `A v`.
    fn apply(&self, v: &DVector<f64>) -> DVector<f64>;

    /// Operator diagonal, if cheaply available; enables the default
    /// diagonal preconditioner.
    fn diagonal(&self) -> Option<DVector<f64>> {
        None
    }
}

impl LinearOperator for DenseMatrix {
    fn dim(&self) -> usize {
        self.nrows()
    }

    fn apply(&self, v: &DVector<f64>) -> DVector<f64> {
        let y = self.matvec(v.as_slice()).expect("operator dimension mismatch");
        DVector::from_vec(y)
    }

    fn diagonal(&self) -> Option<DVector<f64>> {
        let n = self.nrows().min(self.ncols());
        Some(DVector::from_iterator(n, (0..n).map(|i| self[[i, i]])))
    }
}

impl LinearOperator for PackedMatrix {
    fn dim(&self) -> usize {
        self.n
    }

    fn apply(&self, v: &DVector<f64>) -> DVector<f64> {
        let y = self.matvec(v.as_slice()).expect("operator dimension mismatch");
        DVector::from_vec(y)
    }

    fn diagonal(&self) -> Option<DVector<f64>> {
        Some(DVector::from_vec(self.diagonal()))
    }
}

impl LinearOperator for DMatrix<f64> {
    fn dim(&self) -> usize {
        self.nrows()
    }

    fn apply(&self, v: &DVector<f64>) -> DVector<f64> {
        self * v
    }

    fn diagonal(&self) -> Option<DVector<f64>> {
        Some(self.diagonal())
    }
}

/// Maps a residual and its Ritz value to a new search direction.
pub trait Preconditioner {
    fn apply(&self, residual: &DVector<f64>, ritz_value: f64) -> DVector<f64>;
}

/// The standard Davidson preconditioner `c_i = r_i / (theta - d_i)`, built
/// from the operator diagonal. Denominators are floored in magnitude to
/// keep corrections finite near diagonal degeneracies.
pub struct DiagonalPreconditioner {
    diagonal: DVector<f64>,
}

impl DiagonalPreconditioner {
    pub fn new(diagonal: DVector<f64>) -> Self {
        DiagonalPreconditioner { diagonal }
    }
}

impl Preconditioner for DiagonalPreconditioner {
    fn apply(&self, residual: &DVector<f64>, ritz_value: f64) -> DVector<f64> {
        DVector::from_iterator(
            residual.len(),
            residual.iter().zip(self.diagonal.iter()).map(|(r, d)| {
                let mut den = ritz_value - d;
                if den.abs() < DENOMINATOR_FLOOR {
                    den = if den < 0.0 {
                        -DENOMINATOR_FLOOR
                    } else {
                        DENOMINATOR_FLOOR
                    };
                }
                r / den
            }),
        )
    }
}

/// Fallback when the operator exposes no diagonal: the residual itself is
/// the new search direction.
pub struct IdentityPreconditioner;

impl Preconditioner for IdentityPreconditioner {
    fn apply(&self, residual: &DVector<f64>, _ritz_value: f64) -> DVector<f64> {
        residual.clone()
    }
}

/// Solver request parameters.
#[derive(Debug, Clone)]
pub struct DavidsonConfig {
    /// Number of lowest eigenpairs requested.
    pub n_roots: usize,
    /// Convergence threshold on the residual 2-norm of every requested root.
    pub tolerance: f64,
    /// Iteration bound; exceeding it reports non-convergence, not an error.
    pub max_iterations: usize,
    /// Subspace bound; when the basis would outgrow it, the basis is
    /// collapsed onto the current Ritz vectors.
    pub max_subspace: usize,
    /// Optional starting vectors; defaults to unit vectors on the smallest
    /// diagonal entries.
    pub initial_guess: Option<Vec<DVector<f64>>>,
}

impl DavidsonConfig {
    pub fn new(n_roots: usize) -> Self {
        DavidsonConfig {
            n_roots,
            tolerance: 1e-8,
            max_iterations: 100,
            max_subspace: 8 * n_roots.max(1),
            initial_guess: None,
        }
    }
}

/// Converged or best-effort eigenpairs.
///
/// `converged == false` means the iteration bound was reached first; the
/// eigenpair estimates and residual norms are still the best available and
/// valid to inspect.
#[derive(Debug, Clone)]
pub struct DavidsonResult {
    /// Ritz values, ascending.
    pub eigenvalues: DVector<f64>,
    /// Ritz vectors in the original space, one column per root.
    pub eigenvectors: DMatrix<f64>,
    /// Residual 2-norms per root at the final iteration.
    pub residual_norms: Vec<f64>,
    /// Iterations performed.
    pub iterations: usize,
    /// Whether every requested root met the tolerance.
    pub converged: bool,
}

/// Solve for the lowest eigenpairs using the operator's own diagonal as
/// preconditioner, falling back to unpreconditioned residual expansion when
/// no diagonal is available.
pub fn davidson<O>(op: &O, config: &DavidsonConfig) -> Result<DavidsonResult>
where
    O: LinearOperator,
{
    match op.diagonal() {
        Some(diagonal) => {
            if diagonal.len() != op.dim() {
                return Err(TensorError::InvalidInput(format!(
                    "operator diagonal has length {}, expected {}",
                    diagonal.len(),
                    op.dim()
                )));
            }
            davidson_with_preconditioner(op, &DiagonalPreconditioner::new(diagonal), config)
        }
        None => davidson_with_preconditioner(op, &IdentityPreconditioner, config),
    }
}

/// Solve for the lowest eigenpairs with a caller-supplied preconditioner.
pub fn davidson_with_preconditioner<O, P>(
    op: &O,
    preconditioner: &P,
    config: &DavidsonConfig,
) -> Result<DavidsonResult>
where
    O: LinearOperator,
    P: Preconditioner,
{
    let dim = op.dim();
    let k = config.n_roots;
    validate_request(dim, config)?;
    let max_subspace = config.max_subspace.min(dim).max(k);

    let mut basis = initial_basis(op, config)?;
    let mut sigma: Vec<DVector<f64>> = Vec::with_capacity(basis.len());

    info!(
        dim,
        n_roots = k,
        tolerance = config.tolerance,
        max_subspace,
        "starting Davidson iteration"
    );

    let mut iteration = 0;
    loop {
        iteration += 1;

        // Operator action on basis vectors added since the last pass.
        for v in basis.iter().skip(sigma.len()) {
            let av = op.apply(v);
            if av.len() != dim {
                return Err(TensorError::InvalidInput(format!(
                    "operator returned a vector of length {}, expected {}",
                    av.len(),
                    dim
                )));
            }
            sigma.push(av);
        }

        let m = basis.len();
        let projected = projected_matrix(&basis, &sigma);
        let eig = projected.symmetric_eigen();

        // Ascending eigenvalue order; the stable sort keeps numerically
        // degenerate roots in their order of first appearance.
        let mut order: Vec<usize> = (0..m).collect();
        order.sort_by(|&a, &b| {
            eig.eigenvalues[a]
                .partial_cmp(&eig.eigenvalues[b])
                .unwrap_or(Ordering::Equal)
        });

        let n_ritz = k.min(m);
        let mut ritz_values = Vec::with_capacity(n_ritz);
        let mut ritz_vectors = Vec::with_capacity(n_ritz);
        let mut residuals = Vec::with_capacity(n_ritz);
        let mut residual_norms = Vec::with_capacity(n_ritz);
        for &root in order.iter().take(n_ritz) {
            let theta = eig.eigenvalues[root];
            let coeffs = eig.eigenvectors.column(root);
            let mut x = DVector::zeros(dim);
            let mut ax = DVector::zeros(dim);
            for (j, c) in coeffs.iter().enumerate() {
                x.axpy(*c, &basis[j], 1.0);
                ax.axpy(*c, &sigma[j], 1.0);
            }
            let mut r = ax;
            r.axpy(-theta, &x, 1.0);
            residual_norms.push(r.norm());
            ritz_values.push(theta);
            ritz_vectors.push(x);
            residuals.push(r);
        }

        let worst = residual_norms.iter().cloned().fold(0.0f64, f64::max);
        info!(
            iteration,
            subspace = m,
            max_residual = worst,
            "Davidson iteration complete"
        );

        let converged = residual_norms.iter().all(|&r| r <= config.tolerance) && n_ritz == k;
        if converged || iteration >= config.max_iterations {
            if !converged {
                info!(
                    iteration,
                    max_residual = worst,
                    "Davidson reached the iteration bound before convergence"
                );
            }
            return Ok(assemble_result(
                ritz_values,
                ritz_vectors,
                residual_norms,
                iteration,
                converged,
            ));
        }

        // Collapse before the basis would outgrow its bound, keeping the
        // lowest Ritz vectors (slightly more than requested, when present).
        let unconverged = residual_norms
            .iter()
            .filter(|&&r| r > config.tolerance)
            .count();
        if m + unconverged > max_subspace {
            let keep = (2 * k).min(m);
            debug!(from = m, to = keep, "collapsing subspace");
            let (new_basis, new_sigma) =
                collapse_subspace(&basis, &sigma, &eig.eigenvectors, &order, keep);
            basis = new_basis;
            sigma = new_sigma;
        }

        let mut added = 0;
        for (i, residual) in residuals.iter().enumerate() {
            if residual_norms[i] <= config.tolerance {
                continue;
            }
            let mut correction = preconditioner.apply(residual, ritz_values[i]);
            if correction.len() != dim {
                return Err(TensorError::InvalidInput(format!(
                    "preconditioner returned a vector of length {}, expected {}",
                    correction.len(),
                    dim
                )));
            }
            orthogonalize_against(&mut correction, &basis);
            let norm = correction.norm();
            if norm > LINEAR_DEPENDENCE_CUTOFF {
                basis.push(correction / norm);
                added += 1;
            }
        }

        if added == 0 {
            // Every correction collapsed onto the span of the basis; the
            // subspace cannot improve further at this precision.
            info!(
                iteration,
                max_residual = worst,
                "Davidson stagnated: all corrections linearly dependent"
            );
            return Ok(assemble_result(
                ritz_values,
                ritz_vectors,
                residual_norms,
                iteration,
                false,
            ));
        }
    }
}

fn validate_request(dim: usize, config: &DavidsonConfig) -> Result<()> {
    if dim == 0 {
        return Err(TensorError::InvalidInput(
            "operator dimension is zero".to_string(),
        ));
    }
    if config.n_roots == 0 {
        return Err(TensorError::InvalidInput(
            "requested zero eigenpairs".to_string(),
        ));
    }
    if config.n_roots > dim {
        return Err(TensorError::InvalidInput(format!(
            "requested {} eigenpairs of a dimension-{} operator",
            config.n_roots, dim
        )));
    }
    if !(config.tolerance > 0.0) {
        return Err(TensorError::InvalidInput(format!(
            "non-positive convergence tolerance {}",
            config.tolerance
        )));
    }
    if config.max_subspace < config.n_roots {
        return Err(TensorError::InvalidInput(format!(
            "maximum subspace size {} is smaller than the number of roots {}",
            config.max_subspace, config.n_roots
        )));
    }
    Ok(())
}

/// Starting vectors: caller-supplied if present, otherwise unit vectors on
/// the smallest diagonal entries (plain unit vectors when the operator has
/// no diagonal).
fn initial_basis<O: LinearOperator>(op: &O, config: &DavidsonConfig) -> Result<Vec<DVector<f64>>> {
    let dim = op.dim();
    let k = config.n_roots;

    let mut basis: Vec<DVector<f64>> = Vec::with_capacity(k);
    if let Some(guess) = &config.initial_guess {
        for v in guess {
            if v.len() != dim {
                return Err(TensorError::InvalidInput(format!(
                    "initial guess vector has length {}, expected {}",
                    v.len(),
                    dim
                )));
            }
            let mut v = v.clone();
            orthogonalize_against(&mut v, &basis);
            let norm = v.norm();
            if norm > LINEAR_DEPENDENCE_CUTOFF {
                basis.push(v / norm);
            }
        }
    }

    if basis.len() < k {
        let mut order: Vec<usize> = (0..dim).collect();
        if let Some(diagonal) = op.diagonal() {
            order.sort_by(|&a, &b| {
                diagonal[a]
                    .partial_cmp(&diagonal[b])
                    .unwrap_or(Ordering::Equal)
            });
        }
        for &i in order.iter() {
            if basis.len() == k {
                break;
            }
            let mut e = DVector::zeros(dim);
            e[i] = 1.0;
            orthogonalize_against(&mut e, &basis);
            let norm = e.norm();
            if norm > LINEAR_DEPENDENCE_CUTOFF {
                basis.push(e / norm);
            }
        }
    }

    if basis.is_empty() {
        return Err(TensorError::InvalidInput(
            "no linearly independent starting vectors".to_string(),
        ));
    }
    Ok(basis)
}

/// The small projected operator `H_ij = <b_i | A b_j>`, built symmetric.
fn projected_matrix(basis: &[DVector<f64>], sigma: &[DVector<f64>]) -> DMatrix<f64> {
    let m = basis.len();
    let mut projected = DMatrix::zeros(m, m);
    for j in 0..m {
        for i in 0..=j {
            let h = basis[i].dot(&sigma[j]);
            projected[(i, j)] = h;
            projected[(j, i)] = h;
        }
    }
    projected
}

/// Two passes of classical Gram-Schmidt; the repeat keeps the basis
/// orthogonal to working precision even for nearly dependent directions.
fn orthogonalize_against(v: &mut DVector<f64>, basis: &[DVector<f64>]) {
    for _ in 0..2 {
        for b in basis {
            let overlap = b.dot(v);
            v.axpy(-overlap, b, 1.0);
        }
    }
}

/// Collapse the subspace onto the `keep` lowest Ritz vectors. The operator
/// action carries over as the same linear combinations, so no new operator
/// applications are needed.
fn collapse_subspace(
    basis: &[DVector<f64>],
    sigma: &[DVector<f64>],
    ritz_coeffs: &DMatrix<f64>,
    order: &[usize],
    keep: usize,
) -> (Vec<DVector<f64>>, Vec<DVector<f64>>) {
    let dim = basis[0].len();
    let mut new_basis = Vec::with_capacity(keep);
    let mut new_sigma = Vec::with_capacity(keep);
    for &root in order.iter().take(keep) {
        let coeffs = ritz_coeffs.column(root);
        let mut x = DVector::zeros(dim);
        let mut ax = DVector::zeros(dim);
        for (j, c) in coeffs.iter().enumerate() {
            x.axpy(*c, &basis[j], 1.0);
            ax.axpy(*c, &sigma[j], 1.0);
        }
        new_basis.push(x);
        new_sigma.push(ax);
    }
    (new_basis, new_sigma)
}

fn assemble_result(
    ritz_values: Vec<f64>,
    ritz_vectors: Vec<DVector<f64>>,
    residual_norms: Vec<f64>,
    iterations: usize,
    converged: bool,
) -> DavidsonResult {
    let dim = ritz_vectors.first().map_or(0, |v| v.len());
    let k = ritz_vectors.len();
    let mut eigenvectors = DMatrix::zeros(dim, k);
    for (j, v) in ritz_vectors.iter().enumerate() {
        eigenvectors.set_column(j, v);
    }
    DavidsonResult {
        eigenvalues: DVector::from_vec(ritz_values),
        eigenvectors,
        residual_norms,
        iterations,
        converged,
    }
}
