//! Typed errors shared by the matrix, tensor, and solver modules.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TensorError>;

/// Errors raised by storage containers and the eigensolver.
///
/// Non-convergence of the iterative solver is deliberately *not* an error:
/// it is reported through the `converged` flag on the solver result so that
/// best-effort estimates remain available to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TensorError {
    /// Element access outside the container extents.
    #[error("index {index} out of range on axis {axis} (extent {extent})")]
    Index {
        index: usize,
        axis: usize,
        extent: usize,
    },

    /// View bounds outside the container extents.
    #[error("range {start}..{end} out of bounds (extent {extent})")]
    Range {
        start: usize,
        end: usize,
        extent: usize,
    },

    /// A matrix claimed symmetric deviates beyond the caller's tolerance.
    #[error("symmetry violation at ({i},{j}): deviation {delta:.3e} exceeds tolerance {tolerance:.3e}")]
    Symmetry {
        i: usize,
        j: usize,
        delta: f64,
        tolerance: f64,
    },

    /// A 4-index tensor violates the two-electron permutation symmetry.
    #[error("permutation symmetry violation at ({p},{q},{r},{s}): deviation {delta:.3e} exceeds tolerance {tolerance:.3e}")]
    QuadSymmetry {
        p: usize,
        q: usize,
        r: usize,
        s: usize,
        delta: f64,
        tolerance: f64,
    },

    /// Malformed request: mismatched shapes, empty operators, bad root counts.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
