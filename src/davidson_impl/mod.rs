//! Davidson iterative eigensolver
//!
//! This module provides a preconditioned subspace eigensolver for the lowest
//! eigenpairs of large symmetric operators that are only available through
//! their action on a vector, such as Hamiltonians contracted on the fly from
//! integral tensors.
//!
//! # Algorithm
//!
//! Each iteration projects the operator into the current orthonormal
//! subspace, diagonalizes the small projected matrix exactly, forms the
//! residuals of the lowest Ritz pairs, and expands the subspace with
//! preconditioned, re-orthogonalized correction vectors. When the subspace
//! would outgrow its configured maximum it is collapsed onto the current
//! Ritz vectors, preserving convergence progress.

mod davidson;


pub use davidson::{
    davidson, davidson_with_preconditioner, DavidsonConfig, DavidsonResult,
    DiagonalPreconditioner, IdentityPreconditioner, LinearOperator, Preconditioner,
};
