//! # qc_tensors
//!
//! **qc_tensors** is a linear algebra library providing the storage layouts
//! and the iterative eigensolver used by electronic-structure calculations.
//!
//! ### Features
//!
//!   * [`DenseMatrix`]: the `column-major` rank-2 tensor, i.e. `matrix`, used for
//!     orbital coefficients, density matrices, and most intermediate data.
//!   * [`PackedMatrix`]: upper-triangle packed storage for Hamiltonian-like
//!     symmetric matrices, with [`MatrixView`]/[`MatrixViewMut`] windows shared
//!     with [`DenseMatrix`].
//!   * [`EriFull`] and [`EriFold4`]: `column-major` 4-index tensors for
//!     electron repulsion integrals; `EriFold4` packs both index pairs and
//!     exploits the full 8-fold permutation symmetry.
//!   * [`RiTensor`]: the `column-major` rank-3 tensor for three-center
//!     integrals in the resolution-of-identity approximation.
//!   * [`Tensor4`]: dimension-parameterized rank-4 storage for contraction
//!     intermediates outside the ERI symmetry machinery.
//!   * [`davidson`]: an iterative subspace eigensolver for the lowest
//!     eigenpairs of large implicitly-defined symmetric operators.
//!   * [`IntegralEngine`]: the capability boundary toward a native integral
//!     engine, with adapters that assemble the storage types above from
//!     shell batches.

pub mod error;
pub mod matrix_impl;
pub mod tensor_impl;
pub mod davidson_impl;
pub mod engine_impl;

pub use crate::error::{Result, TensorError};
pub use crate::matrix_impl::{DenseMatrix, MatrixView, MatrixViewMut, PackedMatrix, PackedView};
pub use crate::tensor_impl::{EriFold4, EriFull, RiTensor, Tensor4};
pub use crate::davidson_impl::{
    davidson, davidson_with_preconditioner, DavidsonConfig, DavidsonResult,
    DiagonalPreconditioner, IdentityPreconditioner, LinearOperator, Preconditioner,
};
pub use crate::engine_impl::{
    build_eri, build_matrix, build_packed, build_ri, IntegralEngine, IntegralKind,
};
