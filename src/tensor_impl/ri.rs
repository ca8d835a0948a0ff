//! Rank-3 storage for three-center integrals in the resolution-of-identity
//! (density fitting) approximation.

use rayon::prelude::*;

use crate::error::{Result, TensorError};
use crate::matrix_impl::DenseMatrix;

/// Column-major `(nbas1, nbas2, naux)` tensor holding fitted three-center
/// integrals `B_P[mu, nu]`.
///
/// Element `(mu, nu, P)` lives at `mu + nbas1 (nu + nbas2 P)`, so the
/// `nbas1 x nbas2` matrix of each auxiliary index is one contiguous chunk.
/// The two orbital indices are not assumed symmetric under the fit, so no
/// folding is applied.
#[derive(Clone, Debug, PartialEq)]
pub struct RiTensor {
    pub data: Vec<f64>,
    pub size: [usize; 3],
}

impl RiTensor {
    /// Create an `(nbas1, nbas2, naux)` tensor filled with zeros.
    pub fn zeros(nbas1: usize, nbas2: usize, naux: usize) -> Self {
        RiTensor {
            data: vec![0.0; nbas1 * nbas2 * naux],
            size: [nbas1, nbas2, naux],
        }
    }

    /// Wrap an existing column-major buffer.
    pub fn from_vec(size: [usize; 3], data: Vec<f64>) -> Result<Self> {
        if data.len() != size[0] * size[1] * size[2] {
            return Err(TensorError::InvalidInput(format!(
                "buffer length {} does not match extents {}x{}x{}",
                data.len(),
                size[0],
                size[1],
                size[2]
            )));
        }
        Ok(RiTensor { data, size })
    }

    pub fn naux(&self) -> usize {
        self.size[2]
    }

    fn check_index(&self, mu: usize, nu: usize, p: usize) -> Result<()> {
        let idx = [mu, nu, p];
        for axis in 0..3 {
            if idx[axis] >= self.size[axis] {
                return Err(TensorError::Index {
                    index: idx[axis],
                    axis,
                    extent: self.size[axis],
                });
            }
        }
        Ok(())
    }

    #[inline]
    fn offset(&self, mu: usize, nu: usize, p: usize) -> usize {
        mu + self.size[0] * (nu + self.size[1] * p)
    }

    /// Bounds-checked element read.
    pub fn get(&self, mu: usize, nu: usize, p: usize) -> Result<f64> {
        self.check_index(mu, nu, p)?;
        Ok(self.data[self.offset(mu, nu, p)])
    }

    /// Bounds-checked element write.
    pub fn set(&mut self, mu: usize, nu: usize, p: usize, value: f64) -> Result<()> {
        self.check_index(mu, nu, p)?;
        let off = self.offset(mu, nu, p);
        self.data[off] = value;
        Ok(())
    }

    /// The `nbas1 x nbas2` slab of auxiliary index `p`, as a contiguous
    /// column-major slice.
    pub fn aux_slice(&self, p: usize) -> Result<&[f64]> {
        if p >= self.size[2] {
            return Err(TensorError::Index {
                index: p,
                axis: 2,
                extent: self.size[2],
            });
        }
        let chunk = self.size[0] * self.size[1];
        Ok(&self.data[p * chunk..(p + 1) * chunk])
    }

    /// Coulomb matrix through the fitted expansion:
    /// `J = sum_P B_P tr(B_P^T D)`, the RI form of
    /// `J_pq = sum_rs (pq|rs) D_rs`.
    pub fn coulomb_matrix(&self, density: &DenseMatrix) -> Result<DenseMatrix> {
        let n = self.check_square(density)?;
        let out = (0..self.naux())
            .into_par_iter()
            .fold(
                || DenseMatrix::zeros([n, n]),
                |mut acc, p| {
                    let b = self.aux_slice(p).expect("aux index in range");
                    let weight: f64 = b
                        .iter()
                        .zip(density.data.iter())
                        .map(|(bv, dv)| bv * dv)
                        .sum();
                    acc.data
                        .iter_mut()
                        .zip(b.iter())
                        .for_each(|(a, bv)| *a += weight * bv);
                    acc
                },
            )
            .reduce(
                || DenseMatrix::zeros([n, n]),
                |mut a, b| {
                    a.add_assign_scaled(&b, 1.0).expect("extent mismatch");
                    a
                },
            );
        Ok(out)
    }

    /// Exchange matrix through the fitted expansion:
    /// `K = sum_P B_P D B_P^T`, the RI form of
    /// `K_pq = sum_rs (pr|qs) D_rs`.
    pub fn exchange_matrix(&self, density: &DenseMatrix) -> Result<DenseMatrix> {
        let n = self.check_square(density)?;
        let out = (0..self.naux())
            .into_par_iter()
            .fold(
                || DenseMatrix::zeros([n, n]),
                |mut acc, p| {
                    let b = self.aux_slice(p).expect("aux index in range");
                    // tmp = B_P D, then acc += tmp B_P^T.
                    let mut tmp = vec![0.0; n * n];
                    for s in 0..n {
                        for r in 0..n {
                            let d = density[[r, s]];
                            if d == 0.0 {
                                continue;
                            }
                            for row in 0..n {
                                tmp[row + n * s] += b[row + n * r] * d;
                            }
                        }
                    }
                    for q in 0..n {
                        for s in 0..n {
                            let bq = b[q + n * s];
                            if bq == 0.0 {
                                continue;
                            }
                            for row in 0..n {
                                acc[[row, q]] += tmp[row + n * s] * bq;
                            }
                        }
                    }
                    acc
                },
            )
            .reduce(
                || DenseMatrix::zeros([n, n]),
                |mut a, b| {
                    a.add_assign_scaled(&b, 1.0).expect("extent mismatch");
                    a
                },
            );
        Ok(out)
    }

    fn check_square(&self, density: &DenseMatrix) -> Result<usize> {
        if self.size[0] != self.size[1] {
            return Err(TensorError::InvalidInput(format!(
                "contraction requires matching orbital extents, tensor is {}x{}x{}",
                self.size[0], self.size[1], self.size[2]
            )));
        }
        if density.size != [self.size[0], self.size[1]] {
            return Err(TensorError::InvalidInput(format!(
                "density matrix is {}x{}, tensor orbital extent is {}",
                density.nrows(),
                density.ncols(),
                self.size[0]
            )));
        }
        Ok(self.size[0])
    }
}
