//! Upper-triangle packed storage for symmetric matrices.

use crate::error::{Result, TensorError};
use crate::matrix_impl::dense::DenseMatrix;
use crate::matrix_impl::view::PackedView;

/// Linear offset of logical element `(i, j)` with `i <= j` in the packed
/// upper triangle, enumerated column by column.
#[inline]
pub(crate) fn packed_index(i: usize, j: usize) -> usize {
    debug_assert!(i <= j);
    i + j * (j + 1) / 2
}

/// An `n x n` symmetric matrix stored as its upper triangle,
/// `n (n + 1) / 2` elements in column-major triangle order.
///
/// Logical elements `(i, j)` and `(j, i)` always read the same stored slot;
/// writes through either index pair target the canonical `(min, max)` slot.
#[derive(Clone, Debug, PartialEq)]
pub struct PackedMatrix {
    pub data: Vec<f64>,
    pub n: usize,
}

impl PackedMatrix {
    /// Create an `n x n` packed matrix filled with zeros.
    pub fn zeros(n: usize) -> Self {
        PackedMatrix {
            data: vec![0.0; n * (n + 1) / 2],
            n,
        }
    }

    /// Wrap an existing packed upper-triangle buffer.
    pub fn from_vec(n: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != n * (n + 1) / 2 {
            return Err(TensorError::InvalidInput(format!(
                "buffer length {} does not match packed size {} for n = {}",
                data.len(),
                n * (n + 1) / 2,
                n
            )));
        }
        Ok(PackedMatrix { data, n })
    }

    /// Fold a dense matrix into packed storage, verifying symmetry.
    ///
    /// Fails with `Symmetry` if any `|a_ij - a_ji|` exceeds `tolerance`.
    /// The stored values are taken from the upper triangle, so the
    /// conversion is lossless for genuinely symmetric input.
    pub fn from_dense(dense: &DenseMatrix, tolerance: f64) -> Result<Self> {
        let (i, j, delta) = dense.symmetry_deviation()?;
        if delta > tolerance {
            return Err(TensorError::Symmetry {
                i,
                j,
                delta,
                tolerance,
            });
        }
        Ok(Self::fold_upper(dense))
    }

    /// Fold a dense matrix into packed storage without a symmetry check,
    /// for callers that already guarantee symmetry (e.g. integral batches
    /// symmetric up to float noise). The lower triangle is ignored.
    pub fn from_dense_trusting(dense: &DenseMatrix) -> Result<Self> {
        if dense.nrows() != dense.ncols() {
            return Err(TensorError::InvalidInput(format!(
                "cannot pack a {}x{} matrix",
                dense.nrows(),
                dense.ncols()
            )));
        }
        Ok(Self::fold_upper(dense))
    }

    fn fold_upper(dense: &DenseMatrix) -> Self {
        let n = dense.nrows();
        let mut data = Vec::with_capacity(n * (n + 1) / 2);
        for j in 0..n {
            for i in 0..=j {
                data.push(dense[[i, j]]);
            }
        }
        PackedMatrix { data, n }
    }

    /// Expand to a full dense matrix. Lossless.
    pub fn to_dense(&self) -> DenseMatrix {
        let mut dense = DenseMatrix::zeros([self.n, self.n]);
        for j in 0..self.n {
            for i in 0..=j {
                let v = self.data[packed_index(i, j)];
                dense[[i, j]] = v;
                dense[[j, i]] = v;
            }
        }
        dense
    }

    fn check_index(&self, i: usize, j: usize) -> Result<()> {
        if i >= self.n {
            return Err(TensorError::Index {
                index: i,
                axis: 0,
                extent: self.n,
            });
        }
        if j >= self.n {
            return Err(TensorError::Index {
                index: j,
                axis: 1,
                extent: self.n,
            });
        }
        Ok(())
    }

    /// Bounds-checked element read; `(i, j)` and `(j, i)` are equivalent.
    pub fn get(&self, i: usize, j: usize) -> Result<f64> {
        self.check_index(i, j)?;
        let (lo, hi) = if i <= j { (i, j) } else { (j, i) };
        Ok(self.data[packed_index(lo, hi)])
    }

    /// Bounds-checked element write to the canonical `(min, max)` slot.
    pub fn set(&mut self, i: usize, j: usize, value: f64) -> Result<()> {
        self.check_index(i, j)?;
        let (lo, hi) = if i <= j { (i, j) } else { (j, i) };
        self.data[packed_index(lo, hi)] = value;
        Ok(())
    }

    /// Diagonal elements as a fresh vector.
    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.n).map(|i| self.data[packed_index(i, i)]).collect()
    }

    /// Scale every stored element in place.
    pub fn scale(&mut self, factor: f64) {
        self.data.iter_mut().for_each(|v| *v *= factor);
    }

    /// `self += factor * other`, requiring identical extents.
    pub fn add_assign_scaled(&mut self, other: &PackedMatrix, factor: f64) -> Result<()> {
        if self.n != other.n {
            return Err(TensorError::InvalidInput(format!(
                "extent mismatch: {} vs {}",
                self.n, other.n
            )));
        }
        self.data
            .iter_mut()
            .zip(other.data.iter())
            .for_each(|(a, b)| *a += factor * b);
        Ok(())
    }

    /// Matrix-vector product `y = A x` on the packed buffer.
    ///
    /// Runs in O(n^2) over the stored triangle: each off-diagonal slot
    /// contributes to both `y[i]` and `y[j]`, so the result is algebraically
    /// identical to the product on the unpacked dense form.
    pub fn matvec(&self, x: &[f64]) -> Result<Vec<f64>> {
        if x.len() != self.n {
            return Err(TensorError::InvalidInput(format!(
                "vector length {} does not match extent {}",
                x.len(),
                self.n
            )));
        }
        let mut y = vec![0.0; self.n];
        for j in 0..self.n {
            for i in 0..=j {
                let a = self.data[packed_index(i, j)];
                y[i] += a * x[j];
                if i != j {
                    y[j] += a * x[i];
                }
            }
        }
        Ok(y)
    }

    /// A read-only view over the packed triangle.
    pub fn as_view(&self) -> PackedView<'_> {
        PackedView::new(self)
    }
}
