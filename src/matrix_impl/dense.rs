//! Column-major dense matrix storage.

extern crate nalgebra as na;

use std::ops::{Add, AddAssign, Index, IndexMut, Range};

use na::DMatrix;

use crate::error::{Result, TensorError};
use crate::matrix_impl::view::{MatrixView, MatrixViewMut};

/// An owning, column-major matrix of `f64`.
///
/// Element `(i, j)` lives at linear offset `i + j * rows`, matching the
/// convention of standard linear-algebra backends so that conversion to and
/// from [`DMatrix`] is a plain buffer copy. Zero extents are valid and yield
/// an empty container.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseMatrix {
    pub data: Vec<f64>,
    pub size: [usize; 2],
}

impl DenseMatrix {
    /// Create a matrix of the given extents filled with zeros.
    pub fn zeros(size: [usize; 2]) -> Self {
        DenseMatrix {
            data: vec![0.0; size[0] * size[1]],
            size,
        }
    }

    /// Wrap an existing column-major buffer.
    ///
    /// Fails with `InvalidInput` if the buffer length does not match the
    /// extents.
    pub fn from_vec(size: [usize; 2], data: Vec<f64>) -> Result<Self> {
        if data.len() != size[0] * size[1] {
            return Err(TensorError::InvalidInput(format!(
                "buffer length {} does not match extents {}x{}",
                data.len(),
                size[0],
                size[1]
            )));
        }
        Ok(DenseMatrix { data, size })
    }

    pub fn nrows(&self) -> usize {
        self.size[0]
    }

    pub fn ncols(&self) -> usize {
        self.size[1]
    }

    #[inline]
    fn offset(&self, i: usize, j: usize) -> usize {
        i + j * self.size[0]
    }

    fn check_index(&self, i: usize, j: usize) -> Result<()> {
        if i >= self.size[0] {
            return Err(TensorError::Index {
                index: i,
                axis: 0,
                extent: self.size[0],
            });
        }
        if j >= self.size[1] {
            return Err(TensorError::Index {
                index: j,
                axis: 1,
                extent: self.size[1],
            });
        }
        Ok(())
    }

    /// Bounds-checked element read.
    pub fn get(&self, i: usize, j: usize) -> Result<f64> {
        self.check_index(i, j)?;
        Ok(self.data[self.offset(i, j)])
    }

    /// Bounds-checked element write.
    pub fn set(&mut self, i: usize, j: usize, value: f64) -> Result<()> {
        self.check_index(i, j)?;
        let off = self.offset(i, j);
        self.data[off] = value;
        Ok(())
    }

    /// The `j`-th column as a contiguous slice.
    pub fn column(&self, j: usize) -> Result<&[f64]> {
        if j >= self.size[1] {
            return Err(TensorError::Index {
                index: j,
                axis: 1,
                extent: self.size[1],
            });
        }
        let start = j * self.size[0];
        Ok(&self.data[start..start + self.size[0]])
    }

    /// Scale every element in place.
    pub fn scale(&mut self, factor: f64) {
        self.data.iter_mut().for_each(|v| *v *= factor);
    }

    /// `self += factor * other`, requiring identical extents.
    pub fn add_assign_scaled(&mut self, other: &DenseMatrix, factor: f64) -> Result<()> {
        if self.size != other.size {
            return Err(TensorError::InvalidInput(format!(
                "extent mismatch: {}x{} vs {}x{}",
                self.size[0], self.size[1], other.size[0], other.size[1]
            )));
        }
        self.data
            .iter_mut()
            .zip(other.data.iter())
            .for_each(|(a, b)| *a += factor * b);
        Ok(())
    }

    /// Matrix-vector product `y = A x`.
    pub fn matvec(&self, x: &[f64]) -> Result<Vec<f64>> {
        if x.len() != self.size[1] {
            return Err(TensorError::InvalidInput(format!(
                "vector length {} does not match column count {}",
                x.len(),
                self.size[1]
            )));
        }
        let mut y = vec![0.0; self.size[0]];
        // Column-major traversal: accumulate one column at a time.
        for j in 0..self.size[1] {
            let xj = x[j];
            let col = &self.data[j * self.size[0]..(j + 1) * self.size[0]];
            for (yi, aij) in y.iter_mut().zip(col.iter()) {
                *yi += aij * xj;
            }
        }
        Ok(y)
    }

    /// Largest absolute deviation from symmetry, `max |a_ij - a_ji|`,
    /// together with the offending index pair.
    pub fn symmetry_deviation(&self) -> Result<(usize, usize, f64)> {
        if self.size[0] != self.size[1] {
            return Err(TensorError::InvalidInput(format!(
                "symmetry is undefined for a {}x{} matrix",
                self.size[0], self.size[1]
            )));
        }
        let mut worst = (0, 0, 0.0f64);
        for j in 0..self.size[1] {
            for i in 0..j {
                let delta = (self.data[self.offset(i, j)] - self.data[self.offset(j, i)]).abs();
                if delta > worst.2 {
                    worst = (i, j, delta);
                }
            }
        }
        Ok(worst)
    }

    /// A shared view over the given row and column ranges.
    pub fn view(&self, rows: Range<usize>, cols: Range<usize>) -> Result<MatrixView<'_>> {
        MatrixView::new(self, rows, cols)
    }

    /// An exclusive view over the given row and column ranges. Writes go
    /// through to this matrix; the borrow checker rules out any concurrent
    /// view while it is alive.
    pub fn view_mut(&mut self, rows: Range<usize>, cols: Range<usize>) -> Result<MatrixViewMut<'_>> {
        MatrixViewMut::new(self, rows, cols)
    }

    /// Copy into the backing nalgebra type.
    pub fn to_dmatrix(&self) -> DMatrix<f64> {
        DMatrix::from_column_slice(self.size[0], self.size[1], &self.data)
    }

    /// Copy out of the backing nalgebra type.
    pub fn from_dmatrix(mat: &DMatrix<f64>) -> Self {
        DenseMatrix {
            data: mat.as_slice().to_vec(),
            size: [mat.nrows(), mat.ncols()],
        }
    }
}

/// Operator sugar for hot loops and tests; panics on out-of-range access
/// like slice indexing. The checked accessors are the API contract.
impl Index<[usize; 2]> for DenseMatrix {
    type Output = f64;

    fn index(&self, index: [usize; 2]) -> &f64 {
        assert!(index[0] < self.size[0] && index[1] < self.size[1]);
        &self.data[index[0] + index[1] * self.size[0]]
    }
}

impl IndexMut<[usize; 2]> for DenseMatrix {
    fn index_mut(&mut self, index: [usize; 2]) -> &mut f64 {
        assert!(index[0] < self.size[0] && index[1] < self.size[1]);
        &mut self.data[index[0] + index[1] * self.size[0]]
    }
}

impl Add for DenseMatrix {
    type Output = DenseMatrix;

    fn add(mut self, rhs: DenseMatrix) -> DenseMatrix {
        self.add_assign_scaled(&rhs, 1.0)
            .expect("extent mismatch in matrix addition");
        self
    }
}

impl AddAssign<&DenseMatrix> for DenseMatrix {
    fn add_assign(&mut self, rhs: &DenseMatrix) {
        self.add_assign_scaled(rhs, 1.0)
            .expect("extent mismatch in matrix addition");
    }
}
