//! Borrow-scoped windows over dense and packed matrices.
//!
//! A view never owns storage and cannot outlive its base container. The
//! exclusive/shared split maps directly onto `&mut`/`&` borrows, so the
//! aliasing discipline (one writer, or any number of readers) is enforced
//! at compile time rather than by runtime checks.

use std::ops::Range;

use crate::error::{Result, TensorError};
use crate::matrix_impl::dense::DenseMatrix;
use crate::matrix_impl::packed::PackedMatrix;

fn check_range(range: &Range<usize>, extent: usize) -> Result<()> {
    if range.start > range.end || range.end > extent {
        return Err(TensorError::Range {
            start: range.start,
            end: range.end,
            extent,
        });
    }
    Ok(())
}

/// A shared, read-only window over a rectangular region of a [`DenseMatrix`].
///
/// Indices are local to the view: element `(0, 0)` is the top-left corner of
/// the window.
#[derive(Clone)]
pub struct MatrixView<'a> {
    base: &'a DenseMatrix,
    rows: Range<usize>,
    cols: Range<usize>,
}

impl<'a> MatrixView<'a> {
    pub(crate) fn new(
        base: &'a DenseMatrix,
        rows: Range<usize>,
        cols: Range<usize>,
    ) -> Result<Self> {
        check_range(&rows, base.nrows())?;
        check_range(&cols, base.ncols())?;
        Ok(MatrixView { base, rows, cols })
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncols(&self) -> usize {
        self.cols.len()
    }

    fn check_local(&self, i: usize, j: usize) -> Result<()> {
        if i >= self.nrows() {
            return Err(TensorError::Index {
                index: i,
                axis: 0,
                extent: self.nrows(),
            });
        }
        if j >= self.ncols() {
            return Err(TensorError::Index {
                index: j,
                axis: 1,
                extent: self.ncols(),
            });
        }
        Ok(())
    }

    /// Bounds-checked read at view-local `(i, j)`.
    pub fn get(&self, i: usize, j: usize) -> Result<f64> {
        self.check_local(i, j)?;
        self.base.get(self.rows.start + i, self.cols.start + j)
    }

    /// The `j`-th view column as a contiguous slice of the base buffer.
    pub fn col_slice(&self, j: usize) -> Result<&'a [f64]> {
        if j >= self.ncols() {
            return Err(TensorError::Index {
                index: j,
                axis: 1,
                extent: self.ncols(),
            });
        }
        let col = self.base.column(self.cols.start + j)?;
        Ok(&col[self.rows.clone()])
    }

    /// Lazy column-major iteration over the viewed elements. The iterator is
    /// finite and can be re-created at will; nothing is materialized.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let base = self.base;
        let rows = self.rows.clone();
        self.cols.clone().flat_map(move |j| {
            let rows = rows.clone();
            rows.map(move |i| base[[i, j]])
        })
    }

    /// Strided element iteration: every `step`-th element of [`iter`](Self::iter).
    pub fn iter_stepped(&self, step: usize) -> impl Iterator<Item = f64> + '_ {
        self.iter().step_by(step.max(1))
    }

    /// Copy the window into a fresh owning matrix.
    pub fn to_owned(&self) -> DenseMatrix {
        let mut out = DenseMatrix::zeros([self.nrows(), self.ncols()]);
        for j in 0..self.ncols() {
            for i in 0..self.nrows() {
                out[[i, j]] = self.base[[self.rows.start + i, self.cols.start + j]];
            }
        }
        out
    }
}

/// An exclusive window over a rectangular region of a [`DenseMatrix`].
///
/// Holds `&mut` on the base container, so no other view (shared or
/// exclusive) can exist while it is alive; writes go straight through to
/// the owner's buffer.
pub struct MatrixViewMut<'a> {
    base: &'a mut DenseMatrix,
    rows: Range<usize>,
    cols: Range<usize>,
}

impl<'a> MatrixViewMut<'a> {
    pub(crate) fn new(
        base: &'a mut DenseMatrix,
        rows: Range<usize>,
        cols: Range<usize>,
    ) -> Result<Self> {
        check_range(&rows, base.nrows())?;
        check_range(&cols, base.ncols())?;
        Ok(MatrixViewMut { base, rows, cols })
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncols(&self) -> usize {
        self.cols.len()
    }

    fn check_local(&self, i: usize, j: usize) -> Result<()> {
        if i >= self.nrows() {
            return Err(TensorError::Index {
                index: i,
                axis: 0,
                extent: self.nrows(),
            });
        }
        if j >= self.ncols() {
            return Err(TensorError::Index {
                index: j,
                axis: 1,
                extent: self.ncols(),
            });
        }
        Ok(())
    }

    /// Bounds-checked read at view-local `(i, j)`.
    pub fn get(&self, i: usize, j: usize) -> Result<f64> {
        self.check_local(i, j)?;
        self.base.get(self.rows.start + i, self.cols.start + j)
    }

    /// Bounds-checked write-through at view-local `(i, j)`.
    pub fn set(&mut self, i: usize, j: usize, value: f64) -> Result<()> {
        self.check_local(i, j)?;
        self.base
            .set(self.rows.start + i, self.cols.start + j, value)
    }

    /// Set every element of the window.
    pub fn fill(&mut self, value: f64) {
        for j in self.cols.clone() {
            for i in self.rows.clone() {
                self.base[[i, j]] = value;
            }
        }
    }

    /// Copy a matrix of matching extents into the window.
    pub fn copy_from(&mut self, source: &DenseMatrix) -> Result<()> {
        if source.nrows() != self.nrows() || source.ncols() != self.ncols() {
            return Err(TensorError::InvalidInput(format!(
                "extent mismatch: window is {}x{}, source is {}x{}",
                self.nrows(),
                self.ncols(),
                source.nrows(),
                source.ncols()
            )));
        }
        for j in 0..self.ncols() {
            for i in 0..self.nrows() {
                self.base[[self.rows.start + i, self.cols.start + j]] = source[[i, j]];
            }
        }
        Ok(())
    }
}

/// A shared, read-only view over a [`PackedMatrix`] triangle.
#[derive(Clone, Copy)]
pub struct PackedView<'a> {
    base: &'a PackedMatrix,
}

impl<'a> PackedView<'a> {
    pub(crate) fn new(base: &'a PackedMatrix) -> Self {
        PackedView { base }
    }

    pub fn n(&self) -> usize {
        self.base.n
    }

    /// Bounds-checked read; `(i, j)` and `(j, i)` are equivalent.
    pub fn get(&self, i: usize, j: usize) -> Result<f64> {
        self.base.get(i, j)
    }

    /// Lazy iteration over the stored upper triangle in packed order.
    pub fn iter(&self) -> impl Iterator<Item = f64> + 'a {
        self.base.data.iter().copied()
    }
}
