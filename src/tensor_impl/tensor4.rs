//! Dimension-parameterized rank-4 tensor for contraction intermediates.

use crate::error::{Result, TensorError};

/// Column-major rank-4 tensor with independent extents per axis, used for
/// intermediates (e.g. half-transformed integrals) that carry none of the
/// ERI permutation symmetry.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor4 {
    pub data: Vec<f64>,
    pub size: [usize; 4],
    pub indicing: [usize; 4],
}

fn strides(size: [usize; 4]) -> [usize; 4] {
    [
        1,
        size[0],
        size[0] * size[1],
        size[0] * size[1] * size[2],
    ]
}

impl Tensor4 {
    /// Create a tensor of the given extents filled with zeros.
    pub fn zeros(size: [usize; 4]) -> Self {
        Tensor4 {
            data: vec![0.0; size.iter().product()],
            size,
            indicing: strides(size),
        }
    }

    /// Wrap an existing column-major buffer.
    pub fn from_vec(size: [usize; 4], data: Vec<f64>) -> Result<Self> {
        if data.len() != size.iter().product::<usize>() {
            return Err(TensorError::InvalidInput(format!(
                "buffer length {} does not match extents {:?}",
                data.len(),
                size
            )));
        }
        Ok(Tensor4 {
            data,
            size,
            indicing: strides(size),
        })
    }

    fn check_index(&self, idx: [usize; 4]) -> Result<()> {
        for axis in 0..4 {
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
    fn offset(&self, idx: [usize; 4]) -> usize {
        idx.iter()
            .zip(self.indicing.iter())
            .map(|(i, s)| i * s)
            .sum()
    }

    /// Bounds-checked element read.
    pub fn get(&self, idx: [usize; 4]) -> Result<f64> {
        self.check_index(idx)?;
        Ok(self.data[self.offset(idx)])
    }

    /// Bounds-checked element write.
    pub fn set(&mut self, idx: [usize; 4], value: f64) -> Result<()> {
        self.check_index(idx)?;
        let off = self.offset(idx);
        self.data[off] = value;
        Ok(())
    }
}
