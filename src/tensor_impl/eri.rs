//! Storage for two-electron repulsion integrals `(pq|rs)`.
//!
//! Two layouts are provided. [`EriFull`] keeps all `n^4` values and makes no
//! symmetry assumption, for asymmetric index ranges and benchmarking.
//! [`EriFold4`] stores one value per orbit of the 8-element real-orbital
//! permutation group
//!
//! ```text
//! (pq|rs) = (qp|rs) = (pq|sr) = (qp|sr) = (rs|pq) = (sr|pq) = (rs|qp) = (sr|qp)
//! ```
//!
//! by packing the `(p,q)` and `(r,s)` pairs with the same upper-triangle map
//! used for symmetric matrices, then packing the resulting pair of pair
//! indices once more.

use rayon::prelude::*;

use crate::error::{Result, TensorError};
use crate::matrix_impl::packed_index;
use crate::matrix_impl::DenseMatrix;

/// Canonical packed index of the unordered pair `{i, j}`.
///
/// Pure and order-insensitive: `pair_index(i, j) == pair_index(j, i)`.
#[inline]
pub fn pair_index(i: usize, j: usize) -> usize {
    let (lo, hi) = if i <= j { (i, j) } else { (j, i) };
    packed_index(lo, hi)
}

/// Inverse of the packed pair map: returns `(i, j)` with `i <= j`.
pub(crate) fn unpack_pair(idx: usize) -> (usize, usize) {
    // Solve j (j + 1) / 2 <= idx by the closed form, then fix up rounding.
    let mut j = (((8 * idx + 1) as f64).sqrt() as usize).saturating_sub(1) / 2;
    while (j + 1) * (j + 2) / 2 <= idx {
        j += 1;
    }
    (idx - j * (j + 1) / 2, j)
}

/// Canonical representative of a quadruple under the 8-fold ERI symmetry:
/// both pairs sorted, then the pair with the smaller packed index first.
pub(crate) fn canonical_quad(
    p: usize,
    q: usize,
    r: usize,
    s: usize,
) -> (usize, usize, usize, usize) {
    let (p, q) = if p <= q { (p, q) } else { (q, p) };
    let (r, s) = if r <= s { (r, s) } else { (s, r) };
    if pair_index(p, q) <= pair_index(r, s) {
        (p, q, r, s)
    } else {
        (r, s, p, q)
    }
}

/// Orbit size of a quadruple under the ERI symmetry group: 1, 2, 4, or 8.
///
/// This is the number of *distinct* logical index tuples that share one
/// stored slot, i.e. the multiplicity a folded value carries in any sum
/// over all four indices.
pub fn quad_multiplicity(p: usize, q: usize, r: usize, s: usize) -> usize {
    let bra = if p == q { 1 } else { 2 };
    let ket = if r == s { 1 } else { 2 };
    let sides = if pair_index(p, q) == pair_index(r, s) {
        1
    } else {
        2
    };
    bra * ket * sides
}

/// The distinct index tuples equivalent to `(p,q,r,s)` under the ERI
/// symmetry group, in a fixed enumeration order.
///
/// The length always equals [`quad_multiplicity`]. Folded contractions walk
/// this orbit to expand the implicit symmetry sum exactly, instead of
/// weighting stored values by fractional degeneracy factors.
pub fn symmetry_orbit(p: usize, q: usize, r: usize, s: usize) -> Vec<(usize, usize, usize, usize)> {
    let candidates = [
        (p, q, r, s),
        (q, p, r, s),
        (p, q, s, r),
        (q, p, s, r),
        (r, s, p, q),
        (s, r, p, q),
        (r, s, q, p),
        (s, r, q, p),
    ];
    let mut orbit = Vec::with_capacity(8);
    for t in candidates {
        if !orbit.contains(&t) {
            orbit.push(t);
        }
    }
    orbit
}

/// Dense, unfolded storage for a 4-index ERI tensor over `n` orbitals.
///
/// Column-major: `(p,q,r,s)` lives at `p + n (q + n (r + n s))`. Every
/// logical permutation has its own physical slot.
#[derive(Clone, Debug, PartialEq)]
pub struct EriFull {
    pub data: Vec<f64>,
    pub n: usize,
}

impl EriFull {
    /// Create an `n^4` tensor filled with zeros.
    pub fn zeros(n: usize) -> Self {
        EriFull {
            data: vec![0.0; n * n * n * n],
            n,
        }
    }

    fn check_index(&self, idx: [usize; 4]) -> Result<()> {
        for (axis, &i) in idx.iter().enumerate() {
            if i >= self.n {
                return Err(TensorError::Index {
                    index: i,
                    axis,
                    extent: self.n,
                });
            }
        }
        Ok(())
    }

    #[inline]
    fn offset(&self, p: usize, q: usize, r: usize, s: usize) -> usize {
        let n = self.n;
        p + n * (q + n * (r + n * s))
    }

    /// Bounds-checked element read.
    pub fn get(&self, p: usize, q: usize, r: usize, s: usize) -> Result<f64> {
        self.check_index([p, q, r, s])?;
        Ok(self.data[self.offset(p, q, r, s)])
    }

    /// Bounds-checked element write to the `(p,q,r,s)` slot only.
    pub fn set(&mut self, p: usize, q: usize, r: usize, s: usize, value: f64) -> Result<()> {
        self.check_index([p, q, r, s])?;
        let off = self.offset(p, q, r, s);
        self.data[off] = value;
        Ok(())
    }

    /// Coulomb matrix `J_pq = sum_rs (pq|rs) D_rs`.
    pub fn coulomb_matrix(&self, density: &DenseMatrix) -> Result<DenseMatrix> {
        self.check_density(density)?;
        let n = self.n;
        let cols: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|q| {
                let mut col = vec![0.0; n];
                for p in 0..n {
                    let mut acc = 0.0;
                    for s in 0..n {
                        for r in 0..n {
                            acc += self.data[self.offset(p, q, r, s)] * density[[r, s]];
                        }
                    }
                    col[p] = acc;
                }
                col
            })
            .collect();
        Ok(Self::from_columns(n, cols))
    }

    /// Exchange matrix `K_pq = sum_rs (pr|qs) D_rs`.
    pub fn exchange_matrix(&self, density: &DenseMatrix) -> Result<DenseMatrix> {
        self.check_density(density)?;
        let n = self.n;
        let cols: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|q| {
                let mut col = vec![0.0; n];
                for p in 0..n {
                    let mut acc = 0.0;
                    for s in 0..n {
                        for r in 0..n {
                            acc += self.data[self.offset(p, r, q, s)] * density[[r, s]];
                        }
                    }
                    col[p] = acc;
                }
                col
            })
            .collect();
        Ok(Self::from_columns(n, cols))
    }

    fn check_density(&self, density: &DenseMatrix) -> Result<()> {
        if density.size != [self.n, self.n] {
            return Err(TensorError::InvalidInput(format!(
                "density matrix is {}x{}, tensor extent is {}",
                density.nrows(),
                density.ncols(),
                self.n
            )));
        }
        Ok(())
    }

    fn from_columns(n: usize, cols: Vec<Vec<f64>>) -> DenseMatrix {
        let mut out = DenseMatrix::zeros([n, n]);
        for (q, col) in cols.into_iter().enumerate() {
            for (p, v) in col.into_iter().enumerate() {
                out[[p, q]] = v;
            }
        }
        out
    }
}

/// Folded storage for a 4-index ERI tensor over `n` orbitals, one slot per
/// symmetry orbit: `n(n+1)/2 (n(n+1)/2 + 1) / 2` elements.
///
/// Get and set canonicalize the index tuple first, so callers never need to
/// know the canonical order.
#[derive(Clone, Debug, PartialEq)]
pub struct EriFold4 {
    pub data: Vec<f64>,
    pub n: usize,
    pub npair: usize,
}

impl EriFold4 {
    /// Create a folded tensor over `n` orbitals filled with zeros.
    pub fn zeros(n: usize) -> Self {
        let npair = n * (n + 1) / 2;
        EriFold4 {
            data: vec![0.0; npair * (npair + 1) / 2],
            n,
            npair,
        }
    }

    fn check_index(&self, idx: [usize; 4]) -> Result<()> {
        for (axis, &i) in idx.iter().enumerate() {
            if i >= self.n {
                return Err(TensorError::Index {
                    index: i,
                    axis,
                    extent: self.n,
                });
            }
        }
        Ok(())
    }

    #[inline]
    fn offset(&self, p: usize, q: usize, r: usize, s: usize) -> usize {
        pair_index(pair_index(p, q), pair_index(r, s))
    }

    /// Bounds-checked read; all 8 symmetry-equivalent tuples return the
    /// same stored value.
    pub fn get(&self, p: usize, q: usize, r: usize, s: usize) -> Result<f64> {
        self.check_index([p, q, r, s])?;
        Ok(self.data[self.offset(p, q, r, s)])
    }

    /// Bounds-checked write to the canonical slot of the orbit.
    pub fn set(&mut self, p: usize, q: usize, r: usize, s: usize, value: f64) -> Result<()> {
        self.check_index([p, q, r, s])?;
        let off = self.offset(p, q, r, s);
        self.data[off] = value;
        Ok(())
    }

    /// Fold a full tensor, verifying every permutation-symmetry equality.
    ///
    /// The stored value is the one at the canonical tuple; any of the other
    /// seven slots deviating from it by more than `tolerance` fails with a
    /// `QuadSymmetry` error naming the violating tuple.
    pub fn from_full(full: &EriFull, tolerance: f64) -> Result<Self> {
        let mut folded = Self::zeros(full.n);
        for (_, _, p, q, r, s) in canonical_quads(full.n) {
            let reference = full.data[full.offset(p, q, r, s)];
            for (a, b, c, d) in symmetry_orbit(p, q, r, s) {
                let delta = (full.data[full.offset(a, b, c, d)] - reference).abs();
                if delta > tolerance {
                    return Err(TensorError::QuadSymmetry {
                        p: a,
                        q: b,
                        r: c,
                        s: d,
                        delta,
                        tolerance,
                    });
                }
            }
            let idx = folded.offset(p, q, r, s);
            folded.data[idx] = reference;
        }
        Ok(folded)
    }

    /// Fold a full tensor taking the canonical slot verbatim, without a
    /// symmetry check.
    pub fn from_full_trusting(full: &EriFull) -> Self {
        let mut folded = Self::zeros(full.n);
        for (_, _, p, q, r, s) in canonical_quads(full.n) {
            let idx = folded.offset(p, q, r, s);
            folded.data[idx] = full.data[full.offset(p, q, r, s)];
        }
        folded
    }

    /// Expand to dense `n^4` storage. Lossless.
    pub fn to_full(&self) -> EriFull {
        let mut full = EriFull::zeros(self.n);
        for (_, _, p, q, r, s) in canonical_quads(self.n) {
            let v = self.data[self.offset(p, q, r, s)];
            for (a, b, c, d) in symmetry_orbit(p, q, r, s) {
                let off = full.offset(a, b, c, d);
                full.data[off] = v;
            }
        }
        full
    }

    /// Coulomb matrix `J_pq = sum_rs (pq|rs) D_rs`.
    ///
    /// Walks each stored orbit once and scatters the value over its distinct
    /// member tuples, so every logical term of the unfolded sum is counted
    /// exactly once. Agrees with [`EriFull::coulomb_matrix`] to float
    /// round-off for symmetric input.
    pub fn coulomb_matrix(&self, density: &DenseMatrix) -> Result<DenseMatrix> {
        self.check_density(density)?;
        let n = self.n;
        let out = (0..self.npair)
            .into_par_iter()
            .fold(
                || DenseMatrix::zeros([n, n]),
                |mut acc, rs| {
                    let (r0, s0) = unpack_pair(rs);
                    for pq in 0..=rs {
                        let (p0, q0) = unpack_pair(pq);
                        let v = self.data[packed_index(pq, rs)];
                        if v == 0.0 {
                            continue;
                        }
                        for (a, b, c, d) in symmetry_orbit(p0, q0, r0, s0) {
                            // (ab|cd) contributes v * D[c, d] to J[a, b].
                            acc[[a, b]] += v * density[[c, d]];
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

    /// Exchange matrix `K_pq = sum_rs (pr|qs) D_rs`.
    pub fn exchange_matrix(&self, density: &DenseMatrix) -> Result<DenseMatrix> {
        self.check_density(density)?;
        let n = self.n;
        let out = (0..self.npair)
            .into_par_iter()
            .fold(
                || DenseMatrix::zeros([n, n]),
                |mut acc, rs| {
                    let (r0, s0) = unpack_pair(rs);
                    for pq in 0..=rs {
                        let (p0, q0) = unpack_pair(pq);
                        let v = self.data[packed_index(pq, rs)];
                        if v == 0.0 {
                            continue;
                        }
                        for (a, b, c, d) in symmetry_orbit(p0, q0, r0, s0) {
                            // (ab|cd) contributes v * D[b, d] to K[a, c].
                            acc[[a, c]] += v * density[[b, d]];
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

    fn check_density(&self, density: &DenseMatrix) -> Result<()> {
        if density.size != [self.n, self.n] {
            return Err(TensorError::InvalidInput(format!(
                "density matrix is {}x{}, tensor extent is {}",
                density.nrows(),
                density.ncols(),
                self.n
            )));
        }
        Ok(())
    }
}

/// Enumerate canonical quadruples `(pq, rs, p, q, r, s)` with `p <= q`,
/// `r <= s`, and `pair(p,q) <= pair(r,s)`.
fn canonical_quads(n: usize) -> impl Iterator<Item = (usize, usize, usize, usize, usize, usize)> {
    let npair = n * (n + 1) / 2;
    (0..npair).flat_map(move |rs| {
        let (r, s) = unpack_pair(rs);
        (0..=rs).map(move |pq| {
            let (p, q) = unpack_pair(pq);
            (pq, rs, p, q, r, s)
        })
    })
}
