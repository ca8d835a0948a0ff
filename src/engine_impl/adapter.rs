//! Assembly of storage containers from engine shell batches.

use tracing::debug;

use crate::engine_impl::engine::{IntegralEngine, IntegralKind};
use crate::error::{Result, TensorError};
use crate::matrix_impl::{DenseMatrix, PackedMatrix};
use crate::tensor_impl::{pair_index, EriFold4, RiTensor};

/// Per-shell offsets into the contiguous basis-function range, plus the
/// total basis dimension.
fn shell_offsets<E: IntegralEngine>(engine: &E) -> (Vec<usize>, usize) {
    let mut offsets = Vec::with_capacity(engine.n_shells());
    let mut total = 0;
    for shell in 0..engine.n_shells() {
        offsets.push(total);
        total += engine.shell_dim(shell);
    }
    (offsets, total)
}

fn aux_shell_offsets<E: IntegralEngine>(engine: &E) -> (Vec<usize>, usize) {
    let mut offsets = Vec::with_capacity(engine.n_aux_shells());
    let mut total = 0;
    for shell in 0..engine.n_aux_shells() {
        offsets.push(total);
        total += engine.aux_shell_dim(shell);
    }
    (offsets, total)
}

fn check_batch_len(buf: &[f64], expected: usize, shells: &[usize]) -> Result<()> {
    if buf.len() != expected {
        return Err(TensorError::InvalidInput(format!(
            "engine returned {} values for shell batch {:?}, expected {}",
            buf.len(),
            shells,
            expected
        )));
    }
    Ok(())
}

/// Assemble a one-electron matrix from shell-pair batches.
///
/// One-electron operators are Hermitian over real orbitals, so only the
/// `i <= j` shell pairs are evaluated and the transpose block is mirrored.
pub fn build_matrix<E: IntegralEngine>(engine: &E, kind: IntegralKind) -> Result<DenseMatrix> {
    if !kind.is_one_electron() {
        return Err(TensorError::InvalidInput(format!(
            "{:?} does not assemble into a one-electron matrix",
            kind
        )));
    }
    let (offsets, n) = shell_offsets(engine);
    let context = engine.prepare(kind);
    let mut out = DenseMatrix::zeros([n, n]);

    for i in 0..engine.n_shells() {
        let di = engine.shell_dim(i);
        for j in i..engine.n_shells() {
            let dj = engine.shell_dim(j);
            let shells = [i, j];
            let buf = engine.compute_batch(kind, &shells, &context);
            check_batch_len(&buf, di * dj, &shells)?;
            for b in 0..dj {
                for a in 0..di {
                    let v = buf[a + di * b];
                    out[[offsets[i] + a, offsets[j] + b]] = v;
                    out[[offsets[j] + b, offsets[i] + a]] = v;
                }
            }
        }
    }
    debug!(kind = ?kind, n, "assembled one-electron matrix");
    Ok(out)
}

/// Assemble a one-electron matrix directly into packed storage.
pub fn build_packed<E: IntegralEngine>(engine: &E, kind: IntegralKind) -> Result<PackedMatrix> {
    let dense = build_matrix(engine, kind)?;
    // The mirrored assembly above is symmetric by construction.
    PackedMatrix::from_dense_trusting(&dense)
}

/// Assemble the folded two-electron tensor from canonical shell quadruples.
///
/// Only quadruples with `i <= j`, `k <= l`, and ascending shell-pair index
/// are evaluated; the folded set/get canonicalization distributes each
/// value to its whole symmetry orbit.
pub fn build_eri<E: IntegralEngine>(engine: &E) -> Result<EriFold4> {
    let (offsets, n) = shell_offsets(engine);
    let context = engine.prepare(IntegralKind::ElectronRepulsion);
    let mut out = EriFold4::zeros(n);

    let nsh = engine.n_shells();
    for i in 0..nsh {
        let di = engine.shell_dim(i);
        for j in i..nsh {
            let dj = engine.shell_dim(j);
            let ij = pair_index(i, j);
            for k in 0..nsh {
                let dk = engine.shell_dim(k);
                for l in k..nsh {
                    if pair_index(k, l) < ij {
                        continue;
                    }
                    let dl = engine.shell_dim(l);
                    let shells = [i, j, k, l];
                    let buf =
                        engine.compute_batch(IntegralKind::ElectronRepulsion, &shells, &context);
                    check_batch_len(&buf, di * dj * dk * dl, &shells)?;
                    for d in 0..dl {
                        for c in 0..dk {
                            for b in 0..dj {
                                for a in 0..di {
                                    let v = buf[a + di * (b + dj * (c + dk * d))];
                                    out.set(
                                        offsets[i] + a,
                                        offsets[j] + b,
                                        offsets[k] + c,
                                        offsets[l] + d,
                                        v,
                                    )?;
                                }
                            }
                        }
                    }
                }
            }
        }
    }
    debug!(n, "assembled folded two-electron tensor");
    Ok(out)
}

/// Assemble the three-center fitting tensor from shell-pair x auxiliary
/// batches. The orbital pair of `(mu nu|P)` is symmetric over real
/// orbitals, so `i <= j` batches are mirrored into both slots.
pub fn build_ri<E: IntegralEngine>(engine: &E) -> Result<RiTensor> {
    let (offsets, n) = shell_offsets(engine);
    let (aux_offsets, naux) = aux_shell_offsets(engine);
    if naux == 0 {
        return Err(TensorError::InvalidInput(
            "engine exposes no auxiliary basis".to_string(),
        ));
    }
    let context = engine.prepare(IntegralKind::ThreeCenter2e);
    let mut out = RiTensor::zeros(n, n, naux);

    let nsh = engine.n_shells();
    for i in 0..nsh {
        let di = engine.shell_dim(i);
        for j in i..nsh {
            let dj = engine.shell_dim(j);
            for aux in 0..engine.n_aux_shells() {
                let dp = engine.aux_shell_dim(aux);
                let shells = [i, j, aux];
                let buf = engine.compute_batch(IntegralKind::ThreeCenter2e, &shells, &context);
                check_batch_len(&buf, di * dj * dp, &shells)?;
                for p in 0..dp {
                    for b in 0..dj {
                        for a in 0..di {
                            let v = buf[a + di * (b + dj * p)];
                            out.set(offsets[i] + a, offsets[j] + b, aux_offsets[aux] + p, v)?;
                            out.set(offsets[j] + b, offsets[i] + a, aux_offsets[aux] + p, v)?;
                        }
                    }
                }
            }
        }
    }
    debug!(n, naux, "assembled three-center fitting tensor");
    Ok(out)
}
