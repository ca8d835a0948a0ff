//! Tests for ERI/RI tensor storage and contractions

#[cfg(test)]
mod tests {
    use super::super::eri::{canonical_quad, unpack_pair};
    use super::super::{pair_index, quad_multiplicity, symmetry_orbit, EriFold4, EriFull, RiTensor, Tensor4};
    use crate::error::TensorError;
    use crate::matrix_impl::DenseMatrix;
    use approx::assert_relative_eq;
    use itertools::iproduct;

    /// A symmetric ERI tensor with deterministic, orbit-constant values.
    fn synthetic_eri(n: usize) -> EriFull {
        let mut full = EriFull::zeros(n);
        for (p, q, r, s) in iproduct!(0..n, 0..n, 0..n, 0..n) {
            let (a, b, c, d) = canonical_quad(p, q, r, s);
            let pq = pair_index(a, b) as f64;
            let rs = pair_index(c, d) as f64;
            let v = 1.0 / (1.0 + pq + rs) + 0.01 * pq * rs;
            full.set(p, q, r, s, v).unwrap();
        }
        full
    }

    fn asymmetric_density(n: usize) -> DenseMatrix {
        let mut d = DenseMatrix::zeros([n, n]);
        for j in 0..n {
            for i in 0..n {
                d[[i, j]] = 0.3 + (i as f64) - 0.7 * (j as f64) + 0.05 * ((i * j) as f64);
            }
        }
        d
    }

    #[test]
    fn test_pair_index_is_order_insensitive() {
        assert_eq!(pair_index(2, 5), pair_index(5, 2));
        // Column-major triangle enumeration: (0,0), (0,1), (1,1), (0,2), ...
        assert_eq!(pair_index(0, 0), 0);
        assert_eq!(pair_index(0, 1), 1);
        assert_eq!(pair_index(1, 1), 2);
        assert_eq!(pair_index(0, 2), 3);
    }

    #[test]
    fn test_unpack_pair_round_trip() {
        for idx in 0..120 {
            let (i, j) = unpack_pair(idx);
            assert!(i <= j);
            assert_eq!(pair_index(i, j), idx);
        }
    }

    #[test]
    fn test_canonical_quad_is_a_fixed_point() {
        for (p, q, r, s) in iproduct!(0..4, 0..4, 0..4, 0..4) {
            let canon = canonical_quad(p, q, r, s);
            // Canonicalizing any orbit member lands on the same representative.
            for (a, b, c, d) in symmetry_orbit(p, q, r, s) {
                assert_eq!(canonical_quad(a, b, c, d), canon);
            }
        }
    }

    #[test]
    fn test_quad_multiplicity_matches_orbit_size() {
        assert_eq!(quad_multiplicity(0, 0, 0, 0), 1);
        assert_eq!(quad_multiplicity(0, 0, 1, 1), 2);
        assert_eq!(quad_multiplicity(0, 1, 0, 1), 4);
        assert_eq!(quad_multiplicity(0, 1, 2, 3), 8);
        for (p, q, r, s) in iproduct!(0..4, 0..4, 0..4, 0..4) {
            assert_eq!(
                symmetry_orbit(p, q, r, s).len(),
                quad_multiplicity(p, q, r, s),
                "orbit mismatch at ({},{},{},{})",
                p,
                q,
                r,
                s
            );
        }
    }

    #[test]
    fn test_fold4_get_agrees_across_all_permutations() {
        let mut folded = EriFold4::zeros(5);
        folded.set(1, 3, 0, 2, 0.75).unwrap();
        let reference = folded.get(1, 3, 0, 2).unwrap();
        for (a, b, c, d) in symmetry_orbit(1, 3, 0, 2) {
            assert_eq!(folded.get(a, b, c, d).unwrap(), reference);
        }
        // Writing through a non-canonical tuple targets the same slot.
        folded.set(2, 0, 3, 1, -0.25).unwrap();
        assert_eq!(folded.get(1, 3, 0, 2).unwrap(), -0.25);
    }

    #[test]
    fn test_fold4_bounds_checking() {
        let folded = EriFold4::zeros(3);
        assert!(matches!(
            folded.get(0, 3, 0, 0),
            Err(TensorError::Index {
                index: 3,
                axis: 1,
                extent: 3
            })
        ));
    }

    #[test]
    fn test_from_full_verifies_symmetry() {
        let full = synthetic_eri(4);
        let folded = EriFold4::from_full(&full, 1e-12).unwrap();
        let restored = folded.to_full();
        assert_eq!(restored.data, full.data);

        // Break one permutation equality and the fold must fail.
        let mut broken = full.clone();
        broken.set(2, 1, 0, 3, 99.0).unwrap();
        match EriFold4::from_full(&broken, 1e-8) {
            Err(TensorError::QuadSymmetry { delta, .. }) => assert!(delta > 1.0),
            other => panic!("expected quad symmetry error, got {:?}", other),
        }
        // Trust mode keeps only the canonical slots and ignores the rest.
        let trusted = EriFold4::from_full_trusting(&broken);
        assert_eq!(
            trusted.get(2, 1, 0, 3).unwrap(),
            full.get(1, 2, 0, 3).unwrap()
        );
    }

    #[test]
    fn test_fold_round_trip_idempotent() {
        let full = synthetic_eri(3);
        let once = EriFold4::from_full(&full, 1e-12).unwrap();
        let twice = EriFold4::from_full(&once.to_full(), 1e-12).unwrap();
        assert_eq!(once.data, twice.data);
    }

    #[test]
    fn test_coulomb_hand_computed() {
        // Two orbitals, six unique integrals.
        let mut folded = EriFold4::zeros(2);
        folded.set(0, 0, 0, 0, 1.0).unwrap();
        folded.set(0, 0, 0, 1, 0.5).unwrap();
        folded.set(0, 0, 1, 1, 0.25).unwrap();
        folded.set(0, 1, 0, 1, 0.125).unwrap();
        folded.set(0, 1, 1, 1, 0.3).unwrap();
        folded.set(1, 1, 1, 1, 0.8).unwrap();
        let density = DenseMatrix::from_vec([2, 2], vec![1.0, 3.0, 2.0, 4.0]).unwrap();

        let j = folded.coulomb_matrix(&density).unwrap();
        assert_relative_eq!(j[[0, 0]], 4.5, epsilon = 1e-12);
        assert_relative_eq!(j[[0, 1]], 2.325, epsilon = 1e-12);
        assert_relative_eq!(j[[1, 0]], 2.325, epsilon = 1e-12);
        assert_relative_eq!(j[[1, 1]], 4.95, epsilon = 1e-12);

        let k = folded.exchange_matrix(&density).unwrap();
        assert_relative_eq!(k[[0, 0]], 4.0, epsilon = 1e-12);
        assert_relative_eq!(k[[0, 1]], 2.575, epsilon = 1e-12);
        assert_relative_eq!(k[[1, 0]], 2.7, epsilon = 1e-12);
        assert_relative_eq!(k[[1, 1]], 4.825, epsilon = 1e-12);

        // The unfolded representation must give the same answer.
        let full = folded.to_full();
        let j_full = full.coulomb_matrix(&density).unwrap();
        let k_full = full.exchange_matrix(&density).unwrap();
        for (a, b) in j.data.iter().zip(j_full.data.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
        for (a, b) in k.data.iter().zip(k_full.data.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_contraction_full_vs_folded() {
        for n in [4usize, 10] {
            let full = synthetic_eri(n);
            let folded = EriFold4::from_full(&full, 1e-12).unwrap();
            let density = asymmetric_density(n);

            let j_full = full.coulomb_matrix(&density).unwrap();
            let j_fold = folded.coulomb_matrix(&density).unwrap();
            let k_full = full.exchange_matrix(&density).unwrap();
            let k_fold = folded.exchange_matrix(&density).unwrap();

            for (a, b) in j_full.data.iter().zip(j_fold.data.iter()) {
                assert_relative_eq!(a, b, epsilon = 1e-10, max_relative = 1e-10);
            }
            for (a, b) in k_full.data.iter().zip(k_fold.data.iter()) {
                assert_relative_eq!(a, b, epsilon = 1e-10, max_relative = 1e-10);
            }
        }
    }

    #[test]
    fn test_contraction_shape_mismatch() {
        let full = synthetic_eri(3);
        let density = DenseMatrix::zeros([4, 4]);
        assert!(matches!(
            full.coulomb_matrix(&density),
            Err(TensorError::InvalidInput(_))
        ));
        let folded = EriFold4::from_full(&full, 1e-12).unwrap();
        assert!(matches!(
            folded.exchange_matrix(&density),
            Err(TensorError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_ri_layout_and_access() {
        let mut b = RiTensor::zeros(2, 3, 2);
        b.set(1, 2, 1, 5.0).unwrap();
        assert_eq!(b.get(1, 2, 1).unwrap(), 5.0);
        // (mu, nu, P) at mu + nbas1 (nu + nbas2 P): last element of the buffer.
        assert_eq!(b.data[11], 5.0);
        assert!(matches!(
            b.get(2, 0, 0),
            Err(TensorError::Index {
                index: 2,
                axis: 0,
                extent: 2
            })
        ));
        let slab = b.aux_slice(1).unwrap();
        assert_eq!(slab.len(), 6);
        assert_eq!(slab[5], 5.0);
    }

    #[test]
    fn test_ri_contraction_matches_factorized_full_tensor() {
        // With G(ab|cd) = sum_P B_P[a,b] B_P[c,d] the RI contractions are
        // exact, so they must reproduce the 4-index paths on G.
        let n = 3;
        let naux = 4;
        let mut b = RiTensor::zeros(n, n, naux);
        for p in 0..naux {
            for nu in 0..n {
                for mu in 0..n {
                    let v = 0.2 + 0.1 * (mu as f64) + 0.07 * (nu as f64) - 0.03 * (p as f64)
                        + 0.01 * ((mu * nu * (p + 1)) as f64);
                    b.set(mu, nu, p, v).unwrap();
                }
            }
        }
        let mut g = EriFull::zeros(n);
        for (pp, qq, rr, ss) in iproduct!(0..n, 0..n, 0..n, 0..n) {
            let mut acc = 0.0;
            for p in 0..naux {
                acc += b.get(pp, qq, p).unwrap() * b.get(rr, ss, p).unwrap();
            }
            g.set(pp, qq, rr, ss, acc).unwrap();
        }

        let density = asymmetric_density(n);
        let j_ri = b.coulomb_matrix(&density).unwrap();
        let j_ref = g.coulomb_matrix(&density).unwrap();
        let k_ri = b.exchange_matrix(&density).unwrap();
        let k_ref = g.exchange_matrix(&density).unwrap();
        for (a, r) in j_ri.data.iter().zip(j_ref.data.iter()) {
            assert_relative_eq!(a, r, epsilon = 1e-10, max_relative = 1e-10);
        }
        for (a, r) in k_ri.data.iter().zip(k_ref.data.iter()) {
            assert_relative_eq!(a, r, epsilon = 1e-10, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_ri_requires_square_orbital_block() {
        let b = RiTensor::zeros(2, 3, 1);
        let density = DenseMatrix::zeros([2, 3]);
        assert!(matches!(
            b.coulomb_matrix(&density),
            Err(TensorError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_tensor4_strides_and_access() {
        let mut t = Tensor4::zeros([2, 3, 4, 5]);
        assert_eq!(t.indicing, [1, 2, 6, 24]);
        t.set([1, 2, 3, 4], 7.0).unwrap();
        assert_eq!(t.get([1, 2, 3, 4]).unwrap(), 7.0);
        assert_eq!(t.data[1 + 2 * 2 + 3 * 6 + 4 * 24], 7.0);
        assert!(matches!(
            t.get([0, 0, 4, 0]),
            Err(TensorError::Index {
                index: 4,
                axis: 2,
                extent: 4
            })
        ));
        assert!(Tensor4::from_vec([2, 2, 2, 2], vec![0.0; 15]).is_err());
    }

    #[test]
    fn test_zero_extent_tensors_are_valid() {
        let full = EriFull::zeros(0);
        assert!(full.data.is_empty());
        let folded = EriFold4::zeros(0);
        assert!(folded.data.is_empty());
        let ri = RiTensor::zeros(0, 0, 3);
        assert!(ri.data.is_empty());
    }
}
