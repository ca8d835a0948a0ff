//! Tests for dense/packed matrices and views

#[cfg(test)]
mod tests {
    use super::super::{DenseMatrix, PackedMatrix};
    use crate::error::TensorError;
    use approx::assert_relative_eq;

    fn symmetric_3x3() -> DenseMatrix {
        DenseMatrix::from_vec(
            [3, 3],
            vec![
                2.0, -1.0, 0.5, //
                -1.0, 3.0, 1.5, //
                0.5, 1.5, 4.0,
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_dense_column_major_layout() {
        let m = DenseMatrix::from_vec([2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        // Element (i, j) sits at i + j * rows.
        assert_eq!(m.get(0, 0).unwrap(), 1.0);
        assert_eq!(m.get(1, 0).unwrap(), 2.0);
        assert_eq!(m.get(0, 1).unwrap(), 3.0);
        assert_eq!(m.get(1, 2).unwrap(), 6.0);
        assert_eq!(m.column(1).unwrap(), &[3.0, 4.0]);
    }

    #[test]
    fn test_dense_bounds_checking() {
        let mut m = DenseMatrix::zeros([2, 2]);
        assert!(matches!(
            m.get(2, 0),
            Err(TensorError::Index {
                index: 2,
                axis: 0,
                extent: 2
            })
        ));
        assert!(matches!(m.set(0, 5, 1.0), Err(TensorError::Index { .. })));
        // A failed write leaves the container untouched.
        assert_eq!(m.data, vec![0.0; 4]);
    }

    #[test]
    fn test_dense_from_vec_length_mismatch() {
        let result = DenseMatrix::from_vec([2, 2], vec![1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(TensorError::InvalidInput(_))));
    }

    #[test]
    fn test_zero_extent_matrix_is_valid() {
        let m = DenseMatrix::zeros([0, 3]);
        assert_eq!(m.nrows(), 0);
        assert_eq!(m.ncols(), 3);
        assert!(m.data.is_empty());
        let p = PackedMatrix::zeros(0);
        assert!(p.data.is_empty());
    }

    #[test]
    fn test_packed_round_trip_exact() {
        let m = symmetric_3x3();
        let packed = PackedMatrix::from_dense(&m, 1e-12).unwrap();
        assert_eq!(packed.data.len(), 6);
        let restored = packed.to_dense();
        assert_eq!(restored.data, m.data);
    }

    #[test]
    fn test_packed_round_trip_idempotent() {
        let m = symmetric_3x3();
        let once = PackedMatrix::from_dense(&m, 1e-12).unwrap();
        let twice = PackedMatrix::from_dense(&once.to_dense(), 1e-12).unwrap();
        assert_eq!(once.data, twice.data);
        assert_eq!(once.to_dense().data, twice.to_dense().data);
    }

    #[test]
    fn test_packed_symmetry_check_fails() {
        let mut m = symmetric_3x3();
        m.set(0, 2, 0.6).unwrap(); // now a_02 != a_20
        let result = PackedMatrix::from_dense(&m, 1e-8);
        match result {
            Err(TensorError::Symmetry { i, j, delta, .. }) => {
                assert_eq!((i, j), (0, 2));
                assert_relative_eq!(delta, 0.1, epsilon = 1e-12);
            }
            other => panic!("expected symmetry error, got {:?}", other),
        }
        // Trust mode folds the upper triangle without complaint.
        let trusted = PackedMatrix::from_dense_trusting(&m).unwrap();
        assert_eq!(trusted.get(0, 2).unwrap(), 0.6);
        assert_eq!(trusted.get(2, 0).unwrap(), 0.6);
    }

    #[test]
    fn test_packed_canonical_write() {
        let mut p = PackedMatrix::zeros(4);
        p.set(3, 1, 7.5).unwrap(); // writes through the (1, 3) slot
        assert_eq!(p.get(1, 3).unwrap(), 7.5);
        assert_eq!(p.get(3, 1).unwrap(), 7.5);
    }

    #[test]
    fn test_packed_matvec_matches_dense() {
        let m = symmetric_3x3();
        let packed = PackedMatrix::from_dense(&m, 1e-12).unwrap();
        let x = vec![1.0, -2.0, 0.5];
        let y_dense = m.matvec(&x).unwrap();
        let y_packed = packed.matvec(&x).unwrap();
        for (a, b) in y_dense.iter().zip(y_packed.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_dense_arithmetic() {
        let mut a = symmetric_3x3();
        let b = symmetric_3x3();
        a.add_assign_scaled(&b, -1.0).unwrap();
        assert!(a.data.iter().all(|&v| v == 0.0));

        let mut c = symmetric_3x3();
        c.scale(2.0);
        assert_eq!(c.get(1, 1).unwrap(), 6.0);

        let wrong = DenseMatrix::zeros([2, 2]);
        assert!(matches!(
            c.add_assign_scaled(&wrong, 1.0),
            Err(TensorError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_view_read_and_write_through() {
        let mut m = DenseMatrix::zeros([4, 4]);
        for j in 0..4 {
            for i in 0..4 {
                m[[i, j]] = (i * 4 + j) as f64;
            }
        }

        let view = m.view(1..3, 1..3).unwrap();
        assert_eq!(view.nrows(), 2);
        assert_eq!(view.get(0, 0).unwrap(), 5.0);
        assert_eq!(view.get(1, 1).unwrap(), 10.0);
        let sub = view.to_owned();
        assert_eq!(sub.size, [2, 2]);
        assert_eq!(sub[[0, 1]], 6.0);

        let mut window = m.view_mut(1..3, 1..3).unwrap();
        window.set(0, 0, -1.0).unwrap();
        window.fill(9.0);
        drop(window);
        // Writes through the exclusive view are visible via the owner.
        assert_eq!(m.get(1, 1).unwrap(), 9.0);
        assert_eq!(m.get(2, 2).unwrap(), 9.0);
        assert_eq!(m.get(0, 0).unwrap(), 0.0);
        assert_eq!(m.get(3, 3).unwrap(), 15.0);
    }

    #[test]
    fn test_view_out_of_bounds() {
        let mut m = DenseMatrix::zeros([3, 3]);
        assert!(matches!(
            m.view(0..4, 0..3),
            Err(TensorError::Range {
                start: 0,
                end: 4,
                extent: 3
            })
        ));
        assert!(matches!(m.view(2..1, 0..3), Err(TensorError::Range { .. })));
        assert!(matches!(
            m.view_mut(0..3, 1..5),
            Err(TensorError::Range { .. })
        ));
    }

    #[test]
    fn test_view_iteration_is_lazy_and_restartable() {
        let m = DenseMatrix::from_vec([2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let view = m.view(0..2, 0..3).unwrap();
        // Column-major order over the window.
        let all: Vec<f64> = view.iter().collect();
        assert_eq!(all, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        // A second pass starts from scratch.
        let again: Vec<f64> = view.iter().collect();
        assert_eq!(all, again);
        let stepped: Vec<f64> = view.iter_stepped(2).collect();
        assert_eq!(stepped, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn test_view_copy_from() {
        let mut m = DenseMatrix::zeros([3, 3]);
        let block = DenseMatrix::from_vec([2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let mut window = m.view_mut(0..2, 1..3).unwrap();
        window.copy_from(&block).unwrap();
        let wrong = DenseMatrix::zeros([3, 1]);
        assert!(window.copy_from(&wrong).is_err());
        drop(window);
        assert_eq!(m.get(0, 1).unwrap(), 1.0);
        assert_eq!(m.get(1, 2).unwrap(), 4.0);
    }

    #[test]
    fn test_packed_view() {
        let m = symmetric_3x3();
        let packed = PackedMatrix::from_dense(&m, 1e-12).unwrap();
        let view = packed.as_view();
        assert_eq!(view.n(), 3);
        assert_eq!(view.get(2, 0).unwrap(), 0.5);
        assert_eq!(view.iter().count(), 6);
    }

    #[test]
    fn test_dmatrix_interop() {
        let m = symmetric_3x3();
        let dm = m.to_dmatrix();
        assert_eq!(dm[(0, 1)], -1.0);
        let back = DenseMatrix::from_dmatrix(&dm);
        assert_eq!(back, m);
    }
}
