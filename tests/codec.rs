use cwas_rsfmri::codec::{EdgeMask, matrix_to_vector, vector_to_matrix};
use cwas_rsfmri::error::CwasError;
use ndarray::{Array1, Array2};

#[test]
fn lower_triangular_mask_cardinality() {
    for n in 1..=8 {
        let mask = EdgeMask::lower_triangular(n);
        assert_eq!(mask.n_rois(), n);
        assert_eq!(mask.n_edges(), n * (n + 1) / 2);
    }
}

#[test]
fn concrete_four_roi_example() {
    let mask = EdgeMask::lower_triangular(4);
    assert_eq!(mask.n_edges(), 10);

    // Row-major lower-triangle order: (0,0), (1,0), (1,1), (2,0), ...
    let vector = Array1::from_vec(vec![1.0, 0.1, 1.0, 0.2, 0.3, 1.0, 0.4, 0.5, 0.6, 1.0]);
    let matrix = vector_to_matrix(vector.view(), &mask).expect("reconstruct");

    for i in 0..4 {
        assert_eq!(matrix[[i, i]], 1.0, "diagonal must not be doubled");
    }
    assert_eq!(matrix[[1, 0]], 0.1);
    assert_eq!(matrix[[2, 0]], 0.2);
    assert_eq!(matrix[[2, 1]], 0.3);
    assert_eq!(matrix[[3, 0]], 0.4);
    assert_eq!(matrix[[3, 1]], 0.5);
    assert_eq!(matrix[[3, 2]], 0.6);
    for i in 0..4 {
        for j in 0..4 {
            assert_eq!(matrix[[i, j]], matrix[[j, i]]);
        }
    }
}

#[test]
fn round_trip_is_exact() {
    for n in 1..=6 {
        let mask = EdgeMask::lower_triangular(n);
        let mut original = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in 0..=i {
                let v = 0.01 * (i * n + j) as f64 + 0.5;
                original[[i, j]] = v;
                original[[j, i]] = v;
            }
        }
        let vector = matrix_to_vector(original.view(), &mask).expect("vectorize");
        let rebuilt = vector_to_matrix(vector.view(), &mask).expect("reconstruct");
        for i in 0..n {
            for j in 0..n {
                assert!((rebuilt[[i, j]] - original[[i, j]]).abs() < 1e-12);
            }
        }
    }
}

#[test]
fn output_is_symmetric_for_any_vector() {
    let mask = EdgeMask::lower_triangular(5);
    let vector: Array1<f64> = (0..mask.n_edges()).map(|i| (i as f64).sin()).collect();
    let matrix = vector_to_matrix(vector.view(), &mask).expect("reconstruct");
    for i in 0..5 {
        for j in 0..5 {
            assert_eq!(matrix[[i, j]], matrix[[j, i]]);
        }
    }
}

#[test]
fn length_mismatch_fails_fast() {
    let mask = EdgeMask::lower_triangular(4);
    let vector = Array1::from_vec(vec![1.0; 9]);
    let err = vector_to_matrix(vector.view(), &mask).unwrap_err();
    assert!(matches!(
        err,
        CwasError::MaskMismatch {
            mask_edges: 10,
            vector_len: 9
        }
    ));
}
