use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::error::{CwasError, Result};

/// Boolean ROI x ROI mask defining the half-vector <-> matrix bijection.
///
/// Cell coordinates are cached in row-major order; that order is the edge
/// order of every connectivity vector and result vector in the pipeline and
/// is never re-sorted.
#[derive(Debug, Clone)]
pub struct EdgeMask {
    cells: Array2<bool>,
    coords: Vec<(usize, usize)>,
}

impl EdgeMask {
    pub fn new(cells: Array2<bool>) -> Result<Self> {
        if cells.nrows() != cells.ncols() {
            return Err(CwasError::InvalidArgument(format!(
                "edge mask must be square, got {}x{}",
                cells.nrows(),
                cells.ncols()
            )));
        }
        let coords = cells
            .indexed_iter()
            .filter(|&(_, &keep)| keep)
            .map(|((i, j), _)| (i, j))
            .collect();
        Ok(Self { cells, coords })
    }

    /// Lower-triangular mask including the diagonal, the standard connectome
    /// half-vectorization for an `n`-ROI atlas.
    pub fn lower_triangular(n: usize) -> Self {
        let cells = Array2::from_shape_fn((n, n), |(i, j)| j <= i);
        Self::new(cells).expect("square by construction")
    }

    pub fn n_rois(&self) -> usize {
        self.cells.nrows()
    }

    pub fn n_edges(&self) -> usize {
        self.coords.len()
    }

    /// Masked cell coordinates in row-major order.
    pub fn coords(&self) -> &[(usize, usize)] {
        &self.coords
    }

    pub fn cells(&self) -> ArrayView2<'_, bool> {
        self.cells.view()
    }
}

/// Scatters a half-vector into the masked cells, mirrors it by adding the
/// transpose, then halves the diagonal (counted once by the scatter and
/// doubled by the transpose add). The result is exactly symmetric and the
/// diagonal equals the stored value.
pub fn vector_to_matrix(vector: ArrayView1<'_, f64>, mask: &EdgeMask) -> Result<Array2<f64>> {
    if mask.n_edges() != vector.len() {
        return Err(CwasError::MaskMismatch {
            mask_edges: mask.n_edges(),
            vector_len: vector.len(),
        });
    }
    let n = mask.n_rois();
    let mut out = Array2::<f64>::zeros((n, n));
    for (&(i, j), &value) in mask.coords().iter().zip(vector.iter()) {
        out[[i, j]] = value;
    }
    let transposed = out.t().to_owned();
    out += &transposed;
    for i in 0..n {
        out[[i, i]] /= 2.0;
    }
    Ok(out)
}

/// Projects the masked cells of `matrix` into a half-vector in mask order.
/// Symmetry of the input is an upstream responsibility and is not checked.
pub fn matrix_to_vector(matrix: ArrayView2<'_, f64>, mask: &EdgeMask) -> Result<Array1<f64>> {
    let n = mask.n_rois();
    if matrix.nrows() != n || matrix.ncols() != n {
        return Err(CwasError::InvalidArgument(format!(
            "matrix is {}x{} but edge mask covers {n} ROIs",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    Ok(mask.coords().iter().map(|&(i, j)| matrix[[i, j]]).collect())
}
