//! Row-addressable feature matrices: dense row-major and CSR sparse.

use crate::error::TreeError;

/// Dense row-major feature storage.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DenseStorage {
    data: Vec<f64>,
    n_rows: usize,
    n_cols: usize,
}

/// Compressed-sparse-row feature storage.
///
/// Entries absent from a row read back as the caller-supplied default
/// (training passes NaN, which the split search skips).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CsrStorage {
    row_ptr: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<f64>,
    n_cols: usize,
}

/// An immutable, row-addressable numeric feature matrix.
///
/// Shared read-only across all trees of an ensemble; never mutated after
/// construction.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum FeatureMatrix {
    /// Dense row-major layout.
    Dense(DenseStorage),
    /// Compressed-sparse-row layout.
    Sparse(CsrStorage),
}

impl FeatureMatrix {
    /// Build a dense matrix from row-major `rows`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::ColumnCountMismatch`] when rows have
    /// inconsistent lengths.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, TreeError> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for (row, r) in rows.iter().enumerate() {
            if r.len() != n_cols {
                return Err(TreeError::ColumnCountMismatch {
                    expected: n_cols,
                    got: r.len(),
                    row,
                });
            }
            data.extend_from_slice(r);
        }
        Ok(Self::Dense(DenseStorage {
            data,
            n_rows,
            n_cols,
        }))
    }

    /// Build a CSR matrix from raw compressed-sparse-row arrays.
    ///
    /// `row_ptr` has one entry per row plus a trailing sentinel;
    /// `col_indices[row_ptr[r]..row_ptr[r+1]]` are the stored columns of
    /// row `r`, strictly ascending, and `values` is parallel to
    /// `col_indices`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidSparseLayout`] on any structural
    /// inconsistency.
    pub fn from_csr(
        row_ptr: Vec<usize>,
        col_indices: Vec<usize>,
        values: Vec<f64>,
        n_cols: usize,
    ) -> Result<Self, TreeError> {
        if row_ptr.is_empty() {
            return Err(TreeError::InvalidSparseLayout {
                detail: "row_ptr must contain at least the trailing sentinel".to_string(),
            });
        }
        if col_indices.len() != values.len() {
            return Err(TreeError::InvalidSparseLayout {
                detail: format!(
                    "col_indices ({}) and values ({}) lengths differ",
                    col_indices.len(),
                    values.len()
                ),
            });
        }
        if *row_ptr.last().unwrap_or(&0) != values.len() {
            return Err(TreeError::InvalidSparseLayout {
                detail: "row_ptr sentinel does not match value count".to_string(),
            });
        }
        for w in row_ptr.windows(2) {
            if w[0] > w[1] {
                return Err(TreeError::InvalidSparseLayout {
                    detail: "row_ptr is not monotonically non-decreasing".to_string(),
                });
            }
        }
        for w in row_ptr.windows(2) {
            let cols = &col_indices[w[0]..w[1]];
            for pair in cols.windows(2) {
                if pair[0] >= pair[1] {
                    return Err(TreeError::InvalidSparseLayout {
                        detail: "column indices within a row must be strictly ascending"
                            .to_string(),
                    });
                }
            }
            if let Some(&last) = cols.last()
                && last >= n_cols
            {
                return Err(TreeError::InvalidSparseLayout {
                    detail: format!("column index {last} out of range for {n_cols} columns"),
                });
            }
        }
        Ok(Self::Sparse(CsrStorage {
            row_ptr,
            col_indices,
            values,
            n_cols,
        }))
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        match self {
            Self::Dense(d) => d.n_rows,
            Self::Sparse(s) => s.row_ptr.len() - 1,
        }
    }

    /// Return the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        match self {
            Self::Dense(d) => d.n_cols,
            Self::Sparse(s) => s.n_cols,
        }
    }

    /// Return `true` for CSR storage.
    #[must_use]
    pub fn is_sparse(&self) -> bool {
        matches!(self, Self::Sparse(_))
    }

    /// Return the value at `(row, col)`, or `default` when the entry is
    /// not stored (sparse) or out of range.
    #[must_use]
    pub fn get(&self, row: usize, col: usize, default: f64) -> f64 {
        match self {
            Self::Dense(d) => {
                if row < d.n_rows && col < d.n_cols {
                    d.data[row * d.n_cols + col]
                } else {
                    default
                }
            }
            Self::Sparse(s) => {
                if row + 1 >= s.row_ptr.len() {
                    return default;
                }
                let lo = s.row_ptr[row];
                let hi = s.row_ptr[row + 1];
                match s.col_indices[lo..hi].binary_search(&col) {
                    Ok(pos) => s.values[lo + pos],
                    Err(_) => default,
                }
            }
        }
    }

    /// Invoke `f` for every stored column index of `row`.
    ///
    /// Dense rows report every column; sparse rows only the stored ones.
    pub fn for_each_column_in_row(&self, row: usize, mut f: impl FnMut(usize)) {
        match self {
            Self::Dense(d) => {
                for col in 0..d.n_cols {
                    f(col);
                }
            }
            Self::Sparse(s) => {
                let lo = s.row_ptr[row];
                let hi = s.row_ptr[row + 1];
                for &col in &s.col_indices[lo..hi] {
                    f(col);
                }
            }
        }
    }

    /// Materialize `row` into `buf` (length `n_cols`).
    ///
    /// Sparse entries that are not stored become NaN, matching the value
    /// the split search saw for them during training.
    pub fn fill_row(&self, row: usize, buf: &mut [f64]) {
        match self {
            Self::Dense(d) => {
                buf.copy_from_slice(&d.data[row * d.n_cols..(row + 1) * d.n_cols]);
            }
            Self::Sparse(s) => {
                buf.fill(f64::NAN);
                let lo = s.row_ptr[row];
                let hi = s.row_ptr[row + 1];
                for (&col, &v) in s.col_indices[lo..hi].iter().zip(&s.values[lo..hi]) {
                    buf[col] = v;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FeatureMatrix;
    use crate::error::TreeError;

    fn sparse_2x3() -> FeatureMatrix {
        // row 0: col1 = 5.0; row 1: col0 = 1.0, col2 = 2.0
        FeatureMatrix::from_csr(vec![0, 1, 3], vec![1, 0, 2], vec![5.0, 1.0, 2.0], 3).unwrap()
    }

    #[test]
    fn dense_round_trip() {
        let m = FeatureMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.n_rows(), 2);
        assert_eq!(m.n_cols(), 2);
        assert!(!m.is_sparse());
        assert_eq!(m.get(1, 0, f64::NAN), 3.0);
    }

    #[test]
    fn dense_ragged_rows_rejected() {
        let err = FeatureMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, TreeError::ColumnCountMismatch { row: 1, .. }));
    }

    #[test]
    fn sparse_get_stored_and_default() {
        let m = sparse_2x3();
        assert!(m.is_sparse());
        assert_eq!(m.get(0, 1, f64::NAN), 5.0);
        assert!(m.get(0, 0, f64::NAN).is_nan());
        assert_eq!(m.get(1, 2, -1.0), 2.0);
    }

    #[test]
    fn sparse_fill_row_uses_nan() {
        let m = sparse_2x3();
        let mut buf = vec![0.0; 3];
        m.fill_row(0, &mut buf);
        assert!(buf[0].is_nan());
        assert_eq!(buf[1], 5.0);
        assert!(buf[2].is_nan());
    }

    #[test]
    fn sparse_column_iteration() {
        let m = sparse_2x3();
        let mut cols = Vec::new();
        m.for_each_column_in_row(1, |c| cols.push(c));
        assert_eq!(cols, vec![0, 2]);
    }

    #[test]
    fn sparse_bad_sentinel_rejected() {
        let err =
            FeatureMatrix::from_csr(vec![0, 2], vec![0], vec![1.0], 3).unwrap_err();
        assert!(matches!(err, TreeError::InvalidSparseLayout { .. }));
    }

    #[test]
    fn sparse_column_out_of_range_rejected() {
        let err =
            FeatureMatrix::from_csr(vec![0, 1], vec![5], vec![1.0], 3).unwrap_err();
        assert!(matches!(err, TreeError::InvalidSparseLayout { .. }));
    }
}
