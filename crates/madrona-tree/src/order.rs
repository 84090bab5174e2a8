//! Column-major attribute ordering: per-quantitative-column row indices
//! sorted ascending by value.

use tracing::debug;

use crate::attr::AttributeSet;
use crate::matrix::FeatureMatrix;

/// Ascending row-index order for every quantitative column.
///
/// One column of row indices per quantitative feature, sorted by that
/// feature's value with ties broken by row index and NaN values last.
/// Nominal columns carry no ordering. During tree growth the working
/// copy is re-partitioned in lockstep with the sample-index array,
/// never re-sorted.
#[derive(Debug, Clone)]
pub struct OrderMatrix {
    columns: Vec<Option<Vec<usize>>>,
}

impl OrderMatrix {
    /// Sort all rows of `x` by each quantitative column.
    ///
    /// Computed once by the ensemble driver and shared read-only across
    /// tree tasks; each task restricts it to its bootstrap's active rows.
    #[must_use]
    pub fn sort(x: &FeatureMatrix, attrs: &AttributeSet) -> Self {
        let n_rows = x.n_rows();
        let n_cols = x.n_cols();
        let columns = (0..n_cols)
            .map(|col| {
                if attrs.is_nominal(col) {
                    return None;
                }
                let mut rows: Vec<usize> = (0..n_rows).collect();
                rows.sort_by(|&a, &b| {
                    x.get(a, col, f64::NAN)
                        .total_cmp(&x.get(b, col, f64::NAN))
                        .then_with(|| a.cmp(&b))
                });
                Some(rows)
            })
            .collect();
        debug!(n_rows, n_cols, "attribute ordering computed");
        Self { columns }
    }

    /// Return a working copy keeping only rows with non-zero weight.
    ///
    /// Relative order within each column is preserved, so the copy is
    /// still sorted.
    #[must_use]
    pub fn restrict(&self, weights: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|col| {
                col.as_ref().map(|rows| {
                    rows.iter()
                        .copied()
                        .filter(|&r| weights.get(r).copied().unwrap_or(0) > 0)
                        .collect()
                })
            })
            .collect();
        Self { columns }
    }

    /// Return the number of columns (quantitative and nominal).
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Return the sorted row indices of column `col`, or `None` for a
    /// nominal column.
    #[must_use]
    pub fn column(&self, col: usize) -> Option<&[usize]> {
        self.columns.get(col).and_then(|c| c.as_deref())
    }

    pub(crate) fn columns_mut(&mut self) -> impl Iterator<Item = &mut Vec<usize>> {
        self.columns.iter_mut().filter_map(Option::as_mut)
    }
}

#[cfg(test)]
mod tests {
    use super::OrderMatrix;
    use crate::attr::{AttributeKind, AttributeSet};
    use crate::matrix::FeatureMatrix;

    #[test]
    fn columns_sorted_ascending() {
        let x = FeatureMatrix::from_rows(&[
            vec![3.0, 10.0],
            vec![1.0, 30.0],
            vec![2.0, 20.0],
        ])
        .unwrap();
        let order = OrderMatrix::sort(&x, &AttributeSet::default());
        assert_eq!(order.column(0).unwrap(), &[1, 2, 0]);
        assert_eq!(order.column(1).unwrap(), &[0, 2, 1]);
    }

    #[test]
    fn ties_break_by_row_index() {
        let x =
            FeatureMatrix::from_rows(&[vec![5.0], vec![5.0], vec![1.0]]).unwrap();
        let order = OrderMatrix::sort(&x, &AttributeSet::default());
        assert_eq!(order.column(0).unwrap(), &[2, 0, 1]);
    }

    #[test]
    fn nan_sorts_last() {
        let x = FeatureMatrix::from_rows(&[vec![f64::NAN], vec![2.0], vec![1.0]]).unwrap();
        let order = OrderMatrix::sort(&x, &AttributeSet::default());
        assert_eq!(order.column(0).unwrap(), &[2, 1, 0]);
    }

    #[test]
    fn nominal_columns_have_no_order() {
        let x = FeatureMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let attrs = AttributeSet::from_kinds(vec![
            AttributeKind::Quantitative,
            AttributeKind::Nominal,
        ]);
        let order = OrderMatrix::sort(&x, &attrs);
        assert!(order.column(0).is_some());
        assert!(order.column(1).is_none());
    }

    #[test]
    fn restrict_drops_zero_weight_rows() {
        let x = FeatureMatrix::from_rows(&[vec![3.0], vec![1.0], vec![2.0]]).unwrap();
        let order = OrderMatrix::sort(&x, &AttributeSet::default());
        let restricted = order.restrict(&[1, 0, 2]);
        assert_eq!(restricted.column(0).unwrap(), &[2, 0]);
    }
}
