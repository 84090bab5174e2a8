//! Stable in-place partitioning of the per-node sample bookkeeping.

use crate::error::TreeError;
use crate::order::OrderMatrix;

/// Stably partition `a[low..high]` so that rows satisfying `goes_left`
/// occupy `[low, pivot)` and the rest `[pivot, high)`, each group keeping
/// its relative order.
///
/// A single left-to-right scan writes left-group entries in place and
/// buffers right-group entries, which are then copied into the tail.
/// `pivot` must equal `low` plus the number of rows satisfying the
/// predicate; any disagreement is an internal-consistency failure.
pub(crate) fn stable_partition(
    a: &mut [usize],
    low: usize,
    pivot: usize,
    high: usize,
    goes_left: &impl Fn(usize) -> bool,
    buffer: &mut Vec<usize>,
) -> Result<(), TreeError> {
    buffer.clear();
    let mut write = low;
    let end = high.min(a.len());
    for i in low..end {
        let row = a[i];
        if goes_left(row) {
            a[write] = row;
            write += 1;
        } else {
            buffer.push(row);
        }
    }
    if buffer.len() != high - pivot || write != pivot {
        return Err(TreeError::PartitionCorrupted {
            low,
            pivot,
            high,
            split_at: write,
        });
    }
    a[pivot..high].copy_from_slice(buffer);
    Ok(())
}

/// The per-tree mutable sample bookkeeping: the sample-index array, the
/// order-matrix working copy, and the shared partition scratch buffer.
///
/// A `[low, high)` slice of `index` is the sample set owned by one
/// in-progress training node. Allocated once per tree; only reordered
/// afterwards.
pub(crate) struct SampleSet {
    pub(crate) order: OrderMatrix,
    pub(crate) index: Vec<usize>,
    buffer: Vec<usize>,
}

impl SampleSet {
    pub(crate) fn new(order: OrderMatrix, index: Vec<usize>) -> Self {
        let buffer = Vec::with_capacity(index.len());
        Self {
            order,
            index,
            buffer,
        }
    }

    /// Partition every order column and the sample-index array over
    /// `[low, high)` with the precomputed `pivot`.
    pub(crate) fn partition(
        &mut self,
        low: usize,
        pivot: usize,
        high: usize,
        goes_left: &impl Fn(usize) -> bool,
    ) -> Result<(), TreeError> {
        for col in self.order.columns_mut() {
            stable_partition(col, low, pivot, high, goes_left, &mut self.buffer)?;
        }
        stable_partition(&mut self.index, low, pivot, high, goes_left, &mut self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::stable_partition;
    use crate::error::TreeError;

    #[test]
    fn partitions_stably() {
        let mut a = vec![5, 2, 7, 1, 8, 3];
        let mut buffer = Vec::new();
        let even = |v: usize| v % 2 == 0;
        // Two even values in the range.
        stable_partition(&mut a, 0, 2, 6, &even, &mut buffer).unwrap();
        assert_eq!(a, vec![2, 8, 5, 7, 1, 3]);
    }

    #[test]
    fn partitions_subrange_only() {
        let mut a = vec![9, 4, 1, 2, 9];
        let mut buffer = Vec::new();
        let even = |v: usize| v % 2 == 0;
        stable_partition(&mut a, 1, 3, 4, &even, &mut buffer).unwrap();
        assert_eq!(a, vec![9, 4, 2, 1, 9]);
    }

    #[test]
    fn preserves_multiset_for_any_predicate() {
        let original = vec![3, 1, 4, 1, 5, 9, 2, 6];
        for mask in 0..16usize {
            let mut a = original.clone();
            let pred = move |v: usize| (mask >> (v % 4)) & 1 == 1;
            let pivot = original.iter().filter(|&&v| pred(v)).count();
            let mut buffer = Vec::new();
            let len = a.len();
            stable_partition(&mut a, 0, pivot, len, &pred, &mut buffer).unwrap();
            for &v in &a[..pivot] {
                assert!(pred(v));
            }
            for &v in &a[pivot..] {
                assert!(!pred(v));
            }
            let mut sorted_a = a.clone();
            let mut sorted_orig = original.clone();
            sorted_a.sort_unstable();
            sorted_orig.sort_unstable();
            assert_eq!(sorted_a, sorted_orig);
        }
    }

    #[test]
    fn pivot_mismatch_is_fatal() {
        let mut a = vec![1, 2, 3, 4];
        let mut buffer = Vec::new();
        let even = |v: usize| v % 2 == 0;
        // Correct pivot is 2; claim 3.
        let err = stable_partition(&mut a, 0, 3, 4, &even, &mut buffer).unwrap_err();
        assert!(matches!(err, TreeError::PartitionCorrupted { pivot: 3, .. }));
    }
}
