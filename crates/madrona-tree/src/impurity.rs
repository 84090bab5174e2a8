/// Criterion for measuring class-label heterogeneity within a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitRule {
    /// Gini impurity: 1 - Σ(p_i²). Used by the CART algorithm.
    Gini,
    /// Information entropy: -Σ(p_i · log2(p_i)). Used by ID3/C4.5/C5.0.
    Entropy,
    /// Classification error: |1 - max(p_i)|.
    ClassificationError,
}

impl SplitRule {
    /// Compute the impurity of a node from its weighted per-class counts.
    ///
    /// `n` is the total weighted count. Callers never pass `n == 0`
    /// (empty partitions are guarded before impurity is evaluated).
    #[must_use]
    pub fn impurity(&self, counts: &[usize], n: usize) -> f64 {
        if n == 0 {
            return 0.0;
        }
        let total = n as f64;
        match self {
            SplitRule::Gini => {
                let mut impurity = 1.0;
                for &c in counts {
                    if c > 0 {
                        let p = c as f64 / total;
                        impurity -= p * p;
                    }
                }
                impurity
            }
            SplitRule::Entropy => {
                let mut impurity = 0.0;
                for &c in counts {
                    if c > 0 {
                        let p = c as f64 / total;
                        impurity -= p * p.log2();
                    }
                }
                impurity
            }
            SplitRule::ClassificationError => {
                let mut max_p = 0.0f64;
                for &c in counts {
                    if c > 0 {
                        max_p = max_p.max(c as f64 / total);
                    }
                }
                (1.0 - max_p).abs()
            }
        }
    }
}

/// Index of the first maximum in `counts`.
///
/// Ties go to the lower class id, which keeps argmax deterministic.
pub(crate) fn which_max(counts: &[usize]) -> usize {
    let mut best = 0;
    let mut best_count = usize::MIN;
    for (i, &c) in counts.iter().enumerate() {
        if c > best_count {
            best_count = c;
            best = i;
        }
    }
    best
}
