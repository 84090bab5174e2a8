//! Best-split search over a random feature subset.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;

use crate::impurity::{SplitRule, which_max};
use crate::node::SplitCondition;
use crate::partition::SampleSet;
use crate::tree::TrainData;

/// A scored split proposal for one training node.
///
/// Holds everything needed to either apply the split or discard it:
/// the tested feature, the branching condition, the impurity gain, and
/// the majority class on each side.
#[derive(Debug, Clone)]
pub(crate) struct CandidateSplit {
    pub(crate) feature: usize,
    pub(crate) condition: SplitCondition,
    pub(crate) score: f64,
    pub(crate) true_output: usize,
    pub(crate) false_output: usize,
}

/// Search `[low, high)` of the sample set for the best split.
///
/// Considers a uniform random subset of `num_vars` candidate features
/// (for sparse data, only columns observed among the node's samples).
/// Returns `None` when no candidate achieves strictly positive gain or
/// passes the `min_split` weighted-count guard on both sides.
pub(crate) fn find_best_split(
    data: &TrainData<'_>,
    samples: &SampleSet,
    low: usize,
    high: usize,
    n: usize,
    counts: &[usize],
    node_impurity: f64,
    num_vars: usize,
    min_split: usize,
    rule: SplitRule,
    rng: &mut impl Rng,
) -> Option<CandidateSplit> {
    let columns = sample_columns(data, samples, low, high, num_vars, rng);

    let mut best: Option<CandidateSplit> = None;
    for col in columns {
        let candidate = if data.attrs.is_nominal(col) {
            scan_nominal(
                data,
                &samples.index[low..high],
                n,
                counts,
                node_impurity,
                min_split,
                rule,
                col,
            )
        } else {
            let Some(order) = samples.order.column(col) else {
                continue;
            };
            scan_quantitative(
                data,
                &order[low..high],
                n,
                counts,
                node_impurity,
                min_split,
                rule,
                col,
            )
        };
        if let Some(c) = candidate
            && best.as_ref().is_none_or(|b| c.score > b.score)
        {
            best = Some(c);
        }
    }
    best
}

/// Pick `num_vars` candidate columns by reservoir sampling, returned in
/// ascending order.
///
/// Dense data draws from all columns; sparse data draws from the columns
/// actually stored for the node's samples, so empty columns never waste
/// a draw.
fn sample_columns(
    data: &TrainData<'_>,
    samples: &SampleSet,
    low: usize,
    high: usize,
    num_vars: usize,
    rng: &mut impl Rng,
) -> Vec<usize> {
    let mut chosen = Vec::with_capacity(num_vars);
    let mut reservoir = |candidates: &mut dyn Iterator<Item = usize>, rng: &mut dyn rand::RngCore| {
        let mut seen = 0usize;
        for col in candidates {
            seen += 1;
            if chosen.len() < num_vars {
                chosen.push(col);
            } else {
                let j = rng.gen_range(0..seen);
                if j < num_vars {
                    chosen[j] = col;
                }
            }
        }
    };
    if data.x.is_sparse() {
        let mut observed = BTreeSet::new();
        for &row in &samples.index[low..high] {
            data.x.for_each_column_in_row(row, |col| {
                observed.insert(col);
            });
        }
        reservoir(&mut observed.into_iter(), rng);
    } else {
        reservoir(&mut (0..data.x.n_cols()), rng);
    }
    chosen.sort_unstable();
    chosen
}

/// Scan a quantitative column in its precomputed ascending order.
///
/// A cut is evaluated only where the feature value changes and the class
/// label changes; the threshold is the midpoint of the two boundary
/// values. Runs of equal value or equal class are merged into one
/// boundary, so equal feature values can never be separated.
#[allow(clippy::too_many_arguments)]
fn scan_quantitative(
    data: &TrainData<'_>,
    order: &[usize],
    n: usize,
    counts: &[usize],
    node_impurity: f64,
    min_split: usize,
    rule: SplitRule,
    col: usize,
) -> Option<CandidateSplit> {
    let mut true_counts = vec![0usize; counts.len()];
    let mut false_counts = vec![0usize; counts.len()];
    let mut prev_x = f64::NAN;
    let mut prev_y = usize::MAX;
    let mut best: Option<CandidateSplit> = None;

    for &row in order {
        let value = data.x.get(row, col, f64::NAN);
        if value.is_nan() {
            // NaN sorts last; nothing evaluable remains.
            break;
        }
        let label = data.y[row];
        let weight = data.weights[row];

        if !prev_x.is_nan() && value != prev_x && label != prev_y {
            let tc: usize = true_counts.iter().sum();
            let fc = n - tc;
            if tc >= min_split && fc >= min_split {
                for (f, (&c, &t)) in counts.iter().zip(&true_counts).enumerate() {
                    false_counts[f] = c - t;
                }
                let gain = node_impurity
                    - (tc as f64 / n as f64) * rule.impurity(&true_counts, tc)
                    - (fc as f64 / n as f64) * rule.impurity(&false_counts, fc);
                if gain > 0.0 && best.as_ref().is_none_or(|b| gain > b.score) {
                    best = Some(CandidateSplit {
                        feature: col,
                        condition: SplitCondition::Quantitative {
                            threshold: (value + prev_x) / 2.0,
                        },
                        score: gain,
                        true_output: which_max(&true_counts),
                        false_output: which_max(&false_counts),
                    });
                }
            }
        }

        prev_x = value;
        prev_y = label;
        true_counts[label] += weight;
    }
    best
}

/// Scan a nominal column, proposing one equality split per distinct
/// category.
#[allow(clippy::too_many_arguments)]
fn scan_nominal(
    data: &TrainData<'_>,
    index: &[usize],
    n: usize,
    counts: &[usize],
    node_impurity: f64,
    min_split: usize,
    rule: SplitRule,
    col: usize,
) -> Option<CandidateSplit> {
    // Keyed by the category's bit-exact integer value so iteration order
    // is deterministic.
    let mut per_category: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for &row in index {
        let value = data.x.get(row, col, f64::NAN);
        if value.is_nan() {
            continue;
        }
        per_category
            .entry(value as i64)
            .or_insert_with(|| vec![0; counts.len()])[data.y[row]] += data.weights[row];
    }

    let mut false_counts = vec![0usize; counts.len()];
    let mut best: Option<CandidateSplit> = None;
    for (&category, true_counts) in &per_category {
        let tc: usize = true_counts.iter().sum();
        let fc = n - tc;
        if tc < min_split || fc < min_split {
            continue;
        }
        for (f, (&c, &t)) in counts.iter().zip(true_counts.iter()).enumerate() {
            false_counts[f] = c - t;
        }
        let gain = node_impurity
            - (tc as f64 / n as f64) * rule.impurity(true_counts, tc)
            - (fc as f64 / n as f64) * rule.impurity(&false_counts, fc);
        if gain > 0.0 && best.as_ref().is_none_or(|b| gain > b.score) {
            best = Some(CandidateSplit {
                feature: col,
                condition: SplitCondition::Nominal {
                    category: category as f64,
                },
                score: gain,
                true_output: which_max(true_counts),
                false_output: which_max(&false_counts),
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::find_best_split;
    use crate::attr::{AttributeKind, AttributeSet};
    use crate::impurity::SplitRule;
    use crate::matrix::FeatureMatrix;
    use crate::node::SplitCondition;
    use crate::order::OrderMatrix;
    use crate::partition::SampleSet;
    use crate::tree::TrainData;

    fn unit_weights(n: usize) -> Vec<usize> {
        vec![1; n]
    }

    fn samples_for(x: &FeatureMatrix, attrs: &AttributeSet, weights: &[usize]) -> SampleSet {
        let order = OrderMatrix::sort(x, attrs).restrict(weights);
        let index: Vec<usize> = (0..x.n_rows()).filter(|&r| weights[r] > 0).collect();
        SampleSet::new(order, index)
    }

    fn class_counts(y: &[usize], weights: &[usize], n_classes: usize) -> Vec<usize> {
        let mut counts = vec![0; n_classes];
        for (&label, &w) in y.iter().zip(weights) {
            counts[label] += w;
        }
        counts
    }

    #[test]
    fn perfect_quantitative_split() {
        let x = FeatureMatrix::from_rows(&[vec![1.0], vec![2.0], vec![3.0], vec![4.0]]).unwrap();
        let y = vec![0, 0, 1, 1];
        let weights = unit_weights(4);
        let attrs = AttributeSet::all_quantitative(1);
        let samples = samples_for(&x, &attrs, &weights);
        let counts = class_counts(&y, &weights, 2);
        let data = TrainData {
            x: &x,
            y: &y,
            weights: &weights,
            attrs: &attrs,
            n_classes: 2,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let best = find_best_split(
            &data,
            &samples,
            0,
            4,
            4,
            &counts,
            SplitRule::Gini.impurity(&counts, 4),
            1,
            1,
            SplitRule::Gini,
            &mut rng,
        )
        .unwrap();
        assert_eq!(best.feature, 0);
        match best.condition {
            SplitCondition::Quantitative { threshold } => {
                assert!((threshold - 2.5).abs() < f64::EPSILON);
            }
            SplitCondition::Nominal { .. } => panic!("expected quantitative split"),
        }
        // Parent Gini 0.5, both children pure.
        assert!((best.score - 0.5).abs() < 1e-10);
        assert_eq!(best.true_output, 0);
        assert_eq!(best.false_output, 1);
    }

    #[test]
    fn pure_node_finds_nothing() {
        let x = FeatureMatrix::from_rows(&[vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        let y = vec![1, 1, 1];
        let weights = unit_weights(3);
        let attrs = AttributeSet::all_quantitative(1);
        let samples = samples_for(&x, &attrs, &weights);
        let counts = class_counts(&y, &weights, 2);
        let data = TrainData {
            x: &x,
            y: &y,
            weights: &weights,
            attrs: &attrs,
            n_classes: 2,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let best = find_best_split(
            &data,
            &samples,
            0,
            3,
            3,
            &counts,
            0.0,
            1,
            1,
            SplitRule::Gini,
            &mut rng,
        );
        assert!(best.is_none());
    }

    #[test]
    fn min_split_guard_blocks_small_sides() {
        let x = FeatureMatrix::from_rows(&[vec![1.0], vec![2.0], vec![3.0], vec![4.0]]).unwrap();
        let y = vec![0, 0, 1, 1];
        let weights = unit_weights(4);
        let attrs = AttributeSet::all_quantitative(1);
        let samples = samples_for(&x, &attrs, &weights);
        let counts = class_counts(&y, &weights, 2);
        let data = TrainData {
            x: &x,
            y: &y,
            weights: &weights,
            attrs: &attrs,
            n_classes: 2,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        // Both sides would need weighted count >= 3; impossible with n = 4.
        let best = find_best_split(
            &data,
            &samples,
            0,
            4,
            4,
            &counts,
            SplitRule::Gini.impurity(&counts, 4),
            1,
            3,
            SplitRule::Gini,
            &mut rng,
        );
        assert!(best.is_none());
    }

    #[test]
    fn equal_values_never_separated() {
        // The only class boundary sits inside a run of equal values, so no
        // cut point exists.
        let x = FeatureMatrix::from_rows(&[vec![2.0], vec![2.0], vec![2.0], vec![2.0]]).unwrap();
        let y = vec![0, 0, 1, 1];
        let weights = unit_weights(4);
        let attrs = AttributeSet::all_quantitative(1);
        let samples = samples_for(&x, &attrs, &weights);
        let counts = class_counts(&y, &weights, 2);
        let data = TrainData {
            x: &x,
            y: &y,
            weights: &weights,
            attrs: &attrs,
            n_classes: 2,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let best = find_best_split(
            &data,
            &samples,
            0,
            4,
            4,
            &counts,
            SplitRule::Gini.impurity(&counts, 4),
            1,
            1,
            SplitRule::Gini,
            &mut rng,
        );
        assert!(best.is_none());
    }

    #[test]
    fn nominal_split_on_best_category() {
        let x = FeatureMatrix::from_rows(&[
            vec![1.0],
            vec![1.0],
            vec![2.0],
            vec![3.0],
        ])
        .unwrap();
        let y = vec![0, 0, 1, 1];
        let weights = unit_weights(4);
        let attrs = AttributeSet::from_kinds(vec![AttributeKind::Nominal]);
        let samples = samples_for(&x, &attrs, &weights);
        let counts = class_counts(&y, &weights, 2);
        let data = TrainData {
            x: &x,
            y: &y,
            weights: &weights,
            attrs: &attrs,
            n_classes: 2,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let best = find_best_split(
            &data,
            &samples,
            0,
            4,
            4,
            &counts,
            SplitRule::Gini.impurity(&counts, 4),
            1,
            1,
            SplitRule::Gini,
            &mut rng,
        )
        .unwrap();
        match best.condition {
            SplitCondition::Nominal { category } => {
                // Category 1 perfectly isolates class 0.
                assert!((category - 1.0).abs() < f64::EPSILON);
            }
            SplitCondition::Quantitative { .. } => panic!("expected nominal split"),
        }
        assert!((best.score - 0.5).abs() < 1e-10);
    }

    #[test]
    fn bootstrap_weights_shift_the_cut() {
        // Weighting row 2 heavily pulls the weighted counts, but the cut
        // stays at a value boundary.
        let x = FeatureMatrix::from_rows(&[vec![1.0], vec![2.0], vec![3.0], vec![4.0]]).unwrap();
        let y = vec![0, 0, 1, 1];
        let weights = vec![1, 1, 5, 1];
        let attrs = AttributeSet::all_quantitative(1);
        let samples = samples_for(&x, &attrs, &weights);
        let counts = class_counts(&y, &weights, 2);
        let n: usize = weights.iter().sum();
        let data = TrainData {
            x: &x,
            y: &y,
            weights: &weights,
            attrs: &attrs,
            n_classes: 2,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let best = find_best_split(
            &data,
            &samples,
            0,
            4,
            n,
            &counts,
            SplitRule::Gini.impurity(&counts, n),
            1,
            1,
            SplitRule::Gini,
            &mut rng,
        )
        .unwrap();
        match best.condition {
            SplitCondition::Quantitative { threshold } => {
                assert!((threshold - 2.5).abs() < f64::EPSILON);
            }
            SplitCondition::Nominal { .. } => panic!("expected quantitative split"),
        }
        // Parent Gini with counts [2, 6] is 0.375; both children are pure.
        assert!((best.score - 0.375).abs() < 1e-10);
    }

    #[test]
    fn sparse_data_only_considers_observed_columns() {
        // Column 1 is never stored; the search must still find the split
        // on column 0 even with num_vars = 1.
        let x = FeatureMatrix::from_csr(
            vec![0, 1, 2, 3, 4],
            vec![0, 0, 0, 0],
            vec![1.0, 2.0, 3.0, 4.0],
            2,
        )
        .unwrap();
        let y = vec![0, 0, 1, 1];
        let weights = unit_weights(4);
        let attrs = AttributeSet::all_quantitative(2);
        let samples = samples_for(&x, &attrs, &weights);
        let counts = class_counts(&y, &weights, 2);
        let data = TrainData {
            x: &x,
            y: &y,
            weights: &weights,
            attrs: &attrs,
            n_classes: 2,
        };
        for seed in 0..8 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let best = find_best_split(
                &data,
                &samples,
                0,
                4,
                4,
                &counts,
                SplitRule::Gini.impurity(&counts, 4),
                1,
                1,
                SplitRule::Gini,
                &mut rng,
            )
            .unwrap();
            assert_eq!(best.feature, 0);
        }
    }
}
