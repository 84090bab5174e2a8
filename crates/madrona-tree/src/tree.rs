//! Decision-tree training: configuration, growth, and the fitted model.

use std::collections::BinaryHeap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::attr::AttributeSet;
use crate::codec;
use crate::error::TreeError;
use crate::impurity::{SplitRule, which_max};
use crate::matrix::FeatureMatrix;
use crate::node::Node;
use crate::order::OrderMatrix;
use crate::partition::SampleSet;
use crate::split::{CandidateSplit, find_best_split};

/// Configuration for a single CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default                |
/// |---------------------|------------------------|
/// | `rule`              | `Gini`                 |
/// | `num_vars`          | `None` (all features)  |
/// | `max_depth`         | `None` (unlimited)     |
/// | `max_leaf_nodes`    | `None` (depth-first)   |
/// | `min_samples_split` | 2                      |
/// | `min_samples_leaf`  | 1                      |
/// | `seed`              | 42                     |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) rule: SplitRule,
    pub(crate) num_vars: Option<usize>,
    pub(crate) max_depth: Option<usize>,
    pub(crate) max_leaf_nodes: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    ///
    /// All parameters use the defaults shown in the struct-level documentation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rule: SplitRule::Gini,
            num_vars: None,
            max_depth: None,
            max_leaf_nodes: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_rule(mut self, rule: SplitRule) -> Self {
        self.rule = rule;
        self
    }

    /// Set the number of randomly drawn candidate features per split.
    ///
    /// `None` means consider all features.
    #[must_use]
    pub fn with_num_vars(mut self, num_vars: Option<usize>) -> Self {
        self.num_vars = num_vars;
        self
    }

    /// Set the maximum tree depth.
    ///
    /// `None` means grow until all leaves are pure or stopping conditions
    /// are met. The root sits at depth 1, so `Some(d)` allows splits on
    /// nodes of depth `d - 1` at most.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the maximum number of leaves.
    ///
    /// `Some(l)` switches growth from depth-first to best-first: pending
    /// splits are applied in order of decreasing gain until the leaf
    /// budget is spent. `None` grows depth-first without a leaf bound.
    #[must_use]
    pub fn with_max_leaf_nodes(mut self, max_leaf_nodes: Option<usize>) -> Self {
        self.max_leaf_nodes = max_leaf_nodes;
        self
    }

    /// Set the minimum weighted sample count required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum weighted sample count required in each child after
    /// a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the split criterion.
    #[must_use]
    pub fn rule(&self) -> SplitRule {
        self.rule
    }

    /// Return the candidate-feature count per split, if set.
    #[must_use]
    pub fn num_vars(&self) -> Option<usize> {
        self.num_vars
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the leaf budget, if any.
    #[must_use]
    pub fn max_leaf_nodes(&self) -> Option<usize> {
        self.max_leaf_nodes
    }

    /// Return the minimum weighted samples required to split a node.
    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Return the minimum weighted samples required in each child.
    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a decision tree with unit sample weights and all-quantitative
    /// attributes.
    ///
    /// # Errors
    ///
    /// See [`DecisionTreeConfig::fit_weighted`].
    #[instrument(skip(self, x, y), fields(n_samples = x.n_rows()))]
    pub fn fit(&self, x: &FeatureMatrix, y: &[usize]) -> Result<DecisionTree, TreeError> {
        let attrs = AttributeSet::all_quantitative(x.n_cols());
        let weights = vec![1usize; x.n_rows()];
        let order = OrderMatrix::sort(x, &attrs);
        self.fit_weighted(x, y, &weights, &attrs, &order)
    }

    /// Train a decision tree on weighted samples.
    ///
    /// `weights[i]` is the multiplicity of row `i` (a bootstrap count);
    /// rows with zero weight are excluded. `order` is the precomputed
    /// attribute ordering for `x`, shared read-only across the trees of an
    /// ensemble.
    ///
    /// # Errors
    ///
    /// | Variant                                 | When                                          |
    /// |-----------------------------------------|-----------------------------------------------|
    /// | [`TreeError::EmptyDataset`]             | `x` has no rows                               |
    /// | [`TreeError::SizeMismatch`]             | `y` length differs from the row count         |
    /// | [`TreeError::WeightLengthMismatch`]     | `weights` length differs from the row count   |
    /// | [`TreeError::AttributeLengthMismatch`]  | `attrs` length differs from the column count  |
    /// | [`TreeError::NoActiveSamples`]          | every weight is zero                          |
    /// | [`TreeError::SingleClass`]              | fewer than two distinct classes in `y`        |
    /// | [`TreeError::InvalidNumVars`]           | `num_vars` outside `[1, n_features]`          |
    /// | [`TreeError::InvalidMaxDepth`]          | `max_depth` below 2                           |
    /// | [`TreeError::InvalidMaxLeafNodes`]      | `max_leaf_nodes` below 2                      |
    /// | [`TreeError::InvalidMinSamplesSplit`]   | `min_samples_split` below 2                   |
    /// | [`TreeError::InvalidMinSamplesLeaf`]    | `min_samples_leaf` below 1                    |
    /// | [`TreeError::PartitionCorrupted`]       | internal partition bookkeeping failure        |
    #[instrument(skip_all, fields(n_samples = x.n_rows(), n_features = x.n_cols()))]
    pub fn fit_weighted(
        &self,
        x: &FeatureMatrix,
        y: &[usize],
        weights: &[usize],
        attrs: &AttributeSet,
        order: &OrderMatrix,
    ) -> Result<DecisionTree, TreeError> {
        let n_rows = x.n_rows();
        let n_features = x.n_cols();

        // --- Validate inputs ---
        if n_rows == 0 {
            return Err(TreeError::EmptyDataset);
        }
        if y.len() != n_rows {
            return Err(TreeError::SizeMismatch {
                rows: n_rows,
                labels: y.len(),
            });
        }
        if weights.len() != n_rows {
            return Err(TreeError::WeightLengthMismatch {
                expected: n_rows,
                got: weights.len(),
            });
        }
        if !attrs.is_empty() && attrs.len() != n_features {
            return Err(TreeError::AttributeLengthMismatch {
                expected: n_features,
                got: attrs.len(),
            });
        }

        // --- Validate config ---
        let num_vars = self.num_vars.unwrap_or(n_features);
        if num_vars == 0 || num_vars > n_features {
            return Err(TreeError::InvalidNumVars {
                num_vars,
                n_features,
            });
        }
        if let Some(d) = self.max_depth
            && d < 2
        {
            return Err(TreeError::InvalidMaxDepth { max_depth: d });
        }
        if let Some(l) = self.max_leaf_nodes
            && l < 2
        {
            return Err(TreeError::InvalidMaxLeafNodes { max_leaf_nodes: l });
        }
        if self.min_samples_split < 2 {
            return Err(TreeError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(TreeError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }

        // --- Derived values ---
        let n_classes = y.iter().max().map_or(0, |&m| m + 1);
        if n_classes < 2 {
            return Err(TreeError::SingleClass { n_classes });
        }

        let index: Vec<usize> = (0..n_rows).filter(|&r| weights[r] > 0).collect();
        if index.is_empty() {
            return Err(TreeError::NoActiveSamples);
        }
        let n_active = index.len();
        let samples = SampleSet::new(order.restrict(weights), index);

        debug!(
            n_active,
            n_features, n_classes, num_vars, "fitting decision tree"
        );

        let mut trainer = Trainer {
            data: TrainData {
                x,
                y,
                weights,
                attrs,
                n_classes,
            },
            rule: self.rule,
            num_vars,
            max_depth: self.max_depth.unwrap_or(usize::MAX),
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            samples,
            arena: Vec::new(),
            importance: vec![0.0; n_features],
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            next_seq: 0,
        };

        // The root sits at depth 1.
        let mut root = trainer.new_train_node(0, n_active, 1);
        let root_id = root.id;
        match self.max_leaf_nodes {
            None => {
                if trainer.find_candidate(&mut root) {
                    trainer.apply_split(root, None)?;
                }
            }
            Some(max_leafs) => {
                let mut pending = BinaryHeap::new();
                if trainer.find_candidate(&mut root) {
                    pending.push(PendingSplit { node: root });
                }
                for _leaves in 1..max_leafs {
                    let Some(PendingSplit { node }) = pending.pop() else {
                        break;
                    };
                    trainer.apply_split(node, Some(&mut pending))?;
                }
            }
        }

        let root = take_node(&mut trainer.arena, root_id);
        debug!(
            n_nodes = root.n_nodes(),
            n_leaves = root.n_leaves(),
            "decision tree built"
        );

        Ok(DecisionTree {
            root,
            n_features,
            n_classes,
            importance: trainer.importance,
        })
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrowed views of the immutable training inputs.
pub(crate) struct TrainData<'a> {
    pub(crate) x: &'a FeatureMatrix,
    pub(crate) y: &'a [usize],
    pub(crate) weights: &'a [usize],
    pub(crate) attrs: &'a AttributeSet,
    pub(crate) n_classes: usize,
}

/// A node under construction, stored in the training arena.
#[derive(Debug, Default)]
struct BuildNode {
    output: usize,
    posteriori: Vec<f64>,
    split: Option<AppliedSplit>,
}

#[derive(Debug)]
struct AppliedSplit {
    feature: usize,
    condition: crate::node::SplitCondition,
    score: f64,
    true_child: usize,
    false_child: usize,
}

/// An in-progress node: its arena slot plus the `[low, high)` slice of
/// the sample set it owns.
struct TrainNode {
    id: usize,
    depth: usize,
    low: usize,
    high: usize,
    /// Total weighted sample count.
    n: usize,
    /// Weighted per-class counts.
    counts: Vec<usize>,
    candidate: Option<CandidateSplit>,
    /// Creation sequence number; breaks gain ties in best-first growth.
    seq: u64,
}

/// Best-first work item: pops highest gain first, earliest created on
/// equal gain.
struct PendingSplit {
    node: TrainNode,
}

impl PendingSplit {
    fn score(&self) -> f64 {
        self.node.candidate.as_ref().map_or(0.0, |c| c.score)
    }
}

impl PartialEq for PendingSplit {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for PendingSplit {}

impl PartialOrd for PendingSplit {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingSplit {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.score()
            .total_cmp(&other.score())
            .then_with(|| other.node.seq.cmp(&self.node.seq))
    }
}

struct Trainer<'a> {
    data: TrainData<'a>,
    rule: SplitRule,
    num_vars: usize,
    max_depth: usize,
    min_samples_split: usize,
    min_samples_leaf: usize,
    samples: SampleSet,
    arena: Vec<BuildNode>,
    importance: Vec<f64>,
    rng: ChaCha8Rng,
    next_seq: u64,
}

impl Trainer<'_> {
    /// Create a train node over `[low, high)` and its arena slot.
    ///
    /// The posterior is the weighted class distribution of the slice,
    /// normalized by the slice's total weight.
    fn new_train_node(&mut self, low: usize, high: usize, depth: usize) -> TrainNode {
        let mut counts = vec![0usize; self.data.n_classes];
        let mut n = 0usize;
        for &row in &self.samples.index[low..high] {
            let w = self.data.weights[row];
            counts[self.data.y[row]] += w;
            n += w;
        }
        let posteriori = counts.iter().map(|&c| c as f64 / n as f64).collect();
        let output = which_max(&counts);
        let id = self.arena.len();
        self.arena.push(BuildNode {
            output,
            posteriori,
            split: None,
        });
        let seq = self.next_seq;
        self.next_seq += 1;
        TrainNode {
            id,
            depth,
            low,
            high,
            n,
            counts,
            candidate: None,
            seq,
        }
    }

    /// Search for a split candidate, storing it on the node.
    ///
    /// Returns `false` without searching when the node is at the depth
    /// limit, too small, or pure.
    fn find_candidate(&mut self, node: &mut TrainNode) -> bool {
        if node.depth >= self.max_depth {
            return false;
        }
        if node.n <= self.min_samples_split {
            return false;
        }
        if node.counts.iter().any(|&c| c == node.n) {
            return false;
        }
        let impurity = self.rule.impurity(&node.counts, node.n);
        node.candidate = find_best_split(
            &self.data,
            &self.samples,
            node.low,
            node.high,
            node.n,
            &node.counts,
            impurity,
            self.num_vars,
            self.min_samples_split,
            self.rule,
            &mut self.rng,
        );
        node.candidate.is_some()
    }

    /// Apply the node's pending candidate: partition its slice, create
    /// the children, and either recurse (depth-first) or queue them
    /// (best-first).
    ///
    /// Returns `Ok(false)` when a child would fall below
    /// `min_samples_leaf` and the node reverts to a leaf. A split that
    /// leaves two identical leaf children is pruned back to a leaf; its
    /// gain is not added to the importance vector.
    fn apply_split(
        &mut self,
        node: TrainNode,
        mut queue: Option<&mut BinaryHeap<PendingSplit>>,
    ) -> Result<bool, TreeError> {
        let Some(candidate) = node.candidate else {
            return Err(TreeError::InvalidSplit);
        };
        if self.arena[node.id].split.is_some() {
            return Err(TreeError::SplitAlreadyApplied);
        }
        let x = self.data.x;
        let feature = candidate.feature;
        let condition = candidate.condition.clone();
        let goes_true = |row: usize| condition.goes_true(x.get(row, feature, f64::NAN));

        // One scan: the pivot counts positions, the side totals count
        // weight.
        let mut pivot_positions = 0usize;
        let mut tc = 0usize;
        for &row in &self.samples.index[node.low..node.high] {
            if goes_true(row) {
                pivot_positions += 1;
                tc += self.data.weights[row];
            }
        }
        let fc = node.n - tc;
        if tc < self.min_samples_leaf || fc < self.min_samples_leaf {
            debug!(tc, fc, "split reverted, child below min_samples_leaf");
            return Ok(false);
        }

        let pivot = node.low + pivot_positions;
        self.samples.partition(node.low, pivot, node.high, &goes_true)?;

        let mut true_child = self.new_train_node(node.low, pivot, node.depth + 1);
        let mut false_child = self.new_train_node(pivot, node.high, node.depth + 1);
        let (t_id, f_id) = (true_child.id, false_child.id);
        let (t_output, f_output) = (
            self.arena[t_id].output,
            self.arena[f_id].output,
        );
        self.arena[node.id].split = Some(AppliedSplit {
            feature,
            condition,
            score: candidate.score,
            true_child: t_id,
            false_child: f_id,
        });

        let mut t_pending = false;
        if self.find_candidate(&mut true_child) {
            match queue.as_deref_mut() {
                Some(q) => {
                    q.push(PendingSplit { node: true_child });
                    t_pending = true;
                }
                None => {
                    self.apply_split(true_child, None)?;
                }
            }
        }
        let mut f_pending = false;
        if self.find_candidate(&mut false_child) {
            match queue.as_deref_mut() {
                Some(q) => {
                    q.push(PendingSplit { node: false_child });
                    f_pending = true;
                }
                None => {
                    self.apply_split(false_child, None)?;
                }
            }
        }

        // A branch whose two sides ended as leaves with the same output
        // predicts nothing the parent leaf would not.
        if !t_pending
            && !f_pending
            && self.arena[t_id].split.is_none()
            && self.arena[f_id].split.is_none()
            && t_output == f_output
        {
            self.arena[node.id].split = None;
            debug!(node = node.id, "pruned branch with identical leaf children");
            return Ok(true);
        }

        self.importance[feature] += candidate.score;
        Ok(true)
    }
}

/// Convert an arena slot (and its descendants) into an owned node tree.
///
/// Slots orphaned by pruning are simply never visited.
fn take_node(arena: &mut [BuildNode], id: usize) -> Node {
    let build = std::mem::take(&mut arena[id]);
    match build.split {
        Some(s) => Node::Internal {
            feature: s.feature,
            condition: s.condition,
            true_child: Box::new(take_node(arena, s.true_child)),
            false_child: Box::new(take_node(arena, s.false_child)),
        },
        None => Node::Leaf {
            output: build.output,
            posteriori: build.posteriori,
        },
    }
}

/// A fitted CART decision tree.
///
/// Owns its root [`Node`] and the per-feature importance vector
/// (summed impurity gain of the splits on each feature).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) root: Node,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
    pub(crate) importance: Vec<f64>,
}

impl DecisionTree {
    /// Predict the class label for a single sample.
    ///
    /// Missing or NaN feature values fall to the false branch at every
    /// node they are tested by.
    #[must_use]
    pub fn predict(&self, x: &[f64]) -> usize {
        self.root.predict(x)
    }

    /// Walk to the leaf for a sample and hand its output and posterior
    /// distribution to `handler`.
    pub fn predict_with(&self, x: &[f64], handler: impl FnOnce(usize, &[f64])) {
        self.root.predict_with(x, handler);
    }

    /// Return the root node.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Return the per-feature importance vector (length `n_features`).
    ///
    /// Entry `j` is the summed impurity gain of every split on feature
    /// `j`; all zeros when the tree is a single leaf.
    #[must_use]
    pub fn importance(&self) -> &[f64] {
        &self.importance
    }

    /// Return the number of feature columns the tree was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the total node count.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.root.n_nodes()
    }

    /// Return the leaf count.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.root.n_leaves()
    }

    /// Return the tree depth; a single-leaf tree has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    /// Serialize the tree's node structure to bytes, optionally
    /// Deflate-compressed.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::SerializeModel`] on a write failure.
    pub fn serialize(&self, compress: bool) -> Result<Vec<u8>, TreeError> {
        codec::encode_node(&self.root, compress)
    }

    /// Serialize the tree's node structure to a text-safe base64 string
    /// of the compressed byte form.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::SerializeModel`] on a write failure.
    pub fn serialize_text(&self) -> Result<String, TreeError> {
        codec::encode_text(&self.root)
    }

    /// Render the tree in Graphviz dot format.
    ///
    /// `feature_names` and `class_names` label split and leaf nodes when
    /// given; otherwise indices are used.
    #[must_use]
    pub fn export_graphviz(
        &self,
        feature_names: Option<&[String]>,
        class_names: Option<&[String]>,
    ) -> String {
        let mut out = String::from(
            "digraph Tree {\nnode [shape=box, fontname=helvetica];\nedge [fontname=helvetica];\n",
        );
        let mut next_id = 0usize;
        render_dot(&self.root, &mut out, &mut next_id, feature_names, class_names);
        out.push_str("}\n");
        out
    }
}

fn render_dot(
    node: &Node,
    out: &mut String,
    next_id: &mut usize,
    feature_names: Option<&[String]>,
    class_names: Option<&[String]>,
) -> usize {
    use std::fmt::Write as _;

    let id = *next_id;
    *next_id += 1;
    match node {
        Node::Leaf { output, .. } => {
            let label = class_names
                .and_then(|names| names.get(*output).cloned())
                .unwrap_or_else(|| output.to_string());
            let _ = writeln!(out, "{id} [label=\"class = {label}\"];");
        }
        Node::Internal {
            feature,
            condition,
            true_child,
            false_child,
        } => {
            let name = feature_names
                .and_then(|names| names.get(*feature).cloned())
                .unwrap_or_else(|| format!("x{feature}"));
            let test = match condition {
                crate::node::SplitCondition::Quantitative { threshold } => {
                    format!("{name} <= {threshold}")
                }
                crate::node::SplitCondition::Nominal { category } => {
                    format!("{name} = {category}")
                }
            };
            let _ = writeln!(out, "{id} [label=\"{test}\"];");
            let t = render_dot(true_child, out, next_id, feature_names, class_names);
            let _ = writeln!(out, "{id} -> {t} [label=\"yes\"];");
            let f = render_dot(false_child, out, next_id, feature_names, class_names);
            let _ = writeln!(out, "{id} -> {f} [label=\"no\"];");
        }
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::AttributeKind;

    fn dense(rows: &[Vec<f64>]) -> FeatureMatrix {
        FeatureMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn empty_dataset_error() {
        let x = dense(&[]);
        let err = DecisionTreeConfig::new().fit(&x, &[]).unwrap_err();
        assert!(matches!(err, TreeError::EmptyDataset));
    }

    #[test]
    fn size_mismatch_error() {
        let x = dense(&[vec![1.0], vec![2.0]]);
        let err = DecisionTreeConfig::new().fit(&x, &[0]).unwrap_err();
        assert!(matches!(err, TreeError::SizeMismatch { rows: 2, labels: 1 }));
    }

    #[test]
    fn single_class_error() {
        let x = dense(&[vec![1.0], vec![2.0]]);
        let err = DecisionTreeConfig::new().fit(&x, &[0, 0]).unwrap_err();
        assert!(matches!(err, TreeError::SingleClass { n_classes: 1 }));
    }

    #[test]
    fn invalid_num_vars_error() {
        let x = dense(&[vec![1.0], vec![2.0]]);
        let err = DecisionTreeConfig::new()
            .with_num_vars(Some(5))
            .fit(&x, &[0, 1])
            .unwrap_err();
        assert!(matches!(
            err,
            TreeError::InvalidNumVars {
                num_vars: 5,
                n_features: 1
            }
        ));
    }

    #[test]
    fn invalid_min_samples_split_error() {
        let x = dense(&[vec![1.0], vec![2.0]]);
        let err = DecisionTreeConfig::new()
            .with_min_samples_split(1)
            .fit(&x, &[0, 1])
            .unwrap_err();
        assert!(matches!(err, TreeError::InvalidMinSamplesSplit { .. }));
    }

    #[test]
    fn linearly_separable_correct_split() {
        let x = dense(&[
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![3.0, 0.0],
            vec![10.0, 0.0],
            vec![11.0, 0.0],
            vec![12.0, 0.0],
        ]);
        let y = vec![0, 0, 0, 1, 1, 1];
        let tree = DecisionTreeConfig::new().fit(&x, &y).unwrap();
        assert_eq!(tree.predict(&[2.0, 0.0]), 0);
        assert_eq!(tree.predict(&[11.0, 0.0]), 1);
        assert!(tree.importance()[0] > 0.0);
        assert!(tree.importance()[1].abs() < f64::EPSILON);
    }

    #[test]
    fn band_pattern_needs_two_levels() {
        // Class 1 occupies the middle band, so one threshold cannot
        // separate it; the tree needs a second split.
        let x = dense(&[vec![0.0], vec![1.0], vec![2.0], vec![3.0]]);
        let y = vec![0, 1, 1, 0];
        let tree = DecisionTreeConfig::new().fit(&x, &y).unwrap();
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.n_leaves(), 3);
        assert_eq!(tree.predict(&[0.0]), 0);
        assert_eq!(tree.predict(&[1.5]), 1);
        assert_eq!(tree.predict(&[3.0]), 0);
    }

    #[test]
    fn max_depth_limits_tree() {
        let x = dense(&[
            vec![1.0],
            vec![2.0],
            vec![3.0],
            vec![4.0],
            vec![5.0],
            vec![6.0],
        ]);
        let y = vec![0, 1, 0, 1, 0, 1];
        let tree = DecisionTreeConfig::new()
            .with_max_depth(Some(2))
            .fit(&x, &y)
            .unwrap();
        // Root at depth 1 may split; its children at depth 2 may not.
        assert!(tree.depth() <= 1);
    }

    #[test]
    fn identical_leaf_children_pruned() {
        // The best cut isolates rows {1, 2}, but both resulting leaves
        // predict class 0 once the right side refuses to split, so the
        // whole branch collapses.
        let x = dense(&[vec![1.0], vec![2.0], vec![3.0], vec![4.0]]);
        let y = vec![0, 0, 1, 0];
        let tree = DecisionTreeConfig::new().fit(&x, &y).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict(&[3.0]), 0);
        assert!(tree.importance().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn root_posterior_normalized_by_weight() {
        let x = dense(&[vec![1.0], vec![2.0], vec![3.0]]);
        let y = vec![0, 0, 1];
        let weights = vec![2, 1, 1];
        let attrs = AttributeSet::all_quantitative(1);
        let order = OrderMatrix::sort(&x, &attrs);
        let tree = DecisionTreeConfig::new()
            .with_min_samples_split(10)
            .fit_weighted(&x, &y, &weights, &attrs, &order)
            .unwrap();
        // min_samples_split = 10 forces a single leaf; its posterior is
        // the weighted distribution [3/4, 1/4].
        match tree.root() {
            Node::Leaf { posteriori, .. } => {
                assert!((posteriori[0] - 0.75).abs() < 1e-12);
                assert!((posteriori[1] - 0.25).abs() < 1e-12);
            }
            Node::Internal { .. } => panic!("expected a single leaf"),
        }
    }

    #[test]
    fn weighted_fit_matches_duplicated_rows() {
        let x_dup = dense(&[
            vec![1.0],
            vec![1.0],
            vec![2.0],
            vec![8.0],
            vec![9.0],
        ]);
        let y_dup = vec![0, 0, 0, 1, 1];
        let tree_dup = DecisionTreeConfig::new().fit(&x_dup, &y_dup).unwrap();

        let x_w = dense(&[vec![1.0], vec![2.0], vec![8.0], vec![9.0]]);
        let y_w = vec![0, 0, 1, 1];
        let attrs = AttributeSet::all_quantitative(1);
        let order = OrderMatrix::sort(&x_w, &attrs);
        let tree_w = DecisionTreeConfig::new()
            .fit_weighted(&x_w, &y_w, &[2, 1, 1, 1], &attrs, &order)
            .unwrap();

        for v in [0.5, 1.5, 5.0, 8.5, 10.0] {
            assert_eq!(tree_dup.predict(&[v]), tree_w.predict(&[v]));
        }
    }

    #[test]
    fn nominal_attribute_tree() {
        let x = dense(&[
            vec![1.0],
            vec![1.0],
            vec![2.0],
            vec![2.0],
            vec![3.0],
            vec![3.0],
        ]);
        let y = vec![0, 0, 1, 1, 1, 1];
        let attrs = AttributeSet::from_kinds(vec![AttributeKind::Nominal]);
        let order = OrderMatrix::sort(&x, &attrs);
        let tree = DecisionTreeConfig::new()
            .fit_weighted(&x, &y, &[1; 6], &attrs, &order)
            .unwrap();
        assert_eq!(tree.predict(&[1.0]), 0);
        assert_eq!(tree.predict(&[2.0]), 1);
        assert_eq!(tree.predict(&[3.0]), 1);
    }

    #[test]
    fn best_first_respects_leaf_budget() {
        let x = dense(&[
            vec![1.0],
            vec![2.0],
            vec![5.0],
            vec![6.0],
            vec![9.0],
            vec![10.0],
            vec![13.0],
            vec![14.0],
        ]);
        let y = vec![0, 0, 1, 1, 0, 0, 1, 1];
        let tree = DecisionTreeConfig::new()
            .with_max_leaf_nodes(Some(3))
            .fit(&x, &y)
            .unwrap();
        assert!(tree.n_leaves() <= 3);
    }

    #[test]
    fn best_first_ties_pop_earliest_first() {
        let make = |score: f64, seq: u64| TrainNode {
            id: 0,
            depth: 1,
            low: 0,
            high: 0,
            n: 0,
            counts: Vec::new(),
            candidate: Some(CandidateSplit {
                feature: 0,
                condition: crate::node::SplitCondition::Quantitative { threshold: 0.0 },
                score,
                true_output: 0,
                false_output: 1,
            }),
            seq,
        };
        let mut heap = BinaryHeap::new();
        heap.push(PendingSplit { node: make(0.25, 7) });
        heap.push(PendingSplit { node: make(0.25, 3) });
        heap.push(PendingSplit { node: make(0.75, 9) });
        // Highest gain first; equal gains pop in creation order.
        assert_eq!(heap.pop().unwrap().node.seq, 9);
        assert_eq!(heap.pop().unwrap().node.seq, 3);
        assert_eq!(heap.pop().unwrap().node.seq, 7);
    }

    #[test]
    fn deterministic_with_same_seed() {
        let x = dense(&[
            vec![1.0, 5.0],
            vec![2.0, 6.0],
            vec![3.0, 7.0],
            vec![10.0, 15.0],
            vec![11.0, 16.0],
            vec![12.0, 17.0],
        ]);
        let y = vec![0, 0, 0, 1, 1, 1];
        let t1 = DecisionTreeConfig::new()
            .with_num_vars(Some(1))
            .with_seed(123)
            .fit(&x, &y)
            .unwrap();
        let t2 = DecisionTreeConfig::new()
            .with_num_vars(Some(1))
            .with_seed(123)
            .fit(&x, &y)
            .unwrap();
        assert_eq!(t1.root(), t2.root());
    }

    #[test]
    fn graphviz_export_mentions_features_and_classes() {
        let x = dense(&[
            vec![1.0],
            vec![2.0],
            vec![3.0],
            vec![10.0],
            vec![11.0],
            vec![12.0],
        ]);
        let y = vec![0, 0, 0, 1, 1, 1];
        let tree = DecisionTreeConfig::new().fit(&x, &y).unwrap();
        let names = vec!["petal_width".to_string()];
        let classes = vec!["setosa".to_string(), "virginica".to_string()];
        let dot = tree.export_graphviz(Some(&names), Some(&classes));
        assert!(dot.starts_with("digraph Tree {"));
        assert!(dot.contains("petal_width"));
        assert!(dot.contains("setosa"));
        assert!(dot.contains("virginica"));
    }
}
