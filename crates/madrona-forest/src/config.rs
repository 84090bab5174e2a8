//! Configuration builder for random-forest training.

use madrona_tree::{AttributeSet, FeatureMatrix, SplitRule};

use crate::error::ForestError;
use crate::row::TreeRow;

/// Strategy for the number of candidate features drawn at each split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumVars {
    /// Ceiling of the square root of the column count.
    Sqrt,
    /// A fraction of the column count (must be in (0.0, 1.0]).
    Fraction(f64),
    /// A fixed count.
    Fixed(usize),
    /// All columns (no subsampling).
    All,
}

/// Configuration for random-forest training.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `num_vars`          | `Sqrt`                |
/// | `rule`              | `Gini`                |
/// | `max_depth`         | `None` (unlimited)    |
/// | `max_leaf_nodes`    | `None` (depth-first)  |
/// | `min_samples_split` | 2                     |
/// | `min_samples_leaf`  | 1                     |
/// | `seed`              | 42                    |
/// | `parallelism`       | `None` (pool default) |
#[derive(Debug, Clone)]
pub struct RandomForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) num_vars: NumVars,
    pub(crate) rule: SplitRule,
    pub(crate) max_depth: Option<usize>,
    pub(crate) max_leaf_nodes: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) seed: u64,
    pub(crate) parallelism: Option<usize>,
}

impl RandomForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, ForestError> {
        if n_trees == 0 {
            return Err(ForestError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            num_vars: NumVars::Sqrt,
            rule: SplitRule::Gini,
            max_depth: None,
            max_leaf_nodes: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
            parallelism: None,
        })
    }

    // --- Setters ---

    /// Set the candidate-feature strategy.
    #[must_use]
    pub fn with_num_vars(mut self, num_vars: NumVars) -> Self {
        self.num_vars = num_vars;
        self
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_rule(mut self, rule: SplitRule) -> Self {
        self.rule = rule;
        self
    }

    /// Set the maximum tree depth. `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the leaf budget per tree. `Some(l)` switches trees to
    /// best-first growth.
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

    /// Set the minimum weighted sample count required in each child.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the master seed; per-tree seeds derive from it.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the worker-pool size. `None` uses the pool's default.
    #[must_use]
    pub fn with_parallelism(mut self, parallelism: Option<usize>) -> Self {
        self.parallelism = parallelism;
        self
    }

    // --- Getters ---

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the candidate-feature strategy.
    #[must_use]
    pub fn num_vars(&self) -> NumVars {
        self.num_vars
    }

    /// Return the split criterion.
    #[must_use]
    pub fn rule(&self) -> SplitRule {
        self.rule
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

    /// Return the master seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the worker-pool size, if set.
    #[must_use]
    pub fn parallelism(&self) -> Option<usize> {
        self.parallelism
    }

    /// Train the ensemble and collect one [`TreeRow`] per tree.
    ///
    /// Rows arrive in completion order, not seed order; sort by
    /// `model_id` for a canonical ordering.
    ///
    /// # Errors
    ///
    /// See [`RandomForestConfig::fit_with`].
    pub fn fit(
        &self,
        x: &FeatureMatrix,
        y: &[usize],
        attrs: &AttributeSet,
    ) -> Result<Vec<TreeRow>, ForestError> {
        let mut rows = Vec::with_capacity(self.n_trees);
        self.fit_with(x, y, attrs, |row| rows.push(row))?;
        Ok(rows)
    }

    /// Train the ensemble, handing each finished tree's row to `emit`.
    ///
    /// `emit` is called once per tree under an internal mutex, so it may
    /// freely mutate captured state. Any tree failure aborts the
    /// ensemble once in-flight tasks drain.
    ///
    /// # Errors
    ///
    /// | Variant                                  | When                                        |
    /// |------------------------------------------|---------------------------------------------|
    /// | [`ForestError::EmptyDataset`]            | `x` has no rows                             |
    /// | [`ForestError::SizeMismatch`]            | `y` length differs from the row count       |
    /// | [`ForestError::InvalidNumVarsFraction`]  | fractional `num_vars` outside (0.0, 1.0]    |
    /// | [`ForestError::InvalidNumVars`]          | resolved `num_vars` outside `[1, n_cols]`   |
    /// | [`ForestError::Tree`]                    | any tree task fails                         |
    pub fn fit_with<F>(
        &self,
        x: &FeatureMatrix,
        y: &[usize],
        attrs: &AttributeSet,
        emit: F,
    ) -> Result<(), ForestError>
    where
        F: FnMut(TreeRow) + Send,
    {
        crate::driver::train(self, x, y, attrs, emit)
    }
}
