use madrona_tree::TreeError;

/// Errors from random-forest training.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid n_trees value provided.
        n_trees: usize,
    },

    /// Returned when the training dataset has zero rows.
    #[error("training dataset has zero rows")]
    EmptyDataset,

    /// Returned when the feature matrix and label vector disagree in length.
    #[error("the sizes of X and y don't match: {rows} != {labels}")]
    SizeMismatch {
        /// Number of rows in the feature matrix.
        rows: usize,
        /// Number of entries in the label vector.
        labels: usize,
    },

    /// Returned when `num_vars` resolves to 0 or exceeds the column count.
    #[error("num_vars resolved to {num_vars}, but must be in [1, {n_features}]")]
    InvalidNumVars {
        /// The resolved num_vars value.
        num_vars: usize,
        /// The number of feature columns in the dataset.
        n_features: usize,
    },

    /// Returned when a fractional num_vars is not in (0.0, 1.0].
    #[error("num_vars fraction must be in (0.0, 1.0], got {fraction}")]
    InvalidNumVarsFraction {
        /// The invalid fraction provided.
        fraction: f64,
    },

    /// Returned when a tree task fails; the ensemble is aborted.
    #[error(transparent)]
    Tree(#[from] TreeError),
}
