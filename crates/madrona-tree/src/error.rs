/// Errors from decision-tree training, prediction, and model transport.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Returned when the feature matrix and label vector disagree in length.
    #[error("the sizes of X and y don't match: {rows} != {labels}")]
    SizeMismatch {
        /// Number of rows in the feature matrix.
        rows: usize,
        /// Number of entries in the label vector.
        labels: usize,
    },

    /// Returned when the training dataset has zero rows.
    #[error("no training examples given")]
    EmptyDataset,

    /// Returned when every sample weight is zero.
    #[error("all sample weights are zero, nothing to train on")]
    NoActiveSamples,

    /// Returned when a dense row has a different number of columns than expected.
    #[error("row {row} has {got} columns, expected {expected}")]
    ColumnCountMismatch {
        /// The expected number of columns.
        expected: usize,
        /// The actual number of columns in the row.
        got: usize,
        /// The zero-based index of the offending row.
        row: usize,
    },

    /// Returned when a CSR layout is internally inconsistent.
    #[error("invalid sparse matrix layout: {detail}")]
    InvalidSparseLayout {
        /// Human-readable description of the inconsistency.
        detail: String,
    },

    /// Returned when `num_vars` resolves outside `[1, n_features]`.
    #[error("num_vars must be in [1, {n_features}], got {num_vars}")]
    InvalidNumVars {
        /// The invalid num_vars value.
        num_vars: usize,
        /// The number of feature columns in the dataset.
        n_features: usize,
    },

    /// Returned when max_depth is less than 2.
    #[error("max_depth must be at least 2, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when max_leaf_nodes is less than 2.
    #[error("max_leaf_nodes must be at least 2, got {max_leaf_nodes}")]
    InvalidMaxLeafNodes {
        /// The invalid max_leaf_nodes value provided.
        max_leaf_nodes: usize,
    },

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The invalid min_samples_leaf value provided.
        min_samples_leaf: usize,
    },

    /// Returned when the labels contain fewer than two distinct classes.
    #[error("only one class or negative class labels ({n_classes} classes found)")]
    SingleClass {
        /// The number of distinct classes observed.
        n_classes: usize,
    },

    /// Returned when the sample-weight vector length disagrees with the row count.
    #[error("sample weights have length {got}, expected {expected}")]
    WeightLengthMismatch {
        /// The expected number of weights (one per row).
        expected: usize,
        /// The actual length of the weight vector.
        got: usize,
    },

    /// Returned when the attribute-kind set length disagrees with the column count.
    #[error("attribute kinds have length {got}, expected {expected}")]
    AttributeLengthMismatch {
        /// The expected number of attribute kinds (one per column).
        expected: usize,
        /// The actual length of the attribute-kind set.
        got: usize,
    },

    /// Returned when a node without a pending split is asked to split.
    #[error("split requested on a node with no pending split")]
    InvalidSplit,

    /// Returned when a split is applied twice to the same node.
    #[error("split already applied to this node")]
    SplitAlreadyApplied,

    /// Returned when the stable partition bookkeeping disagrees with the
    /// precomputed pivot. This is an internal-consistency failure: later
    /// predictions would be corrupt if it were tolerated.
    #[error(
        "messed up partition: low={low}, pivot={pivot}, high={high}, ended up splitting at {split_at}"
    )]
    PartitionCorrupted {
        /// Low bound (inclusive) of the partitioned range.
        low: usize,
        /// Expected pivot position.
        pivot: usize,
        /// High bound (exclusive) of the partitioned range.
        high: usize,
        /// Where the left group actually ended.
        split_at: usize,
    },

    /// Returned when encoding a model fails.
    #[error("failed to serialize decision tree")]
    SerializeModel {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Returned when decoding a model fails.
    #[error("failed to deserialize decision tree")]
    DeserializeModel {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Returned when a decoded model violates the node-record format.
    #[error("corrupt model payload: {detail}")]
    ModelCorrupted {
        /// Human-readable description of the violation.
        detail: String,
    },

    /// Returned when a text-safe model string is not valid base64.
    #[error("failed to decode text-encoded model")]
    DecodeModelText {
        /// The underlying base64 error.
        #[source]
        source: base64::DecodeError,
    },
}
