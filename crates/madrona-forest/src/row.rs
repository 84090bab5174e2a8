//! The per-tree output row of ensemble training.

use madrona_tree::Node;

use crate::error::ForestError;

/// Forest-level out-of-bag tally: for every row left out of at least one
/// bootstrap, the majority vote of the trees that never saw it is
/// compared against its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OobEstimate {
    /// Rows whose majority out-of-bag vote disagrees with the label.
    pub errors: usize,
    /// Rows with at least one out-of-bag vote.
    pub tests: usize,
}

impl OobEstimate {
    /// The out-of-bag misclassification rate, or 0.0 when no row was
    /// ever out of bag.
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        if self.tests == 0 {
            return 0.0;
        }
        self.errors as f64 / self.tests as f64
    }
}

/// One trained tree, emitted as a self-contained row.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TreeRow {
    /// Stable identifier derived from the tree's seed.
    pub model_id: String,
    /// This tree's out-of-bag misclassification rate (0.0 when the
    /// bootstrap covered every row).
    pub error: f64,
    /// The tree's node structure, compressed and base64-encoded.
    pub model: String,
    /// Per-feature summed impurity gain.
    pub importance: Vec<f64>,
    /// Out-of-bag rows this tree misclassified.
    pub oob_error: usize,
    /// Out-of-bag rows this tree was tested on.
    pub oob_tests: usize,
    /// The forest-level out-of-bag estimate, attached only to the row of
    /// the last tree to finish.
    pub forest_oob: Option<OobEstimate>,
}

impl TreeRow {
    /// Decode the carried model back into a predictable node tree.
    ///
    /// # Errors
    ///
    /// Returns the transport errors of [`madrona_tree::decode_text`].
    pub fn decode_model(&self) -> Result<Node, ForestError> {
        Ok(madrona_tree::decode_text(&self.model)?)
    }
}
