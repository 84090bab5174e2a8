/// The measurement kind of a feature column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AttributeKind {
    /// Ordered numeric attribute, split by threshold.
    Quantitative,
    /// Categorical attribute, split by equality against one category.
    Nominal,
}

/// Per-column attribute kinds for a feature matrix.
///
/// Columns not covered by an explicit kind default to
/// [`AttributeKind::Quantitative`].
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct AttributeSet {
    kinds: Vec<AttributeKind>,
}

impl AttributeSet {
    /// Create a set marking all `n_features` columns quantitative.
    #[must_use]
    pub fn all_quantitative(n_features: usize) -> Self {
        Self {
            kinds: vec![AttributeKind::Quantitative; n_features],
        }
    }

    /// Create a set from explicit per-column kinds.
    #[must_use]
    pub fn from_kinds(kinds: Vec<AttributeKind>) -> Self {
        Self { kinds }
    }

    /// Return the number of columns with an explicit kind.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Return `true` if no explicit kinds are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Return the kind of column `col`, defaulting to quantitative.
    #[must_use]
    pub fn kind(&self, col: usize) -> AttributeKind {
        self.kinds
            .get(col)
            .copied()
            .unwrap_or(AttributeKind::Quantitative)
    }

    /// Return `true` if column `col` is nominal.
    #[must_use]
    pub fn is_nominal(&self, col: usize) -> bool {
        self.kind(col) == AttributeKind::Nominal
    }
}
