//! The finalized decision-tree node graph.

/// The branching test of an internal node.
///
/// Tagged by attribute kind so a nominal node cannot carry a threshold
/// and vice versa.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum SplitCondition {
    /// Branch true when `x[feature] <= threshold`.
    Quantitative {
        /// Midpoint between the two boundary values of the chosen cut.
        threshold: f64,
    },
    /// Branch true when `x[feature] == category`.
    Nominal {
        /// The category tested for equality.
        category: f64,
    },
}

impl SplitCondition {
    /// Evaluate the test against a feature value.
    ///
    /// NaN values fail both forms of the test and fall to the false
    /// branch, matching how training skipped them.
    #[must_use]
    pub fn goes_true(&self, value: f64) -> bool {
        match self {
            SplitCondition::Quantitative { threshold } => value <= *threshold,
            SplitCondition::Nominal { category } => value == *category,
        }
    }
}

/// A node of a fitted classification tree.
///
/// The tree is strict: every internal node exclusively owns both
/// children, and only leaves carry a posterior distribution.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// A terminal node.
    Leaf {
        /// Predicted class id (argmax of the posterior).
        output: usize,
        /// Weighted class-probability distribution of the training
        /// samples that reached this leaf.
        posteriori: Vec<f64>,
    },
    /// An interior split node.
    Internal {
        /// Feature column tested by this node.
        feature: usize,
        /// The branching test.
        condition: SplitCondition,
        /// Subtree for samples passing the test.
        true_child: Box<Node>,
        /// Subtree for samples failing the test.
        false_child: Box<Node>,
    },
}

impl Node {
    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Predict the class id for a sample.
    ///
    /// Features the sample does not cover read as NaN and fall to the
    /// false branch.
    #[must_use]
    pub fn predict(&self, x: &[f64]) -> usize {
        match self.leaf_for(x) {
            Node::Leaf { output, .. } => *output,
            Node::Internal { .. } => unreachable!("leaf_for always ends at a leaf"),
        }
    }

    /// Walk to the leaf for a sample and hand its output and posterior
    /// distribution to `handler`.
    pub fn predict_with(&self, x: &[f64], handler: impl FnOnce(usize, &[f64])) {
        if let Node::Leaf { output, posteriori } = self.leaf_for(x) {
            handler(*output, posteriori);
        }
    }

    fn leaf_for(&self, x: &[f64]) -> &Node {
        let mut node = self;
        loop {
            match node {
                Node::Leaf { .. } => return node,
                Node::Internal {
                    feature,
                    condition,
                    true_child,
                    false_child,
                } => {
                    let value = x.get(*feature).copied().unwrap_or(f64::NAN);
                    node = if condition.goes_true(value) {
                        true_child
                    } else {
                        false_child
                    };
                }
            }
        }
    }

    /// Return the total number of nodes in this subtree.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Internal {
                true_child,
                false_child,
                ..
            } => 1 + true_child.n_nodes() + false_child.n_nodes(),
        }
    }

    /// Return the number of leaves in this subtree.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Internal {
                true_child,
                false_child,
                ..
            } => true_child.n_leaves() + false_child.n_leaves(),
        }
    }

    /// Return the depth of this subtree; a lone leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Internal {
                true_child,
                false_child,
                ..
            } => 1 + true_child.depth().max(false_child.depth()),
        }
    }
}
