//! CART decision-tree induction for in-database model training.
//!
//! Provides the tree-growing core used by the random-forest driver:
//! Gini/entropy/classification-error split criteria, weighted bootstrap
//! samples, quantitative and nominal attributes over dense or CSR feature
//! matrices, depth-first or best-first (leaf-bounded) growth, and a
//! byte-exact wire format for trained models.

mod attr;
mod codec;
mod error;
mod impurity;
mod matrix;
mod node;
mod order;
mod partition;
mod split;
mod tree;

pub use attr::{AttributeKind, AttributeSet};
pub use codec::{decode_node, decode_text, encode_node, encode_text};
pub use error::TreeError;
pub use impurity::SplitRule;
pub use matrix::FeatureMatrix;
pub use node::{Node, SplitCondition};
pub use order::OrderMatrix;
pub use tree::{DecisionTree, DecisionTreeConfig};
