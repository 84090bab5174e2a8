//! Random-forest ensemble training on top of [`madrona_tree`].
//!
//! Each tree trains on an N-draw bootstrap of the dataset with a seed
//! derived from the ensemble's master seed, in parallel on a bounded
//! worker pool. Trees are emitted as self-contained rows carrying the
//! text-encoded model, the per-feature importance vector, and
//! out-of-bag error counts; the last tree to finish also carries the
//! forest-level majority-vote out-of-bag estimate.

mod config;
mod driver;
mod error;
mod row;

pub use config::{NumVars, RandomForestConfig};
pub use error::ForestError;
pub use row::{OobEstimate, TreeRow};

pub use madrona_tree::{AttributeKind, AttributeSet, FeatureMatrix, Node, SplitRule};
