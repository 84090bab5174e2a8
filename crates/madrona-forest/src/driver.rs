//! Parallel ensemble training with shared out-of-bag accounting.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info, instrument, warn};

use madrona_tree::{AttributeSet, DecisionTreeConfig, FeatureMatrix, OrderMatrix};

use crate::config::{NumVars, RandomForestConfig};
use crate::error::ForestError;
use crate::row::{OobEstimate, TreeRow};

/// Resolve a [`NumVars`] strategy to a concrete count.
pub(crate) fn resolve_num_vars(
    num_vars: NumVars,
    n_features: usize,
) -> Result<usize, ForestError> {
    let resolved = match num_vars {
        NumVars::Sqrt => (n_features as f64).sqrt().ceil() as usize,
        NumVars::Fraction(f) => {
            if f <= 0.0 || f > 1.0 {
                return Err(ForestError::InvalidNumVarsFraction { fraction: f });
            }
            (n_features as f64 * f).ceil() as usize
        }
        NumVars::Fixed(n) => n,
        NumVars::All => n_features,
    };
    if resolved == 0 || resolved > n_features {
        return Err(ForestError::InvalidNumVars {
            num_vars: resolved,
            n_features,
        });
    }
    Ok(resolved)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // A panicked holder leaves the data unusable only for that tree's
    // row; the accumulators stay structurally valid.
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Majority-vote tally of the shared out-of-bag vote matrix.
fn tally_votes(votes: &[usize], y: &[usize], n_classes: usize) -> OobEstimate {
    let mut errors = 0;
    let mut tests = 0;
    for (row, &label) in y.iter().enumerate() {
        let row_votes = &votes[row * n_classes..(row + 1) * n_classes];
        if row_votes.iter().all(|&v| v == 0) {
            continue;
        }
        tests += 1;
        let mut best = 0;
        for (class, &v) in row_votes.iter().enumerate() {
            if v > row_votes[best] {
                best = class;
            }
        }
        if best != label {
            errors += 1;
        }
    }
    OobEstimate { errors, tests }
}

/// Train the ensemble, emitting one row per tree.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = x.n_rows()))]
pub(crate) fn train<F>(
    config: &RandomForestConfig,
    x: &FeatureMatrix,
    y: &[usize],
    attrs: &AttributeSet,
    emit: F,
) -> Result<(), ForestError>
where
    F: FnMut(TreeRow) + Send,
{
    let n_rows = x.n_rows();
    let n_features = x.n_cols();
    if n_rows == 0 {
        return Err(ForestError::EmptyDataset);
    }
    if y.len() != n_rows {
        return Err(ForestError::SizeMismatch {
            rows: n_rows,
            labels: y.len(),
        });
    }
    let num_vars = resolve_num_vars(config.num_vars, n_features)?;
    let n_classes = y.iter().max().map_or(0, |&m| m + 1);

    info!(
        n_trees = config.n_trees,
        n_rows, n_features, n_classes, num_vars, "training random forest"
    );

    // Sorted once, shared read-only; each tree restricts it to its
    // bootstrap's active rows.
    let order = OrderMatrix::sort(x, attrs);

    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    let votes = Mutex::new(vec![0usize; n_rows * n_classes]);
    let remaining = AtomicUsize::new(config.n_trees);
    let emit = Mutex::new(emit);

    let run_task = |seed: u64| -> Result<(), ForestError> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        // N-draw bootstrap: weights[i] is row i's multiplicity; rows
        // never drawn are this tree's out-of-bag set.
        let mut weights = vec![0usize; n_rows];
        for _ in 0..n_rows {
            weights[rng.gen_range(0..n_rows)] += 1;
        }

        let tree = DecisionTreeConfig::new()
            .with_rule(config.rule)
            .with_num_vars(Some(num_vars))
            .with_max_depth(config.max_depth)
            .with_max_leaf_nodes(config.max_leaf_nodes)
            .with_min_samples_split(config.min_samples_split)
            .with_min_samples_leaf(config.min_samples_leaf)
            .with_seed(rng.r#gen())
            .fit_weighted(x, y, &weights, attrs, &order)?;

        // Predictions happen outside the lock; the vote matrix is
        // touched once per tree.
        let mut buf = vec![0.0; n_features];
        let mut oob_predictions = Vec::new();
        for (row, &w) in weights.iter().enumerate() {
            if w == 0 {
                x.fill_row(row, &mut buf);
                oob_predictions.push((row, tree.predict(&buf)));
            }
        }
        let oob_tests = oob_predictions.len();
        let oob_error = oob_predictions
            .iter()
            .filter(|&&(row, pred)| pred != y[row])
            .count();
        {
            let mut votes = lock(&votes);
            for &(row, pred) in &oob_predictions {
                votes[row * n_classes + pred] += 1;
            }
        }

        let mut tree_row = TreeRow {
            model_id: format!("{seed:016x}"),
            error: if oob_tests > 0 {
                oob_error as f64 / oob_tests as f64
            } else {
                0.0
            },
            model: tree.serialize_text()?,
            importance: tree.importance().to_vec(),
            oob_error,
            oob_tests,
            forest_oob: None,
        };

        // The task that decrements the counter to zero has seen every
        // other task's votes merged; it carries the forest estimate.
        if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            let votes = lock(&votes);
            let estimate = tally_votes(&votes, y, n_classes);
            info!(
                oob_errors = estimate.errors,
                oob_tests = estimate.tests,
                oob_error_rate = estimate.error_rate(),
                "out-of-bag estimate"
            );
            tree_row.forest_oob = Some(estimate);
        }

        debug!(
            model_id = %tree_row.model_id,
            oob_error, oob_tests, "tree trained"
        );
        (*lock(&emit))(tree_row);
        Ok(())
    };

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = config.parallelism {
        builder = builder.num_threads(n);
    }
    match builder.build() {
        Ok(pool) => pool.install(|| tree_seeds.par_iter().try_for_each(|&seed| run_task(seed)))?,
        Err(err) => {
            warn!(%err, "worker pool unavailable, training sequentially");
            for &seed in &tree_seeds {
                run_task(seed)?;
            }
        }
    }
    Ok(())
}
