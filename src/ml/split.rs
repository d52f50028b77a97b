use crate::error::{AppError, Result};
use crate::ml::models::SplitConfig;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Smallest table that is stratified at all
const MIN_STRATIFIED_ROWS: usize = 4;

/// How the hold-out set was drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    /// Stratified on the (department, urgency) pair
    StratifiedCombined,
    /// Stratified on department only
    StratifiedType,
    /// Plain seeded shuffle
    Random,
    /// Too few rows to hold anything out; train and test are the full set
    Degenerate,
}

impl std::fmt::Display for SplitStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SplitStrategy::StratifiedCombined => "stratified_combined",
            SplitStrategy::StratifiedType => "stratified_type",
            SplitStrategy::Random => "random",
            SplitStrategy::Degenerate => "degenerate",
        };
        f.write_str(s)
    }
}

/// Row indices of a train/test partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
    pub strategy: SplitStrategy,
}

impl TrainTestSplit {
    /// Whether test metrics describe unseen rows
    pub fn evaluation_meaningful(&self) -> bool {
        self.strategy != SplitStrategy::Degenerate
    }
}

/// Partition rows into train and test sets.
///
/// Tries stratification on the combined label pair first, then on the
/// department label alone, then falls back to a plain shuffle. Each fallback
/// is logged. The same labels and config always produce the same partition.
pub fn train_test_split(
    type_labels: &[String],
    urgency_labels: &[String],
    config: &SplitConfig,
) -> Result<TrainTestSplit> {
    if type_labels.len() != urgency_labels.len() {
        return Err(AppError::DataShape(format!(
            "{} department labels but {} urgency labels",
            type_labels.len(),
            urgency_labels.len()
        )));
    }
    if !(config.test_fraction > 0.0 && config.test_fraction < 1.0) {
        return Err(AppError::Configuration(format!(
            "test_fraction must be in (0, 1), got {}",
            config.test_fraction
        )));
    }

    let n = type_labels.len();
    if n < 2 {
        tracing::warn!(
            rows = n,
            "Too few rows for a hold-out set; evaluating on the training data"
        );
        let all: Vec<usize> = (0..n).collect();
        return Ok(TrainTestSplit {
            train: all.clone(),
            test: all,
            strategy: SplitStrategy::Degenerate,
        });
    }

    let n_test = ((config.test_fraction * n as f64).ceil() as usize).clamp(1, n - 1);

    let combined: Vec<String> = type_labels
        .iter()
        .zip(urgency_labels)
        .map(|(t, u)| format!("{t}\u{1f}{u}"))
        .collect();

    let type_stratifiable = n >= MIN_STRATIFIED_ROWS && distinct(type_labels) > 1;
    let combined_stratifiable = type_stratifiable && distinct(urgency_labels) > 1;

    if combined_stratifiable {
        if let Some(split) = stratified(&combined, n_test, config.seed) {
            return Ok(split.with_strategy(SplitStrategy::StratifiedCombined));
        }
    }
    tracing::warn!(
        rows = n,
        "Stratifying on department and urgency is infeasible; trying department only"
    );

    if type_stratifiable {
        if let Some(split) = stratified(type_labels, n_test, config.seed) {
            return Ok(split.with_strategy(SplitStrategy::StratifiedType));
        }
    }
    tracing::warn!(rows = n, "Stratifying on department is infeasible; using an unstratified split");

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(config.seed);
    indices.shuffle(&mut rng);
    let mut test = indices[..n_test].to_vec();
    let mut train = indices[n_test..].to_vec();
    test.sort_unstable();
    train.sort_unstable();

    Ok(TrainTestSplit {
        train,
        test,
        strategy: SplitStrategy::Random,
    })
}

impl TrainTestSplit {
    fn with_strategy(mut self, strategy: SplitStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

fn distinct(labels: &[String]) -> usize {
    labels.iter().collect::<HashSet<_>>().len()
}

/// Stratified partition, or `None` when the strata cannot all be represented
fn stratified(keys: &[String], n_test: usize, seed: u64) -> Option<TrainTestSplit> {
    let n = keys.len();
    let mut strata: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, key) in keys.iter().enumerate() {
        strata.entry(key.as_str()).or_default().push(i);
    }

    let n_strata = strata.len();
    let n_train = n - n_test;
    if strata.values().any(|rows| rows.len() < 2) || n_test < n_strata || n_train < n_strata {
        return None;
    }

    // Floor allocation, then hand out the remainder by largest fractional part
    let mut allocation: Vec<(usize, f64, usize)> = strata
        .values()
        .map(|rows| {
            let exact = n_test as f64 * rows.len() as f64 / n as f64;
            let base = (exact.floor() as usize).max(1).min(rows.len() - 1);
            (base, exact - exact.floor(), rows.len())
        })
        .collect();

    let mut assigned: usize = allocation.iter().map(|a| a.0).sum();
    let mut order: Vec<usize> = (0..allocation.len()).collect();
    order.sort_by(|&a, &b| allocation[b].1.total_cmp(&allocation[a].1).then(a.cmp(&b)));

    while assigned < n_test {
        let next = order
            .iter()
            .copied()
            .find(|&i| allocation[i].0 + 1 < allocation[i].2)?;
        allocation[next].0 += 1;
        allocation[next].1 = f64::NEG_INFINITY;
        order.sort_by(|&a, &b| allocation[b].1.total_cmp(&allocation[a].1).then(a.cmp(&b)));
        assigned += 1;
    }
    while assigned > n_test {
        let next = (0..allocation.len())
            .filter(|&i| allocation[i].0 > 1)
            .min_by(|&a, &b| allocation[a].1.total_cmp(&allocation[b].1))?;
        allocation[next].0 -= 1;
        assigned -= 1;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);
    for (rows, (take, _, _)) in strata.into_values().zip(allocation) {
        let mut rows = rows;
        rows.shuffle(&mut rng);
        test.extend_from_slice(&rows[..take]);
        train.extend_from_slice(&rows[take..]);
    }
    train.sort_unstable();
    test.sort_unstable();

    Some(TrainTestSplit {
        train,
        test,
        strategy: SplitStrategy::StratifiedCombined,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn assert_partition(split: &TrainTestSplit, n: usize) {
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..n).collect::<Vec<_>>());
    }

    #[test]
    fn test_combined_stratification() {
        let types: Vec<String> = (0..20)
            .map(|i| if i < 10 { "a" } else { "b" }.to_string())
            .collect();
        let urgency: Vec<String> = (0..20)
            .map(|i| if i % 2 == 0 { "x" } else { "y" }.to_string())
            .collect();
        let split = train_test_split(&types, &urgency, &SplitConfig::default()).unwrap();

        assert_eq!(split.strategy, SplitStrategy::StratifiedCombined);
        assert_eq!(split.test.len(), 4);
        assert_partition(&split, 20);
        assert!(split.evaluation_meaningful());

        // one test row per (department, urgency) stratum
        let mut pairs: Vec<(String, String)> = split
            .test
            .iter()
            .map(|&i| (types[i].clone(), urgency[i].clone()))
            .collect();
        pairs.sort();
        pairs.dedup();
        assert_eq!(pairs.len(), 4);
    }

    #[test]
    fn test_falls_back_to_type_stratification() {
        // combined strata of size one make pair stratification infeasible
        let types = labels(&["a", "a", "a", "b", "b", "b"]);
        let urgency = labels(&["x", "y", "z", "x", "y", "z"]);
        let split = train_test_split(&types, &urgency, &SplitConfig::default()).unwrap();

        assert_eq!(split.strategy, SplitStrategy::StratifiedType);
        assert_eq!(split.test.len(), 2);
        let test_types: Vec<&str> = split.test.iter().map(|&i| types[i].as_str()).collect();
        assert!(test_types.contains(&"a"));
        assert!(test_types.contains(&"b"));
        assert_partition(&split, 6);
    }

    #[test]
    fn test_falls_back_to_random() {
        let types = labels(&["a", "b", "c", "d", "d"]);
        let urgency = labels(&["x", "x", "x", "x", "x"]);
        let split = train_test_split(&types, &urgency, &SplitConfig::default()).unwrap();

        assert_eq!(split.strategy, SplitStrategy::Random);
        assert_eq!(split.test.len(), 1);
        assert_partition(&split, 5);
    }

    #[test]
    fn test_three_rows_are_not_stratified() {
        let types = labels(&["a", "a", "b"]);
        let urgency = labels(&["x", "x", "y"]);
        let split = train_test_split(&types, &urgency, &SplitConfig::default()).unwrap();

        assert_eq!(split.strategy, SplitStrategy::Random);
        assert_eq!(split.test.len(), 1);
        assert_partition(&split, 3);
    }

    #[test]
    fn test_single_label_per_dimension_is_random() {
        let split =
            train_test_split(&labels(&["a"; 3]), &labels(&["x"; 3]), &SplitConfig::default())
                .unwrap();
        assert_eq!(split.strategy, SplitStrategy::Random);

        // one urgency level rules out the pair, not the department
        let types = labels(&["a", "a", "a", "b", "b", "b"]);
        let split =
            train_test_split(&types, &labels(&["x"; 6]), &SplitConfig::default()).unwrap();
        assert_eq!(split.strategy, SplitStrategy::StratifiedType);

        let split =
            train_test_split(&labels(&["a"; 6]), &types, &SplitConfig::default()).unwrap();
        assert_eq!(split.strategy, SplitStrategy::Random);
    }

    #[test]
    fn test_single_row_is_degenerate() {
        let split =
            train_test_split(&labels(&["a"]), &labels(&["x"]), &SplitConfig::default()).unwrap();

        assert_eq!(split.strategy, SplitStrategy::Degenerate);
        assert_eq!(split.train, vec![0]);
        assert_eq!(split.test, vec![0]);
        assert!(!split.evaluation_meaningful());
    }

    #[test]
    fn test_split_is_reproducible() {
        let types = labels(&["a", "b", "a", "b", "a", "b", "a", "b", "c", "c"]);
        let urgency = labels(&["x"; 10]);
        let first = train_test_split(&types, &urgency, &SplitConfig::default()).unwrap();
        let second = train_test_split(&types, &urgency, &SplitConfig::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_bad_fraction() {
        let config = SplitConfig {
            test_fraction: 1.5,
            ..Default::default()
        };
        assert!(train_test_split(&labels(&["a", "b"]), &labels(&["x", "y"]), &config).is_err());
    }
}
