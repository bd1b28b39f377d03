use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, EvalResult};
use crate::evaluation::nmi::normalized_mutual_information;
use crate::partition::{argmax_labels, PartitionMatrix};
use crate::results::model::ExperimentRun;

/// Agreement between the MAP partitions of two runs of a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairScore {
    pub first: usize,
    pub second: usize,
    pub score: f64,
}

/// All unordered index pairs `(i, j)` with `i < j < count`, lexicographic.
pub fn run_pairs(count: usize) -> Vec<(usize, usize)> {
    (0..count)
        .flat_map(|i| ((i + 1)..count).map(move |j| (i, j)))
        .collect()
}

pub struct PartitionComparator;

impl PartitionComparator {
    /// NMI between a (possibly soft) candidate partition and the expected one.
    pub fn ground_truth_score(
        candidate: &DMatrix<f64>,
        expected: &PartitionMatrix,
    ) -> EvalResult<f64> {
        if candidate.nrows() != expected.node_count() {
            return Err(EvalError::ShapeMismatch(format!(
                "candidate partition covers {} nodes, expected partition {}",
                candidate.nrows(),
                expected.node_count()
            )));
        }
        normalized_mutual_information(expected.labels(), &argmax_labels(candidate))
    }

    /// One ground-truth score per run, in run order.
    pub fn ground_truth_scores(
        runs: &[ExperimentRun],
        expected: &PartitionMatrix,
    ) -> EvalResult<Vec<f64>> {
        runs.iter()
            .map(|run| {
                let candidate = run.artifact.map.partition_matrix()?;
                Self::ground_truth_score(&candidate, expected)
            })
            .collect()
    }

    /// NMI for every pair of runs, ordered (0,1), (0,2), ..., (1,2), ...
    pub fn pairwise_scores(runs: &[ExperimentRun]) -> EvalResult<Vec<PairScore>> {
        if runs.is_empty() {
            return Err(EvalError::Configuration(
                "pairwise comparison needs at least one complete run".to_string(),
            ));
        }
        let labels = runs
            .iter()
            .map(|run| -> EvalResult<Vec<usize>> {
                Ok(argmax_labels(&run.artifact.map.partition_matrix()?))
            })
            .collect::<EvalResult<Vec<_>>>()?;

        run_pairs(labels.len())
            .into_par_iter()
            .map(|(first, second)| -> EvalResult<PairScore> {
                let score = normalized_mutual_information(&labels[first], &labels[second])?;
                Ok(PairScore {
                    first,
                    second,
                    score,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::results::model::{MapSnapshot, RunArtifact};
    use crate::storage::DenseMatrixRecord;

    fn run(id: &str, labels: &[usize], clusters: usize) -> ExperimentRun {
        let partition = PartitionMatrix::from_labels(labels, clusters).expect("partition");
        ExperimentRun {
            id: id.to_string(),
            iterations: 100,
            artifact: RunArtifact {
                traces: IndexMap::new(),
                map: MapSnapshot {
                    partition: DenseMatrixRecord::from_matrix(partition.as_matrix()),
                    log_p: 0.0,
                    scalars: IndexMap::new(),
                },
            },
        }
    }

    #[test]
    fn pairs_are_lexicographic() {
        assert_eq!(run_pairs(3), vec![(0, 1), (0, 2), (1, 2)]);
        assert_eq!(run_pairs(4).len(), 6);
        assert!(run_pairs(1).is_empty());
    }

    #[test]
    fn pairwise_scores_follow_pair_order() {
        let runs = vec![
            run("r0", &[0, 0, 1, 1], 2),
            run("r1", &[1, 1, 0, 0], 2),
            run("r2", &[0, 1, 0, 1], 2),
        ];
        let scores = PartitionComparator::pairwise_scores(&runs).expect("scores");
        let order: Vec<_> = scores.iter().map(|s| (s.first, s.second)).collect();
        assert_eq!(order, vec![(0, 1), (0, 2), (1, 2)]);
        assert!((scores[0].score - 1.0).abs() < 1e-12);
        assert!(scores[1].score.abs() < 1e-12);
    }

    #[test]
    fn empty_group_is_a_configuration_error() {
        assert!(matches!(
            PartitionComparator::pairwise_scores(&[]),
            Err(EvalError::Configuration(_))
        ));
    }

    #[test]
    fn soft_candidate_uses_row_maximum() {
        let expected = PartitionMatrix::from_block_sizes(&[2, 2]).expect("expected");
        let soft = DMatrix::from_row_slice(4, 2, &[0.8, 0.2, 0.6, 0.4, 0.3, 0.7, 0.1, 0.9]);
        let score = PartitionComparator::ground_truth_score(&soft, &expected).expect("score");
        assert!((score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn node_count_mismatch_is_rejected() {
        let expected = PartitionMatrix::from_block_sizes(&[2, 2]).expect("expected");
        let candidate = DMatrix::from_element(3, 2, 0.5);
        assert!(matches!(
            PartitionComparator::ground_truth_score(&candidate, &expected),
            Err(EvalError::ShapeMismatch(_))
        ));
    }
}
