use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, EvalResult};

/// Elementwise envelope of a set of aligned traces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSummary {
    pub runs: usize,
    pub length: usize,
    pub mean: Vec<f64>,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

/// Aligns per-run traces of differing lengths.
///
/// Alignment policy: the shortest trace length over the whole set is found
/// first, and every trace is truncated to it. Traces are never padded, so the
/// result does not depend on the order in which runs are supplied.
pub struct RunSetReconciler;

impl RunSetReconciler {
    pub fn aligned_length<T: AsRef<[f64]>>(traces: &[T]) -> Option<usize> {
        traces.iter().map(|trace| trace.as_ref().len()).min()
    }

    /// Runs × iterations matrix of the truncated traces.
    pub fn align<T: AsRef<[f64]>>(traces: &[T]) -> EvalResult<Array2<f64>> {
        let length = Self::aligned_length(traces).ok_or_else(|| {
            EvalError::Configuration("cannot reconcile an empty set of traces".to_string())
        })?;
        let data: Vec<f64> = traces
            .iter()
            .flat_map(|trace| trace.as_ref()[..length].iter().copied())
            .collect();
        Array2::from_shape_vec((traces.len(), length), data)
            .map_err(|err| EvalError::ShapeMismatch(format!("aligning traces: {err}")))
    }

    pub fn summarize<T: AsRef<[f64]>>(traces: &[T]) -> EvalResult<TraceSummary> {
        let aligned = Self::align(traces)?;
        let (runs, length) = aligned.dim();
        let mean = aligned.mean_axis(Axis(0)).ok_or_else(|| {
            EvalError::ShapeMismatch("mean over an empty run axis".to_string())
        })?;
        let min = aligned.fold_axis(Axis(0), f64::INFINITY, |&acc, &v| acc.min(v));
        let max = aligned.fold_axis(Axis(0), f64::NEG_INFINITY, |&acc, &v| acc.max(v));

        Ok(TraceSummary {
            runs,
            length,
            mean: mean.to_vec(),
            min: min.to_vec(),
            max: max.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn traces() -> Vec<Vec<f64>> {
        vec![
            (0..10).map(|i| i as f64).collect(),
            (0..7).map(|i| 10.0 + i as f64).collect(),
            (0..12).map(|i| -(i as f64) - 2.0).collect(),
        ]
    }

    #[test]
    fn aligns_to_global_minimum_regardless_of_order() {
        let forward = traces();
        let mut reversed = traces();
        reversed.reverse();

        for set in [forward, reversed] {
            let summary = RunSetReconciler::summarize(&set).expect("summary");
            assert_eq!(summary.length, 7);
            assert_eq!(summary.runs, 3);
            assert!((summary.mean[0] - (0.0 + 10.0 - 2.0) / 3.0).abs() < 1e-12);
            assert_eq!(summary.min[0], -2.0);
            assert_eq!(summary.max[0], 10.0);
            assert_eq!(summary.max[6], 16.0);
        }
    }

    #[test]
    fn shorter_traces_are_never_zero_padded() {
        let set = vec![vec![5.0, 5.0, 5.0], vec![5.0]];
        let summary = RunSetReconciler::summarize(&set).expect("summary");
        assert_eq!(summary.length, 1);
        assert_eq!(summary.mean, vec![5.0]);
    }

    #[test]
    fn empty_set_is_rejected() {
        let empty: Vec<Vec<f64>> = Vec::new();
        assert!(matches!(
            RunSetReconciler::summarize(&empty),
            Err(EvalError::Configuration(_))
        ));
    }
}
