use crate::error::{EvalError, EvalResult};
use crate::results::model::ExperimentRun;

/// Picks the canonical run of a group by its MAP objective.
pub struct BestRunSelector;

impl BestRunSelector {
    /// Index of the largest value; the first one wins on ties. NaN never wins.
    pub fn best_index(values: &[f64]) -> EvalResult<usize> {
        if values.is_empty() {
            return Err(EvalError::Configuration(
                "best-run selection needs at least one complete run".to_string(),
            ));
        }
        let mut best: Option<(usize, f64)> = None;
        for (idx, &value) in values.iter().enumerate() {
            if value.is_nan() {
                continue;
            }
            match best {
                Some((_, current)) if value <= current => {}
                _ => best = Some((idx, value)),
            }
        }
        best.map(|(idx, _)| idx).ok_or_else(|| {
            EvalError::Configuration("every MAP objective value is NaN".to_string())
        })
    }

    pub fn select(runs: &[ExperimentRun]) -> EvalResult<&ExperimentRun> {
        let objectives: Vec<f64> = runs.iter().map(|run| run.artifact.map.log_p).collect();
        let idx = Self::best_index(&objectives)?;
        Ok(&runs[idx])
    }
}
