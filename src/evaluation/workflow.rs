use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::EvaluationConfig;
use crate::error::{EvalError, EvalResult};
use crate::evaluation::compare::{PairScore, PartitionComparator};
use crate::evaluation::reconcile::{RunSetReconciler, TraceSummary};
use crate::evaluation::select::BestRunSelector;
use crate::partition::PartitionMatrix;
use crate::results::model::{ConfigRecord, ExperimentGroup, ExperimentRun, RunId, OBJECTIVE_KEY};
use crate::results::store::ResultStore;

/// Members of a group that reached the required iteration count.
#[derive(Debug, Clone)]
pub struct CompleteRuns {
    pub iterations: usize,
    pub runs: Vec<ExperimentRun>,
    pub skipped: Vec<RunId>,
}

/// Aggregate statistics for one experiment group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupReport {
    pub config: ConfigRecord,
    pub iterations: usize,
    pub complete_runs: Vec<RunId>,
    pub skipped_runs: Vec<RunId>,
    pub best_run: RunId,
    pub best_log_p: f64,
    pub map_objectives: Vec<f64>,
    pub traces: IndexMap<String, TraceSummary>,
    pub pairwise_nmi: Vec<PairScore>,
    pub ground_truth_nmi: Option<Vec<f64>>,
}

pub struct EvaluationWorkflow<S> {
    store: S,
    config: EvaluationConfig,
}

impl<S: ResultStore> EvaluationWorkflow<S> {
    pub fn new(store: S, config: EvaluationConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn required_iterations(&self, group: &ExperimentGroup) -> usize {
        let initial_clusters = group
            .config
            .get(&self.config.initial_clusters_key)
            .and_then(|value| value.as_i64());
        self.config.iterations.required_iterations(initial_clusters)
    }

    /// Load every member whose artifact exists; the rest are listed as skipped.
    pub fn complete_runs(&self, group: &ExperimentGroup) -> EvalResult<CompleteRuns> {
        let iterations = self.required_iterations(group);
        let mut runs = Vec::with_capacity(group.runs.len());
        let mut skipped = Vec::new();
        for id in &group.runs {
            match self.store.require(id, iterations) {
                Ok(run) => runs.push(run),
                Err(err) if err.is_incomplete_run() => {
                    debug!("Skipping run: {err}");
                    skipped.push(id.clone());
                }
                Err(err) => return Err(err),
            }
        }
        Ok(CompleteRuns {
            iterations,
            runs,
            skipped,
        })
    }

    pub fn evaluate(
        &self,
        group: &ExperimentGroup,
        expected: Option<&PartitionMatrix>,
    ) -> EvalResult<GroupReport> {
        let complete = self.complete_runs(group)?;
        if complete.runs.is_empty() {
            return Err(EvalError::Configuration(format!(
                "group [{}] has no complete runs at {} iterations",
                group.describe(),
                complete.iterations
            )));
        }

        let best = BestRunSelector::select(&complete.runs)?;
        let map_objectives = map_values(&complete.runs, OBJECTIVE_KEY)?;

        let mut traces = IndexMap::new();
        for parameter in &self.config.traced_parameters {
            let summary = trace_summary(&complete.runs, parameter)?;
            traces.insert(parameter.clone(), summary);
        }

        let pairwise_nmi = PartitionComparator::pairwise_scores(&complete.runs)?;
        let ground_truth_nmi = expected
            .map(|expected| PartitionComparator::ground_truth_scores(&complete.runs, expected))
            .transpose()?;

        info!(
            "Group [{}]: {} complete, {} skipped, best run {} (logP {:.3})",
            group.describe(),
            complete.runs.len(),
            complete.skipped.len(),
            best.id,
            best.artifact.map.log_p
        );

        Ok(GroupReport {
            config: group.config.clone(),
            iterations: complete.iterations,
            complete_runs: complete.runs.iter().map(|run| run.id.clone()).collect(),
            skipped_runs: complete.skipped,
            best_run: best.id.clone(),
            best_log_p: best.artifact.map.log_p,
            map_objectives,
            traces,
            pairwise_nmi,
            ground_truth_nmi,
        })
    }
}

/// Mean/min/max envelope of one traced parameter across runs.
pub fn trace_summary(runs: &[ExperimentRun], parameter: &str) -> EvalResult<TraceSummary> {
    let traces = runs
        .iter()
        .map(|run| {
            run.artifact.trace(parameter).ok_or_else(|| {
                EvalError::Configuration(format!(
                    "run '{}' has no trace for parameter '{parameter}'",
                    run.id
                ))
            })
        })
        .collect::<EvalResult<Vec<_>>>()?;
    RunSetReconciler::summarize(&traces)
}

/// The named MAP scalar of every run, in run order.
pub fn map_values(runs: &[ExperimentRun], parameter: &str) -> EvalResult<Vec<f64>> {
    runs.iter()
        .map(|run| {
            run.artifact.map.value(parameter).ok_or_else(|| {
                EvalError::Configuration(format!(
                    "run '{}' has no MAP value for '{parameter}'",
                    run.id
                ))
            })
        })
        .collect()
}
