pub mod config;
pub mod error;
pub mod evaluation;
pub mod partition;
pub mod results;
pub mod storage;
pub mod synthetic;

pub use config::{AppConfig, EvaluationConfig, IterationPolicy, SyntheticConfig};
pub use error::{EvalError, EvalResult};
pub use evaluation::{
    BestRunSelector, EvaluationWorkflow, GroupReport, PartitionComparator, RunSetReconciler,
    TraceSummary,
};
pub use partition::{argmax_labels, NodeDistribution, PartitionMatrix};
pub use results::{ExperimentGroup, ExperimentRun, FsResultStore, MemoryResultStore, ResultStore};
pub use synthetic::{
    AdjacencyMatrix, DatasetStore, GraphStack, LinkProbabilityMatrix, LinkProbabilityModel,
    SyntheticDataset, SyntheticGraphGenerator,
};
