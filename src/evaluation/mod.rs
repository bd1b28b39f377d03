pub mod compare;
pub mod nmi;
pub mod reconcile;
pub mod select;
pub mod workflow;

pub use compare::{run_pairs, PairScore, PartitionComparator};
pub use nmi::normalized_mutual_information;
pub use reconcile::{RunSetReconciler, TraceSummary};
pub use select::BestRunSelector;
pub use workflow::{map_values, trace_summary, CompleteRuns, EvaluationWorkflow, GroupReport};
