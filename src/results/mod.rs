pub mod catalog;
pub mod model;
pub mod store;

pub use catalog::{discover_runs, group_runs, parse_log_record};
pub use model::{
    ConfigRecord, ConfigValue, ExperimentGroup, ExperimentRun, MapSnapshot, RunArtifact, RunId,
    OBJECTIVE_KEY,
};
pub use store::{FsResultStore, MemoryResultStore, ResultStore};
