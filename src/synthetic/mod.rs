pub mod generator;
pub mod link_probability;
pub mod persistence;

pub use generator::{AdjacencyMatrix, GraphStack, SyntheticDataset, SyntheticGraphGenerator};
pub use link_probability::{LinkProbabilityMatrix, LinkProbabilityModel, PopulationEtas};
pub use persistence::{DatasetNames, DatasetStore};
