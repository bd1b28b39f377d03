use multigraph_eval::synthetic::generator::node_link_probabilities;
use multigraph_eval::{
    DatasetStore, EvalError, NodeDistribution, SyntheticConfig, SyntheticGraphGenerator,
};

fn config(clusters: usize, distribution: NodeDistribution, alpha: f64) -> SyntheticConfig {
    SyntheticConfig {
        cluster_count: clusters,
        population1_graphs: 5,
        population2_graphs: 5,
        distribution,
        alpha,
        seed: Some(7),
        ..SyntheticConfig::default()
    }
}

#[test]
fn balanced_two_cluster_dataset_end_to_end() {
    let generator =
        SyntheticGraphGenerator::new(config(2, NodeDistribution::Balanced, 0.0)).expect("config");
    let dataset = generator.generate().expect("generate");

    assert_eq!(dataset.graphs.len(), 10);
    assert_eq!(dataset.graphs.population1().len(), 5);
    assert_eq!(dataset.graphs.population2().len(), 5);
    for graph in dataset.graphs.graphs() {
        assert_eq!(graph.node_count(), 100);
        let a = graph.as_matrix();
        for i in 0..100 {
            assert_eq!(a[(i, i)], 0, "self loop at node {i}");
            for j in (i + 1)..100 {
                assert_eq!(a[(i, j)], a[(j, i)], "asymmetric entry ({i}, {j})");
            }
        }
    }

    assert_eq!(dataset.partition.cluster_sizes(), vec![50, 50]);
    assert!(dataset.partition.labels()[..50].iter().all(|&l| l == 0));
    assert!(dataset.partition.labels()[50..].iter().all(|&l| l == 1));

    // Fully separated populations differ in every off-diagonal entry.
    assert_eq!(dataset.expected, dataset.partition);
}

#[test]
fn identical_populations_collapse_to_one_cluster() {
    let generator =
        SyntheticGraphGenerator::new(config(5, NodeDistribution::Balanced, 0.5)).expect("config");
    let dataset = generator.generate().expect("generate");

    assert_eq!(
        dataset.etas.population1.as_matrix(),
        dataset.etas.population2.as_matrix()
    );
    assert_eq!(dataset.expected.cluster_count(), 1);
    assert_eq!(dataset.expected.node_count(), 100);
}

#[test]
fn unbalanced_layout_uses_fixed_sizes() {
    let generator = SyntheticGraphGenerator::new(config(5, NodeDistribution::Unbalanced, 0.1))
        .expect("config");
    let dataset = generator.generate().expect("generate");
    assert_eq!(dataset.partition.cluster_sizes(), vec![60, 20, 10, 5, 5]);
}

#[test]
fn unsupported_unbalanced_cluster_count_is_rejected() {
    let err = SyntheticGraphGenerator::new(config(3, NodeDistribution::Unbalanced, 0.0))
        .and_then(|generator| generator.generate())
        .expect_err("K=3 has no unbalanced layout");
    assert!(matches!(err, EvalError::Configuration(_)));
}

#[test]
fn same_seed_reproduces_dataset() {
    let first = SyntheticGraphGenerator::new(config(2, NodeDistribution::Balanced, 0.2))
        .expect("config")
        .generate()
        .expect("generate");
    let second = SyntheticGraphGenerator::new(config(2, NodeDistribution::Balanced, 0.2))
        .expect("config")
        .generate()
        .expect("generate");

    assert_eq!(first.etas.base.as_matrix(), second.etas.base.as_matrix());
    assert_eq!(first.graphs, second.graphs);
    assert_eq!(first.expected, second.expected);
}

#[test]
fn node_probabilities_follow_cluster_membership() {
    let dataset = SyntheticGraphGenerator::new(config(2, NodeDistribution::Balanced, 0.0))
        .expect("config")
        .generate()
        .expect("generate");
    let m = node_link_probabilities(&dataset.partition, &dataset.etas.population1)
        .expect("node probabilities");
    let eta = &dataset.etas.population1;

    assert_eq!(m.shape(), (100, 100));
    assert_eq!(m[(0, 1)], eta.get(0, 0));
    assert_eq!(m[(0, 99)], eta.get(0, 1));
    assert_eq!(m[(99, 98)], eta.get(1, 1));
}

#[test]
fn persisted_dataset_loads_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dataset = SyntheticGraphGenerator::new(config(2, NodeDistribution::Balanced, 0.1))
        .expect("config")
        .generate()
        .expect("generate");

    let store = DatasetStore::new(dir.path());
    let names = store.write(&dataset).expect("write");
    assert_eq!(names.graphs, "A_2_5_5_balanced_0.1");
    assert_eq!(names.expected, "Zexp_2_balanced_0.1");
    for name in [
        &names.graphs,
        &names.partition,
        &names.expected,
        &names.population1,
        &names.population2,
    ] {
        assert!(dir.path().join(format!("{name}.json")).is_file(), "{name}");
    }

    let expected = store
        .load_expected_partition(2, NodeDistribution::Balanced, 0.1)
        .expect("load expected");
    assert_eq!(expected, dataset.expected);

    let graphs = store.load_graph_stack(&dataset.config).expect("load graphs");
    assert_eq!(graphs, dataset.graphs);
}
