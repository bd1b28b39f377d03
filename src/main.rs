use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};

use multigraph_eval::results::{discover_runs, group_runs, ExperimentGroup};
use multigraph_eval::{
    AppConfig, DatasetStore, EvaluationWorkflow, FsResultStore, GroupReport, NodeDistribution,
    PartitionMatrix, SyntheticGraphGenerator,
};

/// Synthetic multi-graph generation and cross-run cluster recovery evaluation
#[derive(Parser, Debug)]
#[command(name = "multigraph-eval")]
#[command(about = "Generate synthetic multi-graph datasets and evaluate clustering runs")]
struct Cli {
    /// JSON configuration file; flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate and persist one synthetic dataset
    Generate(GenerateArgs),
    /// Aggregate result artifacts of every experiment group
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Number of generating clusters
    #[arg(short = 'k', long)]
    clusters: Option<usize>,

    /// Graphs drawn from population 1
    #[arg(long)]
    s1: Option<usize>,

    /// Graphs drawn from population 2
    #[arg(long)]
    s2: Option<usize>,

    /// Node distribution: balanced or unbalanced
    #[arg(short, long)]
    distribution: Option<NodeDistribution>,

    /// Population similarity in [0, 0.5]
    #[arg(short, long)]
    alpha: Option<f64>,

    /// Random seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Output directory
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Directory holding one subdirectory per run
    #[arg(short, long)]
    results: PathBuf,

    /// Synthetic dataset directory used for ground-truth scoring
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Report file (stdout if not specified)
    #[arg(long)]
    report: Option<PathBuf>,
}

fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => {
            AppConfig::from_path(path).with_context(|| format!("load config from {:?}", path))?
        }
        None => AppConfig::default(),
    };

    match cli.command {
        Command::Generate(args) => generate(config, args),
        Command::Evaluate(args) => evaluate(config, args),
    }
}

fn generate(config: AppConfig, args: GenerateArgs) -> Result<()> {
    let mut synthetic = config.synthetic;
    if let Some(clusters) = args.clusters {
        synthetic.cluster_count = clusters;
    }
    if let Some(s1) = args.s1 {
        synthetic.population1_graphs = s1;
    }
    if let Some(s2) = args.s2 {
        synthetic.population2_graphs = s2;
    }
    if let Some(distribution) = args.distribution {
        synthetic.distribution = distribution;
    }
    if let Some(alpha) = args.alpha {
        synthetic.alpha = alpha;
    }
    if args.seed.is_some() {
        synthetic.seed = args.seed;
    }

    let generator = SyntheticGraphGenerator::new(synthetic).context("validate dataset config")?;
    let dataset = generator.generate().context("generate synthetic dataset")?;
    let names = DatasetStore::new(&args.output)
        .write(&dataset)
        .with_context(|| format!("persist dataset to {:?}", args.output))?;

    let edges: usize = dataset.graphs.graphs().iter().map(|g| g.edge_count()).sum();
    info!(
        "Dataset {}: seed {}, {} graphs, {:.1} edges per graph, expected partition {}",
        names.graphs,
        dataset.seed,
        dataset.graphs.len(),
        edges as f64 / dataset.graphs.len().max(1) as f64,
        names.expected
    );
    Ok(())
}

fn evaluate(config: AppConfig, args: EvaluateArgs) -> Result<()> {
    let records = discover_runs(&args.results)
        .with_context(|| format!("discover runs under {:?}", args.results))?;
    if records.is_empty() {
        anyhow::bail!("No run logs found under {:?}", args.results);
    }
    let groups = group_runs(records);
    info!("Found {} experiment groups", groups.len());

    let datasets = args.data.as_deref().map(DatasetStore::new);
    let workflow = EvaluationWorkflow::new(
        FsResultStore::new(&args.results),
        config.evaluation,
    );

    let mut reports: Vec<GroupReport> = Vec::with_capacity(groups.len());
    for group in &groups {
        let expected = match &datasets {
            Some(store) => expected_partition(store, group).unwrap_or_else(|err| {
                warn!("No ground truth for group [{}]: {err:#}", group.describe());
                None
            }),
            None => None,
        };
        match workflow.evaluate(group, expected.as_ref()) {
            Ok(report) => {
                log_report(&report);
                reports.push(report);
            }
            Err(err) => warn!("Skipping group [{}]: {err}", group.describe()),
        }
    }

    let json = serde_json::to_string_pretty(&reports).context("serialize group reports")?;
    match &args.report {
        Some(path) => {
            write_report(path, &json)?;
            info!("Wrote {} group reports to {:?}", reports.len(), path);
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Ground truth for groups whose configuration names a synthetic dataset.
fn expected_partition(
    store: &DatasetStore,
    group: &ExperimentGroup,
) -> Result<Option<PartitionMatrix>> {
    let cluster_count = group.config.get("K").and_then(|v| v.as_i64());
    let distribution = group.config.get("Nc_type").and_then(|v| v.as_str());
    let alpha = group.config.get("alpha").and_then(|v| v.as_f64());
    let (Some(cluster_count), Some(distribution), Some(alpha)) =
        (cluster_count, distribution, alpha)
    else {
        return Ok(None);
    };

    let distribution: NodeDistribution = distribution.parse()?;
    let cluster_count = usize::try_from(cluster_count)
        .with_context(|| format!("invalid cluster count {cluster_count}"))?;
    let partition = store
        .load_expected_partition(cluster_count, distribution, alpha)
        .with_context(|| format!("load expected partition under {:?}", store.root()))?;
    Ok(Some(partition))
}

fn log_report(report: &GroupReport) {
    if let Some(scores) = &report.ground_truth_nmi {
        let mean = scores.iter().sum::<f64>() / scores.len().max(1) as f64;
        info!(
            "Best run {}: mean ground-truth NMI {:.3} over {} runs",
            report.best_run,
            mean,
            scores.len()
        );
    }
    if !report.pairwise_nmi.is_empty() {
        let mean = report.pairwise_nmi.iter().map(|p| p.score).sum::<f64>()
            / report.pairwise_nmi.len() as f64;
        info!(
            "Best run {}: mean pairwise NMI {:.3} over {} pairs",
            report.best_run,
            mean,
            report.pairwise_nmi.len()
        );
    }
}

fn write_report(path: &Path, json: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create report directory {:?}", parent))?;
    }
    fs::write(path, json).with_context(|| format!("write report to {:?}", path))
}
