use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Result};
use clap::Parser;
use log::info;

use split_community::logger::init_logger;
use split_community::partition::{count_subcommunities, is_refinement_of, same_partition, split_community_count};
use split_community::{
    split_reference, split_with_config, ExecutionMode, GraphSnapshot, SplitAlgorithm, SplitConfig,
    SplitGraph, SplitScratch,
};

/// Split the disconnected communities of a .graph file and report the result.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Graph file, vertex lines carry the community id.
    graph: PathBuf,

    /// YAML config, flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, value_enum)]
    algorithm: Option<SplitAlgorithm>,

    #[arg(short, long, value_enum)]
    mode: Option<ExecutionMode>,

    /// Worker count, 0 means one per core.
    #[arg(short, long)]
    workers: Option<usize>,

    /// Rescan every vertex in each label propagation round.
    #[arg(long)]
    no_pruning: bool,

    #[arg(long)]
    chunk_size: Option<usize>,

    /// Edges in the file are directed.
    #[arg(long)]
    directed: bool,

    /// Check the result against the single-threaded reference splitter.
    #[arg(long)]
    verify: bool,

    /// Append logs to <LOG_DIR>/default.log instead of stderr.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.log_dir.as_deref())?;

    let mut config = match &args.config {
        Some(path) => SplitConfig::from_yaml_file(path)?,
        None => SplitConfig::default(),
    };
    if let Some(algorithm) = args.algorithm {
        config.algorithm = algorithm;
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    if args.no_pruning {
        config.pruning = false;
    }

    let (graph, vdom) = GraphSnapshot::from_graph_file_community(&args.graph, args.directed)?;
    info!(
        "Loaded {}: {} vertices, {} edges, span {}",
        args.graph.display(),
        graph.get_vertex_count(),
        graph.get_edge_count(),
        graph.span()
    );

    let mut scratch = SplitScratch::new();
    let start = Instant::now();
    let vcom = split_with_config(&graph, &vdom, &config, &mut scratch)?;
    let elapsed = start.elapsed();

    if !is_refinement_of(&graph, &vdom, &vcom) {
        bail!("Split result crosses community boundaries");
    }
    if args.verify {
        let oracle = split_reference(&graph, &vdom)?;
        if !same_partition(&graph, &oracle, &vcom) {
            bail!("Split result differs from the reference splitter");
        }
        info!("Result matches the reference splitter");
    }

    let subcommunities = count_subcommunities(&graph, &vcom);
    let split_communities = split_community_count(&graph, &vdom, &vcom);
    info!(
        "{:?} split with {} workers in {:?}: {} subcommunities, {} communities split",
        config.algorithm,
        config.effective_workers(),
        elapsed,
        subcommunities,
        split_communities
    );
    println!("algorithm: {:?}", config.algorithm);
    println!("vertices: {}", graph.get_vertex_count());
    println!("subcommunities: {}", subcommunities);
    println!("split communities: {}", split_communities);
    println!("elapsed: {:.3} ms", elapsed.as_secs_f64() * 1000.0);
    Ok(())
}
