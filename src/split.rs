use std::sync::atomic::AtomicU32;

use log::{debug, warn};
use rayon::prelude::*;

use crate::config::{ExecutionMode, SplitAlgorithm, SplitConfig};
use crate::error::{ensure_len, Result};
use crate::graph::{SplitGraph, VInt};
use crate::scratch::SplitScratch;
use crate::util::get_current_timestamp;

pub mod breadth_first;
pub mod depth_first;
pub mod label_propagation;
pub mod reference;

pub use breadth_first::BreadthFirstSplitter;
pub use depth_first::DepthFirstSplitter;
pub use label_propagation::LabelPropagationSplitter;
pub use reference::ReferenceSplitter;

/// Shared label cell, one per vertex slot.
pub(crate) type AtomicVInt = AtomicU32;

/// Refine a community assignment into connected subcommunities.
///
/// The returned vector has one entry per slot of the graph span. Two present
/// vertices share an entry iff they share a community and are connected through
/// vertices of that community. Entries of absent slots keep their own id.
pub trait Splitter {
    fn split<G: SplitGraph>(
        &self,
        graph: &G,
        vdom: &[VInt],
        scratch: &mut SplitScratch,
    ) -> Result<Vec<VInt>>;
}

/// Split disconnected communities with label propagation.
pub fn split_by_label_propagation<G: SplitGraph>(
    graph: &G,
    vdom: &[VInt],
    pruning: bool,
) -> Result<Vec<VInt>> {
    LabelPropagationSplitter::new(pruning).split(graph, vdom, &mut SplitScratch::new())
}

/// Split disconnected communities with DFS, communities statically owned by workers.
///
/// `workers == 0` runs one worker per core.
pub fn split_by_depth_first<G: SplitGraph>(
    graph: &G,
    vdom: &[VInt],
    workers: usize,
) -> Result<Vec<VInt>> {
    DepthFirstSplitter::new(workers).split(graph, vdom, &mut SplitScratch::new())
}

/// Split disconnected communities with BFS, communities claimed by workers on the fly.
///
/// `workers == 0` runs one worker per core.
pub fn split_by_breadth_first<G: SplitGraph>(
    graph: &G,
    vdom: &[VInt],
    workers: usize,
) -> Result<Vec<VInt>> {
    BreadthFirstSplitter::new(workers).split(graph, vdom, &mut SplitScratch::new())
}

/// Single-threaded split, labels are the smallest vertex id of each subcommunity.
pub fn split_reference<G: SplitGraph>(graph: &G, vdom: &[VInt]) -> Result<Vec<VInt>> {
    ReferenceSplitter.split(graph, vdom, &mut SplitScratch::new())
}

/// Run the splitter selected by `config`.
pub fn split_with_config<G: SplitGraph>(
    graph: &G,
    vdom: &[VInt],
    config: &SplitConfig,
    scratch: &mut SplitScratch,
) -> Result<Vec<VInt>> {
    let start = get_current_timestamp();
    let vcom = match config.algorithm {
        SplitAlgorithm::Lpa => LabelPropagationSplitter::new(config.pruning)
            .with_mode(config.mode)
            .with_workers(config.workers)
            .with_chunk_size(config.chunk_size)
            .split(graph, vdom, scratch)?,
        SplitAlgorithm::Dfs => DepthFirstSplitter::new(config.workers)
            .with_mode(config.mode)
            .split(graph, vdom, scratch)?,
        SplitAlgorithm::Bfs => BreadthFirstSplitter::new(config.workers)
            .with_mode(config.mode)
            .split(graph, vdom, scratch)?,
    };
    debug!(
        "Split {:?} ({:?}) over span {} took {} us",
        config.algorithm,
        config.mode,
        graph.span(),
        get_current_timestamp().saturating_sub(start)
    );
    Ok(vcom)
}

/// Check the caller buffers against the span, then build one label per slot, `vcom[u] = u`.
pub(crate) fn init_labels<G: SplitGraph>(
    graph: &G,
    vdom: &[VInt],
    mode: ExecutionMode,
) -> Result<Vec<AtomicVInt>> {
    let span = graph.span();
    ensure_len("vdom", vdom.len(), span)?;
    let mut vcom = Vec::new();
    vcom.try_reserve_exact(span)?;
    match mode {
        ExecutionMode::Sequential => vcom.extend((0..span as VInt).map(AtomicVInt::new)),
        ExecutionMode::Parallel => {
            vcom.par_extend((0..span as VInt).into_par_iter().map(AtomicVInt::new))
        }
    }
    Ok(vcom)
}

/// Threads a DFS or BFS split actually runs on, never more than there are vertex slots.
pub(crate) fn worker_count(mode: ExecutionMode, workers: usize, span: usize) -> usize {
    let limit = span.max(1);
    match mode {
        ExecutionMode::Sequential => 1,
        ExecutionMode::Parallel if workers > limit => {
            warn!("{} workers requested for span {}, clamped to {}", workers, span, limit);
            limit
        }
        ExecutionMode::Parallel => workers,
    }
}

pub(crate) fn into_labels(vcom: Vec<AtomicVInt>) -> Vec<VInt> {
    vcom.into_iter().map(AtomicVInt::into_inner).collect()
}

#[cfg(test)]
pub(crate) mod test_split {
    use std::collections::HashMap;

    use crate::config::{ExecutionMode, SplitAlgorithm, SplitConfig};
    use crate::error::SplitError;
    use crate::graph::{GraphSnapshot, SplitGraph, VInt};
    use crate::partition::{count_subcommunities, same_partition};
    use crate::scratch::SplitScratch;
    use crate::split::{
        split_by_breadth_first, split_by_depth_first, split_by_label_propagation,
        split_reference, split_with_config, worker_count, BreadthFirstSplitter, Splitter,
    };

    /// Edges 0-1, 1-2, 3-4, vertex 5 isolated, communities [0, 0, 0, 1, 1, 0].
    pub(crate) fn scenario_graph() -> (GraphSnapshot, Vec<VInt>) {
        let graph = GraphSnapshot::from_edge_list(6, &[(0, 1), (1, 2), (3, 4)]);
        (graph, vec![0, 0, 0, 1, 1, 0])
    }

    /// Check the refinement invariant against the reference splitter.
    pub(crate) fn assert_refines<G: SplitGraph>(graph: &G, vdom: &[VInt], vcom: &[VInt]) {
        let oracle = split_reference(graph, vdom).unwrap();
        assert!(same_partition(graph, &oracle, vcom), "vcom: {:?}, oracle: {:?}", vcom, oracle);
    }

    fn all_strategies<G: SplitGraph>(graph: &G, vdom: &[VInt], workers: usize) -> Vec<Vec<VInt>> {
        vec![
            split_by_label_propagation(graph, vdom, false).unwrap(),
            split_by_label_propagation(graph, vdom, true).unwrap(),
            split_by_depth_first(graph, vdom, workers).unwrap(),
            split_by_breadth_first(graph, vdom, workers).unwrap(),
        ]
    }

    #[test]
    fn test_scenario_all_strategies() {
        let (graph, vdom) = scenario_graph();
        for vcom in all_strategies(&graph, &vdom, 2) {
            assert_eq!(vcom[0], vcom[1]);
            assert_eq!(vcom[1], vcom[2]);
            assert_eq!(vcom[3], vcom[4]);
            assert_ne!(vcom[5], vcom[0]);
            assert_ne!(vcom[3], vcom[0]);
            assert_ne!(vcom[5], vcom[3]);
            assert_eq!(count_subcommunities(&graph, &vcom), 3);
        }
    }

    #[test]
    fn test_cross_strategy_equivalence() {
        for seed in 0..4u64 {
            let (graph, vdom) = GraphSnapshot::generate_random(2000, 2500, 7, seed);
            let oracle = split_reference(&graph, &vdom).unwrap();
            for vcom in all_strategies(&graph, &vdom, 4) {
                assert!(same_partition(&graph, &oracle, &vcom));
            }
        }
    }

    #[test]
    fn test_thread_count_invariance() {
        let (graph, vdom) = GraphSnapshot::generate_random(3000, 3500, 5, 11);
        let dfs_one = split_by_depth_first(&graph, &vdom, 1).unwrap();
        let bfs_one = split_by_breadth_first(&graph, &vdom, 1).unwrap();
        assert!(same_partition(&graph, &dfs_one, &bfs_one));
        for workers in [2usize, 8] {
            let dfs = split_by_depth_first(&graph, &vdom, workers).unwrap();
            let bfs = split_by_breadth_first(&graph, &vdom, workers).unwrap();
            // Static ownership with ascending scans always roots at the smallest id.
            assert_eq!(dfs, dfs_one);
            assert!(same_partition(&graph, &bfs_one, &bfs));
        }
    }

    #[test]
    fn test_absent_vertices() {
        let mut graph = GraphSnapshot::from_edge_list(8, &[(0, 1), (1, 2), (2, 3), (5, 6), (6, 7)]);
        graph.remove_vertex(2);
        graph.remove_vertex(6);
        graph.remove_vertex(4);
        let vdom = vec![0; 8];
        for vcom in all_strategies(&graph, &vdom, 3) {
            for absent in [2usize, 4, 6] {
                assert_eq!(vcom[absent], absent as VInt);
            }
            // Removing 2 and 6 cuts both paths.
            assert_eq!(vcom[0], vcom[1]);
            assert_ne!(vcom[1], vcom[3]);
            assert_ne!(vcom[5], vcom[7]);
            assert_eq!(count_subcommunities(&graph, &vcom), 4);
        }
    }

    #[test]
    fn test_idempotence() {
        let (graph, vdom) = GraphSnapshot::generate_random(1500, 1800, 4, 3);
        let lpa = split_by_label_propagation(&graph, &vdom, true).unwrap();
        assert_eq!(split_by_label_propagation(&graph, &lpa, true).unwrap(), lpa);
        let dfs = split_by_depth_first(&graph, &vdom, 4).unwrap();
        assert_eq!(split_by_depth_first(&graph, &dfs, 4).unwrap(), dfs);
        let bfs = split_by_breadth_first(&graph, &vdom, 1).unwrap();
        assert_eq!(split_by_breadth_first(&graph, &bfs, 1).unwrap(), bfs);
        let bfs = split_by_breadth_first(&graph, &vdom, 4).unwrap();
        assert!(same_partition(&graph, &split_by_breadth_first(&graph, &bfs, 4).unwrap(), &bfs));
    }

    #[test]
    fn test_sparse_community_ids() {
        let graph = GraphSnapshot::from_edge_list(4, &[(0, 1), (1, 2), (2, 3)]);
        let vdom = vec![1_000_000, 1_000_000, 7, 1_000_000];
        for vcom in all_strategies(&graph, &vdom, 2) {
            assert_eq!(vcom[0], vcom[1]);
            assert_ne!(vcom[1], vcom[3]);
            assert_eq!(count_subcommunities(&graph, &vcom), 3);
        }
    }

    #[test]
    fn test_community_ids_near_max() {
        let graph = GraphSnapshot::from_edge_list(4, &[(0, 1), (2, 3)]);
        let vdom = vec![VInt::MAX - 1, VInt::MAX - 1, VInt::MAX, VInt::MAX - 1];
        for vcom in all_strategies(&graph, &vdom, 2) {
            assert_refines(&graph, &vdom, &vcom);
            assert_eq!(count_subcommunities(&graph, &vcom), 3);
        }
        let pair = GraphSnapshot::from_edge_list(2, &[(0, 1)]);
        let mut scratch = SplitScratch::new();
        let vcom = BreadthFirstSplitter::new(2)
            .split(&pair, &[VInt::MAX - 1; 2], &mut scratch)
            .unwrap();
        assert_eq!(vcom, vec![0, 0]);
        // One busy flag per vertex slot at most, whatever the ids.
        assert!(scratch.busy.len() <= 2);
    }

    #[test]
    fn test_zero_workers_matches_reference() {
        let (graph, vdom) = GraphSnapshot::generate_random(2000, 2400, 5, 13);
        let oracle = split_reference(&graph, &vdom).unwrap();
        assert_eq!(split_by_depth_first(&graph, &vdom, 0).unwrap(), oracle);
        let bfs = split_by_breadth_first(&graph, &vdom, 0).unwrap();
        assert!(same_partition(&graph, &oracle, &bfs));
        let config = SplitConfig { algorithm: SplitAlgorithm::Dfs, workers: 0, ..Default::default() };
        let vcom = split_with_config(&graph, &vdom, &config, &mut SplitScratch::new()).unwrap();
        assert_eq!(vcom, oracle);
    }

    #[test]
    fn test_worker_count_is_clamped_to_span() {
        assert_eq!(worker_count(ExecutionMode::Sequential, 8, 100), 1);
        assert_eq!(worker_count(ExecutionMode::Parallel, 8, 100), 8);
        assert_eq!(worker_count(ExecutionMode::Parallel, 8, 3), 3);
        assert_eq!(worker_count(ExecutionMode::Parallel, 8, 0), 1);
    }

    #[test]
    fn test_size_mismatch() {
        let (graph, _) = scenario_graph();
        let short = vec![0 as VInt; 4];
        let errors = vec![
            split_by_label_propagation(&graph, &short, true).unwrap_err(),
            split_by_depth_first(&graph, &short, 2).unwrap_err(),
            split_by_breadth_first(&graph, &short, 2).unwrap_err(),
            split_reference(&graph, &short).unwrap_err(),
        ];
        for err in errors {
            match err {
                SplitError::SizeMismatch { buffer, expected, actual } => {
                    assert_eq!(buffer, "vdom");
                    assert_eq!(expected, 6);
                    assert_eq!(actual, 4);
                }
                other => panic!("Unexpected error: {}", other),
            }
        }
    }

    #[test]
    fn test_empty_graph() {
        let graph = GraphSnapshot::new(0);
        for vcom in all_strategies(&graph, &[], 4) {
            assert!(vcom.is_empty());
        }
    }

    #[test]
    fn test_config_modes_share_scratch() {
        let (graph, vdom) = GraphSnapshot::generate_random(1200, 1500, 6, 8);
        let oracle = split_reference(&graph, &vdom).unwrap();
        let mut scratch = SplitScratch::new();
        let mut results = HashMap::new();
        for algorithm in [SplitAlgorithm::Lpa, SplitAlgorithm::Dfs, SplitAlgorithm::Bfs] {
            for mode in [ExecutionMode::Sequential, ExecutionMode::Parallel] {
                for pruning in [false, true] {
                    let config = SplitConfig { algorithm, mode, pruning, workers: 3, ..Default::default() };
                    let vcom = split_with_config(&graph, &vdom, &config, &mut scratch).unwrap();
                    assert!(same_partition(&graph, &oracle, &vcom));
                    results.insert((algorithm as u8, mode as u8, pruning), vcom);
                }
            }
        }
        assert_eq!(results.len(), 12);
        // A smaller graph through the same, larger, scratch.
        let (small, small_vdom) = scenario_graph();
        let config = SplitConfig { algorithm: SplitAlgorithm::Bfs, workers: 2, ..Default::default() };
        let vcom = split_with_config(&small, &small_vdom, &config, &mut scratch).unwrap();
        assert_refines(&small, &small_vdom, &vcom);
    }
}
