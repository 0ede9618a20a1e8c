use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use rayon::prelude::*;

use crate::config::{ExecutionMode, DEFAULT_CHUNK_SIZE};
use crate::error::Result;
use crate::graph::{SplitGraph, VInt};
use crate::scratch::SplitScratch;
use crate::split::{init_labels, into_labels, AtomicVInt, Splitter};

/// Label propagation within each community.
///
/// Every vertex starts as its own label and repeatedly adopts the smallest label
/// among its same-community neighbors, until a round changes nothing. Labels only
/// decrease, so stale reads of a neighbor only delay convergence and the rounds
/// need no locking. The final label is the smallest vertex id of the subcommunity.
#[derive(Debug, Clone)]
pub struct LabelPropagationSplitter {
    pruning: bool,
    mode: ExecutionMode,
    workers: usize,
    chunk_size: usize,
}

impl LabelPropagationSplitter {
    /// With `pruning`, a round only rescans vertices whose neighbors changed in the previous one.
    pub fn new(pruning: bool) -> Self {
        Self {
            pruning,
            mode: ExecutionMode::Parallel,
            workers: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Run the rounds on a dedicated pool of `workers` threads, 0 keeps the current pool.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn run<G: SplitGraph>(
        &self,
        graph: &G,
        vdom: &[VInt],
        scratch: &mut SplitScratch,
    ) -> Result<Vec<VInt>> {
        let vcom = init_labels(graph, vdom, self.mode)?;
        let affected = if self.pruning {
            Some(scratch.affected_flags(graph.span(), self.mode)?)
        } else {
            None
        };
        let mut rounds = 0usize;
        loop {
            rounds += 1;
            let changed = self.propagate_round(graph, vdom, &vcom, affected);
            if changed == 0 {
                break;
            }
        }
        debug!(
            "Label propagation converged after {} rounds (pruning: {})",
            rounds, self.pruning
        );
        Ok(into_labels(vcom))
    }

    /// One synchronized round, returns the number of labels that decreased.
    pub(crate) fn propagate_round<G: SplitGraph>(
        &self,
        graph: &G,
        vdom: &[VInt],
        vcom: &[AtomicVInt],
        affected: Option<&[AtomicBool]>,
    ) -> usize {
        let span = graph.span() as VInt;
        match self.mode {
            ExecutionMode::Sequential => (0..span)
                .filter(|&u| update_label(graph, vdom, vcom, affected, u))
                .count(),
            ExecutionMode::Parallel => (0..span)
                .into_par_iter()
                .with_min_len(self.chunk_size)
                .filter(|&u| update_label(graph, vdom, vcom, affected, u))
                .count(),
        }
    }
}

impl Splitter for LabelPropagationSplitter {
    fn split<G: SplitGraph>(
        &self,
        graph: &G,
        vdom: &[VInt],
        scratch: &mut SplitScratch,
    ) -> Result<Vec<VInt>> {
        if self.mode == ExecutionMode::Sequential || self.workers == 0 {
            return self.run(graph, vdom, scratch);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()?;
        pool.install(|| self.run(graph, vdom, scratch))
    }
}

/// Pull the smallest same-community label into `u`. Returns whether it decreased.
fn update_label<G: SplitGraph>(
    graph: &G,
    vdom: &[VInt],
    vcom: &[AtomicVInt],
    affected: Option<&[AtomicBool]>,
    u: VInt,
) -> bool {
    if !graph.has_vertex(u) {
        return false;
    }
    // Flags are RMW on both sides, so clearing one acquires every label written before it was set.
    if let Some(affected) = affected {
        if !affected[u as usize].swap(false, Ordering::AcqRel) {
            return false;
        }
    }
    let d = vdom[u as usize];
    let current = vcom[u as usize].load(Ordering::Relaxed);
    let mut c = current;
    graph.for_each_edge_key(u, |v| {
        if graph.has_vertex(v) && vdom[v as usize] == d {
            c = c.min(vcom[v as usize].load(Ordering::Relaxed));
        }
    });
    if c == current {
        return false;
    }
    // Only the task scanning `u` writes its label.
    vcom[u as usize].store(c, Ordering::Relaxed);
    if let Some(affected) = affected {
        graph.for_each_edge_key(u, |v| {
            if graph.has_vertex(v) && vdom[v as usize] == d {
                affected[v as usize].swap(true, Ordering::AcqRel);
            }
        });
    }
    true
}
