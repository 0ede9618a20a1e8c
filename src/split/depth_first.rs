use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;

use crate::config::{resolve_workers, ExecutionMode};
use crate::error::{Result, SplitError};
use crate::graph::{SplitGraph, VInt};
use crate::scratch::{SplitScratch, WorkerBuffers};
use crate::split::{init_labels, into_labels, worker_count, AtomicVInt, Splitter};

/// DFS within each community, communities statically assigned to workers.
///
/// Worker `t` of `T` owns every community `d` with `d % T == t`, so two workers
/// never touch the same vertex and no claim is needed. Balance depends on how
/// evenly community sizes spread over the residues.
#[derive(Debug, Clone)]
pub struct DepthFirstSplitter {
    workers: usize,
    mode: ExecutionMode,
}

impl DepthFirstSplitter {
    /// `workers == 0` means one worker per core.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: resolve_workers(workers),
            mode: ExecutionMode::Parallel,
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }
}

impl Splitter for DepthFirstSplitter {
    fn split<G: SplitGraph>(
        &self,
        graph: &G,
        vdom: &[VInt],
        scratch: &mut SplitScratch,
    ) -> Result<Vec<VInt>> {
        let span = graph.span();
        let vcom = init_labels(graph, vdom, self.mode)?;
        let workers = worker_count(self.mode, self.workers, span);
        let (visited, buffers) = scratch.depth_first_parts(span, workers, self.mode)?;
        if workers == 1 {
            traverse_owned(graph, vdom, &vcom, visited, &mut buffers[0], 0, 1);
        } else {
            let vcom = vcom.as_slice();
            crossbeam::thread::scope(|scope| {
                for (t, worker_buffers) in buffers.iter_mut().enumerate() {
                    scope.spawn(move |_| {
                        traverse_owned(graph, vdom, vcom, visited, worker_buffers, t, workers)
                    });
                }
            })
            .map_err(|_| SplitError::WorkerPanicked)?;
        }
        debug!("DFS split over {} workers done", workers);
        Ok(into_labels(vcom))
    }
}

/// Scan every vertex, and DFS from each unvisited one whose community worker `t` owns.
fn traverse_owned<G: SplitGraph>(
    graph: &G,
    vdom: &[VInt],
    vcom: &[AtomicVInt],
    visited: &[AtomicBool],
    buffers: &mut WorkerBuffers,
    t: usize,
    workers: usize,
) {
    let stack = &mut buffers.starts;
    for u in 0..graph.span() as VInt {
        if !graph.has_vertex(u) {
            continue;
        }
        let d = vdom[u as usize];
        if d as usize % workers != t || visited[u as usize].load(Ordering::Relaxed) {
            continue;
        }
        // Ascending scan, so `u` is the smallest id of its subcommunity and already labelled `u`.
        visited[u as usize].store(true, Ordering::Relaxed);
        stack.clear();
        stack.push(u);
        while let Some(w) = stack.pop() {
            graph.for_each_edge_key(w, |v| {
                if graph.has_vertex(v)
                    && vdom[v as usize] == d
                    && !visited[v as usize].load(Ordering::Relaxed)
                {
                    visited[v as usize].store(true, Ordering::Relaxed);
                    vcom[v as usize].store(u, Ordering::Relaxed);
                    stack.push(v);
                }
            });
        }
    }
}
