use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;

use crate::config::{resolve_workers, ExecutionMode};
use crate::error::{Result, SplitError};
use crate::graph::{SplitGraph, VInt};
use crate::scratch::{SplitScratch, WorkerBuffers};
use crate::split::{init_labels, into_labels, worker_count, AtomicVInt, Splitter};

/// BFS within each community, communities claimed dynamically by workers.
///
/// A worker owns a community while it holds the busy flag its id maps to, and
/// only then touches the visited flags and labels of its vertices. Independent
/// communities are split in parallel and a large community does not pin the
/// rest of the work to one worker.
#[derive(Debug, Clone)]
pub struct BreadthFirstSplitter {
    workers: usize,
    mode: ExecutionMode,
}

/// What happened to a scanned vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    /// Absent, already visited, or traversed now.
    Done,
    /// Another worker holds the community.
    Busy,
}

impl BreadthFirstSplitter {
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

impl Splitter for BreadthFirstSplitter {
    fn split<G: SplitGraph>(
        &self,
        graph: &G,
        vdom: &[VInt],
        scratch: &mut SplitScratch,
    ) -> Result<Vec<VInt>> {
        let span = graph.span();
        let vcom = init_labels(graph, vdom, self.mode)?;
        let slots = span.max(1);
        let workers = worker_count(self.mode, self.workers, span);
        let (visited, busy, buffers) = scratch.breadth_first_parts(span, slots, workers, self.mode)?;
        let shared = SharedState { graph, vdom, vcom: &vcom, visited, busy };
        if workers == 1 {
            shared.run_worker(&mut buffers[0], 0, 1);
        } else {
            let shared = &shared;
            crossbeam::thread::scope(|scope| {
                for (t, worker_buffers) in buffers.iter_mut().enumerate() {
                    scope.spawn(move |_| shared.run_worker(worker_buffers, t, workers));
                }
            })
            .map_err(|_| SplitError::WorkerPanicked)?;
        }
        debug!(
            "BFS split over {} workers, {} busy flags",
            workers, slots
        );
        Ok(into_labels(vcom))
    }
}

/// State every worker reads, plus the flags and labels guarded by the busy flags.
struct SharedState<'a, G: SplitGraph> {
    graph: &'a G,
    vdom: &'a [VInt],
    vcom: &'a [AtomicVInt],
    visited: &'a [AtomicBool],
    busy: &'a [AtomicBool],
}

impl<'a, G: SplitGraph> SharedState<'a, G> {
    /// Scan the whole range starting at the worker offset, then retry what was busy.
    fn run_worker(&self, buffers: &mut WorkerBuffers, t: usize, workers: usize) {
        let span = self.graph.span();
        let begin = t * span / workers;
        for u in (begin..span).chain(0..begin) {
            if self.visit(u as VInt, buffers) == Visit::Busy {
                buffers.deferred.push(u as VInt);
            }
        }
        let mut pending = std::mem::take(&mut buffers.deferred);
        while !pending.is_empty() {
            pending.retain(|&u| self.visit(u, buffers) == Visit::Busy);
            if !pending.is_empty() {
                std::thread::yield_now();
            }
        }
        buffers.deferred = pending;
    }

    /// Claim the community of `u` and BFS from `u` if it is still unvisited.
    fn visit(&self, u: VInt, buffers: &mut WorkerBuffers) -> Visit {
        if !self.graph.has_vertex(u) || self.visited[u as usize].load(Ordering::Relaxed) {
            return Visit::Done;
        }
        let d = self.vdom[u as usize];
        // Communities sharing a slot only serialize, a claim still needs false -> true.
        let flag = &self.busy[d as usize % self.busy.len()];
        if flag.load(Ordering::Relaxed)
            || flag
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_err()
        {
            return Visit::Busy;
        }
        // The previous owner may have reached `u` between the check and the claim.
        if !self.visited[u as usize].load(Ordering::Relaxed) {
            self.traverse(u, d, buffers);
        }
        flag.store(false, Ordering::Release);
        Visit::Done
    }

    /// Level by level BFS from `u` inside community `d`, labelling every vertex `u`.
    fn traverse(&self, u: VInt, d: VInt, buffers: &mut WorkerBuffers) {
        let WorkerBuffers { starts, frontier, .. } = buffers;
        starts.clear();
        frontier.clear();
        starts.push(u);
        self.visited[u as usize].store(true, Ordering::Relaxed);
        while !starts.is_empty() {
            for &w in starts.iter() {
                self.graph.for_each_edge_key(w, |v| {
                    if self.graph.has_vertex(v)
                        && self.vdom[v as usize] == d
                        && !self.visited[v as usize].load(Ordering::Relaxed)
                    {
                        self.visited[v as usize].store(true, Ordering::Relaxed);
                        self.vcom[v as usize].store(u, Ordering::Relaxed);
                        frontier.push(v);
                    }
                });
            }
            std::mem::swap(starts, frontier);
            frontier.clear();
        }
    }
}
