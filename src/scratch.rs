use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::config::{ExecutionMode, DEFAULT_CHUNK_SIZE};
use crate::error::Result;
use crate::graph::VInt;

/// Buffers private to one worker of the breadth-first and depth-first splitters.
#[derive(Debug, Default)]
pub struct WorkerBuffers {
    /// Start set of the current BFS level, or the DFS stack.
    pub(crate) starts: Vec<VInt>,
    /// Next BFS level.
    pub(crate) frontier: Vec<VInt>,
    /// Vertices skipped because their community was busy.
    pub(crate) deferred: Vec<VInt>,
}

impl WorkerBuffers {
    pub(crate) fn clear(&mut self) {
        self.starts.clear();
        self.frontier.clear();
        self.deferred.clear();
    }
}

/// Scratch space for the splitters, reusable across calls.
///
/// Every buffer grows on demand and is reset by the splitter that uses it,
/// so one pool can serve graphs of different spans.
#[derive(Debug, Default)]
pub struct SplitScratch {
    pub(crate) affected: Vec<AtomicBool>,
    pub(crate) visited: Vec<AtomicBool>,
    pub(crate) busy: Vec<AtomicBool>,
    pub(crate) workers: Vec<WorkerBuffers>,
}

impl SplitScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size the pool for a graph of `span` vertices and `workers` threads.
    pub fn with_capacity(span: usize, workers: usize) -> Result<Self> {
        let mut scratch = Self::new();
        grow_flags(&mut scratch.affected, span)?;
        grow_flags(&mut scratch.visited, span)?;
        grow_flags(&mut scratch.busy, span)?;
        grow_buffers(&mut scratch.workers, workers)?;
        Ok(scratch)
    }

    /// Affected flags, all set.
    pub(crate) fn affected_flags(&mut self, span: usize, mode: ExecutionMode) -> Result<&[AtomicBool]> {
        grow_flags(&mut self.affected, span)?;
        reset_flags(&self.affected[..span], true, mode);
        Ok(&self.affected[..span])
    }

    /// Visited flags, all cleared, plus one buffer set per worker.
    pub(crate) fn depth_first_parts(
        &mut self,
        span: usize,
        workers: usize,
        mode: ExecutionMode,
    ) -> Result<(&[AtomicBool], &mut [WorkerBuffers])> {
        grow_flags(&mut self.visited, span)?;
        grow_buffers(&mut self.workers, workers)?;
        reset_flags(&self.visited[..span], false, mode);
        Ok((&self.visited[..span], clear_buffers(&mut self.workers[..workers])))
    }

    /// Visited and `slots` busy flags, all cleared, plus one buffer set per worker.
    ///
    /// Communities share busy flags modulo `slots`, so the table never depends on
    /// how large the community ids are.
    pub(crate) fn breadth_first_parts(
        &mut self,
        span: usize,
        slots: usize,
        workers: usize,
        mode: ExecutionMode,
    ) -> Result<(&[AtomicBool], &[AtomicBool], &mut [WorkerBuffers])> {
        grow_flags(&mut self.visited, span)?;
        grow_flags(&mut self.busy, slots)?;
        grow_buffers(&mut self.workers, workers)?;
        reset_flags(&self.visited[..span], false, mode);
        reset_flags(&self.busy[..slots], false, mode);
        Ok((
            &self.visited[..span],
            &self.busy[..slots],
            clear_buffers(&mut self.workers[..workers]),
        ))
    }
}

fn grow_buffers(buffers: &mut Vec<WorkerBuffers>, workers: usize) -> Result<()> {
    if buffers.len() < workers {
        buffers.try_reserve(workers - buffers.len())?;
        buffers.resize_with(workers, WorkerBuffers::default);
    }
    Ok(())
}

fn clear_buffers(buffers: &mut [WorkerBuffers]) -> &mut [WorkerBuffers] {
    buffers.iter_mut().for_each(WorkerBuffers::clear);
    buffers
}

fn grow_flags(flags: &mut Vec<AtomicBool>, len: usize) -> Result<()> {
    if flags.len() < len {
        flags.try_reserve_exact(len - flags.len())?;
        flags.resize_with(len, AtomicBool::default);
    }
    Ok(())
}

fn reset_flags(flags: &[AtomicBool], value: bool, mode: ExecutionMode) {
    let reset = |chunk: &[AtomicBool]| chunk.iter().for_each(|f| f.store(value, Ordering::Relaxed));
    match mode {
        ExecutionMode::Sequential => reset(flags),
        ExecutionMode::Parallel => flags.par_chunks(DEFAULT_CHUNK_SIZE).for_each(reset),
    }
}
