use std::collections::VecDeque;

use fixedbitset::FixedBitSet;

use crate::error::{ensure_len, Result};
use crate::graph::{SplitGraph, VInt};
use crate::scratch::SplitScratch;
use crate::split::Splitter;

/// Plain single-threaded BFS split, used as the oracle of the parallel splitters.
/// Labels are the smallest vertex id of each subcommunity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceSplitter;

impl Splitter for ReferenceSplitter {
    fn split<G: SplitGraph>(
        &self,
        graph: &G,
        vdom: &[VInt],
        _scratch: &mut SplitScratch,
    ) -> Result<Vec<VInt>> {
        let span = graph.span();
        ensure_len("vdom", vdom.len(), span)?;
        let mut vcom: Vec<VInt> = Vec::new();
        vcom.try_reserve_exact(span)?;
        vcom.extend(0..span as VInt);

        let mut visited = FixedBitSet::with_capacity(span);
        let mut queue: VecDeque<VInt> = VecDeque::new();
        for root in 0..span as VInt {
            if !graph.has_vertex(root) || visited.put(root as usize) {
                continue;
            }
            let d = vdom[root as usize];
            queue.push_back(root);
            while let Some(u) = queue.pop_front() {
                graph.for_each_edge_key(u, |v| {
                    if graph.has_vertex(v) && vdom[v as usize] == d && !visited.put(v as usize) {
                        vcom[v as usize] = root;
                        queue.push_back(v);
                    }
                });
            }
        }
        Ok(vcom)
    }
}
