use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context, Result};
use fixedbitset::FixedBitSet;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::READ_BUFFER_SIZE;

pub type VInt = u32;

/// The read-only graph capability the splitters work against.
///
/// Vertex ids live in `[0, span)`, some slots may be empty. Edge enumeration
/// is only ever asked for present vertices, and edges are expected in both
/// directions, connectivity is read off the out-keys.
pub trait SplitGraph: Sync {
    /// Size of the vertex-id universe.
    fn span(&self) -> usize;

    /// Whether the slot `u` holds a live vertex.
    fn has_vertex(&self, u: VInt) -> bool;

    /// Invoke `visit` on each neighbor key of `u`.
    fn for_each_edge_key<F: FnMut(VInt)>(&self, u: VInt, visit: F);
}

/// Graph Snapshot with dense vertex slots, mainly used for splitting communities.
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    pub(crate) adj_list: Vec<Vec<VInt>>,
    pub(crate) present: FixedBitSet,
    pub(crate) v_size: u32,
    pub(crate) e_size: u32,
}

impl GraphSnapshot {
    /// Create a snapshot with `span` empty slots.
    pub fn new(span: usize) -> GraphSnapshot {
        GraphSnapshot {
            adj_list: vec![Vec::new(); span],
            present: FixedBitSet::with_capacity(span),
            v_size: 0u32,
            e_size: 0u32,
        }
    }

    /// Build an undirected graph, every id in `[0, span)` is a vertex.
    pub fn from_edge_list(span: usize, edge_list: &[(VInt, VInt)]) -> GraphSnapshot {
        let mut graph = GraphSnapshot::new(span);
        for u in 0..span as VInt {
            graph.add_vertex(u);
        }
        for (src, dst) in edge_list {
            graph.add_edge(*src, *dst);
        }
        graph
    }

    pub fn add_vertex(&mut self, u: VInt) {
        let slot = u as usize;
        if slot >= self.adj_list.len() {
            self.adj_list.resize(slot + 1, Vec::new());
            self.present.grow(slot + 1);
        }
        if !self.present.put(slot) {
            self.v_size += 1;
        }
    }

    /// Like `add_vertex`, but a slot table that cannot be allocated is an error instead of an abort.
    pub fn try_add_vertex(&mut self, u: VInt) -> Result<()> {
        let slot = u as usize;
        if slot >= self.adj_list.len() {
            self.adj_list
                .try_reserve_exact(slot - self.adj_list.len() + 1)
                .with_context(|| format!("Cannot allocate slots up to vertex {}", u))?;
        }
        self.add_vertex(u);
        Ok(())
    }

    /// Empty the slot of `u`. Neighbors keep their keys to `u`, like a deleted vertex would.
    pub fn remove_vertex(&mut self, u: VInt) {
        let slot = u as usize;
        if slot < self.adj_list.len() && self.present.contains(slot) {
            self.present.set(slot, false);
            self.e_size -= self.adj_list[slot].len() as u32;
            self.adj_list[slot].clear();
            self.v_size -= 1;
        }
    }

    /// Insert the undirected edge (u, v), both endpoints are created when missing.
    pub fn add_edge(&mut self, u: VInt, v: VInt) {
        self.add_arc(u, v);
        if u != v {
            self.add_arc(v, u);
        }
    }

    /// Insert the directed edge (u -> v).
    pub fn add_arc(&mut self, u: VInt, v: VInt) {
        self.add_vertex(u);
        self.add_vertex(v);
        self.adj_list[u as usize].push(v);
        self.e_size += 1;
    }

    pub fn get_neighbor(&self, u: VInt) -> &[VInt] {
        self.adj_list.get(u as usize).map(|n| n.as_slice()).unwrap_or(&[])
    }

    pub fn get_vertex_count(&self) -> u32 {
        self.v_size
    }

    pub fn get_edge_count(&self) -> u32 {
        self.e_size
    }

    /// Load a graph from a .graph file, with the community of each vertex.
    ///
    /// The first line is a header. Vertex lines are `v <id> <label> <community>`,
    /// edge lines are `e <src> <dst>`. Returns the graph and its community assignment.
    pub fn from_graph_file_community(
        file_path: impl AsRef<Path>,
        is_directed: bool,
    ) -> Result<(Self, Vec<VInt>)> {
        let file_path = file_path.as_ref();
        let graph_file = File::open(file_path)
            .with_context(|| format!("Failed to open graph file {}", file_path.display()))?;
        let graph_reader = BufReader::with_capacity(READ_BUFFER_SIZE, graph_file);
        let mut graph = GraphSnapshot::new(0);
        let mut community_info = Vec::<(VInt, VInt)>::new();
        for (line_no, line) in graph_reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_no + 1))?;
            if line_no == 0 {
                // The header line, just skip it.
                continue;
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.first() {
                Some(&"v") => {
                    if tokens.len() < 4 {
                        bail!("Malformed vertex line {}: {}", line_no + 1, line);
                    }
                    let vertex_id = parse_token(tokens[1], line_no)?;
                    let comm_id = parse_token(tokens[3], line_no)?;
                    graph
                        .try_add_vertex(vertex_id)
                        .with_context(|| format!("Bad vertex at line {}", line_no + 1))?;
                    community_info.push((vertex_id, comm_id));
                }
                Some(&"e") => {
                    if tokens.len() < 3 {
                        bail!("Malformed edge line {}: {}", line_no + 1, line);
                    }
                    let src = parse_token(tokens[1], line_no)?;
                    let dst = parse_token(tokens[2], line_no)?;
                    for endpoint in [src, dst] {
                        graph
                            .try_add_vertex(endpoint)
                            .with_context(|| format!("Bad edge at line {}", line_no + 1))?;
                    }
                    if is_directed {
                        graph.add_arc(src, dst);
                    } else {
                        graph.add_edge(src, dst);
                    }
                }
                _ => {}
            }
        }

        let mut vdom = vec![0 as VInt; graph.span()];
        for (vertex_id, comm_id) in community_info {
            vdom[vertex_id as usize] = comm_id;
        }
        Ok((graph, vdom))
    }

    /// Generate a random undirected graph along with a random community assignment.
    /// Same seed, same graph.
    pub fn generate_random(
        span: usize,
        edge_count: usize,
        community_count: u32,
        seed: u64,
    ) -> (Self, Vec<VInt>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut graph = GraphSnapshot::from_edge_list(span, &[]);
        if span > 0 {
            for _ in 0..edge_count {
                let u = rng.gen_range(0..span) as VInt;
                let v = rng.gen_range(0..span) as VInt;
                graph.add_edge(u, v);
            }
        }
        let community_count = community_count.max(1);
        let vdom = (0..span).map(|_| rng.gen_range(0..community_count)).collect();
        (graph, vdom)
    }

    pub fn print_graph(&self) {
        for u in self.present.ones() {
            print!("{}->", u);
            for v in &self.adj_list[u] {
                print!("{}->", v);
            }
            println!("END");
        }
    }
}

fn parse_token(token: &str, line_no: usize) -> Result<VInt> {
    token
        .parse()
        .with_context(|| format!("File format error at line {}: {}", line_no + 1, token))
}

impl SplitGraph for GraphSnapshot {
    fn span(&self) -> usize {
        self.adj_list.len()
    }

    #[inline]
    fn has_vertex(&self, u: VInt) -> bool {
        self.present.contains(u as usize)
    }

    #[inline]
    fn for_each_edge_key<F: FnMut(VInt)>(&self, u: VInt, visit: F) {
        self.get_neighbor(u).iter().copied().for_each(visit);
    }
}
