use std::collections::hash_map::Entry;
use std::collections::HashMap;

use itertools::Itertools;

use crate::graph::{SplitGraph, VInt};

fn present_vertices<G: SplitGraph>(graph: &G) -> impl Iterator<Item = usize> + '_ {
    (0..graph.span()).filter(move |&u| graph.has_vertex(u as VInt))
}

/// Number of distinct labels among present vertices.
pub fn count_subcommunities<G: SplitGraph>(graph: &G, vcom: &[VInt]) -> usize {
    present_vertices(graph).map(|u| vcom[u]).unique().count()
}

/// Number of communities that were cut into more than one subcommunity.
pub fn split_community_count<G: SplitGraph>(graph: &G, vdom: &[VInt], vcom: &[VInt]) -> usize {
    present_vertices(graph)
        .map(|u| (vdom[u], vcom[u]))
        .unique()
        .counts_by(|(d, _)| d)
        .values()
        .filter(|&&pieces| pieces > 1)
        .count()
}

/// Whether every subcommunity lies inside a single community.
pub fn is_refinement_of<G: SplitGraph>(graph: &G, vdom: &[VInt], vcom: &[VInt]) -> bool {
    let mut owner = HashMap::<VInt, VInt>::new();
    present_vertices(graph).all(|u| *owner.entry(vcom[u]).or_insert(vdom[u]) == vdom[u])
}

/// Whether two labelings group the present vertices identically, whatever the label values.
pub fn same_partition<G: SplitGraph>(graph: &G, a: &[VInt], b: &[VInt]) -> bool {
    let mut forward = HashMap::<VInt, VInt>::new();
    let mut backward = HashMap::<VInt, VInt>::new();
    present_vertices(graph).all(|u| {
        let consistent = |map: &mut HashMap<VInt, VInt>, key: VInt, value: VInt| match map.entry(key) {
            Entry::Occupied(entry) => *entry.get() == value,
            Entry::Vacant(entry) => {
                entry.insert(value);
                true
            }
        };
        consistent(&mut forward, a[u], b[u]) && consistent(&mut backward, b[u], a[u])
    })
}
