//! Split disconnected communities.
//!
//! An upstream community detection pass may leave a community spread over
//! several disconnected pieces. The splitters here relabel every vertex with a
//! representative vertex id of its connected piece inside its community.

pub mod config;
pub mod error;
pub mod graph;
pub mod logger;
pub mod partition;
pub mod scratch;
pub mod split;
mod util;

pub use config::{ExecutionMode, SplitAlgorithm, SplitConfig};
pub use error::{Result, SplitError};
pub use graph::{GraphSnapshot, SplitGraph, VInt};
pub use scratch::SplitScratch;
pub use split::{
    split_by_breadth_first, split_by_depth_first, split_by_label_propagation, split_reference,
    split_with_config, BreadthFirstSplitter, DepthFirstSplitter, LabelPropagationSplitter,
    ReferenceSplitter, Splitter,
};
