//! QoS-aware routing
//!
//! Turns the link list, host map, and current per-port samples into a
//! weighted switch graph for one request, then answers single best path,
//! k best paths (Yen), and hop-count queries. Paths come back as both
//! switch lists and host/port label sequences.

#![warn(missing_docs)]

pub mod dijkstra;
pub mod engine;
pub mod error;
pub mod expand;
pub mod graph;
pub mod ksp;
pub mod policy;
pub mod topology;

pub use dijkstra::{path_cost, shortest_path, Exclusions, WeightedPath};
pub use engine::*;
pub use error::*;
pub use expand::{expand, hop_keys, Resolved};
pub use graph::*;
pub use ksp::k_shortest_paths;
pub use policy::*;
pub use topology::*;
