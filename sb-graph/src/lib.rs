//! The directed multigraph abstraction for street networks: nodes, edges,
//! highway classification, and subgraph extraction (spec §4.1).

pub mod highway;
pub mod model;

pub use highway::HighwayClass;
pub use model::{normalize_osm_ids, Edge, EdgeId, Graph, Node, NodeId};
