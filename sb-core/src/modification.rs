use serde::{Deserialize, Serialize};

use sb_geom::LonLat;
use sb_graph::{EdgeId, Graph, NodeId};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Direction {
    UToV,
    VToU,
}

/// Tagged variant for the three modification kinds a cut edge can become
/// (§4.10, design note "Polymorphic modifications").
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ModificationKind {
    ModalFilter,
    OneWay { direction: Direction },
    FullClosure,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Modification {
    pub u: NodeId,
    pub v: NodeId,
    /// One representative parallel-edge key the modification was derived
    /// from; the modification itself applies to every parallel edge
    /// between `u` and `v`, not just this key.
    pub key: u32,
    pub kind: ModificationKind,
    pub location: LonLat,
    pub rationale: String,
}

/// Sorts modifications within one superblock by (u, v, key) ascending
/// before emission, per the ordering guarantee in §5.
pub fn sort_modifications(mods: &mut [Modification]) {
    mods.sort_by_key(|m| (m.u, m.v, m.key));
}

fn parallel_edges(graph: &Graph, u: NodeId, v: NodeId) -> Vec<EdgeId> {
    graph
        .out_edges(u)
        .iter()
        .filter(|id| id.v == v)
        .copied()
        .collect()
}

/// Applies one modification's semantics to `graph` in place. Modal
/// filters block both directions without removing edges (pedestrians
/// still see them); one-way removes the opposite direction's edges;
/// full closure removes both. Idempotent: re-applying has no further
/// effect, and commutative with respect to ordering against other
/// modifications.
pub fn apply_modification(graph: &mut Graph, modification: &Modification) {
    let (u, v) = (modification.u, modification.v);
    match &modification.kind {
        ModificationKind::ModalFilter => {
            for id in parallel_edges(graph, u, v) {
                if let Some(e) = graph.edge_mut(id) {
                    e.vehicle_blocked = true;
                }
            }
            for id in parallel_edges(graph, v, u) {
                if let Some(e) = graph.edge_mut(id) {
                    e.vehicle_blocked = true;
                }
            }
        }
        ModificationKind::OneWay { direction } => {
            let to_remove = match direction {
                Direction::UToV => parallel_edges(graph, v, u),
                Direction::VToU => parallel_edges(graph, u, v),
            };
            for id in to_remove {
                graph.remove_edge(id);
            }
        }
        ModificationKind::FullClosure => {
            for id in parallel_edges(graph, u, v) {
                graph.remove_edge(id);
            }
            for id in parallel_edges(graph, v, u) {
                graph.remove_edge(id);
            }
        }
    }
}

pub fn apply_all(graph: &mut Graph, mods: &[Modification]) {
    for m in mods {
        apply_modification(graph, m);
    }
}
