use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use sb_geom::LonLat;
use sb_graph::{Graph, NodeId};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnreachableAddress {
    pub node_id: NodeId,
    pub coords: LonLat,
    pub nearest_entry_sector: u32,
}

/// Forward descendants from any entry node, honoring `vehicle_blocked`
/// edges. Deliberately directed-only even though modal filters are
/// bidirectional — see the open question in spec §9; this is not a bug
/// to "fix" without explicit product guidance.
fn forward_reachable_from_entries(graph: &Graph, entries: &HashSet<NodeId>) -> HashSet<NodeId> {
    let mut seen: HashSet<NodeId> = entries.clone();
    let mut queue: VecDeque<NodeId> = entries.iter().copied().collect();
    while let Some(u) = queue.pop_front() {
        for id in graph.out_edges(u) {
            if let Some(edge) = graph.edge(*id) {
                if edge.vehicle_blocked {
                    continue;
                }
            }
            if seen.insert(id.v) {
                queue.push_back(id.v);
            }
        }
    }
    seen
}

/// Reports every interior node that is neither an entry nor reachable
/// from any entry after modifications, tagged with the sector of its
/// nearest entry by smallest squared Euclidean distance in lon/lat space
/// (§4.9 — this distance rule governs over the original service's
/// first-reachable-sector heuristic; see DESIGN.md).
pub fn find_unreachable(
    modified_interior: &Graph,
    entries: &HashSet<NodeId>,
    sectors: &HashMap<NodeId, u32>,
) -> Vec<UnreachableAddress> {
    let reachable = forward_reachable_from_entries(modified_interior, entries);

    let mut out = Vec::new();
    for node in modified_interior.nodes() {
        if entries.contains(&node.id) || reachable.contains(&node.id) {
            continue;
        }
        let Some(nearest_sector) = nearest_entry_sector(node.pos, entries, sectors, modified_interior) else {
            continue;
        };
        out.push(UnreachableAddress {
            node_id: node.id,
            coords: node.pos,
            nearest_entry_sector: nearest_sector,
        });
    }
    out
}

fn nearest_entry_sector(
    pos: LonLat,
    entries: &HashSet<NodeId>,
    sectors: &HashMap<NodeId, u32>,
    graph: &Graph,
) -> Option<u32> {
    let mut best: Option<(f64, u32)> = None;
    for &entry in entries {
        let Some(entry_node) = graph.node(entry) else { continue };
        let Some(&sector) = sectors.get(&entry) else { continue };
        let d2 = pos.dist2(&entry_node.pos);
        if best.map_or(true, |(bd, _)| d2 < bd) {
            best = Some((d2, sector));
        }
    }
    best.map(|(_, s)| s)
}
