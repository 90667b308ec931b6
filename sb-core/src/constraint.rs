use std::collections::{HashMap, HashSet, VecDeque};

use sb_graph::{EdgeId, Graph, NodeId};

use crate::maxflow::{FlowGraph, INF_CAPACITY};
use crate::modification::{Direction, Modification, ModificationKind};

/// Cut cost per the original `constraint_enforcer.py`: `10 - hierarchy +
/// 1`. Cheaper (more minor) roads are preferred cut candidates.
fn cut_cost(hierarchy: u8) -> i64 {
    (11 - hierarchy as i64).max(1)
}

struct SimpleEdge {
    u: NodeId,
    v: NodeId,
    cost: i64,
    /// Hierarchy of the parallel-edge member that produced the minimum
    /// cost, used later to classify the modification kind.
    representative_hierarchy: u8,
}

/// Collapses parallel edges to one entry per unordered pair, for the
/// violation-detection and post-validation reachability checks. A modal
/// filter (§4.10) keeps its edges in the graph and only sets
/// `vehicle_blocked`, so those edges carry no vehicle connectivity and
/// must not be unioned here, or a cell severed purely by modal filters
/// would still look connected to the DSU.
fn build_simple_graph(interior: &Graph) -> Vec<SimpleEdge> {
    let mut best: HashMap<(NodeId, NodeId), (i64, u8)> = HashMap::new();
    for (id, edge) in interior.edges() {
        if edge.vehicle_blocked {
            continue;
        }
        let key = if id.u <= id.v { (id.u, id.v) } else { (id.v, id.u) };
        let cost = cut_cost(edge.highway.hierarchy());
        best.entry(key)
            .and_modify(|(c, h)| {
                if cost < *c {
                    *c = cost;
                    *h = edge.highway.hierarchy();
                }
            })
            .or_insert((cost, edge.highway.hierarchy()));
    }
    best.into_iter()
        .map(|((u, v), (cost, h))| SimpleEdge {
            u,
            v,
            cost,
            representative_hierarchy: h,
        })
        .collect()
}

/// Union-find over the undirected simple graph, used for cheap reachability
/// checks when detecting violations.
struct Dsu {
    parent: Vec<usize>,
}
impl Dsu {
    fn new(n: usize) -> Dsu {
        Dsu { parent: (0..n).collect() }
    }
    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }
    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}

/// A pair of distinct sectors with at least one cross-sector path between
/// their entries in the interior graph, before modification (§4.8.1).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SectorViolation(pub u32, pub u32);

fn find_violations(
    edges: &[SimpleEdge],
    node_index: &HashMap<NodeId, usize>,
    sectors: &HashMap<NodeId, u32>,
) -> HashSet<SectorViolation> {
    let mut dsu = Dsu::new(node_index.len());
    for e in edges {
        if let (Some(&iu), Some(&iv)) = (node_index.get(&e.u), node_index.get(&e.v)) {
            dsu.union(iu, iv);
        }
    }

    let mut violations = HashSet::new();
    let entries: Vec<(NodeId, u32)> = sectors.iter().map(|(n, s)| (*n, *s)).collect();
    for i in 0..entries.len() {
        for j in (i + 1)..entries.len() {
            let (na, sa) = entries[i];
            let (nb, sb) = entries[j];
            if sa == sb {
                continue;
            }
            let (Some(&ia), Some(&ib)) = (node_index.get(&na), node_index.get(&nb)) else {
                continue;
            };
            if dsu.find(ia) == dsu.find(ib) {
                let key = if sa < sb { (sa, sb) } else { (sb, sa) };
                violations.insert(SectorViolation(key.0, key.1));
            }
        }
    }
    violations
}

fn min_cut_for_pair(
    edges: &[SimpleEdge],
    node_index: &HashMap<NodeId, usize>,
    sectors: &HashMap<NodeId, u32>,
    pair: SectorViolation,
) -> HashSet<(NodeId, NodeId)> {
    let n = node_index.len();
    let source = n;
    let sink = n + 1;
    let mut flow = FlowGraph::new(n + 2);

    let mut real_edges: Vec<(usize, NodeId, NodeId)> = Vec::new();
    for e in edges {
        let (Some(&iu), Some(&iv)) = (node_index.get(&e.u), node_index.get(&e.v)) else {
            continue;
        };
        let fwd = flow.add_edge(iu, iv, e.cost);
        real_edges.push((fwd, e.u, e.v));
        let fwd2 = flow.add_edge(iv, iu, e.cost);
        real_edges.push((fwd2, e.v, e.u));
    }

    for (&node, &sector) in sectors {
        let Some(&idx) = node_index.get(&node) else { continue };
        if sector == pair.0 {
            flow.add_edge(source, idx, INF_CAPACITY);
        } else if sector == pair.1 {
            flow.add_edge(idx, sink, INF_CAPACITY);
        }
    }

    flow.max_flow(source, sink);
    let reachable = flow.reachable_from(source);

    let mut cut = HashSet::new();
    for (fwd_idx, u, v) in real_edges {
        let from_reachable = node_index.get(&u).map_or(false, |&i| reachable[i]);
        let to_reachable = flow.to_of(fwd_idx);
        let to_reachable = reachable.get(to_reachable).copied().unwrap_or(false);
        if from_reachable && !to_reachable && flow.original_cap(fwd_idx) > 0 {
            cut.insert((u, v));
        }
    }
    cut
}

fn bfs_forward_excluding(graph: &Graph, start: NodeId, excluded: &HashSet<EdgeId>) -> HashSet<NodeId> {
    let mut seen = HashSet::new();
    seen.insert(start);
    let mut queue = VecDeque::new();
    queue.push_back(start);
    while let Some(u) = queue.pop_front() {
        for id in graph.out_edges(u) {
            if excluded.contains(id) {
                continue;
            }
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

/// Scores a candidate one-way direction: for every entry, its forward-
/// reachable set size (after simulating removal of the opposite
/// direction's edges) contributes positively, and each other-sector
/// entry that remains reachable costs 1000 (§4.8.4).
fn evaluate_direction(
    graph: &Graph,
    u: NodeId,
    v: NodeId,
    direction: Direction,
    sectors: &HashMap<NodeId, u32>,
) -> f64 {
    let removed: HashSet<EdgeId> = match direction {
        Direction::UToV => graph.out_edges(v).iter().filter(|id| id.v == u).copied().collect(),
        Direction::VToU => graph.out_edges(u).iter().filter(|id| id.v == v).copied().collect(),
    };

    let mut score = 0.0;
    for (&entry, &own_sector) in sectors {
        let reachable = bfs_forward_excluding(graph, entry, &removed);
        score += reachable.len() as f64;
        for (&other, &other_sector) in sectors {
            if other != entry && other_sector != own_sector && reachable.contains(&other) {
                score -= 1000.0;
            }
        }
    }
    score
}

fn pick_direction(graph: &Graph, u: NodeId, v: NodeId, sectors: &HashMap<NodeId, u32>) -> Direction {
    let score_uv = evaluate_direction(graph, u, v, Direction::UToV, sectors);
    let score_vu = evaluate_direction(graph, u, v, Direction::VToU, sectors);
    if score_vu > score_uv {
        Direction::VToU
    } else {
        Direction::UToV
    }
}

fn midpoint(graph: &Graph, u: NodeId, v: NodeId) -> sb_geom::LonLat {
    let pu = graph.node(u).map(|n| n.pos);
    let pv = graph.node(v).map(|n| n.pos);
    match (pu, pv) {
        (Some(a), Some(b)) => sb_geom::LonLat::new((a.lon + b.lon) / 2.0, (a.lat + b.lat) / 2.0),
        _ => sb_geom::LonLat::new(0.0, 0.0),
    }
}

fn representative_key(interior: &Graph, u: NodeId, v: NodeId) -> u32 {
    interior
        .out_edges(u)
        .iter()
        .chain(interior.out_edges(v))
        .find(|id| (id.u == u && id.v == v) || (id.u == v && id.v == u))
        .map(|id| id.key)
        .unwrap_or(0)
}

/// Result of constraint enforcement for one cell: the emitted
/// modifications and whether the cell validated clean after applying
/// them (§4.8.5).
pub struct EnforcementResult {
    pub modifications: Vec<Modification>,
    pub validated: bool,
    pub residual_violations: HashSet<SectorViolation>,
}

/// Runs the full enforcement pipeline for one cell's interior subgraph
/// and sector assignment: detect violations, compute a minimum cut per
/// violating sector pair, classify each cut edge into a modification,
/// then re-check for residual violations on a scratch copy (§4.8).
pub fn enforce_constraints(interior: &Graph, sectors: &HashMap<NodeId, u32>) -> EnforcementResult {
    let simple_edges = build_simple_graph(interior);
    let node_index: HashMap<NodeId, usize> = interior
        .node_ids()
        .enumerate()
        .map(|(i, id)| (id, i))
        .collect();

    let violations = find_violations(&simple_edges, &node_index, sectors);
    if violations.is_empty() {
        return EnforcementResult {
            modifications: Vec::new(),
            validated: true,
            residual_violations: HashSet::new(),
        };
    }

    let mut global_cut: HashSet<(NodeId, NodeId)> = HashSet::new();
    for pair in &violations {
        let cut = min_cut_for_pair(&simple_edges, &node_index, sectors, *pair);
        for (u, v) in cut {
            let canon = if u <= v { (u, v) } else { (v, u) };
            global_cut.insert(canon);
        }
    }

    let hierarchy_of: HashMap<(NodeId, NodeId), u8> = simple_edges
        .iter()
        .map(|e| ((e.u.min(e.v), e.u.max(e.v)), e.representative_hierarchy))
        .collect();

    let mut modifications = Vec::new();
    for (u, v) in &global_cut {
        let hierarchy = hierarchy_of.get(&(*u, *v)).copied().unwrap_or(6);
        let key = representative_key(interior, *u, *v);
        let loc = midpoint(interior, *u, *v);
        if hierarchy <= 5 {
            let direction = pick_direction(interior, *u, *v, sectors);
            modifications.push(Modification {
                u: *u,
                v: *v,
                key,
                kind: ModificationKind::OneWay { direction },
                location: loc,
                rationale: format!(
                    "one-way conversion to eliminate a cross-sector path through hierarchy {hierarchy} edge"
                ),
            });
        } else {
            modifications.push(Modification {
                u: *u,
                v: *v,
                key,
                kind: ModificationKind::ModalFilter,
                location: loc,
                rationale: "modal filter to eliminate a cross-sector path".to_string(),
            });
        }
    }

    crate::modification::sort_modifications(&mut modifications);

    let mut scratch = interior.clone();
    crate::modification::apply_all(&mut scratch, &modifications);
    let scratch_simple = build_simple_graph(&scratch);
    let residual = find_violations(&scratch_simple, &node_index, sectors);

    EnforcementResult {
        modifications,
        validated: residual.is_empty(),
        residual_violations: residual,
    }
}
