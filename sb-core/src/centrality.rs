use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Mutex;
use std::time::Instant;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use rayon::prelude::*;

use sb_graph::{Graph, NodeId};

use crate::config::Config;

/// An unordered node pair key for the undirected simplification.
pub type UndirectedKey = (NodeId, NodeId);

fn undirected_key(a: NodeId, b: NodeId) -> UndirectedKey {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// The undirected simple graph each parallel-edge group collapses into,
/// keeping only the minimum length per pair (spec §4.3).
struct SimpleGraph {
    node_ids: Vec<NodeId>,
    index_of: HashMap<NodeId, usize>,
    adjacency: Vec<Vec<(usize, f64)>>,
}

fn build_simple_graph(graph: &Graph) -> SimpleGraph {
    let node_ids: Vec<NodeId> = graph.node_ids().collect();
    let index_of: HashMap<NodeId, usize> = node_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i))
        .collect();

    let mut min_len: HashMap<UndirectedKey, f64> = HashMap::new();
    for (id, edge) in graph.edges() {
        let key = undirected_key(id.u, id.v);
        min_len
            .entry(key)
            .and_modify(|l| {
                if edge.length_m < *l {
                    *l = edge.length_m;
                }
            })
            .or_insert(edge.length_m);
    }

    let mut adjacency = vec![Vec::new(); node_ids.len()];
    for ((a, b), len) in &min_len {
        if let (Some(&ia), Some(&ib)) = (index_of.get(a), index_of.get(b)) {
            adjacency[ia].push((ib, *len));
            adjacency[ib].push((ia, *len));
        }
    }

    SimpleGraph {
        node_ids,
        index_of,
        adjacency,
    }
}

#[derive(PartialEq)]
struct HeapState {
    dist: f64,
    node: usize,
}
impl Eq for HeapState {}
impl Ord for HeapState {
    fn cmp(&self, other: &Self) -> Ordering {
        other.dist.partial_cmp(&self.dist).unwrap_or(Ordering::Equal)
    }
}
impl PartialOrd for HeapState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Brandes' algorithm for weighted edge betweenness, single source.
/// Returns per-edge contribution keyed by (node index, node index) with
/// the smaller index first.
fn brandes_single_source(g: &SimpleGraph, s: usize) -> HashMap<(usize, usize), f64> {
    let n = g.node_ids.len();
    let mut dist = vec![f64::INFINITY; n];
    let mut sigma = vec![0.0f64; n];
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut order = Vec::with_capacity(n);

    dist[s] = 0.0;
    sigma[s] = 1.0;
    let mut heap = BinaryHeap::new();
    heap.push(HeapState { dist: 0.0, node: s });
    let mut visited = vec![false; n];

    while let Some(HeapState { dist: d, node: v }) = heap.pop() {
        if visited[v] {
            continue;
        }
        visited[v] = true;
        order.push(v);
        for &(w, len) in &g.adjacency[v] {
            let nd = d + len;
            if nd < dist[w] - 1e-9 {
                dist[w] = nd;
                sigma[w] = sigma[v];
                preds[w] = vec![v];
                heap.push(HeapState { dist: nd, node: w });
            } else if (nd - dist[w]).abs() <= 1e-9 {
                sigma[w] += sigma[v];
                preds[w].push(v);
            }
        }
    }

    let mut delta = vec![0.0f64; n];
    let mut contributions = HashMap::new();
    for &w in order.iter().rev() {
        for &v in &preds[w] {
            if sigma[w] <= 0.0 {
                continue;
            }
            let c = (sigma[v] / sigma[w]) * (1.0 + delta[w]);
            let key = if v < w { (v, w) } else { (w, v) };
            *contributions.entry(key).or_insert(0.0) += c;
            delta[v] += c;
        }
    }
    contributions
}

/// Picks sample sources per the sampling rule: if node count >= 2500,
/// k = clamp(ceil(0.10N), 200, 800, <=N) via seeded PRNG (fixed seed 42);
/// otherwise every node is a source.
fn pick_sources(n: usize, cfg: &Config) -> Vec<usize> {
    if n < cfg.centrality_approx_node_threshold {
        return (0..n).collect();
    }
    let k = ((n as f64 * cfg.centrality_approx_sample_ratio).ceil() as usize)
        .max(cfg.centrality_approx_sample_min)
        .min(cfg.centrality_approx_sample_max)
        .min(n);
    let mut rng = XorShiftRng::seed_from_u64(cfg.centrality_seed);
    let mut all: Vec<usize> = (0..n).collect();
    all.shuffle(&mut rng);
    all.truncate(k);
    all
}

/// Computes weighted edge betweenness centrality over the undirected
/// simplification of `graph`, writing the result back to every parallel
/// edge of the original multigraph via the returned map (keyed by the
/// same unordered node pair every original edge between them shares).
/// `on_heartbeat` is invoked roughly every 20 seconds of wall-clock work
/// with the elapsed duration, satisfying the progress contract in §4.3.
pub fn compute_centrality(
    graph: &Graph,
    cfg: &Config,
    on_heartbeat: impl Fn(std::time::Duration) + Sync,
) -> HashMap<UndirectedKey, f64> {
    let simple = build_simple_graph(graph);
    let n = simple.node_ids.len();
    if n == 0 {
        return HashMap::new();
    }
    let sources = pick_sources(n, cfg);
    let num_sources = sources.len().max(1) as f64;

    let start = Instant::now();
    let last_heartbeat_secs = AtomicU64::new(0);
    let heartbeat_period = cfg.heartbeat_interval.max(std::time::Duration::from_secs(20));

    let totals: Mutex<HashMap<(usize, usize), f64>> = Mutex::new(HashMap::new());

    let run_sources = || {
        sources.par_iter().for_each(|&s| {
            let contrib = brandes_single_source(&simple, s);
            let mut totals = totals.lock().unwrap();
            for (k, v) in contrib {
                *totals.entry(k).or_insert(0.0) += v;
            }
            drop(totals);

            let elapsed = start.elapsed();
            let elapsed_bucket = elapsed.as_secs() / heartbeat_period.as_secs().max(1);
            let prev = last_heartbeat_secs.swap(elapsed_bucket, AtomicOrdering::SeqCst);
            if elapsed_bucket > prev {
                on_heartbeat(elapsed);
            }
        });
    };

    // Bounded worker pool per §5 instead of rayon's global pool, sized
    // from `cfg.worker_pool_size`. Falls back to the global pool if the
    // scoped pool fails to build (e.g. a size of 0).
    match rayon::ThreadPoolBuilder::new().num_threads(cfg.worker_pool_size).build() {
        Ok(pool) => pool.install(run_sources),
        Err(e) => {
            log::warn!("failed to build a {}-worker pool, falling back to the global pool: {e}", cfg.worker_pool_size);
            run_sources();
        }
    }

    let totals = totals.into_inner().unwrap();
    let mut result = HashMap::new();
    for ((ia, ib), sum) in totals {
        let key = undirected_key(simple.node_ids[ia], simple.node_ids[ib]);
        result.insert(key, sum / num_sources);
    }
    result
}

/// Writes computed centrality values back onto every parallel edge of
/// the original multigraph.
pub fn apply_centrality(graph: &mut Graph, scores: &HashMap<UndirectedKey, f64>) {
    let ids: Vec<_> = graph.edges().map(|(id, _)| *id).collect();
    for id in ids {
        let key = undirected_key(id.u, id.v);
        if let Some(score) = scores.get(&key) {
            if let Some(edge) = graph.edge_mut(id) {
                edge.centrality = *score;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_graph::{Edge, HighwayClass, Node};

    fn line(graph: &mut Graph, u: NodeId, v: NodeId, len: f64) {
        use geo::line_string;
        let ls = line_string![(x: 0.0, y: 0.0), (x: 0.001, y: 0.0)];
        graph
            .add_edge(
                u,
                v,
                0,
                Edge {
                    geometry: ls,
                    length_m: len,
                    highway: HighwayClass::Residential,
                    lanes: 1,
                    one_way: false,
                    osm_ids: vec![],
                    centrality: 0.0,
                    vehicle_blocked: false,
                },
            )
            .unwrap();
    }

    #[test]
    fn path_graph_middle_edges_more_central() {
        let mut g = Graph::new();
        for i in 0..5 {
            g.add_node(Node {
                id: i,
                pos: sb_geom::LonLat::new(0.0, 0.0),
            });
        }
        for i in 0..4 {
            line(&mut g, i, i + 1, 100.0);
            line(&mut g, i + 1, i, 100.0);
        }
        let cfg = Config::default();
        let scores = compute_centrality(&g, &cfg, |_| {});
        let mid = scores[&undirected_key(2, 3)];
        let end = scores[&undirected_key(0, 1)];
        assert!(mid >= end);
    }
}
