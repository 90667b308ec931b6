use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use sb_geom::LonLat;
use sb_graph::{EdgeId, Graph, HighwayClass, NodeId};

const SPEED_ARTERIAL_KMH: f64 = 40.0;
const SPEED_RESIDENTIAL_KMH: f64 = 25.0;
const SPEED_INTERIOR_KMH: f64 = 20.0;

/// Everything the router needs besides the graph itself: which edges are
/// arterial, which superblock (if any) an interior edge belongs to, each
/// superblock's entry nodes, and its polygon for containment tests.
pub struct RoutingContext<'a> {
    pub graph: &'a Graph,
    pub arterial_edges: &'a HashSet<EdgeId>,
    pub edge_superblock: &'a HashMap<EdgeId, String>,
    pub superblock_entries: &'a HashMap<String, Vec<NodeId>>,
    pub superblock_polygons: &'a HashMap<String, geo::Polygon<f64>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteSegment {
    pub geometry: Vec<LonLat>,
    pub highway: HighwayClass,
    pub is_arterial: bool,
    pub superblock_id: Option<String>,
    pub length_m: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteResult {
    pub success: bool,
    pub segments: Vec<RouteSegment>,
    pub distance_km: f64,
    pub duration_min: f64,
    pub arterial_percent: f64,
    pub superblocks_traversed: Vec<String>,
    pub blocked_reason: Option<String>,
}

impl RouteResult {
    fn blocked(reason: impl Into<String>) -> RouteResult {
        RouteResult {
            success: false,
            segments: Vec::new(),
            distance_km: 0.0,
            duration_min: 0.0,
            arterial_percent: 0.0,
            superblocks_traversed: Vec::new(),
            blocked_reason: Some(reason.into()),
        }
    }
}

fn nearest_node(graph: &Graph, pt: LonLat) -> Option<NodeId> {
    graph
        .nodes()
        .min_by(|a, b| {
            a.pos
                .dist2(&pt)
                .partial_cmp(&b.pos.dist2(&pt))
                .unwrap_or(Ordering::Equal)
        })
        .map(|n| n.id)
}

fn containing_superblock(ctx: &RoutingContext, pt: LonLat) -> Option<String> {
    use geo::Contains;
    let p = geo::Point::new(pt.lon, pt.lat);
    ctx.superblock_polygons
        .iter()
        .find(|(_, poly)| poly.contains(&p))
        .map(|(id, _)| id.clone())
}

fn nearest_entry_of(ctx: &RoutingContext, sb: &str, from: LonLat) -> Option<NodeId> {
    ctx.superblock_entries.get(sb).and_then(|entries| {
        entries
            .iter()
            .copied()
            .min_by(|a, b| {
                let pa = ctx.graph.node(*a).map(|n| n.pos).unwrap_or(from);
                let pb = ctx.graph.node(*b).map(|n| n.pos).unwrap_or(from);
                pa.dist2(&from).partial_cmp(&pb.dist2(&from)).unwrap_or(Ordering::Equal)
            })
    })
}

#[derive(PartialEq)]
struct AstarState {
    f: f64,
    node: NodeId,
}
impl Eq for AstarState {}
impl Ord for AstarState {
    fn cmp(&self, other: &Self) -> Ordering {
        other.f.partial_cmp(&self.f).unwrap_or(Ordering::Equal)
    }
}
impl PartialOrd for AstarState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn edge_cost_factor(ctx: &RoutingContext, id: &EdgeId, allow_interior: bool) -> f64 {
    if ctx.arterial_edges.contains(id) {
        1.0
    } else if allow_interior {
        1.5
    } else {
        10.0
    }
}

/// A* search from `start` to `goal`. When `restrict_to` is set, only
/// edges that are arterial (not owned by any superblock) or owned by
/// that superblock may be traversed (§4.11 steps 3-4).
fn astar(
    ctx: &RoutingContext,
    start: NodeId,
    goal: NodeId,
    allow_interior: bool,
    restrict_to: Option<&str>,
) -> Option<Vec<EdgeId>> {
    let goal_pos = ctx.graph.node(goal)?.pos;
    let mut dist: HashMap<NodeId, f64> = HashMap::new();
    let mut prev: HashMap<NodeId, EdgeId> = HashMap::new();
    let mut heap = BinaryHeap::new();

    dist.insert(start, 0.0);
    heap.push(AstarState { f: 0.0, node: start });

    while let Some(AstarState { node, .. }) = heap.pop() {
        if node == goal {
            let mut path = Vec::new();
            let mut cur = goal;
            while let Some(id) = prev.get(&cur) {
                path.push(*id);
                cur = id.u;
                if cur == start {
                    break;
                }
            }
            path.reverse();
            return Some(path);
        }
        let cur_dist = *dist.get(&node).unwrap_or(&f64::INFINITY);
        for id in ctx.graph.out_edges(node) {
            let Some(edge) = ctx.graph.edge(*id) else { continue };
            if edge.vehicle_blocked {
                continue;
            }
            if let Some(sb) = restrict_to {
                let owner = ctx.edge_superblock.get(id);
                let allowed = owner.is_none() || owner.map(|o| o.as_str()) == Some(sb);
                if !allowed {
                    continue;
                }
            }
            let factor = edge_cost_factor(ctx, id, allow_interior);
            let new_dist = cur_dist + edge.length_m * factor;
            if new_dist < *dist.get(&id.v).unwrap_or(&f64::INFINITY) {
                dist.insert(id.v, new_dist);
                prev.insert(id.v, *id);
                let h = ctx
                    .graph
                    .node(id.v)
                    .map(|n| n.pos.approx_meters_to(&goal_pos))
                    .unwrap_or(0.0);
                heap.push(AstarState {
                    f: new_dist + h,
                    node: id.v,
                });
            }
        }
    }
    None
}

fn path_to_segments(ctx: &RoutingContext, path: &[EdgeId]) -> Vec<RouteSegment> {
    let mut segments: Vec<RouteSegment> = Vec::new();
    for id in path {
        let Some(edge) = ctx.graph.edge(*id) else { continue };
        let is_arterial = ctx.arterial_edges.contains(id);
        let sb = ctx.edge_superblock.get(id).cloned();
        let geometry: Vec<LonLat> = edge.geometry.coords().map(|c| LonLat::new(c.x, c.y)).collect();

        let same_as_last = segments.last().map_or(false, |s: &RouteSegment| {
            s.highway == edge.highway && s.is_arterial == is_arterial && s.superblock_id == sb
        });

        if same_as_last {
            let s = segments.last_mut().unwrap();
            s.geometry.extend(geometry.into_iter().skip(1));
            s.length_m += edge.length_m;
        } else {
            segments.push(RouteSegment {
                geometry,
                highway: edge.highway,
                is_arterial,
                superblock_id: sb,
                length_m: edge.length_m,
            });
        }
    }
    segments
}

fn summarize(segments: Vec<RouteSegment>, superblocks_traversed: Vec<String>) -> RouteResult {
    let total_m: f64 = segments.iter().map(|s| s.length_m).sum();
    let arterial_m: f64 = segments.iter().filter(|s| s.is_arterial).map(|s| s.length_m).sum();
    let duration_min: f64 = segments
        .iter()
        .map(|s| {
            let speed = if s.is_arterial {
                SPEED_ARTERIAL_KMH
            } else if s.highway == HighwayClass::Residential {
                SPEED_RESIDENTIAL_KMH
            } else {
                SPEED_INTERIOR_KMH
            };
            (s.length_m / 1000.0) / speed * 60.0
        })
        .sum();

    RouteResult {
        success: true,
        segments,
        distance_km: total_m / 1000.0,
        duration_min,
        arterial_percent: if total_m > 0.0 { arterial_m / total_m * 100.0 } else { 0.0 },
        superblocks_traversed,
        blocked_reason: None,
    }
}

/// Plans a route between two coordinates, implementing the snap → same-
/// superblock / three-leg / unrestricted policy of §4.11.
pub fn route(ctx: &RoutingContext, origin: LonLat, destination: LonLat, respect_superblocks: bool) -> RouteResult {
    let Some(start) = nearest_node(ctx.graph, origin) else {
        return RouteResult::blocked("no graph nodes available");
    };
    let Some(goal) = nearest_node(ctx.graph, destination) else {
        return RouteResult::blocked("no graph nodes available");
    };

    if !respect_superblocks {
        return match astar(ctx, start, goal, true, None) {
            Some(path) => summarize(path_to_segments(ctx, &path), Vec::new()),
            None => RouteResult::blocked("no path found"),
        };
    }

    let sb_origin = containing_superblock(ctx, origin);
    let sb_dest = containing_superblock(ctx, destination);

    if sb_origin == sb_dest {
        return match astar(ctx, start, goal, true, sb_origin.as_deref()) {
            Some(path) => {
                let traversed = sb_origin.into_iter().collect();
                summarize(path_to_segments(ctx, &path), traversed)
            }
            None => RouteResult::blocked("no path found within superblock"),
        };
    }

    let mut combined = Vec::new();
    let mut cursor = start;

    if let Some(sb) = &sb_origin {
        let Some(entry) = nearest_entry_of(ctx, sb, origin) else {
            return RouteResult::blocked("origin superblock has no entry points");
        };
        match astar(ctx, cursor, entry, true, Some(sb)) {
            Some(leg) => {
                combined.extend(leg);
                cursor = entry;
            }
            None => return RouteResult::blocked("no path out of origin superblock"),
        }
    }

    let leg_b_goal = if let Some(sb) = &sb_dest {
        nearest_entry_of(ctx, sb, destination).unwrap_or(goal)
    } else {
        goal
    };

    let leg_b = astar(ctx, cursor, leg_b_goal, false, None).or_else(|| astar(ctx, cursor, leg_b_goal, true, None));
    let Some(leg_b) = leg_b else {
        return RouteResult::blocked("no arterial path between superblocks");
    };
    combined.extend(leg_b);
    cursor = leg_b_goal;

    if let Some(sb) = &sb_dest {
        match astar(ctx, cursor, goal, true, Some(sb)) {
            Some(leg) => combined.extend(leg),
            None => return RouteResult::blocked("no path into destination superblock"),
        }
    }

    let mut traversed = Vec::new();
    if let Some(sb) = sb_origin {
        traversed.push(sb);
    }
    if let Some(sb) = sb_dest {
        if !traversed.contains(&sb) {
            traversed.push(sb);
        }
    }

    summarize(path_to_segments(ctx, &combined), traversed)
}
