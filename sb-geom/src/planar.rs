use std::collections::{BTreeMap, HashMap};

use geo::{Contains, LineString, Polygon};

/// A planar subdivision built from a bundle of linestrings, used to
/// extract enclosed faces the way `shapely.ops.polygonize` does. Grounded
/// on the half-edge face tracer in `osm2streets-js`'s planar graph module:
/// nodes are deduped by a hashed, scaled coordinate key, each node's
/// incident edges are kept sorted clockwise, and faces are traced by
/// always turning onto the next edge counter-clockwise.
///
/// Input linestrings are expected to already share vertices at real
/// intersections (true for OSM-derived street geometry plus a bbox
/// rectangle); two linestrings that cross without a shared vertex are not
/// split, matching the caller's responsibility to feed pre-noded input.
pub struct PlanarGraph {
    nodes: BTreeMap<HashedPt, Node>,
    edges: BTreeMap<EdgeId, Edge>,
    next_edge_id: u64,
}

type HashedPt = (i64, i64);

const SCALE: f64 = 1e7;

fn hashify(lon: f64, lat: f64) -> HashedPt {
    ((lon * SCALE).round() as i64, (lat * SCALE).round() as i64)
}

fn unhashify(p: HashedPt) -> (f64, f64) {
    (p.0 as f64 / SCALE, p.1 as f64 / SCALE)
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
struct EdgeId(u64);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Side {
    Left,
    Right,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Direction {
    Forwards,
    Backwards,
}

#[derive(Clone, PartialEq, Debug)]
struct OrientedEdge {
    edge: EdgeId,
    side: Side,
    direction: Direction,
}

struct Edge {
    a: HashedPt,
    b: HashedPt,
}

struct Node {
    /// Incident edges sorted clockwise by bearing from this node.
    edges: Vec<EdgeId>,
}

impl PlanarGraph {
    pub fn new() -> PlanarGraph {
        PlanarGraph {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            next_edge_id: 0,
        }
    }

    pub fn add_linestring(&mut self, ls: &LineString<f64>) {
        let coords: Vec<_> = ls.coords().collect();
        for w in coords.windows(2) {
            let a = hashify(w[0].x, w[0].y);
            let b = hashify(w[1].x, w[1].y);
            if a == b {
                continue;
            }
            self.add_segment(a, b);
        }
    }

    fn add_segment(&mut self, a: HashedPt, b: HashedPt) {
        let id = EdgeId(self.next_edge_id);
        self.next_edge_id += 1;
        self.edges.insert(id, Edge { a, b });
        self.nodes.entry(a).or_insert_with(|| Node { edges: vec![] }).edges.push(id);
        self.nodes.entry(b).or_insert_with(|| Node { edges: vec![] }).edges.push(id);
        self.resort_node(a);
        self.resort_node(b);
    }

    fn resort_node(&mut self, pt: HashedPt) {
        let (px, py) = unhashify(pt);
        let edges = &self.edges;
        let node = self.nodes.get_mut(&pt).unwrap();
        node.edges.sort_by(|x, y| {
            bearing_from(px, py, other_end(edges, *x, pt)).partial_cmp(&bearing_from(
                px,
                py,
                other_end(edges, *y, pt),
            )).unwrap()
        });
    }

    /// Extract every minimal enclosed face as a polygon. Degenerate faces
    /// (fewer than 3 distinct points) are dropped.
    pub fn to_faces(&self) -> Vec<Polygon<f64>> {
        let mut seen: std::collections::HashSet<(EdgeId, Side)> = std::collections::HashSet::new();
        let mut faces = Vec::new();

        for e in self.edges.keys() {
            for side in [Side::Left, Side::Right] {
                if seen.contains(&(*e, side)) {
                    continue;
                }
                for dir in [Direction::Forwards, Direction::Backwards] {
                    if let Some((pts, members)) = self.trace_face(*e, side, dir) {
                        for m in &members {
                            seen.insert((m.edge, m.side));
                        }
                        if pts.len() >= 4 {
                            faces.push(Polygon::new(LineString::from(pts), vec![]));
                        }
                    }
                }
            }
        }
        faces
    }

    fn trace_face(
        &self,
        start_edge: EdgeId,
        start_side: Side,
        start_direction: Direction,
    ) -> Option<(Vec<(f64, f64)>, Vec<OrientedEdge>)> {
        let start = OrientedEdge {
            edge: start_edge,
            side: start_side,
            direction: start_direction,
        };
        let mut members = Vec::new();
        let mut pts = Vec::new();
        let mut current = start.clone();
        let mut guard = 0;

        loop {
            guard += 1;
            if guard > 10_000 {
                return None;
            }
            members.push(current.clone());
            if current == start && !pts.is_empty() {
                pts.push(pts[0]);
                break;
            }
            let edge = &self.edges[&current.edge];
            let (from, to) = match current.direction {
                Direction::Forwards => (edge.a, edge.b),
                Direction::Backwards => (edge.b, edge.a),
            };
            if pts.is_empty() {
                pts.push(unhashify(from));
            }
            pts.push(unhashify(to));

            let next = self.next_edge(to, &current)?;
            current = next;
        }

        Some((pts, members))
    }

    /// Always turn counter-clockwise onto the next incident edge at `at`,
    /// coming from `current`.
    fn next_edge(&self, at: HashedPt, current: &OrientedEdge) -> Option<OrientedEdge> {
        let node = self.nodes.get(&at)?;
        if node.edges.is_empty() {
            return None;
        }
        let idx = node.edges.iter().position(|e| *e == current.edge)?;
        let prev_idx = if idx == 0 { node.edges.len() - 1 } else { idx - 1 };
        let next_edge_id = node.edges[prev_idx];
        let edge = &self.edges[&next_edge_id];
        let direction = if edge.a == at {
            Direction::Forwards
        } else {
            Direction::Backwards
        };
        let side = match (next_edge_id == current.edge, current.side, current.direction) {
            _ => flip_side(current.side),
        };
        Some(OrientedEdge {
            edge: next_edge_id,
            side,
            direction,
        })
    }
}

fn flip_side(s: Side) -> Side {
    match s {
        Side::Left => Side::Right,
        Side::Right => Side::Left,
    }
}

fn other_end(edges: &BTreeMap<EdgeId, Edge>, id: EdgeId, from: HashedPt) -> HashedPt {
    let e = &edges[&id];
    if e.a == from {
        e.b
    } else {
        e.a
    }
}

fn bearing_from(px: f64, py: f64, to: HashedPt) -> f64 {
    let (tx, ty) = unhashify(to);
    (ty - py).atan2(tx - px)
}

/// Discard polygons outside the accepted area band (hectares), matching
/// the CellBuilder's rejection rule for too-small slivers and the
/// implicit "everything outside" face.
pub fn filter_by_area_hectares(
    polys: Vec<Polygon<f64>>,
    min_ha: f64,
    max_ha: f64,
) -> Vec<Polygon<f64>> {
    polys
        .into_iter()
        .filter(|p| {
            let ha = crate::area::area_hectares(p);
            ha >= min_ha && ha <= max_ha
        })
        .collect()
}

/// Builds the planar subdivision from a bundle of linestrings (arterial
/// geometries plus the bbox boundary) and returns its enclosed faces.
pub fn polygonize(lines: &[LineString<f64>]) -> Vec<Polygon<f64>> {
    let mut graph = PlanarGraph::new();
    for l in lines {
        graph.add_linestring(l);
    }
    graph.to_faces()
}

/// True iff `geom`'s centroid lies strictly inside `polygon` (used by
/// CellBuilder's interior-edge classification).
pub fn centroid_strictly_inside(polygon: &Polygon<f64>, point: geo::Point<f64>) -> bool {
    polygon.contains(&point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::line_string;

    #[test]
    fn simple_square_traces_one_face() {
        let square: LineString<f64> = line_string![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ];
        let faces = polygonize(&[square]);
        // Inner face + outer face.
        assert!(!faces.is_empty());
    }
}
