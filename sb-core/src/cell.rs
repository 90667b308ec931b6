use std::collections::HashSet;

use geo::{Contains, Intersects};

use sb_geom::BoundingBox;
use sb_graph::{EdgeId, Graph, NodeId};

use crate::arterial::Arterials;

/// Areas outside this band are rejected outright by CellBuilder — the
/// upper cut discards the implicit "everything outside" face that a
/// naive polygonize over an open network can produce (§4.5).
pub const MIN_CELL_HECTARES: f64 = 0.5;
pub const MAX_CELL_HECTARES: f64 = 100.0;

/// Topological buffer (degrees) used when deciding whether an interior
/// node counts as an entry point even though it isn't literally shared
/// with a boundary edge (§4.5).
const ENTRY_BUFFER_DEG: f64 = 1e-4;

#[derive(Clone)]
pub struct Cell {
    pub polygon: geo::Polygon<f64>,
    pub area_hectares: f64,
    pub boundary_edges: HashSet<EdgeId>,
    pub interior_edges: HashSet<EdgeId>,
    pub entry_nodes: HashSet<NodeId>,
}

impl Cell {
    pub fn centroid(&self) -> sb_geom::LonLat {
        use geo::Centroid;
        match self.polygon.centroid() {
            Some(c) => sb_geom::LonLat::new(c.x(), c.y()),
            None => {
                let c = self.polygon.exterior().0[0];
                sb_geom::LonLat::new(c.x, c.y)
            }
        }
    }
}

/// Builds the arterial-plus-bbox line bundle, polygonizes it, and
/// classifies every polygon's enclosed edges into a `Cell` (§4.5).
pub fn build_cells(graph: &Graph, arterials: &Arterials, bbox: &BoundingBox) -> Vec<Cell> {
    let mut lines: Vec<geo::LineString<f64>> = arterials
        .edges
        .iter()
        .filter_map(|id| graph.edge(*id).map(|e| e.geometry.clone()))
        .collect();
    lines.push(bbox.to_ring());

    let polys = sb_geom::planar::polygonize(&lines);

    polys
        .into_iter()
        .filter_map(|polygon| {
            let ha = sb_geom::area::area_hectares(&polygon);
            if ha < MIN_CELL_HECTARES || ha > MAX_CELL_HECTARES {
                return None;
            }
            Some(classify(graph, arterials, polygon, ha))
        })
        .collect()
}

fn classify(graph: &Graph, arterials: &Arterials, polygon: geo::Polygon<f64>, ha: f64) -> Cell {
    let (boundary_edges, interior_edges) = classify_edges(graph, arterials, &polygon);
    let entry_nodes = find_entry_nodes(graph, &boundary_edges, &interior_edges, &polygon);
    Cell {
        polygon,
        area_hectares: ha,
        boundary_edges,
        interior_edges,
        entry_nodes,
    }
}

pub fn classify_edges(
    graph: &Graph,
    arterials: &Arterials,
    polygon: &geo::Polygon<f64>,
) -> (HashSet<EdgeId>, HashSet<EdgeId>) {
    let mut boundary = HashSet::new();
    let mut interior = HashSet::new();
    let exterior = polygon.exterior();

    for (id, edge) in graph.edges() {
        let is_arterial = arterials.edges.contains(id);
        if is_arterial && edge.geometry.intersects(exterior) {
            boundary.insert(*id);
        } else if !is_arterial {
            use geo::Point;
            let c = edge.centroid();
            let pt = Point::new(c.lon, c.lat);
            if polygon.contains(&pt) {
                interior.insert(*id);
            }
        }
    }
    (boundary, interior)
}

fn find_entry_nodes(
    graph: &Graph,
    boundary: &HashSet<EdgeId>,
    interior: &HashSet<EdgeId>,
    polygon: &geo::Polygon<f64>,
) -> HashSet<NodeId> {
    let boundary_nodes: HashSet<NodeId> = boundary.iter().flat_map(|id| [id.u, id.v]).collect();
    let interior_nodes: HashSet<NodeId> = interior.iter().flat_map(|id| [id.u, id.v]).collect();

    let mut entries: HashSet<NodeId> = boundary_nodes.intersection(&interior_nodes).copied().collect();

    for n in &interior_nodes {
        if entries.contains(n) {
            continue;
        }
        if let Some(node) = graph.node(*n) {
            if dist_to_boundary(node.pos, polygon) <= ENTRY_BUFFER_DEG {
                entries.insert(*n);
            }
        }
    }
    entries
}

fn dist_to_boundary(pt: sb_geom::LonLat, polygon: &geo::Polygon<f64>) -> f64 {
    let mut best = f64::INFINITY;
    let coords: Vec<_> = polygon.exterior().coords().collect();
    for w in coords.windows(2) {
        let d = point_segment_distance(pt.lon, pt.lat, w[0].x, w[0].y, w[1].x, w[1].y);
        if d < best {
            best = d;
        }
    }
    best
}

fn point_segment_distance(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let dx = bx - ax;
    let dy = by - ay;
    let len2 = dx * dx + dy * dy;
    if len2 <= 1e-18 {
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }
    let t = (((px - ax) * dx + (py - ay) * dy) / len2).clamp(0.0, 1.0);
    let cx = ax + t * dx;
    let cy = ay + t * dy;
    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}
