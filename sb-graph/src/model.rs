use std::collections::{BTreeMap, HashMap};

use anyhow::{bail, Result};
use geo::LineString;
use sb_geom::LonLat;

use crate::highway::HighwayClass;

pub type NodeId = i64;

/// Identifies one parallel edge between an ordered node pair. Matches the
/// spec's "(u, v) plus a key disambiguating parallel edges".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId {
    pub u: NodeId,
    pub v: NodeId,
    pub key: u32,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub pos: LonLat,
}

#[derive(Clone, Debug)]
pub struct Edge {
    pub geometry: LineString<f64>,
    pub length_m: f64,
    pub highway: HighwayClass,
    pub lanes: u32,
    pub one_way: bool,
    pub osm_ids: Vec<i64>,
    /// Populated by Centrality; 0.0 until then.
    pub centrality: f64,
    /// Set by ConstraintEnforcer's modal-filter modification; edges
    /// carrying this flag are excluded from vehicle routing but retained
    /// for pedestrian visualization (§4.10).
    pub vehicle_blocked: bool,
}

impl Edge {
    pub fn midpoint(&self) -> LonLat {
        use geo::LineInterpolatePoint;
        let p = self
            .geometry
            .line_interpolate_point(0.5)
            .unwrap_or_else(|| geo::Point::new(self.geometry.0[0].x, self.geometry.0[0].y));
        LonLat::new(p.x(), p.y())
    }

    pub fn centroid(&self) -> LonLat {
        use geo::Centroid;
        match self.geometry.centroid() {
            Some(c) => LonLat::new(c.x(), c.y()),
            None => self.midpoint(),
        }
    }
}

/// Normalizes a raw OSM id field (single integer or set): flatten,
/// dedupe, discard non-positive values (spec §3).
pub fn normalize_osm_ids(raw: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let mut seen = std::collections::BTreeSet::new();
    for id in raw {
        if id > 0 {
            seen.insert(id);
        }
    }
    seen.into_iter().collect()
}

/// A directed multigraph of street segments: nodes with coordinates, and
/// edges with geometry and road attributes. Secondary `out`/`in` indices
/// support cheap neighbor enumeration without scanning the whole edge
/// map, per the design note in spec §9.
#[derive(Clone, Default)]
pub struct Graph {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,
    out: HashMap<NodeId, Vec<EdgeId>>,
    in_: HashMap<NodeId, Vec<EdgeId>>,
}

impl Graph {
    pub fn new() -> Graph {
        Graph::default()
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    pub fn add_edge(&mut self, u: NodeId, v: NodeId, key: u32, edge: Edge) -> Result<EdgeId> {
        if !self.nodes.contains_key(&u) || !self.nodes.contains_key(&v) {
            bail!("edge ({u}, {v}, {key}) references a node that doesn't exist");
        }
        let id = EdgeId { u, v, key };
        self.edges.insert(id, edge);
        self.out.entry(u).or_default().push(id);
        self.in_.entry(v).or_default().push(id);
        Ok(id)
    }

    pub fn has_edge(&self, u: NodeId, v: NodeId, key: Option<u32>) -> bool {
        match key {
            Some(k) => self.edges.contains_key(&EdgeId { u, v, key: k }),
            None => self.out.get(&u).map_or(false, |es| es.iter().any(|e| e.v == v)),
        }
    }

    pub fn remove_edge(&mut self, id: EdgeId) {
        if self.edges.remove(&id).is_some() {
            if let Some(v) = self.out.get_mut(&id.u) {
                v.retain(|e| *e != id);
            }
            if let Some(v) = self.in_.get_mut(&id.v) {
                v.retain(|e| *e != id);
            }
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&EdgeId, &Edge)> {
        self.edges.iter()
    }

    pub fn out_edges(&self, n: NodeId) -> &[EdgeId] {
        self.out.get(&n).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn in_edges(&self, n: NodeId) -> &[EdgeId] {
        self.in_.get(&n).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// An independent multigraph over the given edge set, copying node
    /// attributes for every node those edges touch.
    pub fn subgraph(&self, edge_set: impl IntoIterator<Item = EdgeId>) -> Graph {
        let mut g = Graph::new();
        for id in edge_set {
            let Some(edge) = self.edges.get(&id) else { continue };
            for n in [id.u, id.v] {
                if !g.nodes.contains_key(&n) {
                    if let Some(node) = self.nodes.get(&n) {
                        g.add_node(node.clone());
                    }
                }
            }
            let _ = g.add_edge(id.u, id.v, id.key, edge.clone());
        }
        g
    }
}
