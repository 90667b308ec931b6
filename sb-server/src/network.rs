use geo::line_string;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};

use sb_geom::{BoundingBox, LonLat};
use sb_graph::{Edge, Graph, HighwayClass, Node};

/// Stands in for the external OSM fetch + disk cache collaborator
/// (explicitly out of scope for the planning core per spec §1): builds a
/// deterministic residential grid covering the bbox, with a couple of
/// primary roads running through the middle so the arterializer and
/// cell builder have something to key off. A real deployment swaps this
/// for an actual OSM Overpass/extract fetch behind the same `Graph`
/// contract.
pub fn fetch_network_stub(bbox: &BoundingBox) -> Graph {
    let mut graph = Graph::new();
    let grid_size = 9i64;
    let lon_step = (bbox.east - bbox.west) / (grid_size - 1) as f64;
    let lat_step = (bbox.north - bbox.south) / (grid_size - 1) as f64;

    let node_id = |x: i64, y: i64| -> i64 { y * grid_size + x };

    for y in 0..grid_size {
        for x in 0..grid_size {
            graph.add_node(Node {
                id: node_id(x, y),
                pos: LonLat::new(bbox.west + x as f64 * lon_step, bbox.south + y as f64 * lat_step),
            });
        }
    }

    let mut osm_id = 1i64;
    for y in 0..grid_size {
        for x in 0..grid_size {
            let here = node_id(x, y);
            let here_pos = graph.node(here).unwrap().pos;
            let highway = if y == grid_size / 2 || x == grid_size / 2 {
                HighwayClass::Primary
            } else {
                HighwayClass::Residential
            };

            if x + 1 < grid_size {
                let right = node_id(x + 1, y);
                let right_pos = graph.node(right).unwrap().pos;
                add_pair(&mut graph, here, right, here_pos, right_pos, highway, osm_id);
                osm_id += 1;
            }
            if y + 1 < grid_size {
                let down = node_id(x, y + 1);
                let down_pos = graph.node(down).unwrap().pos;
                add_pair(&mut graph, here, down, here_pos, down_pos, highway, osm_id);
                osm_id += 1;
            }
        }
    }

    graph
}

/// Renders the street network as a GeoJSON `FeatureCollection`, one
/// feature per edge, for the `street_network` field of the `/partition`
/// response (§6). Parallel (both-direction) edges are each emitted as
/// their own feature, matching how the graph itself models them.
pub fn street_network_feature_collection(graph: &Graph) -> FeatureCollection {
    let features = graph
        .edges()
        .map(|(id, edge)| {
            let geometry = Geometry::new(geojson::Value::from(&edge.geometry));
            let mut properties = JsonObject::new();
            properties.insert("u".to_string(), JsonValue::from(id.u));
            properties.insert("v".to_string(), JsonValue::from(id.v));
            properties.insert("highway".to_string(), JsonValue::from(format!("{:?}", edge.highway)));
            properties.insert("length_m".to_string(), JsonValue::from(edge.length_m));
            properties.insert("lanes".to_string(), JsonValue::from(edge.lanes));
            properties.insert("one_way".to_string(), JsonValue::from(edge.one_way));
            properties.insert("centrality".to_string(), JsonValue::from(edge.centrality));
            properties.insert("vehicle_blocked".to_string(), JsonValue::from(edge.vehicle_blocked));
            properties.insert(
                "osm_ids".to_string(),
                JsonValue::from(edge.osm_ids.iter().copied().collect::<Vec<_>>()),
            );
            Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn add_pair(
    graph: &mut Graph,
    a: i64,
    b: i64,
    a_pos: LonLat,
    b_pos: LonLat,
    highway: HighwayClass,
    osm_id: i64,
) {
    let geometry = line_string![(x: a_pos.lon, y: a_pos.lat), (x: b_pos.lon, y: b_pos.lat)];
    let length_m = a_pos.approx_meters_to(&b_pos);
    let make_edge = |geom: geo::LineString<f64>| Edge {
        geometry: geom,
        length_m,
        highway,
        lanes: if highway == HighwayClass::Primary { 2 } else { 1 },
        one_way: false,
        osm_ids: vec![osm_id],
        centrality: 0.0,
        vehicle_blocked: false,
    };
    let _ = graph.add_edge(a, b, 0, make_edge(geometry.clone()));
    let _ = graph.add_edge(b, a, 0, make_edge(geometry));
}
