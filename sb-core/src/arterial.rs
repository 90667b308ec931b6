use std::collections::HashSet;

use sb_graph::{EdgeId, Graph};

use crate::config::Config;

/// Result of arterial selection: the arterial edge set plus the union of
/// their normalized OSM ids (§4.4).
pub struct Arterials {
    pub edges: HashSet<EdgeId>,
    pub osm_ids: Vec<i64>,
}

/// Linear-interpolation percentile over a slice of samples (matches
/// `numpy.percentile`'s default method, used by the original analyzer).
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

/// Classifies edges as arterial iff their highway class is in the
/// arterial set OR their centrality is at or above the 75th-percentile
/// threshold over the whole graph's centrality distribution.
pub fn identify_arterials(graph: &Graph, cfg: &Config) -> Arterials {
    let mut centralities: Vec<f64> = graph.edges().map(|(_, e)| e.centrality).collect();
    centralities.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let threshold = percentile(&centralities, cfg.centrality_percentile);

    let mut edges = HashSet::new();
    let mut osm_ids = std::collections::BTreeSet::new();
    for (id, edge) in graph.edges() {
        let by_class = edge.highway.is_arterial_class();
        let by_centrality = edge.centrality >= threshold && threshold > 0.0;
        if by_class || by_centrality {
            edges.insert(*id);
            osm_ids.extend(edge.osm_ids.iter().copied());
        }
    }

    Arterials {
        edges,
        osm_ids: osm_ids.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_matches_numpy_linear_interpolation() {
        let v = vec![1.0, 2.0, 3.0, 4.0];
        // np.percentile([1,2,3,4], 75) == 3.25
        assert!((percentile(&v, 75.0) - 3.25).abs() < 1e-9);
    }
}
