use serde::{Deserialize, Serialize};

/// A point in WGS84 longitude/latitude degrees. Kept distinct from a
/// projected meters point so routing and area code can't mix units by
/// accident (see spec's "unit ambiguity" design note).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> LonLat {
        LonLat { lon, lat }
    }

    pub fn valid(&self) -> bool {
        (-180.0..=180.0).contains(&self.lon) && (-90.0..=90.0).contains(&self.lat)
    }

    /// Squared Euclidean distance in lon/lat space. Cheap ordering-only
    /// distance used for nearest-node snapping and reachability reporting;
    /// never a substitute for a real metric distance.
    pub fn dist2(&self, other: &LonLat) -> f64 {
        let dx = self.lon - other.lon;
        let dy = self.lat - other.lat;
        dx * dx + dy * dy
    }

    /// Great-circle approximation used by the router's A* heuristic:
    /// 111_000 m/deg scaled by cos(lat).
    pub fn approx_meters_to(&self, other: &LonLat) -> f64 {
        let lat_m = (self.lat - other.lat) * 111_000.0;
        let lon_m = (self.lon - other.lon) * 111_000.0 * self.lat.to_radians().cos();
        (lat_m * lat_m + lon_m * lon_m).sqrt()
    }
}

impl From<LonLat> for geo_types::Coord<f64> {
    fn from(p: LonLat) -> Self {
        geo_types::Coord { x: p.lon, y: p.lat }
    }
}

impl From<geo_types::Coord<f64>> for LonLat {
    fn from(c: geo_types::Coord<f64>) -> Self {
        LonLat { lon: c.x, lat: c.y }
    }
}
