use geo::{BoundingRect, Centroid};

/// WGS84 ellipsoid constants for the hand-rolled transverse Mercator
/// projection. No crate in the corpus wraps PROJ, so area computation
/// projects by hand instead of falling back to degrees.
const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const K0: f64 = 0.9996;

fn utm_zone(lon_deg: f64) -> i32 {
    (((lon_deg + 180.0) / 6.0).floor() as i32) + 1
}

/// Forward transverse Mercator projection of a lon/lat point (degrees)
/// into UTM easting/northing (meters) for the given zone. Southern
/// hemisphere northings get the standard 10,000,000 m false northing.
fn project_utm(lon_deg: f64, lat_deg: f64, zone: i32, southern: bool) -> (f64, f64) {
    let a = WGS84_A;
    let f = WGS84_F;
    let e2 = f * (2.0 - f);
    let ep2 = e2 / (1.0 - e2);

    let lon0 = ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians();
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();

    let n = a / (1.0 - e2 * lat.sin().powi(2)).sqrt();
    let t = lat.tan().powi(2);
    let c = ep2 * lat.cos().powi(2);
    let aa = (lon - lon0) * lat.cos();

    let m = a
        * ((1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2 * e2 * e2 / 256.0) * lat
            - (3.0 * e2 / 8.0 + 3.0 * e2 * e2 / 32.0 + 45.0 * e2 * e2 * e2 / 1024.0)
                * (2.0 * lat).sin()
            + (15.0 * e2 * e2 / 256.0 + 45.0 * e2 * e2 * e2 / 1024.0) * (4.0 * lat).sin()
            - (35.0 * e2 * e2 * e2 / 3072.0) * (6.0 * lat).sin());

    let easting = K0
        * n
        * (aa
            + (1.0 - t + c) * aa.powi(3) / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * aa.powi(5) / 120.0)
        + 500_000.0;

    let mut northing = K0
        * (m
            + n * lat.tan()
                * (aa * aa / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * aa.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * aa.powi(6) / 720.0));

    if southern {
        northing += 10_000_000.0;
    }

    (easting, northing)
}

/// Area of a polygon in hectares, computed by projecting its exterior
/// ring (and any holes) into the UTM zone of its centroid via the
/// shoelace formula. Falls back to a bounding-rectangle approximation
/// in degree-to-meter scale factors when projection produces a
/// degenerate (non-finite or zero) result.
pub fn area_hectares(polygon: &geo::Polygon<f64>) -> f64 {
    match area_hectares_projected(polygon) {
        Some(ha) if ha.is_finite() && ha > 0.0 => ha,
        _ => area_hectares_bbox_fallback(polygon),
    }
}

fn area_hectares_projected(polygon: &geo::Polygon<f64>) -> Option<f64> {
    let centroid = polygon.centroid()?;
    let zone = utm_zone(centroid.x());
    let southern = centroid.y() < 0.0;

    let project_ring = |ring: &geo::LineString<f64>| -> Vec<(f64, f64)> {
        ring.coords()
            .map(|c| project_utm(c.x, c.y, zone, southern))
            .collect()
    };

    let exterior = project_ring(polygon.exterior());
    let mut area_m2 = shoelace_area(&exterior);
    for interior in polygon.interiors() {
        area_m2 -= shoelace_area(&project_ring(interior));
    }
    Some(area_m2.abs() / 10_000.0)
}

fn shoelace_area(pts: &[(f64, f64)]) -> f64 {
    if pts.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..pts.len() {
        let (x1, y1) = pts[i];
        let (x2, y2) = pts[(i + 1) % pts.len()];
        sum += x1 * y2 - x2 * y1;
    }
    sum / 2.0
}

fn area_hectares_bbox_fallback(polygon: &geo::Polygon<f64>) -> f64 {
    let Some(rect) = polygon.bounding_rect() else {
        return 0.0;
    };
    let center_lat = (rect.min().y + rect.max().y) / 2.0;
    let width_m = (rect.max().x - rect.min().x) * 111_000.0 * center_lat.to_radians().cos();
    let height_m = (rect.max().y - rect.min().y) * 111_000.0;
    (width_m.abs() * height_m.abs()) / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn square_degree_near_equator_is_plausible() {
        let poly = polygon![
            (x: 0.0, y: 0.0),
            (x: 0.01, y: 0.0),
            (x: 0.01, y: 0.01),
            (x: 0.0, y: 0.01),
            (x: 0.0, y: 0.0),
        ];
        let ha = area_hectares(&poly);
        // ~1.11km x 1.11km at the equator
        assert!(ha > 100.0 && ha < 140.0, "got {ha}");
    }

    #[test]
    fn utm_zone_formula() {
        assert_eq!(utm_zone(-122.3), 10);
        assert_eq!(utm_zone(2.3), 31);
    }
}
