//! Planar distance geometry.
//!
//! Longitude and latitude are treated as Cartesian `(x, y)` coordinates, so
//! every distance here is in "degrees", the same unit as the grid's cell
//! dimension and as link length. This is a local planar approximation, not a
//! geodesic distance.
//!
//! [`point_to_segment_distance`] is the innermost hot path of both matching
//! strategies: it runs once per (sensor, candidate link) pair.

use crate::geo::GeoPosition;

/// Planar Euclidean distance between two positions.
#[inline]
pub fn distance(a: GeoPosition, b: GeoPosition) -> f64 {
    nalgebra::distance(&a.to_planar(), &b.to_planar())
}

/// Foot of the perpendicular dropped from `point` onto the infinite line
/// through `start` and `end`.
///
/// Returns `None` for a degenerate segment (`start == end`).
pub fn perpendicular_foot(
    point: GeoPosition,
    start: GeoPosition,
    end: GeoPosition,
) -> Option<GeoPosition> {
    if start.lon == end.lon {
        if start.lat == end.lat {
            return None;
        }
        // Vertical line: keep the point's latitude at the line's longitude.
        return Some(GeoPosition::new(point.lat, start.lon));
    }

    let m = (end.lat - start.lat) / (end.lon - start.lon);
    let foot_lon = (m * (point.lat - start.lat + m * start.lon) + point.lon) / (m * m + 1.0);
    let foot_lat = start.lat + m * (foot_lon - start.lon);

    Some(GeoPosition::new(foot_lat, foot_lon))
}

/// True if `pos` lies inside the closed lon/lat ranges spanned by the segment.
#[inline]
pub fn within_segment_range(pos: GeoPosition, start: GeoPosition, end: GeoPosition) -> bool {
    let (min_lon, max_lon) = min_max(start.lon, end.lon);
    let (min_lat, max_lat) = min_max(start.lat, end.lat);

    pos.lon >= min_lon && pos.lon <= max_lon && pos.lat >= min_lat && pos.lat <= max_lat
}

/// Shortest planar distance from `point` to the segment `start..end`.
///
/// - Degenerate segment: distance to the single point.
/// - Otherwise the perpendicular foot is computed in closed form; if it lies
///   within the segment's coordinate ranges the foot distance is returned,
///   else the distance to the nearer endpoint.
pub fn point_to_segment_distance(point: GeoPosition, start: GeoPosition, end: GeoPosition) -> f64 {
    match perpendicular_foot(point, start, end) {
        None => distance(start, point),
        Some(foot) if within_segment_range(foot, start, end) => distance(foot, point),
        Some(_) => distance(point, start).min(distance(point, end)),
    }
}

#[inline]
fn min_max(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn pos(lat: f64, lon: f64) -> GeoPosition {
        GeoPosition::new(lat, lon)
    }

    #[test]
    fn test_distance_pythagorean() {
        assert_relative_eq!(distance(pos(0.0, 0.0), pos(4.0, 3.0)), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_segment() {
        let s = pos(1.0, 1.0);
        assert_relative_eq!(
            point_to_segment_distance(pos(4.0, 5.0), s, s),
            5.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_vertical_segment_inside() {
        // Segment along lon = 2 from lat 0 to lat 10
        let d = point_to_segment_distance(pos(5.0, 5.0), pos(0.0, 2.0), pos(10.0, 2.0));
        assert_relative_eq!(d, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_vertical_segment_beyond_end() {
        let d = point_to_segment_distance(pos(14.0, 5.0), pos(0.0, 2.0), pos(10.0, 2.0));
        assert_relative_eq!(d, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_horizontal_segment() {
        let d = point_to_segment_distance(pos(3.0, 4.0), pos(0.0, 0.0), pos(0.0, 10.0));
        assert_relative_eq!(d, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_diagonal_projection() {
        // Line lat = lon, point (0, 2) projects onto (1, 1)
        let d = point_to_segment_distance(pos(0.0, 2.0), pos(0.0, 0.0), pos(4.0, 4.0));
        assert_relative_eq!(d, 2f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_diagonal_clamps_to_endpoint() {
        let d = point_to_segment_distance(pos(-3.0, -4.0), pos(0.0, 0.0), pos(4.0, 4.0));
        assert_relative_eq!(d, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_point_on_endpoint_is_zero() {
        let d = point_to_segment_distance(pos(4.0, 4.0), pos(0.0, 0.0), pos(4.0, 4.0));
        assert_eq!(d, 0.0);
    }

    fn coord() -> impl Strategy<Value = f64> {
        -50.0f64..50.0
    }

    fn position() -> impl Strategy<Value = GeoPosition> {
        (coord(), coord()).prop_map(|(lat, lon)| GeoPosition::new(lat, lon))
    }

    proptest! {
        #[test]
        fn prop_distance_symmetric(a in position(), b in position()) {
            prop_assert_eq!(distance(a, b), distance(b, a));
        }

        #[test]
        fn prop_segment_distance_bounds(p in position(), s in position(), e in position()) {
            let d = point_to_segment_distance(p, s, e);
            let endpoint_min = distance(p, s).min(distance(p, e));
            prop_assert!(d >= 0.0);

            match perpendicular_foot(p, s, e) {
                Some(foot) if within_segment_range(foot, s, e) => {
                    prop_assert!(d <= endpoint_min + 1e-9);
                }
                Some(_) => prop_assert_eq!(d, endpoint_min),
                None => prop_assert_eq!(d, distance(s, p)),
            }
        }
    }
}
