//! Great-circle distance and bounding-box prefilters.
//!
//! Distances use the haversine formula on a sphere of radius
//! [`EARTH_RADIUS_KM`]. The bounding box is a cheap rectangular prefilter for
//! repository queries; it is an approximation, not an exact bound, so callers
//! must always re-check candidates with [`distance_km`].

use geo::{Coord, Rect};

use crate::Coordinate;

/// Mean Earth radius used for all distance calculations.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometres covered by one degree of latitude in the prefilter.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Floor applied to `cos(latitude)` so the longitude span stays finite near
/// the poles.
pub const MIN_LONGITUDE_SCALE: f64 = 0.01;

/// Great-circle distance between two coordinates in kilometres.
///
/// The result is symmetric in its arguments and zero for identical points.
///
/// # Examples
///
/// ```
/// use deliveryzone_core::{Coordinate, geo_math::distance_km};
///
/// # fn main() -> Result<(), deliveryzone_core::CoordinateError> {
/// let london = Coordinate::new(51.501_009, -0.141_588)?;
/// let manchester = Coordinate::new(53.479_251, -2.247_926)?;
/// let km = distance_km(london, manchester);
/// assert!((km - 262.0).abs() < 5.0);
/// # Ok(())
/// # }
/// ```
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "haversine distance is inherently floating point"
)]
pub fn distance_km(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.latitude().to_radians();
    let lat2 = to.latitude().to_radians();
    let d_lat = (to.latitude() - from.latitude()).to_radians();
    let d_lng = (to.longitude() - from.longitude()).to_radians();

    let raw = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push the haversine marginally above one for antipodal points.
    let h = raw.clamp(0.0, 1.0);
    let central_angle = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * central_angle
}

/// Axis-aligned box around `center` that approximately covers a disc of
/// `radius_km`.
///
/// The rectangle uses `x = longitude` and `y = latitude`. Latitude spans
/// `radius_km / 111` degrees either side of the centre; longitude spans
/// `radius_km / (111 * max(cos(latitude), 0.01))` degrees.
///
/// One degree of latitude is slightly longer than 111 km on a 6371 km sphere,
/// which gives the box about 0.2% of slack, and it includes false positives
/// near its corners. The longitude span is sized at the centre latitude, but
/// the disc reaches its widest longitude poleward of the centre, where
/// meridians converge. The slack absorbs that at ordinary latitudes. At high
/// latitudes with large radii it does not, and the box under-covers: with a
/// 200 km radius this starts at roughly 73°, and it gets worse once the
/// `0.01` floor engages. Stores in the uncovered slivers are not found. The
/// rectangle is not wrapped at the antimeridian or clamped at the poles.
///
/// # Examples
///
/// ```
/// use deliveryzone_core::{Coordinate, geo_math::bounding_box};
///
/// # fn main() -> Result<(), deliveryzone_core::CoordinateError> {
/// let centre = Coordinate::new(0.0, 0.0)?;
/// let bbox = bounding_box(centre, 111.0);
/// assert!((bbox.max().y - 1.0).abs() < 1e-9);
/// assert!((bbox.min().x + 1.0).abs() < 1e-9);
/// # Ok(())
/// # }
/// ```
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "degree deltas are derived from kilometre radii"
)]
pub fn bounding_box(center: Coordinate, radius_km: f64) -> Rect<f64> {
    let lat_delta = radius_km / KM_PER_DEGREE;
    let lng_scale = center
        .latitude()
        .to_radians()
        .cos()
        .max(MIN_LONGITUDE_SCALE);
    let lng_delta = radius_km / (KM_PER_DEGREE * lng_scale);

    Rect::new(
        Coord {
            x: center.longitude() - lng_delta,
            y: center.latitude() - lat_delta,
        },
        Coord {
            x: center.longitude() + lng_delta,
            y: center.latitude() + lat_delta,
        },
    )
}

#[cfg(test)]
#[expect(
    clippy::float_arithmetic,
    reason = "tests compare floating point values"
)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn coordinate(latitude: f64, longitude: f64) -> Coordinate {
        Coordinate::new(latitude, longitude).expect("valid coordinate")
    }

    /// Point reached by travelling `distance` km from `start` on `bearing`.
    fn destination(start: Coordinate, bearing_deg: f64, distance: f64) -> Coordinate {
        let delta = distance / EARTH_RADIUS_KM;
        let theta = bearing_deg.to_radians();
        let phi1 = start.latitude().to_radians();
        let lambda1 = start.longitude().to_radians();
        let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
        let lambda2 = lambda1
            + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());
        coordinate(phi2.to_degrees(), lambda2.to_degrees())
    }

    #[rstest]
    fn distance_between_london_postcodes_is_reasonable() {
        let km = distance_km(
            coordinate(51.501_009, -0.141_588),
            coordinate(51.520_180, -0.097_790),
        );
        assert!(km > 2.0 && km < 6.0, "unexpected distance {km}");
    }

    #[rstest]
    fn identical_points_are_zero_apart() {
        let point = coordinate(53.479_251, -2.247_926);
        assert!(distance_km(point, point).abs() < 1e-9);
    }

    #[rstest]
    fn one_degree_of_longitude_at_equator() {
        let km = distance_km(coordinate(0.0, 0.0), coordinate(0.0, 1.0));
        let expected = EARTH_RADIUS_KM * 1.0_f64.to_radians();
        assert!((km - expected).abs() < 1e-9);
    }

    #[rstest]
    fn antipodal_points_are_half_circumference_apart() {
        let km = distance_km(coordinate(0.0, 0.0), coordinate(0.0, 180.0));
        assert!((km - EARTH_RADIUS_KM * std::f64::consts::PI).abs() < 1e-6);
    }

    #[rstest]
    fn box_spans_expected_latitude_delta() {
        let bbox = bounding_box(coordinate(51.5, -0.1), 11.1);
        assert!((bbox.min().y - 51.4).abs() < 1e-9);
        assert!((bbox.max().y - 51.6).abs() < 1e-9);
    }

    #[rstest]
    fn longitude_span_widens_with_latitude() {
        let equator = bounding_box(coordinate(0.0, 0.0), 10.0);
        let north = bounding_box(coordinate(60.0, 0.0), 10.0);
        assert!(north.width() > equator.width());
        assert!((north.width() - 2.0 * equator.width()).abs() < 1e-6);
    }

    #[rstest]
    fn longitude_scale_is_floored_at_the_pole() {
        let bbox = bounding_box(coordinate(90.0, 0.0), 1.11);
        // 1.11 km / (111 km * 0.01) = 1 degree either side.
        assert!((bbox.max().x - 1.0).abs() < 1e-9);
        assert!(bbox.width().is_finite());
    }

    #[rstest]
    fn box_under_covers_wide_discs_at_high_latitude() {
        let centre = coordinate(80.0, 0.0);
        let radius = 200.0;
        let delta = radius / EARTH_RADIUS_KM;
        let phi = centre.latitude().to_radians();
        // Tangent point of the disc with its easternmost meridian.
        let widest = coordinate(
            (phi.sin() / delta.cos()).asin().to_degrees(),
            (delta.sin() / phi.cos()).asin().to_degrees(),
        );

        assert!((distance_km(centre, widest) - radius).abs() < 1e-6);
        assert!(widest.longitude() > bounding_box(centre, radius).max().x);
    }

    #[rstest]
    #[case(0.0, 0.0, 5.0)]
    #[case(51.501_009, -0.141_588, 20.0)]
    #[case(-33.868_8, 151.209_3, 200.0)]
    #[case(60.0, 10.0, 200.0)]
    fn box_covers_points_on_the_radius_circle(
        #[case] latitude: f64,
        #[case] longitude: f64,
        #[case] radius: f64,
    ) {
        let centre = coordinate(latitude, longitude);
        let bbox = bounding_box(centre, radius);
        for step in 0_u32..72 {
            let bearing = f64::from(step) * 5.0;
            let point = destination(centre, bearing, radius);
            let inside = (bbox.min().x..=bbox.max().x).contains(&point.longitude())
                && (bbox.min().y..=bbox.max().y).contains(&point.latitude());
            assert!(inside, "bearing {bearing} escaped the box: {point:?}");
        }
    }
}
