use crate::util::BoundedAngle;
use std::fmt;
use std::fmt::Display;
use uom::si::f64::{Angle, Length};
use uom::si::{
    angle::{degree, radian},
    length::meter,
};

#[cfg(any(test, feature = "approx"))]
use approx::AbsDiffEq;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Mean earth radius used for all spherical-earth geometry.
///
/// Tasks span tens to hundreds of kilometers, where the spherical
/// approximation is well inside the accuracy of the rest of the engine.
pub(crate) const EARTH_RADIUS: f64 = 6_371_000.0;

/// An Earth-bound location as latitude and longitude.
///
/// Immutable value type. Arithmetic is not defined on `GeoPoint` directly;
/// use [`GeoPoint::distance`], [`GeoPoint::bearing`], and
/// [`GeoPoint::offset`] for great-circle helpers, or go through
/// [`TaskProjection`](crate::projection::TaskProjection) for the flat-plane
/// geometry the solvers run in.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeoPoint {
    // NOTE: uom does not guarantee how these angles are normalized; we
    // normalize on output instead of on construction.
    latitude: Angle,
    longitude: Angle,
}

impl GeoPoint {
    /// Constructs a location from latitude and longitude.
    ///
    /// The latitude must be in [-90°, 90°] % 360°. If it is not, this
    /// function returns `None`.
    #[must_use]
    pub fn new(latitude: impl Into<Angle>, longitude: impl Into<Angle>) -> Option<Self> {
        let latitude = latitude.into();
        let latitude_in_signed_radians = BoundedAngle::new(latitude).to_signed_range();
        if !(-std::f64::consts::FRAC_PI_2..=std::f64::consts::FRAC_PI_2)
            .contains(&latitude_in_signed_radians)
        {
            return None;
        }
        Some(Self {
            latitude,
            longitude: longitude.into(),
        })
    }

    /// Constructs a location from latitude and longitude given in degrees.
    #[must_use]
    pub fn from_degrees(latitude: f64, longitude: f64) -> Option<Self> {
        Self::new(Angle::new::<degree>(latitude), Angle::new::<degree>(longitude))
    }

    /// Returns the latitude, normalized into [-90°, 90°].
    #[must_use]
    pub fn latitude(&self) -> Angle {
        Angle::new::<radian>(self.lat_rad())
    }

    /// Returns the longitude, normalized into [-180°, 180°).
    #[must_use]
    pub fn longitude(&self) -> Angle {
        Angle::new::<radian>(self.lon_rad())
    }

    pub(crate) fn lat_rad(&self) -> f64 {
        BoundedAngle::new(self.latitude).to_signed_range()
    }

    pub(crate) fn lon_rad(&self) -> f64 {
        BoundedAngle::new(self.longitude).to_signed_range()
    }

    /// Computes the great-circle distance to `other` on the surface of the
    /// earth, [using the archaversine] (inverse haversine).
    ///
    /// [using the archaversine]: https://en.wikipedia.org/wiki/Haversine_formula#Formulation
    #[must_use]
    pub fn distance(&self, other: &GeoPoint) -> Length {
        Length::new::<meter>(self.distance_m(other))
    }

    pub(crate) fn distance_m(&self, other: &GeoPoint) -> f64 {
        let lat_a = self.lat_rad();
        let lat_b = other.lat_rad();
        let delta_lat = lat_b - lat_a;
        let delta_lon = other.lon_rad() - self.lon_rad();

        let inner = 1. - delta_lat.cos() + lat_a.cos() * lat_b.cos() * (1. - delta_lon.cos());
        2. * (inner / 2.).sqrt().asin() * EARTH_RADIUS
    }

    /// Computes the initial great-circle bearing towards `other`, measured
    /// clockwise from true north in [0°, 360°).
    #[must_use]
    pub fn bearing(&self, other: &GeoPoint) -> Angle {
        Angle::new::<radian>(self.bearing_rad(other))
    }

    pub(crate) fn bearing_rad(&self, other: &GeoPoint) -> f64 {
        let lat_a = self.lat_rad();
        let lat_b = other.lat_rad();
        let delta_lon = other.lon_rad() - self.lon_rad();

        let y = delta_lon.sin() * lat_b.cos();
        let x = lat_a.cos() * lat_b.sin() - lat_a.sin() * lat_b.cos() * delta_lon.cos();
        BoundedAngle::from_radians(y.atan2(x)).get_bounded()
    }

    /// Computes the destination point at the given bearing and distance from
    /// this point, along a great circle.
    #[must_use]
    pub fn offset(&self, bearing: Angle, distance: Length) -> GeoPoint {
        self.offset_m(bearing.get::<radian>(), distance.get::<meter>())
    }

    pub(crate) fn offset_m(&self, bearing_rad: f64, distance_m: f64) -> GeoPoint {
        let delta = distance_m / EARTH_RADIUS;
        let lat_a = self.lat_rad();
        let lon_a = self.lon_rad();

        let lat_b =
            (lat_a.sin() * delta.cos() + lat_a.cos() * delta.sin() * bearing_rad.cos()).asin();
        let lon_b = lon_a
            + (bearing_rad.sin() * delta.sin() * lat_a.cos())
                .atan2(delta.cos() - lat_a.sin() * lat_b.sin());

        GeoPoint {
            latitude: Angle::new::<radian>(lat_b),
            longitude: Angle::new::<radian>(lon_b),
        }
    }

    /// Linear interpolation between two nearby points, `t` in [0, 1].
    ///
    /// Intended for gate endpoints and effective-distance bookkeeping over
    /// leg-scale separations, not for antipodal geometry.
    #[must_use]
    pub fn interpolate(&self, other: &GeoPoint, t: f64) -> GeoPoint {
        let t = t.clamp(0.0, 1.0);
        let bearing = self.bearing_rad(other);
        let distance = self.distance_m(other);
        self.offset_m(bearing, distance * t)
    }
}

impl Default for GeoPoint {
    fn default() -> Self {
        Self {
            latitude: Angle::new::<radian>(0.),
            longitude: Angle::new::<radian>(0.),
        }
    }
}

impl Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lat = self.latitude().get::<degree>();
        let lon = self.longitude().get::<degree>();
        match (lat.is_sign_positive(), lon.is_sign_positive()) {
            (true, true) => write!(f, "{:.6}°N, {:.6}°E", lat, lon),
            (true, false) => write!(f, "{:.6}°N, {:.6}°W", lat, lon.abs()),
            (false, true) => write!(f, "{:.6}°S, {:.6}°E", lat.abs(), lon),
            (false, false) => write!(f, "{:.6}°S, {:.6}°W", lat.abs(), lon.abs()),
        }
    }
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for GeoPoint {
    type Epsilon = Length;

    fn default_epsilon() -> Self::Epsilon {
        // sub-meter is plenty: the flat projection itself is only good to
        // about a meter over task-scale regions.
        Length::new::<meter>(0.75)
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.distance(other) < epsilon
    }
}

#[cfg(test)]
mod tests {
    use super::GeoPoint;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rstest::rstest;
    use uom::si::angle::degree;
    use uom::si::f64::Angle;
    use uom::si::length::meter;

    fn d(degrees: f64) -> Angle {
        Angle::new::<degree>(degrees)
    }

    #[rstest]
    #[case(90.9948211, 7.8211606)]
    #[case(190.112282, 19.880389)]
    fn rejects_bad_latitude(#[case] latitude: f64, #[case] longitude: f64) {
        assert_eq!(GeoPoint::new(d(latitude), d(longitude)), None);
    }

    #[test]
    fn equator_degree_of_longitude() {
        let a = GeoPoint::from_degrees(0., 0.).unwrap();
        let b = GeoPoint::from_degrees(0., 1.).unwrap();
        // one degree of longitude at the equator is about 111.2 km on the
        // spherical earth
        assert_relative_eq!(
            a.distance(&b).get::<meter>(),
            111_194.9,
            max_relative = 1e-4
        );
        assert_relative_eq!(a.bearing(&b).get::<degree>(), 90.0, epsilon = 1e-9);
    }

    #[rstest]
    #[case(0., 0., 0., 1., 90.)]
    #[case(0., 0., 1., 0., 0.)]
    #[case(0., 0., -1., 0., 180.)]
    #[case(0., 0., 0., -1., 270.)]
    fn cardinal_bearings(
        #[case] lat_a: f64,
        #[case] lon_a: f64,
        #[case] lat_b: f64,
        #[case] lon_b: f64,
        #[case] expected: f64,
    ) {
        let a = GeoPoint::from_degrees(lat_a, lon_a).unwrap();
        let b = GeoPoint::from_degrees(lat_b, lon_b).unwrap();
        assert_relative_eq!(a.bearing(&b).get::<degree>(), expected, epsilon = 1e-9);
    }

    #[rstest]
    #[case(45., 7., 30., 10_000.)]
    #[case(-35., 138., 290., 55_000.)]
    #[case(52., -1., 359., 120_000.)]
    fn offset_roundtrips_through_distance_and_bearing(
        #[case] lat: f64,
        #[case] lon: f64,
        #[case] bearing: f64,
        #[case] distance: f64,
    ) {
        let origin = GeoPoint::from_degrees(lat, lon).unwrap();
        let dest = origin.offset(d(bearing), uom::si::f64::Length::new::<meter>(distance));

        assert_relative_eq!(origin.distance_m(&dest), distance, max_relative = 1e-6);
        assert_relative_eq!(
            origin.bearing(&dest).get::<degree>(),
            bearing,
            epsilon = 1e-6
        );
    }

    #[test]
    fn interpolate_midpoint() {
        let a = GeoPoint::from_degrees(0., 0.).unwrap();
        let b = GeoPoint::from_degrees(0., 1.).unwrap();
        let mid = a.interpolate(&b, 0.5);
        assert_abs_diff_eq!(mid, GeoPoint::from_degrees(0., 0.5).unwrap());
    }
}
