use crate::geo::{GeoPoint, EARTH_RADIUS};
use crate::util::BoundedAngle;
use crate::{Point2, Vector2};
use uom::si::angle::radian;
use uom::si::f64::Angle;

#[cfg(any(test, feature = "approx"))]
use approx::AbsDiffEq;

/// A point in a task's locally-flattened Cartesian plane, in meters.
///
/// Only valid in the context of the [`TaskProjection`] that produced it: the
/// plane is centered on the task's midpoint and its x axis is scaled by the
/// cosine of the mid latitude, so flat points are not portable across tasks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatPoint {
    pub(crate) point: Point2,
}

impl FlatPoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            point: Point2::new(x, y),
        }
    }

    /// Easting in meters from the projection center.
    #[must_use]
    pub fn x(&self) -> f64 {
        self.point.x
    }

    /// Northing in meters from the projection center.
    #[must_use]
    pub fn y(&self) -> f64 {
        self.point.y
    }

    /// Euclidean distance to `other` in meters.
    #[must_use]
    pub fn distance(&self, other: &FlatPoint) -> f64 {
        (other.point - self.point).norm()
    }

    /// Navigation bearing (clockwise from +y/"north") towards `other`, in
    /// radians [0, 2π).
    pub(crate) fn bearing_rad(&self, other: &FlatPoint) -> f64 {
        let d: Vector2 = other.point - self.point;
        BoundedAngle::from_radians(d.x.atan2(d.y)).get_bounded()
    }

    pub(crate) fn vector_to(&self, other: &FlatPoint) -> Vector2 {
        other.point - self.point
    }
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for FlatPoint {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        1e-6
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.distance(other) <= epsilon
    }
}

/// The task-local flat-earth projection.
///
/// Owns the running bounding box of every location scanned into it, and a
/// midpoint/scale pair derived from that box. Lifecycle: construct once per
/// task, [`reset`](Self::reset) on the first turnpoint,
/// [`scan_location`](Self::scan_location) for every further turnpoint, then
/// freeze with [`update_fast`](Self::update_fast) before projecting anything.
/// Re-run the scan whenever turnpoints change.
///
/// Longitude is scaled by `cos(mid latitude)` so x/y distances are locally
/// isotropic in meters, which keeps the per-fix solver geometry free of
/// great-circle trigonometry.
#[derive(Debug, Clone)]
pub struct TaskProjection {
    lat_min: f64,
    lat_max: f64,
    lon_min: f64,
    lon_max: f64,
    mid_lat: f64,
    mid_lon: f64,
    cos_midloc: f64,
}

impl TaskProjection {
    /// A projection centered on 0°N 0°E until a location is scanned.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lat_min: 0.,
            lat_max: 0.,
            lon_min: 0.,
            lon_max: 0.,
            mid_lat: 0.,
            mid_lon: 0.,
            cos_midloc: 1.,
        }
    }

    /// Restarts the bounding box at a single location.
    pub fn reset(&mut self, location: &GeoPoint) {
        let lat = location.lat_rad();
        let lon = location.lon_rad();
        self.lat_min = lat;
        self.lat_max = lat;
        self.lon_min = lon;
        self.lon_max = lon;
    }

    /// Extends the bounding box to include `location`.
    pub fn scan_location(&mut self, location: &GeoPoint) {
        let lat = location.lat_rad();
        let lon = location.lon_rad();
        self.lat_min = self.lat_min.min(lat);
        self.lat_max = self.lat_max.max(lat);
        self.lon_min = self.lon_min.min(lon);
        self.lon_max = self.lon_max.max(lon);
    }

    /// Recomputes the midpoint and longitude scale from the scanned bounds.
    ///
    /// Must be called after the scan and before any projection, and again
    /// whenever the scanned set changes. A degenerate (single-point) bounding
    /// box is fine; the cosine is guarded so unprojection never divides by
    /// zero even for a box centered on a pole.
    pub fn update_fast(&mut self) {
        self.mid_lat = (self.lat_min + self.lat_max) / 2.;
        self.mid_lon = (self.lon_min + self.lon_max) / 2.;
        self.cos_midloc = self.mid_lat.cos().max(1e-12);
    }

    /// The center of the projection.
    #[must_use]
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            Angle::new::<radian>(self.mid_lat),
            Angle::new::<radian>(self.mid_lon),
        )
        .unwrap_or_default()
    }

    /// Maps a geodetic location into the flat plane.
    #[must_use]
    pub fn project(&self, location: &GeoPoint) -> FlatPoint {
        let x = (location.lon_rad() - self.mid_lon) * self.cos_midloc * EARTH_RADIUS;
        let y = (location.lat_rad() - self.mid_lat) * EARTH_RADIUS;
        FlatPoint::new(x, y)
    }

    /// Maps a flat-plane point back to a geodetic location.
    #[must_use]
    pub fn unproject(&self, point: &FlatPoint) -> GeoPoint {
        let lon = point.x() / (self.cos_midloc * EARTH_RADIUS) + self.mid_lon;
        let lat = point.y() / EARTH_RADIUS + self.mid_lat;
        GeoPoint::new(Angle::new::<radian>(lat), Angle::new::<radian>(lon))
            .unwrap_or_else(|| self.center())
    }

    /// Approximate span of the scanned bounding box in meters, used to decide
    /// whether a location change is significant.
    #[must_use]
    pub fn approx_radius(&self) -> f64 {
        let dy = (self.lat_max - self.lat_min) * EARTH_RADIUS;
        let dx = (self.lon_max - self.lon_min) * self.cos_midloc * EARTH_RADIUS;
        (dx * dx + dy * dy).sqrt() / 2.
    }
}

impl Default for TaskProjection {
    fn default() -> Self {
        Self::new()
    }
}

/// A geodetic location paired with its projection into the task plane.
///
/// The flat half is only meaningful for the projection it was created with;
/// re-[`project`](Self::project) after the projection is refrozen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchPoint {
    location: GeoPoint,
    flat: FlatPoint,
}

impl SearchPoint {
    #[must_use]
    pub fn new(location: GeoPoint, projection: &TaskProjection) -> Self {
        Self {
            location,
            flat: projection.project(&location),
        }
    }

    #[must_use]
    pub fn location(&self) -> &GeoPoint {
        &self.location
    }

    #[must_use]
    pub fn flat(&self) -> &FlatPoint {
        &self.flat
    }

    /// Refreshes the flat half after the projection changed.
    pub fn project(&mut self, projection: &TaskProjection) {
        self.flat = projection.project(&self.location);
    }
}
