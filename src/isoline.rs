//! Isolines of constant leg distance through an AAT area.
//!
//! With the previous and next targets fixed, every target position with the
//! same previous-target-to-next-target path length lies on an ellipse whose
//! foci are those two targets. The segment of that ellipse inside the
//! observation zone is the set of equivalent target placements; sliding
//! along it trades geometry without changing the scored distance.

use crate::geo::GeoPoint;
use crate::projection::{FlatPoint, SearchPoint, TaskProjection};
use crate::task_point::TaskPoint;
use crate::zero::ZeroFinder;

/// An ellipse in the flat task plane, built from its two foci and one point
/// on the curve.
#[derive(Debug, Clone)]
pub(crate) struct FlatEllipse {
    center: FlatPoint,
    /// Semi-major and semi-minor axes.
    a: f64,
    b: f64,
    /// Rotation of the major axis from the +x axis.
    theta: f64,
    /// Parametric phase of the defining on-curve point, so `t = 0` maps to
    /// it exactly.
    phase: f64,
}

impl FlatEllipse {
    /// Returns `None` for degenerate geometry: a defining point on the
    /// segment between the foci leaves an ellipse with no height.
    pub(crate) fn new(f1: &FlatPoint, f2: &FlatPoint, p: &FlatPoint) -> Option<Self> {
        let center = FlatPoint::new((f1.x() + f2.x()) / 2.0, (f1.y() + f2.y()) / 2.0);
        let c = f1.distance(f2) / 2.0;
        let a = (p.distance(f1) + p.distance(f2)) / 2.0;
        if a <= 0.0 {
            return None;
        }
        let b_sq = a * a - c * c;
        if b_sq <= a * a * 1.0e-12 {
            return None;
        }
        let b = b_sq.sqrt();
        let theta = (f2.y() - f1.y()).atan2(f2.x() - f1.x());

        // express p in the ellipse frame to recover its phase
        let dx = p.x() - center.x();
        let dy = p.y() - center.y();
        let u = dx * theta.cos() + dy * theta.sin();
        let v = -dx * theta.sin() + dy * theta.cos();
        let phase = (v / b).atan2(u / a);

        Some(Self {
            center,
            a,
            b,
            theta,
            phase,
        })
    }

    /// Point on the ellipse for `t` in [-0.5, 0.5]; `t = 0` is the defining
    /// point and a full unit of `t` is a full revolution.
    pub(crate) fn parametric(&self, t: f64) -> FlatPoint {
        let angle = self.phase + t * 2.0 * std::f64::consts::PI;
        let u = self.a * angle.cos();
        let v = self.b * angle.sin();
        FlatPoint::new(
            self.center.x() + u * self.theta.cos() - v * self.theta.sin(),
            self.center.y() + u * self.theta.sin() + v * self.theta.cos(),
        )
    }
}

/// [`FlatEllipse`] lifted back to geodetic coordinates.
#[derive(Debug, Clone)]
pub(crate) struct GeoEllipse {
    flat: FlatEllipse,
    projection: TaskProjection,
}

impl GeoEllipse {
    pub(crate) fn new(
        f1: &GeoPoint,
        f2: &GeoPoint,
        p: &GeoPoint,
        projection: &TaskProjection,
    ) -> Option<Self> {
        let flat = FlatEllipse::new(
            &projection.project(f1),
            &projection.project(f2),
            &projection.project(p),
        )?;
        Some(Self {
            flat,
            projection: projection.clone(),
        })
    }

    pub(crate) fn parametric(&self, t: f64) -> GeoPoint {
        self.projection.unproject(&self.flat.parametric(t))
    }
}

const ISOLINE_TOLERANCE: f64 = 1.0e-4;

/// The stretch of a constant-distance ellipse that stays inside one AAT
/// observation zone.
#[derive(Debug, Clone)]
pub struct AatIsolineSegment {
    ellipse: Option<GeoEllipse>,
    fallback: GeoPoint,
    t_up: f64,
    t_down: f64,
}

impl AatIsolineSegment {
    /// Builds the segment through `point`'s current target, given the fixed
    /// targets on either side.
    ///
    /// The segment collapses to just the target when the geometry is
    /// degenerate or the target sits outside its own zone.
    #[must_use]
    pub fn new(
        point: &TaskPoint,
        prev_target: &GeoPoint,
        next_target: &GeoPoint,
        projection: &TaskProjection,
    ) -> Self {
        let target = *point.location_remaining();
        let ellipse = GeoEllipse::new(prev_target, next_target, &target, projection);

        let mut segment = Self {
            ellipse,
            fallback: target,
            t_up: 0.0,
            t_down: 0.0,
        };
        let Some(ellipse) = &segment.ellipse else {
            return segment;
        };

        let inside = |t: f64| {
            let location = SearchPoint::new(ellipse.parametric(t), projection);
            if point
                .observation_zone()
                .is_in_sector(&SearchPoint::new(*point.location(), projection), &location)
            {
                1.0
            } else {
                -1.0
            }
        };

        // the target itself must be in its zone, otherwise there is no
        // segment to walk
        if inside(0.0) < 0.0 {
            segment.ellipse = None;
            return segment;
        }

        // boundary crossings on either side of the target; both searches
        // run outward from the target so that a half staying entirely
        // inside settles on its far end
        segment.t_up = ZeroFinder::new(0.0, 0.5, ISOLINE_TOLERANCE).find_zero(&inside);
        segment.t_down = -ZeroFinder::new(0.0, 0.5, ISOLINE_TOLERANCE).find_zero(|t| inside(-t));
        segment
    }

    /// Whether a usable segment exists.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.ellipse.is_some() && self.t_up > self.t_down + 2.0 * ISOLINE_TOLERANCE
    }

    /// Location along the segment, `q` in [0, 1]. Collapses to the target
    /// when the segment is invalid.
    #[must_use]
    pub fn parametric(&self, q: f64) -> GeoPoint {
        if !self.valid() {
            return self.fallback;
        }
        let Some(ellipse) = &self.ellipse else {
            return self.fallback;
        };
        let q = q.clamp(0.0, 1.0);
        ellipse.parametric(self.t_down + q * (self.t_up - self.t_down))
    }
}
