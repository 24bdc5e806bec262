use crate::error::TaskError;
use crate::geo::GeoPoint;
use crate::projection::SearchPoint;
use crate::util::BoundedAngle;
use uom::si::f64::{Angle, Length};
use uom::si::{angle::radian, length::meter};

/// FAI sector and keyhole sector radius, meters.
const FAI_RADIUS: f64 = 10_000.0;
/// Keyhole and BGA inner cylinder radius, meters.
const KEYHOLE_INNER: f64 = 500.0;
/// BGA fixed-course sector radius, meters.
const BGA_RADIUS: f64 = 20_000.0;
/// Opening angle of the symmetric sector shapes.
const QUADRANT: f64 = std::f64::consts::FRAC_PI_2;
/// Relative slack on flat-plane radius comparisons; the projection distorts
/// geodesic distances by up to this much across a task-sized region.
const RADIUS_TOLERANCE: f64 = 2.0e-3;
/// Slack on radial comparisons, radians; covers the bearing distortion of
/// the projection at zone scale.
const RADIAL_TOLERANCE: f64 = 2.0e-3;

/// The shape scored around a turnpoint.
///
/// A closed set of shapes rather than an open trait: every solver that walks
/// a task (transition checks, distance scans, isoline construction) needs to
/// reason about the concrete geometry, and competition rules only ever use
/// these shapes. All radial fields are radians in [0, 2π), all radii meters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ObservationZone {
    /// Everything within `radius` of the turnpoint.
    Cylinder { radius: f64 },
    /// A pie slice between two radials, out to `radius`.
    Sector {
        radius: f64,
        start_radial: f64,
        end_radial: f64,
    },
    /// 90° symmetric sector with 10 km radius; radials follow the legs.
    FaiSector { start_radial: f64, end_radial: f64 },
    /// DAeC keyhole: 10 km 90° sector plus a 500 m cylinder.
    Keyhole { start_radial: f64, end_radial: f64 },
    /// BGA fixed course: 20 km 90° sector plus a 500 m cylinder.
    BgaFixedCourse { start_radial: f64, end_radial: f64 },
    /// A gate of `length` meters centered on the turnpoint, perpendicular
    /// to `bearing` (the course direction through the gate).
    Line { length: f64, bearing: f64 },
    /// A sector with the region inside `inner_radius` excluded.
    AnnularSector {
        inner_radius: f64,
        radius: f64,
        start_radial: f64,
        end_radial: f64,
    },
}

impl ObservationZone {
    pub fn cylinder(radius: Length) -> Result<Self, TaskError> {
        let radius = radius.get::<meter>();
        if radius <= 0.0 {
            return Err(TaskError::DegenerateZone { meters: radius });
        }
        Ok(Self::Cylinder { radius })
    }

    pub fn sector(radius: Length, start: Angle, end: Angle) -> Result<Self, TaskError> {
        let radius = radius.get::<meter>();
        if radius <= 0.0 {
            return Err(TaskError::DegenerateZone { meters: radius });
        }
        Ok(Self::Sector {
            radius,
            start_radial: BoundedAngle::new(start).get_bounded(),
            end_radial: BoundedAngle::new(end).get_bounded(),
        })
    }

    /// FAI sector; radials are placed by [`set_legs`](Self::set_legs).
    #[must_use]
    pub fn fai_sector() -> Self {
        Self::FaiSector {
            start_radial: 0.0,
            end_radial: QUADRANT,
        }
    }

    /// DAeC keyhole; radials are placed by [`set_legs`](Self::set_legs).
    #[must_use]
    pub fn keyhole() -> Self {
        Self::Keyhole {
            start_radial: 0.0,
            end_radial: QUADRANT,
        }
    }

    /// BGA fixed course; radials are placed by [`set_legs`](Self::set_legs).
    #[must_use]
    pub fn bga_fixed_course() -> Self {
        Self::BgaFixedCourse {
            start_radial: 0.0,
            end_radial: QUADRANT,
        }
    }

    /// A start/finish gate; its course direction is placed by
    /// [`set_legs`](Self::set_legs).
    pub fn line(length: Length) -> Result<Self, TaskError> {
        let length = length.get::<meter>();
        if length <= 0.0 {
            return Err(TaskError::DegenerateZone { meters: length });
        }
        Ok(Self::Line {
            length,
            bearing: 0.0,
        })
    }

    pub fn annular_sector(
        inner_radius: Length,
        radius: Length,
        start: Angle,
        end: Angle,
    ) -> Result<Self, TaskError> {
        let inner_radius = inner_radius.get::<meter>();
        let radius = radius.get::<meter>();
        if radius <= 0.0 || inner_radius < 0.0 || inner_radius >= radius {
            return Err(TaskError::DegenerateZone {
                meters: radius - inner_radius,
            });
        }
        Ok(Self::AnnularSector {
            inner_radius,
            radius,
            start_radial: BoundedAngle::new(start).get_bounded(),
            end_radial: BoundedAngle::new(end).get_bounded(),
        })
    }

    /// Re-orients the zone to its neighbouring turnpoints.
    ///
    /// Symmetric sectors open around the bisector of the two legs (or face
    /// the single leg at a task end); line gates lie perpendicular to the
    /// course through them. Fixed-radial sectors and cylinders are
    /// unaffected.
    pub(crate) fn set_legs(
        &mut self,
        prev: Option<&GeoPoint>,
        here: &GeoPoint,
        next: Option<&GeoPoint>,
    ) {
        let to_prev = prev.map(|p| here.bearing_rad(p));
        let to_next = next.map(|n| here.bearing_rad(n));

        let bisector = match (to_prev, to_next) {
            (Some(a), Some(b)) => Some(half_angle(a, b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };

        match self {
            Self::FaiSector {
                start_radial,
                end_radial,
            }
            | Self::Keyhole {
                start_radial,
                end_radial,
            }
            | Self::BgaFixedCourse {
                start_radial,
                end_radial,
            } => {
                if let Some(bisector) = bisector {
                    *start_radial = BoundedAngle::from_radians(bisector - QUADRANT / 2.0)
                        .get_bounded();
                    *end_radial =
                        BoundedAngle::from_radians(bisector + QUADRANT / 2.0).get_bounded();
                }
            }
            Self::Line { bearing, .. } => {
                // course direction through the gate; for a start that is
                // the outbound leg, for a finish the inbound one
                let course = match (to_prev, to_next) {
                    (Some(a), Some(b)) => {
                        Some(half_angle(BoundedAngle::from_radians(a + std::f64::consts::PI)
                            .get_bounded(), b))
                    }
                    (Some(a), None) => Some(BoundedAngle::from_radians(a + std::f64::consts::PI)
                        .get_bounded()),
                    (None, Some(b)) => Some(b),
                    (None, None) => None,
                };
                if let Some(course) = course {
                    *bearing = course;
                }
            }
            Self::Cylinder { .. } | Self::Sector { .. } | Self::AnnularSector { .. } => {}
        }
    }

    /// Whether `location` is inside the zone centered on `origin`.
    ///
    /// Evaluated in the flat task plane, so both points must come from the
    /// same projection. Comparisons carry a small slack so a point placed
    /// geodetically on the boundary still tests inside after projection.
    #[must_use]
    pub fn is_in_sector(&self, origin: &SearchPoint, location: &SearchPoint) -> bool {
        let d = origin.flat().distance(location.flat());
        let in_radius = |r: f64| d <= r * (1.0 + RADIUS_TOLERANCE);

        let in_radials = |start: f64, end: f64| {
            if d == 0.0 {
                // the center has no bearing; it belongs to every sector
                return true;
            }
            let bearing = origin.flat().bearing_rad(location.flat());
            BoundedAngle::from_radians(bearing).is_in_range(
                &BoundedAngle::from_radians(start),
                &BoundedAngle::from_radians(end),
            ) || BoundedAngle::from_radians(bearing - start)
                .to_signed_range()
                .abs()
                <= RADIAL_TOLERANCE
                || BoundedAngle::from_radians(bearing - end)
                    .to_signed_range()
                    .abs()
                    <= RADIAL_TOLERANCE
        };

        match *self {
            Self::Cylinder { radius } => in_radius(radius),
            Self::Sector {
                radius,
                start_radial,
                end_radial,
            } => in_radius(radius) && in_radials(start_radial, end_radial),
            Self::FaiSector {
                start_radial,
                end_radial,
            } => in_radius(FAI_RADIUS) && in_radials(start_radial, end_radial),
            Self::Keyhole {
                start_radial,
                end_radial,
            } => {
                in_radius(KEYHOLE_INNER)
                    || (in_radius(FAI_RADIUS) && in_radials(start_radial, end_radial))
            }
            Self::BgaFixedCourse {
                start_radial,
                end_radial,
            } => {
                in_radius(KEYHOLE_INNER)
                    || (in_radius(BGA_RADIUS) && in_radials(start_radial, end_radial))
            }
            Self::Line { length, bearing } => {
                let v = origin.flat().vector_to(location.flat());
                let along = v.x * bearing.sin() + v.y * bearing.cos();
                let across = v.x * bearing.cos() - v.y * bearing.sin();
                // a crossing corridor as wide as the gate itself, so a fix
                // sequence straddling the gate registers a transition
                let half = (length / 2.0) * (1.0 + RADIUS_TOLERANCE);
                across.abs() <= half && along.abs() <= half
            }
            Self::AnnularSector {
                inner_radius,
                radius,
                start_radial,
                end_radial,
            } => {
                d >= inner_radius * (1.0 - RADIUS_TOLERANCE)
                    && in_radius(radius)
                    && in_radials(start_radial, end_radial)
            }
        }
    }

    /// A point on the zone boundary, `t` in [0, 1].
    ///
    /// Sector shapes sweep their outer arc from the start radial to the end
    /// radial; cylinders sweep the full circle; lines run from one gate end
    /// to the other.
    #[must_use]
    pub fn boundary_parametric(&self, origin: &GeoPoint, t: f64) -> GeoPoint {
        let t = t.clamp(0.0, 1.0);
        let arc = |radius: f64, start: f64, end: f64| {
            let sweep = BoundedAngle::from_radians(end - start).get_bounded();
            origin.offset_m(start + t * sweep, radius)
        };
        match *self {
            Self::Cylinder { radius } => {
                origin.offset_m(t * 2.0 * std::f64::consts::PI, radius)
            }
            Self::Sector {
                radius,
                start_radial,
                end_radial,
            } => arc(radius, start_radial, end_radial),
            Self::FaiSector {
                start_radial,
                end_radial,
            }
            | Self::Keyhole {
                start_radial,
                end_radial,
            } => arc(FAI_RADIUS, start_radial, end_radial),
            Self::BgaFixedCourse {
                start_radial,
                end_radial,
            } => arc(BGA_RADIUS, start_radial, end_radial),
            Self::Line { length, bearing } => {
                let s = (t - 0.5) * length;
                if s >= 0.0 {
                    origin.offset_m(bearing + QUADRANT, s)
                } else {
                    origin.offset_m(bearing - QUADRANT, -s)
                }
            }
            Self::AnnularSector {
                radius,
                start_radial,
                end_radial,
                ..
            } => arc(radius, start_radial, end_radial),
        }
    }

    /// Distance credited for free when this zone starts or ends a leg.
    ///
    /// A start cylinder is scored from its edge, not its center; keyhole
    /// shapes credit their inner cylinder. Sectors and gates score from the
    /// turnpoint itself.
    #[must_use]
    pub fn score_adjustment(&self) -> Length {
        Length::new::<meter>(self.score_adjustment_m())
    }

    pub(crate) fn score_adjustment_m(&self) -> f64 {
        match *self {
            Self::Cylinder { radius } => radius,
            Self::Keyhole { .. } | Self::BgaFixedCourse { .. } => KEYHOLE_INNER,
            Self::Sector { .. }
            | Self::FaiSector { .. }
            | Self::Line { .. }
            | Self::AnnularSector { .. } => 0.0,
        }
    }

    /// Largest distance from the turnpoint to any point of the zone.
    pub(crate) fn bounding_radius_m(&self) -> f64 {
        match *self {
            Self::Cylinder { radius } => radius,
            Self::Sector { radius, .. } => radius,
            Self::FaiSector { .. } | Self::Keyhole { .. } => FAI_RADIUS,
            Self::BgaFixedCourse { .. } => BGA_RADIUS,
            Self::Line { length, .. } => length / 2.0,
            Self::AnnularSector { radius, .. } => radius,
        }
    }

}

/// Bisector of two bearings along the shorter arc, in [0, 2π).
fn half_angle(a: f64, b: f64) -> f64 {
    let delta = BoundedAngle::from_radians(b - a).to_signed_range();
    BoundedAngle::from_radians(a + delta / 2.0).get_bounded()
}

#[cfg(test)]
mod tests {
    use super::{half_angle, ObservationZone};
    use crate::geo::GeoPoint;
    use crate::projection::{SearchPoint, TaskProjection};
    use approx::assert_relative_eq;
    use rstest::rstest;
    use uom::si::f64::{Angle, Length};
    use uom::si::{angle::degree, length::meter};

    fn m(meters: f64) -> Length {
        Length::new::<meter>(meters)
    }

    fn d(degrees: f64) -> Angle {
        Angle::new::<degree>(degrees)
    }

    /// Projection frozen around the zone center, plus the center itself as
    /// a search point.
    fn setup() -> (TaskProjection, SearchPoint, GeoPoint) {
        let center = GeoPoint::from_degrees(47., 9.).unwrap();
        let mut proj = TaskProjection::new();
        proj.reset(&center);
        proj.scan_location(&GeoPoint::from_degrees(47.5, 9.5).unwrap());
        proj.scan_location(&GeoPoint::from_degrees(46.5, 8.5).unwrap());
        proj.update_fast();
        let origin = SearchPoint::new(center, &proj);
        (proj, origin, center)
    }

    fn at(proj: &TaskProjection, center: &GeoPoint, bearing_deg: f64, distance: f64) -> SearchPoint {
        SearchPoint::new(center.offset_m(bearing_deg.to_radians(), distance), proj)
    }

    #[test]
    fn degenerate_dimensions_rejected() {
        assert!(ObservationZone::cylinder(m(0.)).is_err());
        assert!(ObservationZone::cylinder(m(-10.)).is_err());
        assert!(ObservationZone::line(m(0.)).is_err());
        assert!(ObservationZone::annular_sector(m(5000.), m(1000.), d(0.), d(90.)).is_err());
    }

    #[rstest]
    #[case(500., true)]
    #[case(999., true)]
    // the membership slack is well under a percent
    #[case(1010., false)]
    fn cylinder_membership(#[case] distance: f64, #[case] inside: bool) {
        let (proj, origin, center) = setup();
        let oz = ObservationZone::cylinder(m(1000.)).unwrap();
        let p = at(&proj, &center, 123., distance);
        assert_eq!(oz.is_in_sector(&origin, &p), inside);
    }

    #[rstest]
    #[case(45., 5000., true)] // inside radials and radius
    #[case(45., 11_000., false)] // outside radius
    #[case(180., 5000., false)] // outside radials
    #[case(0., 5000., true)] // on the start radial
    #[case(90., 5000., true)] // on the end radial
    fn sector_membership(#[case] bearing: f64, #[case] distance: f64, #[case] inside: bool) {
        let (proj, origin, center) = setup();
        let oz = ObservationZone::sector(m(10_000.), d(0.), d(90.)).unwrap();
        let p = at(&proj, &center, bearing, distance);
        assert_eq!(oz.is_in_sector(&origin, &p), inside);
    }

    #[test]
    fn sector_range_wrapping_through_north() {
        let (proj, origin, center) = setup();
        let oz = ObservationZone::sector(m(10_000.), d(315.), d(45.)).unwrap();
        assert!(oz.is_in_sector(&origin, &at(&proj, &center, 0., 5000.)));
        assert!(oz.is_in_sector(&origin, &at(&proj, &center, 350., 5000.)));
        assert!(!oz.is_in_sector(&origin, &at(&proj, &center, 90., 5000.)));
    }

    #[test]
    fn center_belongs_to_every_sector() {
        let (_, origin, _) = setup();
        let oz = ObservationZone::sector(m(10_000.), d(10.), d(20.)).unwrap();
        assert!(oz.is_in_sector(&origin, &origin));
    }

    #[test]
    fn keyhole_inner_cylinder_ignores_radials() {
        let (proj, origin, center) = setup();
        let mut oz = ObservationZone::keyhole();
        // sector opens north
        oz.set_legs(None, &center, Some(&center.offset_m(0., 50_000.)));
        // 400 m south: outside the sector but inside the 500 m cylinder
        assert!(oz.is_in_sector(&origin, &at(&proj, &center, 180., 400.)));
        // 5 km south: outside both
        assert!(!oz.is_in_sector(&origin, &at(&proj, &center, 180., 5000.)));
        // 5 km north: in the sector
        assert!(oz.is_in_sector(&origin, &at(&proj, &center, 0., 5000.)));
    }

    #[test]
    fn fai_sector_opens_on_leg_bisector() {
        let (proj, origin, center) = setup();
        let mut oz = ObservationZone::fai_sector();
        let prev = center.offset_m(270.0_f64.to_radians(), 50_000.);
        let next = center.offset_m(0.0, 50_000.);
        oz.set_legs(Some(&prev), &center, Some(&next));
        // bisector of west and north is northwest; the 90° sector covers
        // roughly [270°, 0°]
        assert!(oz.is_in_sector(&origin, &at(&proj, &center, 315., 5000.)));
        assert!(!oz.is_in_sector(&origin, &at(&proj, &center, 135., 5000.)));
    }

    #[test]
    fn line_gate_corridor() {
        let (proj, origin, center) = setup();
        let mut oz = ObservationZone::line(m(2000.)).unwrap();
        // start gate: course is towards the next point, north
        oz.set_legs(None, &center, Some(&center.offset_m(0., 50_000.)));
        // on the gate, 800 m to the side
        assert!(oz.is_in_sector(&origin, &at(&proj, &center, 90., 800.)));
        // past the gate ends
        assert!(!oz.is_in_sector(&origin, &at(&proj, &center, 90., 1200.)));
        // ahead of the gate beyond the corridor
        assert!(!oz.is_in_sector(&origin, &at(&proj, &center, 0., 1200.)));
    }

    #[test]
    fn boundary_points_lie_on_the_zone() {
        let (proj, origin, center) = setup();
        let oz = ObservationZone::sector(m(10_000.), d(0.), d(90.)).unwrap();
        for t in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let p = oz.boundary_parametric(&center, t);
            assert_relative_eq!(center.distance_m(&p), 10_000., max_relative = 1e-6);
            assert!(oz.is_in_sector(&origin, &SearchPoint::new(p, &proj)));
        }
    }

    #[test]
    fn line_boundary_spans_the_gate() {
        let center = GeoPoint::from_degrees(47., 9.).unwrap();
        let mut oz = ObservationZone::line(m(2000.)).unwrap();
        oz.set_legs(None, &center, Some(&center.offset_m(0., 50_000.)));
        let a = oz.boundary_parametric(&center, 0.);
        let b = oz.boundary_parametric(&center, 1.);
        assert_relative_eq!(a.distance_m(&b), 2000., max_relative = 1e-6);
        assert_relative_eq!(center.distance_m(&a), 1000., max_relative = 1e-6);
    }

    #[rstest]
    #[case(ObservationZone::cylinder(m(5000.)).unwrap(), 5000.)]
    #[case(ObservationZone::keyhole(), 500.)]
    #[case(ObservationZone::bga_fixed_course(), 500.)]
    #[case(ObservationZone::fai_sector(), 0.)]
    #[case(ObservationZone::line(m(1000.)).unwrap(), 0.)]
    fn score_adjustments(#[case] oz: ObservationZone, #[case] expected: f64) {
        assert_relative_eq!(oz.score_adjustment().get::<meter>(), expected);
    }

    #[rstest]
    #[case(0., 90., 45.)]
    #[case(350., 10., 0.)]
    #[case(180., 270., 225.)]
    #[case(45., 135., 90.)]
    fn half_angle_short_arc(#[case] a: f64, #[case] b: f64, #[case] expected: f64) {
        assert_relative_eq!(
            half_angle(a.to_radians(), b.to_radians()),
            expected.to_radians(),
            epsilon = 1e-12
        );
    }
}
