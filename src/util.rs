use uom::si::angle::radian;
use uom::si::f64::Angle;

#[cfg(any(test, feature = "approx"))]
use approx::AbsDiffEq;

/// An angle normalized into [0°, 360°).
///
/// Used wherever bearings are compared or tested against radial ranges, so
/// that wraparound at north never has to be handled at the call site.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct BoundedAngle {
    angle: Angle,
}

impl BoundedAngle {
    pub(crate) fn new(angle: impl Into<Angle>) -> Self {
        Self {
            // NOTE: even though we put the value into bounds here, uom may choose to store
            // the value differently-normalized, so we must normalize on output as well.
            angle: Angle::new::<radian>(Self::into_bounds(angle.into())),
        }
    }

    pub(crate) fn from_radians(radians: f64) -> Self {
        Self::new(Angle::new::<radian>(radians))
    }

    /// Returns the angle in [0°, 360°) in radians.
    pub(crate) fn get_bounded(self) -> f64 {
        Self::into_bounds(self.angle)
    }

    /// Check if the angle is in [start, stop], where the range may wrap
    /// through north. If start == stop only that exact angle is in range.
    ///
    /// Based on <https://math.stackexchange.com/a/2276916>: rotating
    /// everything by -start reduces the wrapping range to a plain
    /// comparison.
    pub(crate) fn is_in_range(&self, start: &BoundedAngle, stop: &BoundedAngle) -> bool {
        let full = Angle::FULL_TURN.get::<radian>();
        let offset = (self.get_bounded() - start.get_bounded()).rem_euclid(full);
        let span = (stop.get_bounded() - start.get_bounded()).rem_euclid(full);
        offset <= span
    }

    fn into_bounds(angle: Angle) -> f64 {
        let out_of_bounds: f64 = angle.get::<radian>();
        out_of_bounds.rem_euclid(Angle::FULL_TURN.get::<radian>())
    }

    /// Returns the angle in [-180°, 180°) in radians.
    pub(crate) fn to_signed_range(self) -> f64 {
        let angle = self.get_bounded();
        if angle < Angle::HALF_TURN.get::<radian>() {
            angle
        } else {
            angle - Angle::FULL_TURN.get::<radian>()
        }
    }
}

impl<U: Into<Angle>> From<U> for BoundedAngle {
    fn from(value: U) -> Self {
        BoundedAngle::new(value)
    }
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for BoundedAngle {
    type Epsilon = <f64 as AbsDiffEq>::Epsilon;

    fn default_epsilon() -> Self::Epsilon {
        // this is very accurate in radians
        0.000_000_001
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        Self::new(self.angle - other.angle).to_signed_range().abs() <= epsilon
    }
}

/// Solves `x^2 + b*x + c = 0` for real roots.
///
/// This is all the wind-triangle solvers need: the ground-speed relation
/// `Vn^2 - 2*Vn*W*cos(theta) + W^2 - V^2 = 0` is monic in the ground speed.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Quadratic {
    b: f64,
    discriminant: f64,
}

impl Quadratic {
    pub(crate) fn new(b: f64, c: f64) -> Self {
        Self {
            b,
            discriminant: b * b - 4.0 * c,
        }
    }

    /// Whether real solutions exist.
    pub(crate) fn check(&self) -> bool {
        self.discriminant >= 0.0
    }

    /// The greater of the two real roots. Only meaningful if [`Self::check`]
    /// returned true.
    pub(crate) fn solution_max(&self) -> f64 {
        (-self.b + self.discriminant.max(0.0).sqrt()) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::{BoundedAngle, Quadratic};
    use approx::assert_relative_eq;
    use rstest::rstest;
    use uom::si::angle::{degree, radian};
    use uom::si::f64::Angle;

    fn d(degrees: f64) -> Angle {
        Angle::new::<degree>(degrees)
    }

    #[test]
    fn bounded_angle_negative_degrees() {
        let sut = BoundedAngle::new(d(-390.));
        assert_eq!(sut.get_bounded(), 330.0_f64.to_radians());
    }

    #[test]
    fn bounded_angle_positive_outside_bounds() {
        let out_of_bounds = Angle::FULL_TURN + Angle::new::<radian>(0.9);
        let sut = BoundedAngle::new(out_of_bounds);
        assert_relative_eq!(sut.get_bounded(), 0.9, epsilon = 0.000_000_001);
    }

    #[rstest]
    #[case(d(0.), 0.)]
    #[case(d(180.), -180.)]
    #[case(d(359.), -1.)]
    #[case(d(90.), 90.)]
    #[case(d(270.), -90.)]
    #[case(d(-90.), -90.)]
    #[case(d(360.+340.), -20.)]
    fn bounded_angle_to_signed_range_converts_correctly(
        #[case] input: Angle,
        #[case] expected_result_in_degrees: f64,
    ) {
        let bounded = BoundedAngle::new(input);

        assert_relative_eq!(
            bounded.to_signed_range(),
            expected_result_in_degrees.to_radians(),
            epsilon = f64::EPSILON * 1000.
        );
    }

    #[rstest]
    #[case(d(10.), (d(350.), d(30.)), true)]
    #[case(d(0.), (d(270.), d(360.)), true)]
    #[case(d(40.), (d(350.), d(30.)), false)]
    #[case(d(180.), (d(90.), d(270.)), true)]
    fn bounded_angle_is_in_range_works(
        #[case] input: Angle,
        #[case] range: (Angle, Angle),
        #[case] expected_result: bool,
    ) {
        let angle = BoundedAngle::new(input);

        let (start, end) = range;
        let result = angle.is_in_range(&BoundedAngle::new(start), &BoundedAngle::new(end));
        assert_eq!(result, expected_result);
    }

    #[rstest]
    // x^2 - 3x + 2 = 0 -> roots 1, 2
    #[case(-3.0, 2.0, 2.0)]
    // x^2 - 1 = 0 -> roots -1, 1
    #[case(0.0, -1.0, 1.0)]
    // (x + 4)^2 = 0 -> double root at -4
    #[case(8.0, 16.0, -4.0)]
    fn quadratic_max_root(#[case] b: f64, #[case] c: f64, #[case] expected: f64) {
        let q = Quadratic::new(b, c);
        assert!(q.check());
        assert_relative_eq!(q.solution_max(), expected, epsilon = 1e-12);
    }

    #[test]
    fn quadratic_no_real_roots() {
        // x^2 + 1 = 0
        assert!(!Quadratic::new(0.0, 1.0).check());
    }
}
