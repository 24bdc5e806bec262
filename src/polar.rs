use crate::error::TaskError;
use crate::zero::ZeroFinder;
use uom::si::f64::Velocity;
use uom::si::velocity::meter_per_second;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Coefficients of the parabolic sink model `w(V) = a*V^2 + b*V + c`, with
/// `V` and `w` in m/s and `w` positive down.
///
/// A physically meaningful polar has `a > 0`, `b < 0`, `c > 0`: sink grows
/// quadratically at speed, and the minimum-sink point sits at a positive
/// airspeed.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PolarCoefficients {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl PolarCoefficients {
    #[must_use]
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    fn is_valid(&self) -> bool {
        self.a > 0.0 && self.b < 0.0 && self.c > 0.0
    }

    fn sink_at(&self, v: f64) -> f64 {
        (self.a * v + self.b) * v + self.c
    }
}

/// Glide performance model of the aircraft.
///
/// Owns the parabolic polar coefficients together with the pilot-adjustable
/// degradation and planning factors: MacCready setting, bugs (clean ratio),
/// water ballast, and cruise efficiency. Every mutation goes through an
/// explicit setter and eagerly re-derives the cached characteristic speeds,
/// so solver reads are plain field loads on the per-fix hot path.
#[derive(Debug, Clone)]
pub struct GlidePolar {
    mc: f64,
    bugs: f64,
    ballast: f64,
    ballast_ratio: f64,
    cruise_efficiency: f64,

    ideal: PolarCoefficients,
    adjusted: PolarCoefficients,

    v_max: f64,
    v_min_sink: f64,
    s_min_sink: f64,
    v_best_ld: f64,
    s_best_ld: f64,
    v_opt: f64,
}

/// Manoeuvring-speed cap applied to all speed searches (m/s).
const DEFAULT_V_MAX: f64 = 75.0;

impl GlidePolar {
    /// Builds a polar from ideal (clean, unballasted) coefficients.
    ///
    /// Degenerate coefficients are rejected: every solver divides by the
    /// derived speeds, so they must exist and be positive.
    pub fn new(ideal: PolarCoefficients) -> Result<Self, TaskError> {
        if !ideal.is_valid() {
            return Err(TaskError::InvalidPolar {
                a: ideal.a,
                b: ideal.b,
                c: ideal.c,
            });
        }
        let mut polar = Self {
            mc: 0.0,
            bugs: 1.0,
            ballast: 0.0,
            ballast_ratio: 0.3,
            cruise_efficiency: 1.0,
            ideal,
            adjusted: ideal,
            v_max: DEFAULT_V_MAX,
            v_min_sink: 0.0,
            s_min_sink: 0.0,
            v_best_ld: 0.0,
            s_best_ld: 0.0,
            v_opt: 0.0,
        };
        polar.update();
        Ok(polar)
    }

    /// Sets the MacCready value. Negative settings are clamped to zero.
    pub fn set_mc(&mut self, mc: Velocity) {
        self.mc = mc.get::<meter_per_second>().max(0.0);
        self.update();
    }

    /// Current MacCready setting.
    #[must_use]
    pub fn mc(&self) -> Velocity {
        Velocity::new::<meter_per_second>(self.mc)
    }

    /// Sets the clean ratio: 1 is a clean wing, lower values degrade the
    /// polar. Clamped into (0, 1].
    pub fn set_bugs(&mut self, clean_ratio: f64) {
        self.bugs = clean_ratio.clamp(0.1, 1.0);
        self.update();
    }

    #[must_use]
    pub fn bugs(&self) -> f64 {
        self.bugs
    }

    /// Sets the ballast fill ratio, 0 = empty to 1 = full.
    pub fn set_ballast(&mut self, fill_ratio: f64) {
        self.ballast = fill_ratio.clamp(0.0, 1.0);
        self.update();
    }

    #[must_use]
    pub fn ballast(&self) -> f64 {
        self.ballast
    }

    /// Ratio of full-ballast mass to dry mass minus one (eg. 0.3 for 30%
    /// extra weight at full ballast).
    pub fn set_ballast_ratio(&mut self, ratio: f64) {
        self.ballast_ratio = ratio.max(0.0);
        self.update();
    }

    /// Sets the ratio of achieved cruise speed to the ideal MacCready speed.
    /// Clamped into [0.1, 2].
    pub fn set_cruise_efficiency(&mut self, efficiency: f64) {
        self.cruise_efficiency = efficiency.clamp(0.1, 2.0);
    }

    #[must_use]
    pub fn cruise_efficiency(&self) -> f64 {
        self.cruise_efficiency
    }

    /// Sets the manoeuvring speed cap for speed-to-fly searches.
    pub fn set_v_max(&mut self, v_max: Velocity) {
        self.v_max = v_max.get::<meter_per_second>().max(1.0);
        self.update();
    }

    /// Sink rate at the given airspeed, positive down.
    #[must_use]
    pub fn sink_rate(&self, airspeed: Velocity) -> Velocity {
        Velocity::new::<meter_per_second>(self.sink_rate_ms(airspeed.get::<meter_per_second>()))
    }

    pub(crate) fn sink_rate_ms(&self, v: f64) -> f64 {
        self.adjusted.sink_at(v)
    }

    /// Glide ratio (distance per height lost) at the given airspeed.
    #[must_use]
    pub fn glide_ratio_at(&self, airspeed: Velocity) -> f64 {
        let v = airspeed.get::<meter_per_second>();
        let s = self.sink_rate_ms(v);
        if s > 0.0 {
            v / s
        } else {
            0.0
        }
    }

    /// Best glide ratio of the (adjusted) polar.
    #[must_use]
    pub fn best_ld(&self) -> f64 {
        if self.s_best_ld > 0.0 {
            self.v_best_ld / self.s_best_ld
        } else {
            0.0
        }
    }

    /// Airspeed for best glide ratio.
    #[must_use]
    pub fn v_best_ld(&self) -> Velocity {
        Velocity::new::<meter_per_second>(self.v_best_ld)
    }

    /// Airspeed for minimum sink.
    #[must_use]
    pub fn v_min_sink(&self) -> Velocity {
        Velocity::new::<meter_per_second>(self.v_min_sink)
    }

    /// Minimum sink rate, positive down.
    #[must_use]
    pub fn min_sink(&self) -> Velocity {
        Velocity::new::<meter_per_second>(self.s_min_sink)
    }

    /// Zero-wind speed to fly for the current MacCready setting.
    #[must_use]
    pub fn v_opt(&self) -> Velocity {
        Velocity::new::<meter_per_second>(self.v_opt)
    }

    pub(crate) fn mc_ms(&self) -> f64 {
        self.mc
    }

    pub(crate) fn v_opt_ms(&self) -> f64 {
        self.v_opt
    }

    pub(crate) fn v_min_sink_ms(&self) -> f64 {
        self.v_min_sink
    }

    pub(crate) fn v_max_ms(&self) -> f64 {
        self.v_max
    }

    /// Re-derives the adjusted coefficients and the cached speeds.
    fn update(&mut self) {
        // bugs scale the whole sink curve up; ballast raises wing loading,
        // which stretches the polar along both axes by the loading factor
        let loading_factor = (1.0 + self.ballast * self.ballast_ratio).sqrt();
        let inv_bugs = 1.0 / self.bugs;
        self.adjusted = PolarCoefficients {
            a: inv_bugs * self.ideal.a / loading_factor,
            b: inv_bugs * self.ideal.b,
            c: inv_bugs * self.ideal.c * loading_factor,
        };

        self.v_min_sink = -self.adjusted.b / (2.0 * self.adjusted.a);
        self.s_min_sink = self.adjusted.sink_at(self.v_min_sink);
        self.v_best_ld = (self.adjusted.c / self.adjusted.a).sqrt();
        self.s_best_ld = self.adjusted.sink_at(self.v_best_ld);
        self.solve_vopt();
    }

    /// Finds the zero-wind MacCready speed to fly: the airspeed minimizing
    /// time per distance once height spent gliding is charged at the
    /// MacCready climb rate.
    fn solve_vopt(&mut self) {
        if self.mc <= 0.0 {
            self.v_opt = self.v_best_ld;
            return;
        }
        let zf = ZeroFinder::new(self.v_min_sink.max(1.0), self.v_max, 0.01);
        self.v_opt = zf.find_min(|v| (1.0 + self.sink_rate_ms(v) / self.mc) / v);
    }
}

impl Default for GlidePolar {
    /// The engine's reference polar: minimum sink 0.5 m/s at 25 m/s,
    /// `w(V) = 0.5 + ((V - 25) * 0.056)^2`.
    fn default() -> Self {
        Self::new(PolarCoefficients::new(0.003_136, -0.156_8, 2.46))
            .expect("reference coefficients are valid")
    }
}

#[cfg(test)]
mod tests {
    use super::{GlidePolar, PolarCoefficients};
    use approx::assert_relative_eq;
    use rstest::rstest;
    use uom::si::f64::Velocity;
    use uom::si::velocity::meter_per_second;

    fn ms(v: f64) -> Velocity {
        Velocity::new::<meter_per_second>(v)
    }

    #[rstest]
    #[case(0.0, -0.1, 2.0)]
    #[case(0.01, 0.1, 2.0)]
    #[case(0.01, -0.1, -2.0)]
    fn rejects_degenerate_coefficients(#[case] a: f64, #[case] b: f64, #[case] c: f64) {
        assert!(GlidePolar::new(PolarCoefficients::new(a, b, c)).is_err());
    }

    #[test]
    fn reference_polar_characteristics() {
        let polar = GlidePolar::default();
        // minimum sink 0.5 m/s at 25 m/s by construction
        assert_relative_eq!(
            polar.v_min_sink().get::<meter_per_second>(),
            25.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            polar.min_sink().get::<meter_per_second>(),
            0.5,
            epsilon = 1e-9
        );
        // best LD speed is sqrt(c/a)
        assert_relative_eq!(
            polar.v_best_ld().get::<meter_per_second>(),
            (2.46f64 / 0.003_136).sqrt(),
            epsilon = 1e-9
        );
        // LD at v_bld collapses to 1 / (2 sqrt(a c) + b) = 53
        assert_relative_eq!(polar.best_ld(), 53.0, max_relative = 1e-2);
    }

    #[test]
    fn vopt_rises_with_mc() {
        let mut polar = GlidePolar::default();
        assert_relative_eq!(
            polar.v_opt().get::<meter_per_second>(),
            polar.v_best_ld().get::<meter_per_second>(),
            epsilon = 1e-9
        );

        let mut last = polar.v_opt().get::<meter_per_second>();
        for mc in [0.5, 1.0, 2.0, 4.0] {
            polar.set_mc(ms(mc));
            let v = polar.v_opt().get::<meter_per_second>();
            assert!(v > last, "v_opt must increase with MC ({mc}: {v} <= {last})");
            last = v;
        }
    }

    #[test]
    fn vopt_matches_closed_form() {
        // for a parabola the MacCready condition collapses to
        // V_opt = sqrt((c + mc) / a)
        let mut polar = GlidePolar::default();
        polar.set_mc(ms(1.0));
        assert_relative_eq!(
            polar.v_opt().get::<meter_per_second>(),
            ((2.46f64 + 1.0) / 0.003_136).sqrt(),
            max_relative = 1e-3
        );
    }

    #[test]
    fn bugs_degrade_sink() {
        let mut polar = GlidePolar::default();
        let clean = polar.sink_rate(ms(30.0)).get::<meter_per_second>();
        polar.set_bugs(0.8);
        let dirty = polar.sink_rate(ms(30.0)).get::<meter_per_second>();
        assert!(dirty > clean);
    }

    #[test]
    fn ballast_shifts_best_ld_speed_up() {
        let mut polar = GlidePolar::default();
        let dry = polar.v_best_ld().get::<meter_per_second>();
        polar.set_ballast(1.0);
        let wet = polar.v_best_ld().get::<meter_per_second>();
        assert!(wet > dry);
    }

    #[test]
    fn negative_mc_clamped() {
        let mut polar = GlidePolar::default();
        polar.set_mc(ms(-2.0));
        assert_eq!(polar.mc().get::<meter_per_second>(), 0.0);
    }
}
