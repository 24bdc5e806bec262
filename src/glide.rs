use crate::aircraft::AircraftState;
use crate::geo::GeoPoint;
use crate::polar::GlidePolar;
use crate::util::{BoundedAngle, Quadratic};
use crate::zero::ZeroFinder;
use uom::si::f64::{Angle, Length, Time, Velocity};
use uom::si::{
    angle::radian, length::meter, time::second, velocity::meter_per_second,
};

/// Outcome classification of a glide solution.
///
/// Ordering is by desirability: [`Ok`](GlideSolution::Ok) is best, and when
/// leg results are composed into a task total the worst leg status wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GlideSolution {
    /// Whole leg solved.
    Ok,
    /// Only part of the leg can be glided with the available height; the
    /// result's distance is the achievable portion.
    Partial,
    /// Climb would be required but the MacCready setting cannot out-climb
    /// the situation (or is zero).
    MacCreadyInsufficient,
    /// Wind is stronger than the achievable speed along course.
    WindExcessive,
    /// No solve has been attempted yet.
    NotYetSolved,
}

impl GlideSolution {
    /// Whether the result describes a usable (possibly partial) glide.
    #[must_use]
    pub fn ok_or_partial(&self) -> bool {
        matches!(self, GlideSolution::Ok | GlideSolution::Partial)
    }
}

/// Geometry of a single leg to be solved: how far, which way, and the
/// minimum arrival height.
#[derive(Debug, Clone, Copy)]
pub struct GlideState {
    pub(crate) distance: f64,
    pub(crate) bearing: f64,
    pub(crate) min_height: f64,
}

impl GlideState {
    #[must_use]
    pub fn new(distance: Length, bearing: Angle, min_height: Length) -> Self {
        Self {
            distance: distance.get::<meter>().max(0.0),
            bearing: bearing.get::<radian>(),
            min_height: min_height.get::<meter>(),
        }
    }

    /// Builds the leg from the aircraft (or a reference origin) to a target.
    pub(crate) fn from_geo(origin: &GeoPoint, destination: &GeoPoint, min_height_m: f64) -> Self {
        Self {
            distance: origin.distance_m(destination),
            bearing: origin.bearing_rad(destination),
            min_height: min_height_m,
        }
    }

    pub(crate) fn from_raw(distance_m: f64, bearing_rad: f64, min_height_m: f64) -> Self {
        Self {
            distance: distance_m.max(0.0),
            bearing: bearing_rad,
            min_height: min_height_m,
        }
    }
}

/// Output of a single-leg (or composed whole-task) glide solve.
///
/// Immutable once produced; totals are built by [`GlideResult::add`]
/// composition of leg results, not by mutation.
#[derive(Debug, Clone, Copy)]
pub struct GlideResult {
    /// Solution status; check before using the time/height fields.
    pub solution: GlideSolution,
    pub(crate) distance: f64,
    pub(crate) bearing: f64,
    pub(crate) cruise_track_bearing: f64,
    pub(crate) v_opt: f64,
    pub(crate) height_climb: f64,
    pub(crate) height_glide: f64,
    pub(crate) time_elapsed: f64,
    pub(crate) time_virtual: f64,
    pub(crate) altitude_difference: f64,
    pub(crate) effective_wind_speed: f64,
    pub(crate) effective_wind_angle: f64,
}

impl GlideResult {
    fn new(task: &GlideState, v_opt: f64) -> Self {
        Self {
            solution: GlideSolution::NotYetSolved,
            distance: task.distance,
            bearing: task.bearing,
            cruise_track_bearing: task.bearing,
            v_opt,
            height_climb: 0.0,
            height_glide: 0.0,
            time_elapsed: 0.0,
            time_virtual: 0.0,
            altitude_difference: 0.0,
            effective_wind_speed: 0.0,
            effective_wind_angle: 0.0,
        }
    }

    /// Whole leg (or task) achievable without further climbing or climbing
    /// as modeled.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.solution == GlideSolution::Ok
    }

    /// Achievable, and above the required glide path with no climb needed:
    /// the final-glide condition.
    #[must_use]
    pub fn is_final_glide(&self) -> bool {
        self.is_ok() && self.height_climb <= 0.0 && self.altitude_difference >= 0.0
    }

    /// Leg distance covered by this solution.
    #[must_use]
    pub fn distance(&self) -> Length {
        Length::new::<meter>(self.distance)
    }

    /// Course bearing of the leg.
    #[must_use]
    pub fn bearing(&self) -> Angle {
        Angle::new::<radian>(self.bearing)
    }

    /// Heading to hold so the wind-corrected track follows the course.
    #[must_use]
    pub fn cruise_track_bearing(&self) -> Angle {
        Angle::new::<radian>(BoundedAngle::from_radians(self.cruise_track_bearing).get_bounded())
    }

    /// Airspeed to fly during cruise for this solution.
    #[must_use]
    pub fn v_opt(&self) -> Velocity {
        Velocity::new::<meter_per_second>(self.v_opt)
    }

    /// Height to be gained by climbing, meters.
    #[must_use]
    pub fn height_climb(&self) -> Length {
        Length::new::<meter>(self.height_climb)
    }

    /// Height lost in glide, meters.
    #[must_use]
    pub fn height_glide(&self) -> Length {
        Length::new::<meter>(self.height_glide)
    }

    /// Modeled time to complete the solved portion.
    #[must_use]
    pub fn time_elapsed(&self) -> Time {
        Time::new::<second>(self.time_elapsed)
    }

    /// Signed height margin against the required glide path; positive means
    /// surplus height.
    #[must_use]
    pub fn altitude_difference(&self) -> Length {
        Length::new::<meter>(self.altitude_difference)
    }

    /// Composes another leg's result into this one.
    ///
    /// Times, heights, and distances sum. The altitude margin keeps the
    /// larger surplus if both legs are above glide, otherwise deficits
    /// accumulate -- a task is only as reachable as its worst remaining leg.
    /// The solution status is left untouched; the caller decides which
    /// status the composed result carries.
    pub fn add(&mut self, other: &GlideResult) {
        self.time_elapsed += other.time_elapsed;
        self.time_virtual += other.time_virtual;
        self.height_glide += other.height_glide;
        self.height_climb += other.height_climb;
        self.distance += other.distance;
        if self.altitude_difference > 0.0 && other.altitude_difference > 0.0 {
            self.altitude_difference = self.altitude_difference.max(other.altitude_difference);
        } else {
            self.altitude_difference += other.altitude_difference.min(0.0);
        }
    }

    /// Inverse achieved speed once the height spent gliding is charged back
    /// at the MacCready climb rate; the quantity minimized by the
    /// speed-to-fly search.
    fn calc_vspeed(&mut self, mc: f64) -> f64 {
        if mc > 0.0 && self.height_glide > 0.0 {
            // equivalent time to regain the height that was used
            self.time_virtual = self.height_glide / mc;
        } else {
            self.time_virtual = 0.0;
        }
        if self.distance > 0.0 {
            (self.time_elapsed + self.time_virtual) / self.distance
        } else {
            0.0
        }
    }

    fn calc_cruise_bearing(&mut self) {
        self.cruise_track_bearing = self.bearing;
        if self.effective_wind_speed <= 0.0 || self.v_opt <= 0.0 {
            return;
        }
        let sintheta = self.effective_wind_angle.sin();
        if sintheta == 0.0 {
            return;
        }
        // Wn/sin(alpha) = V/sin(theta); crab into wind, so the correction
        // opposes the crosswind component
        self.cruise_track_bearing -=
            (sintheta * self.effective_wind_speed / self.v_opt).clamp(-1.0, 1.0).asin();
    }
}

impl Default for GlideResult {
    fn default() -> Self {
        Self::new(&GlideState::from_raw(0.0, 0.0, 0.0), 0.0)
    }
}

/// Single-leg MacCready solver.
///
/// Borrows the polar for the duration of one solve; all distances are
/// meters, times seconds, speeds m/s, and the wind is handled through the
/// closed-form ground-speed quadratic rather than a generic root search.
#[derive(Debug, Clone, Copy)]
pub struct MacCready<'a> {
    polar: &'a GlidePolar,
}

impl<'a> MacCready<'a> {
    #[must_use]
    pub fn new(polar: &'a GlidePolar) -> Self {
        Self { polar }
    }

    /// Solves the leg: straight glide if the height allows it, otherwise
    /// climb-cruise for the remainder.
    #[must_use]
    pub fn solve(&self, aircraft: &AircraftState, task: &GlideState) -> GlideResult {
        if task.distance <= 0.0 {
            return self.solve_vertical(aircraft, task);
        }
        if self.polar.mc_ms() <= 0.0 {
            // no climb model: pure glide is all there is
            return self.optimise_glide(aircraft, task);
        }

        // check first whether the whole leg can be final glided
        let result_fg = self.optimise_glide(aircraft, task);
        if result_fg.is_ok() {
            return result_fg;
        }

        // climb-cruise the remainder of the way
        let sub_task = GlideState {
            distance: task.distance - result_fg.distance,
            bearing: task.bearing,
            min_height: task.min_height + result_fg.height_glide,
        };
        let mut result_cc = self.solve_cruise(aircraft, &sub_task);
        result_cc.add(&result_fg);
        if result_cc.solution == GlideSolution::Ok {
            // a leg that still needs climbing has no glide-path surplus;
            // the deficit is the height left to climb
            result_cc.altitude_difference = -result_cc.height_climb;
        }
        result_cc
    }

    /// Pure glide at a fixed airspeed.
    fn solve_glide(&self, aircraft: &AircraftState, task: &GlideState, v_set: f64) -> GlideResult {
        // hot path: called repeatedly by the speed-to-fly search
        let v = v_set * self.polar.cruise_efficiency();
        let w = aircraft.wind_speed_ms();
        let theta = aircraft.wind_bearing_rad() - task.bearing;
        let dh = task.min_height - aircraft.altitude_m();
        let sink = self.polar.sink_rate_ms(v_set);

        let mut result = GlideResult::new(task, v_set);
        result.altitude_difference = -dh;
        result.effective_wind_angle = theta;
        result.effective_wind_speed = w;

        // ground-speed triangle: Vn^2 - 2*Vn*W*cos(theta) + W^2 - V^2 = 0
        let q = Quadratic::new(-2.0 * w * theta.cos(), w * w - v * v);
        if !q.check() {
            result.solution = GlideSolution::WindExcessive;
            result.distance = 0.0;
            return result;
        }
        let vn = q.solution_max();
        if vn <= 0.0 {
            result.solution = GlideSolution::WindExcessive;
            result.distance = 0.0;
            return result;
        }

        if vn * dh + sink * task.distance > 0.0 {
            if dh > 0.0 {
                // insufficient height, and this solver can't climb
                result.distance = 0.0;
                result.solution = GlideSolution::MacCreadyInsufficient;
                return result;
            }
            // glide as far as the height allows
            result.distance = -vn * dh / sink;
            result.solution = GlideSolution::Partial;
        } else {
            result.solution = GlideSolution::Ok;
        }

        let t_cr = result.distance / vn;
        result.time_elapsed = t_cr;
        result.height_glide = t_cr * sink;
        result.altitude_difference = -dh - result.height_glide;
        result.calc_cruise_bearing();

        result
    }

    /// Climb-only solution for a zero-distance leg (height to make up at
    /// the MacCready rate while drifting with the wind).
    fn solve_vertical(&self, aircraft: &AircraftState, task: &GlideState) -> GlideResult {
        let dh = task.min_height - aircraft.altitude_m();
        let w = aircraft.wind_speed_ms();
        let mc = self.polar.mc_ms();

        let mut result = GlideResult::new(task, self.polar.v_opt_ms());
        result.altitude_difference = -dh;
        result.effective_wind_speed = w;
        result.effective_wind_angle = aircraft.wind_bearing_rad() - task.bearing;

        if dh <= 0.0 {
            // immediate trivial solution
            result.solution = GlideSolution::Ok;
            result.altitude_difference = -dh;
            return result;
        }

        let v = self.polar.v_opt_ms() * self.polar.cruise_efficiency();

        // while climbing the glider drifts downwind and has to cruise back:
        //   V*t_cr = W*(t_cl + t_cr)        (distance made good is zero)
        //   t_cl = (dh + t_cr*S)/mc         (height balance)
        let denom1 = v - w;
        if denom1 <= 0.0 {
            result.solution = GlideSolution::WindExcessive;
            return result;
        }
        let denom2 = mc * denom1 - w;
        if denom2 <= 0.0 {
            result.solution = GlideSolution::MacCreadyInsufficient;
            return result;
        }

        let t_cl = dh * denom1 / denom2;
        let t_cr = w * t_cl / denom1;

        result.time_elapsed = t_cr + t_cl;
        result.height_climb = dh;
        result.height_glide = 0.0;
        result.altitude_difference = 0.0;
        result.solution = GlideSolution::Ok;
        result
    }

    /// Climb-cruise solution: alternate thermals at the MacCready rate with
    /// cruise at the speed to fly.
    fn solve_cruise(&self, aircraft: &AircraftState, task: &GlideState) -> GlideResult {
        let w = aircraft.wind_speed_ms();
        let theta = aircraft.wind_bearing_rad() - task.bearing;
        let dh = task.min_height - aircraft.altitude_m();
        let mc = self.polar.mc_ms();
        let v_opt = self.polar.v_opt_ms();

        let mut result = GlideResult::new(task, v_opt);
        result.altitude_difference = -dh;
        result.effective_wind_speed = w;
        result.effective_wind_angle = theta;

        let v = v_opt * self.polar.cruise_efficiency();
        let sink = self.polar.sink_rate_ms(v_opt);

        // fraction of total time spent climbing to pay for cruise sink
        let rho = sink / mc;
        let rho_plus_one = 1.0 + rho;
        let v_on_k = v / rho_plus_one;

        let q = Quadratic::new(-2.0 * w * theta.cos(), w * w - v_on_k * v_on_k);
        if !q.check() {
            result.solution = GlideSolution::WindExcessive;
            result.distance = 0.0;
            return result;
        }
        let vn = q.solution_max();
        if vn <= 0.0 {
            result.solution = GlideSolution::MacCreadyInsufficient;
            result.distance = 0.0;
            return result;
        }

        // an initial climb to make up dh drifts downwind; correct the
        // distance to run for that drift
        let mut t_cl1 = 0.0;
        let mut distance = task.distance;
        if dh > 0.0 {
            t_cl1 = dh / mc;
            let wd = aircraft.wind_bearing_rad();
            let tb = task.bearing;
            let dx = t_cl1 * w * wd.sin() - task.distance * tb.sin();
            let dy = t_cl1 * w * wd.cos() - task.distance * tb.cos();
            distance = (dx * dx + dy * dy).sqrt();
        }

        let t_cr = distance / vn;
        let t_cl = t_cr * rho + if dh > 0.0 { t_cl1 } else { 0.0 };

        result.time_elapsed = t_cr + t_cl;
        result.height_climb = t_cl * mc;
        result.height_glide = t_cr * sink - result.height_climb;
        result.altitude_difference = -dh + result.height_climb - result.height_glide;
        result.effective_wind_speed = w * rho_plus_one;
        result.solution = GlideSolution::Ok;
        result.calc_cruise_bearing();
        result
    }

    /// Finds the best pure-glide solution over airspeed by minimizing the
    /// MacCready virtual speed.
    ///
    /// With no climb model to pay back height, partial glides rank by the
    /// share of the leg they cover instead, so the search settles on the
    /// best-range speed rather than the fastest one.
    fn optimise_glide(&self, aircraft: &AircraftState, task: &GlideState) -> GlideResult {
        let mc = self.polar.mc_ms();
        let zf = ZeroFinder::new(self.polar.v_min_sink_ms().max(1.0), self.polar.v_max_ms(), 0.01);
        let v_best = zf.find_min(|v| {
            let mut r = self.solve_glide(aircraft, task, v);
            if !r.solution.ok_or_partial() || r.distance <= 0.0 {
                // infeasible speeds must not look attractive to the search
                return 1.0e6;
            }
            if r.solution == GlideSolution::Partial && mc <= 0.0 {
                return 1.0 + (task.distance - r.distance) / task.distance;
            }
            r.calc_vspeed(mc)
        });
        let mut result = self.solve_glide(aircraft, task, v_best);
        result.calc_vspeed(mc);
        result
    }

    /// Glide at the polar's optimal speed with the height constraint
    /// ignored; the altitude margin comes out negative when the destination
    /// is out of reach.
    pub(crate) fn solve_sink(&self, aircraft: &AircraftState, task: &GlideState) -> GlideResult {
        let h_offset = 1.0e6;
        let mut virt = *aircraft;
        virt.altitude = Length::new::<meter>(aircraft.altitude_m() + h_offset);
        let mut result = self.solve_glide(&virt, task, self.polar.v_opt_ms());
        result.altitude_difference =
            aircraft.altitude_m() - result.height_glide - task.min_height;
        result
    }
}
