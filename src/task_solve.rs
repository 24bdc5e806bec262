//! Whole-task glide solving: chains the single-leg MacCready solver over
//! the remaining (or travelled) turnpoints, and the searches built on top
//! of it -- best MacCready, achieved cruise efficiency, and the AAT
//! minimum-time target range.

use crate::aircraft::AircraftState;
use crate::glide::{GlideResult, GlideState, MacCready};
use crate::polar::GlidePolar;
use crate::projection::TaskProjection;
use crate::task_point::TaskPoint;
use crate::zero::ZeroFinder;
use uom::si::f64::Length;
use uom::si::length::meter;
use uom::si::velocity::meter_per_second;

/// Whole-task and active-leg solutions from one traversal.
#[derive(Debug, Clone, Default)]
pub(crate) struct TaskGlideSolutions {
    pub(crate) total: GlideResult,
    pub(crate) leg: GlideResult,
}

/// Solves every leg from the aircraft through the remaining turnpoints.
///
/// Each leg starts where the previous one arrived, at the altitude the
/// previous solution predicts, so a deficit early in the task propagates
/// into every later leg.
pub(crate) fn glide_solution_remaining(
    points: &[TaskPoint],
    active: usize,
    aircraft: &AircraftState,
    polar: &GlidePolar,
    safety_height_m: f64,
) -> TaskGlideSolutions {
    let solver = MacCready::new(polar);
    let mut virtual_state = *aircraft;
    let mut total: Option<GlideResult> = None;
    let mut leg = GlideResult::default();
    let mut min_margin = f64::INFINITY;

    for (i, point) in points.iter().enumerate().skip(active) {
        let target = *point.location_remaining();
        let min_height = point.elevation_m() + safety_height_m;
        let task = GlideState::from_geo(&virtual_state.location, &target, min_height);
        let result = solver.solve(&virtual_state, &task);

        if i == active {
            leg = result;
        }
        // the next leg starts where this one arrived, at the height this
        // one predicts
        let arrival =
            virtual_state.altitude.get::<meter>() - result.height_glide + result.height_climb;
        virtual_state.altitude = Length::new::<meter>(arrival);
        virtual_state.location = target;
        min_margin = min_margin.min(result.altitude_difference);

        match &mut total {
            None => total = Some(result),
            Some(total) => {
                total.add(&result);
                // the task total carries the worst leg status
                total.solution = total.solution.max(result.solution);
            }
        }
    }

    let mut total = total.unwrap_or_default();
    if min_margin.is_finite() {
        // with legs chained forward, each margin already accounts for the
        // height spent earlier; the task margin is the worst of them
        total.altitude_difference = min_margin;
    }
    TaskGlideSolutions { total, leg }
}

/// Models the already-flown portion: start exit, through each achieved
/// turnpoint, to the current aircraft position.
///
/// Returns a default (unsolved) result until the start has been exited.
pub(crate) fn glide_solution_travelled(
    points: &[TaskPoint],
    active: usize,
    aircraft: &AircraftState,
    polar: &GlidePolar,
) -> GlideResult {
    let Some(start_state) = points.first().and_then(|p| p.exited_state()) else {
        return GlideResult::default();
    };

    let solver = MacCready::new(polar);
    let mut virtual_state = *start_state;
    let mut total: Option<GlideResult> = None;

    let mut solve_to = |virtual_state: &mut AircraftState, target: &crate::geo::GeoPoint| {
        let task = GlideState::from_geo(&virtual_state.location, target, 0.0);
        let result = solver.solve(virtual_state, &task);
        virtual_state.location = *target;
        match &mut total {
            None => total = Some(result),
            Some(total) => {
                total.add(&result);
                total.solution = total.solution.max(result.solution);
            }
        }
    };

    for point in points.iter().take(active).skip(1) {
        if let Some(entered) = point.entered_state() {
            let target = entered.location;
            solve_to(&mut virtual_state, &target);
        }
    }
    solve_to(&mut virtual_state, &aircraft.location);

    total.unwrap_or_default()
}

/// Height margin of the remaining task flown as one pure glide at the
/// polar's current speed to fly, feasibility ignored.
///
/// Negative when the task cannot be closed without climbing.
fn glide_sink_margin(
    points: &[TaskPoint],
    active: usize,
    aircraft: &AircraftState,
    polar: &GlidePolar,
    safety_height_m: f64,
) -> f64 {
    let solver = MacCready::new(polar);
    let mut virtual_state = *aircraft;
    let mut margin = f64::INFINITY;

    for point in points.iter().skip(active) {
        let target = *point.location_remaining();
        let min_height = point.elevation_m() + safety_height_m;
        let task = GlideState::from_geo(&virtual_state.location, &target, min_height);
        let result = solver.solve_sink(&virtual_state, &task);

        let arrival = virtual_state.altitude.get::<meter>() - result.height_glide;
        virtual_state.altitude = Length::new::<meter>(arrival);
        virtual_state.location = target;
        margin = margin.min(result.altitude_difference);
    }

    if margin.is_finite() {
        margin
    } else {
        0.0
    }
}

/// The MacCready setting at which the remaining task closes with zero
/// height margin.
///
/// Each probed setting is evaluated as a pure glide at its speed to fly;
/// modeled climbs would balance any height budget and hide the zero. The
/// margin is monotonic in MC (faster implies more sink), so a bracketed
/// zero search over a generous range suffices. Unreachable tasks collapse
/// to the low end of the range.
pub(crate) fn calc_mc_best(
    points: &[TaskPoint],
    active: usize,
    aircraft: &AircraftState,
    polar: &GlidePolar,
    safety_height_m: f64,
) -> f64 {
    if active >= points.len() {
        return 0.0;
    }
    let zf = ZeroFinder::new(0.01, 10.0, 0.01);
    zf.find_zero(|mc| {
        let mut probe = polar.clone();
        probe.set_mc(uom::si::f64::Velocity::new::<meter_per_second>(mc));
        glide_sink_margin(points, active, aircraft, &probe, safety_height_m)
    })
}

/// The cruise efficiency that reconciles the modeled time for the travelled
/// portion with the actually elapsed time.
///
/// Below 1 the glider is doing worse than the polar predicts, above 1
/// better. Defaults to 1 until the task has started.
pub(crate) fn calc_cruise_efficiency(
    points: &[TaskPoint],
    active: usize,
    aircraft: &AircraftState,
    polar: &GlidePolar,
) -> f64 {
    let Some(start_state) = points.first().and_then(|p| p.exited_state()) else {
        return 1.0;
    };
    let elapsed = aircraft.time_s() - start_state.time_s();
    if elapsed <= 0.0 {
        return 1.0;
    }

    let zf = ZeroFinder::new(0.1, 2.0, 0.01);
    let efficiency = zf.find_zero(|ce| {
        let mut probe = polar.clone();
        probe.set_cruise_efficiency(ce);
        let modeled = glide_solution_travelled(points, active, aircraft, &probe);
        if !modeled.solution.ok_or_partial() {
            return 0.0;
        }
        modeled.time_elapsed - elapsed
    });
    efficiency.clamp(0.1, 2.0)
}

/// Moves every AAT target so the remaining task takes as close as possible
/// to the remaining minimum time.
///
/// All targets share one range parameter; returns the chosen parameter and
/// leaves the targets set to it.
pub(crate) fn calc_min_target(
    points: &mut [TaskPoint],
    active: usize,
    aircraft: &AircraftState,
    polar: &GlidePolar,
    projection: &TaskProjection,
    safety_height_m: f64,
    aat_min_time_s: f64,
) -> f64 {
    if active >= points.len() || aat_min_time_s <= 0.0 {
        return 0.5;
    }
    let elapsed = points
        .first()
        .and_then(|p| p.exited_state())
        .map_or(0.0, |start| (aircraft.time_s() - start.time_s()).max(0.0));
    let time_to_fill = (aat_min_time_s - elapsed).max(0.0);

    let zf = ZeroFinder::new(0.0, 1.0, 0.01);
    let range = zf.find_zero(|p| {
        set_aat_ranges(points, active, p, projection);
        let solved = glide_solution_remaining(points, active, aircraft, polar, safety_height_m);
        solved.total.time_elapsed - time_to_fill
    });
    set_aat_ranges(points, active, range, projection);
    range
}

fn set_aat_ranges(points: &mut [TaskPoint], active: usize, range: f64, projection: &TaskProjection) {
    // only targets still ahead of the aircraft may move
    for point in points.iter_mut().skip(active) {
        point.set_target_range(range, projection);
    }
}
