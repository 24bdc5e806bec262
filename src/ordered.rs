use crate::advance::TaskAdvance;
use crate::aircraft::AircraftState;
use crate::error::TaskError;
use crate::events::TaskEvents;
use crate::geo::GeoPoint;
use crate::polar::GlidePolar;
use crate::projection::{SearchPoint, TaskProjection};
use crate::stats::TaskStats;
use crate::task_point::TaskPoint;
use crate::task_solve;
use uom::si::f64::{Length, Time};
use uom::si::{length::meter, time::second};

/// Task-wide tuning supplied by the caller.
#[derive(Debug, Clone)]
pub struct TaskBehaviour {
    /// Minimum task time for AAT tasks; zero disables AAT timing.
    pub aat_min_time: Time,
    /// Safety margin added to every arrival height.
    pub safety_height_arrival: Length,
    /// Whether idle updates may move AAT targets to meet the minimum time.
    pub optimise_targets_range: bool,
}

impl Default for TaskBehaviour {
    fn default() -> Self {
        Self {
            aat_min_time: Time::new::<second>(0.),
            safety_height_arrival: Length::new::<meter>(0.),
            optimise_targets_range: true,
        }
    }
}

/// An ordered sequence of turnpoints from start to finish, with one active
/// point, plus everything derived from it per aircraft update.
///
/// Mutating the ordering re-derives the projection and every zone's
/// orientation immediately, so the task is always ready to solve. Structural
/// validity (non-empty, starts with a start, ends with a finish) is checked
/// by [`check`](Self::check) and reported in the stats, but an invalid task
/// still accepts updates; it just cannot be started.
#[derive(Debug)]
pub struct OrderedTask {
    points: Vec<TaskPoint>,
    active: usize,
    projection: TaskProjection,
    behaviour: TaskBehaviour,
    advance: TaskAdvance,
    stats: TaskStats,
}

impl OrderedTask {
    #[must_use]
    pub fn new(behaviour: TaskBehaviour) -> Self {
        let mut stats = TaskStats::default();
        stats.reset();
        Self {
            points: Vec::new(),
            active: 0,
            projection: TaskProjection::new(),
            behaviour,
            advance: TaskAdvance::default(),
            stats,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn point(&self, index: usize) -> Option<&TaskPoint> {
        self.points.get(index)
    }

    #[must_use]
    pub fn points(&self) -> &[TaskPoint] {
        &self.points
    }

    #[must_use]
    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn set_active(&mut self, index: usize) {
        if !self.points.is_empty() {
            self.active = index.min(self.points.len() - 1);
        }
    }

    #[must_use]
    pub fn active_point(&self) -> Option<&TaskPoint> {
        self.points.get(self.active)
    }

    #[must_use]
    pub fn behaviour(&self) -> &TaskBehaviour {
        &self.behaviour
    }

    pub fn set_behaviour(&mut self, behaviour: TaskBehaviour) {
        self.behaviour = behaviour;
    }

    #[must_use]
    pub fn advance(&self) -> &TaskAdvance {
        &self.advance
    }

    pub fn advance_mut(&mut self) -> &mut TaskAdvance {
        &mut self.advance
    }

    #[must_use]
    pub fn stats(&self) -> &TaskStats {
        &self.stats
    }

    #[must_use]
    pub fn projection(&self) -> &TaskProjection {
        &self.projection
    }

    /// Adds a point at the end of the task.
    pub fn append(&mut self, point: TaskPoint) {
        self.points.push(point);
        self.update_geometry();
    }

    /// Inserts a point before `position`; the active index shifts with the
    /// point it referred to.
    pub fn insert(&mut self, point: TaskPoint, position: usize) {
        if position >= self.points.len() {
            self.append(point);
            return;
        }
        if self.active >= position && !self.points.is_empty() {
            self.active += 1;
        }
        self.points.insert(position, point);
        self.update_geometry();
    }

    /// Removes the point at `position`. Returns whether anything changed.
    pub fn remove(&mut self, position: usize) -> bool {
        if position >= self.points.len() {
            return false;
        }
        if self.active > position {
            self.active -= 1;
        }
        self.points.remove(position);
        if !self.points.is_empty() {
            self.active = self.active.min(self.points.len() - 1);
        } else {
            self.active = 0;
        }
        self.update_geometry();
        true
    }

    /// Swaps the point at `position` for a new one.
    pub fn replace(&mut self, point: TaskPoint, position: usize) -> bool {
        if position >= self.points.len() {
            return false;
        }
        self.points[position] = point;
        self.update_geometry();
        true
    }

    /// Forgets all progress: transitions, stats, and the active point.
    pub fn reset(&mut self) {
        for point in &mut self.points {
            point.reset();
        }
        self.active = 0;
        self.stats.reset();
    }

    /// Structural validation without event reporting.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.points.is_empty() {
            return Err(TaskError::EmptyTask);
        }
        if !self.points[0].is_start() {
            return Err(TaskError::MissingStart);
        }
        if self.points.len() < 2 || !self.points[self.points.len() - 1].is_finish() {
            return Err(TaskError::MissingFinish);
        }
        Ok(())
    }

    /// Structural validation, reporting any failure through `events`.
    pub fn check(&self, events: &mut impl TaskEvents) -> Result<(), TaskError> {
        if let Err(error) = self.validate() {
            events.construction_error(&error);
            return Err(error);
        }
        Ok(())
    }

    #[must_use]
    pub fn task_started(&self) -> bool {
        self.points.first().is_some_and(TaskPoint::has_exited)
    }

    #[must_use]
    pub fn task_finished(&self) -> bool {
        self.points
            .last()
            .is_some_and(|p| p.is_finish() && p.has_entered())
    }

    /// Rebuilds the projection from the current turnpoints and re-orients
    /// every observation zone. Called by every structural mutation.
    fn update_geometry(&mut self) {
        let Some(first) = self.points.first() else {
            return;
        };
        self.projection.reset(first.location());
        for point in &self.points[1..] {
            self.projection.scan_location(point.location());
        }
        self.projection.update_fast();

        let locations: Vec<GeoPoint> = self.points.iter().map(|p| *p.location()).collect();
        for (i, point) in self.points.iter_mut().enumerate() {
            let prev = if i > 0 { locations.get(i - 1) } else { None };
            let next = locations.get(i + 1);
            point.update_oz(prev, next);
            point.project(&self.projection);
        }
    }

    /// Per-fix update: transition detection, auto advance, and the full
    /// stats refresh. Returns whether anything that warrants a recompute of
    /// dependent state happened.
    pub fn update(
        &mut self,
        state: &AircraftState,
        state_last: &AircraftState,
        polar: &GlidePolar,
        events: &mut impl TaskEvents,
    ) -> bool {
        if self.points.is_empty() {
            self.stats.reset();
            self.stats.task_valid = false;
            return false;
        }
        let full_update = self.check_transitions(state, state_last, events);
        self.update_stats(state, polar);
        full_update
    }

    /// Slow-path update between fixes: AAT target optimisation.
    pub fn update_idle(&mut self, state: &AircraftState, polar: &GlidePolar) -> bool {
        let aat_min_time = self.behaviour.aat_min_time.get::<second>();
        if !self.behaviour.optimise_targets_range
            || aat_min_time <= 0.0
            || self.active == 0
            || !self.task_started()
            || self.stats.distance_max <= self.stats.distance_min
        {
            return false;
        }
        let safety = self.behaviour.safety_height_arrival.get::<meter>();
        task_solve::calc_min_target(
            &mut self.points,
            self.active,
            state,
            polar,
            &self.projection,
            safety,
            aat_min_time,
        );
        true
    }

    /// Checks the active point and its direct neighbours for zone
    /// transitions, firing events and advancing the active point as the
    /// advance policy allows.
    ///
    /// The window is deliberately narrow: zones further away cannot be
    /// legitimately crossed next, and skipping them keeps a fix update
    /// cheap regardless of task length.
    fn check_transitions(
        &mut self,
        state: &AircraftState,
        state_last: &AircraftState,
        events: &mut impl TaskEvents,
    ) -> bool {
        let n = self.points.len();
        let now = SearchPoint::new(state.location, &self.projection);
        let last = SearchPoint::new(state_last.location, &self.projection);

        let t_min = self.active.saturating_sub(1);
        let t_max = (self.active + 1).min(n - 1);
        let mut full_update = false;

        for i in t_min..=t_max {
            if self.points[i].transition_enter(state, &now, &last) {
                tracing::debug!(index = i, "observation zone entered");
                events.transition_enter(i);
                full_update = true;
                if i == n - 1 && self.points[i].is_finish() {
                    events.task_finish();
                }
            }
            if self.points[i].transition_exit(state, &now, &last) {
                tracing::debug!(index = i, "observation zone exited");
                events.transition_exit(i);
                full_update = true;
                if i == 0 {
                    // task time runs from the start exit fix
                    self.stats.total.time_started = Some(state.time_s());
                    events.task_start();
                }
            }

            if i == self.active {
                let mut request_arm = false;
                if self
                    .advance
                    .ready_to_advance(&self.points[i], &now, &mut request_arm)
                {
                    if i + 1 < n {
                        self.active = i + 1;
                        tracing::debug!(active = self.active, "advanced to next turnpoint");
                        events.active_advanced(self.active);
                        full_update = true;
                    }
                } else if request_arm {
                    events.request_arm(i);
                }
            }
        }

        full_update
    }

    fn update_stats(&mut self, state: &AircraftState, polar: &GlidePolar) {
        self.stats.task_valid = self.validate().is_ok();
        let safety = self.behaviour.safety_height_arrival.get::<meter>();
        let now = state.time_s();

        let remaining =
            task_solve::glide_solution_remaining(&self.points, self.active, state, polar, safety);
        self.stats.total.solution_remaining = remaining.total;
        self.stats.current_leg.solution_remaining = remaining.leg;
        self.stats.total.remaining.set_distance(remaining.total.distance);
        self.stats.current_leg.remaining.set_distance(remaining.leg.distance);
        self.stats.total.gradient = self.calc_gradient(state);

        let travelled =
            task_solve::glide_solution_travelled(&self.points, self.active, state, polar);
        self.stats.total.solution_travelled = travelled;
        self.stats.total.travelled.set_distance(travelled.distance);

        let mut planned = travelled;
        planned.add(&remaining.total);
        planned.solution = planned.solution.max(remaining.total.solution);
        self.stats.total.solution_planned = planned;
        self.stats.total.planned.set_distance(planned.distance);

        // task time runs from the start exit, leg time from the previous
        // achieved turnpoint
        self.stats.total.time_started = self
            .points
            .first()
            .and_then(|p| p.exited_state())
            .map(AircraftState::time_s);
        self.stats.current_leg.time_started = if self.active > 0 {
            self.points[self.active - 1]
                .exited_state()
                .or_else(|| self.points[self.active - 1].entered_state())
                .map(AircraftState::time_s)
        } else {
            None
        };
        self.stats.total.set_times(now);
        self.stats.current_leg.set_times(now);

        // effective remaining distance interpolates the plan linearly in
        // time, for speed-made-good style displays
        let planned_time = self.stats.total.time_planned;
        if planned_time > 0.0 {
            let fraction = self.stats.total.time_remaining / planned_time;
            self.stats
                .total
                .remaining_effective
                .set_distance(self.stats.total.planned.distance * fraction);
        }

        self.stats.total.travelled.calc_speed(self.stats.total.time_elapsed);
        self.stats.total.remaining.calc_speed(self.stats.total.time_remaining);
        self.stats.total.planned.calc_speed(self.stats.total.time_planned);
        self.stats.current_leg.remaining.calc_speed(self.stats.current_leg.time_remaining);

        self.stats.distance_nominal = self.distance_chain(None);
        self.stats.distance_min = self.distance_chain(Some(0.0));
        self.stats.distance_max = self.distance_chain(Some(1.0));
        self.stats.distance_scored = self.scan_distance_scored();

        self.stats.mc_best =
            task_solve::calc_mc_best(&self.points, self.active, state, polar, safety);
        self.stats.cruise_efficiency = if self.active > 0 {
            task_solve::calc_cruise_efficiency(&self.points, self.active, state, polar)
        } else {
            1.0
        };
    }

    /// Turnpoint-to-turnpoint distance; with a range parameter, AAT targets
    /// are evaluated at that range instead of where they currently sit.
    fn distance_chain(&self, range: Option<f64>) -> f64 {
        let locations: Vec<GeoPoint> = self
            .points
            .iter()
            .map(|p| match range {
                Some(range) => p.location_with_range(range, &self.projection),
                None => *p.location(),
            })
            .collect();
        locations
            .windows(2)
            .map(|pair| pair[0].distance_m(&pair[1]))
            .sum()
    }

    /// Distance scored so far: along the recorded transition fixes, less
    /// the start zone's score adjustment (and the finish's, once reached).
    fn scan_distance_scored(&self) -> f64 {
        let Some(start_exit) = self.points.first().and_then(|p| p.exited_state()) else {
            return 0.0;
        };
        let mut sum = 0.0;
        let mut last = start_exit.location;
        for point in &self.points[1..] {
            let Some(entered) = point.entered_state() else {
                break;
            };
            sum += last.distance_m(&entered.location);
            last = entered.location;
        }
        sum -= self.points[0].observation_zone().score_adjustment_m();
        if self.task_finished() {
            if let Some(finish) = self.points.last() {
                sum -= finish.observation_zone().score_adjustment_m();
            }
        }
        sum.max(0.0)
    }

    /// The steepest glide gradient demanded by any remaining turnpoint:
    /// height above its elevation per meter of distance to it.
    fn calc_gradient(&self, state: &AircraftState) -> f64 {
        let mut d_acc = 0.0;
        let mut here = state.location;
        let mut g_best: Option<f64> = None;
        for point in &self.points[self.active..] {
            let target = *point.location_remaining();
            d_acc += here.distance_m(&target);
            here = target;
            if d_acc <= 0.0 {
                continue;
            }
            let g_this = (state.altitude_m() - point.elevation_m()) / d_acc;
            g_best = Some(match g_best {
                None => g_this,
                Some(best) => best.min(g_this),
            });
        }
        g_best.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{OrderedTask, TaskBehaviour};
    use crate::aircraft::AircraftState;
    use crate::error::TaskError;
    use crate::events::TaskEvents;
    use crate::geo::GeoPoint;
    use crate::oz::ObservationZone;
    use crate::polar::GlidePolar;
    use crate::task_point::TaskPoint;
    use uom::si::f64::{Length, Time, Velocity};
    use uom::si::{length::meter, time::second, velocity::meter_per_second};

    fn m(meters: f64) -> Length {
        Length::new::<meter>(meters)
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl TaskEvents for Recorder {
        fn transition_enter(&mut self, index: usize) {
            self.events.push(format!("enter {index}"));
        }
        fn transition_exit(&mut self, index: usize) {
            self.events.push(format!("exit {index}"));
        }
        fn active_advanced(&mut self, index: usize) {
            self.events.push(format!("advance {index}"));
        }
        fn request_arm(&mut self, index: usize) {
            self.events.push(format!("arm? {index}"));
        }
        fn task_start(&mut self) {
            self.events.push("start".into());
        }
        fn task_finish(&mut self) {
            self.events.push("finish".into());
        }
        fn construction_error(&mut self, error: &TaskError) {
            self.events.push(format!("invalid: {error}"));
        }
    }

    fn simple_task() -> OrderedTask {
        let mut task = OrderedTask::new(TaskBehaviour::default());
        task.append(TaskPoint::start(
            GeoPoint::from_degrees(47.0, 9.0).unwrap(),
            m(400.),
            ObservationZone::cylinder(m(1000.)).unwrap(),
        ));
        task.append(TaskPoint::intermediate(
            GeoPoint::from_degrees(47.3, 9.0).unwrap(),
            m(400.),
            ObservationZone::cylinder(m(5000.)).unwrap(),
        ));
        task.append(TaskPoint::finish(
            GeoPoint::from_degrees(47.6, 9.0).unwrap(),
            m(400.),
            ObservationZone::cylinder(m(1000.)).unwrap(),
        ));
        task
    }

    fn fix(lat: f64, time: f64) -> AircraftState {
        AircraftState {
            location: GeoPoint::from_degrees(lat, 9.0).unwrap(),
            altitude: m(3000.),
            ground_speed: Velocity::new::<meter_per_second>(40.),
            time: Time::new::<second>(time),
            ..AircraftState::default()
        }
    }

    #[test]
    fn validation_rules() {
        let mut events = Recorder::default();
        let mut task = OrderedTask::new(TaskBehaviour::default());
        assert!(matches!(task.check(&mut events), Err(TaskError::EmptyTask)));

        task.append(TaskPoint::intermediate(
            GeoPoint::from_degrees(47., 9.).unwrap(),
            m(400.),
            ObservationZone::cylinder(m(1000.)).unwrap(),
        ));
        assert!(matches!(
            task.check(&mut events),
            Err(TaskError::MissingStart)
        ));

        let task = simple_task();
        assert!(task.check(&mut events).is_ok());
        assert_eq!(events.events.len(), 2);
    }

    #[test]
    fn mutations_track_active_index() {
        let mut task = simple_task();
        task.set_active(2);

        // inserting before the active point shifts it
        task.insert(
            TaskPoint::intermediate(
                GeoPoint::from_degrees(47.15, 9.0).unwrap(),
                m(400.),
                ObservationZone::cylinder(m(5000.)).unwrap(),
            ),
            1,
        );
        assert_eq!(task.active_index(), 3);

        // removing before it shifts it back
        assert!(task.remove(1));
        assert_eq!(task.active_index(), 2);

        // removing past the end does nothing
        assert!(!task.remove(10));

        // removing the tail clamps the active index
        assert!(task.remove(2));
        assert_eq!(task.active_index(), 1);
    }

    #[test]
    fn geometry_follows_mutation() {
        let mut task = simple_task();
        let nominal = task.len();
        assert_eq!(nominal, 3);

        // the middle zone is symmetric around the north-south course, so
        // a point due east at 3 km is inside the cylinder
        let middle = *task.point(1).unwrap().location();
        let probe = crate::projection::SearchPoint::new(
            middle.offset_m(90.0_f64.to_radians(), 3000.),
            task.projection(),
        );
        assert!(task.point(1).unwrap().is_in_sector(&probe));
    }

    #[test]
    fn full_flight_through_simple_task() {
        let mut task = simple_task();
        let polar = {
            let mut p = GlidePolar::default();
            p.set_mc(Velocity::new::<meter_per_second>(1.0));
            p
        };
        let mut events = Recorder::default();

        // fly due north through all three zones at 40 m/s; fixes every 30 s
        // move about 1.2 km, a hundredth of a degree
        let mut time = 0.0;
        let mut lat = 46.98;
        let mut last = fix(lat, time);
        while lat < 47.60 {
            lat += 0.0108;
            time += 30.0;
            let now = fix(lat, time);
            task.update(&now, &last, &polar, &mut events);
            last = now;
        }

        assert!(task.task_started());
        assert!(task.task_finished());

        let expected = [
            "enter 0",
            "exit 0",
            "start",
            "advance 1",
            "enter 1",
            "advance 2",
            "exit 1",
            "enter 2",
            "finish",
        ];
        // every expected event happened, in order (interleaved stats
        // updates may add nothing else to the log)
        let mut it = events.events.iter();
        for want in expected {
            assert!(
                it.any(|e| e == want),
                "missing event {want:?} in {:?}",
                events.events
            );
        }

        // elapsed time covers start exit to the last fix
        let stats = task.stats();
        assert!(stats.task_valid);
        assert!(stats.total.time_elapsed().get::<second>() > 0.0);
        // the travelled distance roughly matches the ~67 km flown
        let travelled = stats.total.travelled().distance().get::<meter>();
        assert!(
            (60_000.0..75_000.0).contains(&travelled),
            "travelled {travelled}"
        );
        // nothing left to fly
        assert!(stats.total.remaining().distance().get::<meter>() < 3000.0);
    }

    #[test]
    fn transition_order_start_before_advance() {
        // the exit event of the start must precede the advance event
        let mut task = simple_task();
        let polar = GlidePolar::default();
        let mut events = Recorder::default();

        let outside = fix(46.98, 0.);
        let inside = fix(47.0, 30.);
        let beyond = fix(47.02, 60.);
        task.update(&inside, &outside, &polar, &mut events);
        task.update(&beyond, &inside, &polar, &mut events);

        let log = &events.events;
        let exit = log.iter().position(|e| e == "exit 0").unwrap();
        let advance = log.iter().position(|e| e == "advance 1").unwrap();
        let start = log.iter().position(|e| e == "start").unwrap();
        assert!(exit < start);
        assert!(start < advance);
    }

    #[test]
    fn reset_restores_pristine_state() {
        let mut task = simple_task();
        let polar = GlidePolar::default();
        let mut events = Recorder::default();
        task.update(&fix(47.0, 30.), &fix(46.98, 0.), &polar, &mut events);
        task.update(&fix(47.02, 60.), &fix(47.0, 30.), &polar, &mut events);
        assert!(task.task_started());

        task.reset();
        assert!(!task.task_started());
        assert_eq!(task.active_index(), 0);
        assert_eq!(task.stats().distance_scored().get::<meter>(), 0.);
    }

    #[test]
    fn nominal_distance_of_simple_task() {
        let mut task = simple_task();
        let polar = GlidePolar::default();
        let mut events = Recorder::default();
        task.update(&fix(46.98, 0.), &fix(46.98, 0.), &polar, &mut events);
        let nominal = task.stats().distance_nominal().get::<meter>();
        // two legs of 0.3 degrees of latitude each
        assert!((nominal - 66_717.0).abs() < 100.0, "nominal {nominal}");
    }

    #[test]
    fn invalid_task_reports_through_stats() {
        let mut task = OrderedTask::new(TaskBehaviour::default());
        task.append(TaskPoint::start(
            GeoPoint::from_degrees(47.0, 9.0).unwrap(),
            m(400.),
            ObservationZone::cylinder(m(1000.)).unwrap(),
        ));
        let polar = GlidePolar::default();
        let mut events = Recorder::default();
        task.update(&fix(47.0, 0.), &fix(47.0, 0.), &polar, &mut events);
        assert!(!task.stats().task_valid);
    }
}
