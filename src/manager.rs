use crate::aircraft::AircraftState;
use crate::error::TaskError;
use crate::events::TaskEvents;
use crate::geo::GeoPoint;
use crate::glide::{GlideResult, GlideState, MacCready};
use crate::ordered::{OrderedTask, TaskBehaviour};
use crate::polar::GlidePolar;
use crate::stats::{CommonStats, TaskStats};
use std::sync::{Arc, Mutex, PoisonError};
use uom::si::f64::{Length, Velocity};
use uom::si::{length::meter, time::second, velocity::meter_per_second};

/// Backward time steps shorter than this are treated as jitter from the
/// positioning source, not a rewound time base.
const TIME_REVERSAL_TOLERANCE_S: f64 = 5.0;

/// Which task drives navigation right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskMode {
    /// No task selected.
    #[default]
    Null,
    /// The ordered (competition) task.
    Ordered,
    /// Direct-to navigation to a single point.
    Goto,
    /// Abort: glide to the best reachable alternate.
    Abort,
}

/// Direct-to navigation to one destination.
#[derive(Debug, Clone)]
pub struct GotoTask {
    destination: GeoPoint,
    elevation: f64,
    stats: TaskStats,
}

impl GotoTask {
    #[must_use]
    pub fn new(destination: GeoPoint, elevation: Length) -> Self {
        let mut stats = TaskStats::default();
        stats.reset();
        Self {
            destination,
            elevation: elevation.get::<meter>(),
            stats,
        }
    }

    #[must_use]
    pub fn destination(&self) -> &GeoPoint {
        &self.destination
    }

    fn update(&mut self, state: &AircraftState, polar: &GlidePolar, safety_height_m: f64) {
        let task = GlideState::from_geo(
            &state.location,
            &self.destination,
            self.elevation + safety_height_m,
        );
        let solution = MacCready::new(polar).solve(state, &task);
        self.stats.task_valid = true;
        self.stats.total.solution_remaining = solution;
        // the leg length, not the solved portion; a partial solution does
        // not shorten what is left to fly
        self.stats.total.remaining.set_distance(task.distance);
        self.stats.total.time_started = None;
        self.stats.total.set_times(state.time_s());
        self.stats
            .total
            .remaining
            .calc_speed(self.stats.total.time_remaining);
        self.stats.current_leg = self.stats.total.clone();
    }
}

/// A landing alternate considered in abort mode.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbortAlternate {
    pub location: GeoPoint,
    pub elevation: Length,
}

/// Abort-mode task: ranks caller-supplied alternates by arrival margin.
///
/// Solves every candidate as a pure glide (MacCready zero); climbing on the
/// way to a field is not a plan.
#[derive(Debug, Default)]
pub struct AbortTask {
    candidates: Vec<(AbortAlternate, GlideResult)>,
    landable_reachable: bool,
}

impl AbortTask {
    /// Replaces the candidate set; typically the nearest landables from
    /// whatever waypoint store the caller keeps.
    pub fn set_candidates(&mut self, candidates: Vec<AbortAlternate>) {
        self.candidates = candidates
            .into_iter()
            .map(|alternate| (alternate, GlideResult::default()))
            .collect();
        self.landable_reachable = false;
    }

    fn update(&mut self, state: &AircraftState, polar: &GlidePolar, safety_height_m: f64) {
        let mut glide_polar = polar.clone();
        glide_polar.set_mc(Velocity::new::<meter_per_second>(0.));
        let solver = MacCready::new(&glide_polar);

        for (alternate, solution) in &mut self.candidates {
            let task = GlideState::from_geo(
                &state.location,
                &alternate.location,
                alternate.elevation.get::<meter>() + safety_height_m,
            );
            *solution = solver.solve(state, &task);
        }
        // best margin first
        self.candidates.sort_by(|a, b| {
            b.1.altitude_difference
                .partial_cmp(&a.1.altitude_difference)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self.landable_reachable = self
            .candidates
            .first()
            .is_some_and(|(_, solution)| solution.is_final_glide());
    }

    /// The alternate with the best arrival margin, if any candidates exist.
    #[must_use]
    pub fn best(&self) -> Option<(&AbortAlternate, &GlideResult)> {
        self.candidates.first().map(|(a, s)| (a, s))
    }

    #[must_use]
    pub fn landable_reachable(&self) -> bool {
        self.landable_reachable
    }
}

/// Owns the ordered task, the alternate task modes, and the glide polar,
/// and routes each aircraft update to whichever is active.
///
/// The ordered task keeps receiving updates even when goto or abort drives
/// navigation, so its transition history and timers survive a temporary
/// diversion.
#[derive(Debug)]
pub struct TaskManager {
    glide_polar: GlidePolar,
    mode: TaskMode,
    ordered: OrderedTask,
    goto_task: Option<GotoTask>,
    abort: AbortTask,
    stats: TaskStats,
    common_stats: CommonStats,
    last_fix_time: Option<f64>,
}

impl TaskManager {
    #[must_use]
    pub fn new(behaviour: TaskBehaviour, glide_polar: GlidePolar) -> Self {
        let mut stats = TaskStats::default();
        stats.reset();
        Self {
            glide_polar,
            mode: TaskMode::Null,
            ordered: OrderedTask::new(behaviour),
            goto_task: None,
            abort: AbortTask::default(),
            stats,
            common_stats: CommonStats::default(),
            last_fix_time: None,
        }
    }

    #[must_use]
    pub fn mode(&self) -> TaskMode {
        self.mode
    }

    #[must_use]
    pub fn glide_polar(&self) -> &GlidePolar {
        &self.glide_polar
    }

    pub fn set_glide_polar(&mut self, glide_polar: GlidePolar) {
        self.glide_polar = glide_polar;
    }

    #[must_use]
    pub fn ordered(&self) -> &OrderedTask {
        &self.ordered
    }

    pub fn ordered_mut(&mut self) -> &mut OrderedTask {
        &mut self.ordered
    }

    pub fn abort_task_mut(&mut self) -> &mut AbortTask {
        &mut self.abort
    }

    #[must_use]
    pub fn abort_task(&self) -> &AbortTask {
        &self.abort
    }

    /// Switches modes. Selecting [`TaskMode::Ordered`] requires a
    /// structurally valid ordered task.
    pub fn set_mode(&mut self, mode: TaskMode) -> Result<(), TaskError> {
        if mode == TaskMode::Ordered {
            self.ordered.validate()?;
        }
        if mode != self.mode {
            tracing::info!(?mode, "task mode changed");
            self.mode = mode;
        }
        Ok(())
    }

    /// Starts direct-to navigation.
    pub fn do_goto(&mut self, destination: GeoPoint, elevation: Length) {
        self.goto_task = Some(GotoTask::new(destination, elevation));
        tracing::info!(%destination, "goto");
        self.mode = TaskMode::Goto;
    }

    /// Drops everything and glides for the best alternate.
    pub fn abort(&mut self) {
        tracing::info!("abort");
        self.mode = TaskMode::Abort;
    }

    /// Returns from goto or abort to the ordered task.
    pub fn resume(&mut self) -> Result<(), TaskError> {
        self.set_mode(TaskMode::Ordered)
    }

    /// Arms the ordered task's advance trigger.
    pub fn set_advance_armed(&mut self, armed: bool) {
        self.ordered.advance_mut().set_armed(armed);
    }

    /// Routes one position fix through the active task.
    ///
    /// A fix substantially older than its predecessor means the time base
    /// was rewound (simulator rewind, logger replay); all progress is reset
    /// rather than scored against a broken clock. Sub-second clock jitter
    /// is tolerated.
    pub fn update(
        &mut self,
        state: &AircraftState,
        state_last: &AircraftState,
        events: &mut impl TaskEvents,
    ) -> bool {
        let now = state.time_s();
        if let Some(last) = self.last_fix_time {
            if now + TIME_REVERSAL_TOLERANCE_S < last {
                tracing::debug!(now, last, "time retreated, resetting task progress");
                self.reset();
            }
        }
        self.last_fix_time = Some(now);

        // the ordered task keeps tracking in the background across modes
        let mut full_update = self
            .ordered
            .update(state, state_last, &self.glide_polar, events);
        let safety = self
            .ordered
            .behaviour()
            .safety_height_arrival
            .get::<meter>();

        match self.mode {
            TaskMode::Ordered => {
                self.stats = self.ordered.stats().clone();
            }
            TaskMode::Goto => {
                if let Some(goto_task) = &mut self.goto_task {
                    goto_task.update(state, &self.glide_polar, safety);
                    self.stats = goto_task.stats.clone();
                    full_update = true;
                }
            }
            TaskMode::Abort => {
                self.abort.update(state, &self.glide_polar, safety);
                full_update = true;
            }
            TaskMode::Null => {}
        }

        self.common_stats.task_started = self.ordered.task_started();
        self.common_stats.task_finished = self.ordered.task_finished();
        self.common_stats.active_index = self.ordered.active_index();
        self.common_stats.landable_reachable = self.abort.landable_reachable();
        let aat_min_time = self.ordered.behaviour().aat_min_time.get::<second>();
        self.common_stats.aat_time_remaining =
            (aat_min_time - self.ordered.stats().total.time_elapsed().get::<second>()).max(0.0);

        full_update
    }

    /// Slow-path update; runs AAT target optimisation when the ordered task
    /// is active.
    pub fn update_idle(&mut self, state: &AircraftState) -> bool {
        match self.mode {
            TaskMode::Ordered => self.ordered.update_idle(state, &self.glide_polar),
            _ => false,
        }
    }

    /// Stats of whichever task is currently driving navigation.
    #[must_use]
    pub fn stats(&self) -> &TaskStats {
        &self.stats
    }

    #[must_use]
    pub fn common_stats(&self) -> &CommonStats {
        &self.common_stats
    }

    pub fn reset(&mut self) {
        self.ordered.reset();
        self.stats.reset();
        self.common_stats.reset();
        self.last_fix_time = None;
    }
}

/// Thread-safe handle to a [`TaskManager`].
///
/// The calculation thread feeds updates in while UI threads take stats
/// snapshots; each call holds the lock only for its own duration, and the
/// snapshot getters return clones so no lock outlives a call.
#[derive(Debug, Clone)]
pub struct SharedTaskManager {
    inner: Arc<Mutex<TaskManager>>,
}

impl SharedTaskManager {
    #[must_use]
    pub fn new(manager: TaskManager) -> Self {
        Self {
            inner: Arc::new(Mutex::new(manager)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TaskManager> {
        // a panicked holder cannot leave the manager in a torn state; every
        // mutation completes before the lock is released
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn update(
        &self,
        state: &AircraftState,
        state_last: &AircraftState,
        events: &mut impl TaskEvents,
    ) -> bool {
        self.lock().update(state, state_last, events)
    }

    pub fn update_idle(&self, state: &AircraftState) -> bool {
        self.lock().update_idle(state)
    }

    #[must_use]
    pub fn stats(&self) -> TaskStats {
        self.lock().stats().clone()
    }

    #[must_use]
    pub fn common_stats(&self) -> CommonStats {
        self.lock().common_stats().clone()
    }

    /// Runs `f` with exclusive access to the manager, for task editing and
    /// mode changes.
    pub fn edit<R>(&self, f: impl FnOnce(&mut TaskManager) -> R) -> R {
        f(&mut self.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::{AbortAlternate, SharedTaskManager, TaskManager, TaskMode};
    use crate::aircraft::AircraftState;
    use crate::error::TaskError;
    use crate::geo::GeoPoint;
    use crate::ordered::TaskBehaviour;
    use crate::oz::ObservationZone;
    use crate::polar::GlidePolar;
    use crate::task_point::TaskPoint;
    use uom::si::f64::{Length, Time};
    use uom::si::{length::meter, time::second};

    fn m(meters: f64) -> Length {
        Length::new::<meter>(meters)
    }

    fn fix(lat: f64, lon: f64, altitude: f64, time: f64) -> AircraftState {
        AircraftState {
            location: GeoPoint::from_degrees(lat, lon).unwrap(),
            altitude: m(altitude),
            time: Time::new::<second>(time),
            ..AircraftState::default()
        }
    }

    fn manager_with_task() -> TaskManager {
        let mut manager = TaskManager::new(TaskBehaviour::default(), GlidePolar::default());
        let ordered = manager.ordered_mut();
        ordered.append(TaskPoint::start(
            GeoPoint::from_degrees(47.0, 9.0).unwrap(),
            m(400.),
            ObservationZone::cylinder(m(1000.)).unwrap(),
        ));
        ordered.append(TaskPoint::finish(
            GeoPoint::from_degrees(47.5, 9.0).unwrap(),
            m(400.),
            ObservationZone::cylinder(m(1000.)).unwrap(),
        ));
        manager
    }

    #[test]
    fn ordered_mode_requires_valid_task() {
        let mut manager = TaskManager::new(TaskBehaviour::default(), GlidePolar::default());
        assert!(matches!(
            manager.set_mode(TaskMode::Ordered),
            Err(TaskError::EmptyTask)
        ));
        assert_eq!(manager.mode(), TaskMode::Null);

        let mut manager = manager_with_task();
        assert!(manager.set_mode(TaskMode::Ordered).is_ok());
        assert_eq!(manager.mode(), TaskMode::Ordered);
    }

    #[test]
    fn goto_produces_direct_solution() {
        let mut manager = manager_with_task();
        manager.do_goto(GeoPoint::from_degrees(47.2, 9.0).unwrap(), m(400.));
        assert_eq!(manager.mode(), TaskMode::Goto);

        let a = fix(47.0, 9.0, 2000., 0.);
        let b = fix(47.0, 9.0, 2000., 30.);
        manager.update(&b, &a, &mut ());

        let remaining = manager.stats().total.remaining().distance().get::<meter>();
        // 0.2 degrees of latitude
        assert!((remaining - 22_239.).abs() < 100., "remaining {remaining}");
    }

    #[test]
    fn goto_remaining_spans_the_whole_leg_when_partial() {
        let mut manager = manager_with_task();
        // 0.5 degrees of latitude, far beyond a 1000 m glide
        manager.do_goto(GeoPoint::from_degrees(47.5, 9.0).unwrap(), m(400.));

        let a = fix(47.0, 9.0, 1000., 0.);
        let b = fix(47.0, 9.0, 1000., 30.);
        manager.update(&b, &a, &mut ());

        let stats = manager.stats();
        assert!(!stats.total.solution_remaining().is_ok());
        let remaining = stats.total.remaining().distance().get::<meter>();
        assert!((remaining - 55_597.).abs() < 200., "remaining {remaining}");
    }

    #[test]
    fn abort_ranks_alternates_by_margin() {
        let mut manager = manager_with_task();
        manager.abort_task_mut().set_candidates(vec![
            AbortAlternate {
                // far: 0.5 degrees north
                location: GeoPoint::from_degrees(47.5, 9.0).unwrap(),
                elevation: m(400.),
            },
            AbortAlternate {
                // near: 5 km north
                location: GeoPoint::from_degrees(47.045, 9.0).unwrap(),
                elevation: m(400.),
            },
        ]);
        manager.abort();

        let a = fix(47.0, 9.0, 1200., 0.);
        let b = fix(47.0, 9.0, 1200., 30.);
        manager.update(&b, &a, &mut ());

        let (best, solution) = manager.abort_task().best().unwrap();
        // only the near field is reachable from 800 m above it
        assert!(best.location.latitude().get::<uom::si::angle::degree>() < 47.1);
        assert!(solution.is_final_glide());
        assert!(manager.common_stats().landable_reachable);
    }

    #[test]
    fn time_reversal_resets_progress() {
        let mut manager = manager_with_task();
        manager.set_mode(TaskMode::Ordered).unwrap();

        // cross the start
        let outside = fix(46.98, 9.0, 2000., 0.);
        let inside = fix(47.0, 9.0, 2000., 30.);
        let beyond = fix(47.02, 9.0, 2000., 60.);
        manager.update(&inside, &outside, &mut ());
        manager.update(&beyond, &inside, &mut ());
        assert!(manager.common_stats().task_started);

        // replay from an earlier time
        let rewound = fix(46.98, 9.0, 2000., 10.);
        manager.update(&rewound, &beyond, &mut ());
        assert!(!manager.common_stats().task_started);
        assert_eq!(manager.common_stats().active_index, 0);
    }

    #[test]
    fn clock_jitter_keeps_progress() {
        let mut manager = manager_with_task();
        manager.set_mode(TaskMode::Ordered).unwrap();

        let outside = fix(46.98, 9.0, 2000., 0.);
        let inside = fix(47.0, 9.0, 2000., 30.);
        let beyond = fix(47.02, 9.0, 2000., 60.);
        manager.update(&inside, &outside, &mut ());
        manager.update(&beyond, &inside, &mut ());
        assert!(manager.common_stats().task_started);

        // a fix half a second in the past is jitter, not a rewind
        let jitter = fix(47.03, 9.0, 2000., 59.5);
        manager.update(&jitter, &beyond, &mut ());
        assert!(manager.common_stats().task_started);
        assert_eq!(manager.common_stats().active_index, 1);
    }

    #[test]
    fn shared_manager_snapshots_across_clones() {
        let shared = SharedTaskManager::new(manager_with_task());
        let reader = shared.clone();

        shared.edit(|m| m.set_mode(TaskMode::Ordered)).unwrap();
        let a = fix(46.98, 9.0, 2000., 0.);
        let b = fix(47.0, 9.0, 2000., 30.);
        shared.update(&b, &a, &mut ());

        let stats = reader.stats();
        assert!(stats.task_valid);
        assert!(stats.total.remaining().distance().get::<meter>() > 0.);
        assert_eq!(reader.common_stats().active_index, 0);
    }
}
