use crate::glide::GlideResult;
use uom::si::f64::{Length, Time, Velocity};
use uom::si::{length::meter, time::second, velocity::meter_per_second};

/// A distance together with the speed achieved (or required) over it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceStat {
    pub(crate) distance: f64,
    pub(crate) speed: f64,
}

impl DistanceStat {
    #[must_use]
    pub fn distance(&self) -> Length {
        Length::new::<meter>(self.distance)
    }

    #[must_use]
    pub fn speed(&self) -> Velocity {
        Velocity::new::<meter_per_second>(self.speed)
    }

    pub(crate) fn set_distance(&mut self, distance_m: f64) {
        self.distance = distance_m.max(0.0);
    }

    pub(crate) fn calc_speed(&mut self, time_s: f64) {
        self.speed = if time_s > 0.0 {
            self.distance / time_s
        } else {
            0.0
        };
    }
}

/// Timing, distances, and glide solutions for one scope of the task: either
/// the whole task or the current leg.
#[derive(Debug, Clone, Default)]
pub struct ElementStat {
    pub(crate) time_started: Option<f64>,
    pub(crate) time_elapsed: f64,
    pub(crate) time_remaining: f64,
    pub(crate) time_planned: f64,
    pub(crate) remaining: DistanceStat,
    pub(crate) remaining_effective: DistanceStat,
    pub(crate) planned: DistanceStat,
    pub(crate) travelled: DistanceStat,
    pub(crate) solution_remaining: GlideResult,
    pub(crate) solution_travelled: GlideResult,
    pub(crate) solution_planned: GlideResult,
    /// Required glide gradient over the remaining distance; 0 when there is
    /// no distance left.
    pub(crate) gradient: f64,
}

impl ElementStat {
    /// Derives the three times from the start timestamp, the current fix
    /// time, and the remaining solution, keeping
    /// `time_planned == time_elapsed + time_remaining`.
    pub(crate) fn set_times(&mut self, now_s: f64) {
        self.time_elapsed = match self.time_started {
            Some(start) => (now_s - start).max(0.0),
            None => 0.0,
        };
        self.time_remaining = self.solution_remaining.time_elapsed;
        self.time_planned = self.time_elapsed + self.time_remaining;
    }

    #[must_use]
    pub fn time_elapsed(&self) -> Time {
        Time::new::<second>(self.time_elapsed)
    }

    #[must_use]
    pub fn time_remaining(&self) -> Time {
        Time::new::<second>(self.time_remaining)
    }

    #[must_use]
    pub fn time_planned(&self) -> Time {
        Time::new::<second>(self.time_planned)
    }

    #[must_use]
    pub fn remaining(&self) -> &DistanceStat {
        &self.remaining
    }

    #[must_use]
    pub fn remaining_effective(&self) -> &DistanceStat {
        &self.remaining_effective
    }

    #[must_use]
    pub fn planned(&self) -> &DistanceStat {
        &self.planned
    }

    #[must_use]
    pub fn travelled(&self) -> &DistanceStat {
        &self.travelled
    }

    #[must_use]
    pub fn solution_remaining(&self) -> &GlideResult {
        &self.solution_remaining
    }

    #[must_use]
    pub fn solution_travelled(&self) -> &GlideResult {
        &self.solution_travelled
    }

    #[must_use]
    pub fn solution_planned(&self) -> &GlideResult {
        &self.solution_planned
    }

    #[must_use]
    pub fn gradient(&self) -> f64 {
        self.gradient
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Everything an ordered task publishes per update.
#[derive(Debug, Clone, Default)]
pub struct TaskStats {
    /// Whole-task scope.
    pub total: ElementStat,
    /// Active-leg scope.
    pub current_leg: ElementStat,
    pub(crate) distance_nominal: f64,
    pub(crate) distance_min: f64,
    pub(crate) distance_max: f64,
    pub(crate) distance_scored: f64,
    pub(crate) mc_best: f64,
    pub(crate) cruise_efficiency: f64,
    /// Whether the task passed structural validation this update.
    pub task_valid: bool,
}

impl TaskStats {
    /// Turnpoint-to-turnpoint distance, ignoring zone shapes and targets.
    #[must_use]
    pub fn distance_nominal(&self) -> Length {
        Length::new::<meter>(self.distance_nominal)
    }

    /// Shortest achievable scored distance (AAT targets at their near edges).
    #[must_use]
    pub fn distance_min(&self) -> Length {
        Length::new::<meter>(self.distance_min)
    }

    /// Longest achievable scored distance (AAT targets at their far edges).
    #[must_use]
    pub fn distance_max(&self) -> Length {
        Length::new::<meter>(self.distance_max)
    }

    /// Distance scored so far, with zone score adjustments applied.
    #[must_use]
    pub fn distance_scored(&self) -> Length {
        Length::new::<meter>(self.distance_scored)
    }

    /// The MacCready setting at which the remaining task would just work
    /// out with zero height margin.
    #[must_use]
    pub fn mc_best(&self) -> Velocity {
        Velocity::new::<meter_per_second>(self.mc_best)
    }

    /// Achieved cruise efficiency relative to the polar model.
    #[must_use]
    pub fn cruise_efficiency(&self) -> f64 {
        self.cruise_efficiency
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
        self.cruise_efficiency = 1.0;
    }
}

/// Cross-mode state the task manager publishes regardless of which task
/// type is active.
#[derive(Debug, Clone, Default)]
pub struct CommonStats {
    pub task_started: bool,
    pub task_finished: bool,
    /// Index of the active turnpoint of the ordered task.
    pub active_index: usize,
    /// Time left until the AAT minimum time is reached; zero once elapsed.
    pub(crate) aat_time_remaining: f64,
    /// Whether any abort-mode alternate is reachable in a straight glide.
    pub landable_reachable: bool,
}

impl CommonStats {
    #[must_use]
    pub fn aat_time_remaining(&self) -> Time {
        Time::new::<second>(self.aat_time_remaining)
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}
