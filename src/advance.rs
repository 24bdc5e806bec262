use crate::projection::SearchPoint;
use crate::task_point::{TaskPoint, TaskPointKind};

/// How the active turnpoint moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TaskAdvanceMode {
    /// Only [`TaskAdvance::advance`] moves the task forward.
    Manual,
    /// Every satisfied turnpoint advances immediately.
    #[default]
    Auto,
    /// Starts and AAT points wait for the pilot to arm; plain turnpoints
    /// advance automatically.
    Arm,
    /// Only the start waits for arming.
    ArmStart,
}

/// Advance policy plus its one piece of state, the armed flag.
///
/// The flag is consumed by the advance it permits, so each arming allows
/// exactly one gated transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskAdvance {
    mode: TaskAdvanceMode,
    armed: bool,
}

impl TaskAdvance {
    #[must_use]
    pub fn new(mode: TaskAdvanceMode) -> Self {
        Self { mode, armed: false }
    }

    #[must_use]
    pub fn mode(&self) -> TaskAdvanceMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: TaskAdvanceMode) {
        self.mode = mode;
        self.armed = false;
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn set_armed(&mut self, armed: bool) {
        self.armed = armed;
    }

    /// Whether this kind of point needs arming under the current mode.
    fn needs_arm(&self, point: &TaskPoint) -> bool {
        match self.mode {
            TaskAdvanceMode::Manual | TaskAdvanceMode::Auto => false,
            TaskAdvanceMode::Arm => point.is_start() || point.is_aat(),
            TaskAdvanceMode::ArmStart => point.is_start(),
        }
    }

    /// Whether the point's transition requirement itself is satisfied,
    /// ignoring arming: starts and AAT points must be exited, plain
    /// turnpoints hold the aircraft inside their zone right now, and a
    /// finish never advances past itself.
    fn state_ready(point: &TaskPoint, now: &SearchPoint) -> bool {
        match point.kind() {
            TaskPointKind::Start | TaskPointKind::Aat(_) => point.has_exited(),
            TaskPointKind::Intermediate => point.is_in_sector(now),
            TaskPointKind::Finish => false,
        }
    }

    /// Decides whether the task may advance past `point` right now, `now`
    /// being the current fix projected into the task plane.
    ///
    /// Consumes the armed flag when an armed advance is granted. When the
    /// point is satisfied but waiting on arming, `request_arm` is set so
    /// the caller can prompt the pilot.
    pub(crate) fn ready_to_advance(
        &mut self,
        point: &TaskPoint,
        now: &SearchPoint,
        request_arm: &mut bool,
    ) -> bool {
        if self.mode == TaskAdvanceMode::Manual {
            return false;
        }
        if !Self::state_ready(point, now) {
            return false;
        }
        if !self.needs_arm(point) {
            return true;
        }
        if self.armed {
            self.armed = false;
            return true;
        }
        *request_arm = true;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::{TaskAdvance, TaskAdvanceMode};
    use crate::aircraft::AircraftState;
    use crate::geo::GeoPoint;
    use crate::oz::ObservationZone;
    use crate::projection::{SearchPoint, TaskProjection};
    use crate::task_point::TaskPoint;
    use uom::si::f64::Length;
    use uom::si::length::meter;

    fn m(meters: f64) -> Length {
        Length::new::<meter>(meters)
    }

    struct Setup {
        point: TaskPoint,
        inside: SearchPoint,
        outside: SearchPoint,
    }

    fn setup(point: TaskPoint) -> Setup {
        let center = *point.location();
        let mut proj = TaskProjection::new();
        proj.reset(&center);
        proj.update_fast();
        let mut point = point;
        point.project(&proj);
        Setup {
            point,
            inside: SearchPoint::new(center, &proj),
            outside: SearchPoint::new(center.offset_m(0., 2000.), &proj),
        }
    }

    /// A start point driven to the requested progress; the returned fix is
    /// wherever the aircraft last was.
    fn start_point(exited: bool) -> Setup {
        let center = GeoPoint::from_degrees(47., 9.).unwrap();
        let mut s = setup(TaskPoint::start(
            center,
            m(400.),
            ObservationZone::cylinder(m(1000.)).unwrap(),
        ));
        let state = AircraftState::default();
        s.point.transition_enter(&state, &s.inside, &s.outside);
        if exited {
            s.point.transition_exit(&state, &s.outside, &s.inside);
        }
        s
    }

    #[test]
    fn auto_advances_exited_start() {
        let mut advance = TaskAdvance::new(TaskAdvanceMode::Auto);
        let mut request = false;
        let entered = start_point(false);
        assert!(!advance.ready_to_advance(&entered.point, &entered.inside, &mut request));
        let exited = start_point(true);
        assert!(advance.ready_to_advance(&exited.point, &exited.outside, &mut request));
        assert!(!request);
    }

    #[test]
    fn manual_never_advances() {
        let mut advance = TaskAdvance::new(TaskAdvanceMode::Manual);
        let mut request = false;
        let s = start_point(true);
        assert!(!advance.ready_to_advance(&s.point, &s.outside, &mut request));
        assert!(!request);
    }

    #[test]
    fn intermediate_advances_only_while_inside() {
        let mut advance = TaskAdvance::new(TaskAdvanceMode::Auto);
        let mut request = false;
        let center = GeoPoint::from_degrees(47., 9.).unwrap();
        let mut s = setup(TaskPoint::intermediate(
            center,
            m(400.),
            ObservationZone::cylinder(m(1000.)).unwrap(),
        ));
        let state = AircraftState::default();

        // not yet entered
        assert!(!advance.ready_to_advance(&s.point, &s.outside, &mut request));

        s.point.transition_enter(&state, &s.inside, &s.outside);
        assert!(advance.ready_to_advance(&s.point, &s.inside, &mut request));

        // entered earlier, but the aircraft has since left the zone
        s.point.transition_exit(&state, &s.outside, &s.inside);
        assert!(!advance.ready_to_advance(&s.point, &s.outside, &mut request));
        // back inside counts again
        assert!(advance.ready_to_advance(&s.point, &s.inside, &mut request));
    }

    #[test]
    fn armed_start_advances_once() {
        let mut advance = TaskAdvance::new(TaskAdvanceMode::ArmStart);
        let mut request = false;
        let s = start_point(true);

        // satisfied but unarmed: blocked, and the pilot is prompted
        assert!(!advance.ready_to_advance(&s.point, &s.outside, &mut request));
        assert!(request);

        advance.set_armed(true);
        let mut request = false;
        assert!(advance.ready_to_advance(&s.point, &s.outside, &mut request));
        // the grant consumed the armed flag
        assert!(!advance.is_armed());
        assert!(!advance.ready_to_advance(&s.point, &s.outside, &mut request));
    }

    #[test]
    fn finish_never_advances() {
        let mut advance = TaskAdvance::new(TaskAdvanceMode::Auto);
        let mut request = false;
        let center = GeoPoint::from_degrees(47., 9.).unwrap();
        let s = setup(TaskPoint::finish(
            center,
            m(400.),
            ObservationZone::cylinder(m(1000.)).unwrap(),
        ));
        assert!(!advance.ready_to_advance(&s.point, &s.inside, &mut request));
    }
}
