use crate::aircraft::AircraftState;
use crate::geo::GeoPoint;
use crate::oz::ObservationZone;
use crate::projection::{SearchPoint, TaskProjection};
use crate::util::BoundedAngle;
use uom::si::f64::Length;
use uom::si::length::meter;

/// Where the aircraft stands with respect to one turnpoint's zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneProgress {
    NotEntered,
    Inside,
    Exited,
}

/// Movable scoring target inside an AAT zone.
///
/// `range` parameterizes the target position along the zone axis: 0 is the
/// nearest edge, 0.5 the turnpoint itself, 1 the far edge. The task-time
/// optimiser moves all targets together through this single parameter.
#[derive(Debug, Clone, Copy)]
pub struct AatData {
    target: SearchPoint,
    range: f64,
    axis: f64,
}

/// Role of a turnpoint within the ordered task.
#[derive(Debug, Clone, Copy)]
pub enum TaskPointKind {
    Start,
    Intermediate,
    Aat(AatData),
    Finish,
}

/// One turnpoint: a waypoint, its observation zone, its role, and the
/// transition history recorded against it.
///
/// Entry and exit snapshots are full aircraft states, so scoring can later
/// use the time and altitude of the fix that caused each transition.
#[derive(Debug, Clone)]
pub struct TaskPoint {
    waypoint: SearchPoint,
    elevation: f64,
    oz: ObservationZone,
    kind: TaskPointKind,
    state_entered: Option<AircraftState>,
    state_exited: Option<AircraftState>,
}

impl TaskPoint {
    fn new(location: GeoPoint, elevation: Length, oz: ObservationZone, kind: TaskPointKind) -> Self {
        Self {
            // projected properly once the owning task scans its geometry
            waypoint: SearchPoint::new(location, &TaskProjection::new()),
            elevation: elevation.get::<meter>(),
            oz,
            kind,
            state_entered: None,
            state_exited: None,
        }
    }

    #[must_use]
    pub fn start(location: GeoPoint, elevation: Length, oz: ObservationZone) -> Self {
        Self::new(location, elevation, oz, TaskPointKind::Start)
    }

    #[must_use]
    pub fn intermediate(location: GeoPoint, elevation: Length, oz: ObservationZone) -> Self {
        Self::new(location, elevation, oz, TaskPointKind::Intermediate)
    }

    /// An AAT turnpoint; the target starts on the turnpoint itself.
    #[must_use]
    pub fn aat(location: GeoPoint, elevation: Length, oz: ObservationZone) -> Self {
        let target = SearchPoint::new(location, &TaskProjection::new());
        Self::new(
            location,
            elevation,
            oz,
            TaskPointKind::Aat(AatData {
                target,
                range: 0.5,
                axis: 0.0,
            }),
        )
    }

    #[must_use]
    pub fn finish(location: GeoPoint, elevation: Length, oz: ObservationZone) -> Self {
        Self::new(location, elevation, oz, TaskPointKind::Finish)
    }

    #[must_use]
    pub fn location(&self) -> &GeoPoint {
        self.waypoint.location()
    }

    #[must_use]
    pub fn elevation(&self) -> Length {
        Length::new::<meter>(self.elevation)
    }

    pub(crate) fn elevation_m(&self) -> f64 {
        self.elevation
    }

    #[must_use]
    pub fn observation_zone(&self) -> &ObservationZone {
        &self.oz
    }

    #[must_use]
    pub fn kind(&self) -> &TaskPointKind {
        &self.kind
    }

    #[must_use]
    pub fn is_start(&self) -> bool {
        matches!(self.kind, TaskPointKind::Start)
    }

    #[must_use]
    pub fn is_finish(&self) -> bool {
        matches!(self.kind, TaskPointKind::Finish)
    }

    #[must_use]
    pub fn is_aat(&self) -> bool {
        matches!(self.kind, TaskPointKind::Aat(_))
    }

    #[must_use]
    pub fn has_entered(&self) -> bool {
        self.state_entered.is_some()
    }

    #[must_use]
    pub fn has_exited(&self) -> bool {
        self.state_exited.is_some()
    }

    #[must_use]
    pub fn entered_state(&self) -> Option<&AircraftState> {
        self.state_entered.as_ref()
    }

    #[must_use]
    pub fn exited_state(&self) -> Option<&AircraftState> {
        self.state_exited.as_ref()
    }

    #[must_use]
    pub fn progress(&self) -> ZoneProgress {
        match (&self.state_entered, &self.state_exited) {
            (None, _) => ZoneProgress::NotEntered,
            (Some(_), None) => ZoneProgress::Inside,
            (Some(_), Some(_)) => ZoneProgress::Exited,
        }
    }

    /// Whether the projected aircraft position is inside the zone.
    #[must_use]
    pub fn is_in_sector(&self, aircraft: &SearchPoint) -> bool {
        self.oz.is_in_sector(&self.waypoint, aircraft)
    }

    /// Records an entry transition if the aircraft moved from outside to
    /// inside between the two fixes. Returns whether a transition happened.
    pub(crate) fn transition_enter(
        &mut self,
        state: &AircraftState,
        now: &SearchPoint,
        last: &SearchPoint,
    ) -> bool {
        if self.is_in_sector(now) && !self.is_in_sector(last) {
            self.state_entered = Some(*state);
            true
        } else {
            false
        }
    }

    /// Records an exit transition if the aircraft moved from inside to
    /// outside between the two fixes. Only meaningful after an entry.
    pub(crate) fn transition_exit(
        &mut self,
        state: &AircraftState,
        now: &SearchPoint,
        last: &SearchPoint,
    ) -> bool {
        if self.has_entered() && !self.is_in_sector(now) && self.is_in_sector(last) {
            self.state_exited = Some(*state);
            true
        } else {
            false
        }
    }

    /// Forgets all transitions and re-centers the AAT target.
    pub(crate) fn reset(&mut self) {
        self.state_entered = None;
        self.state_exited = None;
        if let TaskPointKind::Aat(aat) = &mut self.kind {
            aat.target = self.waypoint;
            aat.range = 0.5;
        }
    }

    /// Re-orients the observation zone and AAT axis to the neighbouring
    /// turnpoints. Called whenever the task ordering changes.
    pub(crate) fn update_oz(&mut self, prev: Option<&GeoPoint>, next: Option<&GeoPoint>) {
        let here = *self.waypoint.location();
        self.oz.set_legs(prev, &here, next);
        if let TaskPointKind::Aat(aat) = &mut self.kind {
            // target axis is the course direction through the point
            let inbound = prev.map(|p| {
                BoundedAngle::from_radians(here.bearing_rad(p) + std::f64::consts::PI)
                    .get_bounded()
            });
            let outbound = next.map(|n| here.bearing_rad(n));
            aat.axis = match (inbound, outbound) {
                (Some(a), Some(b)) => {
                    let delta = BoundedAngle::from_radians(b - a).to_signed_range();
                    BoundedAngle::from_radians(a + delta / 2.0).get_bounded()
                }
                (Some(a), None) => a,
                (None, Some(b)) => b,
                (None, None) => 0.0,
            };
        }
    }

    /// Refreshes the flat-plane halves after the projection changed.
    pub(crate) fn project(&mut self, projection: &TaskProjection) {
        self.waypoint.project(projection);
        if let TaskPointKind::Aat(aat) = &mut self.kind {
            aat.target.project(projection);
        }
    }

    /// The point remaining distance is measured to: the AAT target if this
    /// is an AAT point, otherwise the turnpoint itself.
    #[must_use]
    pub fn location_remaining(&self) -> &GeoPoint {
        match &self.kind {
            TaskPointKind::Aat(aat) => aat.target.location(),
            _ => self.waypoint.location(),
        }
    }

    /// The point already-flown distance is scored through.
    #[must_use]
    pub fn location_scored(&self) -> &GeoPoint {
        self.location_remaining()
    }

    /// Where the target would sit for a given range parameter, without
    /// moving it. Non-AAT points pin this to the turnpoint.
    #[must_use]
    pub(crate) fn location_with_range(
        &self,
        range: f64,
        projection: &TaskProjection,
    ) -> GeoPoint {
        match &self.kind {
            TaskPointKind::Aat(aat) => {
                self.clamped_target(range, aat.axis, projection)
            }
            _ => *self.waypoint.location(),
        }
    }

    /// Moves the AAT target to the given range parameter, clamped into the
    /// zone. No-op for other kinds.
    pub(crate) fn set_target_range(&mut self, range: f64, projection: &TaskProjection) {
        if let TaskPointKind::Aat(aat) = &self.kind {
            let axis = aat.axis;
            let location = self.clamped_target(range, axis, projection);
            if let TaskPointKind::Aat(aat) = &mut self.kind {
                aat.range = range.clamp(0.0, 1.0);
                aat.target = SearchPoint::new(location, projection);
            }
        }
    }

    #[must_use]
    pub fn target_range(&self) -> Option<f64> {
        match &self.kind {
            TaskPointKind::Aat(aat) => Some(aat.range),
            _ => None,
        }
    }

    fn clamped_target(&self, range: f64, axis: f64, projection: &TaskProjection) -> GeoPoint {
        let center = *self.waypoint.location();
        // stay a sliver inside the boundary so projection error cannot push
        // a full-range target out of its own zone
        let reach = self.oz.bounding_radius_m() * (1.0 - 1e-3);
        let mut signed = (2.0 * range.clamp(0.0, 1.0) - 1.0) * reach;
        // halve back towards the center until the candidate is inside; the
        // axis may poke out of asymmetric shapes
        for _ in 0..10 {
            let candidate = if signed >= 0.0 {
                center.offset_m(axis, signed)
            } else {
                center.offset_m(axis + std::f64::consts::PI, -signed)
            };
            if self
                .oz
                .is_in_sector(&self.waypoint, &SearchPoint::new(candidate, projection))
            {
                return candidate;
            }
            signed /= 2.0;
        }
        center
    }
}
