use crate::geo::GeoPoint;
use uom::si::f64::{Angle, Length, Time, Velocity};
use uom::si::{length::meter, time::second, velocity::meter_per_second};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The wind vector acting on the aircraft.
///
/// `bearing` is the direction the airmass is moving *towards*: with
/// `bearing` equal to the aircraft's track, the wind is a pure tailwind.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WindVector {
    pub speed: Velocity,
    pub bearing: Angle,
}

impl WindVector {
    #[must_use]
    pub fn new(speed: Velocity, bearing: Angle) -> Self {
        Self { speed, bearing }
    }
}

/// A snapshot of the glider at one position fix.
///
/// Produced externally by the sensor layer once per fix and passed by
/// reference into every solver; the task engine never owns or mutates one.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AircraftState {
    pub location: GeoPoint,
    /// Altitude above the task datum (meters MSL in practice).
    pub altitude: Length,
    pub ground_speed: Velocity,
    /// Track over ground, clockwise from true north.
    pub track: Angle,
    pub wind: WindVector,
    /// Fix time since an arbitrary epoch. Updates must arrive in
    /// monotonically increasing time order; the task manager resets its
    /// incremental timers when this goes backwards.
    pub time: Time,
    /// Instantaneous climb rate, positive up.
    pub vario: Velocity,
}

impl AircraftState {
    pub(crate) fn altitude_m(&self) -> f64 {
        self.altitude.get::<meter>()
    }

    pub(crate) fn time_s(&self) -> f64 {
        self.time.get::<second>()
    }

    pub(crate) fn wind_speed_ms(&self) -> f64 {
        self.wind.speed.get::<meter_per_second>()
    }

    pub(crate) fn wind_bearing_rad(&self) -> f64 {
        self.wind.bearing.get::<uom::si::angle::radian>()
    }
}

