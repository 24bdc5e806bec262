//! Soarta is a flight-task engine for glide computers: it tracks an ordered
//! cross-country task against a stream of position fixes, detects
//! observation-zone transitions, and continuously solves the MacCready
//! speed-to-fly problem over the legs that remain.
//!
//! The engine is deliberately free of I/O: sensors push
//! [`AircraftState`](aircraft::AircraftState) fixes in, and displays pull
//! [`TaskStats`](stats::TaskStats) snapshots out. Everything in between --
//! zone geometry, glide solutions, AAT target optimisation -- happens
//! synchronously inside an update.
//!
//! ```
//! use soarta::aircraft::AircraftState;
//! use soarta::geo::GeoPoint;
//! use soarta::manager::{TaskManager, TaskMode};
//! use soarta::ordered::TaskBehaviour;
//! use soarta::oz::ObservationZone;
//! use soarta::polar::GlidePolar;
//! use soarta::task_point::TaskPoint;
//! use uom::si::f64::Length;
//! use uom::si::length::{kilometer, meter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut manager = TaskManager::new(TaskBehaviour::default(), GlidePolar::default());
//!
//! let home = GeoPoint::from_degrees(47.0, 9.0).ok_or("bad latitude")?;
//! let turn = GeoPoint::from_degrees(47.3, 9.4).ok_or("bad latitude")?;
//! let elevation = Length::new::<meter>(420.);
//!
//! let task = manager.ordered_mut();
//! task.append(TaskPoint::start(
//!     home,
//!     elevation,
//!     ObservationZone::cylinder(Length::new::<kilometer>(1.))?,
//! ));
//! task.append(TaskPoint::intermediate(
//!     turn,
//!     elevation,
//!     ObservationZone::fai_sector(),
//! ));
//! task.append(TaskPoint::finish(
//!     home,
//!     elevation,
//!     ObservationZone::cylinder(Length::new::<kilometer>(1.))?,
//! ));
//! manager.set_mode(TaskMode::Ordered)?;
//!
//! // feed fixes as they arrive:
//! let previous = AircraftState::default();
//! let current = AircraftState::default();
//! manager.update(&current, &previous, &mut ());
//! println!("{:?}", manager.stats().total.time_remaining());
//! # Ok(())
//! # }
//! ```

pub mod advance;
pub mod aircraft;
pub mod error;
pub mod events;
pub mod geo;
pub mod glide;
pub mod hull;
pub mod isoline;
pub mod manager;
pub mod ordered;
pub mod oz;
pub mod polar;
pub mod projection;
pub mod stats;
pub mod task_point;
mod task_solve;
mod util;
pub mod zero;

pub use advance::{TaskAdvance, TaskAdvanceMode};
pub use aircraft::{AircraftState, WindVector};
pub use error::TaskError;
pub use events::TaskEvents;
pub use geo::GeoPoint;
pub use glide::{GlideResult, GlideSolution, GlideState, MacCready};
pub use hull::prune_interior;
pub use isoline::AatIsolineSegment;
pub use manager::{AbortAlternate, SharedTaskManager, TaskManager, TaskMode};
pub use ordered::{OrderedTask, TaskBehaviour};
pub use oz::ObservationZone;
pub use polar::{GlidePolar, PolarCoefficients};
pub use projection::{FlatPoint, SearchPoint, TaskProjection};
pub use stats::{CommonStats, TaskStats};
pub use task_point::{TaskPoint, TaskPointKind, ZoneProgress};
pub use zero::ZeroFinder;

pub(crate) type Point2 = nalgebra::Point2<f64>;
pub(crate) type Vector2 = nalgebra::Vector2<f64>;
