use thiserror::Error;

/// Errors reported when building or validating a task.
///
/// Ordinary in-flight infeasibility (unreachable target, excessive wind,
/// non-converged solver) is *not* an error: it is expected on most update
/// cycles and is expressed in the solver outputs themselves (see
/// [`GlideResult::solution`](crate::glide::GlideResult::solution)). Only
/// malformed construction input surfaces here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    /// The glide polar coefficients do not describe a parabolic sink curve
    /// with a positive minimum-sink speed.
    #[error("invalid glide polar coefficients (a={a}, b={b}, c={c})")]
    InvalidPolar { a: f64, b: f64, c: f64 },

    /// An observation zone was given a zero or negative dimension.
    #[error("degenerate observation zone dimension ({meters} m)")]
    DegenerateZone { meters: f64 },

    /// The ordered task has no points at all.
    #[error("task has no turnpoints")]
    EmptyTask,

    /// The first task point is not a start point.
    #[error("task has no start point")]
    MissingStart,

    /// The last task point is not a finish point.
    #[error("task has no finish point")]
    MissingFinish,
}
