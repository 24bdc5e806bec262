use crate::error::TaskError;

/// Observer for task progress.
///
/// The engine calls these synchronously from within an update, so
/// implementations must be quick and must not call back into the task. All
/// methods default to no-ops; implement only what the UI cares about.
pub trait TaskEvents {
    /// The aircraft entered the observation zone of turnpoint `index`.
    fn transition_enter(&mut self, index: usize) {
        let _ = index;
    }

    /// The aircraft left the observation zone of turnpoint `index`.
    fn transition_exit(&mut self, index: usize) {
        let _ = index;
    }

    /// The active turnpoint moved forward to `index`.
    fn active_advanced(&mut self, index: usize) {
        let _ = index;
    }

    /// A turnpoint is satisfied but the advance mode is waiting for the
    /// pilot to arm.
    fn request_arm(&mut self, index: usize) {
        let _ = index;
    }

    /// The start was crossed and task time is running.
    fn task_start(&mut self) {}

    /// The finish zone was reached.
    fn task_finish(&mut self) {}

    /// A structural problem was found while validating the task.
    fn construction_error(&mut self, error: &TaskError) {
        let _ = error;
    }
}

/// For callers that don't observe anything.
impl TaskEvents for () {}
