use tokio::sync::watch;
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::slice::Slice;

/// Handle used to abandon a running generation.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Creates a handle and the signal the generator listens on.
    pub fn new() -> (Self, AbortSignal) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, AbortSignal { rx: Some(rx) })
    }

    /// Requests cancellation.
    ///
    /// Cancellation is best-effort and surfaces as `PipelineError::Cancelled`
    /// on the run outcome; slices collected so far are kept.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiving side of an `AbortHandle`.
#[derive(Clone, Debug, Default)]
pub struct AbortSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl AbortSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_aborted(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once the run is aborted. Pends forever if the handle was
    /// dropped without aborting.
    pub async fn aborted(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        if rx.wait_for(|aborted| *aborted).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Accumulated state of one generation run.
///
/// Owned by the generator while iterations execute and handed back to the
/// caller inside a [`RunOutcome`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    pub run_id: Uuid,
    pub collected_slices: Vec<Slice>,
    pub total_cost: f64,
    /// Number of iterations that completed successfully.
    pub iteration_index: u32,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            collected_slices: Vec::new(),
            total_cost: 0.0,
            iteration_index: 0,
        }
    }

    /// Appends one successful iteration. Negative or non-finite costs are
    /// ignored so the running total never decreases.
    pub fn record_iteration(&mut self, slices: Vec<Slice>, cost: f64) {
        self.collected_slices.extend(slices);
        if cost.is_finite() && cost > 0.0 {
            self.total_cost += cost;
        }
        self.iteration_index += 1;
    }

    pub fn finish(self, failure: Option<IterationFailure>) -> RunOutcome {
        RunOutcome {
            run_id: self.run_id,
            slices: self.collected_slices,
            total_cost: self.total_cost,
            iterations_completed: self.iteration_index,
            failure,
        }
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

/// The iteration that halted a run and why.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationFailure {
    /// 1-based iteration number.
    pub iteration: u32,
    pub error: PipelineError,
}

/// Final result of a generation run: everything collected, plus the halting
/// error when the run stopped early.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub slices: Vec<Slice>,
    pub total_cost: f64,
    pub iterations_completed: u32,
    pub failure: Option<IterationFailure>,
}

impl RunOutcome {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}
