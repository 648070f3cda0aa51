use std::time::Duration;

use tokio::sync::mpsc;

/// Progress events emitted during a generation run.
///
/// Delivery is advisory: a closed or missing receiver never affects the run.
#[derive(Clone, Debug, PartialEq)]
pub enum GenerationEvent {
    /// Iteration `iteration` (1-based) of `total` is starting.
    IterationStarted { iteration: u32, total: u32 },
    /// A transient failure will be retried on the same model after `delay`.
    RetryScheduled {
        iteration: u32,
        model: String,
        attempt: u32,
        delay: Duration,
        code: &'static str,
    },
    /// The primary model's budget is exhausted; switching to the fallback.
    FallbackEngaged {
        iteration: u32,
        from: String,
        to: String,
        code: &'static str,
    },
    /// Iteration finished and its slices were appended.
    IterationCompleted {
        iteration: u32,
        slices: usize,
        cost: f64,
        total_cost: f64,
    },
    /// Iteration failed; the run stops here.
    RunHalted { iteration: u32, message: String },
}

/// Optional event channel shared by the generator and orchestrator.
#[derive(Clone, Debug, Default)]
pub(crate) struct EventSink {
    tx: Option<mpsc::UnboundedSender<GenerationEvent>>,
}

impl EventSink {
    pub(crate) fn new(tx: Option<mpsc::UnboundedSender<GenerationEvent>>) -> Self {
        Self { tx }
    }

    pub(crate) fn emit(&self, event: GenerationEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_without_receiver_is_a_no_op() {
        EventSink::default().emit(GenerationEvent::IterationStarted {
            iteration: 1,
            total: 1,
        });
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        EventSink::new(Some(tx)).emit(GenerationEvent::IterationStarted {
            iteration: 1,
            total: 1,
        });
    }
}
