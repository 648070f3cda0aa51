//! Retry/fallback state machine around a single chat-completion request.
//!
//! `Orchestrator::transition` is the whole policy as a pure function of
//! `(attempt, outcome) -> step`; `obtain` only executes the steps it returns.

use std::time::Duration;

use tracing::{debug, info, warn};
use vertiprompt_harness::{ChatTransport, GenerationRequest, GenerationResult, TransportError};

use crate::delay::Delay;
use crate::errors::PipelineError;
use crate::events::{EventSink, GenerationEvent};
use crate::policy::RetryPolicy;
use crate::run::AbortSignal;

/// Which model budget an attempt is spending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    Primary,
    Fallback,
}

/// The `Attempting` state: which model to call and how much of its retry
/// budget is already spent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub model: String,
    pub leg: Leg,
    pub retries_done: u32,
}

/// Result of feeding one attempt's outcome into the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Done(GenerationResult),
    /// Transient failure with budget left: wait, then call the same model.
    Retry {
        next: Attempt,
        wait: Duration,
        cause: TransportError,
    },
    /// Primary budget exhausted: switch to the fallback model once.
    Fallback { next: Attempt, cause: TransportError },
    Failed(TransportError),
}

/// A successful outcome plus how it was reached.
#[derive(Debug, Clone, PartialEq)]
pub struct Obtained {
    pub result: GenerationResult,
    /// Model that produced the result (the primary or the fallback).
    pub model: String,
    /// Total transport calls made, including the successful one.
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Orchestrator {
    primary: RetryPolicy,
    fallback: RetryPolicy,
    fallback_model: String,
}

impl Orchestrator {
    pub fn new(primary: RetryPolicy, fallback: RetryPolicy, fallback_model: impl Into<String>) -> Self {
        Self {
            primary,
            fallback,
            fallback_model: fallback_model.into(),
        }
    }

    pub fn fallback_model(&self) -> &str {
        &self.fallback_model
    }

    /// Initial state for a request against `model`.
    pub fn start(&self, model: impl Into<String>) -> Attempt {
        Attempt {
            model: model.into(),
            leg: Leg::Primary,
            retries_done: 0,
        }
    }

    fn policy(&self, leg: Leg) -> &RetryPolicy {
        match leg {
            Leg::Primary => &self.primary,
            Leg::Fallback => &self.fallback,
        }
    }

    pub fn retries_remaining(&self, attempt: &Attempt) -> u32 {
        self.policy(attempt.leg).retries_remaining(attempt.retries_done)
    }

    /// Upper bound on transport calls for one `obtain`.
    pub fn max_attempts(&self) -> u32 {
        self.primary.max_retries + 1 + self.fallback.max_retries + 1
    }

    /// Decides the next step after `attempt` finished with `outcome`.
    ///
    /// Transient failures with budget left retry the same model. Once the
    /// primary budget is spent, a failure of any kind switches to the fallback
    /// model, unless the primary already is the fallback model. A permanent
    /// failure while budget remains, or any failure on the fallback leg once it
    /// cannot retry, is terminal.
    pub fn transition(
        &self,
        attempt: &Attempt,
        outcome: Result<GenerationResult, TransportError>,
    ) -> Step {
        let cause = match outcome {
            Ok(result) => return Step::Done(result),
            Err(err) => err,
        };
        let policy = self.policy(attempt.leg);
        if policy.can_retry(attempt.retries_done) {
            if !cause.is_transient() {
                return Step::Failed(cause);
            }
            return Step::Retry {
                wait: policy.backoff_duration(attempt.retries_done),
                next: Attempt {
                    retries_done: attempt.retries_done + 1,
                    ..attempt.clone()
                },
                cause,
            };
        }

        if attempt.leg == Leg::Primary && attempt.model != self.fallback_model {
            return Step::Fallback {
                next: Attempt {
                    model: self.fallback_model.clone(),
                    leg: Leg::Fallback,
                    retries_done: 0,
                },
                cause,
            };
        }

        Step::Failed(cause)
    }

    /// Drives the state machine to a terminal step.
    ///
    /// `build_request` is called once per attempt with the model to use, so
    /// every attempt sends a freshly built request. Cancellation is observed
    /// while a call is in flight and while waiting out a backoff.
    pub(crate) async fn obtain<F>(
        &self,
        transport: &dyn ChatTransport,
        delay: &dyn Delay,
        model: &str,
        build_request: F,
        iteration: u32,
        events: &EventSink,
        abort: &AbortSignal,
    ) -> Result<Obtained, PipelineError>
    where
        F: Fn(&str) -> GenerationRequest,
    {
        let mut attempt = self.start(model);
        let mut attempts = 0u32;
        loop {
            if abort.is_aborted() {
                return Err(PipelineError::Cancelled);
            }
            attempts += 1;
            debug!(
                event = "orchestrator.attempt",
                domain = "generation",
                iteration = iteration,
                attempt = attempts,
                model = attempt.model.as_str(),
                retries_remaining = self.retries_remaining(&attempt)
            );
            let request = build_request(&attempt.model);
            let outcome = tokio::select! {
                biased;
                _ = abort.aborted() => return Err(PipelineError::Cancelled),
                outcome = transport.complete_chat(request) => outcome,
            };

            match self.transition(&attempt, outcome) {
                Step::Done(result) => {
                    debug!(
                        event = "orchestrator.succeeded",
                        domain = "generation",
                        iteration = iteration,
                        attempt = attempts,
                        model = attempt.model.as_str(),
                        served_by = result.model_id.as_str()
                    );
                    return Ok(Obtained {
                        result,
                        model: attempt.model,
                        attempts,
                    });
                }
                Step::Retry { next, wait, cause } => {
                    info!(
                        event = "orchestrator.retry_scheduled",
                        domain = "generation",
                        iteration = iteration,
                        code = cause.code(),
                        status = ?cause.status_code(),
                        attempt = attempts,
                        next_attempt = attempts + 1,
                        model = attempt.model.as_str(),
                        backoff_ms = wait.as_millis() as u64
                    );
                    events.emit(GenerationEvent::RetryScheduled {
                        iteration,
                        model: attempt.model.clone(),
                        attempt: attempts,
                        delay: wait,
                        code: cause.code(),
                    });
                    tokio::select! {
                        biased;
                        _ = abort.aborted() => return Err(PipelineError::Cancelled),
                        _ = delay.wait(wait) => {}
                    }
                    attempt = next;
                }
                Step::Fallback { next, cause } => {
                    warn!(
                        event = "orchestrator.fallback_engaged",
                        domain = "generation",
                        iteration = iteration,
                        code = cause.code(),
                        from = attempt.model.as_str(),
                        to = next.model.as_str(),
                        error = %cause
                    );
                    events.emit(GenerationEvent::FallbackEngaged {
                        iteration,
                        from: attempt.model.clone(),
                        to: next.model.clone(),
                        code: cause.code(),
                    });
                    attempt = next;
                }
                Step::Failed(error) => {
                    warn!(
                        event = "orchestrator.failed",
                        domain = "generation",
                        iteration = iteration,
                        code = error.code(),
                        attempts = attempts,
                        model = attempt.model.as_str(),
                        error = %error
                    );
                    return Err(PipelineError::Transport {
                        error,
                        model: attempt.model,
                        attempts,
                    });
                }
            }
        }
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(
            RetryPolicy::primary(),
            RetryPolicy::fallback(),
            crate::catalog::FALLBACK_MODEL,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::AbortHandle;
    use crate::test_support::{RecordingDelay, ScriptedTransport, ok_result, status};
    use std::sync::Arc;
    use vertiprompt_harness::ChatMessage;

    fn build(model: &str) -> GenerationRequest {
        GenerationRequest::new("key", model, vec![ChatMessage::user("hi")])
    }

    async fn run(
        orchestrator: &Orchestrator,
        transport: &ScriptedTransport,
        delay: &RecordingDelay,
        model: &str,
    ) -> Result<Obtained, PipelineError> {
        orchestrator
            .obtain(
                transport,
                delay,
                model,
                build,
                1,
                &EventSink::default(),
                &AbortSignal::never(),
            )
            .await
    }

    #[test]
    fn transient_failure_with_budget_retries_same_model() {
        let o = Orchestrator::default();
        let attempt = o.start("openai/o3-pro");
        let step = o.transition(&attempt, Err(status(429)));
        assert!(matches!(
            step,
            Step::Retry { ref next, wait, .. }
                if next.model == "openai/o3-pro" && next.retries_done == 1 && wait == Duration::from_millis(1_000)
        ));
    }

    #[test]
    fn exhausted_primary_switches_to_fallback_with_fresh_budget() {
        let o = Orchestrator::default();
        let attempt = Attempt {
            model: "openai/o3-pro".into(),
            leg: Leg::Primary,
            retries_done: 3,
        };
        let step = o.transition(&attempt, Err(status(503)));
        match step {
            Step::Fallback { next, .. } => {
                assert_eq!(next.model, crate::catalog::FALLBACK_MODEL);
                assert_eq!(next.leg, Leg::Fallback);
                assert_eq!(o.retries_remaining(&next), 2);
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[test]
    fn permanent_failure_is_terminal_on_primary() {
        let o = Orchestrator::default();
        let step = o.transition(&o.start("openai/o3-pro"), Err(status(401)));
        assert!(matches!(step, Step::Failed(err) if err.status_code() == Some(401)));
    }

    #[test]
    fn permanent_failure_after_spent_primary_budget_still_falls_back() {
        let o = Orchestrator::default();
        let attempt = Attempt {
            model: "openai/o3-pro".into(),
            leg: Leg::Primary,
            retries_done: 3,
        };
        assert!(matches!(
            o.transition(&attempt, Err(status(400))),
            Step::Fallback { ref next, .. } if next.model == crate::catalog::FALLBACK_MODEL
        ));
    }

    #[test]
    fn permanent_failure_on_fallback_leg_is_terminal() {
        let o = Orchestrator::default();
        let attempt = Attempt {
            model: crate::catalog::FALLBACK_MODEL.into(),
            leg: Leg::Fallback,
            retries_done: 0,
        };
        assert!(matches!(o.transition(&attempt, Err(status(401))), Step::Failed(_)));
    }

    #[test]
    fn exhausted_fallback_is_terminal() {
        let o = Orchestrator::default();
        let attempt = Attempt {
            model: crate::catalog::FALLBACK_MODEL.into(),
            leg: Leg::Fallback,
            retries_done: 2,
        };
        assert!(matches!(o.transition(&attempt, Err(status(500))), Step::Failed(_)));
    }

    #[test]
    fn primary_that_is_the_fallback_model_never_falls_back() {
        let o = Orchestrator::default();
        let attempt = Attempt {
            model: crate::catalog::FALLBACK_MODEL.into(),
            leg: Leg::Primary,
            retries_done: 3,
        };
        assert!(matches!(o.transition(&attempt, Err(status(500))), Step::Failed(_)));
    }

    #[tokio::test]
    async fn two_rate_limits_then_success_waits_one_then_two_seconds() {
        let transport = ScriptedTransport::new(vec![
            Err(status(429)),
            Err(status(429)),
            Ok(ok_result("openai/o3-pro", "{}")),
        ]);
        let delay = RecordingDelay::default();
        let obtained = run(&Orchestrator::default(), &transport, &delay, "openai/o3-pro")
            .await
            .expect("obtained");
        assert_eq!(obtained.attempts, 3);
        assert_eq!(obtained.model, "openai/o3-pro");
        assert_eq!(
            delay.waits(),
            vec![Duration::from_millis(1_000), Duration::from_millis(2_000)]
        );
        assert!(transport.models().iter().all(|m| m == "openai/o3-pro"));
    }

    #[tokio::test]
    async fn persistent_transient_failure_exhausts_primary_then_fallback() {
        let transport = ScriptedTransport::repeating(Err(status(503)));
        let delay = RecordingDelay::default();
        let o = Orchestrator::default();
        let err = run(&o, &transport, &delay, "openai/o3-pro")
            .await
            .expect_err("should fail");

        let models = transport.models();
        assert_eq!(models.len() as u32, o.max_attempts());
        assert_eq!(models.iter().filter(|m| *m == "openai/o3-pro").count(), 4);
        assert_eq!(
            models.iter().filter(|m| *m == crate::catalog::FALLBACK_MODEL).count(),
            3
        );
        assert_eq!(
            delay.waits(),
            [1_000, 2_000, 4_000, 1_000, 2_000].map(Duration::from_millis).to_vec()
        );
        assert!(matches!(
            err,
            PipelineError::Transport { ref model, attempts: 7, .. } if model == crate::catalog::FALLBACK_MODEL
        ));
    }

    #[tokio::test]
    async fn bad_request_after_exhausted_retries_is_served_by_fallback() {
        let transport = ScriptedTransport::new(vec![
            Err(status(503)),
            Err(status(503)),
            Err(status(503)),
            Err(status(400)),
            Ok(ok_result("openrouter/auto", "{}")),
        ]);
        let delay = RecordingDelay::default();
        let obtained = run(&Orchestrator::default(), &transport, &delay, "openai/o3-pro")
            .await
            .expect("fallback succeeds");

        assert_eq!(obtained.model, crate::catalog::FALLBACK_MODEL);
        assert_eq!(obtained.attempts, 5);
        let models = transport.models();
        assert_eq!(models[..4], ["openai/o3-pro"; 4].map(String::from));
        assert_eq!(models[4], crate::catalog::FALLBACK_MODEL);
        assert_eq!(
            delay.waits(),
            [1_000, 2_000, 4_000].map(Duration::from_millis).to_vec()
        );
    }

    #[tokio::test]
    async fn permanent_failure_makes_exactly_one_call() {
        let transport = ScriptedTransport::repeating(Err(status(400)));
        let delay = RecordingDelay::default();
        let err = run(&Orchestrator::default(), &transport, &delay, "openai/o3-pro")
            .await
            .expect_err("should fail");
        assert_eq!(transport.models().len(), 1);
        assert!(delay.waits().is_empty());
        assert!(matches!(err, PipelineError::Transport { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn fallback_success_reports_fallback_model() {
        let mut script: Vec<_> = (0..4).map(|_| Err(status(502))).collect();
        script.push(Ok(ok_result("mistral/auto-routed", "{}")));
        let transport = ScriptedTransport::new(script);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let obtained = Orchestrator::default()
            .obtain(
                &transport,
                &RecordingDelay::default(),
                "openai/o3-pro",
                build,
                1,
                &EventSink::new(Some(tx)),
                &AbortSignal::never(),
            )
            .await
            .expect("obtained");
        assert_eq!(obtained.model, crate::catalog::FALLBACK_MODEL);
        assert_eq!(obtained.attempts, 5);

        let mut retries = 0;
        let mut fallbacks = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                GenerationEvent::RetryScheduled { .. } => retries += 1,
                GenerationEvent::FallbackEngaged { .. } => fallbacks += 1,
                _ => {}
            }
        }
        assert_eq!((retries, fallbacks), (3, 1));
    }

    #[tokio::test]
    async fn abort_during_backoff_cancels() {
        let transport = ScriptedTransport::repeating(Err(status(429)));
        let (handle, signal) = AbortHandle::new();
        let delay = Arc::new(RecordingDelay::aborting_with(handle));
        let err = Orchestrator::default()
            .obtain(
                &transport,
                delay.as_ref(),
                "openai/o3-pro",
                build,
                1,
                &EventSink::default(),
                &signal,
            )
            .await
            .expect_err("cancelled");
        assert_eq!(err, PipelineError::Cancelled);
        assert_eq!(transport.models().len(), 1);
    }
}
