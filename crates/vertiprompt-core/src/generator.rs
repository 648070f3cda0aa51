//! Iteration accumulator: runs prompt -> orchestrator -> parser -> cost once
//! per iteration, strictly in order, and collects the results.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use vertiprompt_harness::{ChatTransport, GenerationRequest};

use crate::config::GenerationSettings;
use crate::cost::PriceTable;
use crate::delay::{Delay, TokioDelay};
use crate::errors::{GenerateError, PipelineError};
use crate::events::{EventSink, GenerationEvent};
use crate::orchestrator::Orchestrator;
use crate::prompt;
use crate::run::{AbortSignal, IterationFailure, RunOutcome, RunState};
use crate::slice::Slice;

/// Caller input for one generation run.
#[derive(Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub api_key: String,
    pub description: String,
    /// Model to use; the settings' default model when `None`.
    pub model: Option<String>,
    pub iterations: u32,
}

impl GenerateRequest {
    pub fn new(api_key: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            description: description.into(),
            model: None,
            iterations: 1,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Checks caller input against `settings`. Runs before any network call,
    /// so callers can reject bad input without building a transport.
    pub fn validate(&self, settings: &GenerationSettings) -> Result<(), GenerateError> {
        if self.api_key.trim().is_empty() {
            return Err(GenerateError::Validation("an API key is required".into()));
        }
        let chars = self.description.chars().count();
        if chars < settings.min_description_chars {
            return Err(GenerateError::Validation(format!(
                "description must be at least {} characters (got {chars})",
                settings.min_description_chars
            )));
        }
        if self.iterations == 0 {
            return Err(GenerateError::Validation(
                "iterations must be at least 1".into(),
            ));
        }
        if self.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
            return Err(GenerateError::Validation("model must not be empty".into()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for GenerateRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerateRequest")
            .field("api_key", &"<redacted>")
            .field("description_chars", &self.description.chars().count())
            .field("model", &self.model)
            .field("iterations", &self.iterations)
            .finish()
    }
}

/// Optional progress channel and cancellation signal for a run.
#[derive(Clone, Debug, Default)]
pub struct RunContext {
    pub events: Option<mpsc::UnboundedSender<GenerationEvent>>,
    pub abort: AbortSignal,
}

impl RunContext {
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<GenerationEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn with_abort(mut self, abort: AbortSignal) -> Self {
        self.abort = abort;
        self
    }
}

/// Clears the in-flight flag when the run ends, however it ends.
struct FlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Drives generation runs against one transport. At most one run is in
/// flight per generator.
pub struct Generator {
    transport: Arc<dyn ChatTransport>,
    settings: GenerationSettings,
    orchestrator: Orchestrator,
    prices: PriceTable,
    delay: Arc<dyn Delay>,
    generating: AtomicBool,
}

impl Generator {
    pub fn new(transport: Arc<dyn ChatTransport>, settings: GenerationSettings) -> Self {
        Self {
            transport,
            orchestrator: settings.orchestrator(),
            settings,
            prices: PriceTable::curated(),
            delay: Arc::new(TokioDelay),
            generating: AtomicBool::new(false),
        }
    }

    /// Replaces the backoff delay (tests inject a recording delay).
    pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    /// Replaces the price table used for cost estimates.
    pub fn with_prices(mut self, prices: PriceTable) -> Self {
        self.prices = prices;
        self
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::Acquire)
    }

    /// Checks caller input without starting a run.
    pub fn validate(&self, request: &GenerateRequest) -> Result<(), GenerateError> {
        request.validate(&self.settings)
    }

    fn begin(&self) -> Result<FlightGuard<'_>, GenerateError> {
        self.generating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| GenerateError::Busy)?;
        Ok(FlightGuard {
            flag: &self.generating,
        })
    }

    /// Runs `request.iterations` sequential iterations.
    ///
    /// Returns `Err` only when the run could not start (busy or invalid
    /// input). Once started, a failing iteration stops the run and is reported
    /// in `RunOutcome::failure` next to every slice and cost collected before
    /// it.
    pub async fn generate(
        &self,
        request: GenerateRequest,
        ctx: RunContext,
    ) -> Result<RunOutcome, GenerateError> {
        let _guard = self.begin()?;
        self.validate(&request)?;

        let events = EventSink::new(ctx.events);
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.settings.default_model.clone());
        let total = request.iterations;
        let mut state = RunState::new();
        info!(
            event = "generation.run_started",
            domain = "generation",
            run_id = %state.run_id,
            model = model.as_str(),
            iterations = total,
            description_chars = request.description.chars().count() as u64,
            contract = ?self.settings.contract
        );

        for iteration in 1..=total {
            events.emit(GenerationEvent::IterationStarted { iteration, total });
            let outcome = if ctx.abort.is_aborted() {
                Err(PipelineError::Cancelled)
            } else {
                self.run_iteration(&request, &model, iteration, &events, &ctx.abort)
                    .await
            };

            match outcome {
                Ok((slices, cost)) => {
                    let count = slices.len();
                    state.record_iteration(slices, cost);
                    info!(
                        event = "generation.iteration_completed",
                        domain = "generation",
                        run_id = %state.run_id,
                        iteration = iteration,
                        slices = count as u64,
                        cost = cost,
                        total_cost = state.total_cost
                    );
                    events.emit(GenerationEvent::IterationCompleted {
                        iteration,
                        slices: count,
                        cost,
                        total_cost: state.total_cost,
                    });
                }
                Err(error) => {
                    warn!(
                        event = "generation.run_halted",
                        domain = "generation",
                        run_id = %state.run_id,
                        iteration = iteration,
                        code = error.code(),
                        kept_slices = state.collected_slices.len() as u64,
                        error = %error
                    );
                    events.emit(GenerationEvent::RunHalted {
                        iteration,
                        message: error.to_string(),
                    });
                    return Ok(state.finish(Some(IterationFailure { iteration, error })));
                }
            }
        }

        info!(
            event = "generation.run_completed",
            domain = "generation",
            run_id = %state.run_id,
            slices = state.collected_slices.len() as u64,
            total_cost = state.total_cost
        );
        Ok(state.finish(None))
    }

    async fn run_iteration(
        &self,
        request: &GenerateRequest,
        model: &str,
        iteration: u32,
        events: &EventSink,
        abort: &AbortSignal,
    ) -> Result<(Vec<Slice>, f64), PipelineError> {
        let contract = self.settings.contract;
        let messages = prompt::assemble(contract, &request.description, self.settings.hints());
        let build_request = |model: &str| {
            GenerationRequest::new(request.api_key.trim(), model, messages.clone())
                .max_tokens(self.settings.max_tokens)
                .temperature(self.settings.temperature)
                .response_format(contract.response_format())
        };

        let obtained = self
            .orchestrator
            .obtain(
                self.transport.as_ref(),
                self.delay.as_ref(),
                model,
                build_request,
                iteration,
                events,
                abort,
            )
            .await?;

        let parser = contract.parser();
        let slices = parser.parse(&obtained.result.content).inspect_err(|err| {
            warn!(
                event = "generation.parse_failed",
                domain = "generation",
                iteration = iteration,
                parser = parser.name(),
                reason = %err,
                content_len = err.raw().len() as u64
            );
        })?;
        if slices.len() > self.settings.max_slices as usize {
            warn!(
                event = "generation.slice_hint_exceeded",
                domain = "generation",
                iteration = iteration,
                slices = slices.len() as u64,
                max_slices = self.settings.max_slices
            );
        }

        let cost = self.prices.estimate(&obtained.result);
        debug!(
            event = "generation.cost_estimated",
            domain = "generation",
            iteration = iteration,
            served_by = obtained.result.model_id.as_str(),
            priced = self.prices.pricing(&obtained.result.model_id).is_some(),
            has_usage = obtained.result.usage.is_some(),
            cost = cost
        );
        Ok((slices, cost))
    }
}
