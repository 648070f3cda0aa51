//! Fakes shared by the unit tests in this crate.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use vertiprompt_harness::{
    ChatTransport, GenerationRequest, GenerationResult, ModelDescriptor, TokenUsage,
    TransportError,
};

use crate::delay::Delay;
use crate::run::AbortHandle;

pub(crate) fn status(code: u16) -> TransportError {
    TransportError::status(code, serde_json::json!({"error": {"message": format!("status {code}")}}))
}

pub(crate) fn ok_result(model: &str, content: &str) -> GenerationResult {
    GenerationResult {
        model_id: model.to_string(),
        usage: None,
        content: content.to_string(),
    }
}

pub(crate) fn ok_with_usage(
    model: &str,
    content: &str,
    prompt_tokens: u64,
    completion_tokens: u64,
) -> GenerationResult {
    GenerationResult {
        usage: Some(TokenUsage {
            prompt_tokens,
            completion_tokens,
        }),
        ..ok_result(model, content)
    }
}

pub(crate) fn slices_json(titles: &[&str]) -> String {
    let slices: Vec<_> = titles
        .iter()
        .map(|t| serde_json::json!({"title": t, "prompt": format!("# Goal\n{t}")}))
        .collect();
    serde_json::json!({ "slices": slices }).to_string()
}

/// Transport that replays a script of outcomes and records every request.
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Result<GenerationResult, TransportError>>>,
    repeat: Option<Result<GenerationResult, TransportError>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(script: Vec<Result<GenerationResult, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Returns `outcome` for every call.
    pub(crate) fn repeating(outcome: Result<GenerationResult, TransportError>) -> Self {
        Self {
            repeat: Some(outcome),
            ..Self::new(Vec::new())
        }
    }

    pub(crate) fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub(crate) fn models(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.model).collect()
    }
}

#[async_trait::async_trait]
impl ChatTransport for ScriptedTransport {
    async fn list_models(&self) -> Vec<ModelDescriptor> {
        Vec::new()
    }

    async fn complete_chat(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResult, TransportError> {
        self.requests.lock().expect("requests lock").push(request);
        let next = self.script.lock().expect("script lock").pop_front();
        match (next, &self.repeat) {
            (Some(outcome), _) => outcome,
            (None, Some(outcome)) => outcome.clone(),
            (None, None) => Err(TransportError::protocol("script exhausted")),
        }
    }
}

/// Delay that records requested waits and returns immediately.
#[derive(Default)]
pub(crate) struct RecordingDelay {
    waits: Mutex<Vec<Duration>>,
    abort_on_wait: Option<AbortHandle>,
}

impl RecordingDelay {
    /// Aborts the run on the first wait and then never finishes waiting.
    pub(crate) fn aborting_with(handle: AbortHandle) -> Self {
        Self {
            waits: Mutex::new(Vec::new()),
            abort_on_wait: Some(handle),
        }
    }

    pub(crate) fn waits(&self) -> Vec<Duration> {
        self.waits.lock().expect("waits lock").clone()
    }
}

#[async_trait::async_trait]
impl Delay for RecordingDelay {
    async fn wait(&self, duration: Duration) {
        self.waits.lock().expect("waits lock").push(duration);
        if let Some(handle) = &self.abort_on_wait {
            handle.abort();
            std::future::pending::<()>().await;
        }
    }
}
