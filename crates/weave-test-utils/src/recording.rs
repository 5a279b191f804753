//! [`RecordingMemoryApi`]: an in-process Memory API double.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use weave_mcp::{AuthContext, BackendCall, BackendError, MemoryApi};

/// One call seen by a [`RecordingMemoryApi`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub call: BackendCall,
    pub auth: AuthContext,
}

/// Records every call and answers from a script.
///
/// Scripted answers are used in order; once exhausted every call is
/// answered with the fallback (an empty object unless changed).
///
/// # Example
///
/// ```rust,no_run
/// use serde_json::json;
/// use weave_test_utils::RecordingMemoryApi;
///
/// let api = RecordingMemoryApi::new().respond_with(json!({"memory_id": "m1"}));
/// assert_eq!(api.call_count(), 0);
/// ```
#[derive(Debug)]
pub struct RecordingMemoryApi {
    calls: Mutex<Vec<RecordedCall>>,
    script: Mutex<VecDeque<Result<Value, BackendError>>>,
    fallback: Value,
    delay: Option<Duration>,
}

impl Default for RecordingMemoryApi {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingMemoryApi {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            fallback: json!({}),
            delay: None,
        }
    }

    /// Answer every unscripted call with `value`.
    pub fn respond_with(mut self, value: Value) -> Self {
        self.fallback = value;
        self
    }

    /// Queue one answer.
    pub fn then(self, answer: Result<Value, BackendError>) -> Self {
        self.script
            .lock()
            .expect("RecordingMemoryApi: script lock poisoned")
            .push_back(answer);
        self
    }

    /// Queue a non-success status with the given message.
    pub fn then_status(self, status: u16, message: &str) -> Self {
        self.then(Err(BackendError::Status {
            status,
            message: message.to_string(),
        }))
    }

    /// Sleep before answering, to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .expect("RecordingMemoryApi: calls lock poisoned")
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }

    /// The only call made.
    ///
    /// # Panics
    /// Panics unless exactly one call was recorded.
    pub fn single_call(&self) -> RecordedCall {
        let calls = self.calls();
        assert_eq!(calls.len(), 1, "Expected exactly one Memory API call, got {}", calls.len());
        calls.into_iter().next().expect("length checked above")
    }
}

#[async_trait]
impl MemoryApi for RecordingMemoryApi {
    async fn send(&self, call: &BackendCall, auth: &AuthContext) -> Result<Value, BackendError> {
        self.calls
            .lock()
            .expect("RecordingMemoryApi: calls lock poisoned")
            .push(RecordedCall {
                call: call.clone(),
                auth: auth.clone(),
            });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .script
            .lock()
            .expect("RecordingMemoryApi: script lock poisoned")
            .pop_front();
        scripted.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}
