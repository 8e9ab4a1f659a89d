//! Test infrastructure: a scripted LLM client and a fully wired in-memory
//! application state.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::llm::{LlmClient, LlmError, LlmRequest};
use crate::settings::{AdvisorSettings, SettingsStore};
use crate::store::{MemoryStore, Store};
use crate::AppState;

/// LLM client that replays a FIFO queue of scripted answers and records
/// every request it receives. An exhausted script answers with a network
/// error.
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    pub call_log: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    pub fn with_responses(responses: Vec<Result<String, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            call_log: Mutex::new(Vec::new()),
        }
    }

    /// Script of successful text answers.
    pub fn with_texts<S: Into<String>>(texts: Vec<S>) -> Self {
        Self::with_responses(texts.into_iter().map(|t| Ok(t.into())).collect())
    }

    pub async fn push(&self, response: Result<String, LlmError>) {
        self.responses.lock().await.push_back(response);
    }

    pub async fn calls(&self) -> Vec<LlmRequest> {
        self.call_log.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.call_log.lock().await.len()
    }
}

impl Default for ScriptedLlm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: LlmRequest) -> Result<String, LlmError> {
        self.call_log.lock().await.push(request);
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::unavailable("no scripted response left")))
    }
}

/// Settings for tests: no batch delay, everything else default.
pub fn test_settings() -> AdvisorSettings {
    AdvisorSettings {
        batch_delay_ms: 0,
        ..AdvisorSettings::default()
    }
}

/// An [`AppState`] over an in-memory store and the given scripted client.
pub async fn test_state(llm: Arc<ScriptedLlm>) -> AppState {
    let store = Store::open(Arc::new(MemoryStore::new()))
        .await
        .expect("in-memory store opens");
    let settings = SettingsStore::in_memory(PathBuf::from("settings.json"), test_settings());
    AppState::with_parts(store, llm, settings)
}
