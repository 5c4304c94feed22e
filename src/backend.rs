//! Model backends - turn a prompt into raw candidate text
//!
//! Two Ollama transports: the `ollama run` CLI (default) and the local HTTP
//! API. Both block until the model answers; there is no cancellation.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::process::{Command, Stdio};

use crate::config::{BackendKind, Settings};
use crate::error::{GenieError, Result};

/// A text-generation service
pub trait Backend {
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Build the backend selected by the settings
pub fn from_settings(settings: &Settings) -> Box<dyn Backend> {
    match settings.backend {
        BackendKind::Cli => Box::new(OllamaCli::new(&settings.ollama_bin, &settings.model)),
        BackendKind::Http => Box::new(OllamaHttp::new(&settings.ollama_url, &settings.model)),
    }
}

/// Runs `<program> run <model> <prompt>` and returns its stdout
pub struct OllamaCli {
    program: String,
    model: String,
}

impl OllamaCli {
    pub fn new(program: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            model: model.into(),
        }
    }
}

impl Backend for OllamaCli {
    fn generate(&self, prompt: &str) -> Result<String> {
        tracing::debug!(program = %self.program, model = %self.model, "calling ollama cli");

        let output = Command::new(&self.program)
            .arg("run")
            .arg(&self.model)
            .arg(prompt)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| GenieError::Backend(format!("cannot start {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GenieError::Backend(format!(
                "{} run {} failed ({}): {}",
                self.program,
                self.model,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

/// Calls the Ollama HTTP API (`POST /api/generate`, non-streaming)
pub struct OllamaHttp {
    client: reqwest::blocking::Client,
    url: String,
    model: String,
}

impl OllamaHttp {
    pub fn new(base_url: &str, model: impl Into<String>) -> Self {
        Self::with_client(reqwest::blocking::Client::new(), base_url, model)
    }

    pub fn with_client(
        client: reqwest::blocking::Client,
        base_url: &str,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            url: generate_url(base_url),
            model: model.into(),
        }
    }
}

// OLLAMA_HOST is commonly set without a scheme
fn generate_url(base_url: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    if base.starts_with("http://") || base.starts_with("https://") {
        format!("{}/api/generate", base)
    } else {
        format!("http://{}/api/generate", base)
    }
}

impl Backend for OllamaHttp {
    fn generate(&self, prompt: &str) -> Result<String> {
        tracing::debug!(url = %self.url, model = %self.model, "calling ollama http api");

        let request_body = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request_body)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| GenieError::Backend(format!("Ollama request failed: {}", e)))?
            .json::<OllamaResponse>()
            .map_err(|e| GenieError::Backend(format!("Failed to parse response: {}", e)))?;

        Ok(response.response.trim().to_string())
    }
}

/// Backend that replays canned responses (for testing)
#[derive(Default)]
pub struct ScriptedBackend {
    responses: RefCell<VecDeque<std::result::Result<String, String>>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: RefCell::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    /// A backend whose next call fails
    pub fn failing(message: impl Into<String>) -> Self {
        let backend = Self::default();
        backend.responses.borrow_mut().push_back(Err(message.into()));
        backend
    }

    /// Prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl Backend for ScriptedBackend {
    fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.borrow_mut().push(prompt.to_string());
        match self.responses.borrow_mut().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(GenieError::Backend(message)),
            None => Err(GenieError::Backend("no scripted response left".to_string())),
        }
    }
}
