//! Design generators: where candidate designs come from.
//!
//! [CommandDesignGenerator] runs an external agent with the context on stdin.
//! [ChatCompletionGenerator] asks an OpenAI-compatible chat endpoint.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::config::{AgentBackend, ChatAgentConfig, CommandAgentConfig};
use crate::design_parse::parse_design_response;
use crate::error::GenerationError;
use crate::types::Design;

/// File an agent may write its design into, under its stage directory.
pub const STAGED_DESIGN_FILE: &str = "design.json";

/// A parsed design and the model text it came from.
#[derive(Debug, Clone)]
pub struct GeneratedDesign {
  pub design: Design,
  pub raw_response: String,
}

/// Produces one design per call from a context string.
#[async_trait]
pub trait DesignGenerator: Send + Sync {
  async fn generate(&self, context: &str) -> Result<GeneratedDesign, GenerationError>;
}

#[async_trait]
impl<T: DesignGenerator + ?Sized> DesignGenerator for Box<T> {
  async fn generate(&self, context: &str) -> Result<GeneratedDesign, GenerationError> {
    (**self).generate(context).await
  }
}

/// Builds the generator named by the config backend.
pub fn from_backend(backend: &AgentBackend) -> Result<Box<dyn DesignGenerator>, GenerationError> {
  Ok(match backend {
    AgentBackend::Command(c) => Box::new(CommandDesignGenerator::new(c)),
    AgentBackend::Chat(c) => Box::new(ChatCompletionGenerator::new(c)?),
  })
}

fn parsed(raw: String) -> Result<GeneratedDesign, GenerationError> {
  let design = parse_design_response(&raw)?;
  Ok(GeneratedDesign {
    design,
    raw_response: raw,
  })
}

/// Runs the agent command with the context as stdin.
#[derive(Debug, Clone)]
pub struct CommandDesignGenerator {
  agent_cmd: String,
  stage_dir: Option<PathBuf>,
}

impl CommandDesignGenerator {
  pub fn new(config: &CommandAgentConfig) -> Self {
    Self {
      agent_cmd: config.agent_cmd.clone(),
      stage_dir: config.stage_dir.clone(),
    }
  }

  fn staged_design(&self) -> Option<PathBuf> {
    self
      .stage_dir
      .as_deref()
      .map(|d| d.join(STAGED_DESIGN_FILE))
  }
}

/// Reads a staged design file, if the agent wrote one.
async fn read_staged(path: &Path) -> Option<String> {
  match tokio::fs::read_to_string(path).await {
    Ok(s) => Some(s),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
    Err(e) => {
      warn!(path = %path.display(), error = %e, "staged design unreadable, using stdout");
      None
    }
  }
}

#[async_trait]
impl DesignGenerator for CommandDesignGenerator {
  #[instrument(level = "trace", skip(self, context))]
  async fn generate(&self, context: &str) -> Result<GeneratedDesign, GenerationError> {
    let parts: Vec<&str> = self.agent_cmd.split_whitespace().collect();
    let Some((bin, args)) = parts.split_first() else {
      return Err(GenerationError::Agent("agent_cmd is empty".to_string()));
    };

    let staged = self.staged_design();
    if let Some(path) = &staged {
      if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
          .await
          .map_err(|e| GenerationError::Agent(format!("stage dir: {}", e)))?;
      }
      // A design left over from the previous iteration must not be picked up again.
      let _ = tokio::fs::remove_file(path).await;
    }

    let mut child = Command::new(bin)
      .args(args)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::inherit())
      .kill_on_drop(true)
      .spawn()
      .map_err(|e| GenerationError::Agent(format!("agent spawn: {}", e)))?;

    if let Some(mut stdin) = child.stdin.take() {
      stdin
        .write_all(context.as_bytes())
        .await
        .map_err(|e| GenerationError::Agent(format!("agent stdin: {}", e)))?;
      stdin
        .write_all(b"\n")
        .await
        .map_err(|e| GenerationError::Agent(format!("agent stdin: {}", e)))?;
    }

    let output = child
      .wait_with_output()
      .await
      .map_err(|e| GenerationError::Agent(format!("agent wait: {}", e)))?;
    if !output.status.success() {
      let msg = output
        .status
        .code()
        .map(|c| format!("agent exit {}", c))
        .unwrap_or_else(|| "agent signal".to_string());
      return Err(GenerationError::Agent(msg));
    }

    let raw = match &staged {
      Some(path) => match read_staged(path).await {
        Some(s) => {
          debug!(path = %path.display(), "design read from stage dir");
          s
        }
        None => String::from_utf8_lossy(&output.stdout).into_owned(),
      },
      None => String::from_utf8_lossy(&output.stdout).into_owned(),
    };
    info!(bytes = raw.len(), "agent answered");
    parsed(raw)
  }
}

/// OpenAI-compatible chat-completions client.
#[derive(Debug, Clone)]
pub struct ChatCompletionGenerator {
  client: Client,
  url: String,
  model: String,
  api_key: Option<String>,
  temperature: f32,
  max_tokens: u32,
  system_message: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
  message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
  #[serde(default)]
  content: Option<String>,
}

/// Appends `/chat/completions` unless the endpoint already names it.
pub(crate) fn resolve_chat_endpoint(endpoint: &str) -> String {
  if endpoint.contains("/chat/completions") {
    endpoint.to_string()
  } else {
    format!("{}/chat/completions", endpoint.trim_end_matches('/'))
  }
}

impl ChatCompletionGenerator {
  pub fn new(config: &ChatAgentConfig) -> Result<Self, GenerationError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.request_timeout_secs))
      .build()
      .map_err(|e| GenerationError::Request(format!("failed to build HTTP client: {}", e)))?;
    let api_key = std::env::var(&config.api_key_env)
      .ok()
      .filter(|k| !k.trim().is_empty());
    if api_key.is_none() {
      warn!(env = %config.api_key_env, "no API key set, sending unauthenticated requests");
    }
    Ok(Self {
      client,
      url: resolve_chat_endpoint(&config.endpoint),
      model: config.model.clone(),
      api_key,
      temperature: config.temperature,
      max_tokens: config.max_tokens,
      system_message: config.system_message.clone(),
    })
  }

  /// Request body for one design request.
  pub(crate) fn request_body(&self, context: &str) -> serde_json::Value {
    let mut messages = Vec::new();
    if !self.system_message.trim().is_empty() {
      messages.push(json!({ "role": "system", "content": self.system_message }));
    }
    messages.push(json!({ "role": "user", "content": context }));
    json!({
      "model": self.model,
      "messages": messages,
      "temperature": self.temperature,
      "max_tokens": self.max_tokens,
      "response_format": { "type": "json_object" },
    })
  }
}

/// Text of the first choice.
pub(crate) fn first_choice_text(body: &str) -> Result<String, GenerationError> {
  let response: ChatResponse = serde_json::from_str(body)
    .map_err(|e| GenerationError::Request(format!("invalid chat response: {}", e)))?;
  response
    .choices
    .into_iter()
    .next()
    .and_then(|c| c.message.content)
    .ok_or_else(|| GenerationError::Request("chat response did not include content".to_string()))
}

#[async_trait]
impl DesignGenerator for ChatCompletionGenerator {
  #[instrument(level = "trace", skip(self, context))]
  async fn generate(&self, context: &str) -> Result<GeneratedDesign, GenerationError> {
    info!(model = %self.model, "requesting process design");
    let mut request = self.client.post(&self.url).json(&self.request_body(context));
    if let Some(key) = &self.api_key {
      request = request.bearer_auth(key);
    }
    let response = request
      .send()
      .await
      .map_err(|e| GenerationError::Request(e.to_string()))?;
    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| GenerationError::Request(e.to_string()))?;
    if !status.is_success() {
      let snippet: String = body.chars().take(320).collect();
      return Err(GenerationError::Request(format!("{}: {}", status, snippet)));
    }
    parsed(first_choice_text(&body)?)
  }
}
