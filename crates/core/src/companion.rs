//! Chat companion.
//!
//! Produces short supportive replies through an Ollama-compatible model. Messages that contain
//! crisis indicators are flagged and the reply always opens with a crisis-line signpost. When no
//! model is configured or the call fails, a fixed supportive reply is returned instead.
//!
//! [`OllamaModel`] uses the blocking `reqwest` client. Async callers must run
//! [`CompanionService::respond`] on a blocking thread.

use crate::config::CompanionConfig;
use crate::constants::MAX_MESSAGE_CHARS;
use crate::identity::Identity;
use crate::policy::{decide, Action, RosterLookup};
use crate::{CoreError, CoreResult};
use mindcare_types::NonEmptyText;
use mindcare_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You are a supportive mental-health companion inside a therapy app. \
Reply with warmth and empathy in no more than four sentences. You are not a therapist: do not \
diagnose, do not suggest medication, and encourage the person to raise anything serious with \
their therapist.";

pub const CRISIS_SIGNPOST: &str = "If you are thinking about harming yourself or are in \
immediate danger, please call your local emergency number or a crisis line now. You do not have \
to go through this alone.";

pub const FALLBACK_REPLY: &str = "Thank you for sharing that with me. I'm not able to respond \
properly right now, but what you are feeling matters. Consider writing it down in your mood log \
or bringing it to your next session with your therapist.";

const CRISIS_INDICATORS: &[&str] = &[
    "suicide",
    "suicidal",
    "kill myself",
    "killing myself",
    "end my life",
    "ending my life",
    "take my own life",
    "self-harm",
    "self harm",
    "hurt myself",
    "harm myself",
    "cutting myself",
    "want to die",
    "better off dead",
    "no reason to live",
];

/// Whether `text` contains any crisis indicator. Case-insensitive.
pub fn contains_crisis_indicator(text: &str) -> bool {
    let lowered = text.to_lowercase();
    CRISIS_INDICATORS
        .iter()
        .any(|indicator| lowered.contains(indicator))
}

/// Text generation backend.
pub trait CompanionModel: Send + Sync {
    fn generate(&self, prompt: &str, system: &str) -> CoreResult<String>;
}

/// Ollama `/api/generate` client.
pub struct OllamaModel {
    base_url: String,
    model: String,
    timeout_secs: u64,
}

impl OllamaModel {
    pub fn new(config: &CompanionConfig) -> Self {
        Self {
            base_url: config.base_url().to_string(),
            model: config.model().to_string(),
            timeout_secs: config.timeout_secs(),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl CompanionModel for OllamaModel {
    fn generate(&self, prompt: &str, system: &str) -> CoreResult<String> {
        // Built per call: a blocking client must not be created or dropped on an async worker.
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| CoreError::Companion(e.to_string()))?;

        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            stream: false,
        };

        let response = client.post(&url).json(&body).send().map_err(|e| {
            if e.is_timeout() {
                CoreError::Companion(format!("request timed out after {}s", self.timeout_secs))
            } else if e.is_connect() {
                CoreError::Companion(format!("cannot reach {}", self.base_url))
            } else {
                CoreError::Companion(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::Companion(format!(
                "model returned HTTP {}",
                status.as_u16()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| CoreError::Companion(format!("unreadable model response: {e}")))?;
        Ok(parsed.response)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    Model,
    Fallback,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanionReply {
    pub reply: String,
    pub crisis: bool,
    pub source: ReplySource,
}

#[derive(Clone)]
pub struct CompanionService {
    model: Option<Arc<dyn CompanionModel>>,
    roster: Arc<dyn RosterLookup + Send + Sync>,
}

impl CompanionService {
    pub fn new(
        model: Option<Arc<dyn CompanionModel>>,
        roster: Arc<dyn RosterLookup + Send + Sync>,
    ) -> Self {
        Self { model, roster }
    }

    pub fn is_configured(&self) -> bool {
        self.model.is_some()
    }

    /// Reply to a message from `caller`.
    ///
    /// Model failures never surface as errors; they produce the fallback reply.
    pub fn respond(&self, caller: &Identity, text: &NonEmptyText) -> CoreResult<CompanionReply> {
        decide(caller, &Action::UseCompanion, self.roster.as_ref())?.into_filter()?;
        if text.as_str().chars().count() > MAX_MESSAGE_CHARS {
            return Err(CoreError::InvalidInput(format!(
                "messages are limited to {MAX_MESSAGE_CHARS} characters"
            )));
        }

        let crisis = contains_crisis_indicator(text.as_str());
        if crisis {
            tracing::warn!(user_id = %caller.id, "crisis indicators in companion message");
        }

        let (body, source) = match self.generate(caller.id, text.as_str()) {
            Some(reply) => (reply, ReplySource::Model),
            None => (FALLBACK_REPLY.to_string(), ReplySource::Fallback),
        };

        let reply = if crisis {
            format!("{CRISIS_SIGNPOST}\n\n{body}")
        } else {
            body
        };
        Ok(CompanionReply {
            reply,
            crisis,
            source,
        })
    }

    fn generate(&self, user_id: RecordId, text: &str) -> Option<String> {
        let model = self.model.as_ref()?;
        match model.generate(text, SYSTEM_PROMPT) {
            Ok(reply) if !reply.trim().is_empty() => Some(reply.trim().to_string()),
            Ok(_) => {
                tracing::warn!(%user_id, "companion model returned an empty reply");
                None
            }
            Err(err) => {
                tracing::warn!(%user_id, "companion model failed, using fallback: {err}");
                None
            }
        }
    }
}
