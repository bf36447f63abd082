//! Spell-check service client.
//!
//! The service takes form parameters `_charset_`, `mode`, `html`, `text` and
//! `cp` and answers with
//!
//! ```json
//! {"words": [{"start": 0, "chars": 3, "result": {"isCorrect": false, "suggestions": ["the"]}}]}
//! ```
//!
//! where `start`/`chars` address the submitted `text`.

use std::time::Duration;

use coral_rte_config::{HttpMethod, SpellCheckConfig};
use serde::{Deserialize, Serialize};

use crate::commands::Misspelling;

#[derive(Debug, thiserror::Error)]
pub enum SpellCheckError {
    #[error("spell check request failed: {0}")]
    Transport(String),
    #[error("spell check service answered with status {0}")]
    Status(u16),
    #[error("invalid spell check response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

impl SpellCheckError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SpellCheckError::Transport(_) => true,
            SpellCheckError::Status(code) => *code >= 500,
            SpellCheckError::InvalidResponse(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpellCheckRequest {
    pub charset: String,
    pub mode: String,
    pub html: String,
    pub text: String,
    pub content_path: Option<String>,
}

impl SpellCheckRequest {
    pub fn params(&self) -> Vec<(&'static str, &str)> {
        let mut params = vec![
            ("_charset_", self.charset.as_str()),
            ("mode", self.mode.as_str()),
            ("html", self.html.as_str()),
            ("text", self.text.as_str()),
        ];
        if let Some(cp) = &self.content_path {
            params.push(("cp", cp.as_str()));
        }
        params
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellCheckResponse {
    #[serde(default)]
    pub words: Vec<WordResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordResult {
    pub start: usize,
    pub chars: usize,
    pub result: WordVerdict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordVerdict {
    pub is_correct: bool,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl SpellCheckResponse {
    pub fn parse(body: &str) -> Result<Self, SpellCheckError> {
        Ok(serde_json::from_str(body)?)
    }

    pub fn misspellings(&self) -> Vec<Misspelling> {
        self.words
            .iter()
            .filter(|w| !w.result.is_correct)
            .map(|w| Misspelling {
                start: w.start,
                chars: w.chars,
                suggestions: w.result.suggestions.clone(),
            })
            .collect()
    }
}

/// Sends a request and returns the raw response body.
pub trait SpellCheckTransport {
    fn send(&self, request: &SpellCheckRequest) -> Result<String, SpellCheckError>;
}

pub struct HttpTransport {
    url: String,
    method: HttpMethod,
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(config: &SpellCheckConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("coral-rte/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            url: config.url.clone(),
            method: config.method,
            agent,
        }
    }
}

impl SpellCheckTransport for HttpTransport {
    fn send(&self, request: &SpellCheckRequest) -> Result<String, SpellCheckError> {
        let params = request.params();
        let response = match self.method {
            HttpMethod::Get => params
                .iter()
                .fold(self.agent.get(&self.url), |req, (key, value)| req.query(key, value))
                .call(),
            HttpMethod::Post => self.agent.post(&self.url).send_form(&params),
        };
        match response {
            Ok(response) => response
                .into_string()
                .map_err(|e| SpellCheckError::Transport(e.to_string())),
            Err(ureq::Error::Status(code, _)) => Err(SpellCheckError::Status(code)),
            Err(ureq::Error::Transport(transport)) => {
                Err(SpellCheckError::Transport(transport.to_string()))
            }
        }
    }
}

/// Send `request`, retrying up to `retries` more times on retryable errors.
pub fn check_with_retry(
    transport: &dyn SpellCheckTransport,
    request: &SpellCheckRequest,
    retries: u32,
) -> Result<SpellCheckResponse, SpellCheckError> {
    let mut attempt = 0;
    loop {
        let result = transport
            .send(request)
            .and_then(|body| SpellCheckResponse::parse(&body));
        match result {
            Err(err) if err.is_retryable() && attempt < retries => {
                attempt += 1;
                log::warn!("spell check attempt {attempt} failed: {err}, retrying");
            }
            other => return other,
        }
    }
}
