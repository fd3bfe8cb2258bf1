use super::Check;
use crate::config::{CheckBase, SemanticConfig};
use crate::errors::{CheckFailure, RemoteServiceError};
use crate::segments::{Language, Segment};
use crate::types::{CheckId, RawFinding, Span};
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Serialize)]
struct SemanticRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    language: Language,
    excerpt: String,
}

#[derive(Debug, Deserialize)]
struct SemanticResponse {
    #[serde(default)]
    findings: Vec<RemoteFinding>,
}

#[derive(Debug, Deserialize)]
struct RemoteFinding {
    text: String,
    #[serde(default = "default_remote_confidence")]
    confidence: f64,
    /// Verbatim excerpt the finding refers to, used to locate it
    #[serde(default)]
    quote: Option<String>,
}

fn default_remote_confidence() -> f64 {
    1.0
}

/// Optional network-backed review of a document excerpt.
///
/// The only check that performs I/O. Each request has a hard timeout; transient
/// failures are retried up to `retry_budget` times with exponential backoff, and
/// exhaustion becomes a `CheckFailure` rather than aborting the run.
pub struct SemanticCheck {
    base: CheckBase,
    endpoint: String,
    api_key: String,
    model: Option<String>,
    language: Language,
    agent: ureq::Agent,
    retry_budget: u32,
    backoff_base: Duration,
    max_excerpt_chars: usize,
    min_confidence: f64,
}

impl SemanticCheck {
    /// `None` when the check lacks an endpoint or credentials and must not run.
    pub fn new(config: &SemanticConfig, language: Language) -> Option<Self> {
        let Some(endpoint) = config.endpoint.clone().filter(|e| !e.trim().is_empty()) else {
            warn!("semantic check [{language}] enabled without an endpoint; not running it");
            return None;
        };
        let Some(api_key) = config.resolve_api_key() else {
            warn!(
                "semantic check [{language}] has no credentials (set api_key or ${}); not running it",
                config.api_key_env
            );
            return None;
        };

        let timeout = Duration::from_millis(config.timeout_ms);
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout(timeout)
            .build();

        Some(Self {
            base: config.base.clone(),
            endpoint,
            api_key,
            model: config.model.clone(),
            language,
            agent,
            retry_budget: config.retry_budget,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            max_excerpt_chars: config.max_excerpt_chars,
            min_confidence: config.min_confidence,
        })
    }

    fn excerpt(&self, segments: &[Segment]) -> String {
        let joined = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        joined.chars().take(self.max_excerpt_chars).collect()
    }

    fn request(&self, body: &SemanticRequest<'_>) -> Result<SemanticResponse, RemoteServiceError> {
        let response = self
            .agent
            .post(&self.endpoint)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Accept", "application/json")
            .send_json(body);

        match response {
            Ok(response) => response
                .into_json::<SemanticResponse>()
                .map_err(|e| RemoteServiceError::MalformedResponse(e.to_string())),
            Err(ureq::Error::Status(code @ (401 | 403), _)) => Err(RemoteServiceError::Unauthorized(code)),
            Err(ureq::Error::Status(status, _)) => Err(RemoteServiceError::Status { status }),
            Err(ureq::Error::Transport(transport)) => Err(RemoteServiceError::Transport(transport.to_string())),
        }
    }

    /// First attempt plus `retry_budget` retries. Credential rejections are final.
    fn request_with_retry(&self, body: &SemanticRequest<'_>) -> Result<SemanticResponse, RemoteServiceError> {
        let attempts = self.retry_budget + 1;
        let mut last = String::new();

        for attempt in 0..attempts {
            match self.request(body) {
                Ok(response) => return Ok(response),
                Err(err @ RemoteServiceError::Unauthorized(_)) => return Err(err),
                Err(err) => {
                    warn!(
                        "semantic check [{}] attempt {}/{} failed: {err}",
                        self.language,
                        attempt + 1,
                        attempts
                    );
                    last = err.to_string();
                }
            }
            if attempt + 1 < attempts {
                let delay = self.backoff_base.saturating_mul(2u32.saturating_pow(attempt));
                debug!("semantic check backing off for {delay:?}");
                thread::sleep(delay);
            }
        }

        Err(RemoteServiceError::Exhausted { attempts, last })
    }

    fn locate<'a>(segments: &'a [Segment], quote: Option<&str>) -> (&'a Segment, Span) {
        if let Some(quote) = quote.map(str::trim).filter(|q| !q.is_empty()) {
            for segment in segments {
                if let Some(start) = segment.text.find(quote) {
                    return (segment, Span::new(start, start + quote.len()));
                }
            }
        }
        (&segments[0], Span::empty())
    }
}

impl Check for SemanticCheck {
    fn id(&self) -> CheckId {
        CheckId::Semantic
    }

    fn run(&self, segments: &[Segment]) -> Result<Vec<RawFinding>, CheckFailure> {
        if segments.is_empty() {
            return Ok(Vec::new());
        }
        let body = SemanticRequest {
            model: self.model.as_deref(),
            language: self.language,
            excerpt: self.excerpt(segments),
        };

        info!("🌐 Requesting semantic review [{}] from {}", self.language, self.endpoint);
        let response = self
            .request_with_retry(&body)
            .map_err(|e| CheckFailure::remote(self.id().as_str(), &e))?;

        let weight = self.base.weight_for(self.id());
        Ok(response
            .findings
            .into_iter()
            .filter(|f| !f.text.trim().is_empty() && f.confidence >= self.min_confidence)
            .filter(|f| !self.base.is_ignored(f.text.trim()))
            .map(|f| {
                let (segment, span) = Self::locate(segments, f.quote.as_deref());
                RawFinding::new(self.id(), segment, span, f.text.trim())
                    .with_confidence(f.confidence)
                    .with_severity_weight(weight)
            })
            .collect())
    }
}
