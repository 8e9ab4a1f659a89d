use std::fmt;

/// Why an LLM call failed, so callers can decide between a fallback and
/// surfacing the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// 401/403
    Auth,
    /// 429
    RateLimit,
    /// 404, usually a bad endpoint or model name.
    NotFound,
    /// 408 or client-side timeout.
    Timeout,
    /// Connection refused, DNS failure, reset.
    Network,
    /// 5xx
    ServerError,
    /// 2xx with a body that is not `{content: [{text}]}`.
    MalformedResponse,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

const MAX_BODY_CHARS: usize = 300;

impl LlmError {
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            401 | 403 => LlmErrorKind::Auth,
            404 => LlmErrorKind::NotFound,
            408 => LlmErrorKind::Timeout,
            429 => LlmErrorKind::RateLimit,
            500..=599 => LlmErrorKind::ServerError,
            _ => LlmErrorKind::Unknown,
        };
        Self {
            kind,
            status: Some(status),
            message: truncate_body(body),
        }
    }

    pub fn network(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            LlmErrorKind::Timeout
        } else {
            LlmErrorKind::Network
        };
        Self {
            kind,
            status: None,
            message: err.to_string(),
        }
    }

    /// No backend could be reached at all.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: LlmErrorKind::Network,
            status: None,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: LlmErrorKind::MalformedResponse,
            status: None,
            message: message.into(),
        }
    }

    /// Short text suitable for a user-facing notification.
    pub fn user_message(&self) -> String {
        match self.kind {
            LlmErrorKind::Auth => "The style advisor rejected our credentials.".to_string(),
            LlmErrorKind::RateLimit => {
                "The style advisor is busy right now. Try again in a moment.".to_string()
            }
            LlmErrorKind::NotFound => "The style advisor endpoint could not be found.".to_string(),
            LlmErrorKind::Timeout => "The style advisor took too long to answer.".to_string(),
            LlmErrorKind::Network => "Failed to connect to AI service.".to_string(),
            LlmErrorKind::ServerError => "The style advisor is having problems.".to_string(),
            LlmErrorKind::MalformedResponse => {
                "The style advisor returned an unexpected answer.".to_string()
            }
            LlmErrorKind::Unknown => format!("AI request failed: {}", self.message),
        }
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "LLM request failed ({status}): {}", self.message),
            None => write!(f, "LLM request failed: {}", self.message),
        }
    }
}

impl std::error::Error for LlmError {}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_BODY_CHARS {
        return trimmed.to_string();
    }
    let mut truncated: String = trimmed.chars().take(MAX_BODY_CHARS).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_status_codes() {
        assert_eq!(LlmError::from_status(401, "").kind, LlmErrorKind::Auth);
        assert_eq!(LlmError::from_status(429, "").kind, LlmErrorKind::RateLimit);
        assert_eq!(LlmError::from_status(503, "").kind, LlmErrorKind::ServerError);
        assert_eq!(LlmError::from_status(418, "").kind, LlmErrorKind::Unknown);
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(1000);
        let err = LlmError::from_status(500, &body);
        assert_eq!(err.message.chars().count(), MAX_BODY_CHARS + 3);
        assert!(err.to_string().starts_with("LLM request failed (500)"));
    }
}
