use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Width of the coarse time bucket folded into derived request ids.
/// Idempotent retries landing in the same bucket share an identity.
const ID_TIME_BUCKET_MS: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextKind {
    Raw,
    Structured,
}

impl TextKind {
    fn tag(self) -> &'static str {
        match self {
            TextKind::Raw => "raw",
            TextKind::Structured => "structured",
        }
    }
}

/// Wire shape of the `inject` message payload. Everything is optional; the
/// queue decides what an unusable payload means.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InjectPayload {
    pub id: Option<String>,
    pub text: Option<String>,
    pub kind: Option<TextKind>,
    pub html: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InjectionRequest {
    pub id: String,
    pub text: String,
    pub kind: TextKind,
    pub html: Option<String>,
    pub enqueued_at: DateTime<Utc>,
}

impl InjectionRequest {
    pub fn from_payload(payload: InjectPayload) -> Self {
        let now = Utc::now();
        let kind = payload.kind.unwrap_or(TextKind::Raw);
        let text = payload.text.unwrap_or_default();
        let id = payload
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| derive_id(kind, &text, payload.html.as_deref(), now));

        Self {
            id,
            text,
            kind,
            html: payload.html,
            enqueued_at: now,
        }
    }
}

/// Deterministic id for producers that supply none: kind + content
/// fingerprint + coarse time bucket.
pub fn derive_id(kind: TextKind, text: &str, html: Option<&str>, at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.tag().as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    if let Some(html) = html {
        hasher.update([0u8]);
        hasher.update(html.as_bytes());
    }
    let digest = hasher.finalize();
    let fingerprint: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
    let bucket = at.timestamp_millis() / ID_TIME_BUCKET_MS;

    format!("{}-{}-{}", kind.tag(), fingerprint, bucket)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeReason {
    Success,
    InvalidPayload,
    DuplicateRequest,
    CooldownActive,
    PositionTooOld,
    NoExternalPosition,
    Timeout,
    InjectionError,
}

/// Admission reply. Sent to the surface before any terminal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<OutcomeReason>,
}

impl Ack {
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub fn rejected(reason: OutcomeReason) -> Self {
        Self {
            accepted: false,
            reason: Some(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionOutcome {
    pub id: String,
    pub success: bool,
    pub reason: OutcomeReason,
    pub timestamp: DateTime<Utc>,
}

impl InjectionOutcome {
    pub fn success(id: &str) -> Self {
        Self {
            id: id.to_string(),
            success: true,
            reason: OutcomeReason::Success,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(id: &str, reason: OutcomeReason) -> Self {
        Self {
            id: id.to_string(),
            success: false,
            reason,
            timestamp: Utc::now(),
        }
    }
}
