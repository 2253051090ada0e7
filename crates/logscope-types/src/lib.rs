//! Shared types for logscope
//!
//! This crate contains data structures used across multiple logscope crates:
//! the domain model for log records, the wire format returned by the backend,
//! and the partial-update payload accepted by it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Severity & Classification
// ============================================================================

/// Log severity level
///
/// The backend stores levels as free-form strings. The four values the agents
/// actually emit get their own variants; anything else passes through
/// verbatim in `Other` so an unrecognized level is still filterable.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Information,
    Warning,
    Error,
    Critical,
    Other(String),
}

impl LogLevel {
    /// Parse a level from common formats
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "information" | "info" => Self::Information,
            "warning" | "warn" => Self::Warning,
            "error" | "err" => Self::Error,
            "critical" | "crit" => Self::Critical,
            _ => Self::Other(s.to_string()),
        }
    }

    /// Canonical display string
    pub fn as_str(&self) -> &str {
        match self {
            Self::Information => "Information",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Critical => "Critical",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Classification assigned to a record by an operator or the upstream model
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Normal,
    Suspicious,
    Anomaly,
    Critical,
}

impl Classification {
    /// Parse a classification string; unknown values mean "unclassified"
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Some(Self::Normal),
            "suspicious" => Some(Self::Suspicious),
            "anomaly" => Some(Self::Anomaly),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Suspicious => "suspicious",
            Self::Anomaly => "anomaly",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown classification: {s}"))
    }
}

// ============================================================================
// Log Records
// ============================================================================

/// A single security log record as held in the client window
#[derive(Clone, Debug)]
pub struct LogRecord {
    /// Unique identifier, backend-assigned (generated locally when absent)
    pub id: String,

    /// Source-system record number; not unique across agents
    pub record_id: u64,

    /// Agent that ingested the event
    pub agent_id: String,

    /// Numeric event identifier
    pub event_id: u32,

    /// When the event occurred
    pub timestamp: DateTime<Utc>,

    /// Log channel (e.g. "Security", "Application")
    pub channel: String,

    /// Event provider / source name
    pub provider: String,

    /// Host the event was recorded on
    pub event_host: String,

    /// User SID, when the event carries one
    pub user_sid: Option<String>,

    /// Severity level
    pub level: LogLevel,

    /// Message body, one entry per line
    pub message: Vec<String>,

    /// Operator alert flag, independent of `level`
    pub alert: bool,

    /// Marks the record for follow-up
    pub trigger: bool,

    /// Classification; `None` means unclassified
    pub classification: Option<Classification>,
}

impl LogRecord {
    /// Message lines joined to a single line, with a placeholder when the
    /// record arrived without a body
    pub fn display_message(&self) -> String {
        if self.message.is_empty() {
            "(no message)".to_string()
        } else {
            self.message.join(" ")
        }
    }
}

// ============================================================================
// Wire Format
// ============================================================================

/// A log record as returned by the backend, prior to transformation
///
/// Every field is defaulted so a sparse document still deserializes; repair
/// of the sparse cases happens in [`into_record`].
///
/// [`into_record`]: WireRecord::into_record
#[derive(Clone, Debug, Deserialize)]
pub struct WireRecord {
    #[serde(default)]
    pub id: Option<String>,

    /// Mongo-style identifier older backend builds emit instead of `id`
    #[serde(rename = "_id", default)]
    pub object_id: Option<String>,

    #[serde(default)]
    pub agent_id: String,

    #[serde(default)]
    pub record_id: u64,

    #[serde(default)]
    pub timestamp: String,

    #[serde(default)]
    pub event_id: u32,

    #[serde(default)]
    pub channel: String,

    #[serde(default)]
    pub provider: String,

    #[serde(default)]
    pub event_host: String,

    #[serde(default)]
    pub user_sid: Option<String>,

    #[serde(default)]
    pub level: String,

    /// Numeric level code; the string form is authoritative
    #[serde(default)]
    pub level_code: Option<u32>,

    #[serde(default)]
    pub message: Vec<String>,

    #[serde(default)]
    pub alert: bool,

    #[serde(default)]
    pub ai_classification: Option<String>,

    #[serde(default)]
    pub trigger: bool,
}

impl WireRecord {
    /// Convert into a domain record
    ///
    /// Malformed input is repaired rather than rejected: an unparseable
    /// timestamp becomes the current time, and a missing id is generated
    /// locally so the record can still be keyed in the window.
    pub fn into_record(self) -> LogRecord {
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let id = self
            .id
            .filter(|s| !s.is_empty())
            .or(self.object_id.filter(|s| !s.is_empty()))
            .unwrap_or_else(|| format!("log-{}", Uuid::new_v4()));

        let classification = self
            .ai_classification
            .as_deref()
            .and_then(Classification::parse);

        LogRecord {
            id,
            record_id: self.record_id,
            agent_id: self.agent_id,
            event_id: self.event_id,
            timestamp,
            channel: self.channel,
            provider: self.provider,
            event_host: self.event_host,
            user_sid: self.user_sid,
            level: LogLevel::parse(&self.level),
            message: self.message,
            alert: self.alert,
            trigger: self.trigger,
            classification,
        }
    }
}

// ============================================================================
// Updates
// ============================================================================

/// Partial update payload for `PUT /logs/{id}`
///
/// Unset fields are omitted from the serialized body so the backend only
/// touches what the operator changed.
#[derive(Clone, Debug, Default, Serialize)]
pub struct LogUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<bool>,

    #[serde(rename = "ai_classification", skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
}

impl LogUpdate {
    /// True when no field is set; such payloads are rejected client-side
    pub fn is_empty(&self) -> bool {
        self.alert.is_none() && self.trigger.is_none() && self.classification.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(json: &str) -> WireRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_level_parse_known_and_passthrough() {
        assert_eq!(LogLevel::parse("Information"), LogLevel::Information);
        assert_eq!(LogLevel::parse("warning"), LogLevel::Warning);
        assert_eq!(LogLevel::parse("CRITICAL"), LogLevel::Critical);
        assert_eq!(
            LogLevel::parse("Verbose"),
            LogLevel::Other("Verbose".to_string())
        );
        assert_eq!(LogLevel::parse("Verbose").as_str(), "Verbose");
    }

    #[test]
    fn test_classification_parse() {
        assert_eq!(
            Classification::parse("suspicious"),
            Some(Classification::Suspicious)
        );
        assert_eq!(Classification::parse("Normal"), Some(Classification::Normal));
        assert_eq!(Classification::parse("benign"), None);
    }

    #[test]
    fn test_transform_full_record() {
        let record = wire(
            r#"{
                "id": "abc-1",
                "agent_id": "agent-7",
                "record_id": 42,
                "timestamp": "2024-06-01T12:30:00Z",
                "event_id": 4624,
                "channel": "Security",
                "provider": "Microsoft-Windows-Security-Auditing",
                "event_host": "WORKSTATION-1",
                "level": "Information",
                "message": ["An account was successfully logged on.", "Subject: S-1-0-0"],
                "alert": true,
                "ai_classification": "suspicious",
                "trigger": false
            }"#,
        )
        .into_record();

        assert_eq!(record.id, "abc-1");
        assert_eq!(record.event_id, 4624);
        assert_eq!(record.level, LogLevel::Information);
        assert_eq!(record.classification, Some(Classification::Suspicious));
        assert!(record.alert);
        assert_eq!(record.timestamp.to_rfc3339(), "2024-06-01T12:30:00+00:00");
    }

    #[test]
    fn test_transform_bad_timestamp_substitutes_now() {
        let before = Utc::now();
        let record =
            wire(r#"{"id": "x", "timestamp": "not-a-date", "level": "Error"}"#).into_record();
        assert!(record.timestamp >= before);
        assert!(record.timestamp <= Utc::now());
    }

    #[test]
    fn test_transform_missing_id_generates_one() {
        let a = wire(r#"{"timestamp": "2024-06-01T12:30:00Z"}"#).into_record();
        let b = wire(r#"{"timestamp": "2024-06-01T12:30:00Z"}"#).into_record();
        assert!(a.id.starts_with("log-"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_transform_object_id_fallback() {
        let record =
            wire(r#"{"_id": "mongo-9", "timestamp": "2024-06-01T12:30:00Z"}"#).into_record();
        assert_eq!(record.id, "mongo-9");
    }

    #[test]
    fn test_transform_defaults_flags_and_classification() {
        let record = wire(r#"{"id": "x", "timestamp": "2024-06-01T12:30:00Z"}"#).into_record();
        assert!(!record.alert);
        assert!(!record.trigger);
        assert_eq!(record.classification, None);
    }

    #[test]
    fn test_transform_unknown_classification_is_unclassified() {
        let record = wire(
            r#"{"id": "x", "timestamp": "2024-06-01T12:30:00Z", "ai_classification": "weird"}"#,
        )
        .into_record();
        assert_eq!(record.classification, None);
    }

    #[test]
    fn test_display_message_placeholder() {
        let mut record = wire(r#"{"id": "x", "timestamp": "2024-06-01T12:30:00Z"}"#).into_record();
        assert_eq!(record.display_message(), "(no message)");
        record.message = vec!["line one".to_string(), "line two".to_string()];
        assert_eq!(record.display_message(), "line one line two");
    }

    #[test]
    fn test_update_serialization_omits_unset_fields() {
        let update = LogUpdate {
            alert: Some(true),
            ..Default::default()
        };
        let body = serde_json::to_string(&update).unwrap();
        assert_eq!(body, r#"{"alert":true}"#);

        let update = LogUpdate {
            classification: Some(Classification::Anomaly),
            ..Default::default()
        };
        let body = serde_json::to_string(&update).unwrap();
        assert_eq!(body, r#"{"ai_classification":"anomaly"}"#);

        assert!(LogUpdate::default().is_empty());
    }
}
