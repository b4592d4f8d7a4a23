//! Provider data model.
//!
//! These types mirror the JSON the scanning provider serves. Keys on the
//! wire are camelCase.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Lifecycle state of a provider-side prescription session.
///
/// Decoding is lenient: `inactive`, `none` and `completed` (any case) mean
/// inactive; any other value means the session exists and is usable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum SessionStatus {
    #[default]
    Active,
    Inactive,
}

impl From<String> for SessionStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "inactive" | "none" | "completed" => Self::Inactive,
            _ => Self::Active,
        }
    }
}

/// A prescription session as reported by the provider.
///
/// At most one session is active at a time. The provider owns it; this
/// client only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionSession {
    pub session_id: String,
    #[serde(default)]
    pub patient_info: String,
    #[serde(default)]
    pub drug_count: u32,
    #[serde(default)]
    pub status: SessionStatus,
}

impl PrescriptionSession {
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}

/// Payload of `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub session: Option<PrescriptionSession>,
}

// ---------------------------------------------------------------------------
// Drugs
// ---------------------------------------------------------------------------

/// One scanned drug, exactly as the provider spelled it.
///
/// Order in a list is significant: it is the order the drugs are typed
/// into the prescription software.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrugEntry(String);

impl DrugEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DrugEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DrugEntry {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ---------------------------------------------------------------------------
// Send / complete
// ---------------------------------------------------------------------------

/// Acknowledgement returned by `POST /prescription/send`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendAck {
    #[serde(default)]
    pub message: Option<String>,
}

/// Summary returned by `POST /prescription/complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionSummary {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub drug_count: u32,
    /// Session duration in milliseconds.
    #[serde(default, rename = "duration")]
    pub duration_ms: u64,
}
