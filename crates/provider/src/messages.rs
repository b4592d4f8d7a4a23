//! Request and response envelopes for the provider endpoints.
//!
//! Data-model types shared with the orchestrator live in
//! [`rxentry_core::types`]; this module only holds the wrappers that
//! never leave the HTTP layer.

use rxentry_core::types::DrugEntry;
use serde::{Deserialize, Serialize};

/// Body of `POST /prescription/start`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest<'a> {
    pub patient_info: &'a str,
}

/// Response of `POST /prescription/start`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    pub session_id: String,
}

/// Response of `GET /prescription/drugs`.
#[derive(Debug, Deserialize)]
pub struct DrugListResponse {
    #[serde(default)]
    pub drugs: Vec<DrugEntry>,
    /// Provider-reported count; informational only.
    #[serde(default)]
    pub count: Option<usize>,
}
