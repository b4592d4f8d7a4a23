//! HTTP client for the drug-scanning provider.
//!
//! Wraps the provider's small REST surface (status, drug list, session
//! start/send/complete) behind the [`api::SessionProvider`] trait, with a
//! bounded retry policy for idempotent reads.

pub mod api;
pub mod error;
pub mod messages;
pub mod retry;

pub use api::{RemoteSessionClient, SessionProvider};
pub use error::ProviderError;
