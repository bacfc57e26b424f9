//! Generation provider integration.
//!
//! The provider accepts a generation request and reports progress and
//! terminal outcomes asynchronously via callbacks to `/webhooks/generation`.

mod client;
mod types;

pub use client::{GenerationClient, ProviderError};
pub use types::{SubmitEnvelope, SubmitRequest, TaskData};
