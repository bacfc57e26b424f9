//! Generation provider wire types.

use serde::{Deserialize, Serialize};

/// Request body for submitting a generation task.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    /// The generation prompt.
    pub prompt: String,

    /// Provider model name (e.g. `"veo3_fast"`).
    pub model: String,

    /// Frame orientation, `"9:16"` or `"16:9"`.
    pub aspect_ratio: String,

    /// Clip length in seconds.
    pub duration: u32,

    /// Reference images, if any.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub image_urls: Vec<String>,

    /// Where the provider should post status callbacks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_back_url: Option<String>,
}

/// The provider's response envelope.
#[derive(Debug, Deserialize)]
pub struct SubmitEnvelope {
    /// Provider status code; 200 means accepted.
    pub code: i64,

    /// Provider message, populated on errors.
    #[serde(default)]
    pub msg: Option<String>,

    /// Task data, present when accepted.
    #[serde(default)]
    pub data: Option<TaskData>,
}

/// Task identification returned by the provider.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskData {
    /// The provider's task id, echoed in callbacks.
    pub task_id: String,
}
