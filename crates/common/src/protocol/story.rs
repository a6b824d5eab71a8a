// Save-story request/response payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fixed, non-leaking error message reported for every failed save.
pub const SAVE_FAILED_MESSAGE: &str = "writing to CSF-file failed, is it a valid CSF-file?";

/// Payload of a `saveStoryRequest` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaveStoryPayload {
    /// Story id in `<componentKey>--<storyKey>` form.
    pub id: String,
    /// Story file path relative to the project root.
    pub import_path: String,
    /// When set, the story is saved as a new export with this name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Argument values to write into the story.
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl SaveStoryPayload {
    /// The `<storyKey>` part of the id: the segment following the first `--`.
    pub fn story_key(&self) -> Option<&str> {
        self.id.split("--").nth(1)
    }

    /// New export name for a save-as request. An empty name means an
    /// in-place update.
    pub fn new_story_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }
}

/// Payload of a `saveStoryResult` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SaveStoryResponse {
    pub id: String,
    pub success: bool,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsupported_extension: Option<String>,
}

impl SaveStoryResponse {
    pub fn saved(id: impl Into<String>) -> Self {
        Self { id: id.into(), success: true, error: None, unsupported_extension: None }
    }

    pub fn failed(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            error: Some(SAVE_FAILED_MESSAGE.to_string()),
            unsupported_extension: None,
        }
    }
}
