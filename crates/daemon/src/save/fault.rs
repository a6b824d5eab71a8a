// Save fault taxonomy.

use std::path::PathBuf;

use serde::Serialize;
use storysave_common::csf::CsfError;
use storysave_common::path::PathError;
use thiserror::Error;

/// Everything that can stop a save. Each variant belongs to one
/// [`FaultKind`].
#[derive(Debug, Error)]
pub enum SaveFault {
    #[error("request payload could not be decoded")]
    InvalidRequest(#[source] serde_json::Error),

    #[error("import path `{import_path}` cannot be resolved under the project root")]
    InvalidPath {
        import_path: String,
        #[source]
        source: PathError,
    },

    #[error("failed to read `{}`", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse `{}`", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: CsfError,
    },

    #[error("story id `{story_id}` has no `--<story>` part")]
    MissingStoryKey { story_id: String },

    #[error("no story has an id ending in `--{story_key}`")]
    StoryNotFound { story_key: String },

    #[error("story key `{story_key}` matches several stories: {}", .candidates.join(", "))]
    AmbiguousStory { story_key: String, candidates: Vec<String> },

    #[error("failed to create story `{new_name}` from `{source_export}`")]
    Duplicate {
        source_export: String,
        new_name: String,
        #[source]
        source: CsfError,
    },

    #[error("failed to apply args to story `{export_name}`")]
    Mutation {
        export_name: String,
        #[source]
        source: CsfError,
    },

    #[error("failed to write `{}`", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// The request itself was malformed.
    Request,
    FileLoad,
    StoryNotFound,
    AmbiguousStory,
    Duplicate,
    Mutation,
    Write,
}

impl FaultKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::FileLoad => "file_load",
            Self::StoryNotFound => "story_not_found",
            Self::AmbiguousStory => "ambiguous_story",
            Self::Duplicate => "duplicate",
            Self::Mutation => "mutation",
            Self::Write => "write",
        }
    }
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SaveFault {
    pub fn kind(&self) -> FaultKind {
        match self {
            Self::InvalidRequest(_) => FaultKind::Request,
            Self::InvalidPath { .. } | Self::Read { .. } | Self::Parse { .. } => {
                FaultKind::FileLoad
            }
            Self::MissingStoryKey { .. } | Self::StoryNotFound { .. } => FaultKind::StoryNotFound,
            Self::AmbiguousStory { .. } => FaultKind::AmbiguousStory,
            Self::Duplicate { .. } => FaultKind::Duplicate,
            Self::Mutation { .. } => FaultKind::Mutation,
            Self::Write { .. } => FaultKind::Write,
        }
    }

    /// The fault message followed by every source in its chain.
    pub fn detail(&self) -> String {
        let mut detail = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }
        detail
    }
}
