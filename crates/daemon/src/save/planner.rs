// Edit planning: update a story in place or duplicate it under a new name.

use storysave_common::csf::{CsfFile, MutationTarget};

use crate::save::fault::SaveFault;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditPlan {
    UpdateInPlace { export_name: String },
    DuplicateThenTarget { source: String, new_name: String },
}

impl EditPlan {
    /// Build the plan for a located story. No file is touched.
    pub fn new(located: impl Into<String>, new_name: Option<&str>) -> Self {
        match new_name {
            Some(new_name) => {
                Self::DuplicateThenTarget { source: located.into(), new_name: new_name.to_string() }
            }
            None => Self::UpdateInPlace { export_name: located.into() },
        }
    }

    /// Carry out the plan against `file` and hand back the story that the
    /// args should be written to.
    pub fn execute(&self, file: &mut CsfFile) -> Result<MutationTarget, SaveFault> {
        match self {
            Self::UpdateInPlace { export_name } => {
                file.story_target(export_name).ok_or_else(|| SaveFault::StoryNotFound {
                    story_key: export_name.clone(),
                })
            }
            Self::DuplicateThenTarget { source, new_name } => {
                file.duplicate_story(source, new_name).map_err(|error| SaveFault::Duplicate {
                    source_export: source.clone(),
                    new_name: new_name.clone(),
                    source: error,
                })
            }
        }
    }
}
