// Story lookup by the story-key suffix of a request id.

use storysave_common::csf::{StoryRecord, StoryTable};

use crate::save::fault::SaveFault;

/// Find the unique story whose generated id ends with `--<story_key>`.
///
/// Every entry is checked; more than one match is a fault rather than a
/// first-wins pick.
pub fn find_story<'a>(table: &'a StoryTable, story_key: &str) -> Result<&'a StoryRecord, SaveFault> {
    let suffix = format!("--{story_key}");
    let matches: Vec<&StoryRecord> =
        table.values().filter(|record| record.generated_id.ends_with(&suffix)).collect();

    match matches.as_slice() {
        [record] => Ok(record),
        [] => Err(SaveFault::StoryNotFound { story_key: story_key.to_string() }),
        _ => Err(SaveFault::AmbiguousStory {
            story_key: story_key.to_string(),
            candidates: matches.iter().map(|record| record.export_name.clone()).collect(),
        }),
    }
}
