// Component Story Format (CSF) engine: parse a story module into an editable
// model, duplicate stories, inject argument values, and serialize it back.
//
// Only the parts of the module that stories live in are modelled. Everything
// else is carried through as verbatim text, so a file that is parsed and
// serialized without edits comes back byte for byte.

pub mod file;
pub mod ident;
pub mod lexer;
pub mod literal;
pub mod object;

use thiserror::Error;

pub use file::{CsfFile, MutationTarget, StoryRecord, StoryTable};
pub use object::ObjectLit;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CsfError {
    #[error("unterminated {what} starting on line {line}")]
    Unterminated { what: &'static str, line: u32 },

    #[error("unbalanced `{delimiter}` on line {line}")]
    Unbalanced { delimiter: char, line: u32 },

    #[error("expected an object literal")]
    NotAnObject,

    #[error("object literal has an empty entry on line {line}")]
    EmptyEntry { line: u32 },

    #[error("story title `{0}` does not produce a valid story id")]
    InvalidTitle(String),

    #[error("no story export named `{0}`")]
    UnknownStory(String),

    #[error("story `{0}` is not an object literal; function stories cannot be edited")]
    StoryNotObject(String),

    #[error("`args` of story `{0}` is not an object literal")]
    ArgsNotObject(String),

    #[error("`{0}` is not a valid export name")]
    InvalidExportName(String),

    #[error("an export named `{0}` already exists")]
    ExportExists(String),
}

/// 1-based line number of a byte offset.
pub(crate) fn line_at(source: &str, offset: usize) -> u32 {
    source.as_bytes()[..offset.min(source.len())].iter().filter(|byte| **byte == b'\n').count()
        as u32
        + 1
}

/// Leading whitespace of the line containing `offset`.
pub(crate) fn line_indent(source: &str, offset: usize) -> String {
    let offset = offset.min(source.len());
    let line_start = source[..offset].rfind('\n').map(|index| index + 1).unwrap_or(0);
    source[line_start..].chars().take_while(|ch| *ch == ' ' || *ch == '\t').collect()
}
