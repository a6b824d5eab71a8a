// Import path canonicalization: separator unification, traversal rejection, 512 char max.

use thiserror::Error;

/// Maximum allowed path length in characters.
const MAX_PATH_CHARS: usize = 512;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("path exceeds maximum length of {MAX_PATH_CHARS} characters")]
    TooLong,

    #[error("path contains directory traversal component: {0}")]
    Traversal(String),

    #[error("path contains null byte")]
    NullByte,

    #[error("path contains invalid component: {0}")]
    InvalidComponent(String),
}

/// Normalize a story import path so it can be joined onto the project root.
///
/// Rules:
/// - Convert all separators to `/`
/// - Collapse consecutive `/` into one
/// - Strip leading and trailing `/` (absolute paths are treated as project-relative)
/// - Drop `.` components, so `./src/Button.stories.tsx` resolves like `src/Button.stories.tsx`
/// - Reject `..` path components (traversal)
/// - Reject null bytes
/// - Reject empty paths
/// - Enforce max 512 character limit (after normalization)
///
/// The spelling of each component is preserved so the result names the same
/// file the dev server indexed.
pub fn normalize_path(input: &str) -> Result<String, PathError> {
    if input.is_empty() {
        return Err(PathError::Empty);
    }

    if input.contains('\0') {
        return Err(PathError::NullByte);
    }

    let unified = input.replace('\\', "/");

    let mut components: Vec<&str> = Vec::new();
    for component in unified.split('/').filter(|s| !s.is_empty()) {
        if component == "." {
            continue;
        }
        if component == ".." {
            return Err(PathError::Traversal("..".to_string()));
        }
        if component.trim().is_empty() {
            return Err(PathError::InvalidComponent("(whitespace-only component)".to_string()));
        }
        components.push(component);
    }

    if components.is_empty() {
        return Err(PathError::Empty);
    }

    let result = components.join("/");

    if result.chars().count() > MAX_PATH_CHARS {
        return Err(PathError::TooLong);
    }

    Ok(result)
}
