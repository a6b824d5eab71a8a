// Project-relative path handling for story import paths.

pub mod normalize;

pub use normalize::{normalize_path, PathError};
