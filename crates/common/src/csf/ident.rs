// Story id generation and export-name validation.

use super::lexer::{is_ident_continue, is_ident_start};

/// Characters that `sanitize` turns into `-`.
const ID_SEPARATORS: &str = " ’–—―′¿'`~!@#$%^&*()_|+-=?;:\",.<>{}[]\\/";

const RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Lowercase a title or story name into an id segment.
///
/// Separators and whitespace become `-`, runs collapse, and leading or
/// trailing dashes are dropped. Letters outside ASCII are kept.
pub fn sanitize(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.to_lowercase().chars() {
        if ch.is_whitespace() || ID_SEPARATORS.contains(ch) {
            if !out.ends_with('-') {
                out.push('-');
            }
        } else {
            out.push(ch);
        }
    }
    out.trim_matches('-').to_string()
}

/// `<sanitized kind>--<sanitized name>`, or `None` when either part is empty
/// after sanitizing.
pub fn to_id(kind: &str, name: &str) -> Option<String> {
    let kind = sanitize(kind);
    let name = sanitize(name);
    if kind.is_empty() || name.is_empty() {
        return None;
    }
    Some(format!("{kind}--{name}"))
}

/// Display name of a story derived from its export name: `PrimaryLong`
/// becomes `Primary Long`.
pub fn story_name_from_export(export_name: &str) -> String {
    start_case(export_name)
}

/// Split into words at case, digit and punctuation boundaries, upper-case the
/// first letter of each word, and join with spaces.
pub fn start_case(value: &str) -> String {
    split_words(value).iter().map(|word| upper_first(word)).collect::<Vec<_>>().join(" ")
}

fn split_words(value: &str) -> Vec<String> {
    let chars: Vec<char> = value.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (index, &ch) in chars.iter().enumerate() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        let boundary = match current.chars().last() {
            Some(prev) => {
                let next = chars.get(index + 1).copied();
                (prev.is_lowercase() && ch.is_uppercase())
                    || (prev.is_alphabetic() && ch.is_numeric())
                    || (prev.is_numeric() && ch.is_alphabetic())
                    || (prev.is_uppercase()
                        && ch.is_uppercase()
                        && next.is_some_and(|next| next.is_lowercase()))
            }
            None => false,
        };
        if boundary {
            words.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn upper_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Whether `name` can be used as a `const` binding in a module.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    is_ident_start(first) && chars.all(is_ident_continue) && !RESERVED_WORDS.contains(&name)
}
