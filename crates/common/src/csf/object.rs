// Editable object literal model.
//
// An object literal is split into its top-level entries. Each entry keeps the
// trivia around it (whitespace, comments) so that an unedited object renders
// back to exactly the text it was parsed from. Entries that are not plain
// `key: value` properties (spreads, shorthands, methods, computed keys) are
// carried as opaque text.

use super::lexer::{depth_delta, matching_close, tokenize, Token, TokenKind};
use super::literal::unquote;
use super::{line_at, CsfError};

/// One level of indentation used for entries added to an empty object.
const INDENT_UNIT: &str = "  ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLit {
    entries: Vec<Entry>,
    trailing_comma: bool,
    /// Trivia between the last entry (or trailing comma) and `}`.
    tail: String,
    /// Indentation of the line the object starts on.
    indent: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    leading: String,
    body: EntryBody,
    trailing: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum EntryBody {
    Property(Property),
    Opaque(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Key name with quotes removed.
    pub key: String,
    /// Key as written in the source.
    pub key_text: String,
    /// Text between the key and the value, including the colon.
    pub separator: String,
    /// Value expression as written in the source.
    pub value: String,
}

impl Entry {
    fn key(&self) -> Option<&str> {
        match &self.body {
            EntryBody::Property(property) => Some(&property.key),
            EntryBody::Opaque(_) => None,
        }
    }

    fn render_into(&self, out: &mut String) {
        out.push_str(&self.leading);
        match &self.body {
            EntryBody::Property(property) => {
                out.push_str(&property.key_text);
                out.push_str(&property.separator);
                out.push_str(&property.value);
            }
            EntryBody::Opaque(text) => out.push_str(text),
        }
        out.push_str(&self.trailing);
    }

    /// Indentation of the entry when it starts on its own line.
    fn own_line_indent(&self) -> Option<&str> {
        self.leading.rfind('\n').map(|index| &self.leading[index + 1..])
    }
}

impl ObjectLit {
    /// Parse text consisting of exactly one object literal.
    pub fn parse(text: &str) -> Result<Self, CsfError> {
        let tokens = tokenize(text)?;
        let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
            return Err(CsfError::NotAnObject);
        };
        if !first.is_punct(text, "{") || matching_close(&tokens, text, 0) != Some(tokens.len() - 1)
        {
            return Err(CsfError::NotAnObject);
        }
        if !text[..first.start].trim().is_empty() || !text[last.end..].trim().is_empty() {
            return Err(CsfError::NotAnObject);
        }

        Self::from_tokens(text, &tokens[1..tokens.len() - 1], first.end, last.start)
    }

    fn from_tokens(
        text: &str,
        inner: &[Token],
        inner_start: usize,
        inner_end: usize,
    ) -> Result<Self, CsfError> {
        let mut segments: Vec<(usize, usize, &[Token])> = Vec::new();
        let mut depth = 0isize;
        let mut segment_start = inner_start;
        let mut segment_first = 0usize;

        for (index, token) in inner.iter().enumerate() {
            depth += depth_delta(token, text);
            if depth == 0 && token.is_punct(text, ",") {
                segments.push((segment_start, token.start, &inner[segment_first..index]));
                segment_start = token.end;
                segment_first = index + 1;
            }
        }
        segments.push((segment_start, inner_end, &inner[segment_first..]));

        let mut object = Self {
            entries: Vec::new(),
            trailing_comma: false,
            tail: String::new(),
            indent: String::new(),
        };

        let segment_count = segments.len();
        for (position, (start, end, tokens)) in segments.into_iter().enumerate() {
            let is_last = position + 1 == segment_count;
            if tokens.is_empty() {
                if !is_last {
                    return Err(CsfError::EmptyEntry { line: line_at(text, end) });
                }
                object.trailing_comma = segment_count > 1;
                object.tail = text[start..end].to_string();
                continue;
            }
            object.entries.push(entry_from_segment(text, start, end, tokens));
        }

        Ok(object)
    }

    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    pub fn indent(&self) -> &str {
        &self.indent
    }

    pub fn render(&self) -> String {
        let mut out = String::from("{");
        for (index, entry) in self.entries.iter().enumerate() {
            if index > 0 {
                out.push(',');
            }
            entry.render_into(&mut out);
        }
        if self.trailing_comma && !self.entries.is_empty() {
            out.push(',');
        }
        out.push_str(&self.tail);
        out.push('}');
        out
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys of all `key: value` entries, in source order.
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().filter_map(Entry::key).collect()
    }

    pub fn property(&self, key: &str) -> Option<&Property> {
        self.entries.iter().find_map(|entry| match &entry.body {
            EntryBody::Property(property) if property.key == key => Some(property),
            _ => None,
        })
    }

    pub fn property_mut(&mut self, key: &str) -> Option<&mut Property> {
        self.entries.iter_mut().find_map(|entry| match &mut entry.body {
            EntryBody::Property(property) if property.key == key => Some(property),
            _ => None,
        })
    }

    /// Indentation that an entry for `key` sits at, falling back to one
    /// level deeper than the object itself.
    pub fn entry_indent(&self, key: &str) -> String {
        self.entries
            .iter()
            .find(|entry| entry.key() == Some(key))
            .and_then(Entry::own_line_indent)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}{INDENT_UNIT}", self.indent))
    }

    /// Replace the value of `key`, or append `key_text: value` when the key is
    /// not present.
    pub fn set_property(&mut self, key: &str, key_text: &str, value: String) {
        if let Some(property) = self.property_mut(key) {
            property.value = value;
            return;
        }
        self.push_property(Property {
            key: key.to_string(),
            key_text: key_text.to_string(),
            separator: ": ".to_string(),
            value,
        });
    }

    /// Append a property, following the layout of the existing entries.
    pub fn push_property(&mut self, property: Property) {
        let leading = match self.entries.last() {
            Some(last) => match last.leading.rfind('\n') {
                Some(index) => last.leading[index..].to_string(),
                None => " ".to_string(),
            },
            None => format!("\n{}{INDENT_UNIT}", self.indent),
        };

        if self.entries.is_empty() {
            if self.tail.trim().is_empty() {
                self.tail = format!("\n{}", self.indent);
            }
            self.trailing_comma = true;
        } else if !self.trailing_comma {
            if let Some(last) = self.entries.last_mut() {
                let moved = std::mem::take(&mut last.trailing);
                self.tail.insert_str(0, &moved);
            }
        }

        self.entries.push(Entry { leading, body: EntryBody::Property(property), trailing: String::new() });
    }

    /// Remove the property named `key`, keeping the surrounding layout intact.
    pub fn remove_property(&mut self, key: &str) -> Option<Property> {
        let index = self.entries.iter().position(|entry| entry.key() == Some(key))?;
        let removed = self.entries.remove(index);

        if index == self.entries.len() && !self.trailing_comma {
            match self.entries.last_mut() {
                Some(last) => last.trailing = removed.trailing,
                None => self.tail.insert_str(0, &removed.trailing),
            }
        }
        if self.entries.is_empty() {
            self.trailing_comma = false;
        }

        match removed.body {
            EntryBody::Property(property) => Some(property),
            EntryBody::Opaque(_) => None,
        }
    }
}

fn entry_from_segment(text: &str, start: usize, end: usize, tokens: &[Token]) -> Entry {
    let first = tokens[0];
    let last = tokens[tokens.len() - 1];
    let leading = text[start..first.start].to_string();
    let trailing = text[last.end..end].to_string();

    let is_key = matches!(first.kind, TokenKind::Ident | TokenKind::Str | TokenKind::Number);
    let body = if is_key && tokens.len() >= 3 && tokens[1].is_punct(text, ":") {
        let key_text = first.text(text);
        let key = match first.kind {
            TokenKind::Str => unquote(key_text).unwrap_or_else(|| key_text.to_string()),
            _ => key_text.to_string(),
        };
        EntryBody::Property(Property {
            key,
            key_text: key_text.to_string(),
            separator: text[first.end..tokens[2].start].to_string(),
            value: text[tokens[2].start..last.end].to_string(),
        })
    } else {
        EntryBody::Opaque(text[first.start..last.end].to_string())
    };

    Entry { leading, body, trailing }
}
