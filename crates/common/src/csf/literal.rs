// JSON values rendered as JavaScript source literals, and the reverse for
// simple string literals.

use serde_json::Value;

use super::ident::is_valid_identifier;

/// Render a JSON value as a JavaScript expression.
///
/// Strings use single quotes; arrays and objects are rendered inline.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => quote(text),
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", rendered.join(", "))
        }
        Value::Object(fields) if fields.is_empty() => "{}".to_string(),
        Value::Object(fields) => {
            let rendered: Vec<String> = fields
                .iter()
                .map(|(key, value)| format!("{}: {}", render_key(key), render_value(value)))
                .collect();
            format!("{{ {} }}", rendered.join(", "))
        }
    }
}

/// Property key as written in an object literal: bare when it is a valid
/// identifier, quoted otherwise.
pub fn render_key(key: &str) -> String {
    if is_valid_identifier(key) {
        key.to_string()
    } else {
        quote(key)
    }
}

/// Single-quoted JavaScript string literal.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for ch in text.chars() {
        match ch {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Decode a quoted string literal (`'..'`, `".."`, or a substitution-free
/// template). Returns `None` for anything else.
pub fn unquote(literal: &str) -> Option<String> {
    let mut chars = literal.chars();
    let open = chars.next()?;
    if !matches!(open, '\'' | '"' | '`') || literal.len() < 2 || !literal.ends_with(open) {
        return None;
    }
    let body = &literal[1..literal.len() - 1];
    if open == '`' && body.contains("${") {
        return None;
    }

    let mut out = String::with_capacity(body.len());
    let mut body_chars = body.chars();
    while let Some(ch) = body_chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match body_chars.next()? {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            '0' => out.push('\0'),
            'u' => {
                let hex: String = body_chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&hex, 16).ok()?;
                out.push(char::from_u32(code)?);
            }
            '\n' => {}
            other => out.push(other),
        }
    }
    Some(out)
}
