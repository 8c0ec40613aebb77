//! Stripping markup from user-supplied text.

use serde_json::Value;

/// Elements whose content is dropped along with the tags.
const OPAQUE_ELEMENTS: [&str; 2] = ["script", "style"];

/// Removes HTML tags, keeping the text between them.
///
/// Content of `script` and `style` elements is removed entirely. A `<` that
/// does not start a tag (as in `a < b`) is kept.
pub fn strip_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pos = 0;

    while let Some(offset) = input[pos..].find('<') {
        let start = pos + offset;
        out.push_str(&input[pos..start]);

        let rest = &input[start + 1..];
        let starts_tag = rest
            .chars()
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '/' || c == '!')
            .unwrap_or(false);
        let end = rest.find('>');

        match (starts_tag, end) {
            (true, Some(end)) => {
                let tag = &rest[..end];
                let after_tag = start + 1 + end + 1;
                pos = match opaque_element(tag) {
                    Some(name) => skip_past_closing(input, after_tag, name),
                    None => after_tag,
                };
            }
            _ => {
                out.push('<');
                pos = start + 1;
            }
        }
    }

    out.push_str(&input[pos..]);
    out
}

fn opaque_element(tag: &str) -> Option<&'static str> {
    if tag.starts_with('/') {
        return None;
    }
    let name: String = tag
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    OPAQUE_ELEMENTS.iter().copied().find(|el| *el == name)
}

fn skip_past_closing(input: &str, from: usize, name: &str) -> usize {
    let haystack = input[from..].to_ascii_lowercase();
    let closing = format!("</{}", name);
    match haystack.find(&closing) {
        Some(idx) => {
            let close_start = from + idx;
            input[close_start..]
                .find('>')
                .map(|end| close_start + end + 1)
                .unwrap_or(input.len())
        }
        None => input.len(),
    }
}

/// Trims, strips markup and drops control characters except line breaks and tabs.
pub fn sanitize_user_text(input: &str) -> String {
    strip_html(input.trim())
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t' | '\r'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Applies [`sanitize_user_text`] to every string leaf of a JSON value.
pub fn sanitize_json_strings(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_user_text(s)),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_json_strings).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), sanitize_json_strings(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}
