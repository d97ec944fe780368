//! Tolerant front-matter splitting for folder metadata documents.
//!
//! Documents look like Hugo content files:
//!
//! ```text
//! ---
//! title: "Japan"
//! description: Spring trip
//! draft: true
//! ---
//! Body markdown...
//! ```
//!
//! Only `title` and `description` are extracted. This is a line scanner, not a
//! YAML parser: lines that are not `key: value` are skipped, lists and nested
//! mappings are ignored, other keys are dropped, and parsing never fails. The
//! parsed view is therefore lossy; editing always goes through the raw text.

/// Parsed view of a metadata document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataDocument {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Everything after the front matter, trimmed.
    pub body: String,
}

const DELIMITER: &str = "---";

/// Split `text` into title, description, and body.
pub fn parse(text: &str) -> MetadataDocument {
    let stripped = text.trim_start();
    if !stripped.starts_with(DELIMITER) {
        return body_only(text);
    }

    let mut pieces = stripped.splitn(3, DELIMITER);
    let (Some(_preamble), Some(block), Some(body)) = (pieces.next(), pieces.next(), pieces.next())
    else {
        return body_only(text);
    };

    let mut doc = MetadataDocument {
        body: body.trim().to_string(),
        ..Default::default()
    };
    for line in block.lines() {
        let Some((key, value)) = split_key_value(line) else {
            continue;
        };
        match key.to_lowercase().as_str() {
            "title" => doc.title = Some(unquote(value.trim()).to_string()),
            "description" => doc.description = Some(unquote(value.trim()).to_string()),
            _ => {}
        }
    }
    doc
}

fn body_only(text: &str) -> MetadataDocument {
    MetadataDocument {
        body: text.trim().to_string(),
        ..Default::default()
    }
}

/// Match `<ws>key<ws>:<value>` where key is letters, digits, or `_`.
fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_start();
    let key_len = line
        .char_indices()
        .find(|&(_, c)| !(c.is_alphanumeric() || c == '_'))
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    if key_len == 0 {
        return None;
    }
    let (key, rest) = line.split_at(key_len);
    let value = rest.trim_start().strip_prefix(':')?;
    Some((key, value))
}

/// Strip one matching pair of straight quotes.
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
