//! Instruction file front matter parsing
//!
//! # Format
//!
//! ```markdown
//! ---
//! name: Botanist
//! domain: botany
//! tone: formal
//! welcomeMessage: Welcome to the greenhouse
//! ---
//!
//! Knowledge body...
//! ```
//!
//! Keys are matched case-insensitively and `welcomeMessage`, `WelcomeMessage`,
//! `welcome_message` and `welcome-message` are all the same field. A document
//! without an opening `---`, or without a closing one, has no front matter and
//! its whole text is the body.

use serde_yaml::{Mapping, Value};

use super::{InstructionDocument, InstructionMetadata};

const MARKER: &str = "---";

/// Split raw text into front matter and body
pub fn split(content: &str) -> InstructionDocument {
    let no_front_matter = || InstructionDocument {
        front_matter: None,
        body: content.to_string(),
    };

    if !content.starts_with(MARKER) {
        return no_front_matter();
    }

    // Closing marker search starts right after the opening one
    let Some(end) = content[MARKER.len()..].find(MARKER).map(|pos| pos + MARKER.len()) else {
        return no_front_matter();
    };

    InstructionDocument {
        front_matter: Some(content[MARKER.len()..end].trim().to_string()),
        body: content[end + MARKER.len()..].trim().to_string(),
    }
}

/// Parse raw text into metadata and body.
///
/// Absent fields keep their defaults; a block that is not valid YAML, or not a
/// key/value mapping, is an error.
pub fn parse(content: &str) -> Result<(InstructionMetadata, String), serde_yaml::Error> {
    let document = split(content);

    let metadata = match document.front_matter.as_deref() {
        Some(block) => parse_metadata(block)?,
        None => InstructionMetadata::default(),
    };

    Ok((metadata, document.body))
}

/// Deserialize a front matter block into metadata
pub fn parse_metadata(block: &str) -> Result<InstructionMetadata, serde_yaml::Error> {
    if block.trim().is_empty() {
        return Ok(InstructionMetadata::default());
    }

    let raw: Mapping = serde_yaml::from_str(block)?;
    let mut normalized = Mapping::with_capacity(raw.len());

    for (key, value) in raw {
        let field = match key.as_str().and_then(canonical_field) {
            Some(f) => Value::String(f.to_string()),
            None => key,
        };
        // Null means "not set", keep the default
        if !value.is_null() {
            normalized.insert(field, scalar_as_string(value));
        }
    }

    serde_yaml::from_value(Value::Mapping(normalized))
}

/// Numbers and booleans become strings; other values pass through
fn scalar_as_string(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        other => other,
    }
}

/// Map a front matter key onto the serde name of an [`InstructionMetadata`] field
fn canonical_field(key: &str) -> Option<&'static str> {
    let folded: String = key
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect();

    match folded.as_str() {
        "name" => Some("name"),
        "domain" => Some("domain"),
        "tone" => Some("tone"),
        "welcomemessage" => Some("welcomeMessage"),
        "promptmessage" => Some("promptMessage"),
        _ => None,
    }
}
