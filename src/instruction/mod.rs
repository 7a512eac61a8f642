//! Instruction composition
//!
//! Builds the instruction string handed to the remote agent from:
//! - a prompt template with `{{PLACEHOLDER}}` tokens
//! - knowledge documents, either every `.md` file in a directory or a single
//!   file carrying YAML front matter
//!
//! # Output shape
//!
//! ```markdown
//! <rendered template>
//!
//! # Knowledge Base
//! ## <file stem>
//! <document body>
//! ```

use serde::{Deserialize, Serialize};

pub mod composer;
pub mod frontmatter;
pub mod template;

/// Metadata read from an instruction file's front matter
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct InstructionMetadata {
    /// Agent name
    pub name: String,
    /// Substituted for `{{DOMAIN_NAME}}`
    pub domain: String,
    /// Substituted for `{{TONE_STYLE}}`
    pub tone: String,
    /// Banner shown when the conversation starts
    #[serde(rename = "welcomeMessage")]
    pub welcome_message: String,
    /// Shown before every question
    #[serde(rename = "promptMessage")]
    pub prompt_message: String,
}

pub const DEFAULT_WELCOME_MESSAGE: &str = "AI Agent Console";
pub const DEFAULT_PROMPT_MESSAGE: &str =
    "Ask a question about the subject (type 'exit' to quit, 'save' to keep the conversation):";

impl Default for InstructionMetadata {
    fn default() -> Self {
        Self {
            name: "Custom AI Agent".to_string(),
            domain: "the specified domain".to_string(),
            tone: "scholarly but approachable".to_string(),
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
            prompt_message: DEFAULT_PROMPT_MESSAGE.to_string(),
        }
    }
}

/// A raw document split into its front matter block and body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionDocument {
    /// Text between the two `---` markers, trimmed; `None` without front matter
    pub front_matter: Option<String>,
    /// Everything after the closing marker (trimmed), or the whole text
    pub body: String,
}

/// The final instruction string; built once, never mutated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedInstructions {
    text: String,
    sources: usize,
}

impl ComposedInstructions {
    pub(crate) fn new(text: String, sources: usize) -> Self {
        Self { text, sources }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of knowledge documents included
    pub fn source_count(&self) -> usize {
        self.sources
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl std::fmt::Display for ComposedInstructions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
