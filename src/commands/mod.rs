pub mod chat;
pub mod completions;
pub mod config;
pub mod doctor;
pub mod init;
pub mod prompt;

use std::path::Path;

use crate::config::Config;
use crate::conversation::UiMessages;
use crate::instruction::InstructionMetadata;
use crate::instruction::composer::{Composition, InstructionComposer, InstructionSource};

/// Pick the composition strategy: an explicit file (flag, then config) or the
/// instructions directory
pub fn instruction_source(config: &Config, file_override: Option<&Path>) -> InstructionSource {
    match file_override.or(config.instruction_file.as_deref()) {
        Some(file) => InstructionSource::File(config.resolve_instruction_file(file)),
        None => InstructionSource::Directory(config.instructions_dir()),
    }
}

/// Metadata used by the directory strategy, taken from `agent.*` and `ui.*`
pub fn configured_metadata(config: &Config) -> InstructionMetadata {
    InstructionMetadata {
        name: config.agent.name.clone(),
        domain: config.agent.domain.clone(),
        tone: config.agent.tone_style.clone(),
        welcome_message: config.ui.welcome_message.clone(),
        prompt_message: config.ui.prompt_message.clone(),
    }
}

pub fn compose(config: &Config, file_override: Option<&Path>) -> eyre::Result<(InstructionSource, Composition)> {
    let source = instruction_source(config, file_override);
    let composer = InstructionComposer::new(config.template_path());
    let composition = composer.compose(&source, &configured_metadata(config))?;
    Ok((source, composition))
}

impl From<&InstructionMetadata> for UiMessages {
    fn from(metadata: &InstructionMetadata) -> Self {
        UiMessages {
            welcome_message: metadata.welcome_message.clone(),
            prompt_message: metadata.prompt_message.clone(),
        }
    }
}
