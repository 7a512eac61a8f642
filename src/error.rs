//! Error taxonomy
//!
//! Configuration, composition and session-establishment errors are fatal and
//! travel up to `main`. Service errors raised while a turn is running are
//! reported inside the conversation loop and never leave it.

use std::path::PathBuf;
use thiserror::Error;

/// A required connectivity setting is missing
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is not configured. Set it in lore.yaml or export {env}")]
    MissingSetting { key: &'static str, env: &'static str },

    #[error("API key not found: set {env} in the environment or in the .env file of the lore directory")]
    MissingApiKey { env: String },
}

/// Instruction composition failed; no partial instructions are ever returned
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("Prompt template file not found at {0}. Ensure prompt_template.md exists in the prompts directory")]
    MissingTemplate(PathBuf),

    #[error("Instructions directory not found at {0}")]
    MissingInstructionsDir(PathBuf),

    #[error("No instruction files found in {0}. Ensure at least one .md file exists in the instructions directory")]
    NoInstructionFiles(PathBuf),

    #[error("Instruction file not found at {0}")]
    MissingInstructionFile(PathBuf),

    #[error("Malformed front matter in {path}: {source}")]
    MalformedFrontMatter {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure talking to the remote agent service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] ureq::Error),

    #[error("Stream read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode service response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Service response is missing '{0}'")]
    MissingField(&'static str),

    #[error("{message} (code: {code})")]
    Api { message: String, code: String },
}

/// The agent or its conversation thread could not be created
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to create agent: {0}")]
    CreateAgent(#[source] ServiceError),

    #[error("Failed to create conversation thread: {0}")]
    CreateSession(#[source] ServiceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_errors_are_distinguishable() {
        let template = ComposeError::MissingTemplate(PathBuf::from("/x/prompts/prompt_template.md"));
        let instructions = ComposeError::NoInstructionFiles(PathBuf::from("/x/instructions"));

        assert!(template.to_string().contains("Prompt template file not found"));
        assert!(instructions.to_string().contains("No instruction files found"));
        assert!(matches!(template, ComposeError::MissingTemplate(_)));
        assert!(matches!(instructions, ComposeError::NoInstructionFiles(_)));
    }

    #[test]
    fn test_api_error_display() {
        let err = ServiceError::Api {
            message: "Rate limit exceeded".to_string(),
            code: "rate_limit_exceeded".to_string(),
        };
        assert_eq!(err.to_string(), "Rate limit exceeded (code: rate_limit_exceeded)");
    }

    #[test]
    fn test_missing_setting_names_env_var() {
        let err = ConfigError::MissingSetting {
            key: "service.endpoint",
            env: "LORE_ENDPOINT",
        };
        let msg = err.to_string();
        assert!(msg.contains("service.endpoint"));
        assert!(msg.contains("LORE_ENDPOINT"));
    }
}
