//! Run a conversation against a freshly created remote agent

use colored::*;
use eyre::{Context, Result};
use std::io;
use std::path::PathBuf;

use crate::config::{AgentConfig, Config};
use crate::conversation::{self, Cleanup, Console, ConversationLoop, UiMessages};
use crate::error::SessionError;
use crate::instruction::composer::InstructionSource;
use crate::service::assistants::AssistantsClient;
use crate::service::{AgentService, AgentSpec, ConversationSession, ModelParameters};

pub fn run(file: Option<PathBuf>, keep: bool, quiet: bool, config: &Config) -> Result<()> {
    // Connectivity is checked before anything is read from disk
    let settings = config.service_settings()?;

    let (source, composition) = super::compose(config, file.as_deref())?;

    if !quiet {
        match &source {
            InstructionSource::Directory(dir) => println!(
                "{}",
                format!(
                    "Successfully loaded {} instruction files from {}",
                    composition.instructions.source_count(),
                    dir.display()
                )
                .cyan()
            ),
            InstructionSource::File(path) => {
                println!("{}", format!("Successfully loaded instruction file {}", path.display()).cyan())
            }
        }
    }

    let client = AssistantsClient::new(settings);
    let ui = UiMessages::from(&composition.metadata);
    let spec = AgentSpec {
        name: composition.metadata.name.clone(),
        instructions: composition.instructions.into_string(),
        parameters: model_parameters(&config.agent),
    };

    let session = open_session(&client, &spec, quiet)?;

    let mut console = Console::stdout();
    let reason = ConversationLoop::new(&client, &session, ui)
        .run(io::stdin().lock(), &mut console)
        .context("Console I/O failed")?;

    let keep_on_exit = keep || config.session.keep_on_exit;
    match conversation::cleanup(&client, &session, reason, keep_on_exit) {
        Ok(Cleanup::Deleted) => log::info!("Deleted thread {} and agent {}", session.thread.id, session.agent.id),
        Ok(Cleanup::Kept) => {
            if !quiet && keep_on_exit {
                println!(
                    "{}",
                    format!("Kept thread {} and agent {}", session.thread.id, session.agent.id).green()
                );
            }
        }
        Err(e) => {
            log::warn!("Cleanup failed: {}", e);
            eprintln!("{} Failed to clean up remote resources: {}", "⚠".yellow(), e);
        }
    }

    Ok(())
}

fn open_session<S: AgentService + ?Sized>(service: &S, spec: &AgentSpec, quiet: bool) -> Result<ConversationSession> {
    if !quiet {
        println!("{}", "Creating agent...".cyan());
    }
    let agent = service.create_agent(spec).map_err(SessionError::CreateAgent)?;
    if !quiet {
        println!("{}", format!("Agent created with ID: {}", agent.id).green());
        println!("{}", "Creating conversation thread...".cyan());
    }

    let thread = match service.create_session(&agent) {
        Ok(thread) => thread,
        Err(e) => {
            // Drop the orphaned agent
            if let Err(cleanup) = service.delete_agent(&agent) {
                log::warn!("Failed to delete agent {} after thread error: {}", agent.id, cleanup);
            }
            return Err(SessionError::CreateSession(e).into());
        }
    };
    if !quiet {
        println!("{}", format!("Thread created with ID: {}", thread.id).green());
    }

    Ok(ConversationSession { agent, thread })
}

fn model_parameters(agent: &AgentConfig) -> ModelParameters {
    ModelParameters {
        temperature: agent.temperature,
        top_p: agent.top_p,
        max_completion_tokens: agent.max_completion_tokens,
        max_prompt_tokens: agent.max_prompt_tokens,
    }
}
