use colored::*;
use eyre::Result;

use crate::cli::{ConfigAction, OutputFormat};
use crate::config::Config;

pub fn run(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
    }
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(config)?);
        }
        OutputFormat::Text => {
            println!("{}", "Lore Configuration".bold());
            println!();

            println!("{}:", "service".cyan());
            println!("  endpoint: {}", or_unset(config.service.endpoint.as_deref()));
            println!("  model_name: {}", or_unset(config.service.model_name.as_deref()));
            let key_state = if config.api_key().is_some() { "set" } else { "missing" };
            println!("  api_key_env: {} ({})", config.service.api_key_env, key_state);
            if let Some(version) = &config.service.api_version {
                println!("  api_version: {}", version);
            }
            println!();

            println!("{}:", "agent".cyan());
            println!("  name: {}", config.agent.name);
            println!("  domain: {}", config.agent.domain);
            println!("  tone_style: {}", config.agent.tone_style);
            println!("  temperature: {}", config.agent.temperature);
            println!("  top_p: {}", config.agent.top_p);
            println!("  max_completion_tokens: {}", config.agent.max_completion_tokens);
            println!("  max_prompt_tokens: {}", config.agent.max_prompt_tokens);
            println!();

            println!("{}:", "paths".cyan());
            println!("  template: {}", config.template_path().display());
            println!("  instructions: {}", config.instructions_dir().display());
            if let Some(file) = &config.instruction_file {
                println!("  instruction_file: {}", config.resolve_instruction_file(file).display());
            }
            println!();

            println!("{}:", "session".cyan());
            println!("  keep_on_exit: {}", config.session.keep_on_exit);
            println!("log_level: {}", config.log_level.as_filter());
        }
    }

    Ok(())
}

fn or_unset(value: Option<&str>) -> ColoredString {
    match value {
        Some(v) => v.normal(),
        None => "(not set)".yellow(),
    }
}
