//! Scaffold a lore directory

use colored::*;
use eyre::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;

const DEFAULT_TEMPLATE: &str = r#"You are {{AGENT_NAME}}, an expert in {{DOMAIN_NAME}}.

Answer questions using the knowledge base below. Keep a {{TONE_STYLE}} tone.
If the knowledge base does not cover a question, say so instead of guessing.
"#;

const EXAMPLE_INSTRUCTIONS: &str = r#"Replace this file with reference material for your domain.

Every .md file in this directory becomes a section of the knowledge base,
headed by its file name.
"#;

const DEFAULT_GITIGNORE: &str = "# Secrets\n.env\n";

pub fn run(path: Option<PathBuf>, force: bool) -> Result<()> {
    let lore_dir = path.unwrap_or_else(Config::lore_dir);

    println!("{} Initializing lore in {}", "→".blue(), lore_dir.display());

    let config_file = lore_dir.join("lore.yaml");
    if config_file.exists() && !force {
        println!("  {} lore already initialized at {}", "✓".green(), lore_dir.display());
        println!("  Use {} to reinitialize", "--force".cyan());
        return Ok(());
    }

    for dir in ["prompts", "instructions"] {
        fs::create_dir_all(lore_dir.join(dir)).context(format!("Failed to create {}", dir))?;
        println!("  {} Created {}/", "✓".green(), dir);
    }

    let mut config = Config::default();
    config.paths.template = lore_dir.join("prompts").join("prompt_template.md");
    config.paths.instructions = lore_dir.join("instructions");
    let yaml_str = serde_yaml::to_string(&config).context("Failed to serialize config")?;
    fs::write(&config_file, yaml_str).context("Failed to write lore.yaml")?;
    println!("  {} Created lore.yaml", "✓".green());

    write_scaffold(&config.paths.template, DEFAULT_TEMPLATE, force)?;
    write_scaffold(&config.paths.instructions.join("example.md"), EXAMPLE_INSTRUCTIONS, force)?;
    write_scaffold(&lore_dir.join(".gitignore"), DEFAULT_GITIGNORE, force)?;

    println!();
    println!("{} lore initialized!", "✓".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Set {} and {} in lore.yaml", "service.endpoint".cyan(), "service.model_name".cyan());
    println!("  2. Export {} with your API key", config.service.api_key_env.cyan());
    println!("  3. Run {} to verify setup", "lore doctor".cyan());

    Ok(())
}

/// Write `content` unless the file exists and `force` is off
fn write_scaffold(path: &Path, content: &str, force: bool) -> Result<()> {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

    if path.exists() && !force {
        println!("  {} Kept existing {}", "✓".green(), name);
        return Ok(());
    }

    fs::write(path, content).context(format!("Failed to write {}", path.display()))?;
    println!("  {} Created {}", "✓".green(), name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::template;
    use tempfile::TempDir;

    #[test]
    fn test_scaffold_layout() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("lore");

        run(Some(dir.clone()), false).unwrap();

        assert!(dir.join("lore.yaml").is_file());
        assert!(dir.join("prompts/prompt_template.md").is_file());
        assert!(dir.join("instructions/example.md").is_file());

        let config: Config = serde_yaml::from_str(&fs::read_to_string(dir.join("lore.yaml")).unwrap()).unwrap();
        assert_eq!(config.paths.instructions, dir.join("instructions"));
    }

    #[test]
    fn test_existing_files_kept_without_force() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_path_buf();
        fs::create_dir_all(dir.join("prompts")).unwrap();
        fs::write(dir.join("prompts/prompt_template.md"), "mine").unwrap();

        run(Some(dir.clone()), false).unwrap();
        assert_eq!(fs::read_to_string(dir.join("prompts/prompt_template.md")).unwrap(), "mine");

        run(Some(dir.clone()), true).unwrap();
        assert_eq!(
            fs::read_to_string(dir.join("prompts/prompt_template.md")).unwrap(),
            DEFAULT_TEMPLATE
        );
    }

    #[test]
    fn test_default_template_uses_known_placeholders() {
        let values = template::substitutions("Bot", "botany", "formal");
        let rendered = template::render(DEFAULT_TEMPLATE, &values);
        assert!(template::unresolved(&rendered).is_empty());
        assert!(rendered.contains("an expert in botany"));
    }
}
