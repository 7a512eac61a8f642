//! Diagnose lore setup issues

use colored::*;
use eyre::Result;

use crate::config::Config;
use crate::instruction::composer::{self, InstructionSource};

pub fn run(config: &Config) -> Result<()> {
    println!("{}", "Lore Doctor".bold());
    println!("{}", "═".repeat(50));
    println!();

    let mut issues = 0;

    match &config.loaded_from {
        Some(path) => println!("{} Config file: {}", "✓".green(), path.display()),
        None => {
            let expected = Config::lore_dir().join("lore.yaml");
            println!("{} No config file found, using defaults", "⚠".yellow());
            println!("  Run {} to create {}", "lore init".cyan(), expected.display());
        }
    }

    let template = config.template_path();
    if template.is_file() {
        println!("{} Prompt template: {}", "✓".green(), template.display());
    } else {
        println!("{} Prompt template missing: {}", "✗".red(), template.display());
        issues += 1;
    }

    match super::instruction_source(config, None) {
        InstructionSource::Directory(dir) => match composer::list_instruction_files(&dir) {
            Ok(files) => println!(
                "{} Instructions directory: {} ({} files)",
                "✓".green(),
                dir.display(),
                files.len()
            ),
            Err(e) => {
                println!("{} {}", "✗".red(), e);
                issues += 1;
            }
        },
        InstructionSource::File(path) => {
            if path.is_file() {
                println!("{} Instruction file: {}", "✓".green(), path.display());
            } else {
                println!("{} Instruction file missing: {}", "✗".red(), path.display());
                issues += 1;
            }
        }
    }

    println!();
    println!("{}", "Service:".bold());

    match config.service_settings() {
        Ok(settings) => {
            println!("  {} endpoint {}", "✓".green(), settings.endpoint);
            println!("  {} model {}", "✓".green(), settings.model_name);
            println!("  {} API key ({})", "✓".green(), config.service.api_key_env);
        }
        Err(e) => {
            println!("  {} {}", "✗".red(), e);
            issues += 1;
        }
    }

    println!();
    println!("{}", "═".repeat(50));
    if issues == 0 {
        println!("{} All checks passed!", "✓".green().bold());
    } else {
        println!("{} {} issue(s) found", "⚠".yellow().bold(), issues);
    }

    Ok(())
}
