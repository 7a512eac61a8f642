//! Instruction composition from a template plus knowledge documents
//!
//! Two sources are supported:
//! - a directory: every `.md` file becomes a knowledge section, the template is
//!   rendered with the configured domain and tone
//! - a single file: its front matter supplies name, domain, tone and UI text,
//!   its body becomes the only knowledge section
//!
//! Every required path is checked before anything is read, so a failed
//! composition never leaves half-built instructions behind.

use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::template::{self, Substitutions};
use super::{ComposedInstructions, InstructionMetadata, frontmatter};
use crate::error::ComposeError;

const KNOWLEDGE_HEADER: &str = "# Knowledge Base";
const EXTENSIONS: &[&str] = &["md", "markdown"];

/// Where the knowledge documents come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionSource {
    Directory(PathBuf),
    File(PathBuf),
}

impl InstructionSource {
    pub fn path(&self) -> &Path {
        match self {
            InstructionSource::Directory(path) | InstructionSource::File(path) => path,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InstructionSource::Directory(_) => "directory",
            InstructionSource::File(_) => "file",
        }
    }
}

/// Result of a composition: the metadata in effect and the instruction text
#[derive(Debug, Clone)]
pub struct Composition {
    pub metadata: InstructionMetadata,
    pub instructions: ComposedInstructions,
}

pub struct InstructionComposer {
    template_path: PathBuf,
}

impl InstructionComposer {
    pub fn new(template_path: PathBuf) -> Self {
        Self { template_path }
    }

    /// Compose instructions from `source`.
    ///
    /// `defaults` is the metadata used by the directory strategy; the file
    /// strategy takes its metadata from front matter instead.
    pub fn compose(
        &self,
        source: &InstructionSource,
        defaults: &InstructionMetadata,
    ) -> Result<Composition, ComposeError> {
        let composition = match source {
            InstructionSource::Directory(dir) => Composition {
                metadata: defaults.clone(),
                instructions: self.compose_directory(dir, defaults)?,
            },
            InstructionSource::File(path) => {
                let (metadata, instructions) = self.compose_file(path)?;
                Composition { metadata, instructions }
            }
        };

        let unresolved = template::unresolved(composition.instructions.as_str());
        if !unresolved.is_empty() {
            log::warn!("Unresolved placeholders in instructions: {}", unresolved.join(", "));
        }
        log::info!(
            "Composed instructions from {} {} ({} documents, {} bytes)",
            source.kind(),
            source.path().display(),
            composition.instructions.source_count(),
            composition.instructions.as_str().len()
        );

        Ok(composition)
    }

    /// Directory strategy: template rendered with `metadata`, one section per file
    pub fn compose_directory(
        &self,
        dir: &Path,
        metadata: &InstructionMetadata,
    ) -> Result<ComposedInstructions, ComposeError> {
        self.require_template()?;
        let files = list_instruction_files(dir)?;

        let preamble = self.render_preamble(metadata)?;
        let mut entries = Vec::with_capacity(files.len());
        for file in &files {
            let content = read(file)?;
            entries.push(knowledge_entry(file, &content));
        }

        Ok(assemble(&preamble, &entries))
    }

    /// Single-file strategy: metadata from front matter, body as the only section
    pub fn compose_file(&self, path: &Path) -> Result<(InstructionMetadata, ComposedInstructions), ComposeError> {
        self.require_template()?;
        if !path.is_file() {
            return Err(ComposeError::MissingInstructionFile(path.to_path_buf()));
        }

        let content = read(path)?;
        let (metadata, body) = frontmatter::parse(&content).map_err(|source| ComposeError::MalformedFrontMatter {
            path: path.to_path_buf(),
            source,
        })?;

        let preamble = self.render_preamble(&metadata)?;
        let entries = [knowledge_entry(path, &body)];

        Ok((metadata, assemble(&preamble, &entries)))
    }

    fn require_template(&self) -> Result<(), ComposeError> {
        if self.template_path.is_file() {
            Ok(())
        } else {
            Err(ComposeError::MissingTemplate(self.template_path.clone()))
        }
    }

    fn render_preamble(&self, metadata: &InstructionMetadata) -> Result<String, ComposeError> {
        let raw = read(&self.template_path)?;
        let values: Substitutions = template::substitutions(&metadata.name, &metadata.domain, &metadata.tone);
        Ok(template::render(&raw, &values))
    }
}

/// Instruction files directly inside `dir`, sorted by file name
pub fn list_instruction_files(dir: &Path) -> Result<Vec<PathBuf>, ComposeError> {
    if !dir.is_dir() {
        return Err(ComposeError::MissingInstructionsDir(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| ComposeError::Read {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;

        if entry.file_type().is_file() && has_instruction_extension(entry.path()) {
            files.push(entry.into_path());
        }
    }

    if files.is_empty() {
        return Err(ComposeError::NoInstructionFiles(dir.to_path_buf()));
    }

    log::debug!("Found {} instruction files in {}", files.len(), dir.display());
    Ok(files)
}

fn has_instruction_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| EXTENSIONS.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// `## <file stem>` heading followed by the content
fn knowledge_entry(path: &Path, content: &str) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    format!("## {}\n{}", stem, content)
}

fn assemble(preamble: &str, entries: &[String]) -> ComposedInstructions {
    let text = format!("{}\n\n{}\n{}", preamble, KNOWLEDGE_HEADER, entries.join("\n\n"));
    ComposedInstructions::new(text, entries.len())
}

fn read(path: &Path) -> Result<String, ComposeError> {
    fs::read_to_string(path).map_err(|source| ComposeError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEMPLATE: &str = "You are {{AGENT_NAME}}. Assist with {{DOMAIN_NAME}} in a {{TONE_STYLE}} tone.";

    struct Fixture {
        _temp: TempDir,
        root: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let root = temp.path().to_path_buf();
            fs::create_dir_all(root.join("prompts")).unwrap();
            fs::create_dir_all(root.join("instructions")).unwrap();
            fs::write(root.join("prompts").join("prompt_template.md"), TEMPLATE).unwrap();
            Self { _temp: temp, root }
        }

        fn composer(&self) -> InstructionComposer {
            InstructionComposer::new(self.root.join("prompts").join("prompt_template.md"))
        }

        fn instructions(&self) -> PathBuf {
            self.root.join("instructions")
        }

        fn write(&self, name: &str, content: &str) -> PathBuf {
            let path = self.instructions().join(name);
            fs::write(&path, content).unwrap();
            path
        }
    }

    fn botany() -> InstructionMetadata {
        InstructionMetadata {
            name: "Fern".to_string(),
            domain: "botany".to_string(),
            tone: "formal".to_string(),
            ..InstructionMetadata::default()
        }
    }

    #[test]
    fn test_directory_composition_layout() {
        let fx = Fixture::new();
        fx.write("b-soil.md", "Loam drains well.");
        fx.write("a-leaves.md", "Leaves photosynthesize.");
        fx.write("notes.txt", "ignored");

        let composed = fx.composer().compose_directory(&fx.instructions(), &botany()).unwrap();

        assert_eq!(
            composed.as_str(),
            "You are Fern. Assist with botany in a formal tone.\n\n# Knowledge Base\n\
             ## a-leaves\nLeaves photosynthesize.\n\n## b-soil\nLoam drains well."
        );
        assert_eq!(composed.source_count(), 2);
    }

    #[test]
    fn test_directory_one_heading_per_file_in_order() {
        let fx = Fixture::new();
        let names = ["delta", "alpha", "charlie", "bravo"];
        for name in names {
            fx.write(&format!("{}.md", name), &format!("about {}", name));
        }

        let composed = fx.composer().compose_directory(&fx.instructions(), &botany()).unwrap();
        let headings: Vec<&str> = composed
            .as_str()
            .lines()
            .filter_map(|l| l.strip_prefix("## "))
            .collect();

        assert_eq!(headings, vec!["alpha", "bravo", "charlie", "delta"]);
    }

    #[test]
    fn test_directory_ignores_subdirectories() {
        let fx = Fixture::new();
        fx.write("top.md", "top");
        fs::create_dir_all(fx.instructions().join("nested.md")).unwrap();
        fs::write(fx.instructions().join("nested.md").join("deep.md"), "deep").unwrap();

        let composed = fx.composer().compose_directory(&fx.instructions(), &botany()).unwrap();
        assert_eq!(composed.source_count(), 1);
        assert!(!composed.as_str().contains("deep"));
    }

    #[test]
    fn test_directory_missing_template() {
        let fx = Fixture::new();
        fx.write("a.md", "a");
        let composer = InstructionComposer::new(fx.root.join("prompts").join("missing.md"));

        let err = composer.compose_directory(&fx.instructions(), &botany()).unwrap_err();
        assert!(matches!(err, ComposeError::MissingTemplate(_)));
    }

    #[test]
    fn test_directory_empty() {
        let fx = Fixture::new();
        fx.write("readme.txt", "not markdown");

        let err = fx.composer().compose_directory(&fx.instructions(), &botany()).unwrap_err();
        assert!(matches!(err, ComposeError::NoInstructionFiles(_)));
    }

    #[test]
    fn test_directory_missing() {
        let fx = Fixture::new();
        let err = fx
            .composer()
            .compose_directory(&fx.root.join("nowhere"), &botany())
            .unwrap_err();
        assert!(matches!(err, ComposeError::MissingInstructionsDir(_)));
    }

    #[test]
    fn test_template_checked_before_directory() {
        let fx = Fixture::new();
        let composer = InstructionComposer::new(fx.root.join("missing.md"));
        let err = composer.compose_directory(&fx.root.join("nowhere"), &botany()).unwrap_err();
        assert!(matches!(err, ComposeError::MissingTemplate(_)));
    }

    #[test]
    fn test_file_composition_uses_front_matter() {
        let fx = Fixture::new();
        let path = fx.write(
            "chess.md",
            "---\nname: Kasparov\ndomain: chess\ntone: sharp\nwelcomeMessage: Board ready\n---\nOpenings matter.",
        );

        let (metadata, composed) = fx.composer().compose_file(&path).unwrap();

        assert_eq!(metadata.name, "Kasparov");
        assert_eq!(metadata.welcome_message, "Board ready");
        assert_eq!(
            composed.as_str(),
            "You are Kasparov. Assist with chess in a sharp tone.\n\n# Knowledge Base\n## chess\nOpenings matter."
        );
        assert_eq!(composed.source_count(), 1);
    }

    #[test]
    fn test_file_without_front_matter_uses_defaults() {
        let fx = Fixture::new();
        let path = fx.write("plain.md", "Just text");

        let (metadata, composed) = fx.composer().compose_file(&path).unwrap();

        assert_eq!(metadata, InstructionMetadata::default());
        assert!(composed.as_str().contains("Assist with the specified domain"));
        assert!(composed.as_str().ends_with("## plain\nJust text"));
    }

    #[test]
    fn test_file_missing() {
        let fx = Fixture::new();
        let err = fx.composer().compose_file(&fx.instructions().join("nope.md")).unwrap_err();
        assert!(matches!(err, ComposeError::MissingInstructionFile(_)));
    }

    #[test]
    fn test_file_malformed_front_matter() {
        let fx = Fixture::new();
        let path = fx.write("bad.md", "---\nname: [oops\n---\nbody");

        let err = fx.composer().compose_file(&path).unwrap_err();
        assert!(matches!(err, ComposeError::MalformedFrontMatter { .. }));
        assert!(err.to_string().contains("bad.md"));
    }

    #[test]
    fn test_compose_dispatches_on_source() {
        let fx = Fixture::new();
        let path = fx.write("only.md", "---\nname: Solo\n---\nbody");

        let from_dir = fx
            .composer()
            .compose(&InstructionSource::Directory(fx.instructions()), &botany())
            .unwrap();
        assert_eq!(from_dir.metadata, botany());

        let from_file = fx.composer().compose(&InstructionSource::File(path), &botany()).unwrap();
        assert_eq!(from_file.metadata.name, "Solo");
        // front matter does not inherit the directory defaults
        assert_eq!(from_file.metadata.domain, "the specified domain");
    }
}
