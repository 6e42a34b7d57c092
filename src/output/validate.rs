//! Validate stage - checks that every local reference in the generated
//! Markdown tree points at an existing file

use indexmap::IndexSet;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

/// Target prefixes that are never checked against the filesystem
const SKIPPED_PREFIXES: &[&str] = &["http://", "https://", "mailto:", "data:"];

/// A reference whose target does not exist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenReference {
    pub document: PathBuf,
    pub target: String,
}

/// Outcome of validating an output tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Markdown documents scanned
    pub documents: usize,
    /// Local references checked
    pub references: usize,
    pub failures: Vec<BrokenReference>,
}

impl ValidationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

fn link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\[[^\]]*\]\(([^\s)]+)(?:\s+"[^"]*")?\)"#).expect("link pattern is valid")
    })
}

fn image_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"!\[[^\]]*\]\(([^\s)]+)(?:\s+"[^"]*")?\)"#).expect("image pattern is valid")
    })
}

/// Returns the link and image targets of a document
///
/// Both lists keep first-seen order without duplicates. A target that
/// appears as an image is only listed with the images.
pub fn extract_references(markdown: &str) -> (Vec<String>, Vec<String>) {
    let images: IndexSet<String> = image_pattern()
        .captures_iter(markdown)
        .map(|c| c[1].to_string())
        .collect();

    let links: IndexSet<String> = link_pattern()
        .captures_iter(markdown)
        .map(|c| c[1].to_string())
        .filter(|target| !images.contains(target))
        .collect();

    (links.into_iter().collect(), images.into_iter().collect())
}

fn is_checked(target: &str) -> bool {
    !SKIPPED_PREFIXES
        .iter()
        .any(|prefix| target.starts_with(prefix))
}

/// Resolves `target` against `doc_dir`, both relative to the tree root
///
/// Returns None for absolute targets and for targets that climb above the
/// root; such references can never point into the tree.
fn resolve_in_tree(doc_dir: &Path, target: &str) -> Option<PathBuf> {
    if target.starts_with('/') {
        return None;
    }

    let joined = doc_dir.join(target);
    let mut parts = Vec::new();
    for component in joined.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts.iter().collect())
}

/// Checks every `*.md` file under `root`
///
/// Unreadable documents are reported as an error; they are not counted as
/// broken references. Targets are only looked up inside the tree.
pub fn validate_dir(root: &Path) -> std::io::Result<ValidationReport> {
    let mut report = ValidationReport::default();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "md") {
            continue;
        }

        report.documents += 1;
        let markdown = std::fs::read_to_string(path)?;
        let doc_dir = path
            .parent()
            .and_then(|parent| parent.strip_prefix(root).ok())
            .unwrap_or(Path::new(""));
        let (links, images) = extract_references(&markdown);

        for target in links.into_iter().chain(images) {
            if !is_checked(&target) {
                continue;
            }

            report.references += 1;
            let found = resolve_in_tree(doc_dir, &target)
                .map_or(false, |resolved| root.join(resolved).exists());
            if !found {
                tracing::warn!("Broken reference in {}: {}", path.display(), target);
                report.failures.push(BrokenReference {
                    document: path.to_path_buf(),
                    target,
                });
            }
        }
    }

    tracing::info!(
        "Validated {} documents, {} references, {} broken",
        report.documents,
        report.references,
        report.failures.len()
    );
    Ok(report)
}
