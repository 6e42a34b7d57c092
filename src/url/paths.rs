use crate::url::UrlRemapper;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Extension of the generated documents
pub const MARKUP_EXTENSION: &str = "md";

/// Lowercased extension of the URL's last path segment, dot included
///
/// Returns an empty string when the segment has no extension.
pub fn path_extension(url: &Url) -> String {
    Path::new(url.path())
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Computes where a page's document goes, relative to the output root
///
/// The URL is remapped first; then scheme, host, query and fragment are
/// dropped, surrounding slashes are trimmed and the last segment's extension
/// is replaced with `.md`. The site root becomes `index.md`.
///
/// # Examples
///
/// ```
/// use site_ferry::url::{output_path_for, UrlRemapper};
/// use std::path::PathBuf;
///
/// let remapper = UrlRemapper::default();
/// assert_eq!(
///     output_path_for("https://example.com/about/team/", &remapper),
///     PathBuf::from("about/team.md")
/// );
/// assert_eq!(
///     output_path_for("https://example.com/", &remapper),
///     PathBuf::from("index.md")
/// );
/// ```
pub fn output_path_for(url: &str, remapper: &UrlRemapper) -> PathBuf {
    let remapped = remapper.apply(url);

    let raw_path = match Url::parse(&remapped) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => remapped
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let normalized = normalize_path(Path::new(raw_path.trim_matches('/')));
    let base = if normalized.as_os_str().is_empty() {
        PathBuf::from("index")
    } else {
        normalized
    };

    base.with_extension(MARKUP_EXTENSION)
}

/// Resolves `.` and `..` lexically, never climbing above the first component
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::ParentDir => {
                parts.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    parts.iter().collect()
}

/// Relative link from the document at `from_file` to `to_file`
///
/// Both paths are relative to the same root. The result always uses `/`.
///
/// # Examples
///
/// ```
/// use site_ferry::url::relative_path;
/// use std::path::Path;
///
/// assert_eq!(
///     relative_path(Path::new("news/2023/post.md"), Path::new("about.md")),
///     "../../about.md"
/// );
/// assert_eq!(
///     relative_path(Path::new("index.md"), Path::new("assets/a.png")),
///     "assets/a.png"
/// );
/// ```
pub fn relative_path(from_file: &Path, to_file: &Path) -> String {
    let from_dir = normalize_path(from_file.parent().unwrap_or(Path::new("")));
    let to_file = normalize_path(to_file);

    let from_parts: Vec<_> = from_dir.components().collect();
    let to_parts: Vec<_> = to_file.components().collect();

    let common = from_parts
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = Vec::new();
    segments.extend(std::iter::repeat("..".to_string()).take(from_parts.len() - common));
    segments.extend(
        to_parts[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );

    segments.join("/")
}
