use miette::{NamedSource, SourceSpan};
use std::path::{Component, Path, PathBuf};

/// Byte span of the 1-based `line` within `lines` joined by `\n`.
/// This function is designed to be called only when an error occurs.
pub fn line_span(lines: &[String], line: usize) -> SourceSpan {
    let before = line.saturating_sub(1).min(lines.len());
    let offset: usize = lines.iter().take(before).map(|l| l.len() + 1).sum();
    let length = lines.get(before).map_or(0, String::len);
    (offset, length).into()
}

pub fn named_source(name: &str, lines: &[String]) -> NamedSource<String> {
    NamedSource::new(name, lines.join("\n"))
}

/// Resolves `.` and `..` lexically and accepts `\` separators, which
/// scripts written on Windows use in include paths.
pub fn normalize_path(path: &Path) -> PathBuf {
    let unified = path.to_string_lossy().replace('\\', "/");
    let mut normalized = PathBuf::new();
    for component in Path::new(&unified).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
