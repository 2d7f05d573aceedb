//! Path-keyed lookup of failure annotations for an external renderer.
//!
//! This component only prepares lookup data; applying it to a visible
//! surface is the consumer's job.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use crate::models::FailureLocation;

/// An annotation ready for rendering: 0-based line plus hover text.
pub type Annotation = (u32, String);

/// Maintains the current failure-location set resolved against a base
/// directory, queryable by absolute file path.
#[derive(Debug, Default, Clone)]
pub struct DecorationIndex {
    base_dir: PathBuf,
    failures: Vec<FailureLocation>,
    entries: HashMap<PathBuf, Vec<Annotation>>,
}

impl DecorationIndex {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let mut index = DecorationIndex {
            base_dir: base_dir.into(),
            failures: Vec::new(),
            entries: HashMap::new(),
        };
        index.rebuild();
        index
    }

    /// Base directory currently used to resolve relative file names.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Replace the base directory used to resolve relative file names.
    pub fn set_base_dir(&mut self, base_dir: impl Into<PathBuf>) {
        self.base_dir = base_dir.into();
        self.rebuild();
    }

    /// Replace the failure-location set wholesale.
    pub fn set_failures(&mut self, failures: Vec<FailureLocation>) {
        self.failures = failures;
        self.rebuild();
    }

    /// Annotations whose resolved path matches the given absolute path,
    /// in encounter order.
    pub fn annotations_for(&self, path: &Path) -> Vec<Annotation> {
        self.entries
            .get(&normalize_path(path))
            .cloned()
            .unwrap_or_default()
    }

    /// Resolve a reported file name against the base directory.
    pub fn resolve(&self, file_name: &str) -> PathBuf {
        // Runner output may use either separator convention
        let unified = file_name.replace('\\', "/");
        let reported = Path::new(&unified);
        let joined = if reported.is_absolute() {
            reported.to_path_buf()
        } else {
            self.base_dir.join(reported)
        };
        normalize_path(&joined)
    }

    fn rebuild(&mut self) {
        self.entries.clear();
        for failure in &self.failures {
            let resolved = self.resolve(&failure.file_name);
            self.entries
                .entry(resolved)
                .or_default()
                .push((failure.line_number, failure.hover_message.clone()));
        }
    }
}

/// Normalize a path component-wise: drop `.`, fold `..`, and on Windows
/// lowercase for case-insensitive comparison.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component.as_os_str());
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    if cfg!(windows) {
        PathBuf::from(normalized.to_string_lossy().to_lowercase())
    } else {
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(file_name: &str, line_number: u32) -> FailureLocation {
        FailureLocation {
            file_name: file_name.to_string(),
            line_number,
            hover_message: format!("~~~c++\n{file_name}:{line_number}\n~~~"),
        }
    }

    #[test]
    fn test_relative_file_resolves_against_base_dir() {
        let index = DecorationIndex::new("/project/build");
        assert_eq!(
            index.resolve("a/b.cpp"),
            PathBuf::from("/project/build/a/b.cpp")
        );
    }

    #[test]
    fn test_backslash_separators_are_unified() {
        let index = DecorationIndex::new("/project/build");
        assert_eq!(
            index.resolve("a\\b.cpp"),
            PathBuf::from("/project/build/a/b.cpp")
        );
    }

    #[test]
    fn test_absolute_file_used_as_is() {
        let index = DecorationIndex::new("/project/build");
        assert_eq!(index.resolve("/src/x.cpp"), PathBuf::from("/src/x.cpp"));
    }

    #[test]
    fn test_dot_components_are_normalized() {
        let index = DecorationIndex::new("/project/build");
        assert_eq!(
            index.resolve("./sub/../a.cpp"),
            PathBuf::from("/project/build/a.cpp")
        );
    }

    #[test]
    fn test_query_returns_annotations_in_encounter_order() {
        let mut index = DecorationIndex::new("/project/build");
        index.set_failures(vec![
            failure("a/b.cpp", 9),
            failure("other.cpp", 1),
            failure("a/b.cpp", 3),
        ]);

        let annotations = index.annotations_for(Path::new("/project/build/a/b.cpp"));
        let lines: Vec<u32> = annotations.iter().map(|(line, _)| *line).collect();
        assert_eq!(lines, vec![9, 3]);
    }

    #[test]
    fn test_base_dir_change_recomputes() {
        let mut index = DecorationIndex::new("/old");
        index.set_failures(vec![failure("a.cpp", 0)]);
        assert_eq!(index.annotations_for(Path::new("/old/a.cpp")).len(), 1);

        index.set_base_dir("/new");
        assert!(index.annotations_for(Path::new("/old/a.cpp")).is_empty());
        assert_eq!(index.annotations_for(Path::new("/new/a.cpp")).len(), 1);
    }

    #[test]
    fn test_unknown_path_yields_empty() {
        let index = DecorationIndex::new("/project/build");
        assert!(
            index
                .annotations_for(Path::new("/project/build/nope.cpp"))
                .is_empty()
        );
    }
}
