/// Path filters applied to walked files before they are read.
///
/// With no extensions and no ignore patterns every file passes, so a default
/// build ingests the whole tree.
use glob::Pattern;
use std::path::Path;

/// Checks if a file should be included based on its extension
pub fn has_valid_extension(path: &Path, extensions: &Option<Vec<String>>) -> bool {
    match extensions {
        None => true,
        Some(exts) => {
            if let Some(ext) = path.extension() {
                if let Some(ext_str) = ext.to_str() {
                    return exts
                        .iter()
                        .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext_str));
                }
            }
            false
        }
    }
}

/// Compiled ignore patterns. Patterns that fail to parse are dropped.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    patterns: Vec<Pattern>,
}

impl IgnoreSet {
    pub fn new(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|pattern| match Pattern::new(pattern) {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!("Ignoring invalid glob pattern '{}': {}", pattern, e);
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    /// Checks if a path matches any ignore pattern
    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        // Match against forward-slash paths so patterns behave the same on every platform
        let normalized = path.to_string_lossy().replace('\\', "/");
        self.patterns.iter().any(|p| p.matches(&normalized))
    }
}

/// Checks if a walked file should be handed to a line source
pub fn should_include_file(
    path: &Path,
    extensions: &Option<Vec<String>>,
    ignore: &IgnoreSet,
) -> bool {
    has_valid_extension(path, extensions) && !ignore.is_ignored(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_has_valid_extension() {
        let path = PathBuf::from("corpus/chapter1.txt");

        assert!(has_valid_extension(&path, &None));
        assert!(has_valid_extension(
            &path,
            &Some(vec!["txt".to_string(), "md".to_string()])
        ));
        assert!(has_valid_extension(&path, &Some(vec![".TXT".to_string()])));
        assert!(!has_valid_extension(&path, &Some(vec!["md".to_string()])));
        assert!(!has_valid_extension(
            Path::new("corpus/README"),
            &Some(vec!["txt".to_string()])
        ));
    }

    #[test]
    fn test_ignore_patterns() {
        let ignore = IgnoreSet::new(&["**/drafts/**".to_string(), "*.bak".to_string()]);

        assert!(ignore.is_ignored(Path::new("corpus/drafts/old.txt")));
        assert!(ignore.is_ignored(Path::new("notes.bak")));
        assert!(!ignore.is_ignored(Path::new("corpus/final/new.txt")));
    }

    #[test]
    fn test_invalid_pattern_is_dropped() {
        let ignore = IgnoreSet::new(&["[".to_string()]);
        assert!(!ignore.is_ignored(Path::new("anything.txt")));
    }

    #[test]
    fn test_should_include_file() {
        let ignore = IgnoreSet::new(&["**/skip/**".to_string()]);
        let exts = Some(vec!["txt".to_string()]);

        assert!(should_include_file(Path::new("a/b.txt"), &exts, &ignore));
        assert!(!should_include_file(Path::new("a/skip/b.txt"), &exts, &ignore));
        assert!(!should_include_file(Path::new("a/b.rs"), &exts, &ignore));
        assert!(should_include_file(
            Path::new("a/b.rs"),
            &None,
            &IgnoreSet::default()
        ));
    }
}
