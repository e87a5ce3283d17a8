use crossbeam_channel::{unbounded, Receiver, Sender};
use ignore::WalkBuilder;
use std::fs::{self, FileType};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use tracing::{debug, trace};

use crate::cancel::CancellationToken;
use crate::config::BuildConfig;
use crate::errors::{DictionaryError, DictionaryResult};
use crate::filters::{should_include_file, IgnoreSet};

/// Controls which entries the walker visits and emits
#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub file_extensions: Option<Vec<String>>,
    pub ignore: IgnoreSet,
    pub include_hidden: bool,
    pub respect_ignore_files: bool,
    pub follow_links: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            file_extensions: None,
            ignore: IgnoreSet::default(),
            include_hidden: true,
            respect_ignore_files: false,
            follow_links: false,
        }
    }
}

impl WalkOptions {
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            file_extensions: config.file_extensions.clone(),
            ignore: IgnoreSet::new(&config.ignore_patterns),
            include_hidden: config.include_hidden,
            respect_ignore_files: config.respect_ignore_files,
            follow_links: config.follow_links,
        }
    }
}

/// Lazy sequence of files under a root, produced by a background thread.
///
/// Each item is either a file path or a classified traversal failure. A failed
/// entry never yields a path, and never stops the walk.
#[derive(Debug)]
pub struct FileWalk {
    rx: Receiver<DictionaryResult<PathBuf>>,
    handle: Option<JoinHandle<bool>>,
}

impl FileWalk {
    /// Waits for the background walker to exit.
    ///
    /// Returns `true` if every entry under the root was visited, `false` if the
    /// walk stopped early because it was cancelled or its consumer went away.
    pub fn finish(mut self) -> DictionaryResult<bool> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| DictionaryError::WorkerPanicked("directory walker".to_string())),
            None => Ok(true),
        }
    }
}

impl Iterator for FileWalk {
    type Item = DictionaryResult<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.recv().ok()
    }
}

/// Starts walking `root` on a background thread.
///
/// Consumption can begin before the walk finishes. Dropping the returned
/// iterator stops the walker at its next entry.
pub fn enumerate_files(
    root: impl Into<PathBuf>,
    options: WalkOptions,
    cancel: CancellationToken,
) -> DictionaryResult<FileWalk> {
    let root = root.into();
    let (tx, rx) = unbounded();

    let handle = thread::Builder::new()
        .name("wordhoard-walker".to_string())
        .spawn(move || walk(&root, &options, &cancel, &tx))?;

    Ok(FileWalk {
        rx,
        handle: Some(handle),
    })
}

/// Returns `true` if the walk ran to completion
fn walk(
    root: &Path,
    options: &WalkOptions,
    cancel: &CancellationToken,
    tx: &Sender<DictionaryResult<PathBuf>>,
) -> bool {
    debug!("Walking {}", root.display());

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(!options.include_hidden)
        .ignore(options.respect_ignore_files)
        .git_ignore(options.respect_ignore_files)
        .git_global(options.respect_ignore_files)
        .git_exclude(options.respect_ignore_files)
        .parents(options.respect_ignore_files)
        .require_git(false)
        .follow_links(options.follow_links);

    for entry in builder.build() {
        if cancel.is_cancelled() {
            debug!("Walk of {} cancelled", root.display());
            return false;
        }

        let item = match entry {
            Ok(entry) => {
                let Some(file_type) = entry.file_type() else {
                    continue;
                };
                if !is_regular_file(entry.path(), file_type) {
                    if !file_type.is_dir() {
                        trace!("Skipped non-regular entry {}", entry.path().display());
                    }
                    continue;
                }
                if !should_include_file(entry.path(), &options.file_extensions, &options.ignore)
                {
                    trace!("Filtered out {}", entry.path().display());
                    continue;
                }
                Ok(entry.into_path())
            }
            Err(err) => {
                debug!("Walk error: {}", err);
                Err(DictionaryError::traversal(
                    error_path(&err),
                    error_message(&err),
                ))
            }
        };

        if tx.send(item).is_err() {
            debug!("File consumer went away, stopping walk");
            return false;
        }
    }
    true
}

/// Regular files and links to them. FIFOs, sockets and devices are left out
/// since opening them can block. A dangling link is kept so that the failed
/// open is recorded against it.
fn is_regular_file(path: &Path, file_type: FileType) -> bool {
    if file_type.is_file() {
        return true;
    }
    if !file_type.is_symlink() {
        return false;
    }
    match fs::metadata(path) {
        Ok(metadata) => metadata.is_file(),
        Err(_) => true,
    }
}

fn error_path(err: &ignore::Error) -> Option<PathBuf> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.clone()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        ignore::Error::Loop { child, .. } => Some(child.clone()),
        _ => None,
    }
}

fn error_message(err: &ignore::Error) -> String {
    match err {
        ignore::Error::WithPath { err, .. }
        | ignore::Error::WithDepth { err, .. }
        | ignore::Error::WithLineNumber { err, .. } => error_message(err),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::tempdir;

    fn collect_paths(walk: FileWalk, root: &Path) -> BTreeSet<PathBuf> {
        walk.filter_map(Result::ok)
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect()
    }

    #[test]
    fn test_walk_recurses_and_skips_directories() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b/c")).unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        fs::write(dir.path().join("top.txt"), "x").unwrap();
        fs::write(dir.path().join("a/one.txt"), "x").unwrap();
        fs::write(dir.path().join("a/b/c/deep.md"), "x").unwrap();
        fs::write(dir.path().join(".hidden"), "x").unwrap();

        let walk = enumerate_files(
            dir.path(),
            WalkOptions::default(),
            CancellationToken::new(),
        )
        .unwrap();
        let paths = collect_paths(walk, dir.path());

        let expected: BTreeSet<PathBuf> = ["top.txt", "a/one.txt", "a/b/c/deep.md", ".hidden"]
            .iter()
            .map(PathBuf::from)
            .collect();
        assert_eq!(paths, expected);
    }

    #[test]
    fn test_walk_applies_filters() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("drafts")).unwrap();
        fs::write(dir.path().join("keep.txt"), "x").unwrap();
        fs::write(dir.path().join("skip.rs"), "x").unwrap();
        fs::write(dir.path().join("drafts/old.txt"), "x").unwrap();
        fs::write(dir.path().join(".secret.txt"), "x").unwrap();

        let options = WalkOptions {
            file_extensions: Some(vec!["txt".to_string()]),
            ignore: IgnoreSet::new(&["**/drafts/**".to_string()]),
            include_hidden: false,
            ..WalkOptions::default()
        };
        let walk = enumerate_files(dir.path(), options, CancellationToken::new()).unwrap();
        let paths = collect_paths(walk, dir.path());

        assert_eq!(paths, BTreeSet::from([PathBuf::from("keep.txt")]));
    }

    #[test]
    fn test_missing_root_reports_traversal_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");

        let walk = enumerate_files(&missing, WalkOptions::default(), CancellationToken::new())
            .unwrap();
        let items: Vec<_> = walk.collect();

        assert_eq!(items.len(), 1);
        match &items[0] {
            Err(err @ DictionaryError::Traversal { .. }) => {
                assert_eq!(err.path(), Some(missing.as_path()));
            }
            other => panic!("expected traversal error, got {:?}", other),
        }
    }

    #[test]
    fn test_cancelled_walk_emits_nothing() {
        let dir = tempdir().unwrap();
        for i in 0..10 {
            fs::write(dir.path().join(format!("f{}.txt", i)), "x").unwrap();
        }

        let cancel = CancellationToken::new();
        cancel.cancel();
        let walk = enumerate_files(dir.path(), WalkOptions::default(), cancel).unwrap();
        assert_eq!(walk.count(), 0);
    }

    #[test]
    fn test_finish_after_drain() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();

        let mut walk =
            enumerate_files(dir.path(), WalkOptions::default(), CancellationToken::new()).unwrap();
        assert!(walk.by_ref().all(|item| item.is_ok()));
        assert!(walk.finish().unwrap());
    }

    #[test]
    fn test_cancel_after_walk_drained_reports_complete() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();

        let cancel = CancellationToken::new();
        let mut walk = enumerate_files(dir.path(), WalkOptions::default(), cancel.clone()).unwrap();
        assert_eq!(walk.by_ref().count(), 1);
        cancel.cancel();
        assert!(walk.finish().unwrap());
    }

    #[test]
    fn test_cancelled_walk_reports_incomplete() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut walk = enumerate_files(dir.path(), WalkOptions::default(), cancel).unwrap();
        assert_eq!(walk.by_ref().count(), 0);
        assert!(!walk.finish().unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_special_files_are_skipped() {
        use std::os::unix::net::UnixListener;

        let dir = tempdir().unwrap();
        fs::write(dir.path().join("words.txt"), "x").unwrap();
        let _listener = UnixListener::bind(dir.path().join("socket")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("socket"), dir.path().join("to-socket"))
            .unwrap();
        std::os::unix::fs::symlink(dir.path().join("words.txt"), dir.path().join("to-words"))
            .unwrap();

        let walk =
            enumerate_files(dir.path(), WalkOptions::default(), CancellationToken::new()).unwrap();
        let paths = collect_paths(walk, dir.path());
        assert_eq!(
            paths,
            BTreeSet::from([PathBuf::from("words.txt"), PathBuf::from("to-words")])
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_emitted_as_file() {
        let dir = tempdir().unwrap();
        std::os::unix::fs::symlink(dir.path().join("nowhere"), dir.path().join("link")).unwrap();

        let walk =
            enumerate_files(dir.path(), WalkOptions::default(), CancellationToken::new()).unwrap();
        let paths = collect_paths(walk, dir.path());
        assert_eq!(paths, BTreeSet::from([PathBuf::from("link")]));
    }
}
