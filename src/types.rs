/*!
 * Core types and data structures for ctxscan
 */

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Provenance of a pattern.
///
/// Variants are declared in ascending precedence: a user configuration
/// pattern is narrower than a VCS-ignore pattern, which is narrower than a
/// built-in default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Origin {
    /// Built-in defaults
    System,
    /// Patterns read from a `.gitignore` file
    VcsIgnore,
    /// Patterns from the user's configuration
    UserConfig,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::VcsIgnore => write!(f, "gitignore"),
            Self::UserConfig => write!(f, "user"),
        }
    }
}

/// Why a path is being evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
    /// The file's bytes will be embedded in output
    Content,
    /// The path is only named in a visual listing
    Tree,
    /// A visual listing that applies ignore patterns without leniency
    StrictTree,
}

/// Kind of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    pub fn is_dir(self) -> bool {
        self == Self::Directory
    }
}

/// Limits governing one walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalBudget {
    /// Directories at this depth or deeper are not expanded (root is depth 0)
    pub max_depth: usize,
    /// Wall-clock budget for the whole walk
    pub timeout: Duration,
    /// Largest file kept, in bytes (inclusive)
    pub max_file_size_bytes: u64,
}

impl TraversalBudget {
    pub const DEFAULT_MAX_DEPTH: usize = 10;
    pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
    pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 5;

    /// Create a budget from the externally tunable knobs
    pub fn new(max_depth: usize, timeout_ms: u64, max_file_size_mb: u64) -> Self {
        Self {
            max_depth,
            timeout: Duration::from_millis(timeout_ms),
            max_file_size_bytes: max_file_size_mb.saturating_mul(1024 * 1024),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_file_size_bytes(mut self, bytes: u64) -> Self {
        self.max_file_size_bytes = bytes;
        self
    }
}

impl Default for TraversalBudget {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_MAX_DEPTH,
            Self::DEFAULT_TIMEOUT_MS,
            Self::DEFAULT_MAX_FILE_SIZE_MB,
        )
    }
}

/// A node of the in-memory tree built for rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// Entry name
    pub name: String,
    /// Absolute path as walked
    pub path: PathBuf,
    /// File or directory
    pub kind: EntryKind,
    /// Directory contents, directories first; always empty for files
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: EntryKind::File,
            children: Vec::new(),
        }
    }

    pub fn directory(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: EntryKind::Directory,
            children: Vec::new(),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Find a direct child by name
    pub fn child(&self, name: &str) -> Option<&TreeNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Count (files, directories) beneath this node, excluding itself
    pub fn count(&self) -> (usize, usize) {
        self.children.iter().fold((0, 0), |(files, dirs), child| {
            let (f, d) = child.count();
            match child.kind {
                EntryKind::File => (files + f + 1, dirs + d),
                EntryKind::Directory => (files + f, dirs + d + 1),
            }
        })
    }

    /// Sort children the way listings present them: directories first, then
    /// files, each group by name
    pub(crate) fn sort_children(&mut self) {
        self.children
            .sort_by(|a, b| b.is_dir().cmp(&a.is_dir()).then_with(|| a.name.cmp(&b.name)));
    }
}

/// Outcome of trying to enter a directory during a walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryState {
    Visiting,
    TimedOut,
    LoopDetected,
    Unreadable,
}

/// Categories of things omitted from a walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipKind {
    PathUnreadable,
    PathTooLarge,
    DirectoryTimedOut,
    SymlinkLoopDetected,
    PatternMalformed,
    BinaryOrMedia,
}

/// Diagnostic record of everything omitted from a walk and why
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipReport {
    /// Files larger than the budget allows
    pub large_files: Vec<PathBuf>,
    /// Directories not visited because the deadline passed
    pub timed_out: Vec<PathBuf>,
    /// Directories whose real path was already visited
    pub symlink_loops: Vec<PathBuf>,
    /// Files left out of content extraction as binary or media
    pub binary_files: Vec<PathBuf>,
    /// Entries that could not be listed or stat'ed
    pub unreadable: Vec<PathBuf>,
    /// Raw patterns that were matched literally because they did not parse
    pub malformed_patterns: Vec<String>,
}

impl SkipReport {
    pub(crate) fn record(&mut self, kind: SkipKind, path: &Path) {
        let path = path.to_path_buf();
        match kind {
            SkipKind::PathUnreadable => self.unreadable.push(path),
            SkipKind::PathTooLarge => self.large_files.push(path),
            SkipKind::DirectoryTimedOut => self.timed_out.push(path),
            SkipKind::SymlinkLoopDetected => self.symlink_loops.push(path),
            SkipKind::BinaryOrMedia => self.binary_files.push(path),
            SkipKind::PatternMalformed => self
                .malformed_patterns
                .push(path.to_string_lossy().into_owned()),
        }
    }

    /// Number of entries recorded for a category
    pub fn count(&self, kind: SkipKind) -> usize {
        match kind {
            SkipKind::PathUnreadable => self.unreadable.len(),
            SkipKind::PathTooLarge => self.large_files.len(),
            SkipKind::DirectoryTimedOut => self.timed_out.len(),
            SkipKind::SymlinkLoopDetected => self.symlink_loops.len(),
            SkipKind::BinaryOrMedia => self.binary_files.len(),
            SkipKind::PatternMalformed => self.malformed_patterns.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.large_files.is_empty()
            && self.timed_out.is_empty()
            && self.symlink_loops.is_empty()
            && self.binary_files.is_empty()
            && self.unreadable.is_empty()
            && self.malformed_patterns.is_empty()
    }

    /// Append another report, e.g. from a second root
    pub fn merge(&mut self, other: SkipReport) {
        self.large_files.extend(other.large_files);
        self.timed_out.extend(other.timed_out);
        self.symlink_loops.extend(other.symlink_loops);
        self.binary_files.extend(other.binary_files);
        self.unreadable.extend(other.unreadable);
        self.malformed_patterns.extend(other.malformed_patterns);
        self.normalize();
    }

    /// Sort and de-duplicate every list so the report does not depend on
    /// traversal order
    pub(crate) fn normalize(&mut self) {
        for list in [
            &mut self.large_files,
            &mut self.timed_out,
            &mut self.symlink_loops,
            &mut self.binary_files,
            &mut self.unreadable,
        ] {
            list.sort();
            list.dedup();
        }
        self.malformed_patterns.sort();
        self.malformed_patterns.dedup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_defaults() {
        let budget = TraversalBudget::default();
        assert_eq!(budget.max_depth, 10);
        assert_eq!(budget.timeout, Duration::from_millis(30_000));
        assert_eq!(budget.max_file_size_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_origin_precedence() {
        assert!(Origin::System < Origin::VcsIgnore);
        assert!(Origin::VcsIgnore < Origin::UserConfig);
    }

    #[test]
    fn test_tree_node_sorting_and_count() {
        let mut root = TreeNode::directory("root", "/r");
        root.children.push(TreeNode::file("b.txt", "/r/b.txt"));
        let mut sub = TreeNode::directory("z", "/r/z");
        sub.children.push(TreeNode::file("c.txt", "/r/z/c.txt"));
        root.children.push(sub);
        root.children.push(TreeNode::file("a.txt", "/r/a.txt"));
        root.sort_children();

        let names: Vec<_> = root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["z", "a.txt", "b.txt"]);
        assert_eq!(root.count(), (3, 1));
    }

    #[test]
    fn test_skip_report_merge_sorts_and_dedups() {
        let mut a = SkipReport::default();
        a.record(SkipKind::PathTooLarge, Path::new("/b"));
        let mut b = SkipReport::default();
        b.record(SkipKind::PathTooLarge, Path::new("/a"));
        b.record(SkipKind::PathTooLarge, Path::new("/b"));
        a.merge(b);
        assert_eq!(a.large_files, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(a.count(SkipKind::PathTooLarge), 2);
        assert!(!a.is_empty());
    }
}
