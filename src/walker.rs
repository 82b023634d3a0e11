/*!
 * Bounded directory traversal
 *
 * Two entry points share one traversal core: [`DirectoryWalker::build_tree`]
 * produces an in-memory tree for rendering, [`DirectoryWalker::find_files`]
 * produces a flat list of files for content extraction. Both honour a
 * [`TraversalBudget`], guard against symlink loops, and consult the
 * [`ExclusionEngine`] at every node. Sibling directories are visited in
 * parallel; results are sorted so they never depend on scheduling.
 */

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use rayon::prelude::*;
use regex::Regex;
use walkdir::WalkDir;

use crate::classify::FileClass;
use crate::error::Result;
use crate::exclusion::ExclusionEngine;
use crate::logger::ScanLogger;
use crate::types::{
    DirectoryState, EntryKind, Purpose, SkipKind, SkipReport, TraversalBudget, TreeNode,
};
use crate::utils::format_file_size;
use crate::{bail, ensure};

/// Extra filters layered on top of the exclusion engine by `find_files`
#[derive(Debug, Clone, Default)]
pub struct FileFilters {
    /// Any path whose string form contains one of these is skipped
    pub ignore_paths: Vec<String>,
    /// Skips entries whose root-relative path matches
    pub ignore_patterns: Vec<Regex>,
    /// When non-empty, a file must match at least one to be kept
    pub include_patterns: Vec<Regex>,
}

impl FileFilters {
    /// Compile filters from raw strings
    pub fn new<S: AsRef<str>>(
        ignore_paths: &[S],
        ignore_patterns: &[S],
        include_patterns: &[S],
    ) -> Result<Self> {
        let compile = |patterns: &[S]| -> Result<Vec<Regex>> {
            patterns
                .iter()
                .map(|p| Regex::new(p.as_ref()).map_err(Into::into))
                .collect()
        };

        Ok(Self {
            ignore_paths: ignore_paths
                .iter()
                .map(|p| p.as_ref().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            ignore_patterns: compile(ignore_patterns)?,
            include_patterns: compile(include_patterns)?,
        })
    }

    fn is_ignored(&self, path: &Path, rel: &str) -> bool {
        let full = path.to_string_lossy();
        self.ignore_paths.iter().any(|p| full.contains(p.as_str()))
            || self.ignore_patterns.iter().any(|re| re.is_match(rel))
    }

    fn is_included(&self, rel: &str) -> bool {
        self.include_patterns.is_empty() || self.include_patterns.iter().any(|re| re.is_match(rel))
    }
}

/// One listed directory entry, already stat'ed
#[derive(Debug)]
struct Entry {
    path: PathBuf,
    name: String,
    kind: EntryKind,
    size: u64,
    symlink: bool,
}

/// State shared by every branch of one walk
struct Walk<'a> {
    purpose: Purpose,
    budget: TraversalBudget,
    started: Instant,
    visited: Mutex<HashSet<PathBuf>>,
    skips: Mutex<SkipReport>,
    filters: Option<&'a FileFilters>,
}

impl<'a> Walk<'a> {
    fn new(purpose: Purpose, budget: TraversalBudget, filters: Option<&'a FileFilters>) -> Self {
        Self {
            purpose,
            budget,
            started: Instant::now(),
            visited: Mutex::new(HashSet::new()),
            skips: Mutex::new(SkipReport::default()),
            filters,
        }
    }

    // A zero timeout expires immediately
    fn expired(&self) -> bool {
        self.started.elapsed() >= self.budget.timeout
    }

    fn skip(&self, kind: SkipKind, path: &Path) {
        self.skips
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(kind, path);
    }

    /// Returns false if the real path was already visited
    fn mark_visited(&self, canonical: PathBuf) -> bool {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(canonical)
    }

    fn into_report(self) -> SkipReport {
        let mut report = self
            .skips
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        report.normalize();
        report
    }
}

/// Walks directories under the rules of one exclusion engine
pub struct DirectoryWalker {
    engine: Arc<ExclusionEngine>,
    logger: ScanLogger,
}

impl DirectoryWalker {
    /// Create a new walker
    pub fn new(engine: Arc<ExclusionEngine>, logger: ScanLogger) -> Self {
        Self { engine, logger }
    }

    /// The engine consulted for every node
    pub fn engine(&self) -> &ExclusionEngine {
        &self.engine
    }

    /// Build the tree under `root` for rendering.
    ///
    /// Directories come before files and both are sorted by name. A
    /// directory at `max_depth` is listed but not expanded.
    pub fn build_tree(
        &self,
        root: &Path,
        budget: TraversalBudget,
        purpose: Purpose,
    ) -> Result<(TreeNode, SkipReport)> {
        let root = self.open_root(root)?;
        let walk = Walk::new(purpose, budget, None);
        self.logger.debug(format_args!(
            "building {:?} tree of {} (max depth {})",
            purpose,
            root.display(),
            budget.max_depth
        ));

        let name = display_name(&root);
        let node = match self.enter(&root, &walk) {
            DirectoryState::Visiting => self.visit_tree(&root, name, 0, &walk),
            _ => TreeNode::directory(name, &root),
        };

        let mut report = walk.into_report();
        report.malformed_patterns = self.engine.malformed_patterns();
        report.normalize();
        Ok((node, report))
    }

    /// Collect the files under `root` that survive every filter.
    ///
    /// Order of checks per entry: symlink-loop guard, `ignore_paths`,
    /// `ignore_patterns`, the exclusion engine, then `include_patterns`. The
    /// result is sorted and contains each real file once.
    pub fn find_files(
        &self,
        root: &Path,
        budget: TraversalBudget,
        purpose: Purpose,
        filters: &FileFilters,
    ) -> Result<(Vec<PathBuf>, SkipReport)> {
        let root = self.open_root(root)?;
        let walk = Walk::new(purpose, budget, Some(filters));
        self.logger.debug(format_args!(
            "finding {:?} files under {} (max depth {})",
            purpose,
            root.display(),
            budget.max_depth
        ));

        let mut files = match self.enter(&root, &walk) {
            DirectoryState::Visiting => self.visit_files(&root, 0, &walk),
            _ => Vec::new(),
        };
        files.sort();

        let mut seen = HashSet::new();
        files.retain(|path| seen.insert(fs::canonicalize(path).unwrap_or_else(|_| path.clone())));

        let mut report = walk.into_report();
        report.malformed_patterns = self.engine.malformed_patterns();
        report.normalize();
        Ok((files, report))
    }

    /// Validate the walk root. This is the only failure that aborts a walk.
    fn open_root(&self, root: &Path) -> Result<PathBuf> {
        ensure!(root.exists(), RootNotFound, "{}", root.display());
        ensure!(root.is_dir(), RootNotFound, "{} is not a directory", root.display());

        let canonical = match fs::canonicalize(root) {
            Ok(path) => path,
            Err(e) => bail!(RootUnreadable, "{}: {}", root.display(), e),
        };
        if let Err(e) = fs::read_dir(&canonical) {
            bail!(RootUnreadable, "{}: {}", root.display(), e);
        }
        Ok(canonical)
    }

    /// Check the deadline and the visited set before descending into `dir`
    fn enter(&self, dir: &Path, walk: &Walk) -> DirectoryState {
        if walk.expired() {
            walk.skip(SkipKind::DirectoryTimedOut, dir);
            self.logger
                .debug(format_args!("timed out before {}", dir.display()));
            return DirectoryState::TimedOut;
        }

        let canonical = match fs::canonicalize(dir) {
            Ok(path) => path,
            Err(e) => {
                walk.skip(SkipKind::PathUnreadable, dir);
                self.logger
                    .warn(format_args!("cannot resolve {}: {}", dir.display(), e));
                return DirectoryState::Unreadable;
            }
        };
        if !walk.mark_visited(canonical) {
            walk.skip(SkipKind::SymlinkLoopDetected, dir);
            self.logger
                .debug(format_args!("symlink loop at {}", dir.display()));
            return DirectoryState::LoopDetected;
        }

        DirectoryState::Visiting
    }

    /// Admit the subdirectories of one listing and enter them one by one.
    ///
    /// Real directories are entered before symlinks and both by name, so when
    /// a link and its target are siblings the target keeps the subtree no
    /// matter how the listing or the thread pool orders them.
    fn claim(&self, mut dirs: Vec<Entry>, walk: &Walk) -> Vec<(Entry, DirectoryState)> {
        dirs.sort_by(|a, b| a.symlink.cmp(&b.symlink).then_with(|| a.name.cmp(&b.name)));
        dirs.into_iter()
            .filter(|e| self.admit_directory(e, walk))
            .map(|e| {
                let state = self.enter(&e.path, walk);
                (e, state)
            })
            .collect()
    }

    /// List and stat the entries of a directory. `None` if it cannot be read.
    fn list(&self, dir: &Path, walk: &Walk) -> Option<Vec<Entry>> {
        let mut entries = Vec::new();

        for item in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
        {
            let dent = match item {
                Ok(dent) => dent,
                Err(e) => {
                    let failed = e.path().map(Path::to_path_buf);
                    self.logger
                        .warn(format_args!("cannot read in {}: {}", dir.display(), e));
                    match failed {
                        Some(path) if path != dir && e.depth() > 0 => {
                            walk.skip(SkipKind::PathUnreadable, &path);
                            continue;
                        }
                        _ => {
                            walk.skip(SkipKind::PathUnreadable, dir);
                            return None;
                        }
                    }
                }
            };

            // Follow symlinks so links to directories are walked (and loop-checked)
            let meta = match fs::metadata(dent.path()) {
                Ok(meta) => meta,
                Err(e) => {
                    walk.skip(SkipKind::PathUnreadable, dent.path());
                    self.logger
                        .warn(format_args!("cannot stat {}: {}", dent.path().display(), e));
                    continue;
                }
            };

            entries.push(Entry {
                path: dent.path().to_path_buf(),
                name: dent.file_name().to_string_lossy().into_owned(),
                kind: if meta.is_dir() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                },
                size: meta.len(),
                symlink: dent.path_is_symlink(),
            });
        }

        Some(entries)
    }

    /// Size limit, then exclusion rules. Records why a file was dropped.
    fn admit_file(&self, entry: &Entry, walk: &Walk) -> bool {
        if entry.size > walk.budget.max_file_size_bytes {
            walk.skip(SkipKind::PathTooLarge, &entry.path);
            self.logger.debug(format_args!(
                "{} is {}; over the size limit",
                entry.path.display(),
                format_file_size(entry.size)
            ));
            return false;
        }

        let rel = self.engine.relative_path(&entry.path).unwrap_or_default();
        if let Some(filters) = walk.filters {
            if filters.is_ignored(&entry.path, &rel) {
                return false;
            }
        }

        if self
            .engine
            .should_exclude(&entry.path, EntryKind::File, walk.purpose)
        {
            let class = FileClass::of(&entry.path);
            if walk.purpose == Purpose::Content && (class.is_binary() || class.is_media()) {
                walk.skip(SkipKind::BinaryOrMedia, &entry.path);
            }
            return false;
        }

        match walk.filters {
            Some(filters) => filters.is_included(&rel),
            None => true,
        }
    }

    fn admit_directory(&self, entry: &Entry, walk: &Walk) -> bool {
        if let Some(filters) = walk.filters {
            let rel = self.engine.relative_path(&entry.path).unwrap_or_default();
            if filters.is_ignored(&entry.path, &rel) {
                return false;
            }
        }
        !self
            .engine
            .should_exclude(&entry.path, EntryKind::Directory, walk.purpose)
    }

    /// Expand a directory that was already entered
    fn visit_tree(&self, dir: &Path, name: String, depth: usize, walk: &Walk) -> TreeNode {
        let mut node = TreeNode::directory(name, dir);

        if depth >= walk.budget.max_depth {
            return node;
        }
        let Some(entries) = self.list(dir, walk) else {
            return node;
        };

        let (dirs, files): (Vec<Entry>, Vec<Entry>) = entries
            .into_iter()
            .partition(|e| e.kind == EntryKind::Directory);

        let subdirs: Vec<TreeNode> = self
            .claim(dirs, walk)
            .into_par_iter()
            .map(|(e, state)| match state {
                DirectoryState::Visiting => self.visit_tree(&e.path, e.name, depth + 1, walk),
                _ => TreeNode::directory(e.name, &e.path),
            })
            .collect();
        node.children.extend(subdirs);

        node.children.extend(
            files
                .into_iter()
                .filter(|e| self.admit_file(e, walk))
                .map(|e| TreeNode::file(e.name, e.path)),
        );

        node.sort_children();
        self.logger.debug(format_args!(
            "listed {} ({} entries)",
            dir.display(),
            node.children.len()
        ));
        node
    }

    fn visit_files(&self, dir: &Path, depth: usize, walk: &Walk) -> Vec<PathBuf> {
        if depth >= walk.budget.max_depth {
            return Vec::new();
        }
        let Some(entries) = self.list(dir, walk) else {
            return Vec::new();
        };

        let (dirs, files): (Vec<Entry>, Vec<Entry>) = entries
            .into_iter()
            .partition(|e| e.kind == EntryKind::Directory);

        let mut found: Vec<PathBuf> = files
            .into_iter()
            .filter(|e| self.admit_file(e, walk))
            .map(|e| e.path)
            .collect();

        let nested: Vec<PathBuf> = self
            .claim(dirs, walk)
            .into_par_iter()
            .filter(|(_, state)| *state == DirectoryState::Visiting)
            .flat_map_iter(|(e, _)| self.visit_files(&e.path, depth + 1, walk))
            .collect();
        found.extend(nested);

        found
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
