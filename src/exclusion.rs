/*!
 * Purpose-scoped include/exclude decisions
 *
 * An [`ExclusionEngine`] owns the [`PatternSet`] for one root and answers a
 * single question: should this path be left out, given why it is being
 * looked at? Decisions are memoized per `(purpose, relative path, kind)`.
 */

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::classify::{FileClass, DEFAULT_PATTERNS};
use crate::logger::ScanLogger;
use crate::patterns::{PatternSet, PatternSource};
use crate::types::{EntryKind, Origin, Purpose};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DecisionKey {
    purpose: Purpose,
    rel_path: String,
    kind: EntryKind,
}

/// Exclusion rules for one traversal root
#[derive(Debug)]
pub struct ExclusionEngine {
    root: PathBuf,
    canonical_root: Option<PathBuf>,
    patterns: RwLock<PatternSet>,
    cache: RwLock<HashMap<DecisionKey, bool>>,
    logger: ScanLogger,
}

impl ExclusionEngine {
    /// Create an engine over an existing pattern set, rooted at its base
    pub fn new(patterns: PatternSet, logger: ScanLogger) -> Self {
        let root = patterns.base().to_path_buf();
        let canonical_root = fs::canonicalize(&root).ok();
        Self {
            root,
            canonical_root,
            patterns: RwLock::new(patterns),
            cache: RwLock::new(HashMap::new()),
            logger,
        }
    }

    /// Create an engine with only the built-in system patterns
    pub fn with_defaults(root: impl Into<PathBuf>, logger: ScanLogger) -> Self {
        let mut patterns = PatternSet::new(root, logger);
        patterns.add_patterns(DEFAULT_PATTERNS.iter().copied(), Origin::System);
        Self::new(patterns, logger)
    }

    /// Create an engine with system defaults plus VCS-ignore and user
    /// patterns taken from a configuration source
    pub fn from_source(
        root: impl Into<PathBuf>,
        source: &dyn PatternSource,
        logger: ScanLogger,
    ) -> Self {
        let root = root.into();
        let engine = Self::with_defaults(&root, logger);
        engine.add_patterns(source.vcs_ignore_patterns(&root), Origin::VcsIgnore);
        engine.add_patterns(source.user_patterns(), Origin::UserConfig);
        engine
    }

    /// The root relative paths are computed against
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Add patterns after construction. Invalidates every cached decision.
    pub fn add_patterns<I, S>(&self, patterns: I, origin: Origin) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = self.patterns.write().unwrap_or_else(PoisonError::into_inner);
        let added = set.add_patterns(patterns, origin);
        if added > 0 {
            self.clear_cache();
        }
        added
    }

    /// Drop all memoized decisions
    pub fn clear_cache(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of memoized decisions
    pub fn cached_decisions(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Raw text of patterns that are matched literally
    pub fn malformed_patterns(&self) -> Vec<String> {
        self.patterns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .malformed()
    }

    /// Which origin, if any, excludes a path by pattern alone
    pub fn matched_origin(&self, path: &Path, kind: EntryKind) -> Option<Origin> {
        let rel = self.relative_path(path)?;
        self.patterns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .matches(&rel, kind.is_dir())
    }

    /// Root-relative, `/`-separated form of a path.
    ///
    /// Relative input is taken as already relative to the root. Returns
    /// `None` for paths outside the root or containing `..`.
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        let rel = if path.is_absolute() {
            path.strip_prefix(&self.root)
                .ok()
                .or_else(|| {
                    self.canonical_root
                        .as_deref()
                        .and_then(|root| path.strip_prefix(root).ok())
                })?
        } else {
            path
        };

        let mut parts = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy()),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        Some(parts.join("/"))
    }

    /// Decide whether a path of known kind should be left out
    pub fn should_exclude(&self, path: &Path, kind: EntryKind, purpose: Purpose) -> bool {
        match self.relative_path(path) {
            Some(rel) => self.decide(&rel, kind, purpose),
            None => {
                self.logger.warn(format_args!(
                    "{} is outside {}; excluding",
                    path.display(),
                    self.root.display()
                ));
                true
            }
        }
    }

    /// Like [`Self::should_exclude`], but stats the path to learn its kind.
    /// A path that cannot be stat'ed is excluded.
    pub fn should_exclude_path(&self, path: &Path, purpose: Purpose) -> bool {
        match fs::metadata(path) {
            Ok(meta) => {
                let kind = if meta.is_dir() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                };
                self.should_exclude(path, kind, purpose)
            }
            Err(e) => {
                self.logger.warn(format_args!(
                    "cannot stat {}: {}; excluding",
                    path.display(),
                    e
                ));
                true
            }
        }
    }

    fn decide(&self, rel: &str, kind: EntryKind, purpose: Purpose) -> bool {
        // The root itself is never excluded
        if rel.is_empty() {
            return false;
        }

        let key = DecisionKey {
            purpose,
            rel_path: rel.to_string(),
            kind,
        };
        if let Some(&hit) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return hit;
        }

        let class = match kind {
            EntryKind::File => FileClass::of(Path::new(rel)),
            EntryKind::Directory => FileClass::Text,
        };
        // Tree listings always surface media so users can see it exists
        let tree_media = purpose == Purpose::Tree && class.is_media();

        let ancestor_excluded = match rel.rsplit_once('/') {
            Some((parent, _)) => self.decide(parent, EntryKind::Directory, purpose),
            None => false,
        };

        let patterns = self.patterns.read().unwrap_or_else(PoisonError::into_inner);
        let excluded = if ancestor_excluded && !tree_media {
            true
        } else {
            match class {
                FileClass::System => true,
                FileClass::Binary | FileClass::Media if purpose == Purpose::Content => true,
                _ if tree_media => false,
                _ => patterns.matches(rel, kind.is_dir()).is_some(),
            }
        };

        self.logger.debug(format_args!(
            "{:?} {:?} {} -> {}",
            purpose,
            kind,
            rel,
            if excluded { "exclude" } else { "include" }
        ));

        // Hold the pattern lock while storing so a concurrent add_patterns
        // cannot clear the cache between evaluation and insert
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, excluded);
        drop(patterns);

        excluded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    fn engine(user: &[&str]) -> ExclusionEngine {
        let engine = ExclusionEngine::with_defaults("/project", ScanLogger::quiet());
        engine.add_patterns(user.iter().copied(), Origin::UserConfig);
        engine
    }

    fn file(e: &ExclusionEngine, path: &str, purpose: Purpose) -> bool {
        e.should_exclude(Path::new(path), EntryKind::File, purpose)
    }

    #[test]
    fn test_relative_path_normalization() {
        let e = engine(&[]);
        assert_eq!(
            e.relative_path(Path::new("/project/./src/main.rs")).as_deref(),
            Some("src/main.rs")
        );
        assert_eq!(e.relative_path(Path::new("src/lib.rs")).as_deref(), Some("src/lib.rs"));
        assert_eq!(e.relative_path(Path::new("/project")).as_deref(), Some(""));
        assert_eq!(e.relative_path(Path::new("/elsewhere/x.rs")), None);
        assert_eq!(e.relative_path(Path::new("../x.rs")), None);
    }

    #[test]
    fn test_outside_root_is_excluded() {
        let e = engine(&[]);
        assert!(file(&e, "/elsewhere/main.rs", Purpose::Tree));
    }

    #[test]
    fn test_root_is_never_excluded() {
        let e = engine(&["*"]);
        assert!(!e.should_exclude(Path::new("/project"), EntryKind::Directory, Purpose::Content));
    }

    #[test]
    fn test_binary_files_by_purpose() {
        let e = engine(&[]);
        assert!(file(&e, "lib/app.jar", Purpose::Content));
        assert!(!file(&e, "lib/app.jar", Purpose::Tree));
        assert!(!file(&e, "lib/app.jar", Purpose::StrictTree));
    }

    #[test]
    fn test_binary_files_remain_pattern_excludable_in_tree() {
        let e = engine(&["*.jar"]);
        assert!(file(&e, "lib/app.jar", Purpose::Tree));
    }

    #[test]
    fn test_system_files_always_excluded() {
        let e = engine(&[]);
        for purpose in [Purpose::Content, Purpose::Tree, Purpose::StrictTree] {
            assert!(file(&e, "assets/.DS_Store", purpose));
        }
    }

    #[test]
    fn test_media_override() {
        let e = engine(&["*.png"]);
        assert!(file(&e, "assets/logo.png", Purpose::Content));
        assert!(!file(&e, "assets/logo.png", Purpose::Tree));
        assert!(file(&e, "assets/logo.png", Purpose::StrictTree));
    }

    #[test]
    fn test_media_surfaces_inside_excluded_directory_for_tree_only() {
        let e = engine(&["assets/"]);
        assert!(e.should_exclude(Path::new("assets"), EntryKind::Directory, Purpose::Tree));
        assert!(!file(&e, "assets/logo.png", Purpose::Tree));
        assert!(file(&e, "assets/logo.png", Purpose::StrictTree));
        assert!(file(&e, "assets/notes.txt", Purpose::Tree));
    }

    #[test]
    fn test_ancestor_propagation() {
        let e = engine(&["private/"]);
        for purpose in [Purpose::Content, Purpose::Tree, Purpose::StrictTree] {
            assert!(file(&e, "private/a/b/secret.txt", purpose));
            assert!(e.should_exclude(
                Path::new("private/a"),
                EntryKind::Directory,
                purpose
            ));
        }
    }

    #[test]
    fn test_default_dependency_directories_excluded() {
        let e = engine(&[]);
        assert!(e.should_exclude(
            Path::new("/project/node_modules"),
            EntryKind::Directory,
            Purpose::Tree
        ));
        assert!(file(&e, "/project/node_modules/pkg/index.js", Purpose::Content));
        assert!(!file(&e, "/project/src/index.js", Purpose::Content));
    }

    #[test]
    fn test_decisions_are_idempotent_and_cached() {
        let e = engine(&["*.md"]);
        let first = file(&e, "docs/readme.md", Purpose::Content);
        let cached = e.cached_decisions();
        assert!(cached >= 2, "file and its parent should be cached");
        let second = file(&e, "docs/readme.md", Purpose::Content);
        assert_eq!(first, second);
        assert_eq!(e.cached_decisions(), cached);
    }

    #[test]
    fn test_adding_patterns_invalidates_cache() {
        let e = engine(&[]);
        assert!(!file(&e, "notes.md", Purpose::Content));
        assert!(e.cached_decisions() > 0);

        e.add_patterns(["*.md"], Origin::UserConfig);
        assert_eq!(e.cached_decisions(), 0);
        assert!(file(&e, "notes.md", Purpose::Content));
    }

    #[test]
    fn test_content_exclusion_implies_strict_tree_exclusion_for_text() {
        let e = engine(&["*.md", "secret/", "!keep.md"]);
        let paths = [
            "a.md",
            "keep.md",
            "src/a.rs",
            "secret/x.rs",
            "node_modules/y.js",
            "debug.log",
        ];
        for p in paths {
            if file(&e, p, Purpose::Content) {
                assert!(file(&e, p, Purpose::StrictTree), "{} laxer under strict tree", p);
            }
        }
    }

    #[test]
    fn test_vcs_and_user_patterns_have_equal_effect() {
        let e = ExclusionEngine::with_defaults("/project", ScanLogger::quiet());
        e.add_patterns(["*.tmp"], Origin::VcsIgnore);
        e.add_patterns(["*.bak"], Origin::UserConfig);
        assert!(file(&e, "x.tmp", Purpose::Content));
        assert!(file(&e, "x.bak", Purpose::Content));
        assert_eq!(
            e.matched_origin(Path::new("x.tmp"), EntryKind::File),
            Some(Origin::VcsIgnore)
        );
    }

    #[test]
    fn test_unstatable_path_is_excluded() {
        let dir = tempdir().unwrap();
        let e = ExclusionEngine::with_defaults(dir.path(), ScanLogger::quiet());
        assert!(e.should_exclude_path(&dir.path().join("missing.rs"), Purpose::Content));

        File::create(dir.path().join("present.rs")).unwrap();
        assert!(!e.should_exclude_path(&dir.path().join("present.rs"), Purpose::Content));
    }

    struct FixedSource;

    impl PatternSource for FixedSource {
        fn user_patterns(&self) -> Vec<String> {
            vec!["*.md".to_string()]
        }

        fn vcs_ignore_patterns(&self, _root: &Path) -> Vec<String> {
            vec!["generated/".to_string()]
        }
    }

    #[test]
    fn test_from_source_layers_all_origins() {
        let e = ExclusionEngine::from_source("/project", &FixedSource, ScanLogger::quiet());
        assert!(file(&e, "README.md", Purpose::Tree));
        assert!(file(&e, "generated/api.rs", Purpose::Tree));
        assert!(file(&e, "target/debug/app", Purpose::Tree));
        assert!(!file(&e, "src/main.rs", Purpose::Tree));
    }
}
