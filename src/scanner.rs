/*!
 * Multi-root scanning driven by the application configuration
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::ProgressBar;

use crate::config::{Config, Mode};
use crate::error::Result;
use crate::exclusion::ExclusionEngine;
use crate::logger::ScanLogger;
use crate::types::{Origin, Purpose, SkipReport, TreeNode};
use crate::walker::{DirectoryWalker, FileFilters};

/// Result of scanning one root
#[derive(Debug, Clone)]
pub struct RootScan {
    /// Canonical root, the prefix of every path in `files`
    pub root: PathBuf,
    /// Tree, for context and tree modes
    pub tree: Option<TreeNode>,
    /// Files for content extraction, for context and files modes
    pub files: Vec<PathBuf>,
    /// What the walks left out
    pub skipped: SkipReport,
}

/// Scanner for one or more roots
pub struct Scanner {
    /// Scanner configuration
    config: Config,
    /// Logging handle passed to every component
    logger: ScanLogger,
    /// Progress spinner
    pub progress: Arc<ProgressBar>,
}

impl Scanner {
    /// Create a new scanner
    pub fn new(config: Config, progress: Arc<ProgressBar>) -> Self {
        let logger = ScanLogger::new(config.verbose);
        Self {
            config,
            logger,
            progress,
        }
    }

    /// Scan every configured root, in order
    pub fn scan(&self) -> Result<Vec<RootScan>> {
        self.config
            .roots
            .iter()
            .map(|root| self.scan_root(root))
            .collect()
    }

    /// Scan a single root according to the configured mode
    pub fn scan_root(&self, root: &Path) -> Result<RootScan> {
        self.progress
            .set_message(format!("Scanning {}", root.display()));

        let walker = DirectoryWalker::new(self.engine_for(root), self.logger);
        let budget = self.config.budget;
        let mut skipped = SkipReport::default();

        let tree = match self.config.mode {
            Mode::Context | Mode::Tree => {
                let (tree, report) = walker.build_tree(root, budget, self.config.tree_purpose())?;
                skipped.merge(report);
                Some(tree)
            }
            Mode::Files => None,
        };

        let files = match self.config.mode {
            Mode::Context | Mode::Files => {
                let filters = FileFilters::new(
                    &self.config.ignore_paths,
                    &self.config.ignore_patterns,
                    &self.config.include_patterns,
                )?;
                let (files, report) =
                    walker.find_files(root, budget, Purpose::Content, &filters)?;
                skipped.merge(report);
                files
            }
            Mode::Tree => Vec::new(),
        };

        self.progress.inc(1);
        self.logger.info(format_args!(
            "scanned {}: {} files",
            root.display(),
            files.len()
        ));
        Ok(RootScan {
            root: fs::canonicalize(root)?,
            tree,
            files,
            skipped,
        })
    }

    /// Build the exclusion engine for a root, keeping our own output out of it
    fn engine_for(&self, root: &Path) -> Arc<ExclusionEngine> {
        let engine = ExclusionEngine::from_source(root, &self.config, self.logger);
        if let Some(rel) = self.output_within(root) {
            engine.add_patterns([format!("./{}", rel)], Origin::System);
        }
        Arc::new(engine)
    }

    /// The output file's path relative to `root`, if it lives under it
    fn output_within(&self, root: &Path) -> Option<String> {
        let output = self.config.output_file.as_ref()?;
        let name = output.file_name()?;
        let parent = match output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let parent = fs::canonicalize(parent).ok()?;
        let root = fs::canonicalize(root).ok()?;
        let rel = parent.join(name).strip_prefix(&root).ok()?.to_path_buf();
        let parts: Vec<_> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}
