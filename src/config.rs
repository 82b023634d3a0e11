/*!
 * Configuration handling for ctxscan
 */

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ResultExt, ScanError};
use crate::patterns::PatternSource;
use crate::types::{Purpose, TraversalBudget};
use crate::ensure;

/// Default name of the context document
pub const DEFAULT_OUTPUT_FILE: &str = ".ctxscan.context.xml";

/// What a run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Mode {
    /// Write an XML context document with the tree and file contents
    #[default]
    Context,
    /// Print the directory tree
    Tree,
    /// Print the files that would be embedded, one per line
    Files,
}

/// Command-line arguments for ctxscan
#[derive(Parser, Debug, Clone)]
#[clap(
    name = "ctxscan",
    version = env!("CARGO_PKG_VERSION"),
    about = "Decide which project files belong in an LLM context dump or a directory tree",
    long_about = "Walks one or more directories under depth, time and size limits, applies built-in, .gitignore and user patterns, and emits a context document, a tree, or a file list."
)]
pub struct Args {
    /// Directories to scan
    #[clap(default_value = ".")]
    pub roots: Vec<String>,

    /// What to produce
    #[clap(long, value_enum, default_value_t = Mode::default())]
    pub mode: Mode,

    /// Apply ignore patterns to media files in tree output as well
    #[clap(long)]
    pub strict: bool,

    /// Output file (context mode writes to .ctxscan.context.xml by default; other modes print to stdout)
    #[clap(short, long)]
    pub output: Option<String>,

    /// Maximum directory depth to expand
    #[clap(long, default_value_t = TraversalBudget::DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Walk timeout in milliseconds
    #[clap(long, default_value_t = TraversalBudget::DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Largest file to keep, in megabytes
    #[clap(long, default_value_t = TraversalBudget::DEFAULT_MAX_FILE_SIZE_MB)]
    pub max_file_size_mb: u64,

    /// Comma-separated glob patterns to exclude (added to the user configuration)
    #[clap(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Comma-separated path fragments; any path containing one is skipped
    #[clap(long, value_delimiter = ',')]
    pub ignore_paths: Vec<String>,

    /// Comma-separated regular expressions matched against relative paths to skip
    #[clap(long, value_delimiter = ',')]
    pub ignore_patterns: Vec<String>,

    /// Comma-separated regular expressions; if given, only matching files are kept
    #[clap(long, value_delimiter = ',')]
    pub include_patterns: Vec<String>,

    /// Respect .gitignore files (default: true)
    #[clap(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub respect_gitignore: bool,

    /// Path to custom .gitignore file
    #[clap(long)]
    pub gitignore_path: Option<String>,

    /// Path to a JSON configuration file
    #[clap(long)]
    pub config: Option<String>,

    /// Number of threads to use for traversal
    #[clap(long, default_value = "4")]
    pub threads: usize,

    /// Log every decision
    #[clap(short, long)]
    pub verbose: bool,

    /// Generate shell completions
    #[clap(long = "generate", value_enum)]
    pub generate: Option<Shell>,
}

/// Persisted user configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfigFile {
    /// Glob patterns to exclude
    pub ignore_patterns: Vec<String>,
    /// Regular expressions; if any, only matching files are kept
    pub include_patterns: Vec<String>,
    /// Path fragments to skip
    pub ignore_paths: Vec<String>,
}

impl UserConfigFile {
    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| path.display())?;
        serde_json::from_str(&content).with_context(|| path.display())
    }

    /// Load from the per-user default location, if a file is there
    pub fn load_default() -> Result<Option<Self>> {
        match default_config_path() {
            Some(path) if path.is_file() => Ok(Some(Self::load(&path)?)),
            _ => Ok(None),
        }
    }

    /// Write the configuration, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// `<config dir>/ctxscan/config.json`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ctxscan").join("config.json"))
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Directories to scan
    pub roots: Vec<PathBuf>,

    /// What to produce
    pub mode: Mode,

    /// Strict tree purpose instead of the lenient one
    pub strict: bool,

    /// Output file; `None` prints to stdout
    pub output_file: Option<PathBuf>,

    /// Limits for each walk
    pub budget: TraversalBudget,

    /// User glob patterns
    pub user_patterns: Vec<String>,

    /// Path fragments to skip
    pub ignore_paths: Vec<String>,

    /// Regular expressions to skip
    pub ignore_patterns: Vec<String>,

    /// Regular expressions to keep (if empty, keep all)
    pub include_patterns: Vec<String>,

    /// Whether to respect .gitignore files
    pub respect_gitignore: bool,

    /// Path to custom .gitignore file
    pub gitignore_path: Option<PathBuf>,

    /// Explicit configuration file
    pub config_path: Option<PathBuf>,

    /// Number of threads to use for traversal
    pub num_threads: usize,

    /// Log every decision
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from(".")],
            mode: Mode::default(),
            strict: false,
            output_file: None,
            budget: TraversalBudget::default(),
            user_patterns: Vec::new(),
            ignore_paths: Vec::new(),
            ignore_patterns: Vec::new(),
            include_patterns: Vec::new(),
            respect_gitignore: true,
            gitignore_path: None,
            config_path: None,
            num_threads: 4,
            verbose: false,
        }
    }
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args(args: Args) -> Self {
        let output_file = match (args.output, args.mode) {
            (Some(path), _) => Some(PathBuf::from(path)),
            (None, Mode::Context) => Some(PathBuf::from(DEFAULT_OUTPUT_FILE)),
            (None, _) => None,
        };

        Self {
            roots: args.roots.iter().map(PathBuf::from).collect(),
            mode: args.mode,
            strict: args.strict,
            output_file,
            budget: TraversalBudget::new(args.max_depth, args.timeout_ms, args.max_file_size_mb),
            user_patterns: args.exclude,
            ignore_paths: args.ignore_paths,
            ignore_patterns: args.ignore_patterns,
            include_patterns: args.include_patterns,
            respect_gitignore: args.respect_gitignore,
            gitignore_path: args.gitignore_path.map(PathBuf::from),
            config_path: args.config.map(PathBuf::from),
            num_threads: args.threads,
            verbose: args.verbose,
        }
    }

    /// Merge a persisted user configuration into this one
    pub fn merge_file(&mut self, file: UserConfigFile) {
        self.user_patterns.extend(file.ignore_patterns);
        self.include_patterns.extend(file.include_patterns);
        self.ignore_paths.extend(file.ignore_paths);
    }

    /// Load the explicit configuration file, or the default one if present
    pub fn load_user_file(&mut self) -> Result<()> {
        let file = match &self.config_path {
            Some(path) => Some(UserConfigFile::load(path)?),
            None => UserConfigFile::load_default()?,
        };
        if let Some(file) = file {
            self.merge_file(file);
        }
        Ok(())
    }

    /// Purpose used for tree output
    pub fn tree_purpose(&self) -> Purpose {
        if self.strict {
            Purpose::StrictTree
        } else {
            Purpose::Tree
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.roots.is_empty(), InvalidArgument, "at least one root is required");

        for root in &self.roots {
            if !root.exists() || !root.is_dir() {
                return Err(ScanError::RootNotFound(format!(
                    "Target directory not found: {}",
                    root.display()
                )));
            }
        }

        // Check if output file directory exists
        if let Some(parent) = self.output_file.as_ref().and_then(|p| p.parent()) {
            if !parent.exists() && parent != Path::new("") {
                return Err(ScanError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("Output directory not found: {}", parent.display()),
                )));
            }
        }

        // Check if custom gitignore file exists
        if let Some(path) = &self.gitignore_path {
            ensure!(
                path.exists(),
                Config,
                "Custom .gitignore file not found: {}",
                path.display()
            );
        }

        ensure!(self.num_threads > 0, InvalidArgument, "--threads must be at least 1");
        ensure!(
            self.budget.max_file_size_bytes > 0,
            InvalidArgument,
            "--max-file-size-mb must be at least 1"
        );

        Ok(())
    }
}

impl PatternSource for Config {
    fn user_patterns(&self) -> Vec<String> {
        self.user_patterns.clone()
    }

    fn vcs_ignore_patterns(&self, root: &Path) -> Vec<String> {
        if !self.respect_gitignore {
            return Vec::new();
        }

        let path = self
            .gitignore_path
            .clone()
            .unwrap_or_else(|| root.join(".gitignore"));
        read_ignore_file(&path).unwrap_or_default()
    }
}

/// Read pattern lines from an ignore file, dropping blanks and comments
pub fn read_ignore_file(path: &Path) -> io::Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_from_args_defaults() {
        let args = Args::parse_from(["ctxscan"]);
        let config = Config::from_args(args);

        assert_eq!(config.roots, vec![PathBuf::from(".")]);
        assert_eq!(config.mode, Mode::Context);
        assert_eq!(config.output_file, Some(PathBuf::from(DEFAULT_OUTPUT_FILE)));
        assert_eq!(config.budget, TraversalBudget::default());
        assert!(config.respect_gitignore);
        assert_eq!(config.tree_purpose(), Purpose::Tree);
    }

    #[test]
    fn test_from_args_tree_mode() {
        let args = Args::parse_from([
            "ctxscan",
            "--mode",
            "tree",
            "--strict",
            "--max-depth",
            "3",
            "--exclude",
            "*.md,docs/",
            "a",
            "b",
        ]);
        let config = Config::from_args(args);

        assert_eq!(config.roots, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(config.output_file, None);
        assert_eq!(config.budget.max_depth, 3);
        assert_eq!(config.user_patterns, vec!["*.md", "docs/"]);
        assert_eq!(config.tree_purpose(), Purpose::StrictTree);
    }

    #[test]
    fn test_gitignore_can_be_disabled() {
        let args = Args::parse_from(["ctxscan", "--respect-gitignore", "false"]);
        assert!(!Config::from_args(args).respect_gitignore);
    }

    #[test]
    fn test_validate_rejects_missing_root() {
        let config = Config {
            roots: vec![PathBuf::from("/definitely/not/here")],
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ScanError::RootNotFound(_))));
    }

    #[test]
    fn test_validate_rejects_missing_gitignore() {
        let dir = tempdir().unwrap();
        let config = Config {
            roots: vec![dir.path().to_path_buf()],
            gitignore_path: Some(dir.path().join("missing.gitignore")),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ScanError::Config(_))));
    }

    #[test]
    fn test_vcs_patterns_from_gitignore() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "# comment\n\n*.tmp\n  build/  \n").unwrap();

        let config = Config::default();
        assert_eq!(config.vcs_ignore_patterns(dir.path()), vec!["*.tmp", "build/"]);

        let config = Config {
            respect_gitignore: false,
            ..Config::default()
        };
        assert!(config.vcs_ignore_patterns(dir.path()).is_empty());
    }

    #[test]
    fn test_missing_gitignore_yields_no_patterns() {
        let dir = tempdir().unwrap();
        assert!(Config::default().vcs_ignore_patterns(dir.path()).is_empty());
    }

    #[test]
    fn test_user_config_file_roundtrip_and_merge() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let file = UserConfigFile {
            ignore_patterns: vec!["*.snap".to_string()],
            include_patterns: vec![],
            ignore_paths: vec!["fixtures".to_string()],
        };
        file.save(&path).unwrap();

        let mut config = Config {
            config_path: Some(path),
            user_patterns: vec!["*.md".to_string()],
            ..Config::default()
        };
        config.load_user_file().unwrap();
        assert_eq!(config.user_patterns, vec!["*.md", "*.snap"]);
        assert_eq!(config.ignore_paths, vec!["fixtures"]);
    }

    #[test]
    fn test_partial_and_malformed_config_files() {
        let dir = tempdir().unwrap();
        let partial = dir.path().join("partial.json");
        fs::write(&partial, r#"{"ignore_patterns": ["*.bak"]}"#).unwrap();
        let loaded = UserConfigFile::load(&partial).unwrap();
        assert_eq!(loaded.ignore_patterns, vec!["*.bak"]);
        assert!(loaded.include_patterns.is_empty());

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        let err = UserConfigFile::load(&broken).unwrap_err();
        assert!(matches!(err, ScanError::Config(_)));
        assert!(err.to_string().contains("broken.json"));

        let err = UserConfigFile::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ScanError::Config(_)));
        assert!(err.to_string().contains("absent.json"));
    }
}
