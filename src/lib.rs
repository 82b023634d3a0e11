/*!
 * ctxscan - Decide which files belong in an LLM context dump or a directory tree
 *
 * A layered exclusion engine (built-in defaults, `.gitignore`, user
 * configuration) answers include/exclude questions per purpose, and a
 * bounded walker uses it to build trees and flat file lists under depth,
 * time and size limits.
 */

pub mod classify;
pub mod config;
pub mod error;
pub mod exclusion;
pub mod logger;
pub mod patterns;
pub mod render;
pub mod report;
pub mod scanner;
pub mod types;
pub mod utils;
pub mod walker;
pub mod writer;


// Re-export main components for easier access
pub use config::{Config, Mode};
pub use error::{Result, ScanError};
pub use exclusion::ExclusionEngine;
pub use logger::ScanLogger;
pub use patterns::{Pattern, PatternSet, PatternSource};
pub use render::render_tree;
pub use report::{Reporter, ScanReport};
pub use scanner::{RootScan, Scanner};
pub use types::{EntryKind, Origin, Purpose, SkipKind, SkipReport, TraversalBudget, TreeNode};
pub use utils::format_file_size;
pub use walker::{DirectoryWalker, FileFilters};
pub use writer::{ContextRoot, XmlWriter};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
