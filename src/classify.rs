/*!
 * Intrinsic file classification and built-in ignore patterns
 */

use std::collections::HashSet;
use std::path::Path;

use once_cell::sync::Lazy;

/// What a file is, judged from its name alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    /// Anything that can be embedded as text
    Text,
    /// Compiled, archived or otherwise non-textual content
    Binary,
    /// Images, audio, video and fonts
    Media,
    /// OS metadata files that never belong in any output
    System,
}

impl FileClass {
    /// Classify a path by its file name and extension
    pub fn of(path: &Path) -> Self {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return Self::Text;
        };

        if SYSTEM_FILES.contains(name) {
            return Self::System;
        }

        match extension_of(name) {
            Some(ext) if MEDIA_EXTENSIONS.contains(ext.as_str()) => Self::Media,
            Some(ext) if BINARY_EXTENSIONS.contains(ext.as_str()) => Self::Binary,
            _ => Self::Text,
        }
    }

    pub fn is_media(self) -> bool {
        self == Self::Media
    }

    pub fn is_binary(self) -> bool {
        self == Self::Binary
    }
}

// Extensions are compared lowercased; `archive.tar.gz` yields `gz`.
fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// OS metadata files, matched by exact name
pub static SYSTEM_FILES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        ".DS_Store",
        ".AppleDouble",
        ".LSOverride",
        "Thumbs.db",
        "ehthumbs.db",
        "desktop.ini",
        ".directory",
        "Icon\r",
    ]
    .into_iter()
    .collect()
});

/// Images, audio, video and fonts
pub static MEDIA_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // Images
        "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "tiff", "tif", "svg", "psd", "heic",
        "avif", "raw",
        // Audio
        "mp3", "wav", "ogg", "flac", "aac", "m4a", "wma",
        // Video
        "mp4", "mov", "avi", "mkv", "webm", "flv", "wmv", "m4v",
        // Fonts
        "ttf", "otf", "woff", "woff2", "eot",
    ]
    .into_iter()
    .collect()
});

/// Compiled artifacts, archives, documents and databases
pub static BINARY_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // Executables & libraries
        "exe", "dll", "so", "dylib", "bin", "o", "obj", "a", "lib", "class", "pyc", "pyo", "pyd",
        "wasm",
        // Archives
        "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar", "jar", "war", "ear",
        // Documents
        "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
        // Databases
        "db", "sqlite", "sqlite3",
        // Misc
        "dat", "iso", "dmg", "pkg", "deb", "rpm",
    ]
    .into_iter()
    .collect()
});

/// Default patterns applied to every root with [`crate::types::Origin::System`]
pub static DEFAULT_PATTERNS: &[&str] = &[
    // Version Control
    ".git/",
    ".svn/",
    ".hg/",
    ".bzr/",
    // Dependencies
    "node_modules/",
    "bower_components/",
    ".npm/",
    ".yarn/",
    ".pnpm-store/",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "composer.lock",
    // Build & Dist
    "dist/",
    "build/",
    "*.min.js",
    "*.min.css",
    "*.map",
    // Python
    "__pycache__/",
    ".pytest_cache/",
    ".mypy_cache/",
    ".venv/",
    "venv/",
    "*.egg-info/",
    // Rust
    "target/",
    "Cargo.lock",
    // IDEs & Editors
    ".idea/",
    ".vscode/",
    ".vs/",
    "*.swp",
    "*.swo",
    "*~",
    // Caches & Temp
    ".cache/",
    ".sass-cache/",
    ".eslintcache",
    "*.log",
    // JavaScript/TypeScript
    "coverage/",
    ".nyc_output/",
    ".next/",
    ".nuxt/",
    "*.tsbuildinfo",
    // Infrastructure
    ".terraform/",
    "*.tfstate",
];
