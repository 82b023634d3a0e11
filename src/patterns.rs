/*!
 * Origin-tagged glob patterns and the matching primitive
 *
 * Patterns are stored exactly as given so they can be shown back to the user;
 * their glob form is derived each time they are matched. Supported syntax:
 *
 * - `*` matches within a single path component, `**` crosses separators
 * - a trailing `/` matches directories only, and everything beneath them
 * - a leading `./` (or `/`) anchors the pattern at the root
 * - a pattern without `/` (e.g. `*.log`, `node_modules`) matches a name at
 *   any depth
 * - a leading `!` re-includes paths excluded by other patterns
 *
 * A pattern that does not parse as a glob is compared literally.
 */

use std::path::{Path, PathBuf};

use glob_match::glob_match;

use crate::logger::ScanLogger;
use crate::types::Origin;

/// Where raw pattern text comes from, outside of the built-in defaults
pub trait PatternSource {
    /// Patterns from the user's configuration
    fn user_patterns(&self) -> Vec<String>;

    /// Patterns from the VCS-ignore file governing `root`
    fn vcs_ignore_patterns(&self, root: &Path) -> Vec<String>;
}

/// A single raw rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    origin: Origin,
    negated: bool,
}

impl Pattern {
    /// Parse one line of pattern text. Blank lines and `#` comments yield `None`.
    pub fn parse(line: &str, origin: Origin) -> Option<Self> {
        let raw = line.trim();
        if raw.is_empty() || raw.starts_with('#') {
            return None;
        }

        let negated = raw.starts_with('!');
        if negated && raw.len() == 1 {
            return None;
        }

        Some(Self {
            raw: raw.to_string(),
            origin,
            negated,
        })
    }

    /// The pattern text as supplied, including any `!`
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Whether the pattern falls back to literal comparison
    pub fn is_malformed(&self) -> bool {
        Glob::compile(self.body()).literal
    }

    fn body(&self) -> &str {
        if self.negated {
            &self.raw[1..]
        } else {
            &self.raw
        }
    }

    /// Test a root-relative, `/`-separated path.
    ///
    /// The pattern is tried against the path and each of its ancestors, so a
    /// pattern naming a directory also covers everything beneath it.
    pub fn matches(&self, rel_path: &str, is_dir: bool) -> bool {
        let glob = Glob::compile(self.body());
        let components: Vec<&str> = rel_path.split('/').filter(|c| !c.is_empty()).collect();
        let last = components.len().saturating_sub(1);

        let mut prefix = String::with_capacity(rel_path.len());
        for (i, name) in components.iter().enumerate() {
            if i > 0 {
                prefix.push('/');
            }
            prefix.push_str(name);

            let prefix_is_dir = i < last || is_dir;
            if glob.dir_only && !prefix_is_dir {
                continue;
            }
            if glob.matches(&prefix, name) {
                return true;
            }
        }

        false
    }
}

/// Glob form of a pattern body, derived at match time
#[derive(Debug)]
struct Glob<'a> {
    text: &'a str,
    dir_only: bool,
    anchored: bool,
    literal: bool,
}

impl<'a> Glob<'a> {
    fn compile(body: &'a str) -> Self {
        let mut text = body;

        let dir_only = text.ends_with('/');
        text = text.trim_end_matches('/');

        let mut anchored = false;
        if let Some(rest) = text.strip_prefix("./") {
            text = rest;
            anchored = true;
        } else if let Some(rest) = text.strip_prefix('/') {
            text = rest;
            anchored = true;
        }

        // `a/b` is anchored like a gitignore entry with an inner separator
        if text.contains('/') {
            anchored = true;
        }

        let literal = !is_well_formed(text);
        Self {
            text,
            dir_only,
            anchored,
            literal,
        }
    }

    fn matches(&self, path: &str, name: &str) -> bool {
        if self.anchored {
            if self.test(self.text, path) {
                return true;
            }
            // `**/x` also matches `x` at the root
            return match self.text.strip_prefix("**/") {
                Some(rest) => self.test(rest, path),
                None => false,
            };
        }

        self.test(self.text, name) || self.test(self.text, path)
    }

    fn test(&self, pattern: &str, candidate: &str) -> bool {
        if self.literal {
            pattern == candidate
        } else {
            glob_match(pattern, candidate)
        }
    }
}

/// Balanced `[...]` classes and `{...}` alternations, and a non-empty body
fn is_well_formed(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }

    let mut in_class = false;
    let mut braces = 0usize;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if chars.next().is_none() {
                    return false;
                }
            }
            '[' if !in_class => {
                in_class = true;
                // `[]...]` and `[!]...]` treat the first `]` as a member
                if chars.peek() == Some(&'!') {
                    chars.next();
                }
                if chars.peek() == Some(&']') {
                    chars.next();
                }
            }
            ']' if in_class => in_class = false,
            ']' => return false,
            '{' if !in_class => braces += 1,
            '}' if !in_class => {
                if braces == 0 {
                    return false;
                }
                braces -= 1;
            }
            _ => {}
        }
    }

    !in_class && braces == 0
}

/// Collection of patterns scoped to one base directory
#[derive(Debug, Clone)]
pub struct PatternSet {
    base: PathBuf,
    /// Kept ordered by origin
    patterns: Vec<Pattern>,
    logger: ScanLogger,
}

impl PatternSet {
    /// Create an empty set for a base directory
    pub fn new(base: impl Into<PathBuf>, logger: ScanLogger) -> Self {
        Self {
            base: base.into(),
            patterns: Vec::new(),
            logger,
        }
    }

    /// The directory relative paths are computed against
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Add raw pattern lines under one origin. Returns how many were stored.
    pub fn add_patterns<I, S>(&mut self, patterns: I, origin: Origin) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let before = self.patterns.len();
        for line in patterns {
            let Some(pattern) = Pattern::parse(line.as_ref(), origin) else {
                continue;
            };
            if pattern.is_malformed() {
                self.logger.warn(format_args!(
                    "pattern '{}' ({}) is not a valid glob; matching it literally",
                    pattern.raw(),
                    origin
                ));
            }
            self.patterns.push(pattern);
        }
        self.patterns.sort_by_key(Pattern::origin);

        let added = self.patterns.len() - before;
        self.logger.debug(format_args!(
            "added {} {} pattern(s) for {}",
            added,
            origin,
            self.base.display()
        ));
        added
    }

    /// All stored patterns, ordered by origin
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Raw text of every pattern matched literally
    pub fn malformed(&self) -> Vec<String> {
        self.patterns
            .iter()
            .filter(|p| p.is_malformed())
            .map(|p| p.raw().to_string())
            .collect()
    }

    /// Match a root-relative path.
    ///
    /// Returns the narrowest origin among the rules that exclude the path.
    /// A rule is cancelled by a matching negation of equal or higher
    /// precedence; negations never exclude on their own.
    pub fn matches(&self, rel_path: &str, is_dir: bool) -> Option<Origin> {
        let mut best: Option<Origin> = None;

        for pattern in self.patterns.iter().filter(|p| !p.is_negated()) {
            if best.is_some_and(|b| b >= pattern.origin) {
                continue;
            }
            if !pattern.matches(rel_path, is_dir) {
                continue;
            }
            if self.is_reincluded(rel_path, is_dir, pattern.origin) {
                continue;
            }
            best = Some(pattern.origin);
        }

        best
    }

    fn is_reincluded(&self, rel_path: &str, is_dir: bool, origin: Origin) -> bool {
        self.patterns
            .iter()
            .filter(|p| p.is_negated() && p.origin >= origin)
            .any(|p| p.matches(rel_path, is_dir))
    }
}
