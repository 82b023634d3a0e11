/*!
 * Logging handle injected into the scanning components
 */

use std::fmt::Arguments;

const TARGET: &str = "ctxscan";

/// Logging handle passed to each component at construction.
///
/// Forwards to the `log` facade. Debug messages are dropped unless the
/// handle was created verbose, independently of the backend's level filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanLogger {
    verbose: bool,
}

impl ScanLogger {
    /// Create a new logger
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// A logger that only reports warnings
    pub fn quiet() -> Self {
        Self::new(false)
    }

    /// Whether debug output is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn debug(&self, args: Arguments<'_>) {
        if self.verbose {
            log::debug!(target: TARGET, "{}", args);
        }
    }

    pub fn info(&self, args: Arguments<'_>) {
        log::info!(target: TARGET, "{}", args);
    }

    pub fn warn(&self, args: Arguments<'_>) {
        log::warn!(target: TARGET, "{}", args);
    }
}
