//! Diagnostics collection and the error type that unwinds a parse.

use std::fmt;
use std::ops::{Deref, DerefMut};

use thiserror::Error;

use super::token::TokenLoc;

/// Raised to abort the current parse.
///
/// `Source` follows a reported serious error (the diagnostic is already in the
/// `ErrorHandler`). `Internal` marks a compiler bug rather than bad input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("compile error")]
    Source,
    #[error("unexpected end of file")]
    EndOfFile,
    #[error("internal compiler error: {0}")]
    Internal(String),
}

impl CompileError {
    pub fn internal(message: impl Into<String>) -> Self {
        CompileError::Internal(message.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub loc: Option<TokenLoc>,
    pub context: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Warning => write!(f, "Warning: ")?,
            Severity::Error => write!(f, "Error: ")?,
        }
        if let Some(context) = &self.context {
            write!(f, "{context} ")?;
        }
        if let Some(loc) = &self.loc {
            write!(f, "{loc}: ")?;
        }
        write!(f, "{}", self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarningsMode {
    /// Warnings are dropped.
    Ignore,
    #[default]
    Normal,
    /// Warnings are reported as errors.
    AsErrors,
}

/// Counts and records warnings and errors for one or more compilations.
#[derive(Debug, Default)]
pub struct ErrorHandler {
    warnings: usize,
    errors: usize,
    mode: WarningsMode,
    downgrade: bool,
    context: Option<String>,
    diagnostics: Vec<Diagnostic>,
}

impl ErrorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Was compilation successful?
    pub fn is_good(&self) -> bool {
        self.errors == 0
    }

    pub fn count_errors(&self) -> usize {
        self.errors
    }

    pub fn count_warnings(&self) -> usize {
        self.warnings
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Clears the counters and the recorded diagnostics. Mode flags stay.
    pub fn reset(&mut self) {
        self.warnings = 0;
        self.errors = 0;
        self.diagnostics.clear();
    }

    pub fn set_warnings_mode(&mut self, mode: WarningsMode) {
        self.mode = mode;
    }

    /// Label put in front of every report, typically the script name.
    /// Returns the previous label.
    pub fn set_context(&mut self, context: Option<String>) -> Option<String> {
        std::mem::replace(&mut self.context, context)
    }

    /// Treat errors as warnings. Returns the previous setting.
    pub fn downgrade_errors(&mut self, downgrade: bool) -> bool {
        std::mem::replace(&mut self.downgrade, downgrade)
    }

    pub fn warning(&mut self, message: &str, loc: &TokenLoc) {
        match self.mode {
            WarningsMode::Ignore => {}
            WarningsMode::AsErrors if !self.downgrade => {
                self.record(Severity::Error, message, Some(loc))
            }
            _ => self.record(Severity::Warning, message, Some(loc)),
        }
    }

    pub fn error(&mut self, message: &str, loc: &TokenLoc) {
        if self.downgrade {
            self.warning(message, loc);
        } else {
            self.record(Severity::Error, message, Some(loc));
        }
    }

    pub fn end_of_file(&mut self) {
        self.record(Severity::Error, "unexpected end of file", None);
    }

    fn record(&mut self, severity: Severity, message: &str, loc: Option<&TokenLoc>) {
        match severity {
            Severity::Warning => self.warnings += 1,
            Severity::Error => self.errors += 1,
        }
        let diagnostic = Diagnostic {
            severity,
            message: message.to_string(),
            loc: loc.cloned(),
            context: self.context.clone(),
        };
        match severity {
            Severity::Warning => log::warn!("{diagnostic}"),
            Severity::Error => log::error!("{diagnostic}"),
        }
        self.diagnostics.push(diagnostic);
    }
}

impl AsMut<ErrorHandler> for ErrorHandler {
    fn as_mut(&mut self) -> &mut ErrorHandler {
        self
    }
}

/// Downgrades errors to warnings while alive.
pub struct ErrorDowngrade<'a, T: AsMut<ErrorHandler>> {
    target: &'a mut T,
    previous: bool,
}

impl<'a, T: AsMut<ErrorHandler>> ErrorDowngrade<'a, T> {
    pub fn new(target: &'a mut T) -> Self {
        let previous = target.as_mut().downgrade_errors(true);
        Self { target, previous }
    }
}

impl<T: AsMut<ErrorHandler>> Deref for ErrorDowngrade<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &*self.target
    }
}

impl<T: AsMut<ErrorHandler>> DerefMut for ErrorDowngrade<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut *self.target
    }
}

impl<T: AsMut<ErrorHandler>> Drop for ErrorDowngrade<'_, T> {
    fn drop(&mut self) {
        self.target.as_mut().downgrade_errors(self.previous);
    }
}
