// Copyright (c) 2024 Mike Tsao

//! Where configuration and dispatch problems go. The engine never prints; it
//! reports a [Diagnostic] to whatever [DiagnosticSink] the caller injected.

use crate::error::{ConfigError, DispatchError};
use core::fmt;
use std::sync::Mutex;

/// One reported problem, together with the text it was found in when that is
/// known.
#[derive(Clone, Debug, PartialEq)]
pub enum Diagnostic {
    /// A declaration (or part of one) was skipped.
    Config {
        #[allow(missing_docs)]
        error: ConfigError,
        /// The declaration text being compiled, for context.
        context: Option<String>,
    },
    /// An action was dropped during dispatch.
    Dispatch(DispatchError),
}
impl Diagnostic {
    /// Convenience constructor for a configuration problem.
    pub fn config(error: ConfigError, context: impl Into<String>) -> Self {
        Self::Config {
            error,
            context: Some(context.into()),
        }
    }
}
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Config {
                error,
                context: Some(context),
            } => write!(f, "config: {error} (in '{context}')"),
            Diagnostic::Config {
                error,
                context: None,
            } => write!(f, "config: {error}"),
            Diagnostic::Dispatch(error) => write!(f, "dispatch: {error}"),
        }
    }
}
impl From<ConfigError> for Diagnostic {
    fn from(error: ConfigError) -> Self {
        Self::Config {
            error,
            context: None,
        }
    }
}
impl From<DispatchError> for Diagnostic {
    fn from(error: DispatchError) -> Self {
        Self::Dispatch(error)
    }
}

/// Receives diagnostics. Called from whatever thread hit the problem, so
/// implementations must be cheap and must not block for long.
pub trait DiagnosticSink: Send + Sync {
    /// Records one problem.
    fn report(&self, diagnostic: Diagnostic);
}

/// The default sink: forwards everything to `tracing` at warn level.
#[derive(Debug, Default)]
pub struct TracingSink;
impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        tracing::warn!("{diagnostic}");
    }
}

/// Keeps every diagnostic it receives. Useful in tests and for showing a
/// configuration report to the performer after startup.
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}
impl CollectingSink {
    /// Returns a copy of everything reported so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    /// Number of reports so far.
    pub fn len(&self) -> usize {
        self.diagnostics.lock().map(|d| d.len()).unwrap_or_default()
    }

    /// True if nothing has been reported.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empties the collection.
    pub fn clear(&self) {
        if let Ok(mut d) = self.diagnostics.lock() {
            d.clear();
        }
    }
}
impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        tracing::debug!("{diagnostic}");
        if let Ok(mut d) = self.diagnostics.lock() {
            d.push(diagnostic);
        }
    }
}
