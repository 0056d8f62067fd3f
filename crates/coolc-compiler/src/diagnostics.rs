//! Compiler diagnostics.
//!
//! Diagnostics are collected during analysis and rendered after the phase
//! completes, one `file:line: message` line per error. A diagnostic without
//! a location (e.g. "Class Main is not defined.") renders as the bare
//! message. The printer terminates the listing with the halt banner; the
//! driver is responsible for the nonzero exit.

use coolc_core::{Interner, Symbol};

/// Final line of the error stream whenever analysis reported errors.
pub const HALT_MESSAGE: &str = "Compilation halted due to static semantic errors.";

/// A single semantic error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// `(filename, line)` of the offending construct, if known.
    pub location: Option<(Symbol, u32)>,
    pub message: String,
}

/// Collection of semantic errors from one analysis run.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    messages: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error located at `filename:line`.
    pub fn error_at(&mut self, filename: Symbol, line: u32, message: impl Into<String>) {
        self.messages.push(Diagnostic {
            location: Some((filename, line)),
            message: message.into(),
        });
    }

    /// Record an error with no source location.
    pub fn error(&mut self, message: impl Into<String>) {
        self.messages.push(Diagnostic {
            location: None,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.messages.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.messages.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.messages.iter()
    }

    pub fn printer<'a>(&'a self, interner: &'a Interner) -> DiagnosticsPrinter<'a> {
        DiagnosticsPrinter {
            messages: &self.messages,
            interner,
        }
    }
}

/// Renders diagnostics as the `file:line: message` error stream.
pub struct DiagnosticsPrinter<'a> {
    messages: &'a [Diagnostic],
    interner: &'a Interner,
}

impl std::fmt::Display for DiagnosticsPrinter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for diagnostic in self.messages {
            if let Some((filename, line)) = diagnostic.location {
                let filename = self.interner.try_resolve(filename).unwrap_or("<unknown>");
                writeln!(f, "{}:{}: {}", filename, line, diagnostic.message)?;
            } else {
                writeln!(f, "{}", diagnostic.message)?;
            }
        }
        if !self.messages.is_empty() {
            writeln!(f, "{}", HALT_MESSAGE)?;
        }
        Ok(())
    }
}
