//! Diagnostics channel (§4.6, §6, §4.8).
//!
//! The core never aborts on a conflict or an unused-symbol/never-reduced
//! warning; it records a [`Diagnostic`] and keeps going so a single run
//! surfaces as much as possible (§7's propagation policy). Only
//! [`crate::error::Error`] values returned from `GrammarBuilder::build`
//! are fatal.

use colored::Colorize;

use crate::index::StateIndex;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

impl Severity {
    fn tag(&self) -> &'static str {
        match self {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    SymbolRedeclared,
    UnknownSymbol,
    ProductionPrecedenceAmbiguous,
    ShiftReduceConflict,
    ReduceReduceConflict,
    NonassocConflict,
    ProductionNeverReduced,
    UnusedSymbol,
    TableOverflow,
    UnexpectedConflictCount,
}

impl DiagnosticKind {
    pub fn severity(&self) -> Severity {
        use DiagnosticKind::*;
        match self {
            ProductionNeverReduced | UnusedSymbol => Severity::Warning,
            TableOverflow | UnexpectedConflictCount => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

/// A single diagnostic message, with enough context (state index, symbol
/// names) for the line-oriented rendering §6 describes.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub state: Option<StateIndex>,
    pub symbols: Vec<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            state: None,
            symbols: Vec::new(),
        }
    }

    pub fn with_state(mut self, state: StateIndex) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_symbols(mut self, symbols: Vec<String>) -> Self {
        self.symbols = symbols;
        self
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    fn render_line(&self, color: bool) -> String {
        let tag = self.severity().tag();
        let tag = if color {
            match self.severity() {
                Severity::Warning => tag.yellow().to_string(),
                Severity::Error | Severity::Fatal => tag.red().to_string(),
            }
        } else {
            tag.to_string()
        };

        let mut line = format!("[{tag}] {}", self.message);
        if let Some(state) = self.state {
            line.push_str(&format!(" (state {state})"));
        }
        if !self.symbols.is_empty() {
            line.push_str(&format!(" [{}]", self.symbols.join(", ")));
        }
        line
    }
}

/// The ordered collection of diagnostics produced by a single build run.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsReport {
    entries: Vec<Diagnostic>,
}

impl DiagnosticsReport {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity() {
            Severity::Warning => log::warn!("{}", diagnostic.message),
            Severity::Error | Severity::Fatal => log::error!("{}", diagnostic.message),
        }
        self.entries.push(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    /// Renders every diagnostic as one line, in the order emitted.
    /// `color` controls whether severity tags carry ANSI escapes; the
    /// decision of whether stdout/stderr is a TTY belongs to the host.
    pub fn render(&self, color: bool) -> String {
        self.entries
            .iter()
            .map(|d| d.render_line(color))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
