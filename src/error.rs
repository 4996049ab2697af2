//! Crate-wide error type.
//!
//! Only fatal conditions (§7) become an `Err`. Conflicts and other
//! warnings never abort the build on their own; they are recorded as
//! [`crate::diagnostics::Diagnostic`]s and surfaced through a
//! [`crate::BuildReport`] instead.

use thiserror::Error;

use crate::index::{NonTermIndex, TermIndex};

#[derive(Debug, Error)]
pub enum Error {
    #[error("symbol '{0}' is declared more than once")]
    SymbolRedeclared(String),

    #[error("unknown symbol referenced: '{0}'")]
    UnknownSymbol(String),

    #[error(
        "production for non-terminal {lhs:?} has ambiguous precedence: \
         multiple distinct precedence levels appear among its RHS terminals \
         and no explicit %prec was given"
    )]
    PrecedenceAmbiguous { lhs: NonTermIndex },

    #[error(
        "table compression overflowed the signed 16-bit range at state {state}"
    )]
    TableOverflow { state: usize },

    #[error(
        "grammar produced {actual} conflict(s), more than the {expected} expected"
    )]
    UnexpectedConflictCount { expected: u32, actual: u32 },

    #[error("non-terminal has no start production: {0:?}")]
    NoStartProduction(NonTermIndex),

    #[error("terminal index out of range: {0:?}")]
    TermIndexOutOfRange(TermIndex),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
