//! Grammar model: symbols, productions, the rewriter, the fixed-point
//! solvers, and the `GrammarBuilder` construction boundary.

pub mod builder;
pub mod nullable_first;
pub mod production;
pub mod rewrite;
pub mod symbols;

pub use builder::{Grammar, GrammarBuilder};
pub use production::{EmbeddedAction, Item, Production, RawRhsItem};
pub use symbols::{Assoc, NonTerminal, Precedence, Symbol, Terminal, EOF_INDEX, ERROR_INDEX};
