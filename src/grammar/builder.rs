//! `Grammar` aggregate and the `GrammarBuilder` construction boundary
//! (§4.7, design note "Global mutable registries").
//!
//! `GrammarBuilder` is what an out-of-scope grammar-spec front-end drives:
//! it has no knowledge of grammar *syntax*, only of the already-resolved
//! symbol table the front-end has built. Everything downstream of
//! `build()` (rewriting, fixed points, machine construction, table
//! building, compression) operates purely on the resulting `Grammar`.

use indexmap::IndexMap;

use crate::diagnostics::DiagnosticsReport;
use crate::error::{Error, Result};
use crate::grammar::production::{Production, RawRhsItem};
use crate::grammar::symbols::{NonTerminal, Precedence, Symbol, Terminal, EOF_INDEX, ERROR_INDEX};
use crate::index::{NonTermIndex, ProdVec, TermIndex, TermVec};
use crate::options::BuildOptions;
use crate::report::BuildReport;
use crate::sets::TerminalSet;

/// A fully constructed, rewritten grammar: terminals and non-terminals are
/// frozen after `GrammarBuilder::build` returns, except for the
/// append-only `nullable`/`first`/`reduce_count` fields the pipeline fills
/// in as it runs (§3 Lifecycles).
#[derive(Debug, Clone)]
pub struct Grammar {
    pub terminals: TermVec<Terminal>,
    pub nonterminals: crate::index::NonTermVec<NonTerminal>,
    pub productions: ProdVec<Production>,
    /// The non-terminal the caller designated as the grammar's start.
    pub start: NonTermIndex,
    /// Index of the synthesized `$START ::= start` production, always 0.
    pub start_production: crate::index::ProdIndex,
}

impl Grammar {
    pub fn term_len(&self) -> usize {
        self.terminals.len()
    }

    pub fn nonterm_len(&self) -> usize {
        self.nonterminals.len()
    }

    pub fn symbol_first(&self, symbol: Symbol) -> TerminalSet {
        match symbol {
            Symbol::Terminal(t) => {
                let mut set = TerminalSet::empty(self.term_len());
                set.insert(t);
                set
            }
            Symbol::NonTerminal(nt) => self.nonterminals[nt].first.clone(),
        }
    }

    pub fn is_nullable(&self, symbol: Symbol) -> bool {
        match symbol {
            Symbol::Terminal(_) => false,
            Symbol::NonTerminal(nt) => self.nonterminals[nt].nullable,
        }
    }

    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        match symbol {
            Symbol::Terminal(t) => &self.terminals[t].name,
            Symbol::NonTerminal(nt) => &self.nonterminals[nt].name,
        }
    }

    /// Number of stack values popped on a reduce by `production`: one per
    /// RHS symbol, excluding synthetic embedded-action non-terminals (§6)
    /// — those hold a spliced-out action's return value, not a value a
    /// grammar symbol ever pushed for this production's own RHS.
    pub fn rhs_stack_depth(&self, production: &Production) -> usize {
        production
            .rhs
            .iter()
            .filter(|symbol| match symbol {
                Symbol::NonTerminal(nt) => !self.nonterminals[*nt].is_embedded_action,
                Symbol::Terminal(_) => true,
            })
            .count()
    }
}

struct RawProduction {
    lhs: NonTermIndex,
    rhs: Vec<RawRhsItem>,
    explicit_prec: Option<TermIndex>,
}

pub struct GrammarBuilder {
    terminals: TermVec<Terminal>,
    nonterminals: crate::index::NonTermVec<NonTerminal>,
    term_names: IndexMap<String, TermIndex>,
    nonterm_names: IndexMap<String, NonTermIndex>,
    raw_productions: Vec<RawProduction>,
    start: Option<NonTermIndex>,
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarBuilder {
    pub fn new() -> Self {
        let mut terminals = TermVec::new();
        let mut term_names = IndexMap::new();

        let eof = terminals.push(Terminal {
            idx: EOF_INDEX,
            name: "EOF".to_string(),
            type_tag: None,
            precedence: Precedence::NONE,
        });
        term_names.insert("EOF".to_string(), eof);

        let error = terminals.push(Terminal {
            idx: ERROR_INDEX,
            name: "error".to_string(),
            type_tag: None,
            precedence: Precedence::NONE,
        });
        term_names.insert("error".to_string(), error);

        Self {
            terminals,
            nonterminals: crate::index::NonTermVec::new(),
            term_names,
            nonterm_names: IndexMap::new(),
            raw_productions: Vec::new(),
            start: None,
        }
    }

    pub fn add_terminal(
        &mut self,
        name: impl Into<String>,
        type_tag: Option<String>,
        precedence: Precedence,
    ) -> Result<TermIndex> {
        let name = name.into();
        if self.term_names.contains_key(&name) {
            return Err(Error::SymbolRedeclared(name));
        }
        let idx = self.terminals.push(Terminal {
            idx: TermIndex(self.terminals.len()),
            name: name.clone(),
            type_tag,
            precedence,
        });
        self.term_names.insert(name, idx);
        Ok(idx)
    }

    pub fn add_nonterminal(
        &mut self,
        name: impl Into<String>,
        type_tag: Option<String>,
    ) -> Result<NonTermIndex> {
        let name = name.into();
        if self.nonterm_names.contains_key(&name) {
            return Err(Error::SymbolRedeclared(name));
        }
        let idx = self.nonterminals.push(NonTerminal {
            idx: NonTermIndex(self.nonterminals.len()),
            name: name.clone(),
            type_tag,
            productions: Vec::new(),
            nullable: false,
            first: TerminalSet::empty(0),
            is_embedded_action: false,
        });
        self.nonterm_names.insert(name, idx);
        Ok(idx)
    }

    pub fn set_start(&mut self, start: NonTermIndex) {
        self.start = Some(start);
    }

    pub fn add_production(
        &mut self,
        lhs: NonTermIndex,
        rhs: Vec<RawRhsItem>,
        explicit_prec: Option<TermIndex>,
    ) {
        self.raw_productions.push(RawProduction {
            lhs,
            rhs,
            explicit_prec,
        });
    }

    /// Runs the full pipeline: rewrite, nullability/FIRST, LALR machine
    /// build, table fill, compression. Returns the rewritten grammar (with
    /// nullability/FIRST/reduce counters populated) and the build report
    /// (compact tables plus diagnostics).
    pub fn build(self, options: &BuildOptions) -> Result<(Grammar, BuildReport)> {
        let start = self
            .start
            .ok_or_else(|| Error::Internal("no start non-terminal set".to_string()))?;

        let mut diagnostics = DiagnosticsReport::new();

        // `add_nonterminal` allocates each FIRST set before every terminal is
        // necessarily known, so it has to start at capacity 0. Re-allocate at
        // the final terminal count now, before nullability/FIRST runs, or
        // `TerminalSet::union_with` silently no-ops into these empty sets.
        let term_len = self.terminals.len();
        let mut nonterminals = self.nonterminals;
        for nt in nonterminals.iter_mut() {
            nt.first = TerminalSet::empty(term_len);
        }

        let (productions, start_production, nonterminals) = crate::grammar::rewrite::rewrite(
            self.raw_productions
                .into_iter()
                .map(|r| (r.lhs, r.rhs, r.explicit_prec))
                .collect(),
            nonterminals,
            &self.terminals,
            start,
            &mut diagnostics,
        )?;

        let mut grammar = Grammar {
            terminals: self.terminals,
            nonterminals,
            productions,
            start,
            start_production,
        };

        crate::grammar::nullable_first::compute(&mut grammar);

        let machine = crate::machine::build(&grammar);

        let dense = crate::table::fill(&grammar, &machine, &mut diagnostics);
        crate::table::record_reduce_counts(&mut grammar, &dense);

        let (unused_terminals, unused_non_terminals, never_reduced) =
            crate::table::diagnostics_checks(&grammar, &mut diagnostics);

        let num_conflicts = dense.num_conflicts;
        if num_conflicts > options.expected_conflicts {
            return Err(Error::UnexpectedConflictCount {
                expected: options.expected_conflicts,
                actual: num_conflicts,
            });
        }

        let tables = crate::table::compress::compress(&grammar, &dense, options)?;

        let report = BuildReport {
            tables,
            num_states: machine.states.len(),
            num_productions: grammar.productions.len(),
            num_conflicts,
            unused_terminals,
            unused_non_terminals,
            never_reduced,
            diagnostics,
        };

        Ok((grammar, report))
    }
}
