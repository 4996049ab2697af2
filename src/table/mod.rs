//! Shift/reduce table fill, precedence-based conflict resolution, and the
//! unused-symbol / never-reduced diagnostics (§4.4, §4.6).

pub mod compress;

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticsReport};
use crate::grammar::builder::Grammar;
use crate::grammar::symbols::{Assoc, Symbol, ERROR_INDEX};
use crate::index::{ProdIndex, StateIndex, StateVec, TermIndex};
use crate::machine::{lookahead, Machine};
use crate::sets::TerminalSet;

use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionEntry {
    Error,
    Shift(StateIndex),
    Reduce(ProdIndex),
}

#[derive(Debug, Clone)]
pub struct DenseTables {
    /// One row per state, one column per terminal.
    pub action: StateVec<Vec<ActionEntry>>,
    /// One row per state, one column per non-terminal.
    pub goto: StateVec<Vec<Option<StateIndex>>>,
    pub num_conflicts: u32,
}

/// Fills the dense action/goto tables and resolves conflicts by precedence
/// (§4.4). Diagnostics for every resolved conflict are pushed as they're
/// found; production reduce-use counters are *not* touched here (see
/// [`record_reduce_counts`]) so this function only needs `&Grammar`.
pub fn fill(grammar: &Grammar, machine: &Machine, diagnostics: &mut DiagnosticsReport) -> DenseTables {
    crate::log!("table: filling action/goto tables for {} states", machine.states.len());
    let term_len = grammar.term_len();
    let nonterm_len = grammar.nonterm_len();

    let mut action: StateVec<Vec<ActionEntry>> = StateVec::new();
    let mut goto: StateVec<Vec<Option<StateIndex>>> = StateVec::new();
    let mut num_conflicts = 0u32;

    for state in machine.states.iter() {
        let mut row_action = vec![ActionEntry::Error; term_len];
        let mut row_goto: Vec<Option<StateIndex>> = vec![None; nonterm_len];

        for (&symbol, &target) in state.gotos.iter() {
            match symbol {
                Symbol::Terminal(t) => row_action[t.0] = ActionEntry::Shift(target),
                Symbol::NonTerminal(nt) => row_goto[nt.0] = Some(target),
            }
        }

        let kernel_la = &machine.kernel_lookaheads[state.idx];
        let resolved = lookahead::resolve_closure_lookaheads(grammar, state, kernel_la);

        let mut by_term: IndexMap<TermIndex, Vec<ProdIndex>> = IndexMap::new();
        for &item in &state.closure {
            let prod = &grammar.productions[item.production];
            if !item.dot_at_end(prod.rhs.len()) {
                continue;
            }
            let la = resolved
                .get(&item)
                .cloned()
                .unwrap_or_else(|| TerminalSet::empty(term_len));
            for t in la.iter() {
                by_term.entry(t).or_default().push(item.production);
            }
        }

        for (t, mut prods) in by_term {
            prods.sort_by_key(|p| p.0);

            if prods.len() > 1 {
                num_conflicts += 1;
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::ReduceReduceConflict,
                        format!(
                            "reduce/reduce conflict on '{}' between productions {} and {}",
                            grammar.terminals[t].name, prods[0], prods[1]
                        ),
                    )
                    .with_state(state.idx)
                    .with_symbols(vec![grammar.terminals[t].name.clone()]),
                );
            }
            let winning_reduce = prods[0];

            let resolved_action = match row_action[t.0] {
                ActionEntry::Shift(target) => {
                    resolve_shift_reduce(grammar, state.idx, t, target, winning_reduce, diagnostics, &mut num_conflicts)
                }
                _ => ActionEntry::Reduce(winning_reduce),
            };
            row_action[t.0] = resolved_action;
        }

        action.push(row_action);
        goto.push(row_goto);
    }

    crate::log!("table: fill done, {num_conflicts} conflict(s) resolved");
    DenseTables {
        action,
        goto,
        num_conflicts,
    }
}

fn resolve_shift_reduce(
    grammar: &Grammar,
    state: StateIndex,
    term: TermIndex,
    shift_target: StateIndex,
    reduce_prod: ProdIndex,
    diagnostics: &mut DiagnosticsReport,
    num_conflicts: &mut u32,
) -> ActionEntry {
    let term_prec = grammar.terminals[term].precedence;
    let prod_prec = grammar.productions[reduce_prod].precedence;

    if term_prec.is_defined() && prod_prec.is_defined() {
        if prod_prec.level > term_prec.level {
            return ActionEntry::Reduce(reduce_prod);
        }
        if term_prec.level > prod_prec.level {
            return ActionEntry::Shift(shift_target);
        }
        return match term_prec.assoc {
            Assoc::Left => ActionEntry::Reduce(reduce_prod),
            Assoc::Right => ActionEntry::Shift(shift_target),
            Assoc::NonAssoc => {
                *num_conflicts += 1;
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::NonassocConflict,
                        format!(
                            "nonassociative terminal '{}' used where both sides would apply",
                            grammar.terminals[term].name
                        ),
                    )
                    .with_state(state)
                    .with_symbols(vec![grammar.terminals[term].name.clone()]),
                );
                ActionEntry::Error
            }
            Assoc::None => unreachable!("is_defined() excludes Assoc::None"),
        };
    }

    *num_conflicts += 1;
    diagnostics.push(
        Diagnostic::new(
            DiagnosticKind::ShiftReduceConflict,
            format!(
                "shift/reduce conflict on '{}', resolved in favor of shift",
                grammar.terminals[term].name
            ),
        )
        .with_state(state)
        .with_symbols(vec![grammar.terminals[term].name.clone()]),
    );
    ActionEntry::Shift(shift_target)
}

/// Increments each production's reduce-use counter by the number of
/// `(state, terminal)` cells where it is the resolved action. Split from
/// [`fill`] because that only borrows `&Grammar`.
pub fn record_reduce_counts(grammar: &mut Grammar, dense: &DenseTables) {
    for row in dense.action.iter() {
        for cell in row {
            if let ActionEntry::Reduce(p) = cell {
                grammar.productions[*p].reduce_count += 1;
            }
        }
    }
}

/// Unused-terminal, unused-non-terminal, and never-reduced diagnostics
/// (§4.6). Returns `(unused_terminals, unused_non_terminals, never_reduced)`.
pub fn diagnostics_checks(
    grammar: &Grammar,
    diagnostics: &mut DiagnosticsReport,
) -> (usize, usize, usize) {
    let mut unused_terminals = 0;
    for t in grammar.terminals.iter() {
        if t.idx == crate::grammar::symbols::EOF_INDEX || t.idx == ERROR_INDEX {
            continue;
        }
        let used = grammar
            .productions
            .iter()
            .any(|p| p.rhs.contains(&Symbol::Terminal(t.idx)));
        if !used {
            unused_terminals += 1;
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::UnusedSymbol,
                    format!("terminal '{}' is never referenced in any production", t.name),
                )
                .with_symbols(vec![t.name.clone()]),
            );
        }
    }

    let mut unused_non_terminals = 0;
    for nt in grammar.nonterminals.iter() {
        if nt.idx == grammar.start || nt.is_embedded_action {
            continue;
        }
        let used = grammar
            .productions
            .iter()
            .any(|p| p.rhs.contains(&Symbol::NonTerminal(nt.idx)));
        if !used || nt.productions.is_empty() {
            unused_non_terminals += 1;
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::UnusedSymbol,
                    format!("non-terminal '{}' is unused or has no productions", nt.name),
                )
                .with_symbols(vec![nt.name.clone()]),
            );
        }
    }

    let mut never_reduced = 0;
    for p in grammar.productions.iter() {
        if p.idx == grammar.start_production {
            continue;
        }
        if p.reduce_count == 0 {
            never_reduced += 1;
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::ProductionNeverReduced,
                format!(
                    "production {} (lhs '{}') is never reduced",
                    p.idx,
                    grammar.symbol_name(Symbol::NonTerminal(p.lhs))
                ),
            ));
        }
    }

    (unused_terminals, unused_non_terminals, never_reduced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::builder::GrammarBuilder;
    use crate::grammar::production::RawRhsItem;
    use crate::grammar::symbols::{Assoc, Precedence};
    use crate::options::BuildOptions;

    fn arithmetic_grammar() -> Grammar {
        let mut b = GrammarBuilder::new();
        let plus = b.add_terminal("PLUS", None, Precedence::new(1, Assoc::Left)).unwrap();
        let times = b.add_terminal("TIMES", None, Precedence::new(2, Assoc::Left)).unwrap();
        let id = b.add_terminal("ID", None, Precedence::NONE).unwrap();
        let e = b.add_nonterminal("E", None).unwrap();
        b.set_start(e);
        b.add_production(
            e,
            vec![
                RawRhsItem::Symbol(Symbol::NonTerminal(e)),
                RawRhsItem::Symbol(Symbol::Terminal(plus)),
                RawRhsItem::Symbol(Symbol::NonTerminal(e)),
            ],
            None,
        );
        b.add_production(
            e,
            vec![
                RawRhsItem::Symbol(Symbol::NonTerminal(e)),
                RawRhsItem::Symbol(Symbol::Terminal(times)),
                RawRhsItem::Symbol(Symbol::NonTerminal(e)),
            ],
            None,
        );
        b.add_production(e, vec![RawRhsItem::Symbol(Symbol::Terminal(id))], None);
        let (grammar, _report) = b.build(&BuildOptions::default()).unwrap();
        grammar
    }

    #[test]
    fn precedence_resolves_shift_reduce_without_reporting() {
        let grammar = arithmetic_grammar();
        let machine = crate::machine::build(&grammar);
        let mut diagnostics = DiagnosticsReport::new();
        let dense = fill(&grammar, &machine, &mut diagnostics);
        assert_eq!(dense.num_conflicts, 0);
        assert_eq!(diagnostics.count(DiagnosticKind::ShiftReduceConflict), 0);
    }

    #[test]
    fn reduce_reduce_tie_break_keeps_lower_index() {
        let mut b = GrammarBuilder::new();
        let x = b.add_terminal("x", None, Precedence::NONE).unwrap();
        let s = b.add_nonterminal("S", None).unwrap();
        let a = b.add_nonterminal("A", None).unwrap();
        let c = b.add_nonterminal("B", None).unwrap();
        b.set_start(s);
        b.add_production(s, vec![RawRhsItem::Symbol(Symbol::NonTerminal(a))], None);
        b.add_production(s, vec![RawRhsItem::Symbol(Symbol::NonTerminal(c))], None);
        b.add_production(a, vec![RawRhsItem::Symbol(Symbol::Terminal(x))], None);
        b.add_production(c, vec![RawRhsItem::Symbol(Symbol::Terminal(x))], None);
        let (grammar, report) = b.build(&BuildOptions::default()).unwrap();
        assert_eq!(report.num_conflicts, 1);
        assert_eq!(
            report.diagnostics.count(DiagnosticKind::ReduceReduceConflict),
            1
        );
    }
}
