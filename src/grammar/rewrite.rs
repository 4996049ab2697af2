//! Embedded-action rewriting (§4.1).
//!
//! Turns a raw production `A ::= α₁ {act₁} α₂ {act₂} … αₙ {actₙ}` into one
//! equivalent production whose action (if any) is trailing, plus one
//! synthetic `NT$k ::= ε {actₖ}` production per non-trailing action.
//! Adjacent actions are concatenated before splitting, matching the
//! description in §4.1.

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticsReport};
use crate::error::Result;
use crate::grammar::production::{EmbeddedAction, Production, RawRhsItem};
use crate::grammar::symbols::{NonTerminal, Precedence, Symbol, Terminal};
use crate::index::{NonTermIndex, NonTermVec, ProdIndex, ProdVec, TermIndex, TermVec};
use crate::sets::TerminalSet;

type RawProduction = (NonTermIndex, Vec<RawRhsItem>, Option<TermIndex>);

/// Merges consecutive `Action` items in a raw RHS into one, per §4.1.
fn merge_adjacent_actions(rhs: Vec<RawRhsItem>) -> Vec<RawRhsItem> {
    let mut merged: Vec<RawRhsItem> = Vec::with_capacity(rhs.len());
    for item in rhs {
        match (&item, merged.last_mut()) {
            (RawRhsItem::Action(text), Some(RawRhsItem::Action(prev))) => {
                prev.push_str(text);
            }
            _ => merged.push(item),
        }
    }
    merged
}

fn resolve_precedence(
    lhs: NonTermIndex,
    new_rhs: &[Symbol],
    terminals: &TermVec<Terminal>,
    explicit_prec: Option<TermIndex>,
    diagnostics: &mut DiagnosticsReport,
) -> Precedence {
    if let Some(term) = explicit_prec {
        return terminals[term].precedence;
    }

    let mut distinct: Vec<Precedence> = Vec::new();
    for symbol in new_rhs {
        if let Symbol::Terminal(t) = symbol {
            let prec = terminals[*t].precedence;
            if prec.is_defined() && !distinct.contains(&prec) {
                distinct.push(prec);
            }
        }
    }

    match distinct.len() {
        0 => Precedence::NONE,
        1 => distinct[0],
        _ => {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::ProductionPrecedenceAmbiguous,
                    format!(
                        "multiple distinct precedences among RHS terminals of a production for '{}' and no explicit %prec",
                        "<nonterminal>"
                    ),
                )
                .with_symbols(vec![format!("{:?}", lhs)]),
            );
            Precedence::NONE
        }
    }
}

pub fn rewrite(
    raw_productions: Vec<RawProduction>,
    mut nonterminals: NonTermVec<NonTerminal>,
    terminals: &TermVec<Terminal>,
    start: NonTermIndex,
    diagnostics: &mut DiagnosticsReport,
) -> Result<(ProdVec<Production>, ProdIndex, NonTermVec<NonTerminal>)> {
    crate::logn!("rewrite: splicing embedded actions out of {} raw productions -- ", raw_productions.len());
    let mut productions: ProdVec<Production> = ProdVec::new();

    // $START is synthesized as an extra non-terminal so the LALR machine
    // builder has a single, uniform start kernel to seed from (§4.3).
    let start_nt = nonterminals.push(NonTerminal {
        idx: NonTermIndex(nonterminals.len()),
        name: "$START".to_string(),
        type_tag: None,
        productions: Vec::new(),
        nullable: false,
        first: TerminalSet::empty(terminals.len()),
        is_embedded_action: false,
    });

    let start_prod_idx = productions.push(Production {
        idx: ProdIndex(0),
        lhs: start_nt,
        rhs: vec![Symbol::NonTerminal(start)],
        action: None,
        precedence: Precedence::NONE,
        nullable: false,
        first: TerminalSet::empty(terminals.len()),
        reduce_count: 0,
        embedded: None,
    });
    nonterminals[start_nt].productions.push(start_prod_idx);

    let mut embedded_counter: usize = 0;

    for (lhs, raw_rhs, explicit_prec) in raw_productions {
        let merged = merge_adjacent_actions(raw_rhs);

        // How many of the actions in this production are non-trailing (and
        // therefore need a synthetic NT$k)? Only the very last element, if
        // it is itself an action, stays trailing.
        let last_is_action = matches!(merged.last(), Some(RawRhsItem::Action(_)));
        let action_positions: Vec<usize> = merged
            .iter()
            .enumerate()
            .filter_map(|(i, item)| matches!(item, RawRhsItem::Action(_)).then_some(i))
            .collect();
        let synth_count = if last_is_action {
            action_positions.len().saturating_sub(1)
        } else {
            action_positions.len()
        };

        let base_idx = ProdIndex(productions.len() + synth_count);

        let mut new_rhs: Vec<Symbol> = Vec::new();
        let mut trailing_action: Option<String> = None;
        let mut last_intermediate: i32 = -1;
        let merged_len = merged.len();

        for (pos, item) in merged.into_iter().enumerate() {
            match item {
                RawRhsItem::Symbol(symbol) => new_rhs.push(symbol),
                RawRhsItem::Action(text) => {
                    if pos == merged_len - 1 {
                        trailing_action = Some(text);
                    } else {
                        embedded_counter += 1;
                        let nt_name = format!("NT${embedded_counter}");
                        let synth_nt = nonterminals.push(NonTerminal {
                            idx: NonTermIndex(nonterminals.len()),
                            name: nt_name,
                            type_tag: None,
                            productions: Vec::new(),
                            nullable: false,
                            first: TerminalSet::empty(terminals.len()),
                            is_embedded_action: true,
                        });

                        let synth_prod_idx = productions.push(Production {
                            idx: ProdIndex(productions.len()),
                            lhs: synth_nt,
                            rhs: Vec::new(),
                            action: Some(text),
                            precedence: Precedence::NONE,
                            nullable: false,
                            first: TerminalSet::empty(terminals.len()),
                            reduce_count: 0,
                            embedded: Some(EmbeddedAction {
                                base_production: base_idx,
                                index_of_action: pos,
                                index_of_intermediate_result: last_intermediate,
                            }),
                        });
                        nonterminals[synth_nt].productions.push(synth_prod_idx);

                        new_rhs.push(Symbol::NonTerminal(synth_nt));
                        last_intermediate = (new_rhs.len() - 1) as i32;
                    }
                }
            }
        }

        let precedence =
            resolve_precedence(lhs, &new_rhs, terminals, explicit_prec, diagnostics);

        let base_prod = productions.push(Production {
            idx: ProdIndex(0), // corrected below
            lhs,
            rhs: new_rhs,
            action: trailing_action,
            precedence,
            nullable: false,
            first: TerminalSet::empty(terminals.len()),
            reduce_count: 0,
            embedded: None,
        });
        debug_assert_eq!(base_prod, base_idx);
        productions[base_prod].idx = base_prod;
        nonterminals[lhs].productions.push(base_prod);
    }

    crate::log!("rewrite: done, {} productions after splicing", productions.len());
    Ok((productions, start_prod_idx, nonterminals))
}
