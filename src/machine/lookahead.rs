//! Lookahead-cell propagation (§3 "Lookahead cell", §4.3, §9).
//!
//! Two closure passes are used, matching the classic efficient LALR
//! construction: a *symbolic* pass per kernel item, seeded with a dummy
//! marker standing in for "whatever this kernel item's own lookahead turns
//! out to be", which discovers both spontaneous lookaheads and propagation
//! edges between kernel cells; and, once those cells have reached their
//! fixed point, a *concrete* pass per state that resolves the full closure
//! (including end items) to real lookahead sets for the table builder.

use indexmap::IndexMap;

use crate::grammar::builder::Grammar;
use crate::grammar::production::Item;
use crate::grammar::symbols::{Symbol, EOF_INDEX};
use crate::index::{StateIndex, StateVec};
use crate::machine::State;
use crate::sets::TerminalSet;

#[derive(Debug, Clone, Copy)]
struct Edge {
    from_state: StateIndex,
    from_item: Item,
    to_state: StateIndex,
    to_item: Item,
}

/// Closure of `seed` under a symbolic dummy lookahead (`true` = "carries
/// the dummy"). Real terminals found along the way are spontaneous
/// lookaheads; items still carrying the dummy at the end depend on
/// whatever `seed`'s own final lookahead turns out to be.
fn symbolic_closure(grammar: &Grammar, seed: Item) -> IndexMap<Item, (TerminalSet, bool)> {
    let term_len = grammar.term_len();
    let mut table: IndexMap<Item, (TerminalSet, bool)> = IndexMap::new();
    table.insert(seed, (TerminalSet::empty(term_len), true));

    let mut changed = true;
    while changed {
        changed = false;
        let snapshot: Vec<(Item, TerminalSet, bool)> =
            table.iter().map(|(i, (t, d))| (*i, t.clone(), *d)).collect();

        for (item, real, has_dummy) in snapshot {
            let prod = &grammar.productions[item.production];
            let Some(Symbol::NonTerminal(c)) = item.symbol_after_dot(&prod.rhs) else {
                continue;
            };

            let beta = &prod.rhs[item.dot + 1..];
            let mut beta_first = TerminalSet::empty(term_len);
            let mut beta_nullable = true;
            for sym in beta {
                beta_first.union_with(&grammar.symbol_first(*sym));
                if !grammar.is_nullable(*sym) {
                    beta_nullable = false;
                    break;
                }
            }

            let new_has_dummy = has_dummy && beta_nullable;
            let mut new_real = beta_first;
            if beta_nullable {
                new_real.union_with(&real);
            }

            for &prod_idx in &grammar.nonterminals[c].productions {
                let new_item = Item::start(prod_idx);
                let entry = table
                    .entry(new_item)
                    .or_insert_with(|| (TerminalSet::empty(term_len), false));
                let grew_real = entry.0.union_with(&new_real);
                let grew_dummy = new_has_dummy && !entry.1;
                if grew_dummy {
                    entry.1 = true;
                }
                if grew_real || grew_dummy {
                    changed = true;
                }
            }
        }
        crate::log!("lookahead: symbolic closure of {seed:?} at {} items, changed={changed}", table.len());
    }

    table
}

/// Computes, for every kernel item of every state, its final LALR
/// lookahead set.
pub fn compute_kernel_lookaheads(
    grammar: &Grammar,
    states: &StateVec<State>,
) -> StateVec<IndexMap<Item, TerminalSet>> {
    let term_len = grammar.term_len();

    let mut lookaheads: StateVec<IndexMap<Item, TerminalSet>> = states
        .iter()
        .map(|state| {
            state
                .kernel
                .iter()
                .map(|&item| (item, TerminalSet::empty(term_len)))
                .collect::<IndexMap<_, _>>()
        })
        .collect();

    if let Some(cell) =
        lookaheads[StateIndex(0)].get_mut(&Item::start(grammar.start_production))
    {
        cell.insert(EOF_INDEX);
    }

    let mut edges: Vec<Edge> = Vec::new();

    crate::log!("lookahead: symbolic closure pass over {} states", states.len());
    for state in states.iter() {
        for &from_item in &state.kernel {
            let table = symbolic_closure(grammar, from_item);
            for (item, (real, has_dummy)) in table {
                let prod = &grammar.productions[item.production];
                let Some(symbol) = item.symbol_after_dot(&prod.rhs) else {
                    continue;
                };
                let Some(&to_state) = state.gotos.get(&symbol) else {
                    continue;
                };
                let shifted = item.shift_core(prod.rhs.len()).unwrap();

                if !real.is_empty() {
                    if let Some(cell) = lookaheads[to_state].get_mut(&shifted) {
                        cell.union_with(&real);
                    }
                }
                if has_dummy {
                    edges.push(Edge {
                        from_state: state.idx,
                        from_item,
                        to_state,
                        to_item: shifted,
                    });
                }
            }
        }
    }

    let mut pass = 0u32;
    let mut changed = true;
    while changed {
        pass += 1;
        changed = false;
        for edge in &edges {
            let source = lookaheads[edge.from_state]
                .get(&edge.from_item)
                .cloned()
                .unwrap_or_else(|| TerminalSet::empty(term_len));
            if let Some(target) = lookaheads[edge.to_state].get_mut(&edge.to_item) {
                if target.union_with(&source) {
                    changed = true;
                }
            }
        }
        crate::log!("lookahead: propagation pass {pass} over {} edges, changed={changed}", edges.len());
    }

    lookaheads
}

/// Concrete closure of a state's kernel items, now that their lookahead
/// cells have quiesced. Unlike [`symbolic_closure`] this resolves every
/// item (including end items) to a real `TerminalSet`, which is what the
/// table builder needs for reduce actions.
pub fn resolve_closure_lookaheads(
    grammar: &Grammar,
    state: &State,
    kernel_la: &IndexMap<Item, TerminalSet>,
) -> IndexMap<Item, TerminalSet> {
    let term_len = grammar.term_len();
    let mut resolved: IndexMap<Item, TerminalSet> = IndexMap::new();

    crate::log!("lookahead: resolving closure for state {} ({} kernel items)", state.idx, state.kernel.len());
    for &seed in &state.kernel {
        let seed_la = kernel_la
            .get(&seed)
            .cloned()
            .unwrap_or_else(|| TerminalSet::empty(term_len));

        let mut table: IndexMap<Item, TerminalSet> = IndexMap::new();
        table.insert(seed, seed_la);

        let mut changed = true;
        while changed {
            changed = false;
            let snapshot: Vec<(Item, TerminalSet)> =
                table.iter().map(|(i, t)| (*i, t.clone())).collect();

            for (item, la) in snapshot {
                let prod = &grammar.productions[item.production];
                let Some(Symbol::NonTerminal(c)) = item.symbol_after_dot(&prod.rhs) else {
                    continue;
                };

                let beta = &prod.rhs[item.dot + 1..];
                let mut beta_first = TerminalSet::empty(term_len);
                let mut beta_nullable = true;
                for sym in beta {
                    beta_first.union_with(&grammar.symbol_first(*sym));
                    if !grammar.is_nullable(*sym) {
                        beta_nullable = false;
                        break;
                    }
                }

                let mut new_la = beta_first;
                if beta_nullable {
                    new_la.union_with(&la);
                }

                for &prod_idx in &grammar.nonterminals[c].productions {
                    let new_item = Item::start(prod_idx);
                    let entry = table
                        .entry(new_item)
                        .or_insert_with(|| TerminalSet::empty(term_len));
                    if entry.union_with(&new_la) {
                        changed = true;
                    }
                }
            }
        }

        for (item, la) in table {
            resolved
                .entry(item)
                .or_insert_with(|| TerminalSet::empty(term_len))
                .union_with(&la);
        }
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::builder::GrammarBuilder;
    use crate::grammar::production::RawRhsItem;
    use crate::grammar::symbols::Precedence;
    use crate::options::BuildOptions;

    #[test]
    fn start_item_lookahead_contains_eof() {
        let mut b = GrammarBuilder::new();
        let id = b.add_terminal("ID", None, Precedence::NONE).unwrap();
        let e = b.add_nonterminal("E", None).unwrap();
        b.set_start(e);
        b.add_production(e, vec![RawRhsItem::Symbol(Symbol::Terminal(id))], None);
        let (grammar, _report) = b.build(&BuildOptions::default()).unwrap();

        let machine = crate::machine::build(&grammar);
        let start_la = &machine.kernel_lookaheads[StateIndex(0)];
        let cell = start_la.get(&Item::start(grammar.start_production)).unwrap();
        assert!(cell.contains(EOF_INDEX));
    }
}
