//! LALR(1) machine construction: kernel canonicalization, closure,
//! successor construction, and lookahead propagation (§4.3).

pub mod lookahead;

use std::collections::{BTreeSet, HashMap};

use indexmap::{IndexMap, IndexSet};

use crate::grammar::builder::Grammar;
use crate::grammar::production::Item;
use crate::grammar::symbols::Symbol;
use crate::index::{StateIndex, StateVec};
use crate::sets::TerminalSet;

/// One LALR state: its kernel (what identifies it), its closure (what the
/// table builder walks), and its outgoing transitions.
#[derive(Debug, Clone)]
pub struct State {
    pub idx: StateIndex,
    pub kernel: Vec<Item>,
    pub closure: Vec<Item>,
    pub gotos: IndexMap<Symbol, StateIndex>,
}

#[derive(Debug, Clone)]
pub struct Machine {
    pub states: StateVec<State>,
    pub kernel_lookaheads: StateVec<IndexMap<Item, TerminalSet>>,
}

/// LR(0) closure of a set of items: repeatedly add `[B ::= ·γ]` for every
/// `B` appearing just after some item's dot.
fn closure_core(grammar: &Grammar, seed: &[Item]) -> Vec<Item> {
    let mut seen: IndexSet<Item> = seed.iter().copied().collect();
    let mut worklist: Vec<Item> = seed.to_vec();

    let mut i = 0;
    while i < worklist.len() {
        let item = worklist[i];
        i += 1;
        let prod = &grammar.productions[item.production];
        if let Some(Symbol::NonTerminal(nt)) = item.symbol_after_dot(&prod.rhs) {
            for &prod_idx in &grammar.nonterminals[nt].productions {
                let new_item = Item::start(prod_idx);
                if seen.insert(new_item) {
                    worklist.push(new_item);
                }
            }
        }
    }
    worklist
}

/// The set-equality key used to canonicalize kernels (§9 "kernel-hash map").
fn canonical_key(items: &[Item]) -> BTreeSet<(usize, usize)> {
    items.iter().map(|it| (it.production.0, it.dot)).collect()
}

pub fn build(grammar: &Grammar) -> Machine {
    crate::log!("machine: building LALR states from start production {}", grammar.start_production);
    let start_item = Item::start(grammar.start_production);

    let mut states: StateVec<State> = StateVec::new();
    let mut kernel_map: HashMap<BTreeSet<(usize, usize)>, StateIndex> = HashMap::new();
    let mut queue: Vec<StateIndex> = Vec::new();

    let start_idx = states.push(State {
        idx: StateIndex(0),
        kernel: vec![start_item],
        closure: Vec::new(),
        gotos: IndexMap::new(),
    });
    kernel_map.insert(canonical_key(&[start_item]), start_idx);
    queue.push(start_idx);

    while let Some(state_idx) = queue.pop() {
        let kernel = states[state_idx].kernel.clone();
        let closure = closure_core(grammar, &kernel);
        crate::log!("machine: state {state_idx} closure has {} items ({} kernel)", closure.len(), kernel.len());

        let mut groups: IndexMap<Symbol, Vec<Item>> = IndexMap::new();
        for &item in &closure {
            let prod = &grammar.productions[item.production];
            if let Some(symbol) = item.symbol_after_dot(&prod.rhs) {
                let shifted = item.shift_core(prod.rhs.len()).unwrap();
                groups.entry(symbol).or_default().push(shifted);
            }
        }

        let mut gotos: IndexMap<Symbol, StateIndex> = IndexMap::new();
        for (symbol, kernel_items) in groups {
            let key = canonical_key(&kernel_items);
            let target = if let Some(&existing) = kernel_map.get(&key) {
                existing
            } else {
                let new_idx = states.push(State {
                    idx: StateIndex(states.len()),
                    kernel: kernel_items,
                    closure: Vec::new(),
                    gotos: IndexMap::new(),
                });
                kernel_map.insert(key, new_idx);
                queue.push(new_idx);
                new_idx
            };
            gotos.insert(symbol, target);
        }

        states[state_idx].closure = closure;
        states[state_idx].gotos = gotos;
    }

    crate::log!("machine: {} states built, propagating lookaheads", states.len());
    let kernel_lookaheads = lookahead::compute_kernel_lookaheads(grammar, &states);

    Machine {
        states,
        kernel_lookaheads,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::builder::GrammarBuilder;
    use crate::grammar::production::RawRhsItem;
    use crate::options::BuildOptions;

    /// `E ::= E PLUS E | ID` (no precedence declared, for a machine-shape
    /// smoke test rather than a conflict-resolution one).
    fn small_grammar() -> Grammar {
        let mut b = GrammarBuilder::new();
        let plus = b.add_terminal("PLUS", None, crate::grammar::symbols::Precedence::NONE).unwrap();
        let id = b.add_terminal("ID", None, crate::grammar::symbols::Precedence::NONE).unwrap();
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
        b.add_production(e, vec![RawRhsItem::Symbol(Symbol::Terminal(id))], None);
        let (grammar, _report) = b.build(&BuildOptions::default()).unwrap();
        grammar
    }

    #[test]
    fn start_state_kernel_is_the_seed_item() {
        let grammar = small_grammar();
        let machine = build(&grammar);
        assert_eq!(machine.states[StateIndex(0)].kernel, vec![Item::start(grammar.start_production)]);
    }

    #[test]
    fn machine_has_at_least_one_state_per_symbol_transition() {
        let grammar = small_grammar();
        let machine = build(&grammar);
        assert!(machine.states.len() > 1);
    }
}
