//! Default-reduce computation and two-level greedy first-fit table
//! compression (§4.5).

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::grammar::builder::Grammar;
use crate::grammar::symbols::ERROR_INDEX;
use crate::index::ProdIndex;
use crate::options::BuildOptions;
use crate::table::{ActionEntry, DenseTables};

/// The compact output bundle described in §6: two packed integer vectors
/// plus the per-production metadata a runtime driver needs to execute a
/// reduce (`production_table`) and the opaque action payloads (`action_code_table`).
#[derive(Debug, Clone)]
pub struct TableBundle {
    pub action_compressed: Vec<i16>,
    /// Packed first-fit layout (`BuildOptions::compact_reduces = true`, the
    /// default): `[0, S)` holds each state's base into the `k`-region,
    /// `[S, ..)` holds the goto targets themselves, `-1` for absent. Emitted
    /// dense instead (`compact_reduces = false`): a flat `S * nonterm_len`
    /// array with no base prefix, row-major by state.
    pub reduce_compressed: Vec<i16>,
    /// Per-state raw packing base into the action table's `S + 2k` region
    /// (§4.5's `base_table`); kept alongside `action_compressed` since the
    /// latter's `[0, S)` prefix holds default actions, not bases.
    pub action_bases: Vec<usize>,
    /// `(lhs_index, rhs_symbol_count, rhs_stack_depth)` per production.
    pub production_table: Vec<(usize, usize, usize)>,
    pub action_code_table: Vec<Option<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DefaultAction {
    Error,
    Reduce(ProdIndex),
}

fn encode_action(cell: ActionEntry) -> i16 {
    match cell {
        ActionEntry::Error => 0,
        ActionEntry::Shift(s) => (2 * s.0 + 1) as i16,
        ActionEntry::Reduce(p) => (2 * p.0 + 2) as i16,
    }
}

fn encode_default(default: DefaultAction) -> i16 {
    match default {
        DefaultAction::Error => 0,
        DefaultAction::Reduce(p) => (2 * p.0 + 2) as i16,
    }
}

/// §4.5: pin the default via `row[error_terminal]` if it's already a
/// reduce, otherwise pick the production with the most REDUCE cells in
/// the row (ties broken by lowest production index for determinism).
fn choose_default(row: &[ActionEntry]) -> DefaultAction {
    if let ActionEntry::Reduce(p) = row[ERROR_INDEX.0] {
        return DefaultAction::Reduce(p);
    }

    let mut counts: BTreeMap<ProdIndex, usize> = BTreeMap::new();
    for cell in row {
        if let ActionEntry::Reduce(p) = cell {
            *counts.entry(*p).or_insert(0) += 1;
        }
    }

    let mut best: Option<(ProdIndex, usize)> = None;
    for (p, c) in counts {
        if best.map_or(true, |(_, bc)| c > bc) {
            best = Some((p, c));
        }
    }

    match best {
        Some((p, _)) => DefaultAction::Reduce(p),
        None => DefaultAction::Error,
    }
}

fn action_differs(default: DefaultAction, cell: ActionEntry) -> bool {
    match (default, cell) {
        (DefaultAction::Error, ActionEntry::Error) => false,
        (DefaultAction::Reduce(dp), ActionEntry::Reduce(p)) if dp == p => false,
        _ => true,
    }
}

/// Finds the smallest `base >= 0` such that every `base + column` slot is
/// unused, then marks those slots used. Greedy first-fit, not optimal, but
/// deterministic given a fixed row order (§4.5).
fn first_fit_base(used: &mut Vec<bool>, columns: &[usize]) -> usize {
    if columns.is_empty() {
        return 0;
    }
    let mut base = 0usize;
    loop {
        let fits = columns.iter().all(|&c| {
            let k = base + c;
            k >= used.len() || !used[k]
        });
        if fits {
            for &c in columns {
                let k = base + c;
                if used.len() <= k {
                    used.resize(k + 1, false);
                }
                used[k] = true;
            }
            return base;
        }
        base += 1;
    }
}

pub fn compress(grammar: &Grammar, dense: &DenseTables, options: &BuildOptions) -> Result<TableBundle> {
    crate::log!(
        "compress: packing tables for {} states (compact_reduces={})",
        dense.action.len(),
        options.compact_reduces
    );
    let num_states = dense.action.len();

    let mut action_used: Vec<bool> = Vec::new();
    let mut action_bases: Vec<usize> = Vec::with_capacity(num_states);
    let mut action_defaults: Vec<DefaultAction> = Vec::with_capacity(num_states);
    let mut action_sparse: Vec<Vec<(usize, ActionEntry)>> = Vec::with_capacity(num_states);

    for (state_idx, row) in dense.action.iter().enumerate() {
        let default = choose_default(row);
        let sparse: Vec<(usize, ActionEntry)> = row
            .iter()
            .enumerate()
            .filter_map(|(t, &cell)| action_differs(default, cell).then_some((t, cell)))
            .collect();
        let columns: Vec<usize> = sparse.iter().map(|(t, _)| *t).collect();
        let base_raw = first_fit_base(&mut action_used, &columns);

        let action_base = num_states + 2 * base_raw;
        if action_base > i16::MAX as usize {
            return Err(Error::TableOverflow { state: state_idx });
        }

        action_defaults.push(default);
        action_bases.push(base_raw);
        action_sparse.push(sparse);
    }

    let action_k_slots = action_used.len();
    let mut action_compressed = vec![0i16; num_states + 2 * action_k_slots];
    for (state_idx, default) in action_defaults.iter().enumerate() {
        action_compressed[state_idx] = encode_default(*default);
    }
    // Owner-tag slots default to -1, a value no real state index can take,
    // so an unclaimed `k` never reads as "owned by state 0" (§4.5).
    for k in 0..action_k_slots {
        action_compressed[num_states + 2 * k] = -1;
    }
    for (state_idx, (base_raw, sparse)) in action_bases.iter().zip(action_sparse.iter()).enumerate() {
        for &(t, cell) in sparse {
            let k = base_raw + t;
            let slot = num_states + 2 * k;
            action_compressed[slot] = state_idx as i16;
            action_compressed[slot + 1] = encode_action(cell);
        }
    }

    let reduce_compressed = if options.compact_reduces {
        let mut reduce_used: Vec<bool> = Vec::new();
        let mut reduce_bases: Vec<usize> = Vec::with_capacity(num_states);
        let mut reduce_sparse: Vec<Vec<(usize, crate::index::StateIndex)>> = Vec::with_capacity(num_states);

        for (state_idx, row) in dense.goto.iter().enumerate() {
            let sparse: Vec<(usize, crate::index::StateIndex)> = row
                .iter()
                .enumerate()
                .filter_map(|(nt, cell)| cell.map(|s| (nt, s)))
                .collect();
            let columns: Vec<usize> = sparse.iter().map(|(nt, _)| *nt).collect();
            let base_raw = first_fit_base(&mut reduce_used, &columns);

            let reduce_base = num_states + base_raw;
            if reduce_base > i16::MAX as usize {
                return Err(Error::TableOverflow { state: state_idx });
            }

            reduce_bases.push(base_raw);
            reduce_sparse.push(sparse);
        }

        let reduce_k_slots = reduce_used.len();
        let mut reduce_compressed = vec![-1i16; num_states + reduce_k_slots];
        for (state_idx, base_raw) in reduce_bases.iter().enumerate() {
            reduce_compressed[state_idx] = (num_states + base_raw) as i16;
        }
        for (base_raw, sparse) in reduce_bases.iter().zip(reduce_sparse.iter()) {
            for &(nt, target) in sparse {
                let slot = num_states + base_raw + nt;
                reduce_compressed[slot] = target.0 as i16;
            }
        }
        reduce_compressed
    } else {
        // Emitted dense, one row of `nonterm_len` columns per state, no
        // base/prefix region at all (§6: `compact_reduces = false`).
        let nonterm_len = grammar.nonterm_len();
        let mut dense_reduce = vec![-1i16; num_states * nonterm_len];
        for (state_idx, row) in dense.goto.iter().enumerate() {
            for (nt, cell) in row.iter().enumerate() {
                if let Some(target) = cell {
                    dense_reduce[state_idx * nonterm_len + nt] = target.0 as i16;
                }
            }
        }
        dense_reduce
    };

    let production_table = grammar
        .productions
        .iter()
        .map(|p| (p.lhs.0, p.rhs.len(), grammar.rhs_stack_depth(p)))
        .collect();
    let action_code_table = grammar.productions.iter().map(|p| p.action.clone()).collect();

    Ok(TableBundle {
        action_compressed,
        reduce_compressed,
        action_bases,
        production_table,
        action_code_table,
    })
}

/// Decodes the compressed action table at `(state, terminal)`, falling
/// back to the state's default when the slot's owner tag doesn't match
/// (§4.5's lookup rule). Exposed for the "compression soundness" test
/// property (§8); a real runtime driver would inline this.
pub fn decode_action(bundle: &TableBundle, num_states: usize, state: usize, terminal: usize) -> i16 {
    let k = bundle.action_bases[state] + terminal;
    let slot = num_states + 2 * k;
    let owner = bundle.action_compressed.get(slot).copied();
    if owner == Some(state as i16) {
        bundle.action_compressed[slot + 1]
    } else {
        bundle.action_compressed[state]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::builder::GrammarBuilder;
    use crate::grammar::production::RawRhsItem;
    use crate::grammar::symbols::{Assoc, Precedence, Symbol};
    use crate::options::BuildOptions;

    fn arithmetic_bundle() -> (Grammar, TableBundle) {
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
        let (grammar, report) = b.build(&BuildOptions::default()).unwrap();
        (grammar, report.tables)
    }

    #[test]
    fn compression_is_deterministic_across_identical_builds() {
        let (_g1, bundle1) = arithmetic_bundle();
        let (_g2, bundle2) = arithmetic_bundle();
        assert_eq!(bundle1.action_compressed, bundle2.action_compressed);
        assert_eq!(bundle1.reduce_compressed, bundle2.reduce_compressed);
    }

    #[test]
    fn production_table_records_rhs_len() {
        let (grammar, bundle) = arithmetic_bundle();
        for (i, p) in grammar.productions.iter().enumerate() {
            assert_eq!(bundle.production_table[i].1, p.rhs.len());
        }
    }

    #[test]
    fn decoded_actions_match_the_dense_table() {
        let mut b = GrammarBuilder::new();
        let plus = b.add_terminal("PLUS", None, Precedence::new(1, Assoc::Left)).unwrap();
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
        b.add_production(e, vec![RawRhsItem::Symbol(Symbol::Terminal(id))], None);
        let (grammar, report) = b.build(&BuildOptions::default()).unwrap();

        let machine = crate::machine::build(&grammar);
        let mut diagnostics = crate::diagnostics::DiagnosticsReport::new();
        let dense = crate::table::fill(&grammar, &machine, &mut diagnostics);
        let num_states = dense.action.len();

        for (state, row) in dense.action.iter().enumerate() {
            for (term, &cell) in row.iter().enumerate() {
                let decoded = decode_action(&report.tables, num_states, state, term);
                assert_eq!(decoded, encode_action(cell), "state {state} term {term}");
            }
        }
    }

    /// A terminal whose `k`-slot is never claimed (because its dense cell
    /// already equals the row's default) must still decode to that default,
    /// even when the default is a REDUCE at state 0 — the owner-tag sentinel
    /// must not be confusable with a real state index (§8 "compression
    /// soundness").
    #[test]
    fn unclaimed_slot_at_state_zero_decodes_to_its_reduce_default() {
        let mut b = GrammarBuilder::new();
        let s = b.add_nonterminal("A", None).unwrap();
        let bnt = b.add_nonterminal("B", None).unwrap();
        let cnt = b.add_nonterminal("C", None).unwrap();
        b.set_start(s);
        b.add_production(
            s,
            vec![
                RawRhsItem::Symbol(Symbol::NonTerminal(bnt)),
                RawRhsItem::Symbol(Symbol::NonTerminal(cnt)),
            ],
            None,
        );
        b.add_production(bnt, vec![], None);
        b.add_production(cnt, vec![], None);
        let (grammar, report) = b.build(&BuildOptions::default()).unwrap();

        let machine = crate::machine::build(&grammar);
        let mut diagnostics = crate::diagnostics::DiagnosticsReport::new();
        let dense = crate::table::fill(&grammar, &machine, &mut diagnostics);
        let num_states = dense.action.len();
        assert_eq!(num_states, 1);

        for (term, &cell) in dense.action[crate::index::StateIndex(0)].iter().enumerate() {
            let decoded = decode_action(&report.tables, num_states, 0, term);
            assert_eq!(decoded, encode_action(cell), "term {term}");
        }
    }
}
