//! Productions and LR(0)/LALR items.

use crate::index::{NonTermIndex, ProdIndex};
use crate::grammar::symbols::{Precedence, Symbol};
use crate::sets::TerminalSet;

/// One element of a raw, pre-rewrite RHS: either a symbol reference or an
/// opaque embedded action payload. Only the grammar rewriter (§4.1) ever
/// looks inside the `Action` variant's contents for its length/position;
/// the core never parses it.
#[derive(Debug, Clone)]
pub enum RawRhsItem {
    Symbol(Symbol),
    Action(String),
}

/// Back-pointer recorded on a synthetic `NT$k` production spliced out of a
/// base production's embedded action by the rewriter.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedAction {
    pub base_production: ProdIndex,
    /// Position of the action among the base production's original RHS
    /// elements (symbols and actions both counted).
    pub index_of_action: usize,
    /// RHS index (in the base production, post-rewrite numbering) of the
    /// previous embedded-action non-terminal, or `-1` if this is the first.
    pub index_of_intermediate_result: i32,
}

#[derive(Debug, Clone)]
pub struct Production {
    pub idx: ProdIndex,
    pub lhs: NonTermIndex,
    /// Post-rewrite RHS: terminals and non-terminals only, no actions.
    pub rhs: Vec<Symbol>,
    pub action: Option<String>,
    pub precedence: Precedence,
    pub nullable: bool,
    pub first: TerminalSet,
    pub reduce_count: u32,
    pub embedded: Option<EmbeddedAction>,
}


/// An LR item: a production together with a dot position in `[0, rhs.len()]`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Item {
    pub production: ProdIndex,
    pub dot: usize,
}

impl std::hash::Hash for Item {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // `31 * prod_index + dot`, as specified in §3.
        let combined = 31usize
            .wrapping_mul(self.production.0)
            .wrapping_add(self.dot);
        combined.hash(state);
    }
}

impl Item {
    pub fn start(production: ProdIndex) -> Self {
        Self { production, dot: 0 }
    }

    pub fn dot_at_end(&self, rhs_len: usize) -> bool {
        self.dot >= rhs_len
    }

    pub fn symbol_after_dot(&self, rhs: &[Symbol]) -> Option<Symbol> {
        rhs.get(self.dot).copied()
    }

    /// The item with the dot advanced by one position. `None` if the dot
    /// is already at the end of the RHS.
    pub fn shift_core(&self, rhs_len: usize) -> Option<Item> {
        if self.dot < rhs_len {
            Some(Item {
                production: self.production,
                dot: self.dot + 1,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::TermIndex;

    fn rhs() -> Vec<Symbol> {
        vec![
            Symbol::NonTerminal(NonTermIndex(0)),
            Symbol::Terminal(TermIndex(2)),
        ]
    }

    #[test]
    fn shift_core_advances_and_stops_at_end() {
        let item = Item::start(ProdIndex(4));
        let rhs = rhs();
        let shifted = item.shift_core(rhs.len()).unwrap();
        assert_eq!(shifted.dot, 1);
        let shifted2 = shifted.shift_core(rhs.len()).unwrap();
        assert_eq!(shifted2.dot, 2);
        assert!(shifted2.dot_at_end(rhs.len()));
        assert!(shifted2.shift_core(rhs.len()).is_none());
    }

    #[test]
    fn symbol_after_dot_reads_rhs() {
        let rhs = rhs();
        let item = Item::start(ProdIndex(0));
        assert_eq!(item.symbol_after_dot(&rhs), Some(Symbol::NonTerminal(NonTermIndex(0))));
        let item2 = Item { production: ProdIndex(0), dot: 1 };
        assert_eq!(item2.symbol_after_dot(&rhs), Some(Symbol::Terminal(TermIndex(2))));
        let item3 = Item { production: ProdIndex(0), dot: 2 };
        assert_eq!(item3.symbol_after_dot(&rhs), None);
    }

    #[test]
    fn items_equal_ignoring_unrelated_fields() {
        let a = Item { production: ProdIndex(1), dot: 2 };
        let b = Item { production: ProdIndex(1), dot: 2 };
        assert_eq!(a, b);
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut ha = DefaultHasher::new();
        a.hash(&mut ha);
        let mut hb = DefaultHasher::new();
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }
}
