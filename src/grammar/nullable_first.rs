//! Nullability and FIRST-set fixed points (§4.2).
//!
//! Both loops are monotone over finite sets, so order of iteration doesn't
//! affect the fixed point, only how many passes it takes to reach it.

use crate::grammar::builder::Grammar;
use crate::sets::TerminalSet;

pub fn compute(grammar: &mut Grammar) {
    crate::log!("nullable/FIRST: starting fixed point over {} productions", grammar.productions.len());
    let term_len = grammar.term_len();

    let mut pass = 0u32;
    loop {
        pass += 1;
        let mut changed = false;

        for prod_idx in grammar.productions.indices() {
            let rhs = grammar.productions[prod_idx].rhs.clone();

            let mut first = TerminalSet::empty(term_len);
            let mut nullable = true;
            for sym in &rhs {
                first.union_with(&grammar.symbol_first(*sym));
                if !grammar.is_nullable(*sym) {
                    nullable = false;
                    break;
                }
            }

            let prod = &mut grammar.productions[prod_idx];
            if nullable && !prod.nullable {
                prod.nullable = true;
                changed = true;
            }
            if prod.first.union_with(&first) {
                changed = true;
            }

            let lhs = prod.lhs;
            let prod_first = prod.first.clone();
            let prod_nullable = prod.nullable;

            let nt = &mut grammar.nonterminals[lhs];
            if prod_nullable && !nt.nullable {
                nt.nullable = true;
                changed = true;
            }
            if nt.first.union_with(&prod_first) {
                changed = true;
            }
        }

        crate::log!("nullable/FIRST: pass {pass} changed={changed}");
        if !changed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::production::Production;
    use crate::grammar::symbols::{NonTerminal, Precedence, Symbol, Terminal, EOF_INDEX};
    use crate::index::{NonTermIndex, NonTermVec, ProdIndex, ProdVec, TermIndex, TermVec};

    fn nt(idx: usize, name: &str) -> NonTerminal {
        NonTerminal {
            idx: NonTermIndex(idx),
            name: name.to_string(),
            type_tag: None,
            productions: Vec::new(),
            nullable: false,
            first: TerminalSet::empty(2),
            is_embedded_action: false,
        }
    }

    #[test]
    fn nullable_chain_propagates_to_lhs() {
        let mut terminals: TermVec<Terminal> = TermVec::new();
        terminals.push(Terminal {
            idx: EOF_INDEX,
            name: "EOF".into(),
            type_tag: None,
            precedence: Precedence::NONE,
        });
        let a_id = TermIndex(1);
        terminals.push(Terminal {
            idx: a_id,
            name: "a".into(),
            type_tag: None,
            precedence: Precedence::NONE,
        });

        let mut nonterminals: NonTermVec<NonTerminal> = NonTermVec::new();
        let a = nonterminals.push(nt(0, "A"));
        let b = nonterminals.push(nt(1, "B"));
        let c = nonterminals.push(nt(2, "C"));

        let mut productions: ProdVec<Production> = ProdVec::new();
        let p_a = productions.push(Production {
            idx: ProdIndex(0),
            lhs: a,
            rhs: vec![Symbol::NonTerminal(b), Symbol::NonTerminal(c)],
            action: None,
            precedence: Precedence::NONE,
            nullable: false,
            first: TerminalSet::empty(2),
            reduce_count: 0,
            embedded: None,
        });
        let p_b = productions.push(Production {
            idx: ProdIndex(0),
            lhs: b,
            rhs: vec![],
            action: None,
            precedence: Precedence::NONE,
            nullable: false,
            first: TerminalSet::empty(2),
            reduce_count: 0,
            embedded: None,
        });
        let p_c = productions.push(Production {
            idx: ProdIndex(0),
            lhs: c,
            rhs: vec![],
            action: None,
            precedence: Precedence::NONE,
            nullable: false,
            first: TerminalSet::empty(2),
            reduce_count: 0,
            embedded: None,
        });
        nonterminals[a].productions.push(p_a);
        nonterminals[b].productions.push(p_b);
        nonterminals[c].productions.push(p_c);

        let mut grammar = Grammar {
            terminals,
            nonterminals,
            productions,
            start: a,
            start_production: p_a,
        };

        compute(&mut grammar);

        assert!(grammar.nonterminals[a].nullable);
        assert!(grammar.nonterminals[b].nullable);
        assert!(grammar.nonterminals[c].nullable);
        assert!(grammar.nonterminals[a].first.is_empty());
    }
}
