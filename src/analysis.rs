//! Nullable/FIRST/FOLLOW computation.
//!
//! The classic iterative fixpoint over all production rules (Dragon book,
//! 2nd ed., §4.4): every set only grows and is bounded by the terminal
//! alphabet, so the loop terminates once a full pass changes nothing.

use crate::{
    grammar::{Grammar, SymbolID, TerminalID, TerminalSet},
    types::{Map, Set},
};

#[derive(Debug)]
pub struct Analysis {
    nullable: Set<SymbolID>,
    first: Map<SymbolID, TerminalSet>,
    follow: Map<SymbolID, TerminalSet>,
}

impl Analysis {
    #[tracing::instrument(skip_all)]
    pub fn compute(grammar: &Grammar) -> Self {
        let mut nullable = Set::default();
        let mut first: Map<SymbolID, TerminalSet> = Map::default();
        let mut follow: Map<SymbolID, TerminalSet> = Map::default();

        // First(t) = {t} for every terminal; everything else starts empty.
        for symbol in grammar.symbols() {
            let mut initial = TerminalSet::default();
            if let SymbolID::T(t) = symbol {
                initial.insert(t);
            }
            first.insert(symbol, initial);
            follow.insert(symbol, TerminalSet::default());
        }

        // $eof can always follow the start symbol.
        follow[&SymbolID::N(grammar.start_symbol)].insert(TerminalID::EOF);

        // Monotone growth bounds the number of useful passes; exceeding the
        // bound means a pass reported a change without growing any set.
        let max_passes = grammar.terminals.len()
            * (grammar.terminals.len() + grammar.nonterminals.len())
            + 2;
        let mut passes = 0;

        let mut changed = true;
        while changed {
            changed = false;
            passes += 1;
            assert!(
                passes <= max_passes,
                "nullable/FIRST/FOLLOW fixpoint failed to converge"
            );

            for rule in grammar.rules.values() {
                let x = SymbolID::N(rule.left());
                let right = rule.right();

                if right.iter().all(|s| nullable.contains(s)) {
                    changed |= nullable.insert(x);
                }

                for (i, &yi) in right.iter().enumerate() {
                    // Nullable prefix: First(X) += First(Yi).
                    if right[..i].iter().all(|s| nullable.contains(s)) {
                        changed |= union_entry(&mut first, x, yi);
                    }

                    // Nullable suffix: Follow(Yi) += Follow(X).
                    if right[i + 1..].iter().all(|s| nullable.contains(s)) {
                        changed |= union_entry(&mut follow, yi, x);
                    }

                    // Nullable gap between i and j: Follow(Yi) += First(Yj).
                    for (j, &yj) in right.iter().enumerate().skip(i + 1) {
                        if !right[i + 1..j].iter().all(|s| nullable.contains(s)) {
                            continue;
                        }
                        let first_yj = first[&yj].clone();
                        changed |= follow[&yi].union_with(&first_yj);
                    }
                }
            }
        }

        tracing::debug!(passes, "analysis converged");

        Self {
            nullable,
            first,
            follow,
        }
    }

    pub fn is_nullable(&self, symbol: SymbolID) -> bool {
        self.nullable.contains(&symbol)
    }

    pub fn first(&self, symbol: SymbolID) -> &TerminalSet {
        &self.first[&symbol]
    }

    pub fn follow(&self, symbol: SymbolID) -> &TerminalSet {
        &self.follow[&symbol]
    }

    /// `First(symbols extra)` — the FIRST set of an arbitrary symbol string,
    /// falling through to `extra` when the whole string is nullable. This is
    /// the lookahead primitive of the LALR(1) closure.
    pub fn first_of(&self, symbols: &[SymbolID], extra: &TerminalSet) -> TerminalSet {
        let mut result = TerminalSet::default();
        for symbol in symbols {
            result.union_with(&self.first[symbol]);
            if !self.nullable.contains(symbol) {
                return result;
            }
        }
        result.union_with(extra);
        result
    }
}

// `map[dst] += map[src]`, both keys in the same table.
fn union_entry(map: &mut Map<SymbolID, TerminalSet>, dst: SymbolID, src: SymbolID) -> bool {
    if dst == src {
        return false;
    }
    let added = map[&src].clone();
    map[&dst].union_with(&added)
}
