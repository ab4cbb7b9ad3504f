//! LALR(1) lookahead computation over the LR(0) automaton, following the
//! spontaneous-generation-and-propagation scheme of Dragon book 4.7.
//!
//! Lookaheads are attached to kernel items only. A probe closure seeded with
//! the reserved `$unknown` terminal tells spontaneous lookaheads (concrete
//! terminals in the closure) apart from propagated ones (`$unknown` survived
//! the closure, so the source kernel's lookaheads flow to the target).

use crate::{
    analysis::Analysis,
    grammar::{Grammar, SymbolID, TerminalID, TerminalSet},
    lr0::{LR0Item, StateID},
    types::{Map, Set},
};
use indexmap::map::Entry;

/// Expand a set of LR(1) items in place until no closure rule applies.
///
/// Keys are LR(0) cores, values are the lookahead sets accumulated for them.
/// Items added by the closure start from an empty set and are revisited on
/// subsequent passes.
pub(crate) fn lr1_closure(g: &Grammar, analysis: &Analysis, items: &mut Map<LR0Item, TerminalSet>) {
    let mut changed = true;
    while changed {
        changed = false;
        for i in 0..items.len() {
            let (item, lookaheads) = {
                let (item, lookaheads) = items.get_index(i).expect("index within bounds");
                (*item, lookaheads.clone())
            };
            let Some(SymbolID::N(n)) = item.next_symbol(g) else {
                continue;
            };

            let rest = &g.rule(item.rule).right()[usize::from(item.marker) + 1..];
            let first = analysis.first_of(rest, &lookaheads);

            for rule in g.rules_of(n) {
                let key = LR0Item {
                    rule: rule.id(),
                    marker: 0,
                };
                match items.entry(key) {
                    Entry::Occupied(mut entry) => {
                        changed |= entry.get_mut().union_with(&first);
                    }
                    // A fresh item still needs its own expansion pass, even
                    // when its lookahead set starts out empty.
                    Entry::Vacant(entry) => {
                        entry.insert(first.clone());
                        changed = true;
                    }
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct LalrLookaheads {
    /// Per state, one lookahead set per kernel item, parallel to
    /// `LR0State::kernels`.
    pub kernel: Map<StateID, Vec<TerminalSet>>,
    /// The full LR(1) closure of every state under the final kernel
    /// lookaheads. This is what table construction reads reductions from.
    pub closed: Map<StateID, Map<LR0Item, TerminalSet>>,
}

impl LalrLookaheads {
    #[tracing::instrument(skip_all)]
    pub fn compute(g: &Grammar) -> Self {
        let analysis = g.analysis();
        let lr0 = g.lr0();

        let mut kernel: Map<StateID, Vec<TerminalSet>> = lr0
            .states
            .iter()
            .map(|(&id, state)| (id, vec![TerminalSet::default(); state.kernels.len()]))
            .collect();

        // The augmented start item is reduced exactly at end of input.
        let start_index = lr0
            .state(StateID::START)
            .kernel_index(LR0Item::START)
            .expect("start state lost its start item");
        kernel[&StateID::START][start_index].insert(TerminalID::EOF);

        // One probe closure per kernel item. Concrete lookaheads on advanced
        // items are spontaneous; the sentinel marks a propagation edge from
        // the probed kernel item to the advanced item's slot.
        let mut edges = Map::<(StateID, usize), Set<(StateID, usize)>>::default();
        for (&id, state) in &lr0.states {
            for (k, &kernel_item) in state.kernels.iter().enumerate() {
                let mut probe = Map::default();
                probe.insert(
                    kernel_item,
                    std::iter::once(TerminalID::UNKNOWN).collect::<TerminalSet>(),
                );
                lr1_closure(g, analysis, &mut probe);

                for (item, lookaheads) in &probe {
                    let Some(symbol) = item.next_symbol(g) else {
                        continue;
                    };
                    let target = lr0
                        .transition(id, symbol)
                        .expect("closure transition missing from the automaton");
                    let slot = lr0
                        .state(target)
                        .kernel_index(item.advanced())
                        .expect("advanced item missing from the target kernel");

                    for t in lookaheads.iter() {
                        if t == TerminalID::UNKNOWN {
                            edges.entry((id, k)).or_default().insert((target, slot));
                        } else {
                            kernel[&target][slot].insert(t);
                        }
                    }
                }
            }
        }

        tracing::debug!(edges = edges.len(), "propagation edges discovered");

        // Flow lookaheads along the edges until nothing grows.
        let mut changed = true;
        while changed {
            changed = false;
            for ((from, k), targets) in &edges {
                let source = kernel[from][*k].clone();
                for &(to, slot) in targets {
                    changed |= kernel[&to][slot].union_with(&source);
                }
            }
        }

        // Re-close each kernel under its final lookaheads to recover the
        // lookaheads of the nonkernel (reduce-ready epsilon) items as well.
        let mut closed = Map::default();
        for (&id, state) in &lr0.states {
            let mut items: Map<LR0Item, TerminalSet> = state
                .kernels
                .iter()
                .zip(&kernel[&id])
                .map(|(&item, lookaheads)| (item, lookaheads.clone()))
                .collect();
            lr1_closure(g, analysis, &mut items);
            closed.insert(id, items);
        }

        Self { kernel, closed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::{N, T};

    // Dragon book grammar 4.49, the standard LALR-vs-SLR example:
    //   S := L = R | R ; L := * R | id ; R := L
    fn pointer_grammar() -> (Grammar, TerminalID) {
        let mut eq = None;
        let grammar = Grammar::define(|g| {
            let equals = g.terminal("EQUALS")?;
            let star = g.terminal("STAR")?;
            let id = g.terminal("ID")?;
            eq = Some(equals);

            let s = g.nonterminal("S")?;
            let l = g.nonterminal("L")?;
            let r = g.nonterminal("R")?;

            g.rule(s, [N(l), T(equals), N(r)])?;
            g.rule(s, [N(r)])?;
            g.rule(l, [T(star), N(r)])?;
            g.rule(l, [T(id)])?;
            g.rule(r, [N(l)])?;

            g.start_symbol(s)?;
            Ok(())
        })
        .unwrap();
        (grammar, eq.unwrap())
    }

    fn reduce_lookaheads(
        grammar: &Grammar,
        lookaheads: &LalrLookaheads,
        rule_len: usize,
        with_shift: bool,
    ) -> TerminalSet {
        let lr0 = grammar.lr0();
        for (id, state) in &lr0.states {
            for item in state.kernels.iter() {
                if !item.is_complete(grammar) || grammar.rule(item.rule).len() != rule_len {
                    continue;
                }
                if state.shifts.is_empty() == with_shift {
                    continue;
                }
                return lookaheads.closed[id][item].clone();
            }
        }
        panic!("no matching completed item");
    }

    #[test]
    fn assignment_never_licenses_the_early_reduction() {
        let (grammar, equals) = pointer_grammar();
        let lookaheads = LalrLookaheads::compute(&grammar);

        // The state holding both "S := L . = R" and "R := L ." reduces
        // R := L on end of input only. FOLLOW(R) contains '=' but no
        // sentential form reaches this state with '=' after R, which is
        // exactly what clears the SLR conflict here.
        let set = reduce_lookaheads(&grammar, &lookaheads, 1, true);
        assert!(!set.contains(equals));
        assert!(set.contains(TerminalID::EOF));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn start_item_carries_end_of_input() {
        let (grammar, _) = pointer_grammar();
        let lookaheads = LalrLookaheads::compute(&grammar);

        let set = &lookaheads.kernel[&StateID::START][0];
        assert!(set.contains(TerminalID::EOF));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn sentinel_never_leaks_into_lookaheads() {
        let (grammar, _) = pointer_grammar();
        let lookaheads = LalrLookaheads::compute(&grammar);

        for sets in lookaheads.kernel.values() {
            for set in sets {
                assert!(!set.contains(TerminalID::UNKNOWN));
            }
        }
        for items in lookaheads.closed.values() {
            for set in items.values() {
                assert!(!set.contains(TerminalID::UNKNOWN));
            }
        }
    }

    #[test]
    fn closure_expands_through_nullable_suffixes() {
        let (grammar, _) = pointer_grammar();
        let analysis = grammar.analysis();

        // Closing the start item reaches every rule at marker 0, and EOF
        // flows into each lookahead set along some chain.
        let mut items = Map::default();
        items.insert(
            LR0Item::START,
            std::iter::once(TerminalID::EOF).collect::<TerminalSet>(),
        );
        lr1_closure(&grammar, analysis, &mut items);

        // start item + all five rules at marker 0.
        assert_eq!(items.len(), 6);
        assert!(items
            .values()
            .all(|set| set.contains(TerminalID::EOF)));
    }
}
