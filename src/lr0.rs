//! Kernel-only LR(0) automaton construction.
//!
//! States are identified by their kernel items alone; the closure of a state
//! is represented as the set of nonterminals whose marker-0 items belong to
//! it and is re-derived on demand. Construction is a single BFS over a work
//! queue, visiting each state exactly once.

use crate::{
    grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID},
    types::{Map, Set},
    util::display_fn,
};
use std::{collections::VecDeque, fmt};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u16);

impl StateID {
    pub const START: Self = Self(0);

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}

/// An LR(0) item: a production rule plus a marker position within its
/// right-hand side. `marker == rule.len()` means the rule is reduce-ready.
///
/// Lookaheads are never part of item identity; equality and ordering use
/// only the `(rule, marker)` pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LR0Item {
    pub rule: RuleID,
    pub marker: u16,
}

impl LR0Item {
    pub const START: Self = Self {
        rule: RuleID::ACCEPT,
        marker: 0,
    };

    /// Kernel items are those with an advanced marker, plus the start item.
    pub fn is_kernel(self) -> bool {
        self.marker != 0 || self == Self::START
    }

    pub fn is_complete(self, g: &Grammar) -> bool {
        usize::from(self.marker) == g.rule(self.rule).len()
    }

    /// The symbol immediately after the marker, if any.
    pub fn next_symbol(self, g: &Grammar) -> Option<SymbolID> {
        g.rule(self.rule).right().get(usize::from(self.marker)).copied()
    }

    pub fn advanced(self) -> Self {
        Self {
            rule: self.rule,
            marker: self.marker + 1,
        }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            let rule = g.rule(self.rule);
            write!(f, "{} := [", g.nonterminals[&rule.left()])?;
            for (i, symbol) in rule.right().iter().enumerate() {
                if i == usize::from(self.marker) {
                    f.write_str(" .")?;
                }
                match symbol {
                    SymbolID::T(t) => write!(f, " {}", g.terminals[t])?,
                    SymbolID::N(n) => write!(f, " {}", g.nonterminals[n])?,
                }
            }
            if usize::from(self.marker) == rule.len() {
                f.write_str(" .")?;
            }
            f.write_str(" ]")
        })
    }
}

#[derive(Debug)]
pub struct LR0State {
    /// Kernel items, sorted. State identity is this vector and nothing else.
    pub kernels: Vec<LR0Item>,
    /// Nonterminals whose marker-0 items make up the closure of this state.
    pub closure_nonterminals: Set<NonterminalID>,
    pub shifts: Map<TerminalID, StateID>,
    pub gotos: Map<NonterminalID, StateID>,
}

impl LR0State {
    /// Position of a kernel item within `kernels`.
    pub fn kernel_index(&self, item: LR0Item) -> Option<usize> {
        self.kernels.binary_search(&item).ok()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            writeln!(f, "## kernels:")?;
            for kernel in &self.kernels {
                writeln!(f, "- {}", kernel.display(g))?;
            }
            if !self.shifts.is_empty() {
                writeln!(f, "## shifts:")?;
                for (t, to) in &self.shifts {
                    writeln!(f, "- {} => {:?}", g.terminals[t], to)?;
                }
            }
            if !self.gotos.is_empty() {
                writeln!(f, "## gotos:")?;
                for (n, to) in &self.gotos {
                    writeln!(f, "- {} => {:?}", g.nonterminals[n], to)?;
                }
            }
            Ok(())
        })
    }
}

#[derive(Debug)]
pub struct LR0Automaton {
    pub states: Map<StateID, LR0State>,
}

impl LR0Automaton {
    /// Calculate the canonical LR(0) item set collection of the grammar.
    #[tracing::instrument(skip_all)]
    pub fn compute(g: &Grammar) -> Self {
        let reach = reachable_nonterminals(g);

        let mut states = Map::<StateID, LR0State>::default();
        let mut isocores = Map::<Vec<LR0Item>, StateID>::default();
        let mut pending = VecDeque::<(StateID, Vec<LR0Item>)>::new();
        let mut next_id: u16 = 1;

        let start_kernel = vec![LR0Item::START];
        isocores.insert(start_kernel.clone(), StateID::START);
        pending.push_back((StateID::START, start_kernel));

        while let Some((current, kernels)) = pending.pop_front() {
            let mut closure_nonterminals = Set::default();
            for kernel in &kernels {
                if let Some(SymbolID::N(n)) = kernel.next_symbol(g) {
                    closure_nonterminals.extend(reach[&n].iter().copied());
                }
            }

            // Group advanced items by transition symbol, one pass over the
            // kernel items plus the closure's marker-0 items.
            let mut transitions = Map::<SymbolID, Set<LR0Item>>::default();
            let closure_items = closure_nonterminals.iter().flat_map(|&n| {
                g.rules_of(n).map(|rule| LR0Item {
                    rule: rule.id(),
                    marker: 0,
                })
            });
            for item in kernels.iter().copied().chain(closure_items) {
                if let Some(symbol) = item.next_symbol(g) {
                    transitions.entry(symbol).or_default().insert(item.advanced());
                }
            }

            let mut shifts = Map::default();
            let mut gotos = Map::default();
            for (symbol, new_kernel) in transitions {
                let mut new_kernel: Vec<_> = new_kernel.into_iter().collect();
                new_kernel.sort_unstable();

                let next = match isocores.get(&new_kernel) {
                    Some(&id) => id,
                    None => {
                        let id = StateID(next_id);
                        next_id += 1;
                        isocores.insert(new_kernel.clone(), id);
                        pending.push_back((id, new_kernel));
                        id
                    }
                };
                match symbol {
                    SymbolID::T(t) => {
                        shifts.insert(t, next);
                    }
                    SymbolID::N(n) => {
                        gotos.insert(n, next);
                    }
                }
            }

            states.insert(
                current,
                LR0State {
                    kernels,
                    closure_nonterminals,
                    shifts,
                    gotos,
                },
            );
        }

        tracing::debug!(states = states.len(), "LR(0) collection complete");

        Self { states }
    }

    pub fn state(&self, id: StateID) -> &LR0State {
        &self.states[&id]
    }

    /// The canonical goto relation: the state reached by advancing over
    /// `symbol` from `from`, if any.
    pub fn transition(&self, from: StateID, symbol: SymbolID) -> Option<StateID> {
        let state = self.state(from);
        match symbol {
            SymbolID::T(t) => state.shifts.get(&t).copied(),
            SymbolID::N(n) => state.gotos.get(&n).copied(),
        }
    }

    /// Materialize the full closure of a state: its kernel items followed by
    /// the marker-0 items of every closure nonterminal.
    pub fn closed_items(&self, g: &Grammar, id: StateID) -> Vec<LR0Item> {
        let state = self.state(id);
        let mut items = state.kernels.clone();
        for &n in &state.closure_nonterminals {
            for rule in g.rules_of(n) {
                items.push(LR0Item {
                    rule: rule.id(),
                    marker: 0,
                });
            }
        }
        items
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (i, (id, state)) in self.states.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {:?}", id)?;
                write!(f, "{}", state.display(g))?;
            }
            Ok(())
        })
    }
}

/// For each nonterminal, the transitive set of nonterminals contributing
/// marker-0 items to any closure that contains it.
fn reachable_nonterminals(g: &Grammar) -> Map<NonterminalID, Set<NonterminalID>> {
    let mut reach = Map::<NonterminalID, Set<NonterminalID>>::default();
    for &n in g.nonterminals.keys() {
        let mut members = Set::default();
        members.insert(n);
        let mut queue: VecDeque<NonterminalID> = Some(n).into_iter().collect();
        while let Some(m) = queue.pop_front() {
            for rule in g.rules_of(m) {
                if let Some(SymbolID::N(head)) = rule.right().first() {
                    if members.insert(*head) {
                        queue.push_back(*head);
                    }
                }
            }
        }
        reach.insert(n, members);
    }
    reach
}
