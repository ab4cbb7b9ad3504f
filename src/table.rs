//! Parse table construction and conflict reporting.
//!
//! The builder is shared between the LALR(1) and SLR(1) generators; they
//! differ only in which lookahead set licenses each reduction. Conflicts do
//! not abort construction: shift wins over reduce, and colliding reductions
//! are kept side by side in the cell, with every collision reported.

use crate::{
    grammar::{Grammar, NonterminalID, RuleID, TerminalID, TerminalSet},
    lalr::LalrLookaheads,
    lr0::StateID,
    types::{Map, Set},
    util::display_fn,
};
use indexmap::map::Entry;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Shift(StateID),
    /// One or more candidate reductions. More than one rule means the cell
    /// carries an unresolved reduce/reduce conflict; the parser applies the
    /// first.
    Reduce(Vec<RuleID>),
    Accept,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseTable {
    pub start_state: StateID,
    pub actions: Map<(StateID, TerminalID), Action>,
    pub gotos: Map<(StateID, NonterminalID), StateID>,
}

impl ParseTable {
    pub fn action(&self, state: StateID, terminal: TerminalID) -> Option<&Action> {
        self.actions.get(&(state, terminal))
    }

    pub fn goto(&self, state: StateID, nonterminal: NonterminalID) -> Option<StateID> {
        self.gotos.get(&(state, nonterminal)).copied()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for ((state, terminal), action) in &self.actions {
                write!(f, "{:?} / {} => ", state, g.terminal_name(*terminal))?;
                match action {
                    Action::Shift(to) => writeln!(f, "shift({:?})", to)?,
                    Action::Reduce(rules) => {
                        f.write_str("reduce(")?;
                        for (i, rule) in rules.iter().enumerate() {
                            if i > 0 {
                                f.write_str(", ")?;
                            }
                            write!(f, "{}", g.rule(*rule).display(g))?;
                        }
                        f.write_str(")\n")?;
                    }
                    Action::Accept => f.write_str("accept\n")?,
                }
            }
            for ((state, nonterminal), to) in &self.gotos {
                writeln!(
                    f,
                    "{:?} / {} => goto({:?})",
                    state, g.nonterminals[nonterminal], to
                )?;
            }
            Ok(())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateID,
    pub terminal: TerminalID,
    pub kind: ConflictKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    /// A reduction collided with a shift on the same terminal. The shift was
    /// kept.
    ShiftReduce { rule: RuleID },
    /// Two or more reductions share the cell. All of them, in the order they
    /// were discovered.
    ReduceReduce { rules: Vec<RuleID> },
}

impl Conflict {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(
                f,
                "{:?} on {}: ",
                self.state,
                g.terminal_name(self.terminal)
            )?;
            match &self.kind {
                ConflictKind::ShiftReduce { rule } => {
                    write!(f, "shift/reduce, dropped {}", g.rule(*rule).display(g))
                }
                ConflictKind::ReduceReduce { rules } => {
                    f.write_str("reduce/reduce between")?;
                    for rule in rules {
                        write!(f, " [{}]", g.rule(*rule).display(g))?;
                    }
                    Ok(())
                }
            }
        })
    }
}

#[derive(Debug)]
pub struct TableOutput {
    pub table: ParseTable,
    pub conflicts: Vec<Conflict>,
}

impl TableOutput {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn shift_reduce_conflicts(&self) -> impl Iterator<Item = &Conflict> + '_ {
        self.conflicts
            .iter()
            .filter(|c| matches!(c.kind, ConflictKind::ShiftReduce { .. }))
    }

    pub fn reduce_reduce_conflicts(&self) -> impl Iterator<Item = &Conflict> + '_ {
        self.conflicts
            .iter()
            .filter(|c| matches!(c.kind, ConflictKind::ReduceReduce { .. }))
    }
}

/// Build the LALR(1) parse table.
#[tracing::instrument(skip_all)]
pub fn lalr(g: &Grammar) -> TableOutput {
    let lookaheads = LalrLookaheads::compute(g);
    build(g, |state| {
        lookaheads.closed[&state]
            .iter()
            .filter(|(item, _)| item.is_complete(g))
            .map(|(item, set)| (item.rule, set.clone()))
            .collect()
    })
}

/// Shared action/goto assembly over the LR(0) automaton. `completed` yields
/// the reduce-ready rules of a state together with the terminals that
/// license each reduction.
pub(crate) fn build<F>(g: &Grammar, mut completed: F) -> TableOutput
where
    F: FnMut(StateID) -> Vec<(RuleID, TerminalSet)>,
{
    let lr0 = g.lr0();

    let mut actions = Map::<(StateID, TerminalID), Action>::default();
    let mut gotos = Map::default();
    let mut conflicts = Vec::new();
    let mut contested = Set::<(StateID, TerminalID)>::default();

    for (&id, state) in &lr0.states {
        for (&t, &to) in &state.shifts {
            actions.insert((id, t), Action::Shift(to));
        }
        for (&n, &to) in &state.gotos {
            gotos.insert((id, n), to);
        }

        for (rule, lookaheads) in completed(id) {
            // Accept always keeps its cell; reductions colliding with it
            // (possible when the start symbol derives itself) are reported
            // as reduce/reduce against the accepting rule.
            if g.rule(rule).is_accepting() {
                match actions.entry((id, TerminalID::EOF)) {
                    Entry::Occupied(mut entry) => {
                        if let Action::Reduce(rules) = entry.get() {
                            let mut rules = rules.clone();
                            rules.insert(0, rule);
                            conflicts.push(Conflict {
                                state: id,
                                terminal: TerminalID::EOF,
                                kind: ConflictKind::ReduceReduce { rules },
                            });
                        }
                        entry.insert(Action::Accept);
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(Action::Accept);
                    }
                }
                continue;
            }
            for t in lookaheads.iter() {
                match actions.entry((id, t)) {
                    Entry::Occupied(mut entry) => match entry.get_mut() {
                        Action::Shift(_) => conflicts.push(Conflict {
                            state: id,
                            terminal: t,
                            kind: ConflictKind::ShiftReduce { rule },
                        }),
                        Action::Reduce(rules) => {
                            if !rules.contains(&rule) {
                                rules.push(rule);
                                contested.insert((id, t));
                            }
                        }
                        Action::Accept => conflicts.push(Conflict {
                            state: id,
                            terminal: t,
                            kind: ConflictKind::ReduceReduce {
                                rules: vec![RuleID::ACCEPT, rule],
                            },
                        }),
                    },
                    Entry::Vacant(entry) => {
                        entry.insert(Action::Reduce(vec![rule]));
                    }
                }
            }
        }
    }

    for &(state, terminal) in &contested {
        // A contested cell can have been taken over by Accept afterwards;
        // that collision was reported above with the full rule list.
        if let Some(Action::Reduce(rules)) = actions.get(&(state, terminal)) {
            conflicts.push(Conflict {
                state,
                terminal,
                kind: ConflictKind::ReduceReduce {
                    rules: rules.clone(),
                },
            });
        }
    }

    if !conflicts.is_empty() {
        tracing::debug!(count = conflicts.len(), "table has conflicts");
    }

    TableOutput {
        table: ParseTable {
            start_state: StateID::START,
            actions,
            gotos,
        },
        conflicts,
    }
}
