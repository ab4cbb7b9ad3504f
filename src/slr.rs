//! SLR(1) parse table construction.
//!
//! Reuses the LR(0) automaton and the shared table builder; a completed item
//! reduces on every terminal in the FOLLOW set of its left-hand side rather
//! than on computed lookaheads. Strictly weaker than LALR(1), kept for
//! comparing the two on the same grammar.

use crate::{
    grammar::{Grammar, SymbolID},
    table::TableOutput,
};

/// Build the SLR(1) parse table.
#[tracing::instrument(skip_all)]
pub fn slr(g: &Grammar) -> TableOutput {
    let analysis = g.analysis();
    let lr0 = g.lr0();

    crate::table::build(g, |state| {
        lr0.closed_items(g, state)
            .into_iter()
            .filter(|item| item.is_complete(g))
            .map(|item| {
                let left = g.rule(item.rule).left();
                (item.rule, analysis.follow(SymbolID::N(left)).clone())
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use crate::grammar::{
        Grammar, TerminalID,
        SymbolID::{N, T},
    };

    // S := L = R | R ; L := * R | id ; R := L
    // SLR(1) rejects this grammar, LALR(1) accepts it.
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

    #[test]
    fn follow_based_reduction_conflicts_on_assignment() {
        let (grammar, equals) = pointer_grammar();
        let output = grammar.slr_table();

        // FOLLOW(R) contains '=', so "R := L ." collides with shifting '='.
        let conflict = output
            .shift_reduce_conflicts()
            .find(|c| c.terminal == equals);
        assert!(conflict.is_some(), "{:?}", output.conflicts);
    }

    #[test]
    fn lalr_lookaheads_resolve_the_same_grammar() {
        let (grammar, _) = pointer_grammar();
        assert!(grammar.slr_table().has_conflicts());
        assert!(!grammar.lalr_table().has_conflicts());
    }

    #[test]
    fn shift_wins_the_contested_cell() {
        let (grammar, equals) = pointer_grammar();
        let output = grammar.slr_table();

        let conflict = output
            .shift_reduce_conflicts()
            .find(|c| c.terminal == equals)
            .unwrap();
        assert!(matches!(
            output.table.action(conflict.state, equals),
            Some(crate::table::Action::Shift(_))
        ));
    }
}
