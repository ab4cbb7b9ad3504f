use lalrgen::{
    grammar::{
        Grammar,
        SymbolID::{N, T},
        TerminalID,
    },
    parser::Token,
    table::{Action, ConflictKind},
};

struct DanglingElse {
    grammar: Grammar,
    r#if: TerminalID,
    then: TerminalID,
    r#else: TerminalID,
    cond: TerminalID,
    other: TerminalID,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// S := if E then S | if E then S else S | other ; E := cond
fn dangling_else() -> DanglingElse {
    init_tracing();
    let mut ids = None;
    let grammar = Grammar::define(|g| {
        let r#if = g.terminal("IF")?;
        let then = g.terminal("THEN")?;
        let r#else = g.terminal("ELSE")?;
        let cond = g.terminal("COND")?;
        let other = g.terminal("OTHER")?;
        ids = Some((r#if, then, r#else, cond, other));

        let s = g.nonterminal("S")?;
        let e = g.nonterminal("E")?;

        g.rule(s, [T(r#if), N(e), T(then), N(s)])?;
        g.rule(s, [T(r#if), N(e), T(then), N(s), T(r#else), N(s)])?;
        g.rule(s, [T(other)])?;
        g.rule(e, [T(cond)])?;

        g.start_symbol(s)?;
        Ok(())
    })
    .unwrap();
    let (r#if, then, r#else, cond, other) = ids.unwrap();
    DanglingElse {
        grammar,
        r#if,
        then,
        r#else,
        cond,
        other,
    }
}

#[test]
fn dangling_else_is_a_shift_reduce_conflict() {
    let g = dangling_else();
    let output = g.grammar.lalr_table();

    let conflict = output
        .shift_reduce_conflicts()
        .find(|c| c.terminal == g.r#else)
        .expect("dangling else must conflict");

    // The cell keeps the shift.
    assert!(matches!(
        output.table.action(conflict.state, g.r#else),
        Some(Action::Shift(_))
    ));
}

#[test]
fn else_binds_to_the_innermost_if() {
    let g = dangling_else();

    // if cond then if cond then other else other
    let tokens = [
        Token::new(g.r#if, "if"),
        Token::new(g.cond, "cond"),
        Token::new(g.then, "then"),
        Token::new(g.r#if, "if"),
        Token::new(g.cond, "cond"),
        Token::new(g.then, "then"),
        Token::new(g.other, "other"),
        Token::new(g.r#else, "else"),
        Token::new(g.other, "other"),
        Token::eof(),
    ];
    let parsed = g.grammar.parse_tokens(tokens).unwrap();
    assert!(!parsed.has_errors());

    // Shift-preference hangs the else off the inner statement: the outer
    // S has four children and its last child carries the else.
    assert_eq!(parsed.root.children.len(), 4);
    let inner = &parsed.root.children[3];
    assert_eq!(inner.children.len(), 6);
    assert_eq!(inner.children[4].symbol, T(g.r#else));
}

// S := A | B ; A := x ; B := x
// Both A and B reduce on the same lookahead; the first declared rule wins.
fn ambiguous_reduction() -> (Grammar, TerminalID) {
    init_tracing();
    let mut ids = None;
    let grammar = Grammar::define(|g| {
        let x = g.terminal("X")?;
        ids = Some(x);

        let s = g.nonterminal("S")?;
        let a = g.nonterminal("A")?;
        let b = g.nonterminal("B")?;

        g.rule(s, [N(a)])?;
        g.rule(s, [N(b)])?;
        g.rule(a, [T(x)])?;
        g.rule(b, [T(x)])?;

        g.start_symbol(s)?;
        Ok(())
    })
    .unwrap();
    (grammar, ids.unwrap())
}

#[test]
fn colliding_reductions_are_reported_and_kept() {
    let (grammar, _) = ambiguous_reduction();
    let output = grammar.lalr_table();

    let conflict = output
        .reduce_reduce_conflicts()
        .next()
        .expect("A := x / B := x must collide");
    let ConflictKind::ReduceReduce { rules } = &conflict.kind else {
        panic!("wrong conflict kind");
    };
    assert_eq!(rules.len(), 2);

    // The contested cell holds both candidates.
    let Some(Action::Reduce(cell)) = output.table.action(conflict.state, conflict.terminal) else {
        panic!("contested cell lost its reductions");
    };
    assert_eq!(cell, rules);
}

#[test]
fn the_first_declared_rule_wins_the_reduction() {
    let (grammar, x) = ambiguous_reduction();
    let parsed = grammar
        .parse_tokens([Token::new(x, "x"), Token::eof()])
        .unwrap();

    assert!(!parsed.has_errors());
    // S reduced through A, never B.
    let via = parsed.root.children[0].symbol;
    let a = grammar
        .nonterminals
        .iter()
        .find(|(_, n)| n.name() == Some("A"))
        .map(|(id, _)| *id)
        .unwrap();
    assert_eq!(via, N(a));
}

#[test]
fn conflicted_tables_still_count_both_kinds() {
    let g = dangling_else();
    let output = g.grammar.lalr_table();
    assert!(output.has_conflicts());
    assert_eq!(output.reduce_reduce_conflicts().count(), 0);
    assert!(output.shift_reduce_conflicts().count() >= 1);

    let (grammar, _) = ambiguous_reduction();
    let output = grammar.lalr_table();
    assert_eq!(output.shift_reduce_conflicts().count(), 0);
    assert_eq!(output.reduce_reduce_conflicts().count(), 1);
}
