//! LALR(1)/SLR(1) parse table construction and a table-driven shift-reduce
//! parser.
//!
//! A [`Grammar`](grammar::Grammar) is defined with a closure and analyzed
//! lazily: nullable/FIRST/FOLLOW, the LR(0) automaton and the parse tables
//! are each computed once on first access. The grammar then drives the
//! parser over any token stream:
//!
//! ```
//! use lalrgen::{
//!     grammar::{Grammar, SymbolID::{N, T}},
//!     parser::Token,
//! };
//!
//! let mut ids = None;
//! let grammar = Grammar::define(|g| {
//!     let a = g.terminal("A")?;
//!     let b = g.terminal("B")?;
//!     ids = Some((a, b));
//!     let s = g.nonterminal("S")?;
//!     g.rule(s, [T(a), N(s)])?;
//!     g.rule(s, [T(b)])?;
//!     g.start_symbol(s)?;
//!     Ok(())
//! })
//! .unwrap();
//! let (a, b) = ids.unwrap();
//!
//! assert!(!grammar.lalr_table().has_conflicts());
//!
//! let parsed = grammar
//!     .parse_tokens([Token::new(a, "a"), Token::new(b, "b"), Token::eof()])
//!     .unwrap();
//! assert!(!parsed.has_errors());
//! ```
//!
//! Conflicts never abort table construction: shift beats reduce, colliding
//! reductions share their cell, and everything is reported through
//! [`TableOutput`](table::TableOutput). Tables round-trip through a compact
//! binary form via [`ParseTable::encode`](table::ParseTable::encode) and
//! [`ParseTable::decode`](table::ParseTable::decode).

pub mod analysis;
pub mod codec;
pub mod grammar;
pub mod lalr;
pub mod lr0;
pub mod parser;
pub mod slr;
pub mod table;
pub mod types;
pub mod util;
