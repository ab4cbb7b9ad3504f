//! Table-driven shift-reduce parser with skip-and-continue error recovery.
//!
//! An unexpected token is recorded and dropped, then parsing resumes with
//! the next one. Only end of input forces a stop: the parser then hands back
//! whatever partial trees are still on the stack under an `$unknown` root,
//! so the caller sees both the errors and how far the parse got.

use crate::{
    grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID},
    lr0::StateID,
    table::{Action, ParseTable},
    util::display_fn,
};
use std::fmt;

/// A terminal together with the matched input fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub terminal: TerminalID,
    pub lexeme: Option<String>,
}

impl Token {
    pub fn new(terminal: TerminalID, lexeme: impl Into<String>) -> Self {
        Self {
            terminal,
            lexeme: Some(lexeme.into()),
        }
    }

    /// The end-of-input marker every token stream must finish with.
    pub fn eof() -> Self {
        Self {
            terminal: TerminalID::EOF,
            lexeme: None,
        }
    }
}

/// A node of the concrete parse tree. Leaves carry the shifted token,
/// interior nodes the children of the reduction that built them, in
/// left-to-right source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNode {
    pub symbol: SymbolID,
    pub token: Option<Token>,
    pub children: Vec<ParseNode>,
}

impl ParseNode {
    fn leaf(token: Token) -> Self {
        Self {
            symbol: SymbolID::T(token.terminal),
            token: Some(token),
            children: vec![],
        }
    }

    fn interior(symbol: SymbolID, children: Vec<ParseNode>) -> Self {
        Self {
            symbol,
            token: None,
            children,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty() && self.token.is_some()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| self.write_indented(g, f, 0))
    }

    fn write_indented(&self, g: &Grammar, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        for _ in 0..depth {
            f.write_str("  ")?;
        }
        match self.symbol {
            SymbolID::T(t) => write!(f, "{}", g.terminal_name(t))?,
            SymbolID::N(n) => write!(f, "{}", g.nonterminals[&n])?,
        }
        if let Some(lexeme) = self.token.as_ref().and_then(|t| t.lexeme.as_deref()) {
            write!(f, " {:?}", lexeme)?;
        }
        writeln!(f)?;
        for child in &self.children {
            child.write_indented(g, f, depth + 1)?;
        }
        Ok(())
    }
}

/// The outcome of a parse that reached a tree: the root plus every error
/// skipped over along the way.
#[derive(Debug)]
pub struct Parsed {
    pub root: ParseNode,
    pub errors: Vec<String>,
}

impl Parsed {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Failures recovery cannot paper over. Apart from the missing end-of-input
/// marker these only occur with a table that does not belong to the grammar,
/// e.g. one decoded from a corrupt stream.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no goto from {state:?} on {nonterminal:?} after a reduction")]
    MissingGoto {
        state: StateID,
        nonterminal: NonterminalID,
    },

    #[error("the table reduces by {rule:?}, which this grammar does not define")]
    UnknownRule { rule: RuleID },

    #[error("reduction by {rule:?} pops more nodes than the stack holds")]
    StackExhausted { rule: RuleID },

    #[error("token stream ended without the end-of-input marker")]
    UnexpectedEndOfInput,
}

pub struct Parser<'g> {
    grammar: &'g Grammar,
    table: &'g ParseTable,
}

impl<'g> Parser<'g> {
    pub fn new(grammar: &'g Grammar, table: &'g ParseTable) -> Self {
        Self { grammar, table }
    }

    /// Drive the table over a token stream. The stream must end with
    /// [`Token::eof`].
    pub fn parse<I>(&self, tokens: I) -> Result<Parsed, EngineError>
    where
        I: IntoIterator<Item = Token>,
    {
        // The seed pairs the start state with a placeholder node so reduce
        // offsets stay uniform. It is never part of the returned tree.
        let mut stack: Vec<(ParseNode, StateID)> = vec![(
            ParseNode::interior(SymbolID::N(self.grammar.start_symbol), vec![]),
            self.table.start_state,
        )];
        let mut errors = Vec::new();

        for token in tokens {
            loop {
                let state = stack.last().expect("seed never popped").1;
                match self.table.action(state, token.terminal) {
                    Some(Action::Shift(to)) => {
                        let to = *to;
                        stack.push((ParseNode::leaf(token), to));
                        break;
                    }
                    Some(Action::Reduce(rules)) => {
                        // On a reduce/reduce conflict the first rule wins.
                        let id = rules[0];
                        let rule = self
                            .grammar
                            .rules
                            .get(&id)
                            .ok_or(EngineError::UnknownRule { rule: id })?;
                        if stack.len() <= rule.len() {
                            return Err(EngineError::StackExhausted { rule: id });
                        }
                        let split = stack.len() - rule.len();
                        let children: Vec<_> =
                            stack.drain(split..).map(|(node, _)| node).collect();

                        let state = stack.last().expect("seed never popped").1;
                        let left = rule.left();
                        let next = self
                            .table
                            .goto(state, left)
                            .ok_or(EngineError::MissingGoto {
                                state,
                                nonterminal: left,
                            })?;
                        stack.push((ParseNode::interior(SymbolID::N(left), children), next));
                    }
                    Some(Action::Accept) => {
                        let (root, _) = stack.pop().expect("accept with an empty stack");
                        return Ok(Parsed { root, errors });
                    }
                    None => {
                        errors.push(format!(
                            "unexpected symbol: {}",
                            token
                                .lexeme
                                .clone()
                                .unwrap_or_else(|| self.grammar.terminal_name(token.terminal))
                        ));
                        if token.terminal == TerminalID::EOF {
                            // Nothing left to resync against. Hand the
                            // partial trees back under an unknown root.
                            let children: Vec<_> =
                                stack.drain(1..).map(|(node, _)| node).collect();
                            let root =
                                ParseNode::interior(SymbolID::T(TerminalID::UNKNOWN), children);
                            return Ok(Parsed { root, errors });
                        }
                        // Skip the token and resume.
                        break;
                    }
                }
            }
        }

        Err(EngineError::UnexpectedEndOfInput)
    }
}
