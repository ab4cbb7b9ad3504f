//! Grammar types.
//!
//! A grammar is a fixed alphabet of terminal and nonterminal symbols plus a
//! flat, globally indexed list of production rules. All analyses derived from
//! it (FIRST/FOLLOW sets, the LR(0) automaton, the parse tables) are computed
//! lazily on first access and cached for the lifetime of the grammar.

use crate::{
    analysis::Analysis,
    lr0::LR0Automaton,
    parser::{Parsed, Parser, Token},
    table::TableOutput,
    types::Map,
    util::display_fn,
};
use std::{fmt, sync::OnceLock};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID {
    raw: u16,
}

impl TerminalID {
    /// Reserved terminal standing in for an unrecognized token. Also used
    /// internally as the "propagated, not spontaneous" lookahead sentinel
    /// during LALR(1) lookahead computation; it never appears in a finished
    /// lookahead set.
    pub const UNKNOWN: Self = Self::new(0);

    /// Reserved terminal that marks the end of input.
    pub const EOF: Self = Self::new(1);

    pub(crate) const OFFSET: u16 = 2;

    #[inline]
    pub(crate) const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn raw(self) -> u16 {
        self.raw
    }
}

#[derive(Debug)]
pub struct Terminal {
    id: TerminalID,
    name: Option<String>,
}

impl Terminal {
    pub fn id(&self) -> TerminalID {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            TerminalID::UNKNOWN => f.write_str("$unknown"),
            TerminalID::EOF => f.write_str("$eof"),
            _ => f.write_str(self.name().unwrap_or("<unnamed>")),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}

impl NonterminalID {
    /// Reserved synthetic start symbol of the augmented grammar.
    pub const INIT: Self = Self::new(0);

    pub(crate) const OFFSET: u16 = 1;

    #[inline]
    pub(crate) const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn raw(self) -> u16 {
        self.raw
    }
}

#[derive(Debug)]
pub struct Nonterminal {
    id: NonterminalID,
    name: Option<String>,
}

impl Nonterminal {
    pub fn id(&self) -> NonterminalID {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            NonterminalID::INIT => f.write_str("$init"),
            _ => f.write_str(self.name().unwrap_or("<unnamed>")),
        }
    }
}

/// A grammar symbol. Tokens matched at parse time are tree payload, never
/// part of symbol identity, so this stays a cheap structural key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

/// A dense set of terminals, keyed by the terminal's raw index.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TerminalSet {
    inner: bit_set::BitSet,
}

impl TerminalSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.raw().into())
    }

    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.raw().into())
    }

    pub fn remove(&mut self, id: TerminalID) -> bool {
        self.inner.remove(id.raw().into())
    }

    /// Merge `other` into `self`, reporting whether `self` grew.
    pub fn union_with(&mut self, other: &Self) -> bool {
        let before = self.inner.len();
        self.inner.union_with(&other.inner);
        self.inner.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        self.inner
            .iter()
            .map(|raw| TerminalID::new(raw.try_into().expect("terminal id out of range")))
    }
}

impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| usize::from(t.raw())).collect(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RuleID {
    raw: u16,
}

impl RuleID {
    /// The augmented rule `$init := <start>`, always index 0.
    pub const ACCEPT: Self = Self::new(0);

    pub(crate) const OFFSET: u16 = 1;

    #[inline]
    pub(crate) const fn new(raw: u16) -> Self {
        Self { raw }
    }

    /// The stable global rule index, used as the reduce operand in actions
    /// and in the binary table format.
    #[inline]
    pub const fn raw(self) -> u16 {
        self.raw
    }
}

/// One production rule, `left := right[0] right[1] ...`.
///
/// An empty right-hand side is an epsilon rule. Rules are identified by their
/// global index, assigned densely in definition order and never renumbered.
#[derive(Debug)]
pub struct Rule {
    id: RuleID,
    left: NonterminalID,
    right: Vec<SymbolID>,
    accepting: bool,
}

impl Rule {
    pub fn id(&self) -> RuleID {
        self.id
    }

    pub fn left(&self) -> NonterminalID {
        self.left
    }

    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    pub fn len(&self) -> usize {
        self.right.len()
    }

    pub fn is_empty(&self) -> bool {
        self.right.is_empty()
    }

    /// True only for the augmented rule `$init := <start>`, whose completion
    /// is the unique accept condition.
    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    // `"LHS := R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(f, "{} :=", g.nonterminals[&self.left])?;
            for symbol in self.right() {
                match symbol {
                    SymbolID::T(t) => write!(f, " {}", g.terminals[t])?,
                    SymbolID::N(n) => write!(f, " {}", g.nonterminals[n])?,
                }
            }
            Ok(())
        })
    }
}

/// The grammar definition all analyses and tables are derived from.
#[derive(Debug)]
pub struct Grammar {
    pub terminals: Map<TerminalID, Terminal>,
    pub nonterminals: Map<NonterminalID, Nonterminal>,
    pub rules: Map<RuleID, Rule>,
    pub start_symbol: NonterminalID,

    analysis: OnceLock<Analysis>,
    lr0: OnceLock<LR0Automaton>,
    lalr_table: OnceLock<TableOutput>,
    slr_table: OnceLock<TableOutput>,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in self.terminals.values() {
            writeln!(f, "{}", terminal)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in self.nonterminals.values() {
            write!(f, "{}", nonterminal)?;
            if nonterminal.id() == self.start_symbol {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## rules:")?;
        for rule in self.rules.values() {
            writeln!(f, "{}", rule.display(self))?;
        }

        Ok(())
    }
}

impl Grammar {
    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarDefError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarDefError>,
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            rules: Map::default(),
            start: None,
            next_terminal_id: TerminalID::OFFSET,
            next_nonterminal_id: NonterminalID::OFFSET,
            next_rule_id: RuleID::OFFSET,
        };

        for id in [TerminalID::UNKNOWN, TerminalID::EOF] {
            def.terminals.insert(id, Terminal { id, name: None });
        }
        def.nonterminals.insert(
            NonterminalID::INIT,
            Nonterminal {
                id: NonterminalID::INIT,
                name: None,
            },
        );

        f(&mut def)?;

        def.end()
    }

    pub fn rule(&self, id: RuleID) -> &Rule {
        &self.rules[&id]
    }

    /// All alternative rules of one nonterminal, in definition order.
    pub fn rules_of(&self, left: NonterminalID) -> impl Iterator<Item = &Rule> + '_ {
        self.rules.values().filter(move |rule| rule.left() == left)
    }

    /// Every symbol of the grammar's alphabet, terminals first.
    pub fn symbols(&self) -> impl Iterator<Item = SymbolID> + '_ {
        let terminals = self.terminals.keys().copied().map(SymbolID::T);
        let nonterminals = self.nonterminals.keys().copied().map(SymbolID::N);
        terminals.chain(nonterminals)
    }

    /// Lexeme-free display name of a terminal.
    pub fn terminal_name(&self, id: TerminalID) -> String {
        self.terminals[&id].to_string()
    }

    /// Nullable/FIRST/FOLLOW tables, computed once on first access.
    pub fn analysis(&self) -> &Analysis {
        self.analysis.get_or_init(|| Analysis::compute(self))
    }

    /// The kernel-only LR(0) automaton, computed once on first access.
    pub fn lr0(&self) -> &LR0Automaton {
        self.lr0.get_or_init(|| LR0Automaton::compute(self))
    }

    /// The LALR(1) parse table and its conflict report, computed once on
    /// first access.
    pub fn lalr_table(&self) -> &TableOutput {
        self.lalr_table.get_or_init(|| crate::table::lalr(self))
    }

    /// The SLR(1) parse table and its conflict report, computed once on
    /// first access.
    pub fn slr_table(&self) -> &TableOutput {
        self.slr_table.get_or_init(|| crate::slr::slr(self))
    }

    /// Run the LALR(1) parser over a finite, `$eof`-terminated token stream.
    pub fn parse_tokens<I>(&self, tokens: I) -> Result<Parsed, crate::parser::EngineError>
    where
        I: IntoIterator<Item = Token>,
    {
        Parser::new(self, &self.lalr_table().table).parse(tokens)
    }

    /// Tokenize `input` with a caller-supplied lexer and parse the result.
    pub fn parse_with<L, I>(&self, lexer: L, input: &str) -> Result<Parsed, crate::parser::EngineError>
    where
        L: FnOnce(&str) -> I,
        I: IntoIterator<Item = Token>,
    {
        self.parse_tokens(lexer(input))
    }
}

/// The contextual values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    rules: Map<RuleID, Rule>,
    start: Option<NonterminalID>,
    next_terminal_id: u16,
    next_nonterminal_id: u16,
    next_rule_id: u16,
}

impl GrammarDef {
    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, name: &str) -> Result<TerminalID, GrammarDefError> {
        if name.is_empty() {
            return Err(GrammarDefError::EmptyName);
        }
        for terminal in self.terminals.values() {
            if terminal.name() == Some(name) {
                return Err(GrammarDefError::DuplicateName {
                    name: name.to_owned(),
                });
            }
        }

        let id = TerminalID::new(self.next_terminal_id);
        self.next_terminal_id += 1;
        self.terminals.insert(
            id,
            Terminal {
                id,
                name: Some(name.to_owned()),
            },
        );

        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, name: &str) -> Result<NonterminalID, GrammarDefError> {
        if name.is_empty() {
            return Err(GrammarDefError::EmptyName);
        }
        for nonterminal in self.nonterminals.values() {
            if nonterminal.name() == Some(name) {
                return Err(GrammarDefError::DuplicateName {
                    name: name.to_owned(),
                });
            }
        }

        let id = NonterminalID::new(self.next_nonterminal_id);
        self.next_nonterminal_id += 1;
        self.nonterminals.insert(
            id,
            Nonterminal {
                id,
                name: Some(name.to_owned()),
            },
        );

        Ok(id)
    }

    /// Append a production rule for `left`. An empty `right` defines an
    /// epsilon rule. Rules of the same nonterminal may be appended in any
    /// order and interleaving; together they form its production.
    pub fn rule<I>(&mut self, left: NonterminalID, right: I) -> Result<RuleID, GrammarDefError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        let right: Vec<_> = right.into_iter().collect();
        for rule in self.rules.values() {
            if rule.left == left && rule.right == right {
                return Err(GrammarDefError::DuplicateRule);
            }
        }

        let id = RuleID::new(self.next_rule_id);
        self.next_rule_id += 1;
        self.rules.insert(
            id,
            Rule {
                id,
                left,
                right,
                accepting: false,
            },
        );

        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: NonterminalID) -> Result<(), GrammarDefError> {
        self.start.replace(symbol);
        Ok(())
    }

    fn end(mut self) -> Result<Grammar, GrammarDefError> {
        // If no start symbol was specified, use the first declared nonterminal.
        let start = match self.start.take() {
            Some(start) => start,
            None => self
                .nonterminals
                .keys()
                .find(|id| **id != NonterminalID::INIT)
                .copied()
                .ok_or(GrammarDefError::EmptyGrammar)?,
        };

        // The augmented rule `$init := <start>` gets the reserved index and
        // is the only accepting rule.
        let mut rules = Map::default();
        rules.insert(
            RuleID::ACCEPT,
            Rule {
                id: RuleID::ACCEPT,
                left: NonterminalID::INIT,
                right: vec![SymbolID::N(start)],
                accepting: true,
            },
        );
        rules.extend(self.rules);

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            rules,
            start_symbol: start,
            analysis: OnceLock::new(),
            lr0: OnceLock::new(),
            lalr_table: OnceLock::new(),
            slr_table: OnceLock::new(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarDefError {
    #[error("symbol names must not be empty")]
    EmptyName,

    #[error("the name `{}' has already been used", name)]
    DuplicateName { name: String },

    #[error("duplicate production rule detected")]
    DuplicateRule,

    #[error("a grammar requires at least one nonterminal symbol")]
    EmptyGrammar,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_symbols_are_seeded() {
        let grammar = Grammar::define(|g| {
            let a = g.terminal("A")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [SymbolID::T(a)])?;
            g.start_symbol(s)?;
            Ok(())
        })
        .unwrap();

        assert!(grammar.terminals.contains_key(&TerminalID::UNKNOWN));
        assert!(grammar.terminals.contains_key(&TerminalID::EOF));
        assert!(grammar.nonterminals.contains_key(&NonterminalID::INIT));

        let accept = grammar.rule(RuleID::ACCEPT);
        assert!(accept.is_accepting());
        assert_eq!(accept.left(), NonterminalID::INIT);
        assert_eq!(accept.right(), [SymbolID::N(grammar.start_symbol)]);
        assert!(grammar.rules.values().filter(|r| r.is_accepting()).count() == 1);
    }

    #[test]
    fn rule_ids_are_dense_and_stable() {
        let grammar = Grammar::define(|g| {
            let a = g.terminal("A")?;
            let b = g.terminal("B")?;
            let s = g.nonterminal("S")?;
            let t = g.nonterminal("T")?;
            g.rule(s, [SymbolID::N(t), SymbolID::T(a)])?;
            g.rule(t, [SymbolID::T(b)])?;
            g.rule(s, [SymbolID::T(a)])?;
            g.start_symbol(s)?;
            Ok(())
        })
        .unwrap();

        let ids: Vec<u16> = grammar.rules.keys().map(|id| id.raw()).collect();
        assert_eq!(ids, [0, 1, 2, 3]);
        assert_eq!(grammar.rules_of(grammar.start_symbol).count(), 2);
    }

    #[test]
    fn duplicate_rule_is_rejected() {
        let err = Grammar::define(|g| {
            let a = g.terminal("A")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [SymbolID::T(a)])?;
            g.rule(s, [SymbolID::T(a)])?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::DuplicateRule));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let err = Grammar::define(|g| {
            g.terminal("A")?;
            g.terminal("A")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::DuplicateName { .. }));
    }

    #[test]
    fn cached_analyses_are_shared() {
        let grammar = Grammar::define(|g| {
            let a = g.terminal("A")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [SymbolID::T(a)])?;
            g.start_symbol(s)?;
            Ok(())
        })
        .unwrap();

        assert!(std::ptr::eq(grammar.analysis(), grammar.analysis()));
        assert!(std::ptr::eq(grammar.lr0(), grammar.lr0()));
        assert!(std::ptr::eq(grammar.lalr_table(), grammar.lalr_table()));
        assert!(std::ptr::eq(grammar.slr_table(), grammar.slr_table()));
    }
}
