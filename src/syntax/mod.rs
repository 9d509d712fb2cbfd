//! The reusable parsing machinery: lexer, declarative context-free grammars with
//! per-production semantic actions, and a table-driven SLR(1) parser.
//!
//! A [Grammar] is built by registering production sets (the non-terminals) and
//! rules over [GrammarSymbol]s. Each rule carries a semantic action from the
//! evaluated values of its children to the value of the production, so the same
//! machinery can compute different value types; the expression compiler only
//! instantiates it at `i32` where the value is the downscale nesting depth
//! (see [logic_downscale_grammar]).
//!
//! A [SlrParser] derives FIRST/FOLLOW sets, the LR(0) item collections and the
//! action table from a grammar once, then parses token streams into concrete
//! [SyntaxNode] trees. Table construction fails with a [GrammarError](crate::GrammarError)
//! if the grammar is not SLR(1), so a conflicting grammar is rejected up front
//! rather than misparsed later.

mod grammar;
mod lexer;
mod logic_grammar;
mod parser;
mod token;

#[cfg(test)]
mod __tests__;

pub use logic_grammar::{
    logic_downscale_grammar, RULE_AND, RULE_ASSIGNMENT, RULE_DOWNSCALE, RULE_FACTOR, RULE_LITERAL,
    RULE_OR, RULE_PARENTHESES, RULE_START, RULE_TERM, RULE_VARIABLE,
};

use crate::Token;
use once_cell::unsync::OnceCell;
use std::collections::BTreeSet;
use std::rc::Rc;

/// The lexical analyser of one expression line.
///
/// [Lexer::analyse] recognizes the operators `( ) & | = /`, identifiers
/// (`[A-Za-z][A-Za-z0-9_]*`) and digit runs, attaching byte positions to every
/// token. Blanks are skipped without terminating the token being read.
pub struct Lexer;

/// A symbol of the parsing vocabulary: a terminal token class or a production set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrammarSymbol {
    /// Any identifier token.
    Variable,
    /// Any number literal token.
    Literal,
    /// A specific operator token.
    Operator(char),
    /// A non-terminal, referenced by its production-set index.
    Set(usize),
}

/// One production rule: a body of symbols plus the semantic action evaluating it.
pub struct ProductionRule<V> {
    set: usize,
    body: Vec<GrammarSymbol>,
    action: Box<dyn Fn(&[V]) -> V>,
}

/// A context-free grammar with per-rule semantic actions of value type `V`.
///
/// FIRST/FOLLOW sets and the LR(0) item collections are derived lazily and
/// cached; after that the grammar is immutable and can be shared behind an
/// [Rc] by any number of parsers.
pub struct Grammar<V> {
    symbols: Vec<GrammarSymbol>,
    set_rules: Vec<Vec<usize>>,
    rules: Vec<ProductionRule<V>>,
    first: OnceCell<FirstSets>,
    follow: OnceCell<Vec<BTreeSet<usize>>>,
    collections: OnceCell<Vec<ItemCollection>>,
}

pub(crate) struct FirstSets {
    sets: Vec<BTreeSet<usize>>,
    include_empty: Vec<bool>,
}

/// An LR(0) item: a rule with a dot position inside its body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Item {
    rule: usize,
    dot: usize,
}

/// A closed collection of LR(0) items with its goto edges.
pub(crate) struct ItemCollection {
    items: Vec<Item>,
    gotos: Vec<(usize, usize)>,
}

/// One entry of the SLR action table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Shift(usize),
    Goto(usize),
    Reduce(usize),
    Accept,
    Error,
}

/// The flat `(state, symbol) -> Action` table driving the parser.
pub struct ActionTable {
    table: Vec<Action>,
    symbol_size: usize,
}

/// A table-driven SLR(1) parser over a shared grammar.
pub struct SlrParser<V> {
    grammar: Rc<Grammar<V>>,
    action_table: ActionTable,
}

/// A node of the concrete syntax tree built by the parser.
#[derive(Debug, Clone)]
pub enum SyntaxNode {
    /// A shifted token.
    Terminal(Token),
    /// A reduced production with its rule index and children in body order.
    Production { rule: usize, children: Vec<SyntaxNode> },
}
