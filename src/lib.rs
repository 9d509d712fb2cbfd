//! config_logic compiles a small domain-specific language of logic-routing expressions
//! into a hardware resource plan for a programmable logic device.
//!
//! # Overview
//!
//! A configuration is a sequence of assignment lines such as `A13 = A3 | A7` or
//! `C5 = (A0 / 10) | (C0 / 100)`. Each line routes a boolean combination of front-panel
//! signals, frequency-divided (downscaled) sub-expressions, clocks and constants to an
//! output: a front-panel port, the back-plane, the external clock output, a scaler
//! (hardware counter) input, or a named macro for later reuse.
//!
//! Compiling a line runs a fixed pipeline: a [Lexer](syntax::Lexer) splits the line into
//! [tokens](Token) with byte positions, an SLR(1) [parser](syntax::SlrParser) driven by a
//! declarative [grammar](syntax::Grammar) builds a concrete syntax tree, the tree is
//! normalized into a two-layer [standard logic tree](standardize::StandardLogicTree)
//! (product-of-sums with isolated downscale subtrees), and a resource
//! [allocator](config::ConfigParser) maps the normalized tree onto finite pools of OR/AND
//! gates, frequency dividers and clocks, recording everything a downstream register
//! emitter needs.
//!
//! Every fallible step reports a [ParseResult] carrying a numeric status plus the byte
//! range of the offending input, so a caller can render a caret-style diagnostic with
//! [ParseResult::message].
//!
//! # Example
//!
//! ```
//! use config_logic::ConfigParser;
//!
//! let mut compiler = ConfigParser::new().unwrap();
//!
//! assert!(compiler.parse("A13 = A3 | A7").ok());
//! assert!(compiler.parse("B13 = A3 & A7").ok());
//!
//! // The OR gate over ports 3 and 7 was allocated at global source index 48,
//! // the AND gate at 64; both front outputs reference them.
//! assert_eq!(compiler.front_outputs()[0].port, 13);
//! assert_eq!(compiler.front_outputs()[0].source, 48);
//! assert_eq!(compiler.front_outputs()[1].port, 29);
//! assert_eq!(compiler.front_outputs()[1].source, 64);
//!
//! // A failing line leaves the plan untouched.
//! let result = compiler.parse("A13 = A5");
//! assert_eq!(result.status(), 203);
//! assert_eq!(compiler.front_outputs().len(), 2);
//! ```

mod error;
mod logger;
mod parse_result;

pub mod config;
pub mod standardize;
pub mod syntax;

pub use config::ConfigParser;

/// Kind of a lexical token together with its attached value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// An identifier: port name, clock name, scaler, `Back`, `Extern` or macro name.
    Variable,
    /// One of the operators `( ) & | = /`.
    Operator,
    /// A run of digits with its parsed value.
    Number(u64),
}

/// A lexical token of one expression line.
///
/// `position` and `length` index bytes of the original line, so that
/// `line[position..position + length]` is the text the token was read from
/// (for tokens not interrupted by blanks).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub name: String,
    pub position: usize,
    pub length: usize,
}

/// Status of compiling one expression line.
///
/// A status of `0` is success. Non-zero statuses are grouped by pipeline stage:
///
/// | status | meaning |
/// |--------|---------|
/// |   1    | invalid character |
/// |   2    | identifier starts with a digit |
/// |   3    | identifier starts with an underscore |
/// |  101   | no parser action for the current token |
/// |  102   | token can not be shifted in this state |
/// |  103   | unexpected token kind |
/// |  104   | invalid parser action (table corruption) |
/// |  201   | fewer than 3 tokens |
/// |  202   | token form not acceptable in context |
/// |  203   | output already has a source |
/// |  204   | input and output on the same port |
/// |  205   | scaler input is not a single identifier |
/// |  206   | port used as both LEMO and LVDS |
/// |  207   | undefined macro variable |
/// |  208   | nested downscale expression |
/// |  209   | external clock source is not a clock |
/// |  300   | a finite resource pool is exhausted |
///
/// `position` and `length` index bytes of the offending range in the source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseResult {
    status: i32,
    position: usize,
    length: usize,
}

/// An error returned when a grammar fails validation or its SLR table has conflicts.
#[derive(Debug)]
pub struct GrammarError {
    what: String,
    message: String,
}

/// An error returned by [ConfigParser::read] when a configuration file can not be
/// compiled.
#[derive(Debug)]
pub enum ReadError {
    Io(std::io::Error),
    Parse {
        line_number: usize,
        line: String,
        result: ParseResult,
    },
}

/// An enum to assign leveled debug labels to the compiler.
///
/// Larger levels print more: `Default` reports failures, `Success` adds accepted
/// lines, `Result` adds per-line outcomes, `Verbose` everything. Logging is only
/// compiled in debug builds.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Log<T> {
    None,
    Default(T),
    Success(T),
    Result(T),
    Verbose(T),
}
