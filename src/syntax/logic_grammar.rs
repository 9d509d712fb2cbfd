use super::{Grammar, GrammarSymbol};

// Rule indices of the downscale grammar, in registration order. The
// standardizer walks the concrete tree by matching on these.
pub const RULE_START: usize = 0; //       S -> L
pub const RULE_ASSIGNMENT: usize = 1; //  L -> Variable '=' E
pub const RULE_OR: usize = 2; //          E -> E '|' T
pub const RULE_AND: usize = 3; //         E -> E '&' T
pub const RULE_TERM: usize = 4; //        E -> T
pub const RULE_DOWNSCALE: usize = 5; //   T -> T '/' Digits
pub const RULE_FACTOR: usize = 6; //      T -> F
pub const RULE_VARIABLE: usize = 7; //    F -> Variable
pub const RULE_LITERAL: usize = 8; //     F -> Digits
pub const RULE_PARENTHESES: usize = 9; // F -> '(' E ')'

/// The grammar of logic-routing assignment lines with downscale support.
///
/// The semantic value of a production is the nesting depth of downscale
/// operators below it: every `T -> T / digits` adds one, every other rule
/// passes the maximum of its children through. An accepted line whose value
/// is 2 or more uses a downscale inside a downscale operand, which the
/// hardware can not express.
pub fn logic_downscale_grammar() -> Grammar<i32> {
    let mut grammar = Grammar::new();

    let set_s = grammar.add_set();
    let set_l = grammar.add_set();
    let set_e = grammar.add_set();
    let set_t = grammar.add_set();
    let set_f = grammar.add_set();

    // 0. S -> L
    grammar.add_rule(set_s, vec![GrammarSymbol::Set(set_l)], |v: &[i32]| v[0]);

    // 1. L -> Variable '=' E
    grammar.add_rule(
        set_l,
        vec![
            GrammarSymbol::Variable,
            GrammarSymbol::Operator('='),
            GrammarSymbol::Set(set_e),
        ],
        |v| v[2],
    );

    // 2. E -> E '|' T
    grammar.add_rule(
        set_e,
        vec![
            GrammarSymbol::Set(set_e),
            GrammarSymbol::Operator('|'),
            GrammarSymbol::Set(set_t),
        ],
        |v| v[0].max(v[2]),
    );

    // 3. E -> E '&' T
    grammar.add_rule(
        set_e,
        vec![
            GrammarSymbol::Set(set_e),
            GrammarSymbol::Operator('&'),
            GrammarSymbol::Set(set_t),
        ],
        |v| v[0].max(v[2]),
    );

    // 4. E -> T
    grammar.add_rule(set_e, vec![GrammarSymbol::Set(set_t)], |v| v[0]);

    // 5. T -> T '/' Digits, one more downscale layer. Left recursion lets a
    // chain like `A / 5 / 3` parse, so the depth check can reject it rather
    // than a bare syntax error.
    grammar.add_rule(
        set_t,
        vec![
            GrammarSymbol::Set(set_t),
            GrammarSymbol::Operator('/'),
            GrammarSymbol::Literal,
        ],
        |v| v[0] + 1,
    );

    // 6. T -> F
    grammar.add_rule(set_t, vec![GrammarSymbol::Set(set_f)], |v| v[0]);

    // 7. F -> Variable
    grammar.add_rule(set_f, vec![GrammarSymbol::Variable], |_| 0);

    // 8. F -> Digits
    grammar.add_rule(set_f, vec![GrammarSymbol::Literal], |_| 0);

    // 9. F -> '(' E ')'
    grammar.add_rule(
        set_f,
        vec![
            GrammarSymbol::Operator('('),
            GrammarSymbol::Set(set_e),
            GrammarSymbol::Operator(')'),
        ],
        |v| v[1],
    );

    grammar
}
