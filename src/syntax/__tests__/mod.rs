use super::{logic_downscale_grammar, Grammar, GrammarSymbol, Lexer, SlrParser, SyntaxNode};
use crate::{Token, TokenKind};
use std::rc::Rc;

//-----------------------------------------------------------------------------
// lexer
//-----------------------------------------------------------------------------

#[test]
fn lexer_token_positions() {
    let line = "A13 = A3 | A7";
    let tokens = Lexer.analyse(line).unwrap();
    let names: Vec<&str> = tokens.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["A13", "=", "A3", "|", "A7"]);

    // every token reads back from its recorded range
    for token in &tokens {
        assert_eq!(
            &line[token.position..token.position + token.length],
            token.name,
            "token range mismatch for {}",
            token.name
        );
    }
    assert_eq!(tokens[0].position, 0);
    assert_eq!(tokens[1].position, 4);
    assert_eq!(tokens[2].position, 6);
    assert_eq!(tokens[3].position, 9);
    assert_eq!(tokens[4].position, 11);
}

#[test]
fn lexer_kinds() {
    let tokens = Lexer.analyse("X = A0 / 10").unwrap();
    assert!(tokens[0].is_variable());
    assert!(tokens[1].is_operator());
    assert_eq!(tokens[1].op(), Some('='));
    assert!(tokens[3].is_operator());
    assert_eq!(tokens[4].kind, TokenKind::Number(10));
    assert_eq!(tokens[4].name, "10");
}

#[test]
fn lexer_blanks_do_not_break_tokens() {
    let tokens = Lexer.analyse("A 13 = A3").unwrap();
    assert_eq!(tokens.len(), 3);
    assert_eq!(tokens[0].name, "A13");
    assert_eq!(tokens[0].position, 0);
    // the range spans the embedded blank
    assert_eq!(tokens[0].length, 4);
}

#[test]
fn lexer_underscore_inside_identifier() {
    let tokens = Lexer.analyse("clock_10MHz").unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].name, "clock_10MHz");
}

#[test]
fn lexer_failure_statuses() {
    let result = Lexer.analyse("0ac").unwrap_err();
    assert_eq!(result.status(), 2);
    assert_eq!(result.position(), 0);
    assert_eq!(result.length(), 1);

    let result = Lexer.analyse("_abc").unwrap_err();
    assert_eq!(result.status(), 3);
    assert_eq!(result.position(), 0);

    let result = Lexer.analyse("A & @d").unwrap_err();
    assert_eq!(result.status(), 1);
    assert_eq!(result.position(), 4);

    let result = Lexer.analyse("A0 = A1 # A2").unwrap_err();
    assert_eq!(result.status(), 1);
    assert_eq!(result.position(), 8);
}

//-----------------------------------------------------------------------------
// grammar tables
//-----------------------------------------------------------------------------

#[test]
fn downscale_grammar_is_conflict_free() {
    let grammar = Rc::new(logic_downscale_grammar());
    assert!(grammar.is_complete());
    // table construction reports any shift/reduce or reduce/reduce conflict
    SlrParser::new(grammar).expect("the downscale grammar is SLR(1)");
}

#[test]
fn downscale_grammar_first_sets() {
    let grammar = logic_downscale_grammar();
    let variable = grammar.symbol_index(&GrammarSymbol::Variable).unwrap();
    let literal = grammar.symbol_index(&GrammarSymbol::Literal).unwrap();
    let open = grammar.symbol_index(&GrammarSymbol::Operator('(')).unwrap();

    // FIRST(E) = { Variable, Literal, '(' }, no set derives empty
    let first_e = grammar.first(2);
    assert_eq!(
        first_e.iter().copied().collect::<Vec<_>>(),
        {
            let mut expected = vec![variable, literal, open];
            expected.sort();
            expected
        }
    );
    for set in 0..grammar.set_count() {
        assert!(!grammar.first_include_empty(set));
    }
}

#[test]
fn downscale_grammar_follow_sets() {
    let grammar = logic_downscale_grammar();
    let or = grammar.symbol_index(&GrammarSymbol::Operator('|')).unwrap();
    let and = grammar.symbol_index(&GrammarSymbol::Operator('&')).unwrap();
    let close = grammar.symbol_index(&GrammarSymbol::Operator(')')).unwrap();
    let end = grammar.end_symbol();

    // FOLLOW(E) = { '|', '&', ')', $ }
    let follow_e = grammar.follow(2);
    let mut expected = vec![or, and, close, end];
    expected.sort();
    assert_eq!(follow_e.iter().copied().collect::<Vec<_>>(), expected);

    // FOLLOW(T) additionally holds '/'
    let div = grammar.symbol_index(&GrammarSymbol::Operator('/')).unwrap();
    assert!(grammar.follow(3).contains(&div));
}

#[test]
fn incomplete_grammar_is_rejected() {
    let mut grammar: Grammar<i32> = Grammar::new();
    let start = grammar.add_set();
    let other = grammar.add_set();
    grammar.add_rule(start, vec![GrammarSymbol::Set(other)], |v| v[0]);
    // `other` has no rules
    assert!(!grammar.is_complete());
    assert!(SlrParser::new(Rc::new(grammar)).is_err());
}

//-----------------------------------------------------------------------------
// parsing
//-----------------------------------------------------------------------------

fn parse(line: &str) -> Result<(SyntaxNode, i32), crate::ParseResult> {
    let grammar = Rc::new(logic_downscale_grammar());
    let parser = SlrParser::new(grammar.clone()).unwrap();
    let tokens = Lexer.analyse(line)?;
    let root = parser.parse(&tokens)?;
    let depth = grammar.eval(&root);
    Ok((root, depth))
}

#[test]
fn parse_builds_concrete_tree() {
    let (root, _) = parse("X = A0 | A1 & A2").unwrap();

    // leaves of the tree read back in token order
    let leaves: Vec<&str> = root
        .leaf_tokens()
        .iter()
        .filter(|t| !t.is_operator())
        .map(|t| t.name.as_str())
        .collect();
    assert_eq!(leaves, vec!["X", "A0", "A1", "A2"]);

    // the accepted node is the assignment `L -> Variable '=' E`
    assert_eq!(root.rule(), Some(super::RULE_ASSIGNMENT));
    assert_eq!(root.child(0).unwrap().token().unwrap().name, "X");
    assert!(root.child(2).unwrap().rule().is_some());
}

#[test]
fn parse_tree_keeps_token_order() {
    let line = "Y = (A0 & A1) | A2 / 4";
    let tokens = Lexer.analyse(line).unwrap();
    let (root, _) = parse(line).unwrap();
    let tree_tokens: Vec<String> = root
        .leaf_tokens()
        .iter()
        .map(|t| t.name.clone())
        .collect();
    let stream_tokens: Vec<String> = tokens.iter().map(|t| t.name.clone()).collect();
    assert_eq!(tree_tokens, stream_tokens);
}

#[test]
fn eval_counts_downscale_depth() {
    assert_eq!(parse("X = A0").unwrap().1, 0);
    assert_eq!(parse("X = A0 | A1 & A2").unwrap().1, 0);
    assert_eq!(parse("X = A0 / 10").unwrap().1, 1);
    assert_eq!(parse("X = (A0 | A1) / 10 & A2").unwrap().1, 1);
    assert_eq!(parse("X = A0 / 5 / 3").unwrap().1, 2);
    assert_eq!(parse("X = (A0 / 5) / 3").unwrap().1, 2);
    assert_eq!(parse("X = (A0 / 5 | A1) / 3").unwrap().1, 2);
}

#[test]
fn parse_error_statuses() {
    // '|' with no left operand
    let result = parse("X = | A0").unwrap_err();
    assert_eq!(result.status(), 101);
    assert_eq!(result.position(), 4);

    // missing right operand, reported at end of input
    let result = parse("X = A0 |").unwrap_err();
    assert_eq!(result.status(), 101);
    assert_eq!(result.position(), 8);

    // unbalanced bracket
    let result = parse("X = (A0 | A1").unwrap_err();
    assert_eq!(result.status(), 101);

    // a second assignment operator
    let result = parse("X = A0 = A1").unwrap_err();
    assert_eq!(result.status(), 101);
}

#[test]
fn unknown_token_kind_is_rejected() {
    // a grammar without '/' can not classify a division token
    let mut grammar: Grammar<i32> = Grammar::new();
    let start = grammar.add_set();
    let expr = grammar.add_set();
    grammar.add_rule(start, vec![GrammarSymbol::Set(expr)], |v| v[0]);
    grammar.add_rule(expr, vec![GrammarSymbol::Variable], |_| 0);
    let parser = SlrParser::new(Rc::new(grammar)).unwrap();

    let tokens = vec![Token::variable("A0", 0, 2), Token::operator('/', 3)];
    let result = parser.parse(&tokens).unwrap_err();
    assert_eq!(result.status(), 103);
    assert_eq!(result.position(), 3);
}

#[test]
fn minimal_grammar_accepts_its_language() {
    // S -> E; E -> E '+' F | F; F -> Variable
    let mut grammar: Grammar<i32> = Grammar::new();
    let set_s = grammar.add_set();
    let set_e = grammar.add_set();
    let set_f = grammar.add_set();
    grammar.add_rule(set_s, vec![GrammarSymbol::Set(set_e)], |v: &[i32]| v[0]);
    grammar.add_rule(
        set_e,
        vec![
            GrammarSymbol::Set(set_e),
            GrammarSymbol::Operator('+'),
            GrammarSymbol::Set(set_f),
        ],
        |v| v[0] + v[2],
    );
    grammar.add_rule(set_e, vec![GrammarSymbol::Set(set_f)], |v| v[0]);
    grammar.add_rule(set_f, vec![GrammarSymbol::Variable], |_| 1);

    let grammar = Rc::new(grammar);
    let parser = SlrParser::new(grammar.clone()).unwrap();
    let tokens = vec![
        Token::variable("a", 0, 1),
        Token::operator('+', 1),
        Token::variable("b", 2, 1),
        Token::operator('+', 3),
        Token::variable("c", 4, 1),
    ];
    let root = parser.parse(&tokens).unwrap();
    // the action sums one per variable
    assert_eq!(grammar.eval(&root), 3);
}
