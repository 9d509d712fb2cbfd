use super::{bits, OperatorType, StandardLogicNode, StandardLogicTree};
use crate::syntax::{
    logic_downscale_grammar, Lexer, SlrParser, SyntaxNode, RULE_AND, RULE_DOWNSCALE, RULE_FACTOR,
    RULE_LITERAL, RULE_OR, RULE_PARENTHESES, RULE_TERM, RULE_VARIABLE,
};
use std::rc::Rc;

/// Parse a full assignment line and return its right-hand `E` production.
fn expression_node(line: &str) -> SyntaxNode {
    let grammar = Rc::new(logic_downscale_grammar());
    let parser = SlrParser::new(grammar).unwrap();
    let tokens = Lexer.analyse(line).unwrap();
    // the accepted node is the assignment, its third child the expression
    let root = parser.parse(&tokens).unwrap();
    root.child(2).unwrap().clone()
}

fn build(line: &str) -> StandardLogicTree {
    StandardLogicTree::new(&expression_node(line)).unwrap()
}

fn leaf_index(tree: &StandardLogicTree, name: &str) -> usize {
    tree.var_table()
        .iter()
        .position(|v| v == name)
        .unwrap_or_else(|| panic!("variable {} not in table", name))
}

fn mask(tree: &StandardLogicTree, names: &[&str]) -> u64 {
    names
        .iter()
        .map(|name| 1u64 << leaf_index(tree, name))
        .fold(0, |acc, bit| acc | bit)
}

/// Reference evaluation of the concrete syntax tree; `expr / n` evaluates as
/// its operand.
fn eval_syntax(node: &SyntaxNode, values: &dyn Fn(&str) -> bool) -> bool {
    match node.rule() {
        Some(RULE_OR) => {
            eval_syntax(node.child(0).unwrap(), values)
                || eval_syntax(node.child(2).unwrap(), values)
        }
        Some(RULE_AND) => {
            eval_syntax(node.child(0).unwrap(), values)
                && eval_syntax(node.child(2).unwrap(), values)
        }
        Some(RULE_TERM) | Some(RULE_FACTOR) | Some(RULE_DOWNSCALE) => {
            eval_syntax(node.child(0).unwrap(), values)
        }
        Some(RULE_PARENTHESES) => eval_syntax(node.child(1).unwrap(), values),
        Some(RULE_VARIABLE) | Some(RULE_LITERAL) => {
            let token = node.child(0).unwrap().token().unwrap();
            match token.name.as_str() {
                "0" => false,
                "1" => true,
                name => values(name),
            }
        }
        _ => panic!("unexpected rule in concrete tree"),
    }
}

/// Evaluate a normalized node, resolving downscale placeholders through the
/// forest.
fn eval_node(
    node: &StandardLogicNode,
    tree: &StandardLogicTree,
    values: &dyn Fn(&str) -> bool,
) -> bool {
    let mut terms: Vec<bool> = node
        .branches()
        .iter()
        .map(|branch| eval_node(branch, tree, values))
        .collect();
    for index in bits(node.leaves()) {
        let name = &tree.var_table()[index];
        let value = match name.as_str() {
            "0" => false,
            "1" => true,
            name => match name.strip_prefix("_D").and_then(|k| k.parse::<usize>().ok()) {
                Some(k) => eval_node(&tree.forest()[k].root, tree, values),
                None => values(name),
            },
        };
        terms.push(value);
    }
    match node.op_type() {
        OperatorType::Null => terms.first().copied().unwrap_or(false),
        OperatorType::Or => terms.iter().any(|t| *t),
        OperatorType::And => terms.iter().all(|t| *t),
    }
}

/// The variables of a tree, reserved names excluded.
fn plain_variables(tree: &StandardLogicTree) -> Vec<String> {
    tree.var_table()
        .iter()
        .filter(|name| *name != "0" && *name != "1" && !name.starts_with("_D"))
        .cloned()
        .collect()
}

/// Assert the canonical-form laws and semantic equivalence for one line.
fn assert_standardized(line: &str) {
    let expression = expression_node(line);
    let tree = StandardLogicTree::new(&expression).unwrap();
    let root = tree.root();

    assert!(root.depth() <= 2, "{}: depth {} > 2", line, root.depth());
    if root.depth() == 2 {
        assert_eq!(
            root.op_type(),
            OperatorType::And,
            "{}: depth-2 root must be AND",
            line
        );
    }
    for branch in root.branches() {
        assert_eq!(
            branch.leaves() & root.leaves(),
            0,
            "{}: branch shares a leaf with the root",
            line
        );
        assert!(branch.depth() == 1, "{}: branch deeper than one", line);
        assert!(branch.leaf_size() > 1, "{}: single-leaf branch not folded", line);
    }
    for (i, left) in root.branches().iter().enumerate() {
        for right in &root.branches()[i + 1..] {
            assert_ne!(left, right, "{}: duplicate branches", line);
        }
    }
    for entry in tree.forest() {
        assert!(entry.root.depth() <= 2, "{}: forest depth > 2", line);
    }

    // truth-table equivalence against the concrete tree
    let variables = plain_variables(&tree);
    assert!(variables.len() <= 16, "test expression too wide");
    for assignment in 0u32..(1 << variables.len()) {
        let values = |name: &str| -> bool {
            variables
                .iter()
                .position(|v| v == name)
                .map_or(false, |index| assignment & (1 << index) != 0)
        };
        assert_eq!(
            eval_node(root, &tree, &values),
            eval_syntax(&expression, &values),
            "{}: differs under assignment {:b}",
            line,
            assignment
        );
    }
}

#[test]
fn standardize_laws_hold() {
    let lines = [
        "X = A0",
        "X = 1",
        "X = 0",
        "X = A0 | A1",
        "X = A0 & A1",
        "X = A0 & A1 & A2",
        "X = A0 | A1 | A2",
        "X = A0 & A1 | A2",
        "X = A0 | A1 & A2",
        "X = (A0 & A1) | (A2 & A3)",
        "X = (A0 | A1) & (A2 | A3)",
        "X = (A0 & A1) | (A0 & A2)",
        "X = A0 | (A0 & A1)",
        "X = (A0 | A1) & A0",
        "X = ((A0 & A1) | (A2 & A3)) & (A4 | A5)",
        "X = (A0 & (A1 | (A2 & A3))) | A4",
        "X = (A0 | A1) & (A1 | A2) & (A2 | A0)",
        "X = A0 & 1",
        "X = A0 | 0",
        "X = (A0 & A1 & A2) | (A3 & A4)",
    ];
    for line in lines {
        assert_standardized(line);
    }
}

#[test]
fn exchange_produces_product_of_sums() {
    let tree = build("X = (A0 & A1) | (A2 & A3)");
    let root = tree.root();
    assert_eq!(root.op_type(), OperatorType::And);
    assert_eq!(root.leaves(), 0);
    assert_eq!(root.branch_size(), 4);

    let mut branch_masks: Vec<u64> = root.branches().iter().map(|b| b.leaves()).collect();
    branch_masks.sort();
    let mut expected = vec![
        mask(&tree, &["A0", "A2"]),
        mask(&tree, &["A1", "A2"]),
        mask(&tree, &["A0", "A3"]),
        mask(&tree, &["A1", "A3"]),
    ];
    expected.sort();
    assert_eq!(branch_masks, expected);
    for branch in root.branches() {
        assert_eq!(branch.op_type(), OperatorType::Or);
    }
}

#[test]
fn common_factor_stays_a_leaf() {
    // (A0 & A1) | (A0 & A2) = A0 & (A1 | A2)
    let tree = build("X = (A0 & A1) | (A0 & A2)");
    let root = tree.root();
    assert_eq!(root.op_type(), OperatorType::And);
    assert_eq!(root.leaves(), mask(&tree, &["A0"]));
    assert_eq!(root.branch_size(), 1);
    assert_eq!(root.branches()[0].leaves(), mask(&tree, &["A1", "A2"]));
}

#[test]
fn absorption_drops_redundant_branch() {
    // A0 | (A0 & A1) = A0
    let tree = build("X = A0 | (A0 & A1)");
    let root = tree.root();
    assert_eq!(root.branch_size(), 0);
    assert_eq!(root.leaves(), mask(&tree, &["A0"]));
}

#[test]
fn single_wire_stays_null() {
    let tree = build("X = A0");
    assert_eq!(tree.root().op_type(), OperatorType::Null);
    assert_eq!(tree.root().leaf_size(), 1);
    assert!(tree.root().leaf(leaf_index(&tree, "A0")));

    // brackets do not change the shape
    let tree = build("X = ((A0))");
    assert_eq!(tree.root().op_type(), OperatorType::Null);
    assert!(tree.root().leaf(leaf_index(&tree, "A0")));
}

#[test]
fn reserved_literal_slots() {
    let tree = build("X = 1");
    assert_eq!(tree.var_table()[0], "0");
    assert_eq!(tree.var_table()[1], "1");
    assert!(tree.root().leaf(1));

    let tree = build("X = 0");
    assert!(tree.root().leaf(0));
}

#[test]
fn downscale_builds_forest() {
    let tree = build("X = A0 / 10");
    assert_eq!(tree.root().op_type(), OperatorType::Null);
    assert!(tree.root().leaf(leaf_index(&tree, "_D0")));
    assert_eq!(tree.forest().len(), 1);
    assert_eq!(tree.forest()[0].divisor, 10);
    assert!(tree.forest()[0].root.leaf(leaf_index(&tree, "A0")));
}

#[test]
fn downscale_forest_subtrees_standardize() {
    let tree = build("X = ((A0 & A1) | (A0 & A2)) / 100 | A3");
    assert_eq!(tree.root().op_type(), OperatorType::Or);
    assert_eq!(tree.forest().len(), 1);
    assert_eq!(tree.forest()[0].divisor, 100);

    // the forest root was normalized to A0 & (A1 | A2)
    let sub = &tree.forest()[0].root;
    assert_eq!(sub.op_type(), OperatorType::And);
    assert_eq!(sub.leaves(), mask(&tree, &["A0"]));
    assert_eq!(sub.branch_size(), 1);
}

#[test]
fn two_downscales_two_entries() {
    let tree = build("X = (A0 / 10) | (C0 / 100)");
    assert_eq!(tree.forest().len(), 2);
    assert_eq!(tree.forest()[0].divisor, 10);
    assert_eq!(tree.forest()[1].divisor, 100);
    assert_eq!(
        tree.root().leaves(),
        mask(&tree, &["_D0", "_D1"]),
    );
}

#[test]
fn display_renders_expression_form() {
    let tree = build("X = A0 / 10");
    assert_eq!(format!("{}", tree), "A0 / 10");

    let tree = build("X = A0 & A1");
    assert_eq!(format!("{}", tree), "A0 & A1");

    let tree = build("X = (A0 & A1) | (A0 & A2)");
    assert_eq!(format!("{}", tree), "(A1 | A2) & A0");
}

#[test]
fn deep_expression_reduces() {
    // depth four before normalization
    let tree = build("X = ((A0 & (A1 | (A2 & A3))) | A4) & A5");
    assert!(tree.root().depth() <= 2);
    assert_eq!(tree.root().op_type(), OperatorType::And);
}
