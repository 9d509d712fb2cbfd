use super::node::LogicTreeItem;
use super::{bits, DownscaleEntry, OperatorType, StandardLogicNode, StandardLogicTree,
    MAX_IDENTIFIERS};
use crate::syntax::{
    SyntaxNode, RULE_AND, RULE_DOWNSCALE, RULE_FACTOR, RULE_LITERAL, RULE_OR, RULE_PARENTHESES,
    RULE_TERM, RULE_VARIABLE,
};
use crate::{ParseResult, TokenKind};
use std::fmt::{Display, Formatter};

struct TreeBuilder {
    var_table: Vec<String>,
    forest: Vec<DownscaleEntry>,
}

impl TreeBuilder {
    /// Index of a variable name, interning it on first sight.
    ///
    /// Returns None when the table is full; a tree holds at most
    /// [MAX_IDENTIFIERS] distinct names including the two reserved literals.
    fn intern(&mut self, name: &str) -> Option<usize> {
        if let Some(index) = self.var_table.iter().position(|v| v == name) {
            return Some(index);
        }
        if self.var_table.len() >= MAX_IDENTIFIERS {
            return None;
        }
        self.var_table.push(name.to_string());
        Some(self.var_table.len() - 1)
    }

    fn full() -> ParseResult {
        ParseResult::new(300, 0, 1)
    }

    fn malformed() -> ParseResult {
        ParseResult::new(104, 0, 1)
    }

    /// Walk an `E` production. A same-operator chain stays on the current
    /// node; an operator change opens a branch with the dual nesting.
    fn parse_e(
        &mut self,
        node: &mut StandardLogicNode,
        production: &SyntaxNode,
    ) -> Result<(), ParseResult> {
        match production.rule() {
            Some(RULE_OR) | Some(RULE_AND) => {
                let op = if production.rule() == Some(RULE_OR) {
                    OperatorType::Or
                } else {
                    OperatorType::And
                };
                let children = production.children();
                if node.op_type() == OperatorType::Null {
                    node.set_op_type(op);
                    self.parse_e(node, &children[0])?;
                    self.parse_t(node, &children[2])
                } else if node.op_type() == op {
                    self.parse_e(node, &children[0])?;
                    self.parse_t(node, &children[2])
                } else {
                    let mut branch = StandardLogicNode::new(op);
                    self.parse_e(&mut branch, &children[0])?;
                    self.parse_t(&mut branch, &children[2])?;
                    node.add_branch(branch);
                    Ok(())
                }
            }
            Some(RULE_TERM) => self.parse_t(node, &production.children()[0]),
            _ => Err(Self::malformed()),
        }
    }

    /// Walk a `T` production. A downscale factor becomes a `_D<k>` placeholder
    /// leaf whose operand is built as the k-th forest root.
    fn parse_t(
        &mut self,
        node: &mut StandardLogicNode,
        production: &SyntaxNode,
    ) -> Result<(), ParseResult> {
        match production.rule() {
            Some(RULE_FACTOR) => self.parse_f(node, &production.children()[0]),
            Some(RULE_DOWNSCALE) => {
                let children = production.children();
                let divisor = match children[2].token().map(|t| &t.kind) {
                    Some(TokenKind::Number(value)) => *value,
                    _ => return Err(Self::malformed()),
                };
                let index = self.forest.len();
                let name = format!("_D{}", index);
                let leaf = self.intern(&name).ok_or_else(Self::full)?;
                node.add_leaf(leaf);

                self.forest.push(DownscaleEntry {
                    divisor,
                    root: StandardLogicNode::new(OperatorType::Null),
                });
                // the operand is itself a T; nesting depth was already checked
                let mut subtree = StandardLogicNode::new(OperatorType::Null);
                self.parse_t(&mut subtree, &children[0])?;
                self.forest[index].root = subtree;
                Ok(())
            }
            _ => Err(Self::malformed()),
        }
    }

    fn parse_f(
        &mut self,
        node: &mut StandardLogicNode,
        production: &SyntaxNode,
    ) -> Result<(), ParseResult> {
        match production.rule() {
            Some(RULE_VARIABLE) => {
                let token = production.children()[0]
                    .token()
                    .ok_or_else(Self::malformed)?;
                let leaf = self.intern(&token.name).ok_or_else(Self::full)?;
                node.add_leaf(leaf);
                Ok(())
            }
            Some(RULE_LITERAL) => {
                let token = production.children()[0]
                    .token()
                    .ok_or_else(Self::malformed)?;
                // the reserved slots; other literal values only appear as divisors
                let leaf = match token.name.as_str() {
                    "0" => 0,
                    "1" => 1,
                    _ => self.intern(&token.name).ok_or_else(Self::full)?,
                };
                node.add_leaf(leaf);
                Ok(())
            }
            Some(RULE_PARENTHESES) => self.parse_e(node, &production.children()[1]),
            _ => Err(Self::malformed()),
        }
    }
}

impl StandardLogicTree {
    /// Build and normalize the tree of an `E` production of the downscale
    /// grammar: the master tree and every downscale root are standardized
    /// independently.
    pub fn new(expression: &SyntaxNode) -> Result<Self, ParseResult> {
        let mut builder = TreeBuilder {
            var_table: vec!["0".to_string(), "1".to_string()],
            forest: Vec::new(),
        };
        let mut root = StandardLogicNode::new(OperatorType::Null);
        builder.parse_e(&mut root, expression)?;

        root.standardize();
        let mut forest = builder.forest;
        for entry in &mut forest {
            entry.root.standardize();
        }

        Ok(Self {
            root,
            forest,
            var_table: builder.var_table,
        })
    }

    pub fn root(&self) -> &StandardLogicNode {
        &self.root
    }

    pub fn forest(&self) -> &[DownscaleEntry] {
        &self.forest
    }

    pub fn var_table(&self) -> &[String] {
        &self.var_table
    }

    /// Print the master tree in tree structure; downscale placeholders show as
    /// their `_D<k>` leaves.
    pub fn print(&self) -> std::io::Result<()> {
        ptree::print_tree(&LogicTreeItem::Node {
            node: &self.root,
            vars: self.var_table.as_slice(),
        })
    }

    fn write_node(&self, f: &mut Formatter<'_>, node: &StandardLogicNode) -> std::fmt::Result {
        let only_leaf = node.branch_size() == 0 && node.leaf_size() == 1;
        let op = if node.op_type() == OperatorType::Or {
            "|"
        } else {
            "&"
        };

        if let Some((head, tail)) = node.branches().split_first() {
            write!(f, "(")?;
            self.write_node(f, head)?;
            write!(f, ")")?;
            for branch in tail {
                write!(f, " {} (", op)?;
                self.write_node(f, branch)?;
                write!(f, ")")?;
            }
        }

        let mut first = node.branch_size() == 0;
        for index in bits(node.leaves()) {
            if !first {
                write!(f, " {} ", op)?;
            }
            let name = &self.var_table[index];
            match name.strip_prefix("_D").and_then(|k| k.parse::<usize>().ok()) {
                Some(k) if k < self.forest.len() => {
                    let entry = &self.forest[k];
                    let compound = entry.root.branch_size() > 0 || entry.root.leaf_size() > 1;
                    if !only_leaf {
                        write!(f, "(")?;
                    }
                    if compound {
                        write!(f, "(")?;
                    }
                    self.write_node(f, &entry.root)?;
                    if compound {
                        write!(f, ")")?;
                    }
                    write!(f, " / {}", entry.divisor)?;
                    if !only_leaf {
                        write!(f, ")")?;
                    }
                }
                _ => write!(f, "{}", name)?,
            }
            first = false;
        }
        Ok(())
    }
}

impl Display for StandardLogicTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.write_node(f, &self.root)
    }
}
