use super::{Action, ActionTable, Grammar, GrammarSymbol, SlrParser, SyntaxNode};
use crate::{GrammarError, ParseResult, Token};
use std::rc::Rc;

impl ActionTable {
    fn new(collection_size: usize, symbol_size: usize) -> Self {
        Self {
            table: vec![Action::Error; collection_size * symbol_size],
            symbol_size,
        }
    }

    pub fn get(&self, collection: usize, symbol: usize) -> Action {
        self.table[collection * self.symbol_size + symbol]
    }

    fn set(&mut self, collection: usize, symbol: usize, action: Action) -> Result<(), GrammarError> {
        let slot = &mut self.table[collection * self.symbol_size + symbol];
        if *slot != Action::Error && *slot != action {
            return Err(GrammarError::new(
                "action table",
                format!(
                    "conflicting actions {:?} and {:?} in state {} on symbol {}",
                    slot, action, collection, symbol
                ),
            ));
        }
        *slot = action;
        Ok(())
    }
}

impl<V> SlrParser<V> {
    /// Build the SLR action table for a grammar.
    ///
    /// Fails if the grammar is incomplete or the table has a shift/reduce or
    /// reduce/reduce conflict, i.e. the grammar is not SLR(1).
    pub fn new(grammar: Rc<Grammar<V>>) -> Result<Self, GrammarError> {
        if !grammar.is_complete() {
            return Err(GrammarError::new("grammar", "grammar is not complete"));
        }
        let mut action_table;
        {
            let collections = grammar.collections();
            let symbol_count = grammar.symbol_count();
            action_table = ActionTable::new(collections.len(), symbol_count + 1);

            for (state, collection) in collections.iter().enumerate() {
                // shift and goto edges
                for &(symbol, target) in collection.gotos() {
                    let action = match grammar.symbol(symbol) {
                        GrammarSymbol::Set(_) => Action::Goto(target),
                        _ => Action::Shift(target),
                    };
                    action_table.set(state, symbol, action)?;
                }
                // reduce and accept entries for complete items
                for &item in collection.items() {
                    if grammar.expected_symbol(item).is_some() {
                        continue;
                    }
                    let set = grammar.rule_set(item.rule());
                    if set == 0 {
                        action_table.set(state, symbol_count, Action::Accept)?;
                    } else {
                        for &terminal in grammar.follow(set) {
                            action_table.set(state, terminal, Action::Reduce(item.rule()))?;
                        }
                    }
                }
            }
        }
        Ok(Self {
            grammar,
            action_table,
        })
    }

    pub fn grammar(&self) -> &Rc<Grammar<V>> {
        &self.grammar
    }

    pub fn action_table(&self) -> &ActionTable {
        &self.action_table
    }

    /// Parse a token stream into its concrete syntax tree.
    ///
    /// Statuses: `103` the token's class is not in the grammar vocabulary,
    /// `101` no action for the current state and token, `102` a terminal hit a
    /// goto edge, `104` an inconsistent table entry (can not occur for a
    /// complete grammar).
    pub fn parse(&self, tokens: &[Token]) -> Result<SyntaxNode, ParseResult> {
        let end_symbol = self.grammar.end_symbol();
        let line_end = tokens.last().map_or(0, |t| t.position + t.length);

        let mut states: Vec<usize> = vec![0];
        let mut nodes: Vec<SyntaxNode> = Vec::new();
        let mut cursor = 0usize;

        loop {
            let (look, position, length) = if cursor < tokens.len() {
                let token = &tokens[cursor];
                match self.grammar.token_symbol_index(token) {
                    Some(symbol) => (symbol, token.position, token.length),
                    None => return Err(ParseResult::new(103, token.position, token.length)),
                }
            } else {
                (end_symbol, line_end, 1)
            };

            let Some(&state) = states.last() else {
                return Err(ParseResult::new(104, position, length));
            };

            match self.action_table.get(state, look) {
                Action::Shift(next) => {
                    nodes.push(SyntaxNode::Terminal(tokens[cursor].clone()));
                    states.push(next);
                    cursor += 1;
                }
                Action::Reduce(rule) => {
                    let size = self.grammar.rule_body_len(rule);
                    if size >= states.len() || size > nodes.len() {
                        return Err(ParseResult::new(104, position, length));
                    }
                    states.truncate(states.len() - size);
                    let children = nodes.split_off(nodes.len() - size);
                    let set_symbol = self.grammar.set_symbol_index(self.grammar.rule_set(rule));
                    let Some(&top) = states.last() else {
                        return Err(ParseResult::new(104, position, length));
                    };
                    match self.action_table.get(top, set_symbol) {
                        Action::Goto(next) => {
                            nodes.push(SyntaxNode::Production { rule, children });
                            states.push(next);
                        }
                        _ => return Err(ParseResult::new(104, position, length)),
                    }
                }
                Action::Accept => {
                    return nodes
                        .pop()
                        .ok_or_else(|| ParseResult::new(104, position, length));
                }
                Action::Goto(_) => {
                    // a terminal can never drive a goto edge
                    return Err(ParseResult::new(102, position, length));
                }
                Action::Error => {
                    return Err(ParseResult::new(101, position, length));
                }
            }
        }
    }
}

impl SyntaxNode {
    /// The rule index, for production nodes.
    pub fn rule(&self) -> Option<usize> {
        match self {
            SyntaxNode::Terminal(_) => None,
            SyntaxNode::Production { rule, .. } => Some(*rule),
        }
    }

    pub fn children(&self) -> &[SyntaxNode] {
        match self {
            SyntaxNode::Terminal(_) => &[],
            SyntaxNode::Production { children, .. } => children,
        }
    }

    pub fn child(&self, index: usize) -> Option<&SyntaxNode> {
        self.children().get(index)
    }

    /// The token, for terminal nodes.
    pub fn token(&self) -> Option<&Token> {
        match self {
            SyntaxNode::Terminal(token) => Some(token),
            SyntaxNode::Production { .. } => None,
        }
    }

    /// All terminal tokens of the subtree, left to right.
    pub fn leaf_tokens(&self) -> Vec<&Token> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'t>(&'t self, leaves: &mut Vec<&'t Token>) {
        match self {
            SyntaxNode::Terminal(token) => leaves.push(token),
            SyntaxNode::Production { children, .. } => {
                for child in children {
                    child.collect_leaves(leaves);
                }
            }
        }
    }
}
