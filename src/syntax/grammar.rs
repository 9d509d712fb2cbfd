use super::{FirstSets, Grammar, GrammarSymbol, Item, ItemCollection, ProductionRule, SyntaxNode};
use crate::{Token, TokenKind};
use once_cell::unsync::OnceCell;
use std::collections::BTreeSet;

impl<V> ProductionRule<V> {
    pub fn set(&self) -> usize {
        self.set
    }

    pub fn body(&self) -> &[GrammarSymbol] {
        &self.body
    }
}

impl Item {
    pub(crate) fn new(rule: usize, dot: usize) -> Self {
        Self { rule, dot }
    }

    pub(crate) fn rule(&self) -> usize {
        self.rule
    }
}

impl ItemCollection {
    pub(crate) fn items(&self) -> &[Item] {
        &self.items
    }

    pub(crate) fn gotos(&self) -> &[(usize, usize)] {
        &self.gotos
    }
}

impl<V> Default for Grammar<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Grammar<V> {
    pub fn new() -> Self {
        Self {
            symbols: Vec::new(),
            set_rules: Vec::new(),
            rules: Vec::new(),
            first: OnceCell::new(),
            follow: OnceCell::new(),
            collections: OnceCell::new(),
        }
    }

    /// Register a new production set (non-terminal) and return its index.
    ///
    /// The first set added is the start set; it must end up with exactly one rule.
    pub fn add_set(&mut self) -> usize {
        let set = self.set_rules.len();
        self.set_rules.push(Vec::new());
        self.symbols.push(GrammarSymbol::Set(set));
        set
    }

    /// Register a rule `set -> body` with its semantic action, returning the
    /// rule index. Terminal symbols in the body join the parsing vocabulary on
    /// first use; sets referenced in the body must already have been added.
    pub fn add_rule<F>(&mut self, set: usize, body: Vec<GrammarSymbol>, action: F) -> usize
    where
        F: Fn(&[V]) -> V + 'static,
    {
        for symbol in &body {
            if self.symbol_index(symbol).is_none() {
                debug_assert!(
                    !matches!(symbol, GrammarSymbol::Set(_)),
                    "body references a production set that was never added"
                );
                self.symbols.push(*symbol);
            }
        }
        let rule = self.rules.len();
        self.rules.push(ProductionRule {
            set,
            body,
            action: Box::new(action),
        });
        self.set_rules[set].push(rule);
        rule
    }

    /// Whether every production set has at least one rule and the start set has
    /// exactly one.
    pub fn is_complete(&self) -> bool {
        !self.set_rules.is_empty()
            && self.set_rules[0].len() == 1
            && self.set_rules.iter().all(|rules| !rules.is_empty())
    }

    pub fn symbol_index(&self, symbol: &GrammarSymbol) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }

    /// The vocabulary index matching a token's class.
    pub fn token_symbol_index(&self, token: &Token) -> Option<usize> {
        let symbol = match token.kind {
            TokenKind::Variable => GrammarSymbol::Variable,
            TokenKind::Number(_) => GrammarSymbol::Literal,
            TokenKind::Operator => GrammarSymbol::Operator(token.op()?),
        };
        self.symbol_index(&symbol)
    }

    pub fn symbol(&self, index: usize) -> GrammarSymbol {
        self.symbols[index]
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// The pseudo symbol index of end-of-input, one past the vocabulary.
    pub fn end_symbol(&self) -> usize {
        self.symbols.len()
    }

    pub fn set_count(&self) -> usize {
        self.set_rules.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn rule_set(&self, rule: usize) -> usize {
        self.rules[rule].set
    }

    pub fn rule_body_len(&self, rule: usize) -> usize {
        self.rules[rule].body.len()
    }

    pub(crate) fn set_symbol_index(&self, set: usize) -> usize {
        // sets are registered in add_set, so the position always exists
        self.symbols
            .iter()
            .position(|s| *s == GrammarSymbol::Set(set))
            .expect("production set registered in the vocabulary")
    }

    fn registered_index(&self, symbol: &GrammarSymbol) -> usize {
        // rule bodies only hold registered symbols
        self.symbol_index(symbol)
            .expect("rule symbol registered in the vocabulary")
    }

    //-------------------------------------------------------------------------
    // FIRST and FOLLOW
    //-------------------------------------------------------------------------

    fn first_sets(&self) -> &FirstSets {
        self.first.get_or_init(|| self.build_first())
    }

    /// Terminal indices that can begin a derivation of `set`.
    pub fn first(&self, set: usize) -> &BTreeSet<usize> {
        &self.first_sets().sets[set]
    }

    /// Whether `set` derives the empty string.
    pub fn first_include_empty(&self, set: usize) -> bool {
        self.first_sets().include_empty[set]
    }

    fn build_first(&self) -> FirstSets {
        let mut sets = vec![BTreeSet::new(); self.set_rules.len()];
        let mut include_empty = vec![false; self.set_rules.len()];

        let mut changed = true;
        while changed {
            changed = false;
            for rule in &self.rules {
                let set = rule.set;
                if rule.body.is_empty() {
                    if !include_empty[set] {
                        include_empty[set] = true;
                        changed = true;
                    }
                    continue;
                }
                let mut all_nullable = true;
                for symbol in &rule.body {
                    match symbol {
                        GrammarSymbol::Set(child) => {
                            let child_first: Vec<usize> = sets[*child].iter().copied().collect();
                            for terminal in child_first {
                                if sets[set].insert(terminal) {
                                    changed = true;
                                }
                            }
                            if !include_empty[*child] {
                                all_nullable = false;
                                break;
                            }
                        }
                        terminal => {
                            if sets[set].insert(self.registered_index(terminal)) {
                                changed = true;
                            }
                            all_nullable = false;
                            break;
                        }
                    }
                }
                if all_nullable && !include_empty[set] {
                    include_empty[set] = true;
                    changed = true;
                }
            }
        }
        FirstSets {
            sets,
            include_empty,
        }
    }

    /// FIRST of the symbol sequence `body[from..]` of a rule, and whether the
    /// whole sequence can derive the empty string.
    fn sequence_first(&self, rule: usize, from: usize) -> (BTreeSet<usize>, bool) {
        let first = self.first_sets();
        let mut result = BTreeSet::new();
        let mut nullable = true;
        for symbol in &self.rules[rule].body[from..] {
            match symbol {
                GrammarSymbol::Set(set) => {
                    result.extend(first.sets[*set].iter().copied());
                    if !first.include_empty[*set] {
                        nullable = false;
                        break;
                    }
                }
                terminal => {
                    result.insert(self.registered_index(terminal));
                    nullable = false;
                    break;
                }
            }
        }
        (result, nullable)
    }

    fn follow_sets(&self) -> &Vec<BTreeSet<usize>> {
        self.follow.get_or_init(|| self.build_follow())
    }

    /// Terminal indices that can follow a derivation of `set`.
    pub fn follow(&self, set: usize) -> &BTreeSet<usize> {
        &self.follow_sets()[set]
    }

    fn build_follow(&self) -> Vec<BTreeSet<usize>> {
        let mut follow = vec![BTreeSet::new(); self.set_rules.len()];
        // end-of-input follows the start set
        follow[0].insert(self.end_symbol());

        let mut changed = true;
        while changed {
            changed = false;
            for (rule_index, rule) in self.rules.iter().enumerate() {
                for (child, symbol) in rule.body.iter().enumerate() {
                    let GrammarSymbol::Set(set) = symbol else {
                        continue;
                    };
                    let (sequence, nullable) = if child + 1 < rule.body.len() {
                        self.sequence_first(rule_index, child + 1)
                    } else {
                        (BTreeSet::new(), true)
                    };
                    for terminal in sequence {
                        if follow[*set].insert(terminal) {
                            changed = true;
                        }
                    }
                    if nullable {
                        let parent: Vec<usize> = follow[rule.set].iter().copied().collect();
                        for terminal in parent {
                            if follow[*set].insert(terminal) {
                                changed = true;
                            }
                        }
                    }
                }
            }
        }
        follow
    }

    //-------------------------------------------------------------------------
    // LR(0) items and collections
    //-------------------------------------------------------------------------

    /// The symbol right of an item's dot, if the item is not complete.
    pub(crate) fn expected_symbol(&self, item: Item) -> Option<GrammarSymbol> {
        self.rules[item.rule].body.get(item.dot).copied()
    }

    /// Extend `items` with every non-core item of its closure.
    fn closure(&self, items: &mut Vec<Item>) {
        let mut index = 0;
        while index < items.len() {
            if let Some(GrammarSymbol::Set(set)) = self.expected_symbol(items[index]) {
                for &rule in &self.set_rules[set] {
                    let candidate = Item::new(rule, 0);
                    if !items.contains(&candidate) {
                        items.push(candidate);
                    }
                }
            }
            index += 1;
        }
    }

    /// The canonical LR(0) item collections with their goto edges.
    pub(crate) fn collections(&self) -> &Vec<ItemCollection> {
        self.collections.get_or_init(|| self.build_collections())
    }

    fn build_collections(&self) -> Vec<ItemCollection> {
        let start_rule = self.set_rules[0][0];
        let mut initial = vec![Item::new(start_rule, 0)];
        self.closure(&mut initial);
        initial.sort();

        let mut collections = vec![ItemCollection {
            items: initial,
            gotos: Vec::new(),
        }];

        let mut index = 0;
        while index < collections.len() {
            let items = collections[index].items.clone();

            // goto targets grouped by the expected symbol, in encounter order
            let mut expected: Vec<GrammarSymbol> = Vec::new();
            for &item in &items {
                if let Some(symbol) = self.expected_symbol(item) {
                    if !expected.contains(&symbol) {
                        expected.push(symbol);
                    }
                }
            }

            for symbol in expected {
                let mut moved: Vec<Item> = items
                    .iter()
                    .filter(|item| self.expected_symbol(**item) == Some(symbol))
                    .map(|item| Item::new(item.rule, item.dot + 1))
                    .collect();
                self.closure(&mut moved);
                moved.sort();
                moved.dedup();

                let target = match collections.iter().position(|c| c.items == moved) {
                    Some(existing) => existing,
                    None => {
                        collections.push(ItemCollection {
                            items: moved,
                            gotos: Vec::new(),
                        });
                        collections.len() - 1
                    }
                };
                let symbol_index = self.registered_index(&symbol);
                collections[index].gotos.push((symbol_index, target));
            }
            index += 1;
        }
        collections
    }
}

impl<V: Clone + Default> Grammar<V> {
    /// Evaluate a concrete tree bottom-up through the semantic actions.
    ///
    /// Terminals evaluate to `V::default()`; a production applies its rule's
    /// action to the values of its children.
    pub fn eval(&self, node: &SyntaxNode) -> V {
        match node {
            SyntaxNode::Terminal(_) => V::default(),
            SyntaxNode::Production { rule, children } => {
                let values: Vec<V> = children.iter().map(|child| self.eval(child)).collect();
                (self.rules[*rule].action)(&values)
            }
        }
    }
}
