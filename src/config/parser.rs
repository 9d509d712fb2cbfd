use super::{
    identifier_index, is_back, is_clock, is_divider, is_extern_clock, is_front_io, is_lemo_io,
    is_scaler, is_user_variable, parse_frequency, ConfigParser, DividerInfo, Gate, PortSource,
    VariableInfo, CLOCKS_OFFSET, DIVIDERS_OFFSET, FRONT_IO_NUM, GATE_CAPACITY, GATE_OFFSETS,
    MAX_CLOCKS, MAX_DIVIDERS, MAX_SCALERS, SCALERS_OFFSET, ZERO_VALUE_OFFSET,
};
use crate::standardize::{OperatorType, StandardLogicNode, StandardLogicTree};
use crate::syntax::{Lexer, SlrParser, logic_downscale_grammar};
use crate::{GrammarError, Log, ParseResult, ReadError, Token};
use once_cell::unsync::OnceCell;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::rc::Rc;

/// The plan fields a failing line must roll back.
struct PlanSnapshot {
    front_outputs: Vec<PortSource>,
    front_out_use: u64,
    front_in_use: u64,
    front_use_lemo: u64,
    front_output_inverse: u64,
    back_source: Option<usize>,
    extern_clock: Option<usize>,
    gates: [Vec<Gate>; 4],
    dividers: Vec<DividerInfo>,
    clocks: Vec<u64>,
    scalers: Vec<PortSource>,
    scaler_use: u64,
    variables: Vec<VariableInfo>,
}

impl ConfigParser {
    /// Create an empty plan with the downscale grammar's parser tables built.
    pub fn new() -> Result<Self, GrammarError> {
        let grammar = Rc::new(logic_downscale_grammar());
        let parser = SlrParser::new(grammar)?;
        let mut config = Self {
            parser,
            log: OnceCell::new(),
            front_outputs: Vec::new(),
            front_out_use: 0,
            front_in_use: 0,
            front_use_lemo: 0,
            front_output_inverse: 0,
            back_source: None,
            extern_clock: None,
            gates: [Vec::new(), Vec::new(), Vec::new(), Vec::new()],
            dividers: Vec::new(),
            clocks: Vec::new(),
            scalers: Vec::new(),
            scaler_use: 0,
            variables: Vec::new(),
            expressions: Vec::new(),
        };
        config.clear();
        Ok(config)
    }

    /// Set a log label to trace compiled lines in debug builds.
    pub fn set_log(&self, label: Log<&'static str>) -> Result<(), String> {
        self.log
            .set(label)
            .map_err(|err| format!("Log label {} is already assigned.", err))
    }

    /// Reset the plan to its initial state; slot 0 of the clock pool is
    /// re-seeded with the 1 Hz clock.
    pub fn clear(&mut self) {
        self.front_outputs.clear();
        self.front_out_use = 0;
        self.front_in_use = 0;
        self.front_use_lemo = 0;
        self.front_output_inverse = 0;
        self.back_source = None;
        self.extern_clock = None;
        for pool in &mut self.gates {
            pool.clear();
        }
        self.dividers.clear();
        self.clocks.clear();
        self.clocks.push(1);
        self.scalers.clear();
        self.scaler_use = 0;
        self.variables.clear();
        self.expressions.clear();
    }

    /// Compile one expression line into the plan.
    ///
    /// On success the line is retained for replay and the plan advances. On
    /// failure every partial change is rolled back and the returned result
    /// localizes the problem in the line.
    pub fn parse(&mut self, expression: &str) -> ParseResult {
        let snapshot = self.snapshot();
        match self.parse_line(expression) {
            Ok(()) => {
                self.expressions.push(expression.to_string());
                self.log_line(expression, None);
                ParseResult::success()
            }
            Err(result) => {
                self.restore(snapshot);
                self.log_line(expression, Some(result));
                result
            }
        }
    }

    /// Compile a configuration file line by line, skipping blank lines and
    /// stopping at the first failure.
    pub fn read<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ReadError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let result = self.parse(&line);
            if !result.ok() {
                return Err(ReadError::Parse {
                    line_number: index + 1,
                    line,
                    result,
                });
            }
        }
        Ok(())
    }

    fn parse_line(&mut self, expression: &str) -> Result<(), ParseResult> {
        let whole_line = |status: i32| ParseResult::new(status, 0, expression.len().max(1));

        let tokens = Lexer.analyse(expression)?;
        if tokens.len() < 3 {
            return Err(whole_line(201));
        }
        self.check_identifiers(&tokens)?;
        self.check_io_conflict(&tokens)?;

        // expand macros in the token stream before parsing
        let right_tokens = self.replace_variables(&tokens[2..]);
        let mut parse_tokens: Vec<Token> = tokens[..2].to_vec();
        parse_tokens.extend(right_tokens.iter().cloned());

        let root = self.parser.parse(&parse_tokens)?;
        let downscale_depth = self.parser.grammar().eval(&root);
        if downscale_depth >= 2 {
            return Err(whole_line(208));
        }

        let left = &tokens[0];
        if is_user_variable(&left.name) {
            self.variables.push(VariableInfo {
                name: left.name.clone(),
                tokens: right_tokens,
            });
            return Ok(());
        }

        // the accepted node is the assignment `L -> Variable '=' E`
        let expression_node = root.child(2).ok_or_else(|| whole_line(104))?;
        let tree =
            StandardLogicTree::new(expression_node).map_err(|err| whole_line(err.status()))?;

        let is_scaler_target = is_scaler(&left.name);
        let source = self
            .generate_source(&tree, downscale_depth, is_scaler_target)
            .map_err(|err| {
                if err.status() == 300 {
                    whole_line(300)
                } else {
                    err
                }
            })?;

        if is_front_io(&left.name) {
            let port = identifier_index(&left.name).ok_or_else(|| whole_line(104))?;
            self.front_outputs.push(PortSource { port, source });
            self.front_out_use |= 1u64 << port;
            if !is_clock(&parse_tokens[2].name) {
                self.front_output_inverse |= 1u64 << port;
                if tree.root().op_type() == OperatorType::Null && tree.root().leaf(1) {
                    // a constant 1 drives the port directly, without inversion
                    self.front_output_inverse &= !(1u64 << port);
                }
            }
            if is_lemo_io(&left.name) {
                self.front_use_lemo |= 1u64 << port;
            }
        } else if is_back(&left.name) {
            self.back_source = Some(source);
        } else if is_scaler_target {
            let slot = identifier_index(&left.name)
                .and_then(|index| index.checked_sub(SCALERS_OFFSET))
                .ok_or_else(|| whole_line(104))?;
            self.scalers.push(PortSource { port: slot, source });
            self.scaler_use |= 1u64 << slot;
        } else if is_extern_clock(&left.name) {
            let slot = source
                .checked_sub(CLOCKS_OFFSET)
                .ok_or_else(|| whole_line(104))?;
            self.extern_clock = Some(slot);
        }
        Ok(())
    }

    //-------------------------------------------------------------------------
    // validation
    //-------------------------------------------------------------------------

    /// Check the form of every identifier against its context (status 202).
    fn check_identifiers(&self, tokens: &[Token]) -> Result<(), ParseResult> {
        let left = &tokens[0];
        let reject = |token: &Token| ParseResult::new(202, token.position, token.length);

        if !left.is_variable() {
            return Err(reject(left));
        }
        if !(is_front_io(&left.name)
            || is_back(&left.name)
            || is_extern_clock(&left.name)
            || is_scaler(&left.name)
            || is_user_variable(&left.name))
        {
            return Err(reject(left));
        }

        if tokens.len() == 3 {
            let right = &tokens[2];
            match right.kind {
                crate::TokenKind::Operator => return Err(reject(right)),
                crate::TokenKind::Number(_) => {
                    if right.name != "0" && right.name != "1" {
                        return Err(reject(right));
                    }
                }
                crate::TokenKind::Variable => {
                    if is_clock(&right.name) {
                        // a clock can only drive a front port or the external clock
                        if !is_front_io(&left.name) && !is_extern_clock(&left.name) {
                            return Err(reject(right));
                        }
                    } else if !is_front_io(&right.name) && !is_user_variable(&right.name) {
                        return Err(reject(right));
                    }
                }
            }
        } else {
            for (index, token) in tokens.iter().enumerate().skip(2) {
                match token.kind {
                    crate::TokenKind::Variable => {
                        if !is_front_io(&token.name) && !is_user_variable(&token.name) {
                            return Err(reject(token));
                        }
                    }
                    crate::TokenKind::Number(_) => {
                        // a bare literal must be 0 or 1; arbitrary digits only follow '/'
                        let is_divisor = tokens[index - 1].op() == Some('/');
                        if !is_divisor && token.name != "0" && token.name != "1" {
                            return Err(reject(token));
                        }
                    }
                    crate::TokenKind::Operator => {}
                }
            }
        }
        Ok(())
    }

    /// Check output, direction, LEMO/LVDS and macro-definedness conflicts
    /// against the accumulated plan (statuses 203-207, 209).
    fn check_io_conflict(&self, tokens: &[Token]) -> Result<(), ParseResult> {
        let left = &tokens[0];
        let name = &left.name;
        let at = |status: i32, token: &Token| ParseResult::new(status, token.position, token.length);

        // an output can only have one source
        if is_back(name) {
            if self.back_source.is_some() {
                return Err(at(203, left));
            }
        } else if is_extern_clock(name) {
            if self.extern_clock.is_some() {
                return Err(at(203, left));
            }
            if tokens.len() != 3 || !is_clock(&tokens[2].name) {
                return Err(at(209, &tokens[2]));
            }
        } else if is_front_io(name) {
            if let Some(port) = identifier_index(name) {
                if self.front_out_use & (1u64 << port) != 0 {
                    return Err(at(203, left));
                }
            }
        } else if is_scaler(name) {
            if let Some(slot) = identifier_index(name).and_then(|i| i.checked_sub(SCALERS_OFFSET)) {
                if self.scaler_use & (1u64 << slot) != 0 {
                    return Err(at(203, left));
                }
            }
        } else if self.variables.iter().any(|variable| &variable.name == name) {
            // macro redefinition
            return Err(at(203, left));
        }

        if is_front_io(name) {
            // the target can not feed itself
            for token in &tokens[2..] {
                if token.is_variable() && &token.name == name {
                    return Err(at(204, left));
                }
            }
            // an earlier input can not become an output
            if let Some(port) = identifier_index(name) {
                if self.front_in_use & (1u64 << port) != 0 {
                    return Err(at(204, left));
                }
            }
        }

        if is_scaler(name) {
            // a scaler observes exactly one identifier, and may observe outputs
            if tokens.len() != 3 || !tokens[2].is_variable() {
                return Err(at(205, &tokens[2]));
            }
        } else if !is_clock(&tokens[2].name) {
            // an earlier output can not become an input
            for token in &tokens[2..] {
                if !token.is_variable() || !is_front_io(&token.name) {
                    continue;
                }
                if let Some(port) = identifier_index(&token.name) {
                    if self.front_out_use & (1u64 << port) != 0 {
                        return Err(at(204, token));
                    }
                }
            }
        }

        // the LEMO and LVDS forms of one lane can not mix
        for token in &tokens[2..] {
            if !token.is_variable() || !is_front_io(&token.name) {
                continue;
            }
            let Some(port) = identifier_index(&token.name) else {
                continue;
            };
            if self.front_in_use & (1u64 << port) == 0 {
                continue;
            }
            let lemo_before = self.front_use_lemo & (1u64 << port) != 0;
            if lemo_before != is_lemo_io(&token.name) {
                return Err(at(206, token));
            }
        }

        // macros must be defined before use
        for token in &tokens[2..] {
            if !token.is_variable() || !is_user_variable(&token.name) {
                continue;
            }
            if !self
                .variables
                .iter()
                .any(|variable| variable.name == token.name)
            {
                return Err(at(207, token));
            }
        }

        Ok(())
    }

    /// Replace every defined macro token by its parenthesized definition,
    /// recursively. Substituted tokens keep the positions of their definition
    /// site; the wrapping brackets take the position of the replaced token.
    fn replace_variables(&self, tokens: &[Token]) -> Vec<Token> {
        let mut result = Vec::new();
        for token in tokens {
            if !token.is_variable() || !is_user_variable(&token.name) {
                result.push(token.clone());
                continue;
            }
            match self
                .variables
                .iter()
                .find(|variable| variable.name == token.name)
            {
                Some(variable) => {
                    let replaced = self.replace_variables(&variable.tokens);
                    result.push(Token::operator('(', token.position));
                    result.extend(replaced);
                    result.push(Token::operator(')', token.position));
                }
                None => result.push(token.clone()),
            }
        }
        result
    }

    //-------------------------------------------------------------------------
    // allocation
    //-------------------------------------------------------------------------

    /// Allocate the source driving the whole right-hand side.
    fn generate_source(
        &mut self,
        tree: &StandardLogicTree,
        downscale_depth: i32,
        is_scaler: bool,
    ) -> Result<usize, ParseResult> {
        let root = tree.root();
        match root.op_type() {
            OperatorType::Null => {
                if root.leaf(0) || root.leaf(1) {
                    Ok(ZERO_VALUE_OFFSET)
                } else {
                    self.generate_gate(tree, root, 0, is_scaler)
                }
            }
            OperatorType::Or => {
                let layer = if downscale_depth == 1 { 3 } else { 1 };
                self.generate_gate(tree, root, layer, is_scaler)
            }
            OperatorType::And => {
                let layer = if downscale_depth == 1 { 4 } else { 2 };
                self.generate_gate(tree, root, layer, is_scaler)
            }
        }
    }

    /// Allocate the gate of a normalized node and return its global index.
    ///
    /// Layer 0 resolves a single-operand node without a gate; layers 1-4 are
    /// the OR, AND, divider-OR and divider-AND pools. Branches recurse with the
    /// dual layer, leaves set their source bits, and the finished bitset is
    /// deduplicated against the pool. Status 300 when a pool is full.
    fn generate_gate(
        &mut self,
        tree: &StandardLogicTree,
        node: &StandardLogicNode,
        layer: usize,
        is_scaler: bool,
    ) -> Result<usize, ParseResult> {
        let exhausted = || ParseResult::new(300, 0, 1);

        let mut gate = Gate::default();
        for branch in node.branches() {
            let child_layer = match layer {
                1 => 2,
                2 => 1,
                3 => 4,
                4 => 3,
                _ => return Err(exhausted()),
            };
            let index = self.generate_gate(tree, branch, child_layer, is_scaler)?;
            gate.set(index);
        }

        let var_table = tree.var_table();
        // slots 0 and 1 are the literal constants, never gate inputs
        for leaf in 2..var_table.len() {
            if !node.leaf(leaf) {
                continue;
            }
            let name = &var_table[leaf];
            if is_divider(name) {
                let forest_index: usize = name[2..].parse().map_err(|_| exhausted())?;
                let entry = tree.forest().get(forest_index).ok_or_else(exhausted)?;
                let index =
                    self.generate_divider(tree, &entry.root, entry.divisor, is_scaler)?;
                if layer == 0 {
                    return Ok(index);
                }
                gate.set(index);
            } else if is_front_io(name) {
                let index = identifier_index(name).ok_or_else(exhausted)?;
                if !is_scaler {
                    // a scaler read does not declare the port's direction
                    self.front_in_use |= 1u64 << index;
                    if is_lemo_io(name) {
                        self.front_use_lemo |= 1u64 << index;
                    }
                }
                if layer == 0 {
                    return Ok(index);
                }
                gate.set(index);
            } else if is_clock(name) {
                if layer != 0 {
                    return Err(exhausted());
                }
                return self.generate_clock(name);
            }
        }

        if layer == 0 {
            return Err(exhausted());
        }
        let pool = layer - 1;
        if let Some(existing) = self.gates[pool].iter().position(|g| *g == gate) {
            return Ok(GATE_OFFSETS[pool] + existing);
        }
        if self.gates[pool].len() < GATE_CAPACITY[pool] {
            self.gates[pool].push(gate);
            return Ok(GATE_OFFSETS[pool] + self.gates[pool].len() - 1);
        }
        Err(exhausted())
    }

    /// Allocate (or reuse) the divider of a downscale subtree.
    fn generate_divider(
        &mut self,
        tree: &StandardLogicTree,
        node: &StandardLogicNode,
        divisor: u64,
        is_scaler: bool,
    ) -> Result<usize, ParseResult> {
        if divisor == 0 {
            return Err(ParseResult::new(300, 0, 1));
        }
        let source = match node.op_type() {
            OperatorType::Null => self.generate_gate(tree, node, 0, is_scaler)?,
            OperatorType::Or => self.generate_gate(tree, node, 1, is_scaler)?,
            OperatorType::And => self.generate_gate(tree, node, 2, is_scaler)?,
        };
        if let Some(existing) = self
            .dividers
            .iter()
            .position(|d| d.source == source && d.divisor == divisor)
        {
            return Ok(DIVIDERS_OFFSET + existing);
        }
        if self.dividers.len() < MAX_DIVIDERS {
            self.dividers.push(DividerInfo { source, divisor });
            return Ok(DIVIDERS_OFFSET + self.dividers.len() - 1);
        }
        Err(ParseResult::new(300, 0, 1))
    }

    /// Allocate (or reuse) a clock slot for a clock identifier.
    fn generate_clock(&mut self, name: &str) -> Result<usize, ParseResult> {
        let frequency = parse_frequency(name).ok_or_else(|| ParseResult::new(300, 0, 1))?;
        if let Some(existing) = self.clocks.iter().position(|f| *f == frequency) {
            return Ok(CLOCKS_OFFSET + existing);
        }
        if self.clocks.len() < MAX_CLOCKS {
            self.clocks.push(frequency);
            return Ok(CLOCKS_OFFSET + self.clocks.len() - 1);
        }
        Err(ParseResult::new(300, 0, 1))
    }

    //-------------------------------------------------------------------------
    // transactional state
    //-------------------------------------------------------------------------

    fn snapshot(&self) -> PlanSnapshot {
        PlanSnapshot {
            front_outputs: self.front_outputs.clone(),
            front_out_use: self.front_out_use,
            front_in_use: self.front_in_use,
            front_use_lemo: self.front_use_lemo,
            front_output_inverse: self.front_output_inverse,
            back_source: self.back_source,
            extern_clock: self.extern_clock,
            gates: self.gates.clone(),
            dividers: self.dividers.clone(),
            clocks: self.clocks.clone(),
            scalers: self.scalers.clone(),
            scaler_use: self.scaler_use,
            variables: self.variables.clone(),
        }
    }

    fn restore(&mut self, snapshot: PlanSnapshot) {
        self.front_outputs = snapshot.front_outputs;
        self.front_out_use = snapshot.front_out_use;
        self.front_in_use = snapshot.front_in_use;
        self.front_use_lemo = snapshot.front_use_lemo;
        self.front_output_inverse = snapshot.front_output_inverse;
        self.back_source = snapshot.back_source;
        self.extern_clock = snapshot.extern_clock;
        self.gates = snapshot.gates;
        self.dividers = snapshot.dividers;
        self.clocks = snapshot.clocks;
        self.scalers = snapshot.scalers;
        self.scaler_use = snapshot.scaler_use;
        self.variables = snapshot.variables;
    }

    fn log_line(&self, _expression: &str, _failure: Option<ParseResult>) {
        #[cfg(debug_assertions)]
        if let Some(label) = self.log.get() {
            match _failure {
                None => {
                    if label.order() >= Log::Success(()).order() {
                        println!("[{}; LineSuccess]: {}", label, _expression);
                    }
                }
                Some(result) => {
                    if label.order() >= Log::Default(()).order() {
                        println!(
                            "[{}; LineError]: status {} at {}: {}",
                            label,
                            result.status(),
                            result.position(),
                            _expression
                        );
                    }
                }
            }
        }
    }

    //-------------------------------------------------------------------------
    // plan queries
    //-------------------------------------------------------------------------

    /// Front outputs in insertion order.
    pub fn front_outputs(&self) -> &[PortSource] {
        &self.front_outputs
    }

    pub fn is_front_input(&self, port: usize) -> bool {
        port < FRONT_IO_NUM && self.front_in_use & (1u64 << port) != 0
    }

    pub fn is_front_output(&self, port: usize) -> bool {
        port < FRONT_IO_NUM && self.front_out_use & (1u64 << port) != 0
    }

    pub fn is_front_lemo(&self, port: usize) -> bool {
        port < FRONT_IO_NUM && self.front_use_lemo & (1u64 << port) != 0
    }

    pub fn is_front_output_inverse(&self, port: usize) -> bool {
        port < FRONT_IO_NUM && self.front_output_inverse & (1u64 << port) != 0
    }

    pub fn or_gates(&self) -> &[Gate] {
        &self.gates[0]
    }

    pub fn and_gates(&self) -> &[Gate] {
        &self.gates[1]
    }

    pub fn divider_or_gates(&self) -> &[Gate] {
        &self.gates[2]
    }

    pub fn divider_and_gates(&self) -> &[Gate] {
        &self.gates[3]
    }

    pub fn dividers(&self) -> &[DividerInfo] {
        &self.dividers
    }

    /// Clock frequencies in Hz; slot 0 is always 1 Hz.
    pub fn clocks(&self) -> &[u64] {
        &self.clocks
    }

    /// The global source index of the 1 Hz clock.
    pub fn second_clock(&self) -> Option<usize> {
        self.clocks
            .iter()
            .position(|f| *f == 1)
            .map(|index| CLOCKS_OFFSET + index)
    }

    /// Scaler bindings as (scaler slot, source index), in insertion order.
    pub fn scalers(&self) -> &[PortSource] {
        &self.scalers
    }

    pub fn is_scaler_used(&self, slot: usize) -> bool {
        slot < MAX_SCALERS && self.scaler_use & (1u64 << slot) != 0
    }

    pub fn back_source(&self) -> Option<usize> {
        self.back_source
    }

    /// The clock slot routed to the external clock output.
    pub fn extern_clock(&self) -> Option<usize> {
        self.extern_clock
    }

    pub fn variables(&self) -> &[VariableInfo] {
        &self.variables
    }

    /// The successfully compiled lines, in order; replaying them on a cleared
    /// plan reproduces this plan exactly.
    pub fn expressions(&self) -> &[String] {
        &self.expressions
    }
}
