//! Tree-walking evaluator for one scan of a POU.
//!
//! Statements execute in program order; assignments to statics and
//! outputs are observed immediately by subsequent statements of the
//! same scan. The virtual clock is sampled once per scan, so timers
//! re-evaluated within a scan observe the same time.
use log::trace;

use plx_dsl::common::{BodyKind, ConstantKind, Pou, TypeRef};
use plx_dsl::core::Id;
use plx_dsl::sfc::Chart;
use plx_dsl::textual::{
    BinaryOp, Case, CaseSelector, CompareOp, ExprKind, FbCall, FunctionCall, LogicOp, PathSegment,
    StmtKind, UnaryOp, VariablePath,
};

use crate::builtins;
use crate::error::{Fault, RuntimeFault};
use crate::state::{allocate_instance, default_value, Registry};
use crate::value::{values_equal, Record, Value};

/// Control flow outcome of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Normal,
    Return,
    Exit,
}

/// Evaluates one scan against an instance record.
pub struct Executor<'a> {
    pub registry: &'a Registry,
    /// The clock sample for this scan, in nanoseconds.
    pub clock_ns: i64,
    /// True only during the first scan of a controller's run.
    pub first_scan: bool,
}

/// The key holding the active step of a chart body.
const ACTIVE_STEP_KEY: &str = "__active_step";

impl<'a> Executor<'a> {
    pub fn new(registry: &'a Registry, clock_ns: i64, first_scan: bool) -> Self {
        Self {
            registry,
            clock_ns,
            first_scan,
        }
    }

    /// Executes one scan of the POU body against the record.
    pub fn scan(&self, pou: &Pou, state: &mut Record) -> Result<(), RuntimeFault> {
        match &pou.body {
            BodyKind::Statements(statements) => {
                self.exec_body(pou, statements, state)
                    .map(|_| ())
                    .map_err(|fault| fault.with_frame(pou.name.original().to_owned()))
            }
            BodyKind::Chart(chart) => self
                .exec_chart(pou, chart, state)
                .map_err(|fault| fault.with_frame(pou.name.original().to_owned())),
            BodyKind::Empty => Ok(()),
        }
    }

    /// The currently active step name of a chart instance, if the
    /// instance has started.
    pub fn active_step(state: &Record) -> Option<String> {
        match state.get(ACTIVE_STEP_KEY) {
            Some(Value::Str(name)) => Some(name.clone()),
            _ => None,
        }
    }

    fn exec_chart(&self, pou: &Pou, chart: &Chart, state: &mut Record) -> Result<(), RuntimeFault> {
        let active_name = match Self::active_step(state) {
            Some(name) => name,
            None => {
                let name = chart.initial_step().name.lower_case().to_owned();
                state.insert(ACTIVE_STEP_KEY.into(), Value::Str(name.clone()));
                name
            }
        };
        let active_id = Id::from(&active_name);
        let active = chart
            .step(&active_id)
            .ok_or_else(|| RuntimeFault::new(Fault::UnknownVariable(active_name.clone())))?;

        // The active step's actions run every scan the step is active,
        // including the scan it became active.
        self.exec_body(pou, &active.actions, state)
            .map_err(|fault| fault.with_frame(format!("step {}", active.name)))?;

        // Evaluate the transitions leaving the active step, in
        // declaration order; the first satisfied transition fires.
        for transition in chart.transitions_from(&active_id) {
            let fired = self
                .eval(pou, &transition.condition, state)
                .and_then(|v| v.as_bool().map_err(RuntimeFault::new))
                .map_err(|fault| {
                    fault.with_frame(format!("transition from {}", transition.source))
                })?;
            if fired {
                trace!("transition {} -> {}", transition.source, transition.target);
                let target = chart
                    .step(&transition.target)
                    .ok_or_else(|| {
                        RuntimeFault::new(Fault::UnknownVariable(
                            transition.target.original().to_owned(),
                        ))
                    })?;
                state.insert(
                    ACTIVE_STEP_KEY.into(),
                    Value::Str(target.name.lower_case().to_owned()),
                );
                // The target's actions execute once on the firing
                // scan.
                self.exec_body(pou, &target.actions, state)
                    .map_err(|fault| fault.with_frame(format!("step {}", target.name)))?;
                break;
            }
        }

        Ok(())
    }

    fn exec_body(
        &self,
        pou: &Pou,
        statements: &[StmtKind],
        state: &mut Record,
    ) -> Result<Flow, RuntimeFault> {
        for statement in statements {
            match self.exec_statement(pou, statement, state)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_statement(
        &self,
        pou: &Pou,
        statement: &StmtKind,
        state: &mut Record,
    ) -> Result<Flow, RuntimeFault> {
        match statement {
            StmtKind::Assignment(assignment) => {
                let value = self.eval(pou, &assignment.value, state)?;
                self.write_path(pou, &assignment.target, value, state)?;
                Ok(Flow::Normal)
            }
            StmtKind::If(if_stmt) => {
                for branch in &if_stmt.branches {
                    if self.eval(pou, &branch.condition, state)?.as_bool()? {
                        return self.exec_body(pou, &branch.body, state);
                    }
                }
                self.exec_body(pou, &if_stmt.else_body, state)
            }
            StmtKind::Case(case) => self.exec_case(pou, case, state),
            StmtKind::For(for_stmt) => {
                let from = self.eval(pou, &for_stmt.from, state)?.as_int()?;
                let to = self.eval(pou, &for_stmt.to, state)?.as_int()?;
                let step = match &for_stmt.step {
                    Some(step) => self.eval(pou, step, state)?.as_int()?,
                    None => 1,
                };
                if step == 0 {
                    return Err(RuntimeFault::new(Fault::ZeroStep));
                }
                let key = for_stmt.control.lower_case().to_owned();
                let mut index = from;
                while (step > 0 && index <= to) || (step < 0 && index >= to) {
                    state.insert(key.clone(), Value::Int(index));
                    match self.exec_body(pou, &for_stmt.body, state)? {
                        Flow::Normal => {}
                        Flow::Exit => return Ok(Flow::Normal),
                        Flow::Return => return Ok(Flow::Return),
                    }
                    index += step;
                }
                Ok(Flow::Normal)
            }
            StmtKind::While(while_stmt) => {
                while self.eval(pou, &while_stmt.condition, state)?.as_bool()? {
                    match self.exec_body(pou, &while_stmt.body, state)? {
                        Flow::Normal => {}
                        Flow::Exit => break,
                        Flow::Return => return Ok(Flow::Return),
                    }
                }
                Ok(Flow::Normal)
            }
            StmtKind::Repeat(repeat) => {
                loop {
                    match self.exec_body(pou, &repeat.body, state)? {
                        Flow::Normal => {}
                        Flow::Exit => break,
                        Flow::Return => return Ok(Flow::Return),
                    }
                    if self.eval(pou, &repeat.until, state)?.as_bool()? {
                        break;
                    }
                }
                Ok(Flow::Normal)
            }
            StmtKind::FbCall(fb_call) => {
                self.exec_fb_call(pou, fb_call, state)?;
                Ok(Flow::Normal)
            }
            StmtKind::SuperCall => {
                let parent_name = pou
                    .parent
                    .as_ref()
                    .ok_or_else(|| {
                        RuntimeFault::new(Fault::TypeError(
                            "parent-body marker in a block without a parent".into(),
                        ))
                    })?;
                let parent = self.registry.pou(&parent_name.name).ok_or_else(|| {
                    RuntimeFault::new(Fault::UnknownVariable(parent_name.to_string()))
                })?;
                let statements = match &parent.body {
                    BodyKind::Statements(statements) => statements,
                    _ => {
                        return Err(RuntimeFault::new(Fault::TypeError(
                            "parent body is not a statement list".into(),
                        )))
                    }
                };
                self.exec_body(parent, statements, state)
                    .map_err(|fault| fault.with_frame(parent.name.original().to_owned()))?;
                Ok(Flow::Normal)
            }
            StmtKind::Return(_) => Ok(Flow::Return),
            StmtKind::Exit => Ok(Flow::Exit),
            StmtKind::Empty => Ok(Flow::Normal),
        }
    }

    fn exec_case(&self, pou: &Pou, case: &Case, state: &mut Record) -> Result<Flow, RuntimeFault> {
        let selector = self.eval(pou, &case.selector, state)?.as_int()?;

        for arm in &case.arms {
            for arm_selector in &arm.selectors {
                let matched = match arm_selector {
                    CaseSelector::Value(value) => selector == *value,
                    CaseSelector::Range(range) => {
                        selector >= range.start && selector <= range.end
                    }
                    CaseSelector::Enumerated(value) => {
                        let type_name = value.type_name.as_ref().map(|t| &t.name);
                        let variant = self
                            .registry
                            .enum_value(type_name, &value.variant)
                            .ok_or_else(|| {
                                RuntimeFault::new(Fault::UnknownVariable(value.to_string()))
                            })?;
                        selector == variant
                    }
                };
                if matched {
                    return self.exec_body(pou, &arm.body, state);
                }
            }
        }
        self.exec_body(pou, &case.else_body, state)
    }

    /// Invokes a function block instance: assigns the named inputs,
    /// then executes the instance against its nested record.
    fn exec_fb_call(
        &self,
        pou: &Pou,
        fb_call: &FbCall,
        state: &mut Record,
    ) -> Result<(), RuntimeFault> {
        let root = fb_call.instance.root().ok_or_else(|| {
            RuntimeFault::new(Fault::TypeError("invocation of a non-variable".into()))
        })?;
        if !fb_call.instance.is_simple() {
            return Err(RuntimeFault::new(Fault::TypeError(format!(
                "invocation target {} is not an instance variable",
                fb_call.instance
            ))));
        }

        let type_name = self
            .instance_type(pou, root)
            .ok_or_else(|| RuntimeFault::new(Fault::UnknownVariable(root.to_string())))?;

        // Evaluate the inputs against the caller's state before
        // borrowing the instance record.
        let mut inputs = Vec::new();
        for input in &fb_call.inputs {
            let value = self.eval(pou, &input.value, state)?;
            inputs.push((input.name.lower_case().to_owned(), value));
        }

        let key = root.lower_case().to_owned();
        let mut instance = state
            .remove(&key)
            .ok_or_else(|| RuntimeFault::new(Fault::UnknownVariable(root.to_string())))?;

        let result = (|| -> Result<(), RuntimeFault> {
            let record = instance.record_mut()?;
            for (name, value) in inputs {
                record.insert(name, value);
            }

            if builtins::is_builtin(type_name.name.original()) {
                builtins::execute(type_name.name.original(), record, self.clock_ns);
                return Ok(());
            }

            let callee = self.registry.pou(&type_name.name).ok_or_else(|| {
                RuntimeFault::new(Fault::UnknownVariable(type_name.to_string()))
            })?;
            self.scan(callee, record)
        })();

        state.insert(key, instance);
        result.map_err(|fault| fault.with_frame(format!("invocation of {}", root)))
    }

    /// The declared type of an instance variable, searching the
    /// ancestor chain of the POU.
    fn instance_type(&self, pou: &Pou, name: &Id) -> Option<plx_dsl::common::TypeName> {
        let mut current: Option<&Pou> = Some(pou);
        // Assembly rejects inheritance cycles; the depth guard keeps
        // unvalidated input from looping forever.
        for _ in 0..32 {
            let examined = current?;
            if let Some((_, decl)) = examined.interface.find(name) {
                return match &decl.type_ref {
                    TypeRef::Named(type_name) => Some(type_name.clone()),
                    _ => None,
                };
            }
            current = examined
                .parent
                .as_ref()
                .and_then(|parent| self.registry.pou(&parent.name));
        }
        None
    }

    pub fn eval(
        &self,
        pou: &Pou,
        expr: &ExprKind,
        state: &Record,
    ) -> Result<Value, RuntimeFault> {
        match expr {
            ExprKind::Const(constant) => self.eval_constant(constant),
            ExprKind::Variable(path) => self.read_path(pou, path, state),
            ExprKind::Unary(unary) => {
                let term = self.eval(pou, &unary.term, state)?;
                self.eval_unary(unary.op, term).map_err(RuntimeFault::new)
            }
            ExprKind::Binary(binary) => {
                let left = self.eval(pou, &binary.left, state)?;
                let right = self.eval(pou, &binary.right, state)?;
                eval_binary(binary.op, left, right).map_err(RuntimeFault::new)
            }
            ExprKind::Compare(compare) => {
                let left = self.eval(pou, &compare.left, state)?;
                let right = self.eval(pou, &compare.right, state)?;
                eval_compare(compare.op, left, right).map_err(RuntimeFault::new)
            }
            ExprKind::Logic(logic) => {
                let left = self.eval(pou, &logic.left, state)?.as_bool()?;
                // Short circuit: the right operand evaluates only when
                // the left does not decide the result.
                let result = match logic.op {
                    LogicOp::And => left && self.eval(pou, &logic.right, state)?.as_bool()?,
                    LogicOp::Or => left || self.eval(pou, &logic.right, state)?.as_bool()?,
                };
                Ok(Value::Bool(result))
            }
            ExprKind::Conditional(conditional) => {
                if self.eval(pou, &conditional.condition, state)?.as_bool()? {
                    self.eval(pou, &conditional.when_true, state)
                } else {
                    self.eval(pou, &conditional.when_false, state)
                }
            }
            ExprKind::Call(call) => self.eval_call(pou, call, state),
        }
    }

    fn eval_constant(&self, constant: &ConstantKind) -> Result<Value, RuntimeFault> {
        if let Some(value) = Value::from_constant(constant) {
            return Ok(value);
        }
        if let ConstantKind::Enumerated(enumerated) = constant {
            let type_name = enumerated.type_name.as_ref().map(|t| &t.name);
            if let Some(value) = self.registry.enum_value(type_name, &enumerated.variant) {
                return Ok(Value::Int(value));
            }
            return Err(RuntimeFault::new(Fault::UnknownVariable(
                enumerated.to_string(),
            )));
        }
        Err(RuntimeFault::new(Fault::TypeError(
            "constant has no runtime value".into(),
        )))
    }

    fn eval_unary(&self, op: UnaryOp, term: Value) -> Result<Value, Fault> {
        match op {
            UnaryOp::Not => Ok(Value::Bool(!term.as_bool()?)),
            UnaryOp::Neg => match term {
                Value::Int(value) => Ok(Value::Int(-value)),
                Value::Real(value) => Ok(Value::Real(-value)),
                Value::Duration(value) => Ok(Value::Duration(-value)),
                other => Err(Fault::TypeError(format!("cannot negate {other:?}"))),
            },
            UnaryOp::BitNot => Ok(Value::Int(!term.as_int()?)),
        }
    }

    fn eval_call(
        &self,
        pou: &Pou,
        call: &FunctionCall,
        state: &Record,
    ) -> Result<Value, RuntimeFault> {
        let name = call.name.original().to_uppercase();

        if name == "__FIRST_SCAN" {
            return Ok(Value::Bool(self.first_scan));
        }

        let mut positional = Vec::new();
        let mut named = Vec::new();
        for arg in &call.args {
            let value = self.eval(pou, &arg.value, state)?;
            match &arg.name {
                Some(arg_name) => named.push((arg_name.lower_case().to_owned(), value)),
                None => positional.push(value),
            }
        }

        if let Some(user) = self.registry.pou(&call.name) {
            if user.kind == plx_dsl::common::PouKind::Function {
                return self.call_function(user, positional, named);
            }
        }

        stdlib_call(&name, &positional).map_err(RuntimeFault::new)
    }

    /// Calls a user function: a fresh record per call, inputs bound in
    /// declaration order or by name, the result read from the variable
    /// named after the function.
    fn call_function(
        &self,
        function: &Pou,
        positional: Vec<Value>,
        named: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeFault> {
        let mut record = allocate_instance(function, self.registry);
        for (decl, value) in function.interface.inputs.iter().zip(positional) {
            record.insert(decl.name.lower_case().to_owned(), value);
        }
        for (name, value) in named {
            record.insert(name, value);
        }

        // The function result variable starts at the return type's
        // default.
        let result_key = function.name.lower_case().to_owned();
        if let Some(return_type) = &function.return_type {
            record.insert(result_key.clone(), default_value(return_type, self.registry));
        }

        let statements = match &function.body {
            BodyKind::Statements(statements) => statements,
            _ => {
                return Err(RuntimeFault::new(Fault::TypeError(format!(
                    "function {} has no statement body",
                    function.name
                ))))
            }
        };
        self.exec_body(function, statements, &mut record)
            .map_err(|fault| fault.with_frame(function.name.original().to_owned()))?;

        record
            .remove(&result_key)
            .ok_or_else(|| RuntimeFault::new(Fault::UnknownVariable(result_key)))
    }

    fn read_path(
        &self,
        pou: &Pou,
        path: &VariablePath,
        state: &Record,
    ) -> Result<Value, RuntimeFault> {
        // Subscripts evaluate first, against the same state.
        let resolved_segments = self.resolve_segments(pou, path, state)?;

        let root = path.root().ok_or_else(|| {
            RuntimeFault::new(Fault::TypeError("empty variable path".into()))
        })?;
        let mut current: &Value = state
            .get(root.lower_case())
            .ok_or_else(|| RuntimeFault::new(Fault::UnknownVariable(root.to_string())))?;

        for segment in resolved_segments {
            match segment {
                ResolvedSegment::Field(field) => {
                    current = current
                        .record()
                        .map_err(RuntimeFault::new)?
                        .get(&field)
                        .ok_or_else(|| RuntimeFault::new(Fault::UnknownVariable(field)))?;
                }
                ResolvedSegment::Index(position) => {
                    current = index_array(current, position).map_err(RuntimeFault::new)?;
                }
            }
        }
        Ok(current.clone())
    }

    /// Evaluates the subscripts of a path into concrete positions.
    fn resolve_segments(
        &self,
        pou: &Pou,
        path: &VariablePath,
        state: &Record,
    ) -> Result<Vec<ResolvedSegment>, RuntimeFault> {
        let mut resolved_segments = Vec::new();
        for segment in &path.segments[1..] {
            match segment {
                PathSegment::Field(field) => {
                    resolved_segments.push(ResolvedSegment::Field(field.lower_case().to_owned()))
                }
                PathSegment::Index(index) => {
                    for subscript in &index.subscripts {
                        let position = self.eval(pou, subscript, state)?.as_int()?;
                        resolved_segments.push(ResolvedSegment::Index(position));
                    }
                }
                PathSegment::Deref => {
                    return Err(RuntimeFault::new(Fault::TypeError(
                        "dereference is not simulated".into(),
                    )))
                }
            }
        }
        Ok(resolved_segments)
    }

    fn write_path(
        &self,
        pou: &Pou,
        path: &VariablePath,
        value: Value,
        state: &mut Record,
    ) -> Result<(), RuntimeFault> {
        // Subscripts are evaluated up front against the pre-write
        // state.
        let resolved_segments = self.resolve_segments(pou, path, state)?;

        let root = path.root().ok_or_else(|| {
            RuntimeFault::new(Fault::TypeError("empty variable path".into()))
        })?;
        let mut current = state
            .get_mut(root.lower_case())
            .ok_or_else(|| RuntimeFault::new(Fault::UnknownVariable(root.to_string())))?;

        for segment in resolved_segments {
            match segment {
                ResolvedSegment::Field(field) => {
                    current = current
                        .record_mut()
                        .map_err(RuntimeFault::new)?
                        .get_mut(&field)
                        .ok_or_else(|| RuntimeFault::new(Fault::UnknownVariable(field)))?;
                }
                ResolvedSegment::Index(position) => {
                    current = index_array_mut(current, position).map_err(RuntimeFault::new)?;
                }
            }
        }

        *current = value;
        Ok(())
    }
}

enum ResolvedSegment {
    Field(String),
    Index(i64),
}

fn index_array(value: &Value, position: i64) -> Result<&Value, Fault> {
    match value {
        Value::Array(array) => {
            if position < array.lower || position > array.upper() {
                return Err(Fault::IndexOutOfBounds {
                    index: position,
                    lower: array.lower,
                    upper: array.upper(),
                });
            }
            Ok(&array.elements[(position - array.lower) as usize])
        }
        other => Err(Fault::TypeError(format!("cannot index {other:?}"))),
    }
}

fn index_array_mut(value: &mut Value, position: i64) -> Result<&mut Value, Fault> {
    match value {
        Value::Array(array) => {
            if position < array.lower || position > array.upper() {
                return Err(Fault::IndexOutOfBounds {
                    index: position,
                    lower: array.lower,
                    upper: array.upper(),
                });
            }
            let offset = (position - array.lower) as usize;
            Ok(&mut array.elements[offset])
        }
        other => Err(Fault::TypeError(format!("cannot index {other:?}"))),
    }
}

fn eval_binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, Fault> {
    use BinaryOp::*;

    // Duration arithmetic stays in the duration domain.
    if let (Value::Duration(l), Value::Duration(r)) = (&left, &right) {
        match op {
            Add => return Ok(Value::Duration(l + r)),
            Sub => return Ok(Value::Duration(l - r)),
            _ => {}
        }
    }

    match op {
        Add | Sub | Mul | Div | Mod | Pow => {
            if left.is_real() || right.is_real() {
                let l = left.as_real()?;
                let r = right.as_real()?;
                let result = match op {
                    Add => l + r,
                    Sub => l - r,
                    Mul => l * r,
                    Div => {
                        if r == 0.0 {
                            return Err(Fault::DivisionByZero);
                        }
                        l / r
                    }
                    Mod => {
                        if r == 0.0 {
                            return Err(Fault::DivisionByZero);
                        }
                        l % r
                    }
                    Pow => l.powf(r),
                    _ => unreachable!(),
                };
                Ok(Value::Real(result))
            } else {
                let l = left.as_int()?;
                let r = right.as_int()?;
                let result = match op {
                    Add => l.wrapping_add(r),
                    Sub => l.wrapping_sub(r),
                    Mul => l.wrapping_mul(r),
                    Div => {
                        if r == 0 {
                            return Err(Fault::DivisionByZero);
                        }
                        l / r
                    }
                    Mod => {
                        if r == 0 {
                            return Err(Fault::DivisionByZero);
                        }
                        l % r
                    }
                    Pow => {
                        if r < 0 {
                            return Ok(Value::Real((l as f64).powi(r as i32)));
                        }
                        l.pow(r.min(u32::MAX as i64) as u32)
                    }
                    _ => unreachable!(),
                };
                Ok(Value::Int(result))
            }
        }
        BitAnd | BitOr | BitXor => match (&left, &right) {
            (Value::Bool(l), Value::Bool(r)) => {
                let result = match op {
                    BitAnd => l & r,
                    BitOr => l | r,
                    BitXor => l ^ r,
                    _ => unreachable!(),
                };
                Ok(Value::Bool(result))
            }
            _ => {
                let l = left.as_int()?;
                let r = right.as_int()?;
                let result = match op {
                    BitAnd => l & r,
                    BitOr => l | r,
                    BitXor => l ^ r,
                    _ => unreachable!(),
                };
                Ok(Value::Int(result))
            }
        },
        Shl => Ok(Value::Int(left.as_int()?.wrapping_shl(right.as_int()? as u32))),
        Shr => Ok(Value::Int(left.as_int()?.wrapping_shr(right.as_int()? as u32))),
    }
}

fn eval_compare(op: CompareOp, left: Value, right: Value) -> Result<Value, Fault> {
    let result = match op {
        CompareOp::Eq => values_equal(&left, &right)?,
        CompareOp::Ne => !values_equal(&left, &right)?,
        CompareOp::Lt | CompareOp::Gt | CompareOp::LtEq | CompareOp::GtEq => {
            let ordering = compare_order(&left, &right)?;
            match op {
                CompareOp::Lt => ordering.is_lt(),
                CompareOp::Gt => ordering.is_gt(),
                CompareOp::LtEq => ordering.is_le(),
                CompareOp::GtEq => ordering.is_ge(),
                _ => unreachable!(),
            }
        }
    };
    Ok(Value::Bool(result))
}

fn compare_order(left: &Value, right: &Value) -> Result<std::cmp::Ordering, Fault> {
    use std::cmp::Ordering;
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => Ok(l.cmp(r)),
        (Value::Duration(l), Value::Duration(r)) => Ok(l.cmp(r)),
        (Value::Str(l), Value::Str(r)) => Ok(l.cmp(r)),
        _ => {
            let l = left.as_real()?;
            let r = right.as_real()?;
            l.partial_cmp(&r)
                .ok_or_else(|| Fault::TypeError("comparison is unordered".into()))
        }
    }
}

/// Standard library functions evaluated natively.
fn stdlib_call(name: &str, args: &[Value]) -> Result<Value, Fault> {
    let arg = |index: usize| -> Result<&Value, Fault> {
        args.get(index)
            .ok_or_else(|| Fault::TypeError(format!("{name} is missing argument {index}")))
    };

    // Explicit conversions have the form SOURCE_TO_TARGET.
    if let Some((_, target)) = name.split_once("_TO_") {
        let value = arg(0)?;
        return match target {
            "REAL" | "LREAL" => Ok(Value::Real(value.as_real()?)),
            "TIME" => Ok(Value::Duration(value.as_int()?)),
            "BOOL" => Ok(Value::Bool(value.as_int()? != 0)),
            _ => match value {
                // Float to integer conversion rounds to nearest.
                Value::Real(real) => Ok(Value::Int(real.round() as i64)),
                other => Ok(Value::Int(other.as_int()?)),
            },
        };
    }

    match name {
        "ABS" => match arg(0)? {
            Value::Int(value) => Ok(Value::Int(value.abs())),
            Value::Real(value) => Ok(Value::Real(value.abs())),
            Value::Duration(value) => Ok(Value::Duration(value.abs())),
            other => Err(Fault::TypeError(format!("ABS of {other:?}"))),
        },
        "MIN" => fold_extremum(args, false),
        "MAX" => fold_extremum(args, true),
        "LIMIT" => {
            let low = arg(0)?;
            let value = arg(1)?;
            let high = arg(2)?;
            let clamped = if compare_order(value, low)?.is_lt() {
                low.clone()
            } else if compare_order(value, high)?.is_gt() {
                high.clone()
            } else {
                value.clone()
            };
            Ok(clamped)
        }
        "SEL" => {
            if arg(0)?.as_bool()? {
                Ok(arg(2)?.clone())
            } else {
                Ok(arg(1)?.clone())
            }
        }
        "MUX" => {
            let index = arg(0)?.as_int()?;
            let choices = &args[1..];
            if choices.is_empty() {
                return Err(Fault::TypeError("MUX needs at least one choice".into()));
            }
            let position = (index.max(0) as usize).min(choices.len() - 1);
            Ok(choices[position].clone())
        }
        "TRUNC" => Ok(Value::Int(arg(0)?.as_real()? as i64)),
        "ROUND" => Ok(Value::Int(arg(0)?.as_real()?.round() as i64)),
        "SQRT" => Ok(Value::Real(arg(0)?.as_real()?.sqrt())),
        "LN" => Ok(Value::Real(arg(0)?.as_real()?.ln())),
        "LOG" => Ok(Value::Real(arg(0)?.as_real()?.log10())),
        "EXP" => Ok(Value::Real(arg(0)?.as_real()?.exp())),
        "EXPT" => Ok(Value::Real(arg(0)?.as_real()?.powf(arg(1)?.as_real()?))),
        "SIN" => Ok(Value::Real(arg(0)?.as_real()?.sin())),
        "COS" => Ok(Value::Real(arg(0)?.as_real()?.cos())),
        "TAN" => Ok(Value::Real(arg(0)?.as_real()?.tan())),
        "ASIN" => Ok(Value::Real(arg(0)?.as_real()?.asin())),
        "ACOS" => Ok(Value::Real(arg(0)?.as_real()?.acos())),
        "ATAN" => Ok(Value::Real(arg(0)?.as_real()?.atan())),
        "SHL" => Ok(Value::Int(
            arg(0)?.as_int()?.wrapping_shl(arg(1)?.as_int()? as u32),
        )),
        "SHR" => Ok(Value::Int(
            arg(0)?.as_int()?.wrapping_shr(arg(1)?.as_int()? as u32),
        )),
        other => Err(Fault::TypeError(format!("unknown function {other}"))),
    }
}

fn fold_extremum(args: &[Value], want_max: bool) -> Result<Value, Fault> {
    let mut best = args
        .first()
        .ok_or_else(|| Fault::TypeError("MIN/MAX need arguments".into()))?
        .clone();
    for candidate in &args[1..] {
        let ordering = compare_order(candidate, &best)?;
        if (want_max && ordering.is_gt()) || (!want_max && ordering.is_lt()) {
            best = candidate.clone();
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plx_dsl::common::{Interface, VarDecl};
    use plx_dsl::textual::ExprKind;

    fn executor(registry: &Registry) -> Executor {
        Executor::new(registry, 0, false)
    }

    fn pou_with_ints() -> (Pou, Record) {
        let mut interface = Interface::new();
        interface.statics.push(VarDecl::int("a"));
        interface.statics.push(VarDecl::int("b"));
        interface.statics.push(VarDecl::real("x"));
        let pou = Pou::function_block("Test").with_interface(interface);
        let record = allocate_instance(&pou, &Registry::new());
        (pou, record)
    }

    #[test]
    fn eval_when_division_by_zero_then_fault() {
        let registry = Registry::new();
        let (pou, state) = pou_with_ints();
        let expr = ExprKind::binary(
            BinaryOp::Div,
            ExprKind::const_integer(1),
            ExprKind::named_variable("a"),
        );
        let fault = executor(&registry).eval(&pou, &expr, &state).unwrap_err();
        assert_eq!(fault.fault, Fault::DivisionByZero);
    }

    #[test]
    fn eval_when_short_circuit_then_right_not_evaluated() {
        let registry = Registry::new();
        let (pou, state) = pou_with_ints();
        // The right operand would fault with division by zero if it
        // were evaluated.
        let poison = ExprKind::compare(
            CompareOp::Gt,
            ExprKind::binary(
                BinaryOp::Div,
                ExprKind::const_integer(1),
                ExprKind::named_variable("a"),
            ),
            ExprKind::const_integer(0),
        );
        let expr = ExprKind::logic(LogicOp::And, ExprKind::const_bool(false), poison);
        let value = executor(&registry).eval(&pou, &expr, &state).unwrap();
        assert_eq!(value, Value::Bool(false));
    }

    #[test]
    fn exec_when_for_loop_then_inclusive_bounds() {
        let registry = Registry::new();
        let (mut pou, mut state) = pou_with_ints();
        state.insert("i".into(), Value::Int(0));
        pou.body = BodyKind::Statements(vec![StmtKind::For(plx_dsl::textual::For {
            control: Id::from("i"),
            from: ExprKind::const_integer(1),
            to: ExprKind::const_integer(4),
            step: None,
            body: vec![StmtKind::simple_assignment(
                "a",
                ExprKind::binary(
                    BinaryOp::Add,
                    ExprKind::named_variable("a"),
                    ExprKind::named_variable("i"),
                ),
            )],
        })]);
        executor(&registry).scan(&pou, &mut state).unwrap();
        assert_eq!(state["a"], Value::Int(10));
    }

    #[test]
    fn exec_when_array_index_out_of_bounds_then_fault() {
        use plx_dsl::common::Dimension;
        let registry = Registry::new();
        let mut interface = Interface::new();
        interface.statics.push(VarDecl::new(
            "values",
            TypeRef::array(TypeRef::INT, vec![Dimension::new(1, 3).unwrap()]),
        ));
        let pou = Pou::function_block("Test")
            .with_interface(interface)
            .with_body(vec![StmtKind::Assignment(plx_dsl::textual::Assignment {
                target: VariablePath::named("values").index(vec![ExprKind::const_integer(4)]),
                value: ExprKind::const_integer(9),
            })]);
        let mut state = allocate_instance(&pou, &registry);

        let fault = executor(&registry).scan(&pou, &mut state).unwrap_err();
        assert_eq!(
            fault.fault,
            Fault::IndexOutOfBounds {
                index: 4,
                lower: 1,
                upper: 3
            }
        );
    }

    #[test]
    fn exec_when_case_range_then_matching_arm_runs() {
        let registry = Registry::new();
        let (mut pou, mut state) = pou_with_ints();
        state.insert("a".into(), Value::Int(25));
        let case = Case::new(
            ExprKind::named_variable("a"),
            vec![
                plx_dsl::textual::CaseArm {
                    selectors: vec![CaseSelector::Range(plx_dsl::textual::CaseRange {
                        start: 20,
                        end: 29,
                    })],
                    body: vec![StmtKind::simple_assignment("b", ExprKind::const_integer(2))],
                },
            ],
            vec![StmtKind::simple_assignment("b", ExprKind::const_integer(9))],
        )
        .unwrap();
        pou.body = BodyKind::Statements(vec![StmtKind::Case(case)]);

        executor(&registry).scan(&pou, &mut state).unwrap();
        assert_eq!(state["b"], Value::Int(2));
    }

    #[test]
    fn exec_when_fb_call_then_nested_record_updated() {
        let registry = Registry::new();
        let mut interface = Interface::new();
        interface.inputs.push(VarDecl::bool("cmd"));
        interface.statics.push(VarDecl::instance("edge", "R_TRIG"));
        let pou = Pou::function_block("Test")
            .with_interface(interface)
            .with_body(vec![StmtKind::fb_call(
                VariablePath::named("edge"),
                vec![plx_dsl::textual::NamedInput::new(
                    "CLK",
                    ExprKind::named_variable("cmd"),
                )],
            )]);
        let mut state = allocate_instance(&pou, &registry);
        state.insert("cmd".into(), Value::Bool(true));

        executor(&registry).scan(&pou, &mut state).unwrap();
        let edge = state["edge"].record().unwrap();
        assert_eq!(edge["q"], Value::Bool(true));
    }

    #[test]
    fn stdlib_when_limit_then_clamped() {
        assert_eq!(
            stdlib_call("LIMIT", &[Value::Int(0), Value::Int(12), Value::Int(10)]).unwrap(),
            Value::Int(10)
        );
        assert_eq!(
            stdlib_call("LIMIT", &[Value::Int(0), Value::Int(5), Value::Int(10)]).unwrap(),
            Value::Int(5)
        );
    }

    #[test]
    fn stdlib_when_conversion_then_rounds() {
        assert_eq!(
            stdlib_call("REAL_TO_INT", &[Value::Real(2.5)]).unwrap(),
            Value::Int(3)
        );
        assert_eq!(
            stdlib_call("TRUNC", &[Value::Real(2.9)]).unwrap(),
            Value::Int(2)
        );
    }
}
