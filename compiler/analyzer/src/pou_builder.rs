//! Builders that register POU definitions and compile them
//! immediately: the declaration surface of the compiler.
//!
//! A builder collects variable descriptors in declaration order
//! together with the verbatim source of the logic body (or a chart).
//! `build` materializes the interface, parses and lowers the body, and
//! attaches the resulting IR. The builder is consumed; the produced
//! `Pou` is immutable.
use log::debug;

use plx_dsl::common::{BodyKind, Pou, PouKind, TypeRef};
use plx_dsl::core::{FileId, Id};
use plx_dsl::diagnostic::{Diagnostic, Label};
use plx_dsl::sfc::{Chart, Step, Transition};
use plx_dsl::textual::ExprKind;
use plx_problems::Problem;

use crate::descriptors::{
    constant_var, input_var, inout_var, materialize, output_var, static_var, temp_var, VarSpec,
};
use crate::environment::TypeEnvironment;
use crate::lower::{lower_logic, Lowerer};
use crate::typecheck::Scope;

/// Builder for a sequential function chart body.
///
/// Step actions and transition conditions are authored source text,
/// lowered in the enclosing POU's scope.
#[derive(Debug, Clone, Default)]
pub struct ChartBuilder {
    steps: Vec<(String, bool, Option<String>)>,
    transitions: Vec<(String, String, String)>,
}

impl ChartBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the initial step. Exactly one step must be initial.
    pub fn initial_step(mut self, name: &str) -> Self {
        self.steps.push((name.to_owned(), true, None));
        self
    }

    pub fn step(mut self, name: &str) -> Self {
        self.steps.push((name.to_owned(), false, None));
        self
    }

    /// Adds a step whose actions are the given logic source.
    pub fn step_with_actions(mut self, name: &str, actions: &str) -> Self {
        self.steps
            .push((name.to_owned(), false, Some(actions.to_owned())));
        self
    }

    pub fn initial_step_with_actions(mut self, name: &str, actions: &str) -> Self {
        self.steps
            .push((name.to_owned(), true, Some(actions.to_owned())));
        self
    }

    /// Adds a transition guarded by the given condition source.
    pub fn transition(mut self, source: &str, target: &str, condition: &str) -> Self {
        self.transitions
            .push((source.to_owned(), target.to_owned(), condition.to_owned()));
        self
    }

    fn build(self, lowerer: &mut Lowerer, file_id: &FileId) -> Result<Chart, Vec<Diagnostic>> {
        let mut diagnostics = Vec::new();

        let mut steps = Vec::new();
        for (name, initial, actions) in &self.steps {
            let lowered_actions = match actions {
                Some(source) => match plx_parser::parse_logic(source, file_id) {
                    Ok(suite) => lowerer.lower_suite(&suite),
                    Err(mut errors) => {
                        diagnostics.append(&mut errors);
                        vec![]
                    }
                },
                None => vec![],
            };
            steps.push(Step {
                name: Id::from(name),
                initial: *initial,
                actions: lowered_actions,
            });
        }

        let mut transitions = Vec::new();
        for (source, target, condition) in &self.transitions {
            match self.lower_condition(lowerer, condition, file_id) {
                Ok(condition) => {
                    transitions.push(Transition::new(source, target, condition));
                }
                Err(mut errors) => diagnostics.append(&mut errors),
            }
        }

        diagnostics.extend(std::mem::take(&mut lowerer.diagnostics));
        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }

        Chart::new(steps, transitions)
    }

    fn lower_condition(
        &self,
        lowerer: &mut Lowerer,
        source: &str,
        file_id: &FileId,
    ) -> Result<ExprKind, Vec<Diagnostic>> {
        let expr = plx_parser::parse_expression(source, file_id)?;
        let lowered = lowerer.lower_expression(&expr).map_err(|d| vec![d])?;
        if !lowerer.pending.is_empty() {
            lowerer.pending.clear();
            return Err(vec![Diagnostic::problem(
                Problem::SyntaxUnsupported,
                Label::span(expr.span(), "Transition condition"),
            )
            .with_context("reason", "sentinel helpers are not allowed in conditions")]);
        }
        Ok(lowered)
    }
}

/// Builder for a program organization unit.
pub struct PouBuilder {
    kind: PouKind,
    name: String,
    return_type: Option<TypeRef>,
    parent: Option<String>,
    specs: Vec<(String, VarSpec)>,
    logic_source: Option<String>,
    chart: Option<ChartBuilder>,
    methods: Vec<(String, Option<TypeRef>, String)>,
}

impl PouBuilder {
    pub fn function_block(name: &str) -> Self {
        Self {
            kind: PouKind::FunctionBlock,
            name: name.to_owned(),
            return_type: None,
            parent: None,
            specs: Vec::new(),
            logic_source: None,
            chart: None,
            methods: Vec::new(),
        }
    }

    pub fn program(name: &str) -> Self {
        Self {
            kind: PouKind::Program,
            ..PouBuilder::function_block(name)
        }
    }

    pub fn function(name: &str, return_type: TypeRef) -> Self {
        Self {
            kind: PouKind::Function,
            return_type: Some(return_type),
            ..PouBuilder::function_block(name)
        }
    }

    /// Declares a variable from an explicit descriptor.
    pub fn declare(mut self, name: &str, spec: VarSpec) -> Self {
        self.specs.push((name.to_owned(), spec));
        self
    }

    pub fn input(self, name: &str, type_ref: TypeRef) -> Self {
        self.declare(name, input_var(type_ref))
    }

    pub fn output(self, name: &str, type_ref: TypeRef) -> Self {
        self.declare(name, output_var(type_ref))
    }

    pub fn inout(self, name: &str, type_ref: TypeRef) -> Self {
        self.declare(name, inout_var(type_ref))
    }

    pub fn static_(self, name: &str, type_ref: TypeRef) -> Self {
        self.declare(name, static_var(type_ref))
    }

    pub fn temp(self, name: &str, type_ref: TypeRef) -> Self {
        self.declare(name, temp_var(type_ref))
    }

    pub fn constant(
        self,
        name: &str,
        type_ref: TypeRef,
        initial: plx_dsl::common::ConstantKind,
    ) -> Self {
        self.declare(name, constant_var(type_ref, initial))
    }

    /// Sets the parent function block for EXTENDS-style inheritance.
    pub fn extends(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_owned());
        self
    }

    /// Attaches the verbatim logic source. Registering the POU lowers
    /// the source immediately.
    pub fn logic(mut self, source: &str) -> Self {
        self.logic_source = Some(source.to_owned());
        self
    }

    /// Attaches a chart body instead of textual logic.
    pub fn chart(mut self, chart: ChartBuilder) -> Self {
        self.chart = Some(chart);
        self
    }

    /// Adds a method: an inner function whose body may read and
    /// assign the enclosing function block's variables.
    pub fn method(mut self, name: &str, return_type: Option<TypeRef>, source: &str) -> Self {
        self.methods
            .push((name.to_owned(), return_type, source.to_owned()));
        self
    }

    /// Compiles the definition into an immutable POU.
    ///
    /// The environment provides the data types (for enumeration
    /// references) and any already-registered POUs.
    pub fn build(self, env: &TypeEnvironment) -> Result<Pou, Vec<Diagnostic>> {
        debug!("building {} {}", self.kind, self.name);
        let file_id = FileId::from_string(&format!("<{}>", self.name));
        let pou_name = Id::from(&self.name);

        let mut interface = materialize(self.specs)?;

        let scope = match (&self.kind, &self.return_type) {
            (PouKind::Function, Some(return_type)) => {
                Scope::for_function(&interface, &pou_name, return_type)
            }
            _ => Scope::from_interface(&interface),
        };

        let body = match (self.logic_source, self.chart) {
            (Some(_), Some(_)) => {
                return Err(vec![Diagnostic::problem(
                    Problem::SyntaxUnsupported,
                    Label::file(file_id, "A POU has either logic or a chart, not both"),
                )]);
            }
            (Some(source), None) => {
                let lowered = lower_logic(
                    &source,
                    &file_id,
                    scope,
                    env,
                    self.kind,
                    &pou_name,
                    self.parent.is_some(),
                )?;
                interface.statics.extend(lowered.synthesized_statics);
                interface.temps.extend(lowered.synthesized_temps);
                BodyKind::Statements(lowered.statements)
            }
            (None, Some(chart)) => {
                let mut lowerer =
                    Lowerer::new(scope, env, self.kind, pou_name.clone(), self.parent.is_some());
                let chart = chart.build(&mut lowerer, &file_id)?;
                let (statics, temps) = lowerer.drain_synthesized();
                interface.statics.extend(statics);
                interface.temps.extend(temps);
                BodyKind::Chart(chart)
            }
            (None, None) => {
                // A function without a body can never produce its
                // result.
                if self.kind == PouKind::Function {
                    return Err(vec![Diagnostic::problem(
                        Problem::SourceUnavailable,
                        Label::file(file_id, "Function has no logic source"),
                    )]);
                }
                BodyKind::Empty
            }
        };

        let mut methods = Vec::new();
        for (method_name, return_type, source) in &self.methods {
            if self.kind != PouKind::FunctionBlock {
                return Err(vec![Diagnostic::problem(
                    Problem::SyntaxUnsupported,
                    Label::file(
                        FileId::from_string(&format!("<{}>", self.name)),
                        "Only function blocks have methods",
                    ),
                )]);
            }
            let method_id = Id::from(method_name);
            let mut method_scope = Scope::from_interface(&interface);
            if let Some(return_type) = return_type {
                method_scope.insert(
                    method_id.clone(),
                    plx_dsl::common::VarRole::Output,
                    return_type.clone(),
                );
            }
            let method_file = FileId::from_string(&format!("<{}.{}>", self.name, method_name));
            let lowered = lower_logic(
                source,
                &method_file,
                method_scope,
                env,
                PouKind::Function,
                &method_id,
                false,
            )?;
            // Timer and edge helpers allocate per-POU instance names;
            // inside methods they would collide with the body's.
            if !lowered.synthesized_statics.is_empty() {
                return Err(vec![Diagnostic::problem(
                    Problem::SyntaxUnsupported,
                    Label::file(method_file, "Sentinel helpers are not allowed in methods"),
                )]);
            }
            methods.push(plx_dsl::common::Method {
                name: method_id,
                return_type: return_type.clone(),
                interface: plx_dsl::common::Interface::new(),
                body: lowered.statements,
            });
        }

        let mut pou = Pou {
            kind: self.kind,
            name: pou_name,
            return_type: self.return_type,
            parent: None,
            interface,
            body,
            methods,
        };
        if let Some(parent) = &self.parent {
            pou = pou.with_parent(parent);
        }
        Ok(pou)
    }

    /// Builds against an empty environment: no user data types and no
    /// other POUs.
    pub fn build_standalone(self) -> Result<Pou, Vec<Diagnostic>> {
        self.build(&TypeEnvironment::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plx_dsl::common::{EnumVariantDecl, EnumerationDefinition, TypeDefinitionKind, VarDecl};
    use plx_dsl::textual::StmtKind;

    #[test]
    fn build_when_motor_delay_then_interface_and_body() {
        let pou = PouBuilder::function_block("MotorStarter")
            .input("cmd", TypeRef::BOOL)
            .output("running", TypeRef::BOOL)
            .logic("self.running = delayed(self.cmd, seconds=5)\n")
            .build_standalone()
            .unwrap();

        assert_eq!(pou.kind, PouKind::FunctionBlock);
        assert_eq!(pou.interface.inputs.len(), 1);
        assert_eq!(
            pou.interface.statics,
            vec![VarDecl::instance("__ton_0", "TON")]
        );
        assert_eq!(pou.body.statements().unwrap().len(), 2);
    }

    #[test]
    fn build_when_undeclared_reference_then_errors() {
        let errors = PouBuilder::function_block("Broken")
            .logic("self.out = True\n")
            .build_standalone()
            .unwrap_err();
        assert!(errors[0].is_problem(Problem::NameUnresolved));
    }

    #[test]
    fn build_when_rebuilt_then_structurally_equal() {
        let make = || {
            PouBuilder::function_block("Valve")
                .input("cmd_open", TypeRef::BOOL)
                .input("feedback", TypeRef::BOOL)
                .output("fault", TypeRef::BOOL)
                .logic(
                    "self.fault = delayed(self.cmd_open and not self.feedback, seconds=3)\n",
                )
                .build_standalone()
                .unwrap()
        };
        assert_eq!(make(), make());
    }

    #[test]
    fn build_when_enum_known_then_match_lowers() {
        let types = vec![TypeDefinitionKind::Enumeration(
            EnumerationDefinition::new(
                "Mode",
                vec![
                    EnumVariantDecl::new("Off", 0),
                    EnumVariantDecl::new("Auto", 1),
                ],
            )
            .unwrap(),
        )];
        let env = TypeEnvironment::new().with_data_types(&types);

        let pou = PouBuilder::function_block("ModeHandler")
            .static_("mode", TypeRef::named("Mode"))
            .output("active", TypeRef::BOOL)
            .logic(
                "match self.mode:\n    case Mode.Off:\n        self.active = False\n    case Mode.Auto:\n        self.active = True\n",
            )
            .build(&env)
            .unwrap();

        assert!(matches!(
            pou.body.statements().unwrap()[0],
            StmtKind::Case(_)
        ));
    }

    #[test]
    fn build_when_chart_then_sfc_body() {
        let pou = PouBuilder::function_block("Batch")
            .input("cmd_start", TypeRef::BOOL)
            .input("fill_done", TypeRef::BOOL)
            .output("mixer", TypeRef::BOOL)
            .chart(
                ChartBuilder::new()
                    .initial_step("idle")
                    .step("fill")
                    .step_with_actions("mix", "self.mixer = True\n")
                    .transition("idle", "fill", "self.cmd_start")
                    .transition("fill", "mix", "self.fill_done")
                    .transition("mix", "idle", "not self.cmd_start"),
            )
            .build_standalone()
            .unwrap();

        let chart = pou.body.chart().unwrap();
        assert_eq!(chart.steps.len(), 3);
        assert_eq!(chart.initial_step().name, Id::from("idle"));
    }

    #[test]
    fn build_when_chart_condition_has_sentinel_then_rejected() {
        let errors = PouBuilder::function_block("Batch")
            .input("go", TypeRef::BOOL)
            .chart(
                ChartBuilder::new()
                    .initial_step("idle")
                    .step("run")
                    .transition("idle", "run", "delayed(self.go, seconds=1)")
                    .transition("run", "idle", "not self.go"),
            )
            .build_standalone()
            .unwrap_err();
        assert!(errors[0].is_problem(Problem::SyntaxUnsupported));
    }

    #[test]
    fn build_when_function_then_return_assigns_result() {
        let pou = PouBuilder::function("Clamp", TypeRef::DINT)
            .input("value", TypeRef::DINT)
            .input("limit", TypeRef::DINT)
            .logic(
                "if self.value > self.limit:\n    return self.limit\nreturn self.value\n",
            )
            .build_standalone()
            .unwrap();

        assert_eq!(pou.kind, PouKind::Function);
        let body = pou.body.statements().unwrap();
        // The trailing return lowers to an assignment plus RETURN.
        assert!(matches!(body[body.len() - 1], StmtKind::Return(_)));
        assert!(matches!(body[body.len() - 2], StmtKind::Assignment(_)));
    }

    #[test]
    fn build_when_function_without_body_then_source_unavailable() {
        let errors = PouBuilder::function("Clamp", TypeRef::DINT)
            .input("value", TypeRef::DINT)
            .build_standalone()
            .unwrap_err();
        assert!(errors[0].is_problem(Problem::SourceUnavailable));
    }

    #[test]
    fn build_when_method_then_lowered_in_enclosing_scope() {
        let pou = PouBuilder::function_block("Tank")
            .static_("level", TypeRef::REAL)
            .method(
                "is_full",
                Some(TypeRef::BOOL),
                "return self.level > 95.0\n",
            )
            .build_standalone()
            .unwrap();

        assert_eq!(pou.methods.len(), 1);
        assert_eq!(pou.methods[0].name, Id::from("is_full"));
        assert!(!pou.methods[0].body.is_empty());
    }

    #[test]
    fn build_when_method_uses_sentinel_then_rejected() {
        let errors = PouBuilder::function_block("Tank")
            .static_("level", TypeRef::REAL)
            .method(
                "warmed_up",
                Some(TypeRef::BOOL),
                "return delayed(self.level > 10.0, seconds=1)\n",
            )
            .build_standalone()
            .unwrap_err();
        assert!(errors[0].is_problem(Problem::SyntaxUnsupported));
    }

    #[test]
    fn build_when_super_with_parent_then_marker_kept() {
        let pou = PouBuilder::function_block("Child")
            .output("extra", TypeRef::BOOL)
            .extends("Parent")
            .logic("super().logic()\nself.extra = True\n")
            .build_standalone()
            .unwrap();

        assert_eq!(pou.parent, Some(plx_dsl::common::TypeName::from("Parent")));
        assert!(matches!(
            pou.body.statements().unwrap()[0],
            StmtKind::SuperCall
        ));
    }
}
