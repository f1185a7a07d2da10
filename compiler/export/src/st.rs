//! Renders project IR to IEC 61131-3 Structured Text.
//!
//! The textual form is the vendor-neutral body syntax every target
//! consumes; the vendor XML wrappers around it are external
//! collaborators. The renderer is also the easiest way to inspect
//! what the compiler produced.
use plx_dsl::common::*;
use plx_dsl::core::SourceSpan;
use plx_dsl::diagnostic::{Diagnostic, Label};
use plx_dsl::project::{Project, ScheduleKind, Task};
use plx_dsl::sfc::Chart;
use plx_dsl::textual::*;
use plx_problems::Problem;

/// Renders a whole project: data types, POUs, global blocks and a
/// configuration section for the tasks.
pub fn apply(project: &Project) -> Result<String, Vec<Diagnostic>> {
    let mut renderer = StRenderer::new();
    renderer.render_project(project).map_err(|e| vec![e])?;
    Ok(renderer.buffer)
}

/// Renders a single POU.
pub fn render_pou(pou: &Pou) -> Result<String, Vec<Diagnostic>> {
    let mut renderer = StRenderer::new();
    renderer.pou(pou).map_err(|e| vec![e])?;
    Ok(renderer.buffer)
}

struct StRenderer {
    buffer: String,
    indent: usize,
}

impl StRenderer {
    fn new() -> Self {
        Self {
            buffer: String::new(),
            indent: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.buffer.push_str("    ");
        }
        self.buffer.push_str(text);
        self.buffer.push('\n');
    }

    fn blank(&mut self) {
        self.buffer.push('\n');
    }

    fn render_project(&mut self, project: &Project) -> Result<(), Diagnostic> {
        if !project.data_types.is_empty() {
            self.line("TYPE");
            self.indent += 1;
            for data_type in &project.data_types {
                self.data_type(data_type)?;
            }
            self.indent -= 1;
            self.line("END_TYPE");
            self.blank();
        }

        for global in &project.globals {
            self.line(&format!("VAR_GLOBAL (* {} *)", global.name));
            self.indent += 1;
            for decl in &global.variables {
                self.var_decl(decl)?;
            }
            self.indent -= 1;
            self.line("END_VAR");
            self.blank();
        }

        for pou in &project.pous {
            self.pou(pou)?;
            self.blank();
        }

        if !project.tasks.is_empty() {
            self.configuration(project)?;
        }
        Ok(())
    }

    fn data_type(&mut self, data_type: &TypeDefinitionKind) -> Result<(), Diagnostic> {
        match data_type {
            TypeDefinitionKind::Structure(def) => {
                self.line(&format!("{} : STRUCT", def.type_name));
                self.indent += 1;
                for member in &def.members {
                    let initial = match &member.initial {
                        Some(initial) => format!(" := {}", render_constant(initial)),
                        None => String::new(),
                    };
                    self.line(&format!("{} : {}{};", member.name, member.type_ref, initial));
                }
                self.indent -= 1;
                self.line("END_STRUCT;");
            }
            TypeDefinitionKind::Enumeration(def) => {
                let variants: Vec<String> = def
                    .variants
                    .iter()
                    .map(|v| format!("{} := {}", v.name, v.value))
                    .collect();
                self.line(&format!("{} : ({});", def.type_name, variants.join(", ")));
            }
            TypeDefinitionKind::Alias(def) => {
                self.line(&format!("{} : {};", def.type_name, def.target));
            }
            TypeDefinitionKind::Subrange(def) => {
                self.line(&format!(
                    "{} : {} ({}..{});",
                    def.type_name, def.base, def.lower, def.upper
                ));
            }
        }
        Ok(())
    }

    fn pou(&mut self, pou: &Pou) -> Result<(), Diagnostic> {
        let header = match (&pou.kind, &pou.return_type) {
            (PouKind::Function, Some(return_type)) => {
                format!("FUNCTION {} : {}", pou.name, return_type)
            }
            _ => {
                let extends = match &pou.parent {
                    Some(parent) => format!(" EXTENDS {}", parent),
                    None => String::new(),
                };
                format!("{} {}{}", pou.kind, pou.name, extends)
            }
        };
        self.line(&header);

        self.interface(&pou.interface)?;

        match &pou.body {
            BodyKind::Statements(statements) => {
                self.indent += 1;
                self.statements(statements)?;
                self.indent -= 1;
            }
            BodyKind::Chart(chart) => self.chart(chart)?,
            BodyKind::Empty => {}
        }

        for method in &pou.methods {
            self.method(method)?;
        }

        let footer = match pou.kind {
            PouKind::Function => "END_FUNCTION",
            PouKind::FunctionBlock => "END_FUNCTION_BLOCK",
            PouKind::Program => "END_PROGRAM",
        };
        self.line(footer);
        Ok(())
    }

    fn method(&mut self, method: &Method) -> Result<(), Diagnostic> {
        let header = match &method.return_type {
            Some(return_type) => format!("METHOD {} : {}", method.name, return_type),
            None => format!("METHOD {}", method.name),
        };
        self.line(&header);
        self.interface(&method.interface)?;
        self.indent += 1;
        self.statements(&method.body)?;
        self.indent -= 1;
        self.line("END_METHOD");
        Ok(())
    }

    fn interface(&mut self, interface: &Interface) -> Result<(), Diagnostic> {
        let blocks: [(VarRole, &Vec<VarDecl>); 6] = [
            (VarRole::Input, &interface.inputs),
            (VarRole::Output, &interface.outputs),
            (VarRole::InOut, &interface.inouts),
            (VarRole::Static, &interface.statics),
            (VarRole::Temp, &interface.temps),
            (VarRole::Constant, &interface.constants),
        ];
        for (role, decls) in blocks {
            if decls.is_empty() {
                continue;
            }
            self.line(&role.to_string());
            self.indent += 1;
            for decl in decls {
                self.var_decl(decl)?;
            }
            self.indent -= 1;
            self.line("END_VAR");
        }
        Ok(())
    }

    fn var_decl(&mut self, decl: &VarDecl) -> Result<(), Diagnostic> {
        let initial = match &decl.initial {
            Some(initial) => format!(" := {}", render_constant(initial)),
            None => String::new(),
        };
        let comment = if decl.description.is_empty() {
            String::new()
        } else {
            format!(" (* {} *)", decl.description)
        };
        self.line(&format!(
            "{} : {}{};{}",
            decl.name, decl.type_ref, initial, comment
        ));
        Ok(())
    }

    fn chart(&mut self, chart: &Chart) -> Result<(), Diagnostic> {
        for step in &chart.steps {
            let keyword = if step.initial { "INITIAL_STEP" } else { "STEP" };
            self.line(&format!("{} {}:", keyword, step.name));
            self.indent += 1;
            self.statements(&step.actions)?;
            self.indent -= 1;
            self.line("END_STEP");
        }
        for transition in &chart.transitions {
            self.line(&format!(
                "TRANSITION FROM {} TO {}",
                transition.source, transition.target
            ));
            self.indent += 1;
            self.line(&format!(":= {};", render_expr(&transition.condition)?));
            self.indent -= 1;
            self.line("END_TRANSITION");
        }
        Ok(())
    }

    fn statements(&mut self, statements: &[StmtKind]) -> Result<(), Diagnostic> {
        for statement in statements {
            self.statement(statement)?;
        }
        Ok(())
    }

    fn statement(&mut self, statement: &StmtKind) -> Result<(), Diagnostic> {
        match statement {
            StmtKind::Assignment(assignment) => {
                let target = render_path(&assignment.target)?;
                let value = render_expr(&assignment.value)?;
                self.line(&format!("{} := {};", target, value));
            }
            StmtKind::If(if_stmt) => {
                for (position, branch) in if_stmt.branches.iter().enumerate() {
                    let keyword = if position == 0 { "IF" } else { "ELSIF" };
                    self.line(&format!(
                        "{} {} THEN",
                        keyword,
                        render_expr(&branch.condition)?
                    ));
                    self.indent += 1;
                    self.statements(&branch.body)?;
                    self.indent -= 1;
                }
                if !if_stmt.else_body.is_empty() {
                    self.line("ELSE");
                    self.indent += 1;
                    self.statements(&if_stmt.else_body)?;
                    self.indent -= 1;
                }
                self.line("END_IF;");
            }
            StmtKind::Case(case) => {
                self.line(&format!("CASE {} OF", render_expr(&case.selector)?));
                self.indent += 1;
                for arm in &case.arms {
                    let selectors: Vec<String> =
                        arm.selectors.iter().map(render_case_selector).collect();
                    self.line(&format!("{}:", selectors.join(", ")));
                    self.indent += 1;
                    self.statements(&arm.body)?;
                    self.indent -= 1;
                }
                if !case.else_body.is_empty() {
                    self.line("ELSE");
                    self.indent += 1;
                    self.statements(&case.else_body)?;
                    self.indent -= 1;
                }
                self.indent -= 1;
                self.line("END_CASE;");
            }
            StmtKind::For(for_stmt) => {
                let step = match &for_stmt.step {
                    Some(step) => format!(" BY {}", render_expr(step)?),
                    None => String::new(),
                };
                self.line(&format!(
                    "FOR {} := {} TO {}{} DO",
                    for_stmt.control,
                    render_expr(&for_stmt.from)?,
                    render_expr(&for_stmt.to)?,
                    step
                ));
                self.indent += 1;
                self.statements(&for_stmt.body)?;
                self.indent -= 1;
                self.line("END_FOR;");
            }
            StmtKind::While(while_stmt) => {
                self.line(&format!("WHILE {} DO", render_expr(&while_stmt.condition)?));
                self.indent += 1;
                self.statements(&while_stmt.body)?;
                self.indent -= 1;
                self.line("END_WHILE;");
            }
            StmtKind::Repeat(repeat) => {
                self.line("REPEAT");
                self.indent += 1;
                self.statements(&repeat.body)?;
                self.indent -= 1;
                self.line(&format!("UNTIL {}", render_expr(&repeat.until)?));
                self.line("END_REPEAT;");
            }
            StmtKind::FbCall(fb_call) => {
                let inputs: Vec<String> = fb_call
                    .inputs
                    .iter()
                    .map(|input| {
                        Ok(format!("{} := {}", input.name, render_expr(&input.value)?))
                    })
                    .collect::<Result<_, Diagnostic>>()?;
                self.line(&format!(
                    "{}({});",
                    render_path(&fb_call.instance)?,
                    inputs.join(", ")
                ));
            }
            StmtKind::SuperCall => {
                // Only Beckhoff keeps inheritance; the other targets
                // flatten before rendering.
                self.line("SUPER^();");
            }
            StmtKind::Return(_) => self.line("RETURN;"),
            StmtKind::Exit => self.line("EXIT;"),
            StmtKind::Empty => self.line(";"),
        }
        Ok(())
    }

    fn configuration(&mut self, project: &Project) -> Result<(), Diagnostic> {
        self.line(&format!("CONFIGURATION {}", sanitize(&project.name)));
        self.indent += 1;
        for task in &project.tasks {
            self.task(task)?;
        }
        for task in &project.tasks {
            for (position, pou) in task.pous.iter().enumerate() {
                self.line(&format!(
                    "PROGRAM {}_{} WITH {} : {};",
                    pou, position, task.name, pou
                ));
            }
        }
        self.indent -= 1;
        self.line("END_CONFIGURATION");
        Ok(())
    }

    fn task(&mut self, task: &Task) -> Result<(), Diagnostic> {
        let mut properties = Vec::new();
        match &task.schedule {
            ScheduleKind::Periodic(period) => {
                properties.push(format!("INTERVAL := {}", render_duration(period)));
            }
            ScheduleKind::Event(source) => {
                properties.push(format!("SINGLE := {}", source));
            }
            ScheduleKind::Continuous => {}
        }
        if let Some(priority) = task.priority {
            properties.push(format!("PRIORITY := {}", priority));
        }
        self.line(&format!("TASK {} ({});", task.name, properties.join(", ")));
        Ok(())
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

fn render_case_selector(selector: &CaseSelector) -> String {
    match selector {
        CaseSelector::Value(value) => value.to_string(),
        CaseSelector::Range(range) => format!("{}..{}", range.start, range.end),
        CaseSelector::Enumerated(value) => value.to_string(),
    }
}

fn render_path(path: &VariablePath) -> Result<String, Diagnostic> {
    let mut rendered = String::new();
    for (position, segment) in path.segments.iter().enumerate() {
        match segment {
            PathSegment::Field(name) => {
                if position > 0 {
                    rendered.push('.');
                }
                rendered.push_str(name.original());
            }
            PathSegment::Index(index) => {
                let subscripts: Vec<String> = index
                    .subscripts
                    .iter()
                    .map(render_expr)
                    .collect::<Result<_, Diagnostic>>()?;
                rendered.push('[');
                rendered.push_str(&subscripts.join(", "));
                rendered.push(']');
            }
            PathSegment::Deref => rendered.push('^'),
        }
    }
    Ok(rendered)
}

fn render_constant(constant: &ConstantKind) -> String {
    match constant {
        ConstantKind::Bool(literal) => {
            if literal.value {
                "TRUE".to_owned()
            } else {
                "FALSE".to_owned()
            }
        }
        ConstantKind::Integer(literal) => literal.value.to_string(),
        ConstantKind::Real(literal) => {
            let rendered = literal.value.to_string();
            if rendered.contains('.') || rendered.contains('e') {
                rendered
            } else {
                format!("{}.0", rendered)
            }
        }
        ConstantKind::BitString(literal) => format!("16#{:X}", literal.value),
        ConstantKind::CharacterString(literal) => {
            if literal.wide {
                format!("\"{}\"", literal.value)
            } else {
                format!("'{}'", literal.value)
            }
        }
        ConstantKind::Duration(literal) => render_duration(literal),
        ConstantKind::Date(literal) => format!("D#{}", literal.value),
        ConstantKind::TimeOfDay(literal) => format!("TOD#{}", literal.value),
        ConstantKind::DateAndTime(literal) => format!("DT#{}", literal.value),
        ConstantKind::Enumerated(value) => value.to_string(),
    }
}

/// Renders a duration as a `T#` literal, largest unit first.
fn render_duration(literal: &plx_dsl::time::DurationLiteral) -> String {
    let mut nanoseconds = literal.as_nanoseconds();
    let mut rendered = String::from("T#");
    if nanoseconds < 0 {
        rendered = String::from("T#-");
        nanoseconds = -nanoseconds;
    }
    if nanoseconds == 0 {
        return String::from("T#0s");
    }

    let units: [(i64, &str); 6] = [
        (3_600_000_000_000, "h"),
        (60_000_000_000, "m"),
        (1_000_000_000, "s"),
        (1_000_000, "ms"),
        (1_000, "us"),
        (1, "ns"),
    ];
    for (scale, suffix) in units {
        let amount = nanoseconds / scale;
        if amount > 0 {
            rendered.push_str(&format!("{}{}", amount, suffix));
            nanoseconds -= amount * scale;
        }
    }
    rendered
}

fn render_expr(expr: &ExprKind) -> Result<String, Diagnostic> {
    match expr {
        ExprKind::Const(constant) => Ok(render_constant(constant)),
        ExprKind::Variable(path) => render_path(path),
        ExprKind::Unary(unary) => {
            let term = render_expr(&unary.term)?;
            let rendered = match unary.op {
                UnaryOp::Neg => format!("-({})", term),
                UnaryOp::Not => format!("NOT ({})", term),
                UnaryOp::BitNot => format!("NOT ({})", term),
            };
            Ok(rendered)
        }
        ExprKind::Binary(binary) => {
            let op = match binary.op {
                BinaryOp::Add => "+",
                BinaryOp::Sub => "-",
                BinaryOp::Mul => "*",
                BinaryOp::Div => "/",
                BinaryOp::Mod => "MOD",
                BinaryOp::Pow => "**",
                BinaryOp::BitAnd => "AND",
                BinaryOp::BitOr => "OR",
                BinaryOp::BitXor => "XOR",
                BinaryOp::Shl => return render_shift("SHL", binary),
                BinaryOp::Shr => return render_shift("SHR", binary),
            };
            Ok(format!(
                "({} {} {})",
                render_expr(&binary.left)?,
                op,
                render_expr(&binary.right)?
            ))
        }
        ExprKind::Compare(compare) => {
            let op = match compare.op {
                CompareOp::Eq => "=",
                CompareOp::Ne => "<>",
                CompareOp::Lt => "<",
                CompareOp::Gt => ">",
                CompareOp::LtEq => "<=",
                CompareOp::GtEq => ">=",
            };
            Ok(format!(
                "({} {} {})",
                render_expr(&compare.left)?,
                op,
                render_expr(&compare.right)?
            ))
        }
        ExprKind::Logic(logic) => {
            let op = match logic.op {
                LogicOp::And => "AND",
                LogicOp::Or => "OR",
            };
            Ok(format!(
                "({} {} {})",
                render_expr(&logic.left)?,
                op,
                render_expr(&logic.right)?
            ))
        }
        ExprKind::Conditional(conditional) => {
            // Structured Text has no conditional expression; SEL
            // carries the same meaning.
            Ok(format!(
                "SEL({}, {}, {})",
                render_expr(&conditional.condition)?,
                render_expr(&conditional.when_false)?,
                render_expr(&conditional.when_true)?
            ))
        }
        ExprKind::Call(call) => {
            if call.name.original() == "__FIRST_SCAN" {
                return Ok("FIRST_SCAN".to_owned());
            }
            let args: Vec<String> = call
                .args
                .iter()
                .map(|arg| {
                    let value = render_expr(&arg.value)?;
                    Ok(match &arg.name {
                        Some(name) => format!("{} := {}", name, value),
                        None => value,
                    })
                })
                .collect::<Result<_, Diagnostic>>()?;
            Ok(format!("{}({})", call.name, args.join(", ")))
        }
    }
}

fn render_shift(
    name: &str,
    binary: &plx_dsl::textual::BinaryExpr,
) -> Result<String, Diagnostic> {
    Ok(format!(
        "{}({}, {})",
        name,
        render_expr(&binary.left)?,
        render_expr(&binary.right)?
    ))
}

/// Raised when rendering hits a construct with no textual form. The
/// current node set renders completely, so this is only used by
/// future extensions.
#[allow(dead_code)]
fn not_representable(what: &str) -> Diagnostic {
    Diagnostic::problem(
        Problem::NotRepresentable,
        Label::span(SourceSpan::default(), what),
    )
}
