//! Sentinel expansion for the lowering pass.
//!
//! The timing/edge/counter helpers (`delayed`, `rising`, `count_up`,
//! ...) are compile-time markers recognized by name at call sites;
//! they have no runtime implementation. Each call site expands to an
//! invocation of a synthesized standard function block instance, and
//! the expression's value is the instance's `Q` output.
//!
//! Instance names are derived from the lexical position within the
//! POU (`__ton_0`, `__r_trig_1`, ... in source order), so re-lowering
//! the same source yields the same names.
use plx_dsl::common::VarDecl;
use plx_dsl::core::SourceSpan;
use plx_dsl::diagnostic::{Diagnostic, Label};
use plx_dsl::textual::{ExprKind, NamedInput, StmtKind, VariablePath};
use plx_dsl::time::DurationLiteral;
use plx_parser::ast::Expr;
use plx_problems::Problem;

use crate::environment::StandardFb;
use crate::lower::Lowerer;

/// Timer sentinels: helper name, block type, signal input, preset
/// input.
pub static TIMER_SENTINELS: phf::Map<&'static str, StandardFb> = phf::phf_map! {
    "delayed" => StandardFb::Ton,
    "sustained" => StandardFb::Tof,
    "pulse" => StandardFb::Tp,
};

/// Edge sentinels: helper name to block type. The signal input is
/// `CLK`.
pub static EDGE_SENTINELS: phf::Map<&'static str, StandardFb> = phf::phf_map! {
    "rising" => StandardFb::RTrig,
    "falling" => StandardFb::FTrig,
};

/// Counter sentinels: helper name, block type, clock input, control
/// keyword and control input.
pub static COUNTER_SENTINELS: phf::Map<&'static str, (StandardFb, &'static str, &'static str, &'static str)> = phf::phf_map! {
    "count_up" => (StandardFb::Ctu, "CU", "reset", "R"),
    "count_down" => (StandardFb::Ctd, "CD", "load", "LD"),
};

/// True when the name is any compile-time sentinel.
pub fn is_sentinel(name: &str) -> bool {
    TIMER_SENTINELS.contains_key(name)
        || EDGE_SENTINELS.contains_key(name)
        || COUNTER_SENTINELS.contains_key(name)
}

impl<'a> Lowerer<'a> {
    /// Expands a sentinel call site. The caller already matched the
    /// name against the sentinel tables.
    pub(crate) fn expand_sentinel(
        &mut self,
        name: &str,
        args: &[Expr],
        kwargs: &[(String, Expr)],
        span: &SourceSpan,
    ) -> Result<ExprKind, Diagnostic> {
        if let Some(fb) = TIMER_SENTINELS.get(name) {
            return self.expand_timer(name, *fb, args, kwargs, span);
        }
        if let Some(fb) = EDGE_SENTINELS.get(name) {
            return self.expand_edge(name, *fb, args, kwargs, span);
        }
        let (fb, clock_input, control_keyword, control_input) = *COUNTER_SENTINELS
            .get(name)
            .expect("caller matched a sentinel name");
        self.expand_counter(name, fb, clock_input, control_keyword, control_input, args, kwargs, span)
    }

    fn expand_timer(
        &mut self,
        name: &str,
        fb: StandardFb,
        args: &[Expr],
        kwargs: &[(String, Expr)],
        span: &SourceSpan,
    ) -> Result<ExprKind, Diagnostic> {
        let signal = self.signal_argument(name, args, span)?;
        let preset = self.duration_argument(name, kwargs, span)?;

        let instance = self.synthesize_instance(fb);
        self.push_pending(StmtKind::fb_call(
            VariablePath::named(&instance),
            vec![
                NamedInput::new("IN", signal),
                NamedInput::new("PT", preset),
            ],
        ));

        Ok(ExprKind::Variable(
            VariablePath::named(&instance).field("Q").with_span(span.clone()),
        ))
    }

    fn expand_edge(
        &mut self,
        name: &str,
        fb: StandardFb,
        args: &[Expr],
        kwargs: &[(String, Expr)],
        span: &SourceSpan,
    ) -> Result<ExprKind, Diagnostic> {
        if !kwargs.is_empty() {
            return Err(sentinel_error(name, "takes no named arguments", span));
        }
        let signal = self.signal_argument(name, args, span)?;

        let instance = self.synthesize_instance(fb);
        self.push_pending(StmtKind::fb_call(
            VariablePath::named(&instance),
            vec![NamedInput::new("CLK", signal)],
        ));

        Ok(ExprKind::Variable(
            VariablePath::named(&instance).field("Q").with_span(span.clone()),
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn expand_counter(
        &mut self,
        name: &str,
        fb: StandardFb,
        clock_input: &str,
        control_keyword: &str,
        control_input: &str,
        args: &[Expr],
        kwargs: &[(String, Expr)],
        span: &SourceSpan,
    ) -> Result<ExprKind, Diagnostic> {
        let clock = self.signal_argument(name, args, span)?;

        let mut preset = None;
        let mut control = None;
        for (keyword, value) in kwargs {
            if keyword == "preset" {
                preset = Some(self.lower_expression(value)?);
            } else if keyword == control_keyword {
                control = Some(self.lower_expression(value)?);
            } else {
                return Err(sentinel_error(
                    name,
                    &format!("does not accept the argument '{}'", keyword),
                    span,
                ));
            }
        }
        let preset =
            preset.ok_or_else(|| sentinel_error(name, "requires a preset= argument", span))?;

        let instance = self.synthesize_instance(fb);
        let mut inputs = vec![
            NamedInput::new(clock_input, clock),
            NamedInput::new("PV", preset),
        ];
        if let Some(control) = control {
            inputs.push(NamedInput::new(control_input, control));
        }
        self.push_pending(StmtKind::fb_call(VariablePath::named(&instance), inputs));

        Ok(ExprKind::Variable(
            VariablePath::named(&instance).field("Q").with_span(span.clone()),
        ))
    }

    fn signal_argument(
        &mut self,
        name: &str,
        args: &[Expr],
        span: &SourceSpan,
    ) -> Result<ExprKind, Diagnostic> {
        match args {
            [signal] => self.lower_expression(signal),
            _ => Err(sentinel_error(name, "requires exactly one signal argument", span)),
        }
    }

    /// Parses the duration arguments (`seconds=`, `ms=`, `duration=`)
    /// of a timer sentinel.
    fn duration_argument(
        &mut self,
        name: &str,
        kwargs: &[(String, Expr)],
        span: &SourceSpan,
    ) -> Result<ExprKind, Diagnostic> {
        let mut total_nanoseconds: i128 = 0;
        let mut fixed = false;

        for (keyword, value) in kwargs {
            match keyword.as_str() {
                // An expression preset, for presets held in variables.
                "duration" => return self.lower_expression(value),
                "seconds" => {
                    total_nanoseconds += numeric_literal(value, 1_000_000_000)
                        .ok_or_else(|| sentinel_error(name, "seconds= must be a numeric literal", span))?;
                    fixed = true;
                }
                "ms" => {
                    total_nanoseconds += numeric_literal(value, 1_000_000)
                        .ok_or_else(|| sentinel_error(name, "ms= must be a numeric literal", span))?;
                    fixed = true;
                }
                other => {
                    return Err(sentinel_error(
                        name,
                        &format!("does not accept the argument '{}'", other),
                        span,
                    ))
                }
            }
        }

        if !fixed {
            return Err(sentinel_error(
                name,
                "requires a seconds=, ms= or duration= argument",
                span,
            ));
        }

        Ok(ExprKind::Const(plx_dsl::common::ConstantKind::duration(
            DurationLiteral::nanoseconds(total_nanoseconds as i64),
        )))
    }

    /// Declares a synthesized instance in the static block and
    /// returns its stable name.
    pub(crate) fn synthesize_instance(&mut self, fb: StandardFb) -> String {
        let name = format!(
            "__{}_{}",
            fb.type_name().to_lowercase(),
            self.next_auto_index()
        );
        self.declare_synthesized(VarDecl::instance(&name, fb.type_name()));
        name
    }
}

/// Converts an integer or float literal to nanoseconds at the given
/// scale. Returns `None` for non-literal expressions.
fn numeric_literal(expr: &Expr, nanoseconds_per_unit: i128) -> Option<i128> {
    match expr {
        Expr::Int { value, .. } => Some(value * nanoseconds_per_unit),
        Expr::Float { value, .. } => Some((value * nanoseconds_per_unit as f64).round() as i128),
        _ => None,
    }
}

fn sentinel_error(name: &str, message: &str, span: &SourceSpan) -> Diagnostic {
    Diagnostic::problem(
        Problem::SyntaxUnsupported,
        Label::span(span.clone(), "Sentinel call"),
    )
    .with_context("helper", name)
    .with_context("reason", message)
}
