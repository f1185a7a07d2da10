//! Provides definitions specific to sequential function chart (SFC)
//! elements.
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

use plx_dsl_derive::Traverse;
use plx_problems::Problem;

use crate::core::{Id, Located};
use crate::diagnostic::{Diagnostic, Label};
use crate::fold::Fold;
use crate::textual::{ExprKind, StmtKind};
use crate::visitor::Visitor;

/// Step item for a chart. Exactly one step in a chart is the initial
/// step. The actions execute on each scan in which the step is active.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Traverse)]
pub struct Step {
    pub name: Id,
    #[traverse(skip)]
    pub initial: bool,
    pub actions: Vec<StmtKind>,
}

impl Step {
    pub fn new(name: &str, actions: Vec<StmtKind>) -> Self {
        Self {
            name: Id::from(name),
            initial: false,
            actions,
        }
    }

    pub fn initial(name: &str, actions: Vec<StmtKind>) -> Self {
        Self {
            initial: true,
            ..Step::new(name, actions)
        }
    }
}

/// Transition item for a chart: when the source step is active and the
/// condition is true, the source deactivates and the target activates.
///
/// A transition carries a single source and a single target; charts
/// with simultaneous divergence (multiple active steps) are not
/// modeled.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Traverse)]
pub struct Transition {
    pub source: Id,
    pub target: Id,
    pub condition: ExprKind,
}

impl Transition {
    pub fn new(source: &str, target: &str, condition: ExprKind) -> Self {
        Self {
            source: Id::from(source),
            target: Id::from(target),
            condition,
        }
    }
}

/// A sequential function chart: a directed graph of steps and
/// transitions.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Traverse)]
pub struct Chart {
    pub steps: Vec<Step>,
    pub transitions: Vec<Transition>,
}

impl Chart {
    /// Creates a chart, enforcing the structural invariants:
    ///
    /// * step names are unique and exactly one step is initial
    /// * every transition references existing steps
    /// * the graph is weakly connected
    /// * the initial step reaches every other step
    pub fn new(steps: Vec<Step>, transitions: Vec<Transition>) -> Result<Self, Vec<Diagnostic>> {
        let mut diagnostics = Vec::new();

        let mut names: HashSet<&Id> = HashSet::new();
        for step in &steps {
            if !names.insert(&step.name) {
                diagnostics.push(
                    Diagnostic::problem(
                        Problem::DuplicateName,
                        Label::span(step.name.span(), "Step"),
                    )
                    .with_context_id("step", &step.name),
                );
            }
        }

        let initial: Vec<&Step> = steps.iter().filter(|s| s.initial).collect();
        if initial.len() != 1 {
            diagnostics.push(
                Diagnostic::problem(
                    Problem::ChartInvalid,
                    Label::span(Default::default(), "Chart"),
                )
                .with_context("initial steps", &initial.len().to_string()),
            );
        }

        for transition in &transitions {
            for endpoint in [&transition.source, &transition.target] {
                if !names.contains(endpoint) {
                    diagnostics.push(
                        Diagnostic::problem(
                            Problem::DanglingReference,
                            Label::span(endpoint.span(), "Transition"),
                        )
                        .with_context_id("step", endpoint),
                    );
                }
            }
        }

        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }

        let chart = Self { steps, transitions };

        if let Some(unreached) = chart.first_unreachable() {
            diagnostics.push(
                Diagnostic::problem(
                    Problem::ChartInvalid,
                    Label::span(unreached.span(), "Step"),
                )
                .with_context_id("unreachable step", &unreached),
            );
        }
        if !chart.is_weakly_connected() {
            diagnostics.push(Diagnostic::problem(
                Problem::ChartInvalid,
                Label::span(Default::default(), "Chart is not connected"),
            ));
        }

        if diagnostics.is_empty() {
            Ok(chart)
        } else {
            Err(diagnostics)
        }
    }

    pub fn initial_step(&self) -> &Step {
        // The constructor guarantees exactly one initial step.
        self.steps
            .iter()
            .find(|s| s.initial)
            .expect("chart has an initial step")
    }

    pub fn step(&self, name: &Id) -> Option<&Step> {
        self.steps.iter().find(|s| &s.name == name)
    }

    /// Transitions leaving the named step, in declaration order.
    pub fn transitions_from<'a>(&'a self, name: &'a Id) -> impl Iterator<Item = &'a Transition> {
        self.transitions.iter().filter(move |t| &t.source == name)
    }

    fn adjacency(&self, directed: bool) -> HashMap<&Id, Vec<&Id>> {
        let mut edges: HashMap<&Id, Vec<&Id>> = HashMap::new();
        for step in &self.steps {
            edges.entry(&step.name).or_default();
        }
        for transition in &self.transitions {
            edges
                .entry(&transition.source)
                .or_default()
                .push(&transition.target);
            if !directed {
                edges
                    .entry(&transition.target)
                    .or_default()
                    .push(&transition.source);
            }
        }
        edges
    }

    fn reach(&self, start: &Id, directed: bool) -> HashSet<Id> {
        let edges = self.adjacency(directed);
        let mut seen: HashSet<Id> = HashSet::new();
        let mut queue: VecDeque<&Id> = VecDeque::new();
        seen.insert(start.clone());
        queue.push_back(start);
        while let Some(current) = queue.pop_front() {
            if let Some(next) = edges.get(current) {
                for step in next {
                    if seen.insert((*step).clone()) {
                        queue.push_back(step);
                    }
                }
            }
        }
        seen
    }

    /// The first step, in declaration order, that the initial step
    /// cannot reach.
    fn first_unreachable(&self) -> Option<Id> {
        let reachable = self.reach(&self.initial_step().name.clone(), true);
        self.steps
            .iter()
            .find(|s| !reachable.contains(&s.name))
            .map(|s| s.name.clone())
    }

    fn is_weakly_connected(&self) -> bool {
        match self.steps.first() {
            Some(first) => self.reach(&first.name, false).len() == self.steps.len(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always() -> ExprKind {
        ExprKind::const_bool(true)
    }

    #[test]
    fn chart_when_valid_cycle_then_accepted() {
        let chart = Chart::new(
            vec![
                Step::initial("idle", vec![]),
                Step::new("fill", vec![]),
                Step::new("mix", vec![]),
            ],
            vec![
                Transition::new("idle", "fill", always()),
                Transition::new("fill", "mix", always()),
                Transition::new("mix", "idle", always()),
            ],
        );
        assert!(chart.is_ok());
        assert_eq!(chart.unwrap().initial_step().name, Id::from("idle"));
    }

    #[test]
    fn chart_when_no_initial_step_then_invalid() {
        let err = Chart::new(
            vec![Step::new("idle", vec![])],
            vec![],
        )
        .unwrap_err();
        assert!(err[0].is_problem(Problem::ChartInvalid));
    }

    #[test]
    fn chart_when_two_initial_steps_then_invalid() {
        let err = Chart::new(
            vec![Step::initial("a", vec![]), Step::initial("b", vec![])],
            vec![Transition::new("a", "b", always())],
        )
        .unwrap_err();
        assert!(err[0].is_problem(Problem::ChartInvalid));
    }

    #[test]
    fn chart_when_transition_names_missing_step_then_dangling() {
        let err = Chart::new(
            vec![Step::initial("idle", vec![])],
            vec![Transition::new("idle", "drain", always())],
        )
        .unwrap_err();
        assert!(err[0].is_problem(Problem::DanglingReference));
    }

    #[test]
    fn chart_when_step_unreachable_then_invalid() {
        let err = Chart::new(
            vec![
                Step::initial("idle", vec![]),
                Step::new("fill", vec![]),
                Step::new("orphan", vec![]),
            ],
            vec![
                Transition::new("idle", "fill", always()),
                Transition::new("orphan", "idle", always()),
            ],
        )
        .unwrap_err();
        assert!(err[0].is_problem(Problem::ChartInvalid));
    }

    #[test]
    fn chart_when_disconnected_island_then_invalid() {
        let err = Chart::new(
            vec![
                Step::initial("a", vec![]),
                Step::new("b", vec![]),
                Step::new("c", vec![]),
                Step::new("d", vec![]),
            ],
            vec![
                Transition::new("a", "b", always()),
                Transition::new("c", "d", always()),
            ],
        )
        .unwrap_err();
        assert!(!err.is_empty());
    }
}
