//! Provides definitions of tasks and the top-level project container.
use serde::{Deserialize, Serialize};

use plx_dsl_derive::Traverse;
use plx_problems::Problem;

use crate::common::{Pou, TypeDefinitionKind, VarDecl};
use crate::core::{Id, Located, SourceSpan};
use crate::diagnostic::{Diagnostic, Label};
use crate::fold::Fold;
use crate::time::DurationLiteral;
use crate::visitor::Visitor;

/// How a task is scheduled.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Traverse)]
pub enum ScheduleKind {
    /// Executes with a fixed, strictly positive period.
    Periodic(DurationLiteral),
    /// Executes when the named event source fires.
    Event(Id),
    /// Executes whenever no other task is due.
    Continuous,
}

/// A task binds programs to a schedule.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Traverse)]
pub struct Task {
    pub name: Id,
    pub schedule: ScheduleKind,
    #[traverse(skip)]
    pub priority: Option<u32>,
    /// The programs this task executes, in execution order.
    pub pous: Vec<Id>,
}

impl Task {
    /// Creates a task, rejecting non-positive periods.
    pub fn new(name: &str, schedule: ScheduleKind, pous: Vec<Id>) -> Result<Self, Diagnostic> {
        if let ScheduleKind::Periodic(period) = &schedule {
            if !period.is_positive() {
                return Err(Diagnostic::problem(
                    Problem::InvalidSchedule,
                    Label::span(period.span.clone(), "Task period"),
                )
                .with_context("task", name)
                .with_context("period_ns", &period.as_nanoseconds().to_string()));
            }
        }
        Ok(Self {
            name: Id::from(name),
            schedule,
            priority: None,
            pous,
        })
    }

    pub fn periodic(name: &str, period: DurationLiteral, pous: Vec<Id>) -> Result<Self, Diagnostic> {
        Task::new(name, ScheduleKind::Periodic(period), pous)
    }

    pub fn continuous(name: &str, pous: Vec<Id>) -> Self {
        Self {
            name: Id::from(name),
            schedule: ScheduleKind::Continuous,
            priority: None,
            pous,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }
}

impl Located for Task {
    fn span(&self) -> SourceSpan {
        self.name.span()
    }
}

/// A named block of global variables.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Traverse)]
pub struct GlobalBlock {
    pub name: Id,
    pub variables: Vec<VarDecl>,
}

impl GlobalBlock {
    pub fn new(name: &str, variables: Vec<VarDecl>) -> Self {
        Self {
            name: Id::from(name),
            variables,
        }
    }
}

/// The top-level container: a complete, self-contained control
/// project. The project owns its POUs, data types, globals and tasks.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize, Traverse)]
pub struct Project {
    #[traverse(skip)]
    pub name: String,
    pub data_types: Vec<TypeDefinitionKind>,
    pub globals: Vec<GlobalBlock>,
    pub pous: Vec<Pou>,
    pub tasks: Vec<Task>,
}

impl Project {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Project::default()
        }
    }

    pub fn with_pou(mut self, pou: Pou) -> Self {
        self.pous.push(pou);
        self
    }

    pub fn with_data_type(mut self, data_type: TypeDefinitionKind) -> Self {
        self.data_types.push(data_type);
        self
    }

    pub fn with_global(mut self, global: GlobalBlock) -> Self {
        self.globals.push(global);
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn find_pou(&self, name: &Id) -> Option<&Pou> {
        self.pous.iter().find(|p| &p.name == name)
    }

    pub fn find_data_type(&self, name: &Id) -> Option<&TypeDefinitionKind> {
        self.data_types
            .iter()
            .find(|d| &d.type_name().name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_when_zero_period_then_invalid_schedule() {
        let err = Task::periodic("main", DurationLiteral::milliseconds(0), vec![]).unwrap_err();
        assert!(err.is_problem(Problem::InvalidSchedule));
    }

    #[test]
    fn task_when_negative_period_then_invalid_schedule() {
        let err =
            Task::periodic("main", DurationLiteral::milliseconds(10).negated(), vec![]).unwrap_err();
        assert!(err.is_problem(Problem::InvalidSchedule));
    }

    #[test]
    fn task_when_positive_period_then_accepted() {
        let task =
            Task::periodic("main", DurationLiteral::milliseconds(10), vec![Id::from("Line")])
                .unwrap();
        assert_eq!(task.pous.len(), 1);
    }

    #[test]
    fn project_when_find_pou_then_case_insensitive() {
        let project = Project::new("cell").with_pou(Pou::program("Bottling"));
        assert!(project.find_pou(&Id::from("BOTTLING")).is_some());
    }
}
