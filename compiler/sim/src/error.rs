use std::fmt;

/// Runtime faults that abort the current scan.
#[derive(Clone, Debug, PartialEq)]
pub enum Fault {
    DivisionByZero,
    /// Array access outside the declared bounds.
    IndexOutOfBounds {
        index: i64,
        lower: i64,
        upper: i64,
    },
    /// A reference that did not resolve in the instance state. This
    /// indicates the IR was not validated before simulation.
    UnknownVariable(String),
    /// A value had the wrong shape for the operation.
    TypeError(String),
    /// A counted loop with a zero step never terminates.
    ZeroStep,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::DivisionByZero => write!(f, "division by zero"),
            Fault::IndexOutOfBounds { index, lower, upper } => {
                write!(f, "index {index} outside bounds [{lower}..{upper}]")
            }
            Fault::UnknownVariable(name) => write!(f, "unknown variable: {name}"),
            Fault::TypeError(message) => write!(f, "type error: {message}"),
            Fault::ZeroStep => write!(f, "for loop step is zero"),
        }
    }
}

/// A fault together with the execution trace that led to it. The scan
/// that faulted publishes nothing; outputs of prior scans remain
/// observable.
#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeFault {
    pub fault: Fault,
    /// Innermost frame last: POU and statement context descriptions.
    pub trace: Vec<String>,
}

impl RuntimeFault {
    pub fn new(fault: Fault) -> Self {
        Self {
            fault,
            trace: Vec::new(),
        }
    }

    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.trace.push(frame.into());
        self
    }
}

impl fmt::Display for RuntimeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scan aborted: {}", self.fault)?;
        for frame in self.trace.iter().rev() {
            write!(f, "\n  in {}", frame)?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeFault {}

impl From<Fault> for RuntimeFault {
    fn from(fault: Fault) -> Self {
        RuntimeFault::new(fault)
    }
}
