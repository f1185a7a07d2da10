//! Defines the stable set of problem codes the plx compiler reports.
//!
//! The codes are declared in `resources/problem-codes.csv` and compiled
//! into the `Problem` enumeration by the build script. Codes are stable
//! between releases; names are not.

include!(concat!(env!("OUT_DIR"), "/problems.rs"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problem_when_code_then_stable_value() {
        assert_eq!(Problem::TypeMismatch.code(), "P0005");
        assert_eq!(Problem::DuplicateName.code(), "P0007");
    }

    #[test]
    fn problem_when_message_then_not_empty() {
        assert!(!Problem::CaseOverlap.message().is_empty());
    }
}
