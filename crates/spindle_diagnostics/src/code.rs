//! Diagnostic codes grouped by backend subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The subsystem a diagnostic originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Wire/value resolution failures.
    Resolve,
    /// Expression and statement lowering.
    Lower,
    /// Memory classification and wiring.
    Memory,
    /// Streaming primitives and dispatch.
    Stream,
    /// Artifact serialization.
    Io,
}

impl Category {
    fn prefix(self) -> char {
        match self {
            Category::Resolve => 'R',
            Category::Lower => 'L',
            Category::Memory => 'M',
            Category::Stream => 'S',
            Category::Io => 'I',
        }
    }
}

/// A unique code identifying one kind of diagnostic, e.g. `R101`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The originating subsystem.
    pub category: Category,
    /// The number within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a code from a category and number.
    pub fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        assert_eq!(DiagnosticCode::new(Category::Resolve, 101).to_string(), "R101");
        assert_eq!(DiagnosticCode::new(Category::Stream, 7).to_string(), "S007");
    }

    #[test]
    fn equality() {
        let a = DiagnosticCode::new(Category::Memory, 3);
        let b = DiagnosticCode::new(Category::Memory, 3);
        let c = DiagnosticCode::new(Category::Lower, 3);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
