//! Expression-to-temporary naming with textual deduplication.
//!
//! Every lowered expression gets a canonical right-hand-side string; the
//! first time a string is seen a fresh `_tN` temporary is declared, and every
//! later occurrence reuses it. That cache is also the structural dedup
//! identity for the netlist: re-visiting a shared subexpression resolves to
//! the already-materialized wire instead of synthesizing twice. Accumulation
//! stores invalidate the whole cache, because re-executing a store can change
//! values a cached temporary would otherwise serve stale.

use crate::writer::CodeWriter;
use spindle_ir::{ScalarType, TypeCode};
use std::collections::HashMap;

/// Prints a scalar type as its C spelling.
pub fn print_type(ty: ScalarType) -> String {
    match ty.code {
        TypeCode::UInt if ty.bits == 1 => "bool".to_string(),
        TypeCode::UInt => format!("uint{}_t", ty.bits),
        TypeCode::Int => format!("int{}_t", ty.bits),
        TypeCode::Float if ty.bits == 64 => "double".to_string(),
        TypeCode::Float => "float".to_string(),
    }
}

/// The expression naming cache.
#[derive(Debug, Clone, Default)]
pub struct ExprNamer {
    cache: HashMap<String, String>,
    next: u32,
}

impl ExprNamer {
    /// Creates an empty namer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the temporary holding `rhs`, declaring it if unseen.
    ///
    /// On a cache hit nothing is printed and the existing name is returned —
    /// the caller treats that as "already synthesized".
    pub fn print_assignment(&mut self, ty: ScalarType, rhs: &str, out: &mut CodeWriter) -> String {
        if let Some(id) = self.cache.get(rhs) {
            return id.clone();
        }
        let id = format!("_t{}", self.next);
        self.next += 1;
        out.line(&format!("{} {} = {};", print_type(ty), id, rhs));
        self.cache.insert(rhs.to_string(), id.clone());
        id
    }

    /// Returns the cached temporary for `rhs`, if any.
    pub fn lookup(&self, rhs: &str) -> Option<&str> {
        self.cache.get(rhs).map(String::as_str)
    }

    /// Drops every cached temporary.
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_type_spellings() {
        assert_eq!(print_type(ScalarType::uint(16)), "uint16_t");
        assert_eq!(print_type(ScalarType::int(8)), "int8_t");
        assert_eq!(print_type(ScalarType::bool_type()), "bool");
        assert_eq!(print_type(ScalarType::float(32)), "float");
        assert_eq!(print_type(ScalarType::float(64)), "double");
    }

    #[test]
    fn repeated_rhs_reuses_temporary() {
        let mut namer = ExprNamer::new();
        let mut out = CodeWriter::new();
        let a = namer.print_assignment(ScalarType::uint(16), "_x * _y", &mut out);
        let b = namer.print_assignment(ScalarType::uint(16), "_x * _y", &mut out);
        assert_eq!(a, b);
        // declared exactly once
        assert_eq!(out.contents().matches("uint16_t").count(), 1);
    }

    #[test]
    fn distinct_rhs_gets_fresh_temporaries() {
        let mut namer = ExprNamer::new();
        let mut out = CodeWriter::new();
        let a = namer.print_assignment(ScalarType::uint(16), "_x + 1", &mut out);
        let b = namer.print_assignment(ScalarType::uint(16), "_x + 2", &mut out);
        assert_ne!(a, b);
    }

    #[test]
    fn clear_forgets_everything() {
        let mut namer = ExprNamer::new();
        let mut out = CodeWriter::new();
        let a = namer.print_assignment(ScalarType::uint(16), "_x + 1", &mut out);
        namer.clear();
        assert_eq!(namer.lookup("_x + 1"), None);
        let b = namer.print_assignment(ScalarType::uint(16), "_x + 1", &mut out);
        // a new temporary, not the stale one
        assert_ne!(a, b);
    }
}
