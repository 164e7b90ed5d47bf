//! Allocation classification.
//!
//! Each `Allocate` is classified from one scan of all loads and stores that
//! reference it within its lexical extent. The classification picks the
//! cheapest correct memory primitive: no hardware for fully constant
//! access patterns, a ROM when only the reads are addressed variably, a
//! clearable register array when reads and writes share an address (the
//! accumulation idiom), and an SRAM when they do not.

use spindle_ir::{Expr, Stmt};

/// The derived class of one allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationKind {
    /// Fully constant-foldable: wires only, no memory primitive.
    NoAlloc,
    /// Pass-through (never stored or never loaded): no hardware.
    InOut,
    /// Read-only with variable read addressing.
    Rom,
    /// Read-modify-write accumulator (load address equals store address).
    Rmw,
    /// General read/write memory.
    Sram,
    /// No specialized hardware; falls back to generic wiring.
    Unknown,
}

/// Everything one scan learns about an allocation's accesses.
#[derive(Debug, Clone, Default)]
pub struct AllocationUsage {
    /// Number of loads referencing the allocation.
    pub num_loads: usize,
    /// Number of stores referencing the allocation.
    pub num_stores: usize,
    /// Whether any load index is non-constant.
    pub uses_variable_load_index: bool,
    /// Whether any store index is non-constant.
    pub uses_variable_store_index: bool,
    /// Whether any stored value is non-constant.
    pub uses_variable_store_value: bool,
    /// Every load index expression, in visit order.
    pub load_index_exprs: Vec<Expr>,
    /// Every store index expression, in visit order.
    pub store_index_exprs: Vec<Expr>,
}

impl AllocationUsage {
    /// Scans `stmt` for accesses to `alloc_name`.
    pub fn scan(stmt: &Stmt, alloc_name: &str) -> Self {
        let mut usage = Self::default();
        usage.visit_stmt(stmt, alloc_name);
        usage
    }

    /// Returns `true` when loads and stores address the same locations,
    /// compared structurally over the index expressions.
    pub fn load_index_equals_store_index(&self) -> bool {
        !self.load_index_exprs.is_empty()
            && self
                .load_index_exprs
                .iter()
                .all(|l| self.store_index_exprs.contains(l))
            && self
                .store_index_exprs
                .iter()
                .all(|s| self.load_index_exprs.contains(s))
    }

    fn visit_stmt(&mut self, stmt: &Stmt, name: &str) {
        match stmt {
            Stmt::For {
                min, extent, body, ..
            } => {
                self.visit_expr(min, name);
                self.visit_expr(extent, name);
                self.visit_stmt(body, name);
            }
            Stmt::IfThenElse {
                condition,
                then_case,
                else_case,
            } => {
                self.visit_expr(condition, name);
                self.visit_stmt(then_case, name);
                if let Some(else_case) = else_case {
                    self.visit_stmt(else_case, name);
                }
            }
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.visit_stmt(s, name);
                }
            }
            Stmt::Realize { body, .. }
            | Stmt::Allocate { body, .. }
            | Stmt::ProducerConsumer { body, .. } => self.visit_stmt(body, name),
            Stmt::Provide { args, value, .. } => {
                for a in args {
                    self.visit_expr(a, name);
                }
                self.visit_expr(value, name);
            }
            Stmt::Store {
                name: store_name,
                index,
                value,
            } => {
                if store_name == name {
                    self.num_stores += 1;
                    self.store_index_exprs.push(index.clone());
                    if !index.is_const() {
                        self.uses_variable_store_index = true;
                    }
                    if !value.is_const() {
                        self.uses_variable_store_value = true;
                    }
                }
                self.visit_expr(index, name);
                self.visit_expr(value, name);
            }
            Stmt::Evaluate(e) => self.visit_expr(e, name),
            Stmt::Free { .. } => {}
        }
    }

    fn visit_expr(&mut self, e: &Expr, name: &str) {
        match e {
            Expr::Load {
                name: load_name,
                index,
                ..
            } => {
                if load_name == name {
                    self.num_loads += 1;
                    self.load_index_exprs.push((**index).clone());
                    if !index.is_const() {
                        self.uses_variable_load_index = true;
                    }
                }
                self.visit_expr(index, name);
            }
            Expr::Binary { a, b, .. } => {
                self.visit_expr(a, name);
                self.visit_expr(b, name);
            }
            Expr::Not(a) => self.visit_expr(a, name),
            Expr::Select {
                condition,
                true_value,
                false_value,
            } => {
                self.visit_expr(condition, name);
                self.visit_expr(true_value, name);
                self.visit_expr(false_value, name);
            }
            Expr::Cast { value, .. } => self.visit_expr(value, name),
            Expr::Call { args, .. } => {
                for a in args {
                    self.visit_expr(a, name);
                }
            }
            Expr::IntImm { .. }
            | Expr::UIntImm { .. }
            | Expr::FloatImm { .. }
            | Expr::StringImm(_)
            | Expr::Var { .. } => {}
        }
    }
}

/// Classifies one allocation from its usage.
pub fn identify_allocation(stmt: &Stmt, alloc_name: &str) -> AllocationKind {
    let usage = AllocationUsage::scan(stmt, alloc_name);

    if usage.num_stores == 0 || usage.num_loads == 0 {
        AllocationKind::InOut
    } else if !usage.uses_variable_load_index
        && !usage.uses_variable_store_index
        && !usage.uses_variable_store_value
    {
        AllocationKind::NoAlloc
    } else if usage.uses_variable_load_index
        && !usage.uses_variable_store_index
        && !usage.uses_variable_store_value
    {
        AllocationKind::Rom
    } else if usage.uses_variable_load_index
        && usage.uses_variable_store_index
        && usage.load_index_equals_store_index()
    {
        AllocationKind::Rmw
    } else if usage.uses_variable_load_index
        && usage.uses_variable_store_index
        && !usage.load_index_equals_store_index()
    {
        AllocationKind::Sram
    } else {
        AllocationKind::Unknown
    }
}

/// Rewrites every reference to `orig_name` in `stmt` to `new_name`.
///
/// Allocations are renamed to a unique suffix before lowering so unrolled
/// copies of the same IR never collide in the wire table.
pub fn rename_allocation(stmt: &Stmt, orig_name: &str, new_name: &str) -> Stmt {
    match stmt {
        Stmt::For {
            name,
            min,
            extent,
            body,
        } => Stmt::For {
            name: name.clone(),
            min: rename_expr(min, orig_name, new_name),
            extent: rename_expr(extent, orig_name, new_name),
            body: Box::new(rename_allocation(body, orig_name, new_name)),
        },
        Stmt::IfThenElse {
            condition,
            then_case,
            else_case,
        } => Stmt::IfThenElse {
            condition: rename_expr(condition, orig_name, new_name),
            then_case: Box::new(rename_allocation(then_case, orig_name, new_name)),
            else_case: else_case
                .as_ref()
                .map(|e| Box::new(rename_allocation(e, orig_name, new_name))),
        },
        Stmt::Block(stmts) => Stmt::Block(
            stmts
                .iter()
                .map(|s| rename_allocation(s, orig_name, new_name))
                .collect(),
        ),
        Stmt::Realize {
            name,
            elem,
            bounds,
            body,
        } => Stmt::Realize {
            name: name.clone(),
            elem: *elem,
            bounds: bounds.clone(),
            body: Box::new(rename_allocation(body, orig_name, new_name)),
        },
        Stmt::Allocate {
            name,
            elem,
            extents,
            body,
        } => Stmt::Allocate {
            name: name.clone(),
            elem: *elem,
            extents: extents.clone(),
            body: Box::new(rename_allocation(body, orig_name, new_name)),
        },
        Stmt::Provide { name, args, value } => Stmt::Provide {
            name: name.clone(),
            args: args
                .iter()
                .map(|a| rename_expr(a, orig_name, new_name))
                .collect(),
            value: rename_expr(value, orig_name, new_name),
        },
        Stmt::Store { name, index, value } => Stmt::Store {
            name: if name == orig_name {
                new_name.to_string()
            } else {
                name.clone()
            },
            index: rename_expr(index, orig_name, new_name),
            value: rename_expr(value, orig_name, new_name),
        },
        Stmt::Evaluate(e) => Stmt::Evaluate(rename_expr(e, orig_name, new_name)),
        Stmt::ProducerConsumer {
            name,
            is_producer,
            body,
        } => Stmt::ProducerConsumer {
            name: name.clone(),
            is_producer: *is_producer,
            body: Box::new(rename_allocation(body, orig_name, new_name)),
        },
        Stmt::Free { name } => Stmt::Free {
            name: if name == orig_name {
                new_name.to_string()
            } else {
                name.clone()
            },
        },
    }
}

fn rename_expr(e: &Expr, orig_name: &str, new_name: &str) -> Expr {
    match e {
        Expr::Load { name, index, ty } => Expr::Load {
            name: if name == orig_name {
                new_name.to_string()
            } else {
                name.clone()
            },
            index: Box::new(rename_expr(index, orig_name, new_name)),
            ty: *ty,
        },
        Expr::Binary { op, a, b } => Expr::Binary {
            op: *op,
            a: Box::new(rename_expr(a, orig_name, new_name)),
            b: Box::new(rename_expr(b, orig_name, new_name)),
        },
        Expr::Not(a) => Expr::Not(Box::new(rename_expr(a, orig_name, new_name))),
        Expr::Select {
            condition,
            true_value,
            false_value,
        } => Expr::Select {
            condition: Box::new(rename_expr(condition, orig_name, new_name)),
            true_value: Box::new(rename_expr(true_value, orig_name, new_name)),
            false_value: Box::new(rename_expr(false_value, orig_name, new_name)),
        },
        Expr::Cast { ty, value } => Expr::Cast {
            ty: *ty,
            value: Box::new(rename_expr(value, orig_name, new_name)),
        },
        Expr::Call { name, args, ty } => Expr::Call {
            name: name.clone(),
            args: args
                .iter()
                .map(|a| rename_expr(a, orig_name, new_name))
                .collect(),
            ty: *ty,
        },
        Expr::IntImm { .. }
        | Expr::UIntImm { .. }
        | Expr::FloatImm { .. }
        | Expr::StringImm(_)
        | Expr::Var { .. } => e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spindle_ir::ScalarType;

    fn load(name: &str, index: Expr) -> Expr {
        Expr::Load {
            name: name.to_string(),
            index: Box::new(index),
            ty: ScalarType::uint(16),
        }
    }

    fn store(name: &str, index: Expr, value: Expr) -> Stmt {
        Stmt::Store {
            name: name.to_string(),
            index,
            value,
        }
    }

    #[test]
    fn never_loaded_is_inout() {
        let s = store("a", Expr::u16(0), Expr::u16(1));
        assert_eq!(identify_allocation(&s, "a"), AllocationKind::InOut);
    }

    #[test]
    fn fully_constant_is_no_alloc() {
        let s = Stmt::Block(vec![
            store("a", Expr::u16(0), Expr::u16(1)),
            Stmt::Evaluate(load("a", Expr::u16(0))),
        ]);
        assert_eq!(identify_allocation(&s, "a"), AllocationKind::NoAlloc);
    }

    #[test]
    fn variable_loads_constant_stores_is_rom() {
        let s = Stmt::Block(vec![
            store("a", Expr::u16(0), Expr::u16(7)),
            store("a", Expr::u16(1), Expr::u16(9)),
            Stmt::Evaluate(load("a", Expr::var("x"))),
        ]);
        assert_eq!(identify_allocation(&s, "a"), AllocationKind::Rom);
    }

    #[test]
    fn matching_load_store_address_is_rmw_not_sram() {
        // histogram idiom: a[x] = a[x] + 1
        let s = store(
            "a",
            Expr::var("x"),
            Expr::binary(spindle_ir::BinaryOp::Add, load("a", Expr::var("x")), Expr::u16(1)),
        );
        assert_eq!(identify_allocation(&s, "a"), AllocationKind::Rmw);
    }

    #[test]
    fn disjoint_load_store_addresses_is_sram() {
        let s = Stmt::Block(vec![
            store("a", Expr::var("x"), Expr::var("v")),
            Stmt::Evaluate(load("a", Expr::var("y"))),
        ]);
        assert_eq!(identify_allocation(&s, "a"), AllocationKind::Sram);
    }

    #[test]
    fn variable_store_without_variable_load_is_unknown() {
        let s = Stmt::Block(vec![
            store("a", Expr::var("x"), Expr::u16(1)),
            Stmt::Evaluate(load("a", Expr::u16(0))),
        ]);
        assert_eq!(identify_allocation(&s, "a"), AllocationKind::Unknown);
    }

    #[test]
    fn rename_rewrites_loads_stores_and_frees() {
        let s = Stmt::Block(vec![
            store("a", Expr::u16(0), load("a", Expr::u16(1))),
            Stmt::Free {
                name: "a".to_string(),
            },
        ]);
        let renamed = rename_allocation(&s, "a", "a_u0");
        let usage_old = AllocationUsage::scan(&renamed, "a");
        let usage_new = AllocationUsage::scan(&renamed, "a_u0");
        assert_eq!(usage_old.num_loads + usage_old.num_stores, 0);
        assert_eq!(usage_new.num_loads, 1);
        assert_eq!(usage_new.num_stores, 1);
    }

    #[test]
    fn scan_counts_nested_accesses() {
        let s = Stmt::For {
            name: "x".to_string(),
            min: Expr::u16(0),
            extent: Expr::u16(4),
            body: Box::new(Stmt::IfThenElse {
                condition: Expr::binary(
                    spindle_ir::BinaryOp::Eq,
                    load("a", Expr::var("x")),
                    Expr::u16(0),
                ),
                then_case: Box::new(store("a", Expr::var("x"), Expr::u16(1))),
                else_case: None,
            }),
        };
        let usage = AllocationUsage::scan(&s, "a");
        assert_eq!(usage.num_loads, 1);
        assert_eq!(usage.num_stores, 1);
        assert!(usage.uses_variable_load_index);
        assert!(usage.uses_variable_store_index);
        assert!(usage.load_index_equals_store_index());
    }
}
