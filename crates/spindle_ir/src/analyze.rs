//! Structural queries over statement trees.
//!
//! These mirror the small scans the lowering pass needs before committing to
//! hardware: does a body contain a nested loop, which loop variables appear,
//! and is a given variable referenced at all.

use crate::expr::Expr;
use crate::stmt::Stmt;

/// Returns `true` if `stmt` contains a `For` loop anywhere.
pub fn contains_for_loop(stmt: &Stmt) -> bool {
    !contained_for_loop_names(stmt).is_empty()
}

/// Returns the name of the first (shallowest, leftmost) `For` loop in `stmt`.
pub fn first_for_loop_name(stmt: &Stmt) -> Option<String> {
    contained_for_loop_names(stmt).into_iter().next()
}

/// Collects every `For` loop variable name in `stmt`, in visit order.
pub fn contained_for_loop_names(stmt: &Stmt) -> Vec<String> {
    let mut names = Vec::new();
    collect_for_names(stmt, &mut names);
    names
}

fn collect_for_names(stmt: &Stmt, names: &mut Vec<String>) {
    match stmt {
        Stmt::For { name, body, .. } => {
            names.push(name.clone());
            collect_for_names(body, names);
        }
        Stmt::IfThenElse {
            then_case,
            else_case,
            ..
        } => {
            collect_for_names(then_case, names);
            if let Some(else_case) = else_case {
                collect_for_names(else_case, names);
            }
        }
        Stmt::Block(stmts) => {
            for s in stmts {
                collect_for_names(s, names);
            }
        }
        Stmt::Realize { body, .. }
        | Stmt::Allocate { body, .. }
        | Stmt::ProducerConsumer { body, .. } => collect_for_names(body, names),
        Stmt::Provide { .. } | Stmt::Store { .. } | Stmt::Evaluate(_) | Stmt::Free { .. } => {}
    }
}

/// Returns `true` if `varname` is referenced anywhere in `stmt`.
///
/// Multi-argument `write_stream` calls only have their first two arguments
/// examined — the trailing loop-bound pairs exist for TLAST tagging and must
/// not force a counter into existence.
pub fn variable_used(stmt: &Stmt, varname: &str) -> bool {
    match stmt {
        Stmt::For {
            min, extent, body, ..
        } => {
            expr_uses_variable(min, varname)
                || expr_uses_variable(extent, varname)
                || variable_used(body, varname)
        }
        Stmt::IfThenElse {
            condition,
            then_case,
            else_case,
        } => {
            expr_uses_variable(condition, varname)
                || variable_used(then_case, varname)
                || else_case
                    .as_ref()
                    .is_some_and(|e| variable_used(e, varname))
        }
        Stmt::Block(stmts) => stmts.iter().any(|s| variable_used(s, varname)),
        Stmt::Realize { bounds, body, .. } => {
            bounds.iter().any(|b| {
                expr_uses_variable(&b.min, varname) || expr_uses_variable(&b.extent, varname)
            }) || variable_used(body, varname)
        }
        Stmt::Allocate { extents, body, .. } => {
            extents.iter().any(|e| expr_uses_variable(e, varname)) || variable_used(body, varname)
        }
        Stmt::Provide { args, value, .. } => {
            args.iter().any(|a| expr_uses_variable(a, varname))
                || expr_uses_variable(value, varname)
        }
        Stmt::Store { index, value, .. } => {
            expr_uses_variable(index, varname) || expr_uses_variable(value, varname)
        }
        Stmt::Evaluate(e) => expr_uses_variable(e, varname),
        Stmt::ProducerConsumer { body, .. } => variable_used(body, varname),
        Stmt::Free { .. } => false,
    }
}

fn expr_uses_variable(expr: &Expr, varname: &str) -> bool {
    match expr {
        Expr::Var { name, .. } => name == varname,
        Expr::IntImm { .. }
        | Expr::UIntImm { .. }
        | Expr::FloatImm { .. }
        | Expr::StringImm(_) => false,
        Expr::Binary { a, b, .. } => expr_uses_variable(a, varname) || expr_uses_variable(b, varname),
        Expr::Not(a) => expr_uses_variable(a, varname),
        Expr::Select {
            condition,
            true_value,
            false_value,
        } => {
            expr_uses_variable(condition, varname)
                || expr_uses_variable(true_value, varname)
                || expr_uses_variable(false_value, varname)
        }
        Expr::Cast { value, .. } => expr_uses_variable(value, varname),
        Expr::Load { index, .. } => expr_uses_variable(index, varname),
        Expr::Call { name, args, .. } => {
            let examined: &[Expr] = if name == "write_stream" && args.len() > 2 {
                &args[..2]
            } else {
                args
            };
            examined.iter().any(|a| expr_uses_variable(a, varname))
        }
    }
}
