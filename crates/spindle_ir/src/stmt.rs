//! Statement trees.

use crate::expr::Expr;
use crate::kernel::Bound;
use crate::types::ScalarType;
use serde::{Deserialize, Serialize};

/// An IR statement node.
///
/// Loops are serial only; conditionals have no synthesizable else branch
/// (value selection must be expressed as [`Expr::Select`] upstream).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// A serial counted loop over `[min, min + extent)`.
    For {
        /// The induction variable name.
        name: String,
        /// The loop minimum.
        min: Expr,
        /// The loop extent (must be a compile-time constant).
        extent: Expr,
        /// The loop body.
        body: Box<Stmt>,
    },
    /// A conditional. The else branch is not supported by this backend.
    IfThenElse {
        /// The one-bit condition.
        condition: Expr,
        /// The then branch.
        then_case: Box<Stmt>,
        /// The else branch; its presence is a fatal error during lowering.
        else_case: Option<Box<Stmt>>,
    },
    /// A sequence of statements.
    Block(Vec<Stmt>),
    /// Brings a stream/stencil buffer into scope for the body.
    Realize {
        /// The buffer name (`*.stream`, `*.stencil`, `*.stencil_update`).
        name: String,
        /// The element type.
        elem: ScalarType,
        /// Per-dimension bounds; extents must be compile-time constants.
        bounds: Vec<Bound>,
        /// The scope body.
        body: Box<Stmt>,
    },
    /// A scratch allocation with constant size.
    Allocate {
        /// The allocation name.
        name: String,
        /// The element type.
        elem: ScalarType,
        /// Per-dimension extents.
        extents: Vec<Expr>,
        /// The scope body.
        body: Box<Stmt>,
    },
    /// A stencil write: `name(args...) = value`.
    Provide {
        /// The stencil name.
        name: String,
        /// The per-dimension indices.
        args: Vec<Expr>,
        /// The stored value.
        value: Expr,
    },
    /// A flat store into an allocation.
    Store {
        /// The allocation name.
        name: String,
        /// The element index.
        index: Expr,
        /// The stored value.
        value: Expr,
    },
    /// Evaluates an expression for its effects (streaming call forms).
    Evaluate(Expr),
    /// Marks the producer or consumer half of a buffer's lifetime.
    ProducerConsumer {
        /// The buffer name.
        name: String,
        /// `true` for the producer half.
        is_producer: bool,
        /// The region body.
        body: Box<Stmt>,
    },
    /// Frees an allocation.
    Free {
        /// The allocation name.
        name: String,
    },
}

impl Stmt {
    /// A block of statements, flattening the trivial one-element case.
    pub fn block(mut stmts: Vec<Stmt>) -> Stmt {
        if stmts.len() == 1 {
            stmts.remove(0)
        } else {
            Stmt::Block(stmts)
        }
    }
}
