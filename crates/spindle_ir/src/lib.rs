//! The lowered loop-nest IR consumed by the Spindle hardware backend.
//!
//! Upstream scheduling passes produce a statement tree over a small, fixed
//! vocabulary: serial loops, single-branch conditionals, buffer realizations
//! and allocations, stencil provides, loads/stores, and a handful of
//! pseudo-intrinsic call forms (`read_stream`, `write_stream`, `linebuffer`,
//! `dispatch_stream`, stencil accesses). This crate defines those trees as
//! closed sum types with exhaustive matching, plus the argument metadata the
//! backend receives per accelerated kernel.

#![warn(missing_docs)]

pub mod analyze;
pub mod expr;
pub mod kernel;
pub mod stmt;
pub mod types;

pub use analyze::{contained_for_loop_names, contains_for_loop, first_for_loop_name, variable_used};
pub use expr::{BinaryOp, Expr};
pub use kernel::{Bound, KernelArg, StencilKind, StencilType};
pub use stmt::Stmt;
pub use types::{ScalarType, TypeCode};
