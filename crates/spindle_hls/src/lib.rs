//! Textual HLS C++ emission utilities.
//!
//! The synthesis pass emits a human-inspectable HLS-style C++ rendering of
//! each kernel alongside the hardware graph, annotated with provenance
//! comments for every wire and instance it creates. This crate holds the
//! pieces of that emission the netlist engine reuses: name mangling, the
//! expression-to-temporary cache that doubles as the structural dedup key,
//! scalar and stencil type printing, and the indented source writers.

#![warn(missing_docs)]

pub mod exprs;
pub mod names;
pub mod stencil;
pub mod writer;

pub use exprs::{print_type, ExprNamer};
pub use names::{print_name, strip_stream};
pub use stencil::{print_stencil_pragma, print_stencil_type};
pub use writer::CodeWriter;
