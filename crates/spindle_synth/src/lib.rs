//! Netlist synthesis engine for the Spindle hardware backend.
//!
//! Given a lowered loop-nest statement tree and per-kernel argument
//! metadata, this crate walks the tree once and incrementally builds a
//! structural hardware graph — operator instances, muxes for variable
//! indexing, counters for loop induction, line-buffers, ROM/SRAM memories,
//! and register arrays for accumulation — while tracking each named value's
//! role (wire, input, storage, deferred definition, or constant) so the same
//! IR name renders correctly wherever it is referenced. Alongside the graph
//! it emits an HLS-style C++ rendering annotated with provenance comments.
//!
//! # Usage
//!
//! ```ignore
//! use spindle_synth::{add_kernel, TargetOptions};
//! let artifacts = add_kernel(&stmt, "blur", &args, &TargetOptions::default(), &sink)?;
//! artifacts.save(Path::new("out"))?;
//! ```

#![warn(missing_docs)]

pub mod alloc;
pub mod context;
pub mod error;
pub mod kernel;
pub mod lower_access;
mod lower_expr;
mod lower_stmt;
mod lower_stream;
mod resolve;

pub use context::{DeferredDef, StorageCell, SynthesisContext, TargetOptions};
pub use error::SynthError;
pub use kernel::{add_kernel, KernelArtifacts};
