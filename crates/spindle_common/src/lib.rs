//! Shared foundational types used across the Spindle hardware backend.
//!
//! This crate provides bit-width arithmetic, the scoped symbol table used by
//! the synthesis pass for stencil and allocation metadata, and the unique-name
//! generator that keeps netlist instance names collision-free.

#![warn(missing_docs)]

pub mod bits;
pub mod scope;
pub mod unique;

pub use bits::num_bits;
pub use scope::ScopedMap;
pub use unique::UniqueNames;
