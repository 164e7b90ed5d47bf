//! The structural hardware netlist built by the Spindle synthesis pass.
//!
//! A [`ModuleDef`] is a flat graph of typed generator instances joined by
//! point-to-point connections between selectable wire paths. The synthesis
//! pass mutates one `ModuleDef` per accelerated kernel; at teardown the
//! design is run through the rewrite passes in [`passes`] and serialized to
//! JSON and DOT by [`save`].

#![warn(missing_docs)]

pub mod error;
pub mod generators;
pub mod hwtype;
pub mod instance;
pub mod module;
pub mod passes;
pub mod save;
pub mod values;
pub mod wire;

pub use error::NetlistError;
pub use generators::GeneratorRegistry;
pub use hwtype::HwType;
pub use instance::{Instance, InstanceId};
pub use module::{Connection, ModuleDef};
pub use values::{ParamValue, Values};
pub use wire::{Sel, Wire, WireRoot};
