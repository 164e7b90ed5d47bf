//! Generator instances.

use crate::values::Values;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque, copyable ID for an instance within a module definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(u32);

impl InstanceId {
    /// Creates an ID from a raw `u32` index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw `u32` index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// One generator instance in the netlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// The unique instance name.
    pub name: String,
    /// The qualified generator handle, e.g. `coreir.add`.
    pub generator: String,
    /// Generator parameters (widths, depths, types).
    pub gen_args: Values,
    /// Module parameters (constant values, init payloads).
    pub mod_args: Values,
    /// Free-form annotations (tap markers).
    pub metadata: BTreeMap<String, String>,
}

impl Instance {
    /// Creates an instance with no metadata.
    pub fn new(name: String, generator: String, gen_args: Values, mod_args: Values) -> Self {
        Self {
            name,
            generator,
            gen_args,
            mod_args,
            metadata: BTreeMap::new(),
        }
    }
}
