//! Hardware port types.
//!
//! Types describe the shape of a terminal: a single bit, a nested bit array,
//! or a record of named fields (the module interface). Stencil shapes become
//! nested arrays — element width innermost, then one array level per
//! dimension.

use serde::{Deserialize, Serialize};

/// The type of a hardware terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HwType {
    /// A single output bit.
    Bit,
    /// A single input bit.
    BitIn,
    /// A fixed-length array of a nested type.
    Array {
        /// The number of elements.
        len: u32,
        /// The element type.
        elem: Box<HwType>,
    },
    /// A record of named fields.
    Record(Vec<(String, HwType)>),
}

impl HwType {
    /// Wraps this type in an array of the given length.
    pub fn array(self, len: u32) -> HwType {
        HwType::Array {
            len,
            elem: Box::new(self),
        }
    }

    /// Builds the nested-array type for a buffer: `bits` wide elements (one
    /// bare bit when `bits == 1`), wrapped once per dimension extent,
    /// innermost extent first.
    pub fn packed(input: bool, bits: u32, extents: &[u32]) -> HwType {
        let base = if input { HwType::BitIn } else { HwType::Bit };
        let mut ty = if bits > 1 { base.array(bits) } else { base };
        for &extent in extents {
            ty = ty.array(extent);
        }
        ty
    }

    /// Returns the outermost array length, or `None` for non-arrays.
    pub fn array_len(&self) -> Option<u32> {
        match self {
            HwType::Array { len, .. } => Some(*len),
            _ => None,
        }
    }

    /// Returns the element type one array level down, or `None`.
    pub fn elem(&self) -> Option<&HwType> {
        match self {
            HwType::Array { elem, .. } => Some(elem),
            _ => None,
        }
    }

    /// Returns the total number of bits in this type.
    pub fn bit_count(&self) -> u32 {
        match self {
            HwType::Bit | HwType::BitIn => 1,
            HwType::Array { len, elem } => len * elem.bit_count(),
            HwType::Record(fields) => fields.iter().map(|(_, t)| t.bit_count()).sum(),
        }
    }
}
