//! Scalar element types carried by IR values.

use serde::{Deserialize, Serialize};

/// The numeric interpretation of a scalar value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeCode {
    /// Two's-complement signed integer.
    Int,
    /// Unsigned integer. One-bit unsigned doubles as boolean.
    UInt,
    /// IEEE floating point (limited operator support in hardware).
    Float,
}

/// A scalar type: interpretation plus bit width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScalarType {
    /// The numeric interpretation.
    pub code: TypeCode,
    /// The width in bits.
    pub bits: u8,
}

impl ScalarType {
    /// An unsigned integer of the given width.
    pub fn uint(bits: u8) -> Self {
        Self {
            code: TypeCode::UInt,
            bits,
        }
    }

    /// A signed integer of the given width.
    pub fn int(bits: u8) -> Self {
        Self {
            code: TypeCode::Int,
            bits,
        }
    }

    /// A float of the given width.
    pub fn float(bits: u8) -> Self {
        Self {
            code: TypeCode::Float,
            bits,
        }
    }

    /// The boolean type: one unsigned bit.
    pub fn bool_type() -> Self {
        Self::uint(1)
    }

    /// Returns `true` for unsigned integer types.
    pub fn is_uint(&self) -> bool {
        self.code == TypeCode::UInt
    }

    /// Returns `true` for signed integer types.
    pub fn is_int(&self) -> bool {
        self.code == TypeCode::Int
    }

    /// Returns `true` for float types.
    pub fn is_float(&self) -> bool {
        self.code == TypeCode::Float
    }

    /// Returns `true` for the one-bit unsigned (boolean) type.
    pub fn is_bool(&self) -> bool {
        self.is_uint() && self.bits == 1
    }
}
