//! Kernel-argument metadata and stencil shapes.
//!
//! For each accelerated kernel the upstream passes hand the backend a list of
//! [`KernelArg`]s describing the module boundary: streamed stencils, tap
//! arrays, scalar taps, and which argument is the output.

use crate::expr::Expr;
use crate::types::ScalarType;
use serde::{Deserialize, Serialize};

/// The container kind of a named buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StencilKind {
    /// A plain fixed-shape window of values.
    Stencil,
    /// A FIFO stream of stencils.
    Stream,
    /// An AXI stream of stencils (kernel boundary).
    AxiStream,
}

/// One dimension's bounds: a minimum and a compile-time-constant extent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    /// The dimension minimum.
    pub min: Expr,
    /// The dimension extent. Must be a compile-time constant.
    pub extent: Expr,
}

impl Bound {
    /// A bound starting at zero with a constant extent.
    pub fn extent(extent: u64) -> Self {
        Self {
            min: Expr::u16(0),
            extent: Expr::u16(extent),
        }
    }
}

/// A named value's hardware shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StencilType {
    /// The container kind.
    pub kind: StencilKind,
    /// The element type.
    pub elem: ScalarType,
    /// Per-dimension bounds, innermost first.
    pub bounds: Vec<Bound>,
    /// FIFO depth; meaningful only for `Stream`/`AxiStream`.
    pub depth: u32,
}

impl StencilType {
    /// Returns the constant extents of all bounds, innermost first.
    ///
    /// Returns `None` if any extent is not a compile-time constant — an
    /// upstream contract violation the caller turns into an error.
    pub fn const_extents(&self) -> Option<Vec<u32>> {
        self.bounds
            .iter()
            .map(|b| b.extent.as_const_int().map(|e| e as u32))
            .collect()
    }
}

/// Metadata for one kernel argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelArg {
    /// The IR-level name of the argument.
    pub name: String,
    /// `true` when the argument is a stencil/stream; `false` for scalar taps.
    pub is_stencil: bool,
    /// `true` when this argument is the kernel's output.
    pub is_output: bool,
    /// The stencil shape, when `is_stencil`.
    pub stencil: Option<StencilType>,
    /// The scalar type, when not a stencil.
    pub scalar: ScalarType,
}

impl KernelArg {
    /// An AXI-stream input argument.
    pub fn stream_input(name: &str, stencil: StencilType) -> Self {
        Self {
            name: name.to_string(),
            is_stencil: true,
            is_output: false,
            stencil: Some(stencil),
            scalar: ScalarType::uint(16),
        }
    }

    /// An AXI-stream output argument.
    pub fn stream_output(name: &str, stencil: StencilType) -> Self {
        Self {
            name: name.to_string(),
            is_stencil: true,
            is_output: true,
            stencil: Some(stencil),
            scalar: ScalarType::uint(16),
        }
    }

    /// A scalar tap argument.
    pub fn scalar_tap(name: &str, scalar: ScalarType) -> Self {
        Self {
            name: name.to_string(),
            is_stencil: false,
            is_output: false,
            stencil: None,
            scalar,
        }
    }
}
