//! Fatal synthesis errors.
//!
//! These are invariant violations: the upstream lowering produced IR this
//! backend's contract does not support, and the right response is to abort
//! the kernel's lowering with a descriptive message. Recoverable resolution
//! failures never surface here — they go to the diagnostic sink and lowering
//! continues with a fallback wire.

use spindle_netlist::NetlistError;
use thiserror::Error;

/// An invariant violation that aborts a kernel's lowering.
#[derive(Debug, Error)]
pub enum SynthError {
    /// Two operands of one operator disagreed on bit width.
    #[error("operand width mismatch in `{op}`: {a} is {a_bits} bits, {b} is {b_bits} bits")]
    WidthMismatch {
        /// The operator name.
        op: String,
        /// The left operand's printed name.
        a: String,
        /// The left operand's width.
        a_bits: u8,
        /// The right operand's printed name.
        b: String,
        /// The right operand's width.
        b_bits: u8,
    },

    /// Signed and unsigned operands were mixed in one comparison or shift.
    #[error("signedness mismatch in `{op}` between {a} and {b}")]
    SignednessMismatch {
        /// The operator name.
        op: String,
        /// The left operand's printed name.
        a: String,
        /// The right operand's printed name.
        b: String,
    },

    /// An `if` with an else branch reached the backend.
    #[error("else branch on hardware `if`; express value selection as a select expression")]
    ElseBranch,

    /// A serial loop's extent was not a compile-time constant.
    #[error("loop `{0}` has a non-constant extent")]
    NonConstLoopExtent(String),

    /// An allocation's size was not a compile-time constant.
    #[error("size for allocation `{0}` is not a constant")]
    NonConstAllocSize(String),

    /// A stencil bound's extent was not a compile-time constant.
    #[error("stencil `{0}` has non-constant bounds")]
    NonConstBounds(String),

    /// A realized stencil exceeded the supported rank.
    #[error("stencil `{name}` has rank {rank}; ranks up to 4 are supported")]
    StencilRank {
        /// The stencil name.
        name: String,
        /// The offending rank.
        rank: usize,
    },

    /// A variable load index depended on more than one loop variable.
    #[error("multiple variable indexing into loads is not implemented")]
    MultiVariableIndex,

    /// An index expression used a form symbolic evaluation does not cover.
    #[error("index expression form not supported for symbolic evaluation")]
    UnsupportedIndexExpr,

    /// A variable load addressed an allocation slot that was never stored.
    #[error("allocation `{name}` was not saved yet for index {index}")]
    MissingAllocationSlot {
        /// The allocation name.
        name: String,
        /// The evaluated address.
        index: i64,
    },

    /// A deferred definition was materialized while still a pending marker.
    #[error("deferred definition for `{0}` has no recipe")]
    EmptyRecipe(String),

    /// An output port was aliased with a non-empty index tuple.
    #[error("output `{0}` had indices selected")]
    IndexedOutput(String),

    /// A metadata scope survived past kernel teardown.
    #[error("scope for `{0}` leaked past kernel teardown")]
    ScopeLeak(String),

    /// A predicated accumulation register was initialized to a non-zero value.
    #[error("register arrays only support initialization at 0, got {0}")]
    NonZeroInit(i64),

    /// A kernel argument used a container kind the boundary cannot carry.
    #[error("kernel argument `{0}` has an unsupported container kind")]
    BadArgument(String),

    /// A streaming call form was missing its stream-name variable.
    #[error("expected a stream name variable in `{0}` call")]
    BadStreamCall(String),

    /// A counter recipe was malformed (non-zero min or non-unit increment).
    #[error("counter `{0}` must count from 0 with increment 1")]
    BadCounterShape(String),

    /// A variable load index referenced a loop variable with no counter.
    #[error("no counter definition found for loop variable `{0}`")]
    UnknownCounter(String),

    /// A predicated provide targeted a name with no realized storage cell.
    #[error("predicated provide into `{0}` requires realized storage")]
    UnbackedProvide(String),

    /// An underlying netlist operation failed.
    #[error(transparent)]
    Netlist(#[from] NetlistError),
}
