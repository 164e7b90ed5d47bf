//! Structured diagnostics for the Spindle backend.
//!
//! Lowering a kernel distinguishes two severities: invariant violations abort
//! compilation, while resolution failures are reported here and lowering
//! continues with a fallback wire. Every warning emitted into the sink is also
//! mirrored as a comment in the generated HLS source, so the two audit trails
//! stay in sync.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use severity::Severity;
pub use sink::DiagnosticSink;
