//! Expression trees.
//!
//! Expressions are pure: arithmetic, comparisons, selects, casts, loads from
//! named allocations, and calls. Calls cover both the bitwise/shift
//! intrinsics and the streaming pseudo-intrinsics; stencil reads appear as
//! calls whose name ends in `.stencil` or `.stencil_update`.

use crate::types::{ScalarType, TypeCode};
use serde::{Deserialize, Serialize};

/// Binary operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division. Only power-of-two divisors synthesize cleanly.
    Div,
    /// Modulo. Only power-of-two moduli synthesize cleanly.
    Mod,
    /// Minimum.
    Min,
    /// Maximum.
    Max,
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Less-than.
    Lt,
    /// Less-or-equal.
    Le,
    /// Greater-than.
    Gt,
    /// Greater-or-equal.
    Ge,
    /// Boolean and (one-bit operands).
    And,
    /// Boolean or (one-bit operands).
    Or,
}

impl BinaryOp {
    /// Returns `true` for the comparison operators, whose result is boolean.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

/// An IR expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A signed integer immediate.
    IntImm {
        /// The value.
        value: i64,
        /// The width in bits.
        bits: u8,
    },
    /// An unsigned integer immediate.
    UIntImm {
        /// The value.
        value: u64,
        /// The width in bits.
        bits: u8,
    },
    /// A floating-point immediate.
    FloatImm {
        /// The value.
        value: f64,
        /// The width in bits.
        bits: u8,
    },
    /// A string immediate (consumer tags in `dispatch_stream` argument lists).
    StringImm(String),
    /// A named value reference.
    Var {
        /// The IR-level name.
        name: String,
        /// The declared type.
        ty: ScalarType,
    },
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        a: Box<Expr>,
        /// Right operand.
        b: Box<Expr>,
    },
    /// Boolean negation of a one-bit value.
    Not(Box<Expr>),
    /// Value selection; the only conditional datapath the hardware model has.
    Select {
        /// The one-bit condition.
        condition: Box<Expr>,
        /// Value when the condition is true.
        true_value: Box<Expr>,
        /// Value when the condition is false.
        false_value: Box<Expr>,
    },
    /// A type cast.
    Cast {
        /// The destination type.
        ty: ScalarType,
        /// The value being cast.
        value: Box<Expr>,
    },
    /// A load from a named allocation.
    Load {
        /// The allocation name.
        name: String,
        /// The element index.
        index: Box<Expr>,
        /// The loaded element type.
        ty: ScalarType,
    },
    /// A call: intrinsic, streaming pseudo-intrinsic, or stencil access.
    Call {
        /// The callee name (`bitwise_and`, `read_stream`, `in.stencil`, …).
        name: String,
        /// The arguments.
        args: Vec<Expr>,
        /// The result type.
        ty: ScalarType,
    },
}

impl Expr {
    /// A 16-bit unsigned immediate, the backend's default operand width.
    pub fn u16(value: u64) -> Self {
        Expr::UIntImm { value, bits: 16 }
    }

    /// A boolean immediate.
    pub fn bool_imm(value: bool) -> Self {
        Expr::UIntImm {
            value: value as u64,
            bits: 1,
        }
    }

    /// A 16-bit unsigned variable reference.
    pub fn var(name: &str) -> Self {
        Expr::Var {
            name: name.to_string(),
            ty: ScalarType::uint(16),
        }
    }

    /// A binary operation node.
    pub fn binary(op: BinaryOp, a: Expr, b: Expr) -> Self {
        Expr::Binary {
            op,
            a: Box::new(a),
            b: Box::new(b),
        }
    }

    /// Computes the result type of this expression.
    pub fn ty(&self) -> ScalarType {
        match self {
            Expr::IntImm { bits, .. } => ScalarType::int(*bits),
            Expr::UIntImm { bits, .. } => ScalarType::uint(*bits),
            Expr::FloatImm { bits, .. } => ScalarType::float(*bits),
            Expr::StringImm(_) => ScalarType::uint(8),
            Expr::Var { ty, .. } => *ty,
            Expr::Binary { op, a, .. } => {
                if op.is_comparison() {
                    ScalarType::bool_type()
                } else {
                    a.ty()
                }
            }
            Expr::Not(_) => ScalarType::bool_type(),
            Expr::Select { true_value, .. } => true_value.ty(),
            Expr::Cast { ty, .. } => *ty,
            Expr::Load { ty, .. } => *ty,
            Expr::Call { ty, .. } => *ty,
        }
    }

    /// Returns the integer value if this is an integer immediate.
    pub fn as_const_int(&self) -> Option<i64> {
        match self {
            Expr::IntImm { value, .. } => Some(*value),
            Expr::UIntImm { value, .. } => Some(*value as i64),
            _ => None,
        }
    }

    /// Returns the float value if this is a floating-point immediate.
    pub fn as_const_float(&self) -> Option<f64> {
        match self {
            Expr::FloatImm { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Returns `true` for integer immediates.
    pub fn is_const(&self) -> bool {
        matches!(self, Expr::IntImm { .. } | Expr::UIntImm { .. })
    }

    /// Returns `true` for floating-point immediates.
    pub fn is_fconst(&self) -> bool {
        matches!(self, Expr::FloatImm { .. })
    }

    /// Returns the declared bit width of an immediate.
    pub fn const_bits(&self) -> Option<u8> {
        match self {
            Expr::IntImm { bits, .. } | Expr::UIntImm { bits, .. } | Expr::FloatImm { bits, .. } => {
                Some(*bits)
            }
            _ => None,
        }
    }

    /// Returns the value if this is a power-of-two integer immediate.
    pub fn as_const_power_of_two(&self) -> Option<u32> {
        let value = self.as_const_int()?;
        if value > 0 && (value & (value - 1)) == 0 {
            Some(value.trailing_zeros())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_result_is_bool() {
        let e = Expr::binary(BinaryOp::Lt, Expr::var("a"), Expr::var("b"));
        assert!(e.ty().is_bool());
    }

    #[test]
    fn arithmetic_result_follows_operand() {
        let e = Expr::binary(BinaryOp::Add, Expr::var("a"), Expr::var("b"));
        assert_eq!(e.ty(), ScalarType::uint(16));
    }

    #[test]
    fn const_helpers() {
        assert_eq!(Expr::u16(5).as_const_int(), Some(5));
        assert!(Expr::u16(5).is_const());
        assert!(!Expr::var("x").is_const());
        assert_eq!(Expr::u16(5).const_bits(), Some(16));
        let f = Expr::FloatImm {
            value: 1.5,
            bits: 32,
        };
        assert!(f.is_fconst());
        assert_eq!(f.as_const_float(), Some(1.5));
    }

    #[test]
    fn power_of_two_detection() {
        assert_eq!(Expr::u16(8).as_const_power_of_two(), Some(3));
        assert_eq!(Expr::u16(1).as_const_power_of_two(), Some(0));
        assert_eq!(Expr::u16(7).as_const_power_of_two(), None);
        assert_eq!(Expr::u16(0).as_const_power_of_two(), None);
    }

    #[test]
    fn cast_and_select_types() {
        let sel = Expr::Select {
            condition: Box::new(Expr::bool_imm(true)),
            true_value: Box::new(Expr::u16(1)),
            false_value: Box::new(Expr::u16(0)),
        };
        assert_eq!(sel.ty(), ScalarType::uint(16));
        let cast = Expr::Cast {
            ty: ScalarType::uint(1),
            value: Box::new(Expr::u16(3)),
        };
        assert!(cast.ty().is_bool());
    }

    #[test]
    fn structural_equality() {
        let a = Expr::binary(BinaryOp::Mul, Expr::var("x"), Expr::u16(2));
        let b = Expr::binary(BinaryOp::Mul, Expr::var("x"), Expr::u16(2));
        let c = Expr::binary(BinaryOp::Mul, Expr::var("y"), Expr::u16(2));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn serde_roundtrip() {
        let e = Expr::binary(BinaryOp::Max, Expr::var("a"), Expr::u16(9));
        let json = serde_json::to_string(&e).unwrap();
        let back: Expr = serde_json::from_str(&json).unwrap();
        assert_eq!(e, back);
    }
}
