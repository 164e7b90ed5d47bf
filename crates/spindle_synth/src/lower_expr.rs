//! Expression lowering: one hardware operator instance per IR node.
//!
//! One, two, and three-operand forms share a pattern: print the canonical
//! textual key for the result (the dedup identity), early-return if that key
//! already resolves to a wire, resolve each operand, check the width policy,
//! instantiate the primitive at the scaled width, connect the numbered input
//! ports, and register the instance output as the new wire for the key.
//! One-bit booleans route to the dedicated bit-level primitives.

use crate::context::SynthesisContext;
use crate::error::SynthError;
use spindle_diagnostics::Category;
use spindle_hls::{print_name, print_type};
use spindle_ir::{BinaryOp, Expr, ScalarType};
use spindle_netlist::values::values;
use spindle_netlist::{ParamValue, Values, Wire};

impl<'a> SynthesisContext<'a> {
    /// Lowers an expression, returning the printed name of its value.
    pub fn lower_expr(&mut self, e: &Expr) -> Result<String, SynthError> {
        match e {
            Expr::IntImm { value, .. } => Ok(value.to_string()),
            Expr::UIntImm { value, .. } => Ok(value.to_string()),
            Expr::FloatImm { value, .. } => Ok(format!("{value}f")),
            Expr::StringImm(s) => Ok(s.clone()),
            Expr::Var { name, .. } => Ok(print_name(name)),

            Expr::Binary { op, a, b } => self.lower_binary(*op, a, b, e.ty()),

            Expr::Not(a) => {
                // boolean negation only exists at one bit
                if a.ty().bits != 1 {
                    return Err(SynthError::WidthMismatch {
                        op: "bitnot".to_string(),
                        a: "operand".to_string(),
                        a_bits: a.ty().bits,
                        b: "expected".to_string(),
                        b_bits: 1,
                    });
                }
                self.visit_unaryop(e.ty(), a, "!", "bitnot")
            }

            Expr::Select {
                condition,
                true_value,
                false_value,
            } => {
                let op_name = if e.ty().bits == 1 { "bitmux" } else { "mux" };
                self.visit_ternop(e.ty(), condition, true_value, false_value, "?", ":", op_name)
            }

            Expr::Cast { ty, value } => self.lower_cast(*ty, value),

            Expr::Load { name, index, ty } => self.lower_load(name, index, *ty),

            Expr::Call { name, args, ty } => self.lower_call(name, args, *ty),
        }
    }

    fn lower_binary(
        &mut self,
        op: BinaryOp,
        a: &Expr,
        b: &Expr,
        t: ScalarType,
    ) -> Result<String, SynthError> {
        let one_bit = a.ty().bits == 1;
        let is_float = a.ty().is_float();
        match op {
            BinaryOp::Add if is_float => self.visit_binop(t, a, b, "f+", "fadd"),
            BinaryOp::Add => self.visit_binop(t, a, b, "+", "add"),
            BinaryOp::Sub if is_float => self.visit_binop(t, a, b, "f-", "fsub"),
            BinaryOp::Sub => self.visit_binop(t, a, b, "-", "sub"),
            BinaryOp::Mul if is_float => self.visit_binop(t, a, b, "f*", "fmul"),
            BinaryOp::Mul => self.visit_binop(t, a, b, "*", "mul"),
            BinaryOp::Div => self.lower_div(a, b, t),
            BinaryOp::Mod => self.lower_mod(a, b, t),
            BinaryOp::Min => {
                let gen = if a.ty().is_uint() { "umin" } else { "smin" };
                self.visit_binop(t, a, b, "<min>", gen)
            }
            BinaryOp::Max => {
                let gen = if a.ty().is_uint() { "umax" } else { "smax" };
                self.visit_binop(t, a, b, "<max>", gen)
            }
            BinaryOp::Eq if one_bit => self.visit_binop(t, a, b, "~^", "bitxnor"),
            BinaryOp::Eq => self.visit_binop(t, a, b, "==", "eq"),
            BinaryOp::Ne if one_bit => self.visit_binop(t, a, b, "^", "bitxor"),
            BinaryOp::Ne => self.visit_binop(t, a, b, "!=", "neq"),
            BinaryOp::Lt => self.lower_compare(a, b, t, "<", "ult", "bitult", "slt", "s<"),
            BinaryOp::Le => self.lower_compare(a, b, t, "<=", "ule", "bitule", "sle", "s<="),
            BinaryOp::Gt => self.lower_compare(a, b, t, ">", "ugt", "bitugt", "sgt", "s>"),
            BinaryOp::Ge => self.lower_compare(a, b, t, ">=", "uge", "bituge", "sge", "s>="),
            BinaryOp::And if one_bit => self.visit_binop(t, a, b, "&&", "bitand"),
            BinaryOp::And => self.visit_binop(t, a, b, "&&", "and"),
            BinaryOp::Or if one_bit => self.visit_binop(t, a, b, "||", "bitor"),
            BinaryOp::Or => self.visit_binop(t, a, b, "||", "or"),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn lower_compare(
        &mut self,
        a: &Expr,
        b: &Expr,
        t: ScalarType,
        sym: &str,
        unsigned: &str,
        unsigned_bit: &str,
        signed: &str,
        signed_sym: &str,
    ) -> Result<String, SynthError> {
        if a.ty().is_uint() {
            if !b.ty().is_uint() {
                return Err(SynthError::SignednessMismatch {
                    op: unsigned.to_string(),
                    a: format!("{:?}", a.ty()),
                    b: format!("{:?}", b.ty()),
                });
            }
            if a.ty().bits == 1 {
                self.visit_binop(t, a, b, sym, unsigned_bit)
            } else {
                self.visit_binop(t, a, b, sym, unsigned)
            }
        } else {
            if b.ty().is_uint() {
                return Err(SynthError::SignednessMismatch {
                    op: signed.to_string(),
                    a: format!("{:?}", a.ty()),
                    b: format!("{:?}", b.ty()),
                });
            }
            self.visit_binop(t, a, b, signed_sym, signed)
        }
    }

    /// Division by a power-of-two constant is a shift; anything else emits
    /// the general divider with a warning — a known, accepted limitation.
    fn lower_div(&mut self, a: &Expr, b: &Expr, t: ScalarType) -> Result<String, SynthError> {
        if let Some(shift) = b.as_const_power_of_two() {
            let shift_expr = Expr::UIntImm {
                value: shift as u64,
                bits: a.ty().bits,
            };
            if a.ty().is_uint() {
                self.visit_binop(t, a, &shift_expr, ">>", "lshr")
            } else {
                self.visit_binop(t, a, &shift_expr, ">>", "ashr")
            }
        } else {
            self.warn(Category::Lower, 1, "divide is not fully supported");
            self.visit_binop(t, a, b, "/", "div")
        }
    }

    /// Modulo by a power-of-two constant masks the low bits; anything else
    /// produces no hardware, only a diagnostic comment.
    fn lower_mod(&mut self, a: &Expr, b: &Expr, t: ScalarType) -> Result<String, SynthError> {
        if let Some(n) = b.as_const_power_of_two() {
            let mask = (1u64 << n) - 1;
            let mask_expr = Expr::UIntImm {
                value: mask,
                bits: a.ty().bits,
            };
            self.visit_binop(t, a, &mask_expr, "&", "and")
        } else {
            self.warn(Category::Lower, 2, "mod is not fully supported");
            let a_name = self.lower_expr(a)?;
            let b_name = self.lower_expr(b)?;
            Ok(self.print_assignment(t, &format!("{a_name} % {b_name}")))
        }
    }

    fn lower_cast(&mut self, ty: ScalarType, value: &Expr) -> Result<String, SynthError> {
        let in_var = self.lower_expr(value)?;

        if ty.bits > 1 && value.ty().bits == 1 {
            // widening a bit selects between the two literals through a mux
            self.src.comment(&format!("casting from 1 to {} bits", ty.bits));
            let one = Expr::UIntImm {
                value: 1,
                bits: self.options.bitwidth as u8,
            };
            let zero = Expr::UIntImm {
                value: 0,
                bits: self.options.bitwidth as u8,
            };
            return self.visit_ternop(ty, value, &one, &zero, "?", ":", "mux");
        }

        if ty.bits == 1 && value.ty().bits > 1 {
            // narrowing is an inequality-to-zero comparison
            self.src.comment(&format!("casting from {} to 1 bit", value.ty().bits));
            let zero = Expr::UIntImm {
                value: 0,
                bits: value.ty().bits,
            };
            return self.visit_binop(ty, value, &zero, "!=", "neq");
        }

        let out_var =
            self.print_assignment(ty, &format!("({})({in_var})", print_type(ty)));
        if !value.is_const() {
            // same-container cast: representational, no physical operator
            self.rename_wire(&out_var, &in_var, Some(value), &[])?;
        }
        Ok(out_var)
    }

    fn lower_call(
        &mut self,
        name: &str,
        args: &[Expr],
        ty: ScalarType,
    ) -> Result<String, SynthError> {
        match name {
            "bitwise_and" => {
                let (a, b) = (&args[0], &args[1]);
                if ty.bits == 1 {
                    self.visit_binop(ty, a, b, "&&", "bitand")
                } else {
                    self.visit_binop(ty, a, b, "&", "and")
                }
            }
            "bitwise_or" => {
                let (a, b) = (&args[0], &args[1]);
                if ty.bits == 1 {
                    self.visit_binop(ty, a, b, "||", "bitor")
                } else {
                    self.visit_binop(ty, a, b, "|", "or")
                }
            }
            "bitwise_xor" => {
                let (a, b) = (&args[0], &args[1]);
                if ty.bits == 1 {
                    self.visit_binop(ty, a, b, "^", "bitxor")
                } else {
                    self.visit_binop(ty, a, b, "^", "xor")
                }
            }
            "bitwise_not" => {
                let a = &args[0];
                if ty.bits == 1 {
                    self.visit_unaryop(ty, a, "!", "bitnot")
                } else {
                    self.visit_unaryop(ty, a, "~", "not")
                }
            }
            "shift_left" => self.visit_binop(ty, &args[0], &args[1], "<<", "shl"),
            "shift_right" => {
                let (a, b) = (&args[0], &args[1]);
                if a.ty().is_uint() {
                    self.visit_binop(ty, a, b, ">>", "lshr")
                } else {
                    self.visit_binop(ty, a, b, ">>", "ashr")
                }
            }
            "abs" => self.visit_unaryop(ty, &args[0], "abs", "abs"),
            "absd" => self.visit_binop(ty, &args[0], &args[1], "|-|", "absd"),
            "reinterpret" => {
                let in_var = self.lower_expr(&args[0])?;
                self.src.comment(&format!("reinterpreting {in_var}"));
                self.rename_wire(&in_var, &in_var, Some(&args[0]), &[])?;
                Ok(in_var)
            }
            "linebuffer" => {
                self.lower_linebuffer(args)?;
                Ok("0".to_string())
            }
            "write_stream" => {
                self.lower_write_stream(args)?;
                Ok("0".to_string())
            }
            "read_stream" => {
                self.lower_read_stream(args)?;
                Ok("0".to_string())
            }
            "dispatch_stream" => {
                self.lower_dispatch_stream(args)?;
                Ok("0".to_string())
            }
            n if n.ends_with(".stencil") || n.ends_with(".stencil_update") => {
                self.lower_stencil_read(n, args, ty)
            }
            other => {
                self.warn(
                    Category::Lower,
                    3,
                    &format!("couldn't find op named {other}"),
                );
                Ok("0".to_string())
            }
        }
    }

    /// One-operand form: `in` → `out`.
    pub(crate) fn visit_unaryop(
        &mut self,
        t: ScalarType,
        a: &Expr,
        op_sym: &str,
        op_name: &str,
    ) -> Result<String, SynthError> {
        let a_name = self.lower_expr(a)?;
        let out_var = self.print_assignment(t, &format!("{op_sym}({a_name})"));
        if self.is_wire(&out_var) {
            return Ok(out_var);
        }

        let a_wire = self.get_wire(&a_name, Some(a), &[])?;
        let inst_name = format!("{op_name}{a_name}");
        let id = self.add_op_instance(&inst_name, op_name, a.ty().bits)?;
        self.def.connect(a_wire, Wire::inst(id).sel("in"));
        self.add_wire(&out_var, Wire::inst(id).sel("out"), &[])?;

        self.src.comment(&format!(
            "{op_name} a: {a_name} o: {out_var} with bitwidth {}",
            t.bits
        ));
        Ok(out_var)
    }

    /// Two-operand form: `in0`, `in1` → `out`.
    pub(crate) fn visit_binop(
        &mut self,
        t: ScalarType,
        a: &Expr,
        b: &Expr,
        op_sym: &str,
        op_name: &str,
    ) -> Result<String, SynthError> {
        let a_name = self.lower_expr(a)?;
        let b_name = self.lower_expr(b)?;
        let out_var = self.print_assignment(t, &format!("{a_name} {op_sym} {b_name}"));
        if self.is_wire(&out_var) {
            return Ok(out_var);
        }

        if a.ty().bits != b.ty().bits {
            return Err(SynthError::WidthMismatch {
                op: op_name.to_string(),
                a: a_name,
                a_bits: a.ty().bits,
                b: b_name,
                b_bits: b.ty().bits,
            });
        }

        let a_wire = self.get_wire(&a_name, Some(a), &[])?;
        let b_wire = self.get_wire(&b_name, Some(b), &[])?;
        let inst_name = format!("{op_name}{a_name}{b_name}{out_var}");
        let id = self.add_op_instance(&inst_name, op_name, a.ty().bits)?;
        self.def.connect(a_wire, Wire::inst(id).sel("in0"));
        self.def.connect(b_wire, Wire::inst(id).sel("in1"));
        self.add_wire(&out_var, Wire::inst(id).sel("out"), &[])?;

        self.src.comment(&format!(
            "{op_name} a: {a_name} b: {b_name} o: {out_var} with obitwidth {}",
            t.bits
        ));
        Ok(out_var)
    }

    /// Three-operand form. Multiplexers wire `sel`/`in1`/`in0` with the true
    /// branch on `in1`; everything else uses numbered inputs.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn visit_ternop(
        &mut self,
        t: ScalarType,
        a: &Expr,
        b: &Expr,
        c: &Expr,
        op_sym1: &str,
        op_sym2: &str,
        op_name: &str,
    ) -> Result<String, SynthError> {
        let a_name = self.lower_expr(a)?;
        let b_name = self.lower_expr(b)?;
        let c_name = self.lower_expr(c)?;
        let out_var = self.print_assignment(
            t,
            &format!("{a_name} {op_sym1} {b_name} {op_sym2} {c_name}"),
        );
        if self.is_wire(&out_var) {
            return Ok(out_var);
        }

        if b.ty().bits != c.ty().bits {
            return Err(SynthError::WidthMismatch {
                op: op_name.to_string(),
                a: b_name,
                a_bits: b.ty().bits,
                b: c_name,
                b_bits: c.ty().bits,
            });
        }

        let a_wire = self.get_wire(&a_name, Some(a), &[])?;
        let b_wire = self.get_wire(&b_name, Some(b), &[])?;
        let c_wire = self.get_wire(&c_name, Some(c), &[])?;
        let inst_name = format!("{op_name}{a_name}{b_name}{c_name}");
        let id = self.add_op_instance(&inst_name, op_name, b.ty().bits)?;

        if op_name == "mux" || op_name == "bitmux" || op_name == "fmux" {
            self.def.connect(a_wire, Wire::inst(id).sel("sel"));
            self.def.connect(b_wire, Wire::inst(id).sel("in1"));
            self.def.connect(c_wire, Wire::inst(id).sel("in0"));
        } else {
            self.def.connect(a_wire, Wire::inst(id).sel("in0"));
            self.def.connect(b_wire, Wire::inst(id).sel("in1"));
            self.def.connect(c_wire, Wire::inst(id).sel("in2"));
        }
        self.add_wire(&out_var, Wire::inst(id).sel("out"), &[])?;

        self.src.comment(&format!(
            "{op_name} a: {a_name} b: {b_name} c: {c_name} o: {out_var}"
        ));
        Ok(out_var)
    }

    /// Instantiates a primitive operator at the policy-scaled width.
    ///
    /// Bit-level modules take no width parameter; generators do.
    pub(crate) fn add_op_instance(
        &mut self,
        inst_name: &str,
        op_name: &str,
        operand_bits: u8,
    ) -> Result<spindle_netlist::InstanceId, SynthError> {
        let gen = self.gens.get(op_name)?.to_string();
        let gen_args = if gen.starts_with("corebit.") {
            Values::new()
        } else {
            let bw = self.options.instance_width(operand_bits);
            values([("width", ParamValue::Int(bw as i64))])
        };
        Ok(self.def.add_instance(inst_name, &gen, gen_args, Values::new()))
    }
}
