//! Structured-access lowering: stencil reads and allocation loads.
//!
//! Constant-index accesses are pure wire selection — an alias at the literal
//! index tuple, no hardware. Variable indices synthesize slice+multiplexer
//! cascades: one mux per live candidate wire per variable dimension for
//! stencils, and one mux over per-iteration bound wires for loads whose
//! index depends on a single loop counter. Multiple simultaneously-variable
//! counter dependencies are a documented fatal error.

use crate::context::SynthesisContext;
use crate::error::SynthError;
use spindle_common::num_bits;
use spindle_diagnostics::Category;
use spindle_hls::print_name;
use spindle_ir::{BinaryOp, Expr, ScalarType};
use spindle_netlist::values::values;
use spindle_netlist::{HwType, ParamValue, Values, Wire};
use std::collections::HashMap;

impl<'a> SynthesisContext<'a> {
    /// Lowers a stencil read call (`buf.stencil(args...)`).
    pub(crate) fn lower_stencil_read(
        &mut self,
        name: &str,
        args: &[Expr],
        ty: ScalarType,
    ) -> Result<String, SynthError> {
        let mut args_printed = Vec::with_capacity(args.len());
        for a in args {
            args_printed.push(self.lower_expr(a)?);
        }
        let constant_indices = args.iter().all(Expr::is_const);

        let stencil_print_name = print_name(name);
        let rhs = format!("{stencil_print_name}({})[stencil]", args_printed.join(", "));
        let out_var = self.print_assignment(ty, &rhs);
        if self.is_wire(&out_var) {
            return Ok(out_var);
        }

        if constant_indices {
            let stencil_indices: Vec<u32> = args
                .iter()
                .filter_map(|a| a.as_const_int().map(|v| v as u32))
                .collect();
            self.rename_wire(&out_var, &stencil_print_name, None, &stencil_indices)?;
            self.src
                .comment(&format!("added to set: {out_var} using stencil+idx"));
            return Ok(out_var);
        }

        if !(self.is_wire(&stencil_print_name)
            || self.is_defined(&stencil_print_name)
            || self.is_storage(&stencil_print_name))
        {
            self.warn(
                Category::Resolve,
                3,
                &format!("{stencil_print_name} not found so it's not going to work"),
            );
            return Ok(out_var);
        }

        let Some(st) = self.stencils.get(name).cloned() else {
            self.warn(
                Category::Resolve,
                4,
                &format!("no stencil shape recorded for {name}; routing unindexed wire"),
            );
            let wire = self.get_wire(&stencil_print_name, None, &[])?;
            self.add_wire(&out_var, wire, &[])?;
            return Ok(out_var);
        };
        let extents = st
            .const_extents()
            .ok_or_else(|| SynthError::NonConstBounds(name.to_string()))?;

        let stencil_wire = self.get_wire(&stencil_print_name, None, &[])?;
        let orig_stencil_wire = stencil_wire.clone();
        let bitwidth = self.options.bitwidth;

        // one stable handle in front of the whole cascade
        let ptype = if ty.bits == 1 {
            HwType::Bit
        } else {
            HwType::Bit.array(bitwidth)
        };
        let tag = self.names.make_tag('p');
        let pt_name = format!("pt{out_var}_{tag}");
        let pt = self.add_passthrough(&pt_name, ptype)?;
        self.src
            .comment(&format!("created passthrough with name {pt_name}"));

        // (stencil terminal, mux data input) pairs still to be connected
        let mut pairs: Vec<(Wire, Wire)> = vec![(stencil_wire, Wire::inst(pt).sel("in"))];

        for i in (0..args.len()).rev() {
            let array_len = extents.get(i).copied().unwrap_or(0);
            if let Some(idx) = args[i].as_const_int() {
                let idx = idx as u32;
                if idx < array_len {
                    self.src.comment(&format!("using constant index {idx}"));
                    pairs = pairs
                        .into_iter()
                        .map(|(stencil, mux)| (stencil.sel_idx(idx), mux))
                        .collect();
                } else {
                    // out-of-bounds constant: abandon indexing for this
                    // candidate and route the unindexed wire through
                    self.src
                        .comment(&format!("couldn't find select index {idx}"));
                    pairs = vec![(orig_stencil_wire.clone(), Wire::inst(pt).sel("in"))];
                    break;
                }
            } else {
                let num_muxes = pairs.len();
                self.src
                    .comment(&format!("variable index creating {num_muxes} mux(es)"));
                let sel_wire = self.get_wire(&args_printed[i], Some(&args[i]), &[])?;

                let mut new_pairs = Vec::with_capacity(num_muxes * array_len as usize);
                for (j, (stencil_i, mux_dest)) in pairs.into_iter().enumerate() {
                    let mux_name = format!("{stencil_print_name}{i}_mux{array_len}_{j}");
                    let slice_gen = self.gens.get("slice")?.to_string();
                    let slice_id = self.def.add_instance(
                        &format!("selslice{mux_name}"),
                        &slice_gen,
                        values([
                            ("width", ParamValue::Int(bitwidth as i64)),
                            ("lo", ParamValue::Int(0)),
                            ("hi", ParamValue::Int(num_bits(array_len.saturating_sub(1)) as i64)),
                        ]),
                        Values::new(),
                    );
                    let mux_gen = self.gens.get("muxn")?.to_string();
                    let mux_id = self.def.add_instance(
                        &mux_name,
                        &mux_gen,
                        values([
                            ("width", ParamValue::Int(bitwidth as i64)),
                            ("N", ParamValue::Int(array_len as i64)),
                        ]),
                        Values::new(),
                    );
                    self.def.connect(Wire::inst(mux_id).sel("out"), mux_dest);
                    self.src.comment(&format!("created mux called {mux_name}"));

                    self.def
                        .connect(sel_wire.clone(), Wire::inst(slice_id).sel("in"));
                    self.def.connect(
                        Wire::inst(slice_id).sel("out"),
                        Wire::inst(mux_id).sel("in").sel("sel"),
                    );

                    for k in 0..array_len {
                        new_pairs.push((
                            stencil_i.clone().sel_idx(k),
                            Wire::inst(mux_id).sel("in").sel("data").sel_idx(k),
                        ));
                    }
                }
                pairs = new_pairs;
            }
        }

        self.add_wire(&out_var, Wire::inst(pt).sel("out"), &[])?;
        for (stencil_i, mux_i) in pairs {
            self.def.connect(stencil_i, mux_i);
        }
        self.src
            .comment(&format!("added to wire set: {out_var} using stencil"));
        Ok(out_var)
    }

    /// Lowers a load from a named allocation.
    pub(crate) fn lower_load(
        &mut self,
        name: &str,
        index: &Expr,
        ty: ScalarType,
    ) -> Result<String, SynthError> {
        let id_index = self.lower_expr(index)?;
        let name_p = print_name(name);
        let out_var = self.print_assignment(ty, &format!("{name_p}[{id_index}][load]"));
        if self.is_wire(&out_var) {
            return Ok(out_var);
        }

        if index.is_const() {
            let in_var = format!("{name_p}_{id_index}");
            self.rename_wire(&out_var, &in_var, None, &[])?;
            return Ok(out_var);
        }

        match self.recipe(&name_p).map(|r| r.gen_name.clone()) {
            Some(gen) if gen == "rom2" => {
                self.src.comment(&format!("loading from rom {name_p}"));
                let recipe = self
                    .recipe(&name_p)
                    .cloned()
                    .ok_or_else(|| SynthError::EmptyRecipe(name_p.clone()))?;
                let qualified = self.gens.get("rom2")?.to_string();
                let inst = self.def.add_instance(
                    &recipe.name,
                    &qualified,
                    recipe.gen_args,
                    recipe.mod_args,
                );
                self.add_wire(&out_var, Wire::inst(inst).sel(&recipe.sel_name), &[])?;

                let raddr_wire = self.get_wire(&id_index, Some(index), &[])?;
                self.def.connect(raddr_wire, Wire::inst(inst).sel("raddr"));
                let ren_name = format!("{}_ren", recipe.name);
                self.tie_off(&ren_name, true, Wire::inst(inst).sel("ren"))?;
                Ok(out_var)
            }
            Some(gen) if gen == "ram2" => {
                self.src.comment(&format!("loading from sram {name_p}"));
                let rdata = self.get_wire(&name_p, None, &[])?;
                self.add_wire(&out_var, rdata, &[])?;

                let raddr_wire = self.get_wire(&id_index, Some(index), &[])?;
                let ram_raddr = self.get_wire(&format!("{name_p}_raddr"), None, &[])?;
                self.def.disconnect(&ram_raddr);
                self.def.connect(raddr_wire, ram_raddr);
                Ok(out_var)
            }
            _ => {
                self.lower_variable_load(&name_p, index, &out_var)?;
                Ok(out_var)
            }
        }
    }

    /// Variable load from a plain allocation: evaluate the index over the
    /// one dependent counter's range and mux the per-iteration bound wires.
    fn lower_variable_load(
        &mut self,
        name_p: &str,
        index: &Expr,
        out_var: &str,
    ) -> Result<(), SynthError> {
        let dep_vars = find_dep_vars(index)?;
        self.src
            .comment(&format!("vars for {name_p}: {}", dep_vars.join(", ")));

        if dep_vars.len() > 1 {
            return Err(SynthError::MultiVariableIndex);
        }
        let Some(var) = dep_vars.first().cloned() else {
            self.warn(
                Category::Lower,
                4,
                &format!("variable load from {name_p} depends on no counter"),
            );
            return Ok(());
        };

        let id_var = print_name(&var);
        let recipe = self
            .recipe(&id_var)
            .cloned()
            .ok_or_else(|| SynthError::UnknownCounter(id_var.clone()))?;
        let arg_int = |key: &str| recipe.gen_args.get(key).and_then(ParamValue::as_int);
        let counter_max = arg_int("max").ok_or_else(|| SynthError::BadCounterShape(id_var.clone()))?;
        let counter_min = arg_int("min").ok_or_else(|| SynthError::BadCounterShape(id_var.clone()))?;
        let counter_inc = arg_int("inc").ok_or_else(|| SynthError::BadCounterShape(id_var.clone()))?;
        if counter_min != 0 || counter_inc != 1 {
            return Err(SynthError::BadCounterShape(id_var));
        }
        self.src
            .comment(&format!("found counter named {id_var} with max {counter_max}"));

        let pts: Vec<HashMap<String, i64>> = (0..counter_max)
            .map(|count| HashMap::from([(id_var.clone(), count)]))
            .collect();
        let addresses = eval_expr_with_vars(index, &pts)?;
        self.src.comment(&format!(
            "found {} indices: {:?}",
            addresses.len(),
            addresses
        ));

        let mux_size = addresses.len() as u32;
        let bitwidth = self.options.bitwidth;
        let mux_name = format!("{name_p}_mux{mux_size}");
        let slice_gen = self.gens.get("slice")?.to_string();
        let slice_id = self.def.add_instance(
            &format!("selslice{mux_name}"),
            &slice_gen,
            values([
                ("width", ParamValue::Int(bitwidth as i64)),
                ("lo", ParamValue::Int(0)),
                ("hi", ParamValue::Int(num_bits(mux_size.saturating_sub(1)) as i64)),
            ]),
            Values::new(),
        );
        let mux_gen = self.gens.get("muxn")?.to_string();
        let mux_id = self.def.add_instance(
            &mux_name,
            &mux_gen,
            values([
                ("width", ParamValue::Int(bitwidth as i64)),
                ("N", ParamValue::Int(mux_size as i64)),
            ]),
            Values::new(),
        );

        let counter_wire = self.get_wire(&id_var, None, &[])?;
        self.def
            .connect(counter_wire, Wire::inst(slice_id).sel("in"));
        self.def.connect(
            Wire::inst(mux_id).sel("in").sel("sel"),
            Wire::inst(slice_id).sel("out"),
        );

        for (i, &addr) in addresses.iter().enumerate() {
            let slot = format!("{name_p}_{addr}");
            if !(self.is_wire(&slot)
                || self.is_input(&slot)
                || self.is_storage(&slot)
                || self.is_defined(&slot))
            {
                return Err(SynthError::MissingAllocationSlot {
                    name: name_p.to_string(),
                    index: addr,
                });
            }
            let wire_in = self.get_wire(&slot, None, &[])?;
            self.def.connect(
                wire_in,
                Wire::inst(mux_id).sel("in").sel("data").sel_idx(i as u32),
            );
        }
        self.add_wire(out_var, Wire::inst(mux_id).sel("out"), &[])?;
        Ok(())
    }
}

/// Collects the loop variables an index expression depends on, in first-use
/// order with duplicates removed.
pub fn find_dep_vars(e: &Expr) -> Result<Vec<String>, SynthError> {
    let mut vars = Vec::new();
    collect_dep_vars(e, &mut vars)?;
    let mut seen = std::collections::HashSet::new();
    vars.retain(|v| seen.insert(v.clone()));
    Ok(vars)
}

fn collect_dep_vars(e: &Expr, vars: &mut Vec<String>) -> Result<(), SynthError> {
    match e {
        Expr::IntImm { .. } | Expr::UIntImm { .. } => Ok(()),
        Expr::Var { name, .. } => {
            vars.push(name.clone());
            Ok(())
        }
        Expr::Binary { a, b, .. } => {
            collect_dep_vars(a, vars)?;
            collect_dep_vars(b, vars)
        }
        Expr::Select {
            condition,
            true_value,
            false_value,
        } => {
            collect_dep_vars(true_value, vars)?;
            collect_dep_vars(false_value, vars)?;
            collect_dep_vars(condition, vars)
        }
        Expr::Not(a) => collect_dep_vars(a, vars),
        Expr::Cast { value, .. } => collect_dep_vars(value, vars),
        Expr::Call { .. } => Ok(()),
        Expr::FloatImm { .. } | Expr::StringImm(_) | Expr::Load { .. } => {
            Err(SynthError::UnsupportedIndexExpr)
        }
    }
}

/// Evaluates an index expression at each assignment of counter values.
pub fn eval_expr_with_vars(
    e: &Expr,
    pts: &[HashMap<String, i64>],
) -> Result<Vec<i64>, SynthError> {
    match e {
        Expr::IntImm { value, .. } => Ok(vec![*value; pts.len()]),
        Expr::UIntImm { value, .. } => Ok(vec![*value as i64; pts.len()]),
        Expr::Var { name, .. } => {
            let key = print_name(name);
            pts.iter()
                .map(|pt| {
                    pt.get(&key)
                        .copied()
                        .ok_or(SynthError::UnsupportedIndexExpr)
                })
                .collect()
        }
        Expr::Binary { op, a, b } => {
            let va = eval_expr_with_vars(a, pts)?;
            let vb = eval_expr_with_vars(b, pts)?;
            va.iter()
                .zip(vb.iter())
                .map(|(&x, &y)| match op {
                    BinaryOp::Add => Ok(x + y),
                    BinaryOp::Sub => Ok(x - y),
                    BinaryOp::Mul => Ok(x * y),
                    BinaryOp::Div if y != 0 => Ok(x / y),
                    BinaryOp::Mod if y != 0 => Ok(x % y),
                    BinaryOp::Min => Ok(x.min(y)),
                    BinaryOp::Max => Ok(x.max(y)),
                    _ => Err(SynthError::UnsupportedIndexExpr),
                })
                .collect()
        }
        Expr::Select {
            condition,
            true_value,
            false_value,
        } => {
            let vc = eval_expr_with_vars(condition, pts)?;
            let vt = eval_expr_with_vars(true_value, pts)?;
            let vf = eval_expr_with_vars(false_value, pts)?;
            Ok(vc
                .iter()
                .zip(vt.iter().zip(vf.iter()))
                .map(|(&c, (&t, &f))| if c != 0 { t } else { f })
                .collect())
        }
        Expr::Cast { value, .. } => eval_expr_with_vars(value, pts),
        _ => Err(SynthError::UnsupportedIndexExpr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts_for(var: &str, max: i64) -> Vec<HashMap<String, i64>> {
        (0..max)
            .map(|v| HashMap::from([(print_name(var), v)]))
            .collect()
    }

    #[test]
    fn dep_vars_deduplicated_in_order() {
        let e = Expr::binary(
            BinaryOp::Add,
            Expr::binary(BinaryOp::Mul, Expr::var("x"), Expr::u16(3)),
            Expr::var("x"),
        );
        assert_eq!(find_dep_vars(&e).unwrap(), vec!["x"]);
    }

    #[test]
    fn dep_vars_rejects_nested_loads() {
        let e = Expr::Load {
            name: "a".to_string(),
            index: Box::new(Expr::u16(0)),
            ty: ScalarType::uint(16),
        };
        assert!(matches!(
            find_dep_vars(&e),
            Err(SynthError::UnsupportedIndexExpr)
        ));
    }

    #[test]
    fn eval_affine_index() {
        // 3*x + 1 over x in [0, 4)
        let e = Expr::binary(
            BinaryOp::Add,
            Expr::binary(BinaryOp::Mul, Expr::u16(3), Expr::var("x")),
            Expr::u16(1),
        );
        let vals = eval_expr_with_vars(&e, &pts_for("x", 4)).unwrap();
        assert_eq!(vals, vec![1, 4, 7, 10]);
    }

    #[test]
    fn eval_min_max_select() {
        let e = Expr::binary(BinaryOp::Min, Expr::var("x"), Expr::u16(2));
        let vals = eval_expr_with_vars(&e, &pts_for("x", 5)).unwrap();
        assert_eq!(vals, vec![0, 1, 2, 2, 2]);
    }

    #[test]
    fn eval_unknown_var_is_an_error() {
        let e = Expr::var("y");
        assert!(eval_expr_with_vars(&e, &pts_for("x", 2)).is_err());
    }
}
