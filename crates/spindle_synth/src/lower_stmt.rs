//! Statement lowering.
//!
//! Serial `for` loops become counters with enable/reset wiring and
//! nested-loop overflow chaining; `if` records an ambient predicate for the
//! then branch only; `Realize` introduces passthrough-backed storage cells;
//! `Allocate` runs the classifier and plants memory recipes; `Provide` and
//! `Store` are the write side of stencils and allocations.

use crate::alloc::{identify_allocation, rename_allocation, AllocationKind};
use crate::context::{DeferredDef, Predicate, StorageCell, SynthesisContext};
use crate::error::SynthError;
use spindle_diagnostics::Category;
use spindle_hls::{print_name, print_stencil_pragma, print_stencil_type, print_type, strip_stream};
use spindle_ir::{
    contained_for_loop_names, contains_for_loop, first_for_loop_name, variable_used, Expr,
    ScalarType, StencilKind, StencilType, Stmt,
};
use spindle_netlist::values::values;
use spindle_netlist::{HwType, ParamValue, Values, Wire};
use serde_json::json;

/// ROM instances below this element count stay on the constant-folding/mux
/// path; the memory primitive's fixed overhead is not worth paying.
const ROM_SIZE_THRESHOLD: i64 = 100;

impl<'a> SynthesisContext<'a> {
    /// Lowers one statement tree.
    pub fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), SynthError> {
        match stmt {
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.lower_stmt(s)?;
                }
                Ok(())
            }
            Stmt::For {
                name,
                min,
                extent,
                body,
            } => self.lower_for(name, min, extent, body),
            Stmt::IfThenElse {
                condition,
                then_case,
                else_case,
            } => self.lower_if(condition, then_case, else_case.as_deref()),
            Stmt::Realize {
                name,
                elem,
                bounds,
                body,
            } => self.lower_realize(name, *elem, bounds, body),
            Stmt::Allocate {
                name,
                elem,
                extents,
                body,
            } => self.lower_allocate(name, *elem, extents, body),
            Stmt::Provide { name, args, value } => self.lower_provide(name, args, value),
            Stmt::Store { name, index, value } => self.lower_store(name, index, value),
            Stmt::Evaluate(e) => {
                self.lower_expr(e)?;
                Ok(())
            }
            Stmt::ProducerConsumer {
                name,
                is_producer,
                body,
            } => self.lower_producer_consumer(name, *is_producer, body),
            Stmt::Free { name } => {
                if self.allocations.contains(name) {
                    self.allocations.pop(name);
                }
                Ok(())
            }
        }
    }

    fn lower_for(
        &mut self,
        name: &str,
        min: &Expr,
        extent: &Expr,
        body: &Stmt,
    ) -> Result<(), SynthError> {
        let id_min = self.lower_expr(min)?;
        let id_extent = self.lower_expr(extent)?;
        let loop_var = print_name(name);

        self.src.line(&format!(
            "for (int {loop_var} = {id_min}; {loop_var} < {id_min} + {id_extent}; {loop_var}++)"
        ));
        self.src.open_scope();

        // innermost loops get the pipelining pragma
        if !contains_for_loop(body) {
            self.src.line("#pragma CoreIR PIPELINE II=1");
        }

        // pass the linebuffer association down to the nested loop
        if self.lb_kernel_map.contains_key(name) && contains_for_loop(body) {
            if let Some(inner) = first_for_loop_name(body) {
                let lb = self.lb_kernel_map[name].clone();
                self.lb_kernel_map.insert(inner.clone(), lb);
                self.src
                    .comment(&format!("added {inner} with a linebuffer"));
            }
        }

        if !variable_used(body, name) && !self.is_defined(&loop_var) {
            self.src
                .comment(&format!("no counter created for {loop_var}"));
            self.lower_stmt(body)?;
            self.src.close_scope(&format!("for {loop_var}"));
            return Ok(());
        }

        self.src.comment(&format!("creating counter for {loop_var}"));
        let extent_value = extent
            .as_const_int()
            .ok_or_else(|| SynthError::NonConstLoopExtent(name.to_string()))?;
        let min_value = min.as_const_int().unwrap_or(0);
        let max_value = min_value + extent_value - 1;
        let counter_name = format!("count_{loop_var}");

        let counter_args = values([
            ("width", ParamValue::Int(self.options.bitwidth as i64)),
            ("min", ParamValue::Int(min_value)),
            ("max", ParamValue::Int(max_value)),
            ("inc", ParamValue::Int(1)),
        ]);
        let gen = self.gens.get("counter")?.to_string();
        let counter_id =
            self.def
                .add_instance(&counter_name, &gen, counter_args.clone(), Values::new());
        self.add_wire(&loop_var, Wire::inst(counter_id).sel("out"), &[])?;
        // keep the counter parameters resolvable for variable-index loads
        self.deferred.insert(
            loop_var.clone(),
            Some(DeferredDef {
                name: counter_name.clone(),
                ref_name: loop_var.clone(),
                gen_name: "counter".to_string(),
                gen_args: counter_args,
                mod_args: Values::new(),
                sel_name: "out".to_string(),
            }),
        );

        // reset: module reset with a valid handshake, else tied low — the
        // no-valid configuration runs one continuous pass
        if self.options.has_valid {
            self.def
                .connect(Wire::self_port("reset"), Wire::inst(counter_id).sel("reset"));
        } else {
            let reset_name = format!("{counter_name}_reset");
            self.tie_off(&reset_name, false, Wire::inst(counter_id).sel("reset"))?;
        }

        // enable priority: inner-loop overflow, then linebuffer valid, then
        // free-running
        if contains_for_loop(body) {
            let inner = first_for_loop_name(body).expect("nested loop name");
            let inner_var = print_name(&inner);
            // force the inner counter into existence
            self.deferred.entry(inner_var.clone()).or_insert(None);
            self.lower_stmt(body)?;
            self.src.close_scope(&format!("for {loop_var}"));

            let inner_wire = self.get_wire(&inner_var, None, &[])?;
            let inner_overflow = inner_wire.parent().sel("overflow");
            self.def
                .connect(inner_overflow, Wire::inst(counter_id).sel("en"));
            return Ok(());
        } else if let Some(lb_wire) = self.lb_kernel_map.get(name).cloned() {
            self.src.comment("connected to lb valid");
            self.def
                .connect(lb_wire.sel("valid"), Wire::inst(counter_id).sel("en"));
        } else {
            let wen_name = format!("{counter_name}_wen");
            self.tie_off(&wen_name, true, Wire::inst(counter_id).sel("en"))?;
        }

        self.lower_stmt(body)?;
        self.src.close_scope(&format!("for {loop_var}"));
        Ok(())
    }

    fn lower_if(
        &mut self,
        condition: &Expr,
        then_case: &Stmt,
        else_case: Option<&Stmt>,
    ) -> Result<(), SynthError> {
        if else_case.is_some() {
            // no conditional-write datapath beyond register clear; ternary
            // selection must arrive as a select expression
            return Err(SynthError::ElseBranch);
        }

        let cond_id = self.lower_expr(condition)?;
        self.src.line(&format!("if ({cond_id})"));
        self.src.open_scope();

        if self.predicate.is_some() {
            self.warn(Category::Lower, 5, "nested predicates are not supported");
        }
        self.predicate = Some(Predicate {
            condition: condition.clone(),
        });
        let result = self.lower_stmt(then_case);
        self.predicate = None;
        self.src.close_scope(&format!("if {cond_id}"));
        result
    }

    fn lower_realize(
        &mut self,
        name: &str,
        elem: ScalarType,
        bounds: &[spindle_ir::Bound],
        body: &Stmt,
    ) -> Result<(), SynthError> {
        let is_stream = name.ends_with(".stream");
        let is_stencil = name.ends_with(".stencil") || name.ends_with(".stencil_update");
        if !is_stream && !is_stencil {
            self.warn(
                Category::Lower,
                6,
                &format!("realize of non-stencil {name} has no hardware form"),
            );
            return self.lower_stmt(body);
        }

        let stencil_type = StencilType {
            kind: if is_stream {
                StencilKind::Stream
            } else {
                StencilKind::Stencil
            },
            elem,
            bounds: bounds.to_vec(),
            depth: 1,
        };
        self.allocations.push(name, elem);
        self.stencils.push(name, stencil_type.clone());

        let name_p = print_name(name);
        self.src.line(&format!(
            "[realize] {} {name_p};",
            print_stencil_type(&stencil_type)
        ));
        self.src
            .raw(&print_stencil_pragma(&name_p, &stencil_type));

        let extents = stencil_type
            .const_extents()
            .ok_or_else(|| SynthError::NonConstBounds(name.to_string()))?;
        if extents.len() > 4 {
            return Err(SynthError::StencilRank {
                name: name.to_string(),
                rank: extents.len(),
            });
        }

        let bits = if elem.bits == 1 {
            1
        } else {
            self.options.bitwidth
        };
        let ptype = HwType::packed(false, bits, &extents);

        let tag = self.names.make_tag('p');
        let pt_name = format!("pt{name_p}_{tag}");
        let pt = self.add_passthrough(&pt_name, ptype.clone())?;
        self.src
            .comment(&format!("created a passthrough for {pt_name}"));

        let store_id = self.stores.alloc(StorageCell {
            ty: ptype,
            wire: pt,
            reg: None,
            was_read: false,
            was_written: false,
        });
        self.store_names.insert(name_p.clone(), store_id);
        self.src.comment(&format!("created storage called {name}"));

        self.lower_stmt(body)?;

        self.allocations.pop(name);
        self.stencils.pop(name);
        Ok(())
    }

    fn lower_allocate(
        &mut self,
        name: &str,
        elem: ScalarType,
        extents: &[Expr],
        body: &Stmt,
    ) -> Result<(), SynthError> {
        let mut constant_size: i64 = 1;
        for extent in extents {
            let value = extent
                .as_const_int()
                .ok_or_else(|| SynthError::NonConstAllocSize(name.to_string()))?;
            constant_size *= value;
        }
        if constant_size <= 0 {
            return Err(SynthError::NonConstAllocSize(name.to_string()));
        }

        // rename to dodge collisions from unrolled copies of the same IR
        let tag = self.names.make_tag('a');
        let alloc_name = print_name(&format!("{name}{tag}"));
        let new_body = rename_allocation(body, name, &alloc_name);

        self.allocations.push(&alloc_name, elem);
        self.src.line(&format!(
            "{} {alloc_name}[{constant_size}]; [alloc]",
            print_type(elem)
        ));

        let kind = identify_allocation(&new_body, &alloc_name);
        match kind {
            AllocationKind::Rom if constant_size > ROM_SIZE_THRESHOLD => {
                let recipe = DeferredDef {
                    name: format!("rom_{alloc_name}"),
                    ref_name: alloc_name.clone(),
                    gen_name: "rom2".to_string(),
                    gen_args: values([
                        ("width", ParamValue::Int(self.options.bitwidth as i64)),
                        ("depth", ParamValue::Int(constant_size)),
                    ]),
                    mod_args: values([("init", ParamValue::Json(json!({ "init": [0] })))]),
                    sel_name: "rdata".to_string(),
                };
                self.src
                    .comment(&format!("created a rom called {}", recipe.name));
                self.deferred.insert(alloc_name.clone(), Some(recipe));
            }
            AllocationKind::Rmw => {
                let recipe = DeferredDef {
                    name: format!("rmw_{alloc_name}"),
                    ref_name: alloc_name.clone(),
                    gen_name: "rmw".to_string(),
                    gen_args: values([
                        ("width", ParamValue::Int(self.options.bitwidth as i64)),
                        ("depth", ParamValue::Int(constant_size)),
                    ]),
                    mod_args: values([("init", ParamValue::Json(json!({ "init": [0] })))]),
                    sel_name: "rdata".to_string(),
                };
                self.src
                    .comment(&format!("created a rmw histogram called {alloc_name}"));
                self.deferred.insert(alloc_name.clone(), Some(recipe));
            }
            AllocationKind::Sram => {
                let recipe = DeferredDef {
                    name: format!("sram_{alloc_name}"),
                    ref_name: alloc_name.clone(),
                    gen_name: "ram2".to_string(),
                    gen_args: values([
                        ("width", ParamValue::Int(self.options.bitwidth as i64)),
                        ("depth", ParamValue::Int(constant_size)),
                    ]),
                    mod_args: Values::new(),
                    sel_name: "rdata".to_string(),
                };
                self.src
                    .comment(&format!("created an sram allocation called {alloc_name}"));
                self.deferred.insert(alloc_name.clone(), Some(recipe));
            }
            AllocationKind::NoAlloc
            | AllocationKind::InOut
            | AllocationKind::Rom
            | AllocationKind::Unknown => {}
        }

        self.lower_stmt(&new_body)?;

        // a missing Free is tolerated; the allocation dies with its scope
        if self.allocations.contains(&alloc_name) {
            self.allocations.pop(&alloc_name);
        }
        self.src.comment("ending this allocation");
        Ok(())
    }

    fn lower_provide(
        &mut self,
        name: &str,
        args: &[Expr],
        value: &Expr,
    ) -> Result<(), SynthError> {
        if !(name.ends_with(".stencil") || name.ends_with(".stencil_update")) {
            self.warn(
                Category::Lower,
                7,
                &format!("provide into non-stencil {name} has no hardware form"),
            );
            return Ok(());
        }

        let mut args_printed = Vec::with_capacity(args.len());
        let mut indices = Vec::with_capacity(args.len());
        for a in args {
            args_printed.push(self.lower_expr(a)?);
            match a.as_const_int() {
                Some(v) => indices.push(v as u32),
                None => {
                    self.warn(
                        Category::Lower,
                        8,
                        "variable store used; demux is not implemented",
                    );
                    indices.push(0);
                }
            }
        }

        let id_value = self.lower_expr(value)?;
        let new_name = print_name(name);
        self.src.line(&format!(
            "[provide] {new_name}({}) = {id_value};",
            args_printed.join(", ")
        ));

        // a re-executed store can change values cached temporaries would
        // otherwise serve stale
        self.namer.clear();

        let Some(predicate) = self.predicate.clone() else {
            let wire = self.get_wire(&id_value, Some(value), &[])?;
            self.add_wire(&new_name, wire, &indices)?;
            return Ok(());
        };

        // predicated provide: the accumulation-reset idiom
        self.src.comment("provide with a predicate");
        let const_value = match value.as_const_int() {
            Some(v) => v,
            None => {
                self.warn(
                    Category::Lower,
                    9,
                    &format!("{id_value} is not a constant; not yet supported for provides"),
                );
                0
            }
        };
        if const_value != 0 {
            return Err(SynthError::NonZeroInit(const_value));
        }

        let cond_id = self.lower_expr(&predicate.condition)?;
        if let Some(&store_id) = self.store_names.get(&new_name) {
            if !self.stores.get(store_id).is_reg() {
                // promote the cell to a clearable register array
                let ptype = self.stores.get(store_id).ty.clone();
                let regs_name = format!("regs{new_name}");
                let gen = self.gens.get("reg_array")?.to_string();
                let regs_id = self.def.add_instance(
                    &regs_name,
                    &gen,
                    values([
                        ("type", ParamValue::Ty(ptype)),
                        ("has_clr", ParamValue::Bool(true)),
                    ]),
                    Values::new(),
                );
                self.src
                    .comment(&format!("reg array created named {new_name}"));
                self.stores.get_mut(store_id).reg = Some(regs_id);

                let in_wire = self.get_wire(&id_value, Some(value), &[])?;
                self.def
                    .connect(in_wire, Wire::inst(regs_id).sel("in").index(&indices));
            }
        }

        let Some(&store_id) = self.store_names.get(&new_name) else {
            return Err(SynthError::UnbackedProvide(new_name));
        };
        let reg = self
            .stores
            .get(store_id)
            .reg
            .ok_or_else(|| SynthError::UnbackedProvide(new_name.clone()))?;
        let cond_wire = self.get_wire(&cond_id, Some(&predicate.condition), &[])?;
        self.def.connect(cond_wire, Wire::inst(reg).sel("clr"));
        self.src.comment(&format!("reg rst added to: {new_name}"));
        Ok(())
    }

    fn lower_store(&mut self, name: &str, index: &Expr, value: &Expr) -> Result<(), SynthError> {
        let id_index = self.lower_expr(index)?;
        let id_value = self.lower_expr(value)?;
        let name_p = print_name(name);
        self.src
            .line(&format!("{name_p}[{id_index}] = {id_value};  [store]"));

        if index.is_const() {
            let out_var = format!("{name_p}_{id_index}");
            self.rename_wire(&out_var, &id_value, Some(value), &[])?;
            return Ok(());
        }

        if self.recipe(&name_p).map(|r| r.gen_name.clone()).as_deref() == Some("ram2")
            || self.sram_side_wires_exist(&name_p)
        {
            self.src.comment(&format!("{name_p} connected by ram"));
            self.get_wire(&name_p, None, &[])?;
            let wdata = self.get_wire(&format!("{name_p}_wdata"), None, &[])?;
            let waddr = self.get_wire(&format!("{name_p}_waddr"), None, &[])?;
            self.def.disconnect(&wdata);
            self.def.disconnect(&waddr);
            let value_wire = self.get_wire(&id_value, Some(value), &[])?;
            let index_wire = self.get_wire(&id_index, Some(index), &[])?;
            self.def.connect(wdata, value_wire);
            self.def.connect(waddr, index_wire);
        }
        Ok(())
    }

    fn sram_side_wires_exist(&self, name_p: &str) -> bool {
        self.is_wire(&format!("{name_p}_waddr")) && self.is_wire(&format!("{name_p}_wdata"))
    }

    fn lower_producer_consumer(
        &mut self,
        name: &str,
        is_producer: bool,
        body: &Stmt,
    ) -> Result<(), SynthError> {
        if !is_producer {
            self.src.comment(&format!("consume {name}"));
            return self.lower_stmt(body);
        }

        self.src.comment(&format!("produce {name}"));
        let target_var = strip_stream(&print_name(name));
        self.src.comment(&format!("using {target_var}"));

        if let Some(producers) = self.hw_dispatch.get(&target_var) {
            let lb_name = producers[0].clone();
            self.src.comment(&format!("and lb {lb_name}"));
            if let Some(lb_wire) = self.lb_map.get(&lb_name).cloned() {
                self.src.comment("found the linebuffer");
                for loop_name in contained_for_loop_names(body) {
                    self.lb_kernel_map.insert(loop_name.clone(), lb_wire.clone());
                    self.src.comment(&format!(
                        "adding linebuffer target for loop {loop_name}"
                    ));
                }
            }
        }

        self.src.comment("emitting produce");
        self.lower_stmt(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TargetOptions;
    use spindle_diagnostics::DiagnosticSink;
    use spindle_netlist::ModuleDef;

    fn ctx(sink: &DiagnosticSink) -> SynthesisContext<'_> {
        SynthesisContext::new(
            ModuleDef::new("DesignTop", HwType::Record(vec![])),
            TargetOptions::default(),
            sink,
        )
    }

    fn loop_with_counter(name: &str, extent: u64, body: Stmt) -> Stmt {
        // a store indexed by the loop variable forces a counter
        Stmt::For {
            name: name.to_string(),
            min: Expr::u16(0),
            extent: Expr::u16(extent),
            body: Box::new(body),
        }
    }

    #[test]
    fn unused_loop_variable_creates_no_counter() {
        let sink = DiagnosticSink::new();
        let mut c = ctx(&sink);
        let s = loop_with_counter("x", 4, Stmt::Block(vec![]));
        c.lower_stmt(&s).unwrap();
        assert_eq!(c.def.count_generator("commonlib.counter"), 0);
    }

    #[test]
    fn referenced_loop_variable_creates_counter() {
        let sink = DiagnosticSink::new();
        let mut c = ctx(&sink);
        let body = Stmt::Store {
            name: "a".to_string(),
            index: Expr::var("x"),
            value: Expr::u16(0),
        };
        c.lower_stmt(&loop_with_counter("x", 8, body)).unwrap();
        assert_eq!(c.def.count_generator("commonlib.counter"), 1);
        // free-running leaf: enable tied high, reset tied low (no valid)
        let counter = c.def.instance_named("count__x").unwrap();
        assert_eq!(c.def.connected_to(&Wire::inst(counter).sel("en")).len(), 1);
        assert_eq!(
            c.def.connected_to(&Wire::inst(counter).sel("reset")).len(),
            1
        );
        // counter params recorded for variable-index loads
        let recipe = c.recipe("_x").unwrap();
        assert_eq!(recipe.gen_args.get("max").and_then(ParamValue::as_int), Some(7));
    }

    #[test]
    fn nested_loops_chain_overflow_into_enable() {
        let sink = DiagnosticSink::new();
        let mut c = ctx(&sink);
        let inner_body = Stmt::Store {
            name: "a".to_string(),
            index: Expr::binary(
                spindle_ir::BinaryOp::Add,
                Expr::var("y"),
                Expr::var("x"),
            ),
            value: Expr::u16(0),
        };
        let nest = loop_with_counter("y", 4, loop_with_counter("x", 8, inner_body));
        c.lower_stmt(&nest).unwrap();
        assert_eq!(c.def.count_generator("commonlib.counter"), 2);

        let outer = c.def.instance_named("count__y").unwrap();
        let inner = c.def.instance_named("count__x").unwrap();
        let en_peers = c.def.connected_to(&Wire::inst(outer).sel("en"));
        assert_eq!(en_peers, vec![&Wire::inst(inner).sel("overflow")]);
    }

    #[test]
    fn counter_reset_uses_module_reset_with_valid() {
        let sink = DiagnosticSink::new();
        let mut c = SynthesisContext::new(
            ModuleDef::new("DesignTop", HwType::Record(vec![])),
            TargetOptions {
                has_valid: true,
                bitwidth: 16,
            },
            &sink,
        );
        let body = Stmt::Store {
            name: "a".to_string(),
            index: Expr::var("x"),
            value: Expr::u16(0),
        };
        c.lower_stmt(&loop_with_counter("x", 8, body)).unwrap();
        let counter = c.def.instance_named("count__x").unwrap();
        let reset_peers = c.def.connected_to(&Wire::inst(counter).sel("reset"));
        assert_eq!(reset_peers, vec![&Wire::self_port("reset")]);
    }

    #[test]
    fn else_branch_is_fatal() {
        let sink = DiagnosticSink::new();
        let mut c = ctx(&sink);
        let s = Stmt::IfThenElse {
            condition: Expr::bool_imm(true),
            then_case: Box::new(Stmt::Block(vec![])),
            else_case: Some(Box::new(Stmt::Block(vec![]))),
        };
        assert!(matches!(c.lower_stmt(&s), Err(SynthError::ElseBranch)));
    }

    #[test]
    fn realize_registers_storage_and_scopes() {
        let sink = DiagnosticSink::new();
        let mut c = ctx(&sink);
        let s = Stmt::Realize {
            name: "conv.stencil".to_string(),
            elem: ScalarType::uint(16),
            bounds: vec![spindle_ir::Bound::extent(3), spindle_ir::Bound::extent(3)],
            body: Box::new(Stmt::Block(vec![])),
        };
        c.lower_stmt(&s).unwrap();
        assert!(c.is_storage("_conv_stencil"));
        // scopes popped on exit
        assert!(c.stencils.is_empty());
        assert!(c.allocations.is_empty());
    }

    #[test]
    fn realize_rank_limit_is_fatal() {
        let sink = DiagnosticSink::new();
        let mut c = ctx(&sink);
        let s = Stmt::Realize {
            name: "big.stencil".to_string(),
            elem: ScalarType::uint(16),
            bounds: vec![spindle_ir::Bound::extent(2); 5],
            body: Box::new(Stmt::Block(vec![])),
        };
        assert!(matches!(
            c.lower_stmt(&s),
            Err(SynthError::StencilRank { rank: 5, .. })
        ));
    }

    #[test]
    fn constant_store_binds_slot_wire() {
        let sink = DiagnosticSink::new();
        let mut c = ctx(&sink);
        let s = Stmt::Store {
            name: "lut".to_string(),
            index: Expr::u16(3),
            value: Expr::u16(42),
        };
        c.lower_stmt(&s).unwrap();
        // bound lazily as a deferred constant under the slot name
        assert!(c.is_defined("_lut_3"));
    }

    #[test]
    fn provide_clears_expression_cache() {
        let sink = DiagnosticSink::new();
        let mut c = ctx(&sink);
        c.add_wire("_v", Wire::self_port("in").sel("v"), &[]).unwrap();
        // seed the cache
        let e = Expr::binary(spindle_ir::BinaryOp::Add, Expr::var("v"), Expr::var("v"));
        let first = c.lower_expr(&e).unwrap();

        let s = Stmt::Realize {
            name: "acc.stencil".to_string(),
            elem: ScalarType::uint(16),
            bounds: vec![spindle_ir::Bound::extent(1)],
            body: Box::new(Stmt::Provide {
                name: "acc.stencil".to_string(),
                args: vec![Expr::u16(0)],
                value: Expr::var("v"),
            }),
        };
        c.lower_stmt(&s).unwrap();

        let second = c.lower_expr(&e).unwrap();
        assert_ne!(first, second, "cache must be invalidated by a provide");
    }
}
