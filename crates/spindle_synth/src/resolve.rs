//! The wire/value resolution table operations.
//!
//! Three operations cover every visitor's needs: [`get_wire`] resolves a
//! name (plus optional constant expression and index tuple) to a terminal,
//! [`add_wire`] is the write-side dual binding a source terminal under a
//! name, and [`rename_wire`] propagates a value under a new name. A name has
//! at most one non-constant classification at a time; true numeric constants
//! are re-instantiated fresh on every resolution and never cached.
//!
//! [`get_wire`]: SynthesisContext::get_wire
//! [`add_wire`]: SynthesisContext::add_wire
//! [`rename_wire`]: SynthesisContext::rename_wire

use crate::context::{DeferredDef, SynthesisContext};
use crate::error::SynthError;
use spindle_diagnostics::Category;
use spindle_hls::strip_stream;
use spindle_ir::Expr;
use spindle_netlist::values::values;
use spindle_netlist::{ParamValue, Values, Wire};

impl<'a> SynthesisContext<'a> {
    /// Resolves `name` to a usable terminal.
    ///
    /// Constant expressions synthesize a fresh constant cell; inputs,
    /// storage cells, and materialized wires are selected at `indices`;
    /// deferred recipes are built on the spot. An unresolvable name warns
    /// and falls back to the raw module input so a partial lowering stays
    /// inspectable instead of crashing the compilation.
    pub fn get_wire(
        &mut self,
        name: &str,
        expr: Option<&Expr>,
        indices: &[u32],
    ) -> Result<Wire, SynthError> {
        if let Some(e) = expr {
            if e.is_const() {
                let value = e.as_const_int().unwrap_or(0);
                let const_name = format!("const{value}_{name}");
                let bits = e.const_bits().unwrap_or(1);
                let out = self.add_const_instance(&const_name, value, bits)?;
                self.src
                    .comment(&format!("created const: {const_name} with name {name}"));
                return Ok(out);
            }
            if e.is_fconst() {
                let value = e.as_const_float().unwrap_or(0.0);
                let const_name = format!("fconst{}_{name}", value as i64);
                let width = self.options.instance_width(e.const_bits().unwrap_or(32));
                let gen = self.gens.get("fconst")?.to_string();
                let id = self.def.add_instance(
                    &const_name,
                    &gen,
                    values([("width", ParamValue::Int(width as i64))]),
                    values([(
                        "value",
                        ParamValue::BitVector {
                            width,
                            value: value as i64,
                        },
                    )]),
                );
                self.src
                    .comment(&format!("created fconst: {const_name} with name {name}"));
                return Ok(Wire::inst(id).sel("out"));
            }
        }

        if let Some(input) = self.inputs.get(name) {
            let wire = input.clone().index(indices);
            self.src.comment(&format!("{name} resolved as input"));
            return Ok(wire);
        }

        if let Some(&store_id) = self.store_names.get(name) {
            let cell = self.stores.get(store_id);
            let base = match cell.reg {
                Some(reg) => Wire::inst(reg).sel("out"),
                None => Wire::inst(cell.wire).sel("out"),
            };
            self.stores.get_mut(store_id).was_read = true;
            return Ok(base.index(indices));
        }

        if let Some(wire) = self.wires.get(name) {
            return Ok(wire.clone().index(indices));
        }

        if self.is_defined(name) {
            let recipe = self
                .recipe(name)
                .cloned()
                .ok_or_else(|| SynthError::EmptyRecipe(name.to_string()))?;
            self.src.comment(&format!("creating element called: {name}"));
            let gen = self.gens.get(&recipe.gen_name)?.to_string();
            let id = self
                .def
                .add_instance(&recipe.name, &gen, recipe.gen_args, recipe.mod_args);
            let out = Wire::inst(id).sel(&recipe.sel_name);
            self.add_wire(name, out.clone(), &[])?;

            if recipe.gen_name == "ram2" {
                self.add_wire(&format!("{name}_waddr"), Wire::inst(id).sel("waddr"), &[])?;
                self.add_wire(&format!("{name}_wdata"), Wire::inst(id).sel("wdata"), &[])?;
                self.add_wire(&format!("{name}_raddr"), Wire::inst(id).sel("raddr"), &[])?;
                // memory read primitives come up permanently read-enabled
                let ren_name = format!("{}_ren", recipe.name);
                self.tie_off(&ren_name, true, Wire::inst(id).sel("ren"))?;
            }
            return Ok(out);
        }

        let known = self.wires.keys().cloned().collect::<Vec<_>>().join(" ");
        self.warn(
            Category::Resolve,
            1,
            &format!("invalid wire: couldn't find {name}; wire set contains: {known}"),
        );
        Ok(Wire::self_port("in"))
    }

    /// Binds `in_wire` as the value of `name`, optionally at an index tuple.
    ///
    /// Storage cells get dead-passthrough elision, fresh-cell reallocation
    /// once used up, and single-driver discipline on promoted registers.
    /// Plain names use last-write-wins overwrite, matching how the IR treats
    /// repeated assignment in straight-line code.
    pub fn add_wire(
        &mut self,
        name: &str,
        in_wire: Wire,
        indices: &[u32],
    ) -> Result<(), SynthError> {
        let Some(&store_id) = self.store_names.get(name) else {
            // not storage: record the terminal for later lookups
            if !indices.is_empty() {
                self.warn(
                    Category::Resolve,
                    5,
                    &format!("indices dropped while binding plain wire {name}"),
                );
            }
            self.wires.insert(name.to_string(), in_wire);
            return Ok(());
        };

        let cell = self.stores.get(store_id);
        if !cell.was_read && !cell.was_written && indices.is_empty() && !cell.is_reg() {
            // dead passthrough: nothing observed it, so drop the relay and
            // reclassify the name as a plain wire
            let pt = cell.wire;
            self.def.remove_instance(pt);
            self.store_names.remove(name);
            self.stores.release(store_id);
            self.wires.insert(name.to_string(), in_wire);
            self.src
                .comment(&format!("removed unused passthrough for {name}"));
            return Ok(());
        }

        if cell.was_read && cell.was_written {
            // cell is used up: re-point the name at a fresh relay
            let ty = cell.ty.clone();
            let tag = self.names.make_tag('p');
            let pt_name = format!("pt{name}_{tag}");
            let new_pt = self.add_passthrough(&pt_name, ty)?;
            self.src
                .comment(&format!("created passthrough with name {pt_name}"));
            let cell = self.stores.get_mut(store_id);
            cell.wire = new_pt;
            cell.was_read = false;
        }

        let cell = self.stores.get(store_id);
        if let Some(reg) = cell.reg {
            // registers take exactly one driver per terminal
            let d_wire = Wire::inst(reg).sel("in").index(indices);
            self.src
                .comment(&format!("disconnecting wire for reg {name}"));
            self.def.disconnect(&d_wire);
            self.def.connect(in_wire.clone(), d_wire);
        }

        let cell = self.stores.get_mut(store_id);
        cell.was_written = true;
        let pt_in = Wire::inst(cell.wire).sel("in").index(indices);
        self.def.connect(in_wire, pt_in);
        self.src.comment(&format!("added passthrough wire to {name}"));
        Ok(())
    }

    /// Propagates the value of `in_name` under `new_name`.
    ///
    /// Deferred definitions and constants stay lazy; storage aliases merge or
    /// share cells; outputs are connected exactly once, here.
    pub fn rename_wire(
        &mut self,
        new_name: &str,
        in_name: &str,
        in_expr: Option<&Expr>,
        indices: &[u32],
    ) -> Result<(), SynthError> {
        if self.is_defined(in_name) && !self.is_wire(in_name) {
            // recipe not materialized yet: copy it, keep laziness
            debug_assert!(indices.is_empty());
            let mut recipe = self.deferred.get(in_name).cloned().flatten();
            if let Some(recipe) = recipe.as_mut() {
                recipe.ref_name = in_name.to_string();
            }
            let module = recipe
                .as_ref()
                .map(|r| r.name.clone())
                .unwrap_or_else(|| "<pending>".to_string());
            self.deferred.insert(new_name.to_string(), recipe);
            self.src.comment(&format!(
                "added/modified in deferred set: {new_name} = {in_name} (module {module})"
            ));
            return Ok(());
        }

        if let Some(e) = in_expr {
            if e.is_const() {
                let value = e.as_const_int().unwrap_or(0);
                let bits = e.const_bits().unwrap_or(1);
                let const_name = format!("const{value}_{in_name}");
                let recipe = self.const_recipe(&const_name, in_name, value, bits)?;
                self.deferred.insert(new_name.to_string(), Some(recipe));
                self.src
                    .comment(&format!("defined const: {const_name} with name {new_name}"));
                return Ok(());
            }
            if e.is_fconst() {
                let value = e.as_const_float().unwrap_or(0.0);
                let width = self.options.instance_width(e.const_bits().unwrap_or(32));
                let const_name = format!("fconst{}_{in_name}", value as i64);
                let recipe = DeferredDef {
                    name: const_name.clone(),
                    ref_name: in_name.to_string(),
                    gen_name: "fconst".to_string(),
                    gen_args: values([("width", ParamValue::Int(width as i64))]),
                    mod_args: values([(
                        "value",
                        ParamValue::BitVector {
                            width,
                            value: value as i64,
                        },
                    )]),
                    sel_name: "out".to_string(),
                };
                self.deferred.insert(new_name.to_string(), Some(recipe));
                self.src
                    .comment(&format!("defined fconst: {const_name} with name {new_name}"));
                return Ok(());
            }
        }

        if self.is_storage(in_name) && indices.is_empty() {
            let in_id = self.store_names[in_name];
            if let Some(&new_id) = self.store_names.get(new_name) {
                // both names have cells: drop the duplicate, share one
                self.src.comment(&format!(
                    "removing another passthrough: {new_name} = {in_name}"
                ));
                let dup_pt = self.stores.get(new_id).wire;
                self.def.remove_instance(dup_pt);
                self.stores.release(new_id);
                self.store_names.insert(new_name.to_string(), in_id);
                self.stores.retain(in_id);
                self.stores.get_mut(in_id).was_read = true;
            } else {
                self.src.comment(&format!(
                    "creating another passthrough reference: {new_name} = {in_name}"
                ));
                self.store_names.insert(new_name.to_string(), in_id);
                self.stores.retain(in_id);
            }

            if self.is_output(new_name) {
                let cell = self.stores.get(in_id);
                let out = match cell.reg {
                    Some(reg) => Wire::inst(reg).sel("out"),
                    None => Wire::inst(cell.wire).sel("out"),
                };
                self.def.connect(out, Wire::self_port("out"));
                self.src
                    .comment(&format!("connecting passthrough to output {new_name}"));
            }
            return Ok(());
        }

        let in_wire = self.get_wire(in_name, in_expr, indices)?;
        if !indices.is_empty() {
            self.src.comment(&format!(
                "connecting with {} indices: {:?}",
                indices.len(),
                indices
            ));
        }

        if self.is_output(new_name) {
            if !indices.is_empty() {
                return Err(SynthError::IndexedOutput(new_name.to_string()));
            }
            self.src
                .comment(&format!("{new_name} added as an output from {in_name}"));
            self.def.connect(in_wire, Wire::self_port("out"));
        } else {
            self.add_wire(new_name, in_wire, &[])?;
            self.src
                .comment(&format!("added/modified in wire set: {new_name} = {in_name}"));
        }
        Ok(())
    }

    fn const_recipe(
        &mut self,
        const_name: &str,
        ref_name: &str,
        value: i64,
        bits: u8,
    ) -> Result<DeferredDef, SynthError> {
        let (gen_name, gen_args, mod_args) = if bits == 1 {
            (
                "bitconst",
                Values::new(),
                values([("value", ParamValue::Bool(value != 0))]),
            )
        } else {
            let width = self.options.instance_width(bits);
            (
                "const",
                values([("width", ParamValue::Int(width as i64))]),
                values([("value", ParamValue::BitVector { width, value })]),
            )
        };
        Ok(DeferredDef {
            name: const_name.to_string(),
            ref_name: ref_name.to_string(),
            gen_name: gen_name.to_string(),
            gen_args,
            mod_args,
            sel_name: "out".to_string(),
        })
    }

    /// Records a producer → consumer dispatch edge.
    ///
    /// When the consumer is the design output and the target has a valid
    /// handshake, the upstream valid chain is wired through to the module's
    /// `valid` port here.
    pub fn record_dispatch(&mut self, producer_name: &str, consumer_name: &str) {
        self.hw_dispatch
            .entry(consumer_name.to_string())
            .or_default()
            .push(producer_name.to_string());
        self.src.comment(&format!(
            "recording dispatch from {producer_name} to {consumer_name}"
        ));

        if self.options.has_valid {
            let is_output_consumer = self
                .outputs
                .iter()
                .any(|output| strip_stream(output) == consumer_name);
            if is_output_consumer {
                self.src
                    .comment(&format!("connecting {producer_name} to output valid"));
                self.connect_linebuffer(consumer_name.to_string(), Wire::self_port("valid"));
            }
        }
    }

    /// Records a line-buffer instance under its output stream name.
    pub fn record_linebuffer(&mut self, producer_name: &str, wire: Wire) {
        self.src
            .comment(&format!("added {producer_name} linebuffer to record map"));
        self.lb_map.insert(producer_name.to_string(), wire);
    }

    /// Walks the dispatch graph backwards from `consumer_name` looking for an
    /// upstream line-buffer, and connects that buffer's `valid` output to
    /// `consumer_wen_wire`. Returns `true` if a connection was made.
    pub fn connect_linebuffer(&mut self, consumer_name: String, consumer_wen_wire: Wire) -> bool {
        let mut consumer = strip_stream(&consumer_name);
        self.src.comment(&format!(
            "using lb consumer {consumer_name} (stripped {consumer})"
        ));
        let mut producer_name = String::new();

        let mut consumer_recurse = consumer.clone();
        while self.hw_dispatch.contains_key(&consumer_recurse) {
            consumer = consumer_recurse.clone();
            // use the first producer; fan-in merges all carry the same valid
            producer_name = self.hw_dispatch[&consumer][0].clone();
            let producer = strip_stream(&producer_name);

            if let Some(lb_wire) = self.lb_map.get(&producer_name).cloned() {
                self.src.comment(&format!(
                    "connected lb valid: connecting {producer_name} valid to {consumer_name} wen"
                ));
                self.def.connect(lb_wire.sel("valid"), consumer_wen_wire);
                return true;
            }

            self.src.comment(&format!(
                "using producer {producer} for consumer {consumer}"
            ));
            consumer_recurse = producer;
        }

        if self.is_input(&consumer_name) {
            self.src.comment("input stream: upstream valid not connected");
            false
        } else if let Some(lb_wire) = self.lb_map.get(&producer_name).cloned() {
            self.src.comment(&format!(
                "connecting {producer_name} valid to {consumer_name} wen"
            ));
            self.def.connect(lb_wire.sel("valid"), consumer_wen_wire);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TargetOptions;
    use spindle_diagnostics::DiagnosticSink;
    use spindle_netlist::{HwType, ModuleDef};

    fn ctx(sink: &DiagnosticSink) -> SynthesisContext<'_> {
        SynthesisContext::new(
            ModuleDef::new("DesignTop", HwType::Record(vec![])),
            TargetOptions::default(),
            sink,
        )
    }

    #[test]
    fn constants_resolve_to_fresh_instances() {
        let sink = DiagnosticSink::new();
        let mut c = ctx(&sink);
        let e = Expr::u16(5);
        let a = c.get_wire("x", Some(&e), &[]).unwrap();
        let b = c.get_wire("x", Some(&e), &[]).unwrap();
        assert_ne!(a, b);
        assert_eq!(c.def.instance_count(), 2);
    }

    #[test]
    fn unresolved_name_warns_and_falls_back() {
        let sink = DiagnosticSink::new();
        let mut c = ctx(&sink);
        let w = c.get_wire("ghost", None, &[]).unwrap();
        assert_eq!(w, Wire::self_port("in"));
        assert_eq!(sink.diagnostics().len(), 1);
        assert!(!sink.has_errors());
    }

    #[test]
    fn plain_wire_overwrite_is_last_write_wins() {
        let sink = DiagnosticSink::new();
        let mut c = ctx(&sink);
        c.add_wire("x", Wire::self_port("a"), &[]).unwrap();
        c.add_wire("x", Wire::self_port("b"), &[]).unwrap();
        let w = c.get_wire("x", None, &[]).unwrap();
        assert_eq!(w, Wire::self_port("b"));
    }

    #[test]
    fn deferred_constant_stays_lazy_until_resolved() {
        let sink = DiagnosticSink::new();
        let mut c = ctx(&sink);
        let e = Expr::u16(3);
        c.rename_wire("k", "three", Some(&e), &[]).unwrap();
        assert!(c.is_defined("k"));
        assert_eq!(c.def.instance_count(), 0);
        let w = c.get_wire("k", None, &[]).unwrap();
        assert_eq!(c.def.instance_count(), 1);
        assert!(w.root_inst().is_some());
        // now materialized: the name resolves as a wire
        assert!(c.is_wire("k"));
    }

    #[test]
    fn deferred_alias_copies_recipe_with_ref_chain() {
        let sink = DiagnosticSink::new();
        let mut c = ctx(&sink);
        let e = Expr::u16(3);
        c.rename_wire("k", "three", Some(&e), &[]).unwrap();
        c.rename_wire("k2", "k", None, &[]).unwrap();
        assert!(c.is_defined("k2"));
        assert_eq!(c.recipe("k2").unwrap().ref_name, "k");
        // resolving each alias builds its own instance
        c.get_wire("k", None, &[]).unwrap();
        c.get_wire("k2", None, &[]).unwrap();
        assert_eq!(c.def.instance_count(), 2);
    }

    #[test]
    fn input_resolution_selects_indices() {
        let sink = DiagnosticSink::new();
        let mut c = ctx(&sink);
        c.inputs
            .insert("arg_0".to_string(), Wire::self_port("in").sel("arg_0"));
        let w = c.get_wire("arg_0", None, &[2, 1]).unwrap();
        // innermost-first: index 1 selected before index 2
        assert_eq!(w, Wire::self_port("in").sel("arg_0").sel_idx(1).sel_idx(2));
    }

    #[test]
    fn output_alias_connects_self_out() {
        let sink = DiagnosticSink::new();
        let mut c = ctx(&sink);
        c.add_wire("result", Wire::self_port("in").sel("arg_0"), &[])
            .unwrap();
        c.outputs.insert("out_stream".to_string());
        c.rename_wire("out_stream", "result", None, &[]).unwrap();
        let peers = c.def.connected_to(&Wire::self_port("out"));
        assert_eq!(peers.len(), 1);
    }

    #[test]
    fn output_alias_rejects_indices() {
        let sink = DiagnosticSink::new();
        let mut c = ctx(&sink);
        c.add_wire("result", Wire::self_port("in").sel("arg_0"), &[])
            .unwrap();
        c.outputs.insert("out_stream".to_string());
        let err = c.rename_wire("out_stream", "result", None, &[0]);
        assert!(matches!(err, Err(SynthError::IndexedOutput(_))));
    }
}
