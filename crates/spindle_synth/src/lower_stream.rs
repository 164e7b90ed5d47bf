//! Streaming primitive lowering.
//!
//! `read_stream`/`write_stream` are alias operations binding a stream's
//! current value under the reader's or writer's local name. `linebuffer`
//! synthesizes the reordering primitive and joins the valid/enable chain
//! recorded in the dispatch graph. `dispatch_stream` is a one-to-many
//! fan-out with per-consumer windowing; a single consumer with zero FIFO
//! depth collapses to a pure rename.

use crate::context::SynthesisContext;
use crate::error::SynthError;
use spindle_hls::{print_name, print_stencil_pragma, print_stencil_type};
use spindle_ir::{Expr, StencilKind};
use spindle_netlist::values::values;
use spindle_netlist::{HwType, ParamValue, Values, Wire};

fn var_name(e: &Expr) -> Option<&str> {
    match e {
        Expr::Var { name, .. } => Some(name),
        _ => None,
    }
}

fn string_imm(e: &Expr) -> Option<&str> {
    match e {
        Expr::StringImm(s) => Some(s),
        _ => None,
    }
}

impl<'a> SynthesisContext<'a> {
    /// Lowers `linebuffer(in_stream, out_stream, extent_0, extent_1, ...)`.
    pub(crate) fn lower_linebuffer(&mut self, args: &[Expr]) -> Result<(), SynthError> {
        if args.len() < 3 {
            return Err(SynthError::BadStreamCall("linebuffer".to_string()));
        }
        let in_name = var_name(&args[0])
            .ok_or_else(|| SynthError::BadStreamCall("linebuffer".to_string()))?
            .to_string();
        let out_name = var_name(&args[1])
            .ok_or_else(|| SynthError::BadStreamCall("linebuffer".to_string()))?
            .to_string();
        let a0 = self.lower_expr(&args[0])?;
        let a1 = self.lower_expr(&args[1])?;

        let in_stencil = self
            .stencils
            .get(&in_name)
            .cloned()
            .ok_or_else(|| SynthError::BadStreamCall("linebuffer".to_string()))?;
        let out_stencil = self
            .stencils
            .get(&out_name)
            .cloned()
            .ok_or_else(|| SynthError::BadStreamCall("linebuffer".to_string()))?;

        let mut dims = Vec::with_capacity(args.len() - 2);
        for a in &args[2..] {
            dims.push(self.lower_expr(a)?);
        }
        self.src
            .line(&format!("linebuffer<{}>({a0}, {a1});", dims.join(", ")));

        let lb_in_name = print_name(&in_name);
        let lb_out_name = print_name(&out_name);
        let num_dims = args.len() - 2;
        let lb_name = format!("lb{lb_in_name}");
        let bw = self.options.bitwidth;

        let in_extents = in_stencil
            .const_extents()
            .ok_or_else(|| SynthError::NonConstBounds(in_name.clone()))?;
        let out_extents = out_stencil
            .const_extents()
            .ok_or_else(|| SynthError::NonConstBounds(out_name.clone()))?;
        let mut image_extents = Vec::with_capacity(num_dims);
        for a in &args[2..] {
            let extent = a
                .as_const_int()
                .ok_or_else(|| SynthError::NonConstBounds(out_name.clone()))?;
            image_extents.push(extent as u32);
        }

        let take = |extents: &[u32]| extents[..num_dims.min(extents.len())].to_vec();
        let input_type = HwType::packed(true, bw, &take(&in_extents));
        let output_type = HwType::packed(false, bw, &take(&out_extents));
        let image_type = HwType::packed(false, bw, &image_extents);
        self.src.comment(&format!(
            "linebuffer {lb_name} created with input={:?} output={:?} image={:?}",
            take(&in_extents),
            take(&out_extents),
            image_extents
        ));

        let gen = self.gens.get("linebuffer")?.to_string();
        let lb_id = self.def.add_instance(
            &lb_name,
            &gen,
            values([
                ("input_type", ParamValue::Ty(input_type)),
                ("output_type", ParamValue::Ty(output_type)),
                ("image_type", ParamValue::Ty(image_type)),
                ("has_valid", ParamValue::Bool(self.options.has_valid)),
            ]),
            Values::new(),
        );

        let mut connected_wen = false;
        if self.options.has_valid {
            self.record_linebuffer(&lb_out_name, Wire::inst(lb_id));
            connected_wen =
                self.connect_linebuffer(lb_in_name.clone(), Wire::inst(lb_id).sel("wen"));
            self.def
                .connect(Wire::self_port("reset"), Wire::inst(lb_id).sel("reset"));
        } else {
            let reset_name = format!("{lb_name}_reset");
            self.tie_off(&reset_name, false, Wire::inst(lb_id).sel("reset"))?;
        }

        let lb_in_wire = self.get_wire(&lb_in_name, Some(&args[0]), &[])?;
        self.def.connect(lb_in_wire, Wire::inst(lb_id).sel("in"));
        self.add_wire(&lb_out_name, Wire::inst(lb_id).sel("out"), &[])?;

        if !connected_wen {
            let wen_name = format!("{lb_name}_wen");
            self.tie_off(&wen_name, true, Wire::inst(lb_id).sel("wen"))?;
        }
        Ok(())
    }

    /// Lowers `read_stream(stream, dest[, consumer_tag])`.
    pub(crate) fn lower_read_stream(&mut self, args: &[Expr]) -> Result<(), SynthError> {
        if args.len() != 2 && args.len() != 3 {
            return Err(SynthError::BadStreamCall("read_stream".to_string()));
        }
        let a1 = self.lower_expr(&args[1])?;
        let mut stream_name = var_name(&args[0])
            .ok_or_else(|| SynthError::BadStreamCall("read_stream".to_string()))?
            .to_string();
        if args.len() == 3 {
            // stream name is mangled with the consumer tag
            let consumer = string_imm(&args[2])
                .ok_or_else(|| SynthError::BadStreamCall("read_stream".to_string()))?;
            stream_name = format!("{stream_name}.to.{consumer}");
        }

        let stream_print_name = print_name(&stream_name);
        self.src
            .line(&format!("{a1} = {stream_print_name}.read();"));
        self.rename_wire(&a1, &stream_print_name, Some(&args[0]), &[])?;

        if self.predicate.is_some() {
            self.src.comment("reading stream with a predicate");
        }
        Ok(())
    }

    /// Lowers `write_stream(stream, src[, loop_var, loop_max]*)`.
    ///
    /// The multi-argument form used at DAG-output kernels emits an AXI
    /// "last" tag in the textual output only; the hardware graph carries no
    /// counterpart for end-of-frame signaling.
    pub(crate) fn lower_write_stream(&mut self, args: &[Expr]) -> Result<(), SynthError> {
        if args.len() < 2 {
            return Err(SynthError::BadStreamCall("write_stream".to_string()));
        }

        let (printed_stream_name, input_name) = if args.len() == 2 {
            let a0 = self.lower_expr(&args[0])?;
            let a1 = self.lower_expr(&args[1])?;
            self.src.line(&format!("{a0}.write({a1});"));
            (a0, a1)
        } else {
            if args.len() % 2 != 0 {
                return Err(SynthError::BadStreamCall("write_stream".to_string()));
            }
            let stream_name = var_name(&args[0])
                .ok_or_else(|| SynthError::BadStreamCall("write_stream".to_string()))?
                .to_string();
            let stencil_name = var_name(&args[1])
                .ok_or_else(|| SynthError::BadStreamCall("write_stream".to_string()))?
                .to_string();
            let packed_name = format!("{stencil_name}_packed");

            let stencil_type = self
                .stencils
                .get(&stencil_name)
                .cloned()
                .ok_or_else(|| SynthError::BadStreamCall("write_stream".to_string()))?;
            if stencil_type.kind != StencilKind::Stencil {
                return Err(SynthError::BadStreamCall("write_stream".to_string()));
            }

            self.src.line(&format!(
                "AxiPacked{} {} = {};",
                print_stencil_type(&stencil_type),
                print_name(&packed_name),
                print_name(&stencil_name)
            ));

            // TLAST from loop-bound equality, textual side channel only
            let mut guards = Vec::new();
            let mut i = 2;
            while i + 1 < args.len() {
                let loop_var = self.lower_expr(&args[i])?;
                let loop_max = self.lower_expr(&args[i + 1])?;
                guards.push(format!("{loop_var} == {loop_max}"));
                i += 2;
            }
            self.src.line(&format!("if ({})", guards.join(" && ")));
            self.src.open_scope();
            self.src
                .line(&format!("{}.last = 1;", print_name(&packed_name)));
            self.src.close_scope("");
            self.src.line("else");
            self.src.open_scope();
            self.src
                .line(&format!("{}.last = 0;", print_name(&packed_name)));
            self.src.close_scope("");

            self.src.line(&format!(
                "{}.write({});",
                print_name(&stream_name),
                print_name(&packed_name)
            ));
            (print_name(&stream_name), print_name(&stencil_name))
        };

        if self.predicate.is_some() {
            self.src.comment("writing stream with a predicate");
        }
        self.rename_wire(&printed_stream_name, &input_name, Some(&args[1]), &[])
    }

    /// Lowers the `dispatch_stream` fan-out form.
    pub(crate) fn lower_dispatch_stream(&mut self, args: &[Expr]) -> Result<(), SynthError> {
        let bad = || SynthError::BadStreamCall("dispatch_stream".to_string());

        let mut printed = Vec::with_capacity(args.len());
        for a in args {
            printed.push(self.lower_expr(a)?);
        }
        self.src
            .comment(&format!("dispatch_stream({});", printed.join(", ")));

        if args.len() < 2 {
            return Err(bad());
        }
        let stream_name = var_name(&args[0]).ok_or_else(bad)?.to_string();
        let num_dims = args[1].as_const_int().ok_or_else(bad)? as usize;

        if args.len() < num_dims * 3 + 3 {
            return Err(bad());
        }
        let mut stencil_sizes = Vec::with_capacity(num_dims);
        let mut stencil_steps = Vec::with_capacity(num_dims);
        let mut store_extents = Vec::with_capacity(num_dims);
        for i in 0..num_dims {
            stencil_sizes.push(args[i * 3 + 2].as_const_int().ok_or_else(bad)?);
            stencil_steps.push(args[i * 3 + 3].as_const_int().ok_or_else(bad)?);
            store_extents.push(args[i * 3 + 4].as_const_int().ok_or_else(bad)?);
        }

        let num_consumers = args[num_dims * 3 + 2].as_const_int().ok_or_else(bad)? as usize;
        let per_consumer = 2 + 2 * num_dims;
        if args.len() < num_dims * 3 + 3 + num_consumers * per_consumer {
            return Err(bad());
        }
        let mut consumer_names = Vec::with_capacity(num_consumers);
        let mut consumer_fifo_depth = Vec::with_capacity(num_consumers);
        let mut consumer_offsets = Vec::with_capacity(num_consumers);
        let mut consumer_extents = Vec::with_capacity(num_consumers);
        for i in 0..num_consumers {
            let base = num_dims * 3 + 3 + per_consumer * i;
            consumer_names.push(string_imm(&args[base]).ok_or_else(bad)?.to_string());
            consumer_fifo_depth.push(args[base + 1].as_const_int().ok_or_else(bad)?);
            let mut offsets = Vec::with_capacity(num_dims);
            let mut extents = Vec::with_capacity(num_dims);
            for j in 0..num_dims {
                offsets.push(args[base + 2 + 2 * j].as_const_int().ok_or_else(bad)?);
                extents.push(args[base + 3 + 2 * j].as_const_int().ok_or_else(bad)?);
            }
            consumer_offsets.push(offsets);
            consumer_extents.push(extents);
        }

        let stream_type = self
            .stencils
            .get(&stream_name)
            .cloned()
            .ok_or_else(bad)?;

        // one consumer with no buffering collapses to a rename
        if num_consumers == 1 && consumer_fifo_depth[0] == 0 {
            let consumer_stream_name = format!("{stream_name}.to.{}", consumer_names[0]);
            self.src.line(&format!(
                "{} &{} = {};",
                print_stencil_type(&stream_type),
                print_name(&consumer_stream_name),
                print_name(&stream_name)
            ));

            let stream_in_name = print_name(&stream_name);
            let stream_out_name = print_name(&consumer_stream_name);
            let next_lb_name = print_name(&consumer_names[0]);
            self.src
                .comment(&format!("connecting {stream_in_name} to {next_lb_name}"));
            self.record_dispatch(&stream_in_name, &next_lb_name);
            self.rename_wire(&stream_out_name, &stream_in_name, Some(&args[0]), &[])?;
            return Ok(());
        }

        for i in 0..num_consumers {
            let consumer_stream_name = format!("{stream_name}.to.{}", consumer_names[i]);
            let mut consumer_stream_type = stream_type.clone();
            // zero-depth FIFOs are not supported downstream
            consumer_stream_type.depth = consumer_fifo_depth[i].max(1) as u32;
            let printed_name = print_name(&consumer_stream_name);
            self.src.line(&format!(
                "{} {printed_name};",
                print_stencil_type(&consumer_stream_type)
            ));
            self.src
                .raw(&print_stencil_pragma(&printed_name, &consumer_stream_type));

            self.record_dispatch(&print_name(&stream_name), &print_name(&consumer_names[i]));
        }

        // textual copy loop, outer dimensions first
        for i in (0..num_dims).rev() {
            let dim_name = format!("_dim_{i}");
            self.src.line(&format!(
                "for (int {dim_name} = 0; {dim_name} <= {}; {dim_name} += {})",
                store_extents[i] - stencil_sizes[i],
                stencil_steps[i]
            ));
        }
        self.src.open_scope();
        self.src.line("#pragma HLS PIPELINE");

        let mut stencil_type = stream_type.clone();
        stencil_type.kind = StencilKind::Stencil;
        self.src.line(&format!(
            "Packed{} _tmp_stencil = {}.read();",
            print_stencil_type(&stencil_type),
            print_name(&stream_name)
        ));

        for i in 0..num_consumers {
            let consumer_stream_name = format!("{stream_name}.to.{}", consumer_names[i]);
            let mut guards = Vec::with_capacity(num_dims);
            for j in 0..num_dims {
                let dim_name = format!("_dim_{j}");
                guards.push(format!(
                    "{dim_name} >= {} && {dim_name} <= {}",
                    consumer_offsets[i][j],
                    consumer_offsets[i][j] + consumer_extents[i][j] - stencil_sizes[j]
                ));
            }
            self.src.line(&format!("if ({})", guards.join(" && ")));
            self.src.open_scope();
            self.src.line(&format!(
                "{}.write(_tmp_stencil);",
                print_name(&consumer_stream_name)
            ));
            self.src.close_scope("");

            self.rename_wire(
                &print_name(&consumer_stream_name),
                &print_name(&stream_name),
                Some(&args[0]),
                &[],
            )?;
        }
        self.src.close_scope("");
        Ok(())
    }
}
