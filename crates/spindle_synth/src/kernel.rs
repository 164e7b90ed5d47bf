//! Per-kernel driving: interface construction, argument binding, teardown.
//!
//! `add_kernel` builds the design's record type from the argument metadata
//! (streamed stencils become `in.<arg>` record entries or the output, taps
//! become annotated constant instances), emits the HLS prototype and
//! interface pragmas, lowers the statement tree, and finishes by checking
//! the scope invariants, running the netlist rewrite passes, and producing
//! the savable artifacts.

use crate::context::{SynthesisContext, TargetOptions};
use crate::error::SynthError;
use spindle_diagnostics::DiagnosticSink;
use spindle_hls::{print_name, print_stencil_type, print_type};
use spindle_ir::{KernelArg, StencilKind, Stmt};
use spindle_netlist::passes::{run_passes, PassStats};
use spindle_netlist::save::{design_json, save_dot, save_json};
use spindle_netlist::values::values;
use spindle_netlist::{HwType, ModuleDef, NetlistError, ParamValue, Values, Wire};
use std::path::{Path, PathBuf};

/// Everything one kernel's lowering produces.
pub struct KernelArtifacts {
    /// The kernel name.
    pub name: String,
    /// The final hardware graph, after rewrite passes.
    pub design: ModuleDef,
    /// The JSON document captured before the rewrite passes ran.
    pub prepass: serde_json::Value,
    /// The generated header text.
    pub header: String,
    /// The generated implementation text.
    pub source: String,
    /// Rewrite pass statistics.
    pub stats: PassStats,
}

impl KernelArtifacts {
    /// Writes the artifact file set into `dir`.
    ///
    /// The graph files are skipped for designs with no instances (a kernel
    /// with no streamed arguments has nothing worth saving).
    pub fn save(&self, dir: &Path) -> Result<Vec<PathBuf>, NetlistError> {
        let mut written = Vec::new();

        if self.design.has_instances() {
            let prepass_path = dir.join("design_prepass.json");
            std::fs::write(&prepass_path, serde_json::to_string_pretty(&self.prepass)?)?;
            written.push(prepass_path);

            let top_path = dir.join("design_top.json");
            save_json(&self.design, &top_path)?;
            written.push(top_path);

            let dot_path = dir.join("design_top.dot");
            save_dot(&self.design, &dot_path)?;
            written.push(dot_path);
        }

        let hdr_path = dir.join(format!("{}.h", self.name));
        std::fs::write(&hdr_path, &self.header)?;
        written.push(hdr_path);

        let src_path = dir.join(format!("{}.cpp", self.name));
        std::fs::write(&src_path, &self.source)?;
        written.push(src_path);

        Ok(written)
    }
}

/// Lowers one accelerated kernel into its netlist and HLS rendering.
pub fn add_kernel(
    stmt: &Stmt,
    name: &str,
    args: &[KernelArg],
    options: &TargetOptions,
    sink: &DiagnosticSink,
) -> Result<KernelArtifacts, SynthError> {
    let mut ctx = build_kernel_context(name, args, options, sink)?;
    ctx.lower_stmt(stmt)?;
    finish_kernel(ctx, name, args)
}

/// Builds the context with the interface bound: record type, input map,
/// output set, tap instances, argument aliases, prototype, and pragmas.
fn build_kernel_context<'a>(
    name: &str,
    args: &[KernelArg],
    options: &TargetOptions,
    sink: &'a DiagnosticSink,
) -> Result<SynthesisContext<'a>, SynthError> {
    let mut input_types: Vec<(String, HwType)> = Vec::new();
    let mut output_type = HwType::Bit;
    let mut output_args: Vec<String> = Vec::new();
    let mut tap_types: Vec<(usize, HwType)> = Vec::new();

    for (i, arg) in args.iter().enumerate() {
        let arg_name = format!("arg_{i}");
        if !arg.is_stencil {
            continue;
        }
        let st = arg
            .stencil
            .as_ref()
            .ok_or_else(|| SynthError::BadArgument(arg.name.clone()))?;
        if st.kind == StencilKind::Stream {
            // kernel boundaries carry AXI streams or stencil taps only
            return Err(SynthError::BadArgument(arg.name.clone()));
        }
        let extents = st
            .const_extents()
            .ok_or_else(|| SynthError::NonConstBounds(arg.name.clone()))?;
        let bw = options.instance_width(st.elem.bits);

        if arg.is_output && st.kind == StencilKind::AxiStream {
            output_type = HwType::packed(false, bw, &extents);
            output_args.push(arg_name);
        } else if !arg.is_output && st.kind == StencilKind::AxiStream {
            input_types.push((arg_name, HwType::packed(true, bw, &extents)));
        } else {
            // an array of taps; configuration changes infrequently
            tap_types.push((i, HwType::packed(false, bw, &extents)));
        }
    }

    let mut fields: Vec<(String, HwType)> = vec![(
        "in".to_string(),
        HwType::Record(input_types.clone()),
    )];
    if options.has_valid {
        fields.push(("reset".to_string(), HwType::BitIn));
    }
    fields.push(("out".to_string(), output_type));
    if options.has_valid {
        fields.push(("valid".to_string(), HwType::Bit));
    }

    let def = ModuleDef::new("DesignTop", HwType::Record(fields));
    let mut ctx = SynthesisContext::new(def, options.clone(), sink);

    for (arg_name, _) in &input_types {
        ctx.inputs
            .insert(arg_name.clone(), Wire::self_port("in").sel(arg_name));
    }
    for arg_name in output_args {
        ctx.outputs.insert(arg_name);
    }

    emit_prototype(&mut ctx, name, args);
    emit_interface_pragmas(&mut ctx, args);
    bind_arguments(&mut ctx, args, &tap_types)?;
    Ok(ctx)
}

fn emit_prototype(ctx: &mut SynthesisContext<'_>, name: &str, args: &[KernelArg]) {
    let mut params = Vec::with_capacity(args.len());
    for (i, arg) in args.iter().enumerate() {
        let arg_name = format!("arg_{i}");
        if let Some(st) = arg.stencil.as_ref().filter(|_| arg.is_stencil) {
            let by_ref = if st.kind == StencilKind::AxiStream {
                "&"
            } else {
                ""
            };
            params.push(format!("{} {by_ref}{arg_name}", print_stencil_type(st)));
        } else {
            params.push(format!("{} {arg_name}", print_type(arg.scalar)));
        }
    }
    let proto = format!("void {}({})", print_name(name), params.join(", "));

    let guard = format!(
        "SPINDLE_HW_TARGET_{}_H",
        print_name(name).trim_start_matches('_').to_uppercase()
    );
    ctx.hdr.line(&format!("#ifndef {guard}"));
    ctx.hdr.line(&format!("#define {guard}"));
    ctx.hdr.line("");
    ctx.hdr.line("#include <assert.h>");
    ctx.hdr.line("#include <stdio.h>");
    ctx.hdr.line("#include <stdlib.h>");
    ctx.hdr.line("#include <hls_stream.h>");
    ctx.hdr.line("#include \"Stencil.h\"");
    ctx.hdr.line("");
    ctx.hdr.line(&format!("{proto};"));

    ctx.src.line(&format!("{proto}"));
    ctx.src.open_scope();
}

fn emit_interface_pragmas(ctx: &mut SynthesisContext<'_>, args: &[KernelArg]) {
    ctx.src.line("#pragma CoreIR DATAFLOW");
    ctx.src.line("#pragma CoreIR INLINE region");
    ctx.src
        .line("#pragma CoreIR INTERFACE s_axilite port=return bundle=config");
    for (i, arg) in args.iter().enumerate() {
        let arg_name = format!("arg_{i}");
        if arg.is_stencil {
            if arg.name.ends_with(".stream") {
                ctx.src.line(&format!(
                    "#pragma CoreIR INTERFACE axis register port={arg_name}"
                ));
            } else {
                ctx.src.line(&format!(
                    "#pragma CoreIR INTERFACE s_axilite port={arg_name} bundle=config"
                ));
                ctx.src.line(&format!(
                    "#pragma CoreIR ARRAY_PARTITION variable={arg_name}.value complete dim=0"
                ));
            }
        } else {
            ctx.src.line(&format!(
                "#pragma CoreIR INTERFACE s_axilite port={arg_name} bundle=config"
            ));
        }
    }
    ctx.src.line("");
}

/// Aliases each argument under its IR name and creates tap instances.
fn bind_arguments(
    ctx: &mut SynthesisContext<'_>,
    args: &[KernelArg],
    tap_types: &[(usize, HwType)],
) -> Result<(), SynthError> {
    ctx.src.comment("alias the arguments");
    for (i, arg) in args.iter().enumerate() {
        let arg_name = format!("arg_{i}");
        let printed = print_name(&arg.name);

        if arg.is_stencil {
            let st = arg
                .stencil
                .as_ref()
                .ok_or_else(|| SynthError::BadArgument(arg.name.clone()))?;
            ctx.allocations.push(&arg.name, st.elem);
            ctx.stencils.push(&arg.name, st.clone());
            ctx.src.line(&format!(
                "{} &{printed} = {arg_name};",
                print_stencil_type(st)
            ));

            if arg.name.ends_with(".stream") {
                if ctx.is_input(&arg_name) {
                    let input_wire = ctx.inputs[&arg_name].clone();
                    ctx.inputs.insert(printed.clone(), input_wire);
                    ctx.rename_wire(&printed, &arg_name, None, &[])?;
                }
                if ctx.is_output(&arg_name) {
                    ctx.outputs.insert(printed.clone());
                }
            } else {
                // a stencil tap: an array of constants expected to change
                // as configuration values
                let tap_type = tap_types
                    .iter()
                    .find(|(idx, _)| *idx == i)
                    .map(|(_, ty)| ty.clone())
                    .unwrap_or(HwType::Bit);
                let taps_name = format!("taps{printed}");
                let gen = ctx.gens.get("const_array")?.to_string();
                let tap_id = ctx.def.add_instance(
                    &taps_name,
                    &gen,
                    values([("type", ParamValue::Ty(tap_type))]),
                    Values::new(),
                );
                ctx.def.set_metadata(
                    tap_id,
                    "tap",
                    "This array of constants is expected to be changed as tap values.",
                );
                ctx.add_wire(&printed, Wire::inst(tap_id).sel("out"), &[])?;
            }
        } else {
            ctx.src.line(&format!(
                "{} &{printed} = {arg_name};",
                print_type(arg.scalar)
            ));
            // configurable taps are generated as constant registers
            let tap_name = format!("tap{printed}");
            let out = ctx.add_const_instance(&tap_name, 0, arg.scalar.bits)?;
            if let Some(id) = out.root_inst() {
                ctx.def.set_metadata(
                    id,
                    "tap",
                    "This constant is expected to be changed as a tap value.",
                );
            }
            ctx.add_wire(&printed, out, &[])?;
        }
    }

    let input_names: Vec<String> = ctx.inputs.keys().cloned().collect();
    ctx.src
        .comment(&format!("hw_input_set contains: {}", input_names.join(" ")));
    let output_names: Vec<String> = ctx.outputs.iter().cloned().collect();
    ctx.src
        .comment(&format!("hw_output_set contains: {}", output_names.join(" ")));
    ctx.src.line("");
    Ok(())
}

/// Pops argument scopes, checks the teardown invariants, runs the rewrite
/// passes, and assembles the artifact set.
fn finish_kernel(
    mut ctx: SynthesisContext<'_>,
    name: &str,
    args: &[KernelArg],
) -> Result<KernelArtifacts, SynthError> {
    ctx.src
        .close_scope(&format!("kernel hw_target{}", print_name(name)));

    for arg in args {
        if arg.is_stencil {
            ctx.allocations.pop(&arg.name);
            ctx.stencils.pop(&arg.name);
        }
    }
    if let Some(leaked) = ctx.stencils.names().next() {
        return Err(SynthError::ScopeLeak(leaked.to_string()));
    }
    if let Some(leaked) = ctx.allocations.names().next() {
        return Err(SynthError::ScopeLeak(leaked.to_string()));
    }

    let prepass = design_json(&ctx.def);
    let mut design = ctx.def;
    let stats = run_passes(&mut design);

    ctx.hdr.line("");
    ctx.hdr.line("#endif");

    let mut source = String::new();
    source.push_str(&format!("#include \"{name}.h\"\n\n"));
    source.push_str("#include \"Linebuffer.h\"\n");
    source.push_str("#include \"hw_math.h\"\n\n");
    source.push_str(ctx.src.contents());

    Ok(KernelArtifacts {
        name: name.to_string(),
        design,
        prepass,
        header: ctx.hdr.into_contents(),
        source,
        stats,
    })
}
