//! End-to-end properties of the netlist synthesis engine, driven through
//! synthetic kernels and contexts.

use spindle_diagnostics::DiagnosticSink;
use spindle_ir::{BinaryOp, Bound, Expr, KernelArg, ScalarType, StencilKind, StencilType, Stmt};
use spindle_netlist::{HwType, ModuleDef, ParamValue, Values, Wire};
use spindle_synth::{add_kernel, SynthesisContext, TargetOptions};

fn fresh_ctx(sink: &DiagnosticSink, has_valid: bool) -> SynthesisContext<'_> {
    SynthesisContext::new(
        ModuleDef::new("DesignTop", HwType::Record(vec![])),
        TargetOptions {
            has_valid,
            bitwidth: 16,
        },
        sink,
    )
}

fn stencil_call(name: &str, indices: Vec<Expr>) -> Expr {
    Expr::Call {
        name: name.to_string(),
        args: indices,
        ty: ScalarType::uint(16),
    }
}

fn axi_stencil(extents: &[u64]) -> StencilType {
    StencilType {
        kind: StencilKind::AxiStream,
        elem: ScalarType::uint(16),
        bounds: extents.iter().map(|&e| Bound::extent(e)).collect(),
        depth: 1,
    }
}

/// Writing `s(2, 3) := X` then reading `s(2, 3)` resolves back to `X` with
/// zero multiplexers synthesized.
#[test]
fn constant_index_round_trip() {
    let sink = DiagnosticSink::new();
    let mut ctx = fresh_ctx(&sink, false);
    ctx.add_wire("_x", Wire::self_port("in").sel("x"), &[])
        .unwrap();

    let body = Stmt::Block(vec![
        Stmt::Provide {
            name: "s.stencil".to_string(),
            args: vec![Expr::u16(2), Expr::u16(3)],
            value: Expr::var("x"),
        },
        Stmt::Evaluate(stencil_call(
            "s.stencil",
            vec![Expr::u16(2), Expr::u16(3)],
        )),
    ]);
    let realize = Stmt::Realize {
        name: "s.stencil".to_string(),
        elem: ScalarType::uint(16),
        bounds: vec![Bound::extent(4), Bound::extent(4)],
        body: Box::new(body),
    };
    ctx.lower_stmt(&realize).unwrap();

    assert_eq!(ctx.def.count_generator("commonlib.muxn"), 0);

    // the provide landed on the storage cell's input at (2, 3)
    let (pt_id, _) = ctx
        .def
        .instances()
        .find(|(_, inst)| inst.generator == "mantle.wire")
        .expect("storage passthrough");
    let write_terminal = Wire::inst(pt_id).sel("in").sel_idx(3).sel_idx(2);
    assert_eq!(
        ctx.def.connected_to(&write_terminal),
        vec![&Wire::self_port("in").sel("x")]
    );
    assert!(!sink.has_errors());
}

/// Indexing a dimension of extent 4 with a non-constant expression creates
/// exactly one 4-input multiplexer with a 2-bit select slice.
#[test]
fn variable_index_mux_sizing() {
    let sink = DiagnosticSink::new();
    let mut ctx = fresh_ctx(&sink, false);
    ctx.add_wire("_i", Wire::self_port("in").sel("i"), &[])
        .unwrap();

    let body = Stmt::Evaluate(stencil_call("s.stencil", vec![Expr::var("i")]));
    let realize = Stmt::Realize {
        name: "s.stencil".to_string(),
        elem: ScalarType::uint(16),
        bounds: vec![Bound::extent(4)],
        body: Box::new(body),
    };
    ctx.lower_stmt(&realize).unwrap();

    let muxes: Vec<_> = ctx
        .def
        .instances()
        .filter(|(_, inst)| inst.generator == "commonlib.muxn")
        .collect();
    assert_eq!(muxes.len(), 1);
    let (mux_id, mux) = muxes[0];
    assert_eq!(mux.gen_args.get("N").and_then(ParamValue::as_int), Some(4));

    // the mux has a data input per candidate position
    for k in 0..4 {
        let data_in = Wire::inst(mux_id).sel("in").sel("data").sel_idx(k);
        assert_eq!(ctx.def.connected_to(&data_in).len(), 1, "data input {k}");
    }

    let slices: Vec<_> = ctx
        .def
        .instances()
        .filter(|(_, inst)| inst.generator == "coreir.slice")
        .collect();
    assert_eq!(slices.len(), 1);
    // ceil(log2(4)) bits of select
    assert_eq!(
        slices[0].1.gen_args.get("hi").and_then(ParamValue::as_int),
        Some(2)
    );
}

/// A doubly-nested loop chains the inner counter's overflow into the outer
/// counter's enable, with both resets on the shared module reset.
#[test]
fn loop_overflow_chaining_with_shared_reset() {
    let sink = DiagnosticSink::new();
    let mut ctx = fresh_ctx(&sink, true);

    let inner_body = Stmt::Store {
        name: "acc".to_string(),
        index: Expr::binary(BinaryOp::Add, Expr::var("y"), Expr::var("x")),
        value: Expr::u16(0),
    };
    let nest = Stmt::For {
        name: "y".to_string(),
        min: Expr::u16(0),
        extent: Expr::u16(4),
        body: Box::new(Stmt::For {
            name: "x".to_string(),
            min: Expr::u16(0),
            extent: Expr::u16(8),
            body: Box::new(inner_body),
        }),
    };
    ctx.lower_stmt(&nest).unwrap();

    assert_eq!(ctx.def.count_generator("commonlib.counter"), 2);
    let outer = ctx.def.instance_named("count__y").unwrap();
    let inner = ctx.def.instance_named("count__x").unwrap();

    assert_eq!(
        ctx.def.connected_to(&Wire::inst(outer).sel("en")),
        vec![&Wire::inst(inner).sel("overflow")]
    );
    assert_eq!(
        ctx.def.connected_to(&Wire::inst(inner).sel("reset")),
        vec![&Wire::self_port("reset")]
    );
    assert_eq!(
        ctx.def.connected_to(&Wire::inst(outer).sel("reset")),
        vec![&Wire::self_port("reset")]
    );
    // inner counter parameters: max = min + extent - 1
    let inner_inst = ctx.def.instance(inner).unwrap();
    assert_eq!(
        inner_inst.gen_args.get("max").and_then(ParamValue::as_int),
        Some(7)
    );
}

/// A realized value that is driven but never read or indexed loses its
/// passthrough: the graph shrinks by exactly one instance.
#[test]
fn dead_passthrough_elision() {
    let sink = DiagnosticSink::new();
    let mut ctx = fresh_ctx(&sink, false);
    ctx.add_wire("_v", Wire::self_port("in").sel("v"), &[])
        .unwrap();

    let write = Stmt::Evaluate(Expr::Call {
        name: "write_stream".to_string(),
        args: vec![
            Expr::Var {
                name: "s.stream".to_string(),
                ty: ScalarType::uint(16),
            },
            Expr::var("v"),
        ],
        ty: ScalarType::uint(16),
    });
    let realize = Stmt::Realize {
        name: "s.stream".to_string(),
        elem: ScalarType::uint(16),
        bounds: vec![Bound::extent(1)],
        body: Box::new(write),
    };

    let before = ctx.def.instance_count();
    ctx.lower_stmt(&realize).unwrap();
    // the passthrough was created and then elided: net zero
    assert_eq!(ctx.def.instance_count(), before);
    // the name now resolves as a plain wire to the driven value
    let resolved = ctx.get_wire("_s_stream", None, &[]).unwrap();
    assert_eq!(resolved, Wire::self_port("in").sel("v"));
}

/// The single-consumer/zero-depth dispatch path produces a pure alias, and
/// the recorded edge is resolvable by the linebuffer valid-chain walk.
#[test]
fn dispatch_edge_feeds_linebuffer_chain() {
    let sink = DiagnosticSink::new();
    let mut ctx = fresh_ctx(&sink, true);
    ctx.stencils.push(
        "conv.stencil.stream",
        StencilType {
            kind: StencilKind::Stream,
            elem: ScalarType::uint(16),
            bounds: vec![Bound::extent(1)],
            depth: 1,
        },
    );
    ctx.add_wire("_conv_stencil_stream", Wire::self_port("in").sel("arg_0"), &[])
        .unwrap();

    // stand in for the linebuffer that produced the dispatched stream
    let lb = ctx.def.add_instance(
        "lb_marker",
        "commonlib.linebuffer",
        Values::new(),
        Values::new(),
    );
    let lb_base = Wire::inst(lb);
    ctx.record_linebuffer("_conv_stencil_stream", lb_base.clone());

    let dispatch = Expr::Call {
        name: "dispatch_stream".to_string(),
        args: vec![
            Expr::Var {
                name: "conv.stencil.stream".to_string(),
                ty: ScalarType::uint(16),
            },
            Expr::u16(1),
            Expr::u16(3),
            Expr::u16(1),
            Expr::u16(10),
            Expr::u16(1),
            Expr::StringImm("next".to_string()),
            Expr::u16(0),
            Expr::u16(0),
            Expr::u16(10),
        ],
        ty: ScalarType::uint(16),
    };
    let before = ctx.def.instance_count();
    ctx.lower_stmt(&Stmt::Evaluate(dispatch)).unwrap();
    // pure alias: no FIFO instance appeared
    assert_eq!(ctx.def.instance_count(), before);
    assert!(ctx.is_wire("_conv_stencil_stream_to_next"));

    // the recorded edge _next -> _conv_stencil_stream resolves to the
    // upstream linebuffer's valid output
    let wen_dest = Wire::self_port("in").sel("wen_probe");
    assert!(ctx.connect_linebuffer("_next".to_string(), wen_dest.clone()));
    assert_eq!(
        ctx.def.connected_to(&wen_dest),
        vec![&lb_base.sel("valid")]
    );

    ctx.stencils.pop("conv.stencil.stream");
}

/// A complete pointwise kernel lowers with no errors, connects the output,
/// and leaves provenance comments in the generated source.
#[test]
fn pointwise_kernel_end_to_end() {
    let sink = DiagnosticSink::new();
    let args = vec![
        KernelArg::stream_input("input.stencil.stream", axi_stencil(&[1, 1])),
        KernelArg::stream_output("output.stencil.stream", axi_stencil(&[1, 1])),
    ];

    let body = Stmt::Block(vec![
        Stmt::Evaluate(Expr::Call {
            name: "read_stream".to_string(),
            args: vec![
                Expr::Var {
                    name: "input.stencil.stream".to_string(),
                    ty: ScalarType::uint(16),
                },
                Expr::Var {
                    name: "in.stencil".to_string(),
                    ty: ScalarType::uint(16),
                },
            ],
            ty: ScalarType::uint(16),
        }),
        Stmt::Provide {
            name: "out.stencil".to_string(),
            args: vec![Expr::u16(0)],
            value: Expr::binary(
                BinaryOp::Mul,
                stencil_call("in.stencil", vec![Expr::u16(0), Expr::u16(0)]),
                Expr::u16(2),
            ),
        },
        Stmt::Evaluate(Expr::Call {
            name: "write_stream".to_string(),
            args: vec![
                Expr::Var {
                    name: "output.stencil.stream".to_string(),
                    ty: ScalarType::uint(16),
                },
                Expr::Var {
                    name: "out.stencil".to_string(),
                    ty: ScalarType::uint(16),
                },
            ],
            ty: ScalarType::uint(16),
        }),
    ]);
    let stmt = Stmt::Realize {
        name: "out.stencil".to_string(),
        elem: ScalarType::uint(16),
        bounds: vec![Bound::extent(1)],
        body: Box::new(body),
    };

    let artifacts = add_kernel(&stmt, "scale", &args, &TargetOptions::default(), &sink).unwrap();
    assert!(!sink.has_errors());

    // one multiplier, with the design output driven
    assert_eq!(artifacts.design.count_generator("coreir.mul"), 1);
    assert!(!artifacts
        .design
        .connected_to(&Wire::self_port("out"))
        .is_empty());

    // the audit trail survives into the source text
    assert!(artifacts.source.contains("// "));
    assert!(artifacts.source.contains("[provide]"));
    assert!(artifacts.header.contains("void _scale("));

    // the JSON artifact carries the instances
    let doc = spindle_netlist::save::design_json(&artifacts.design);
    let instances = &doc["namespaces"]["global"]["modules"]["DesignTop"]["instances"];
    assert!(instances.as_object().map(|m| !m.is_empty()).unwrap_or(false));
}

/// Lowering is deterministic: the same kernel lowers to the same graph.
#[test]
fn lowering_is_deterministic() {
    let run = || {
        let sink = DiagnosticSink::new();
        let args = vec![
            KernelArg::stream_input("input.stencil.stream", axi_stencil(&[1])),
            KernelArg::stream_output("output.stencil.stream", axi_stencil(&[1])),
        ];
        let stmt = Stmt::Evaluate(Expr::Call {
            name: "write_stream".to_string(),
            args: vec![
                Expr::Var {
                    name: "output.stencil.stream".to_string(),
                    ty: ScalarType::uint(16),
                },
                Expr::Var {
                    name: "input.stencil.stream".to_string(),
                    ty: ScalarType::uint(16),
                },
            ],
            ty: ScalarType::uint(16),
        });
        let artifacts =
            add_kernel(&stmt, "copy", &args, &TargetOptions::default(), &sink).unwrap();
        serde_json::to_string(&spindle_netlist::save::design_json(&artifacts.design)).unwrap()
    };
    assert_eq!(run(), run());
}
