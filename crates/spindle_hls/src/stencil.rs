//! Stencil and stream type printing plus interface pragmas.

use crate::exprs::print_type;
use spindle_ir::{StencilKind, StencilType};

/// Prints a stencil shape as its HLS C++ container type.
pub fn print_stencil_type(st: &StencilType) -> String {
    let mut dims = String::new();
    for bound in &st.bounds {
        let extent = bound.extent.as_const_int().unwrap_or(0);
        dims.push_str(&format!(", {extent}"));
    }
    let elem = print_type(st.elem);
    match st.kind {
        StencilKind::Stencil => format!("Stencil<{elem}{dims}>"),
        StencilKind::Stream => format!("hls::stream<PackedStencil<{elem}{dims}> >"),
        StencilKind::AxiStream => format!("hls::stream<AxiPackedStencil<{elem}{dims}> >"),
    }
}

/// Prints the interface pragma block for a named stencil or stream.
///
/// Shallow FIFOs additionally request the shift-register implementation.
pub fn print_stencil_pragma(name: &str, st: &StencilType) -> String {
    match st.kind {
        StencilKind::Stream | StencilKind::AxiStream => {
            let mut out = format!("#pragma CoreIR STREAM variable={name} depth={}\n", st.depth);
            if st.depth <= 100 {
                out.push_str(&format!(
                    "#pragma CoreIR RESOURCE variable={name} core=FIFO_SRL\n"
                ));
            }
            out
        }
        StencilKind::Stencil => {
            format!("#pragma CoreIR ARRAY_PARTITION variable={name}.value complete dim=0\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spindle_ir::{Bound, ScalarType};

    fn stencil(kind: StencilKind, depth: u32) -> StencilType {
        StencilType {
            kind,
            elem: ScalarType::uint(16),
            bounds: vec![Bound::extent(3), Bound::extent(3)],
            depth,
        }
    }

    #[test]
    fn stencil_container_spelling() {
        assert_eq!(
            print_stencil_type(&stencil(StencilKind::Stencil, 1)),
            "Stencil<uint16_t, 3, 3>"
        );
        assert_eq!(
            print_stencil_type(&stencil(StencilKind::Stream, 1)),
            "hls::stream<PackedStencil<uint16_t, 3, 3> >"
        );
        assert_eq!(
            print_stencil_type(&stencil(StencilKind::AxiStream, 1)),
            "hls::stream<AxiPackedStencil<uint16_t, 3, 3> >"
        );
    }

    #[test]
    fn shallow_stream_pragma_requests_srl() {
        let text = print_stencil_pragma("_conv_stream", &stencil(StencilKind::Stream, 8));
        assert!(text.contains("STREAM variable=_conv_stream depth=8"));
        assert!(text.contains("core=FIFO_SRL"));
    }

    #[test]
    fn deep_stream_pragma_skips_srl() {
        let text = print_stencil_pragma("_conv_stream", &stencil(StencilKind::Stream, 512));
        assert!(text.contains("depth=512"));
        assert!(!text.contains("FIFO_SRL"));
    }

    #[test]
    fn stencil_pragma_partitions_array() {
        let text = print_stencil_pragma("_taps", &stencil(StencilKind::Stencil, 1));
        assert!(text.contains("ARRAY_PARTITION variable=_taps.value"));
    }
}
