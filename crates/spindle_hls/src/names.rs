//! Name mangling between IR names and C identifiers.

/// Mangles an IR-level name into a C identifier.
///
/// Dots, dollar signs, and any other non-alphanumeric characters become
/// underscores, and the result is prefixed with an underscore so generated
/// names never collide with C keywords. Mangling is idempotent: renamed
/// allocations re-enter the visitors already mangled and must come out
/// unchanged.
pub fn print_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 1);
    if !name.starts_with('_') {
        out.push('_');
    }
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    out
}

/// Strips the stream suffix off a mangled stream name.
///
/// Dispatch bookkeeping keys producers and consumers by their base buffer
/// name, not the per-stage stream names.
pub fn strip_stream(name: &str) -> String {
    if let Some(base) = name.strip_suffix("_stencil_update_stream") {
        base.to_string()
    } else if let Some(base) = name.strip_suffix("_stencil_stream") {
        base.to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mangles_dotted_names() {
        assert_eq!(print_name("conv.stencil_update.stream"), "_conv_stencil_update_stream");
        assert_eq!(print_name("in$1"), "_in_1");
    }

    #[test]
    fn plain_names_keep_their_spelling() {
        assert_eq!(print_name("x"), "_x");
    }

    #[test]
    fn mangling_is_idempotent() {
        let once = print_name("conv.stencil");
        assert_eq!(print_name(&once), once);
    }

    #[test]
    fn strips_stream_suffixes() {
        assert_eq!(strip_stream("_conv_stencil_stream"), "_conv");
        assert_eq!(strip_stream("_conv_stencil_update_stream"), "_conv");
        assert_eq!(strip_stream("_conv"), "_conv");
    }
}
