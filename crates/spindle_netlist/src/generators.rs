//! The primitive operator registry.
//!
//! A fixed mapping from logical operator names used during lowering (`mul`,
//! `counter`, `linebuffer`, `ram2`, …) to qualified generator or module
//! handles in the primitive libraries. The registry is populated once per
//! target context; asking for an unregistered name is an internal error, not
//! a user error.

use crate::error::NetlistError;
use std::collections::HashMap;

/// Qualified handle for the passthrough wire primitive.
pub const PASSTHROUGH: &str = "mantle.wire";

/// Maps logical operator names to qualified generator handles.
#[derive(Debug, Clone)]
pub struct GeneratorRegistry {
    gens: HashMap<String, String>,
}

impl GeneratorRegistry {
    /// Builds the registry with the full primitive library set.
    pub fn with_defaults() -> Self {
        let mut gens = HashMap::new();

        // core arithmetic, logic, comparison, and routing generators
        let coreir = [
            "mul", "add", "sub", "and", "or", "xor", "not", "eq", "neq", "ult", "ugt", "ule",
            "uge", "slt", "sgt", "sle", "sge", "shl", "ashr", "lshr", "mux", "const", "wire",
            "slice",
        ];
        for name in coreir {
            gens.insert(name.to_string(), format!("coreir.{name}"));
        }

        // wider operators and the stream/memory structural generators
        let commonlib = [
            "umin", "smin", "umax", "smax", "div", "counter", "linebuffer", "muxn", "abs", "absd",
            "reg_array", "rmw", "const_array",
        ];
        for name in commonlib {
            gens.insert(name.to_string(), format!("commonlib.{name}"));
        }

        // floating-point operators currently live alongside the commonlib set
        let float = [
            "fmul", "fadd", "fsub", "feq", "fneq", "flt", "fgt", "fle", "fge", "fmux", "fconst",
        ];
        for name in float {
            gens.insert(name.to_string(), format!("commonlib.{name}"));
        }

        // one-bit module forms, named with a `bit` prefix at the logical level
        let corebit = [
            "bitand", "bitor", "bitxor", "bitxnor", "bitnot", "bitmux", "bitconst", "bitult",
            "bitugt", "bitule", "bituge",
        ];
        for name in corebit {
            let stripped = name.strip_prefix("bit").unwrap_or(name);
            gens.insert(name.to_string(), format!("corebit.{stripped}"));
        }

        // memory primitives
        for name in ["ram2", "rom2", "fifo"] {
            gens.insert(name.to_string(), format!("memory.{name}"));
        }

        gens.insert("passthrough".to_string(), PASSTHROUGH.to_string());

        Self { gens }
    }

    /// Returns the qualified handle for a logical operator name.
    pub fn get(&self, name: &str) -> Result<&str, NetlistError> {
        self.gens
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| NetlistError::UnknownGenerator(name.to_string()))
    }

    /// Returns `true` if the logical name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.gens.contains_key(name)
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_operators_registered() {
        let gens = GeneratorRegistry::with_defaults();
        assert_eq!(gens.get("mul").unwrap(), "coreir.mul");
        assert_eq!(gens.get("lshr").unwrap(), "coreir.lshr");
        assert_eq!(gens.get("counter").unwrap(), "commonlib.counter");
        assert_eq!(gens.get("linebuffer").unwrap(), "commonlib.linebuffer");
        assert_eq!(gens.get("ram2").unwrap(), "memory.ram2");
        assert_eq!(gens.get("rom2").unwrap(), "memory.rom2");
    }

    #[test]
    fn bit_level_modules_drop_prefix() {
        let gens = GeneratorRegistry::with_defaults();
        assert_eq!(gens.get("bitand").unwrap(), "corebit.and");
        assert_eq!(gens.get("bitconst").unwrap(), "corebit.const");
        assert_eq!(gens.get("bitmux").unwrap(), "corebit.mux");
    }

    #[test]
    fn passthrough_is_a_mantle_wire() {
        let gens = GeneratorRegistry::with_defaults();
        assert_eq!(gens.get("passthrough").unwrap(), PASSTHROUGH);
    }

    #[test]
    fn unknown_name_is_an_error() {
        let gens = GeneratorRegistry::with_defaults();
        assert!(matches!(
            gens.get("teleport"),
            Err(NetlistError::UnknownGenerator(_))
        ));
    }

    #[test]
    fn float_ops_route_to_commonlib() {
        let gens = GeneratorRegistry::with_defaults();
        assert_eq!(gens.get("fmul").unwrap(), "commonlib.fmul");
        assert_eq!(gens.get("fconst").unwrap(), "commonlib.fconst");
    }
}
