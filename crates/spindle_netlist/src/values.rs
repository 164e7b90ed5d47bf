//! Generator and module parameter values.

use crate::hwtype::HwType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One parameter value on a generator instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// An integer parameter (widths, depths, counter bounds).
    Int(i64),
    /// A boolean parameter (`has_valid`, `has_clr`).
    Bool(bool),
    /// A sized constant value.
    BitVector {
        /// The width in bits.
        width: u32,
        /// The constant value.
        value: i64,
    },
    /// A hardware type parameter (passthrough/register-array shapes).
    Ty(HwType),
    /// An opaque JSON payload (memory init contents).
    Json(serde_json::Value),
}

impl ParamValue {
    /// Returns the integer value of `Int` parameters.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

/// An ordered parameter map. Ordering keeps the serialized artifact stable.
pub type Values = BTreeMap<String, ParamValue>;

/// Builds a [`Values`] map from name/value pairs.
pub fn values<const N: usize>(pairs: [(&str, ParamValue); N]) -> Values {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_lookup() {
        let vals = values([
            ("width", ParamValue::Int(16)),
            ("max", ParamValue::Int(7)),
        ]);
        assert_eq!(vals.get("width").and_then(ParamValue::as_int), Some(16));
        assert_eq!(vals.get("max").and_then(ParamValue::as_int), Some(7));
        assert_eq!(vals.get("missing"), None);
    }

    #[test]
    fn as_int_rejects_other_variants() {
        assert_eq!(ParamValue::Bool(true).as_int(), None);
        assert_eq!(
            ParamValue::BitVector {
                width: 16,
                value: 3
            }
            .as_int(),
            None
        );
    }

    #[test]
    fn ordering_is_stable() {
        let vals = values([("z", ParamValue::Int(1)), ("a", ParamValue::Int(2))]);
        let keys: Vec<_> = vals.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "z"]);
    }
}
