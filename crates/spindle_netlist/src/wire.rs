//! Selectable wire paths.
//!
//! A [`Wire`] names one terminal in the design: a path of field and index
//! selections rooted either at the module's own interface (`self`) or at a
//! generator instance. Connections join two such paths.

use crate::instance::InstanceId;
use serde::{Deserialize, Serialize};

/// The root a wire path hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireRoot {
    /// The module's own interface record.
    SelfPort,
    /// A generator instance.
    Inst(InstanceId),
}

/// One selection step along a wire path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sel {
    /// Select a named field (`out`, `in`, `valid`, `waddr`, …).
    Field(String),
    /// Select an array element.
    Index(u32),
}

/// A terminal path in the design.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wire {
    /// The path root.
    pub root: WireRoot,
    /// The selection steps, outermost first.
    pub path: Vec<Sel>,
}

impl Wire {
    /// The bare `self` interface.
    pub fn self_root() -> Self {
        Self {
            root: WireRoot::SelfPort,
            path: Vec::new(),
        }
    }

    /// A top-level field of the module interface, e.g. `self.reset`.
    pub fn self_port(field: &str) -> Self {
        Self::self_root().sel(field)
    }

    /// The bare terminal of an instance.
    pub fn inst(id: InstanceId) -> Self {
        Self {
            root: WireRoot::Inst(id),
            path: Vec::new(),
        }
    }

    /// Selects a named field.
    pub fn sel(mut self, field: &str) -> Self {
        self.path.push(Sel::Field(field.to_string()));
        self
    }

    /// Selects an array element.
    pub fn sel_idx(mut self, idx: u32) -> Self {
        self.path.push(Sel::Index(idx));
        self
    }

    /// Applies a multi-dimensional index list, innermost-first.
    ///
    /// The last index in the list is applied first, matching how stencil
    /// access tuples arrive from the IR.
    pub fn index(mut self, indices: &[u32]) -> Self {
        for &idx in indices.iter().rev() {
            self.path.push(Sel::Index(idx));
        }
        self
    }

    /// Drops the last selection step, yielding the parent terminal.
    pub fn parent(mut self) -> Self {
        self.path.pop();
        self
    }

    /// Returns the instance this wire is rooted at, if any.
    pub fn root_inst(&self) -> Option<InstanceId> {
        match self.root {
            WireRoot::Inst(id) => Some(id),
            WireRoot::SelfPort => None,
        }
    }

    /// Returns `true` if `prefix` is a prefix of this path (same root).
    pub fn starts_with(&self, prefix: &Wire) -> bool {
        self.root == prefix.root
            && self.path.len() >= prefix.path.len()
            && self.path[..prefix.path.len()] == prefix.path[..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_paths() {
        let w = Wire::self_port("in").sel("arg_0").sel_idx(3);
        assert_eq!(w.root, WireRoot::SelfPort);
        assert_eq!(
            w.path,
            vec![
                Sel::Field("in".to_string()),
                Sel::Field("arg_0".to_string()),
                Sel::Index(3)
            ]
        );
    }

    #[test]
    fn index_applies_innermost_first() {
        let w = Wire::inst(InstanceId::from_raw(0)).sel("out").index(&[2, 3]);
        // index list (2, 3) selects 3 first, then 2
        assert_eq!(
            w.path,
            vec![
                Sel::Field("out".to_string()),
                Sel::Index(3),
                Sel::Index(2)
            ]
        );
    }

    #[test]
    fn parent_drops_last_step() {
        let id = InstanceId::from_raw(5);
        let out = Wire::inst(id).sel("out");
        let base = out.clone().parent();
        assert_eq!(base, Wire::inst(id));
        assert_eq!(base.clone().sel("overflow").path.len(), 1);
        assert_eq!(out.root_inst(), Some(id));
    }

    #[test]
    fn starts_with_requires_same_root() {
        let a = Wire::inst(InstanceId::from_raw(1)).sel("in").sel_idx(0);
        let prefix = Wire::inst(InstanceId::from_raw(1)).sel("in");
        let other = Wire::inst(InstanceId::from_raw(2)).sel("in");
        assert!(a.starts_with(&prefix));
        assert!(!a.starts_with(&other));
        assert!(!prefix.starts_with(&a));
    }
}
