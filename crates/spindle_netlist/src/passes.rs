//! Graph rewrite passes run before the design is considered final.
//!
//! The emitted netlist goes through dead-wire removal: passthrough relay
//! instances are spliced out wherever every reader can be re-attached to the
//! matching driver at the same granularity. Generator expansion and
//! cross-module flattening belong to the downstream consumer of the JSON
//! artifact; the design leaves here flat and unexpanded.

use crate::generators::PASSTHROUGH;
use crate::instance::InstanceId;
use crate::module::ModuleDef;
use crate::wire::{Sel, Wire};

/// Statistics from one [`run_passes`] invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// The number of passthrough instances spliced out.
    pub wires_removed: usize,
}

/// Runs the rewrite pipeline to a fixpoint.
pub fn run_passes(def: &mut ModuleDef) -> PassStats {
    let mut stats = PassStats::default();
    loop {
        let removed = remove_wires(def);
        stats.wires_removed += removed;
        if removed == 0 {
            break;
        }
    }
    stats
}

/// Splices out passthrough (`mantle.wire`) instances.
///
/// A passthrough is removable when every connection on its `out` side has a
/// driver connection on its `in` side with the identical selection suffix.
/// Unmatched granularity (a whole-wire driver feeding element-wise readers)
/// leaves the instance in place.
pub fn remove_wires(def: &mut ModuleDef) -> usize {
    let wire_ids: Vec<InstanceId> = def
        .instances()
        .filter(|(_, inst)| inst.generator == PASSTHROUGH)
        .map(|(id, _)| id)
        .collect();

    let mut removed = 0;
    for id in wire_ids {
        let in_base = Wire::inst(id).sel("in");
        let out_base = Wire::inst(id).sel("out");

        let mut drivers: Vec<(Vec<Sel>, Wire)> = Vec::new();
        let mut readers: Vec<(Vec<Sel>, Wire)> = Vec::new();
        for conn in def.connections() {
            for (endpoint, peer) in [(&conn.a, &conn.b), (&conn.b, &conn.a)] {
                if endpoint.starts_with(&in_base) {
                    drivers.push((endpoint.path[1..].to_vec(), peer.clone()));
                } else if endpoint.starts_with(&out_base) {
                    readers.push((endpoint.path[1..].to_vec(), peer.clone()));
                }
            }
        }

        let mut spliced = Vec::with_capacity(readers.len());
        let mut all_matched = true;
        for (suffix, reader) in &readers {
            match drivers.iter().find(|(s, _)| s == suffix) {
                Some((_, driver)) => spliced.push((driver.clone(), reader.clone())),
                None => {
                    all_matched = false;
                    break;
                }
            }
        }

        if all_matched {
            def.remove_instance(id);
            for (a, b) in spliced {
                def.connect(a, b);
            }
            removed += 1;
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hwtype::HwType;
    use crate::values::Values;

    fn module_with_passthrough() -> (ModuleDef, InstanceId) {
        let mut def = ModuleDef::new("DesignTop", HwType::Record(vec![]));
        let pt = def.add_instance("pt", PASSTHROUGH, Values::new(), Values::new());
        (def, pt)
    }

    #[test]
    fn splices_simple_relay() {
        let (mut def, pt) = module_with_passthrough();
        let src = def.add_instance("src", "coreir.add", Values::new(), Values::new());
        let dst = def.add_instance("dst", "coreir.add", Values::new(), Values::new());
        def.connect(Wire::inst(src).sel("out"), Wire::inst(pt).sel("in"));
        def.connect(Wire::inst(pt).sel("out"), Wire::inst(dst).sel("in0"));

        let stats = run_passes(&mut def);
        assert_eq!(stats.wires_removed, 1);
        assert_eq!(def.instance_count(), 2);
        // the driver now feeds the reader directly
        let peers = def.connected_to(&Wire::inst(src).sel("out"));
        assert_eq!(peers, vec![&Wire::inst(dst).sel("in0")]);
    }

    #[test]
    fn keeps_relay_with_mismatched_granularity() {
        let (mut def, pt) = module_with_passthrough();
        let src = def.add_instance("src", "coreir.add", Values::new(), Values::new());
        let dst = def.add_instance("dst", "coreir.add", Values::new(), Values::new());
        // driver attaches to the whole input, reader selects one element
        def.connect(Wire::inst(src).sel("out"), Wire::inst(pt).sel("in"));
        def.connect(Wire::inst(pt).sel("out").sel_idx(2), Wire::inst(dst).sel("in0"));

        let stats = run_passes(&mut def);
        assert_eq!(stats.wires_removed, 0);
        assert_eq!(def.instance_count(), 3);
    }

    #[test]
    fn splices_element_wise_relay() {
        let (mut def, pt) = module_with_passthrough();
        let src = def.add_instance("src", "coreir.add", Values::new(), Values::new());
        let dst = def.add_instance("dst", "coreir.add", Values::new(), Values::new());
        def.connect(Wire::inst(src).sel("out"), Wire::inst(pt).sel("in").sel_idx(1));
        def.connect(Wire::inst(pt).sel("out").sel_idx(1), Wire::inst(dst).sel("in0"));

        assert_eq!(run_passes(&mut def).wires_removed, 1);
        let peers = def.connected_to(&Wire::inst(src).sel("out"));
        assert_eq!(peers, vec![&Wire::inst(dst).sel("in0")]);
    }

    #[test]
    fn removes_unread_relay() {
        let (mut def, pt) = module_with_passthrough();
        let src = def.add_instance("src", "coreir.add", Values::new(), Values::new());
        def.connect(Wire::inst(src).sel("out"), Wire::inst(pt).sel("in"));

        assert_eq!(run_passes(&mut def).wires_removed, 1);
        assert_eq!(def.instance_count(), 1);
        assert!(def.connections().is_empty());
    }

    #[test]
    fn chain_of_relays_reaches_fixpoint() {
        let mut def = ModuleDef::new("DesignTop", HwType::Record(vec![]));
        let pt1 = def.add_instance("pt1", PASSTHROUGH, Values::new(), Values::new());
        let pt2 = def.add_instance("pt2", PASSTHROUGH, Values::new(), Values::new());
        let src = def.add_instance("src", "coreir.add", Values::new(), Values::new());
        def.connect(Wire::inst(src).sel("out"), Wire::inst(pt1).sel("in"));
        def.connect(Wire::inst(pt1).sel("out"), Wire::inst(pt2).sel("in"));
        def.connect(Wire::inst(pt2).sel("out"), Wire::self_port("out"));

        let stats = run_passes(&mut def);
        assert_eq!(stats.wires_removed, 2);
        let peers = def.connected_to(&Wire::inst(src).sel("out"));
        assert_eq!(peers, vec![&Wire::self_port("out")]);
    }
}
