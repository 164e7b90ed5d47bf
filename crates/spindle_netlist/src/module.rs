//! The mutable module definition under construction.

use crate::hwtype::HwType;
use crate::instance::{Instance, InstanceId};
use crate::values::Values;
use crate::wire::Wire;
use serde::{Deserialize, Serialize};
use spindle_common::UniqueNames;

/// A point-to-point connection between two terminals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// One endpoint.
    pub a: Wire,
    /// The other endpoint.
    pub b: Wire,
}

impl Connection {
    /// Returns `true` if either endpoint equals `w`.
    pub fn touches(&self, w: &Wire) -> bool {
        self.a == *w || self.b == *w
    }

    /// Returns the endpoint opposite `w`, if `w` is an endpoint.
    pub fn peer_of(&self, w: &Wire) -> Option<&Wire> {
        if self.a == *w {
            Some(&self.b)
        } else if self.b == *w {
            Some(&self.a)
        } else {
            None
        }
    }
}

/// One module's netlist: an interface type, an instance table, and a
/// connection list.
///
/// Instance IDs are stable; removal tombstones the slot and drops every
/// connection touching the instance. Instance names are uniquified on
/// insertion so repeated lowering of similar operators never collides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDef {
    /// The module name.
    pub name: String,
    /// The interface record type.
    pub ty: HwType,
    instances: Vec<Option<Instance>>,
    connections: Vec<Connection>,
    #[serde(skip)]
    names: UniqueNames,
}

impl ModuleDef {
    /// Creates an empty module with the given interface type.
    pub fn new(name: &str, ty: HwType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            instances: Vec::new(),
            connections: Vec::new(),
            names: UniqueNames::new(),
        }
    }

    /// Adds an instance, uniquifying its name, and returns its ID.
    pub fn add_instance(
        &mut self,
        name: &str,
        generator: &str,
        gen_args: Values,
        mod_args: Values,
    ) -> InstanceId {
        let unique = self.names.make_unique(name);
        let id = InstanceId::from_raw(self.instances.len() as u32);
        self.instances.push(Some(Instance::new(
            unique,
            generator.to_string(),
            gen_args,
            mod_args,
        )));
        id
    }

    /// Returns the instance with the given ID, or `None` if removed.
    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(id.as_raw() as usize)?.as_ref()
    }

    /// Attaches a metadata annotation to an instance.
    pub fn set_metadata(&mut self, id: InstanceId, key: &str, value: &str) {
        if let Some(Some(inst)) = self.instances.get_mut(id.as_raw() as usize) {
            inst.metadata.insert(key.to_string(), value.to_string());
        }
    }

    /// Removes an instance and every connection touching it.
    pub fn remove_instance(&mut self, id: InstanceId) {
        if let Some(slot) = self.instances.get_mut(id.as_raw() as usize) {
            *slot = None;
        }
        self.connections
            .retain(|c| c.a.root_inst() != Some(id) && c.b.root_inst() != Some(id));
    }

    /// Connects two terminals.
    pub fn connect(&mut self, a: Wire, b: Wire) {
        self.connections.push(Connection { a, b });
    }

    /// Removes every connection with `endpoint` as an exact endpoint.
    ///
    /// Registers accept exactly one driver per terminal; re-binding goes
    /// through this first so the netlist never carries a multi-driver short.
    pub fn disconnect(&mut self, endpoint: &Wire) {
        self.connections.retain(|c| !c.touches(endpoint));
    }

    /// Returns all connections.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Returns the terminals connected to `endpoint`.
    pub fn connected_to(&self, endpoint: &Wire) -> Vec<&Wire> {
        self.connections
            .iter()
            .filter_map(|c| c.peer_of(endpoint))
            .collect()
    }

    /// Iterates over live instances.
    pub fn instances(&self) -> impl Iterator<Item = (InstanceId, &Instance)> {
        self.instances
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|inst| (InstanceId::from_raw(i as u32), inst)))
    }

    /// Returns the number of live instances.
    pub fn instance_count(&self) -> usize {
        self.instances.iter().filter(|s| s.is_some()).count()
    }

    /// Returns `true` if the module has at least one live instance.
    pub fn has_instances(&self) -> bool {
        self.instances.iter().any(|s| s.is_some())
    }

    /// Finds a live instance by name.
    pub fn instance_named(&self, name: &str) -> Option<InstanceId> {
        self.instances()
            .find(|(_, inst)| inst.name == name)
            .map(|(id, _)| id)
    }

    /// Counts live instances with the given generator handle.
    pub fn count_generator(&self, generator: &str) -> usize {
        self.instances()
            .filter(|(_, inst)| inst.generator == generator)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::Values;

    fn empty_module() -> ModuleDef {
        ModuleDef::new("DesignTop", HwType::Record(vec![]))
    }

    #[test]
    fn add_and_query_instances() {
        let mut def = empty_module();
        let a = def.add_instance("add", "coreir.add", Values::new(), Values::new());
        let b = def.add_instance("add", "coreir.add", Values::new(), Values::new());
        assert_eq!(def.instance_count(), 2);
        assert_eq!(def.instance(a).unwrap().name, "add");
        assert_eq!(def.instance(b).unwrap().name, "add_1");
        assert_eq!(def.count_generator("coreir.add"), 2);
    }

    #[test]
    fn connect_and_peers() {
        let mut def = empty_module();
        let a = def.add_instance("a", "coreir.add", Values::new(), Values::new());
        let out = Wire::inst(a).sel("out");
        let dest = Wire::self_port("out");
        def.connect(out.clone(), dest.clone());
        let peers = def.connected_to(&out);
        assert_eq!(peers, vec![&dest]);
    }

    #[test]
    fn disconnect_exact_endpoint_only() {
        let mut def = empty_module();
        let a = def.add_instance("a", "coreir.reg", Values::new(), Values::new());
        let d0 = Wire::inst(a).sel("in").sel_idx(0);
        let d1 = Wire::inst(a).sel("in").sel_idx(1);
        def.connect(Wire::self_port("x"), d0.clone());
        def.connect(Wire::self_port("y"), d1.clone());
        def.disconnect(&d0);
        assert_eq!(def.connections().len(), 1);
        assert!(def.connections()[0].touches(&d1));
    }

    #[test]
    fn remove_instance_drops_connections() {
        let mut def = empty_module();
        let a = def.add_instance("a", "mantle.wire", Values::new(), Values::new());
        def.connect(Wire::inst(a).sel("out"), Wire::self_port("out"));
        assert!(def.has_instances());
        def.remove_instance(a);
        assert_eq!(def.instance_count(), 0);
        assert!(def.connections().is_empty());
        assert!(def.instance(a).is_none());
    }

    #[test]
    fn instance_named_skips_removed() {
        let mut def = empty_module();
        let a = def.add_instance("probe", "coreir.add", Values::new(), Values::new());
        assert_eq!(def.instance_named("probe"), Some(a));
        def.remove_instance(a);
        assert_eq!(def.instance_named("probe"), None);
    }

    #[test]
    fn metadata_annotations() {
        let mut def = empty_module();
        let a = def.add_instance("tap_k", "coreir.const", Values::new(), Values::new());
        def.set_metadata(a, "tap", "configuration constant");
        assert_eq!(
            def.instance(a).unwrap().metadata.get("tap").map(String::as_str),
            Some("configuration constant")
        );
    }
}
