//! Artifact serialization: JSON graph format and DOT visualization.
//!
//! The JSON layout follows the namespaced graph format consumed downstream:
//! a `global` namespace holding the design module with its interface type,
//! instance table (generator references plus parameter values), and
//! connection list. The DOT rendering collapses wire paths onto instance
//! nodes for quick visual inspection.

use crate::error::NetlistError;
use crate::hwtype::HwType;
use crate::module::ModuleDef;
use crate::values::{ParamValue, Values};
use crate::wire::{Sel, Wire, WireRoot};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{Graph, NodeIndex};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::Path;

/// Renders a wire path as a dotted string, e.g. `self.in.arg_0.1`.
pub fn wire_string(def: &ModuleDef, wire: &Wire) -> String {
    let mut out = match wire.root {
        WireRoot::SelfPort => "self".to_string(),
        WireRoot::Inst(id) => def
            .instance(id)
            .map(|inst| inst.name.clone())
            .unwrap_or_else(|| format!("<removed:{}>", id.as_raw())),
    };
    for sel in &wire.path {
        match sel {
            Sel::Field(f) => {
                out.push('.');
                out.push_str(f);
            }
            Sel::Index(i) => {
                out.push('.');
                out.push_str(&i.to_string());
            }
        }
    }
    out
}

fn type_json(ty: &HwType) -> Value {
    match ty {
        HwType::Bit => json!("Bit"),
        HwType::BitIn => json!("BitIn"),
        HwType::Array { len, elem } => json!(["Array", len, type_json(elem)]),
        HwType::Record(fields) => {
            let entries: Vec<Value> = fields
                .iter()
                .map(|(name, t)| json!([name, type_json(t)]))
                .collect();
            json!(["Record", entries])
        }
    }
}

fn param_json(value: &ParamValue) -> Value {
    match value {
        ParamValue::Int(v) => json!(v),
        ParamValue::Bool(v) => json!(v),
        ParamValue::BitVector { width, value } => json!({ "width": width, "value": value }),
        ParamValue::Ty(ty) => type_json(ty),
        ParamValue::Json(v) => v.clone(),
    }
}

fn values_json(values: &Values) -> Value {
    let mut map = Map::new();
    for (name, value) in values {
        map.insert(name.clone(), param_json(value));
    }
    Value::Object(map)
}

/// Builds the full JSON document for a design.
pub fn design_json(def: &ModuleDef) -> Value {
    let mut instances = Map::new();
    for (_, inst) in def.instances() {
        let mut entry = Map::new();
        entry.insert("genref".to_string(), json!(inst.generator));
        if !inst.gen_args.is_empty() {
            entry.insert("genargs".to_string(), values_json(&inst.gen_args));
        }
        if !inst.mod_args.is_empty() {
            entry.insert("modargs".to_string(), values_json(&inst.mod_args));
        }
        if !inst.metadata.is_empty() {
            entry.insert("metadata".to_string(), json!(inst.metadata));
        }
        instances.insert(inst.name.clone(), Value::Object(entry));
    }

    let connections: Vec<Value> = def
        .connections()
        .iter()
        .map(|c| json!([wire_string(def, &c.a), wire_string(def, &c.b)]))
        .collect();

    let mut module = Map::new();
    module.insert("type".to_string(), type_json(&def.ty));
    module.insert("instances".to_string(), Value::Object(instances));
    module.insert("connections".to_string(), Value::Array(connections));
    let mut modules = Map::new();
    modules.insert(def.name.clone(), Value::Object(module));

    json!({
        "top": format!("global.{}", def.name),
        "namespaces": {
            "global": {
                "modules": modules
            }
        }
    })
}

/// Writes the design JSON to a file.
pub fn save_json(def: &ModuleDef, path: &Path) -> Result<(), NetlistError> {
    let doc = design_json(def);
    std::fs::write(path, serde_json::to_string_pretty(&doc)?)?;
    Ok(())
}

/// Renders the design as a DOT graph: one node per instance plus the module
/// interface, one edge per connection.
pub fn to_dot(def: &ModuleDef) -> String {
    let mut graph: Graph<String, String> = Graph::new();
    let self_node = graph.add_node(format!("self\n{}", def.name));
    let mut nodes: HashMap<u32, NodeIndex> = HashMap::new();
    for (id, inst) in def.instances() {
        let node = graph.add_node(format!("{}\n{}", inst.name, inst.generator));
        nodes.insert(id.as_raw(), node);
    }

    let node_of = |wire: &Wire, nodes: &HashMap<u32, NodeIndex>| match wire.root {
        WireRoot::SelfPort => Some(self_node),
        WireRoot::Inst(id) => nodes.get(&id.as_raw()).copied(),
    };

    for conn in def.connections() {
        if let (Some(a), Some(b)) = (node_of(&conn.a, &nodes), node_of(&conn.b, &nodes)) {
            let label = format!(
                "{} -- {}",
                wire_string(def, &conn.a),
                wire_string(def, &conn.b)
            );
            graph.add_edge(a, b, label);
        }
    }

    let body = format!("{:?}", Dot::with_config(&graph, &[Config::GraphContentOnly]));
    format!("digraph {} {{\n{}}}\n", def.name, body)
}

/// Writes the DOT rendering to a file.
pub fn save_dot(def: &ModuleDef, path: &Path) -> Result<(), NetlistError> {
    std::fs::write(path, to_dot(def))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::{values, ParamValue};

    fn sample_design() -> ModuleDef {
        let ty = HwType::Record(vec![
            (
                "in".to_string(),
                HwType::Record(vec![("arg_0".to_string(), HwType::packed(true, 16, &[2]))]),
            ),
            ("out".to_string(), HwType::packed(false, 16, &[2])),
        ]);
        let mut def = ModuleDef::new("DesignTop", ty);
        let add = def.add_instance(
            "add_t0",
            "coreir.add",
            values([("width", ParamValue::Int(16))]),
            Values::new(),
        );
        def.connect(
            Wire::self_port("in").sel("arg_0").sel_idx(0),
            Wire::inst(add).sel("in0"),
        );
        def.connect(Wire::inst(add).sel("out"), Wire::self_port("out").sel_idx(0));
        def
    }

    #[test]
    fn wire_strings_are_dotted_paths() {
        let def = sample_design();
        let conn = &def.connections()[0];
        assert_eq!(wire_string(&def, &conn.a), "self.in.arg_0.0");
        assert_eq!(wire_string(&def, &conn.b), "add_t0.in0");
    }

    #[test]
    fn json_document_shape() {
        let def = sample_design();
        let doc = design_json(&def);
        assert_eq!(doc["top"], "global.DesignTop");
        let module = &doc["namespaces"]["global"]["modules"]["DesignTop"];
        assert_eq!(module["instances"]["add_t0"]["genref"], "coreir.add");
        assert_eq!(module["instances"]["add_t0"]["genargs"]["width"], 16);
        assert_eq!(module["connections"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn type_json_nesting() {
        let ty = HwType::packed(false, 16, &[3]);
        let v = type_json(&ty);
        assert_eq!(v[0], "Array");
        assert_eq!(v[1], 3);
        assert_eq!(v[2][0], "Array");
        assert_eq!(v[2][1], 16);
        assert_eq!(v[2][2], "Bit");
    }

    #[test]
    fn dot_contains_instances_and_edges() {
        let def = sample_design();
        let dot = to_dot(&def);
        assert!(dot.starts_with("digraph DesignTop {"));
        assert!(dot.contains("add_t0"));
        assert!(dot.contains("coreir.add"));
        assert!(dot.contains("self.in.arg_0.0"));
    }
}
