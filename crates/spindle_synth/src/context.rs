//! The per-kernel synthesis context.
//!
//! One [`SynthesisContext`] exists per accelerated kernel and owns every
//! table the lowering visitors mutate: the wire/value resolution table, the
//! storage-cell arena, the deferred-definition recipes, the dispatch and
//! linebuffer maps, the scoped stencil/allocation metadata, and the HLS text
//! writers. Nothing lives in file-scope or singleton state, so contexts can
//! never leak across kernels.

use crate::error::SynthError;
use serde::{Deserialize, Serialize};
use spindle_common::{ScopedMap, UniqueNames};
use spindle_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use spindle_hls::{CodeWriter, ExprNamer};
use spindle_ir::{Expr, ScalarType, StencilType};
use spindle_netlist::values::values;
use spindle_netlist::{
    GeneratorRegistry, HwType, InstanceId, ModuleDef, ParamValue, Values, Wire,
};
use std::collections::{HashMap, HashSet};

/// Target configuration handed in by the (out-of-scope) driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetOptions {
    /// Whether the generated module exposes a `valid`/`reset` handshake pair.
    pub has_valid: bool,
    /// The global operand bit width. Everything wider than one bit is
    /// instantiated at this width.
    pub bitwidth: u32,
}

impl Default for TargetOptions {
    fn default() -> Self {
        Self {
            has_valid: false,
            bitwidth: 16,
        }
    }
}

impl TargetOptions {
    /// Maps a declared bit width onto an instance width: one bit stays one
    /// bit, everything else uses the global width.
    pub fn instance_width(&self, bits: u8) -> u32 {
        if bits == 1 {
            1
        } else {
            self.bitwidth
        }
    }
}

/// Handle into the storage-cell arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId(u32);

/// A storage cell: the passthrough (and, once promoted, register array)
/// standing behind one or more names.
#[derive(Debug, Clone)]
pub struct StorageCell {
    /// The hardware type of the cell.
    pub ty: HwType,
    /// The passthrough wire instance.
    pub wire: InstanceId,
    /// The register array, once the cell has been promoted. Never demoted.
    pub reg: Option<InstanceId>,
    /// Whether any name has read the cell's current output.
    pub was_read: bool,
    /// Whether any name has driven the cell's input.
    pub was_written: bool,
}

impl StorageCell {
    /// Returns `true` once the cell has been promoted to a register array.
    pub fn is_reg(&self) -> bool {
        self.reg.is_some()
    }
}

/// Refcounted arena of storage cells. Names map to handles many-to-one;
/// a cell's slot is reclaimed when the last name releases it.
#[derive(Debug, Default)]
pub(crate) struct StorageArena {
    cells: Vec<Option<(StorageCell, u32)>>,
}

impl StorageArena {
    pub fn alloc(&mut self, cell: StorageCell) -> StoreId {
        let id = StoreId(self.cells.len() as u32);
        self.cells.push(Some((cell, 1)));
        id
    }

    pub fn get(&self, id: StoreId) -> &StorageCell {
        &self.cells[id.0 as usize]
            .as_ref()
            .expect("storage cell used after release")
            .0
    }

    pub fn get_mut(&mut self, id: StoreId) -> &mut StorageCell {
        &mut self.cells[id.0 as usize]
            .as_mut()
            .expect("storage cell used after release")
            .0
    }

    pub fn retain(&mut self, id: StoreId) {
        if let Some((_, refs)) = self.cells[id.0 as usize].as_mut() {
            *refs += 1;
        }
    }

    /// Drops one reference; frees the slot when the count hits zero.
    pub fn release(&mut self, id: StoreId) {
        let slot = &mut self.cells[id.0 as usize];
        if let Some((_, refs)) = slot.as_mut() {
            *refs -= 1;
            if *refs == 0 {
                *slot = None;
            }
        }
    }
}

/// A recipe for a hardware instance that has not been built yet.
///
/// Materialization happens on first resolved use; aliasing copies the recipe
/// under the new name with `ref_name` recording the chain parent.
#[derive(Debug, Clone)]
pub struct DeferredDef {
    /// The instance base name to use when materializing.
    pub name: String,
    /// The name this recipe was copied from (diagnostics only).
    pub ref_name: String,
    /// The logical generator name (`const`, `rom2`, `counter`, …).
    pub gen_name: String,
    /// Generator parameters.
    pub gen_args: Values,
    /// Module parameters.
    pub mod_args: Values,
    /// The output terminal to bind after materialization.
    pub sel_name: String,
}

/// The ambient predicate while lowering an `if` body.
#[derive(Debug, Clone)]
pub struct Predicate {
    /// The recorded condition expression.
    pub condition: Expr,
}

/// All mutable state for lowering one accelerated kernel.
pub struct SynthesisContext<'a> {
    /// Target configuration.
    pub options: TargetOptions,
    /// The primitive operator registry for this target context.
    pub gens: GeneratorRegistry,
    /// The hardware graph being built.
    pub def: ModuleDef,
    /// Diagnostics output.
    pub sink: &'a DiagnosticSink,

    // wire/value resolution table
    pub(crate) wires: HashMap<String, Wire>,
    pub(crate) inputs: HashMap<String, Wire>,
    pub(crate) outputs: HashSet<String>,
    pub(crate) store_names: HashMap<String, StoreId>,
    pub(crate) stores: StorageArena,
    pub(crate) deferred: HashMap<String, Option<DeferredDef>>,

    // dispatch/linebuffer graph
    pub(crate) hw_dispatch: HashMap<String, Vec<String>>,
    pub(crate) lb_map: HashMap<String, Wire>,
    pub(crate) lb_kernel_map: HashMap<String, Wire>,

    /// The active `if` predicate, if any.
    pub(crate) predicate: Option<Predicate>,

    /// Scoped stencil metadata, keyed by IR-level name.
    pub stencils: ScopedMap<StencilType>,
    /// Scoped allocation element types, keyed by IR-level name.
    pub allocations: ScopedMap<ScalarType>,

    /// The generated implementation text.
    pub src: CodeWriter,
    /// The generated header text.
    pub hdr: CodeWriter,
    pub(crate) namer: ExprNamer,
    pub(crate) names: UniqueNames,
}

impl<'a> SynthesisContext<'a> {
    /// Creates an empty context around a module definition.
    pub fn new(
        module: ModuleDef,
        options: TargetOptions,
        sink: &'a DiagnosticSink,
    ) -> Self {
        Self {
            options,
            gens: GeneratorRegistry::with_defaults(),
            def: module,
            sink,
            wires: HashMap::new(),
            inputs: HashMap::new(),
            outputs: HashSet::new(),
            store_names: HashMap::new(),
            stores: StorageArena::default(),
            deferred: HashMap::new(),
            hw_dispatch: HashMap::new(),
            lb_map: HashMap::new(),
            lb_kernel_map: HashMap::new(),
            predicate: None,
            stencils: ScopedMap::new(),
            allocations: ScopedMap::new(),
            src: CodeWriter::new(),
            hdr: CodeWriter::new(),
            namer: ExprNamer::new(),
            names: UniqueNames::new(),
        }
    }

    /// Returns `true` if `name` resolves to a materialized wire.
    pub fn is_wire(&self, name: &str) -> bool {
        self.wires.contains_key(name)
    }

    /// Returns `true` if `name` is a module input.
    pub fn is_input(&self, name: &str) -> bool {
        self.inputs.contains_key(name)
    }

    /// Returns `true` if `name` is backed by a storage cell.
    pub fn is_storage(&self, name: &str) -> bool {
        self.store_names.contains_key(name)
    }

    /// Returns `true` if `name` carries a deferred hardware definition
    /// (including the pending marker a parent loop plants).
    pub fn is_defined(&self, name: &str) -> bool {
        self.deferred.contains_key(name)
    }

    /// Returns `true` if `name` is a declared module output.
    pub fn is_output(&self, name: &str) -> bool {
        self.outputs.contains(name)
    }

    /// Returns the deferred recipe for `name`, if it is a real recipe.
    pub(crate) fn recipe(&self, name: &str) -> Option<&DeferredDef> {
        self.deferred.get(name).and_then(|d| d.as_ref())
    }

    /// Prints (or reuses) a temporary for `rhs` in the implementation text.
    pub(crate) fn print_assignment(&mut self, ty: ScalarType, rhs: &str) -> String {
        self.namer.print_assignment(ty, rhs, &mut self.src)
    }

    /// Emits a recoverable-resolution warning into the sink and mirrors it as
    /// a comment in the generated source.
    pub(crate) fn warn(&mut self, category: Category, number: u16, message: &str) {
        self.sink
            .emit(Diagnostic::warning(DiagnosticCode::new(category, number), message));
        self.src.comment(message);
    }

    /// Instantiates a constant cell for `value` at the given width.
    ///
    /// One-bit constants use the boolean-constant module; wider ones the
    /// sized constant generator. Never cached — every call builds a fresh
    /// instance with a uniquified, value-embedding name.
    pub(crate) fn add_const_instance(
        &mut self,
        name: &str,
        value: i64,
        bits: u8,
    ) -> Result<Wire, SynthError> {
        let id = if bits == 1 {
            let gen = self.gens.get("bitconst")?.to_string();
            self.def.add_instance(
                name,
                &gen,
                Values::new(),
                values([("value", ParamValue::Bool(value != 0))]),
            )
        } else {
            let width = self.options.instance_width(bits);
            let gen = self.gens.get("const")?.to_string();
            self.def.add_instance(
                name,
                &gen,
                values([("width", ParamValue::Int(width as i64))]),
                values([("value", ParamValue::BitVector { width, value })]),
            )
        };
        Ok(Wire::inst(id).sel("out"))
    }

    /// Instantiates a one-bit constant and connects it to `dest`.
    ///
    /// Used for tied-off resets, free-running enables, and always-on read
    /// enables.
    pub(crate) fn tie_off(
        &mut self,
        name: &str,
        value: bool,
        dest: Wire,
    ) -> Result<(), SynthError> {
        let out = self.add_const_instance(name, value as i64, 1)?;
        self.def.connect(out, dest);
        Ok(())
    }

    /// Builds a fresh passthrough relay of the given type.
    pub(crate) fn add_passthrough(
        &mut self,
        name: &str,
        ty: HwType,
    ) -> Result<InstanceId, SynthError> {
        let gen = self.gens.get("passthrough")?.to_string();
        Ok(self.def.add_instance(
            name,
            &gen,
            values([("type", ParamValue::Ty(ty))]),
            Values::new(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_width_policy() {
        let opts = TargetOptions::default();
        assert_eq!(opts.instance_width(1), 1);
        assert_eq!(opts.instance_width(8), 16);
        assert_eq!(opts.instance_width(16), 16);
        assert_eq!(opts.instance_width(32), 16);
    }

    #[test]
    fn storage_arena_refcounting() {
        let mut arena = StorageArena::default();
        let id = arena.alloc(StorageCell {
            ty: HwType::Bit,
            wire: InstanceId::from_raw(0),
            reg: None,
            was_read: false,
            was_written: false,
        });
        arena.retain(id);
        arena.release(id);
        // still alive after one release of two references
        assert!(!arena.get(id).was_read);
        arena.release(id);
    }

    #[test]
    #[should_panic(expected = "used after release")]
    fn storage_arena_release_frees_slot() {
        let mut arena = StorageArena::default();
        let id = arena.alloc(StorageCell {
            ty: HwType::Bit,
            wire: InstanceId::from_raw(0),
            reg: None,
            was_read: false,
            was_written: false,
        });
        arena.release(id);
        arena.get(id);
    }

    #[test]
    fn context_classification_starts_empty() {
        let sink = DiagnosticSink::new();
        let ctx = SynthesisContext::new(
            ModuleDef::new("DesignTop", HwType::Record(vec![])),
            TargetOptions::default(),
            &sink,
        );
        assert!(!ctx.is_wire("x"));
        assert!(!ctx.is_input("x"));
        assert!(!ctx.is_storage("x"));
        assert!(!ctx.is_defined("x"));
        assert!(!ctx.is_output("x"));
    }

    #[test]
    fn const_instances_are_never_deduplicated() {
        let sink = DiagnosticSink::new();
        let mut ctx = SynthesisContext::new(
            ModuleDef::new("DesignTop", HwType::Record(vec![])),
            TargetOptions::default(),
            &sink,
        );
        let a = ctx.add_const_instance("const5_x", 5, 16).unwrap();
        let b = ctx.add_const_instance("const5_x", 5, 16).unwrap();
        assert_ne!(a, b);
        assert_eq!(ctx.def.instance_count(), 2);
    }
}
