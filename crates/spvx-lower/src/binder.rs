//! The declaration & resource binder and its per-entry-point driver.
//!
//! [`Binder`] turns declarations into IR variables. Its operations are
//! spread over several modules by concern:
//!
//! - `stage`: stage input/output variables and location assignment,
//! - `resource`: buffer blocks, resource globals, and binding assignment,
//! - `alias`: private and function variables that may alias buffers, and
//!   their counter metadata.

use std::collections::HashMap;

use spvx_ast::{
    DeclId, Direction, EntryPointDecl, ParamDecl, ResourceKind, ShaderStage, SigPoint, SourceLocation,
    SourceType,
};
use spvx_ir::{BuiltIn, Handle, Module, StorageClass, Variable};

use crate::clip_cull::ClipCullPacker;
use crate::counter::CounterVarFields;
use crate::resource::ResourceVar;
use crate::stage::StageVar;
use crate::translate::TypeTranslator;
use crate::{Diagnostics, LowerError, LowerOptions};

/// Everything lowering produced for one compile.
#[derive(Debug)]
pub struct Lowered {
    pub module: Module,
    pub diagnostics: Diagnostics,
    /// Some declaration aliases a buffer; the legalization pass must run.
    pub needs_legalization: bool,
}

/// Maps declarations of one compile to IR variables.
pub struct Binder {
    pub(crate) types: TypeTranslator,
    pub(crate) stage: ShaderStage,
    /// The hull shader's control point count.
    pub(crate) output_control_points: Option<u32>,

    pub(crate) stage_vars: Vec<StageVar>,
    /// Builtin variables with the signature point that created them.
    pub(crate) builtin_vars: HashMap<(BuiltIn, StorageClass), (Handle<Variable>, SigPoint)>,
    pub(crate) clip_cull: ClipCullPacker,

    pub(crate) resource_vars: Vec<ResourceVar>,
    pub(crate) ct_buffers: HashMap<DeclId, Handle<Variable>>,
    pub(crate) push_constant: Option<(Handle<Variable>, SourceLocation)>,

    pub(crate) decl_vars: HashMap<DeclId, Handle<Variable>>,
    pub(crate) counters: HashMap<DeclId, CounterVarFields>,
    pub(crate) needs_legalization: bool,
}

impl Binder {
    pub fn new(stage: ShaderStage, options: LowerOptions) -> Self {
        log::debug!("binder for {stage} shader, {options}");
        Self {
            types: TypeTranslator::new(options),
            stage,
            output_control_points: None,
            stage_vars: Vec::new(),
            builtin_vars: HashMap::new(),
            clip_cull: ClipCullPacker::new(),
            resource_vars: Vec::new(),
            ct_buffers: HashMap::new(),
            push_constant: None,
            decl_vars: HashMap::new(),
            counters: HashMap::new(),
            needs_legalization: false,
        }
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn translator(&mut self) -> &mut TypeTranslator {
        &mut self.types
    }

    pub fn module(&self) -> &Module {
        self.types.module()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        self.types.diagnostics()
    }

    pub fn stage_vars(&self) -> &[StageVar] {
        &self.stage_vars
    }

    pub fn resource_vars(&self) -> &[ResourceVar] {
        &self.resource_vars
    }

    pub fn clip_cull(&self) -> &ClipCullPacker {
        &self.clip_cull
    }

    /// The variable created for a declaration, if any.
    pub fn var_for(&self, decl: DeclId) -> Option<Handle<Variable>> {
        self.decl_vars.get(&decl).copied()
    }

    pub fn needs_legalization(&self) -> bool {
        self.needs_legalization
    }

    pub fn finish(self) -> Lowered {
        let needs_legalization = self.needs_legalization;
        let (module, diagnostics) = self.types.into_parts();
        Lowered {
            module,
            diagnostics,
            needs_legalization,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point driver
// ---------------------------------------------------------------------------

impl Binder {
    /// Creates the whole stage interface of an entry point: packed
    /// clip/cull builtins first, then one variable per flattened leaf, then
    /// locations. Returns false if any error was reported.
    pub fn lower_entry_point(&mut self, entry: &EntryPointDecl) -> Result<bool, LowerError> {
        self.stage = entry.stage;
        self.output_control_points = entry.output_control_points;
        let function = &entry.function;
        log::debug!("lowering {} entry point '{}'", entry.stage, function.name);

        let (in_array, out_array) = match entry.stage {
            stage if !stage.is_multi_vertex() => (None, None),
            ShaderStage::Hull => (
                function.params.iter().find_map(|p| patch_count(&p.ty, true)),
                entry.output_control_points,
            ),
            ShaderStage::Domain => (function.params.iter().find_map(|p| patch_count(&p.ty, false)), None),
            ShaderStage::Geometry => (function.params.iter().find_map(geometry_vertex_count), None),
            _ => (None, None),
        };

        let mut ok = true;
        let ret = function.return_decl();
        for param in function.params.iter().chain(std::iter::once(&ret)) {
            ok &= self.record_clip_cull(param, false);
        }
        if let Some(pc) = &entry.patch_constant {
            let pc_ret = pc.return_decl();
            for param in pc.params.iter().chain(std::iter::once(&pc_ret)) {
                ok &= self.record_clip_cull(param, true);
            }
        }
        self.clip_cull.calculate();
        self.clip_cull
            .generate_vars(&mut self.types.module, in_array, out_array);

        for param in &function.params {
            if param.is_input() {
                ok &= self.create_stage_input_var(param, false)?;
            }
            if param.is_output() {
                ok &= self.create_stage_output_var(param, false)?;
            }
        }
        if !ret.ty.is_void() {
            ok &= self.create_stage_output_var(&ret, false)?;
        }

        if let Some(pc) = &entry.patch_constant {
            for param in &pc.params {
                if param.is_input() {
                    ok &= self.create_stage_input_var(param, true)?;
                }
            }
            let pc_ret = pc.return_decl();
            if !pc_ret.ty.is_void() {
                ok &= self.create_stage_output_var(&pc_ret, true)?;
            }
        }

        ok &= self.decorate_stage_io_locations()?;
        Ok(ok)
    }

    /// Records the clip/cull leaves of one interface declaration.
    fn record_clip_cull(&mut self, param: &ParamDecl, for_patch_constant: bool) -> bool {
        let (ty, _) = self.per_vertex_element(param, for_patch_constant);
        let Some(ty) = ty else {
            return true;
        };
        let semantic = param.attrs.semantic.as_deref();
        let mut ok = true;
        if param.is_input() && !matches!(param.ty.as_resource(), Some((ResourceKind::Stream { .. }, _))) {
            ok &= self.clip_cull.record_decl(ty, semantic, Direction::Input, param.loc, &mut self.types.diags);
        }
        if param.is_output() {
            ok &= self.clip_cull.record_decl(ty, semantic, Direction::Output, param.loc, &mut self.types.diags);
        }
        ok
    }

    /// Splits a parameter's type into the per-vertex element and the outer
    /// vertex count. `None` means the parameter contributes nothing to this
    /// stage's interface.
    pub(crate) fn per_vertex_element<'p>(
        &self,
        param: &'p ParamDecl,
        for_patch_constant: bool,
    ) -> (Option<&'p SourceType>, Option<u32>) {
        match (self.stage, param.ty.as_resource()) {
            // The patch-constant function shares the hull shader's control
            // point inputs and reads its outputs.
            (_, Some((ResourceKind::InputPatch { .. } | ResourceKind::OutputPatch { .. }, _)))
                if for_patch_constant =>
            {
                (None, None)
            }
            (ShaderStage::Hull, Some((ResourceKind::InputPatch { count }, elem)))
            | (ShaderStage::Domain, Some((ResourceKind::OutputPatch { count }, elem))) => (elem, Some(count)),
            (_, Some((ResourceKind::Stream { .. }, elem))) => (elem, None),
            (ShaderStage::Geometry, _) if param.primitive.is_some() => match param.ty.desugar().0 {
                SourceType::Array { elem, len } => (Some(elem), *len),
                _ => (Some(&param.ty), None),
            },
            _ => (Some(&param.ty), None),
        }
    }
}

fn patch_count(ty: &SourceType, input: bool) -> Option<u32> {
    match ty.as_resource()? {
        (ResourceKind::InputPatch { count }, _) if input => Some(count),
        (ResourceKind::OutputPatch { count }, _) if !input => Some(count),
        _ => None,
    }
}

fn geometry_vertex_count(param: &ParamDecl) -> Option<u32> {
    let primitive = param.primitive?;
    match param.ty.desugar().0 {
        SourceType::Array { len: Some(n), .. } => Some(*n),
        _ => Some(primitive.vertex_count()),
    }
}
