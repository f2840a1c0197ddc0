//! Stage input/output variables and their locations.

use std::collections::{BTreeSet, HashMap};

use spvx_ast::{
    DeclAttrs, Direction, ParamDecl, ScalarType, ShaderStage, SigPoint, SigRole, SourceLocation,
    SourceType,
};
use spvx_ir::{BuiltIn, Capability, Extension, Handle, StorageClass, Type, TypeInner, VarDecoration, Variable};

use crate::binder::Binder;
use crate::layout::LayoutRule;
use crate::semantic::{
    Placement, Resolved, Semantic, SemanticKind, VK_BUILTINS, resolve_semantic, resolve_vk_builtin,
};
use crate::{LowerError, StageIoOrder};

/// One created stage interface variable.
#[derive(Clone, Debug)]
pub struct StageVar {
    pub direction: Direction,
    /// `None` only for `vk::builtin` variables declared without a semantic.
    pub semantic: Option<Semantic>,
    pub builtin: Option<BuiltIn>,
    pub sig_point: SigPoint,
    pub class: StorageClass,
    /// `vk::location`, or the render target index of `SV_Target`.
    pub location: Option<u32>,
    /// `vk::index`.
    pub index: Option<u32>,
    /// Locations occupied, not counting a per-vertex outer array.
    pub location_count: u32,
    /// For hull shader outputs, the control point a write targets.
    pub invocation: Option<u32>,
    pub var: Handle<Variable>,
    pub loc: SourceLocation,
}

impl StageVar {
    pub fn is_builtin(&self) -> bool {
        self.builtin.is_some()
    }
}

/// A declaration being flattened into leaves.
#[derive(Clone, Copy)]
struct StageDecl<'a> {
    name: &'a str,
    ty: &'a SourceType,
    attrs: &'a DeclAttrs,
    loc: SourceLocation,
}

/// Settings shared by every leaf of one flattened declaration.
#[derive(Clone, Copy)]
struct Interface {
    direction: Direction,
    sig: SigPoint,
    array_size: Option<u32>,
    invocation: Option<u32>,
}

static NO_ATTRS: DeclAttrs = DeclAttrs {
    semantic: None,
    location: None,
    index: None,
    binding: None,
    counter_binding: None,
    register: None,
    builtin: None,
    offset: None,
    packoffset: None,
    interpolation: spvx_ast::Interpolation {
        nointerpolation: false,
        noperspective: false,
        centroid: false,
        sample: false,
    },
    push_constant: false,
};

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

impl Binder {
    /// Creates the input variables for one entry point parameter. Returns
    /// false if an error was reported.
    pub fn create_stage_input_var(
        &mut self,
        param: &ParamDecl,
        for_patch_constant: bool,
    ) -> Result<bool, LowerError> {
        if matches!(
            param.ty.as_resource(),
            Some((spvx_ast::ResourceKind::Stream { .. }, _))
        ) {
            return Ok(true);
        }
        let (ty, array_size) = self.per_vertex_element(param, for_patch_constant);
        let Some(ty) = ty else {
            return Ok(true);
        };
        let role = if for_patch_constant {
            SigRole::PatchConstant
        } else if array_size.is_some() {
            SigRole::PerVertex
        } else {
            SigRole::Plain
        };
        let interface = Interface {
            direction: Direction::Input,
            sig: SigPoint::classify(self.stage, Direction::Input, role),
            array_size,
            invocation: None,
        };
        self.create_stage_vars(param_decl(param, ty), interface)
    }

    /// Creates the output variables for a parameter or return value.
    /// Hull shader control point outputs go through
    /// [`create_hull_output_var`](Self::create_hull_output_var).
    pub fn create_stage_output_var(
        &mut self,
        decl: &ParamDecl,
        for_patch_constant: bool,
    ) -> Result<bool, LowerError> {
        if self.stage == ShaderStage::Hull && !for_patch_constant {
            let Some(points) = self.output_control_points else {
                self.types.diags.error(
                    "hull shader entry point requires an output control point count",
                    decl.loc,
                );
                return Ok(false);
            };
            return self.create_hull_output_var(decl, points, None);
        }
        let (ty, _) = self.per_vertex_element(decl, for_patch_constant);
        let Some(ty) = ty else {
            return Ok(true);
        };
        let role = if for_patch_constant {
            SigRole::PatchConstant
        } else {
            SigRole::Plain
        };
        let interface = Interface {
            direction: Direction::Output,
            sig: SigPoint::classify(self.stage, Direction::Output, role),
            array_size: None,
            invocation: None,
        };
        self.create_stage_vars(param_decl(decl, ty), interface)
    }

    /// Creates hull shader control point outputs, arrayed by `array_size`.
    /// `invocation` names the control point written by the current
    /// invocation, when known.
    pub fn create_hull_output_var(
        &mut self,
        decl: &ParamDecl,
        array_size: u32,
        invocation: Option<u32>,
    ) -> Result<bool, LowerError> {
        let interface = Interface {
            direction: Direction::Output,
            sig: SigPoint::HSCPOut,
            array_size: Some(array_size),
            invocation,
        };
        self.create_stage_vars(param_decl(decl, &decl.ty), interface)
    }

    fn create_stage_vars(&mut self, decl: StageDecl<'_>, interface: Interface) -> Result<bool, LowerError> {
        if decl.ty.is_void() {
            return Ok(true);
        }
        if interface.sig == SigPoint::Invalid {
            self.types.diags.error(
                format!("{} shader has no stage interface", self.stage),
                decl.loc,
            );
            return Ok(false);
        }
        self.flatten(decl, interface, &mut None)
    }

    /// Walks a declaration down to its leaves. A semantic on an aggregate is
    /// inherited by its leaves, each taking the next index.
    fn flatten(
        &mut self,
        decl: StageDecl<'_>,
        interface: Interface,
        inherited: &mut Option<Semantic>,
    ) -> Result<bool, LowerError> {
        let own = match decl.attrs.semantic.as_deref() {
            Some(string) => match Semantic::parse(string, decl.loc) {
                Some(semantic) => Some(semantic),
                None => {
                    self.types.diags.error(
                        format!("semantic index in '{string}' on '{}' is out of range", decl.name),
                        decl.loc,
                    );
                    return Ok(false);
                }
            },
            None => None,
        };
        if let (Some(outer), Some(own)) = (inherited.as_ref(), own.as_ref()) {
            self.types.diags.warning(
                format!(
                    "semantic '{own}' on '{}' is overridden by enclosing semantic '{outer}'",
                    decl.name
                ),
                decl.loc,
            );
        }

        if decl.attrs.builtin.is_none() {
            if let Some(st) = decl.ty.as_struct() {
                let mut started = None;
                let inherited = if inherited.is_some() {
                    inherited
                } else {
                    started = own;
                    &mut started
                };
                let mut ok = true;
                if let Some(base) = &st.base {
                    let base_decl = StageDecl {
                        name: decl.name,
                        ty: base,
                        attrs: &NO_ATTRS,
                        loc: decl.loc,
                    };
                    ok &= self.flatten(base_decl, interface, inherited)?;
                }
                for field in &st.fields {
                    let field_decl = StageDecl {
                        name: &field.name,
                        ty: &field.ty,
                        attrs: &field.attrs,
                        loc: field.loc,
                    };
                    ok &= self.flatten(field_decl, interface, inherited)?;
                }
                return Ok(ok);
            }
        }

        let semantic = match inherited.as_mut() {
            Some(current) => {
                let semantic = current.clone();
                let Some(next) = current.index.checked_add(1) else {
                    self.types.diags.error(
                        format!("semantic index after '{semantic}' on '{}' is out of range", decl.name),
                        decl.loc,
                    );
                    return Ok(false);
                };
                *current = current.with_index(next);
                Some(semantic)
            }
            None => own,
        };
        self.create_leaf(decl, semantic, interface)
    }

    fn create_leaf(
        &mut self,
        decl: StageDecl<'_>,
        semantic: Option<Semantic>,
        interface: Interface,
    ) -> Result<bool, LowerError> {
        let sig = interface.sig;
        let io = match interface.direction {
            Direction::Input => "input",
            Direction::Output => "output",
        };

        let resolved = if let Some(name) = &decl.attrs.builtin {
            if !VK_BUILTINS.contains(&name.as_str()) {
                self.types
                    .diags
                    .error(format!("unknown vk::builtin '{name}'"), decl.loc);
                return Ok(false);
            }
            match resolve_vk_builtin(name, sig) {
                Some(resolved) => resolved,
                None => {
                    self.types.diags.error(
                        format!("vk::builtin '{name}' cannot be used as {} {io}", self.stage),
                        decl.loc,
                    );
                    return Ok(false);
                }
            }
        } else {
            let Some(semantic) = &semantic else {
                self.types.diags.error(
                    format!("semantic string missing for shader {io} variable '{}'", decl.name),
                    decl.loc,
                );
                return Ok(false);
            };
            if semantic.kind == SemanticKind::Invalid {
                self.types
                    .diags
                    .error(format!("unknown system value semantic '{semantic}'"), decl.loc);
                return Ok(false);
            }
            match resolve_semantic(semantic.kind, sig) {
                Some(resolved) => resolved,
                None => {
                    self.types.diags.error(
                        format!("semantic {semantic} is not allowed for {} shader {io} ({sig})", self.stage),
                        decl.loc,
                    );
                    return Ok(false);
                }
            }
        };
        self.require(resolved);

        match resolved.placement {
            // Packed into the shared arrays created for the entry point.
            Placement::ClipCull => Ok(true),
            Placement::BuiltIn(builtin) => {
                self.create_builtin_var(decl, semantic, builtin, interface)?;
                Ok(true)
            }
            Placement::Location => {
                self.create_location_var(decl, semantic, interface)?;
                Ok(true)
            }
        }
    }

    fn require(&mut self, resolved: Resolved) {
        if let Some(capability) = resolved.capability {
            self.types.module.require_capability(capability);
        }
        if let Some(extension) = resolved.extension {
            self.types.module.add_extension(extension);
        }
    }

    fn create_builtin_var(
        &mut self,
        decl: StageDecl<'_>,
        semantic: Option<Semantic>,
        builtin: BuiltIn,
        interface: Interface,
    ) -> Result<(), LowerError> {
        let class = storage_class(interface.direction);
        let handle = match self.builtin_vars.get(&(builtin, class)) {
            // The main and patch constant functions share one variable.
            Some(&(_, sig)) if sig != interface.sig => return Ok(()),
            // A second declaration at the same signature point; recorded so
            // the duplicate semantic is reported.
            Some(&(handle, _)) => handle,
            None => self.create_builtin_global(decl, builtin, class, interface)?,
        };

        self.stage_vars.push(StageVar {
            direction: interface.direction,
            semantic,
            builtin: Some(builtin),
            sig_point: interface.sig,
            class,
            location: None,
            index: None,
            location_count: 0,
            invocation: interface.invocation,
            var: handle,
            loc: decl.loc,
        });
        Ok(())
    }

    fn create_builtin_global(
        &mut self,
        decl: StageDecl<'_>,
        builtin: BuiltIn,
        class: StorageClass,
        interface: Interface,
    ) -> Result<Handle<Variable>, LowerError> {
        self.types.set_location(decl.loc);
        let ty = match builtin {
            BuiltIn::SampleMask => SourceType::array(SourceType::scalar(ScalarType::UINT), 1),
            BuiltIn::TessLevelOuter => SourceType::array(SourceType::scalar(ScalarType::FLOAT), 4),
            BuiltIn::TessLevelInner => SourceType::array(SourceType::scalar(ScalarType::FLOAT), 2),
            _ => decl.ty.with_bool_as_uint(),
        };
        let ty = self.interface_type(&ty, interface.array_size)?;

        let mut var = Variable::new(format!("gl_{builtin:?}"), ty, class);
        var.decorations.push(VarDecoration::BuiltIn(builtin));
        let per_patch = !matches!(
            builtin,
            BuiltIn::TessCoord | BuiltIn::PrimitiveId | BuiltIn::ViewIndex
        );
        if interface.sig.is_patch() && per_patch {
            var.decorations.push(VarDecoration::Patch);
        }
        let handle = self.types.module.add_variable(var);
        self.builtin_vars.insert((builtin, class), (handle, interface.sig));
        log::debug!("builtin {builtin:?} ({:?}) -> {handle:?}", interface.sig);
        Ok(handle)
    }

    fn create_location_var(
        &mut self,
        decl: StageDecl<'_>,
        semantic: Option<Semantic>,
        interface: Interface,
    ) -> Result<(), LowerError> {
        let Some(semantic) = semantic else {
            return Ok(());
        };
        self.types.set_location(decl.loc);
        let class = storage_class(interface.direction);
        let leaf = decl.ty.with_bool_as_uint();
        let ty = self.interface_type(&leaf, interface.array_size)?;

        let prefix = match interface.direction {
            Direction::Input => "in.var",
            Direction::Output => "out.var",
        };
        let mut var = Variable::new(format!("{prefix}.{}", semantic.string), ty, class);
        if interface.sig.is_patch() {
            var.decorations.push(VarDecoration::Patch);
        }
        if interface.sig == SigPoint::PSIn {
            self.interpolation(decl, &mut var);
        }
        if self.types.is_relaxed_precision(decl.ty) {
            var.decorations.push(VarDecoration::RelaxedPrecision);
        }
        if let Some(index) = decl.attrs.index {
            var.decorations.push(VarDecoration::Index(index));
        }
        if let Some(scalar) = decl.ty.element_scalar() {
            if self.types.element_bitwidth(scalar, None) == 16 {
                self.types
                    .module
                    .require_capability(Capability::StorageInputOutput16);
                self.types.module.add_extension(Extension::Storage16Bit);
            }
        }

        let location = match (decl.attrs.location, semantic.kind) {
            (Some(location), _) => Some(location),
            (None, SemanticKind::Target) => Some(semantic.index),
            (None, _) => None,
        };
        let location_count = self.types.location_count(decl.ty);
        let handle = self.types.module.add_variable(var);
        log::debug!("stage variable {semantic} ({:?}) -> {handle:?}", interface.sig);

        self.stage_vars.push(StageVar {
            direction: interface.direction,
            semantic: Some(semantic),
            builtin: None,
            sig_point: interface.sig,
            class,
            location,
            index: decl.attrs.index,
            location_count,
            invocation: interface.invocation,
            var: handle,
            loc: decl.loc,
        });
        Ok(())
    }

    fn interpolation(&mut self, decl: StageDecl<'_>, var: &mut Variable) {
        let modes = decl.attrs.interpolation;
        let integral = decl
            .ty
            .element_scalar()
            .is_some_and(|s| s.is_integer() || s == ScalarType::Bool);
        if integral || modes.nointerpolation {
            var.decorations.push(VarDecoration::Flat);
        }
        if modes.noperspective {
            var.decorations.push(VarDecoration::NoPerspective);
        }
        if modes.centroid {
            var.decorations.push(VarDecoration::Centroid);
        }
        if modes.sample {
            var.decorations.push(VarDecoration::Sample);
            self.types
                .module
                .require_capability(Capability::SampleRateShading);
        }
    }

    /// Translates a leaf type, adding the per-vertex outer dimension.
    fn interface_type(&mut self, ty: &SourceType, array_size: Option<u32>) -> Result<Handle<Type>, LowerError> {
        let base = self.types.translate(ty, LayoutRule::Void)?;
        Ok(match array_size {
            Some(n) => {
                let length = self.types.module.constant_u32(n);
                self.types
                    .module
                    .insert_type(Type::plain(TypeInner::Array { base, length }))
            }
            None => base,
        })
    }
}

fn param_decl<'a>(param: &'a ParamDecl, ty: &'a SourceType) -> StageDecl<'a> {
    StageDecl {
        name: &param.name,
        ty,
        attrs: &param.attrs,
        loc: param.loc,
    }
}

fn storage_class(direction: Direction) -> StorageClass {
    match direction {
        Direction::Input => StorageClass::Input,
        Direction::Output => StorageClass::Output,
    }
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

impl Binder {
    /// Checks semantic uniqueness and assigns locations, for inputs and
    /// outputs independently. Both directions are always processed so every
    /// problem is reported. Returns false if any error was reported.
    pub fn decorate_stage_io_locations(&mut self) -> Result<bool, LowerError> {
        let inputs_unique = self.check_semantic_duplication(Direction::Input);
        let outputs_unique = self.check_semantic_duplication(Direction::Output);
        let inputs_placed = self.assign_locations(Direction::Input)?;
        let outputs_placed = self.assign_locations(Direction::Output)?;
        Ok(inputs_unique && outputs_unique && inputs_placed && outputs_placed)
    }

    fn check_semantic_duplication(&mut self, direction: Direction) -> bool {
        let io = match direction {
            Direction::Input => "input",
            Direction::Output => "output",
        };
        let mut seen: HashMap<String, SourceLocation> = HashMap::new();
        let mut ok = true;
        for var in self.stage_vars.iter().filter(|v| v.direction == direction) {
            let Some(semantic) = &var.semantic else {
                continue;
            };
            let key = semantic.string.to_ascii_uppercase();
            match seen.get(&key) {
                Some(&first) => {
                    self.types.diags.error(
                        format!("{io} semantic '{semantic}' used more than once"),
                        var.loc,
                    );
                    self.types
                        .diags
                        .note(format!("'{semantic}' first used here"), first);
                    ok = false;
                }
                None => {
                    seen.insert(key, var.loc);
                }
            }
        }
        ok
    }

    /// Explicit locations are reserved first; the rest fill the lowest free
    /// ranges in declaration or alphabetical order.
    fn assign_locations(&mut self, direction: Direction) -> Result<bool, LowerError> {
        let mut ok = true;
        let mut used: BTreeSet<(u32, u32)> = BTreeSet::new();
        let candidates: Vec<usize> = (0..self.stage_vars.len())
            .filter(|&i| {
                let v = &self.stage_vars[i];
                v.direction == direction && !v.is_builtin()
            })
            .collect();

        let mut pending = Vec::new();
        for &i in &candidates {
            let var = &self.stage_vars[i];
            let Some(start) = var.location else {
                pending.push(i);
                continue;
            };
            let index = var.index.unwrap_or(0);
            let (count, loc, handle) = (var.location_count.max(1), var.loc, var.var);
            for location in start..start + count {
                if !used.insert((location, index)) {
                    self.types
                        .diags
                        .error(format!("location #{location} already assigned"), loc);
                    ok = false;
                    break;
                }
            }
            self.types
                .module
                .decorate_variable(handle, VarDecoration::Location(start))?;
        }

        if self.types.options.stage_io_order == StageIoOrder::Alphabetical {
            pending.sort_by_cached_key(|&i| {
                self.stage_vars[i]
                    .semantic
                    .as_ref()
                    .map(|s| s.string.clone())
                    .unwrap_or_default()
            });
        }

        let mut next = 0;
        for i in pending {
            let count = self.stage_vars[i].location_count.max(1);
            while (next..next + count).any(|l| used.contains(&(l, 0))) {
                next += 1;
            }
            used.extend((next..next + count).map(|l| (l, 0)));
            let var = &mut self.stage_vars[i];
            var.location = Some(next);
            log::debug!("{direction:?} location {next} -> {:?}", var.var);
            let handle = var.var;
            self.types
                .module
                .decorate_variable(handle, VarDecoration::Location(next))?;
            next += count;
        }
        Ok(ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spvx_ast::{FieldDecl, StructDecl};

    use crate::LowerOptions;

    fn binder(stage: ShaderStage) -> Binder {
        Binder::new(stage, LowerOptions::default())
    }

    fn input(id: u32, name: &str, ty: SourceType, semantic: &str) -> ParamDecl {
        ParamDecl::new(id, name, ty, DeclAttrs::with_semantic(semantic))
    }

    fn float4() -> SourceType {
        SourceType::vector(ScalarType::FLOAT, 4)
    }

    #[test]
    fn builtin_and_location_inputs() {
        let mut b = binder(ShaderStage::Vertex);
        assert!(b.create_stage_input_var(&input(0, "pos", float4(), "POSITION"), false).unwrap());
        assert!(b.create_stage_input_var(&input(1, "vid", SourceType::scalar(ScalarType::UINT), "SV_VertexID"), false).unwrap());
        assert!(b.decorate_stage_io_locations().unwrap());

        let vars = b.stage_vars();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars[0].location, Some(0));
        assert_eq!(vars[1].builtin, Some(BuiltIn::VertexIndex));
        let module = b.module();
        assert_eq!(module.variables[vars[0].var].name.as_deref(), Some("in.var.POSITION"));
        assert_eq!(module.variables[vars[1].var].name.as_deref(), Some("gl_VertexIndex"));
    }

    #[test]
    fn struct_outputs_are_flattened() {
        let mut b = binder(ShaderStage::Vertex);
        let out = SourceType::structure(StructDecl {
            name: "VSOut".into(),
            base: None,
            fields: vec![
                FieldDecl::new("pos", float4(), DeclAttrs::with_semantic("SV_Position")),
                FieldDecl::new("uv", SourceType::vector(ScalarType::FLOAT, 2), DeclAttrs::with_semantic("TEXCOORD")),
                FieldDecl::new("m", SourceType::matrix(ScalarType::FLOAT, 3, 4), DeclAttrs::with_semantic("MATRIX")),
                FieldDecl::new("c", float4(), DeclAttrs::with_semantic("COLOR")),
            ],
        });
        let mut ret = ParamDecl::new(0, "main", out, DeclAttrs::default());
        ret.direction = spvx_ast::ParamDirection::Out;
        assert!(b.create_stage_output_var(&ret, false).unwrap());
        assert!(b.decorate_stage_io_locations().unwrap());
        let locations: Vec<_> = b.stage_vars().iter().map(|v| v.location).collect();
        assert_eq!(locations, vec![None, Some(0), Some(1), Some(4)]);
    }

    #[test]
    fn inherited_semantic_indices() {
        let mut b = binder(ShaderStage::Pixel);
        let ty = SourceType::structure(StructDecl {
            name: "Targets".into(),
            base: None,
            fields: vec![
                FieldDecl::new("a", float4(), DeclAttrs::default()),
                FieldDecl::new("b", float4(), DeclAttrs::with_semantic("IGNORED")),
            ],
        });
        let out = input(0, "o", ty, "SV_Target1").output();
        assert!(b.create_stage_output_var(&out, false).unwrap());
        assert!(b.decorate_stage_io_locations().unwrap());
        let names: Vec<_> = b
            .stage_vars()
            .iter()
            .map(|v| v.semantic.as_ref().unwrap().string.clone())
            .collect();
        assert_eq!(names, vec!["SV_Target1", "SV_Target2"]);
        assert_eq!(b.stage_vars()[1].location, Some(2));
        assert_eq!(b.diagnostics().messages(crate::Severity::Warning).len(), 1);
    }

    #[test]
    fn missing_semantic_is_an_error() {
        let mut b = binder(ShaderStage::Vertex);
        let param = ParamDecl::new(0, "x", float4(), DeclAttrs::default());
        assert!(!b.create_stage_input_var(&param, false).unwrap());
        assert!(b.diagnostics().messages(crate::Severity::Error)[0].starts_with("semantic string missing"));
    }

    #[test]
    fn semantic_index_overflow_is_an_error() {
        let mut b = binder(ShaderStage::Vertex);
        let param = input(0, "uv", float4(), "TEXCOORD99999999999");
        assert!(!b.create_stage_input_var(&param, false).unwrap());
        assert!(b.stage_vars().is_empty());
        let errors = b.diagnostics().messages(crate::Severity::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("semantic index in 'TEXCOORD99999999999'"));
    }

    #[test]
    fn invalid_semantic_for_signature_point() {
        let mut b = binder(ShaderStage::Vertex);
        let param = input(0, "d", SourceType::scalar(ScalarType::FLOAT), "SV_Depth");
        assert!(!b.create_stage_input_var(&param, false).unwrap());
        assert!(b.diagnostics().has_errors());
    }

    #[test]
    fn pixel_inputs_interpolation() {
        let mut b = binder(ShaderStage::Pixel);
        let id = input(0, "id", SourceType::scalar(ScalarType::UINT), "ID");
        let mut smooth = input(1, "c", float4(), "COLOR");
        smooth.attrs.interpolation.sample = true;
        b.create_stage_input_var(&id, false).unwrap();
        b.create_stage_input_var(&smooth, false).unwrap();
        let module = b.module();
        let vars = b.stage_vars();
        assert!(module.variables[vars[0].var].has_decoration(VarDecoration::Flat));
        assert!(module.variables[vars[1].var].has_decoration(VarDecoration::Sample));
        assert!(module.capabilities.contains(&Capability::SampleRateShading));
    }

    #[test]
    fn duplicate_semantics_reported_per_direction() {
        let mut b = binder(ShaderStage::Vertex);
        b.create_stage_input_var(&input(0, "a", float4(), "TEXCOORD0"), false).unwrap();
        b.create_stage_input_var(&input(1, "b", float4(), "texcoord0"), false).unwrap();
        b.create_stage_output_var(&input(2, "c", float4(), "COLOR").output(), false).unwrap();
        b.create_stage_output_var(&input(3, "d", float4(), "COLOR").output(), false).unwrap();
        assert!(!b.decorate_stage_io_locations().unwrap());
        let errors = b.diagnostics().messages(crate::Severity::Error);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("input semantic"));
        assert!(errors[1].starts_with("output semantic"));
        assert_eq!(b.diagnostics().messages(crate::Severity::Note).len(), 2);
    }

    #[test]
    fn explicit_locations_are_reserved_first() {
        let mut b = binder(ShaderStage::Vertex);
        let mut a = input(0, "a", float4(), "A");
        a.attrs.location = Some(0);
        b.create_stage_input_var(&input(1, "b", float4(), "B"), false).unwrap();
        b.create_stage_input_var(&a, false).unwrap();
        assert!(b.decorate_stage_io_locations().unwrap());
        let locations: Vec<_> = b.stage_vars().iter().map(|v| v.location).collect();
        assert_eq!(locations, vec![Some(1), Some(0)]);
    }

    #[test]
    fn alphabetical_order() {
        let mut b = Binder::new(
            ShaderStage::Vertex,
            LowerOptions {
                stage_io_order: StageIoOrder::Alphabetical,
                ..LowerOptions::default()
            },
        );
        b.create_stage_input_var(&input(0, "z", float4(), "ZETA"), false).unwrap();
        b.create_stage_input_var(&input(1, "a", float4(), "ALPHA"), false).unwrap();
        assert!(b.decorate_stage_io_locations().unwrap());
        let locations: Vec<_> = b.stage_vars().iter().map(|v| v.location).collect();
        assert_eq!(locations, vec![Some(1), Some(0)]);
    }

    #[test]
    fn hull_outputs_are_arrayed() {
        let mut b = binder(ShaderStage::Hull);
        let out = input(0, "main", float4(), "POS").output();
        assert!(b.create_hull_output_var(&out, 3, Some(1)).unwrap());
        let var = &b.stage_vars()[0];
        assert_eq!(var.sig_point, SigPoint::HSCPOut);
        assert_eq!(var.location_count, 1);
        assert_eq!(var.invocation, Some(1));
        let ty = b.module().variables[var.var].ty;
        assert_eq!(b.module().array_len(ty), Some(3));
    }

    #[test]
    fn patch_constant_outputs_are_patch() {
        let mut b = binder(ShaderStage::Hull);
        let tess = input(0, "f", SourceType::array(SourceType::scalar(ScalarType::FLOAT), 3), "SV_TessFactor").output();
        assert!(b.create_stage_output_var(&tess, true).unwrap());
        let var = &b.module().variables[b.stage_vars()[0].var];
        assert_eq!(var.builtin(), Some(BuiltIn::TessLevelOuter));
        assert!(var.has_decoration(VarDecoration::Patch));
        assert_eq!(b.module().array_len(var.ty), Some(4));
    }

    #[test]
    fn builtins_are_shared() {
        let mut b = binder(ShaderStage::Hull);
        let pid = input(0, "pid", SourceType::scalar(ScalarType::UINT), "SV_PrimitiveID");
        b.create_stage_input_var(&pid, false).unwrap();
        b.create_stage_input_var(&pid, true).unwrap();
        assert_eq!(b.stage_vars().len(), 1);
        assert!(b.decorate_stage_io_locations().unwrap());
    }

    #[test]
    fn duplicate_builtin_semantic_is_reported() {
        let mut b = binder(ShaderStage::Pixel);
        assert!(b.create_stage_input_var(&input(0, "a", float4(), "SV_Position"), false).unwrap());
        assert!(b.create_stage_input_var(&input(1, "b", float4(), "SV_Position"), false).unwrap());
        let vars = b.stage_vars();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars[0].var, vars[1].var);

        assert!(!b.decorate_stage_io_locations().unwrap());
        let errors = b.diagnostics().messages(crate::Severity::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("input semantic 'SV_Position'"));
        assert_eq!(b.diagnostics().messages(crate::Severity::Note).len(), 1);
    }

    #[test]
    fn vk_builtin_attribute() {
        let mut b = binder(ShaderStage::Vertex);
        let mut attrs = DeclAttrs::default();
        attrs.builtin = Some("BaseVertex".into());
        let param = ParamDecl::new(0, "base", SourceType::scalar(ScalarType::INT), attrs);
        assert!(b.create_stage_input_var(&param, false).unwrap());
        assert_eq!(b.stage_vars()[0].builtin, Some(BuiltIn::BaseVertex));
        assert!(b.module().extensions.contains(&Extension::ShaderDrawParameters));

        let mut attrs = DeclAttrs::default();
        attrs.builtin = Some("Bogus".into());
        let param = ParamDecl::new(1, "x", SourceType::scalar(ScalarType::INT), attrs);
        assert!(!b.create_stage_input_var(&param, false).unwrap());
    }
}
