//! Buffer blocks, resource globals, and descriptor binding assignment.

use std::collections::HashMap;

use spvx_ast::{
    BindingAttr, BufferBlockDecl, BufferKind, RegisterAttr, ResourceKind, SourceLocation,
    SourceType, VarDecl, VarStorage,
};
use spvx_ir::{Handle, StorageClass, Type, TypeInner, VarDecoration, Variable};

use crate::binder::Binder;
use crate::counter::{CounterEntry, CounterVarFields, IndexPath};
use crate::layout::{LayoutRule, MemberRef, members_of};
use crate::translate::BlockKind;
use crate::{Diagnostics, LowerError};

/// A variable that needs a descriptor set and binding.
#[derive(Clone, Debug)]
pub struct ResourceVar {
    pub var: Handle<Variable>,
    pub loc: SourceLocation,
    pub register: Option<RegisterAttr>,
    pub binding: Option<BindingAttr>,
    /// `vk::counter_binding` of a buffer with a counter.
    pub counter_binding: Option<u32>,
    /// The hidden counter of the resource at `parent`.
    pub is_counter: bool,
    /// Index into [`Binder::resource_vars`] of the owning buffer.
    pub parent: Option<usize>,
}

impl ResourceVar {
    fn new(var: Handle<Variable>, decl: &VarDecl) -> Self {
        Self {
            var,
            loc: decl.loc,
            register: decl.attrs.register,
            binding: decl.attrs.binding,
            counter_binding: decl.attrs.counter_binding,
            is_counter: false,
            parent: None,
        }
    }

    /// The set this variable is explicitly placed in, if any.
    fn explicit_set(&self) -> Option<u32> {
        self.binding
            .map(|b| b.set)
            .or(self.register.map(|r| r.space))
    }
}

/// The resource kind under any number of array dimensions.
fn innermost_resource(ty: &SourceType) -> Option<(ResourceKind, Option<&SourceType>)> {
    match ty.desugar().0 {
        SourceType::Array { elem, .. } => innermost_resource(elem),
        other => other.as_resource(),
    }
}

fn is_ct_buffer_or_array_of(ty: &SourceType) -> bool {
    innermost_resource(ty).is_some_and(|(kind, _)| kind.is_ct_buffer())
}

// ---------------------------------------------------------------------------
// Buffer blocks
// ---------------------------------------------------------------------------

impl Binder {
    /// Creates the variable for a `cbuffer` or `tbuffer` block. Repeated
    /// calls for the same block return the same variable.
    pub fn create_ct_buffer(&mut self, block: &BufferBlockDecl) -> Result<Handle<Variable>, LowerError> {
        if let Some(&var) = self.ct_buffers.get(&block.id) {
            return Ok(var);
        }
        let keyword = match block.kind {
            BufferKind::CBuffer => "cbuffer",
            BufferKind::TBuffer => "tbuffer",
        };
        let mut ok = true;
        for field in &block.fields {
            if field.ty.is_resource_or_array_of() {
                self.types.diags.error(
                    format!(
                        "resource '{}' cannot be a member of {keyword} '{}'",
                        field.name, block.name
                    ),
                    field.loc,
                );
                ok = false;
            }
        }
        if !ok {
            return Err(LowerError::Invalid);
        }

        let (rule, kind) = match block.kind {
            BufferKind::CBuffer => (self.types.options.cbuffer_rule(), BlockKind::Block),
            BufferKind::TBuffer => (
                self.types.options.tbuffer_rule(),
                BlockKind::BufferBlock { read_only: true },
            ),
        };
        let members: Vec<_> = block
            .fields
            .iter()
            .map(|f| MemberRef {
                name: &f.name,
                ty: &f.ty,
                attrs: Some(&f.attrs),
                loc: f.loc,
            })
            .collect();
        self.types.set_location(block.loc);
        let ty = self
            .types
            .struct_type(&format!("type.{}", block.name), &members, rule, kind)?;
        let var = self
            .types
            .module
            .add_variable(Variable::new(block.name.as_str(), ty, StorageClass::Uniform));
        log::debug!("{keyword} {} -> {var:?}", block.name);

        self.resource_vars.push(ResourceVar {
            var,
            loc: block.loc,
            register: block.attrs.register,
            binding: block.attrs.binding,
            counter_binding: None,
            is_counter: false,
            parent: None,
        });
        self.ct_buffers.insert(block.id, var);
        self.decl_vars.insert(block.id, var);
        Ok(var)
    }

    /// Creates the variable for a `ConstantBuffer<T>`/`TextureBuffer<T>`
    /// global, or an array of them.
    pub fn create_ct_buffer_var(&mut self, decl: &VarDecl) -> Result<Handle<Variable>, LowerError> {
        if let Some(&var) = self.ct_buffers.get(&decl.id) {
            return Ok(var);
        }
        if !is_ct_buffer_or_array_of(&decl.ty) {
            self.types.diags.error(
                format!("'{}' is not a ConstantBuffer or TextureBuffer", decl.name),
                decl.loc,
            );
            return Err(LowerError::Invalid);
        }
        self.types.set_location(decl.loc);
        let ty = self.types.translate(&decl.ty, LayoutRule::Void)?;
        let var = self
            .types
            .module
            .add_variable(Variable::new(decl.name.as_str(), ty, StorageClass::Uniform));
        log::debug!("{} {} -> {var:?}", decl.ty, decl.name);

        self.resource_vars.push(ResourceVar::new(var, decl));
        self.ct_buffers.insert(decl.id, var);
        self.decl_vars.insert(decl.id, var);
        Ok(var)
    }

    /// Creates the single push constant block of a compile.
    pub fn create_push_constant(&mut self, decl: &VarDecl) -> Result<Handle<Variable>, LowerError> {
        if let Some((_, first)) = self.push_constant {
            self.types
                .diags
                .error("cannot have more than one push constant block", decl.loc);
            self.types
                .diags
                .note("push constant block first declared here", first);
            return Err(LowerError::Invalid);
        }

        let st = match decl.ty.as_resource() {
            Some((ResourceKind::ConstantBuffer, Some(elem))) => elem.as_struct(),
            _ => decl.ty.as_struct(),
        };
        let Some(st) = st else {
            self.types.diags.error(
                format!(
                    "vk::push_constant requires a struct or ConstantBuffer type, found '{}'",
                    decl.ty
                ),
                decl.loc,
            );
            return Err(LowerError::Invalid);
        };

        self.types.set_location(decl.loc);
        let rule = self.types.options.sbuffer_rule();
        let ty = self.types.struct_type(
            &format!("type.PushConstant.{}", st.name),
            &members_of(st),
            rule,
            BlockKind::Block,
        )?;
        let var = self
            .types
            .module
            .add_variable(Variable::new(decl.name.as_str(), ty, StorageClass::PushConstant));
        log::debug!("push constant {} -> {var:?}", decl.name);

        self.push_constant = Some((var, decl.loc));
        self.decl_vars.insert(decl.id, var);
        Ok(var)
    }

    /// Gathers every loose extern non-resource global into `$Globals`.
    /// Returns `None` when there are none.
    pub fn create_globals_cbuffer(&mut self, vars: &[VarDecl]) -> Result<Option<Handle<Variable>>, LowerError> {
        let members: Vec<_> = vars
            .iter()
            .filter(|v| {
                v.storage == VarStorage::Extern
                    && !v.attrs.push_constant
                    && !v.ty.is_resource_or_array_of()
            })
            .map(|v| MemberRef {
                name: &v.name,
                ty: &v.ty,
                attrs: Some(&v.attrs),
                loc: v.loc,
            })
            .collect();
        if members.is_empty() {
            return Ok(None);
        }

        let rule = self.types.options.cbuffer_rule();
        let ty = self
            .types
            .struct_type("type.$Globals", &members, rule, BlockKind::Block)?;
        let var = self
            .types
            .module
            .add_variable(Variable::new("$Globals", ty, StorageClass::Uniform));
        log::debug!("$Globals with {} members -> {var:?}", members.len());

        self.resource_vars.push(ResourceVar {
            var,
            loc: SourceLocation::default(),
            register: None,
            binding: None,
            counter_binding: None,
            is_counter: false,
            parent: None,
        });
        Ok(Some(var))
    }

    /// Creates the variable for an extern global resource, plus its hidden
    /// counter when the buffer kind has one.
    pub fn create_extern_var(&mut self, decl: &VarDecl) -> Result<Handle<Variable>, LowerError> {
        if decl.attrs.push_constant {
            return self.create_push_constant(decl);
        }
        if is_ct_buffer_or_array_of(&decl.ty) {
            return self.create_ct_buffer_var(decl);
        }
        let Some((kind, elem)) = innermost_resource(&decl.ty).filter(|_| decl.ty.is_resource_or_array_of())
        else {
            self.types.diags.error(
                format!("global '{}' is not a resource; it belongs to $Globals", decl.name),
                decl.loc,
            );
            return Err(LowerError::Invalid);
        };

        self.types.set_location(decl.loc);
        let (rule, class) = if kind.is_aliasable_buffer() {
            (self.types.options.sbuffer_rule(), StorageClass::Uniform)
        } else {
            (LayoutRule::Void, StorageClass::UniformConstant)
        };
        let ty = self.types.translate(&decl.ty, rule)?;
        let mut var = Variable::new(decl.name.as_str(), ty, class);
        if elem.is_some_and(|e| self.types.is_relaxed_precision(e)) {
            var.decorations.push(VarDecoration::RelaxedPrecision);
        }
        let var = self.types.module.add_variable(var);
        log::debug!("resource {} {} -> {var:?}", decl.ty, decl.name);

        let parent = self.resource_vars.len();
        self.resource_vars.push(ResourceVar::new(var, decl));
        self.decl_vars.insert(decl.id, var);

        if kind.has_counter() {
            let counter = self.types.counter_type();
            let ty = self.arrayed_like(&decl.ty, counter);
            let counter = self.types.module.add_variable(Variable::new(
                format!("counter.var.{}", decl.name),
                ty,
                StorageClass::Uniform,
            ));
            self.resource_vars.push(ResourceVar {
                var: counter,
                loc: decl.loc,
                register: None,
                binding: None,
                counter_binding: None,
                is_counter: true,
                parent: Some(parent),
            });
            let mut fields = CounterVarFields::new();
            fields.insert(CounterEntry {
                path: IndexPath::root(),
                counter,
                is_alias: false,
            });
            self.counters.insert(decl.id, fields);
        }
        Ok(var)
    }

    /// Wraps `base` in the array dimensions of `ty`.
    pub(crate) fn arrayed_like(&mut self, ty: &SourceType, base: Handle<Type>) -> Handle<Type> {
        match ty.desugar().0 {
            SourceType::Array { elem, len } => {
                let base = self.arrayed_like(elem, base);
                let inner = match len {
                    Some(n) => TypeInner::Array {
                        base,
                        length: self.types.module.constant_u32(*n),
                    },
                    None => TypeInner::RuntimeArray { base },
                };
                self.types.module.plain_type(inner)
            }
            _ => base,
        }
    }
}

// ---------------------------------------------------------------------------
// Bindings
// ---------------------------------------------------------------------------

impl Binder {
    /// Gives every resource variable a descriptor set and binding.
    ///
    /// Explicit `vk::binding` and `vk::counter_binding` go first, then
    /// `register` assignments, then everything else takes the lowest free
    /// binding of its set. Returns false if two explicit assignments
    /// collided.
    pub fn decorate_resource_bindings(&mut self) -> Result<bool, LowerError> {
        let mut used: HashMap<(u32, u32), SourceLocation> = HashMap::new();
        let mut placed: Vec<Option<(u32, u32)>> = vec![None; self.resource_vars.len()];
        let mut ok = true;

        for (i, rv) in self.resource_vars.iter().enumerate() {
            let slot = match (rv.binding, rv.parent) {
                (Some(b), _) => Some((b.set, b.binding)),
                (None, Some(parent)) => {
                    let owner = &self.resource_vars[parent];
                    owner
                        .counter_binding
                        .map(|binding| (owner.explicit_set().unwrap_or(0), binding))
                }
                (None, None) => None,
            };
            if let Some(slot) = slot {
                ok &= claim(&mut self.types.diags, &mut used, slot, rv.loc);
                placed[i] = Some(slot);
            }
        }

        for (i, rv) in self.resource_vars.iter().enumerate() {
            if placed[i].is_some() {
                continue;
            }
            if let Some(reg) = rv.register {
                let slot = (reg.space, reg.number);
                ok &= claim(&mut self.types.diags, &mut used, slot, rv.loc);
                placed[i] = Some(slot);
            }
        }

        for i in 0..self.resource_vars.len() {
            if placed[i].is_some() {
                continue;
            }
            let rv = &self.resource_vars[i];
            let set = rv
                .parent
                .and_then(|parent| self.resource_vars[parent].explicit_set())
                .unwrap_or(0);
            let binding = (0..)
                .find(|&b| !used.contains_key(&(set, b)))
                .unwrap_or_default();
            used.insert((set, binding), rv.loc);
            placed[i] = Some((set, binding));
        }

        for (rv, slot) in self.resource_vars.iter().zip(placed) {
            let Some((set, binding)) = slot else {
                continue;
            };
            log::debug!("{:?} -> set {set} binding {binding}", rv.var);
            self.types
                .module
                .decorate_variable(rv.var, VarDecoration::DescriptorSet(set))?;
            self.types
                .module
                .decorate_variable(rv.var, VarDecoration::Binding(binding))?;
        }
        Ok(ok)
    }
}

/// Reserves a slot, reporting a collision with an earlier explicit one.
fn claim(
    diags: &mut Diagnostics,
    used: &mut HashMap<(u32, u32), SourceLocation>,
    (set, binding): (u32, u32),
    loc: SourceLocation,
) -> bool {
    match used.get(&(set, binding)) {
        Some(&first) => {
            diags.error(
                format!("resource binding #{binding} in descriptor set #{set} already assigned"),
                loc,
            );
            diags.note("binding number previously assigned here", first);
            false
        }
        None => {
            used.insert((set, binding), loc);
            true
        }
    }
}
