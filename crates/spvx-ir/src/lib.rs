//! spvx intermediate representation.
//!
//! The sink that type, variable, and capability requests are emitted into:
//! a deduplicating type table with layout decorations, a constant table, a
//! variable table, and the capability/extension requirements of the module.
//! Modeled after naga's arena architecture.

pub mod arena;
mod capability;
mod display;
mod error;
mod global;
mod types;

pub use arena::{Arena, Handle, UniqueArena};
pub use capability::{Capability, Extension};
pub use display::{dump_module, format_type, format_type_inner};
pub use error::IrError;
pub use global::{BuiltIn, ResourceBinding, StorageClass, VarDecoration, Variable};
pub use types::{
    Bytes, Constant, Decoration, ImageDim, ImageFormat, Scalar, ScalarKind, StructMember, Type,
    TypeInner, VectorSize,
};

use std::collections::BTreeSet;

/// A module under construction.
#[derive(Clone, Debug, Default)]
pub struct Module {
    /// Deduplicated type table.
    pub types: UniqueArena<Type>,
    /// Deduplicated constants.
    pub constants: UniqueArena<Constant>,
    /// Every variable created so far, in creation order.
    pub variables: Arena<Variable>,
    pub capabilities: BTreeSet<Capability>,
    pub extensions: BTreeSet<Extension>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a type, returning the existing handle for an identical entry.
    pub fn insert_type(&mut self, ty: Type) -> Handle<Type> {
        self.types.insert(ty)
    }

    /// Shorthand for an unnamed, undecorated type.
    pub fn plain_type(&mut self, inner: TypeInner) -> Handle<Type> {
        self.types.insert(Type::plain(inner))
    }

    pub fn scalar_type(&mut self, scalar: Scalar) -> Handle<Type> {
        self.plain_type(TypeInner::Scalar(scalar))
    }

    /// Returns the handle of a `u32` constant with the given value.
    pub fn constant_u32(&mut self, value: u32) -> Handle<Constant> {
        let ty = self.scalar_type(Scalar::U32);
        self.constants.insert(Constant { ty, value })
    }

    /// Returns the length of a fixed-size array type, or `None` for any
    /// other type.
    pub fn array_len(&self, ty: Handle<Type>) -> Option<u32> {
        match self.types.try_get(ty)?.inner {
            TypeInner::Array { length, .. } => self.constants.try_get(length).map(|c| c.value),
            _ => None,
        }
    }

    pub fn add_variable(&mut self, var: Variable) -> Handle<Variable> {
        self.variables.append(var)
    }

    /// Appends a decoration to an existing variable.
    pub fn decorate_variable(
        &mut self,
        var: Handle<Variable>,
        decoration: VarDecoration,
    ) -> Result<(), IrError> {
        let size = self.variables.len();
        let slot = self.variables.try_get_mut(var).ok_or(IrError::BadHandle {
            index: var.index(),
            size,
        })?;
        slot.decorations.push(decoration);
        Ok(())
    }

    pub fn require_capability(&mut self, capability: Capability) {
        self.capabilities.insert(capability);
    }

    pub fn add_extension(&mut self, extension: Extension) {
        self.extensions.insert(extension);
    }

    /// Returns the struct members of `ty`.
    pub fn struct_members(&self, ty: Handle<Type>) -> Result<&[StructMember], IrError> {
        let entry = self.types.try_get(ty).ok_or(IrError::BadHandle {
            index: ty.index(),
            size: self.types.len(),
        })?;
        match entry.inner {
            TypeInner::Struct { ref members } => Ok(members),
            ref other => Err(IrError::TypeMismatch {
                expected: "struct".into(),
                found: format_type_inner(other, &self.types),
            }),
        }
    }
}
