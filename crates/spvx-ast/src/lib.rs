//! Front-end contract for spvx lowering.
//!
//! Source type shapes, declarations with their annotations, shader stages,
//! and the signature-point classifier. The front end builds these; the
//! lowering crate only reads them.

mod decl;
mod stage;
mod types;

pub use decl::{
    BindingAttr, BufferBlockDecl, BufferKind, DeclAttrs, DeclId, EntryPointDecl, FieldDecl,
    FunctionDecl, InputPrimitive, Interpolation, PackOffset, ParamDecl, ParamDirection,
    RegisterAttr, SourceLocation, VarDecl, VarStorage,
};
pub use stage::{Direction, ShaderStage, SigPoint, SigRole};
pub use types::{
    Majorness, ResourceKind, ScalarType, SourceType, StreamPrimitive, StructDecl, TextureDim,
    can_treat_as_same_scalar, is_same_type,
};
