//! Declarations and the annotations attached to them.

use std::fmt;

use crate::stage::ShaderStage;
use crate::types::SourceType;

/// A position in the source file.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Identity of a declaration, assigned by the front end.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct DeclId(pub u32);

/// `[[vk::binding(binding, set)]]`.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct BindingAttr {
    pub binding: u32,
    pub set: u32,
}

/// `register(t3, space1)`.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct RegisterAttr {
    /// Register class letter: `b`, `t`, `s`, or `u`.
    pub class: char,
    pub number: u32,
    pub space: u32,
}

/// `packoffset(c<subcomponent>.<component>)`, component 0..=3 for x..w.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct PackOffset {
    pub subcomponent: u32,
    pub component: u32,
}

impl PackOffset {
    /// Byte offset inside the enclosing buffer.
    pub fn byte_offset(self) -> u32 {
        self.subcomponent * 16 + self.component * 4
    }
}

/// Pixel-shader input interpolation modifiers.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
pub struct Interpolation {
    pub nointerpolation: bool,
    pub noperspective: bool,
    pub centroid: bool,
    pub sample: bool,
}

/// Annotations the front end attaches to a declaration.
#[derive(Clone, Debug, Default, Hash, Eq, PartialEq)]
pub struct DeclAttrs {
    /// Semantic string as written, e.g. `TEXCOORD3` or `SV_Position`.
    pub semantic: Option<String>,
    /// `[[vk::location(N)]]`.
    pub location: Option<u32>,
    /// `[[vk::index(N)]]`.
    pub index: Option<u32>,
    pub binding: Option<BindingAttr>,
    /// `[[vk::counter_binding(N)]]`.
    pub counter_binding: Option<u32>,
    pub register: Option<RegisterAttr>,
    /// `[[vk::builtin("Name")]]`.
    pub builtin: Option<String>,
    /// `[[vk::offset(N)]]`.
    pub offset: Option<u32>,
    pub packoffset: Option<PackOffset>,
    pub interpolation: Interpolation,
    /// `[[vk::push_constant]]`.
    pub push_constant: bool,
}

impl DeclAttrs {
    pub fn with_semantic(semantic: impl Into<String>) -> Self {
        Self {
            semantic: Some(semantic.into()),
            ..Self::default()
        }
    }
}

/// A struct field or buffer block member.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: SourceType,
    pub attrs: DeclAttrs,
    pub loc: SourceLocation,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: SourceType, attrs: DeclAttrs) -> Self {
        Self {
            name: name.into(),
            ty,
            attrs,
            loc: SourceLocation::default(),
        }
    }
}

/// Storage of a global or local variable.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum VarStorage {
    /// An externally visible global: a resource, or a member of the
    /// implicit global constant buffer.
    Extern,
    /// A `static` global.
    Static,
    /// `groupshared`.
    GroupShared,
    /// A function-local variable.
    Local,
}

/// A variable declaration.
#[derive(Clone, Debug)]
pub struct VarDecl {
    pub id: DeclId,
    pub name: String,
    pub ty: SourceType,
    pub attrs: DeclAttrs,
    pub storage: VarStorage,
    pub loc: SourceLocation,
}

impl VarDecl {
    pub fn new(id: u32, name: impl Into<String>, ty: SourceType, storage: VarStorage) -> Self {
        Self {
            id: DeclId(id),
            name: name.into(),
            ty,
            attrs: DeclAttrs::default(),
            storage,
            loc: SourceLocation::default(),
        }
    }
}

/// `cbuffer` or `tbuffer`.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum BufferKind {
    CBuffer,
    TBuffer,
}

/// A `cbuffer`/`tbuffer` block.
#[derive(Clone, Debug)]
pub struct BufferBlockDecl {
    pub id: DeclId,
    pub name: String,
    pub kind: BufferKind,
    pub fields: Vec<FieldDecl>,
    pub attrs: DeclAttrs,
    pub loc: SourceLocation,
}

/// Parameter passing direction.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum ParamDirection {
    In,
    Out,
    InOut,
}

/// Geometry-shader input primitive modifiers.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum InputPrimitive {
    Point,
    Line,
    Triangle,
    LineAdj,
    TriangleAdj,
}

impl InputPrimitive {
    /// Vertices per input primitive.
    pub fn vertex_count(self) -> u32 {
        match self {
            Self::Point => 1,
            Self::Line => 2,
            Self::Triangle => 3,
            Self::LineAdj => 4,
            Self::TriangleAdj => 6,
        }
    }
}

/// A function parameter.
#[derive(Clone, Debug)]
pub struct ParamDecl {
    pub id: DeclId,
    pub name: String,
    pub ty: SourceType,
    pub attrs: DeclAttrs,
    pub direction: ParamDirection,
    /// Set on geometry-shader per-vertex inputs.
    pub primitive: Option<InputPrimitive>,
    pub loc: SourceLocation,
}

impl ParamDecl {
    pub fn new(id: u32, name: impl Into<String>, ty: SourceType, attrs: DeclAttrs) -> Self {
        Self {
            id: DeclId(id),
            name: name.into(),
            ty,
            attrs,
            direction: ParamDirection::In,
            primitive: None,
            loc: SourceLocation::default(),
        }
    }

    pub fn output(mut self) -> Self {
        self.direction = ParamDirection::Out;
        self
    }

    pub fn at(mut self, loc: SourceLocation) -> Self {
        self.loc = loc;
        self
    }

    pub fn is_input(&self) -> bool {
        matches!(self.direction, ParamDirection::In | ParamDirection::InOut)
    }

    pub fn is_output(&self) -> bool {
        matches!(self.direction, ParamDirection::Out | ParamDirection::InOut)
    }
}

/// A function declaration.
#[derive(Clone, Debug)]
pub struct FunctionDecl {
    pub id: DeclId,
    pub name: String,
    pub params: Vec<ParamDecl>,
    pub return_ty: SourceType,
    /// Annotations on the return value, such as its semantic.
    pub return_attrs: DeclAttrs,
    pub loc: SourceLocation,
}

impl FunctionDecl {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id: DeclId(id),
            name: name.into(),
            params: Vec::new(),
            return_ty: SourceType::Void,
            return_attrs: DeclAttrs::default(),
            loc: SourceLocation::default(),
        }
    }

    /// The return value as a parameter-shaped declaration.
    pub fn return_decl(&self) -> ParamDecl {
        ParamDecl {
            id: self.id,
            name: self.name.clone(),
            ty: self.return_ty.clone(),
            attrs: self.return_attrs.clone(),
            direction: ParamDirection::Out,
            primitive: None,
            loc: self.loc,
        }
    }
}

/// An entry point and its stage metadata.
#[derive(Clone, Debug)]
pub struct EntryPointDecl {
    pub stage: ShaderStage,
    pub function: FunctionDecl,
    /// The hull shader's patch-constant function.
    pub patch_constant: Option<FunctionDecl>,
    /// The hull shader's `outputcontrolpoints` count.
    pub output_control_points: Option<u32>,
}

impl EntryPointDecl {
    pub fn new(stage: ShaderStage, function: FunctionDecl) -> Self {
        Self {
            stage,
            function,
            patch_constant: None,
            output_control_points: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packoffset_bytes() {
        let p = PackOffset {
            subcomponent: 2,
            component: 1,
        };
        assert_eq!(p.byte_offset(), 36);
    }

    #[test]
    fn return_decl_mirrors_function() {
        let mut f = FunctionDecl::new(7, "main");
        f.return_attrs = DeclAttrs::with_semantic("SV_Target");
        let ret = f.return_decl();
        assert_eq!(ret.id, DeclId(7));
        assert!(ret.is_output());
        assert!(!ret.is_input());
        assert_eq!(ret.attrs.semantic.as_deref(), Some("SV_Target"));
    }

    #[test]
    fn primitive_vertex_counts() {
        assert_eq!(InputPrimitive::TriangleAdj.vertex_count(), 6);
        assert_eq!(InputPrimitive::Line.vertex_count(), 2);
    }
}
