//! Source-level type shapes.

use std::fmt;
use std::rc::Rc;

use crate::decl::FieldDecl;

/// A source scalar type.
///
/// Widths are in bits.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum ScalarType {
    Bool,
    Int { bits: u32, signed: bool },
    /// `half` is `Float { bits: 16 }`; it is 32 bits wide unless 16-bit
    /// types are enabled.
    Float { bits: u32 },
    /// `min16int`, `min12int`, `min16uint`.
    MinInt { signed: bool },
    /// `min16float`, `min10float`.
    MinFloat,
    /// An integer literal whose type is not pinned yet.
    LiteralInt { bits: u32 },
    /// A floating-point literal whose type is not pinned yet.
    LiteralFloat { bits: u32 },
}

impl ScalarType {
    pub const BOOL: Self = Self::Bool;
    pub const INT: Self = Self::Int {
        bits: 32,
        signed: true,
    };
    pub const UINT: Self = Self::Int {
        bits: 32,
        signed: false,
    };
    pub const FLOAT: Self = Self::Float { bits: 32 };
    pub const HALF: Self = Self::Float { bits: 16 };
    pub const DOUBLE: Self = Self::Float { bits: 64 };

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Int { .. } | Self::MinInt { .. } | Self::LiteralInt { .. }
        )
    }

    pub fn is_float(self) -> bool {
        matches!(
            self,
            Self::Float { .. } | Self::MinFloat | Self::LiteralFloat { .. }
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(self, Self::LiteralInt { .. } | Self::LiteralFloat { .. })
    }

    pub fn is_min_precision(self) -> bool {
        matches!(self, Self::MinInt { .. } | Self::MinFloat)
    }

    pub fn is_signed(self) -> bool {
        match self {
            Self::Int { signed, .. } | Self::MinInt { signed } => signed,
            Self::LiteralInt { .. } => true,
            _ => false,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Bool => f.write_str("bool"),
            Self::Int { bits: 32, signed } => f.write_str(if signed { "int" } else { "uint" }),
            Self::Int { bits: 64, signed } => f.write_str(if signed { "int64_t" } else { "uint64_t" }),
            Self::Int { bits, signed } => {
                write!(f, "{}int{bits}_t", if signed { "" } else { "u" })
            }
            Self::Float { bits: 16 } => f.write_str("half"),
            Self::Float { bits: 32 } => f.write_str("float"),
            Self::Float { bits: 64 } => f.write_str("double"),
            Self::Float { bits } => write!(f, "float{bits}_t"),
            Self::MinInt { signed } => f.write_str(if signed { "min16int" } else { "min16uint" }),
            Self::MinFloat => f.write_str("min16float"),
            Self::LiteralInt { .. } => f.write_str("literal int"),
            Self::LiteralFloat { .. } => f.write_str("literal float"),
        }
    }
}

/// Matrix storage order written in source.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Majorness {
    RowMajor,
    ColumnMajor,
}

/// Texture dimensionality.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum TextureDim {
    D1,
    D2,
    D3,
    Cube,
}

/// Primitive topology of a geometry-shader output stream.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum StreamPrimitive {
    Point,
    Line,
    Triangle,
}

/// The closed set of resource kinds the front end can tag a type with.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum ResourceKind {
    Texture {
        dim: TextureDim,
        arrayed: bool,
        multisampled: bool,
        rw: bool,
    },
    /// `Buffer<T>` / `RWBuffer<T>`.
    Buffer { rw: bool },
    Sampler { comparison: bool },
    StructuredBuffer,
    RWStructuredBuffer,
    AppendStructuredBuffer,
    ConsumeStructuredBuffer,
    ByteAddressBuffer { rw: bool },
    ConstantBuffer,
    TextureBuffer,
    InputPatch { count: u32 },
    OutputPatch { count: u32 },
    Stream { primitive: StreamPrimitive },
    SubpassInput { multisampled: bool },
}

impl ResourceKind {
    /// Structured buffers that carry a hidden counter.
    pub fn has_counter(self) -> bool {
        matches!(
            self,
            Self::RWStructuredBuffer | Self::AppendStructuredBuffer | Self::ConsumeStructuredBuffer
        )
    }

    pub fn is_structured_buffer(self) -> bool {
        matches!(self, Self::StructuredBuffer) || self.has_counter()
    }

    /// Structured and byte-address buffers: the kinds a local variable can
    /// alias.
    pub fn is_aliasable_buffer(self) -> bool {
        self.is_structured_buffer() || matches!(self, Self::ByteAddressBuffer { .. })
    }

    /// Patches and streams only describe stage interfaces; they never become
    /// resource variables.
    pub fn is_stage_io(self) -> bool {
        matches!(
            self,
            Self::InputPatch { .. } | Self::OutputPatch { .. } | Self::Stream { .. }
        )
    }

    pub fn is_ct_buffer(self) -> bool {
        matches!(self, Self::ConstantBuffer | Self::TextureBuffer)
    }

    /// Source spelling, used in type names and messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Texture {
                dim,
                arrayed,
                multisampled,
                rw,
            } => match (dim, arrayed, multisampled, rw) {
                (TextureDim::D1, false, _, false) => "Texture1D",
                (TextureDim::D1, true, _, false) => "Texture1DArray",
                (TextureDim::D2, false, false, false) => "Texture2D",
                (TextureDim::D2, true, false, false) => "Texture2DArray",
                (TextureDim::D2, false, true, _) => "Texture2DMS",
                (TextureDim::D2, true, true, _) => "Texture2DMSArray",
                (TextureDim::D3, _, _, false) => "Texture3D",
                (TextureDim::Cube, false, _, _) => "TextureCube",
                (TextureDim::Cube, true, _, _) => "TextureCubeArray",
                (TextureDim::D1, false, _, true) => "RWTexture1D",
                (TextureDim::D1, true, _, true) => "RWTexture1DArray",
                (TextureDim::D2, false, false, true) => "RWTexture2D",
                (TextureDim::D2, true, false, true) => "RWTexture2DArray",
                (TextureDim::D3, _, _, true) => "RWTexture3D",
            },
            Self::Buffer { rw: false } => "Buffer",
            Self::Buffer { rw: true } => "RWBuffer",
            Self::Sampler { comparison: false } => "SamplerState",
            Self::Sampler { comparison: true } => "SamplerComparisonState",
            Self::StructuredBuffer => "StructuredBuffer",
            Self::RWStructuredBuffer => "RWStructuredBuffer",
            Self::AppendStructuredBuffer => "AppendStructuredBuffer",
            Self::ConsumeStructuredBuffer => "ConsumeStructuredBuffer",
            Self::ByteAddressBuffer { rw: false } => "ByteAddressBuffer",
            Self::ByteAddressBuffer { rw: true } => "RWByteAddressBuffer",
            Self::ConstantBuffer => "ConstantBuffer",
            Self::TextureBuffer => "TextureBuffer",
            Self::InputPatch { .. } => "InputPatch",
            Self::OutputPatch { .. } => "OutputPatch",
            Self::Stream {
                primitive: StreamPrimitive::Point,
            } => "PointStream",
            Self::Stream {
                primitive: StreamPrimitive::Line,
            } => "LineStream",
            Self::Stream {
                primitive: StreamPrimitive::Triangle,
            } => "TriangleStream",
            Self::SubpassInput {
                multisampled: false,
            } => "SubpassInput",
            Self::SubpassInput { multisampled: true } => "SubpassInputMS",
        }
    }
}

/// A user-defined struct.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct StructDecl {
    pub name: String,
    /// A base struct whose fields precede this struct's own fields.
    pub base: Option<SourceType>,
    pub fields: Vec<FieldDecl>,
}

/// A source type expression.
///
/// `Alias` and `Oriented` are qualifier wrappers: translation strips them
/// before looking at the shape underneath.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum SourceType {
    Void,
    Scalar(ScalarType),
    /// A vector of `count` components. A count of 1 is a scalar.
    Vector { elem: ScalarType, count: u32 },
    /// A `rows x cols` matrix.
    Matrix {
        elem: ScalarType,
        rows: u32,
        cols: u32,
    },
    /// A fixed array, or a runtime-length one when `len` is `None`.
    Array {
        elem: Box<SourceType>,
        len: Option<u32>,
    },
    Struct(Rc<StructDecl>),
    Resource {
        kind: ResourceKind,
        elem: Option<Box<SourceType>>,
    },
    /// A typedef.
    Alias { name: String, ty: Box<SourceType> },
    /// A `row_major` / `column_major` annotated type.
    Oriented {
        majorness: Majorness,
        ty: Box<SourceType>,
    },
}

impl SourceType {
    pub fn scalar(elem: ScalarType) -> Self {
        Self::Scalar(elem)
    }

    pub fn vector(elem: ScalarType, count: u32) -> Self {
        Self::Vector { elem, count }
    }

    pub fn matrix(elem: ScalarType, rows: u32, cols: u32) -> Self {
        Self::Matrix { elem, rows, cols }
    }

    pub fn array(elem: SourceType, len: u32) -> Self {
        Self::Array {
            elem: Box::new(elem),
            len: Some(len),
        }
    }

    pub fn runtime_array(elem: SourceType) -> Self {
        Self::Array {
            elem: Box::new(elem),
            len: None,
        }
    }

    pub fn structure(decl: StructDecl) -> Self {
        Self::Struct(Rc::new(decl))
    }

    pub fn resource(kind: ResourceKind, elem: Option<SourceType>) -> Self {
        Self::Resource {
            kind,
            elem: elem.map(Box::new),
        }
    }

    pub fn alias(name: impl Into<String>, ty: SourceType) -> Self {
        Self::Alias {
            name: name.into(),
            ty: Box::new(ty),
        }
    }

    pub fn oriented(majorness: Majorness, ty: SourceType) -> Self {
        Self::Oriented {
            majorness,
            ty: Box::new(ty),
        }
    }

    /// Strips typedefs and majorness annotations, returning the shape
    /// underneath and the outermost majorness annotation seen on the way.
    pub fn desugar(&self) -> (&SourceType, Option<Majorness>) {
        let mut ty = self;
        let mut majorness = None;
        loop {
            match ty {
                Self::Alias { ty: inner, .. } => ty = inner,
                Self::Oriented {
                    majorness: m,
                    ty: inner,
                } => {
                    majorness.get_or_insert(*m);
                    ty = inner;
                }
                _ => return (ty, majorness),
            }
        }
    }

    /// The scalar element of a scalar, vector, or matrix type.
    pub fn element_scalar(&self) -> Option<ScalarType> {
        match self.desugar().0 {
            Self::Scalar(s) | Self::Vector { elem: s, .. } | Self::Matrix { elem: s, .. } => {
                Some(*s)
            }
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.desugar().0, Self::Void)
    }

    pub fn as_struct(&self) -> Option<&Rc<StructDecl>> {
        match self.desugar().0 {
            Self::Struct(decl) => Some(decl),
            _ => None,
        }
    }

    pub fn as_resource(&self) -> Option<(ResourceKind, Option<&SourceType>)> {
        match self.desugar().0 {
            Self::Resource { kind, elem } => Some((*kind, elem.as_deref())),
            _ => None,
        }
    }

    /// True for a float matrix with more than one row and column.
    pub fn is_float_matrix(&self) -> bool {
        matches!(
            self.desugar().0,
            Self::Matrix { elem, rows, cols } if elem.is_float() && *rows > 1 && *cols > 1
        )
    }

    /// True for a float matrix or a (nested) array of float matrices.
    pub fn is_float_matrix_or_array_of(&self) -> bool {
        match self.desugar().0 {
            Self::Array { elem, .. } => elem.is_float_matrix_or_array_of(),
            _ => self.is_float_matrix(),
        }
    }

    /// True if this type is, or transitively contains, a structured or
    /// byte-address buffer.
    pub fn contains_aliasable_buffer(&self) -> bool {
        match self.desugar().0 {
            Self::Resource { kind, .. } => kind.is_aliasable_buffer(),
            Self::Array { elem, .. } => elem.contains_aliasable_buffer(),
            Self::Struct(decl) => {
                decl.base
                    .as_ref()
                    .is_some_and(|b| b.contains_aliasable_buffer())
                    || decl.fields.iter().any(|f| f.ty.contains_aliasable_buffer())
            }
            _ => false,
        }
    }

    /// True for any resource type or array of resources.
    pub fn is_resource_or_array_of(&self) -> bool {
        match self.desugar().0 {
            Self::Resource { kind, .. } => !kind.is_stage_io(),
            Self::Array { elem, .. } => elem.is_resource_or_array_of(),
            _ => false,
        }
    }

    /// Bool scalars and vectors become 32-bit unsigned integers; used for
    /// stage interface variables, which cannot hold booleans.
    pub fn with_bool_as_uint(&self) -> SourceType {
        let fix = |s: ScalarType| match s {
            ScalarType::Bool => ScalarType::UINT,
            other => other,
        };
        match self {
            Self::Scalar(s) => Self::Scalar(fix(*s)),
            Self::Vector { elem, count } => Self::Vector {
                elem: fix(*elem),
                count: *count,
            },
            Self::Matrix { elem, rows, cols } => Self::Matrix {
                elem: fix(*elem),
                rows: *rows,
                cols: *cols,
            },
            Self::Array { elem, len } => Self::Array {
                elem: Box::new(elem.with_bool_as_uint()),
                len: *len,
            },
            Self::Alias { name, ty } => Self::Alias {
                name: name.clone(),
                ty: Box::new(ty.with_bool_as_uint()),
            },
            Self::Oriented { majorness, ty } => Self::Oriented {
                majorness: *majorness,
                ty: Box::new(ty.with_bool_as_uint()),
            },
            other => other.clone(),
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Scalar(s) => write!(f, "{s}"),
            Self::Vector { elem, count } => write!(f, "{elem}{count}"),
            Self::Matrix { elem, rows, cols } => write!(f, "{elem}{rows}x{cols}"),
            Self::Array {
                elem,
                len: Some(n),
            } => write!(f, "{elem}[{n}]"),
            Self::Array { elem, len: None } => write!(f, "{elem}[]"),
            Self::Struct(decl) => f.write_str(&decl.name),
            Self::Resource {
                kind,
                elem: Some(elem),
            } => write!(f, "{}<{elem}>", kind.name()),
            Self::Resource { kind, elem: None } => f.write_str(kind.name()),
            Self::Alias { name, .. } => f.write_str(name),
            Self::Oriented {
                majorness: Majorness::RowMajor,
                ty,
            } => write!(f, "row_major {ty}"),
            Self::Oriented {
                majorness: Majorness::ColumnMajor,
                ty,
            } => write!(f, "column_major {ty}"),
        }
    }
}

/// True when two types have the same shape once qualifiers are stripped.
pub fn is_same_type(a: &SourceType, b: &SourceType) -> bool {
    let (a, _) = a.desugar();
    let (b, _) = b.desugar();
    match (a, b) {
        (SourceType::Array { elem: ea, len: la }, SourceType::Array { elem: eb, len: lb }) => {
            la == lb && is_same_type(ea, eb)
        }
        _ => a == b,
    }
}

/// True when two scalars can share one storage type: equal scalars, a
/// literal int against any non-bool integer, or a literal float against any
/// float.
pub fn can_treat_as_same_scalar(a: ScalarType, b: ScalarType) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (ScalarType::LiteralInt { .. }, other) | (other, ScalarType::LiteralInt { .. }) => {
            other.is_integer()
        }
        (ScalarType::LiteralFloat { .. }, other) | (other, ScalarType::LiteralFloat { .. }) => {
            other.is_float()
        }
        _ => false,
    }
}
