//! Target type table entries and their layout decorations.

use crate::arena::Handle;
use crate::global::StorageClass;

/// Width of a scalar type in bytes.
pub type Bytes = u8;

/// The kind of a scalar type.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum ScalarKind {
    Bool,
    Sint,
    Uint,
    Float,
}

/// A scalar type: kind + byte width.
///
/// Booleans have no physical size in the target; their width is nominal.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Scalar {
    pub kind: ScalarKind,
    pub width: Bytes,
}

impl Scalar {
    pub const BOOL: Self = Self {
        kind: ScalarKind::Bool,
        width: 1,
    };
    pub const I16: Self = Self {
        kind: ScalarKind::Sint,
        width: 2,
    };
    pub const U16: Self = Self {
        kind: ScalarKind::Uint,
        width: 2,
    };
    pub const F16: Self = Self {
        kind: ScalarKind::Float,
        width: 2,
    };
    pub const I32: Self = Self {
        kind: ScalarKind::Sint,
        width: 4,
    };
    pub const U32: Self = Self {
        kind: ScalarKind::Uint,
        width: 4,
    };
    pub const F32: Self = Self {
        kind: ScalarKind::Float,
        width: 4,
    };
    pub const I64: Self = Self {
        kind: ScalarKind::Sint,
        width: 8,
    };
    pub const U64: Self = Self {
        kind: ScalarKind::Uint,
        width: 8,
    };
    pub const F64: Self = Self {
        kind: ScalarKind::Float,
        width: 8,
    };

    /// Width in bits.
    pub fn bits(self) -> u32 {
        u32::from(self.width) * 8
    }
}

/// Number of components in a vector (or columns in a matrix).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum VectorSize {
    Bi = 2,
    Tri = 3,
    Quad = 4,
}

impl VectorSize {
    /// Returns the size for a component count of 2, 3, or 4.
    pub fn from_count(count: u32) -> Option<Self> {
        match count {
            2 => Some(Self::Bi),
            3 => Some(Self::Tri),
            4 => Some(Self::Quad),
            _ => None,
        }
    }
}

/// Dimensionality of an image type.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum ImageDim {
    D1,
    D2,
    D3,
    Cube,
    Buffer,
    SubpassData,
}

/// Texel format of a storage image.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum ImageFormat {
    Unknown,
    R32f,
    Rg32f,
    Rgba32f,
    R32i,
    Rg32i,
    Rgba32i,
    R32ui,
    Rg32ui,
    Rgba32ui,
}

/// A decoration attached to a type when it is created.
///
/// Member decorations carry the index of the struct member they apply to.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Decoration {
    Offset { member: u32, offset: u32 },
    ArrayStride(u32),
    MatrixStride { member: u32, stride: u32 },
    RowMajor { member: u32 },
    ColMajor { member: u32 },
    NonWritable { member: u32 },
    /// Uniform or push-constant block.
    Block,
    /// Storage block in the uniform storage class.
    BufferBlock,
}

/// A member of a struct type.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct StructMember {
    pub name: Option<String>,
    pub ty: Handle<Type>,
}

/// A type table entry.
///
/// Decorations are part of the entry's identity: the same shape laid out
/// under two different rules yields two distinct handles.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Type {
    pub name: Option<String>,
    pub inner: TypeInner,
    pub decorations: Vec<Decoration>,
}

impl Type {
    /// An unnamed, undecorated type.
    pub fn plain(inner: TypeInner) -> Self {
        Self {
            name: None,
            inner,
            decorations: Vec::new(),
        }
    }

    /// Returns the `ArrayStride` decoration, if present.
    pub fn array_stride(&self) -> Option<u32> {
        self.decorations.iter().find_map(|d| match *d {
            Decoration::ArrayStride(stride) => Some(stride),
            _ => None,
        })
    }

    /// Returns the `Offset` decoration of struct member `member`, if present.
    pub fn member_offset(&self, member: u32) -> Option<u32> {
        self.decorations.iter().find_map(|d| match *d {
            Decoration::Offset { member: m, offset } if m == member => Some(offset),
            _ => None,
        })
    }
}

/// A 32-bit unsigned constant, used for array lengths.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct Constant {
    pub ty: Handle<Type>,
    pub value: u32,
}

/// The shape of a target type.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum TypeInner {
    Void,
    Scalar(Scalar),
    Vector {
        size: VectorSize,
        scalar: Scalar,
    },
    /// A floating-point matrix of `columns` column vectors.
    Matrix {
        column: Handle<Type>,
        columns: VectorSize,
    },
    Array {
        base: Handle<Type>,
        length: Handle<Constant>,
    },
    RuntimeArray {
        base: Handle<Type>,
    },
    Struct {
        members: Vec<StructMember>,
    },
    Image {
        sampled_type: Handle<Type>,
        dim: ImageDim,
        /// 0 = not depth, 1 = depth, 2 = unknown.
        depth: u8,
        arrayed: bool,
        multisampled: bool,
        /// 1 = sampled, 2 = storage.
        sampled: u8,
        format: ImageFormat,
    },
    Sampler,
    Pointer {
        base: Handle<Type>,
        class: StorageClass,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::UniqueArena;

    #[test]
    fn scalar_widths() {
        assert_eq!(Scalar::F32.bits(), 32);
        assert_eq!(Scalar::F16.bits(), 16);
        assert_eq!(Scalar::U64.bits(), 64);
        assert_eq!(Scalar::I32.kind, ScalarKind::Sint);
    }

    #[test]
    fn vector_size_from_count() {
        assert_eq!(VectorSize::from_count(3), Some(VectorSize::Tri));
        assert_eq!(VectorSize::from_count(1), None);
        assert_eq!(VectorSize::from_count(5), None);
        assert_eq!(VectorSize::Quad as u32, 4);
    }

    #[test]
    fn decorations_distinguish_types() {
        let mut types = UniqueArena::new();
        let f32_ty = types.insert(Type::plain(TypeInner::Scalar(Scalar::F32)));
        let bare = types.insert(Type::plain(TypeInner::RuntimeArray { base: f32_ty }));
        let strided = types.insert(Type {
            name: None,
            inner: TypeInner::RuntimeArray { base: f32_ty },
            decorations: vec![Decoration::ArrayStride(4)],
        });
        let strided_again = types.insert(Type {
            name: None,
            inner: TypeInner::RuntimeArray { base: f32_ty },
            decorations: vec![Decoration::ArrayStride(4)],
        });
        assert_ne!(bare, strided);
        assert_eq!(strided, strided_again);
        assert_eq!(types[strided].array_stride(), Some(4));
        assert_eq!(types[bare].array_stride(), None);
    }

    #[test]
    fn member_offset_lookup() {
        let ty = Type {
            name: Some("S".into()),
            inner: TypeInner::Struct {
                members: Vec::new(),
            },
            decorations: vec![
                Decoration::Offset {
                    member: 0,
                    offset: 0,
                },
                Decoration::Offset {
                    member: 1,
                    offset: 16,
                },
            ],
        };
        assert_eq!(ty.member_offset(1), Some(16));
        assert_eq!(ty.member_offset(2), None);
    }
}
