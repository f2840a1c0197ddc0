//! Memory layout rules and alignment/size/stride computation.
//!
//! Everything here is a pure function of the source type, the layout rule,
//! and the compile options.

use std::fmt;

use spvx_ast::{DeclAttrs, Majorness, ResourceKind, ScalarType, SourceLocation, SourceType, StructDecl};

use crate::options::LowerOptions;

/// A memory layout policy.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum LayoutRule {
    /// No explicit layout: stage variables, private and function storage.
    Void,
    GlslStd140,
    GlslStd430,
    RelaxedGlslStd140,
    RelaxedGlslStd430,
    /// Scalar block layout.
    Scalar,
    /// Legacy fxc packing for cbuffer/tbuffer.
    FxcCtBuffer,
    /// Legacy fxc packing for structured buffers.
    FxcSBuffer,
}

impl LayoutRule {
    /// Rules that round struct, array, and matrix alignment up to 16.
    pub fn is_std140_family(self) -> bool {
        matches!(
            self,
            Self::GlslStd140 | Self::RelaxedGlslStd140 | Self::FxcCtBuffer
        )
    }

    /// Rules that let a vector take its element's alignment inside a struct.
    pub fn is_relaxed(self) -> bool {
        matches!(
            self,
            Self::RelaxedGlslStd140 | Self::RelaxedGlslStd430 | Self::FxcCtBuffer
        )
    }

    /// Rules where a vector's own alignment is its element's alignment.
    pub fn has_element_aligned_vectors(self) -> bool {
        matches!(self, Self::FxcCtBuffer | Self::FxcSBuffer | Self::Scalar)
    }

    /// Rules that pack arrays and matrices at element granularity.
    fn is_tight(self) -> bool {
        matches!(self, Self::FxcSBuffer | Self::Scalar)
    }

    /// Rules that pad a struct's size out to its alignment.
    fn pads_struct_tail(self) -> bool {
        !matches!(self, Self::FxcCtBuffer | Self::FxcSBuffer)
    }
}

impl fmt::Display for LayoutRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Alignment, size, and element stride of a laid-out type, in bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Layout {
    pub alignment: u32,
    pub size: u32,
    /// Array element stride for arrays, column/row vector stride for
    /// matrices, the size otherwise.
    pub stride: u32,
}

impl Layout {
    fn of_size(alignment: u32, size: u32) -> Self {
        Self {
            alignment,
            size,
            stride: size,
        }
    }

    /// Opaque types take no room inside a laid-out struct.
    const EMPTY: Self = Self {
        alignment: 1,
        size: 0,
        stride: 0,
    };
}

/// Rounds `value` up to a multiple of `align`.
pub fn round_up(value: u32, align: u32) -> u32 {
    if align == 0 {
        return value;
    }
    value.div_ceil(align) * align
}

/// Resolves the bit width a scalar is stored with.
///
/// Literals take the width of a compatible expected type when one is
/// given; an integer hint never applies to a float literal or vice versa.
pub fn element_bitwidth(
    scalar: ScalarType,
    hint: Option<ScalarType>,
    options: &LowerOptions,
) -> u32 {
    let half_bits = if options.enable_16bit_types { 16 } else { 32 };
    match scalar {
        ScalarType::Bool => 32,
        ScalarType::Int { bits, .. } => bits,
        ScalarType::Float { bits: 16 } => half_bits,
        ScalarType::Float { bits } => bits,
        ScalarType::MinInt { .. } | ScalarType::MinFloat => half_bits,
        ScalarType::LiteralInt { bits } => match hint {
            Some(h) if h.is_integer() && !h.is_literal() => element_bitwidth(h, None, options),
            _ if bits > 32 => 64,
            _ => 32,
        },
        ScalarType::LiteralFloat { bits } => match hint {
            Some(h) if h.is_float() && !h.is_literal() => element_bitwidth(h, None, options),
            _ if bits <= 32 => 32,
            _ => 64,
        },
    }
}

fn scalar_layout(scalar: ScalarType, options: &LowerOptions) -> Layout {
    let size = element_bitwidth(scalar, None, options) / 8;
    Layout::of_size(size, size)
}

fn vector_layout(elem: ScalarType, count: u32, rule: LayoutRule, options: &LowerOptions) -> Layout {
    let scalar = scalar_layout(elem, options);
    if count == 1 {
        return scalar;
    }
    let alignment = if rule.has_element_aligned_vectors() {
        scalar.alignment
    } else {
        scalar.size * if count == 3 { 4 } else { count }
    };
    Layout::of_size(alignment, scalar.size * count)
}

fn matrix_layout(
    elem: ScalarType,
    rows: u32,
    cols: u32,
    rule: LayoutRule,
    row_major: bool,
    options: &LowerOptions,
) -> Layout {
    if rows == 1 || cols == 1 {
        return vector_layout(elem, rows * cols, rule, options);
    }
    let scalar = scalar_layout(elem, options);
    let vec_storage = if row_major { cols } else { rows };
    if rule.is_tight() {
        return Layout {
            alignment: scalar.alignment,
            size: rows * cols * scalar.size,
            stride: vec_storage * scalar.size,
        };
    }
    let mut alignment = scalar.alignment * if vec_storage == 3 { 4 } else { vec_storage };
    if rule.is_std140_family() {
        alignment = round_up(alignment, 16);
    }
    let count = if row_major { rows } else { cols };
    Layout {
        alignment,
        size: count * alignment,
        stride: alignment,
    }
}

fn array_layout(elem: Layout, len: Option<u32>, rule: LayoutRule) -> Layout {
    let count = len.unwrap_or(0);
    if rule.is_tight() {
        return Layout {
            alignment: elem.alignment,
            size: elem.size * count,
            stride: elem.size,
        };
    }
    let mut alignment = elem.alignment;
    if rule.is_std140_family() {
        alignment = round_up(alignment, 16);
    }
    if rule == LayoutRule::FxcCtBuffer {
        let stride = round_up(elem.size, alignment);
        let size = if count == 0 {
            0
        } else {
            elem.size + stride * (count - 1)
        };
        return Layout {
            alignment,
            size,
            stride,
        };
    }
    let stride = round_up(elem.size, alignment);
    Layout {
        alignment,
        size: round_up(stride * count, alignment),
        stride,
    }
}

/// True when a vector placed at `offset` would cross a 16-byte boundary in
/// a way the relaxed rules do not allow.
fn improper_straddle(size: u32, offset: u32) -> bool {
    if size <= 16 {
        offset / 16 != (offset + size - 1) / 16
    } else {
        offset % 16 != 0
    }
}

fn vector_element(ty: &SourceType) -> Option<ScalarType> {
    match ty.desugar().0 {
        SourceType::Vector { elem, count } if *count > 1 => Some(*elem),
        SourceType::Matrix { elem, rows, cols }
            if (*rows == 1) != (*cols == 1) =>
        {
            Some(*elem)
        }
        _ => None,
    }
}

/// Computes the layout of `ty` under `rule`.
pub fn layout(ty: &SourceType, rule: LayoutRule, options: &LowerOptions) -> Layout {
    let (shape, majorness) = ty.desugar();
    layout_with(shape, rule, majorness, options)
}

/// Computes the layout of an already desugared type with the majorness
/// found while desugaring it.
pub(crate) fn layout_with(
    ty: &SourceType,
    rule: LayoutRule,
    majorness: Option<Majorness>,
    options: &LowerOptions,
) -> Layout {
    match ty {
        SourceType::Void => Layout::EMPTY,
        SourceType::Scalar(s) => scalar_layout(*s, options),
        SourceType::Vector { elem, count } => vector_layout(*elem, *count, rule, options),
        SourceType::Matrix { elem, rows, cols } => {
            let row_major = is_row_major(majorness, options);
            matrix_layout(*elem, *rows, *cols, rule, row_major, options)
        }
        SourceType::Array { elem, len } => {
            let (inner, inner_majorness) = elem.desugar();
            let elem_layout = layout_with(inner, rule, inner_majorness.or(majorness), options);
            array_layout(elem_layout, *len, rule)
        }
        SourceType::Struct(decl) => struct_layout(decl, rule, options).layout,
        SourceType::Resource {
            kind: ResourceKind::InputPatch { count } | ResourceKind::OutputPatch { count },
            elem: Some(elem),
        } => array_layout(layout(elem, rule, options), Some(*count), rule),
        SourceType::Resource {
            kind: ResourceKind::Stream { .. },
            elem: Some(elem),
        } => layout(elem, rule, options),
        SourceType::Resource { .. } => Layout::EMPTY,
        SourceType::Alias { .. } | SourceType::Oriented { .. } => layout(ty, rule, options),
    }
}

/// Resolves a matrix's storage order against the compile default.
pub(crate) fn is_row_major(majorness: Option<Majorness>, options: &LowerOptions) -> bool {
    match majorness {
        Some(Majorness::RowMajor) => true,
        Some(Majorness::ColumnMajor) => false,
        None => options.default_row_major,
    }
}

/// Where one struct member landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct MemberLayout {
    pub offset: u32,
    pub layout: Layout,
}

/// An explicit offset that would overlap the previous member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Overlap {
    pub member: String,
    pub requested: u32,
    pub next_free: u32,
    pub packoffset: bool,
    pub loc: SourceLocation,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct StructLayout {
    /// One entry per member; the base struct, when present, comes first.
    pub members: Vec<MemberLayout>,
    pub overlaps: Vec<Overlap>,
    pub layout: Layout,
}

/// A struct member as seen by the layout pass.
pub(crate) struct MemberRef<'a> {
    pub name: &'a str,
    pub ty: &'a SourceType,
    pub attrs: Option<&'a DeclAttrs>,
    pub loc: SourceLocation,
}

pub(crate) fn members_of(decl: &StructDecl) -> Vec<MemberRef<'_>> {
    let base = decl.base.iter().map(|ty| MemberRef {
        name: "",
        ty,
        attrs: None,
        loc: SourceLocation::default(),
    });
    let fields = decl.fields.iter().map(|f| MemberRef {
        name: &f.name,
        ty: &f.ty,
        attrs: Some(&f.attrs),
        loc: f.loc,
    });
    base.chain(fields).collect()
}

pub(crate) fn struct_layout(decl: &StructDecl, rule: LayoutRule, options: &LowerOptions) -> StructLayout {
    members_layout(&members_of(decl), rule, options)
}

/// Places members in declaration order.
pub(crate) fn members_layout(
    members: &[MemberRef<'_>],
    rule: LayoutRule,
    options: &LowerOptions,
) -> StructLayout {
    if members.is_empty() {
        return StructLayout {
            layout: Layout::EMPTY,
            ..StructLayout::default()
        };
    }

    let mut out = StructLayout::default();
    let mut max_align = 0;
    let mut next_free = 0;
    for member in members {
        let member_layout = layout(member.ty, rule, options);
        let mut align = member_layout.alignment;
        let mut offset = next_free;

        match vector_element(member.ty) {
            Some(elem) if rule.is_relaxed() => {
                let elem_align = scalar_layout(elem, options).alignment;
                if elem_align <= 4 {
                    align = elem_align;
                }
                offset = round_up(offset, align);
                if improper_straddle(member_layout.size, offset) {
                    align = 16;
                    offset = round_up(offset, align);
                }
            }
            _ => offset = round_up(offset, align),
        }

        let explicit = member.attrs.and_then(|a| match (a.offset, a.packoffset) {
            (Some(bytes), _) => Some((bytes, false)),
            (None, Some(pack)) => Some((pack.byte_offset(), true)),
            (None, None) => None,
        });
        if let Some((requested, packoffset)) = explicit {
            if requested < next_free {
                out.overlaps.push(Overlap {
                    member: member.name.to_string(),
                    requested,
                    next_free,
                    packoffset,
                    loc: member.loc,
                });
            } else {
                offset = requested;
            }
        }

        // Relaxed packing only moves the member; the struct keeps the
        // member's natural alignment.
        max_align = max_align.max(member_layout.alignment);
        out.members.push(MemberLayout {
            offset,
            layout: member_layout,
        });
        next_free = offset + member_layout.size;
    }

    let mut size = next_free;
    if rule != LayoutRule::Scalar {
        if rule.is_std140_family() {
            max_align = round_up(max_align, 16);
        }
        if rule.pads_struct_tail() {
            size = round_up(size, max_align);
        }
    }
    out.layout = Layout::of_size(max_align, size);
    out
}
