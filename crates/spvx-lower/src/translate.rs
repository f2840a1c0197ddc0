//! Type & layout translation: source type shapes to decorated IR types.
//!
//! [`TypeTranslator`] owns the module under construction and the
//! diagnostics sink for one compile. Every other lowering component reaches
//! the module through it.

use std::collections::HashMap;

use spvx_ast::{
    Majorness, ResourceKind, ScalarType, SourceLocation, SourceType, StructDecl, TextureDim,
    can_treat_as_same_scalar,
};
use spvx_ir::{
    Capability, Decoration, Extension, Handle, ImageDim, ImageFormat, Module, Scalar, ScalarKind,
    StorageClass, StructMember, Type, TypeInner, VectorSize,
};

use crate::layout::{self, Layout, LayoutRule, MemberRef};
use crate::{Diagnostics, LowerError, LowerOptions};

/// Block-level decoration of a struct built by
/// [`TypeTranslator::struct_type`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    /// An ordinary struct.
    Plain,
    /// A uniform or push-constant block.
    Block,
    /// A storage block; `read_only` marks every member `NonWritable`.
    BufferBlock { read_only: bool },
}

type CacheKey = (SourceType, LayoutRule, Option<Majorness>);

// ---------------------------------------------------------------------------
// Translator
// ---------------------------------------------------------------------------

/// Maps source types to IR type handles under a layout rule.
pub struct TypeTranslator {
    pub(crate) module: Module,
    pub(crate) diags: Diagnostics,
    pub(crate) options: LowerOptions,
    cache: HashMap<CacheKey, Handle<Type>>,
    loc: SourceLocation,
}

impl TypeTranslator {
    pub fn new(options: LowerOptions) -> Self {
        let mut module = Module::new();
        module.require_capability(Capability::Shader);
        Self {
            module,
            diags: Diagnostics::new(),
            options,
            cache: HashMap::new(),
            loc: SourceLocation::default(),
        }
    }

    /// Sets the location diagnostics raised during translation point at.
    pub fn set_location(&mut self, loc: SourceLocation) {
        self.loc = loc;
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diags
    }

    pub fn options(&self) -> &LowerOptions {
        &self.options
    }

    pub fn into_parts(self) -> (Module, Diagnostics) {
        (self.module, self.diags)
    }

    /// Translates `ty` under `rule`.
    ///
    /// Structurally identical types translated under the same rule yield the
    /// same handle.
    pub fn translate(&mut self, ty: &SourceType, rule: LayoutRule) -> Result<Handle<Type>, LowerError> {
        self.translate_hinted(ty, rule, None)
    }

    /// Translates `ty` under `rule`, resolving literal widths against the
    /// expected type `hint`.
    pub fn translate_hinted(
        &mut self,
        ty: &SourceType,
        rule: LayoutRule,
        hint: Option<&SourceType>,
    ) -> Result<Handle<Type>, LowerError> {
        let (shape, majorness) = ty.desugar();
        let hint = hint.and_then(SourceType::element_scalar);
        self.translate_shape(shape, rule, majorness, hint)
    }

    /// Computes alignment, size, and stride of `ty` under `rule`.
    pub fn layout(&self, ty: &SourceType, rule: LayoutRule) -> Layout {
        layout::layout(ty, rule, &self.options)
    }

    /// Bit width `scalar` is stored with, given an optional expected type.
    pub fn element_bitwidth(&self, scalar: ScalarType, hint: Option<&SourceType>) -> u32 {
        let hint = hint.and_then(SourceType::element_scalar);
        layout::element_bitwidth(scalar, hint, &self.options)
    }

    /// Number of stage interface locations a value of `ty` occupies.
    pub fn location_count(&self, ty: &SourceType) -> u32 {
        match ty.desugar().0 {
            SourceType::Void => 0,
            SourceType::Scalar(_) => 1,
            SourceType::Vector { elem, count } => self.vector_locations(*elem, *count),
            SourceType::Matrix { elem, rows, cols } => {
                if *rows == 1 || *cols == 1 {
                    self.vector_locations(*elem, rows * cols)
                } else {
                    rows * self.vector_locations(*elem, *cols)
                }
            }
            SourceType::Array { elem, len } => len.unwrap_or(1) * self.location_count(elem),
            SourceType::Struct(decl) => {
                let base = decl.base.as_ref().map_or(0, |b| self.location_count(b));
                base + decl
                    .fields
                    .iter()
                    .map(|f| self.location_count(&f.ty))
                    .sum::<u32>()
            }
            SourceType::Resource { .. } => 1,
            SourceType::Alias { .. } | SourceType::Oriented { .. } => 1,
        }
    }

    fn vector_locations(&self, elem: ScalarType, count: u32) -> u32 {
        let wide = layout::element_bitwidth(elem, None, &self.options) == 64;
        if wide && count >= 3 { 2 } else { 1 }
    }

    /// True for minimum-precision scalars, vectors, matrices, and arrays of
    /// them when 16-bit types are off.
    pub fn is_relaxed_precision(&self, ty: &SourceType) -> bool {
        if self.options.enable_16bit_types {
            return false;
        }
        match ty.desugar().0 {
            SourceType::Array { elem, .. } => self.is_relaxed_precision(elem),
            other => other.element_scalar().is_some_and(ScalarType::is_min_precision),
        }
    }

    /// The hidden counter block paired with append/consume buffers.
    pub fn counter_type(&mut self) -> Handle<Type> {
        let i32_ty = self.module.scalar_type(Scalar::I32);
        self.module.insert_type(Type {
            name: Some("type.ACSBuffer.counter".into()),
            inner: TypeInner::Struct {
                members: vec![StructMember {
                    name: Some("counter".into()),
                    ty: i32_ty,
                }],
            },
            decorations: vec![Decoration::Offset { member: 0, offset: 0 }, Decoration::BufferBlock],
        })
    }
}

// ---------------------------------------------------------------------------
// Shapes
// ---------------------------------------------------------------------------

impl TypeTranslator {
    fn translate_shape(
        &mut self,
        shape: &SourceType,
        rule: LayoutRule,
        majorness: Option<Majorness>,
        hint: Option<ScalarType>,
    ) -> Result<Handle<Type>, LowerError> {
        let key = (shape.clone(), rule, majorness);
        if hint.is_none() {
            if let Some(&handle) = self.cache.get(&key) {
                return Ok(handle);
            }
        }

        let handle = match shape {
            SourceType::Void => self.module.plain_type(TypeInner::Void),
            SourceType::Scalar(s) => {
                let scalar = self.scalar(*s, rule, hint);
                self.module.scalar_type(scalar)
            }
            SourceType::Vector { elem, count } => self.vector(*elem, *count, rule, hint)?,
            SourceType::Matrix { elem, rows, cols } => {
                self.matrix(*elem, *rows, *cols, rule, majorness, hint)?
            }
            SourceType::Array { elem, len } => self.array(elem, *len, rule, majorness, hint)?,
            SourceType::Struct(decl) => {
                let members = layout::members_of(decl);
                self.struct_type(&decl.name, &members, rule, BlockKind::Plain)?
            }
            SourceType::Resource { kind, elem } => self.resource(*kind, elem.as_deref(), rule)?,
            SourceType::Alias { .. } | SourceType::Oriented { .. } => {
                let (inner, inner_majorness) = shape.desugar();
                self.translate_shape(inner, rule, inner_majorness.or(majorness), hint)?
            }
        };

        log::trace!("translated {shape} under {rule} -> {handle:?}");
        if hint.is_none() {
            self.cache.insert(key, handle);
        }
        Ok(handle)
    }

    /// Resolves the stored scalar for `s`, recording any width capability.
    fn scalar(&mut self, s: ScalarType, rule: LayoutRule, hint: Option<ScalarType>) -> Scalar {
        let kind = match s {
            ScalarType::Bool if rule == LayoutRule::Void => return Scalar::BOOL,
            ScalarType::Bool => return Scalar::U32,
            ScalarType::LiteralInt { .. } => match hint {
                Some(h) if h.is_integer() && !h.is_literal() => int_kind(h.is_signed()),
                _ => ScalarKind::Sint,
            },
            ScalarType::Int { signed, .. } | ScalarType::MinInt { signed } => int_kind(signed),
            ScalarType::Float { .. } | ScalarType::MinFloat | ScalarType::LiteralFloat { .. } => {
                ScalarKind::Float
            }
        };
        let bits = layout::element_bitwidth(s, hint, &self.options);
        match (kind, bits) {
            (ScalarKind::Float, 16) => self.module.require_capability(Capability::Float16),
            (ScalarKind::Float, 64) => self.module.require_capability(Capability::Float64),
            (_, 16) => self.module.require_capability(Capability::Int16),
            (_, 64) => self.module.require_capability(Capability::Int64),
            _ => {}
        }
        Scalar {
            kind,
            width: (bits / 8) as u8,
        }
    }

    fn vector(
        &mut self,
        elem: ScalarType,
        count: u32,
        rule: LayoutRule,
        hint: Option<ScalarType>,
    ) -> Result<Handle<Type>, LowerError> {
        let scalar = self.scalar(elem, rule, hint);
        if count == 1 {
            return Ok(self.module.scalar_type(scalar));
        }
        let size = self.vector_size(count)?;
        Ok(self.module.plain_type(TypeInner::Vector { size, scalar }))
    }

    fn vector_size(&mut self, count: u32) -> Result<VectorSize, LowerError> {
        VectorSize::from_count(count)
            .ok_or_else(|| self.diags.fatal(format!("unsupported vector size {count}"), self.loc))
    }

    fn matrix(
        &mut self,
        elem: ScalarType,
        rows: u32,
        cols: u32,
        rule: LayoutRule,
        majorness: Option<Majorness>,
        hint: Option<ScalarType>,
    ) -> Result<Handle<Type>, LowerError> {
        if rows == 1 || cols == 1 {
            return self.vector(elem, rows * cols, rule, hint);
        }

        // A source row becomes a target column.
        let row = self.vector(elem, cols, rule, hint)?;
        if elem.is_float() {
            let columns = self.vector_size(rows)?;
            return Ok(self.module.plain_type(TypeInner::Matrix {
                column: row,
                columns,
            }));
        }

        let length = self.module.constant_u32(rows);
        let mut decorations = Vec::new();
        if rule != LayoutRule::Void {
            let shape = SourceType::matrix(elem, rows, cols);
            let stride = layout::layout_with(&shape, rule, majorness, &self.options).stride;
            decorations.push(Decoration::ArrayStride(stride));
        }
        Ok(self.module.insert_type(Type {
            name: None,
            inner: TypeInner::Array { base: row, length },
            decorations,
        }))
    }

    fn array(
        &mut self,
        elem: &SourceType,
        len: Option<u32>,
        rule: LayoutRule,
        majorness: Option<Majorness>,
        hint: Option<ScalarType>,
    ) -> Result<Handle<Type>, LowerError> {
        let (elem_shape, elem_majorness) = elem.desugar();
        let elem_majorness = elem_majorness.or(majorness);
        let base = self.translate_shape(elem_shape, rule, elem_majorness, hint)?;

        let is_resource = elem.is_resource_or_array_of();
        let mut decorations = Vec::new();
        if rule != LayoutRule::Void && !is_resource {
            let shape = SourceType::Array {
                elem: Box::new(elem.clone()),
                len,
            };
            let stride = layout::layout_with(&shape, rule, majorness, &self.options).stride;
            decorations.push(Decoration::ArrayStride(stride));
        }

        let inner = match len {
            Some(n) => {
                let length = self.module.constant_u32(n);
                TypeInner::Array { base, length }
            }
            None => {
                if is_resource {
                    self.module.add_extension(Extension::DescriptorIndexing);
                    self.module
                        .require_capability(Capability::RuntimeDescriptorArrayEXT);
                }
                TypeInner::RuntimeArray { base }
            }
        };
        Ok(self.module.insert_type(Type {
            name: None,
            inner,
            decorations,
        }))
    }
}

// ---------------------------------------------------------------------------
// Structs
// ---------------------------------------------------------------------------

impl TypeTranslator {
    /// Builds a named struct from `members`, laid out and decorated under
    /// `rule`.
    ///
    /// Overlapping explicit offsets are reported as errors; the computed
    /// offset is kept for the offending member.
    pub(crate) fn struct_type(
        &mut self,
        name: &str,
        members: &[MemberRef<'_>],
        rule: LayoutRule,
        block: BlockKind,
    ) -> Result<Handle<Type>, LowerError> {
        let mut fields = Vec::with_capacity(members.len());
        for member in members {
            let ty = self.translate(member.ty, rule)?;
            fields.push(StructMember {
                name: (!member.name.is_empty()).then(|| member.name.to_string()),
                ty,
            });
        }

        let mut decorations = Vec::new();
        if rule != LayoutRule::Void {
            let placed = layout::members_layout(members, rule, &self.options);
            for overlap in &placed.overlaps {
                let attr = if overlap.packoffset { "packoffset" } else { "vk::offset" };
                self.diags.error(
                    format!(
                        "{attr} caused overlap with previous members ('{}' at offset {}, next free offset {})",
                        overlap.member, overlap.requested, overlap.next_free
                    ),
                    overlap.loc,
                );
            }
            for (index, (member, at)) in members.iter().zip(&placed.members).enumerate() {
                let index = index as u32;
                decorations.push(Decoration::Offset {
                    member: index,
                    offset: at.offset,
                });
                if let Some((stride, row_major)) = self.matrix_stride(member.ty, rule) {
                    decorations.push(Decoration::MatrixStride {
                        member: index,
                        stride,
                    });
                    decorations.push(mirrored_majorness(index, row_major));
                }
            }
        }

        match block {
            BlockKind::Plain => {}
            BlockKind::Block => decorations.push(Decoration::Block),
            BlockKind::BufferBlock { read_only } => {
                if read_only {
                    decorations.extend((0..members.len() as u32).map(|member| Decoration::NonWritable { member }));
                }
                decorations.push(Decoration::BufferBlock);
            }
        }

        let handle = self.module.insert_type(Type {
            name: Some(name.to_string()),
            inner: TypeInner::Struct { members: fields },
            decorations,
        });
        log::debug!("struct {name} under {rule} -> {handle:?}");
        Ok(handle)
    }

    /// Stride and storage order of a float matrix member, looking through
    /// arrays.
    fn matrix_stride(&self, ty: &SourceType, rule: LayoutRule) -> Option<(u32, bool)> {
        if !ty.is_float_matrix_or_array_of() {
            return None;
        }
        let (mut shape, mut majorness) = ty.desugar();
        while let SourceType::Array { elem, .. } = shape {
            let (inner, inner_majorness) = elem.desugar();
            majorness = inner_majorness.or(majorness);
            shape = inner;
        }
        let stride = layout::layout_with(shape, rule, majorness, &self.options).stride;
        Some((stride, layout::is_row_major(majorness, &self.options)))
    }
}

/// Source row-major storage is target column-major and vice versa.
fn mirrored_majorness(member: u32, row_major: bool) -> Decoration {
    if row_major {
        Decoration::ColMajor { member }
    } else {
        Decoration::RowMajor { member }
    }
}

fn int_kind(signed: bool) -> ScalarKind {
    if signed { ScalarKind::Sint } else { ScalarKind::Uint }
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

impl TypeTranslator {
    fn resource(
        &mut self,
        kind: ResourceKind,
        elem: Option<&SourceType>,
        rule: LayoutRule,
    ) -> Result<Handle<Type>, LowerError> {
        match kind {
            ResourceKind::Texture {
                dim,
                arrayed,
                multisampled,
                rw,
            } => {
                let (scalar, lanes) = self.sampled_element(kind, elem);
                let sampled_type = self.translate(&SourceType::scalar(scalar), LayoutRule::Void)?;
                let format = if rw {
                    self.image_format(kind, scalar, lanes)
                } else {
                    ImageFormat::Unknown
                };
                let (image_dim, dim_name) = match dim {
                    TextureDim::D1 => (ImageDim::D1, "1d"),
                    TextureDim::D2 => (ImageDim::D2, "2d"),
                    TextureDim::D3 => (ImageDim::D3, "3d"),
                    TextureDim::Cube => (ImageDim::Cube, "cube"),
                };
                match (dim, arrayed, rw) {
                    (TextureDim::D1, _, false) => self.module.require_capability(Capability::Sampled1D),
                    (TextureDim::D1, _, true) => self.module.require_capability(Capability::Image1D),
                    (TextureDim::Cube, true, false) => {
                        self.module.require_capability(Capability::SampledCubeArray)
                    }
                    (TextureDim::Cube, true, true) => {
                        self.module.require_capability(Capability::ImageCubeArray)
                    }
                    _ => {}
                }
                let name = format!(
                    "type.{dim_name}.image{}",
                    if arrayed { ".array" } else { "" }
                );
                Ok(self.image(name, sampled_type, image_dim, arrayed, multisampled, rw, format))
            }
            ResourceKind::Buffer { rw } => {
                if rw && elem.is_some_and(|e| e.as_struct().is_some()) {
                    self.diags
                        .error("cannot instantiate RWBuffer with struct type", self.loc);
                }
                let (scalar, lanes) = self.sampled_element(kind, elem);
                let sampled_type = self.translate(&SourceType::scalar(scalar), LayoutRule::Void)?;
                let format = self.image_format(kind, scalar, lanes);
                self.module.require_capability(if rw {
                    Capability::ImageBuffer
                } else {
                    Capability::SampledBuffer
                });
                Ok(self.image(
                    "type.buffer.image".into(),
                    sampled_type,
                    ImageDim::Buffer,
                    false,
                    false,
                    rw,
                    format,
                ))
            }
            ResourceKind::SubpassInput { multisampled } => {
                let (scalar, _) = self.sampled_element(kind, elem);
                let sampled_type = self.translate(&SourceType::scalar(scalar), LayoutRule::Void)?;
                self.module.require_capability(Capability::InputAttachment);
                Ok(self.image(
                    "type.subpass.image".into(),
                    sampled_type,
                    ImageDim::SubpassData,
                    false,
                    multisampled,
                    true,
                    ImageFormat::Unknown,
                ))
            }
            ResourceKind::Sampler { .. } => Ok(self.module.insert_type(Type {
                name: Some("type.sampler".into()),
                inner: TypeInner::Sampler,
                decorations: Vec::new(),
            })),
            ResourceKind::StructuredBuffer
            | ResourceKind::RWStructuredBuffer
            | ResourceKind::AppendStructuredBuffer
            | ResourceKind::ConsumeStructuredBuffer => {
                let elem = self.required_element(kind, elem)?;
                self.structured_buffer(kind, elem, rule)
            }
            ResourceKind::ByteAddressBuffer { rw } => Ok(self.byte_address_buffer(kind, rw, rule)),
            ResourceKind::ConstantBuffer | ResourceKind::TextureBuffer => {
                let elem = self.required_element(kind, elem)?;
                let Some(decl) = elem.as_struct() else {
                    self.diags.error(
                        format!("{} template type must be a struct, found '{elem}'", kind.name()),
                        self.loc,
                    );
                    return Err(LowerError::Invalid);
                };
                let (rule, block) = match (kind, rule) {
                    (ResourceKind::ConstantBuffer, LayoutRule::Void) => {
                        (self.options.cbuffer_rule(), BlockKind::Block)
                    }
                    (ResourceKind::ConstantBuffer, rule) => (rule, BlockKind::Block),
                    (_, LayoutRule::Void) => (
                        self.options.tbuffer_rule(),
                        BlockKind::BufferBlock { read_only: true },
                    ),
                    (_, rule) => (rule, BlockKind::BufferBlock { read_only: true }),
                };
                let name = format!("type.{}.{}", kind.name(), decl.name);
                self.struct_type(&name, &layout::members_of(decl), rule, block)
            }
            ResourceKind::InputPatch { count } | ResourceKind::OutputPatch { count } => {
                let elem = self.required_element(kind, elem)?;
                let base = self.translate(elem, LayoutRule::Void)?;
                let length = self.module.constant_u32(count);
                Ok(self.module.plain_type(TypeInner::Array { base, length }))
            }
            ResourceKind::Stream { .. } => {
                let elem = self.required_element(kind, elem)?;
                self.translate(elem, rule)
            }
        }
    }

    fn required_element<'t>(
        &mut self,
        kind: ResourceKind,
        elem: Option<&'t SourceType>,
    ) -> Result<&'t SourceType, LowerError> {
        elem.ok_or_else(|| {
            self.diags
                .fatal(format!("{} requires a template type", kind.name()), self.loc)
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn image(
        &mut self,
        name: String,
        sampled_type: Handle<Type>,
        dim: ImageDim,
        arrayed: bool,
        multisampled: bool,
        storage: bool,
        format: ImageFormat,
    ) -> Handle<Type> {
        self.module.insert_type(Type {
            name: Some(name),
            inner: TypeInner::Image {
                sampled_type,
                dim,
                depth: 2,
                arrayed,
                multisampled,
                sampled: if storage { 2 } else { 1 },
                format,
            },
            decorations: Vec::new(),
        })
    }

    /// Scalar and lane count of a texture or typed-buffer element. Elements
    /// that do not fit one four-lane register fall back to `float4` after an
    /// error.
    fn sampled_element(&mut self, kind: ResourceKind, elem: Option<&SourceType>) -> (ScalarType, u32) {
        const FALLBACK: (ScalarType, u32) = (ScalarType::FLOAT, 4);
        let Some(elem) = elem else {
            return FALLBACK;
        };
        let found = match elem.desugar().0 {
            SourceType::Scalar(s) => Some((*s, 1)),
            SourceType::Vector { elem, count } => Some((*elem, *count)),
            SourceType::Matrix { elem, rows, cols } => Some((*elem, rows * cols)),
            SourceType::Struct(decl) => self.struct_element(decl),
            _ => {
                self.diags.error(
                    format!("unsupported {} element type '{elem}'", kind.name()),
                    self.loc,
                );
                None
            }
        };
        let Some((scalar, lanes)) = found else {
            return FALLBACK;
        };
        let wide = layout::element_bitwidth(scalar, None, &self.options) == 64;
        if lanes * if wide { 2 } else { 1 } > 4 {
            self.diags.error(
                format!("resource template element type '{elem}' cannot fit into four 32-bit scalars"),
                self.loc,
            );
            return FALLBACK;
        }
        (scalar, lanes)
    }

    /// A struct element is accepted when all of its fields are scalars or
    /// vectors of one scalar type.
    fn struct_element(&mut self, decl: &StructDecl) -> Option<(ScalarType, u32)> {
        let mut first: Option<ScalarType> = None;
        let mut lanes = 0;
        for field in &decl.fields {
            let (scalar, count) = match field.ty.desugar().0 {
                SourceType::Scalar(s) => (*s, 1),
                SourceType::Vector { elem, count } => (*elem, *count),
                _ => {
                    self.diags.error(
                        "unsupported struct element type for resource template instantiation",
                        field.loc,
                    );
                    return None;
                }
            };
            match first {
                None => first = Some(scalar),
                Some(f) if !can_treat_as_same_scalar(f, scalar) => {
                    self.diags.error(
                        "all struct members should have the same element type for resource template instantiation",
                        field.loc,
                    );
                    return None;
                }
                Some(_) => {}
            }
            lanes += count;
        }
        first.map(|scalar| (scalar, lanes))
    }

    fn image_format(&mut self, kind: ResourceKind, scalar: ScalarType, lanes: u32) -> ImageFormat {
        use ImageFormat as F;
        let bits = layout::element_bitwidth(scalar, None, &self.options);
        let format = match (scalar, bits, lanes) {
            (ScalarType::Bool, ..) => F::Unknown,
            (s, 32, 1) if s.is_float() => F::R32f,
            (s, 32, 2) if s.is_float() => F::Rg32f,
            (s, 32, _) if s.is_float() => F::Rgba32f,
            (s, 32, 1) if s.is_signed() => F::R32i,
            (s, 32, 2) if s.is_signed() => F::Rg32i,
            (s, 32, _) if s.is_signed() => F::Rgba32i,
            (_, 32, 1) => F::R32ui,
            (_, 32, 2) => F::Rg32ui,
            (_, 32, _) => F::Rgba32ui,
            _ => F::Unknown,
        };
        if format == F::Unknown {
            self.diags.error(
                format!(
                    "cannot translate resource type parameter '{scalar}' of {} to proper image format",
                    kind.name()
                ),
                self.loc,
            );
        }
        if matches!(kind, ResourceKind::Buffer { rw: true } | ResourceKind::Texture { rw: true, .. })
            && matches!(format, F::Rg32f | F::Rg32i | F::Rg32ui)
        {
            self.module
                .require_capability(Capability::StorageImageExtendedFormats);
        }
        format
    }

    /// A storage block wrapping a runtime array of `elem`. Under the void
    /// rule the buffer is being aliased, so the structured-buffer rule is
    /// used and a pointer to the block is returned.
    fn structured_buffer(
        &mut self,
        kind: ResourceKind,
        elem: &SourceType,
        rule: LayoutRule,
    ) -> Result<Handle<Type>, LowerError> {
        let alias = rule == LayoutRule::Void;
        let rule = if alias { self.options.sbuffer_rule() } else { rule };

        let base = self.translate(elem, rule)?;
        let stride = self.layout(elem, rule).size;
        let array = self.module.insert_type(Type {
            name: None,
            inner: TypeInner::RuntimeArray { base },
            decorations: vec![Decoration::ArrayStride(stride)],
        });

        let mut decorations = Vec::new();
        if let Some((matrix_stride, row_major)) = self.matrix_stride(elem, rule) {
            decorations.push(Decoration::MatrixStride {
                member: 0,
                stride: matrix_stride,
            });
            decorations.push(mirrored_majorness(0, row_major));
        }
        decorations.push(Decoration::Offset { member: 0, offset: 0 });
        if kind == ResourceKind::StructuredBuffer {
            decorations.push(Decoration::NonWritable { member: 0 });
        }
        decorations.push(Decoration::BufferBlock);

        let elem_name = match elem.as_struct() {
            Some(decl) => decl.name.clone(),
            None => elem.to_string(),
        };
        let block = self.module.insert_type(Type {
            name: Some(format!("type.{}.{elem_name}", kind.name())),
            inner: TypeInner::Struct {
                members: vec![StructMember { name: None, ty: array }],
            },
            decorations,
        });
        Ok(self.alias_pointer(block, alias))
    }

    fn byte_address_buffer(&mut self, kind: ResourceKind, rw: bool, rule: LayoutRule) -> Handle<Type> {
        let u32_ty = self.module.scalar_type(Scalar::U32);
        let array = self.module.insert_type(Type {
            name: None,
            inner: TypeInner::RuntimeArray { base: u32_ty },
            decorations: vec![Decoration::ArrayStride(4)],
        });
        let mut decorations = vec![Decoration::Offset { member: 0, offset: 0 }];
        if !rw {
            decorations.push(Decoration::NonWritable { member: 0 });
        }
        decorations.push(Decoration::BufferBlock);
        let block = self.module.insert_type(Type {
            name: Some(format!("type.{}", kind.name())),
            inner: TypeInner::Struct {
                members: vec![StructMember { name: None, ty: array }],
            },
            decorations,
        });
        self.alias_pointer(block, rule == LayoutRule::Void)
    }

    fn alias_pointer(&mut self, block: Handle<Type>, alias: bool) -> Handle<Type> {
        if !alias {
            return block;
        }
        self.module.plain_type(TypeInner::Pointer {
            base: block,
            class: StorageClass::Uniform,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spvx_ast::{DeclAttrs, FieldDecl, PackOffset};

    fn translator() -> TypeTranslator {
        TypeTranslator::new(LowerOptions::default())
    }

    fn field(name: &str, ty: SourceType) -> FieldDecl {
        FieldDecl::new(name, ty, DeclAttrs::default())
    }

    fn structure(name: &str, fields: Vec<FieldDecl>) -> SourceType {
        SourceType::structure(StructDecl {
            name: name.into(),
            base: None,
            fields,
        })
    }

    #[test]
    fn bool_depends_on_rule() {
        let mut t = translator();
        let b = SourceType::scalar(ScalarType::BOOL);
        let plain = t.translate(&b, LayoutRule::Void).unwrap();
        let laid_out = t.translate(&b, LayoutRule::GlslStd430).unwrap();
        assert_eq!(t.module.types[plain].inner, TypeInner::Scalar(Scalar::BOOL));
        assert_eq!(t.module.types[laid_out].inner, TypeInner::Scalar(Scalar::U32));
    }

    #[test]
    fn identical_shapes_share_handles() {
        let mut t = translator();
        let v = SourceType::vector(ScalarType::FLOAT, 4);
        let alias = SourceType::alias("float4_t", v.clone());
        let a = t.translate(&v, LayoutRule::Void).unwrap();
        let b = t.translate(&alias, LayoutRule::Void).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn single_component_vector_is_scalar() {
        let mut t = translator();
        let v1 = t.translate(&SourceType::vector(ScalarType::INT, 1), LayoutRule::Void).unwrap();
        let s = t.translate(&SourceType::scalar(ScalarType::INT), LayoutRule::Void).unwrap();
        assert_eq!(v1, s);
    }

    #[test]
    fn bad_vector_size_is_fatal() {
        let mut t = translator();
        let err = t
            .translate(&SourceType::vector(ScalarType::FLOAT, 5), LayoutRule::Void)
            .unwrap_err();
        assert!(matches!(err, LowerError::Fatal { .. }));
    }

    #[test]
    fn float_matrix_rows_become_columns() {
        let mut t = translator();
        let m = t
            .translate(&SourceType::matrix(ScalarType::FLOAT, 2, 3), LayoutRule::Void)
            .unwrap();
        let TypeInner::Matrix { column, columns } = t.module.types[m].inner else {
            panic!("expected a matrix");
        };
        assert_eq!(columns, VectorSize::Bi);
        assert_eq!(
            t.module.types[column].inner,
            TypeInner::Vector {
                size: VectorSize::Tri,
                scalar: Scalar::F32
            }
        );
    }

    #[test]
    fn int_matrix_is_strided_array() {
        let mut t = translator();
        let m = t
            .translate(&SourceType::matrix(ScalarType::INT, 3, 2), LayoutRule::GlslStd140)
            .unwrap();
        let ty = &t.module.types[m];
        assert!(matches!(ty.inner, TypeInner::Array { .. }));
        assert_eq!(ty.array_stride(), Some(16));
        assert_eq!(t.module.array_len(m), Some(3));
    }

    #[test]
    fn literal_follows_compatible_hint() {
        let mut t = translator();
        let lit = SourceType::scalar(ScalarType::LiteralInt { bits: 64 });
        let uint = SourceType::scalar(ScalarType::UINT);
        let h = t.translate_hinted(&lit, LayoutRule::Void, Some(&uint)).unwrap();
        assert_eq!(t.module.types[h].inner, TypeInner::Scalar(Scalar::U32));
        let h = t
            .translate_hinted(&lit, LayoutRule::Void, Some(&SourceType::scalar(ScalarType::FLOAT)))
            .unwrap();
        assert_eq!(t.module.types[h].inner, TypeInner::Scalar(Scalar::I64));
        assert!(t.module.capabilities.contains(&Capability::Int64));
    }

    #[test]
    fn array_stride_under_rule_only() {
        let mut t = translator();
        let arr = SourceType::array(SourceType::scalar(ScalarType::FLOAT), 4);
        let a = t.translate(&arr, LayoutRule::GlslStd140).unwrap();
        assert_eq!(t.module.types[a].array_stride(), Some(16));
        let b = t.translate(&arr, LayoutRule::Void).unwrap();
        assert_eq!(t.module.types[b].array_stride(), None);
        assert_ne!(a, b);
    }

    #[test]
    fn struct_offsets_and_matrix_decorations() {
        let mut t = translator();
        let s = structure(
            "S",
            vec![
                field("a", SourceType::scalar(ScalarType::FLOAT)),
                field(
                    "m",
                    SourceType::oriented(Majorness::RowMajor, SourceType::matrix(ScalarType::FLOAT, 3, 4)),
                ),
            ],
        );
        let h = t.translate(&s, LayoutRule::GlslStd430).unwrap();
        let ty = &t.module.types[h];
        assert_eq!(ty.name.as_deref(), Some("S"));
        assert_eq!(ty.member_offset(0), Some(0));
        assert_eq!(ty.member_offset(1), Some(16));
        assert!(ty.decorations.contains(&Decoration::MatrixStride { member: 1, stride: 16 }));
        assert!(ty.decorations.contains(&Decoration::ColMajor { member: 1 }));
    }

    #[test]
    fn void_rule_struct_is_undecorated() {
        let mut t = translator();
        let s = structure("S", vec![field("a", SourceType::scalar(ScalarType::FLOAT))]);
        let h = t.translate(&s, LayoutRule::Void).unwrap();
        assert!(t.module.types[h].decorations.is_empty());
    }

    #[test]
    fn packoffset_overlap_is_an_error() {
        let mut t = translator();
        let mut b = field("b", SourceType::scalar(ScalarType::FLOAT));
        b.attrs.packoffset = Some(PackOffset {
            subcomponent: 0,
            component: 0,
        });
        let s = structure("S", vec![field("a", SourceType::vector(ScalarType::FLOAT, 4)), b]);
        let h = t.translate(&s, LayoutRule::FxcCtBuffer).unwrap();
        assert!(t.diags.has_errors());
        assert!(t.diags.messages(crate::Severity::Error)[0].starts_with("packoffset caused overlap"));
        assert_eq!(t.module.types[h].member_offset(1), Some(16));
    }

    #[test]
    fn structured_buffer_block() {
        let mut t = translator();
        let sb = SourceType::resource(
            ResourceKind::StructuredBuffer,
            Some(SourceType::vector(ScalarType::FLOAT, 3)),
        );
        let h = t.translate(&sb, LayoutRule::GlslStd430).unwrap();
        let ty = &t.module.types[h];
        assert_eq!(ty.name.as_deref(), Some("type.StructuredBuffer.float3"));
        assert!(ty.decorations.contains(&Decoration::NonWritable { member: 0 }));
        assert!(ty.decorations.contains(&Decoration::BufferBlock));
        let array = t.module.struct_members(h).unwrap()[0].ty;
        assert_eq!(t.module.types[array].array_stride(), Some(12));
    }

    #[test]
    fn aliased_structured_buffer_is_pointer() {
        let mut t = translator();
        let sb = SourceType::resource(
            ResourceKind::RWStructuredBuffer,
            Some(SourceType::scalar(ScalarType::UINT)),
        );
        let h = t.translate(&sb, LayoutRule::Void).unwrap();
        assert!(matches!(
            t.module.types[h].inner,
            TypeInner::Pointer {
                class: StorageClass::Uniform,
                ..
            }
        ));
    }

    #[test]
    fn rw_texture_format() {
        let mut t = translator();
        let tex = SourceType::resource(
            ResourceKind::Texture {
                dim: TextureDim::D2,
                arrayed: false,
                multisampled: false,
                rw: true,
            },
            Some(SourceType::vector(ScalarType::UINT, 2)),
        );
        let h = t.translate(&tex, LayoutRule::Void).unwrap();
        let TypeInner::Image { format, sampled, .. } = t.module.types[h].inner else {
            panic!("expected an image");
        };
        assert_eq!((format, sampled), (ImageFormat::Rg32ui, 2));
        assert!(t.module.capabilities.contains(&Capability::StorageImageExtendedFormats));
    }

    #[test]
    fn oversized_buffer_element() {
        let mut t = translator();
        let s = structure(
            "Big",
            vec![
                field("a", SourceType::vector(ScalarType::FLOAT, 3)),
                field("b", SourceType::vector(ScalarType::FLOAT, 2)),
            ],
        );
        let buf = SourceType::resource(ResourceKind::Buffer { rw: false }, Some(s));
        t.translate(&buf, LayoutRule::Void).unwrap();
        assert!(t.diags.messages(crate::Severity::Error)[0].contains("cannot fit into four 32-bit scalars"));
    }

    #[test]
    fn mixed_struct_element() {
        let mut t = translator();
        let s = structure(
            "Mixed",
            vec![
                field("a", SourceType::scalar(ScalarType::FLOAT)),
                field("b", SourceType::scalar(ScalarType::INT)),
            ],
        );
        let buf = SourceType::resource(ResourceKind::Buffer { rw: false }, Some(s));
        t.translate(&buf, LayoutRule::Void).unwrap();
        assert_eq!(t.diags.error_count(), 1);
    }

    #[test]
    fn runtime_resource_array_needs_descriptor_indexing() {
        let mut t = translator();
        let tex = SourceType::resource(
            ResourceKind::Texture {
                dim: TextureDim::D2,
                arrayed: false,
                multisampled: false,
                rw: false,
            },
            None,
        );
        t.translate(&SourceType::runtime_array(tex), LayoutRule::Void).unwrap();
        assert!(t.module.extensions.contains(&Extension::DescriptorIndexing));
        assert!(t.module.capabilities.contains(&Capability::RuntimeDescriptorArrayEXT));
    }

    #[test]
    fn location_counts() {
        let t = translator();
        assert_eq!(t.location_count(&SourceType::vector(ScalarType::DOUBLE, 3)), 2);
        assert_eq!(t.location_count(&SourceType::vector(ScalarType::DOUBLE, 2)), 1);
        assert_eq!(t.location_count(&SourceType::matrix(ScalarType::FLOAT, 3, 4)), 3);
        assert_eq!(t.location_count(&SourceType::matrix(ScalarType::DOUBLE, 2, 4)), 4);
        let arr = SourceType::array(SourceType::vector(ScalarType::FLOAT, 4), 5);
        assert_eq!(t.location_count(&arr), 5);
    }

    #[test]
    fn relaxed_precision_only_without_16bit() {
        let t = translator();
        let ty = SourceType::vector(ScalarType::MinFloat, 2);
        assert!(t.is_relaxed_precision(&ty));
        let t16 = TypeTranslator::new(LowerOptions {
            enable_16bit_types: true,
            ..LowerOptions::default()
        });
        assert!(!t16.is_relaxed_precision(&ty));
    }

    #[test]
    fn counter_type_shape() {
        let mut t = translator();
        let a = t.counter_type();
        let b = t.counter_type();
        assert_eq!(a, b);
        assert!(t.module.types[a].decorations.contains(&Decoration::BufferBlock));
    }
}
