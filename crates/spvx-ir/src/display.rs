//! Display implementations and text dump for debugging.

use std::fmt;

use crate::Module;
use crate::arena::UniqueArena;
use crate::capability::{Capability, Extension};
use crate::global::{BuiltIn, ResourceBinding, StorageClass, VarDecoration};
use crate::types::{Decoration, ImageDim, ImageFormat, Scalar, ScalarKind, Type, TypeInner, VectorSize};

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Sint => write!(f, "sint"),
            Self::Uint => write!(f, "uint"),
            Self::Float => write!(f, "float"),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ScalarKind::Bool => write!(f, "bool"),
            ScalarKind::Sint => write!(f, "i{}", self.bits()),
            ScalarKind::Uint => write!(f, "u{}", self.bits()),
            ScalarKind::Float => write!(f, "f{}", self.bits()),
        }
    }
}

impl fmt::Display for VectorSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u32)
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Function => "Function",
            Self::Private => "Private",
            Self::Input => "Input",
            Self::Output => "Output",
            Self::Uniform => "Uniform",
            Self::UniformConstant => "UniformConstant",
            Self::PushConstant => "PushConstant",
            Self::Workgroup => "Workgroup",
        };
        f.write_str(name)
    }
}

impl fmt::Display for BuiltIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for ResourceBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "set={} binding={}", self.set, self.binding)
    }
}

impl fmt::Display for ImageDim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::D1 => "1D",
            Self::D2 => "2D",
            Self::D3 => "3D",
            Self::Cube => "Cube",
            Self::Buffer => "Buffer",
            Self::SubpassData => "SubpassData",
        };
        f.write_str(name)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for Decoration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Offset { member, offset } => write!(f, "[{member}] Offset {offset}"),
            Self::ArrayStride(stride) => write!(f, "ArrayStride {stride}"),
            Self::MatrixStride { member, stride } => write!(f, "[{member}] MatrixStride {stride}"),
            Self::RowMajor { member } => write!(f, "[{member}] RowMajor"),
            Self::ColMajor { member } => write!(f, "[{member}] ColMajor"),
            Self::NonWritable { member } => write!(f, "[{member}] NonWritable"),
            Self::Block => write!(f, "Block"),
            Self::BufferBlock => write!(f, "BufferBlock"),
        }
    }
}

impl fmt::Display for VarDecoration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Location(n) => write!(f, "Location {n}"),
            Self::Index(n) => write!(f, "Index {n}"),
            Self::BuiltIn(b) => write!(f, "BuiltIn {b}"),
            Self::DescriptorSet(n) => write!(f, "DescriptorSet {n}"),
            Self::Binding(n) => write!(f, "Binding {n}"),
            Self::Patch => write!(f, "Patch"),
            Self::Flat => write!(f, "Flat"),
            Self::NoPerspective => write!(f, "NoPerspective"),
            Self::Centroid => write!(f, "Centroid"),
            Self::Sample => write!(f, "Sample"),
            Self::RelaxedPrecision => write!(f, "RelaxedPrecision"),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Formats a type using the type table for resolving inner references.
///
/// Named types print their name only.
pub fn format_type(ty: &Type, types: &UniqueArena<Type>) -> String {
    if let Some(ref name) = ty.name {
        return name.clone();
    }
    format_type_inner(&ty.inner, types)
}

/// Formats a [`TypeInner`] using the type table for resolving references.
pub fn format_type_inner(inner: &TypeInner, types: &UniqueArena<Type>) -> String {
    let nested = |h: crate::Handle<Type>| match types.try_get(h) {
        Some(ty) => format_type(ty, types),
        None => format!("{h:?}"),
    };
    match inner {
        TypeInner::Void => "void".into(),
        TypeInner::Scalar(s) => format!("{s}"),
        TypeInner::Vector { size, scalar } => format!("vec{size}<{scalar}>"),
        TypeInner::Matrix { column, columns } => {
            format!("mat{columns}<{}>", nested(*column))
        }
        TypeInner::Array { base, length } => format!("array<{}, {length:?}>", nested(*base)),
        TypeInner::RuntimeArray { base } => format!("array<{}>", nested(*base)),
        TypeInner::Struct { members } => {
            let fields: Vec<String> = members.iter().map(|m| nested(m.ty)).collect();
            format!("struct {{ {} }}", fields.join(", "))
        }
        TypeInner::Image {
            sampled_type,
            dim,
            arrayed,
            multisampled,
            sampled,
            format,
            ..
        } => {
            let mut s = format!("image<{}, {dim}", nested(*sampled_type));
            if *arrayed {
                s.push_str(", arrayed");
            }
            if *multisampled {
                s.push_str(", ms");
            }
            if *sampled == 2 {
                s.push_str(&format!(", storage {format}"));
            }
            s.push('>');
            s
        }
        TypeInner::Sampler => "sampler".into(),
        TypeInner::Pointer { base, class } => format!("ptr<{class}, {}>", nested(*base)),
    }
}

/// Produces a human-readable text dump of a [`Module`] for debugging.
pub fn dump_module(module: &Module) -> String {
    let mut out = String::new();

    if !module.capabilities.is_empty() {
        out.push_str("Capabilities:\n");
        for cap in &module.capabilities {
            out.push_str(&format!("  {cap}\n"));
        }
    }
    if !module.extensions.is_empty() {
        out.push_str("Extensions:\n");
        for ext in &module.extensions {
            out.push_str(&format!("  {ext}\n"));
        }
    }

    // Types
    out.push_str("Types:\n");
    for (handle, ty) in module.types.iter() {
        let formatted = match ty.name {
            Some(ref name) => format!("{name} = {}", format_type_inner(&ty.inner, &module.types)),
            None => format_type_inner(&ty.inner, &module.types),
        };
        out.push_str(&format!("  {handle:?} {formatted}\n"));
        for deco in &ty.decorations {
            out.push_str(&format!("      {deco}\n"));
        }
    }

    if !module.constants.is_empty() {
        out.push_str("\nConstants:\n");
        for (handle, c) in module.constants.iter() {
            out.push_str(&format!("  {handle:?} {}u\n", c.value));
        }
    }

    if !module.variables.is_empty() {
        out.push_str("\nVariables:\n");
        for (handle, var) in module.variables.iter() {
            let name = var.name.as_deref().unwrap_or("_");
            let ty_str = format_type(&module.types[var.ty], &module.types);
            let decos: Vec<String> = var.decorations.iter().map(|d| d.to_string()).collect();
            let deco_str = if decos.is_empty() {
                String::new()
            } else {
                format!("  [{}]", decos.join(", "))
            };
            out.push_str(&format!(
                "  {handle:?} var<{}> {name}: {ty_str}{deco_str}\n",
                var.class
            ));
        }
    }

    out
}
