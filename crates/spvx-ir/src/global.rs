//! Module-scope variables, storage classes, builtins, and bindings.

use crate::arena::Handle;
use crate::types::Type;

/// Storage class of a variable or pointer.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum StorageClass {
    /// Function-local storage.
    Function,
    /// Module-scope private storage.
    Private,
    /// Pipeline stage input.
    Input,
    /// Pipeline stage output.
    Output,
    /// Uniform and storage blocks.
    Uniform,
    /// Opaque handles: images and samplers.
    UniformConstant,
    PushConstant,
    Workgroup,
}

/// Built-in pipeline variables.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum BuiltIn {
    Position,
    FragCoord,
    PointSize,
    ClipDistance,
    CullDistance,
    VertexIndex,
    InstanceIndex,
    BaseVertex,
    BaseInstance,
    DrawIndex,
    DeviceIndex,
    FrontFacing,
    FragDepth,
    FragStencilRef,
    HelperInvocation,
    SampleId,
    SampleMask,
    FullyCovered,
    PrimitiveId,
    InvocationId,
    Layer,
    ViewportIndex,
    ViewIndex,
    TessLevelOuter,
    TessLevelInner,
    TessCoord,
    GlobalInvocationId,
    LocalInvocationId,
    LocalInvocationIndex,
    WorkgroupId,
}

/// A decoration attached to a variable.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum VarDecoration {
    Location(u32),
    /// Dual-source blend index.
    Index(u32),
    BuiltIn(BuiltIn),
    DescriptorSet(u32),
    Binding(u32),
    Patch,
    Flat,
    NoPerspective,
    Centroid,
    Sample,
    RelaxedPrecision,
}

/// A `(set, binding)` pair for a resource variable.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ResourceBinding {
    pub set: u32,
    pub binding: u32,
}

/// A variable. Module-scope and function-scope variables share the table;
/// the storage class tells them apart.
#[derive(Clone, Debug)]
pub struct Variable {
    pub name: Option<String>,
    /// The pointee type.
    pub ty: Handle<Type>,
    pub class: StorageClass,
    pub decorations: Vec<VarDecoration>,
}

impl Variable {
    pub fn new(name: impl Into<String>, ty: Handle<Type>, class: StorageClass) -> Self {
        Self {
            name: Some(name.into()),
            ty,
            class,
            decorations: Vec::new(),
        }
    }

    pub fn location(&self) -> Option<u32> {
        self.decorations.iter().find_map(|d| match *d {
            VarDecoration::Location(loc) => Some(loc),
            _ => None,
        })
    }

    pub fn builtin(&self) -> Option<BuiltIn> {
        self.decorations.iter().find_map(|d| match *d {
            VarDecoration::BuiltIn(b) => Some(b),
            _ => None,
        })
    }

    /// Returns the `(set, binding)` pair once both decorations are present.
    pub fn resource_binding(&self) -> Option<ResourceBinding> {
        let mut set = None;
        let mut binding = None;
        for d in &self.decorations {
            match *d {
                VarDecoration::DescriptorSet(s) => set = Some(s),
                VarDecoration::Binding(b) => binding = Some(b),
                _ => {}
            }
        }
        Some(ResourceBinding {
            set: set?,
            binding: binding?,
        })
    }

    pub fn has_decoration(&self, decoration: VarDecoration) -> bool {
        self.decorations.contains(&decoration)
    }
}
