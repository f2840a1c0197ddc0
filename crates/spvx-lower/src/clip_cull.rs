//! Packing of clip and cull distance semantics into one builtin array per
//! direction.
//!
//! Every declaration carrying `SV_ClipDistanceN` or `SV_CullDistanceN` is
//! recorded first. Once an entry point's interface is known the recorded
//! declarations are sorted by semantic index and concatenated, so
//!
//! ```text
//! float2 a : SV_ClipDistance2;
//! float  b : SV_ClipDistance0;
//! float3 c : SV_ClipDistance1;
//! ```
//!
//! becomes `float gl_ClipDistance[6]` with `b` at 0, `c` at 1..4 and `a` at
//! 4..6.

use std::collections::BTreeMap;
use std::ops::Range;

use spvx_ast::{Direction, SourceLocation, SourceType};
use spvx_ir::{
    BuiltIn, Capability, Handle, Module, Scalar, StorageClass, Type, TypeInner, VarDecoration,
    Variable,
};

use crate::Diagnostics;
use crate::semantic::{Semantic, SemanticKind};

/// Which of the two packed distance arrays.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClipCullKind {
    Clip,
    Cull,
}

impl ClipCullKind {
    pub fn from_semantic(kind: SemanticKind) -> Option<Self> {
        match kind {
            SemanticKind::ClipDistance => Some(Self::Clip),
            SemanticKind::CullDistance => Some(Self::Cull),
            _ => None,
        }
    }

    fn builtin(self) -> BuiltIn {
        match self {
            Self::Clip => BuiltIn::ClipDistance,
            Self::Cull => BuiltIn::CullDistance,
        }
    }

    fn capability(self) -> Capability {
        match self {
            Self::Clip => Capability::ClipDistance,
            Self::Cull => Capability::CullDistance,
        }
    }

    fn var_name(self) -> &'static str {
        match self {
            Self::Clip => "gl_ClipDistance",
            Self::Cull => "gl_CullDistance",
        }
    }
}

#[derive(Clone, Debug)]
struct Recorded {
    ty: SourceType,
    count: u32,
}

#[derive(Clone, Debug, Default)]
struct Packing {
    decls: BTreeMap<u32, Recorded>,
    /// Semantic index -> element range in the packed array.
    ranges: BTreeMap<u32, Range<u32>>,
    total: u32,
    var: Option<Handle<Variable>>,
}

/// Where one recorded declaration lives in its packed array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedAccess {
    pub var: Handle<Variable>,
    pub offset: u32,
    pub count: u32,
    /// For per-invocation arrays, the one outer element touched.
    pub invocation: Option<u32>,
    /// The declared type the value is composed into or decomposed from.
    pub ty: SourceType,
}

/// Records clip/cull declarations and owns the packed builtin variables.
#[derive(Clone, Debug, Default)]
pub struct ClipCullPacker {
    packings: BTreeMap<(Direction, ClipCullKind), Packing>,
}

impl ClipCullPacker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every clip/cull leaf of a stage declaration. Struct fields are
    /// walked with their own semantics. Returns false if an error was
    /// reported.
    pub fn record_decl(
        &mut self,
        ty: &SourceType,
        semantic: Option<&str>,
        direction: Direction,
        loc: SourceLocation,
        diags: &mut Diagnostics,
    ) -> bool {
        if let Some(decl) = ty.as_struct() {
            let mut ok = true;
            if let Some(base) = &decl.base {
                ok &= self.record_decl(base, None, direction, loc, diags);
            }
            for field in &decl.fields {
                ok &= self.record_decl(
                    &field.ty,
                    field.attrs.semantic.as_deref(),
                    direction,
                    field.loc,
                    diags,
                );
            }
            return ok;
        }

        // Malformed semantics are reported when the stage variable is created.
        let Some(semantic) = semantic.and_then(|s| Semantic::parse(s, loc)) else {
            return true;
        };
        let Some(kind) = ClipCullKind::from_semantic(semantic.kind) else {
            return true;
        };

        let count = match ty.desugar().0 {
            SourceType::Scalar(s) if s.is_float() => 1,
            SourceType::Vector { elem, count } if elem.is_float() => *count,
            _ => {
                diags.error(
                    format!("{semantic} must be a float scalar or vector, found '{ty}'"),
                    loc,
                );
                return false;
            }
        };

        let packing = self.packings.entry((direction, kind)).or_default();
        match packing.decls.get(&semantic.index) {
            Some(existing) if existing.ty != *ty => {
                diags.error(
                    format!(
                        "{semantic} redeclared as '{ty}', previously '{}'",
                        existing.ty
                    ),
                    loc,
                );
                false
            }
            Some(_) => true,
            None => {
                packing.decls.insert(
                    semantic.index,
                    Recorded {
                        ty: ty.clone(),
                        count,
                    },
                );
                true
            }
        }
    }

    /// Assigns each recorded declaration a contiguous range, in ascending
    /// semantic index order.
    pub fn calculate(&mut self) {
        for ((direction, kind), packing) in &mut self.packings {
            let mut offset = 0;
            packing.ranges.clear();
            for (&index, decl) in &packing.decls {
                packing.ranges.insert(index, offset..offset + decl.count);
                offset += decl.count;
            }
            packing.total = offset;
            log::debug!("{direction:?} {kind:?} distances packed into {offset} floats");
        }
    }

    /// Creates the packed builtin variables. A non-`None` array size adds a
    /// per-vertex outer dimension to that direction's variables.
    pub fn generate_vars(
        &mut self,
        module: &mut Module,
        in_array: Option<u32>,
        out_array: Option<u32>,
    ) -> Vec<Handle<Variable>> {
        let mut created = Vec::new();
        for (&(direction, kind), packing) in &mut self.packings {
            if packing.total == 0 {
                continue;
            }
            let float = module.scalar_type(Scalar::F32);
            let length = module.constant_u32(packing.total);
            let mut ty = module.plain_type(TypeInner::Array { base: float, length });
            let (outer, class) = match direction {
                Direction::Input => (in_array, StorageClass::Input),
                Direction::Output => (out_array, StorageClass::Output),
            };
            if let Some(n) = outer {
                let length = module.constant_u32(n);
                ty = module.insert_type(Type::plain(TypeInner::Array { base: ty, length }));
            }
            let mut var = Variable::new(kind.var_name(), ty, class);
            var.decorations.push(VarDecoration::BuiltIn(kind.builtin()));
            let handle = module.add_variable(var);
            module.require_capability(kind.capability());
            packing.var = Some(handle);
            created.push(handle);
        }
        created
    }

    /// Length of the packed array, 0 if nothing was recorded.
    pub fn total(&self, direction: Direction, kind: ClipCullKind) -> u32 {
        self.packings
            .get(&(direction, kind))
            .map_or(0, |p| p.total)
    }

    /// Element range of the declaration with `semantic_index`.
    pub fn range(&self, direction: Direction, kind: ClipCullKind, semantic_index: u32) -> Option<Range<u32>> {
        self.packings
            .get(&(direction, kind))?
            .ranges
            .get(&semantic_index)
            .cloned()
    }

    /// Resolves a read or write of one recorded declaration. `None` until
    /// the variables are generated, or for an unrecorded index.
    pub fn access(
        &self,
        direction: Direction,
        kind: ClipCullKind,
        semantic_index: u32,
        invocation: Option<u32>,
    ) -> Option<PackedAccess> {
        let packing = self.packings.get(&(direction, kind))?;
        let range = packing.ranges.get(&semantic_index)?;
        Some(PackedAccess {
            var: packing.var?,
            offset: range.start,
            count: range.end - range.start,
            invocation,
            ty: packing.decls.get(&semantic_index)?.ty.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spvx_ast::ScalarType;

    fn float(count: u32) -> SourceType {
        SourceType::vector(ScalarType::FLOAT, count)
    }

    #[test]
    fn rejects_non_float() {
        let mut packer = ClipCullPacker::new();
        let mut diags = Diagnostics::new();
        let ok = packer.record_decl(
            &SourceType::scalar(ScalarType::INT),
            Some("SV_ClipDistance0"),
            Direction::Output,
            SourceLocation::default(),
            &mut diags,
        );
        assert!(!ok);
        assert!(diags.has_errors());
    }

    #[test]
    fn ignores_other_semantics() {
        let mut packer = ClipCullPacker::new();
        let mut diags = Diagnostics::new();
        assert!(packer.record_decl(&float(4), Some("SV_Position"), Direction::Output, SourceLocation::default(), &mut diags));
        packer.calculate();
        assert_eq!(packer.total(Direction::Output, ClipCullKind::Clip), 0);
    }

    #[test]
    fn same_declaration_twice_is_fine() {
        let mut packer = ClipCullPacker::new();
        let mut diags = Diagnostics::new();
        for _ in 0..2 {
            assert!(packer.record_decl(&float(2), Some("SV_CullDistance"), Direction::Input, SourceLocation::default(), &mut diags));
        }
        assert!(!packer.record_decl(&float(3), Some("SV_CullDistance0"), Direction::Input, SourceLocation::default(), &mut diags));
        packer.calculate();
        assert_eq!(packer.total(Direction::Input, ClipCullKind::Cull), 2);
    }

    #[test]
    fn per_vertex_outer_array() {
        let mut packer = ClipCullPacker::new();
        let mut diags = Diagnostics::new();
        packer.record_decl(&float(2), Some("SV_ClipDistance0"), Direction::Input, SourceLocation::default(), &mut diags);
        packer.record_decl(&float(1), Some("SV_ClipDistance0"), Direction::Output, SourceLocation::default(), &mut diags);
        packer.calculate();

        let mut module = Module::new();
        let vars = packer.generate_vars(&mut module, Some(3), None);
        assert_eq!(vars.len(), 2);
        let input = packer.access(Direction::Input, ClipCullKind::Clip, 0, Some(1)).unwrap();
        let ty = module.variables[input.var].ty;
        assert_eq!(module.array_len(ty), Some(3));
        let output = packer.access(Direction::Output, ClipCullKind::Clip, 0, None).unwrap();
        assert_eq!(module.array_len(module.variables[output.var].ty), Some(1));
        assert!(module.capabilities.contains(&Capability::ClipDistance));
        assert_eq!(module.variables[output.var].builtin(), Some(BuiltIn::ClipDistance));
    }
}
